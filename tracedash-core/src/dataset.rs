//! Local requirement / use-case datasets
//!
//! A dataset file has the same envelope keys as the REST responses
//! (`requirements` and `use_cases`), so the traceability matrix can be
//! computed without a running backend.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;

use crate::matrix::{compute_matrix, TraceabilityMatrix};
use crate::models::{Requirement, UseCase};

/// File formats a dataset can be stored in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatasetFormat {
    Yaml,
    Json,
}

impl DatasetFormat {
    /// Infers the format from the file extension, defaulting to YAML
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => DatasetFormat::Json,
            Some("yaml") | Some("yml") => DatasetFormat::Yaml,
            _ => DatasetFormat::Yaml,
        }
    }
}

impl fmt::Display for DatasetFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatasetFormat::Yaml => write!(f, "YAML"),
            DatasetFormat::Json => write!(f, "JSON"),
        }
    }
}

/// Requirements and use cases fetched together
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Dataset {
    #[serde(default)]
    pub requirements: Vec<Requirement>,
    #[serde(default)]
    pub use_cases: Vec<UseCase>,
}

impl Dataset {
    pub fn new(requirements: Vec<Requirement>, use_cases: Vec<UseCase>) -> Self {
        Self {
            requirements,
            use_cases,
        }
    }

    /// Loads a dataset, inferring the format from the extension
    pub fn load(path: &Path) -> Result<Self> {
        let format = DatasetFormat::from_path(path);
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read dataset file: {:?}", path))?;

        let dataset: Dataset = match format {
            DatasetFormat::Yaml => serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse YAML from {:?}", path))?,
            DatasetFormat::Json => serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse JSON from {:?}", path))?,
        };

        log::debug!(
            "Loaded {} dataset {:?}: {} requirements, {} use cases",
            format,
            path,
            dataset.requirements.len(),
            dataset.use_cases.len()
        );
        Ok(dataset)
    }

    /// Saves the dataset, inferring the format from the extension
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = match DatasetFormat::from_path(path) {
            DatasetFormat::Yaml => serde_yaml::to_string(self)?,
            DatasetFormat::Json => serde_json::to_string_pretty(self)?,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content).with_context(|| format!("Failed to write dataset to {:?}", path))?;
        Ok(())
    }

    pub fn matrix(&self) -> TraceabilityMatrix {
        compute_matrix(&self.requirements, &self.use_cases)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_yaml_with_backend_shapes() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("dataset.yaml");
        fs::write(
            &path,
            r#"
requirements:
  - _id: r1
    title: Login
    type: functional
  - _id: r2
    title: Audit
    type: TECHNICAL
use_cases:
  - _id: u1
    title: Sign in
    requirements: [r1]
  - _id: u2
    title: Nothing yet
"#,
        )
        .unwrap();

        let dataset = Dataset::load(&path).unwrap();
        assert_eq!(dataset.requirements.len(), 2);
        assert!(dataset.use_cases[1].requirements.is_empty());

        let matrix = dataset.matrix();
        assert_eq!(matrix.row("r1").unwrap().coverage_percentage, 50.0);
        assert_eq!(matrix.row("r2").unwrap().total_coverage, 0);
    }

    #[test]
    fn test_save_and_load_json() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("snapshot.json");

        let dataset = Dataset::new(
            vec![Requirement::new("r1", "Login")],
            vec![UseCase::new("u1", "Sign in", ["r1"])],
        );
        dataset.save(&path).unwrap();

        assert_eq!(Dataset::load(&path).unwrap(), dataset);
    }

    #[test]
    fn test_load_missing_file_fails() {
        let temp_dir = TempDir::new().unwrap();
        assert!(Dataset::load(&temp_dir.path().join("missing.yaml")).is_err());
    }

    #[test]
    fn test_backend_only_values_do_not_sink_the_matrix() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("dataset.yaml");
        fs::write(
            &path,
            r#"
requirements:
  - _id: r1
    title: Login
    type: functional
  - _id: r2
    title: Encrypt at rest
    type: security
    status: implemented
  - _id: r3
    title: Odd record
    type: legal
    status: archived
use_cases:
  - _id: u1
    title: Sign in
    requirements: [r1, r2]
"#,
        )
        .unwrap();

        let matrix = Dataset::load(&path).unwrap().matrix();
        assert_eq!(matrix.rows.len(), 3);
        assert_eq!(matrix.row("r2").unwrap().coverage_percentage, 100.0);
        assert_eq!(matrix.row("r3").unwrap().total_coverage, 0);
    }
}
