use anyhow::{Context, Result};
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use crate::matrix::TraceabilityMatrix;
use crate::models::priority_label;

/// Output formats for a traceability matrix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Markdown,
    Json,
}

impl ExportFormat {
    /// Infers the format from a file extension, defaulting to Markdown
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => ExportFormat::Json,
            _ => ExportFormat::Markdown,
        }
    }
}

/// Renders the matrix as a Markdown table followed by a coverage summary
pub fn matrix_to_markdown(matrix: &TraceabilityMatrix) -> String {
    let mut out = String::new();

    out.push_str("# Requirements Traceability Matrix\n\n");

    // Header
    out.push_str("| Requirement ID | Title | Priority |");
    for uc in &matrix.use_cases {
        let _ = write!(out, " {} |", uc.label);
    }
    out.push_str(" Coverage |\n");

    out.push_str("|---|---|---|");
    for _ in &matrix.use_cases {
        out.push_str(":---:|");
    }
    out.push_str("---:|\n");

    for row in &matrix.rows {
        let _ = write!(
            out,
            "| {} | {} | {} |",
            row.requirement.label(),
            escape_cell(&row.requirement.title),
            priority_label(row.requirement.priority)
        );
        for cell in &row.coverage {
            out.push_str(if cell.covered { " x |" } else { " - |" });
        }
        let _ = writeln!(out, " {}% |", row.rounded_percentage());
    }

    out.push_str("\n## Coverage Summary\n\n");
    for row in &matrix.rows {
        let _ = writeln!(
            out,
            "- {}: {} use cases ({}%, {})",
            row.requirement.title,
            row.total_coverage,
            row.rounded_percentage(),
            row.level()
        );
    }

    out
}

/// Renders the matrix as pretty-printed JSON
pub fn matrix_to_json(matrix: &TraceabilityMatrix) -> Result<String> {
    serde_json::to_string_pretty(matrix).context("Failed to serialize traceability matrix")
}

/// Writes the matrix to `output_path` in the given format
pub fn export_matrix(matrix: &TraceabilityMatrix, format: ExportFormat, output_path: &Path) -> Result<()> {
    let content = match format {
        ExportFormat::Markdown => matrix_to_markdown(matrix),
        ExportFormat::Json => matrix_to_json(matrix)?,
    };

    if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(output_path, content)
        .with_context(|| format!("Failed to write matrix to {:?}", output_path))?;

    log::info!(
        "Exported traceability matrix ({} requirements x {} use cases) to {}",
        matrix.rows.len(),
        matrix.use_cases.len(),
        output_path.display()
    );
    Ok(())
}

fn escape_cell(s: &str) -> String {
    s.replace('|', "\\|").replace('\n', " ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::compute_matrix;
    use crate::models::{Requirement, UseCase};
    use tempfile::tempdir;

    fn sample() -> TraceabilityMatrix {
        let mut r1 = Requirement::new("000000000001", "Login | SSO");
        r1.priority = 1;
        let r2 = Requirement::new("000000000002", "Audit trail");
        let use_cases = vec![
            UseCase::new("aaaa0001", "Sign in", ["000000000001"]),
            UseCase::new("aaaa0002", "Review log", ["000000000001", "000000000002"]),
        ];
        compute_matrix(&[r1, r2], &use_cases)
    }

    #[test]
    fn test_markdown_layout() {
        let md = matrix_to_markdown(&sample());

        assert!(md.contains("| Requirement ID | Title | Priority | UC-0001 | UC-0002 | Coverage |"));
        assert!(md.contains("| REQ-0001 | Login \\| SSO | P1 | x | x | 100% |"));
        assert!(md.contains("| REQ-0002 | Audit trail | P3 | - | x | 50% |"));
        assert!(md.contains("- Audit trail: 1 use cases (50%, warning)"));
    }

    #[test]
    fn test_json_round_trip() {
        let matrix = sample();
        let json = matrix_to_json(&matrix).unwrap();
        let parsed: TraceabilityMatrix = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, matrix);
    }

    #[test]
    fn test_export_to_file() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("reports").join("matrix.md");

        export_matrix(&sample(), ExportFormat::from_path(&path), &path)?;

        let content = fs::read_to_string(&path)?;
        assert!(content.starts_with("# Requirements Traceability Matrix"));
        assert_eq!(ExportFormat::from_path(Path::new("m.json")), ExportFormat::Json);
        Ok(())
    }
}
