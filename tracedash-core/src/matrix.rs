//! Traceability coverage engine
//!
//! Joins requirements against use cases: one row per requirement, one cell per
//! use case, plus the per-requirement coverage summary. Pure and deterministic;
//! the same inputs always produce the same matrix.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::{Requirement, UseCase};

/// Percentage at or above which coverage is considered good
pub const GOOD_THRESHOLD: f64 = 80.0;
/// Percentage at or above which coverage is only a warning
pub const WARNING_THRESHOLD: f64 = 50.0;

/// Presentation bucket derived from a coverage percentage
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CoverageLevel {
    Good,
    Warning,
    Critical,
}

impl CoverageLevel {
    /// Buckets a percentage with closed lower bounds: >= 80 good, >= 50 warning
    pub fn from_percentage(percentage: f64) -> Self {
        if percentage >= GOOD_THRESHOLD {
            CoverageLevel::Good
        } else if percentage >= WARNING_THRESHOLD {
            CoverageLevel::Warning
        } else {
            CoverageLevel::Critical
        }
    }
}

impl fmt::Display for CoverageLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoverageLevel::Good => write!(f, "good"),
            CoverageLevel::Warning => write!(f, "warning"),
            CoverageLevel::Critical => write!(f, "critical"),
        }
    }
}

/// Column header of the matrix
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UseCaseColumn {
    pub id: String,
    pub label: String,
    pub title: String,
}

/// One cell: does this use case reference the row's requirement?
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CoverageCell {
    pub use_case_id: String,
    pub covered: bool,
}

/// Coverage of one requirement across every use case
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CoverageRow {
    pub requirement: Requirement,
    /// One cell per use case, in use-case input order
    pub coverage: Vec<CoverageCell>,
    pub total_coverage: usize,
    /// total_coverage / use cases * 100, or 0 when there are no use cases
    pub coverage_percentage: f64,
}

impl CoverageRow {
    fn build(requirement: &Requirement, use_cases: &[UseCase]) -> Self {
        let coverage: Vec<CoverageCell> = use_cases
            .iter()
            .map(|uc| CoverageCell {
                use_case_id: uc.id.clone(),
                covered: uc.references(&requirement.id),
            })
            .collect();

        let total_coverage = coverage.iter().filter(|c| c.covered).count();

        Self {
            requirement: requirement.clone(),
            coverage,
            total_coverage,
            coverage_percentage: coverage_percentage(total_coverage, use_cases.len()),
        }
    }

    pub fn level(&self) -> CoverageLevel {
        CoverageLevel::from_percentage(self.coverage_percentage)
    }

    /// Percentage as shown on the badge, rounded half away from zero
    pub fn rounded_percentage(&self) -> u32 {
        self.coverage_percentage.round() as u32
    }

    /// Ids of the use cases that reference this requirement
    pub fn covering_use_cases(&self) -> impl Iterator<Item = &str> {
        self.coverage
            .iter()
            .filter(|c| c.covered)
            .map(|c| c.use_case_id.as_str())
    }
}

/// The requirement x use-case grid with per-requirement summaries
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TraceabilityMatrix {
    pub use_cases: Vec<UseCaseColumn>,
    pub rows: Vec<CoverageRow>,
}

impl TraceabilityMatrix {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row(&self, requirement_id: &str) -> Option<&CoverageRow> {
        self.rows.iter().find(|r| r.requirement.id == requirement_id)
    }
}

/// Computes the traceability matrix for the given requirements and use cases.
///
/// Row order follows `requirements`, column order follows `use_cases`.
pub fn compute_matrix(requirements: &[Requirement], use_cases: &[UseCase]) -> TraceabilityMatrix {
    let columns = use_cases
        .iter()
        .map(|uc| UseCaseColumn {
            id: uc.id.clone(),
            label: uc.label(),
            title: uc.title.clone(),
        })
        .collect();

    let rows = requirements
        .iter()
        .map(|req| CoverageRow::build(req, use_cases))
        .collect();

    TraceabilityMatrix {
        use_cases: columns,
        rows,
    }
}

/// Covered / total * 100, defined as 0 when there is nothing to cover
pub fn coverage_percentage(covered: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    covered as f64 / total as f64 * 100.0
}
