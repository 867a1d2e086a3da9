pub mod api;
pub mod config;
pub mod dashboard;
pub mod dataset;
pub mod export;
pub mod form;
pub mod matrix;
pub mod models;

// Re-export commonly used types
pub use api::{ApiClient, ApiError, CreatedResponse, RequirementTrace};
pub use config::{get_config_path, Config};
pub use dataset::{Dataset, DatasetFormat};
pub use export::{export_matrix, matrix_to_json, matrix_to_markdown, ExportFormat};
pub use form::{NewRequirement, NewUseCase, RequirementForm, ValidationError};
pub use matrix::{
    compute_matrix, coverage_percentage, CoverageCell, CoverageLevel, CoverageRow,
    TraceabilityMatrix, UseCaseColumn,
};
pub use models::{
    priority_label, short_label, Requirement, RequirementFilter, RequirementStatus,
    RequirementType, RequirementsResponse, UseCase, UseCasesResponse,
};
