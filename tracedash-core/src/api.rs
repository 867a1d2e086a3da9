//! REST API client
//!
//! Talks to the requirements backend: lists requirements and use cases,
//! submits new ones, and fetches per-requirement traces.

use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::dataset::Dataset;
use crate::form::{NewRequirement, NewUseCase, ValidationError};
use crate::models::{Requirement, RequirementFilter, RequirementsResponse, UseCase, UseCasesResponse};

/// Errors that can occur while talking to the backend
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Invalid API base URL '{0}'")]
    InvalidBaseUrl(String),

    #[error("Invalid requirement id '{0}'")]
    InvalidId(String),

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Server returned {status}: {detail}")]
    Status { status: StatusCode, detail: String },

    #[error("Rejected before sending: {0}")]
    Invalid(#[from] ValidationError),
}

/// Reply of the create endpoints
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CreatedResponse {
    pub id: String,
    #[serde(default)]
    pub status: String,
}

/// Reply of `GET /requirements/{id}/trace`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequirementTrace {
    pub requirement: Requirement,
    #[serde(default)]
    pub use_cases: Vec<UseCase>,
    /// Relationship records, passed through as-is
    #[serde(default)]
    pub dependencies: Vec<serde_json::Value>,
}

#[derive(Deserialize)]
struct ErrorBody {
    detail: serde_json::Value,
}

/// Client for the requirements REST API
#[derive(Debug, Clone)]
pub struct ApiClient {
    base: url::Url,
    http: Client,
}

impl ApiClient {
    /// Creates a client for the given base URL (e.g. "http://localhost:8000")
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        let mut base = url::Url::parse(base_url)
            .map_err(|_| ApiError::InvalidBaseUrl(base_url.to_string()))?;
        if base.cannot_be_a_base() {
            return Err(ApiError::InvalidBaseUrl(base_url.to_string()));
        }
        // Url::join replaces the last segment unless the path ends with '/'
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(Self {
            base,
            http: Client::new(),
        })
    }

    pub fn base_url(&self) -> &str {
        self.base.as_str()
    }

    /// Builds the URL for a path relative to the base (e.g. "requirements/")
    pub fn endpoint(&self, path: &str) -> Result<url::Url, ApiError> {
        self.base
            .join(path)
            .map_err(|_| ApiError::InvalidBaseUrl(format!("{}{}", self.base, path)))
    }

    /// `GET /requirements/` with the filters the backend understands.
    ///
    /// The title filter is applied locally; the backend has no such parameter.
    pub async fn list_requirements(&self, filter: &RequirementFilter) -> Result<Vec<Requirement>, ApiError> {
        let mut query: Vec<(&str, String)> = Vec::new();
        if let Some(status) = filter.status {
            query.push(("status", status.as_wire().to_lowercase()));
        }
        if let Some(req_type) = filter.req_type {
            query.push(("type", req_type.as_wire().to_lowercase()));
        }
        if let Some(priority) = filter.priority {
            query.push(("priority", priority.to_string()));
        }

        let response = self
            .http
            .get(self.endpoint("requirements/")?)
            .query(&query)
            .send()
            .await?;
        let body: RequirementsResponse = check(response).await?.json().await?;

        Ok(body
            .requirements
            .into_iter()
            .filter(|r| filter.matches(r))
            .collect())
    }

    /// `GET /use-cases/`
    pub async fn list_use_cases(&self) -> Result<Vec<UseCase>, ApiError> {
        let response = self.http.get(self.endpoint("use-cases/")?).send().await?;
        let body: UseCasesResponse = check(response).await?.json().await?;
        Ok(body.use_cases)
    }

    /// Fetches both collections the traceability matrix needs
    pub async fn fetch_dataset(&self) -> Result<Dataset, ApiError> {
        let filter = RequirementFilter::default();
        let requirements = self.list_requirements(&filter).await?;
        let use_cases = self.list_use_cases().await?;
        Ok(Dataset::new(requirements, use_cases))
    }

    /// `POST /requirements/`; the body is validated locally first
    pub async fn create_requirement(&self, request: &NewRequirement) -> Result<CreatedResponse, ApiError> {
        request.validate()?;
        let response = self
            .http
            .post(self.endpoint("requirements/")?)
            .json(request)
            .send()
            .await?;
        let created: CreatedResponse = check(response).await?.json().await?;
        log::info!("Created requirement {}", created.id);
        Ok(created)
    }

    /// `POST /use-cases/`; the body is validated locally first
    pub async fn create_use_case(&self, request: &NewUseCase) -> Result<CreatedResponse, ApiError> {
        request.validate()?;
        let response = self
            .http
            .post(self.endpoint("use-cases/")?)
            .json(request)
            .send()
            .await?;
        let created: CreatedResponse = check(response).await?.json().await?;
        log::info!("Created use case {}", created.id);
        Ok(created)
    }

    /// `GET /requirements/{id}/trace`
    pub async fn requirement_trace(&self, requirement_id: &str) -> Result<RequirementTrace, ApiError> {
        let response = self.http.get(self.trace_url(requirement_id)?).send().await?;
        Ok(check(response).await?.json().await?)
    }

    /// The id is percent-encoded as a single path segment
    fn trace_url(&self, requirement_id: &str) -> Result<url::Url, ApiError> {
        // Url drops "." and ".." segments instead of encoding them
        if matches!(requirement_id.trim(), "" | "." | "..") {
            return Err(ApiError::InvalidId(requirement_id.to_string()));
        }
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidBaseUrl(self.base.to_string()))?
            .pop_if_empty()
            .push("requirements")
            .push(requirement_id)
            .push("trace");
        Ok(url)
    }
}

/// Turns non-2xx replies into `ApiError::Status`, using the backend's `detail` when present
async fn check(response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    Err(ApiError::Status {
        status,
        detail: error_detail(&text),
    })
}

fn error_detail(body: &str) -> String {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(ErrorBody {
            detail: serde_json::Value::String(s),
        }) => s,
        Ok(ErrorBody { detail }) => detail.to_string(),
        Err(_) if body.trim().is_empty() => "no details".to_string(),
        Err(_) => body.trim().to_string(),
    }
}
