use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Represents the type of a requirement
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash, Default)]
pub enum RequirementType {
    #[serde(rename = "FUNCTIONAL")]
    Functional,
    #[serde(rename = "NON_FUNCTIONAL")]
    NonFunctional,
    #[serde(rename = "BUSINESS")]
    Business,
    #[serde(rename = "TECHNICAL")]
    Technical,
    #[serde(rename = "SECURITY")]
    Security,
    #[serde(rename = "PERFORMANCE")]
    Performance,
    #[serde(rename = "USABILITY")]
    Usability,
    /// A value this client does not know; never sent to the backend
    #[default]
    #[serde(rename = "OTHER")]
    Other,
}

impl RequirementType {
    /// Types a requirement can be submitted with
    pub const ALL: [RequirementType; 7] = [
        RequirementType::Functional,
        RequirementType::NonFunctional,
        RequirementType::Business,
        RequirementType::Technical,
        RequirementType::Security,
        RequirementType::Performance,
        RequirementType::Usability,
    ];

    /// Wire name used by the REST backend (e.g. "NON_FUNCTIONAL")
    pub fn as_wire(&self) -> &'static str {
        match self {
            RequirementType::Functional => "FUNCTIONAL",
            RequirementType::NonFunctional => "NON_FUNCTIONAL",
            RequirementType::Business => "BUSINESS",
            RequirementType::Technical => "TECHNICAL",
            RequirementType::Security => "SECURITY",
            RequirementType::Performance => "PERFORMANCE",
            RequirementType::Usability => "USABILITY",
            RequirementType::Other => "OTHER",
        }
    }

    /// Parse a requirement type from a string (case-insensitive, `-` or `_`)
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "functional" => Some(RequirementType::Functional),
            "non_functional" | "nonfunctional" => Some(RequirementType::NonFunctional),
            "business" => Some(RequirementType::Business),
            "technical" => Some(RequirementType::Technical),
            "security" => Some(RequirementType::Security),
            "performance" => Some(RequirementType::Performance),
            "usability" => Some(RequirementType::Usability),
            _ => None,
        }
    }
}

impl<'de> Deserialize<'de> for RequirementType {
    /// Unknown or missing values become `Other` so one odd record cannot
    /// fail a whole listing
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
        Ok(raw
            .as_ref()
            .and_then(|v| v.as_str())
            .and_then(Self::parse)
            .unwrap_or_else(|| {
                log::debug!("Unrecognised requirement type {:?}", raw);
                RequirementType::Other
            }))
    }
}

impl fmt::Display for RequirementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequirementType::Functional => write!(f, "Functional"),
            RequirementType::NonFunctional => write!(f, "Non-Functional"),
            RequirementType::Business => write!(f, "Business"),
            RequirementType::Technical => write!(f, "Technical"),
            RequirementType::Security => write!(f, "Security"),
            RequirementType::Performance => write!(f, "Performance"),
            RequirementType::Usability => write!(f, "Usability"),
            RequirementType::Other => write!(f, "Other"),
        }
    }
}

/// Represents the review status of a requirement
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash, Default)]
pub enum RequirementStatus {
    #[default]
    #[serde(rename = "DRAFT")]
    Draft,
    #[serde(rename = "REVIEW")]
    Review,
    #[serde(rename = "APPROVED")]
    Approved,
    #[serde(rename = "IMPLEMENTED")]
    Implemented,
    #[serde(rename = "VERIFIED")]
    Verified,
    #[serde(rename = "REJECTED")]
    Rejected,
    /// A value this client does not know
    #[serde(rename = "OTHER")]
    Other,
}

impl RequirementStatus {
    pub const ALL: [RequirementStatus; 6] = [
        RequirementStatus::Draft,
        RequirementStatus::Review,
        RequirementStatus::Approved,
        RequirementStatus::Implemented,
        RequirementStatus::Verified,
        RequirementStatus::Rejected,
    ];

    pub fn as_wire(&self) -> &'static str {
        match self {
            RequirementStatus::Draft => "DRAFT",
            RequirementStatus::Review => "REVIEW",
            RequirementStatus::Approved => "APPROVED",
            RequirementStatus::Implemented => "IMPLEMENTED",
            RequirementStatus::Verified => "VERIFIED",
            RequirementStatus::Rejected => "REJECTED",
            RequirementStatus::Other => "OTHER",
        }
    }

    /// Parse a status from a string (case-insensitive)
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "draft" => Some(RequirementStatus::Draft),
            "review" => Some(RequirementStatus::Review),
            "approved" => Some(RequirementStatus::Approved),
            "implemented" => Some(RequirementStatus::Implemented),
            "verified" => Some(RequirementStatus::Verified),
            "rejected" => Some(RequirementStatus::Rejected),
            _ => None,
        }
    }
}

impl<'de> Deserialize<'de> for RequirementStatus {
    /// `null` means draft; unknown values become `Other`
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
        let Some(value) = raw else {
            return Ok(RequirementStatus::default());
        };
        Ok(value.as_str().and_then(Self::parse).unwrap_or_else(|| {
            log::debug!("Unrecognised requirement status {}", value);
            RequirementStatus::Other
        }))
    }
}

impl fmt::Display for RequirementStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequirementStatus::Draft => write!(f, "Draft"),
            RequirementStatus::Review => write!(f, "Review"),
            RequirementStatus::Approved => write!(f, "Approved"),
            RequirementStatus::Implemented => write!(f, "Implemented"),
            RequirementStatus::Verified => write!(f, "Verified"),
            RequirementStatus::Rejected => write!(f, "Rejected"),
            RequirementStatus::Other => write!(f, "Other"),
        }
    }
}

/// Lowest priority number accepted (highest importance)
pub const PRIORITY_HIGHEST: u8 = 1;
/// Highest priority number accepted (lowest importance)
pub const PRIORITY_LOWEST: u8 = 5;

fn default_priority() -> u8 {
    3
}

/// Represents a single requirement as served by the REST backend
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Requirement {
    /// Unique, stable identifier (`_id` on the wire)
    #[serde(rename = "_id", alias = "id")]
    pub id: String,

    /// Human-friendly identifier assigned by the backend (e.g., "REQ-7")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub req_id: Option<String>,

    /// Short title describing the requirement
    pub title: String,

    /// Detailed description of the requirement
    #[serde(default)]
    pub description: String,

    /// Type of the requirement
    #[serde(rename = "type", default)]
    pub req_type: RequirementType,

    /// Priority from 1 (highest) to 5 (lowest)
    #[serde(default = "default_priority", deserialize_with = "lenient_priority")]
    pub priority: u8,

    /// Current review status
    #[serde(default)]
    pub status: RequirementStatus,

    /// Acceptance criteria, in the order they were entered
    #[serde(default, deserialize_with = "null_as_default")]
    pub acceptance_criteria: Vec<String>,

    /// Names of the stakeholders interested in this requirement
    #[serde(default, deserialize_with = "null_as_default")]
    pub stakeholders: BTreeSet<String>,

    /// IDs of requirements this requirement depends on
    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<String>,

    /// When the requirement was created, if the backend recorded it
    #[serde(default, deserialize_with = "lenient_timestamp", skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Requirement {
    /// Creates a new draft requirement with the given id and title
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            req_id: None,
            title: title.into(),
            description: String::new(),
            req_type: RequirementType::Functional,
            priority: default_priority(),
            status: RequirementStatus::Draft,
            acceptance_criteria: Vec::new(),
            stakeholders: BTreeSet::new(),
            dependencies: Vec::new(),
            created_at: None,
        }
    }

    /// Label shown in tables: the backend's `req_id` or `REQ-<last 4 of id>`
    pub fn label(&self) -> String {
        self.req_id
            .clone()
            .unwrap_or_else(|| short_label("REQ", &self.id))
    }
}

/// Represents a use case referencing zero or more requirements
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UseCase {
    /// Unique identifier (`_id` on the wire)
    #[serde(rename = "_id", alias = "id")]
    pub id: String,

    /// Human-friendly identifier assigned by the backend (e.g., "UC-3")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uc_id: Option<String>,

    pub title: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub actor: String,

    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    pub main_flow: Vec<String>,

    #[serde(default = "default_priority")]
    pub priority: u8,

    /// IDs of the requirements this use case implements or verifies.
    /// Absent or `null` on the wire means no requirements.
    #[serde(default, deserialize_with = "null_as_default")]
    pub requirements: BTreeSet<String>,
}

impl UseCase {
    /// Creates a use case referencing the given requirement ids
    pub fn new<I, S>(id: impl Into<String>, title: impl Into<String>, requirements: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id: id.into(),
            uc_id: None,
            title: title.into(),
            description: String::new(),
            actor: String::new(),
            main_flow: Vec::new(),
            priority: default_priority(),
            requirements: requirements.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns true if this use case references the requirement id
    pub fn references(&self, requirement_id: &str) -> bool {
        self.requirements.contains(requirement_id)
    }

    /// Label shown in matrix headers: `uc_id` or `UC-<last 4 of id>`
    pub fn label(&self) -> String {
        self.uc_id
            .clone()
            .unwrap_or_else(|| short_label("UC", &self.id))
    }
}

/// Response envelope of `GET /requirements/`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RequirementsResponse {
    #[serde(default, deserialize_with = "null_as_default")]
    pub requirements: Vec<Requirement>,
}

/// Response envelope of `GET /use-cases/`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UseCasesResponse {
    #[serde(default, deserialize_with = "null_as_default")]
    pub use_cases: Vec<UseCase>,
}

/// Filters applied to a requirements listing. Every criterion that is set must match.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequirementFilter {
    /// Case-insensitive substring of the title
    pub title: Option<String>,
    pub req_type: Option<RequirementType>,
    pub priority: Option<u8>,
    pub status: Option<RequirementStatus>,
}

impl RequirementFilter {
    pub fn is_empty(&self) -> bool {
        self.title.as_deref().map_or(true, str::is_empty)
            && self.req_type.is_none()
            && self.priority.is_none()
            && self.status.is_none()
    }

    pub fn matches(&self, req: &Requirement) -> bool {
        if let Some(title) = self.title.as_deref().filter(|t| !t.is_empty()) {
            if !req.title.to_lowercase().contains(&title.to_lowercase()) {
                return false;
            }
        }
        self.req_type.map_or(true, |t| req.req_type == t)
            && self.priority.map_or(true, |p| req.priority == p)
            && self.status.map_or(true, |s| req.status == s)
    }

    /// Returns the matching requirements, preserving order
    pub fn apply<'a>(&self, requirements: &'a [Requirement]) -> Vec<&'a Requirement> {
        requirements.iter().filter(|r| self.matches(r)).collect()
    }
}

/// Badge text for a priority (e.g., "P1")
pub fn priority_label(priority: u8) -> String {
    format!("P{}", priority)
}

/// Short label built from the last four characters of an id (e.g., "REQ-9f3a")
pub fn short_label(prefix: &str, id: &str) -> String {
    let chars: Vec<char> = id.chars().collect();
    let start = chars.len().saturating_sub(4);
    let tail: String = chars[start..].iter().collect();
    format!("{}-{}", prefix, tail)
}

/// Treats an explicit `null` the same as a missing field
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Integer priorities in range are kept; anything else falls back to the default
fn lenient_priority<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(raw
        .as_ref()
        .and_then(|v| v.as_u64())
        .filter(|p| (PRIORITY_HIGHEST as u64..=PRIORITY_LOWEST as u64).contains(p))
        .map_or_else(default_priority, |p| p as u8))
}

/// Accepts RFC 3339 or naive ISO-8601 timestamps; anything else becomes `None`
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(raw.as_ref().and_then(|v| v.as_str()).and_then(parse_timestamp))
}

pub(crate) fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}
