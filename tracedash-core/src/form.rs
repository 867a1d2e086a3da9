//! Requirement and use-case submission
//!
//! Turns the raw text a user types into request bodies for the REST backend
//! and validates them with the same rules the backend enforces.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;

use crate::models::{RequirementType, PRIORITY_HIGHEST, PRIORITY_LOWEST};

const TITLE_MIN_CHARS: usize = 5;
const TITLE_MAX_CHARS: usize = 200;
const TITLE_MIN_WORDS: usize = 3;
const DESCRIPTION_MIN_CHARS: usize = 10;
const DESCRIPTION_MIN_WORDS: usize = 10;
const CRITERION_MIN_WORDS: usize = 3;
const ACTOR_MIN_CHARS: usize = 2;

/// A rule violated by a submission
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Title must be between {min} and {max} characters")]
    TitleLength { min: usize, max: usize },

    #[error("Title must be at least {0} words")]
    TitleWords(usize),

    #[error("Description must be at least {0} characters")]
    DescriptionLength(usize),

    #[error("Description must be at least {0} words")]
    DescriptionWords(usize),

    #[error("Priority must be between 1 and 5, got {0}")]
    Priority(i64),

    #[error("Priority must be a number between 1 and 5, got '{0}'")]
    PriorityNotNumber(String),

    #[error("Unknown requirement type '{0}'")]
    UnknownType(String),

    #[error("At least one acceptance criterion is required")]
    NoAcceptanceCriteria,

    #[error("Each criterion must be at least {min} words: '{criterion}'")]
    CriterionWords { criterion: String, min: usize },

    #[error("Actor must be at least {0} characters")]
    ActorLength(usize),

    #[error("Main flow must have at least one step")]
    EmptyMainFlow,

    #[error("Each step must start with a number followed by a period: '{0}'")]
    UnnumberedStep(String),
}

/// Body of `POST /requirements/`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewRequirement {
    pub title: String,
    pub description: String,
    #[serde(rename = "type")]
    pub req_type: RequirementType,
    pub priority: u8,
    pub acceptance_criteria: Vec<String>,
    pub stakeholders: Vec<String>,
}

impl NewRequirement {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_title(&self.title)?;

        if self.req_type == RequirementType::Other {
            return Err(ValidationError::UnknownType(self.req_type.as_wire().to_lowercase()));
        }

        if self.description.chars().count() < DESCRIPTION_MIN_CHARS {
            return Err(ValidationError::DescriptionLength(DESCRIPTION_MIN_CHARS));
        }
        if word_count(&self.description) < DESCRIPTION_MIN_WORDS {
            return Err(ValidationError::DescriptionWords(DESCRIPTION_MIN_WORDS));
        }

        validate_priority(self.priority as i64)?;

        if self.acceptance_criteria.is_empty() {
            return Err(ValidationError::NoAcceptanceCriteria);
        }
        for criterion in &self.acceptance_criteria {
            if word_count(criterion) < CRITERION_MIN_WORDS {
                return Err(ValidationError::CriterionWords {
                    criterion: criterion.clone(),
                    min: CRITERION_MIN_WORDS,
                });
            }
        }

        Ok(())
    }
}

/// Raw form fields as typed by the user
///
/// The form keeps its contents after a failed submission so the user can
/// correct them and try again.
#[derive(Debug, Clone, PartialEq)]
pub struct RequirementForm {
    pub title: String,
    pub description: String,
    pub req_type: String,
    pub priority: String,
    /// One criterion per line
    pub acceptance_criteria: String,
    /// Comma-separated names
    pub stakeholders: String,
}

impl Default for RequirementForm {
    fn default() -> Self {
        Self {
            title: String::new(),
            description: String::new(),
            req_type: RequirementType::Functional.as_wire().to_string(),
            priority: "3".to_string(),
            acceptance_criteria: String::new(),
            stakeholders: String::new(),
        }
    }
}

impl RequirementForm {
    /// Builds and validates the request body
    pub fn to_request(&self) -> Result<NewRequirement, ValidationError> {
        let req_type = RequirementType::parse(&self.req_type)
            .ok_or_else(|| ValidationError::UnknownType(self.req_type.clone()))?;

        let priority: i64 = self
            .priority
            .trim()
            .parse()
            .map_err(|_| ValidationError::PriorityNotNumber(self.priority.clone()))?;
        validate_priority(priority)?;

        let request = NewRequirement {
            title: self.title.trim().to_string(),
            description: self.description.trim().to_string(),
            req_type,
            priority: priority as u8,
            acceptance_criteria: split_lines(&self.acceptance_criteria),
            stakeholders: split_commas(&self.stakeholders),
        };
        request.validate()?;
        Ok(request)
    }

    /// Resets every field to its initial value (after a successful submit)
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Body of `POST /use-cases/`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewUseCase {
    pub title: String,
    pub description: String,
    pub actor: String,
    #[serde(default)]
    pub preconditions: Vec<String>,
    #[serde(default)]
    pub postconditions: Vec<String>,
    pub main_flow: Vec<String>,
    #[serde(default)]
    pub alternative_flows: Vec<String>,
    #[serde(default)]
    pub requirements: BTreeSet<String>,
    pub priority: u8,
}

impl NewUseCase {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let title_len = self.title.chars().count();
        if !(TITLE_MIN_CHARS..=TITLE_MAX_CHARS).contains(&title_len) {
            return Err(ValidationError::TitleLength {
                min: TITLE_MIN_CHARS,
                max: TITLE_MAX_CHARS,
            });
        }
        if self.description.chars().count() < DESCRIPTION_MIN_CHARS {
            return Err(ValidationError::DescriptionLength(DESCRIPTION_MIN_CHARS));
        }
        if self.actor.chars().count() < ACTOR_MIN_CHARS {
            return Err(ValidationError::ActorLength(ACTOR_MIN_CHARS));
        }
        if self.main_flow.is_empty() {
            return Err(ValidationError::EmptyMainFlow);
        }
        for step in &self.main_flow {
            if !is_numbered_step(step) {
                return Err(ValidationError::UnnumberedStep(step.clone()));
            }
        }
        validate_priority(self.priority as i64)
    }
}

fn validate_title(title: &str) -> Result<(), ValidationError> {
    let len = title.chars().count();
    if !(TITLE_MIN_CHARS..=TITLE_MAX_CHARS).contains(&len) {
        return Err(ValidationError::TitleLength {
            min: TITLE_MIN_CHARS,
            max: TITLE_MAX_CHARS,
        });
    }
    if word_count(title) < TITLE_MIN_WORDS {
        return Err(ValidationError::TitleWords(TITLE_MIN_WORDS));
    }
    Ok(())
}

fn validate_priority(priority: i64) -> Result<(), ValidationError> {
    if priority < PRIORITY_HIGHEST as i64 || priority > PRIORITY_LOWEST as i64 {
        return Err(ValidationError::Priority(priority));
    }
    Ok(())
}

/// Steps look like "1. User opens the page"
fn is_numbered_step(step: &str) -> bool {
    let mut chars = step.trim_start().chars();
    matches!(
        (chars.next(), chars.next()),
        (Some(d), Some('.')) if ('1'..='9').contains(&d)
    )
}

fn word_count(s: &str) -> usize {
    s.split_whitespace().count()
}

/// Splits on newlines, dropping blank lines
pub fn split_lines(s: &str) -> Vec<String> {
    s.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(String::from)
        .collect()
}

/// Splits on commas, trimming each name and dropping empties
pub fn split_commas(s: &str) -> Vec<String> {
    s.split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_form() -> RequirementForm {
        RequirementForm {
            title: "Export the traceability matrix".to_string(),
            description: "The operator can export the full traceability matrix as a markdown document for audits".to_string(),
            req_type: "NON_FUNCTIONAL".to_string(),
            priority: "2".to_string(),
            acceptance_criteria: "Markdown file is written\n\n  Every requirement has a row  \n".to_string(),
            stakeholders: "QA, Operations , ,Audit".to_string(),
        }
    }

    #[test]
    fn test_valid_form_builds_request() {
        let request = valid_form().to_request().unwrap();
        assert_eq!(request.req_type, RequirementType::NonFunctional);
        assert_eq!(request.priority, 2);
        assert_eq!(
            request.acceptance_criteria,
            vec!["Markdown file is written", "Every requirement has a row"]
        );
        assert_eq!(request.stakeholders, vec!["QA", "Operations", "Audit"]);

        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(body["type"], "NON_FUNCTIONAL");
        assert!(body["acceptance_criteria"].is_array());
    }

    #[test]
    fn test_short_title_rejected() {
        let mut form = valid_form();
        form.title = "Export matrix".to_string();
        assert_eq!(form.to_request(), Err(ValidationError::TitleWords(3)));

        form.title = "abc".to_string();
        assert!(matches!(form.to_request(), Err(ValidationError::TitleLength { .. })));
    }

    #[test]
    fn test_description_word_count() {
        let mut form = valid_form();
        form.description = "Too short to be a real description".to_string();
        assert_eq!(form.to_request(), Err(ValidationError::DescriptionWords(10)));
    }

    #[test]
    fn test_priority_bounds() {
        let mut form = valid_form();
        form.priority = "0".to_string();
        assert_eq!(form.to_request(), Err(ValidationError::Priority(0)));
        form.priority = "6".to_string();
        assert_eq!(form.to_request(), Err(ValidationError::Priority(6)));
        form.priority = "high".to_string();
        assert!(matches!(form.to_request(), Err(ValidationError::PriorityNotNumber(_))));
        form.priority = " 5 ".to_string();
        assert!(form.to_request().is_ok());
    }

    #[test]
    fn test_acceptance_criteria_rules() {
        let mut form = valid_form();
        form.acceptance_criteria = "\n \n".to_string();
        assert_eq!(form.to_request(), Err(ValidationError::NoAcceptanceCriteria));

        form.acceptance_criteria = "Works fine".to_string();
        assert!(matches!(form.to_request(), Err(ValidationError::CriterionWords { .. })));
    }

    #[test]
    fn test_unknown_type() {
        let mut form = valid_form();
        form.req_type = "security".to_string();
        assert_eq!(form.to_request(), Err(ValidationError::UnknownType("security".to_string())));
    }

    #[test]
    fn test_failed_submit_keeps_form_and_clear_resets() {
        let mut form = valid_form();
        form.priority = "9".to_string();
        let before = form.clone();
        assert!(form.to_request().is_err());
        assert_eq!(form, before);

        form.clear();
        assert_eq!(form, RequirementForm::default());
        assert_eq!(form.req_type, "FUNCTIONAL");
    }

    #[test]
    fn test_use_case_validation() {
        let mut uc = NewUseCase {
            title: "Operator exports report".to_string(),
            description: "Operator exports the coverage report".to_string(),
            actor: "Operator".to_string(),
            preconditions: vec![],
            postconditions: vec![],
            main_flow: vec!["1. Open matrix".to_string(), "2. Click export".to_string()],
            alternative_flows: vec![],
            requirements: ["r1".to_string()].into_iter().collect(),
            priority: 3,
        };
        assert!(uc.validate().is_ok());

        uc.main_flow.push("Then done".to_string());
        assert_eq!(uc.validate(), Err(ValidationError::UnnumberedStep("Then done".to_string())));

        uc.main_flow.clear();
        assert_eq!(uc.validate(), Err(ValidationError::EmptyMainFlow));

        uc.main_flow = vec!["1. Go".to_string()];
        uc.actor = "A".to_string();
        assert_eq!(uc.validate(), Err(ValidationError::ActorLength(2)));
    }

    #[test]
    fn test_unrecognised_type_is_never_submitted() {
        let mut request = valid_form().to_request().unwrap();
        request.req_type = RequirementType::Other;
        assert_eq!(request.validate(), Err(ValidationError::UnknownType("other".to_string())));

        let mut form = valid_form();
        form.req_type = "security".to_string();
        assert_eq!(form.to_request().unwrap().req_type, RequirementType::Security);
    }
}
