use anyhow::Result;
use inquire::{Confirm, Editor, Select, Text};

use tracedash_core::{RequirementForm, RequirementType};

/// Prompts for every field of a requirement, using the current form
/// contents as defaults so a retry keeps the previous answers
pub fn prompt_requirement_form(form: &mut RequirementForm) -> Result<()> {
    form.title = Text::new("Title:")
        .with_initial_value(&form.title)
        .with_help_message("5-200 characters, at least 3 words")
        .prompt()?;

    form.description = Editor::new("Description:")
        .with_predefined_text(&form.description)
        .with_help_message("At least 10 words")
        .prompt()?;

    let type_options = RequirementType::ALL.to_vec();
    let current_type = RequirementType::parse(&form.req_type)
        .and_then(|t| type_options.iter().position(|o| *o == t))
        .unwrap_or(0);
    let req_type = Select::new("Type:", type_options)
        .with_starting_cursor(current_type)
        .prompt()?;
    form.req_type = req_type.as_wire().to_string();

    form.priority = Text::new("Priority (1 highest - 5 lowest):")
        .with_initial_value(&form.priority)
        .prompt()?;

    form.acceptance_criteria = Editor::new("Acceptance criteria:")
        .with_predefined_text(&form.acceptance_criteria)
        .with_help_message("One criterion per line, at least 3 words each")
        .prompt()?;

    form.stakeholders = Text::new("Stakeholders (comma separated):")
        .with_initial_value(&form.stakeholders)
        .prompt()?;

    Ok(())
}

/// Asks whether to edit the answers and submit again
pub fn prompt_retry() -> Result<bool> {
    Ok(Confirm::new("Edit and try again?").with_default(true).prompt()?)
}
