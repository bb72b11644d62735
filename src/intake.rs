use crate::error::ChatError;

/// Validate the symptom intake form and compose the opening message.
/// Empty symptoms fail here, before any request is issued; optional
/// details are appended under a labelled blank-line separator.
pub fn compose_opening_message(
    symptoms: &str,
    additional_details: &str
) -> Result<String, ChatError> {
    let symptoms = symptoms.trim();
    if symptoms.is_empty() {
        return Err(ChatError::EmptySymptoms);
    }

    let details = additional_details.trim();
    if details.is_empty() {
        Ok(symptoms.to_string())
    } else {
        Ok(format!("{}\n\nAdditional details: {}", symptoms, details))
    }
}
