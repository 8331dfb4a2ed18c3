use crate::error::{ChatError, Result};

/// Check a user turn before anything is sent.
///
/// Returns the input unchanged; whitespace-only input counts as empty.
pub fn validate_query(input: &str) -> Result<&str> {
    if input.trim().is_empty() {
        return Err(ChatError::Validation(
            "Question must not be empty".to_string(),
        ));
    }

    Ok(input)
}
