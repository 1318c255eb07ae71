//! Input validation shared by the adapter's operations.

use crate::errors::SearchAdapterError;

/// Validate that an index name is present.
///
/// # Returns
///
/// * `Ok(())` - If the name is non-empty
/// * `Err(SearchAdapterError::ValidationError)` - If it is empty or blank
pub fn validate_index(index: &str) -> Result<(), SearchAdapterError> {
    if index.trim().is_empty() {
        return Err(SearchAdapterError::validation("index is required"));
    }
    Ok(())
}

/// Validate that a document id is present.
pub fn validate_id(field_name: &str, id: &str) -> Result<(), SearchAdapterError> {
    if id.is_empty() {
        return Err(SearchAdapterError::validation(format!(
            "{} is required",
            field_name
        )));
    }
    Ok(())
}
