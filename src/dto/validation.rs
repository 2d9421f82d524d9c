//! Validation helpers for DTOs.

use std::collections::HashSet;

use validator::ValidationError;

use crate::dao::models::Category;

/// Validates that a category selection is non-empty and free of repeats.
///
/// Selection order matters to the distribution plan, so duplicates are
/// rejected rather than silently deduplicated.
pub fn validate_selected_categories(categories: &Vec<Category>) -> Result<(), ValidationError> {
    if categories.is_empty() {
        let mut err = ValidationError::new("categories_empty");
        err.message = Some("at least one category must be selected".into());
        return Err(err);
    }

    let mut seen = HashSet::new();
    for category in categories {
        if !seen.insert(category) {
            let mut err = ValidationError::new("categories_duplicate");
            err.message = Some(format!("category `{category}` selected more than once").into());
            return Err(err);
        }
    }

    Ok(())
}

/// Validates that a submitted answer carries visible content.
pub fn validate_answer_text(answer: &str) -> Result<(), ValidationError> {
    if answer.trim().is_empty() {
        let mut err = ValidationError::new("answer_empty");
        err.message = Some("submitted answer must not be blank".into());
        return Err(err);
    }

    Ok(())
}
