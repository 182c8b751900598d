//! # Request Body Extraction
//!
//! The [`Validate`] trait for request DTOs and helpers that map JSON
//! rejections onto [`AppError`].

use axum::extract::rejection::JsonRejection;
use axum::Json;

use crate::error::AppError;

/// Business-rule validation beyond what serde checks.
pub trait Validate {
    /// Returns an error message on failure.
    fn validate(&self) -> Result<(), String>;
}

/// Extract a JSON body, mapping deserialization errors to [`AppError::BadRequest`].
///
/// ```ignore
/// async fn handler(body: Result<Json<T>, JsonRejection>) -> Result<..., AppError> {
///     let req = extract_json(body)?;
/// }
/// ```
pub fn extract_json<T>(result: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    result
        .map(|Json(v)| v)
        .map_err(|err| AppError::BadRequest(err.body_text()))
}

/// Extract a JSON body and run [`Validate::validate`] on it.
pub fn extract_validated_json<T: Validate>(
    result: Result<Json<T>, JsonRejection>,
) -> Result<T, AppError> {
    let value = extract_json(result)?;
    value.validate().map_err(AppError::Validation)?;
    Ok(value)
}

/// Reject empty or whitespace-only string fields.
pub fn require_non_blank(field: &str, value: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{field} must not be empty"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Title(String);

    impl Validate for Title {
        fn validate(&self) -> Result<(), String> {
            require_non_blank("title", &self.0)
        }
    }

    #[test]
    fn validated_json_passes_valid_body() {
        let title = extract_validated_json(Ok(Json(Title("Roadmap".into())))).unwrap();
        assert_eq!(title.0, "Roadmap");
    }

    #[test]
    fn validated_json_maps_rule_failure() {
        let err = extract_validated_json(Ok(Json(Title("  ".into())))).unwrap_err();
        assert!(matches!(err, AppError::Validation(ref m) if m == "title must not be empty"));
    }
}
