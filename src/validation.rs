//! Domain checks shared by the tool handlers.

use crate::types::{Error, InstanceId, RecipeId, Result};

/// Validate that a string is not empty (whitespace counts as empty).
pub fn validate_non_empty(s: &str, field: &str) -> Result<()> {
    if s.trim().is_empty() {
        return Err(Error::validation(format!("{} cannot be empty", field)));
    }
    Ok(())
}

/// Reject `.` and `..`, which a URL path would drop or resolve instead of
/// addressing a resource.
pub fn validate_path_segment(s: &str, field: &str) -> Result<()> {
    if matches!(s.trim(), "." | "..") {
        return Err(Error::validation(format!(
            "{} '{}' is not a valid identifier",
            field, s
        )));
    }
    Ok(())
}

pub fn recipe_id(raw: &str) -> Result<RecipeId> {
    validate_non_empty(raw, "recipe_id")?;
    validate_path_segment(raw, "recipe_id")?;
    RecipeId::from_string(raw).map_err(Error::validation)
}

pub fn instance_id(raw: &str) -> Result<InstanceId> {
    validate_non_empty(raw, "instance_id")?;
    validate_path_segment(raw, "instance_id")?;
    InstanceId::from_string(raw).map_err(Error::validation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ErrorKind;

    #[test]
    fn test_validate_non_empty() {
        assert!(validate_non_empty("r1", "recipe_id").is_ok());
        let err = validate_non_empty("", "recipe_id").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(err.to_string(), "validation error: recipe_id cannot be empty");
    }

    #[test]
    fn test_typed_ids() {
        assert_eq!(recipe_id("r1").unwrap().as_str(), "r1");
        assert!(instance_id(" ").is_err());
    }

    #[test]
    fn test_dot_segments_rejected() {
        assert_eq!(instance_id("..").unwrap_err().kind(), ErrorKind::Validation);
        assert!(recipe_id(".").is_err());
        // Other separators are escaped by the client, not rejected here.
        assert!(instance_id("../recipes/r1").is_ok());
    }
}
