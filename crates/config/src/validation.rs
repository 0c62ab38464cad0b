//! Validation for configuration values

pub use crate::error::ValidationError;

/// Trait for configuration sections that can validate themselves
pub trait ConfigSection: Default {
    /// Validates the configuration section
    fn validate(&self) -> Result<(), Vec<ValidationError>>;

    /// Returns the section name for error reporting
    fn section_name(&self) -> &'static str;
}

/// Common validators for config values
pub struct Validator;

impl Validator {
    /// Validates that a string is not empty after trimming
    pub fn not_empty(value: &str, field: &str) -> Result<(), ValidationError> {
        if value.trim().is_empty() {
            Err(ValidationError::new(field, "must not be empty"))
        } else {
            Ok(())
        }
    }

    /// Validates that a numeric value is not negative
    pub fn not_negative(value: i64, field: &str) -> Result<(), ValidationError> {
        if value < 0 {
            Err(ValidationError::with_value(
                field,
                "must not be negative",
                value,
            ))
        } else {
            Ok(())
        }
    }

    /// Collects multiple validation results into a single result
    pub fn collect_errors(
        results: Vec<Result<(), ValidationError>>,
    ) -> Result<(), Vec<ValidationError>> {
        let errors: Vec<ValidationError> = results.into_iter().filter_map(|r| r.err()).collect();

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_empty() {
        assert!(Validator::not_empty("x", "f").is_ok());
        assert!(Validator::not_empty("  ", "f").is_err());
    }

    #[test]
    fn test_not_negative() {
        assert!(Validator::not_negative(0, "f").is_ok());
        assert!(Validator::not_negative(-1, "f").is_err());
    }

    #[test]
    fn test_collect_errors() {
        let ok = Validator::collect_errors(vec![Ok(()), Ok(())]);
        assert!(ok.is_ok());

        let err = Validator::collect_errors(vec![
            Ok(()),
            Err(ValidationError::new("a", "bad")),
            Err(ValidationError::new("b", "worse")),
        ]);
        assert_eq!(err.unwrap_err().len(), 2);
    }
}
