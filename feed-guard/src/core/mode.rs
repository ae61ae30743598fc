//! Validation modes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// What the validator does once it has found violations.
///
/// Every mode reports the violations of the first pass. The modes differ in
/// how they treat the store and the call's outcome:
///
/// - **Strict**: fail with [`FeedError::InvalidInput`](crate::error::FeedError::InvalidInput)
///   carrying the violations. The store is never modified.
/// - **Repair**: delete offending rows, re-validating until nothing dangles.
///   The store ends up consistent.
/// - **Permissive**: report the violations and leave the store as it is.
///
/// # Examples
///
/// ```rust
/// use feed_guard::core::ValidationMode;
///
/// assert_eq!(ValidationMode::default(), ValidationMode::Strict);
/// assert!(ValidationMode::Repair.mutates());
/// assert_eq!("permissive".parse::<ValidationMode>().unwrap(), ValidationMode::Permissive);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ValidationMode {
    #[default]
    Strict,
    Repair,
    Permissive,
}

impl ValidationMode {
    /// Returns the string representation of the mode.
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationMode::Strict => "strict",
            ValidationMode::Repair => "repair",
            ValidationMode::Permissive => "permissive",
        }
    }

    /// Whether this mode deletes rows.
    pub fn mutates(&self) -> bool {
        matches!(self, ValidationMode::Repair)
    }

    /// Whether violations fail the call.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ValidationMode::Strict)
    }
}

impl fmt::Display for ValidationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ValidationMode {
    type Err = crate::error::FeedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "strict" => Ok(ValidationMode::Strict),
            "repair" => Ok(ValidationMode::Repair),
            "permissive" => Ok(ValidationMode::Permissive),
            other => Err(crate::error::FeedError::Configuration(format!(
                "unknown validation mode '{other}'"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_display() {
        assert_eq!(ValidationMode::Strict.to_string(), "strict");
        assert_eq!(ValidationMode::Repair.to_string(), "repair");
        assert_eq!(ValidationMode::Permissive.to_string(), "permissive");
    }

    #[test]
    fn test_mode_flags() {
        assert!(ValidationMode::Strict.is_fatal());
        assert!(!ValidationMode::Strict.mutates());
        assert!(ValidationMode::Repair.mutates());
        assert!(!ValidationMode::Permissive.mutates());
        assert!(!ValidationMode::Permissive.is_fatal());
    }

    #[test]
    fn test_mode_parse() {
        assert_eq!("Repair".parse::<ValidationMode>().unwrap(), ValidationMode::Repair);
        assert!("force".parse::<ValidationMode>().is_err());
    }

    #[test]
    fn test_mode_serde() {
        let json = serde_json::to_string(&ValidationMode::Repair).unwrap();
        assert_eq!(json, "\"repair\"");

        let mode: ValidationMode = serde_json::from_str("\"permissive\"").unwrap();
        assert_eq!(mode, ValidationMode::Permissive);
    }
}
