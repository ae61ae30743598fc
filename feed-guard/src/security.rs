//! Security utilities for feed-guard.
//!
//! Entity and column names reach SQL text through string interpolation: they
//! come from the static schema but also from the headers of imported files,
//! which are untrusted. Every such name goes through [`SqlSecurity`] first.

use crate::error::{StoreError, StoreResult};
use once_cell::sync::Lazy;
use regex::Regex;

/// Maximum accepted identifier length.
const MAX_IDENTIFIER_LENGTH: usize = 128;

/// SQL identifier validation and escaping utilities.
pub struct SqlSecurity;

impl SqlSecurity {
    /// Validates and escapes a SQL identifier (entity or column name).
    ///
    /// # Examples
    /// ```rust
    /// use feed_guard::security::SqlSecurity;
    ///
    /// assert_eq!(SqlSecurity::escape_identifier("stop_id").unwrap(), "\"stop_id\"");
    /// assert!(SqlSecurity::escape_identifier("stop_id; DROP TABLE stops--").is_err());
    /// assert!(SqlSecurity::escape_identifier(&"very_long_name_".repeat(100)).is_err());
    /// ```
    pub fn escape_identifier(identifier: &str) -> StoreResult<String> {
        Self::validate_identifier(identifier)?;
        Ok(format!("\"{identifier}\""))
    }

    /// Validates a SQL identifier without escaping it.
    ///
    /// Accepted names start with a letter or underscore and contain only
    /// ASCII letters, digits and underscores. Names such as `drop_off_type`
    /// are legal: identifiers are always quoted, so keywords inside a name
    /// carry no meaning to the engine.
    pub fn validate_identifier(identifier: &str) -> StoreResult<()> {
        if identifier.trim().is_empty() {
            return Err(StoreError::Security(
                "SQL identifier cannot be empty or whitespace-only".to_string(),
            ));
        }

        if identifier.len() > MAX_IDENTIFIER_LENGTH {
            return Err(StoreError::Security(format!(
                "SQL identifier too long (max {MAX_IDENTIFIER_LENGTH} characters)"
            )));
        }

        if identifier.contains('\0') {
            return Err(StoreError::Security(
                "SQL identifier cannot contain null bytes".to_string(),
            ));
        }

        static IDENTIFIER_REGEX: Lazy<Regex> = Lazy::new(|| {
            // This regex is compile-time constant and known to be valid
            #[allow(clippy::expect_used)]
            Regex::new(r"^[a-zA-Z_][a-zA-Z0-9_]*$").expect("Hard-coded regex pattern should be valid")
        });

        if !IDENTIFIER_REGEX.is_match(identifier) {
            return Err(StoreError::Security(format!(
                "Invalid SQL identifier format: '{identifier}'. Identifiers must start with a letter or underscore and contain only letters, numbers and underscores"
            )));
        }

        Ok(())
    }

    /// Escapes every identifier in `identifiers` and joins them with `", "`.
    pub fn escape_list<'a>(identifiers: impl IntoIterator<Item = &'a str>) -> StoreResult<String> {
        let escaped = identifiers
            .into_iter()
            .map(Self::escape_identifier)
            .collect::<StoreResult<Vec<_>>>()?;
        Ok(escaped.join(", "))
    }
}
