//! Rendering of validation reports for people and for machines.
//!
//! # Examples
//!
//! ```rust
//! use feed_guard::core::{ValidationMode, ValidationReport};
//! use feed_guard::formatters::{HumanFormatter, ReportFormatter};
//!
//! let report = ValidationReport::new(ValidationMode::Permissive);
//! let output = HumanFormatter::new().format(&report).unwrap();
//! assert!(output.contains("consistent"));
//! ```

use std::fmt::Write;

use crate::core::{ValidationOutcome, ValidationReport};
use crate::error::{FeedError, Result};

/// Configuration options for formatting validation reports.
#[derive(Debug, Clone)]
pub struct FormatterConfig {
    /// Maximum number of violations to list (`None` for all)
    pub max_violations: Option<usize>,
    /// Whether to use colorized output (human formatter)
    pub use_colors: bool,
    /// Whether to include the report timestamp
    pub include_timestamps: bool,
    /// Whether to pretty-print JSON
    pub pretty: bool,
}

impl Default for FormatterConfig {
    fn default() -> Self {
        Self {
            max_violations: None,
            use_colors: true,
            include_timestamps: true,
            pretty: true,
        }
    }
}

impl FormatterConfig {
    /// Summary only.
    pub fn minimal() -> Self {
        Self {
            max_violations: Some(0),
            use_colors: false,
            include_timestamps: false,
            pretty: false,
        }
    }

    /// Creates a configuration suitable for CI/CD environments.
    pub fn ci() -> Self {
        Self {
            max_violations: Some(50),
            use_colors: false,
            include_timestamps: true,
            pretty: true,
        }
    }

    pub fn with_max_violations(mut self, max: usize) -> Self {
        self.max_violations = Some(max);
        self
    }

    pub fn with_colors(mut self, use_colors: bool) -> Self {
        self.use_colors = use_colors;
        self
    }

    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    fn shown(&self, total: usize) -> usize {
        self.max_violations.map_or(total, |max| max.min(total))
    }
}

/// Renders a [`ValidationReport`] into a string.
///
/// ```rust
/// use feed_guard::core::ValidationReport;
/// use feed_guard::formatters::ReportFormatter;
///
/// struct CountFormatter;
///
/// impl ReportFormatter for CountFormatter {
///     fn format(&self, report: &ValidationReport) -> feed_guard::error::Result<String> {
///         Ok(format!("{} violation(s)", report.violations.len()))
///     }
/// }
/// ```
pub trait ReportFormatter {
    fn format(&self, report: &ValidationReport) -> Result<String>;

    /// Formats with a configuration other than the formatter's own.
    fn format_with_config(
        &self,
        report: &ValidationReport,
        _config: &FormatterConfig,
    ) -> Result<String> {
        self.format(report)
    }
}

/// Formats reports as JSON with `serde_json`.
#[derive(Debug, Clone, Default)]
pub struct JsonFormatter {
    config: FormatterConfig,
}

impl JsonFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: FormatterConfig) -> Self {
        Self { config }
    }
}

impl ReportFormatter for JsonFormatter {
    fn format(&self, report: &ValidationReport) -> Result<String> {
        self.format_with_config(report, &self.config)
    }

    fn format_with_config(
        &self,
        report: &ValidationReport,
        config: &FormatterConfig,
    ) -> Result<String> {
        let filtered = filter_report(report, config);
        let json = if config.pretty {
            serde_json::to_string_pretty(&filtered)
        } else {
            serde_json::to_string(&filtered)
        };
        json.map_err(|e| FeedError::Serialization(format!("Failed to serialize report to JSON: {e}")))
    }
}

/// Formats reports for terminals and logs: a summary line, then one line per
/// violation.
#[derive(Debug, Clone, Default)]
pub struct HumanFormatter {
    config: FormatterConfig,
}

impl HumanFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: FormatterConfig) -> Self {
        Self { config }
    }
}

impl ReportFormatter for HumanFormatter {
    fn format(&self, report: &ValidationReport) -> Result<String> {
        self.format_with_config(report, &self.config)
    }

    fn format_with_config(
        &self,
        report: &ValidationReport,
        config: &FormatterConfig,
    ) -> Result<String> {
        let mut output = String::new();
        write_human(&mut output, report, config)
            .map_err(|e| FeedError::Serialization(format!("Failed to format report: {e}")))?;
        Ok(output)
    }
}

fn write_human(
    output: &mut String,
    report: &ValidationReport,
    config: &FormatterConfig,
) -> std::fmt::Result {
    let (summary, color) = match report.outcome {
        ValidationOutcome::Consistent => ("Feed is consistent".to_string(), "32"),
        ValidationOutcome::Repaired {
            passes,
            rows_deleted,
        } => (
            format!(
                "Repaired {} violation(s): deleted {rows_deleted} row(s) in {passes} pass(es)",
                report.violations.len()
            ),
            "33",
        ),
        ValidationOutcome::Retained => (
            format!("Retained {} violation(s)", report.violations.len()),
            "33",
        ),
    };
    if config.use_colors {
        writeln!(output, "\x1b[{color}m{summary}\x1b[0m")?;
    } else {
        writeln!(output, "{summary}")?;
    }
    writeln!(output, "Mode: {}", report.mode)?;
    if config.include_timestamps {
        writeln!(output, "Timestamp: {}", report.timestamp)?;
    }

    let shown = config.shown(report.violations.len());
    for violation in &report.violations[..shown] {
        writeln!(output, "  {violation}")?;
    }
    if report.violations.len() > shown {
        writeln!(
            output,
            "  ... and {} more violation(s)",
            report.violations.len() - shown
        )?;
    }
    Ok(())
}

fn filter_report(report: &ValidationReport, config: &FormatterConfig) -> ValidationReport {
    let mut filtered = report.clone();
    filtered.violations.truncate(config.shown(report.violations.len()));
    if !config.include_timestamps {
        filtered.timestamp = String::new();
    }
    filtered
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ValidationMode, Violation};
    use crate::store::RowId;

    fn repaired_report() -> ValidationReport {
        let mut report = ValidationReport::new(ValidationMode::Repair);
        for (row, value) in [(1, "GHOST"), (2, "PHANTOM")] {
            report.violations.push(Violation {
                entity: "stop_times".to_string(),
                row: RowId(row),
                column: "stop_id".to_string(),
                value: value.to_string(),
                context: vec![("trip_id".to_string(), "T1".to_string())],
            });
        }
        report.passes = 3;
        report.rows_deleted = 2;
        report.outcome = ValidationOutcome::Repaired {
            passes: 2,
            rows_deleted: 2,
        };
        report
    }

    #[test]
    fn test_formatter_config() {
        let config = FormatterConfig::default();
        assert!(config.use_colors);
        assert_eq!(config.max_violations, None);

        let minimal = FormatterConfig::minimal();
        assert_eq!(minimal.max_violations, Some(0));
        assert!(!minimal.pretty);

        let ci = FormatterConfig::ci();
        assert!(!ci.use_colors);
        assert_eq!(ci.max_violations, Some(50));
    }

    #[test]
    fn test_json_formatter() {
        let output = JsonFormatter::new().format(&repaired_report()).unwrap();
        assert!(output.contains("\"status\": \"repaired\""));
        assert!(output.contains("\"mode\": \"repair\""));
        assert!(output.contains("PHANTOM"));

        let compact = JsonFormatter::with_config(FormatterConfig::minimal())
            .format(&repaired_report())
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&compact).unwrap();
        assert_eq!(value["violations"].as_array().map(Vec::len), Some(0));
        assert_eq!(value["rows_deleted"], 2);
        assert!(!compact.contains('\n'));
    }

    #[test]
    fn test_human_formatter() {
        let config = FormatterConfig::default().with_colors(false);
        let output = HumanFormatter::with_config(config)
            .format(&repaired_report())
            .unwrap();

        assert!(output.starts_with("Repaired 2 violation(s): deleted 2 row(s) in 2 pass(es)\n"));
        assert!(output.contains("Mode: repair"));
        assert!(output.contains("  GHOST in stop_times is not a valid stop_id [trip_id: T1]"));
        assert!(!output.contains("\x1b["));
    }

    #[test]
    fn test_max_violations() {
        let config = FormatterConfig::default()
            .with_colors(false)
            .with_max_violations(1);
        let output = HumanFormatter::new()
            .format_with_config(&repaired_report(), &config)
            .unwrap();
        assert!(output.contains("GHOST"));
        assert!(!output.contains("PHANTOM"));
        assert!(output.contains("... and 1 more violation(s)"));
    }

    #[test]
    fn test_consistent_report() {
        let report = ValidationReport::new(ValidationMode::Strict);
        let output = HumanFormatter::new().format(&report).unwrap();
        assert!(output.contains("\x1b[32mFeed is consistent"));
    }
}
