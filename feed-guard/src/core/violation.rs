//! Foreign key violations.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::store::{Row, RowId};

/// A row whose value in one column resolves to none of the edge's targets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    pub entity: String,
    pub row: RowId,
    pub column: String,
    pub value: String,
    /// The other non-empty columns of the row, in column order.
    pub context: Vec<(String, String)>,
}

impl Violation {
    /// Builds a violation for `column` of `row`, or `None` if the column is null.
    pub fn from_row(entity: &str, column: &str, row: &Row) -> Option<Self> {
        let value = row.get(column)?;
        let context = row
            .non_empty()
            .filter(|(name, _)| *name != column)
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect();
        Some(Self {
            entity: entity.to_string(),
            row: row.id,
            column: column.to_string(),
            value: value.to_string(),
            context,
        })
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} in {} is not a valid {} [",
            self.value, self.entity, self.column
        )?;
        for (i, (name, value)) in self.context.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{name}: {value}")?;
        }
        f.write_str("]")
    }
}
