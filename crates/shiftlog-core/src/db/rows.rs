//! Row encoding shared by the local and remote shift tables.
//!
//! Column order is always `id, started_at, ended_at, breaks, updated_at`.
//! Timestamps are integer microseconds; breaks are a JSON array.

use libsql::{Row, Value};

use crate::error::{Error, Result};
use crate::models::{BreakInterval, Shift, ShiftId};
use crate::util::{from_storage_micros, to_storage_micros};

/// Column list matching [`shift_values`] and [`shift_from_row`]
pub const SHIFT_COLUMNS: &str = "id, started_at, ended_at, breaks, updated_at";

/// Parameter values for the five shift columns, in column order
pub fn shift_values(shift: &Shift) -> Result<Vec<Value>> {
    let ended_at = shift
        .ended_at
        .ended_at()
        .map_or(Value::Null, |at| Value::Integer(to_storage_micros(at)));

    Ok(vec![
        Value::Text(shift.id.to_string()),
        Value::Integer(to_storage_micros(shift.started_at)),
        ended_at,
        Value::Text(serde_json::to_string(&shift.breaks)?),
        Value::Integer(to_storage_micros(shift.updated_at)),
    ])
}

/// Decode a shift from five consecutive columns starting at `first`
pub fn shift_from_row(row: &Row, first: i32) -> Result<Shift> {
    let id: String = row.get(first)?;
    let started_at: i64 = row.get(first + 1)?;
    let ended_at = optional_micros(row, first + 2)?;
    let breaks: String = row.get(first + 3)?;
    let updated_at: i64 = row.get(first + 4)?;

    Ok(Shift {
        id: parse_shift_id(&id)?,
        started_at: from_storage_micros(started_at)?,
        ended_at: ended_at.map(from_storage_micros).transpose()?.into(),
        breaks: serde_json::from_str::<Vec<BreakInterval>>(&breaks)?,
        updated_at: from_storage_micros(updated_at)?,
    })
}

/// Ids are opaque text; only an empty value is corrupt.
pub fn parse_shift_id(raw: &str) -> Result<ShiftId> {
    raw.parse()
        .map_err(|_| Error::Database("empty shift id in storage".to_string()))
}

/// Read a nullable integer column
pub fn optional_micros(row: &Row, index: i32) -> Result<Option<i64>> {
    match row.get_value(index)? {
        Value::Null => Ok(None),
        Value::Integer(value) => Ok(Some(value)),
        other => Err(Error::Database(format!(
            "expected integer or NULL in column {index}, found {other:?}"
        ))),
    }
}

/// `?, ?, ...` with `count` placeholders
pub fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholders_match_count() {
        assert_eq!(placeholders(1), "?");
        assert_eq!(placeholders(3), "?, ?, ?");
    }

    #[test]
    fn stored_ids_are_opaque() {
        assert_eq!(parse_shift_id("a").unwrap().as_str(), "a");
        assert_eq!(parse_shift_id("1024").unwrap().as_str(), "1024");
        assert!(matches!(parse_shift_id(""), Err(Error::Database(_))));
    }
}
