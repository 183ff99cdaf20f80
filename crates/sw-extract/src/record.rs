//! # Record Mapping
//!
//! Flattens a wire row into the output form consumed downstream: a flat
//! JSON object keyed by field name with the leading `@` stripped, so
//! `@timestamp` becomes `timestamp` and `@ptr` becomes `ptr`.

use serde_json::{Map, Value};

use sw_core::Row;

/// A mapped output record.
pub type Record = Map<String, Value>;

/// Map one wire row to its output record. Field order is preserved on
/// collection; a repeated field name keeps the last value.
pub fn map_record(row: &Row) -> Record {
    row.fields
        .iter()
        .map(|f| {
            let name = f.field.strip_prefix('@').unwrap_or(&f.field);
            (name.to_string(), Value::String(f.value.clone()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_at_prefix() {
        let row = Row::from_pairs(&[
            ("@ptr", "CmEKJ"),
            ("@timestamp", "2022-01-01"),
            ("@message", "abc"),
        ]);
        let record = map_record(&row);
        assert_eq!(record.get("ptr"), Some(&Value::String("CmEKJ".into())));
        assert_eq!(
            record.get("timestamp"),
            Some(&Value::String("2022-01-01".into()))
        );
        assert!(!record.contains_key("@timestamp"));
    }

    #[test]
    fn test_unprefixed_fields_pass_through() {
        let row = Row::from_pairs(&[("@timestamp", "2022-01-01"), ("duration", "42")]);
        let record = map_record(&row);
        assert_eq!(record.get("duration"), Some(&Value::String("42".into())));
    }
}
