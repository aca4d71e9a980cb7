//! Typed access to raw backend records.
//!
//! The backend is loose about types: numbers arrive as JSON numbers or as
//! numeric strings, lookups arrive as bare ids or as `{Id, Name}` objects,
//! dates arrive with or without a time part. [`RecordReader`] absorbs that
//! at the gateway boundary so the models only ever see typed values.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::picklist::{Picklist, PicklistMode};
use crate::store::{Record, RecordId, ID_FIELD};

pub struct RecordReader<'a> {
    record: &'a Record,
    entity: &'static str,
    mode: PicklistMode,
}

impl<'a> RecordReader<'a> {
    pub fn new(record: &'a Record, entity: &'static str, mode: PicklistMode) -> Self {
        Self {
            record,
            entity,
            mode,
        }
    }

    pub fn id(&self) -> Result<RecordId> {
        self.record
            .get(ID_FIELD)
            .and_then(as_integer)
            .ok_or_else(|| Error::Decode {
                entity: self.entity,
                reason: "missing Id".into(),
            })
    }

    pub fn text(&self, field: &str) -> String {
        match self.record.get(field) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => String::new(),
        }
    }

    /// First non-empty text among `fields`.
    pub fn text_or(&self, fields: &[&str]) -> String {
        fields
            .iter()
            .map(|f| self.text(f))
            .find(|s| !s.is_empty())
            .unwrap_or_default()
    }

    pub fn number(&self, field: &str) -> f64 {
        self.record.get(field).and_then(as_number).unwrap_or(0.0)
    }

    pub fn integer(&self, field: &str) -> i64 {
        self.record.get(field).and_then(as_integer).unwrap_or(0)
    }

    pub fn timestamp(&self, field: &str) -> Option<DateTime<Utc>> {
        match self.record.get(field) {
            Some(Value::String(s)) => parse_timestamp(s),
            _ => None,
        }
    }

    /// A lookup field, either a bare id or a `{"Id": .., "Name": ..}` object.
    pub fn reference(&self, field: &str) -> Option<RecordId> {
        match self.record.get(field)? {
            Value::Object(map) => map.get(ID_FIELD).and_then(as_integer),
            other => as_integer(other),
        }
    }

    pub fn picklist<P: Picklist>(&self, field: &str) -> Result<P> {
        let label = self.record.get(field).and_then(Value::as_str);
        P::decode(label, self.mode)
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse()
                .ok()
                .or_else(|| s.parse::<f64>().ok().map(|f| f.trunc() as i64))
        }
        _ => None,
    }
}

/// RFC 3339 timestamps, or bare `YYYY-MM-DD` dates read as midnight UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|dt| dt.and_utc())
        })
}

/// Timestamps go out the way the backend echoes them: millisecond RFC 3339 in UTC.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn date_to_timestamp(date: NaiveDate) -> String {
    match date.and_hms_opt(0, 0, 0) {
        Some(dt) => format_timestamp(dt.and_utc()),
        None => date.format("%Y-%m-%d").to_string(),
    }
}

/// Accumulates the fields of an outgoing record.
#[derive(Debug, Default)]
pub struct RecordBuilder {
    record: Record,
}

impl RecordBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_id(id: RecordId) -> Self {
        Self::new().set(ID_FIELD, id)
    }

    pub fn set(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.record.insert(field.to_string(), value.into());
        self
    }

    /// Sets the field only when a value is present.
    pub fn set_some<V: Into<Value>>(self, field: &str, value: Option<V>) -> Self {
        match value {
            Some(v) => self.set(field, v),
            None => self,
        }
    }

    pub fn set_null(self, field: &str) -> Self {
        self.set(field, Value::Null)
    }

    pub fn build(self) -> Record {
        self.record
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::QuoteStatus;
    use serde_json::json;

    fn reader(value: Value) -> Record {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn numbers_accept_strings_and_default_to_zero() {
        let record = reader(json!({"Id": "12", "deal_size_c": "2500.5", "probability_c": "x"}));
        let r = RecordReader::new(&record, "opportunity", PicklistMode::Lenient);
        assert_eq!(r.id().unwrap(), 12);
        assert_eq!(r.number("deal_size_c"), 2500.5);
        assert_eq!(r.integer("probability_c"), 0);
        assert_eq!(r.number("missing"), 0.0);
    }

    #[test]
    fn references_accept_objects_and_ids() {
        let record = reader(json!({"Id": 1, "a": {"Id": 7, "Name": "Site"}, "b": 8, "c": null}));
        let r = RecordReader::new(&record, "task", PicklistMode::Lenient);
        assert_eq!(r.reference("a"), Some(7));
        assert_eq!(r.reference("b"), Some(8));
        assert_eq!(r.reference("c"), None);
    }

    #[test]
    fn timestamps_accept_dates_and_rfc3339() {
        let day = parse_timestamp("2024-03-15").unwrap();
        assert_eq!(format_timestamp(day), "2024-03-15T00:00:00.000Z");

        let full = parse_timestamp("2024-03-15T10:30:00+02:00").unwrap();
        assert_eq!(format_timestamp(full), "2024-03-15T08:30:00.000Z");

        assert!(parse_timestamp("").is_none());
        assert!(parse_timestamp("soon").is_none());
    }

    #[test]
    fn missing_id_is_a_decode_error() {
        let record = reader(json!({"Name": "orphan"}));
        let r = RecordReader::new(&record, "quote", PicklistMode::Lenient);
        assert!(matches!(r.id(), Err(Error::Decode { entity: "quote", .. })));
    }

    #[test]
    fn picklist_honours_mode() {
        let record = reader(json!({"Id": 1, "status_c": "Archived"}));
        let lenient = RecordReader::new(&record, "quote", PicklistMode::Lenient);
        assert_eq!(lenient.picklist::<QuoteStatus>("status_c").unwrap(), QuoteStatus::Draft);

        let strict = RecordReader::new(&record, "quote", PicklistMode::Strict);
        assert!(strict.picklist::<QuoteStatus>("status_c").is_err());
    }

    #[test]
    fn builder_skips_absent_values() {
        let record = RecordBuilder::with_id(4)
            .set("Name", "Q")
            .set_some("value_c", None::<f64>)
            .set_null("completed_at_c")
            .build();
        assert_eq!(Value::Object(record), json!({"Id": 4, "Name": "Q", "completed_at_c": null}));
    }
}
