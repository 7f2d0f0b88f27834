//! Document transforms applied to source records before indexing.

use chrono::{NaiveDate, NaiveDateTime, Utc};
use serde_json::{Map, Value};

/// Rewrites a raw source record before its id is read.
pub trait DocumentTransform: Send + Sync {
    fn apply(&self, record: Value) -> Value;

    /// Name used in logs.
    fn name(&self) -> &'static str;
}

/// Leaves records untouched.
#[derive(Debug, Default, Clone, Copy)]
pub struct Passthrough;

impl DocumentTransform for Passthrough {
    fn apply(&self, record: Value) -> Value {
        record
    }

    fn name(&self) -> &'static str {
        "passthrough"
    }
}

/// Enrichment for consumer complaint records.
///
/// `complaint_id` falls back to `public_id`. Records that already carry
/// `:updated_at` come from an upstream parser and are kept as they are.
/// With `merge_metadata` the record also gets `:updated_at`, `has_narrative`,
/// and noon-Eastern and `MM/DD/YY` variants of its dates.
#[derive(Debug, Clone)]
pub struct ComplaintEnrichment {
    merge_metadata: bool,
    indexed_at: NaiveDateTime,
}

impl ComplaintEnrichment {
    pub fn new(merge_metadata: bool) -> Self {
        Self {
            merge_metadata,
            indexed_at: Utc::now().naive_utc(),
        }
    }

    /// Use a fixed indexing time instead of the current one.
    pub fn with_indexed_at(mut self, indexed_at: NaiveDateTime) -> Self {
        self.indexed_at = indexed_at;
        self
    }

    fn merge(&self, record: &mut Map<String, Value>) {
        let received = record.get("date_received").and_then(parse_date);
        let updated_at = received
            .map(|dt| dt.and_utc().timestamp() as f64)
            .unwrap_or(0.0);
        record.insert(":updated_at".to_string(), Value::from(updated_at));

        let has_narrative = match record.get("complaint_what_happened") {
            None | Some(Value::Null) => false,
            Some(Value::String(s)) => !s.is_empty(),
            Some(_) => true,
        };
        record.insert("has_narrative".to_string(), Value::Bool(has_narrative));

        for field in ["date_received", "date_sent_to_company"] {
            let parsed = record.get(field).and_then(parse_date);
            insert_dates(record, field, parsed);
        }
        insert_dates(record, "date_indexed", Some(self.indexed_at));
    }
}

impl DocumentTransform for ComplaintEnrichment {
    fn apply(&self, mut record: Value) -> Value {
        let Some(fields) = record.as_object_mut() else {
            return record;
        };

        if !fields.contains_key("complaint_id") {
            if let Some(public_id) = fields.get("public_id").cloned() {
                fields.insert("complaint_id".to_string(), public_id);
            }
        }

        if fields.contains_key(":updated_at") {
            return record;
        }

        if self.merge_metadata {
            self.merge(fields);
        }
        record
    }

    fn name(&self) -> &'static str {
        "complaint"
    }
}

/// Parse `YYYY-MM-DDTHH:MM:SS` or `YYYY-MM-DD`.
fn parse_date(value: &Value) -> Option<NaiveDateTime> {
    let s = value.as_str()?;
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Set `field` to noon US Eastern on the date and `{field}_formatted` to
/// `MM/DD/YY`; both are null when the date is missing or unparseable.
fn insert_dates(record: &mut Map<String, Value>, field: &str, date: Option<NaiveDateTime>) {
    let (noon, mdy) = match date {
        Some(d) => (
            Value::String(format!("{}T12:00:00-05:00", d.format("%Y-%m-%d"))),
            Value::String(d.format("%m/%d/%y").to_string()),
        ),
        None => (Value::Null, Value::Null),
    };
    record.insert(field.to_string(), noon);
    record.insert(format!("{}_formatted", field), mdy);
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn indexed_at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 9)
            .and_then(|d| d.and_hms_opt(8, 30, 0))
            .unwrap()
    }

    #[test]
    fn test_passthrough() {
        let record = json!({"a": 1});
        assert_eq!(Passthrough.apply(record.clone()), record);
    }

    #[test]
    fn test_complaint_id_falls_back_to_public_id() {
        let enriched = ComplaintEnrichment::new(false).apply(json!({"public_id": "123"}));
        assert_eq!(enriched["complaint_id"], "123");

        let enriched = ComplaintEnrichment::new(false)
            .apply(json!({"public_id": "123", "complaint_id": "456"}));
        assert_eq!(enriched["complaint_id"], "456");
    }

    #[test]
    fn test_without_merge_only_id_is_added() {
        let record = json!({"public_id": "1", "date_received": "2017-05-01"});
        let enriched = ComplaintEnrichment::new(false).apply(record);

        assert_eq!(enriched["date_received"], "2017-05-01");
        assert!(enriched.get(":updated_at").is_none());
    }

    #[test]
    fn test_merge_metadata() {
        let record = json!({
            "complaint_id": "1",
            "date_received": "2017-05-01",
            "date_sent_to_company": "2017-05-03T10:15:00",
            "complaint_what_happened": "It happened"
        });

        let enriched = ComplaintEnrichment::new(true)
            .with_indexed_at(indexed_at())
            .apply(record);

        assert_eq!(enriched[":updated_at"], json!(1493596800.0));
        assert_eq!(enriched["has_narrative"], true);
        assert_eq!(enriched["date_received"], "2017-05-01T12:00:00-05:00");
        assert_eq!(enriched["date_received_formatted"], "05/01/17");
        assert_eq!(enriched["date_sent_to_company"], "2017-05-03T12:00:00-05:00");
        assert_eq!(enriched["date_sent_to_company_formatted"], "05/03/17");
        assert_eq!(enriched["date_indexed"], "2024-03-09T12:00:00-05:00");
        assert_eq!(enriched["date_indexed_formatted"], "03/09/24");
    }

    #[test]
    fn test_merge_metadata_missing_values() {
        let record = json!({
            "complaint_id": "1",
            "date_received": "not a date",
            "complaint_what_happened": ""
        });

        let enriched = ComplaintEnrichment::new(true)
            .with_indexed_at(indexed_at())
            .apply(record);

        assert_eq!(enriched[":updated_at"], json!(0.0));
        assert_eq!(enriched["has_narrative"], false);
        assert!(enriched["date_received"].is_null());
        assert!(enriched["date_sent_to_company_formatted"].is_null());
    }

    #[test]
    fn test_records_with_updated_at_pass_through() {
        let record = json!({"complaint_id": "1", ":updated_at": 5, "date_received": "2017-05-01"});
        let enriched = ComplaintEnrichment::new(true).apply(record.clone());
        assert_eq!(enriched, record);
    }

    #[test]
    fn test_non_object_records_are_untouched() {
        assert_eq!(ComplaintEnrichment::new(true).apply(json!([1, 2])), json!([1, 2]));
    }
}
