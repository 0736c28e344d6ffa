//! The contract every service adapter implements.

use serde_json::Value;

use yamlhouse_core::{FieldValue, Record};

use crate::error::RemoteFetchError;

/// Lazy, forward-only stream of records.
///
/// A stream yields at most one `Err`, after which it is exhausted. Items that
/// cannot be normalized are logged and skipped inside the stream.
pub type RecordStream<'a> = Box<dyn Iterator<Item = Result<Record, RemoteFetchError>> + 'a>;

/// One external task-tracking service.
pub trait ServiceAdapter {
    /// Namespace for this adapter's records; also the registry lookup key.
    fn name(&self) -> &str;

    /// The registry kind this adapter was built from (`"asana"`, `"jira"`).
    fn kind(&self) -> &'static str;

    /// Start a fresh fetch. Nothing is requested until the stream is polled.
    fn produce_records(&self) -> RecordStream<'_>;
}

/// Read a JSON pointer as a [`FieldValue`], null when absent.
pub(crate) fn field_at(item: &Value, pointer: &str) -> FieldValue {
    item.pointer(pointer)
        .map(FieldValue::from_json)
        .unwrap_or_default()
}

/// Read a JSON pointer as a non-empty string id.
pub(crate) fn id_at<'a>(item: &'a Value, pointer: &str) -> Option<&'a str> {
    item.pointer(pointer)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn missing_pointer_reads_as_null() {
        let item = json!({"assignee": null});
        assert!(field_at(&item, "/assignee/name").is_null());
        assert!(field_at(&item, "/nope").is_null());
    }

    #[test]
    fn id_at_rejects_empty_and_non_string() {
        let item = json!({"a": "", "b": 7, "c": "ok"});
        assert_eq!(id_at(&item, "/a"), None);
        assert_eq!(id_at(&item, "/b"), None);
        assert_eq!(id_at(&item, "/c"), Some("ok"));
    }
}
