use crate::error::{PlaneError, Result};
use serde_json::{Map, Value};

/// Canonical shape of every remote entity once it crosses the API boundary.
pub type Record = Map<String, Value>;

/// Normalize a raw API value into a [`Record`].
pub fn into_record(value: Value) -> Result<Record> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(PlaneError::Decode(format!(
            "expected an object, got {}",
            type_name(&other)
        ))),
    }
}

/// Normalize a list of raw API values, rejecting anything that is not an object.
pub fn into_records(values: Vec<Value>) -> Result<Vec<Record>> {
    values.into_iter().map(into_record).collect()
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Non-empty string field.
pub fn str_field<'a>(record: &'a Record, field: &str) -> Option<&'a str> {
    record
        .get(field)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

pub fn record_id(record: &Record) -> Option<&str> {
    str_field(record, "id")
}

/// ID of a relationship field that may hold either a bare UUID or an expanded object.
pub fn related_id(record: &Record, field: &str) -> Option<String> {
    value_id(record.get(field)?)
}

/// IDs of a list relationship whose elements may be bare UUIDs or expanded objects.
pub fn related_ids(record: &Record, field: &str) -> Vec<String> {
    match record.get(field) {
        Some(Value::Array(items)) => items.iter().filter_map(value_id).collect(),
        _ => Vec::new(),
    }
}

fn value_id(value: &Value) -> Option<String> {
    match value {
        Value::String(id) if !id.is_empty() => Some(id.clone()),
        Value::Object(map) => map.get("id").and_then(Value::as_str).map(str::to_string),
        _ => None,
    }
}

/// Name used to match and display a workspace member.
pub fn user_display_name(user: &Record) -> String {
    if let Some(name) = str_field(user, "display_name") {
        return name.to_string();
    }
    [str_field(user, "first_name"), str_field(user, "last_name")]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(" ")
}
