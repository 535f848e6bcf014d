//! Idempotence checks between a desired configuration object and the one stored on the device.
//!
//! Comparison is directional: `existing` satisfies `desired` when every non-empty,
//! non-volatile field of both sides matches. Embedded object references are equal when their
//! `id` and `type` match, whatever the descriptive fields say.
use crate::error::{Error, ErrorKind, Result};

use std::collections::HashSet;

use itertools::Itertools;
use serde_json::{Map, Value};

/// Fields set by the device that never take part in a comparison.
pub const NON_COMPARABLE_PROPERTIES: [&str; 4] = ["id", "version", "isSystemDefined", "links"];

/// A configuration object as exchanged with the FDM API.
pub type ConfigObject = Map<String, Value>;

/// Borrow `value` as a configuration object, failing for anything other than a JSON object.
pub fn as_config_object(value: &Value) -> Result<&ConfigObject> {
    value.as_object().ok_or_else(|| {
        Error::new(
            ErrorKind::InvalidData,
            format!("configuration object must be a mapping, got: {value}"),
        )
    })
}

/// Returns `true` when `existing` does not satisfy `desired` and an edit has to be sent.
pub fn requires_update(desired: &ConfigObject, existing: &ConfigObject) -> bool {
    !equal_objects(desired, existing)
}

/// Deep equality ignoring volatile fields, empty values and reference descriptive fields.
pub fn equal_objects(d1: &ConfigObject, d2: &ConfigObject) -> bool {
    let d1 = comparable_fields(d1);
    let d2 = comparable_fields(d2);

    if d1.len() != d2.len() {
        return false;
    }

    d1.iter().all(|(key, value)| match d2.get(key) {
        Some(value2) => equal_values(value, value2),
        None => false,
    })
}

fn comparable_fields(d: &ConfigObject) -> ConfigObject {
    d.iter()
        .filter(|(k, v)| !NON_COMPARABLE_PROPERTIES.contains(&k.as_str()) && !is_empty_value(v))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

/// `null`, `false`, zero, empty strings and empty collections are treated as unset.
pub fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
    }
}

fn equal_values(v1: &Value, v2: &Value) -> bool {
    match (v1, v2) {
        (Value::Object(o1), Value::Object(o2)) => equal_dicts(o1, o2),
        (Value::Array(l1), Value::Array(l2)) => equal_lists(l1, l2),
        (Value::Number(n1), Value::Number(n2)) => {
            // integers and floats are different kinds even with the same magnitude
            n1.is_f64() == n2.is_f64() && n1 == n2
        }
        _ => v1 == v2,
    }
}

fn equal_lists(l1: &[Value], l2: &[Value]) -> bool {
    let l1 = dedup_refs(l1);
    let l2 = dedup_refs(l2);

    l1.len() == l2.len() && l1.iter().zip(l2.iter()).all(|(v1, v2)| equal_values(v1, v2))
}

fn equal_dicts(d1: &ConfigObject, d2: &ConfigObject) -> bool {
    if is_object_ref(d1) && is_object_ref(d2) {
        equal_object_refs(d1, d2)
    } else {
        equal_objects(d1, d2)
    }
}

/// An object reference points to another entity through its `id` and `type`.
pub fn is_object_ref(d: &ConfigObject) -> bool {
    d.contains_key("id") && d.contains_key("type")
}

fn equal_object_refs(d1: &ConfigObject, d2: &ConfigObject) -> bool {
    d1.get("id") == d2.get("id") && d1.get("type") == d2.get("type")
}

/// Key used to collapse duplicated references.
///
/// Both fields are JSON encoded, so `1` and `"1"` stay different ids.
fn ref_key(d: &ConfigObject) -> (String, String) {
    let encode = |v: Option<&Value>| v.map(Value::to_string).unwrap_or_default();
    (encode(d.get("id")), encode(d.get("type")))
}

fn dedup_refs(list: &[Value]) -> Vec<Value> {
    let deduped = delete_ref_duplicates_from_list(list);
    if deduped.len() != list.len() {
        debug!(
            "ignoring duplicated references (id, type): {:?}",
            duplicated_refs(list)
        );
    }
    deduped
}

/// Removes later duplicates of `(id, type)` from a list made only of object references.
///
/// Lists holding anything else are returned untouched.
pub fn delete_ref_duplicates_from_list(refs: &[Value]) -> Vec<Value> {
    let all_refs = refs
        .iter()
        .all(|v| v.as_object().map(is_object_ref).unwrap_or(false));

    if !all_refs {
        return refs.to_vec();
    }

    refs.iter()
        .unique_by(|v| v.as_object().map(ref_key))
        .cloned()
        .collect()
}

/// Returns the JSON encoded `(id, type)` keys present more than once.
pub fn duplicated_refs(refs: &[Value]) -> HashSet<(String, String)> {
    refs.iter()
        .filter_map(Value::as_object)
        .filter(|d| is_object_ref(d))
        .map(ref_key)
        .duplicates()
        .collect()
}
