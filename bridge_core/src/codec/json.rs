use serde::Serialize;
use serde_json::{Map as JsonMap, Number as JsonNumber, Value as JsonValue};

use crate::host::{HostValue, TableKey};

/// Nesting limit for host values; deeper tables collapse to a placeholder.
pub const MAX_DEPTH: usize = 50;
pub const DEPTH_PLACEHOLDER: &str = "<max depth exceeded>";

/// Convert a host value into JSON.
///
/// Tables holding exactly the keys 1..N become arrays; every other table
/// becomes an object with stringified keys. Back-references and very deep
/// graphs stop at [`MAX_DEPTH`].
pub fn host_to_json(value: &HostValue) -> JsonValue {
    encode_at(value, 0)
}

fn encode_at(value: &HostValue, depth: usize) -> JsonValue {
    if depth >= MAX_DEPTH {
        return JsonValue::String(DEPTH_PLACEHOLDER.to_string());
    }
    match value {
        HostValue::Nil => JsonValue::Null,
        HostValue::Bool(flag) => JsonValue::Bool(*flag),
        HostValue::Number(number) => number_to_json(*number),
        HostValue::Str(text) => JsonValue::String(text.clone()),
        HostValue::Table(table) => {
            let table = table.borrow();
            match table.sequence_len() {
                Some(len) if len > 0 => JsonValue::Array(
                    table
                        .iter()
                        .map(|(_, item)| encode_at(item, depth + 1))
                        .collect(),
                ),
                _ => {
                    let mut object = JsonMap::new();
                    for (key, item) in table.iter() {
                        let name = match key {
                            TableKey::Index(index) => index.to_string(),
                            TableKey::Name(name) => name.clone(),
                        };
                        object.insert(name, encode_at(item, depth + 1));
                    }
                    JsonValue::Object(object)
                }
            }
        }
    }
}

fn number_to_json(number: f64) -> JsonValue {
    if !number.is_finite() {
        return JsonValue::Null;
    }
    if number.fract() == 0.0 && number.abs() < 9.007_199_254_740_992e15 {
        return JsonValue::Number(JsonNumber::from(number as i64));
    }
    JsonNumber::from_f64(number)
        .map(JsonValue::Number)
        .unwrap_or(JsonValue::Null)
}

/// Serialize a response document; a failure becomes `{"error": ...}`.
pub fn encode_document<T: Serialize + ?Sized>(document: &T) -> Vec<u8> {
    match serde_json::to_vec(document) {
        Ok(bytes) => bytes,
        Err(err) => error_envelope(&format!("JSON encode failed: {err}")),
    }
}

/// Single-field error body.
pub fn error_envelope(message: &str) -> Vec<u8> {
    let mut object = JsonMap::new();
    object.insert("error".to_string(), JsonValue::String(message.to_string()));
    serde_json::to_vec(&JsonValue::Object(object))
        .unwrap_or_else(|_| br#"{"error":"JSON encode failed"}"#.to_vec())
}

/// Parse a request body. Any structural error, or an empty body, yields `None`.
pub fn decode_document(bytes: &[u8]) -> Option<JsonValue> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return None;
    }
    serde_json::from_slice(bytes).ok()
}

/// Convert decoded JSON into a host value, used for host call arguments.
pub fn json_to_host(value: &JsonValue) -> HostValue {
    match value {
        JsonValue::Null => HostValue::Nil,
        JsonValue::Bool(flag) => HostValue::Bool(*flag),
        JsonValue::Number(number) => number
            .as_f64()
            .map(HostValue::Number)
            .unwrap_or(HostValue::Nil),
        JsonValue::String(text) => HostValue::Str(text.clone()),
        JsonValue::Array(items) => HostValue::list(items.iter().map(json_to_host)),
        JsonValue::Object(map) => {
            let table = crate::host::TableRef::new();
            for (key, item) in map {
                table.set(key.as_str(), json_to_host(item));
            }
            HostValue::Table(table)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::TableRef;
    use serde_json::json;

    #[test]
    fn contiguous_tables_become_arrays() {
        let list = HostValue::list([HostValue::from(1i64), HostValue::from("two")]);
        assert_eq!(host_to_json(&list), json!([1, "two"]));
    }

    #[test]
    fn gapped_tables_become_objects_with_string_keys() {
        let table = TableRef::new();
        table.set(1i64, true);
        table.set(3i64, false);
        assert_eq!(
            host_to_json(&HostValue::Table(table)),
            json!({"1": true, "3": false})
        );
    }

    #[test]
    fn empty_table_is_an_object() {
        assert_eq!(host_to_json(&HostValue::Table(TableRef::new())), json!({}));
    }

    #[test]
    fn non_finite_numbers_are_null() {
        assert_eq!(host_to_json(&HostValue::Number(f64::NAN)), JsonValue::Null);
        assert_eq!(
            host_to_json(&HostValue::Number(f64::NEG_INFINITY)),
            JsonValue::Null
        );
        assert_eq!(host_to_json(&HostValue::Number(2.5)), json!(2.5));
        assert_eq!(host_to_json(&HostValue::Number(3.0)), json!(3));
    }

    #[test]
    fn back_references_stop_at_depth_cap() {
        let card = TableRef::new();
        card.set("self", card.clone());
        let mut json = host_to_json(&HostValue::Table(card));
        let mut levels = 0;
        while json.is_object() {
            levels += 1;
            json = json["self"].clone();
        }
        assert_eq!(levels, MAX_DEPTH);
        assert_eq!(json, json!(DEPTH_PLACEHOLDER));
    }

    #[test]
    fn tree_at_the_depth_cap_is_cut() {
        let root = TableRef::new();
        let mut node = root.clone();
        for _ in 0..MAX_DEPTH {
            let child = TableRef::new();
            node.set("next", child.clone());
            node = child;
        }
        node.set("leaf", true);
        let mut json = host_to_json(&HostValue::Table(root));
        for _ in 0..MAX_DEPTH - 1 {
            json = json["next"].clone();
        }
        assert_eq!(json["next"], json!(DEPTH_PLACEHOLDER));
    }

    #[test]
    fn strings_escape_quotes_and_control_characters() {
        let value = HostValue::from("a\"b\\c\n\u{1}");
        let bytes = encode_document(&host_to_json(&value));
        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            r#""a\"b\\c\n\u0001""#
        );
    }

    #[test]
    fn decode_rejects_partial_documents() {
        assert_eq!(decode_document(br#"{"type": "PLAY_HAND""#), None);
        assert_eq!(decode_document(b"  \r\n"), None);
        assert_eq!(decode_document(br#"{"a": [1, 2]}"#), Some(json!({"a": [1, 2]})));
    }

    #[test]
    fn nested_tree_survives_encode_and_decode() {
        let tree = HostValue::table([
            ("name", HostValue::from("Blueprint")),
            (
                "extra",
                HostValue::table([
                    ("mult", HostValue::from(4i64)),
                    ("tags", HostValue::list([HostValue::from("copy"), HostValue::Bool(true)])),
                ]),
            ),
        ]);
        let encoded = host_to_json(&tree);
        let bytes = encode_document(&encoded);
        let decoded = decode_document(&bytes).unwrap();
        assert_eq!(decoded, encoded);
        assert_eq!(host_to_json(&json_to_host(&decoded)), encoded);
    }
}
