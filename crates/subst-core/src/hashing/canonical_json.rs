//! JSON canónico: claves de objeto ordenadas, sin espacios.
//!
//! Dos valores iguales producen siempre el mismo texto, así el fingerprint no
//! depende del orden de inserción de `serde_json::Map`.
use std::collections::BTreeMap;

use serde_json::Value;

pub fn to_canonical_json(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => quote(s),
        Value::Array(arr) => {
            let items: Vec<String> = arr.iter().map(to_canonical_json).collect();
            format!("[{}]", items.join(","))
        }
        Value::Object(map) => {
            let tree: BTreeMap<&String, String> = map.iter().map(|(k, v)| (k, to_canonical_json(v))).collect();
            let items: Vec<String> = tree.into_iter().map(|(k, v)| format!("{}:{}", quote(k), v)).collect();
            format!("{{{}}}", items.join(","))
        }
    }
}

// Serializar un string no puede fallar; el Display de Value da el literal con
// escapes JSON.
fn quote(s: &str) -> String {
    Value::String(s.to_string()).to_string()
}
