use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Node fields filled from the bucket itself rather than from `_source`.
pub const SEEDED_FIELDS: [&str; 4] = ["id", "_id", "instances", "hosts"];

/// Public field name to `_source` path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldMap {
    entries: BTreeMap<String, String>,
}

impl FieldMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, source_path: impl Into<String>) -> Self {
        self.entries.insert(name.into(), source_path.into());
        self
    }

    pub fn source_path(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(String::as_str)
    }

    /// `_source` paths for the requested, non-seeded fields, in request order.
    pub fn source_paths<'a>(&'a self, fields: &'a [String]) -> Vec<&'a str> {
        let mut paths = Vec::new();
        for name in fields {
            if is_seeded(name) {
                continue;
            }
            if let Some(path) = self.source_path(name) {
                if !paths.contains(&path) {
                    paths.push(path);
                }
            }
        }
        paths
    }
}

pub fn process_fields_map() -> FieldMap {
    FieldMap::new()
        .with("_id", "_id")
        .with("instances", "instances")
        .with("hosts", "hosts")
        .with("process.name", "process.name")
        .with("process.title", "process.title")
        .with("process.executable", "process.executable")
        .with("process.args", "process.args")
        .with("user.name", "user.name")
}

/// True when `name`, or the top-level key it would nest under, is a seeded field.
pub fn is_seeded(name: &str) -> bool {
    let head = name.split('.').next().unwrap_or(name);
    SEEDED_FIELDS.contains(&head)
}

/// Projects the requested fields out of `source`.
///
/// Unknown names, seeded names and values that are missing or `null` in
/// `source` are skipped. Dotted names come back nested, so `process.name`
/// lands under `{"process": {"name": ..}}`.
pub fn project_fields(
    fields: &[String],
    field_map: &FieldMap,
    source: &Map<String, Value>,
) -> Map<String, Value> {
    let mut projected = Map::new();
    for name in fields {
        if is_seeded(name) {
            continue;
        }
        let Some(path) = field_map.source_path(name) else {
            continue;
        };
        match lookup_path(source, path) {
            Some(Value::Null) | None => {}
            Some(value) => insert_nested(&mut projected, name, value.clone()),
        }
    }
    projected
}

/// Resolves a dotted path against a document that may store it either as
/// nested objects or as literal dotted keys (or a mix of both).
pub fn lookup_path<'a>(source: &'a Map<String, Value>, path: &str) -> Option<&'a Value> {
    if let Some(value) = source.get(path) {
        return Some(value);
    }
    path.match_indices('.').find_map(|(split, _)| {
        let inner = source.get(&path[..split])?.as_object()?;
        lookup_path(inner, &path[split + 1..])
    })
}

fn insert_nested(target: &mut Map<String, Value>, name: &str, value: Value) {
    match name.split_once('.') {
        None => {
            target.insert(name.to_string(), value);
        }
        Some((head, rest)) => {
            let slot = target
                .entry(head.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !slot.is_object() {
                *slot = Value::Object(Map::new());
            }
            if let Value::Object(inner) = slot {
                insert_nested(inner, rest, value);
            }
        }
    }
}
