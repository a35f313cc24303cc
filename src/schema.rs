//! Response schemas and operation results.
//!
//! A [`Schema`] declares the typed shape of a resource as it appears on the
//! wire. Deserializing a response through it keeps only declared fields and
//! rejects values of the wrong JSON type. Field [`Flags`] mark server-assigned
//! (read-only) fields, which are stripped from outgoing bodies, and
//! client-flatten objects, whose members are surfaced on their parent in the
//! logical result.
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("response field '{path}' expected {expected}, found {found}")]
    Type {
        path: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("response body is not valid JSON: {0}")]
    Json(String),
}

#[derive(Debug, Clone, Copy)]
pub enum Schema {
    Str,
    Int,
    Bool,
    List(&'static Schema),
    Object(&'static [Field]),
}

impl Schema {
    fn expected(&self) -> &'static str {
        match self {
            Schema::Str => "a string",
            Schema::Int => "an integer",
            Schema::Bool => "a boolean",
            Schema::List(_) => "a list",
            Schema::Object(_) => "an object",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Flags {
    pub read_only: bool,
    pub client_flatten: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct Field {
    /// Serialized (wire) name.
    pub name: &'static str,
    pub schema: Schema,
    pub flags: Flags,
}

impl Field {
    pub const fn new(name: &'static str, schema: Schema) -> Self {
        Self {
            name,
            schema,
            flags: Flags {
                read_only: false,
                client_flatten: false,
            },
        }
    }

    pub const fn read_only(mut self) -> Self {
        self.flags.read_only = true;
        self
    }

    pub const fn flatten(mut self) -> Self {
        self.flags.client_flatten = true;
        self
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}

fn shape(schema: &Schema, value: &Value, path: &str) -> Result<Value, SchemaError> {
    let mismatch = || SchemaError::Type {
        path: if path.is_empty() { "$".into() } else { path.into() },
        expected: schema.expected(),
        found: json_type(value),
    };

    if value.is_null() {
        return Ok(Value::Null);
    }

    match schema {
        Schema::Str => value.as_str().map(Value::from).ok_or_else(mismatch),
        Schema::Int => value.as_i64().map(Value::from).ok_or_else(mismatch),
        Schema::Bool => value.as_bool().map(Value::from).ok_or_else(mismatch),
        Schema::List(inner) => {
            let items = value.as_array().ok_or_else(mismatch)?;
            items
                .iter()
                .enumerate()
                .map(|(i, item)| shape(inner, item, &format!("{}[{}]", path, i)))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array)
        }
        Schema::Object(fields) => {
            let object = value.as_object().ok_or_else(mismatch)?;
            let mut out = Map::new();
            for field in fields.iter() {
                let Some(raw) = object.get(field.name) else {
                    continue;
                };
                let child = if path.is_empty() {
                    field.name.to_string()
                } else {
                    format!("{}.{}", path, field.name)
                };
                out.insert(field.name.to_string(), shape(&field.schema, raw, &child)?);
            }
            Ok(Value::Object(out))
        }
    }
}

/// Removes read-only fields from an outgoing body.
pub fn strip_read_only(schema: &Schema, value: &mut Value) {
    match (schema, value) {
        (Schema::Object(fields), Value::Object(map)) => {
            for field in fields.iter() {
                if field.flags.read_only {
                    map.remove(field.name);
                } else if let Some(child) = map.get_mut(field.name) {
                    strip_read_only(&field.schema, child);
                }
            }
        }
        (Schema::List(inner), Value::Array(items)) => {
            for item in items {
                strip_read_only(inner, item);
            }
        }
        _ => {}
    }
}

fn flatten_value(schema: &Schema, value: &Value) -> Value {
    match (schema, value) {
        (Schema::Object(fields), Value::Object(map)) => {
            let mut out = Map::new();
            for (key, child) in map {
                let Some(field) = fields.iter().find(|f| f.name == key) else {
                    out.insert(key.clone(), child.clone());
                    continue;
                };
                match flatten_value(&field.schema, child) {
                    Value::Object(inner) if field.flags.client_flatten => {
                        for (k, v) in inner {
                            out.entry(k).or_insert(v);
                        }
                    }
                    other => {
                        out.insert(key.clone(), other);
                    }
                }
            }
            Value::Object(out)
        }
        (Schema::List(inner), Value::Array(items)) => {
            Value::Array(items.iter().map(|i| flatten_value(inner, i)).collect())
        }
        (_, other) => other.clone(),
    }
}

/// The typed result of a completed operation.
#[derive(Debug, Clone, Serialize)]
#[serde(transparent)]
pub struct OperationResult {
    value: Value,
    #[serde(skip)]
    schema: &'static Schema,
}

impl OperationResult {
    /// Deserializes a response body through `schema`.
    pub fn from_value(schema: &'static Schema, value: &Value) -> Result<Self, SchemaError> {
        Ok(Self {
            value: shape(schema, value, "")?,
            schema,
        })
    }

    /// Deserializes raw response bytes. An empty body yields an empty result.
    pub fn from_slice(schema: &'static Schema, body: &[u8]) -> Result<Self, SchemaError> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Self::from_value(schema, &Value::Object(Map::new()));
        }
        let value: Value =
            serde_json::from_slice(body).map_err(|e| SchemaError::Json(e.to_string()))?;
        Self::from_value(schema, &value)
    }

    /// Looks up a dotted path in the wire shape, e.g. `properties.provisioningState`.
    ///
    /// Numeric segments index into lists.
    pub fn get(&self, path: &str) -> Option<&Value> {
        path.split('.').try_fold(&self.value, |current, segment| match current {
            Value::Object(map) => map.get(segment),
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        })
    }

    pub fn as_value(&self) -> &Value {
        &self.value
    }

    pub fn into_value(self) -> Value {
        self.value
    }

    /// The logical view, with client-flatten objects merged into their parent.
    pub fn flattened(&self) -> Value {
        flatten_value(self.schema, &self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const PROPERTIES: &[Field] = &[
        Field::new("displayName", Schema::Str),
        Field::new("fqdnZones", Schema::List(&Schema::Str)),
        Field::new("provisioningState", Schema::Str).read_only(),
        Field::new("revision", Schema::Int),
    ];

    const FIELDS: &[Field] = &[
        Field::new("id", Schema::Str).read_only(),
        Field::new("name", Schema::Str).read_only(),
        Field::new("properties", Schema::Object(PROPERTIES)).flatten(),
    ];

    static RESOURCE: Schema = Schema::Object(FIELDS);

    #[test]
    fn test_undeclared_fields_are_dropped() {
        let body = json!({
            "id": "/x",
            "etag": "abc",
            "properties": { "revision": 2, "extra": true }
        });
        let result = OperationResult::from_value(&RESOURCE, &body).unwrap();
        assert_eq!(
            result.as_value(),
            &json!({ "id": "/x", "properties": { "revision": 2 } })
        );
    }

    #[test]
    fn test_type_mismatch_reports_path() {
        let body = json!({ "properties": { "fqdnZones": ["a", 3] } });
        let err = OperationResult::from_value(&RESOURCE, &body).unwrap_err();
        assert_eq!(
            err,
            SchemaError::Type {
                path: "properties.fqdnZones[1]".into(),
                expected: "a string",
                found: "a number",
            }
        );
    }

    #[test]
    fn test_get_and_flatten() {
        let body = json!({
            "name": "dns1",
            "properties": { "provisioningState": "Succeeded", "fqdnZones": ["z1", "z2"] }
        });
        let result = OperationResult::from_value(&RESOURCE, &body).unwrap();
        assert_eq!(
            result.get("properties.provisioningState"),
            Some(&json!("Succeeded"))
        );
        assert_eq!(result.get("properties.fqdnZones.1"), Some(&json!("z2")));
        assert_eq!(
            result.flattened(),
            json!({ "name": "dns1", "provisioningState": "Succeeded", "fqdnZones": ["z1", "z2"] })
        );
    }

    #[test]
    fn test_strip_read_only() {
        let mut body = json!({
            "id": "/x",
            "properties": { "provisioningState": "Creating", "revision": 1 }
        });
        strip_read_only(&RESOURCE, &mut body);
        assert_eq!(body, json!({ "properties": { "revision": 1 } }));
    }

    #[test]
    fn test_empty_body() {
        let result = OperationResult::from_slice(&RESOURCE, b"  ").unwrap();
        assert_eq!(result.as_value(), &json!({}));
    }
}
