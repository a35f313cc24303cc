//! Request descriptors.
//!
//! A [`RequestDescriptor`] is derived once per invocation: the URL template is
//! filled with percent-encoded path parameters, the fixed `api-version` query
//! parameter is attached, JSON headers are set and the body produced by the
//! command's builder is attached with read-only fields removed.
//!
//! [`Content`] is the body builder used by the command table. It writes nested
//! objects for client-flattened argument groups and copies lists element by
//! element.
use crate::invocation::ValidationError;
use crate::schema::{Schema, strip_read_only};
use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use reqwest::Method;
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use serde_json::{Map, Value};
use url::Url;

/// Characters escaped inside a single path segment.
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

pub const CLIENT_REQUEST_ID: HeaderName = HeaderName::from_static("x-ms-client-request-id");

/// A URL path template with `{placeholder}` segments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UrlTemplate(pub &'static str);

impl UrlTemplate {
    /// Placeholder names in order of appearance.
    pub fn placeholders(&self) -> impl Iterator<Item = &'static str> {
        self.0
            .split('{')
            .skip(1)
            .filter_map(|chunk| chunk.split_once('}').map(|(name, _)| name))
    }

    /// Substitutes every placeholder using `lookup`.
    pub fn render<'a>(
        &self,
        lookup: impl Fn(&str) -> Option<&'a str>,
    ) -> Result<String, ValidationError> {
        let mut out = String::with_capacity(self.0.len() + 64);
        let mut rest = self.0;
        while let Some(start) = rest.find('{') {
            out.push_str(&rest[..start]);
            let after = &rest[start + 1..];
            let Some(end) = after.find('}') else {
                out.push_str(&rest[start..]);
                rest = "";
                break;
            };
            let name: &'static str = &after[..end];
            let value = lookup(name)
                .filter(|v| !v.is_empty())
                .ok_or(ValidationError::MissingPathParameter(name))?;
            // URL parsing would collapse these instead of addressing a resource.
            if value == "." || value == ".." {
                return Err(ValidationError::DotSegment {
                    placeholder: name,
                    value: value.to_string(),
                });
            }
            out.extend(utf8_percent_encode(value, PATH_SEGMENT));
            rest = &after[end + 1..];
        }
        out.push_str(rest);
        Ok(out)
    }
}

/// A fully resolved HTTP request for one invocation.
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<Value>,
}

impl RequestDescriptor {
    /// Builds the descriptor.
    ///
    /// `path` is the already rendered template, appended to the path of
    /// `endpoint` so a base path such as `https://proxy/arm` is kept.
    /// `schema` is used to strip read-only fields from `body`.
    pub fn build(
        method: Method,
        endpoint: &Url,
        path: &str,
        api_version: &str,
        body: Option<Value>,
        schema: &Schema,
    ) -> Result<Self, ValidationError> {
        let mut base = endpoint.clone();
        if !base.path().ends_with('/') {
            let with_slash = format!("{}/", base.path());
            base.set_path(&with_slash);
        }
        let mut url = base.join(path.trim_start_matches('/'))?;
        url.query_pairs_mut().append_pair("api-version", api_version);

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        if let Ok(id) = HeaderValue::from_str(&uuid::Uuid::new_v4().to_string()) {
            headers.insert(CLIENT_REQUEST_ID, id);
        }

        let body = body.map(|mut b| {
            strip_read_only(schema, &mut b);
            b
        });

        Ok(Self {
            method,
            url,
            headers,
            body,
        })
    }
}

/// JSON object builder for request bodies.
///
/// Absent values are skipped. Optional nested objects that end up empty are
/// omitted from the parent.
#[derive(Debug, Default, Clone)]
pub struct Content(Map<String, Value>);

impl Content {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a scalar property when the value is present.
    pub fn prop<V: Into<Value>>(&mut self, key: &str, value: Option<V>) -> &mut Self {
        if let Some(v) = value {
            self.0.insert(key.to_string(), v.into());
        }
        self
    }

    /// Copies a list element by element, preserving order.
    pub fn list<I, V>(&mut self, key: &str, items: Option<I>) -> &mut Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        if let Some(items) = items {
            let array: Vec<Value> = items.into_iter().map(Into::into).collect();
            self.0.insert(key.to_string(), Value::Array(array));
        }
        self
    }

    /// Adds a nested object, omitted when the builder leaves it empty.
    pub fn object(&mut self, key: &str, build: impl FnOnce(&mut Content)) -> &mut Self {
        let mut child = Content::new();
        build(&mut child);
        if !child.0.is_empty() {
            self.0.insert(key.to_string(), Value::Object(child.0));
        }
        self
    }

    /// Adds a nested object even when it is empty.
    pub fn required_object(&mut self, key: &str, build: impl FnOnce(&mut Content)) -> &mut Self {
        let mut child = Content::new();
        build(&mut child);
        self.0.insert(key.to_string(), Value::Object(child.0));
        self
    }

    /// Adds a list of objects, omitted when empty.
    pub fn objects(&mut self, key: &str, items: Vec<Content>) -> &mut Self {
        if !items.is_empty() {
            let array = items.into_iter().map(Content::into_value).collect();
            self.0.insert(key.to_string(), Value::Array(array));
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}
