//! Command invocations and argument validation.
//!
//! An [`Invocation`] is an ordered map of argument name to [`ArgValue`]. Each
//! command declares its arguments as a slice of [`ArgSpec`], and [`validate`]
//! is the single place where an invocation is checked against them. Validation
//! happens before any request is built, so a failure here never reaches the
//! network.
use indexmap::IndexMap;
use regex::Regex;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{LazyLock, Mutex};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("the following arguments are required: {0}")]
    Missing(String),

    #[error("argument {arg} must not be empty")]
    Empty { arg: String },

    #[error("unrecognized argument: {0}")]
    Unknown(String),

    #[error("unknown command '{0}'")]
    UnknownCommand(String),

    #[error("argument {arg} expects {expected}")]
    Kind { arg: String, expected: ArgKind },

    #[error("argument {arg}: '{value}' does not match pattern '{pattern}'")]
    Pattern {
        arg: String,
        value: String,
        pattern: &'static str,
    },

    #[error("argument {arg}: '{value}' is not one of: {}", .allowed.join(", "))]
    NotAllowed {
        arg: String,
        value: String,
        allowed: &'static [&'static str],
    },

    #[error("argument {arg} declares an invalid pattern: {reason}")]
    InvalidPattern { arg: String, reason: String },

    #[error("missing value for path parameter '{0}'")]
    MissingPathParameter(&'static str),

    #[error("'{value}' is not a valid value for path parameter '{placeholder}'")]
    DotSegment {
        placeholder: &'static str,
        value: String,
    },

    #[error("invalid request url: {0}")]
    Url(#[from] url::ParseError),
}

/// The declared type of an argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgKind {
    Str,
    Int,
    StrList,
}

impl std::fmt::Display for ArgKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ArgKind::Str => write!(f, "a string"),
            ArgKind::Int => write!(f, "an integer"),
            ArgKind::StrList => write!(f, "a list of strings"),
        }
    }
}

/// A typed argument value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ArgValue {
    Str(String),
    Int(i64),
    StrList(Vec<String>),
}

impl ArgValue {
    pub fn kind(&self) -> ArgKind {
        match self {
            ArgValue::Str(_) => ArgKind::Str,
            ArgValue::Int(_) => ArgKind::Int,
            ArgValue::StrList(_) => ArgKind::StrList,
        }
    }
}

impl From<String> for ArgValue {
    fn from(s: String) -> Self {
        ArgValue::Str(s)
    }
}

impl From<&str> for ArgValue {
    fn from(s: &str) -> Self {
        ArgValue::Str(s.to_string())
    }
}

impl From<i64> for ArgValue {
    fn from(n: i64) -> Self {
        ArgValue::Int(n)
    }
}

impl From<u16> for ArgValue {
    fn from(n: u16) -> Self {
        ArgValue::Int(n.into())
    }
}

impl From<Vec<String>> for ArgValue {
    fn from(v: Vec<String>) -> Self {
        ArgValue::StrList(v)
    }
}

impl From<Vec<&str>> for ArgValue {
    fn from(v: Vec<&str>) -> Self {
        ArgValue::StrList(v.into_iter().map(str::to_string).collect())
    }
}

/// Declaration of a single command argument.
#[derive(Debug, Clone, Copy)]
pub struct ArgSpec {
    /// Name used as the invocation key.
    pub name: &'static str,
    /// Command line spellings, the first one is used in messages.
    pub options: &'static [&'static str],
    pub kind: ArgKind,
    pub required: bool,
    /// Anchored regex every string (or list element) must match.
    pub pattern: Option<&'static str>,
    /// Allowed values, matched case-insensitively and normalized to the listed spelling.
    pub allowed: &'static [&'static str],
}

impl ArgSpec {
    pub const fn new(name: &'static str, options: &'static [&'static str], kind: ArgKind) -> Self {
        Self {
            name,
            options,
            kind,
            required: false,
            pattern: None,
            allowed: &[],
        }
    }

    pub const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub const fn pattern(mut self, pattern: &'static str) -> Self {
        self.pattern = Some(pattern);
        self
    }

    pub const fn allowed(mut self, allowed: &'static [&'static str]) -> Self {
        self.allowed = allowed;
        self
    }

    /// Flag name used in error messages.
    pub fn display_name(&self) -> String {
        match self.options.first() {
            Some(opt) => opt.to_string(),
            None => format!("--{}", self.name.replace('_', "-")),
        }
    }
}

/// An ordered set of argument values for one command execution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Invocation {
    values: IndexMap<String, ArgValue>,
}

impl Invocation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, value: impl Into<ArgValue>) -> Self {
        self.values.insert(name.to_string(), value.into());
        self
    }

    /// Adds the value only when present. Empty lists count as absent.
    pub fn with_opt<V: Into<ArgValue>>(self, name: &str, value: Option<V>) -> Self {
        match value.map(Into::into) {
            Some(ArgValue::StrList(list)) if list.is_empty() => self,
            Some(v) => self.with(name, v),
            None => self,
        }
    }

    pub fn get(&self, name: &str) -> Option<&ArgValue> {
        self.values.get(name)
    }

    pub fn str(&self, name: &str) -> Option<&str> {
        match self.values.get(name) {
            Some(ArgValue::Str(s)) => Some(s),
            _ => None,
        }
    }

    pub fn int(&self, name: &str) -> Option<i64> {
        match self.values.get(name) {
            Some(ArgValue::Int(n)) => Some(*n),
            _ => None,
        }
    }

    pub fn list(&self, name: &str) -> Option<&[String]> {
        match self.values.get(name) {
            Some(ArgValue::StrList(v)) => Some(v),
            _ => None,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ArgValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Checks an invocation against the declared arguments.
///
/// Returns the invocation with enumerated values normalized to their declared
/// spelling. Every required argument is reported at once when missing.
pub fn validate(specs: &[ArgSpec], invocation: Invocation) -> Result<Invocation, ValidationError> {
    if let Some(name) = invocation
        .values
        .keys()
        .find(|name| !specs.iter().any(|s| s.name == name.as_str()))
    {
        return Err(ValidationError::Unknown(name.clone()));
    }

    let missing: Vec<String> = specs
        .iter()
        .filter(|s| s.required && !invocation.values.contains_key(s.name))
        .map(ArgSpec::display_name)
        .collect();
    if !missing.is_empty() {
        return Err(ValidationError::Missing(missing.join(", ")));
    }

    let mut values = IndexMap::with_capacity(invocation.values.len());
    for (name, value) in invocation.values {
        // Unknown names were rejected above.
        let Some(spec) = specs.iter().find(|s| s.name == name) else {
            continue;
        };
        let value = check_value(spec, value)?;
        values.insert(name, value);
    }

    Ok(Invocation { values })
}

/// Compiled argument patterns, keyed by their source.
static PATTERNS: LazyLock<Mutex<HashMap<&'static str, Regex>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

fn compiled(pattern: &'static str) -> Result<Regex, regex::Error> {
    let mut cache = PATTERNS.lock().unwrap_or_else(|e| e.into_inner());
    if let Some(re) = cache.get(pattern) {
        return Ok(re.clone());
    }
    let re = Regex::new(pattern)?;
    cache.insert(pattern, re.clone());
    Ok(re)
}

fn check_value(spec: &ArgSpec, value: ArgValue) -> Result<ArgValue, ValidationError> {
    if value.kind() != spec.kind {
        return Err(ValidationError::Kind {
            arg: spec.display_name(),
            expected: spec.kind,
        });
    }

    let pattern = spec
        .pattern
        .map(|p| {
            compiled(p).map_err(|e| ValidationError::InvalidPattern {
                arg: spec.display_name(),
                reason: e.to_string(),
            })
        })
        .transpose()?;

    let check_str = |s: String| -> Result<String, ValidationError> {
        if spec.required && s.trim().is_empty() {
            return Err(ValidationError::Empty {
                arg: spec.display_name(),
            });
        }
        if let Some(re) = &pattern
            && !re.is_match(&s)
        {
            return Err(ValidationError::Pattern {
                arg: spec.display_name(),
                value: s,
                pattern: spec.pattern.unwrap_or_default(),
            });
        }
        if spec.allowed.is_empty() {
            return Ok(s);
        }
        spec.allowed
            .iter()
            .find(|a| a.eq_ignore_ascii_case(&s))
            .map(|a| a.to_string())
            .ok_or(ValidationError::NotAllowed {
                arg: spec.display_name(),
                value: s,
                allowed: spec.allowed,
            })
    };

    match value {
        ArgValue::Str(s) => check_str(s).map(ArgValue::Str),
        ArgValue::StrList(items) => items
            .into_iter()
            .map(check_str)
            .collect::<Result<Vec<_>, _>>()
            .map(ArgValue::StrList),
        ArgValue::Int(n) => Ok(ArgValue::Int(n)),
    }
}
