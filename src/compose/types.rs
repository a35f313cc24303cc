//! Decoded compose descriptors.
//!
//! These types accept both the short and the long syntax that compose
//! tooling emits, e.g. `ports: "8080:80"` as well as
//! `ports: [{target: 80, published: "8080"}]`, and `environment` either as a
//! list of `KEY=VALUE` strings or as a map.
use crate::config::parsers::{TryFromKv, one_or_many, polymorphic_vec};
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer};
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PortError {
    #[error("'{0}' is not a valid port")]
    Invalid(String),

    #[error("port ranges are not supported: '{0}'")]
    Range(String),
}

/// The services of a compose project, in declaration order.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ComposeProject {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub services: IndexMap<String, ComposeService>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ComposeService {
    #[serde(default)]
    pub image: Option<String>,

    #[serde(default, deserialize_with = "one_or_many")]
    pub ports: Vec<PortMapping>,

    #[serde(default, deserialize_with = "one_or_many")]
    pub expose: Vec<ExposedPort>,

    #[serde(default)]
    pub command: Option<CommandLine>,

    #[serde(default)]
    pub entrypoint: Option<CommandLine>,

    #[serde(default, deserialize_with = "polymorphic_vec")]
    pub environment: Vec<EnvEntry>,
}

/// A published port. Only the container side matters for ingress.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortMapping {
    pub published: Option<String>,
    pub target: u16,
}

fn parse_port(raw: &str) -> Result<u16, PortError> {
    let raw = raw.trim();
    let number = raw.split_once('/').map_or(raw, |(port, _proto)| port);
    if number.contains('-') {
        return Err(PortError::Range(raw.to_string()));
    }
    number
        .parse()
        .map_err(|_| PortError::Invalid(raw.to_string()))
}

impl FromStr for PortMapping {
    type Err = PortError;

    /// Accepts `container`, `host:container` and `ip:host:container`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.rsplit_once(':') {
            Some((host, container)) => Ok(Self {
                published: Some(host.to_string()),
                target: parse_port(container)?,
            }),
            None => Ok(Self {
                published: None,
                target: parse_port(s)?,
            }),
        }
    }
}

impl<'de> Deserialize<'de> for PortMapping {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Published {
            Num(u16),
            Text(String),
        }

        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Num(u16),
            Short(String),
            Long {
                target: u16,
                #[serde(default)]
                published: Option<Published>,
            },
        }

        match Raw::deserialize(deserializer)? {
            Raw::Num(target) => Ok(Self {
                published: None,
                target,
            }),
            Raw::Short(s) => s.parse().map_err(serde::de::Error::custom),
            Raw::Long { target, published } => Ok(Self {
                published: published.map(|p| match p {
                    Published::Num(n) => n.to_string(),
                    Published::Text(s) => s,
                }),
                target,
            }),
        }
    }
}

/// A port exposed to other services only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExposedPort(pub u16);

impl FromStr for ExposedPort {
    type Err = PortError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_port(s).map(Self)
    }
}

impl<'de> Deserialize<'de> for ExposedPort {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Num(u16),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Num(n) => Ok(Self(n)),
            Raw::Text(s) => s.parse().map_err(serde::de::Error::custom),
        }
    }
}

/// `command` or `entrypoint`, in shell form or exec form.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum CommandLine {
    Shell(String),
    Exec(Vec<String>),
}

impl CommandLine {
    /// Renders the command as a single element.
    ///
    /// The shell form is kept verbatim. Exec form elements are joined with
    /// spaces, and elements containing whitespace are double quoted.
    pub fn to_single(&self) -> String {
        match self {
            CommandLine::Shell(s) => s.clone(),
            CommandLine::Exec(parts) => parts
                .iter()
                .map(|p| {
                    if p.chars().any(char::is_whitespace) {
                        format!("\"{}\"", p)
                    } else {
                        p.clone()
                    }
                })
                .collect::<Vec<_>>()
                .join(" "),
        }
    }
}

/// One environment entry. A missing value means "ask".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvEntry {
    pub key: String,
    pub value: Option<String>,
}

impl FromStr for EnvEntry {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (key, value) = match s.split_once('=') {
            Some((k, v)) => (k, Some(v.to_string())),
            None => (s, None),
        };
        let key = key.trim();
        if key.is_empty() {
            return Err(format!("environment entry '{}' has no name", s));
        }
        Ok(Self {
            key: key.to_string(),
            value,
        })
    }
}

impl TryFromKv for EnvEntry {
    type Err = String;
    fn try_from_kv(key: String, val: Option<String>) -> Result<Self, Self::Err> {
        if key.trim().is_empty() {
            return Err("environment entry has no name".to_string());
        }
        Ok(Self { key, value: val })
    }
}
