//! Data-driven command table.
//!
//! Each command is a [`CommandSpec`] value: its declared arguments, URL
//! template, api-version, body builder, response schema and LRO options.
//! Adding a resource type means adding a table entry, not a new type.
use crate::invocation::{ArgSpec, Invocation, ValidationError};
use crate::lro::LroOptions;
use crate::request::{RequestDescriptor, UrlTemplate};
use crate::schema::Schema;
use reqwest::Method;
use serde_json::Value;
use url::Url;

#[cfg(feature = "containerapp")]
pub mod container_app;
#[cfg(feature = "vmware")]
pub mod dns_service;
#[cfg(feature = "vmware")]
pub mod dns_zone;

/// Source of a URL placeholder value.
#[derive(Debug, Clone, Copy)]
pub enum PathParam {
    /// Taken from an invocation argument.
    Arg {
        placeholder: &'static str,
        arg: &'static str,
    },
    /// The subscription from the ambient configuration.
    Subscription { placeholder: &'static str },
}

impl PathParam {
    fn placeholder(&self) -> &'static str {
        match self {
            PathParam::Arg { placeholder, .. } | PathParam::Subscription { placeholder } => {
                placeholder
            }
        }
    }
}

pub type BodyBuilder = fn(&Invocation) -> Value;

/// Borrows a list argument as string slices for a body builder.
#[cfg(any(feature = "vmware", feature = "containerapp"))]
fn strs(list: Option<&[String]>) -> Option<impl Iterator<Item = &str>> {
    list.map(|items| items.iter().map(String::as_str))
}

pub struct CommandSpec {
    /// Full command path, e.g. `vmware workload-network dns-service create`.
    pub name: &'static str,
    pub method: Method,
    pub url: UrlTemplate,
    pub api_version: &'static str,
    pub path_params: &'static [PathParam],
    pub args: &'static [ArgSpec],
    pub body: BodyBuilder,
    pub response: &'static Schema,
    pub lro: LroOptions,
}

impl std::fmt::Debug for CommandSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandSpec")
            .field("name", &self.name)
            .field("method", &self.method)
            .field("url", &self.url)
            .field("api_version", &self.api_version)
            .finish_non_exhaustive()
    }
}

impl CommandSpec {
    /// Checks `invocation` against the declared arguments.
    pub fn validate(&self, invocation: Invocation) -> Result<Invocation, ValidationError> {
        crate::invocation::validate(self.args, invocation)
    }

    /// Builds the request for an already validated invocation.
    pub fn request(
        &self,
        endpoint: &Url,
        subscription: &str,
        invocation: &Invocation,
    ) -> Result<RequestDescriptor, ValidationError> {
        let path = self.url.render(|name| {
            self.path_params
                .iter()
                .find(|p| p.placeholder() == name)
                .and_then(|p| match p {
                    PathParam::Arg { arg, .. } => invocation.str(arg),
                    PathParam::Subscription { .. } => Some(subscription),
                })
        })?;

        let body = (self.body)(invocation);

        RequestDescriptor::build(
            self.method.clone(),
            endpoint,
            &path,
            self.api_version,
            Some(body),
            self.response,
        )
    }
}

/// The set of commands known to this build.
#[derive(Debug)]
pub struct CommandTable {
    commands: Vec<&'static CommandSpec>,
}

impl CommandTable {
    pub fn builtin() -> Self {
        #[allow(unused_mut)]
        let mut commands: Vec<&'static CommandSpec> = Vec::new();
        #[cfg(feature = "vmware")]
        {
            commands.push(&dns_service::CREATE);
            commands.push(&dns_zone::CREATE);
        }
        #[cfg(feature = "containerapp")]
        commands.push(&container_app::CREATE);
        Self { commands }
    }

    pub fn get(&self, name: &str) -> Option<&'static CommandSpec> {
        self.commands.iter().copied().find(|c| c.name == name)
    }

    /// Like [`CommandTable::get`], failing for names this build does not know.
    pub fn resolve(&self, name: &str) -> Result<&'static CommandSpec, ValidationError> {
        self.get(name)
            .ok_or_else(|| ValidationError::UnknownCommand(name.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &'static CommandSpec> + '_ {
        self.commands.iter().copied()
    }
}
