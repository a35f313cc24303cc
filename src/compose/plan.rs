//! Translation of compose services into `containerapp create` invocations.
use super::ComposeError;
use super::prompt::Prompt;
use super::types::{ComposeProject, ComposeService};
use crate::invocation::Invocation;
use indexmap::IndexMap;
use std::collections::HashMap;
use tracing::debug;

/// Settings applied to every app created from a project.
#[derive(Debug, Clone, Default)]
pub struct ComposeOptions {
    pub resource_group: String,
    /// Managed environment resource id.
    pub environment: String,
    pub location: Option<String>,
    /// Whitespace separated `service=transport` pairs. May be given several times.
    pub transport_mappings: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ingress {
    pub external: bool,
    pub target_port: u16,
}

/// App names are lowercase and use `-` where compose allows `_`.
pub fn app_name(service: &str) -> String {
    service.to_lowercase().replace('_', "-")
}

fn wire_transport(raw: &str) -> Option<&'static str> {
    match raw.to_ascii_lowercase().as_str() {
        "auto" => Some("Auto"),
        "http" => Some("Http"),
        "http2" => Some("Http2"),
        "tcp" => Some("Tcp"),
        _ => None,
    }
}

/// Parses transport mappings into service name to wire transport.
///
/// Later mappings for the same service win.
pub fn parse_transport_mappings(
    raw: &[String],
) -> Result<IndexMap<String, &'static str>, ComposeError> {
    let mut mappings = IndexMap::new();
    for pair in raw.iter().flat_map(|r| r.split_whitespace()) {
        let (service, transport) = pair.split_once('=').ok_or_else(|| {
            ComposeError::Argument(format!("expected service=transport, got '{}'", pair))
        })?;
        let wire = wire_transport(transport).ok_or_else(|| {
            ComposeError::Argument(format!(
                "unknown transport '{}' for service '{}'; expected auto, http, http2 or tcp",
                transport, service
            ))
        })?;
        mappings.insert(service.to_string(), wire);
    }
    Ok(mappings)
}

/// Chooses ingress from published ports first, then exposed ports.
pub fn resolve_ingress(
    name: &str,
    service: &ComposeService,
    prompt: &dyn Prompt,
) -> Result<Option<Ingress>, ComposeError> {
    let (external, candidates): (bool, Vec<u16>) = if !service.ports.is_empty() {
        (true, service.ports.iter().map(|p| p.target).collect())
    } else if !service.expose.is_empty() {
        (false, service.expose.iter().map(|e| e.0).collect())
    } else {
        return Ok(None);
    };

    let mut distinct: Vec<u16> = Vec::with_capacity(candidates.len());
    for port in candidates {
        if !distinct.contains(&port) {
            distinct.push(port);
        }
    }

    let target_port = match distinct.as_slice() {
        [only] => *only,
        _ => {
            let options: Vec<String> = distinct.iter().map(u16::to_string).collect();
            let question = format!(
                "Which port should service '{}' receive ingress traffic on?",
                name
            );
            let index = prompt.choose(&question, &options)?;
            *distinct
                .get(index)
                .ok_or_else(|| ComposeError::Argument(format!("no port option {}", index)))?
        }
    };

    Ok(Some(Ingress {
        external,
        target_port,
    }))
}

/// Returns the container `command` and `args`.
pub fn resolve_command(service: &ComposeService) -> (Vec<String>, Vec<String>) {
    let command = service.command.as_ref().map(|c| c.to_single());
    match service.entrypoint.as_ref() {
        Some(entrypoint) => (
            vec![entrypoint.to_single()],
            command.into_iter().collect(),
        ),
        None => (command.into_iter().collect(), Vec::new()),
    }
}

/// Returns `KEY=VALUE` pairs, asking for values the descriptor left empty.
pub fn resolve_environment(
    name: &str,
    service: &ComposeService,
    prompt: &dyn Prompt,
) -> Result<Vec<String>, ComposeError> {
    service
        .environment
        .iter()
        .map(|entry| {
            let value = match entry.value.as_deref() {
                Some(v) if !v.is_empty() => v.to_string(),
                _ => prompt.input(&format!(
                    "Value for environment variable '{}' of service '{}'",
                    entry.key, name
                ))?,
            };
            Ok(format!("{}={}", entry.key, value))
        })
        .collect()
}

/// Builds one `containerapp create` invocation per service, in declaration order.
pub fn plan(
    project: &ComposeProject,
    options: &ComposeOptions,
    prompt: &dyn Prompt,
) -> Result<Vec<Invocation>, ComposeError> {
    let transports = parse_transport_mappings(&options.transport_mappings)?;

    for unknown in transports
        .keys()
        .filter(|k| !project.services.contains_key(k.as_str()))
    {
        debug!(service = %unknown, "transport mapping matches no service");
    }

    let mut names: HashMap<String, &str> = HashMap::new();
    for service in project.services.keys() {
        if let Some(first) = names.insert(app_name(service), service) {
            return Err(ComposeError::Argument(format!(
                "services '{}' and '{}' both map to container app '{}'",
                first,
                service,
                app_name(service)
            )));
        }
    }

    project
        .services
        .iter()
        .map(|(name, service)| {
            let image = service
                .image
                .clone()
                .ok_or_else(|| ComposeError::MissingImage(name.clone()))?;

            let ingress = resolve_ingress(name, service, prompt)?;
            let (command, args) = resolve_command(service);
            let env = resolve_environment(name, service, prompt)?;
            let transport = ingress
                .and(transports.get(name.as_str()))
                .map(|t| t.to_string());

            debug!(service = %name, ?ingress, transport = ?transport, "planned service");

            Ok(Invocation::new()
                .with("name", app_name(name))
                .with("resource_group", options.resource_group.as_str())
                .with("environment", options.environment.as_str())
                .with("image", image)
                .with_opt("location", options.location.clone())
                .with_opt("target_port", ingress.map(|i| i.target_port))
                .with_opt(
                    "ingress",
                    ingress.map(|i| if i.external { "external" } else { "internal" }),
                )
                .with_opt("transport", transport)
                .with_opt("command", Some(command))
                .with_opt("args", Some(args))
                .with_opt("env_vars", Some(env)))
        })
        .collect()
}
