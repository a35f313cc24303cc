//! Container apps from compose descriptors.
//!
//! A project is read from the JSON that `docker compose config --format json`
//! prints, planned into one `containerapp create` invocation per service and
//! then created with bounded concurrency.
pub mod plan;
pub mod prompt;
pub mod types;

use crate::client::{ArmClient, Outcome};
use crate::commands::container_app;
use crate::config::types::ConcurrencyLimit;
use crate::error::ArmctlError;
use crate::invocation::Invocation;
use futures::stream::{self, StreamExt};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;
use types::{ComposeProject, PortError};

#[derive(Debug, Error)]
pub enum ComposeError {
    #[error("input required: {0}")]
    PromptRequired(String),

    #[error("service '{0}' has no image")]
    MissingImage(String),

    #[error(transparent)]
    Port(#[from] PortError),

    #[error("invalid argument: {0}")]
    Argument(String),

    #[error("invalid compose descriptor: {0}")]
    Descriptor(#[from] serde_json::Error),

    #[error("failed to read answer from terminal: {0}")]
    Terminal(#[source] std::io::Error),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Reads a project from a JSON descriptor file.
pub async fn load_project(path: &Path) -> Result<ComposeProject, ComposeError> {
    let raw = tokio::fs::read(path)
        .await
        .map_err(|source| ComposeError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(serde_json::from_slice(&raw)?)
}

/// Creates one app per invocation, at most `limit` at a time.
///
/// Results are returned in the order of `invocations`. A failure does not
/// stop the remaining creations.
pub async fn create_all(
    client: &ArmClient,
    invocations: Vec<Invocation>,
    limit: ConcurrencyLimit,
) -> Vec<Result<Outcome, ArmctlError>> {
    info!(apps = invocations.len(), %limit, "creating container apps");
    stream::iter(invocations)
        .map(|invocation| client.execute(&container_app::CREATE, invocation))
        .buffered(limit.into_inner())
        .collect()
        .await
}
