//! Layered configuration.
//!
//! Every setting can come from a TOML file, the environment or a command line
//! flag. clap reads env and flags into a partial argument struct; the file is
//! deserialized into the same struct and the two are merged with [`Overlay`],
//! the command line winning. The merged struct is then converted into its
//! resolved configuration with `TryFrom`, which applies defaults and reports
//! missing required values.
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub mod client;
pub mod parsers;
pub mod types;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read configuration file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse TOML configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("missing required configuration: {0}")]
    Missing(&'static str),

    #[error("{0}")]
    Validation(String),
}

/// Trait for merging two partial structs.
pub trait Overlay {
    /// self is the base layer, over is the top layer.
    fn overlay(self, over: Self) -> Self;
}

// If top layer exists, use it. Otherwise keep base.
impl<T> Overlay for Option<T> {
    fn overlay(self, over: Self) -> Self {
        over.or(self)
    }
}

impl<T> Overlay for Vec<T> {
    fn overlay(self, over: Self) -> Self {
        if over.is_empty() { self } else { over }
    }
}

// A switch can only be turned on by a higher layer.
impl Overlay for bool {
    fn overlay(self, over: Self) -> Self {
        self || over
    }
}

/// Resolves partial arguments against an optional configuration file.
pub trait Layered<C>: Overlay + DeserializeOwned + Default + Sized {
    fn resolve(self, config_path: Option<&Path>) -> Result<C, ConfigError>;
}

impl<T, C> Layered<C> for T
where
    T: Overlay + DeserializeOwned + Default,
    T: TryInto<C, Error = ConfigError>,
{
    fn resolve(self, config_path: Option<&Path>) -> Result<C, ConfigError> {
        let base = match config_path {
            Some(path) => load_file::<Self>(path)?,
            None => Self::default(),
        };

        base.overlay(self).try_into()
    }
}

fn load_file<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::debug!(path = ?path, "loaded configuration file");
    Ok(toml::from_str::<T>(&content)?)
}
