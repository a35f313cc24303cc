#[cfg(feature = "compose")]
use crate::compose::ComposeError;
use crate::config::ConfigError;
use crate::invocation::ValidationError;
use crate::logging::LoggingError;
use crate::lro::{LroError, ServerError};
use crate::schema::SchemaError;
use crate::transport::TransportError;
use std::time::Duration;
use sysexits::ExitCode;
use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum ArmctlError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("server responded {}: {source}", .source.status)]
    Server {
        #[source]
        source: ServerError,
    },

    #[error("no interactive prompt is available to answer: {0}")]
    PromptRequired(String),

    #[cfg(feature = "compose")]
    #[error(transparent)]
    Compose(ComposeError),

    #[error("operation did not complete within {}; poll {url} to follow it", format_limit(.limit))]
    Timeout { limit: Duration, url: Url },

    #[error(transparent)]
    Deserialize(#[from] SchemaError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Logging(#[from] LoggingError),

    #[error("{0}")]
    Protocol(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

fn format_limit(limit: &Duration) -> humantime::FormattedDuration {
    humantime::format_duration(*limit)
}

impl From<ServerError> for ArmctlError {
    fn from(source: ServerError) -> Self {
        ArmctlError::Server { source }
    }
}

impl From<LroError> for ArmctlError {
    fn from(e: LroError) -> Self {
        match e {
            LroError::Transport(e) => ArmctlError::Transport(e),
            LroError::Server(source) => ArmctlError::Server { source },
            LroError::Timeout { limit, url } => ArmctlError::Timeout { limit, url },
            LroError::Protocol(msg) => ArmctlError::Protocol(msg),
        }
    }
}

#[cfg(feature = "compose")]
impl From<ComposeError> for ArmctlError {
    fn from(e: ComposeError) -> Self {
        match e {
            ComposeError::PromptRequired(question) => ArmctlError::PromptRequired(question),
            other => ArmctlError::Compose(other),
        }
    }
}

impl std::process::Termination for ArmctlError {
    fn report(self) -> std::process::ExitCode {
        let code = self.exit_code();
        tracing::error!(exit_code = code, "{}", self);
        std::process::ExitCode::from(code)
    }
}

impl ArmctlError {
    pub fn exit_code(&self) -> u8 {
        match self {
            ArmctlError::Validation(_) => ExitCode::Usage.into(),
            ArmctlError::PromptRequired(_) => ExitCode::Usage.into(),
            ArmctlError::Transport(e) => match e {
                TransportError::Network(_) => ExitCode::Unavailable.into(),
                TransportError::Client(_) => ExitCode::Software.into(),
                TransportError::Auth(_) => ExitCode::NoPerm.into(),
            },
            ArmctlError::Server { source } => match source.status.as_u16() {
                401 | 403 => ExitCode::NoPerm.into(),
                404 => ExitCode::NoInput.into(),
                400..=499 => ExitCode::DataErr.into(),
                _ => ExitCode::Unavailable.into(),
            },
            #[cfg(feature = "compose")]
            ArmctlError::Compose(e) => match e {
                ComposeError::Io { .. } => ExitCode::NoInput.into(),
                _ => ExitCode::DataErr.into(),
            },
            ArmctlError::Timeout { .. } => ExitCode::TempFail.into(),
            ArmctlError::Deserialize(_) => ExitCode::Protocol.into(),
            ArmctlError::Protocol(_) => ExitCode::Protocol.into(),
            ArmctlError::Config(e) => match e {
                ConfigError::Io { .. } => ExitCode::NoInput.into(),
                _ => ExitCode::Config.into(),
            },
            ArmctlError::Logging(_) => ExitCode::Config.into(),
            ArmctlError::Io(_) => ExitCode::IoErr.into(),
        }
    }
}
