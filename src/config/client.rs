use super::types::{HumanDuration, PollInterval};
use crate::auth::AuthToken;
use crate::lro::PollOptions;
use armctl_derive::LayeredConfig;
use clap::Args;
use serde::Deserialize;
use std::time::Duration;
use url::Url;

/// Resolved settings for talking to the management endpoint.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub endpoint: Url,
    pub subscription: String,
    pub access_token: Option<AuthToken>,
    pub poll_interval: PollInterval,
    pub timeout: HumanDuration,
    pub request_timeout: HumanDuration,
    pub no_wait: bool,
}

impl ClientConfig {
    pub fn poll_options(&self) -> PollOptions {
        PollOptions {
            interval: self.poll_interval.into(),
            timeout: (!self.timeout.is_zero()).then_some(self.timeout.into()),
            no_wait: self.no_wait,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout.into()
    }
}

#[derive(Args, Debug, Clone, Default, Deserialize, LayeredConfig)]
#[serde(rename_all = "kebab-case")]
#[armctl(try_into = "ClientConfig")]
pub struct ClientArgs {
    /// Management endpoint base URL
    #[arg(long, env = "ARMCTL_ENDPOINT", global = true)]
    #[armctl(default = "https://management.azure.com")]
    pub endpoint: Option<Url>,

    /// Subscription id used in resource URLs
    #[arg(long, env = "ARMCTL_SUBSCRIPTION", global = true)]
    pub subscription: Option<String>,

    /// Bearer token for the management endpoint.
    ///
    /// Either the token itself or `file:/path/to/token`. A token file is
    /// re-read for every request.
    #[arg(long, env = "ARMCTL_ACCESS_TOKEN", hide_env_values = true, global = true)]
    #[armctl(optional)]
    pub access_token: Option<AuthToken>,

    /// Delay between polls when the service does not send `Retry-After`.
    ///
    /// Unitless numbers are interpreted as seconds. Must be greater than zero.
    #[arg(long, env = "ARMCTL_POLL_INTERVAL", global = true)]
    #[armctl(default = PollInterval::from_secs(5))]
    pub poll_interval: Option<PollInterval>,

    /// Upper bound on waiting for a long-running operation. `0` waits indefinitely.
    #[arg(long, env = "ARMCTL_TIMEOUT", global = true)]
    #[armctl(default = "30m")]
    pub timeout: Option<HumanDuration>,

    /// Timeout for a single HTTP request
    #[arg(long, env = "ARMCTL_REQUEST_TIMEOUT", global = true)]
    #[armctl(default = "60s")]
    pub request_timeout: Option<HumanDuration>,

    /// Return as soon as the service accepts the operation
    #[arg(long, env = "ARMCTL_NO_WAIT", global = true)]
    #[serde(default)]
    pub no_wait: bool,
}
