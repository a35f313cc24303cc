use super::Action;
use crate::commands::container_app::ContainerAppCreateArgs;
use clap::{Args, Subcommand};

#[cfg(feature = "compose")]
use crate::{compose::plan::ComposeOptions, config::types::ConcurrencyLimit};
#[cfg(feature = "compose")]
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct ContainerAppArgs {
    #[command(subcommand)]
    pub cmd: ContainerAppCommand,
}

#[derive(Subcommand, Debug)]
pub enum ContainerAppCommand {
    Create(ContainerAppCreateArgs),

    /// Container apps from a compose project
    #[cfg(feature = "compose")]
    #[command(subcommand)]
    Compose(ComposeCommand),
}

#[cfg(feature = "compose")]
#[derive(Subcommand, Debug)]
pub enum ComposeCommand {
    /// Create one container app per compose service.
    Create(ComposeCreateArgs),
}

#[cfg(feature = "compose")]
#[derive(Args, Debug, Clone)]
pub struct ComposeCreateArgs {
    /// Project descriptor as printed by `docker compose config --format json`
    #[arg(short = 'f', long, env = "ARMCTL_COMPOSE_PROJECT")]
    pub project: PathBuf,

    /// Name of the resource group
    #[arg(short = 'g', long)]
    pub resource_group: String,

    /// Resource id of the managed environment
    #[arg(long)]
    pub environment: String,

    /// Resource location
    #[arg(short = 'l', long)]
    pub location: Option<String>,

    /// Ingress transport per service, e.g. "web=http2 api=tcp". Repeatable.
    #[arg(long = "transport-mapping")]
    pub transport_mappings: Vec<String>,

    /// Maximum number of apps created at once
    #[arg(long, env = "ARMCTL_COMPOSE_CONCURRENCY", default_value_t = ConcurrencyLimit::default())]
    pub concurrency: ConcurrencyLimit,
}

#[cfg(feature = "compose")]
impl ComposeCreateArgs {
    pub fn options(&self) -> ComposeOptions {
        ComposeOptions {
            resource_group: self.resource_group.clone(),
            environment: self.environment.clone(),
            location: self.location.clone(),
            transport_mappings: self.transport_mappings.clone(),
        }
    }
}

impl ContainerAppArgs {
    pub fn into_action(self) -> Action {
        match self.cmd {
            ContainerAppCommand::Create(args) => {
                Action::Execute("containerapp create", args.into())
            }
            #[cfg(feature = "compose")]
            ContainerAppCommand::Compose(ComposeCommand::Create(args)) => {
                Action::Compose(args)
            }
        }
    }
}
