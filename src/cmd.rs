//! Command line surface.
use crate::client::{ArmClient, Outcome};
use crate::commands::CommandTable;
use crate::config::client::{ClientArgs, ClientConfig};
use crate::config::{ConfigError, Layered};
use crate::error::ArmctlError;
use crate::invocation::Invocation;
use crate::lro::PendingOperation;
use crate::logging::{Logger, LoggerArgs};
use armctl_derive::LayeredConfig;
use clap::{Args, Parser, Subcommand};
use serde::Deserialize;
use std::io::Write;
use std::path::PathBuf;

#[cfg(feature = "containerapp")]
pub mod containerapp;
#[cfg(feature = "vmware")]
pub mod vmware;

#[derive(Parser, Debug)]
#[command(name = "armctl")]
#[command(version, about = "Create management-plane resources and await their completion", long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Azure VMware Solution private cloud resources
    #[cfg(feature = "vmware")]
    Vmware(vmware::VmwareArgs),

    /// Container apps
    #[cfg(feature = "containerapp")]
    Containerapp(containerapp::ContainerAppArgs),
}

/// Settings shared by every command.
#[derive(Debug, Clone)]
pub struct Settings {
    pub client: ClientConfig,
    pub logger: Logger,
}

#[derive(Args, Debug, Clone, Default, Deserialize, LayeredConfig)]
#[armctl(try_into = "Settings")]
pub struct GlobalArgs {
    /// Path to configuration file
    #[arg(long, env = "ARMCTL_CONFIG", global = true)]
    #[serde(skip)]
    #[armctl(skip)]
    pub config: Option<PathBuf>,

    #[command(flatten, next_help_heading = "Connection")]
    #[serde(flatten)]
    pub client: ClientArgs,

    #[command(flatten, next_help_heading = "Logging")]
    #[serde(flatten)]
    pub logger: LoggerArgs,
}

impl GlobalArgs {
    /// Merges the configuration file under env and flags.
    pub fn load(self) -> Result<Settings, ConfigError> {
        let path = self.config.clone();
        self.resolve(path.as_deref())
    }
}

/// What the command line resolves to.
pub enum Action {
    /// One command from the table, by name.
    Execute(&'static str, Invocation),
    /// A compose project, planned into several container app creations.
    #[cfg(feature = "compose")]
    Compose(containerapp::ComposeCreateArgs),
}

impl Command {
    pub fn into_action(self) -> Action {
        match self {
            #[cfg(feature = "vmware")]
            Command::Vmware(args) => {
                let (name, invocation) = args.into_invocation();
                Action::Execute(name, invocation)
            }
            #[cfg(feature = "containerapp")]
            Command::Containerapp(args) => args.into_action(),
        }
    }
}

fn print_json(value: &serde_json::Value) -> Result<(), ArmctlError> {
    let rendered =
        serde_json::to_string_pretty(value).map_err(|e| ArmctlError::Protocol(e.to_string()))?;
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{}", rendered)?;
    Ok(())
}

fn log_pending(pending: &PendingOperation) {
    tracing::info!(
        url = %pending.polling_url,
        strategy = %pending.strategy,
        "operation accepted and still running"
    );
}

pub async fn run(cli: Cli) -> Result<(), ArmctlError> {
    let settings = match cli.global.load() {
        Ok(settings) => settings,
        Err(e) => {
            // Still report through a subscriber when the file is what failed.
            let _ = Logger::default().init();
            return Err(e.into());
        }
    };
    settings.logger.init()?;

    let client = ArmClient::new(&settings.client)?;

    match cli.cmd.into_action() {
        Action::Execute(name, invocation) => {
            let spec = CommandTable::builtin().resolve(name)?;
            match client.execute(spec, invocation).await? {
                Outcome::Completed(result) => print_json(&result.flattened())?,
                Outcome::Pending(pending) => log_pending(&pending),
            }
        }
        #[cfg(feature = "compose")]
        Action::Compose(args) => compose(&client, args).await?,
    }
    Ok(())
}

/// Plans and creates every service of a compose project.
///
/// Prints one entry per service. Fails with the first error after every
/// service has been attempted.
#[cfg(feature = "compose")]
async fn compose(
    client: &ArmClient,
    args: containerapp::ComposeCreateArgs,
) -> Result<(), ArmctlError> {
    use crate::compose::{self, prompt};
    use std::io::IsTerminal;

    let project = compose::load_project(&args.project).await?;
    let options = args.options();
    let interactive = std::io::stdin().is_terminal();
    let invocations = tokio::task::spawn_blocking(move || {
        if interactive {
            compose::plan::plan(&project, &options, &prompt::Terminal)
        } else {
            compose::plan::plan(&project, &options, &prompt::NonInteractive)
        }
    })
    .await
    .map_err(|e| ArmctlError::Protocol(format!("planning task failed: {}", e)))??;

    let names: Vec<String> = invocations
        .iter()
        .map(|inv| inv.str("name").unwrap_or_default().to_string())
        .collect();
    let results = compose::create_all(client, invocations, args.concurrency).await;

    let mut first_error = None;
    let mut report = Vec::with_capacity(results.len());
    for (name, result) in names.into_iter().zip(results) {
        let entry = match result {
            Ok(Outcome::Completed(result)) => {
                serde_json::json!({ "name": name, "result": result.flattened() })
            }
            Ok(Outcome::Pending(pending)) => {
                log_pending(&pending);
                serde_json::json!({ "name": name, "pending": pending.polling_url.as_str() })
            }
            Err(e) => {
                tracing::error!(app = %name, "{}", e);
                let entry = serde_json::json!({ "name": name, "error": e.to_string() });
                first_error.get_or_insert(e);
                entry
            }
        };
        report.push(entry);
    }
    print_json(&serde_json::Value::Array(report))?;

    match first_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
