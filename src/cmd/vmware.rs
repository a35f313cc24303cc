use crate::commands::dns_service::DnsServiceCreateArgs;
use crate::commands::dns_zone::DnsZoneCreateArgs;
use crate::invocation::Invocation;
use clap::{Args, Subcommand};

#[derive(Args, Debug)]
pub struct VmwareArgs {
    #[command(subcommand)]
    pub cmd: VmwareCommand,
}

#[derive(Subcommand, Debug)]
pub enum VmwareCommand {
    /// Workload network resources of a private cloud
    WorkloadNetwork(WorkloadNetworkArgs),
}

#[derive(Args, Debug)]
pub struct WorkloadNetworkArgs {
    #[command(subcommand)]
    pub cmd: WorkloadNetworkCommand,
}

#[derive(Subcommand, Debug)]
pub enum WorkloadNetworkCommand {
    /// DNS services
    #[command(subcommand)]
    DnsService(DnsServiceCommand),

    /// DNS zones
    #[command(subcommand)]
    DnsZone(DnsZoneCommand),
}

#[derive(Subcommand, Debug)]
pub enum DnsServiceCommand {
    Create(DnsServiceCreateArgs),
}

#[derive(Subcommand, Debug)]
pub enum DnsZoneCommand {
    Create(DnsZoneCreateArgs),
}

impl VmwareArgs {
    /// The command table name and invocation selected on the command line.
    pub fn into_invocation(self) -> (&'static str, Invocation) {
        match self.cmd {
            VmwareCommand::WorkloadNetwork(network) => match network.cmd {
                WorkloadNetworkCommand::DnsService(DnsServiceCommand::Create(args)) => {
                    ("vmware workload-network dns-service create", args.into())
                }
                WorkloadNetworkCommand::DnsZone(DnsZoneCommand::Create(args)) => {
                    ("vmware workload-network dns-zone create", args.into())
                }
            },
        }
    }
}
