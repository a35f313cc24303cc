//! `vmware workload-network dns-zone create`
use super::dns_service::NAME_PATTERN;
use super::{CommandSpec, PathParam, strs};
use crate::invocation::{ArgKind, ArgSpec, Invocation};
use crate::lro::{FinalStateVia, LroOptions, StatusPolicy};
use crate::request::{Content, UrlTemplate};
use crate::schema::{Field, Schema};
use clap::Args;
use reqwest::Method;
use serde_json::Value;

const ARGS: &[ArgSpec] = &[
    ArgSpec::new("dns_zone", &["--dns-zone", "--name", "-n"], ArgKind::Str).required(),
    ArgSpec::new("private_cloud", &["--private-cloud", "-c"], ArgKind::Str)
        .required()
        .pattern(NAME_PATTERN),
    ArgSpec::new("resource_group", &["--resource-group", "-g"], ArgKind::Str).required(),
    ArgSpec::new("display_name", &["--display-name"], ArgKind::Str),
    ArgSpec::new("domain", &["--domain"], ArgKind::StrList),
    ArgSpec::new("dns_server_ips", &["--dns-server-ips"], ArgKind::StrList),
    ArgSpec::new("source_ip", &["--source-ip"], ArgKind::Str),
    ArgSpec::new("dns_services", &["--dns-services"], ArgKind::Int),
    ArgSpec::new("revision", &["--revision"], ArgKind::Int),
];

const PROPERTIES: &[Field] = &[
    Field::new("displayName", Schema::Str),
    Field::new("dnsServerIps", Schema::List(&Schema::Str)),
    Field::new("dnsServices", Schema::Int),
    Field::new("domain", Schema::List(&Schema::Str)),
    Field::new("provisioningState", Schema::Str).read_only(),
    Field::new("revision", Schema::Int),
    Field::new("sourceIp", Schema::Str),
];

const FIELDS: &[Field] = &[
    Field::new("id", Schema::Str).read_only(),
    Field::new("name", Schema::Str).read_only(),
    Field::new("properties", Schema::Object(PROPERTIES)).flatten(),
    Field::new("type", Schema::Str).read_only(),
];

pub static RESPONSE: Schema = Schema::Object(FIELDS);

pub static CREATE: CommandSpec = CommandSpec {
    name: "vmware workload-network dns-zone create",
    method: Method::PUT,
    url: UrlTemplate(
        "/subscriptions/{subscriptionId}/resourceGroups/{resourceGroupName}/providers/Microsoft.AVS/privateClouds/{privateCloudName}/workloadNetworks/default/dnsZones/{dnsZoneId}",
    ),
    api_version: "2023-03-01",
    path_params: &[
        PathParam::Subscription {
            placeholder: "subscriptionId",
        },
        PathParam::Arg {
            placeholder: "resourceGroupName",
            arg: "resource_group",
        },
        PathParam::Arg {
            placeholder: "privateCloudName",
            arg: "private_cloud",
        },
        PathParam::Arg {
            placeholder: "dnsZoneId",
            arg: "dns_zone",
        },
    ],
    args: ARGS,
    body,
    response: &RESPONSE,
    lro: LroOptions {
        final_state_via: FinalStateVia::AzureAsyncOperation,
        policy: StatusPolicy::CREATE,
    },
};

fn body(inv: &Invocation) -> Value {
    let mut content = Content::new();
    content.required_object("properties", |p| {
        p.prop("displayName", inv.str("display_name"))
            .list("dnsServerIps", strs(inv.list("dns_server_ips")))
            .prop("dnsServices", inv.int("dns_services"))
            .list("domain", strs(inv.list("domain")))
            .prop("revision", inv.int("revision"))
            .prop("sourceIp", inv.str("source_ip"));
    });
    content.into_value()
}

/// Create a DNS zone by id in a private cloud workload network.
#[derive(Args, Debug, Clone, Default)]
pub struct DnsZoneCreateArgs {
    /// NSX DNS zone identifier. Generally the same as the DNS zone's display name
    #[arg(short = 'n', long = "dns-zone", visible_alias = "name")]
    pub dns_zone: Option<String>,

    /// Name of the private cloud
    #[arg(short = 'c', long)]
    pub private_cloud: Option<String>,

    /// Name of the resource group
    #[arg(short = 'g', long)]
    pub resource_group: Option<String>,

    /// Display name of the DNS zone
    #[arg(long)]
    pub display_name: Option<String>,

    /// Domain names of the DNS zone
    #[arg(long, num_args = 1..)]
    pub domain: Vec<String>,

    /// DNS server IP addresses to forward queries to
    #[arg(long, num_args = 1..)]
    pub dns_server_ips: Vec<String>,

    /// Source IP of the DNS zone
    #[arg(long)]
    pub source_ip: Option<String>,

    /// Number of DNS services using the zone
    #[arg(long)]
    pub dns_services: Option<i64>,

    /// NSX revision number
    #[arg(long)]
    pub revision: Option<i64>,
}

impl From<DnsZoneCreateArgs> for Invocation {
    fn from(args: DnsZoneCreateArgs) -> Self {
        Invocation::new()
            .with_opt("dns_zone", args.dns_zone)
            .with_opt("private_cloud", args.private_cloud)
            .with_opt("resource_group", args.resource_group)
            .with_opt("display_name", args.display_name)
            .with_opt("domain", Some(args.domain))
            .with_opt("dns_server_ips", Some(args.dns_server_ips))
            .with_opt("source_ip", args.source_ip)
            .with_opt("dns_services", args.dns_services)
            .with_opt("revision", args.revision)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invocation::ValidationError;
    use serde_json::json;
    use url::Url;

    #[test]
    fn test_request_body_and_url() {
        let inv = CREATE
            .validate(
                Invocation::new()
                    .with("dns_zone", "zone1")
                    .with("private_cloud", "cloud1")
                    .with("resource_group", "group1")
                    .with("domain", vec!["corp.example", "lab.example"])
                    .with("dns_server_ips", vec!["10.0.0.53"])
                    .with("dns_services", 1i64),
            )
            .unwrap();
        let endpoint = Url::parse("https://management.azure.com").unwrap();
        let req = CREATE.request(&endpoint, "sub1", &inv).unwrap();

        assert!(
            req.url
                .path()
                .ends_with("/workloadNetworks/default/dnsZones/zone1")
        );
        assert_eq!(
            req.body,
            Some(json!({
                "properties": {
                    "dnsServerIps": ["10.0.0.53"],
                    "dnsServices": 1,
                    "domain": ["corp.example", "lab.example"]
                }
            }))
        );
    }

    #[test]
    fn test_private_cloud_pattern() {
        let err = CREATE
            .validate(
                Invocation::new()
                    .with("dns_zone", "zone1")
                    .with("private_cloud", "bad cloud")
                    .with("resource_group", "group1"),
            )
            .unwrap_err();
        assert!(matches!(err, ValidationError::Pattern { .. }));
    }
}
