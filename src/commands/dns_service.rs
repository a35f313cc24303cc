//! `vmware workload-network dns-service create`
//!
//! Creates a DNS service in the default workload network of a private cloud.
use super::{CommandSpec, PathParam, strs};
use crate::invocation::{ArgKind, ArgSpec, Invocation};
use crate::lro::{FinalStateVia, LroOptions, StatusPolicy};
use crate::request::{Content, UrlTemplate};
use crate::schema::{Field, Schema};
use clap::Args;
use reqwest::Method;
use serde_json::Value;

pub const NAME_PATTERN: &str = r"^[-\w\._]+$";

const ARGS: &[ArgSpec] = &[
    ArgSpec::new(
        "dns_service",
        &["--dns-service", "--name", "-n"],
        ArgKind::Str,
    )
    .required(),
    ArgSpec::new("private_cloud", &["--private-cloud", "-c"], ArgKind::Str)
        .required()
        .pattern(NAME_PATTERN),
    ArgSpec::new("resource_group", &["--resource-group", "-g"], ArgKind::Str).required(),
    ArgSpec::new("default_dns_zone", &["--default-dns-zone"], ArgKind::Str),
    ArgSpec::new("display_name", &["--display-name"], ArgKind::Str),
    ArgSpec::new("dns_service_ip", &["--dns-service-ip"], ArgKind::Str),
    ArgSpec::new("fqdn_zones", &["--fqdn-zones"], ArgKind::StrList),
    ArgSpec::new("log_level", &["--log-level"], ArgKind::Str).allowed(&[
        "DEBUG", "ERROR", "FATAL", "INFO", "WARNING",
    ]),
    ArgSpec::new("revision", &["--revision"], ArgKind::Int),
];

const PROPERTIES: &[Field] = &[
    Field::new("defaultDnsZone", Schema::Str),
    Field::new("displayName", Schema::Str),
    Field::new("dnsServiceIp", Schema::Str),
    Field::new("fqdnZones", Schema::List(&Schema::Str)),
    Field::new("logLevel", Schema::Str),
    Field::new("provisioningState", Schema::Str).read_only(),
    Field::new("revision", Schema::Int),
    Field::new("status", Schema::Str).read_only(),
];

const FIELDS: &[Field] = &[
    Field::new("id", Schema::Str).read_only(),
    Field::new("name", Schema::Str).read_only(),
    Field::new("properties", Schema::Object(PROPERTIES)).flatten(),
    Field::new("type", Schema::Str).read_only(),
];

pub static RESPONSE: Schema = Schema::Object(FIELDS);

pub static CREATE: CommandSpec = CommandSpec {
    name: "vmware workload-network dns-service create",
    method: Method::PUT,
    url: UrlTemplate(
        "/subscriptions/{subscriptionId}/resourceGroups/{resourceGroupName}/providers/Microsoft.AVS/privateClouds/{privateCloudName}/workloadNetworks/default/dnsServices/{dnsServiceId}",
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
            placeholder: "dnsServiceId",
            arg: "dns_service",
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
        p.prop("defaultDnsZone", inv.str("default_dns_zone"))
            .prop("displayName", inv.str("display_name"))
            .prop("dnsServiceIp", inv.str("dns_service_ip"))
            .list("fqdnZones", strs(inv.list("fqdn_zones")))
            .prop("logLevel", inv.str("log_level"))
            .prop("revision", inv.int("revision"));
    });
    content.into_value()
}

/// Create a DNS service by id in a private cloud workload network.
#[derive(Args, Debug, Clone, Default)]
pub struct DnsServiceCreateArgs {
    /// NSX DNS Service identifier. Generally the same as the DNS Service's display name
    #[arg(short = 'n', long = "dns-service", visible_alias = "name")]
    pub dns_service: Option<String>,

    /// Name of the private cloud
    #[arg(short = 'c', long)]
    pub private_cloud: Option<String>,

    /// Name of the resource group
    #[arg(short = 'g', long)]
    pub resource_group: Option<String>,

    /// Default DNS zone of the DNS Service
    #[arg(long)]
    pub default_dns_zone: Option<String>,

    /// Display name of the DNS Service
    #[arg(long)]
    pub display_name: Option<String>,

    /// DNS service IP of the DNS Service
    #[arg(long)]
    pub dns_service_ip: Option<String>,

    /// FQDN zones of the DNS Service
    #[arg(long, num_args = 1..)]
    pub fqdn_zones: Vec<String>,

    /// DNS Service log level: DEBUG, ERROR, FATAL, INFO or WARNING
    #[arg(long)]
    pub log_level: Option<String>,

    /// NSX revision number
    #[arg(long, allow_negative_numbers = true)]
    pub revision: Option<i64>,
}

impl From<DnsServiceCreateArgs> for Invocation {
    fn from(args: DnsServiceCreateArgs) -> Self {
        Invocation::new()
            .with_opt("dns_service", args.dns_service)
            .with_opt("private_cloud", args.private_cloud)
            .with_opt("resource_group", args.resource_group)
            .with_opt("default_dns_zone", args.default_dns_zone)
            .with_opt("display_name", args.display_name)
            .with_opt("dns_service_ip", args.dns_service_ip)
            .with_opt("fqdn_zones", Some(args.fqdn_zones))
            .with_opt("log_level", args.log_level)
            .with_opt("revision", args.revision)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invocation::ValidationError;
    use serde_json::json;
    use url::Url;

    fn example() -> Invocation {
        Invocation::new()
            .with("dns_service", "dnsService1")
            .with("private_cloud", "cloud1")
            .with("resource_group", "group1")
            .with("dns_service_ip", "5.5.5.5")
            .with("default_dns_zone", "defaultDnsZone1")
            .with("fqdn_zones", vec!["fqdnZone1"])
            .with("log_level", "info")
            .with("revision", 1i64)
    }

    #[test]
    fn test_example_request() {
        let inv = CREATE.validate(example()).unwrap();
        let endpoint = Url::parse("https://management.azure.com").unwrap();
        let req = CREATE.request(&endpoint, "sub1", &inv).unwrap();

        assert_eq!(req.method, Method::PUT);
        assert_eq!(
            req.url.as_str(),
            "https://management.azure.com/subscriptions/sub1/resourceGroups/group1/providers/Microsoft.AVS/privateClouds/cloud1/workloadNetworks/default/dnsServices/dnsService1?api-version=2023-03-01"
        );
        assert_eq!(
            req.body,
            Some(json!({
                "properties": {
                    "dnsServiceIp": "5.5.5.5",
                    "defaultDnsZone": "defaultDnsZone1",
                    "fqdnZones": ["fqdnZone1"],
                    "logLevel": "INFO",
                    "revision": 1
                }
            }))
        );
    }

    #[test]
    fn test_dot_segment_name_is_rejected() {
        let inv = CREATE.validate(example().with("dns_service", "..")).unwrap();
        let endpoint = Url::parse("https://management.azure.com").unwrap();
        assert_eq!(
            CREATE.request(&endpoint, "sub1", &inv).unwrap_err(),
            ValidationError::DotSegment {
                placeholder: "dnsServiceId",
                value: "..".into(),
            }
        );
    }

    #[test]
    fn test_fqdn_zone_order_is_kept() {
        let inv = CREATE
            .validate(example().with("fqdn_zones", vec!["b", "a", "c"]))
            .unwrap();
        assert_eq!(body(&inv)["properties"]["fqdnZones"], json!(["b", "a", "c"]));
    }

    #[test]
    fn test_missing_required_are_reported_together() {
        let err = CREATE.validate(Invocation::new()).unwrap_err();
        assert_eq!(
            err,
            ValidationError::Missing("--dns-service, --private-cloud, --resource-group".into())
        );
    }

    #[test]
    fn test_args_convert_to_invocation() {
        let args = DnsServiceCreateArgs {
            dns_service: Some("svc".into()),
            fqdn_zones: vec![],
            revision: Some(3),
            ..Default::default()
        };
        let inv = Invocation::from(args);
        assert_eq!(inv.str("dns_service"), Some("svc"));
        assert_eq!(inv.int("revision"), Some(3));
        assert!(inv.get("fqdn_zones").is_none());
    }

    #[test]
    fn test_response_exposes_provisioning_state() {
        let body = json!({
            "id": "/subscriptions/sub1/.../dnsServices/dnsService1",
            "name": "dnsService1",
            "type": "Microsoft.AVS/privateClouds/workloadNetworks/dnsServices",
            "properties": {
                "dnsServiceIp": "5.5.5.5",
                "provisioningState": "Succeeded",
                "status": "SUCCESS",
                "revision": 1
            }
        });
        let result = crate::schema::OperationResult::from_value(&RESPONSE, &body).unwrap();
        assert_eq!(
            result.get("properties.provisioningState"),
            Some(&json!("Succeeded"))
        );
        assert_eq!(result.flattened()["status"], json!("SUCCESS"));
    }
}
