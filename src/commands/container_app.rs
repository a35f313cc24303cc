//! `containerapp create`
//!
//! Creates a single-container app in a managed environment. The compose
//! collaborator produces invocations of this command.
use super::{CommandSpec, PathParam, strs};
use crate::invocation::{ArgKind, ArgSpec, Invocation};
use crate::lro::{FinalStateVia, LroOptions, StatusPolicy};
use crate::request::{Content, UrlTemplate};
use crate::schema::{Field, Schema};
use clap::Args;
use reqwest::Method;
use serde_json::Value;

pub const INGRESS: &[&str] = &["external", "internal"];
pub const TRANSPORTS: &[&str] = &["Auto", "Http", "Http2", "Tcp"];

const ARGS: &[ArgSpec] = &[
    ArgSpec::new("name", &["--name", "-n"], ArgKind::Str)
        .required()
        .pattern(r"^[a-z][-a-z0-9]*$"),
    ArgSpec::new("resource_group", &["--resource-group", "-g"], ArgKind::Str).required(),
    ArgSpec::new("environment", &["--environment"], ArgKind::Str).required(),
    ArgSpec::new("image", &["--image"], ArgKind::Str).required(),
    ArgSpec::new("location", &["--location", "-l"], ArgKind::Str),
    ArgSpec::new("target_port", &["--target-port"], ArgKind::Int),
    ArgSpec::new("ingress", &["--ingress"], ArgKind::Str).allowed(INGRESS),
    ArgSpec::new("transport", &["--transport"], ArgKind::Str).allowed(TRANSPORTS),
    ArgSpec::new("command", &["--command"], ArgKind::StrList),
    ArgSpec::new("args", &["--args"], ArgKind::StrList),
    ArgSpec::new("env_vars", &["--env-vars"], ArgKind::StrList).pattern(r"^[^=\s]+=.*$"),
];

const INGRESS_FIELDS: &[Field] = &[
    Field::new("external", Schema::Bool),
    Field::new("fqdn", Schema::Str).read_only(),
    Field::new("targetPort", Schema::Int),
    Field::new("transport", Schema::Str),
];

const CONFIGURATION: &[Field] = &[Field::new("ingress", Schema::Object(INGRESS_FIELDS))];

const ENV_VAR: &[Field] = &[
    Field::new("name", Schema::Str),
    Field::new("value", Schema::Str),
];

const CONTAINER: &[Field] = &[
    Field::new("args", Schema::List(&Schema::Str)),
    Field::new("command", Schema::List(&Schema::Str)),
    Field::new("env", Schema::List(&Schema::Object(ENV_VAR))),
    Field::new("image", Schema::Str),
    Field::new("name", Schema::Str),
];

const TEMPLATE: &[Field] = &[Field::new(
    "containers",
    Schema::List(&Schema::Object(CONTAINER)),
)];

const PROPERTIES: &[Field] = &[
    Field::new("configuration", Schema::Object(CONFIGURATION)),
    Field::new("latestRevisionFqdn", Schema::Str).read_only(),
    Field::new("managedEnvironmentId", Schema::Str),
    Field::new("provisioningState", Schema::Str).read_only(),
    Field::new("template", Schema::Object(TEMPLATE)),
];

const FIELDS: &[Field] = &[
    Field::new("id", Schema::Str).read_only(),
    Field::new("location", Schema::Str),
    Field::new("name", Schema::Str).read_only(),
    Field::new("properties", Schema::Object(PROPERTIES)),
    Field::new("type", Schema::Str).read_only(),
];

pub static RESPONSE: Schema = Schema::Object(FIELDS);

pub static CREATE: CommandSpec = CommandSpec {
    name: "containerapp create",
    method: Method::PUT,
    url: UrlTemplate(
        "/subscriptions/{subscriptionId}/resourceGroups/{resourceGroupName}/providers/Microsoft.App/containerApps/{containerAppName}",
    ),
    api_version: "2023-05-01",
    path_params: &[
        PathParam::Subscription {
            placeholder: "subscriptionId",
        },
        PathParam::Arg {
            placeholder: "resourceGroupName",
            arg: "resource_group",
        },
        PathParam::Arg {
            placeholder: "containerAppName",
            arg: "name",
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
    let mut container = Content::new();
    container
        .prop("name", inv.str("name"))
        .prop("image", inv.str("image"))
        .list("command", strs(inv.list("command")))
        .list("args", strs(inv.list("args")));

    let env: Vec<Content> = inv
        .list("env_vars")
        .unwrap_or_default()
        .iter()
        .map(|pair| {
            let (name, value) = pair.split_once('=').unwrap_or((pair.as_str(), ""));
            let mut var = Content::new();
            var.prop("name", Some(name)).prop("value", Some(value));
            var
        })
        .collect();
    container.objects("env", env);

    let has_ingress = inv.get("ingress").is_some() || inv.get("target_port").is_some();

    let mut content = Content::new();
    content
        .prop("location", inv.str("location"))
        .required_object("properties", |p| {
            p.prop("managedEnvironmentId", inv.str("environment"));
            if has_ingress {
                p.object("configuration", |c| {
                    c.required_object("ingress", |i| {
                        i.prop("external", inv.str("ingress").map(|v| v == "external"))
                            .prop("targetPort", inv.int("target_port"))
                            .prop("transport", inv.str("transport"));
                    });
                });
            }
            p.required_object("template", |t| {
                t.objects("containers", vec![container]);
            });
        });
    content.into_value()
}

/// Create a container app.
#[derive(Args, Debug, Clone, Default)]
pub struct ContainerAppCreateArgs {
    /// Name of the container app
    #[arg(short = 'n', long)]
    pub name: Option<String>,

    /// Name of the resource group
    #[arg(short = 'g', long)]
    pub resource_group: Option<String>,

    /// Resource id of the managed environment
    #[arg(long)]
    pub environment: Option<String>,

    /// Container image, e.g. publisher/image-name:tag
    #[arg(long)]
    pub image: Option<String>,

    /// Resource location
    #[arg(short = 'l', long)]
    pub location: Option<String>,

    /// Application port used for ingress traffic
    #[arg(long)]
    pub target_port: Option<u16>,

    /// Ingress type: external or internal
    #[arg(long)]
    pub ingress: Option<String>,

    /// Transport protocol used for ingress traffic: auto, http, http2 or tcp
    #[arg(long)]
    pub transport: Option<String>,

    /// Startup command of the container
    #[arg(long, num_args = 1..)]
    pub command: Vec<String>,

    /// Arguments passed to the startup command
    #[arg(long, num_args = 1.., allow_hyphen_values = true)]
    pub args: Vec<String>,

    /// Environment variables as KEY=VALUE pairs
    #[arg(long, num_args = 1..)]
    pub env_vars: Vec<String>,
}

impl From<ContainerAppCreateArgs> for Invocation {
    fn from(args: ContainerAppCreateArgs) -> Self {
        Invocation::new()
            .with_opt("name", args.name)
            .with_opt("resource_group", args.resource_group)
            .with_opt("environment", args.environment)
            .with_opt("image", args.image)
            .with_opt("location", args.location)
            .with_opt("target_port", args.target_port)
            .with_opt("ingress", args.ingress)
            .with_opt("transport", args.transport)
            .with_opt("command", Some(args.command))
            .with_opt("args", Some(args.args))
            .with_opt("env_vars", Some(args.env_vars))
    }
}
