pub mod workload;

use std::collections::BTreeMap;

use k8s_openapi::apimachinery::pkg::apis::meta::v1::{
    ObjectMeta, OwnerReference,
};

use crate::crd::MCPServerSpec;

pub use workload::{render_deployment, render_route, render_service};

/// Label carried by every child resource and the pod template.
pub const OWNER_LABEL: &str = "opendatahub.io/mcp-server";
pub const CONTAINER_NAME: &str = "mcp-server";
pub const PORT_NAME: &str = "http";
pub const CONTAINER_PORT: i32 = 8000;
pub const ROUTE_PATH: &str = "/sse";
pub const DEFAULT_COMMAND: &[&str] = &["./kubernetes-mcp-server"];
pub const DEFAULT_ARGS: &[&str] = &["--port", "8000", "--log-level", "9"];

#[derive(Clone, Debug)]
pub struct RenderContext<'a> {
    pub name: &'a str,
    pub namespace: &'a str,
    /// Controller reference back to the owning MCPServer
    pub owner: Option<&'a OwnerReference>,
    pub spec: &'a MCPServerSpec,
}

pub fn owner_labels(name: &str) -> BTreeMap<String, String> {
    BTreeMap::from([(OWNER_LABEL.to_string(), name.to_string())])
}

pub fn owner_label_selector(name: &str) -> String {
    format!("{}={}", OWNER_LABEL, name)
}

pub(crate) fn child_metadata(ctx: &RenderContext<'_>) -> ObjectMeta {
    ObjectMeta {
        name: Some(ctx.name.to_string()),
        namespace: Some(ctx.namespace.to_string()),
        labels: Some(owner_labels(ctx.name)),
        owner_references: ctx.owner.map(|o| vec![o.clone()]),
        ..Default::default()
    }
}

/// Entrypoint and arguments for the server container. An empty override
/// counts as absent.
pub fn container_command(spec: &MCPServerSpec) -> (Vec<String>, Vec<String>) {
    let pick = |over: &Option<Vec<String>>, default: &[&str]| match over {
        Some(list) if !list.is_empty() => list.clone(),
        _ => default.iter().map(|s| s.to_string()).collect(),
    };
    (
        pick(&spec.command, DEFAULT_COMMAND),
        pick(&spec.args, DEFAULT_ARGS),
    )
}
