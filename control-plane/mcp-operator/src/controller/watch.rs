//! Mapping from watched children back to the MCPServer that owns them.

use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::runtime::reflector::ObjectRef;
use kube::{Api, Client, Resource};

use super::store::ObjectKey;
use crate::crd::MCPServer;
use crate::crd::mcp_server::GROUP;

/// Key of the MCPServer a child belongs to. The controller owner reference
/// wins; without one the child's own identity is used, since children share
/// their owner's name.
pub fn owner_key(meta: &ObjectMeta) -> Option<ObjectKey> {
    let ns = meta.namespace.as_deref()?;
    let owner = meta.owner_references.iter().flatten().find(|o| {
        o.kind == "MCPServer"
            && o.api_version
                .split_once('/')
                .map(|(g, _)| g == GROUP)
                .unwrap_or(false)
    });
    match owner {
        Some(o) => Some(ObjectKey::new(ns, &o.name)),
        None => meta.name.as_deref().map(|n| ObjectKey::new(ns, n)),
    }
}

/// Child-to-owner mapper for `Controller::watches`. Deleted children map
/// too, so a vanished child re-triggers its owner.
pub fn owner_ref<K: Resource>(child: K) -> Option<ObjectRef<MCPServer>> {
    let key = owner_key(child.meta())?;
    Some(ObjectRef::new(&key.name).within(&key.namespace))
}

pub(crate) fn scoped_api<K>(client: Client, namespace: Option<&str>) -> Api<K>
where
    K: Resource<Scope = kube::core::NamespaceResourceScope, DynamicType = ()>,
{
    match namespace {
        Some(ns) => Api::namespaced(client, ns),
        None => Api::all(client),
    }
}
