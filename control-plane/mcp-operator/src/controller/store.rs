use std::fmt::Debug;

use async_trait::async_trait;
use kube::api::{Api, Patch, PatchParams, PostParams};
use kube::core::NamespaceResourceScope;
use kube::{Client, Resource, ResourceExt};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::json;

use crate::crd::{MCPServer, MCPServerStatus};

/// Identity shared by an MCPServer and each of its children.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectKey {
    pub namespace: String,
    pub name: String,
}

impl ObjectKey {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    pub fn of<K: Resource>(obj: &K) -> Self {
        Self::new(
            obj.namespace().unwrap_or_else(|| "default".to_string()),
            obj.name_any(),
        )
    }
}

impl std::fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Read/create access to one namespaced child kind.
#[async_trait]
pub trait ObjectStore<K>: Send + Sync {
    /// `Ok(None)` when the object does not exist.
    async fn get(&self, key: &ObjectKey) -> Result<Option<K>, kube::Error>;
    async fn create(&self, obj: &K) -> Result<K, kube::Error>;
}

/// Access to the MCPServer records themselves.
#[async_trait]
pub trait ServerStore: Send + Sync {
    async fn fetch(
        &self,
        key: &ObjectKey,
    ) -> Result<Option<MCPServer>, kube::Error>;

    /// Replace the status sub-record as a whole.
    async fn write_status(
        &self,
        key: &ObjectKey,
        status: &MCPServerStatus,
    ) -> Result<(), kube::Error>;
}

#[derive(Clone)]
pub struct KubeStore {
    client: Client,
}

impl KubeStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl<K> ObjectStore<K> for KubeStore
where
    K: Resource<Scope = NamespaceResourceScope, DynamicType = ()>
        + Clone
        + Debug
        + Serialize
        + DeserializeOwned
        + Send
        + Sync
        + 'static,
{
    async fn get(&self, key: &ObjectKey) -> Result<Option<K>, kube::Error> {
        let api: Api<K> = Api::namespaced(self.client.clone(), &key.namespace);
        api.get_opt(&key.name).await
    }

    async fn create(&self, obj: &K) -> Result<K, kube::Error> {
        let ns = obj.namespace().unwrap_or_else(|| "default".to_string());
        let api: Api<K> = Api::namespaced(self.client.clone(), &ns);
        api.create(&PostParams::default(), obj).await
    }
}

#[async_trait]
impl ServerStore for KubeStore {
    async fn fetch(
        &self,
        key: &ObjectKey,
    ) -> Result<Option<MCPServer>, kube::Error> {
        let api: Api<MCPServer> =
            Api::namespaced(self.client.clone(), &key.namespace);
        api.get_opt(&key.name).await
    }

    async fn write_status(
        &self,
        key: &ObjectKey,
        status: &MCPServerStatus,
    ) -> Result<(), kube::Error> {
        let api: Api<MCPServer> =
            Api::namespaced(self.client.clone(), &key.namespace);
        // A merge patch replaces the conditions array wholesale.
        let patch = json!({ "status": status });
        let _ = api
            .patch_status(&key.name, &PatchParams::default(), &Patch::Merge(&patch))
            .await?;
        Ok(())
    }
}

pub fn is_not_found(err: &kube::Error) -> bool {
    matches!(err, kube::Error::Api(ae) if ae.code == 404)
}

pub fn is_already_exists(err: &kube::Error) -> bool {
    matches!(err, kube::Error::Api(ae) if ae.code == 409)
}
