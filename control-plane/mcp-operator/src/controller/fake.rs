//! In-memory stores for exercising the reconcile pass without a cluster.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::Service;
use kube::Resource;
use kube::core::ErrorResponse;
use tokio_util::sync::CancellationToken;

use super::ControllerContext;
use super::store::{ObjectKey, ObjectStore, ServerStore};
use crate::crd::{MCPServer, MCPServerSpec, MCPServerStatus, Route};

pub fn api_error(code: u16) -> kube::Error {
    let reason = match code {
        404 => "NotFound",
        409 => "AlreadyExists",
        _ => "InternalError",
    };
    kube::Error::Api(ErrorResponse {
        status: "Failure".into(),
        message: format!("injected {code}"),
        reason: reason.into(),
        code,
    })
}

pub type Journal = Arc<Mutex<Vec<String>>>;

pub struct MemoryStore<K> {
    label: &'static str,
    objects: Mutex<HashMap<ObjectKey, K>>,
    fail_get: Mutex<Option<u16>>,
    fail_create: Mutex<Option<u16>>,
    creates: Mutex<usize>,
    cancel_on_create: Mutex<Option<CancellationToken>>,
    journal: Journal,
}

impl<K: Resource + Clone> MemoryStore<K> {
    pub fn new(label: &'static str, journal: Journal) -> Self {
        Self {
            label,
            objects: Mutex::new(HashMap::new()),
            fail_get: Mutex::new(None),
            fail_create: Mutex::new(None),
            creates: Mutex::new(0),
            cancel_on_create: Mutex::new(None),
            journal,
        }
    }

    pub fn stored(&self, key: &ObjectKey) -> Option<K> {
        self.objects.lock().unwrap().get(key).cloned()
    }

    pub fn update(&self, key: &ObjectKey, f: impl FnOnce(&mut K)) {
        if let Some(obj) = self.objects.lock().unwrap().get_mut(key) {
            f(obj);
        }
    }

    pub fn remove(&self, key: &ObjectKey) {
        self.objects.lock().unwrap().remove(key);
    }

    pub fn fail_get_with(&self, code: Option<u16>) {
        *self.fail_get.lock().unwrap() = code;
    }

    pub fn fail_create_with(&self, code: Option<u16>) {
        *self.fail_create.lock().unwrap() = code;
    }

    /// Cancel `token` right after the next successful create.
    pub fn cancel_after_create(&self, token: CancellationToken) {
        *self.cancel_on_create.lock().unwrap() = Some(token);
    }

    pub fn create_count(&self) -> usize {
        *self.creates.lock().unwrap()
    }
}

#[async_trait]
impl<K> ObjectStore<K> for MemoryStore<K>
where
    K: Resource + Clone + Send + Sync + 'static,
{
    async fn get(&self, key: &ObjectKey) -> Result<Option<K>, kube::Error> {
        self.journal
            .lock()
            .unwrap()
            .push(format!("get {}", self.label));
        if let Some(code) = *self.fail_get.lock().unwrap() {
            return Err(api_error(code));
        }
        Ok(self.stored(key))
    }

    async fn create(&self, obj: &K) -> Result<K, kube::Error> {
        self.journal
            .lock()
            .unwrap()
            .push(format!("create {}", self.label));
        *self.creates.lock().unwrap() += 1;
        if let Some(code) = *self.fail_create.lock().unwrap() {
            return Err(api_error(code));
        }
        let key = ObjectKey::of(obj);
        {
            let mut objects = self.objects.lock().unwrap();
            if objects.contains_key(&key) {
                return Err(api_error(409));
            }
            objects.insert(key, obj.clone());
        }
        if let Some(token) = self.cancel_on_create.lock().unwrap().take() {
            token.cancel();
        }
        Ok(obj.clone())
    }
}

pub struct FakeServerStore {
    servers: Mutex<HashMap<ObjectKey, MCPServer>>,
    fail_fetch: Mutex<Option<u16>>,
    fail_write: Mutex<Option<u16>>,
    vanish_after_fetch: Mutex<bool>,
    writes: Mutex<Vec<MCPServerStatus>>,
    journal: Journal,
}

impl FakeServerStore {
    pub fn new(journal: Journal) -> Self {
        Self {
            servers: Mutex::new(HashMap::new()),
            fail_fetch: Mutex::new(None),
            fail_write: Mutex::new(None),
            vanish_after_fetch: Mutex::new(false),
            writes: Mutex::new(Vec::new()),
            journal,
        }
    }

    pub fn insert(&self, server: MCPServer) {
        self.servers
            .lock()
            .unwrap()
            .insert(ObjectKey::of(&server), server);
    }

    pub fn stored(&self, key: &ObjectKey) -> Option<MCPServer> {
        self.servers.lock().unwrap().get(key).cloned()
    }

    pub fn fail_fetch_with(&self, code: Option<u16>) {
        *self.fail_fetch.lock().unwrap() = code;
    }

    pub fn fail_write_with(&self, code: Option<u16>) {
        *self.fail_write.lock().unwrap() = code;
    }

    /// Drop the record right after the next fetch returns it.
    pub fn vanish_after_fetch(&self) {
        *self.vanish_after_fetch.lock().unwrap() = true;
    }

    pub fn writes(&self) -> Vec<MCPServerStatus> {
        self.writes.lock().unwrap().clone()
    }
}

#[async_trait]
impl ServerStore for FakeServerStore {
    async fn fetch(
        &self,
        key: &ObjectKey,
    ) -> Result<Option<MCPServer>, kube::Error> {
        self.journal.lock().unwrap().push("fetch MCPServer".into());
        if let Some(code) = *self.fail_fetch.lock().unwrap() {
            return Err(api_error(code));
        }
        let found = self.stored(key);
        if std::mem::take(&mut *self.vanish_after_fetch.lock().unwrap()) {
            self.servers.lock().unwrap().remove(key);
        }
        Ok(found)
    }

    async fn write_status(
        &self,
        key: &ObjectKey,
        status: &MCPServerStatus,
    ) -> Result<(), kube::Error> {
        self.journal.lock().unwrap().push("write status".into());
        if let Some(code) = *self.fail_write.lock().unwrap() {
            return Err(api_error(code));
        }
        let mut servers = self.servers.lock().unwrap();
        let server = servers.get_mut(key).ok_or_else(|| api_error(404))?;
        server.status = Some(status.clone());
        self.writes.lock().unwrap().push(status.clone());
        Ok(())
    }
}

/// All fakes wired into one context, sharing a call journal.
pub struct FakeCluster {
    pub servers: Arc<FakeServerStore>,
    pub deployments: Arc<MemoryStore<Deployment>>,
    pub services: Arc<MemoryStore<Service>>,
    pub routes: Arc<MemoryStore<Route>>,
    pub journal: Journal,
}

impl FakeCluster {
    pub fn new() -> Self {
        let journal: Journal = Arc::default();
        Self {
            servers: Arc::new(FakeServerStore::new(journal.clone())),
            deployments: Arc::new(MemoryStore::new("Deployment", journal.clone())),
            services: Arc::new(MemoryStore::new("Service", journal.clone())),
            routes: Arc::new(MemoryStore::new("Route", journal.clone())),
            journal,
        }
    }

    pub fn context(&self) -> ControllerContext {
        ControllerContext {
            servers: self.servers.clone(),
            deployments: self.deployments.clone(),
            services: self.services.clone(),
            routes: self.routes.clone(),
            error_requeue: Duration::from_secs(60),
            token: CancellationToken::new(),
        }
    }

    pub fn journal(&self) -> Vec<String> {
        self.journal.lock().unwrap().clone()
    }
}

/// A stored MCPServer with the identity fields a real API server assigns.
pub fn server(ns: &str, name: &str, image: &str) -> MCPServer {
    let mut s = MCPServer::new(
        name,
        MCPServerSpec {
            image: image.into(),
            command: None,
            args: None,
        },
    );
    s.metadata.namespace = Some(ns.into());
    s.metadata.uid = Some(format!("uid-{name}"));
    s
}
