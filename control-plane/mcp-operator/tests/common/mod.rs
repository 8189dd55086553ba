#![allow(dead_code)]

use std::future::Future;
use std::time::Duration;

use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::Service;
use kube::{
    Client,
    api::{Api, ListParams},
};
use mcp_operator::crd::{MCPServer, Route};
use mcp_operator::templates::owner_label_selector;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

// DNS-1123 safe numeric suffix for unique names
pub const DIGITS: [char; 10] =
    ['0', '1', '2', '3', '4', '5', '6', '7', '8', '9'];
pub fn uniq(prefix: &str) -> String {
    format!("{prefix}-{}", nanoid::nanoid!(6, &DIGITS))
}

/// Poll `check` once a second until it yields a value or `secs` run out.
pub async fn wait_for<T, F, Fut>(secs: u64, mut check: F) -> Option<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Option<T>>,
{
    for _ in 0..secs {
        if let Some(v) = check().await {
            return Some(v);
        }
        tokio::time::sleep(Duration::from_secs(1)).await;
    }
    None
}

async fn delete_labelled<K>(api: &Api<K>, lp: &ListParams)
where
    K: kube::Resource + Clone + serde::de::DeserializeOwned + std::fmt::Debug,
{
    if let Ok(list) = api.list(lp).await {
        for obj in list {
            if let Some(name) = obj.meta().name.clone() {
                let _ = api.delete(&name, &Default::default()).await;
            }
        }
    }
}

pub async fn cleanup_k8s(ns: &str, name: &str, client: Client) {
    // Best-effort; garbage collection normally handles owned children.
    let lp = ListParams::default().labels(&owner_label_selector(name));
    delete_labelled(&Api::<Deployment>::namespaced(client.clone(), ns), &lp)
        .await;
    delete_labelled(&Api::<Service>::namespaced(client.clone(), ns), &lp).await;
    delete_labelled(&Api::<Route>::namespaced(client.clone(), ns), &lp).await;
    let api: Api<MCPServer> = Api::namespaced(client, ns);
    let _ = api.delete(name, &Default::default()).await;
}

// RAII guard to ensure controller shutdown + cleanup
pub struct ControllerGuard {
    ns: String,
    name: String,
    client: Client,
    token: CancellationToken,
    ctrl: Option<JoinHandle<()>>,
}

impl ControllerGuard {
    pub fn new(ns: &str, name: &str, client: Client) -> Self {
        Self {
            ns: ns.to_string(),
            name: name.to_string(),
            client,
            token: CancellationToken::new(),
            ctrl: None,
        }
    }

    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn with_controller(mut self, ctrl: JoinHandle<()>) -> Self {
        self.ctrl = Some(ctrl);
        self
    }
}

impl Drop for ControllerGuard {
    fn drop(&mut self) {
        self.token.cancel();
        if let Some(ref handle) = self.ctrl {
            handle.abort();
        }
        let ns = self.ns.clone();
        let name = self.name.clone();
        let client = self.client.clone();
        let _ = tokio::spawn(async move {
            cleanup_k8s(&ns, &name, client).await;
        });
    }
}
