pub mod children;
pub mod conditions;
pub mod reconcile;
pub mod store;
pub mod watch;

#[cfg(test)]
mod fake;

use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::Service;
use kube::{
    Client,
    runtime::{
        Controller,
        controller::{self, Action},
        watcher,
    },
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::config::OperatorConfig;
use crate::crd::{MCPServer, Route};
use crate::templates::OWNER_LABEL;
use children::ChildKind;
use store::{KubeStore, ObjectKey, ObjectStore, ServerStore};
use watch::{owner_ref, scoped_api};

pub use reconcile::reconcile;

#[derive(thiserror::Error, Debug)]
pub enum ReconcileErr {
    #[error("failed to fetch MCPServer {key}: {source}")]
    Fetch {
        key: ObjectKey,
        source: kube::Error,
    },
    #[error("failed to create {kind} for {key}: {source}")]
    Create {
        kind: ChildKind,
        key: ObjectKey,
        source: kube::Error,
    },
    #[error("failed to update status of MCPServer {key}: {source}")]
    Status {
        key: ObjectKey,
        source: kube::Error,
    },
    #[error("MCPServer {0} has no name or uid to own children with")]
    OwnerReference(ObjectKey),
    #[error("reconcile cancelled")]
    Cancelled,
}

/// Cluster access and retry policy shared by every reconcile.
#[derive(Clone)]
pub struct ControllerContext {
    pub servers: Arc<dyn ServerStore>,
    pub deployments: Arc<dyn ObjectStore<Deployment>>,
    pub services: Arc<dyn ObjectStore<Service>>,
    pub routes: Arc<dyn ObjectStore<Route>>,
    pub error_requeue: Duration,
    /// Cancels in-flight passes on shutdown.
    pub token: CancellationToken,
}

impl ControllerContext {
    pub fn from_client(
        client: Client,
        cfg: &OperatorConfig,
        token: CancellationToken,
    ) -> Self {
        let store = KubeStore::new(client);
        Self {
            servers: Arc::new(store.clone()),
            deployments: Arc::new(store.clone()),
            services: Arc::new(store.clone()),
            routes: Arc::new(store),
            error_requeue: cfg.error_requeue(),
            token,
        }
    }
}

/// Run the MCPServer controller until `token` is cancelled.
pub async fn run_controller(
    client: Client,
    cfg: OperatorConfig,
    token: CancellationToken,
) -> anyhow::Result<()> {
    let cfg = cfg.normalized();
    let ns = cfg.watch_namespace.as_deref();
    let ctx = Arc::new(ControllerContext::from_client(
        client.clone(),
        &cfg,
        token.clone(),
    ));
    info!(
        workers = cfg.workers,
        namespace = ns.unwrap_or("<all>"),
        "starting MCPServer controller"
    );

    let children = || watcher::Config::default().labels(OWNER_LABEL);
    let concurrency = u16::try_from(cfg.workers).unwrap_or(u16::MAX);

    Controller::new(
        scoped_api::<MCPServer>(client.clone(), ns),
        watcher::Config::default(),
    )
    .with_config(controller::Config::default().concurrency(concurrency))
    .watches(
        scoped_api::<Deployment>(client.clone(), ns),
        children(),
        owner_ref::<Deployment>,
    )
    .watches(
        scoped_api::<Service>(client.clone(), ns),
        children(),
        owner_ref::<Service>,
    )
    .watches(
        scoped_api::<Route>(client, ns),
        children(),
        owner_ref::<Route>,
    )
    .graceful_shutdown_on(token.cancelled_owned())
    .run(reconcile_server, error_policy, ctx)
    .for_each(|res| async move {
        match res {
            Ok((obj_ref, action)) => {
                debug!(%obj_ref, "reconciled: requeue={:?}", action)
            }
            Err(e) => error!(error = ?e, "reconcile error"),
        }
    })
    .await;

    info!("MCPServer controller stopped");
    Ok(())
}

async fn reconcile_server(
    obj: Arc<MCPServer>,
    ctx: Arc<ControllerContext>,
) -> Result<Action, ReconcileErr> {
    reconcile(&ctx, &ObjectKey::of(obj.as_ref()), &ctx.token).await
}

fn error_policy(
    obj: Arc<MCPServer>,
    err: &ReconcileErr,
    ctx: Arc<ControllerContext>,
) -> Action {
    let key = ObjectKey::of(obj.as_ref());
    if let ReconcileErr::Cancelled = err {
        debug!(%key, "reconcile cancelled");
        return Action::await_change();
    }
    error!(%key, error = %err, "reconcile failed; retrying in {:?}", ctx.error_requeue);
    Action::requeue(ctx.error_requeue)
}
