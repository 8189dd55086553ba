use std::future::Future;
use std::time::Duration;

use kube::Resource;
use kube::runtime::controller::Action;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, trace};

use super::children::{DeploymentChild, RouteChild, ServiceChild, ensure, evaluate};
use super::conditions::{aggregate_overall, now_rfc3339, set_status_condition};
use super::store::ObjectKey;
use super::{ControllerContext, ReconcileErr};
use crate::templates::RenderContext;

/// Fixed delay before re-checking a record that is not yet Available.
pub const NOT_READY_REQUEUE: Duration = Duration::from_secs(15);

/// Race `fut` against cancellation of `token`.
pub(crate) async fn cancellable<F, T>(
    token: &CancellationToken,
    fut: F,
) -> Result<T, ReconcileErr>
where
    F: Future<Output = T>,
{
    tokio::select! {
        biased;
        _ = token.cancelled() => Err(ReconcileErr::Cancelled),
        out = fut => Ok(out),
    }
}

/// One full pass for a single MCPServer identity.
#[instrument(skip_all, fields(ns = %key.namespace, name = %key.name))]
pub async fn reconcile(
    ctx: &ControllerContext,
    key: &ObjectKey,
    token: &CancellationToken,
) -> Result<Action, ReconcileErr> {
    let fetched = cancellable(token, ctx.servers.fetch(key))
        .await?
        .map_err(|source| ReconcileErr::Fetch {
            key: key.clone(),
            source,
        })?;
    let Some(mut server) = fetched else {
        debug!("MCPServer no longer exists; nothing to reconcile");
        return Ok(Action::await_change());
    };

    let original_status = server.status.clone();

    let owner = server
        .controller_owner_ref(&())
        .ok_or_else(|| ReconcileErr::OwnerReference(key.clone()))?;
    {
        let rctx = RenderContext {
            name: &key.name,
            namespace: &key.namespace,
            owner: Some(&owner),
            spec: &server.spec,
        };
        ensure::<DeploymentChild>(ctx, &rctx, token).await?;
        ensure::<ServiceChild>(ctx, &rctx, token).await?;
        ensure::<RouteChild>(ctx, &rctx, token).await?;
    }

    let observed = [
        evaluate::<DeploymentChild>(ctx, key, token).await?,
        evaluate::<ServiceChild>(ctx, key, token).await?,
        evaluate::<RouteChild>(ctx, key, token).await?,
    ];

    let now = now_rfc3339();
    let status = server.status.get_or_insert_with(Default::default);
    for cond in observed {
        set_status_condition(&mut status.conditions, cond, &now);
    }
    // Aggregate from the conditions just merged onto this same object.
    let overall = aggregate_overall(&status.conditions);
    set_status_condition(&mut status.conditions, overall.clone(), &now);

    if server.status != original_status {
        if token.is_cancelled() {
            return Err(ReconcileErr::Cancelled);
        }
        info!("status has changed; updating MCPServer status");
        let status = server.status.clone().unwrap_or_default();
        cancellable(token, ctx.servers.write_status(key, &status))
            .await?
            .map_err(|source| ReconcileErr::Status {
                key: key.clone(),
                source,
            })?;
        info!("MCPServer status updated");
    } else {
        trace!("status unchanged; skipping update");
    }

    if !overall.is_true() {
        info!(
            reason = %overall.reason,
            message = %overall.message,
            "MCPServer not yet fully ready; requeueing"
        );
        return Ok(Action::requeue(NOT_READY_REQUEUE));
    }
    info!("MCPServer is fully ready");
    Ok(Action::await_change())
}
