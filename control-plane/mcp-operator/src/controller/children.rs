//! Per-kind child handling: build the desired object, create it when absent,
//! and normalise its live state into a status condition.

use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::Service;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

use super::conditions::{
    REASON_GET_FAILED_SUFFIX, REASON_NOT_FOUND_SUFFIX, REASON_NOT_READY_SUFFIX,
    REASON_READY_SUFFIX, REASON_ROUTE_NOT_ADMITTED,
};
use super::reconcile::cancellable;
use super::store::{ObjectKey, ObjectStore, is_already_exists};
use super::{ControllerContext, ReconcileErr};
use crate::crd::{Condition, ConditionStatus, ConditionType, Route};
use crate::templates::{
    RenderContext, render_deployment, render_route, render_service,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChildKind {
    Deployment,
    Service,
    Route,
}

impl ChildKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChildKind::Deployment => "Deployment",
            ChildKind::Service => "Service",
            ChildKind::Route => "Route",
        }
    }

    pub fn condition_type(&self) -> ConditionType {
        match self {
            ChildKind::Deployment => ConditionType::DeploymentAvailable,
            ChildKind::Service => ConditionType::ServiceAvailable,
            ChildKind::Route => ConditionType::RouteAvailable,
        }
    }

    fn condition(
        &self,
        status: ConditionStatus,
        suffix: &str,
        message: String,
    ) -> Condition {
        Condition::new(
            self.condition_type(),
            status,
            format!("{}{}", self.as_str(), suffix),
            message,
        )
    }

    pub fn not_found(&self, name: &str) -> Condition {
        let message = match self {
            ChildKind::Deployment => format!("Deployment {} cannot be found", name),
            ChildKind::Service => format!("Service {} not found", name),
            ChildKind::Route => format!("Route {} not found", name),
        };
        self.condition(ConditionStatus::False, REASON_NOT_FOUND_SUFFIX, message)
    }

    pub fn get_failed(&self, name: &str, err: &kube::Error) -> Condition {
        let message = match self {
            ChildKind::Deployment => {
                format!("Failed to retrieve Deployment {}, {}", name, err)
            }
            ChildKind::Service => format!("Failed to get Service {}: {}", name, err),
            ChildKind::Route => format!("Failed to get Route {}: {}", name, err),
        };
        self.condition(
            ConditionStatus::Unknown,
            REASON_GET_FAILED_SUFFIX,
            message,
        )
    }

    pub fn ready(&self, name: &str) -> Condition {
        let message = match self {
            ChildKind::Deployment => format!("Deployment {} is available", name),
            ChildKind::Service => {
                format!("Service {} exists and is available", name)
            }
            ChildKind::Route => format!("Route {} is admitted and active", name),
        };
        self.condition(ConditionStatus::True, REASON_READY_SUFFIX, message)
    }
}

impl std::fmt::Display for ChildKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One managed child kind: how to render it, where it lives, and how to read
/// its readiness once it exists.
pub trait ChildAdapter {
    type Object: Clone + Send + Sync + 'static;

    const KIND: ChildKind;

    fn build(ctx: &RenderContext<'_>) -> Self::Object;

    fn store(ctx: &ControllerContext) -> &dyn ObjectStore<Self::Object>;

    /// Condition for an object that was found.
    fn readiness(name: &str, obj: &Self::Object) -> Condition;
}

pub struct DeploymentChild;
pub struct ServiceChild;
pub struct RouteChild;

impl ChildAdapter for DeploymentChild {
    type Object = Deployment;
    const KIND: ChildKind = ChildKind::Deployment;

    fn build(ctx: &RenderContext<'_>) -> Deployment {
        render_deployment(ctx)
    }

    fn store(ctx: &ControllerContext) -> &dyn ObjectStore<Deployment> {
        ctx.deployments.as_ref()
    }

    fn readiness(name: &str, obj: &Deployment) -> Condition {
        let available = obj
            .status
            .as_ref()
            .and_then(|s| s.conditions.as_ref())
            .map(|conds| {
                conds
                    .iter()
                    .any(|c| c.type_ == "Available" && c.status == "True")
            })
            .unwrap_or(false);
        if !available {
            return Self::KIND.condition(
                ConditionStatus::False,
                REASON_NOT_READY_SUFFIX,
                format!("Deployment {} is not yet available", name),
            );
        }
        Self::KIND.ready(name)
    }
}

impl ChildAdapter for ServiceChild {
    type Object = Service;
    const KIND: ChildKind = ChildKind::Service;

    fn build(ctx: &RenderContext<'_>) -> Service {
        render_service(ctx)
    }

    fn store(ctx: &ControllerContext) -> &dyn ObjectStore<Service> {
        ctx.services.as_ref()
    }

    // Existence is the only readiness signal a Service offers.
    fn readiness(name: &str, _obj: &Service) -> Condition {
        Self::KIND.ready(name)
    }
}

impl ChildAdapter for RouteChild {
    type Object = Route;
    const KIND: ChildKind = ChildKind::Route;

    fn build(ctx: &RenderContext<'_>) -> Route {
        render_route(ctx)
    }

    fn store(ctx: &ControllerContext) -> &dyn ObjectStore<Route> {
        ctx.routes.as_ref()
    }

    fn readiness(name: &str, obj: &Route) -> Condition {
        if !obj.is_admitted() {
            return Condition::new(
                ConditionType::RouteAvailable,
                ConditionStatus::False,
                REASON_ROUTE_NOT_ADMITTED,
                format!("Route {} has not been admitted by a router yet", name),
            );
        }
        Self::KIND.ready(name)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EnsureOutcome {
    Created,
    AlreadyExists,
}

/// Create the child when absent. An existing object is left untouched,
/// whatever its spec.
#[instrument(skip_all, fields(kind = %A::KIND, ns = %rctx.namespace, name = %rctx.name))]
pub async fn ensure<A: ChildAdapter>(
    ctx: &ControllerContext,
    rctx: &RenderContext<'_>,
    token: &CancellationToken,
) -> Result<EnsureOutcome, ReconcileErr> {
    let desired = A::build(rctx);
    match cancellable(token, A::store(ctx).create(&desired)).await? {
        Ok(_) => {
            info!("created child resource");
            Ok(EnsureOutcome::Created)
        }
        Err(e) if is_already_exists(&e) => {
            debug!("child resource already exists");
            Ok(EnsureOutcome::AlreadyExists)
        }
        Err(source) => Err(ReconcileErr::Create {
            kind: A::KIND,
            key: ObjectKey::new(rctx.namespace, rctx.name),
            source,
        }),
    }
}

/// Read the child's live state. Read failures become conditions; only
/// cancellation is returned as an error.
#[instrument(skip_all, fields(kind = %A::KIND, ns = %key.namespace, name = %key.name))]
pub async fn evaluate<A: ChildAdapter>(
    ctx: &ControllerContext,
    key: &ObjectKey,
    token: &CancellationToken,
) -> Result<Condition, ReconcileErr> {
    let cond = match cancellable(token, A::store(ctx).get(key)).await? {
        Ok(Some(obj)) => A::readiness(&key.name, &obj),
        Ok(None) => A::KIND.not_found(&key.name),
        Err(e) if super::store::is_not_found(&e) => A::KIND.not_found(&key.name),
        Err(e) => A::KIND.get_failed(&key.name, &e),
    };
    debug!(status = %cond.status, reason = %cond.reason, "evaluated child condition");
    Ok(cond)
}
