use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use k8s_openapi::api::core::v1::{
    Container, ContainerPort, PodSpec, PodTemplateSpec, Service, ServicePort,
    ServiceSpec,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{
    LabelSelector, ObjectMeta,
};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;

use super::{
    CONTAINER_NAME, CONTAINER_PORT, PORT_NAME, ROUTE_PATH, RenderContext,
    child_metadata, container_command, owner_labels,
};
use crate::crd::route::{Route, RoutePort, RouteSpec, RouteTargetReference};

pub fn render_deployment(ctx: &RenderContext<'_>) -> Deployment {
    let labels = owner_labels(ctx.name);
    let (command, args) = container_command(ctx.spec);
    Deployment {
        metadata: child_metadata(ctx),
        spec: Some(DeploymentSpec {
            selector: LabelSelector {
                match_labels: Some(labels.clone()),
                ..Default::default()
            },
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(labels),
                    ..Default::default()
                }),
                spec: Some(PodSpec {
                    containers: vec![Container {
                        name: CONTAINER_NAME.to_string(),
                        image: Some(ctx.spec.image.clone()),
                        command: Some(command),
                        args: Some(args),
                        ports: Some(vec![ContainerPort {
                            name: Some(PORT_NAME.to_string()),
                            container_port: CONTAINER_PORT,
                            protocol: Some("TCP".to_string()),
                            ..Default::default()
                        }]),
                        ..Default::default()
                    }],
                    ..Default::default()
                }),
            },
            ..Default::default()
        }),
        ..Default::default()
    }
}

pub fn render_service(ctx: &RenderContext<'_>) -> Service {
    Service {
        metadata: child_metadata(ctx),
        spec: Some(ServiceSpec {
            type_: Some("ClusterIP".to_string()),
            selector: Some(owner_labels(ctx.name)),
            ports: Some(vec![ServicePort {
                name: Some(PORT_NAME.to_string()),
                port: CONTAINER_PORT,
                target_port: Some(IntOrString::String(PORT_NAME.to_string())),
                protocol: Some("TCP".to_string()),
                ..Default::default()
            }]),
            ..Default::default()
        }),
        ..Default::default()
    }
}

pub fn render_route(ctx: &RenderContext<'_>) -> Route {
    let mut route = Route::new(
        ctx.name,
        RouteSpec {
            host: None,
            path: Some(ROUTE_PATH.to_string()),
            to: RouteTargetReference {
                kind: "Service".to_string(),
                name: ctx.name.to_string(),
                weight: None,
            },
            port: Some(RoutePort {
                target_port: IntOrString::String(PORT_NAME.to_string()),
            }),
        },
    );
    route.metadata = child_metadata(ctx);
    route
}
