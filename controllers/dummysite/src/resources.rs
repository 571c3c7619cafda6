//! Deterministic naming and desired-state construction for the dependent
//! resources of a DummySite.
//!
//! Dependent names are pure functions of the DummySite name, so a reconcile
//! can always find its own resources without an index.

use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use k8s_openapi::api::core::v1::{
    ConfigMap, ConfigMapVolumeSource, Container, ContainerPort, PodSpec, PodTemplateSpec, Service,
    ServicePort, ServiceSpec, Volume, VolumeMount,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use std::collections::BTreeMap;

/// Product label applied to every dependent resource
pub const APP_LABEL: &str = "dummysite";

const CONTAINER_IMAGE: &str = "nginx:alpine";
const HTML_MOUNT_PATH: &str = "/usr/share/nginx/html";
const HTML_VOLUME: &str = "html";
const HTTP_PORT: i32 = 80;

/// Name of the ConfigMap holding the fetched HTML
pub fn config_map_name(name: &str) -> String {
    format!("dummysite-{name}-html")
}

/// Name shared by the Deployment and the Service
pub fn workload_name(name: &str) -> String {
    format!("dummysite-{name}")
}

/// Label set attached to the Deployment, Service and pod template
pub fn site_labels(name: &str) -> BTreeMap<String, String> {
    BTreeMap::from([
        ("app".to_string(), APP_LABEL.to_string()),
        (APP_LABEL.to_string(), name.to_string()),
    ])
}

/// In-cluster DNS URL for a service
pub fn endpoint_url(service: &str, namespace: &str) -> String {
    format!("http://{service}.{namespace}.svc.cluster.local")
}

fn metadata(namespace: &str, name: &str, resource_name: String) -> ObjectMeta {
    ObjectMeta {
        name: Some(resource_name),
        namespace: Some(namespace.to_string()),
        labels: Some(site_labels(name)),
        ..Default::default()
    }
}

/// ConfigMap serving the fetched page as `index.html`
pub fn build_config_map(namespace: &str, name: &str, html: &str) -> ConfigMap {
    ConfigMap {
        metadata: metadata(namespace, name, config_map_name(name)),
        data: Some(BTreeMap::from([(
            "index.html".to_string(),
            html.to_string(),
        )])),
        ..Default::default()
    }
}

/// Single-replica nginx Deployment with the HTML ConfigMap mounted as webroot
pub fn build_deployment(namespace: &str, name: &str) -> Deployment {
    Deployment {
        metadata: metadata(namespace, name, workload_name(name)),
        spec: Some(DeploymentSpec {
            replicas: Some(1),
            selector: LabelSelector {
                match_labels: Some(site_labels(name)),
                ..Default::default()
            },
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(site_labels(name)),
                    ..Default::default()
                }),
                spec: Some(PodSpec {
                    containers: vec![Container {
                        name: "nginx".to_string(),
                        image: Some(CONTAINER_IMAGE.to_string()),
                        ports: Some(vec![ContainerPort {
                            container_port: HTTP_PORT,
                            name: Some("http".to_string()),
                            ..Default::default()
                        }]),
                        volume_mounts: Some(vec![VolumeMount {
                            name: HTML_VOLUME.to_string(),
                            mount_path: HTML_MOUNT_PATH.to_string(),
                            ..Default::default()
                        }]),
                        ..Default::default()
                    }],
                    volumes: Some(vec![Volume {
                        name: HTML_VOLUME.to_string(),
                        config_map: Some(ConfigMapVolumeSource {
                            name: config_map_name(name),
                            ..Default::default()
                        }),
                        ..Default::default()
                    }]),
                    ..Default::default()
                }),
            },
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// ClusterIP Service exposing the workload on port 80
pub fn build_service(namespace: &str, name: &str) -> Service {
    Service {
        metadata: metadata(namespace, name, workload_name(name)),
        spec: Some(ServiceSpec {
            selector: Some(site_labels(name)),
            ports: Some(vec![ServicePort {
                name: Some("http".to_string()),
                port: HTTP_PORT,
                target_port: Some(IntOrString::Int(HTTP_PORT)),
                protocol: Some("TCP".to_string()),
                ..Default::default()
            }]),
            type_: Some("ClusterIP".to_string()),
            ..Default::default()
        }),
        ..Default::default()
    }
}
