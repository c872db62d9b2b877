//! Deprecated apiVersion detection

use crate::error::ScoreError;
use crate::registry::{CheckFn, CheckRegistry};
use kubegrade_core::{KubernetesVersion, ResourceMeta, TestScore};

pub fn register(
    checks: &mut CheckRegistry,
    kubernetes_version: KubernetesVersion,
) -> Result<(), ScoreError> {
    checks.register_meta_check(
        "Stable version",
        "Checks if the object is using a deprecated apiVersion",
        stable_version(kubernetes_version),
    )?;
    Ok(())
}

/// The stable apiVersion to use instead, when the target cluster version
/// already ships it.
fn stable_replacement(
    api_version: &str,
    kind: &str,
    version: KubernetesVersion,
) -> Option<&'static str> {
    match (api_version, kind) {
        ("extensions/v1beta1" | "apps/v1beta1" | "apps/v1beta2", "Deployment")
        | ("extensions/v1beta1" | "apps/v1beta1" | "apps/v1beta2", "DaemonSet")
        | ("extensions/v1beta1" | "apps/v1beta1" | "apps/v1beta2", "ReplicaSet")
        | ("apps/v1beta1" | "apps/v1beta2", "StatefulSet") => Some("apps/v1"),
        ("extensions/v1beta1", "NetworkPolicy") => Some("networking.k8s.io/v1"),
        ("extensions/v1beta1" | "networking.k8s.io/v1beta1", "Ingress") => {
            if version >= KubernetesVersion::new(1, 19) {
                Some("networking.k8s.io/v1")
            } else if api_version == "extensions/v1beta1" {
                Some("networking.k8s.io/v1beta1")
            } else {
                None
            }
        }
        ("batch/v1beta1", "CronJob") if version >= KubernetesVersion::new(1, 21) => {
            Some("batch/v1")
        }
        ("policy/v1beta1", "PodDisruptionBudget")
            if version >= KubernetesVersion::new(1, 21) =>
        {
            Some("policy/v1")
        }
        _ => None,
    }
}

fn stable_version(kubernetes_version: KubernetesVersion) -> CheckFn<ResourceMeta> {
    Box::new(move |meta| {
        match stable_replacement(
            &meta.type_meta.api_version,
            &meta.type_meta.kind,
            kubernetes_version,
        ) {
            Some(stable) => Ok(TestScore::warning().with_comment(
                "",
                format!(
                    "The apiVersion {} for {} is deprecated",
                    meta.type_meta.api_version, meta.type_meta.kind
                ),
                format!("It's recommended to use {stable} instead"),
            )),
            None => Ok(TestScore::ok()),
        }
    })
}
