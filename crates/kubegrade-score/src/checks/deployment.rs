//! Deployment rollout checks

use crate::error::ScoreError;
use crate::index::{HpaIndex, ServiceIndex};
use crate::registry::{CheckFn, CheckRegistry};
use kubegrade_core::object::effective_namespace;
use kubegrade_core::{DeploymentObject, TestScore};
use std::sync::Arc;

pub fn register(
    checks: &mut CheckRegistry,
    services: Arc<ServiceIndex>,
    hpas: Arc<HpaIndex>,
    default_namespace: String,
) -> Result<(), ScoreError> {
    checks.register_deployment_check(
        "Deployment Strategy",
        "Makes sure that all Deployments targeted by service use RollingUpdate strategy",
        deployment_rollout_strategy(Arc::clone(&services), default_namespace.clone()),
    )?;
    checks.register_deployment_check(
        "Deployment Replicas",
        "Makes sure that Deployment has multiple replicas",
        deployment_replicas(services, hpas, default_namespace),
    )?;
    Ok(())
}

fn targeted_by_service(
    services: &ServiceIndex,
    deployment: &DeploymentObject,
    default_namespace: &str,
) -> bool {
    let namespace = effective_namespace(deployment.namespace(), default_namespace);
    let labels = deployment
        .deployment
        .spec
        .as_ref()
        .and_then(|s| s.template.metadata.as_ref())
        .and_then(|m| m.labels.clone())
        .unwrap_or_default();
    services.any_selects(namespace, &labels)
}

// Only deployments that receive traffic need a safe rollout strategy.
fn deployment_rollout_strategy(
    services: Arc<ServiceIndex>,
    default_namespace: String,
) -> CheckFn<DeploymentObject> {
    Box::new(move |deployment| {
        if !targeted_by_service(&services, deployment, &default_namespace) {
            return Ok(TestScore::skipped(
                "Skipped because the deployment is not targeted by a service",
            ));
        }

        let strategy = deployment
            .deployment
            .spec
            .as_ref()
            .and_then(|s| s.strategy.as_ref())
            .and_then(|s| s.type_.as_deref())
            .unwrap_or("");

        if strategy.is_empty() || strategy == "RollingUpdate" {
            Ok(TestScore::ok())
        } else {
            Ok(TestScore::warning().with_comment(
                "",
                "Deployment update strategy",
                "The deployment is used by a service but not using the RollingUpdate strategy which can cause interruptions. Set .spec.strategy.type to RollingUpdate. https://kubernetes.io/docs/concepts/workloads/controllers/deployment/#strategy",
            ))
        }
    })
}

fn deployment_replicas(
    services: Arc<ServiceIndex>,
    hpas: Arc<HpaIndex>,
    default_namespace: String,
) -> CheckFn<DeploymentObject> {
    Box::new(move |deployment| {
        if !targeted_by_service(&services, deployment, &default_namespace) {
            return Ok(TestScore::skipped(
                "Skipped because the deployment is not targeted by a service",
            ));
        }

        let namespace = effective_namespace(deployment.namespace(), &default_namespace);
        if hpas.targets_object(namespace, &deployment.type_meta, deployment.name()) {
            return Ok(TestScore::skipped(
                "Skipped because the deployment is controlled by a HorizontalPodAutoscaler",
            ));
        }

        let replicas = deployment
            .deployment
            .spec
            .as_ref()
            .and_then(|s| s.replicas)
            .unwrap_or(1);
        if replicas >= 2 {
            Ok(TestScore::ok())
        } else {
            Ok(TestScore::warning().with_comment(
                "",
                "Deployment few replicas",
                "Deployments targeted by Services are recommended to have at least 2 replicas to prevent unwanted downtime.",
            ))
        }
    })
}
