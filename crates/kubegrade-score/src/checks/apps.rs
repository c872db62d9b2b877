//! Workload topology and wiring checks shared by Deployments and StatefulSets

use crate::error::ScoreError;
use crate::index::{HpaIndex, ServiceIndex};
use crate::registry::{CheckFn, CheckRegistry};
use crate::selector::Selector;
use k8s_openapi::api::core::v1::Affinity;
use kubegrade_core::object::effective_namespace;
use kubegrade_core::{DeploymentObject, StatefulSetObject, TestScore};
use std::collections::BTreeMap;
use std::sync::Arc;

pub fn register(
    checks: &mut CheckRegistry,
    hpas: Arc<HpaIndex>,
    services: Arc<ServiceIndex>,
    default_namespace: String,
) -> Result<(), ScoreError> {
    checks.register_deployment_check(
        "Deployment has host PodAntiAffinity",
        "Makes sure that a podAntiAffinity has been set that prevents multiple pods from being scheduled on the same node. https://kubernetes.io/docs/concepts/configuration/assign-pod-node/",
        deployment_has_anti_affinity(),
    )?;
    checks.register_stateful_set_check(
        "StatefulSet has host PodAntiAffinity",
        "Makes sure that a podAntiAffinity has been set that prevents multiple pods from being scheduled on the same node. https://kubernetes.io/docs/concepts/configuration/assign-pod-node/",
        stateful_set_has_anti_affinity(),
    )?;
    checks.register_deployment_check(
        "Deployment targeted by HPA does not have replicas configured",
        "Makes sure that Deployments using a HorizontalPodAutoscaler doesn't have a statically configured replica count set",
        hpa_deployment_no_replicas(hpas, default_namespace.clone()),
    )?;
    checks.register_stateful_set_check(
        "StatefulSet has ServiceName",
        "Makes sure that StatefulSets have an existing headless serviceName.",
        stateful_set_has_service_name(services, default_namespace),
    )?;
    checks.register_deployment_check(
        "Deployment Pod Selector labels match template metadata labels",
        "Ensure the Deployment selector labels match the template metadata labels.",
        deployment_selector_labels_match(),
    )?;
    checks.register_stateful_set_check(
        "StatefulSet Pod Selector labels match template metadata labels",
        "Ensure the StatefulSet selector labels match the template metadata labels.",
        stateful_set_selector_labels_match(),
    )?;
    Ok(())
}

/// Topology keys that actually spread pods across failure domains.
const APPROVED_TOPOLOGY_KEYS: &[&str] = &[
    "kubernetes.io/hostname",
    "topology.kubernetes.io/region",
    "topology.kubernetes.io/zone",
    // Deprecated in Kubernetes v1.17
    "failure-domain.beta.kubernetes.io/region",
    "failure-domain.beta.kubernetes.io/zone",
];

fn has_pod_anti_affinity(self_labels: &BTreeMap<String, String>, affinity: &Affinity) -> bool {
    let Some(anti_affinity) = affinity.pod_anti_affinity.as_ref() else {
        return false;
    };

    let term_matches = |term: &k8s_openapi::api::core::v1::PodAffinityTerm| {
        if !APPROVED_TOPOLOGY_KEYS.contains(&term.topology_key.as_str()) {
            return false;
        }
        // A term without a selector matches nothing.
        let Some(label_selector) = term.label_selector.as_ref() else {
            return false;
        };
        match Selector::parse(label_selector) {
            Ok(selector) => selector.matches(self_labels),
            Err(_) => false,
        }
    };

    anti_affinity
        .preferred_during_scheduling_ignored_during_execution
        .iter()
        .flatten()
        .any(|weighted| term_matches(&weighted.pod_affinity_term))
        || anti_affinity
            .required_during_scheduling_ignored_during_execution
            .iter()
            .flatten()
            .any(term_matches)
}

fn anti_affinity_score(
    kind: &str,
    replicas: Option<i32>,
    affinity: Option<&Affinity>,
    template_labels: &BTreeMap<String, String>,
) -> TestScore {
    // A single replica gains nothing from anti affinity. When replicas is
    // not set we still warn, since that can indicate an autoscaler.
    if replicas.is_some_and(|r| r < 2) {
        return TestScore::skipped(format!(
            "Skipped because the {} has less than 2 replicas",
            kind.to_lowercase()
        ));
    }

    if affinity.is_some_and(|a| has_pod_anti_affinity(template_labels, a)) {
        TestScore::ok()
    } else {
        TestScore::warning().with_comment(
            "",
            format!("{kind} does not have a host podAntiAffinity set"),
            format!(
                "It's recommended to set a podAntiAffinity that stops multiple pods from a {} from being scheduled on the same node. This increases availability in case the node becomes unavailable.",
                kind.to_lowercase()
            ),
        )
    }
}

fn deployment_has_anti_affinity() -> CheckFn<DeploymentObject> {
    Box::new(move |deployment| {
        let spec = deployment.deployment.spec.as_ref();
        let labels = spec
            .and_then(|s| s.template.metadata.as_ref())
            .and_then(|m| m.labels.clone())
            .unwrap_or_default();
        Ok(anti_affinity_score(
            "Deployment",
            spec.and_then(|s| s.replicas),
            spec.and_then(|s| s.template.spec.as_ref())
                .and_then(|s| s.affinity.as_ref()),
            &labels,
        ))
    })
}

fn stateful_set_has_anti_affinity() -> CheckFn<StatefulSetObject> {
    Box::new(move |stateful_set| {
        let spec = stateful_set.stateful_set.spec.as_ref();
        let labels = spec
            .and_then(|s| s.template.metadata.as_ref())
            .and_then(|m| m.labels.clone())
            .unwrap_or_default();
        Ok(anti_affinity_score(
            "StatefulSet",
            spec.and_then(|s| s.replicas),
            spec.and_then(|s| s.template.spec.as_ref())
                .and_then(|s| s.affinity.as_ref()),
            &labels,
        ))
    })
}

fn hpa_deployment_no_replicas(
    hpas: Arc<HpaIndex>,
    default_namespace: String,
) -> CheckFn<DeploymentObject> {
    Box::new(move |deployment| {
        let namespace = effective_namespace(deployment.namespace(), &default_namespace);
        if !hpas.targets_object(namespace, &deployment.type_meta, deployment.name()) {
            return Ok(TestScore::skipped(
                "Skipped because the deployment is not targeted by a HorizontalPodAutoscaler",
            ));
        }

        let has_static_replicas = deployment
            .deployment
            .spec
            .as_ref()
            .is_some_and(|s| s.replicas.is_some());
        if has_static_replicas {
            Ok(TestScore::critical().with_comment(
                "",
                "The deployment is targeted by a HPA, but a static replica count is configured in the DeploymentSpec",
                "When replicas are both statically set and managed by the HPA, the replicas will be changed to the statically configured count when the spec is applied, even if the HPA wants the replica count to be higher.",
            ))
        } else {
            Ok(TestScore::ok())
        }
    })
}

fn stateful_set_has_service_name(
    services: Arc<ServiceIndex>,
    default_namespace: String,
) -> CheckFn<StatefulSetObject> {
    Box::new(move |stateful_set| {
        let namespace = effective_namespace(stateful_set.namespace(), &default_namespace);
        let spec = stateful_set.stateful_set.spec.as_ref();
        let service_name = spec.map(|s| s.service_name.as_str()).unwrap_or("");
        let labels = spec
            .and_then(|s| s.template.metadata.as_ref())
            .and_then(|m| m.labels.clone())
            .unwrap_or_default();

        if services.headless_selects(namespace, service_name, &labels) {
            Ok(TestScore::ok())
        } else {
            Ok(TestScore::critical().with_comment(
                "",
                "StatefulSet does not have a valid serviceName",
                "StatefulSets currently require a Headless Service to be responsible for the network identity of the Pods. You are responsible for creating this Service. https://kubernetes.io/docs/concepts/workloads/controllers/statefulset/#limitations",
            ))
        }
    })
}

fn selector_match_score(
    kind: &str,
    selector: Option<&k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector>,
    template_labels: &BTreeMap<String, String>,
) -> TestScore {
    let parsed = match selector.map(Selector::parse) {
        Some(Ok(selector)) => selector,
        Some(Err(err)) => {
            return TestScore::critical().with_comment(
                "",
                format!("{kind} selector labels are not matching template metadata labels"),
                format!("Invalid selector: {err}"),
            );
        }
        // No selector at all selects nothing.
        None => {
            return TestScore::critical().with_comment(
                "",
                format!("{kind} selector labels not matching template metadata labels"),
                format!(
                    "{kind}s require `.spec.selector` to match `.spec.template.metadata.labels`."
                ),
            );
        }
    };

    if parsed.matches(template_labels) {
        TestScore::ok()
    } else {
        TestScore::critical().with_comment(
            "",
            format!("{kind} selector labels not matching template metadata labels"),
            format!("{kind}s require `.spec.selector` to match `.spec.template.metadata.labels`."),
        )
    }
}

fn deployment_selector_labels_match() -> CheckFn<DeploymentObject> {
    Box::new(move |deployment| {
        let spec = deployment.deployment.spec.as_ref();
        let labels = spec
            .and_then(|s| s.template.metadata.as_ref())
            .and_then(|m| m.labels.clone())
            .unwrap_or_default();
        Ok(selector_match_score(
            "Deployment",
            spec.map(|s| &s.selector),
            &labels,
        ))
    })
}

fn stateful_set_selector_labels_match() -> CheckFn<StatefulSetObject> {
    Box::new(move |stateful_set| {
        let spec = stateful_set.stateful_set.spec.as_ref();
        let labels = spec
            .and_then(|s| s.template.metadata.as_ref())
            .and_then(|m| m.labels.clone())
            .unwrap_or_default();
        Ok(selector_match_score(
            "StatefulSet",
            spec.map(|s| &s.selector),
            &labels,
        ))
    })
}
