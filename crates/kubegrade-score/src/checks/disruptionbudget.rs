//! PodDisruptionBudget coverage checks

use crate::error::ScoreError;
use crate::index::{PdbIndex, PdbMatch};
use crate::registry::{CheckFn, CheckRegistry};
use kubegrade_core::object::effective_namespace;
use kubegrade_core::{DeploymentObject, PdbObject, StatefulSetObject, TestScore};
use std::collections::BTreeMap;
use std::sync::Arc;

pub fn register(
    checks: &mut CheckRegistry,
    budgets: Arc<PdbIndex>,
    default_namespace: String,
) -> Result<(), ScoreError> {
    checks.register_stateful_set_check(
        "StatefulSet has PodDisruptionBudget",
        "Makes sure that all StatefulSets are targeted by a PDB",
        stateful_set_has_budget(Arc::clone(&budgets), default_namespace.clone()),
    )?;
    checks.register_deployment_check(
        "Deployment has PodDisruptionBudget",
        "Makes sure that all Deployments are targeted by a PDB",
        deployment_has_budget(budgets, default_namespace),
    )?;
    checks.register_pdb_check(
        "PodDisruptionBudget has policy",
        "Makes sure that PodDisruptionBudgets specify minAvailable or maxUnavailable",
        has_policy(),
    )?;
    Ok(())
}

fn budget_score(
    budgets: &PdbIndex,
    kind: &str,
    namespace: &str,
    template_labels: &BTreeMap<String, String>,
) -> TestScore {
    match budgets.covering(namespace, template_labels) {
        PdbMatch::Covered => TestScore::ok(),
        PdbMatch::WrongNamespace(namespaces) => TestScore::critical().with_comment(
            "",
            "No matching PodDisruptionBudget was found",
            format!(
                "It's recommended to define a PodDisruptionBudget to avoid unexpected downtime during Kubernetes maintenance operations, such as when draining a node. A matching budget was found, but in a different namespace. expected='{namespace}' got='{namespaces:?}'"
            ),
        ),
        PdbMatch::NoMatch => TestScore::critical().with_comment(
            "",
            "No matching PodDisruptionBudget was found",
            format!(
                "It's recommended to define a PodDisruptionBudget to avoid unexpected downtime during Kubernetes maintenance operations, such as when draining a node. No budget selector matches the {kind} pod labels."
            ),
        ),
    }
}

fn stateful_set_has_budget(
    budgets: Arc<PdbIndex>,
    default_namespace: String,
) -> CheckFn<StatefulSetObject> {
    Box::new(move |stateful_set| {
        let spec = stateful_set.stateful_set.spec.as_ref();
        if spec.and_then(|s| s.replicas).is_some_and(|r| r < 2) {
            return Ok(TestScore::skipped(
                "Skipped because the statefulset has less than 2 replicas",
            ));
        }

        let namespace = effective_namespace(stateful_set.namespace(), &default_namespace);
        let labels = spec
            .and_then(|s| s.template.metadata.as_ref())
            .and_then(|m| m.labels.clone())
            .unwrap_or_default();
        Ok(budget_score(&budgets, "StatefulSet", namespace, &labels))
    })
}

fn deployment_has_budget(
    budgets: Arc<PdbIndex>,
    default_namespace: String,
) -> CheckFn<DeploymentObject> {
    Box::new(move |deployment| {
        let spec = deployment.deployment.spec.as_ref();
        if spec.and_then(|s| s.replicas).is_some_and(|r| r < 2) {
            return Ok(TestScore::skipped(
                "Skipped because the deployment has less than 2 replicas",
            ));
        }

        let namespace = effective_namespace(deployment.namespace(), &default_namespace);
        let labels = spec
            .and_then(|s| s.template.metadata.as_ref())
            .and_then(|m| m.labels.clone())
            .unwrap_or_default();
        Ok(budget_score(&budgets, "Deployment", namespace, &labels))
    })
}

fn has_policy() -> CheckFn<PdbObject> {
    Box::new(move |pdb| {
        let spec = pdb.pdb.spec.as_ref();
        let has_policy = spec.is_some_and(|s| {
            s.min_available.is_some() || s.max_unavailable.is_some()
        });
        if has_policy {
            Ok(TestScore::ok())
        } else {
            Ok(TestScore::critical().with_comment(
                "",
                "PodDisruptionBudget missing policy",
                "PodDisruptionBudget should specify minAvailable or maxUnavailable.",
            ))
        }
    })
}
