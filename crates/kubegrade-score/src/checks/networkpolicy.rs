//! NetworkPolicy coverage checks

use crate::error::ScoreError;
use crate::index::{NetworkPolicyIndex, PodIndex};
use crate::registry::{CheckFn, CheckRegistry};
use crate::selector::Selector;
use kubegrade_core::object::effective_namespace;
use kubegrade_core::{NetworkPolicyObject, TestScore, WorkloadObject};
use std::sync::Arc;

pub fn register(
    checks: &mut CheckRegistry,
    policies: Arc<NetworkPolicyIndex>,
    pods: Arc<PodIndex>,
    default_namespace: String,
) -> Result<(), ScoreError> {
    checks.register_pod_check(
        "Pod NetworkPolicy",
        "Makes sure that all Pods are targeted by a NetworkPolicy",
        pod_has_network_policy(policies, default_namespace.clone()),
    )?;
    checks.register_network_policy_check(
        "NetworkPolicy targets Pod",
        "Makes sure that all NetworkPolicies targets at least one Pod",
        network_policy_targets_pod(pods, default_namespace),
    )?;
    Ok(())
}

fn pod_has_network_policy(
    policies: Arc<NetworkPolicyIndex>,
    default_namespace: String,
) -> CheckFn<WorkloadObject> {
    Box::new(move |workload| {
        let namespace = effective_namespace(workload.namespace(), &default_namespace);
        let labels = workload.template_labels().cloned().unwrap_or_default();
        let coverage = policies.coverage(namespace, &labels);

        let score = match (coverage.ingress, coverage.egress) {
            (true, true) => TestScore::ok(),
            (true, false) => TestScore::warning().with_comment(
                "",
                "The pod does not have a matching egress NetworkPolicy",
                "Add a egress policy to the pods NetworkPolicy",
            ),
            (false, true) => TestScore::warning().with_comment(
                "",
                "The pod does not have a matching ingress NetworkPolicy",
                "Add a ingress policy to the pods NetworkPolicy",
            ),
            (false, false) => TestScore::critical().with_comment(
                "",
                "The pod does not have a matching NetworkPolicy",
                "Create a NetworkPolicy that targets this pod to control who/what can communicate with this pod. Note, this feature needs to be supported by the CNI implementation used in the Kubernetes cluster to have an effect.",
            ),
        };
        Ok(score)
    })
}

fn network_policy_targets_pod(
    pods: Arc<PodIndex>,
    default_namespace: String,
) -> CheckFn<NetworkPolicyObject> {
    Box::new(move |netpol| {
        let namespace = effective_namespace(netpol.namespace(), &default_namespace);

        // A selector that does not parse matches nothing.
        let matches = netpol
            .network_policy
            .spec
            .as_ref()
            .and_then(|spec| Selector::parse(&spec.pod_selector).ok())
            .is_some_and(|selector| pods.any_matches(namespace, &selector));

        if matches {
            Ok(TestScore::ok())
        } else {
            Ok(TestScore::critical().with_comment(
                "",
                "The NetworkPolicies selector doesn't match any pods",
                "",
            ))
        }
    })
}
