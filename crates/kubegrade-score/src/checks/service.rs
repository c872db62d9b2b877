//! Service checks

use crate::error::ScoreError;
use crate::index::PodIndex;
use crate::registry::{CheckFn, CheckRegistry};
use crate::selector::Selector;
use kubegrade_core::object::effective_namespace;
use kubegrade_core::{ServiceObject, TestScore};
use std::sync::Arc;

pub fn register(
    checks: &mut CheckRegistry,
    pods: Arc<PodIndex>,
    default_namespace: String,
) -> Result<(), ScoreError> {
    checks.register_service_check(
        "Service Targets Pod",
        "Makes sure that all Services targets a Pod",
        service_targets_pod(pods, default_namespace),
    )?;
    checks.register_service_check(
        "Service Type",
        "Makes sure that the Service type is not NodePort",
        service_type(),
    )?;
    Ok(())
}

fn service_targets_pod(pods: Arc<PodIndex>, default_namespace: String) -> CheckFn<ServiceObject> {
    Box::new(move |service| {
        let spec = service.service.spec.as_ref();

        // ExternalName services have no selector to match.
        if spec.and_then(|s| s.type_.as_deref()) == Some("ExternalName") {
            return Ok(TestScore::ok());
        }

        let namespace = effective_namespace(service.namespace(), &default_namespace);
        let selector = spec
            .and_then(|s| s.selector.as_ref())
            .map(Selector::from_labels)
            .unwrap_or_default();

        if pods.any_matches(namespace, &selector) {
            Ok(TestScore::ok())
        } else {
            Ok(TestScore::critical().with_comment(
                "",
                "The services selector does not match any pods",
                "",
            ))
        }
    })
}

fn service_type() -> CheckFn<ServiceObject> {
    Box::new(move |service| {
        let type_ = service
            .service
            .spec
            .as_ref()
            .and_then(|s| s.type_.as_deref());
        if type_ == Some("NodePort") {
            Ok(TestScore::warning().with_comment(
                "",
                "The service is of type NodePort",
                "NodePort services should be avoided as they are insecure, and can not be used together with NetworkPolicies. LoadBalancers or use of an Ingress is recommended over NodePorts.",
            ))
        } else {
            Ok(TestScore::ok())
        }
    })
}
