//! HorizontalPodAutoscaler checks

use crate::error::ScoreError;
use crate::index::TargetableIndex;
use crate::registry::{CheckFn, CheckRegistry};
use kubegrade_core::object::effective_namespace;
use kubegrade_core::{HpaObject, TestScore};
use std::sync::Arc;

pub fn register(
    checks: &mut CheckRegistry,
    targetable: Arc<TargetableIndex>,
    default_namespace: String,
) -> Result<(), ScoreError> {
    checks.register_hpa_check(
        "HorizontalPodAutoscaler has target",
        "Makes sure that the HPA targets a valid object",
        hpa_has_target(targetable, default_namespace),
    )?;
    checks.register_hpa_check(
        "HorizontalPodAutoscaler Replicas",
        "Makes sure that the HPA has multiple replicas",
        hpa_has_multiple_replicas(),
    )?;
    Ok(())
}

fn hpa_has_target(
    targetable: Arc<TargetableIndex>,
    default_namespace: String,
) -> CheckFn<HpaObject> {
    Box::new(move |hpa| {
        let namespace = effective_namespace(hpa.namespace(), &default_namespace);
        if targetable.contains(namespace, &hpa.target) {
            Ok(TestScore::ok())
        } else {
            Ok(TestScore::critical().with_comment(
                "",
                "The HPA target does not match anything",
                "",
            ))
        }
    })
}

fn hpa_has_multiple_replicas() -> CheckFn<HpaObject> {
    Box::new(move |hpa| {
        if hpa.min_replicas.unwrap_or(1) >= 2 {
            Ok(TestScore::ok())
        } else {
            Ok(TestScore::warning().with_comment(
                "",
                "HPA few replicas",
                "HorizontalPodAutoscalers are recommended to have at least 2 replicas to prevent unwanted downtime.",
            ))
        }
    })
}
