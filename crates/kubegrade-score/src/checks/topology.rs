//! Pod topology spread constraint validation

use crate::error::ScoreError;
use crate::registry::{CheckFn, CheckRegistry};
use kubegrade_core::{Grade, TestScore, WorkloadObject};

pub fn register(checks: &mut CheckRegistry) -> Result<(), ScoreError> {
    checks.register_pod_check(
        "Pod Topology Spread Constraints",
        "Makes sure that all pods have a valid topology spread constraint configuration",
        topology_spread_constraints(),
    )?;
    Ok(())
}

fn topology_spread_constraints() -> CheckFn<WorkloadObject> {
    Box::new(move |workload| {
        let constraints = workload
            .template
            .spec
            .as_ref()
            .and_then(|s| s.topology_spread_constraints.as_ref());
        let Some(constraints) = constraints.filter(|c| !c.is_empty()) else {
            return Ok(TestScore::skipped(
                "Skipped because the pod does not use topologySpreadConstraints",
            ));
        };

        let mut score = TestScore::ok();
        for constraint in constraints {
            if constraint.max_skew < 1 {
                score.grade = Grade::Critical;
                score.add_comment(
                    "",
                    "Invalid maxSkew in topologySpreadConstraints",
                    "maxSkew must be greater than zero",
                );
            }
            if let Some(min_domains) = constraint.min_domains {
                if min_domains < 1 {
                    score.grade = Grade::Critical;
                    score.add_comment(
                        "",
                        "Invalid minDomains in topologySpreadConstraints",
                        "minDomains must be greater than zero when set",
                    );
                }
            }
            if constraint.topology_key.is_empty() {
                score.grade = Grade::Critical;
                score.add_comment(
                    "",
                    "Missing topologyKey in topologySpreadConstraints",
                    "topologyKey selects the node label the pods are spread over",
                );
            }
            if !matches!(
                constraint.when_unsatisfiable.as_str(),
                "DoNotSchedule" | "ScheduleAnyway"
            ) {
                score.grade = Grade::Critical;
                score.add_comment(
                    "",
                    "Invalid whenUnsatisfiable in topologySpreadConstraints",
                    "whenUnsatisfiable must be either DoNotSchedule or ScheduleAnyway",
                );
            }
            if constraint.label_selector.is_none() {
                score.grade = Grade::Critical;
                score.add_comment(
                    "",
                    "Missing labelSelector in topologySpreadConstraints",
                    "labelSelector is needed to count the pods the skew is calculated against",
                );
            }
        }
        Ok(score)
    })
}
