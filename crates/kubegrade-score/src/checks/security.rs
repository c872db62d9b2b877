//! Security context checks

use crate::error::ScoreError;
use crate::registry::{CheckFn, CheckRegistry};
use kubegrade_core::{Grade, TestScore, WorkloadObject};

pub fn register(checks: &mut CheckRegistry, skip_init_containers: bool) -> Result<(), ScoreError> {
    checks.register_pod_check(
        "Container Security Context User Group ID",
        "Makes sure that all pods have a security context with valid UID and GID set",
        user_group_id(skip_init_containers),
    )?;
    checks.register_pod_check(
        "Container Security Context Privileged",
        "Makes sure that all pods have a unprivileged security context set",
        privileged(skip_init_containers),
    )?;
    checks.register_pod_check(
        "Container Security Context ReadOnlyRootFilesystem",
        "Makes sure that all pods have a security context with read only filesystem set",
        read_only_root_filesystem(skip_init_containers),
    )?;
    checks.register_optional_pod_check(
        "Container Seccomp Profile",
        "Makes sure that all pods have at a seccomp policy configured.",
        seccomp_profile(),
    )?;
    Ok(())
}

const MIN_SAFE_ID: i64 = 10000;

fn user_group_id(skip_init_containers: bool) -> CheckFn<WorkloadObject> {
    Box::new(move |workload| {
        let pod_context = workload
            .template
            .spec
            .as_ref()
            .and_then(|s| s.security_context.as_ref());

        let mut score = TestScore::ok();
        let mut flagged = false;

        for container in workload.all_containers(skip_init_containers) {
            if container.security_context.is_none() && pod_context.is_none() {
                flagged = true;
                score.add_comment(
                    &container.name,
                    "Container has no configured security context",
                    "Set securityContext to run the container in a more secure context.",
                );
                continue;
            }

            // The pod-level context supplies defaults for containers that
            // do not set their own IDs.
            let context = container.security_context.as_ref();
            let run_as_user = context
                .and_then(|c| c.run_as_user)
                .or_else(|| pod_context.and_then(|c| c.run_as_user));
            let run_as_group = context
                .and_then(|c| c.run_as_group)
                .or_else(|| pod_context.and_then(|c| c.run_as_group));

            if run_as_user.is_none_or(|uid| uid < MIN_SAFE_ID) {
                flagged = true;
                score.add_comment(
                    &container.name,
                    "The container is running with a low user ID",
                    "A userid above 10 000 is recommended to avoid conflicts with the host. Set securityContext.runAsUser to a value > 10000",
                );
            }
            if run_as_group.is_none_or(|gid| gid < MIN_SAFE_ID) {
                flagged = true;
                score.add_comment(
                    &container.name,
                    "The container running with a low group ID",
                    "A groupid above 10 000 is recommended to avoid conflicts with the host. Set securityContext.runAsGroup to a value > 10000",
                );
            }
        }

        if flagged {
            score.grade = Grade::Critical;
        }
        Ok(score)
    })
}

fn privileged(skip_init_containers: bool) -> CheckFn<WorkloadObject> {
    Box::new(move |workload| {
        let mut score = TestScore::ok();
        for container in workload.all_containers(skip_init_containers) {
            let is_privileged = container
                .security_context
                .as_ref()
                .and_then(|c| c.privileged)
                .unwrap_or(false);
            if is_privileged {
                score.add_comment(
                    &container.name,
                    "The container is privileged",
                    "Set securityContext.privileged to false. Privileged containers can access all devices on the host, and grants almost the same access as non-containerized processes on the host.",
                );
                score.grade = Grade::Critical;
            }
        }
        Ok(score)
    })
}

fn read_only_root_filesystem(skip_init_containers: bool) -> CheckFn<WorkloadObject> {
    Box::new(move |workload| {
        let mut score = TestScore::ok();
        let mut flagged = false;

        for container in workload.all_containers(skip_init_containers) {
            match container.security_context.as_ref() {
                None => {
                    flagged = true;
                    score.add_comment(
                        &container.name,
                        "Container has no configured security context",
                        "Set securityContext to run the container in a more secure context.",
                    );
                }
                Some(context) => {
                    if !context.read_only_root_filesystem.unwrap_or(false) {
                        flagged = true;
                        score.add_comment(
                            &container.name,
                            "The pod has a container with a writable root filesystem",
                            "Set securityContext.readOnlyRootFilesystem to true",
                        );
                    }
                }
            }
        }

        if flagged {
            score.grade = Grade::Critical;
        }
        Ok(score)
    })
}

const SECCOMP_ANNOTATION: &str = "seccomp.security.alpha.kubernetes.io/defaultProfileName";

fn seccomp_profile() -> CheckFn<WorkloadObject> {
    Box::new(move |workload| {
        let annotated = workload
            .template_annotations()
            .is_some_and(|a| a.contains_key(SECCOMP_ANNOTATION));

        if annotated {
            Ok(TestScore::ok())
        } else {
            Ok(TestScore::warning().with_comment(
                workload.name(),
                "The pod has not configured Seccomp for its containers",
                "Running containers with Seccomp is recommended to reduce the kernel attack surface",
            ))
        }
    })
}
