//! Container-level checks: resources, image handling, ports and environment

use crate::error::ScoreError;
use crate::registry::CheckRegistry;
use k8s_openapi::api::core::v1::Container;
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use kubegrade_core::{Grade, TestScore, WorkloadObject};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, Default)]
pub struct Options {
    pub skip_init_containers: bool,
    pub ignore_cpu_limit: bool,
    pub ignore_memory_limit: bool,
}

pub fn register(checks: &mut CheckRegistry, options: Options) -> Result<(), ScoreError> {
    checks.register_pod_check(
        "Container Resources",
        "Makes sure that all pods have resource limits and requests set. The --ignore-container-cpu-limit flag can be used to disable the requirement of having a CPU limit",
        container_resources(options),
    )?;
    checks.register_optional_pod_check(
        "Container Resource Requests Equal Limits",
        "Makes sure that all pods have the same requests as limits on resources set.",
        container_requests_equal_limits(options),
    )?;
    checks.register_optional_pod_check(
        "Container CPU Requests Equal Limits",
        "Makes sure that all pods have the same CPU requests as limits set.",
        requests_equal_limits_for(options, "cpu", "CPU"),
    )?;
    checks.register_optional_pod_check(
        "Container Memory Requests Equal Limits",
        "Makes sure that all pods have the same memory requests as limits set.",
        requests_equal_limits_for(options, "memory", "Memory"),
    )?;
    checks.register_pod_check(
        "Container Image Tag",
        "Makes sure that a explicit non-latest tag is used",
        container_image_tag(options),
    )?;
    checks.register_pod_check(
        "Container Image Pull Policy",
        "Makes sure that the pullPolicy is set to Always. This makes sure that imagePullSecrets are always validated.",
        container_image_pull_policy(options),
    )?;
    checks.register_pod_check(
        "Container Ephemeral Storage Request and Limit",
        "Makes sure all pods have ephemeral-storage requests and limits set",
        ephemeral_storage_request_and_limit(options),
    )?;
    checks.register_optional_pod_check(
        "Container Ephemeral Storage Request Equals Limit",
        "Make sure all pods have matching ephemeral-storage requests and limits",
        ephemeral_storage_request_equals_limit(options),
    )?;
    checks.register_optional_pod_check(
        "Container Ports Check",
        "Container Ports Checks",
        container_ports(options),
    )?;
    checks.register_pod_check(
        "Environment Variable Key Duplication",
        "Makes sure that duplicated environment variable keys are not duplicated",
        env_key_duplication(options),
    )?;
    Ok(())
}

/// Parse a Kubernetes resource quantity to a comparable value.
///
/// Handles the decimal ("100m", "2", "1k") and binary ("128Mi") suffix
/// families; values that do not parse compare as zero.
fn parse_quantity(quantity: &Quantity) -> f64 {
    let s = quantity.0.trim();
    if s.is_empty() {
        return 0.0;
    }
    let split = s
        .find(|c: char| !(c.is_ascii_digit() || c == '.' || c == '-' || c == '+'))
        .unwrap_or(s.len());
    let (number, suffix) = s.split_at(split);
    let Ok(number) = number.parse::<f64>() else {
        return 0.0;
    };
    let multiplier: f64 = match suffix {
        "" => 1.0,
        "m" => 1e-3,
        "k" => 1e3,
        "M" => 1e6,
        "G" => 1e9,
        "T" => 1e12,
        "P" => 1e15,
        "E" => 1e18,
        "Ki" => 1024.0,
        "Mi" => 1024.0 * 1024.0,
        "Gi" => 1024.0 * 1024.0 * 1024.0,
        "Ti" => 1024.0 * 1024.0 * 1024.0 * 1024.0,
        "Pi" => 1024f64.powi(5),
        "Ei" => 1024f64.powi(6),
        _ => return 0.0,
    };
    number * multiplier
}

fn limit<'a>(container: &'a Container, resource: &str) -> Option<&'a Quantity> {
    container.resources.as_ref()?.limits.as_ref()?.get(resource)
}

fn request<'a>(container: &'a Container, resource: &str) -> Option<&'a Quantity> {
    container
        .resources
        .as_ref()?
        .requests
        .as_ref()?
        .get(resource)
}

fn is_set(quantity: Option<&Quantity>) -> bool {
    quantity.is_some_and(|q| parse_quantity(q) != 0.0)
}

fn quantities_equal(a: Option<&Quantity>, b: Option<&Quantity>) -> bool {
    let a = a.map(parse_quantity).unwrap_or(0.0);
    let b = b.map(parse_quantity).unwrap_or(0.0);
    a == b
}

type PodCheckFn = crate::registry::CheckFn<WorkloadObject>;

fn container_resources(options: Options) -> PodCheckFn {
    Box::new(move |workload| {
        let containers = workload.all_containers(options.skip_init_containers);
        let mut score = TestScore::default();
        let mut missing_limit = false;
        let mut missing_request = false;

        for container in &containers {
            if !is_set(limit(container, "cpu")) && !options.ignore_cpu_limit {
                score.add_comment(
                    &container.name,
                    "CPU limit is not set",
                    "Resource limits are recommended to avoid resource DDOS. Set resources.limits.cpu",
                );
                missing_limit = true;
            }
            if !is_set(limit(container, "memory")) && !options.ignore_memory_limit {
                score.add_comment(
                    &container.name,
                    "Memory limit is not set",
                    "Resource limits are recommended to avoid resource DDOS. Set resources.limits.memory",
                );
                missing_limit = true;
            }
            if !is_set(request(container, "cpu")) {
                score.add_comment(
                    &container.name,
                    "CPU request is not set",
                    "Resource requests are recommended to make sure that the application can start and run without crashing. Set resources.requests.cpu",
                );
                missing_request = true;
            }
            if !is_set(request(container, "memory")) {
                score.add_comment(
                    &container.name,
                    "Memory request is not set",
                    "Resource requests are recommended to make sure that the application can start and run without crashing. Set resources.requests.memory",
                );
                missing_request = true;
            }
        }

        score.grade = if containers.is_empty() {
            score.add_comment("", "No containers defined", "");
            Grade::Critical
        } else if missing_limit {
            Grade::Critical
        } else if missing_request {
            Grade::Warning
        } else {
            Grade::AllOk
        };
        Ok(score)
    })
}

fn requests_equal_limits_for(options: Options, resource: &'static str, label: &'static str) -> PodCheckFn {
    Box::new(move |workload| {
        let mut score = TestScore::ok();
        for container in workload.all_containers(options.skip_init_containers) {
            if !quantities_equal(request(container, resource), limit(container, resource)) {
                score.add_comment(
                    &container.name,
                    format!("{label} requests does not match limits"),
                    format!(
                        "Having equal requests and limits is recommended to avoid resource DDOS of the node during spikes. Set resources.requests.{resource} == resources.limits.{resource}"
                    ),
                );
                score.grade = Grade::Critical;
            }
        }
        Ok(score)
    })
}

fn container_requests_equal_limits(options: Options) -> PodCheckFn {
    let cpu = requests_equal_limits_for(options, "cpu", "CPU");
    let memory = requests_equal_limits_for(options, "memory", "Memory");
    Box::new(move |workload| {
        let cpu_score = cpu(workload)?;
        let memory_score = memory(workload)?;

        let mut score = TestScore::ok();
        for part in [cpu_score, memory_score] {
            if part.grade == Grade::Critical {
                score.grade = Grade::Critical;
                score.comments.extend(part.comments);
            }
        }
        Ok(score)
    })
}

/// The image tag, or an empty string when the image has none.
fn image_tag(image: &str) -> &str {
    match image.rsplit_once(':') {
        Some((_, tag)) => tag,
        None => "",
    }
}

fn container_image_tag(options: Options) -> PodCheckFn {
    Box::new(move |workload| {
        let mut score = TestScore::ok();
        for container in workload.all_containers(options.skip_init_containers) {
            let tag = image_tag(container.image.as_deref().unwrap_or(""));
            if tag.is_empty() || tag == "latest" {
                score.add_comment(
                    &container.name,
                    "Image with latest tag",
                    "Using a fixed tag is recommended to avoid accidental upgrades",
                );
                score.grade = Grade::Critical;
            }
        }
        Ok(score)
    })
}

fn container_image_pull_policy(options: Options) -> PodCheckFn {
    Box::new(move |workload| {
        let mut score = TestScore::ok();
        for container in workload.all_containers(options.skip_init_containers) {
            let tag = image_tag(container.image.as_deref().unwrap_or(""));
            let policy = container.image_pull_policy.as_deref().unwrap_or("");

            // An unset policy on a latest (or untagged) image defaults to
            // always pulling, which is what the check asks for.
            if policy.is_empty() && (tag.is_empty() || tag == "latest") {
                continue;
            }

            if policy != "Always" {
                score.add_comment(
                    &container.name,
                    "ImagePullPolicy is not set to Always",
                    "It's recommended to always set the ImagePullPolicy to Always, to make sure that the imagePullSecrets are always correct, and to always get the image you want.",
                );
                score.grade = Grade::Critical;
            }
        }
        Ok(score)
    })
}

fn ephemeral_storage_request_and_limit(options: Options) -> PodCheckFn {
    Box::new(move |workload| {
        let containers = workload.all_containers(options.skip_init_containers);
        let mut score = TestScore::default();
        let mut missing_limit = false;
        let mut missing_request = false;

        for container in &containers {
            if !is_set(limit(container, "ephemeral-storage")) {
                score.add_comment(
                    &container.name,
                    "Ephemeral Storage limit is not set",
                    "Resource limits are recommended to avoid resource DDOS. Set resources.limits.ephemeral-storage",
                );
                missing_limit = true;
            }
            if !is_set(request(container, "ephemeral-storage")) {
                score.add_comment(
                    &container.name,
                    "Ephemeral Storage request is not set",
                    "Resource requests are recommended to make sure the application can start and run without crashing. Set resource.requests.ephemeral-storage",
                );
                missing_request = true;
            }
        }

        score.grade = if containers.is_empty() {
            score.add_comment("", "No containers defined", "");
            Grade::Critical
        } else if missing_limit {
            Grade::Critical
        } else if missing_request {
            Grade::Warning
        } else {
            Grade::AllOk
        };
        Ok(score)
    })
}

fn ephemeral_storage_request_equals_limit(options: Options) -> PodCheckFn {
    Box::new(move |workload| {
        let mut score = TestScore::ok();
        for container in workload.all_containers(options.skip_init_containers) {
            let request = request(container, "ephemeral-storage");
            let limit = limit(container, "ephemeral-storage");
            if is_set(request) && is_set(limit) && !quantities_equal(request, limit) {
                score.add_comment(
                    &container.name,
                    "Ephemeral Storage request does not match limit",
                    "Having equal requests and limits is recommended to avoid node resource DDOS during spikes",
                );
                score.grade = Grade::Critical;
            }
        }
        Ok(score)
    })
}

fn container_ports(options: Options) -> PodCheckFn {
    const MAX_PORT_NAME_LENGTH: usize = 15;

    Box::new(move |workload| {
        let mut score = TestScore::ok();
        for container in workload.all_containers(options.skip_init_containers) {
            let mut names = BTreeSet::new();
            for port in container.ports.iter().flatten() {
                if let Some(name) = port.name.as_deref() {
                    if !name.is_empty() && !names.insert(name) {
                        score.add_comment(
                            &container.name,
                            "Container Port Check",
                            "Container ports.containerPort named ports must be unique",
                        );
                        score.grade = Grade::Critical;
                    }
                    if name.len() > MAX_PORT_NAME_LENGTH {
                        score.add_comment(
                            &container.name,
                            "Container Port Check",
                            "Container port.Name length exceeds maximum permitted characters",
                        );
                        score.grade = Grade::Critical;
                    }
                }
                if port.container_port == 0 {
                    score.add_comment(
                        &container.name,
                        "Container Port Check",
                        "Container ports.containerPort cannot be empty",
                    );
                    score.grade = Grade::Critical;
                }
            }
        }
        Ok(score)
    })
}

fn env_key_duplication(options: Options) -> PodCheckFn {
    Box::new(move |workload| {
        let mut score = TestScore::ok();
        for container in workload.all_containers(options.skip_init_containers) {
            let mut seen = BTreeSet::new();
            for env in container.env.iter().flatten() {
                if !seen.insert(env.name.as_str()) {
                    score.add_comment(
                        &container.name,
                        "Environment Variable Key Duplication",
                        format!(
                            "Container environment variable key '{}' is duplicated",
                            env.name
                        ),
                    );
                    score.grade = Grade::Critical;
                }
            }
        }
        Ok(score)
    })
}
