//! Probe configuration checks
//!
//! Probes only matter for pods that receive traffic, so the check is skipped
//! for pods no Service selects.

use crate::error::ScoreError;
use crate::index::ServiceIndex;
use crate::registry::{CheckFn, CheckRegistry};
use kubegrade_core::object::effective_namespace;
use kubegrade_core::{Grade, TestScore, WorkloadObject};
use std::sync::Arc;

pub fn register(
    checks: &mut CheckRegistry,
    services: Arc<ServiceIndex>,
    default_namespace: String,
) -> Result<(), ScoreError> {
    checks.register_pod_check(
        "Pod Probes",
        "Makes sure that all Pods have safe probe configurations",
        pod_probes(services, default_namespace),
    )?;
    Ok(())
}

fn pod_probes(services: Arc<ServiceIndex>, default_namespace: String) -> CheckFn<WorkloadObject> {
    Box::new(move |workload| {
        let namespace = effective_namespace(workload.namespace(), &default_namespace);
        let labels = workload.template_labels().cloned().unwrap_or_default();
        if !services.any_selects(namespace, &labels) {
            return Ok(TestScore::skipped(
                "Skipped because the pod is not targeted by a service",
            ));
        }

        let mut score = TestScore::default();
        let mut missing_readiness = false;
        let mut missing_liveness = false;
        let mut identical_probes = false;

        // Init containers never carry probes; only the regular containers
        // are inspected.
        if let Some(spec) = workload.template.spec.as_ref() {
            for container in &spec.containers {
                match (
                    container.readiness_probe.as_ref(),
                    container.liveness_probe.as_ref(),
                ) {
                    (None, _) => {
                        missing_readiness = true;
                        score.add_comment(
                            &container.name,
                            "Container is missing a readinessProbe",
                            "A readinessProbe should be used to indicate when the service is ready to receive traffic. Without it, the Pod is risking to receive traffic before it has booted.",
                        );
                    }
                    (Some(_), None) => {
                        missing_liveness = true;
                        score.add_comment(
                            &container.name,
                            "Container is missing a livenessProbe",
                            "A livenessProbe can be used to restart the container if it's deadlocked or has crashed without exiting.",
                        );
                    }
                    (Some(readiness), Some(liveness)) => {
                        if readiness == liveness {
                            identical_probes = true;
                            score.add_comment(
                                &container.name,
                                "Container has the same readiness and liveness probe",
                                "Using the same probe for liveness and readiness is very likely dangerous. It's generally better to avoid the livenessProbe than re-using the readinessProbe.",
                            );
                        }
                    }
                }
            }
        }

        score.grade = if missing_readiness || identical_probes {
            Grade::Critical
        } else if missing_liveness {
            Grade::AlmostOk
        } else {
            Grade::AllOk
        };
        Ok(score)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::core::v1::{
        Container, PodSpec, PodTemplateSpec, Probe, Service, ServiceSpec, TCPSocketAction,
    };
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
    use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
    use kubegrade_core::{FileLocation, ObjectSet, ServiceObject, TypeMeta};
    use std::collections::BTreeMap;

    fn labels(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn service_index(selector: &[(&str, &str)]) -> Arc<ServiceIndex> {
        let mut objects = ObjectSet::new();
        objects.services.push(ServiceObject {
            type_meta: TypeMeta::new("v1", "Service"),
            service: Service {
                metadata: ObjectMeta {
                    name: Some("svc".to_string()),
                    ..Default::default()
                },
                spec: Some(ServiceSpec {
                    selector: Some(labels(selector)),
                    ..Default::default()
                }),
                status: None,
            },
            location: FileLocation::default(),
        });
        Arc::new(ServiceIndex::build(&objects, ""))
    }

    fn probe(port: i32) -> Probe {
        Probe {
            tcp_socket: Some(TCPSocketAction {
                port: IntOrString::Int(port),
                host: None,
            }),
            ..Default::default()
        }
    }

    fn workload(container: Container) -> WorkloadObject {
        WorkloadObject {
            type_meta: TypeMeta::new("apps/v1", "Deployment"),
            metadata: ObjectMeta::default(),
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(labels(&[("app", "web")])),
                    ..Default::default()
                }),
                spec: Some(PodSpec {
                    containers: vec![container],
                    ..Default::default()
                }),
            },
            location: FileLocation::default(),
        }
    }

    #[test]
    fn test_unreferenced_pod_is_skipped() {
        let check = pod_probes(service_index(&[("app", "other")]), String::new());
        let score = check(&workload(Container {
            name: "app".to_string(),
            ..Default::default()
        }))
        .unwrap();
        assert!(score.skipped);
    }

    #[test]
    fn test_missing_readiness_probe_is_critical() {
        let check = pod_probes(service_index(&[("app", "web")]), String::new());
        let score = check(&workload(Container {
            name: "app".to_string(),
            ..Default::default()
        }))
        .unwrap();
        assert!(!score.skipped);
        assert_eq!(score.grade, Grade::Critical);
    }

    #[test]
    fn test_missing_liveness_probe_is_almost_ok() {
        let check = pod_probes(service_index(&[("app", "web")]), String::new());
        let score = check(&workload(Container {
            name: "app".to_string(),
            readiness_probe: Some(probe(8080)),
            ..Default::default()
        }))
        .unwrap();
        assert_eq!(score.grade, Grade::AlmostOk);
    }

    #[test]
    fn test_identical_probes_are_critical() {
        let check = pod_probes(service_index(&[("app", "web")]), String::new());
        let score = check(&workload(Container {
            name: "app".to_string(),
            readiness_probe: Some(probe(8080)),
            liveness_probe: Some(probe(8080)),
            ..Default::default()
        }))
        .unwrap();
        assert_eq!(score.grade, Grade::Critical);
    }

    #[test]
    fn test_distinct_probes_are_ok() {
        let check = pod_probes(service_index(&[("app", "web")]), String::new());
        let score = check(&workload(Container {
            name: "app".to_string(),
            readiness_probe: Some(probe(8080)),
            liveness_probe: Some(probe(8081)),
            ..Default::default()
        }))
        .unwrap();
        assert_eq!(score.grade, Grade::AllOk);
    }
}
