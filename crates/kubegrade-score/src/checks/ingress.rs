//! Ingress backend checks

use crate::error::ScoreError;
use crate::index::{ServiceIndex, ServicePortRef};
use crate::registry::{CheckFn, CheckRegistry};
use kubegrade_core::object::effective_namespace;
use kubegrade_core::{Grade, IngressObject, TestScore};
use std::sync::Arc;

pub fn register(
    checks: &mut CheckRegistry,
    services: Arc<ServiceIndex>,
    default_namespace: String,
) -> Result<(), ScoreError> {
    checks.register_ingress_check(
        "Ingress targets Service",
        "Makes sure that the Ingress targets a Service",
        ingress_targets_service(services, default_namespace),
    )?;
    Ok(())
}

fn ingress_targets_service(
    services: Arc<ServiceIndex>,
    default_namespace: String,
) -> CheckFn<IngressObject> {
    Box::new(move |ingress| {
        let namespace = effective_namespace(ingress.namespace(), &default_namespace);
        let mut score = TestScore::ok();

        for rule in ingress
            .ingress
            .spec
            .iter()
            .flat_map(|s| s.rules.iter().flatten())
        {
            let Some(http) = rule.http.as_ref() else {
                continue;
            };

            for path in &http.paths {
                let path_name = path.path.as_deref().unwrap_or("");
                let Some(backend) = path.backend.service.as_ref() else {
                    // Resource backends are out of scope for this check.
                    score.grade = Grade::Critical;
                    score.add_comment(path_name, "No service match was found", "");
                    continue;
                };

                let port = match backend.port.as_ref() {
                    Some(port) if port.number.unwrap_or(0) > 0 => {
                        ServicePortRef::Number(port.number.unwrap_or(0))
                    }
                    Some(port) => {
                        ServicePortRef::Name(port.name.clone().unwrap_or_default())
                    }
                    None => ServicePortRef::Name(String::new()),
                };

                if !services.has_backend(namespace, &backend.name, &port) {
                    score.grade = Grade::Critical;
                    score.add_comment(
                        path_name,
                        "No service match was found",
                        format!("No service with name {} and {} was found", backend.name, port),
                    );
                }
            }
        }

        Ok(score)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::core::v1::{Service, ServicePort, ServiceSpec};
    use k8s_openapi::api::networking::v1::{
        HTTPIngressPath, HTTPIngressRuleValue, Ingress, IngressBackend, IngressRule,
        IngressServiceBackend, IngressSpec, ServiceBackendPort,
    };
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
    use kubegrade_core::{FileLocation, ObjectSet, ServiceObject, TypeMeta};

    fn service(name: &str, port: i32, port_name: Option<&str>) -> ServiceObject {
        ServiceObject {
            type_meta: TypeMeta::new("v1", "Service"),
            service: Service {
                metadata: ObjectMeta {
                    name: Some(name.to_string()),
                    ..Default::default()
                },
                spec: Some(ServiceSpec {
                    ports: Some(vec![ServicePort {
                        port,
                        name: port_name.map(|n| n.to_string()),
                        ..Default::default()
                    }]),
                    ..Default::default()
                }),
                status: None,
            },
            location: FileLocation::default(),
        }
    }

    fn ingress(backend_service: &str, port: ServiceBackendPort) -> IngressObject {
        IngressObject {
            type_meta: TypeMeta::new("networking.k8s.io/v1", "Ingress"),
            ingress: Ingress {
                metadata: ObjectMeta {
                    name: Some("ing".to_string()),
                    ..Default::default()
                },
                spec: Some(IngressSpec {
                    rules: Some(vec![IngressRule {
                        host: None,
                        http: Some(HTTPIngressRuleValue {
                            paths: vec![HTTPIngressPath {
                                path: Some("/api".to_string()),
                                path_type: "Prefix".to_string(),
                                backend: IngressBackend {
                                    service: Some(IngressServiceBackend {
                                        name: backend_service.to_string(),
                                        port: Some(port),
                                    }),
                                    resource: None,
                                },
                            }],
                        }),
                    }]),
                    ..Default::default()
                }),
                status: None,
            },
            location: FileLocation::default(),
        }
    }

    fn index(services: Vec<ServiceObject>) -> Arc<ServiceIndex> {
        let mut objects = ObjectSet::new();
        objects.services = services;
        Arc::new(ServiceIndex::build(&objects, "default"))
    }

    #[test]
    fn test_ingress_targets_service_by_number() {
        let check = ingress_targets_service(
            index(vec![service("svc", 80, None)]),
            "default".to_string(),
        );
        let score = check(&ingress(
            "svc",
            ServiceBackendPort {
                number: Some(80),
                name: None,
            },
        ))
        .unwrap();
        assert_eq!(score.grade, Grade::AllOk);
    }

    #[test]
    fn test_ingress_targets_service_by_name() {
        let check = ingress_targets_service(
            index(vec![service("svc", 80, Some("http"))]),
            "default".to_string(),
        );
        let score = check(&ingress(
            "svc",
            ServiceBackendPort {
                number: None,
                name: Some("http".to_string()),
            },
        ))
        .unwrap();
        assert_eq!(score.grade, Grade::AllOk);
    }

    #[test]
    fn test_ingress_wrong_port_number_is_critical() {
        let check = ingress_targets_service(
            index(vec![service("svc", 80, None)]),
            "default".to_string(),
        );
        let score = check(&ingress(
            "svc",
            ServiceBackendPort {
                number: Some(8080),
                name: None,
            },
        ))
        .unwrap();
        assert_eq!(score.grade, Grade::Critical);
        assert_eq!(score.comments[0].path, "/api");
        assert!(score.comments[0]
            .description
            .contains("No service with name svc and port number 8080 was found"));
    }

    #[test]
    fn test_ingress_missing_service_is_critical() {
        let check = ingress_targets_service(index(vec![]), "default".to_string());
        let score = check(&ingress(
            "svc",
            ServiceBackendPort {
                number: Some(80),
                name: None,
            },
        ))
        .unwrap();
        assert_eq!(score.grade, Grade::Critical);
    }
}
