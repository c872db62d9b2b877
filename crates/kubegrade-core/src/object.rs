//! Typed views over decoded Kubernetes resources
//!
//! The parser turns every input document into one or more of the views in
//! this module. Resources keep their full k8s-openapi spec; the wrappers add
//! the two things the generated types do not carry: the declared
//! apiVersion/kind pair and the source location of the document.

use k8s_openapi::api::apps::v1::{Deployment, StatefulSet};
use k8s_openapi::api::batch::v1::CronJob;
use k8s_openapi::api::core::v1::{Container, Pod, PodTemplateSpec, Service};
use k8s_openapi::api::networking::v1::{Ingress, NetworkPolicy};
use k8s_openapi::api::policy::v1::PodDisruptionBudget;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use serde::Serialize;
use std::collections::BTreeMap;

/// Declared identity of a parsed document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeMeta {
    pub api_version: String,
    pub kind: String,
}

impl TypeMeta {
    pub fn new(api_version: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            api_version: api_version.into(),
            kind: kind.into(),
        }
    }
}

/// Where a document came from.
///
/// `file` is the input file name (or the Helm `# Source:` path when the input
/// is rendered chart output), `line` the 1-based line the document starts on.
/// `skip` marks documents excluded by a skip expression.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FileLocation {
    pub file: String,
    pub line: usize,
    pub skip: bool,
}

impl FileLocation {
    pub fn new(file: impl Into<String>, line: usize) -> Self {
        Self {
            file: file.into(),
            line,
            skip: false,
        }
    }
}

/// Resolve an optional namespace against the run-wide default.
///
/// Resources without a namespace belong to the configured default namespace
/// for every comparison, but the stored object is never rewritten.
pub fn effective_namespace<'a>(namespace: Option<&'a str>, default: &'a str) -> &'a str {
    match namespace {
        Some(ns) if !ns.is_empty() => ns,
        _ => default,
    }
}

/// The generic view every parsed document gets, regardless of kind.
#[derive(Debug, Clone)]
pub struct ResourceMeta {
    pub type_meta: TypeMeta,
    pub metadata: ObjectMeta,
    pub location: FileLocation,
}

impl ResourceMeta {
    pub fn name(&self) -> &str {
        self.metadata.name.as_deref().unwrap_or("")
    }

    pub fn namespace(&self) -> Option<&str> {
        self.metadata.namespace.as_deref()
    }
}

macro_rules! resource_object {
    ($name:ident, $field:ident, $resource:ty) => {
        #[derive(Debug, Clone)]
        pub struct $name {
            pub type_meta: TypeMeta,
            pub $field: $resource,
            pub location: FileLocation,
        }

        impl $name {
            pub fn name(&self) -> &str {
                self.$field.metadata.name.as_deref().unwrap_or("")
            }

            pub fn namespace(&self) -> Option<&str> {
                self.$field.metadata.namespace.as_deref()
            }

            pub fn annotations(&self) -> Option<&BTreeMap<String, String>> {
                self.$field.metadata.annotations.as_ref()
            }

            pub fn meta(&self) -> ResourceMeta {
                ResourceMeta {
                    type_meta: self.type_meta.clone(),
                    metadata: self.$field.metadata.clone(),
                    location: self.location.clone(),
                }
            }
        }
    };
}

resource_object!(PodObject, pod, Pod);
resource_object!(ServiceObject, service, Service);
resource_object!(DeploymentObject, deployment, Deployment);
resource_object!(StatefulSetObject, stateful_set, StatefulSet);
resource_object!(NetworkPolicyObject, network_policy, NetworkPolicy);
resource_object!(IngressObject, ingress, Ingress);
resource_object!(CronJobObject, cron_job, CronJob);
resource_object!(PdbObject, pdb, PodDisruptionBudget);

impl PdbObject {
    pub fn selector(&self) -> Option<&LabelSelector> {
        self.pdb.spec.as_ref().and_then(|s| s.selector.as_ref())
    }
}

/// Common view over `autoscaling/v1` and `autoscaling/v2` autoscalers.
#[derive(Debug, Clone)]
pub struct HpaObject {
    pub type_meta: TypeMeta,
    pub metadata: ObjectMeta,
    pub min_replicas: Option<i32>,
    pub target: HpaTarget,
    pub location: FileLocation,
}

/// The object an autoscaler scales.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HpaTarget {
    pub api_version: String,
    pub kind: String,
    pub name: String,
}

impl HpaObject {
    pub fn name(&self) -> &str {
        self.metadata.name.as_deref().unwrap_or("")
    }

    pub fn namespace(&self) -> Option<&str> {
        self.metadata.namespace.as_deref()
    }

    pub fn annotations(&self) -> Option<&BTreeMap<String, String>> {
        self.metadata.annotations.as_ref()
    }

    pub fn meta(&self) -> ResourceMeta {
        ResourceMeta {
            type_meta: self.type_meta.clone(),
            metadata: self.metadata.clone(),
            location: self.location.clone(),
        }
    }
}

/// Flattened view of anything that embeds a pod template.
///
/// The parser emits one per Deployment, StatefulSet, Job and CronJob; the
/// scoring engine synthesizes one per bare Pod so that all pod-level checks
/// run against a single shape.
#[derive(Debug, Clone)]
pub struct WorkloadObject {
    pub type_meta: TypeMeta,
    pub metadata: ObjectMeta,
    pub template: PodTemplateSpec,
    pub location: FileLocation,
}

impl WorkloadObject {
    pub fn name(&self) -> &str {
        self.metadata.name.as_deref().unwrap_or("")
    }

    pub fn namespace(&self) -> Option<&str> {
        self.metadata.namespace.as_deref()
    }

    pub fn annotations(&self) -> Option<&BTreeMap<String, String>> {
        self.metadata.annotations.as_ref()
    }

    pub fn template_annotations(&self) -> Option<&BTreeMap<String, String>> {
        self.template
            .metadata
            .as_ref()
            .and_then(|m| m.annotations.as_ref())
    }

    pub fn template_labels(&self) -> Option<&BTreeMap<String, String>> {
        self.template
            .metadata
            .as_ref()
            .and_then(|m| m.labels.as_ref())
    }

    /// All containers of the pod template, init containers first unless the
    /// run is configured to skip them.
    pub fn all_containers(&self, skip_init_containers: bool) -> Vec<&Container> {
        let mut containers = Vec::new();
        if let Some(spec) = self.template.spec.as_ref() {
            if !skip_init_containers {
                if let Some(init) = spec.init_containers.as_ref() {
                    containers.extend(init.iter());
                }
            }
            containers.extend(spec.containers.iter());
        }
        containers
    }

    pub fn meta(&self) -> ResourceMeta {
        ResourceMeta {
            type_meta: self.type_meta.clone(),
            metadata: self.metadata.clone(),
            location: self.location.clone(),
        }
    }
}

/// Everything the parser decoded from the input, in encounter order.
///
/// One resource can appear in more than one collection: a Deployment is a
/// `DeploymentObject`, a `WorkloadObject` and a `ResourceMeta` at the same
/// time, so that kind-specific, pod-level and metadata checks all see it.
#[derive(Debug, Clone, Default)]
pub struct ObjectSet {
    pub metas: Vec<ResourceMeta>,
    pub pods: Vec<PodObject>,
    pub workloads: Vec<WorkloadObject>,
    pub services: Vec<ServiceObject>,
    pub stateful_sets: Vec<StatefulSetObject>,
    pub deployments: Vec<DeploymentObject>,
    pub network_policies: Vec<NetworkPolicyObject>,
    pub ingresses: Vec<IngressObject>,
    pub cron_jobs: Vec<CronJobObject>,
    pub hpas: Vec<HpaObject>,
    pub pdbs: Vec<PdbObject>,
}

impl ObjectSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of typed objects (metadata-only entries not counted).
    pub fn len(&self) -> usize {
        self.pods.len()
            + self.workloads.len()
            + self.services.len()
            + self.network_policies.len()
            + self.ingresses.len()
            + self.hpas.len()
            + self.pdbs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metas.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_namespace_prefers_explicit() {
        assert_eq!(effective_namespace(Some("prod"), "default"), "prod");
    }

    #[test]
    fn test_effective_namespace_defaults_empty() {
        assert_eq!(effective_namespace(Some(""), "default"), "default");
        assert_eq!(effective_namespace(None, "default"), "default");
    }

    #[test]
    fn test_effective_namespace_is_idempotent() {
        let once = effective_namespace(None, "fallback");
        let twice = effective_namespace(Some(once), "fallback");
        assert_eq!(once, twice);

        let explicit = effective_namespace(Some("prod"), "fallback");
        assert_eq!(effective_namespace(Some(explicit), "fallback"), "prod");
    }

    #[test]
    fn test_workload_all_containers_honors_skip_init() {
        use k8s_openapi::api::core::v1::PodSpec;

        let workload = WorkloadObject {
            type_meta: TypeMeta::new("apps/v1", "Deployment"),
            metadata: ObjectMeta::default(),
            template: PodTemplateSpec {
                metadata: None,
                spec: Some(PodSpec {
                    init_containers: Some(vec![Container {
                        name: "init".to_string(),
                        ..Default::default()
                    }]),
                    containers: vec![Container {
                        name: "main".to_string(),
                        ..Default::default()
                    }],
                    ..Default::default()
                }),
            },
            location: FileLocation::default(),
        };

        let all: Vec<&str> = workload
            .all_containers(false)
            .iter()
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(all, vec!["init", "main"]);

        let skipped: Vec<&str> = workload
            .all_containers(true)
            .iter()
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(skipped, vec!["main"]);
    }
}
