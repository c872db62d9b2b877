//! Multi-document YAML decoding with source locations
//!
//! Splits each input into documents, tracks the line every document starts
//! on, recognizes Helm-rendered output through `# Source:` comments, and
//! decodes known kinds into their typed views. Unknown kinds keep a
//! metadata-only view so they still participate in metadata checks.

use crate::error::ParseError;
use crate::skip::SkipExpression;
use k8s_openapi::api::apps::v1::{Deployment, StatefulSet};
use k8s_openapi::api::autoscaling;
use k8s_openapi::api::batch::v1::{CronJob, Job};
use k8s_openapi::api::core::v1::{Pod, PodTemplateSpec, Service};
use k8s_openapi::api::networking::v1::{Ingress, NetworkPolicy};
use k8s_openapi::api::policy::v1::PodDisruptionBudget;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kubegrade_core::{
    CronJobObject, DeploymentObject, FileLocation, HpaObject, HpaTarget, IngressObject,
    NetworkPolicyObject, ObjectSet, PdbObject, PodObject, ResourceMeta, ServiceObject,
    StatefulSetObject, TypeMeta, WorkloadObject,
};
use serde::de::DeserializeOwned;
use tracing::debug;

/// One named input, already read by the caller. `-` on the CLI becomes the
/// name `STDIN`.
#[derive(Debug, Clone)]
pub struct NamedSource {
    pub name: String,
    pub content: String,
}

impl NamedSource {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Default)]
pub struct Parser {
    skip_expressions: Vec<SkipExpression>,
}

struct RawDocument {
    content: String,
    line: usize,
    /// Path from a Helm `# Source:` comment, when present.
    helm_source: Option<String>,
}

impl Parser {
    pub fn new(skip_expressions: Vec<SkipExpression>) -> Self {
        Self { skip_expressions }
    }

    /// Decode all sources into one ObjectSet, in encounter order.
    pub fn parse(&self, sources: &[NamedSource]) -> Result<ObjectSet, ParseError> {
        let mut objects = ObjectSet::new();
        for source in sources {
            for document in split_documents(&source.content) {
                self.parse_document(&mut objects, source, &document)?;
            }
        }
        Ok(objects)
    }

    fn parse_document(
        &self,
        objects: &mut ObjectSet,
        source: &NamedSource,
        document: &RawDocument,
    ) -> Result<(), ParseError> {
        let location = match document.helm_source.as_deref() {
            // Rendered chart output: report the template the document came
            // from instead of the combined stream.
            Some(path) => FileLocation::new(path, 1),
            None => FileLocation::new(&source.name, document.line),
        };

        let value: serde_yaml::Value = serde_yaml::from_str(&document.content).map_err(|err| {
            ParseError::InvalidDocument {
                file: location.file.clone(),
                line: location.line,
                message: err.to_string(),
            }
        })?;

        let api_version = value
            .get("apiVersion")
            .and_then(|v| v.as_str())
            .map(str::to_string);
        let kind = value
            .get("kind")
            .and_then(|v| v.as_str())
            .map(str::to_string);
        let (Some(api_version), Some(kind)) = (api_version, kind) else {
            return Err(ParseError::InvalidDocument {
                file: location.file.clone(),
                line: location.line,
                message: "document is missing apiVersion or kind".to_string(),
            });
        };
        let type_meta = TypeMeta::new(api_version, kind);

        if let Some(expression) = self.skip_expressions.iter().find(|e| e.matches(&value)) {
            debug!(
                kind = type_meta.kind,
                %expression,
                "document excluded by skip expression"
            );
            return Ok(());
        }

        let metadata = decode_metadata(&value);
        objects.metas.push(ResourceMeta {
            type_meta: type_meta.clone(),
            metadata,
            location: location.clone(),
        });

        match (type_meta.api_version.as_str(), type_meta.kind.as_str()) {
            ("v1", "Pod") => {
                let pod: Pod = decode(&value, &type_meta, &location)?;
                objects.pods.push(PodObject {
                    type_meta,
                    pod,
                    location,
                });
            }
            ("v1", "Service") => {
                let service: Service = decode(&value, &type_meta, &location)?;
                objects.services.push(ServiceObject {
                    type_meta,
                    service,
                    location,
                });
            }
            ("apps/v1", "Deployment") => {
                let deployment: Deployment = decode(&value, &type_meta, &location)?;
                if let Some(spec) = deployment.spec.as_ref() {
                    objects.workloads.push(WorkloadObject {
                        type_meta: type_meta.clone(),
                        metadata: deployment.metadata.clone(),
                        template: spec.template.clone(),
                        location: location.clone(),
                    });
                }
                objects.deployments.push(DeploymentObject {
                    type_meta,
                    deployment,
                    location,
                });
            }
            ("apps/v1", "StatefulSet") => {
                let stateful_set: StatefulSet = decode(&value, &type_meta, &location)?;
                if let Some(spec) = stateful_set.spec.as_ref() {
                    objects.workloads.push(WorkloadObject {
                        type_meta: type_meta.clone(),
                        metadata: stateful_set.metadata.clone(),
                        template: spec.template.clone(),
                        location: location.clone(),
                    });
                }
                objects.stateful_sets.push(StatefulSetObject {
                    type_meta,
                    stateful_set,
                    location,
                });
            }
            ("batch/v1", "Job") => {
                let job: Job = decode(&value, &type_meta, &location)?;
                let template = job
                    .spec
                    .as_ref()
                    .map(|s| s.template.clone())
                    .unwrap_or_default();
                objects.workloads.push(WorkloadObject {
                    type_meta,
                    metadata: job.metadata,
                    template,
                    location,
                });
            }
            ("batch/v1", "CronJob") => {
                let cron_job: CronJob = decode(&value, &type_meta, &location)?;
                objects.workloads.push(WorkloadObject {
                    type_meta: type_meta.clone(),
                    metadata: cron_job.metadata.clone(),
                    template: cron_job_template(&cron_job),
                    location: location.clone(),
                });
                objects.cron_jobs.push(CronJobObject {
                    type_meta,
                    cron_job,
                    location,
                });
            }
            ("networking.k8s.io/v1", "NetworkPolicy") => {
                let network_policy: NetworkPolicy = decode(&value, &type_meta, &location)?;
                objects.network_policies.push(NetworkPolicyObject {
                    type_meta,
                    network_policy,
                    location,
                });
            }
            ("networking.k8s.io/v1", "Ingress") => {
                let ingress: Ingress = decode(&value, &type_meta, &location)?;
                objects.ingresses.push(IngressObject {
                    type_meta,
                    ingress,
                    location,
                });
            }
            ("autoscaling/v1", "HorizontalPodAutoscaler") => {
                let hpa: autoscaling::v1::HorizontalPodAutoscaler =
                    decode(&value, &type_meta, &location)?;
                let (min_replicas, target) = match hpa.spec {
                    Some(spec) => (
                        spec.min_replicas,
                        HpaTarget {
                            api_version: spec.scale_target_ref.api_version.unwrap_or_default(),
                            kind: spec.scale_target_ref.kind,
                            name: spec.scale_target_ref.name,
                        },
                    ),
                    None => (None, HpaTarget {
                        api_version: String::new(),
                        kind: String::new(),
                        name: String::new(),
                    }),
                };
                objects.hpas.push(HpaObject {
                    type_meta,
                    metadata: hpa.metadata,
                    min_replicas,
                    target,
                    location,
                });
            }
            ("autoscaling/v2", "HorizontalPodAutoscaler") => {
                let hpa: autoscaling::v2::HorizontalPodAutoscaler =
                    decode(&value, &type_meta, &location)?;
                let (min_replicas, target) = match hpa.spec {
                    Some(spec) => (
                        spec.min_replicas,
                        HpaTarget {
                            api_version: spec.scale_target_ref.api_version.unwrap_or_default(),
                            kind: spec.scale_target_ref.kind,
                            name: spec.scale_target_ref.name,
                        },
                    ),
                    None => (None, HpaTarget {
                        api_version: String::new(),
                        kind: String::new(),
                        name: String::new(),
                    }),
                };
                objects.hpas.push(HpaObject {
                    type_meta,
                    metadata: hpa.metadata,
                    min_replicas,
                    target,
                    location,
                });
            }
            ("policy/v1", "PodDisruptionBudget") => {
                let pdb: PodDisruptionBudget = decode(&value, &type_meta, &location)?;
                objects.pdbs.push(PdbObject {
                    type_meta,
                    pdb,
                    location,
                });
            }
            (api_version, kind) => {
                // Unknown or deprecated kinds stay metadata-only; the
                // stable-version check still grades them.
                debug!(api_version, kind, "no typed decoder for kind");
            }
        }

        Ok(())
    }
}

fn cron_job_template(cron_job: &CronJob) -> PodTemplateSpec {
    cron_job
        .spec
        .as_ref()
        .and_then(|s| s.job_template.spec.as_ref())
        .map(|job_spec| job_spec.template.clone())
        .unwrap_or_default()
}

fn decode<T: DeserializeOwned>(
    value: &serde_yaml::Value,
    type_meta: &TypeMeta,
    location: &FileLocation,
) -> Result<T, ParseError> {
    serde_yaml::from_value(value.clone()).map_err(|source| ParseError::Decode {
        kind: type_meta.kind.clone(),
        file: location.file.clone(),
        line: location.line,
        source,
    })
}

fn decode_metadata(value: &serde_yaml::Value) -> ObjectMeta {
    value
        .get("metadata")
        .cloned()
        .and_then(|m| serde_yaml::from_value(m).ok())
        .unwrap_or_default()
}

/// Split a YAML stream on `---` separators, remembering the 1-based line
/// each document's content starts on and any Helm `# Source:` comment.
fn split_documents(content: &str) -> Vec<RawDocument> {
    let mut documents = Vec::new();
    let mut current = String::new();
    let mut start_line = None;
    let mut helm_source = None;

    let mut flush = |current: &mut String, start_line: &mut Option<usize>, helm_source: &mut Option<String>| {
        let blank = current
            .lines()
            .all(|l| l.trim().is_empty() || l.trim_start().starts_with('#'));
        if !blank {
            documents.push(RawDocument {
                content: std::mem::take(current),
                line: start_line.unwrap_or(1),
                helm_source: helm_source.take(),
            });
        } else {
            current.clear();
            *helm_source = None;
        }
        *start_line = None;
    };

    for (index, line) in content.lines().enumerate() {
        if line.trim_end() == "---" {
            flush(&mut current, &mut start_line, &mut helm_source);
            continue;
        }
        if let Some(path) = line.trim().strip_prefix("# Source:") {
            helm_source = Some(path.trim().to_string());
        }
        if start_line.is_none() && !line.trim().is_empty() {
            start_line = Some(index + 1);
        }
        current.push_str(line);
        current.push('\n');
    }
    flush(&mut current, &mut start_line, &mut helm_source);

    documents
}
