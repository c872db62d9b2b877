//! Scoring engine
//!
//! `register_all_checks` builds the relationship indices and wires the full
//! catalog; `score` drives one synchronous pass over the object set in a
//! fixed per-kind order, applying the enablement policy before invoking
//! each check.

use crate::checks;
use crate::enabled::{EnablementPolicy, Verdict};
use crate::error::ScoreError;
use crate::index::RelationshipIndex;
use crate::registry::{CheckRegistry, RegisteredCheck};
use k8s_openapi::api::core::v1::PodTemplateSpec;
use kubegrade_core::{ObjectSet, RunConfiguration, Scorecard, ScoredObject, TestScore, WorkloadObject};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Build the relationship indices from the object set and register the
/// complete check catalog against them.
pub fn register_all_checks(
    objects: &ObjectSet,
    config: &RunConfiguration,
) -> Result<CheckRegistry, ScoreError> {
    let mut registry = CheckRegistry::new(config.ignored_checks.clone());

    let index = RelationshipIndex::build(objects, &config.namespace);
    let pods = Arc::new(index.pods);
    let services = Arc::new(index.services);
    let network_policies = Arc::new(index.network_policies);
    let pdbs = Arc::new(index.pdbs);
    let hpas = Arc::new(index.hpas);
    let targetable = Arc::new(index.targetable);
    let namespace = config.namespace.clone();

    checks::deployment::register(
        &mut registry,
        Arc::clone(&services),
        Arc::clone(&hpas),
        namespace.clone(),
    )?;
    checks::ingress::register(&mut registry, Arc::clone(&services), namespace.clone())?;
    checks::cronjob::register(&mut registry)?;
    checks::container::register(
        &mut registry,
        checks::container::Options {
            skip_init_containers: config.skip_init_containers,
            ignore_cpu_limit: config.ignore_container_cpu_limit,
            ignore_memory_limit: config.ignore_container_memory_limit,
        },
    )?;
    checks::disruptionbudget::register(&mut registry, Arc::clone(&pdbs), namespace.clone())?;
    checks::networkpolicy::register(
        &mut registry,
        Arc::clone(&network_policies),
        Arc::clone(&pods),
        namespace.clone(),
    )?;
    checks::probes::register(&mut registry, Arc::clone(&services), namespace.clone())?;
    checks::security::register(&mut registry, config.skip_init_containers)?;
    checks::service::register(&mut registry, Arc::clone(&pods), namespace.clone())?;
    checks::stable::register(&mut registry, config.kubernetes_version)?;
    checks::apps::register(
        &mut registry,
        Arc::clone(&hpas),
        Arc::clone(&services),
        namespace.clone(),
    )?;
    checks::meta::register(&mut registry)?;
    checks::hpa::register(&mut registry, Arc::clone(&targetable), namespace)?;
    checks::topology::register(&mut registry)?;

    debug!(checks = registry.all().len(), "registered check catalog");
    Ok(registry)
}

type Annotations = BTreeMap<String, String>;

fn run_check<T>(
    entry: &mut ScoredObject,
    registered: &RegisteredCheck<T>,
    target: &T,
    policy: &EnablementPolicy,
    template_annotations: Option<&Annotations>,
    object_annotations: Option<&Annotations>,
) -> Result<(), ScoreError> {
    match policy.decide(&registered.check, template_annotations, object_annotations) {
        Verdict::Skip => {
            entry.add(
                registered.check.clone(),
                TestScore::skipped(format!(
                    "Skipped because {} is ignored",
                    registered.check.id
                )),
            );
        }
        Verdict::Run => {
            let score = (registered.func)(target).map_err(|source| ScoreError::CheckFailed {
                check: registered.check.id.clone(),
                object: format!("{}/{}/{}", entry.type_meta.kind, entry.namespace, entry.name),
                source,
            })?;
            entry.add(registered.check.clone(), score);
        }
    }
    Ok(())
}

/// Run every applicable and enabled check against every object, in a fixed
/// iteration order grouped by resource kind. A check function error aborts
/// the pass.
pub fn score(
    objects: &ObjectSet,
    registry: &CheckRegistry,
    config: &RunConfiguration,
) -> Result<Scorecard, ScoreError> {
    if registry.all().is_empty() {
        return Err(ScoreError::NoChecksRegistered);
    }

    let policy = EnablementPolicy::from_config(config);
    let mut card = Scorecard::new();

    for ingress in &objects.ingresses {
        let entry = card.object_mut(&ingress.type_meta, &ingress.ingress.metadata, &ingress.location);
        for registered in registry.ingresses().values() {
            run_check(entry, registered, ingress, &policy, None, ingress.annotations())?;
        }
    }

    for meta in &objects.metas {
        let entry = card.object_mut(&meta.type_meta, &meta.metadata, &meta.location);
        for registered in registry.metas().values() {
            run_check(
                entry,
                registered,
                meta,
                &policy,
                None,
                meta.metadata.annotations.as_ref(),
            )?;
        }
    }

    for pod in &objects.pods {
        // Pod-level checks see a synthesized single-pod workload view.
        let workload = WorkloadObject {
            type_meta: pod.type_meta.clone(),
            metadata: pod.pod.metadata.clone(),
            template: PodTemplateSpec {
                metadata: Some(pod.pod.metadata.clone()),
                spec: pod.pod.spec.clone(),
            },
            location: pod.location.clone(),
        };
        let entry = card.object_mut(&pod.type_meta, &pod.pod.metadata, &pod.location);
        for registered in registry.pods().values() {
            run_check(entry, registered, &workload, &policy, None, pod.annotations())?;
        }
    }

    for workload in &objects.workloads {
        if workload.type_meta.kind == "Job" && config.skip_jobs {
            continue;
        }
        let entry = card.object_mut(&workload.type_meta, &workload.metadata, &workload.location);
        for registered in registry.pods().values() {
            run_check(
                entry,
                registered,
                workload,
                &policy,
                workload.template_annotations(),
                workload.annotations(),
            )?;
        }
    }

    for service in &objects.services {
        let entry = card.object_mut(&service.type_meta, &service.service.metadata, &service.location);
        for registered in registry.services().values() {
            run_check(entry, registered, service, &policy, None, service.annotations())?;
        }
    }

    for stateful_set in &objects.stateful_sets {
        let entry = card.object_mut(
            &stateful_set.type_meta,
            &stateful_set.stateful_set.metadata,
            &stateful_set.location,
        );
        for registered in registry.stateful_sets().values() {
            run_check(
                entry,
                registered,
                stateful_set,
                &policy,
                None,
                stateful_set.annotations(),
            )?;
        }
    }

    for deployment in &objects.deployments {
        let entry = card.object_mut(
            &deployment.type_meta,
            &deployment.deployment.metadata,
            &deployment.location,
        );
        for registered in registry.deployments().values() {
            run_check(
                entry,
                registered,
                deployment,
                &policy,
                None,
                deployment.annotations(),
            )?;
        }
    }

    for netpol in &objects.network_policies {
        let entry = card.object_mut(
            &netpol.type_meta,
            &netpol.network_policy.metadata,
            &netpol.location,
        );
        for registered in registry.network_policies().values() {
            run_check(entry, registered, netpol, &policy, None, netpol.annotations())?;
        }
    }

    for cron_job in &objects.cron_jobs {
        if config.skip_jobs {
            continue;
        }
        let entry = card.object_mut(&cron_job.type_meta, &cron_job.cron_job.metadata, &cron_job.location);
        for registered in registry.cron_jobs().values() {
            run_check(entry, registered, cron_job, &policy, None, cron_job.annotations())?;
        }
    }

    for hpa in &objects.hpas {
        let entry = card.object_mut(&hpa.type_meta, &hpa.metadata, &hpa.location);
        for registered in registry.hpas().values() {
            run_check(entry, registered, hpa, &policy, None, hpa.annotations())?;
        }
    }

    for pdb in &objects.pdbs {
        let entry = card.object_mut(&pdb.type_meta, &pdb.pdb.metadata, &pdb.location);
        for registered in registry.pdbs().values() {
            run_check(entry, registered, pdb, &policy, None, pdb.annotations())?;
        }
    }

    Ok(card)
}
