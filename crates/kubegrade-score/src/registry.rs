//! Check registry
//!
//! Write-once catalog with one ordered execution map per target kind.
//! Registration derives the check id from the display name, fails fast on a
//! duplicate id for the same kind, records every check in the "all checks"
//! listing, and keeps run-ignored checks out of the execution maps.

use crate::error::{CheckError, ScoreError};
use indexmap::IndexMap;
use kubegrade_core::{
    Check, CronJobObject, DeploymentObject, HpaObject, IngressObject, NetworkPolicyObject,
    PdbObject, ResourceMeta, ServiceObject, StatefulSetObject, TestScore, WorkloadObject,
};
use std::collections::BTreeSet;

pub type CheckFn<T> = Box<dyn Fn(&T) -> Result<TestScore, CheckError>>;

/// A check's metadata together with its implementation.
pub struct RegisteredCheck<T> {
    pub check: Check,
    pub func: CheckFn<T>,
}

/// The per-kind catalog. One map per resource kind keeps check functions
/// fully typed without a general-purpose generic container.
#[derive(Default)]
pub struct CheckRegistry {
    ignored: BTreeSet<String>,
    all: Vec<Check>,
    metas: IndexMap<String, RegisteredCheck<ResourceMeta>>,
    pods: IndexMap<String, RegisteredCheck<WorkloadObject>>,
    services: IndexMap<String, RegisteredCheck<ServiceObject>>,
    stateful_sets: IndexMap<String, RegisteredCheck<StatefulSetObject>>,
    deployments: IndexMap<String, RegisteredCheck<DeploymentObject>>,
    network_policies: IndexMap<String, RegisteredCheck<NetworkPolicyObject>>,
    ingresses: IndexMap<String, RegisteredCheck<IngressObject>>,
    cron_jobs: IndexMap<String, RegisteredCheck<CronJobObject>>,
    hpas: IndexMap<String, RegisteredCheck<HpaObject>>,
    pdbs: IndexMap<String, RegisteredCheck<PdbObject>>,
}

fn register_into<T>(
    all: &mut Vec<Check>,
    ignored: &BTreeSet<String>,
    map: &mut IndexMap<String, RegisteredCheck<T>>,
    target_kind: &str,
    name: &str,
    comment: &str,
    optional: bool,
    func: CheckFn<T>,
) -> Result<(), ScoreError> {
    let check = Check::new(name, target_kind, comment, optional);

    // A silently shadowed check is a latent correctness bug.
    if all
        .iter()
        .any(|c| c.id == check.id && c.target_kind == check.target_kind)
    {
        return Err(ScoreError::DuplicateCheckId {
            id: check.id,
            kind: check.target_kind,
        });
    }

    all.push(check.clone());
    if !ignored.contains(&check.id) {
        map.insert(check.id.clone(), RegisteredCheck { check, func });
    }
    Ok(())
}

macro_rules! registry_kind {
    ($register:ident, $register_optional:ident, $accessor:ident, $field:ident, $target:ty, $kind:literal) => {
        pub fn $register(
            &mut self,
            name: &str,
            comment: &str,
            func: CheckFn<$target>,
        ) -> Result<(), ScoreError> {
            register_into(
                &mut self.all,
                &self.ignored,
                &mut self.$field,
                $kind,
                name,
                comment,
                false,
                func,
            )
        }

        pub fn $register_optional(
            &mut self,
            name: &str,
            comment: &str,
            func: CheckFn<$target>,
        ) -> Result<(), ScoreError> {
            register_into(
                &mut self.all,
                &self.ignored,
                &mut self.$field,
                $kind,
                name,
                comment,
                true,
                func,
            )
        }

        pub fn $accessor(&self) -> &IndexMap<String, RegisteredCheck<$target>> {
            &self.$field
        }
    };
}

impl CheckRegistry {
    /// A registry that never executes the given check ids. Ignored checks
    /// still show up in [`CheckRegistry::all`] for listing commands.
    pub fn new(ignored: BTreeSet<String>) -> Self {
        Self {
            ignored,
            ..Default::default()
        }
    }

    /// Every registered check, in registration order, including ignored and
    /// optional ones.
    pub fn all(&self) -> &[Check] {
        &self.all
    }

    registry_kind!(
        register_meta_check,
        register_optional_meta_check,
        metas,
        metas,
        ResourceMeta,
        "all"
    );
    registry_kind!(
        register_pod_check,
        register_optional_pod_check,
        pods,
        pods,
        WorkloadObject,
        "Pod"
    );
    registry_kind!(
        register_service_check,
        register_optional_service_check,
        services,
        services,
        ServiceObject,
        "Service"
    );
    registry_kind!(
        register_stateful_set_check,
        register_optional_stateful_set_check,
        stateful_sets,
        stateful_sets,
        StatefulSetObject,
        "StatefulSet"
    );
    registry_kind!(
        register_deployment_check,
        register_optional_deployment_check,
        deployments,
        deployments,
        DeploymentObject,
        "Deployment"
    );
    registry_kind!(
        register_network_policy_check,
        register_optional_network_policy_check,
        network_policies,
        network_policies,
        NetworkPolicyObject,
        "NetworkPolicy"
    );
    registry_kind!(
        register_ingress_check,
        register_optional_ingress_check,
        ingresses,
        ingresses,
        IngressObject,
        "Ingress"
    );
    registry_kind!(
        register_cron_job_check,
        register_optional_cron_job_check,
        cron_jobs,
        cron_jobs,
        CronJobObject,
        "CronJob"
    );
    registry_kind!(
        register_hpa_check,
        register_optional_hpa_check,
        hpas,
        hpas,
        HpaObject,
        "HorizontalPodAutoscaler"
    );
    registry_kind!(
        register_pdb_check,
        register_optional_pdb_check,
        pdbs,
        pdbs,
        PdbObject,
        "PodDisruptionBudget"
    );
}
