//! Kubegrade Core - Core types for the Kubernetes manifest grader
//!
//! This crate provides the foundational types used throughout kubegrade:
//! - `ObjectSet`: typed views over every resource decoded from the input
//! - `Check`: metadata describing a single validation check
//! - `Scorecard`: the per-object, per-check output of one analysis run
//! - `RunConfiguration`: run-wide tuning consumed by the scoring engine

pub mod check;
pub mod config;
pub mod error;
pub mod object;
pub mod scorecard;

pub use check::{Check, check_id};
pub use config::{KubernetesVersion, RunConfiguration};
pub use error::CoreError;
pub use object::{
    CronJobObject, DeploymentObject, FileLocation, HpaObject, HpaTarget, IngressObject,
    NetworkPolicyObject, ObjectSet, PdbObject, PodObject, ResourceMeta, ServiceObject,
    StatefulSetObject, TypeMeta, WorkloadObject, effective_namespace,
};
pub use scorecard::{
    CheckResult, Grade, ScoreComment, Scorecard, ScoredObject, TestScore, object_key,
};
