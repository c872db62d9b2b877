//! Kubegrade Score - the check evaluation engine
//!
//! This crate is the core of kubegrade:
//! - `selector`: Kubernetes label-selector matching
//! - `index`: the relationship resolver, built once per run
//! - `registry`: the per-kind check catalog
//! - `enabled`: the annotation-driven enablement policy
//! - `engine`: registration of the built-in checks and the scoring pass
//! - `checks`: the built-in check catalog itself

pub mod checks;
pub mod enabled;
pub mod engine;
pub mod error;
pub mod index;
pub mod registry;
pub mod selector;

pub use enabled::{EnablementPolicy, Verdict};
pub use engine::{register_all_checks, score};
pub use error::{CheckError, ScoreError};
pub use index::{
    HpaIndex, NetworkPolicyIndex, PdbIndex, PdbMatch, PodIndex, PolicyCoverage,
    RelationshipIndex, ServiceIndex, ServicePortRef, TargetableIndex,
};
pub use registry::{CheckFn, CheckRegistry, RegisteredCheck};
pub use selector::{Selector, SelectorError};
