//! Run-wide configuration consumed by the scoring engine

use crate::error::CoreError;
use std::collections::BTreeSet;

/// Target Kubernetes version, parsed from the `vN.NN` form.
///
/// Only major/minor matter: the version gates which deprecated apiVersions
/// already have a stable replacement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct KubernetesVersion {
    pub major: u32,
    pub minor: u32,
}

impl KubernetesVersion {
    pub fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }

    pub fn parse(version: &str) -> Result<Self, CoreError> {
        let invalid = || CoreError::InvalidKubernetesVersion {
            version: version.to_string(),
        };

        let trimmed = version.trim().strip_prefix('v').unwrap_or(version.trim());
        let (major, minor) = trimmed.split_once('.').ok_or_else(invalid)?;
        Ok(Self {
            major: major.parse().map_err(|_| invalid())?,
            minor: minor.parse().map_err(|_| invalid())?,
        })
    }
}

impl std::fmt::Display for KubernetesVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "v{}.{}", self.major, self.minor)
    }
}

/// Run-wide configuration, conceptually the parsed CLI flags.
#[derive(Debug, Clone)]
pub struct RunConfiguration {
    /// Namespace assumed for resources that do not set one.
    pub namespace: String,
    /// Exclude init containers from all container-level checks.
    pub skip_init_containers: bool,
    /// Exclude Jobs and CronJobs from scoring entirely.
    pub skip_jobs: bool,
    pub ignore_container_cpu_limit: bool,
    pub ignore_container_memory_limit: bool,
    /// Check ids removed from execution for the whole run.
    pub ignored_checks: BTreeSet<String>,
    /// Optional check ids turned on for the whole run.
    pub enabled_optional_checks: BTreeSet<String>,
    /// Honor the per-object "ignore" annotation.
    pub use_ignore_annotations: bool,
    /// Honor the per-object "enable" annotation.
    pub use_enable_annotations: bool,
    pub kubernetes_version: KubernetesVersion,
}

impl Default for RunConfiguration {
    fn default() -> Self {
        Self {
            namespace: String::new(),
            skip_init_containers: false,
            skip_jobs: false,
            ignore_container_cpu_limit: false,
            ignore_container_memory_limit: false,
            ignored_checks: BTreeSet::new(),
            enabled_optional_checks: BTreeSet::new(),
            use_ignore_annotations: true,
            use_enable_annotations: true,
            kubernetes_version: KubernetesVersion::new(1, 18),
        }
    }
}
