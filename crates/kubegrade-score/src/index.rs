//! Relationship resolver
//!
//! Namespace-indexed lookup structures built once per run, before any check
//! executes. Each sub-index answers one family of cross-resource questions
//! in O(candidates-in-namespace); checks receive the sub-indices they need
//! as explicit constructor arguments.
//!
//! A candidate whose selector fails to parse is indexed as never-matching
//! (fail closed) so one malformed object cannot block evaluation of the
//! rest of the input.

use crate::selector::Selector;
use kubegrade_core::object::effective_namespace;
use kubegrade_core::{HpaTarget, ObjectSet, TypeMeta};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

type LabelMap = BTreeMap<String, String>;

/// Label sets of every bare Pod and workload pod template, per namespace.
#[derive(Debug, Default)]
pub struct PodIndex {
    labels_by_namespace: HashMap<String, Vec<LabelMap>>,
}

impl PodIndex {
    pub fn build(objects: &ObjectSet, default_namespace: &str) -> Self {
        let mut labels_by_namespace: HashMap<String, Vec<LabelMap>> = HashMap::new();

        for pod in &objects.pods {
            let namespace = effective_namespace(pod.namespace(), default_namespace);
            labels_by_namespace
                .entry(namespace.to_string())
                .or_default()
                .push(pod.pod.metadata.labels.clone().unwrap_or_default());
        }

        for workload in &objects.workloads {
            let namespace = effective_namespace(workload.namespace(), default_namespace);
            labels_by_namespace
                .entry(namespace.to_string())
                .or_default()
                .push(workload.template_labels().cloned().unwrap_or_default());
        }

        Self { labels_by_namespace }
    }

    /// Does the selector match any pod (or pod template) in the namespace?
    pub fn any_matches(&self, namespace: &str, selector: &Selector) -> bool {
        self.labels_by_namespace
            .get(namespace)
            .is_some_and(|candidates| candidates.iter().any(|labels| selector.matches(labels)))
    }
}

/// One Service, reduced to what relationship queries need.
#[derive(Debug, Clone)]
pub struct ServiceEntry {
    pub name: String,
    pub selector: LabelMap,
    pub cluster_ip: Option<String>,
    pub type_: Option<String>,
    pub ports: Vec<PortEntry>,
}

#[derive(Debug, Clone)]
pub struct PortEntry {
    pub number: i32,
    pub name: Option<String>,
}

/// A named or numbered Service port, as referenced by an Ingress backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServicePortRef {
    Number(i32),
    Name(String),
}

impl std::fmt::Display for ServicePortRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServicePortRef::Number(n) => write!(f, "port number {n}"),
            ServicePortRef::Name(n) => write!(f, "port named {n}"),
        }
    }
}

#[derive(Debug, Default)]
pub struct ServiceIndex {
    by_namespace: HashMap<String, Vec<ServiceEntry>>,
}

impl ServiceIndex {
    pub fn build(objects: &ObjectSet, default_namespace: &str) -> Self {
        let mut by_namespace: HashMap<String, Vec<ServiceEntry>> = HashMap::new();

        for service in &objects.services {
            let namespace = effective_namespace(service.namespace(), default_namespace);
            let spec = service.service.spec.as_ref();
            let entry = ServiceEntry {
                name: service.name().to_string(),
                selector: spec
                    .and_then(|s| s.selector.clone())
                    .unwrap_or_default(),
                cluster_ip: spec.and_then(|s| s.cluster_ip.clone()),
                type_: spec.and_then(|s| s.type_.clone()),
                ports: spec
                    .and_then(|s| s.ports.as_ref())
                    .map(|ports| {
                        ports
                            .iter()
                            .map(|p| PortEntry {
                                number: p.port,
                                name: p.name.clone(),
                            })
                            .collect()
                    })
                    .unwrap_or_default(),
            };
            by_namespace
                .entry(namespace.to_string())
                .or_default()
                .push(entry);
        }

        Self { by_namespace }
    }

    /// Does any Service in the namespace select the given labels?
    ///
    /// A Service without a selector selects everything, mirroring the
    /// empty-selector semantics.
    pub fn any_selects(&self, namespace: &str, labels: &LabelMap) -> bool {
        self.by_namespace.get(namespace).is_some_and(|services| {
            services
                .iter()
                .any(|s| Selector::from_labels(&s.selector).matches(labels))
        })
    }

    /// Is there a Service with this exact name exposing this port?
    pub fn has_backend(&self, namespace: &str, name: &str, port: &ServicePortRef) -> bool {
        self.by_namespace.get(namespace).is_some_and(|services| {
            services.iter().any(|s| {
                s.name == name
                    && s.ports.iter().any(|p| match port {
                        ServicePortRef::Number(n) => *n > 0 && p.number == *n,
                        ServicePortRef::Name(n) => p.name.as_deref() == Some(n.as_str()),
                    })
            })
        })
    }

    /// Is there a headless Service with this exact name whose selector
    /// matches the labels? Used for StatefulSet `serviceName` validation.
    pub fn headless_selects(&self, namespace: &str, name: &str, labels: &LabelMap) -> bool {
        self.by_namespace.get(namespace).is_some_and(|services| {
            services.iter().any(|s| {
                s.name == name
                    && s.cluster_ip.as_deref() == Some("None")
                    && Selector::from_labels(&s.selector).matches(labels)
            })
        })
    }
}

#[derive(Debug)]
struct PolicyEntry {
    /// `None` when the policy's pod selector failed to parse.
    selector: Option<Selector>,
    affects_ingress: bool,
    affects_egress: bool,
}

/// Which directions of traffic are covered for a pod.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PolicyCoverage {
    pub ingress: bool,
    pub egress: bool,
}

#[derive(Debug, Default)]
pub struct NetworkPolicyIndex {
    by_namespace: HashMap<String, Vec<PolicyEntry>>,
}

impl NetworkPolicyIndex {
    pub fn build(objects: &ObjectSet, default_namespace: &str) -> Self {
        let mut by_namespace: HashMap<String, Vec<PolicyEntry>> = HashMap::new();

        for netpol in &objects.network_policies {
            let namespace = effective_namespace(netpol.namespace(), default_namespace);
            let Some(spec) = netpol.network_policy.spec.as_ref() else {
                continue;
            };

            let selector = match Selector::parse(&spec.pod_selector) {
                Ok(selector) => Some(selector),
                Err(err) => {
                    debug!(
                        policy = netpol.name(),
                        %err,
                        "network policy selector does not parse, treating as no match"
                    );
                    None
                }
            };

            // policyTypes defaulting: every policy affects Ingress, and
            // affects Egress only when an egress rule block is present.
            let has_egress_rules = spec.egress.as_ref().is_some_and(|e| !e.is_empty());
            let (affects_ingress, affects_egress) = match spec.policy_types.as_ref() {
                None => (true, has_egress_rules),
                Some(types) if types.is_empty() => (true, has_egress_rules),
                Some(types) => (
                    types.iter().any(|t| t == "Ingress"),
                    types.iter().any(|t| t == "Egress"),
                ),
            };

            by_namespace
                .entry(namespace.to_string())
                .or_default()
                .push(PolicyEntry {
                    selector,
                    affects_ingress,
                    affects_egress,
                });
        }

        Self { by_namespace }
    }

    /// Accumulated ingress/egress coverage for a pod's labels.
    pub fn coverage(&self, namespace: &str, labels: &LabelMap) -> PolicyCoverage {
        let mut coverage = PolicyCoverage::default();
        if let Some(policies) = self.by_namespace.get(namespace) {
            for policy in policies {
                let matches = policy
                    .selector
                    .as_ref()
                    .is_some_and(|s| s.matches(labels));
                if matches {
                    coverage.ingress |= policy.affects_ingress;
                    coverage.egress |= policy.affects_egress;
                }
            }
        }
        coverage
    }
}

/// Outcome of a PodDisruptionBudget coverage query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PdbMatch {
    Covered,
    /// A budget selector matched, but the budget lives elsewhere. Carries
    /// the offending namespaces for the diagnostic comment.
    WrongNamespace(Vec<String>),
    NoMatch,
}

#[derive(Debug, Default)]
pub struct PdbIndex {
    // Flat: the wrong-namespace diagnostic needs candidates from the whole
    // input set, and budgets are few.
    budgets: Vec<(String, Option<Selector>)>,
}

impl PdbIndex {
    pub fn build(objects: &ObjectSet, default_namespace: &str) -> Self {
        let budgets = objects
            .pdbs
            .iter()
            .map(|pdb| {
                let namespace =
                    effective_namespace(pdb.namespace(), default_namespace).to_string();
                let selector = match pdb.selector() {
                    Some(selector) => match Selector::parse(selector) {
                        Ok(parsed) => Some(parsed),
                        Err(err) => {
                            debug!(
                                budget = pdb.name(),
                                %err,
                                "budget selector does not parse, treating as no match"
                            );
                            None
                        }
                    },
                    // No selector at all never covers anything.
                    None => None,
                };
                (namespace, selector)
            })
            .collect();

        Self { budgets }
    }

    pub fn covering(&self, namespace: &str, labels: &LabelMap) -> PdbMatch {
        let mut wrong_namespace = Vec::new();
        for (budget_namespace, selector) in &self.budgets {
            if !selector.as_ref().is_some_and(|s| s.matches(labels)) {
                continue;
            }
            if budget_namespace != namespace {
                wrong_namespace.push(budget_namespace.clone());
                continue;
            }
            return PdbMatch::Covered;
        }

        if wrong_namespace.is_empty() {
            PdbMatch::NoMatch
        } else {
            PdbMatch::WrongNamespace(wrong_namespace)
        }
    }
}

#[derive(Debug, Default)]
pub struct HpaIndex {
    targets_by_namespace: HashMap<String, Vec<HpaTarget>>,
}

impl HpaIndex {
    pub fn build(objects: &ObjectSet, default_namespace: &str) -> Self {
        let mut targets_by_namespace: HashMap<String, Vec<HpaTarget>> = HashMap::new();
        for hpa in &objects.hpas {
            let namespace = effective_namespace(hpa.namespace(), default_namespace);
            targets_by_namespace
                .entry(namespace.to_string())
                .or_default()
                .push(hpa.target.clone());
        }
        Self { targets_by_namespace }
    }

    /// Does any autoscaler in the namespace target this object? Kind is
    /// compared case-insensitively, apiVersion and name exactly.
    pub fn targets_object(&self, namespace: &str, type_meta: &TypeMeta, name: &str) -> bool {
        self.targets_by_namespace
            .get(namespace)
            .is_some_and(|targets| {
                targets.iter().any(|t| {
                    t.api_version == type_meta.api_version
                        && t.kind.eq_ignore_ascii_case(&type_meta.kind)
                        && t.name == name
                })
            })
    }
}

/// Everything an autoscaler could point at: every parsed object's identity.
#[derive(Debug, Default)]
pub struct TargetableIndex {
    by_namespace: HashMap<String, Vec<(TypeMeta, String)>>,
}

impl TargetableIndex {
    pub fn build(objects: &ObjectSet, default_namespace: &str) -> Self {
        let mut by_namespace: HashMap<String, Vec<(TypeMeta, String)>> = HashMap::new();
        for meta in &objects.metas {
            let namespace = effective_namespace(meta.namespace(), default_namespace);
            by_namespace
                .entry(namespace.to_string())
                .or_default()
                .push((meta.type_meta.clone(), meta.name().to_string()));
        }
        Self { by_namespace }
    }

    pub fn contains(&self, namespace: &str, target: &HpaTarget) -> bool {
        self.by_namespace.get(namespace).is_some_and(|objects| {
            objects.iter().any(|(type_meta, name)| {
                type_meta.api_version == target.api_version
                    && type_meta.kind.eq_ignore_ascii_case(&target.kind)
                    && name == &target.name
            })
        })
    }
}

/// All sub-indices, built in one pass ahead of scoring.
#[derive(Debug, Default)]
pub struct RelationshipIndex {
    pub pods: PodIndex,
    pub services: ServiceIndex,
    pub network_policies: NetworkPolicyIndex,
    pub pdbs: PdbIndex,
    pub hpas: HpaIndex,
    pub targetable: TargetableIndex,
}

impl RelationshipIndex {
    pub fn build(objects: &ObjectSet, default_namespace: &str) -> Self {
        Self {
            pods: PodIndex::build(objects, default_namespace),
            services: ServiceIndex::build(objects, default_namespace),
            network_policies: NetworkPolicyIndex::build(objects, default_namespace),
            pdbs: PdbIndex::build(objects, default_namespace),
            hpas: HpaIndex::build(objects, default_namespace),
            targetable: TargetableIndex::build(objects, default_namespace),
        }
    }
}
