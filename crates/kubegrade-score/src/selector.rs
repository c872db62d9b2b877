//! Kubernetes label-selector matching
//!
//! Implements the equality and set-based requirement semantics of
//! `metav1.LabelSelector`: an empty selector matches every label set, `In` /
//! `NotIn` require a value list, `Exists` / `DoesNotExist` forbid one.
//! Matching depends only on the selector and the label map; namespace
//! equality is a separate predicate ANDed in by every relationship query.

use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SelectorError {
    #[error("Operator {operator:?} for key {key:?} requires at least one value")]
    MissingValues { key: String, operator: String },

    #[error("Operator {operator:?} for key {key:?} does not take values")]
    UnexpectedValues { key: String, operator: String },

    #[error("Unknown selector operator {operator:?} for key {key:?}")]
    UnknownOperator { key: String, operator: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operator {
    In,
    NotIn,
    Exists,
    DoesNotExist,
}

#[derive(Debug, Clone)]
struct Requirement {
    key: String,
    operator: Operator,
    values: Vec<String>,
}

impl Requirement {
    fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        let value = labels.get(&self.key);
        match self.operator {
            Operator::In => value.is_some_and(|v| self.values.iter().any(|w| w == v)),
            // Absent keys satisfy NotIn, like upstream Kubernetes.
            Operator::NotIn => !value.is_some_and(|v| self.values.iter().any(|w| w == v)),
            Operator::Exists => value.is_some(),
            Operator::DoesNotExist => value.is_none(),
        }
    }
}

/// A validated label selector. An empty selector matches everything.
#[derive(Debug, Clone, Default)]
pub struct Selector {
    requirements: Vec<Requirement>,
}

impl Selector {
    /// Parse a full `LabelSelector` (matchLabels + matchExpressions).
    pub fn parse(selector: &LabelSelector) -> Result<Self, SelectorError> {
        let mut requirements = Vec::new();

        if let Some(labels) = selector.match_labels.as_ref() {
            for (key, value) in labels {
                requirements.push(Requirement {
                    key: key.clone(),
                    operator: Operator::In,
                    values: vec![value.clone()],
                });
            }
        }

        for expr in selector.match_expressions.iter().flatten() {
            let has_values = expr.values.as_ref().is_some_and(|v| !v.is_empty());
            let operator = match expr.operator.as_str() {
                "In" | "NotIn" => {
                    if !has_values {
                        return Err(SelectorError::MissingValues {
                            key: expr.key.clone(),
                            operator: expr.operator.clone(),
                        });
                    }
                    if expr.operator == "In" {
                        Operator::In
                    } else {
                        Operator::NotIn
                    }
                }
                "Exists" | "DoesNotExist" => {
                    if has_values {
                        return Err(SelectorError::UnexpectedValues {
                            key: expr.key.clone(),
                            operator: expr.operator.clone(),
                        });
                    }
                    if expr.operator == "Exists" {
                        Operator::Exists
                    } else {
                        Operator::DoesNotExist
                    }
                }
                other => {
                    return Err(SelectorError::UnknownOperator {
                        key: expr.key.clone(),
                        operator: other.to_string(),
                    });
                }
            };
            requirements.push(Requirement {
                key: expr.key.clone(),
                operator,
                values: expr.values.clone().unwrap_or_default(),
            });
        }

        Ok(Self { requirements })
    }

    /// Equality-only selector from a plain label map, as used by Service
    /// `spec.selector`. Never fails.
    pub fn from_labels(labels: &BTreeMap<String, String>) -> Self {
        let requirements = labels
            .iter()
            .map(|(key, value)| Requirement {
                key: key.clone(),
                operator: Operator::In,
                values: vec![value.clone()],
            })
            .collect();
        Self { requirements }
    }

    pub fn is_empty(&self) -> bool {
        self.requirements.is_empty()
    }

    pub fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        self.requirements.iter().all(|r| r.matches(labels))
    }
}

/// Equality-match a plain selector map against a label map.
pub fn selector_map_matches(
    selector: &BTreeMap<String, String>,
    labels: &BTreeMap<String, String>,
) -> bool {
    Selector::from_labels(selector).matches(labels)
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelectorRequirement;

    fn labels(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn expression(key: &str, operator: &str, values: &[&str]) -> LabelSelectorRequirement {
        LabelSelectorRequirement {
            key: key.to_string(),
            operator: operator.to_string(),
            values: if values.is_empty() {
                None
            } else {
                Some(values.iter().map(|v| v.to_string()).collect())
            },
        }
    }

    #[test]
    fn test_empty_selector_matches_everything() {
        let selector = Selector::parse(&LabelSelector::default()).unwrap();
        assert!(selector.matches(&BTreeMap::new()));
        assert!(selector.matches(&labels(&[("app", "web")])));
    }

    #[test]
    fn test_match_labels_requires_all_pairs() {
        let selector = Selector::parse(&LabelSelector {
            match_labels: Some(labels(&[("app", "web"), ("tier", "front")])),
            match_expressions: None,
        })
        .unwrap();

        assert!(selector.matches(&labels(&[("app", "web"), ("tier", "front"), ("x", "y")])));
        assert!(!selector.matches(&labels(&[("app", "web")])));
        assert!(!selector.matches(&labels(&[("app", "web"), ("tier", "back")])));
    }

    #[test]
    fn test_set_based_requirements() {
        let selector = Selector::parse(&LabelSelector {
            match_labels: None,
            match_expressions: Some(vec![
                expression("env", "In", &["prod", "staging"]),
                expression("canary", "DoesNotExist", &[]),
            ]),
        })
        .unwrap();

        assert!(selector.matches(&labels(&[("env", "prod")])));
        assert!(!selector.matches(&labels(&[("env", "dev")])));
        assert!(!selector.matches(&labels(&[("env", "prod"), ("canary", "true")])));
    }

    #[test]
    fn test_not_in_matches_absent_key() {
        let selector = Selector::parse(&LabelSelector {
            match_labels: None,
            match_expressions: Some(vec![expression("env", "NotIn", &["prod"])]),
        })
        .unwrap();

        assert!(selector.matches(&BTreeMap::new()));
        assert!(selector.matches(&labels(&[("env", "dev")])));
        assert!(!selector.matches(&labels(&[("env", "prod")])));
    }

    #[test]
    fn test_malformed_selectors_fail_to_parse() {
        let missing_values = LabelSelector {
            match_labels: None,
            match_expressions: Some(vec![expression("env", "In", &[])]),
        };
        assert!(Selector::parse(&missing_values).is_err());

        let unexpected_values = LabelSelector {
            match_labels: None,
            match_expressions: Some(vec![expression("env", "Exists", &["prod"])]),
        };
        assert!(Selector::parse(&unexpected_values).is_err());

        let unknown = LabelSelector {
            match_labels: None,
            match_expressions: Some(vec![expression("env", "Near", &["prod"])]),
        };
        assert!(Selector::parse(&unknown).is_err());
    }

    #[test]
    fn test_selector_map_matches_subset() {
        assert!(selector_map_matches(
            &labels(&[("app", "web")]),
            &labels(&[("app", "web"), ("extra", "1")])
        ));
        assert!(!selector_map_matches(
            &labels(&[("app", "web")]),
            &labels(&[("app", "api")])
        ));
        // An empty selector map selects everything.
        assert!(selector_map_matches(&BTreeMap::new(), &labels(&[("a", "b")])));
    }
}
