//! Metadata checks that apply to every object

use crate::error::ScoreError;
use crate::registry::{CheckFn, CheckRegistry};
use kubegrade_core::{Grade, ResourceMeta, TestScore};
use once_cell::sync::Lazy;
use regex::Regex;

pub fn register(checks: &mut CheckRegistry) -> Result<(), ScoreError> {
    checks.register_meta_check(
        "Label values",
        "Validates label values",
        label_values(),
    )?;
    Ok(())
}

/// Kubernetes label value syntax: at most 63 characters, alphanumeric at
/// both ends, with dashes, underscores and dots in between. Empty is valid.
static LABEL_VALUE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(([A-Za-z0-9][-A-Za-z0-9_.]*)?[A-Za-z0-9])?$").unwrap());

const MAX_LABEL_VALUE_LENGTH: usize = 63;

fn valid_label_value(value: &str) -> bool {
    value.len() <= MAX_LABEL_VALUE_LENGTH && LABEL_VALUE.is_match(value)
}

fn label_values() -> CheckFn<ResourceMeta> {
    Box::new(move |meta| {
        let mut score = TestScore::ok();
        for (key, value) in meta.metadata.labels.iter().flatten() {
            if !valid_label_value(value) {
                score.grade = Grade::Critical;
                score.add_comment(
                    key,
                    "Label value is not valid",
                    format!("The label value {value:?} is not a valid Kubernetes label value"),
                );
            }
        }
        Ok(score)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
    use kubegrade_core::{FileLocation, TypeMeta};
    use std::collections::BTreeMap;

    fn meta(labels: &[(&str, &str)]) -> ResourceMeta {
        ResourceMeta {
            type_meta: TypeMeta::new("v1", "Service"),
            metadata: ObjectMeta {
                name: Some("svc".to_string()),
                labels: Some(
                    labels
                        .iter()
                        .map(|(k, v)| (k.to_string(), v.to_string()))
                        .collect::<BTreeMap<_, _>>(),
                ),
                ..Default::default()
            },
            location: FileLocation::default(),
        }
    }

    #[test]
    fn test_valid_label_values() {
        assert!(valid_label_value("web"));
        assert!(valid_label_value("web-1.2_3"));
        assert!(valid_label_value(""));
    }

    #[test]
    fn test_invalid_label_values() {
        assert!(!valid_label_value("-leading-dash"));
        assert!(!valid_label_value("trailing-dash-"));
        assert!(!valid_label_value("has spaces"));
        assert!(!valid_label_value(&"x".repeat(64)));
    }

    #[test]
    fn test_label_values_check() {
        let check = label_values();
        assert_eq!(
            check(&meta(&[("app", "web")])).unwrap().grade,
            Grade::AllOk
        );

        let score = check(&meta(&[("app", "bad value")])).unwrap();
        assert_eq!(score.grade, Grade::Critical);
        assert_eq!(score.comments[0].path, "app");
    }
}
