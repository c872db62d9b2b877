//! End-to-end scoring scenarios driven through the parser

use kubegrade_core::{Grade, RunConfiguration, Scorecard, TestScore};
use kubegrade_parse::{NamedSource, Parser};
use kubegrade_score::{register_all_checks, score};

fn score_yaml(yaml: &str, config: &RunConfiguration) -> Scorecard {
    let objects = Parser::default()
        .parse(&[NamedSource::new("test.yaml", yaml)])
        .expect("parse");
    let registry = register_all_checks(&objects, config).expect("register");
    score(&objects, &registry, config).expect("score")
}

fn result_of<'a>(card: &'a Scorecard, key: &str, check_name: &str) -> &'a TestScore {
    let object = card
        .get(key)
        .unwrap_or_else(|| panic!("no scored object under {key}"));
    &object
        .results
        .iter()
        .find(|r| r.check.name == check_name)
        .unwrap_or_else(|| panic!("{check_name} did not run against {key}"))
        .score
}

const DEPLOYMENT_ONE_REPLICA: &str = r#"
apiVersion: apps/v1
kind: Deployment
metadata:
  name: web
spec:
  replicas: 1
  selector:
    matchLabels:
      app: web
  template:
    metadata:
      labels:
        app: web
    spec:
      containers:
        - name: app
          image: registry/app:v1
"#;

const MATCHING_SERVICE: &str = r#"
apiVersion: v1
kind: Service
metadata:
  name: web
spec:
  selector:
    app: web
  ports:
    - port: 80
"#;

#[test]
fn unreferenced_deployment_replicas_check_is_skipped() {
    let card = score_yaml(DEPLOYMENT_ONE_REPLICA, &RunConfiguration::default());
    let score = result_of(&card, "Deployment/apps/v1//web", "Deployment Replicas");
    assert!(score.skipped);
}

#[test]
fn service_targeted_deployment_with_one_replica_is_a_warning() {
    let yaml = format!("{DEPLOYMENT_ONE_REPLICA}---\n{MATCHING_SERVICE}");
    let card = score_yaml(&yaml, &RunConfiguration::default());
    let score = result_of(&card, "Deployment/apps/v1//web", "Deployment Replicas");
    assert!(!score.skipped);
    assert_eq!(score.grade, Grade::Warning);
}

#[test]
fn network_policy_with_inferred_egress_fully_covers_pod() {
    let yaml = r#"
apiVersion: v1
kind: Pod
metadata:
  name: worker
  labels:
    app: worker
spec:
  containers:
    - name: app
      image: registry/app:v1
---
apiVersion: networking.k8s.io/v1
kind: NetworkPolicy
metadata:
  name: worker-policy
spec:
  podSelector:
    matchLabels:
      app: worker
  egress:
    - {}
"#;
    let card = score_yaml(yaml, &RunConfiguration::default());
    let score = result_of(&card, "Pod/v1//worker", "Pod NetworkPolicy");
    assert_eq!(score.grade, Grade::AllOk);
}

#[test]
fn stateful_set_without_pod_disruption_budget_is_critical() {
    let yaml = r#"
apiVersion: apps/v1
kind: StatefulSet
metadata:
  name: db
spec:
  replicas: 10
  serviceName: db
  selector:
    matchLabels:
      app: db
  template:
    metadata:
      labels:
        app: db
    spec:
      containers:
        - name: db
          image: registry/db:v3
"#;
    let card = score_yaml(yaml, &RunConfiguration::default());
    let score = result_of(
        &card,
        "StatefulSet/apps/v1//db",
        "StatefulSet has PodDisruptionBudget",
    );
    assert_eq!(score.grade, Grade::Critical);
    assert_eq!(
        score.comments[0].summary,
        "No matching PodDisruptionBudget was found"
    );
}

#[test]
fn ingress_with_wrong_backend_port_is_critical() {
    let yaml = r#"
apiVersion: networking.k8s.io/v1
kind: Ingress
metadata:
  name: edge
spec:
  rules:
    - http:
        paths:
          - path: /
            pathType: Prefix
            backend:
              service:
                name: svc
                port:
                  number: 8080
---
apiVersion: v1
kind: Service
metadata:
  name: svc
spec:
  ports:
    - port: 80
"#;
    let card = score_yaml(yaml, &RunConfiguration::default());
    let score = result_of(
        &card,
        "Ingress/networking.k8s.io/v1//edge",
        "Ingress targets Service",
    );
    assert_eq!(score.grade, Grade::Critical);
    assert!(score.comments[0]
        .description
        .contains("No service with name svc and port number 8080 was found"));
}

#[test]
fn optional_checks_do_not_run_unless_enabled() {
    let card = score_yaml(DEPLOYMENT_ONE_REPLICA, &RunConfiguration::default());
    let object = card.get("Deployment/apps/v1//web").unwrap();
    assert!(
        !object
            .results
            .iter()
            .any(|r| r.check.name == "Container Ports Check"),
        "optional check ran without being enabled"
    );

    let mut config = RunConfiguration::default();
    config
        .enabled_optional_checks
        .insert("container-ports-check".to_string());
    let card = score_yaml(DEPLOYMENT_ONE_REPLICA, &config);
    let score = result_of(&card, "Deployment/apps/v1//web", "Container Ports Check");
    assert!(!score.skipped);
}

#[test]
fn pod_template_annotation_disables_a_check() {
    let yaml = r#"
apiVersion: apps/v1
kind: Deployment
metadata:
  name: web
spec:
  selector:
    matchLabels:
      app: web
  template:
    metadata:
      labels:
        app: web
      annotations:
        kubegrade/ignore: container-resources
    spec:
      containers:
        - name: app
          image: registry/app:v1
"#;
    let card = score_yaml(yaml, &RunConfiguration::default());
    let score = result_of(&card, "Deployment/apps/v1//web", "Container Resources");
    assert!(score.skipped);
    assert_eq!(
        score.comments[0].summary,
        "Skipped because container-resources is ignored"
    );
}

#[test]
fn object_annotation_enables_an_optional_check() {
    let yaml = r#"
apiVersion: v1
kind: Pod
metadata:
  name: worker
  annotations:
    kubegrade/enable: container-ports-check
spec:
  containers:
    - name: app
      image: registry/app:v1
"#;
    let card = score_yaml(yaml, &RunConfiguration::default());
    let score = result_of(&card, "Pod/v1//worker", "Container Ports Check");
    assert!(!score.skipped);
}

#[test]
fn ignored_checks_never_execute_but_are_listed() {
    let mut config = RunConfiguration::default();
    config
        .ignored_checks
        .insert("container-resources".to_string());

    let objects = Parser::default()
        .parse(&[NamedSource::new("test.yaml", DEPLOYMENT_ONE_REPLICA)])
        .unwrap();
    let registry = register_all_checks(&objects, &config).unwrap();
    assert!(registry
        .all()
        .iter()
        .any(|c| c.id == "container-resources"));

    let card = score(&objects, &registry, &config).unwrap();
    let object = card.get("Deployment/apps/v1//web").unwrap();
    assert!(
        !object
            .results
            .iter()
            .any(|r| r.check.id == "container-resources")
    );
}

#[test]
fn skip_jobs_excludes_cron_jobs_entirely() {
    let yaml = r#"
apiVersion: batch/v1
kind: CronJob
metadata:
  name: nightly
spec:
  schedule: "0 3 * * *"
  jobTemplate:
    spec:
      template:
        spec:
          containers:
            - name: task
              image: registry/task:v1
"#;
    let mut config = RunConfiguration::default();
    config.skip_jobs = true;
    let card = score_yaml(yaml, &config);

    // The cronjob-specific checks are gone; the metadata checks remain.
    let object = card.get("CronJob/batch/v1//nightly").unwrap();
    assert!(
        !object
            .results
            .iter()
            .any(|r| r.check.id == "cronjob-has-deadline")
    );
    assert!(object.results.iter().any(|r| r.check.target_kind == "all"));
}

#[test]
fn catalog_ids_are_pairwise_unique_per_kind() {
    let registry =
        register_all_checks(&Default::default(), &RunConfiguration::default()).unwrap();
    let mut seen = std::collections::BTreeSet::new();
    for check in registry.all() {
        assert!(
            seen.insert((check.target_kind.clone(), check.id.clone())),
            "duplicate check id {} for kind {}",
            check.id,
            check.target_kind
        );
    }
    assert!(registry.all().len() >= 30);
}

#[test]
fn aggregate_exit_grade_reflects_worst_non_skipped_result() {
    let yaml = format!("{DEPLOYMENT_ONE_REPLICA}---\n{MATCHING_SERVICE}");
    let card = score_yaml(&yaml, &RunConfiguration::default());
    // Missing limits on the container guarantee a critical somewhere.
    assert!(card.any_at_or_below(Grade::Critical));
}
