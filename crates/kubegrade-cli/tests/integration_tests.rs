//! Integration tests for CLI commands

use std::fs;
use std::process::Command;
use tempfile::TempDir;

/// Helper to run the kubegrade binary
fn kubegrade(args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_kubegrade"))
        .args(args)
        .output()
        .expect("Failed to execute kubegrade")
}

fn write_manifest(dir: &TempDir, name: &str, content: &str) -> String {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path.to_string_lossy().into_owned()
}

const RISKY_DEPLOYMENT: &str = r#"
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
          image: registry/app:latest
"#;

const CLEAN_CONFIGMAP: &str = r#"
apiVersion: v1
kind: ConfigMap
metadata:
  name: settings
  labels:
    app: web
data:
  key: value
"#;

mod score_command {
    use super::*;

    #[test]
    fn test_score_risky_manifest_exits_one() {
        let dir = TempDir::new().unwrap();
        let file = write_manifest(&dir, "deploy.yaml", RISKY_DEPLOYMENT);

        let output = kubegrade(&["score", "--output-format", "ci", &file]);
        assert_eq!(output.status.code(), Some(1));

        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(stdout.contains("[CRITICAL]"));
        assert!(stdout.contains("Image with latest tag"));
    }

    #[test]
    fn test_score_clean_manifest_exits_zero() {
        let dir = TempDir::new().unwrap();
        let file = write_manifest(&dir, "configmap.yaml", CLEAN_CONFIGMAP);

        let output = kubegrade(&["score", "--output-format", "ci", &file]);
        assert_eq!(output.status.code(), Some(0));
    }

    #[test]
    fn test_score_json_output_is_valid() {
        let dir = TempDir::new().unwrap();
        let file = write_manifest(&dir, "deploy.yaml", RISKY_DEPLOYMENT);

        let output = kubegrade(&["score", "--output-format", "json", &file]);
        let stdout = String::from_utf8_lossy(&output.stdout);
        let json: serde_json::Value =
            serde_json::from_str(&stdout).expect("Output should be valid JSON");
        assert!(json["objects"]["Deployment/apps/v1//web"].is_object());
    }

    #[test]
    fn test_score_sarif_output() {
        let dir = TempDir::new().unwrap();
        let file = write_manifest(&dir, "deploy.yaml", RISKY_DEPLOYMENT);

        let output = kubegrade(&["score", "--output-format", "sarif", &file]);
        let stdout = String::from_utf8_lossy(&output.stdout);
        let json: serde_json::Value =
            serde_json::from_str(&stdout).expect("Output should be valid SARIF JSON");
        assert_eq!(json["version"], "2.1.0");
        assert!(!json["runs"][0]["results"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_ignore_test_flag_disables_check() {
        let dir = TempDir::new().unwrap();
        let file = write_manifest(&dir, "deploy.yaml", RISKY_DEPLOYMENT);

        let output = kubegrade(&[
            "score",
            "--output-format",
            "ci",
            "--ignore-test",
            "container-image-tag",
            &file,
        ]);
        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(!stdout.contains("Image with latest tag"));
    }

    #[test]
    fn test_invalid_kubernetes_version_fails() {
        let dir = TempDir::new().unwrap();
        let file = write_manifest(&dir, "deploy.yaml", RISKY_DEPLOYMENT);

        let output = kubegrade(&["score", "--kubernetes-version", "banana", &file]);
        assert!(!output.status.success());
        let stderr = String::from_utf8_lossy(&output.stderr);
        assert!(stderr.contains("kubernetes-version"));
    }

    #[test]
    fn test_skip_expression_excludes_document() {
        let dir = TempDir::new().unwrap();
        let file = write_manifest(&dir, "deploy.yaml", RISKY_DEPLOYMENT);

        let output = kubegrade(&[
            "score",
            "--output-format",
            "ci",
            "--skip",
            "metadata.name=^web$",
            &file,
        ]);
        assert_eq!(output.status.code(), Some(0));
        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(stdout.is_empty());
    }

    #[test]
    fn test_human_output_names_the_file() {
        let dir = TempDir::new().unwrap();
        let file = write_manifest(&dir, "deploy.yaml", RISKY_DEPLOYMENT);

        let output = kubegrade(&["score", "--color", "never", &file]);
        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(stdout.contains("apps/v1/Deployment web"));
        assert!(stdout.contains("deploy.yaml"));
    }
}

mod list_command {
    use super::*;

    #[test]
    fn test_list_prints_catalog() {
        let output = kubegrade(&["list"]);
        assert!(output.status.success());

        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(stdout.contains("container-resources,Pod"));
        assert!(stdout.contains("pod-networkpolicy,Pod"));
        assert!(stdout.contains("statefulset-has-poddisruptionbudget,StatefulSet"));
        // Optional checks are listed, marked optional.
        assert!(stdout.contains("container-ports-check,Pod"));
        assert!(stdout.contains(",optional"));
    }
}

mod version_command {
    use super::*;

    #[test]
    fn test_version_prints_crate_version() {
        let output = kubegrade(&["version"]);
        assert!(output.status.success());
        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(stdout.starts_with("kubegrade "));
    }
}
