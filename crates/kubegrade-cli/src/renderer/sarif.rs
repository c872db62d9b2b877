//! SARIF 2.1.0 renderer for code-scanning integrations

use kubegrade_core::{Grade, Scorecard};
use serde_json::{Value, json};

pub fn render(card: &Scorecard) -> serde_json::Result<String> {
    let mut rules: Vec<Value> = Vec::new();
    let mut seen_rules = std::collections::BTreeSet::new();
    let mut results: Vec<Value> = Vec::new();

    for (_, object) in card.iter() {
        for result in &object.results {
            if result.score.skipped || result.score.grade > Grade::Warning {
                continue;
            }

            if seen_rules.insert(result.check.id.clone()) {
                rules.push(json!({
                    "id": result.check.id,
                    "name": result.check.name,
                    "shortDescription": { "text": result.check.name },
                    "fullDescription": { "text": result.check.comment },
                }));
            }

            let level = match result.score.grade {
                Grade::Critical => "error",
                _ => "warning",
            };
            let mut text = format!(
                "{} in {}/{} {}",
                result.check.name,
                object.type_meta.api_version,
                object.type_meta.kind,
                object.name
            );
            for comment in &result.score.comments {
                text.push_str("\n");
                text.push_str(&comment.summary);
            }

            results.push(json!({
                "ruleId": result.check.id,
                "level": level,
                "message": { "text": text },
                "locations": [{
                    "physicalLocation": {
                        "artifactLocation": { "uri": object.location.file },
                        "region": { "startLine": object.location.line.max(1) },
                    }
                }],
            }));
        }
    }

    let log = json!({
        "version": "2.1.0",
        "$schema": "https://raw.githubusercontent.com/oasis-tcs/sarif-spec/master/Schemata/sarif-schema-2.1.0.json",
        "runs": [{
            "tool": {
                "driver": {
                    "name": "kubegrade",
                    "informationUri": "https://github.com/kubegrade/kubegrade",
                    "version": env!("CARGO_PKG_VERSION"),
                    "rules": rules,
                }
            },
            "results": results,
        }],
    });

    let mut output = serde_json::to_string_pretty(&log)?;
    output.push('\n');
    Ok(output)
}
