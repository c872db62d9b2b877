//! Human renderer - styled terminal output

use console::Style;
use kubegrade_core::{Grade, Scorecard, ScoredObject, TestScore};

struct Styles {
    ok: Style,
    almost_ok: Style,
    warning: Style,
    critical: Style,
    dim: Style,
}

impl Styles {
    fn new(color: bool) -> Self {
        if color {
            Self {
                ok: Style::new().green().force_styling(true),
                almost_ok: Style::new().green().force_styling(true),
                warning: Style::new().yellow().force_styling(true),
                critical: Style::new().red().bold().force_styling(true),
                dim: Style::new().dim().force_styling(true),
            }
        } else {
            Self {
                ok: Style::new(),
                almost_ok: Style::new(),
                warning: Style::new(),
                critical: Style::new(),
                dim: Style::new(),
            }
        }
    }

    fn for_score(&self, score: &TestScore) -> &Style {
        if score.skipped {
            return &self.dim;
        }
        match score.grade {
            Grade::Critical => &self.critical,
            Grade::Warning => &self.warning,
            Grade::AlmostOk => &self.almost_ok,
            Grade::AllOk => &self.ok,
        }
    }
}

fn status(score: &TestScore) -> String {
    if score.skipped {
        "SKIPPED".to_string()
    } else {
        score.grade.to_string()
    }
}

fn render_object(out: &mut String, object: &ScoredObject, styles: &Styles, verbose: bool) {
    let namespace = if object.namespace.is_empty() {
        String::new()
    } else {
        format!(" in {}", object.namespace)
    };
    out.push_str(&format!(
        "{}/{} {}{}{}\n",
        object.type_meta.api_version,
        object.type_meta.kind,
        object.name,
        namespace,
        styles.dim.apply_to(format!(
            " ({}:{})",
            object.location.file, object.location.line
        )),
    ));

    for result in &object.results {
        let interesting = !result.score.skipped && result.score.grade < Grade::AllOk;
        if !interesting && !verbose {
            continue;
        }

        let style = styles.for_score(&result.score);
        out.push_str(&format!(
            "    [{}] {}\n",
            style.apply_to(status(&result.score)),
            result.check.name
        ));

        for comment in &result.score.comments {
            if comment.path.is_empty() {
                out.push_str(&format!("        · {}\n", comment.summary));
            } else {
                out.push_str(&format!("        · {} -> {}\n", comment.path, comment.summary));
            }
            if !comment.description.is_empty() {
                out.push_str(&format!("            {}\n", comment.description));
            }
        }
    }
}

pub fn render(card: &Scorecard, color: bool, verbose: bool) -> String {
    let styles = Styles::new(color);
    let mut out = String::new();
    for (_, object) in card.iter() {
        render_object(&mut out, object, &styles, verbose);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
    use kubegrade_core::{Check, FileLocation, TypeMeta};

    fn card() -> Scorecard {
        let mut card = Scorecard::new();
        let tm = TypeMeta::new("apps/v1", "Deployment");
        let meta = ObjectMeta {
            name: Some("web".to_string()),
            namespace: Some("prod".to_string()),
            ..Default::default()
        };
        let entry = card.object_mut(&tm, &meta, &FileLocation::new("web.yaml", 3));
        entry.add(
            Check::new("Deployment Replicas", "Deployment", "", false),
            TestScore::ok(),
        );
        entry.add(
            Check::new("Container Resources", "Pod", "", false),
            TestScore::critical().with_comment(
                "app",
                "CPU limit is not set",
                "Set resources.limits.cpu",
            ),
        );
        card
    }

    #[test]
    fn test_render_shows_failures_only_by_default() {
        let output = render(&card(), false, false);
        assert!(output.contains("apps/v1/Deployment web in prod (web.yaml:3)"));
        assert!(output.contains("[CRITICAL] Container Resources"));
        assert!(output.contains("· app -> CPU limit is not set"));
        assert!(!output.contains("Deployment Replicas"));
    }

    #[test]
    fn test_render_verbose_includes_passing_checks() {
        let output = render(&card(), false, true);
        assert!(output.contains("[OK] Deployment Replicas"));
    }
}
