//! CI renderer - one grep-friendly line per finding

use kubegrade_core::{Scorecard, TestScore};

fn status(score: &TestScore) -> String {
    if score.skipped {
        "SKIPPED".to_string()
    } else {
        score.grade.to_string()
    }
}

pub fn render(card: &Scorecard) -> String {
    let mut out = String::new();
    for (_, object) in card.iter() {
        for result in &object.results {
            let reference = format!(
                "{}/{} {}",
                object.type_meta.api_version, object.type_meta.kind, object.name
            );
            if result.score.comments.is_empty() {
                out.push_str(&format!(
                    "[{}] {} ({})\n",
                    status(&result.score),
                    reference,
                    result.check.name
                ));
            } else {
                for comment in &result.score.comments {
                    let path = if comment.path.is_empty() {
                        String::new()
                    } else {
                        format!("({}) ", comment.path)
                    };
                    out.push_str(&format!(
                        "[{}] {} {}{}\n",
                        status(&result.score),
                        reference,
                        path,
                        comment.summary
                    ));
                }
            }
        }
    }
    out
}
