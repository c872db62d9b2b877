//! List command - print the full check catalog as CSV

use kubegrade_core::{ObjectSet, RunConfiguration};
use kubegrade_score::register_all_checks;
use miette::{IntoDiagnostic, Result};

pub fn run() -> Result<()> {
    // An empty object set is enough: listing only needs the metadata.
    let registry =
        register_all_checks(&ObjectSet::new(), &RunConfiguration::default()).into_diagnostic()?;

    for check in registry.all() {
        let optional = if check.optional { "optional" } else { "default" };
        println!(
            "{},{},{},{}",
            csv_field(&check.id),
            csv_field(&check.target_kind),
            csv_field(&check.comment),
            optional
        );
    }
    Ok(())
}

fn csv_field(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_csv_field_quoting() {
        assert_eq!(csv_field("plain"), "plain");
        assert_eq!(csv_field("with, comma"), "\"with, comma\"");
        assert_eq!(csv_field("with \"quote\""), "\"with \"\"quote\"\"\"");
    }
}
