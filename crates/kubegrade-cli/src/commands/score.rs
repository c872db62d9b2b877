//! Score command - parse, grade and render

use crate::exit_codes;
use crate::renderer;
use crate::{ColorChoice, OutputFormat};
use kubegrade_core::{Grade, KubernetesVersion, ObjectSet, RunConfiguration};
use kubegrade_parse::{NamedSource, Parser, SkipExpression};
use kubegrade_score::{register_all_checks, score};
use miette::{IntoDiagnostic, Result, miette};
use std::collections::BTreeSet;
use std::io::Read;

pub struct ScoreArgs {
    pub files: Vec<String>,
    pub exit_one_on_warning: bool,
    pub ignore_init_containers: bool,
    pub ignore_jobs: bool,
    pub namespace: String,
    pub ignore_container_cpu_limit: bool,
    pub ignore_container_memory_limit: bool,
    pub enable_optional_test: Vec<String>,
    pub ignore_test: Vec<String>,
    pub skip: Vec<String>,
    pub disable_ignore_checks_annotations: bool,
    pub disable_optional_checks_annotations: bool,
    pub all_default_optional: bool,
    pub kubernetes_version: String,
    pub output_format: OutputFormat,
    pub color: ColorChoice,
    pub verbose: u8,
}

pub fn run(args: ScoreArgs) -> Result<()> {
    let sources = read_sources(&args.files)?;

    let skip_expressions = args
        .skip
        .iter()
        .map(|raw| SkipExpression::parse(raw))
        .collect::<std::result::Result<Vec<_>, _>>()
        .into_diagnostic()?;

    let kubernetes_version = KubernetesVersion::parse(&args.kubernetes_version)
        .map_err(|_| miette!("invalid --kubernetes-version, use the form \"vN.NN\""))?;

    let mut config = RunConfiguration {
        namespace: args.namespace.clone(),
        skip_init_containers: args.ignore_init_containers,
        skip_jobs: args.ignore_jobs,
        ignore_container_cpu_limit: args.ignore_container_cpu_limit,
        ignore_container_memory_limit: args.ignore_container_memory_limit,
        ignored_checks: args.ignore_test.iter().cloned().collect(),
        enabled_optional_checks: args.enable_optional_test.iter().cloned().collect(),
        use_ignore_annotations: !args.disable_ignore_checks_annotations,
        use_enable_annotations: !args.disable_optional_checks_annotations,
        kubernetes_version,
    };

    if args.all_default_optional {
        config.enabled_optional_checks = all_optional_check_ids(&config)?;
    }

    let objects = Parser::new(skip_expressions)
        .parse(&sources)
        .into_diagnostic()?;

    let registry = register_all_checks(&objects, &config).into_diagnostic()?;
    let card = score(&objects, &registry, &config).into_diagnostic()?;

    let exit_code = if card.any_at_or_below(Grade::Critical) {
        exit_codes::GRADE_FAILURE
    } else if args.exit_one_on_warning && card.any_at_or_below(Grade::Warning) {
        exit_codes::GRADE_FAILURE
    } else {
        exit_codes::SUCCESS
    };

    let output = match args.output_format {
        OutputFormat::Human => {
            renderer::human::render(&card, use_color(args.color), args.verbose > 0)
        }
        OutputFormat::Json => renderer::json::render(&card).into_diagnostic()?,
        OutputFormat::Ci => renderer::ci::render(&card),
        OutputFormat::Sarif => renderer::sarif::render(&card).into_diagnostic()?,
    };
    print!("{output}");

    std::process::exit(exit_code);
}

/// Every optional check id known to the catalog, minus the explicitly
/// ignored ones. Registration against an empty set is enough for listing.
fn all_optional_check_ids(config: &RunConfiguration) -> Result<BTreeSet<String>> {
    let registry = register_all_checks(&ObjectSet::new(), config).into_diagnostic()?;
    Ok(registry
        .all()
        .iter()
        .filter(|c| c.optional && !config.ignored_checks.contains(&c.id))
        .map(|c| c.id.clone())
        .collect())
}

fn read_sources(files: &[String]) -> Result<Vec<NamedSource>> {
    let mut sources = Vec::with_capacity(files.len());
    for file in files {
        if file == "-" {
            let mut content = String::new();
            std::io::stdin()
                .read_to_string(&mut content)
                .into_diagnostic()?;
            sources.push(NamedSource::new("STDIN", content));
        } else {
            let content = std::fs::read_to_string(file)
                .map_err(|err| miette!("failed to read {file}: {err}"))?;
            sources.push(NamedSource::new(file.clone(), content));
        }
    }
    Ok(sources)
}

fn use_color(choice: ColorChoice) -> bool {
    match choice {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => {
            if std::env::var_os("NO_COLOR").is_some() {
                false
            } else {
                console::colors_enabled()
            }
        }
    }
}
