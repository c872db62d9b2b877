//! Kubegrade CLI - static risk grading for Kubernetes manifests

use clap::{Parser, Subcommand, ValueEnum};
use miette::Result;

mod commands;
mod exit_codes;
mod renderer;

#[derive(Parser)]
#[command(name = "kubegrade")]
#[command(version)]
#[command(about = "Static risk grading for Kubernetes manifests", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Human,
    Json,
    Ci,
    Sarif,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum ColorChoice {
    Auto,
    Always,
    Never,
}

#[derive(Subcommand)]
enum Commands {
    /// Check all files in the input and grade every resource
    Score {
        /// Manifest files to score; use "-" to read from stdin
        #[arg(required = true)]
        files: Vec<String>,

        /// Exit with code 1 in case of warnings
        #[arg(long)]
        exit_one_on_warning: bool,

        /// Ignore checks for init containers
        #[arg(long)]
        ignore_init_containers: bool,

        /// Ignore checks for Jobs and CronJobs
        #[arg(long)]
        ignore_jobs: bool,

        /// Namespace to assume for resources without a namespace
        #[arg(short, long, default_value = "")]
        namespace: String,

        /// Disable the requirement of setting a container CPU limit
        #[arg(long)]
        ignore_container_cpu_limit: bool,

        /// Disable the requirement of setting a container memory limit
        #[arg(long)]
        ignore_container_memory_limit: bool,

        /// Enable an optional check, can be set multiple times
        #[arg(long = "enable-optional-test")]
        enable_optional_test: Vec<String>,

        /// Disable a check, can be set multiple times
        #[arg(long = "ignore-test")]
        ignore_test: Vec<String>,

        /// Skip documents matching a "path=regex" expression
        #[arg(long = "skip")]
        skip: Vec<String>,

        /// Disable the effect of the "kubegrade/ignore" annotations
        #[arg(long)]
        disable_ignore_checks_annotations: bool,

        /// Disable the effect of the "kubegrade/enable" annotations
        #[arg(long)]
        disable_optional_checks_annotations: bool,

        /// Enable all optional checks that are not explicitly ignored
        #[arg(long)]
        all_default_optional: bool,

        /// Target Kubernetes version, affects version-gated checks
        #[arg(long, default_value = "v1.18")]
        kubernetes_version: String,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Human)]
        output_format: OutputFormat,

        /// Color the output
        #[arg(long, value_enum, default_value_t = ColorChoice::Auto)]
        color: ColorChoice,

        /// Also show checks that passed or were skipped
        #[arg(short, long, action = clap::ArgAction::Count)]
        verbose: u8,
    },

    /// Print a CSV list of all available checks
    List,

    /// Print the version of kubegrade
    Version,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Score {
            files,
            exit_one_on_warning,
            ignore_init_containers,
            ignore_jobs,
            namespace,
            ignore_container_cpu_limit,
            ignore_container_memory_limit,
            enable_optional_test,
            ignore_test,
            skip,
            disable_ignore_checks_annotations,
            disable_optional_checks_annotations,
            all_default_optional,
            kubernetes_version,
            output_format,
            color,
            verbose,
        } => commands::score::run(commands::score::ScoreArgs {
            files,
            exit_one_on_warning,
            ignore_init_containers,
            ignore_jobs,
            namespace,
            ignore_container_cpu_limit,
            ignore_container_memory_limit,
            enable_optional_test,
            ignore_test,
            skip,
            disable_ignore_checks_annotations,
            disable_optional_checks_annotations,
            all_default_optional,
            kubernetes_version,
            output_format,
            color,
            verbose,
        }),

        Commands::List => commands::list::run(),

        Commands::Version => {
            println!("kubegrade {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
