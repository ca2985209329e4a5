mod commands;
mod config;
mod logging;
mod manifest;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use formflow_analyze::Coverage;

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

/// Formflow form schema toolchain.
#[derive(Parser)]
#[command(name = "formflow", version, about = "Formflow form schema toolchain")]
struct Cli {
    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text", value_enum)]
    output: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, global = true)]
    quiet: bool,

    /// Path to a formflow.toml (default: ./formflow.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compose schema fragments into one unified schema
    Compose {
        /// Fragment JSON files, in registration order
        #[arg(required = true)]
        fragments: Vec<PathBuf>,
        /// Write the unified schema to this file instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Report unreachable steps, dangling transitions and other graph problems
    Lint {
        /// Fragment JSON files, in registration order
        #[arg(required = true)]
        fragments: Vec<PathBuf>,
    },

    /// Evaluate a guard rule against form data
    Eval {
        /// Path to the rule JSON file
        rule: PathBuf,
        /// Path to the form data JSON file
        #[arg(long)]
        data: PathBuf,
    },

    /// Generate test paths through a composed schema
    Generate {
        /// Fragment JSON files, in registration order
        #[arg(required = true)]
        fragments: Vec<PathBuf>,
        /// Coverage strategy
        #[arg(long, value_parser = parse_coverage)]
        coverage: Option<Coverage>,
        /// Maximum number of paths to keep
        #[arg(long)]
        max_paths: Option<usize>,
        /// Maximum number of steps per path
        #[arg(long)]
        max_depth: Option<usize>,
        /// Seed for data synthesis and branch sampling
        #[arg(long)]
        seed: Option<u64>,
        /// Also emit validation_error and blocked paths
        #[arg(long)]
        include_invalid: bool,
    },

    /// Migrate form data between schema versions
    Migrate {
        /// Path to the version manifest JSON file
        manifest: PathBuf,
        /// Form id inside the manifest
        #[arg(long)]
        form: String,
        /// Version the data was saved under
        #[arg(long)]
        from: String,
        /// Target version (default: the latest version)
        #[arg(long)]
        to: Option<String>,
        /// Print the migration plan without migrating anything
        #[arg(long)]
        plan: bool,
        /// Path to the form data JSON file
        #[arg(required_unless_present = "plan")]
        data: Option<PathBuf>,
    },
}

fn parse_coverage(s: &str) -> Result<Coverage, String> {
    s.parse()
}

fn main() {
    let cli = Cli::parse();

    let cfg = match config::load_config(cli.config.as_deref()) {
        Ok(cfg) => cfg,
        Err(e) => {
            report_error(&format!("error: {}", e), cli.output, cli.quiet);
            process::exit(1);
        }
    };
    logging::init(cfg.log.filter.as_deref());
    tracing::debug!(generate = ?cfg.generate, "configuration loaded");

    match cli.command {
        Commands::Compose { fragments, out } => {
            commands::compose::cmd_compose(&fragments, out.as_deref(), cli.output, cli.quiet);
        }
        Commands::Lint { fragments } => {
            commands::lint::cmd_lint(&fragments, cli.output, cli.quiet);
        }
        Commands::Eval { rule, data } => {
            commands::eval::cmd_eval(&rule, &data, cli.output, cli.quiet);
        }
        Commands::Generate {
            fragments,
            coverage,
            max_paths,
            max_depth,
            seed,
            include_invalid,
        } => {
            let mut options = cfg.generate.clone();
            if let Some(c) = coverage {
                options.coverage = c;
            }
            if let Some(n) = max_paths {
                options.max_paths = n;
            }
            if let Some(n) = max_depth {
                options.max_depth = n;
            }
            if let Some(s) = seed {
                options.seed = s;
            }
            if include_invalid {
                options.include_invalid = true;
            }
            commands::generate::cmd_generate(&fragments, &options, cli.output, cli.quiet);
        }
        Commands::Migrate {
            manifest,
            form,
            from,
            to,
            plan,
            data,
        } => {
            commands::migrate::cmd_migrate(
                &manifest,
                &form,
                &from,
                to.as_deref(),
                plan,
                data.as_deref(),
                cli.output,
                cli.quiet,
            );
        }
    }
}

/// Report an error in the selected output format.
pub(crate) fn report_error(msg: &str, output: OutputFormat, quiet: bool) {
    if quiet {
        return;
    }
    match output {
        OutputFormat::Text => eprintln!("{}", msg),
        OutputFormat::Json => {
            eprintln!("{}", serde_json::json!({ "error": msg }));
        }
    }
}
