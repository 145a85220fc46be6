mod cmd;
mod output;
mod root;

use clap::error::ErrorKind;
use clap::{Parser, Subcommand};
use cmd::{config::ConfigSubcommand, Overrides};
use lane_core::Stage;
use output::Verdict;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "lane",
    about = "Execution authorization lane: verify, check, and execute approved actions exactly once",
    version,
    propagate_version = true
)]
struct Cli {
    /// Project root (default: auto-detect from .lane/ or .git/)
    #[arg(long, global = true, env = "LANE_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    /// Approval log path (overrides config)
    #[arg(long, global = true, env = "LANE_APPROVAL_LOG")]
    approval_log: Option<PathBuf>,

    /// Execution log path (overrides config)
    #[arg(long, global = true, env = "LANE_EXECUTION_LOG")]
    execution_log: Option<PathBuf>,

    /// Tool registry path (overrides config)
    #[arg(long, global = true, env = "LANE_REGISTRY")]
    registry: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create .lane/ with a default config, empty logs, and an empty registry
    Init,

    /// Confirm an identifier was approved with exactly this content hash
    Verify {
        #[arg(allow_hyphen_values = true)]
        id: String,
        #[arg(allow_hyphen_values = true)]
        hash: String,
    },

    /// Confirm an approved identifier has never been executed
    Check {
        #[arg(allow_hyphen_values = true)]
        id: String,
        #[arg(allow_hyphen_values = true)]
        hash: String,
    },

    /// Run the single tool mapped to an eligible identifier and record it
    Execute {
        #[arg(allow_hyphen_values = true)]
        id: String,
        #[arg(allow_hyphen_values = true)]
        hash: String,
    },

    /// Print the SHA-256 content hash of a file ("-" for stdin)
    Digest { file: PathBuf },

    /// List execution records
    History {
        /// Only records for this exact identifier
        #[arg(long)]
        id: Option<String>,
    },

    /// Inspect the lane configuration
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

/// The gate a raw command line was aimed at, if any.
fn stage_of(args: &[String]) -> Option<Stage> {
    args.iter().skip(1).find_map(|arg| match arg.as_str() {
        "verify" => Some(Stage::Verify),
        "check" => Some(Stage::Eligibility),
        "execute" => Some(Stage::Execute),
        _ => None,
    })
}

/// A stage command that clap rejects is still a denial: one status line, exit 1.
fn deny_unparsed(args: &[String], err: clap::Error) -> ! {
    match (err.kind(), stage_of(args)) {
        (ErrorKind::DisplayHelp | ErrorKind::DisplayVersion, _) | (_, None) => err.exit(),
        (kind, Some(stage)) => {
            let json = args.iter().any(|a| a == "--json" || a == "-j");
            let detail = match kind {
                ErrorKind::MissingRequiredArgument => {
                    "expected exactly two inputs: <ID> <HASH>".to_string()
                }
                _ => err
                    .render()
                    .to_string()
                    .lines()
                    .next()
                    .unwrap_or_default()
                    .trim_start_matches("error: ")
                    .to_string(),
            };
            output::deny(stage, "invalid_format", &detail, None, json);
            std::process::exit(1);
        }
    }
}

fn main() {
    let args: Vec<String> = std::env::args_os()
        .map(|a| a.to_string_lossy().into_owned())
        .collect();
    let cli = match Cli::try_parse_from(&args) {
        Ok(cli) => cli,
        Err(e) => deny_unparsed(&args, e),
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let root = root::resolve_root(cli.root.as_deref());
    let overrides = Overrides {
        approval_log: cli.approval_log,
        execution_log: cli.execution_log,
        registry: cli.registry,
    };

    let result = match cli.command {
        Commands::Init => cmd::init::run(&root).map(|()| Verdict::Proceed),
        Commands::Verify { id, hash } => Ok(cmd::verify::run(&root, &overrides, &id, &hash, cli.json)),
        Commands::Check { id, hash } => Ok(cmd::check::run(&root, &overrides, &id, &hash, cli.json)),
        Commands::Execute { id, hash } => {
            Ok(cmd::execute::run(&root, &overrides, &id, &hash, cli.json))
        }
        Commands::Digest { file } => cmd::digest::run(&file, cli.json).map(|()| Verdict::Proceed),
        Commands::History { id } => {
            cmd::history::run(&root, &overrides, id.as_deref(), cli.json).map(|()| Verdict::Proceed)
        }
        Commands::Config { subcommand } => {
            cmd::config::run(&root, &overrides, subcommand, cli.json).map(|()| Verdict::Proceed)
        }
    };

    match result {
        Ok(Verdict::Proceed) => {}
        Ok(Verdict::Deny) => std::process::exit(1),
        Err(e) => {
            // Print the full error chain (anyhow's alternate Display)
            eprintln!("error: {e:#}");
            std::process::exit(1);
        }
    }
}
