//! `mania` command-line entry point.
//!
//! Per SPEC_FULL.md's Non-goals, this binary never parses Mania source
//! text itself — it only walks the paths it is given for already
//! compiled `.bam` modules (§6.3) and hands them to a `Node`. Argument
//! handling, logging setup, and stdio wiring are ambient CLI concerns
//! carried from the teacher, not part of the Mania language/runtime
//! semantics the rest of this workspace implements.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use tracing::{error, info};

use mania_runtime::{Node, NodeConfig};

#[derive(Parser)]
#[command(name = "mania")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Run compiled Mania (.bam) modules under a cooperative scheduler", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Boot a Node over one or more `.bam` files or directories
    Run {
        /// `.bam` files or directories to load at boot
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Instructions each process may run per scheduler turn (§4.6)
        #[arg(long, default_value_t = 1000)]
        tick_limit: u32,

        /// Number of Scheduler threads to run (§4.7)
        #[arg(long, default_value_t = 1)]
        schedulers: usize,
    },

    /// Generate shell completion scripts
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn run(paths: Vec<PathBuf>, tick_limit: u32, schedulers: usize) -> ExitCode {
    let node = Node::new(NodeConfig {
        tick_limit,
        scheduler_count: schedulers,
        boot_paths: paths,
    });

    info!(tick_limit, schedulers, "starting node");
    match node.start() {
        Ok(()) => {
            info!("node drained, all processes exited");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "node failed to start");
            ExitCode::FAILURE
        }
    }
}

fn run_completions(shell: Shell) {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    generate(shell, &mut cmd, name, &mut std::io::stdout());
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive("mania_cli=info".parse().unwrap()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run {
            paths,
            tick_limit,
            schedulers,
        } => run(paths, tick_limit, schedulers),
        Commands::Completions { shell } => {
            run_completions(shell);
            ExitCode::SUCCESS
        }
    }
}
