use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use dkcompose::config::{self, ContainerConfig};
use dkcompose::deploy::{DeployReport, Deployer, ExecReport};
use dkcompose::docker::{DEFAULT_PROGRAM, DockerCli};

const EXIT_OK: u8 = 0;
/// A fatal error stopped the run.
const EXIT_FATAL: u8 = 1;
/// Exit code when every step ran but some commands failed under `--strict`.
const EXIT_COMMANDS_FAILED: u8 = 2;

#[derive(Parser)]
#[command(name = "dkcompose", version, about)]
struct Cli {
    /// Compose file (default: dkcompose.yaml or dkcompose.yml in the working directory)
    #[arg(short, long, global = true)]
    file: Option<PathBuf>,

    /// Container engine client to invoke
    #[arg(long, env = "DKCOMPOSE_DOCKER", default_value = DEFAULT_PROGRAM, global = true)]
    docker: String,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Reconcile networks, then create every container and run its commands
    Up {
        /// Exit non-zero if any command fails
        #[arg(long)]
        strict: bool,

        /// Write a JSON report of the run to this path
        #[arg(long)]
        report: Option<PathBuf>,
    },
    /// Reconcile the configured networks only
    Network,
    /// (Re)create containers and attach their networks
    Create {
        /// Containers to create (default: all, in file order)
        names: Vec<String>,
    },
    /// Run the configured commands in existing containers
    Exec {
        /// Containers to run commands in (default: all, in file order)
        names: Vec<String>,

        /// Exit non-zero if any command fails
        #[arg(long)]
        strict: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let code = run(cli).unwrap_or_else(|e| {
        error!("{e:#}");
        EXIT_FATAL
    });
    ExitCode::from(code)
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "dkcompose=info",
        1 => "dkcompose=debug",
        _ => "dkcompose=trace",
    };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .init();
}

fn run(cli: Cli) -> Result<u8> {
    let cwd = std::env::current_dir().context("failed to determine working directory")?;
    let (path, file) = config::load_from(&cwd, cli.file.as_deref())?;
    info!(path = %path.display(), "loaded compose file");

    let engine = DockerCli::new(&cli.docker)
        .with_exec_timeout(file.global.exec_timeout.map(Duration::from_secs));
    engine
        .ensure_available()
        .with_context(|| format!("`{}` cannot reach a container engine", engine.program()))?;

    let mut deployer = Deployer::new(file.global, engine)?;

    match cli.command {
        Command::Up { strict, report } => {
            let outcome = deployer.up(&file.containers)?;
            for net in outcome.networks.iter().filter(|n| n.is_failed()) {
                warn!(network = %net.name, "network was not reconciled");
            }
            if let Some(path) = report {
                write_report(&path, &outcome)?;
            }
            Ok(exit_for(strict, &outcome.containers))
        }
        Command::Network => {
            for status in deployer.init_network() {
                match &status.error {
                    Some(e) => {
                        warn!(network = %status.name, error = %e, "network was not reconciled");
                    }
                    None => info!(network = %status.name, status = %status.status, "network ready"),
                }
            }
            Ok(EXIT_OK)
        }
        Command::Create { names } => {
            for container in select(&file.containers, &names)? {
                deployer.create_container(container)?;
            }
            Ok(EXIT_OK)
        }
        Command::Exec { names, strict } => {
            let mut reports = Vec::new();
            for container in select(&file.containers, &names)? {
                reports.push(deployer.run_commands(container)?);
            }
            Ok(exit_for(strict, &reports))
        }
    }
}

/// Pick containers by name, keeping file order. No names means all.
fn select<'a>(
    containers: &'a [ContainerConfig],
    names: &[String],
) -> Result<Vec<&'a ContainerConfig>> {
    if names.is_empty() {
        return Ok(containers.iter().collect());
    }
    for name in names {
        if !containers.iter().any(|c| c.name.as_deref() == Some(name.as_str())) {
            bail!("no container named {name} in the compose file");
        }
    }
    Ok(containers
        .iter()
        .filter(|c| c.name.as_ref().is_some_and(|n| names.contains(n)))
        .collect())
}

fn exit_for(strict: bool, reports: &[ExecReport]) -> u8 {
    let failed: usize = reports.iter().map(|r| r.summary.failed).sum();
    if failed > 0 {
        warn!(failed, "some commands failed");
        if strict {
            return EXIT_COMMANDS_FAILED;
        }
    }
    EXIT_OK
}

fn write_report(path: &Path, report: &DeployReport) -> Result<()> {
    let json = serde_json::to_string_pretty(report).context("failed to serialize report")?;
    std::fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))?;
    info!(path = %path.display(), "wrote report");
    Ok(())
}
