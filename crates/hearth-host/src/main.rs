//! `hearthd`: wires the kernel lifecycle to a process.
//!
//! Reloads are serialized by the signal loop (SIGHUP on unix); ctrl-c runs
//! the ordered shutdown. A pending restart is performed by exiting with a
//! supervisor-visible code so the service manager respawns the host.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use hearth_kernel::logging::LogManager;
use hearth_kernel::{ApplicationPaths, HostOptions, LifecycleBuilder, RestartHost};

/// Exit code asking the supervisor to start a fresh process.
const RESTART_EXIT_CODE: u8 = 70;

#[derive(Parser, Debug)]
#[command(name = "hearthd", version, about = "Hearth application host")]
struct Cli {
    /// Data directory holding the configuration file and plugin state.
    #[arg(long, default_value = ".")]
    data_dir: PathBuf,

    /// Log filter directive used until the configuration first loads.
    #[arg(long, default_value = "info")]
    log: String,
}

/// Restart capability backed by process exit; the supervisor respawns us.
struct SupervisedRestart;

impl RestartHost for SupervisedRestart {
    fn request_restart(&self) -> anyhow::Result<()> {
        tracing::info!(code = RESTART_EXIT_CODE, "exiting for supervised restart");
        std::process::exit(i32::from(RESTART_EXIT_CODE));
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let logging = LogManager::init(&cli.log)?;

    let controller = LifecycleBuilder::new(
        ApplicationPaths::new(cli.data_dir),
        HostOptions {
            version: env!("CARGO_PKG_VERSION").into(),
            is_network_deployed: false,
        },
    )
    .with_restart_host(std::sync::Arc::new(SupervisedRestart))
    .with_log_manager(logging)
    .build();

    controller.init().await?;
    tracing::info!(first_run = controller.is_first_run(), "host is up");

    run_signal_loop(&controller).await?;

    controller.shutdown().await;
    Ok(ExitCode::SUCCESS)
}

#[cfg(unix)]
async fn run_signal_loop(controller: &hearth_kernel::LifecycleController) -> Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut hangup = signal(SignalKind::hangup())?;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("interrupt received");
                return Ok(());
            }
            _ = hangup.recv() => {
                tracing::info!("hangup received; reloading");
                if let Err(err) = controller.reload().await {
                    tracing::error!("reload failed: {err}");
                }
            }
        }
    }
}

#[cfg(not(unix))]
async fn run_signal_loop(_controller: &hearth_kernel::LifecycleController) -> Result<()> {
    tokio::signal::ctrl_c().await?;
    tracing::info!("interrupt received");
    Ok(())
}
