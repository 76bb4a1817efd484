use std::io::{self, BufRead, Write};

use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

use kt_optimizer::{duplex, Optimizer, WorkerConfig};

/// Runs one tuning job and speaks JSON lines on stdout/stdin: every worker
/// message is written as one line, every evaluation result is read as one line.
fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("KNOBTUNE_JOB").ok())
        .context("usage: kt-worker <job.json> (or set KNOBTUNE_JOB)")?;
    let config = WorkerConfig::from_path(&path)
        .with_context(|| format!("failed to load tuning job from {path}"))?;
    info!(job = %path, worker = %config.name, engine = %config.engine, "starting tuning job");

    let (worker, controller) = duplex();
    let handle = Optimizer::from_config(config, worker).spawn()?;

    let stdin = io::stdin();
    let mut stdout = io::stdout().lock();
    let mut line = String::new();
    while let Some(message) = controller.recv() {
        serde_json::to_writer(&mut stdout, &message)?;
        writeln!(stdout)?;
        stdout.flush()?;
        if message.is_terminal() {
            break;
        }

        line.clear();
        if stdin.lock().read_line(&mut line)? == 0 {
            info!("stdin closed, stopping worker");
            break;
        }
        controller.reply(line.trim_end())?;
    }

    let exit = handle.stop(controller)?;
    anyhow::ensure!(
        exit.best.is_some(),
        "tuning run {} ended without a result",
        exit.status.id
    );
    info!(run = %exit.status.id, trials = exit.status.trials_completed, "tuning job finished");
    Ok(())
}
