use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rayon::prelude::*;
use tracing::{debug, info};

use crate::config::MonitorConfig;
use crate::logger;
use crate::monitor::{ContentionMonitor, SamplingController};
use crate::replay::{Scenario, ScriptedHost};
use crate::sink::WriterSink;

#[derive(Parser, Debug)]
#[command(
    name = "lockwatch",
    version,
    about = "Sampling lock-contention monitor"
)]
pub struct LockwatchCli {
    #[arg(long, global = true, value_name = "options")]
    /// Agent option string, e.g. monitorSampleRate=10,monitorStackTraceDepth=8
    options: Option<String>,

    #[command(subcommand)]
    command: Command,
}

impl LockwatchCli {
    pub fn command(&self) -> &Command {
        &self.command
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Replay the contention events of a scenario file and print one record per line.
    Replay {
        scenario: PathBuf,
        /// Sample one event in N (zero or negative disables the monitor)
        #[arg(long, allow_negative_numbers = true)]
        sample_rate: Option<i32>,
        /// Frames captured per record, clamped to 128
        #[arg(long, allow_negative_numbers = true)]
        depth: Option<i32>,
        /// Disable the monitor: no events are sampled and no records are
        /// printed, not only stack traces
        #[arg(long)]
        no_stack_trace: bool,
        /// Worker threads contending in parallel
        #[arg(short, long, default_value_t = 1)]
        jobs: usize,
    },
}

pub fn run() -> Result<()> {
    logger::init_logging();
    let cli = LockwatchCli::parse();

    match &cli.command {
        Command::Replay {
            scenario,
            sample_rate,
            depth,
            no_stack_trace,
            jobs,
        } => {
            let mut config = MonitorConfig::from_env();
            if let Some(options) = &cli.options {
                config
                    .merge_options(options)
                    .context("invalid --options value")?;
            }
            if let Some(rate) = sample_rate {
                config.sample_rate = *rate;
            }
            if let Some(depth) = depth {
                config.stack_depth = *depth;
            }
            if *no_stack_trace {
                config.stack_trace = false;
            }
            handle_replay(scenario, config, *jobs)
        }
    }
}

fn handle_replay(path: &Path, config: MonitorConfig, jobs: usize) -> Result<()> {
    let scenario = Scenario::load(path)?;
    let host = ScriptedHost::new(scenario)
        .with_context(|| format!("failed to prepare scenario {}", path.display()))?;
    let events = host.scenario().events.len();
    debug!(?config, events, "replaying scenario");

    let sampling = SamplingController::new();
    config.apply(&sampling);

    let monitor = ContentionMonitor::new(host, WriterSink::new(io::stdout()), sampling);
    replay(&monitor, jobs)?;

    let metrics = monitor.metrics();
    info!(
        seen = metrics.events_seen,
        sampled = metrics.events_sampled,
        emitted = metrics.records_emitted,
        soft_failures = metrics.soft_failures,
        "replay finished"
    );
    for (class, count) in monitor.tally().snapshot() {
        info!(class = %class, count, "contention tally");
    }
    Ok(())
}

/// Feed every scenario event to the monitor from `jobs` threads
pub fn replay<S: crate::sink::Sink>(
    monitor: &ContentionMonitor<ScriptedHost, S>,
    jobs: usize,
) -> Result<()> {
    let events: Vec<_> = monitor.host().events().collect();
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(jobs.max(1))
        .build()
        .context("failed to start replay workers")?;

    pool.install(|| {
        events.par_iter().for_each(|(thread, object)| {
            monitor.on_contended_entered(thread, object);
        });
    });
    Ok(())
}
