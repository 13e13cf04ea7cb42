use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thunderbolt_lib::engine::config::ScheduleKind;
use thunderbolt_lib::data::RuleId;
use thunderbolt_lib::runner::{
    spawn, PhaseClock, RunnerCommand, RunnerState, SchedulingMode, Sink,
};
use thunderbolt_lib::{JsonLinesSink, SimConfig, TracingSink};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_HEADLESS_TICKS: u64 = 100;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Config file; defaults are used when it does not exist
    #[arg(short, long, default_value = "thunderbolt.toml")]
    config: PathBuf,

    /// Number of ticks to run
    #[arg(short, long)]
    ticks: Option<u64>,

    /// Rule override (demo, diffusion, game_of_life_3d)
    #[arg(short, long)]
    rule: Option<String>,

    /// How ticks are scheduled
    #[arg(short, long, value_enum, default_value = "headless")]
    mode: Mode,

    /// Where deltas and metrics go
    #[arg(short, long, value_enum, default_value = "log")]
    output: Output,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum Mode {
    SelfTimed,
    Clock,
    Headless,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum Output {
    Log,
    Json,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "thunderbolt=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(e) = run(Args::parse()).await {
        tracing::error!("Thunderbolt failed: {e:#}");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    let mut config = SimConfig::load(&args.config)?;
    if let Some(rule) = &args.rule {
        config.lattice.rule = RuleId::from_name(rule);
    }
    if args.ticks.is_some() {
        config.runner.max_ticks = args.ticks;
    }
    if matches!(args.mode, Mode::Clock) {
        config.runner.mode = ScheduleKind::ClockDriven;
    }
    // Pin the seed so the logged fingerprint describes this exact run.
    config.lattice.seed = Some(config.seed());
    config.validate()?;

    tracing::info!(
        fingerprint = %config.fingerprint(),
        seed = config.seed(),
        rule = config.lattice.rule.name(),
        mode = ?args.mode,
        "Configuration loaded"
    );

    let sink: Arc<dyn Sink> = match args.output {
        Output::Log => Arc::new(TracingSink),
        Output::Json => Arc::new(JsonLinesSink::stdout()),
    };

    match args.mode {
        Mode::Headless => run_headless(&config, sink.as_ref()).await,
        Mode::SelfTimed | Mode::Clock => run_async(&config, sink).await,
    }
}

async fn run_headless(config: &SimConfig, sink: &dyn Sink) -> Result<()> {
    let mut state = RunnerState::from_config(config)?;
    let ticks = config.runner.max_ticks.unwrap_or(DEFAULT_HEADLESS_TICKS);
    let run_id = state.run_id();

    for _ in 0..ticks {
        let report = state.tick()?;
        if let Err(e) = sink.broadcast_deltas(run_id, report.tick, &report.deltas).await {
            tracing::warn!(tick = report.tick, error = %e, "Sink rejected deltas");
        }
        if let Some(snapshot) = &report.snapshot {
            if let Err(e) = sink.emit_metrics(run_id, report.tick, snapshot).await {
                tracing::warn!(tick = report.tick, error = %e, "Sink rejected metrics");
            }
        }
    }

    let metrics = state.metrics();
    tracing::info!(
        %run_id,
        ticks = metrics.tick_count(),
        skipped = metrics.skipped_analyses(),
        elapsed_ms = metrics.elapsed().as_millis() as u64,
        "Headless run finished"
    );
    Ok(())
}

async fn run_async(config: &SimConfig, sink: Arc<dyn Sink>) -> Result<()> {
    let clock = PhaseClock::default();
    let driver = match config.runner.mode {
        ScheduleKind::ClockDriven => Some(clock.drive(Duration::from_millis(
            config.runner.clock_phase_ms,
        ))),
        ScheduleKind::SelfTimed => None,
    };

    let state = RunnerState::from_config(config)?;
    let mode = SchedulingMode::from_config(config, Some(clock.subscribe()));
    let handle = spawn(state, mode, sink, config.runner.max_ticks);

    let commands = handle.command_sender();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Ctrl+C received, stopping");
            let _ = commands.send(RunnerCommand::Stop);
        }
    });

    let summary = handle.join().await?;
    if let Some(driver) = driver {
        driver.abort();
    }
    tracing::info!(
        run_id = %summary.run_id,
        ticks = summary.ticks,
        final_tick = summary.final_tick,
        skipped = summary.skipped_analyses,
        reason = ?summary.reason,
        "Run finished"
    );
    Ok(())
}
