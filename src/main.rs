use clap::Parser;
use log::{info, warn};
use std::time::{Duration, Instant};

use teledash::config::DashboardConfig;
use teledash::core::{Dashboard, DashboardEvent};
use teledash::sources::{ConsoleSink, StaticLicense, SynthConfig, SynthSource};

/// teledash - real-time telemetry dashboard engine, driven by a synthetic
/// telemetry source
#[derive(Parser, Debug, Clone)]
#[command(name = "teledash")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Frames per second produced by the synthetic source
    #[arg(short = 'r', long = "rate", default_value = "30.0")]
    rate: f64,

    /// Samples kept per series (overrides the saved config)
    #[arg(short = 'p', long = "points")]
    points: Option<usize>,

    /// Decimal precision for value widgets
    #[arg(long = "precision")]
    precision: Option<u32>,

    /// Number of sine channels in the synthetic source
    #[arg(short = 'c', long = "channels", default_value = "4")]
    channels: usize,

    /// Enable the terminal widget
    #[arg(short = 't', long = "terminal")]
    terminal: bool,

    /// Treat licensed-only features as activated
    #[arg(long = "licensed")]
    licensed: bool,

    /// Stop after this many seconds (0 = run until interrupted)
    #[arg(long = "duration", default_value = "10")]
    duration: u64,

    /// Debug verbosity level (0=quiet, 1=info, 2=debug, 3=trace)
    #[arg(short = 'd', long = "debug", value_name = "LEVEL", default_value = "0")]
    debug: u8,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logger with verbosity based on -d/--debug flag; RUST_LOG
    // overrides the CLI setting.
    let log_level = match cli.debug {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    warn!("Starting teledash v{}", env!("CARGO_PKG_VERSION"));

    let mut config = DashboardConfig::load().unwrap_or_else(|err| {
        warn!("Failed to load config: {err}, using defaults");
        DashboardConfig::default()
    });

    let mut dashboard = Dashboard::new(
        Box::new(ConsoleSink::new()),
        Box::new(StaticLicense(cli.licensed)),
    );
    dashboard.set_points(cli.points.unwrap_or(config.points).max(2));
    dashboard.set_precision(cli.precision.unwrap_or(config.precision));
    dashboard.set_show_action_panel(config.show_action_panel);
    dashboard.set_terminal_enabled(cli.terminal || config.terminal_enabled);

    let events = dashboard.subscribe();
    let mut source = SynthSource::new(SynthConfig {
        channels: cli.channels,
        ..SynthConfig::default()
    });

    // Two independent cadences: frame ingestion at the source rate, refresh
    // coalesced at the configured tick rate.
    let mut frame_tick =
        tokio::time::interval(Duration::from_secs_f64(1.0 / cli.rate.max(0.1)));
    let mut refresh_tick = tokio::time::interval(Duration::from_secs_f64(
        1.0 / config.refresh_hz.max(1) as f64,
    ));

    let started = Instant::now();
    let mut frames = 0u64;
    let mut updates = 0u64;

    loop {
        tokio::select! {
            _ = frame_tick.tick() => {
                let frame = source.next_frame();
                dashboard.process_frame(&frame);
                dashboard.poll_actions(Instant::now());
                frames += 1;
            }
            _ = refresh_tick.tick() => {
                dashboard.refresh_tick();
                while let Ok(event) = events.try_recv() {
                    if event == DashboardEvent::Updated {
                        updates += 1;
                    } else {
                        info!("event: {event:?}");
                    }
                }
            }
        }

        if cli.duration > 0 && started.elapsed() >= Duration::from_secs(cli.duration) {
            break;
        }
    }

    warn!("Processed {frames} frames, delivered {updates} coalesced updates");
    warn!(
        "Dashboard '{}' has {} widgets:",
        dashboard.title(),
        dashboard.total_widget_count()
    );
    for index in 0..dashboard.total_widget_count() {
        if let (Some(kind), Some(relative)) =
            (dashboard.widget_type(index), dashboard.relative_index(index))
        {
            warn!("  window {index}: {kind:?} #{relative}");
        }
    }
    for action in dashboard.actions() {
        warn!("  action '{}' (checked: {})", action.title, action.checked);
    }

    config.points = dashboard.points();
    config.precision = dashboard.precision();
    config.terminal_enabled = dashboard.terminal_enabled();
    config.show_action_panel = dashboard.show_action_panel();
    if let Err(err) = config.save() {
        warn!("Failed to save config: {err}");
    }

    Ok(())
}
