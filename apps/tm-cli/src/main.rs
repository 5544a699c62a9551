use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tm_app::{
    AppConfig, AppError, AppResult, config_to_yaml, load_config, run_monitor, run_semaphore_demo,
    run_threads_demo, run_timer_demo, save_config, validate_config,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "tm-cli")]
#[command(about = "tempmon CLI - periodic temperature sampling and signaling demos", long_about = None)]
struct Cli {
    /// Configuration YAML file (defaults are used when omitted)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Print the final report as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sample the simulated temperature channel on a timer
    Monitor {
        /// Run time in seconds
        #[arg(long, default_value_t = 5.0)]
        duration_s: f64,
        /// Override the sampling period
        #[arg(long)]
        period_ms: Option<u64>,
        /// Make every n-th simulated read fail
        #[arg(long)]
        fail_every: Option<u64>,
    },
    /// Run the producer/consumer semaphore demo
    Semaphore {
        /// Run time in seconds
        #[arg(long, default_value_t = 3.0)]
        duration_s: f64,
        /// Override the producer interval
        #[arg(long)]
        interval_ms: Option<u64>,
        /// Override the consumer poll timeout
        #[arg(long)]
        poll_ms: Option<u64>,
    },
    /// Run the periodic + one-shot timer demo
    Timers {
        /// Run time in seconds
        #[arg(long, default_value_t = 3.0)]
        duration_s: f64,
    },
    /// Run the static + dynamic task demo
    Threads {
        /// Run time in seconds
        #[arg(long, default_value_t = 3.0)]
        duration_s: f64,
    },
    /// Inspect or write configuration files
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Print the effective configuration as YAML
    Show,
    /// Validate a configuration file
    Validate {
        /// Path to the configuration YAML file
        path: PathBuf,
    },
    /// Write the default configuration to a file
    Init {
        /// Output path
        path: PathBuf,
    },
}

fn main() -> AppResult<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => AppConfig::default(),
    };

    match cli.command {
        Commands::Monitor {
            duration_s,
            period_ms,
            fail_every,
        } => cmd_monitor(config, duration_s, period_ms, fail_every, cli.json),
        Commands::Semaphore {
            duration_s,
            interval_ms,
            poll_ms,
        } => cmd_semaphore(config, duration_s, interval_ms, poll_ms, cli.json),
        Commands::Timers { duration_s } => cmd_timers(&config, duration_s, cli.json),
        Commands::Threads { duration_s } => cmd_threads(&config, duration_s, cli.json),
        Commands::Config(ConfigCommands::Show) => cmd_config_show(&config),
        Commands::Config(ConfigCommands::Validate { path }) => cmd_config_validate(&path),
        Commands::Config(ConfigCommands::Init { path }) => cmd_config_init(&path),
    }
}

fn cmd_monitor(
    mut config: AppConfig,
    duration_s: f64,
    period_ms: Option<u64>,
    fail_every: Option<u64>,
    json: bool,
) -> AppResult<()> {
    if let Some(period_ms) = period_ms {
        config.monitor.period_ms = period_ms;
        config.monitor.start_delay_ms = period_ms;
    }
    if fail_every.is_some() {
        config.simulation.fail_every = fail_every;
    }
    let duration = parse_duration(duration_s)?;

    if !json {
        println!(
            "Sampling every {} ms for {:.1} s",
            config.monitor.period_ms, duration_s
        );
    }
    let report = run_monitor(&config, duration)?;

    if json {
        return print_json(&report);
    }
    println!("✓ Monitor stopped");
    println!("  Samples: {}", report.samples);
    println!("  Read failures: {}", report.read_failures);
    println!(
        "  Ticks: {} ({} dropped)",
        report.ticks_posted, report.ticks_dropped
    );
    println!(
        "  Cycle time: mean {:.1} ms, max {:.1} ms",
        report.mean_cycle_s * 1e3,
        report.max_cycle_s * 1e3
    );
    Ok(())
}

fn cmd_semaphore(
    mut config: AppConfig,
    duration_s: f64,
    interval_ms: Option<u64>,
    poll_ms: Option<u64>,
    json: bool,
) -> AppResult<()> {
    if let Some(interval_ms) = interval_ms {
        config.semaphore.produce_interval_ms = interval_ms;
    }
    if let Some(poll_ms) = poll_ms {
        config.semaphore.poll_timeout_ms = poll_ms;
    }
    let report = run_semaphore_demo(&config, parse_duration(duration_s)?)?;

    if json {
        return print_json(&report);
    }
    println!("✓ Semaphore demo stopped");
    println!("  Produced: {} ({} dropped)", report.produced, report.dropped);
    println!("  Consumed: {} ({} pending)", report.consumed, report.pending);
    println!("  Poll timeouts: {}", report.timeouts);
    Ok(())
}

fn cmd_timers(config: &AppConfig, duration_s: f64, json: bool) -> AppResult<()> {
    let report = run_timer_demo(config, parse_duration(duration_s)?)?;

    if json {
        return print_json(&report);
    }
    println!("✓ Timer demo stopped");
    println!("  Periodic expiries: {}", report.periodic_expiries);
    println!("  One-shot expiries: {}", report.one_shot_expiries);
    println!("  Indicator toggles: {}", report.toggles);
    Ok(())
}

fn cmd_threads(config: &AppConfig, duration_s: f64, json: bool) -> AppResult<()> {
    let report = run_threads_demo(config, parse_duration(duration_s)?)?;

    if json {
        return print_json(&report);
    }
    println!("✓ Threads demo stopped");
    println!("  Static task beats: {}", report.static_beats);
    println!("  Dynamic task beats: {}", report.dynamic_beats);
    Ok(())
}

fn cmd_config_show(config: &AppConfig) -> AppResult<()> {
    print!("{}", config_to_yaml(config)?);
    Ok(())
}

fn cmd_config_validate(path: &Path) -> AppResult<()> {
    println!("Validating config: {}", path.display());
    let config = load_config(path)?;
    validate_config(&config)?;
    println!("✓ Config is valid");
    Ok(())
}

fn cmd_config_init(path: &Path) -> AppResult<()> {
    save_config(path, &AppConfig::default())?;
    println!("✓ Wrote default config to {}", path.display());
    Ok(())
}

fn parse_duration(seconds: f64) -> AppResult<Duration> {
    Duration::try_from_secs_f64(seconds)
        .map_err(|e| AppError::InvalidInput(format!("duration {seconds} s: {e}")))
}

fn print_json<T: Serialize>(report: &T) -> AppResult<()> {
    let text = serde_json::to_string_pretty(report)
        .map_err(|e| AppError::InvalidInput(format!("Failed to encode report: {e}")))?;
    println!("{text}");
    Ok(())
}
