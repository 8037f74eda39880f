//! pc - progresscoord command-line entry point

use std::fs;
use std::path::PathBuf;

use clap::{CommandFactory, Parser};
use colored::*;
use eyre::{Context, Result};
use tracing::info;

use progresscoord::cli::{Cli, Command, OutputFormat, get_log_path};
use progresscoord::config::Config;
use progresscoord::domain::{Rank, Topology, classify};
use progresscoord::simulation;

fn setup_logging(verbose: bool) -> Result<()> {
    let log_path = get_log_path();
    let log_dir = log_path.parent().map(PathBuf::from).unwrap_or_else(|| PathBuf::from("."));

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    // Write to log file, the terminal belongs to the progress display
    let level = if verbose { tracing::Level::DEBUG } else { tracing::Level::INFO };
    let log_file = fs::File::create(&log_path).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (verbose: {})", verbose);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    match cli.command {
        Some(Command::Classify {
            client,
            server,
            rank,
            processes,
            format,
        }) => cmd_classify(&config, client, server, rank, processes, format),
        Some(Command::Simulate {
            satellites,
            steps,
            tick_ms,
            interval_ms,
            client,
            quiet,
            format,
        }) => {
            let mut config = config;
            if let Some(satellites) = satellites {
                config.simulation.satellites = satellites;
            }
            if let Some(steps) = steps {
                config.simulation.steps = steps;
            }
            if let Some(tick_ms) = tick_ms {
                config.simulation.tick_ms = tick_ms;
            }
            if let Some(interval_ms) = interval_ms {
                config.progress.minimum_interval_ms = interval_ms;
            }
            config.simulation.with_client |= client;
            cmd_simulate(&config, !quiet && format == OutputFormat::Text, format).await
        }
        Some(Command::Config) => cmd_config(&config),
        None => {
            Cli::command().print_help()?;
            println!();
            Ok(())
        }
    }
}

/// Print the role a topology classifies to
fn cmd_classify(
    config: &Config,
    client: bool,
    server: bool,
    rank: Option<usize>,
    processes: Option<usize>,
    format: OutputFormat,
) -> Result<()> {
    let topology = Topology {
        is_client: client || config.topology.is_client,
        is_server: server || config.topology.is_server,
        local_rank: rank.map(Rank).unwrap_or(config.topology.local_rank),
        num_processes: processes.unwrap_or(config.topology.num_processes),
    };

    let role = classify(&topology).context("Failed to classify process role")?;
    info!(%role, ?topology, "Classified topology");

    match format {
        OutputFormat::Text => println!("{}", role),
        OutputFormat::Json => {
            let json = serde_json::json!({ "role": role, "topology": topology });
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
    }
    Ok(())
}

/// Run a simulated update and summarize it
async fn cmd_simulate(config: &Config, render: bool, format: OutputFormat) -> Result<()> {
    config.validate()?;

    let report = simulation::run(&config.simulation, &config.progress, render).await?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Text => {
            let sent: u64 = report.satellites.iter().map(|m| m.packets_sent).sum();
            let throttled: u64 = report.satellites.iter().map(|m| m.throttled).sum();
            println!(
                "{} Simulated update across {} ranks (root: {})",
                "✓".green(),
                report.roles.len().to_string().cyan(),
                report.roles.first().map(|r| r.to_string()).unwrap_or_default().cyan()
            );
            println!(
                "  satellites sent {} packets ({} throttled), root drained {}",
                sent.to_string().yellow(),
                throttled,
                report.root.packets_drained.to_string().yellow()
            );
            if report.client_updates > 0 {
                println!("  client displayed {} updates", report.client_updates.to_string().yellow());
            }
            match (&report.final_stage, report.final_percent) {
                (Some(stage), Some(percent)) => println!("  final: {} at {}%", stage.bold(), percent),
                _ => println!("  final: {}", "no progress reported".dimmed()),
            }
        }
    }
    Ok(())
}

/// Print the effective configuration
fn cmd_config(config: &Config) -> Result<()> {
    let yaml = serde_yaml::to_string(config).context("Failed to serialize config")?;
    print!("{}", yaml);
    Ok(())
}
