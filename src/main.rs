// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Flare: geotagged safety-incident reporting
//!
//! Command-line front end for submitting, browsing and analyzing incident reports.

use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

use flare::analysis::{emphasis_spans, AnalysisOrchestrator, GeminiClient, RunOutcome};
use flare::config::AppConfig;
use flare::geocode::NominatimGeocoder;
use flare::incident::IncidentDraft;
use flare::map;
use flare::session::{IncidentRow, ReportSession};
use flare::store::IncidentStore;
use flare::{FlareError, Result};

/// Flare CLI - safety incident reports
#[derive(Parser, Debug)]
#[command(name = "flare")]
#[command(author = "Jonathan D. A. Jewell <hyperpolymath>")]
#[command(version = "1.0.0")]
#[command(about = "Submit, browse and analyze geotagged safety reports", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file (JSON format)
    #[arg(short, long, default_value = "config.json", global = true)]
    config: PathBuf,

    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable trace logging (most verbose)
    #[arg(long, global = true)]
    trace: bool,

    /// Output format for results
    #[arg(long, global = true, default_value = "text", value_parser = ["text", "json"])]
    format: String,

    /// Suppress non-essential output (quiet mode)
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Submit a new incident report
    Submit {
        /// Incident title
        #[arg(short, long)]
        title: String,

        /// What happened
        #[arg(short, long)]
        description: String,

        /// Location label (e.g. street or place name)
        #[arg(short, long)]
        location: String,

        #[arg(long, allow_hyphen_values = true)]
        lat: f64,

        #[arg(long, allow_hyphen_values = true)]
        lon: f64,

        /// Custom local date and time, "YYYY-MM-DD HH:MM" (default: now)
        #[arg(long)]
        at: Option<String>,
    },

    /// List incidents, newest first
    List {
        /// Only incidents at this location (case-insensitive)
        #[arg(short, long)]
        location: Option<String>,
    },

    /// Ask the analysis service about today's incidents
    Analyze,

    /// Search for places around the home region
    Search {
        /// Place query
        query: String,

        /// Also show incident markers
        #[arg(long)]
        incidents: bool,
    },

    /// Delete every stored incident
    Clear {
        /// Skip confirmation prompt
        #[arg(long)]
        force: bool,
    },

    /// Show analysis service and store status
    Status,

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Show current configuration
    Show,

    /// Generate default configuration file
    Generate {
        /// Output file path
        #[arg(short, long, default_value = "config.json")]
        output: PathBuf,
    },

    /// Validate configuration file
    Validate,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.trace {
        "trace"
    } else if cli.verbose {
        "debug"
    } else if cli.quiet {
        "warn"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let config = AppConfig::load(&cli.config)?;

    match cli.command {
        Some(Commands::Submit { title, description, location, lat, lon, at }) => {
            let timestamp = at.as_deref().map(parse_local_time).transpose()?;
            let draft = IncidentDraft { title, description, location, timestamp, latitude: lat, longitude: lon };
            run_submit(config, draft, &cli.format)
        }
        Some(Commands::List { location }) => run_list(config, location, &cli.format),
        Some(Commands::Analyze) => run_analyze(config, &cli.format).await,
        Some(Commands::Search { query, incidents }) => {
            run_search(config, &query, incidents, &cli.format).await
        }
        Some(Commands::Clear { force }) => run_clear(config, force),
        Some(Commands::Status) => run_status(config).await,
        Some(Commands::Config { action }) => run_config_command(config, action, &cli.config),
        None => run_list(config, None, &cli.format),
    }
}

fn open_session(config: &AppConfig) -> Result<ReportSession> {
    let store = IncidentStore::open(&config.store.path, &config.store.key)?;
    Ok(ReportSession::open(store))
}

/// Parse "YYYY-MM-DD HH:MM" in the local time zone
fn parse_local_time(raw: &str) -> Result<DateTime<Utc>> {
    let naive = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M")
        .map_err(|e| FlareError::InvalidSubmission(format!("bad --at value '{}': {}", raw, e)))?;
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| FlareError::InvalidSubmission(format!("'{}' does not exist locally", raw)))
}

fn run_submit(config: AppConfig, draft: IncidentDraft, format: &str) -> Result<()> {
    let mut session = open_session(&config)?;
    let incident = session.submit(draft, Utc::now())?;

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&incident)?);
    } else {
        println!("Reported '{}' at {} ({})", incident.title, incident.location, incident.id);
    }
    Ok(())
}

fn print_rows(rows: &[IncidentRow], format: &str) -> Result<()> {
    if format == "json" {
        println!("{}", serde_json::to_string_pretty(rows)?);
        return Ok(());
    }
    if rows.is_empty() {
        println!("No reports");
        return Ok(());
    }
    for row in rows {
        println!("[{:<8}] {} - {}", row.band, row.incident.title, row.relative);
        println!("           {}", row.incident.description);
        println!("           {}", row.incident.location);
    }
    Ok(())
}

fn run_list(config: AppConfig, location: Option<String>, format: &str) -> Result<()> {
    let mut session = open_session(&config)?;
    let now = Utc::now();
    let rows = match location {
        Some(label) => {
            session.select_location(Some(label));
            session.location_rows(now)
        }
        None => session.recompute_relative_display(now),
    };
    print_rows(&rows, format)
}

async fn run_analyze(config: AppConfig, format: &str) -> Result<()> {
    let session = open_session(&config)?;
    let client = GeminiClient::from_env(&config.analysis)?;
    let orchestrator = AnalysisOrchestrator::new(Arc::new(client));

    info!("Analyzing...");
    let outcome = orchestrator.run(session.incidents(), &Local::now()).await;
    let RunOutcome::Published(state) = outcome else {
        return Ok(());
    };

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&state)?);
        return Ok(());
    }
    let text = state.result_text.unwrap_or_default();
    println!("Risk Analysis\n=============\n");
    let rendered: String = emphasis_spans(&text)
        .into_iter()
        .map(|s| if s.bold { s.text.to_uppercase() } else { s.text })
        .collect();
    println!("{}", rendered);
    Ok(())
}

async fn run_search(config: AppConfig, query: &str, incidents: bool, format: &str) -> Result<()> {
    let geocoder = NominatimGeocoder::new(&config.map)?;
    let places = map::search_places(&geocoder, query).await;
    let session = open_session(&config)?;
    let markers = map::markers(&places, session.incidents(), incidents, Utc::now());

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&markers)?);
        return Ok(());
    }
    for place in &places {
        println!("{} ({:.5}, {:.5})", place.title, place.coordinate.latitude, place.coordinate.longitude);
    }
    if places.is_empty() {
        println!("No places found for '{}'", query);
    }
    if incidents {
        println!("\n{} incident markers", markers.len() - places.len());
    }
    Ok(())
}

fn run_clear(config: AppConfig, force: bool) -> Result<()> {
    if !force {
        eprintln!("Use --force to confirm deleting every report");
        return Ok(());
    }
    open_session(&config)?.clear_all()?;
    println!("All reports deleted");
    Ok(())
}

async fn run_status(config: AppConfig) -> Result<()> {
    println!("Flare v1.0.0 Status");
    println!("===================");

    match GeminiClient::from_env(&config.analysis) {
        Ok(client) => match client.health_check().await {
            Ok(()) => println!("Analysis: {} reachable", config.analysis.model),
            Err(e) => println!("Analysis: Error - {}", e),
        },
        Err(e) => println!("Analysis: Not configured - {}", e),
    }

    match open_session(&config) {
        Ok(session) => {
            println!("\nStore ({}):", config.store.path);
            println!("  Reports: {}", session.incidents().len());
        }
        Err(e) => println!("\nStore: Error - {}", e),
    }

    println!("\nConfiguration:");
    println!("  Model: {}", config.analysis.model);
    println!("  Home: {}, {}", config.map.home_latitude, config.map.home_longitude);

    Ok(())
}

fn run_config_command(config: AppConfig, action: ConfigCommands, config_path: &Path) -> Result<()> {
    match action {
        ConfigCommands::Show => {
            let json = serde_json::to_string_pretty(&config)?;
            println!("{}", json);
        }
        ConfigCommands::Generate { output } => {
            AppConfig::default().save(&output)?;
            println!("Generated config at {:?}", output);
        }
        ConfigCommands::Validate => {
            config.validate()?;
            println!("Configuration at {:?} is valid", config_path);
            println!("  Model: {}", config.analysis.model);
            println!("  Store: {} (key '{}')", config.store.path, config.store.key);
        }
    }

    Ok(())
}
