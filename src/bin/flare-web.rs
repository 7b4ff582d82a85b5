// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Flare Web Dashboard
//!
//! Standalone web server for the report dashboard and JSON API.

use clap::Parser;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing::info;

use flare::analysis::{AnalysisOrchestrator, GeminiClient};
use flare::config::AppConfig;
use flare::geocode::NominatimGeocoder;
use flare::session::ReportSession;
use flare::sheet::BottomSheetController;
use flare::store::IncidentStore;
use flare::web::AppState;
use flare::Result;

#[derive(Parser, Debug)]
#[command(name = "flare-web")]
#[command(author = "Jonathan D. A. Jewell <hyperpolymath>")]
#[command(version = "1.0.0")]
#[command(about = "Flare Web Dashboard Server")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.json")]
    config: PathBuf,

    /// Host to bind to
    #[arg(short = 'H', long)]
    host: Option<String>,

    /// Port to listen on
    #[arg(short, long)]
    port: Option<u16>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize tracing
    let filter = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    info!("Flare Web Dashboard v1.0.0");

    // Load config
    let mut config = AppConfig::load(&args.config)?;

    // Apply CLI overrides
    if let Some(host) = args.host {
        config.web.host = host;
    }
    if let Some(port) = args.port {
        config.web.port = port;
    }

    let store = IncidentStore::open(&config.store.path, &config.store.key)?;
    info!("Store: {}", config.store.path);

    let backend = GeminiClient::from_env(&config.analysis)?;
    let geocoder = NominatimGeocoder::new(&config.map)?;
    let sheet = BottomSheetController::from_config(&config.sheet)?;

    let state = AppState {
        session: Mutex::new(ReportSession::open(store)),
        sheet: Mutex::new(sheet),
        analysis: Arc::new(AnalysisOrchestrator::new(Arc::new(backend))),
        geocoder: Arc::new(geocoder),
        config,
    };

    flare::web::start_server(state).await
}
