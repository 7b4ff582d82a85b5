// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Daily pattern analysis of incident locations
//!
//! The orchestrator filters today's incidents, composes the prompt, calls the
//! injected [`AnalysisBackend`] and publishes the outcome on a watch channel.
//! A new run supersedes any run still in flight: the old call is aborted and
//! its result is never published.

pub mod gemini;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tokio::task::AbortHandle;
use tracing::{debug, info, warn};

use crate::incident::{Coordinate, Incident};
use crate::Result;

pub use gemini::GeminiClient;

/// Published when the backend returns no text
pub const NO_ANALYSIS: &str = "No Analysis Performed";

/// Published when the backend fails, whatever the cause
pub const ANALYSIS_ERROR: &str = "Error Generating AI Analysis";

/// Fixed system instruction sent with every request
pub const SYSTEM_INSTRUCTION: &str = "Analyze the following geographical data and provide relevant \
insights, trends, or patterns based on the following alert location. Cater it towards women's \
safety. The goal is to be protected and minimize exposure to high risk areas";

/// Everything the backend needs for one request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisPayload {
    pub coordinates: Vec<Coordinate>,
    pub system_instruction: String,
    pub message: String,
}

impl AnalysisPayload {
    /// Build the request from incidents that fall on the same calendar day as `now`
    /// (in `now`'s time zone), keeping their collection order.
    pub fn for_day<Tz: TimeZone>(incidents: &[Incident], now: &DateTime<Tz>) -> Self {
        let tz = now.timezone();
        let today = now.date_naive();
        let coordinates: Vec<Coordinate> = incidents
            .iter()
            .filter(|i| i.timestamp.with_timezone(&tz).date_naive() == today)
            .map(Incident::coordinate)
            .collect();
        Self::from_coordinates(coordinates)
    }

    pub fn from_coordinates(coordinates: Vec<Coordinate>) -> Self {
        let listing = coordinates
            .iter()
            .map(|c| format!("Latitude: {}, Longitude: {}", c.latitude, c.longitude))
            .collect::<Vec<_>>()
            .join("\n");

        let message = format!(
            "Here are the coordinates of the alerts submitted today:\n{}\n\n\
             Please analyze these locations and provide insights related to any patterns, \
             geographical trends, or anything that stands out.\n\
             Any relevant details about distances, high risk clusters, frequencies of alerts \
             from same locations, or patterns should be highlighted. Also, check for unusual \
             patterns based on the locations and perform a risk analysis.",
            listing
        );

        Self {
            coordinates,
            system_instruction: SYSTEM_INSTRUCTION.to_string(),
            message,
        }
    }
}

/// External generative-analysis service
#[async_trait]
pub trait AnalysisBackend: Send + Sync {
    /// Run one analysis. `Ok(None)` means the service answered without text.
    async fn analyze(&self, payload: &AnalysisPayload) -> Result<Option<String>>;
}

/// Published analysis state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisState {
    pub pending: bool,
    pub result_text: Option<String>,
    /// Set when the last completed run failed
    pub error: bool,
}

/// How a call to [`AnalysisOrchestrator::run`] ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// This run's result was published
    Published(AnalysisState),
    /// A later run took over before this one finished
    Superseded,
}

struct InFlight {
    generation: u64,
    abort: AbortHandle,
}

pub struct AnalysisOrchestrator {
    backend: Arc<dyn AnalysisBackend>,
    state: watch::Sender<AnalysisState>,
    generation: AtomicU64,
    in_flight: Mutex<Option<InFlight>>,
}

impl AnalysisOrchestrator {
    pub fn new(backend: Arc<dyn AnalysisBackend>) -> Self {
        let (state, _) = watch::channel(AnalysisState::default());
        Self {
            backend,
            state,
            generation: AtomicU64::new(0),
            in_flight: Mutex::new(None),
        }
    }

    /// Current published state
    pub fn state(&self) -> AnalysisState {
        self.state.borrow().clone()
    }

    /// Receive every published state change
    pub fn subscribe(&self) -> watch::Receiver<AnalysisState> {
        self.state.subscribe()
    }

    /// Analyze today's incidents. Waits for the backend and publishes the result,
    /// unless a newer run supersedes this one first.
    pub async fn run<Tz: TimeZone>(&self, incidents: &[Incident], now: &DateTime<Tz>) -> RunOutcome {
        let payload = AnalysisPayload::for_day(incidents, now);
        info!("Requesting analysis of {} incidents from today", payload.coordinates.len());
        self.run_payload(payload).await
    }

    /// Send a prepared payload to the backend (last caller wins)
    pub async fn run_payload(&self, payload: AnalysisPayload) -> RunOutcome {
        let backend = Arc::clone(&self.backend);
        let (generation, handle) = {
            let mut in_flight = self.lock_in_flight();
            if let Some(previous) = in_flight.take() {
                debug!("Superseding analysis run {}", previous.generation);
                previous.abort.abort();
            }
            let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
            let handle = tokio::spawn(async move { backend.analyze(&payload).await });
            *in_flight = Some(InFlight { generation, abort: handle.abort_handle() });
            self.state.send_modify(|s| s.pending = true);
            (generation, handle)
        };

        let mut guard = RunGuard { orchestrator: self, generation, armed: true };
        let joined = handle.await;
        guard.armed = false;

        let mut in_flight = self.lock_in_flight();
        if in_flight.as_ref().map(|f| f.generation) != Some(generation) {
            return RunOutcome::Superseded;
        }
        *in_flight = None;

        let next = match joined {
            Ok(Ok(Some(text))) if !text.trim().is_empty() => AnalysisState {
                pending: false,
                result_text: Some(text),
                error: false,
            },
            Ok(Ok(_)) => AnalysisState {
                pending: false,
                result_text: Some(NO_ANALYSIS.to_string()),
                error: false,
            },
            Ok(Err(e)) => {
                warn!("Analysis request failed: {}", e);
                failed_state()
            }
            Err(e) => {
                warn!("Analysis task ended abnormally: {}", e);
                failed_state()
            }
        };
        self.state.send_replace(next.clone());
        RunOutcome::Published(next)
    }

    fn lock_in_flight(&self) -> std::sync::MutexGuard<'_, Option<InFlight>> {
        // Holders never panic, but recover the guard rather than propagate poison
        self.in_flight.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Cleans up after a run whose caller stopped waiting before it finished
struct RunGuard<'a> {
    orchestrator: &'a AnalysisOrchestrator,
    generation: u64,
    armed: bool,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut in_flight = self.orchestrator.lock_in_flight();
        if in_flight.as_ref().map(|f| f.generation) != Some(self.generation) {
            return;
        }
        if let Some(abandoned) = in_flight.take() {
            debug!("Analysis run {} dropped by its caller", abandoned.generation);
            abandoned.abort.abort();
        }
        self.orchestrator.state.send_modify(|s| s.pending = false);
    }
}

fn failed_state() -> AnalysisState {
    AnalysisState {
        pending: false,
        result_text: Some(ANALYSIS_ERROR.to_string()),
        error: true,
    }
}

/// Piece of analysis text with emphasis
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Span {
    pub text: String,
    pub bold: bool,
}

/// Split analysis text on `*` markers; text between a pair of markers is bold.
pub fn emphasis_spans(text: &str) -> Vec<Span> {
    text.split('*')
        .enumerate()
        .filter(|(_, part)| !part.is_empty())
        .map(|(i, part)| Span { text: part.to_string(), bold: i % 2 == 1 })
        .collect()
}
