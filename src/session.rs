// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Report screen controller
//!
//! Owns the in-memory incident collection together with the current
//! selections. Every mutation is written through to the snapshot store before
//! it returns.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::incident::{Incident, IncidentDraft, RelativeTime};
use crate::index;
use crate::risk::{self, RiskBand};
use crate::store::IncidentStore;
use crate::Result;

/// One list row, ready for display
#[derive(Debug, Clone, Serialize)]
pub struct IncidentRow {
    pub incident: Incident,
    pub relative: String,
    pub band: RiskBand,
}

pub struct ReportSession {
    store: IncidentStore,
    incidents: Vec<Incident>,
    selected_location: Option<String>,
    selected_incident: Option<Uuid>,
}

impl ReportSession {
    /// Load the persisted collection
    pub fn open(store: IncidentStore) -> Self {
        let incidents = store.load();
        info!("Loaded {} incidents", incidents.len());
        Self {
            store,
            incidents,
            selected_location: None,
            selected_incident: None,
        }
    }

    /// Validate a report, insert it newest-first and persist the collection
    pub fn submit(&mut self, draft: IncidentDraft, now: DateTime<Utc>) -> Result<Incident> {
        let incident = draft.into_incident(now)?;
        self.incidents.insert(0, incident.clone());
        self.store.save(&self.incidents);
        info!("Submitted incident {} at '{}'", incident.id, incident.location);
        Ok(incident)
    }

    /// Replace the in-memory collection with the stored snapshot
    pub fn refresh(&mut self) {
        self.incidents = self.store.load();
        if let Some(id) = self.selected_incident {
            if !self.incidents.iter().any(|i| i.id == id) {
                self.selected_incident = None;
            }
        }
    }

    /// Raw collection, in insertion order
    pub fn incidents(&self) -> &[Incident] {
        &self.incidents
    }

    /// Every incident, newest first
    pub fn all(&self) -> Vec<Incident> {
        index::all(&self.incidents)
    }

    /// Incidents at the selected location, newest first
    pub fn location_incidents(&self) -> Vec<Incident> {
        match &self.selected_location {
            Some(label) => index::by_location(&self.incidents, label),
            None => Vec::new(),
        }
    }

    pub fn select_location(&mut self, label: Option<String>) {
        self.selected_location = label;
    }

    pub fn selected_location(&self) -> Option<&str> {
        self.selected_location.as_deref()
    }

    /// Select an incident for the detail view; unknown ids clear the selection
    pub fn select_incident(&mut self, id: Uuid) -> Option<&Incident> {
        self.selected_incident = self.incidents.iter().any(|i| i.id == id).then_some(id);
        self.selected_incident()
    }

    pub fn selected_incident(&self) -> Option<&Incident> {
        let id = self.selected_incident?;
        self.incidents.iter().find(|i| i.id == id)
    }

    pub fn clear_selection(&mut self) {
        self.selected_incident = None;
    }

    pub fn risk_band(&self, id: Uuid, now: DateTime<Utc>) -> Option<RiskBand> {
        self.incidents
            .iter()
            .find(|i| i.id == id)
            .map(|i| risk::classify(i.timestamp, now))
    }

    /// Rows for the full list with relative times and bands as of `now`.
    /// The incidents themselves are left untouched.
    pub fn recompute_relative_display(&self, now: DateTime<Utc>) -> Vec<IncidentRow> {
        rows(self.all(), now)
    }

    /// Rows for the selected location as of `now`
    pub fn location_rows(&self, now: DateTime<Utc>) -> Vec<IncidentRow> {
        rows(self.location_incidents(), now)
    }

    /// Delete every incident, in memory and on disk
    pub fn clear_all(&mut self) -> Result<()> {
        self.store.clear()?;
        self.incidents.clear();
        self.selected_incident = None;
        info!("Cleared all incidents");
        Ok(())
    }
}

fn rows(incidents: Vec<Incident>, now: DateTime<Utc>) -> Vec<IncidentRow> {
    incidents
        .into_iter()
        .map(|incident| IncidentRow {
            relative: RelativeTime::between(incident.timestamp, now).to_string(),
            band: risk::classify(incident.timestamp, now),
            incident,
        })
        .collect()
}
