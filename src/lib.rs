// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Flare: geotagged safety-incident reporting
//!
//! Incidents are persisted as a whole-collection snapshot, grouped by location,
//! tinted by recency, and handed to a generative model for a daily pattern analysis.

pub mod analysis;
pub mod config;
pub mod error;
pub mod geocode;
pub mod incident;
pub mod index;
pub mod map;
pub mod risk;
pub mod session;
pub mod sheet;
pub mod store;
pub mod web;

pub use config::AppConfig;
pub use error::{FlareError, Result};
pub use incident::{Incident, IncidentDraft};
pub use risk::RiskBand;
