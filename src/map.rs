// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Map marker composition

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::warn;

use crate::geocode::{Geocoder, Place};
use crate::incident::{Coordinate, Incident};
use crate::risk::{self, RiskBand};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Marker {
    /// A geocoder search hit
    Place { label: String, coordinate: Coordinate },
    /// A reported incident, tinted by recency
    Incident { id: uuid::Uuid, coordinate: Coordinate, band: RiskBand },
}

/// Markers for search hits plus, when the incident layer is on, one per visible incident
pub fn markers(
    places: &[Place],
    incidents: &[Incident],
    show_incidents: bool,
    now: DateTime<Utc>,
) -> Vec<Marker> {
    let mut out: Vec<Marker> = places
        .iter()
        .map(|p| Marker::Place { label: p.name.clone(), coordinate: p.coordinate })
        .collect();

    if show_incidents {
        out.extend(incidents.iter().filter_map(|i| {
            let band = risk::classify(i.timestamp, now);
            band.is_visible().then(|| Marker::Incident {
                id: i.id,
                coordinate: i.coordinate(),
                band,
            })
        }));
    }
    out
}

/// Search for places; lookup failures show no results
pub async fn search_places(geocoder: &dyn Geocoder, query: &str) -> Vec<Place> {
    if query.trim().is_empty() {
        return Vec::new();
    }
    match geocoder.search(query).await {
        Ok(places) => places,
        Err(e) => {
            warn!("Place search for '{}' failed: {}", query, e);
            Vec::new()
        }
    }
}
