// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Place search used to populate map markers

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::config::MapConfig;
use crate::incident::Coordinate;
use crate::Result;

/// A search hit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
    pub name: String,
    /// Full address line, used as the incident location label
    pub title: String,
    pub coordinate: Coordinate,
}

/// Read-only place lookup
#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<Place>>;
}

/// Nominatim-compatible HTTP geocoder, biased to the home region
pub struct NominatimGeocoder {
    client: Client,
    base_url: String,
    viewbox: String,
}

#[derive(Deserialize)]
struct SearchHit {
    #[serde(default)]
    name: Option<String>,
    display_name: String,
    lat: String,
    lon: String,
}

impl SearchHit {
    fn into_place(self) -> Option<Place> {
        let latitude = self.lat.parse().ok()?;
        let longitude = self.lon.parse().ok()?;
        let name = match self.name {
            Some(n) if !n.is_empty() => n,
            _ => self.display_name.split(',').next().unwrap_or_default().trim().to_string(),
        };
        Some(Place {
            name,
            title: self.display_name,
            coordinate: Coordinate::new(latitude, longitude),
        })
    }
}

/// `left,top,right,bottom` box of `meters` around the home coordinate
fn viewbox(config: &MapConfig) -> String {
    const METERS_PER_DEGREE: f64 = 111_320.0;
    let half = config.region_meters / 2.0;
    let dlat = half / METERS_PER_DEGREE;
    let dlon = half / (METERS_PER_DEGREE * config.home_latitude.to_radians().cos().max(0.01));
    format!(
        "{},{},{},{}",
        config.home_longitude - dlon,
        config.home_latitude + dlat,
        config.home_longitude + dlon,
        config.home_latitude - dlat,
    )
}

impl NominatimGeocoder {
    pub fn new(config: &MapConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(15))
            .user_agent(concat!("flare/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: config.geocoder_url.trim_end_matches('/').to_string(),
            viewbox: viewbox(config),
        })
    }
}

#[async_trait]
impl Geocoder for NominatimGeocoder {
    async fn search(&self, query: &str) -> Result<Vec<Place>> {
        let url = format!("{}/search", self.base_url);
        debug!("Geocoding '{}'", query);

        let response = self.client
            .get(&url)
            .query(&[("q", query), ("format", "jsonv2"), ("viewbox", self.viewbox.as_str())])
            .send()
            .await?
            .error_for_status()?;

        let hits: Vec<SearchHit> = response.json().await?;
        Ok(hits.into_iter().filter_map(SearchHit::into_place).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_conversion() {
        let hits: Vec<SearchHit> = serde_json::from_str(r#"[
            {"name": "Bayfront Park", "display_name": "Bayfront Park, Miami, Florida", "lat": "25.7753", "lon": "-80.1860"},
            {"display_name": "Brickell, Miami", "lat": "25.7617", "lon": "-80.1918"},
            {"display_name": "Broken", "lat": "north", "lon": "-80.0"}
        ]"#).unwrap();

        let places: Vec<Place> = hits.into_iter().filter_map(SearchHit::into_place).collect();
        assert_eq!(places.len(), 2);
        assert_eq!(places[0].name, "Bayfront Park");
        assert_eq!(places[0].title, "Bayfront Park, Miami, Florida");
        assert_eq!(places[1].name, "Brickell");
        assert_eq!(places[1].coordinate, Coordinate::new(25.7617, -80.1918));
    }

    #[test]
    fn test_viewbox_surrounds_home() {
        let config = MapConfig::default();
        let parts: Vec<f64> = viewbox(&config).split(',').map(|p| p.parse().unwrap()).collect();
        assert!(parts[0] < config.home_longitude && parts[2] > config.home_longitude);
        assert!(parts[1] > config.home_latitude && parts[3] < config.home_latitude);
    }
}
