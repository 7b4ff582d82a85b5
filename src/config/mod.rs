// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Configuration management for Flare

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main application configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    /// Generative analysis engine
    #[serde(default)]
    pub analysis: AnalysisConfig,

    /// Snapshot store settings
    #[serde(default)]
    pub store: StoreConfig,

    /// Bottom sheet geometry
    #[serde(default)]
    pub sheet: SheetConfig,

    /// Map and geocoder settings
    #[serde(default)]
    pub map: MapConfig,

    /// Web UI settings
    #[serde(default)]
    pub web: WebConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AnalysisConfig {
    #[serde(default = "default_analysis_url")]
    pub url: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// Environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_top_p")]
    pub top_p: f32,
    #[serde(default = "default_top_k")]
    pub top_k: u32,
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct StoreConfig {
    #[serde(default = "default_store_path")]
    pub path: String,
    /// Key of the snapshot record
    #[serde(default = "default_store_key")]
    pub key: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SheetConfig {
    #[serde(default = "default_viewport_height")]
    pub viewport_height: f64,
    #[serde(default = "default_min_fraction")]
    pub min_fraction: f64,
    #[serde(default = "default_max_fraction")]
    pub max_fraction: f64,
    #[serde(default = "default_snap_duration_ms")]
    pub snap_duration_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct MapConfig {
    #[serde(default = "default_home_latitude")]
    pub home_latitude: f64,
    #[serde(default = "default_home_longitude")]
    pub home_longitude: f64,
    #[serde(default = "default_region_meters")]
    pub region_meters: f64,
    #[serde(default = "default_geocoder_url")]
    pub geocoder_url: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct WebConfig {
    #[serde(default = "default_web_host")]
    pub host: String,
    #[serde(default = "default_web_port")]
    pub port: u16,
}

// Default value functions
fn default_analysis_url() -> String { "https://generativelanguage.googleapis.com/v1beta".to_string() }
fn default_model() -> String { "gemini-1.5-pro-002".to_string() }
fn default_api_key_env() -> String { "GEMINI_API_KEY".to_string() }
fn default_temperature() -> f32 { 1.0 }
fn default_top_p() -> f32 { 0.95 }
fn default_top_k() -> u32 { 40 }
fn default_max_output_tokens() -> u32 { 8192 }
fn default_timeout() -> u64 { 120 }
fn default_store_path() -> String { "flare.db".to_string() }
fn default_store_key() -> String { "alerts".to_string() }
fn default_viewport_height() -> f64 { 852.0 }
fn default_min_fraction() -> f64 { 0.51 }
fn default_max_fraction() -> f64 { 0.93 }
fn default_snap_duration_ms() -> u64 { 350 }
fn default_home_latitude() -> f64 { 25.7602 }
fn default_home_longitude() -> f64 { -80.1959 }
fn default_region_meters() -> f64 { 10_000.0 }
fn default_geocoder_url() -> String { "https://nominatim.openstreetmap.org".to_string() }
fn default_web_host() -> String { "127.0.0.1".to_string() }
fn default_web_port() -> u16 { 8080 }

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            analysis: AnalysisConfig::default(),
            store: StoreConfig::default(),
            sheet: SheetConfig::default(),
            map: MapConfig::default(),
            web: WebConfig::default(),
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            url: default_analysis_url(),
            model: default_model(),
            api_key_env: default_api_key_env(),
            temperature: default_temperature(),
            top_p: default_top_p(),
            top_k: default_top_k(),
            max_output_tokens: default_max_output_tokens(),
            timeout_secs: default_timeout(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
            key: default_store_key(),
        }
    }
}

impl Default for SheetConfig {
    fn default() -> Self {
        Self {
            viewport_height: default_viewport_height(),
            min_fraction: default_min_fraction(),
            max_fraction: default_max_fraction(),
            snap_duration_ms: default_snap_duration_ms(),
        }
    }
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            home_latitude: default_home_latitude(),
            home_longitude: default_home_longitude(),
            region_meters: default_region_meters(),
            geocoder_url: default_geocoder_url(),
        }
    }
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            host: default_web_host(),
            port: default_web_port(),
        }
    }
}

impl AnalysisConfig {
    /// Read the API key from the configured environment variable
    pub fn api_key(&self) -> crate::Result<String> {
        std::env::var(&self.api_key_env).map_err(|_| {
            crate::FlareError::Config(format!("{} is not set", self.api_key_env))
        })
    }
}

impl AppConfig {
    /// Load configuration from a JSON file
    pub fn load(path: &Path) -> crate::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Self = serde_json::from_str(&content)
                .map_err(|e| crate::FlareError::Config(format!("Failed to parse config: {}", e)))?;
            config.validate()?;
            Ok(config)
        } else {
            tracing::info!("Config file not found at {:?}, using defaults", path);
            Ok(Self::default())
        }
    }

    /// Save configuration to a JSON file
    pub fn save(&self, path: &Path) -> crate::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Reject values the rest of the system cannot work with
    pub fn validate(&self) -> crate::Result<()> {
        let sheet = &self.sheet;
        if !(sheet.viewport_height.is_finite() && sheet.viewport_height > 0.0) {
            return Err(crate::FlareError::Config(
                "sheet.viewport_height must be a positive number".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&sheet.min_fraction)
            || !(0.0..=1.0).contains(&sheet.max_fraction)
            || sheet.min_fraction > sheet.max_fraction
        {
            return Err(crate::FlareError::Config(format!(
                "sheet fractions must satisfy 0 <= min ({}) <= max ({}) <= 1",
                sheet.min_fraction, sheet.max_fraction
            )));
        }
        if self.store.key.trim().is_empty() {
            return Err(crate::FlareError::Config("store.key must not be empty".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load(&dir.path().join("absent.json")).unwrap();
        assert_eq!(config.analysis.model, "gemini-1.5-pro-002");
        assert_eq!(config.analysis.top_k, 40);
        assert_eq!(config.store.key, "alerts");
        assert_eq!(config.sheet.min_fraction, 0.51);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "web": { "port": 9090 } }"#).unwrap();

        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.web.port, 9090);
        assert_eq!(config.web.host, "127.0.0.1");
        assert_eq!(config.map.home_latitude, 25.7602);
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let mut config = AppConfig::default();
        config.store.path = "elsewhere.db".to_string();
        config.save(&path).unwrap();

        let loaded = AppConfig::load(&path).unwrap();
        assert_eq!(loaded.store.path, "elsewhere.db");
    }

    #[test]
    fn test_inverted_fractions_rejected() {
        let mut config = AppConfig::default();
        config.sheet.min_fraction = 0.9;
        config.sheet.max_fraction = 0.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_garbage_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(matches!(AppConfig::load(&path), Err(crate::FlareError::Config(_))));
    }
}
