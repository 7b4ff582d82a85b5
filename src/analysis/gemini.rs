// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Gemini `generateContent` client

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::{AnalysisBackend, AnalysisPayload};
use crate::config::AnalysisConfig;
use crate::{FlareError, Result};

const API_KEY_HEADER: &str = "x-goog-api-key";

/// Gemini API client
pub struct GeminiClient {
    client: Client,
    base_url: String,
    model: String,
    api_key: String,
    generation: GenerationConfig,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    system_instruction: Content<'a>,
    contents: Vec<Content<'a>>,
    generation_config: &'a GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize, Clone)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    top_p: f32,
    top_k: u32,
    max_output_tokens: u32,
    response_mime_type: &'static str,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

impl GenerateResponse {
    /// Concatenated text of the first candidate, if any
    fn text(self) -> Option<String> {
        let content = self.candidates.into_iter().next()?.content?;
        let text: String = content.parts.into_iter().filter_map(|p| p.text).collect();
        if text.is_empty() { None } else { Some(text) }
    }
}

impl GeminiClient {
    /// Create a new client
    pub fn new(config: &AnalysisConfig, api_key: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key,
            generation: GenerationConfig {
                temperature: config.temperature,
                top_p: config.top_p,
                top_k: config.top_k,
                max_output_tokens: config.max_output_tokens,
                response_mime_type: "text/plain",
            },
        })
    }

    /// Build a client with the key taken from the environment
    pub fn from_env(config: &AnalysisConfig) -> Result<Self> {
        Self::new(config, config.api_key()?)
    }

    /// Check that the API answers for the configured model
    pub async fn health_check(&self) -> Result<()> {
        let url = format!("{}/models/{}", self.base_url, self.model);

        let response = self.client
            .get(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .timeout(Duration::from_secs(10))
            .send()
            .await
            .map_err(|e| {
                FlareError::AnalysisUnavailable(format!(
                    "Cannot reach {}: {}",
                    self.base_url,
                    e.without_url()
                ))
            })?;

        if !response.status().is_success() {
            return Err(FlareError::AnalysisUnavailable(format!(
                "Model {} returned status {}",
                self.model,
                response.status()
            )));
        }
        Ok(())
    }

    /// Generate text for a prompt under a system instruction
    pub async fn generate(&self, system_instruction: &str, message: &str) -> Result<Option<String>> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);

        let request = GenerateRequest {
            system_instruction: Content { role: None, parts: vec![Part { text: system_instruction }] },
            contents: vec![Content { role: Some("user"), parts: vec![Part { text: message }] }],
            generation_config: &self.generation,
        };

        debug!("Sending request to Gemini: model={}", self.model);

        let response = self.client
            .post(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(reqwest::Error::without_url)?;

        if !response.status().is_success() {
            return Err(FlareError::AnalysisUnavailable(format!(
                "Gemini returned status {}",
                response.status()
            )));
        }

        let body = response.text().await.map_err(reqwest::Error::without_url)?;
        let parsed: GenerateResponse = serde_json::from_str(&body)
            .map_err(|e| FlareError::MalformedResponse(e.to_string()))?;
        debug!("Gemini response received");
        Ok(parsed.text())
    }
}

#[async_trait]
impl AnalysisBackend for GeminiClient {
    async fn analyze(&self, payload: &AnalysisPayload) -> Result<Option<String>> {
        self.generate(&payload.system_instruction, &payload.message).await
    }
}
