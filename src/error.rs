// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Error types for Flare

use thiserror::Error;

/// Result type alias for Flare operations
pub type Result<T> = std::result::Result<T, FlareError>;

/// Flare error types
#[derive(Error, Debug)]
pub enum FlareError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("File system error: {0}")]
    FileSystem(#[from] std::io::Error),

    #[error("API error: {0}")]
    Api(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Analysis service unavailable: {0}")]
    AnalysisUnavailable(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Invalid submission: {0}")]
    InvalidSubmission(String),

    #[error("Invalid sheet bounds: {0}")]
    InvalidBounds(String),
}
