// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Incident records and submission drafts

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::{FlareError, Result};

/// A persisted geotagged safety report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Incident {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub location: String,
    pub timestamp: DateTime<Utc>,
    pub latitude: f64,
    pub longitude: f64,
}

/// A latitude/longitude pair
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }
}

impl Incident {
    /// Position of this incident on the map
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude)
    }
}

/// User-entered report fields, before an identifier is assigned
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncidentDraft {
    pub title: String,
    pub description: String,
    pub location: String,
    /// Custom incident time; submission time is used when absent
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    pub latitude: f64,
    pub longitude: f64,
}

impl IncidentDraft {
    /// Check that the form is complete
    pub fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("title", &self.title),
            ("description", &self.description),
            ("location", &self.location),
        ] {
            if value.trim().is_empty() {
                return Err(FlareError::InvalidSubmission(format!("{} must not be empty", field)));
            }
        }
        if !self.latitude.is_finite() || !self.longitude.is_finite() {
            return Err(FlareError::InvalidSubmission(
                "coordinates must be finite".to_string(),
            ));
        }
        Ok(())
    }

    /// Validate and turn the draft into an incident with a fresh identifier
    pub fn into_incident(self, now: DateTime<Utc>) -> Result<Incident> {
        self.validate()?;
        Ok(Incident {
            id: Uuid::new_v4(),
            title: self.title,
            description: self.description,
            location: self.location,
            timestamp: self.timestamp.unwrap_or(now),
            latitude: self.latitude,
            longitude: self.longitude,
        })
    }
}

/// How long ago an incident happened, for list rows
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelativeTime {
    JustNow,
    MinutesAgo(i64),
    HoursAgo(i64),
    /// Older than a day: shown as an absolute date
    On(DateTime<Utc>),
}

impl RelativeTime {
    pub fn between(timestamp: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        let seconds = now.signed_duration_since(timestamp).num_seconds();
        let minutes = seconds / 60;
        let hours = minutes / 60;

        if seconds < 60 {
            Self::JustNow
        } else if minutes < 60 {
            Self::MinutesAgo(minutes)
        } else if hours < 24 {
            Self::HoursAgo(hours)
        } else {
            Self::On(timestamp)
        }
    }
}

fn plural(n: i64) -> &'static str {
    if n > 1 { "s" } else { "" }
}

impl fmt::Display for RelativeTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::JustNow => write!(f, "Just now"),
            Self::MinutesAgo(n) => write!(f, "{} minute{} ago", n, plural(*n)),
            Self::HoursAgo(n) => write!(f, "{} hour{} ago", n, plural(*n)),
            Self::On(ts) => write!(f, "{}", ts.format("%b %-d, %Y at %-I:%M %p")),
        }
    }
}
