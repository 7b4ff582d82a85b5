// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Recency risk bands for map markers

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Visual emphasis derived from how long ago an incident happened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskBand {
    Critical,
    Elevated,
    Moderate,
    Low,
    None,
}

/// Classify an incident by whole days elapsed between `timestamp` and `now`.
///
/// Partial days are truncated, so 6.9 days ago is still six days ago.
/// Timestamps in the future count as today.
pub fn classify(timestamp: DateTime<Utc>, now: DateTime<Utc>) -> RiskBand {
    let days_ago = now.signed_duration_since(timestamp).num_days();

    match days_ago {
        d if d < 1 => RiskBand::Critical,
        d if d < 7 => RiskBand::Elevated,
        d if d < 30 => RiskBand::Moderate,
        d if d < 90 => RiskBand::Low,
        _ => RiskBand::None,
    }
}

impl RiskBand {
    /// Marker tint name
    pub fn tint(self) -> &'static str {
        match self {
            Self::Critical => "red",
            Self::Elevated => "orange",
            Self::Moderate => "yellow",
            Self::Low => "gray",
            Self::None => "clear",
        }
    }

    /// CSS colour for the web dashboard
    pub fn css_color(self) -> &'static str {
        match self {
            Self::Critical => "#ff3b30",
            Self::Elevated => "#ff9500",
            Self::Moderate => "#ffcc00",
            Self::Low => "#8e8e93",
            Self::None => "transparent",
        }
    }

    /// Whether a marker in this band is drawn at all
    pub fn is_visible(self) -> bool {
        self != Self::None
    }
}

impl fmt::Display for RiskBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Critical => "CRITICAL",
            Self::Elevated => "ELEVATED",
            Self::Moderate => "MODERATE",
            Self::Low => "LOW",
            Self::None => "NONE",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 11, 14, 12, 0, 0).unwrap()
    }

    fn aged(d: Duration) -> RiskBand {
        classify(now() - d, now())
    }

    #[test]
    fn test_band_boundaries() {
        assert_eq!(aged(Duration::zero()), RiskBand::Critical);
        assert_eq!(aged(Duration::hours(23)), RiskBand::Critical);
        assert_eq!(aged(Duration::days(1)), RiskBand::Elevated);
        // 6.9 days
        assert_eq!(aged(Duration::minutes(6 * 1440 + 1296)), RiskBand::Elevated);
        assert_eq!(aged(Duration::days(7)), RiskBand::Moderate);
        assert_eq!(aged(Duration::days(29)), RiskBand::Moderate);
        assert_eq!(aged(Duration::days(30)), RiskBand::Low);
        assert_eq!(aged(Duration::days(89)), RiskBand::Low);
        assert_eq!(aged(Duration::days(90)), RiskBand::None);
        assert_eq!(aged(Duration::days(400)), RiskBand::None);
    }

    #[test]
    fn test_future_is_critical() {
        assert_eq!(aged(-Duration::days(3)), RiskBand::Critical);
    }

    #[test]
    fn test_band_follows_caller_clock() {
        let ts = now() - Duration::hours(12);
        assert_eq!(classify(ts, now()), RiskBand::Critical);
        assert_eq!(classify(ts, now() + Duration::days(10)), RiskBand::Moderate);
    }

    #[test]
    fn test_only_none_is_hidden() {
        assert!(RiskBand::Low.is_visible());
        assert!(!RiskBand::None.is_visible());
        assert_eq!(RiskBand::Critical.tint(), "red");
        assert_eq!(RiskBand::Elevated.to_string(), "ELEVATED");
    }
}
