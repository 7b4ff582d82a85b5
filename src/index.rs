// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Derived views over the in-memory incident collection.
//!
//! Views are recomputed on every call and never cached, so they cannot drift
//! from the source collection.

use crate::incident::Incident;

/// Incidents whose location matches `label`, ignoring case, newest first
pub fn by_location(incidents: &[Incident], label: &str) -> Vec<Incident> {
    let wanted = label.to_lowercase();
    let mut matches: Vec<Incident> = incidents
        .iter()
        .filter(|i| i.location.to_lowercase() == wanted)
        .cloned()
        .collect();
    sort_newest_first(&mut matches);
    matches
}

/// The full collection, newest first
pub fn all(incidents: &[Incident]) -> Vec<Incident> {
    let mut sorted = incidents.to_vec();
    sort_newest_first(&mut sorted);
    sorted
}

fn sort_newest_first(incidents: &mut [Incident]) {
    // Stable: equal timestamps keep their collection order
    incidents.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use uuid::Uuid;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 11, 14, 12, 0, 0).unwrap()
    }

    fn incident(title: &str, location: &str, timestamp: DateTime<Utc>) -> Incident {
        Incident {
            id: Uuid::new_v4(),
            title: title.to_string(),
            description: "details".to_string(),
            location: location.to_string(),
            timestamp,
            latitude: 25.76,
            longitude: -80.19,
        }
    }

    #[test]
    fn test_all_sorts_descending() {
        let a = incident("A", "Main St", t0());
        let b = incident("B", "Main St", t0() + Duration::seconds(1));
        assert_eq!(all(&[a.clone(), b.clone()]), vec![b, a]);
    }

    #[test]
    fn test_location_match_ignores_case() {
        let upper = incident("A", "Main St", t0());
        let lower = incident("B", "main st", t0() + Duration::minutes(5));
        let other = incident("C", "Oak Ave", t0());
        let collection = vec![upper.clone(), other, lower.clone()];

        assert_eq!(by_location(&collection, "MAIN ST"), vec![lower, upper]);
    }

    #[test]
    fn test_location_match_is_exact() {
        let collection = vec![incident("A", "Main St North", t0())];
        assert!(by_location(&collection, "Main St").is_empty());
    }

    #[test]
    fn test_no_match_is_empty() {
        let collection = vec![incident("A", "Main St", t0())];
        assert!(by_location(&collection, "Nowhere").is_empty());
        assert!(by_location(&[], "Main St").is_empty());
    }

    #[test]
    fn test_views_leave_source_untouched() {
        let a = incident("A", "Main St", t0());
        let b = incident("B", "Main St", t0() + Duration::hours(1));
        let collection = vec![a.clone(), b.clone()];
        let _ = all(&collection);
        let _ = by_location(&collection, "main st");
        assert_eq!(collection, vec![a, b]);
    }
}
