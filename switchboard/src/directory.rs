//! Provider directory port.
//!
//! Lookup is an external concern (a places API in production); the engine
//! consumes it behind a trait. An empty result is a valid, reportable
//! outcome — "no providers found" is mission news, not an error.

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use shared_types::{Provider, ProviderId, ServiceCategory, TimeWindow};

#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("directory request failed: {0}")]
    Transport(String),
}

#[async_trait]
pub trait ProviderDirectory: Send + Sync {
    async fn lookup(
        &self,
        category: ServiceCategory,
        location: &str,
    ) -> Result<Vec<Provider>, DirectoryError>;
}

/// In-memory directory over a seeded provider list.
///
/// Filters by category, then narrows by location substring against
/// city/postal-code/address. If the location matches nothing, the full
/// category list stands — a vague location should widen the search, not
/// empty it.
pub struct StaticDirectory {
    providers: Vec<Provider>,
}

impl StaticDirectory {
    pub fn new(providers: Vec<Provider>) -> Self {
        Self { providers }
    }

    /// A small San Francisco provider set for demos and tests.
    pub fn seeded() -> Self {
        Self::new(seed_providers())
    }
}

#[async_trait]
impl ProviderDirectory for StaticDirectory {
    async fn lookup(
        &self,
        category: ServiceCategory,
        location: &str,
    ) -> Result<Vec<Provider>, DirectoryError> {
        let in_category: Vec<Provider> = self
            .providers
            .iter()
            .filter(|p| p.category == category)
            .cloned()
            .collect();

        let needle = location.trim().to_lowercase();
        if needle.is_empty() {
            return Ok(in_category);
        }

        let narrowed: Vec<Provider> = in_category
            .iter()
            .filter(|p| {
                p.city.to_lowercase().contains(&needle)
                    || p.postal_code.contains(&needle)
                    || p.address.to_lowercase().contains(&needle)
            })
            .cloned()
            .collect();

        Ok(if narrowed.is_empty() { in_category } else { narrowed })
    }
}

fn window(day: &str, start: (u32, u32), end: (u32, u32)) -> TimeWindow {
    let day: NaiveDate = day.parse().unwrap_or_default();
    let make = |(h, m): (u32, u32)| NaiveTime::from_hms_opt(h, m, 0).unwrap_or_default();
    TimeWindow {
        day,
        start: make(start),
        end: make(end),
    }
}

#[allow(clippy::too_many_arguments)]
fn provider(
    id: &str,
    name: &str,
    category: ServiceCategory,
    address: &str,
    postal_code: &str,
    phone: &str,
    rating: f64,
    distance_miles: f64,
    offered_windows: Vec<TimeWindow>,
) -> Provider {
    Provider {
        id: ProviderId(id.to_string()),
        name: name.to_string(),
        category,
        address: address.to_string(),
        city: "San Francisco".to_string(),
        postal_code: postal_code.to_string(),
        phone: phone.to_string(),
        rating,
        distance_miles,
        offered_windows,
    }
}

fn seed_providers() -> Vec<Provider> {
    vec![
        provider(
            "med-1",
            "CityHealth Medical Center",
            ServiceCategory::Medical,
            "123 Main St",
            "94102",
            "(415) 555-0101",
            4.8,
            1.2,
            vec![
                window("2026-02-09", (9, 0), (9, 30)),
                window("2026-02-10", (14, 0), (14, 30)),
            ],
        ),
        provider(
            "med-2",
            "Bay Area Family Practice",
            ServiceCategory::Medical,
            "456 Oak Ave",
            "94103",
            "(415) 555-0102",
            4.5,
            2.4,
            vec![window("2026-02-09", (10, 30), (11, 0))],
        ),
        provider(
            "med-3",
            "Pacific Heights Dental",
            ServiceCategory::Medical,
            "789 Pine St",
            "94108",
            "(415) 555-0103",
            4.9,
            0.8,
            vec![
                window("2026-02-10", (8, 0), (8, 30)),
                window("2026-02-10", (15, 0), (15, 30)),
            ],
        ),
        provider(
            "auto-1",
            "Golden Gate Auto Service",
            ServiceCategory::Auto,
            "100 Geary St",
            "94108",
            "(415) 555-0201",
            4.7,
            1.5,
            vec![window("2026-02-09", (8, 0), (9, 0))],
        ),
        provider(
            "auto-2",
            "Mission District Motors",
            ServiceCategory::Auto,
            "200 Mission St",
            "94105",
            "(415) 555-0202",
            4.4,
            2.8,
            vec![window("2026-02-11", (9, 0), (10, 0))],
        ),
        provider(
            "beauty-1",
            "Luxe Hair Studio",
            ServiceCategory::Beauty,
            "50 Grant Ave",
            "94108",
            "(415) 555-0301",
            4.9,
            1.0,
            vec![window("2026-02-09", (10, 0), (11, 0))],
        ),
        provider(
            "home-1",
            "ProFix Plumbing",
            ServiceCategory::Home,
            "500 Howard St",
            "94105",
            "(415) 555-0401",
            4.5,
            3.5,
            vec![window("2026-02-10", (8, 0), (10, 0))],
        ),
        provider(
            "home-2",
            "SparkClean Services",
            ServiceCategory::Home,
            "600 Market St",
            "94104",
            "(415) 555-0402",
            4.8,
            1.1,
            vec![window("2026-02-09", (9, 0), (12, 0))],
        ),
    ]
}
