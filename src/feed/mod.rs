//! NeoWs asteroid feed.
//!
//! Builds feed requests, flattens the feed payload into [`Asteroid`]
//! rows, and loads rows cache-first through an [`AsteroidSource`].

pub mod client;

pub use client::NeoFeedClient;

use crate::cache::JsonCache;
use crate::error::FeedError;
use crate::models::Asteroid;
use chrono::{Days, NaiveDate};
use serde::Deserialize;
use std::collections::BTreeMap;
use tracing::{info, warn};

/// Date format used by the feed and on the command line.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// A date window to fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedRequest {
    pub start_date: NaiveDate,
    pub span_days: u32,
}

impl FeedRequest {
    pub fn new(start_date: NaiveDate, span_days: u32) -> Self {
        Self {
            start_date,
            span_days,
        }
    }

    /// Parse a `YYYY-MM-DD` start date.
    pub fn parse(start_date: &str, span_days: u32) -> Result<Self, FeedError> {
        let start_date = NaiveDate::parse_from_str(start_date, DATE_FORMAT).map_err(|e| {
            FeedError::InvalidRequest(format!("invalid start date '{}': {}", start_date, e))
        })?;
        Ok(Self::new(start_date, span_days))
    }

    pub fn end_date(&self) -> Result<NaiveDate, FeedError> {
        self.start_date
            .checked_add_days(Days::new(u64::from(self.span_days)))
            .ok_or_else(|| {
                FeedError::InvalidRequest(format!(
                    "span of {} days overflows the calendar",
                    self.span_days
                ))
            })
    }

    /// Cache key for this window. Same window, same key.
    pub fn cache_key(&self) -> String {
        format!(
            "asteroid_cache_{}_{}.json",
            self.start_date.format(DATE_FORMAT),
            self.span_days
        )
    }
}

/// Something that can fetch asteroid rows for a window.
pub trait AsteroidSource {
    async fn fetch_asteroids(&self, request: &FeedRequest) -> Result<Vec<Asteroid>, FeedError>;
}

#[derive(Debug, Deserialize)]
struct FeedResponse {
    #[serde(default)]
    near_earth_objects: BTreeMap<String, Vec<NeoObject>>,
}

#[derive(Debug, Deserialize)]
struct NeoObject {
    name: String,
    estimated_diameter: EstimatedDiameter,
    is_potentially_hazardous_asteroid: bool,
}

#[derive(Debug, Deserialize)]
struct EstimatedDiameter {
    kilometers: DiameterRange,
}

#[derive(Debug, Deserialize)]
struct DiameterRange {
    estimated_diameter_min: f64,
    estimated_diameter_max: f64,
}

/// Flatten a feed payload into rows, largest max diameter first.
pub fn flatten_feed(body: &str) -> Result<Vec<Asteroid>, FeedError> {
    let response: FeedResponse = serde_json::from_str(body)?;

    let mut asteroids: Vec<Asteroid> = response
        .near_earth_objects
        .into_iter()
        .flat_map(|(date, objects)| {
            objects.into_iter().map(move |neo| Asteroid {
                date: date.clone(),
                name: neo.name,
                min_diameter_m: neo.estimated_diameter.kilometers.estimated_diameter_min * 1000.0,
                max_diameter_m: neo.estimated_diameter.kilometers.estimated_diameter_max * 1000.0,
                is_hazardous: neo.is_potentially_hazardous_asteroid,
            })
        })
        .collect();

    sort_by_max_diameter(&mut asteroids);
    Ok(asteroids)
}

/// Stable sort, largest max diameter first.
pub fn sort_by_max_diameter(asteroids: &mut [Asteroid]) {
    asteroids.sort_by(|a, b| b.max_diameter_m.total_cmp(&a.max_diameter_m));
}

/// Load rows for a window, consulting the cache before the source.
///
/// A fetch failure is returned as-is; stale data is never substituted.
pub async fn load_asteroids<S: AsteroidSource>(
    source: &S,
    cache: Option<&JsonCache>,
    request: &FeedRequest,
) -> Result<Vec<Asteroid>, FeedError> {
    let key = request.cache_key();

    if let Some(cache) = cache {
        if let Some(asteroids) = cache.load::<Vec<Asteroid>>(&key) {
            info!("Loaded {} asteroids from cache: {}", asteroids.len(), key);
            return Ok(asteroids);
        }
        info!("No cache found for {}, fetching from feed", key);
    }

    let asteroids = source.fetch_asteroids(request).await?;

    if let Some(cache) = cache {
        match cache.store(&key, &asteroids) {
            Ok(path) => info!("Data cached to: {}", path.display()),
            Err(e) => warn!("Failed to cache feed data: {}", e),
        }
    }

    Ok(asteroids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use tempfile::TempDir;

    const SAMPLE_FEED: &str = r#"{
        "element_count": 3,
        "near_earth_objects": {
            "2015-09-08": [
                {
                    "name": "(2015 RC)",
                    "estimated_diameter": {"kilometers": {"estimated_diameter_min": 0.0365, "estimated_diameter_max": 0.0817}},
                    "is_potentially_hazardous_asteroid": false
                }
            ],
            "2015-09-07": [
                {
                    "name": "465633 (2009 JR5)",
                    "estimated_diameter": {"kilometers": {"estimated_diameter_min": 0.2011, "estimated_diameter_max": 0.4497}},
                    "is_potentially_hazardous_asteroid": true
                },
                {
                    "name": "(2010 PK9)",
                    "estimated_diameter": {"kilometers": {"estimated_diameter_min": 0.0365, "estimated_diameter_max": 0.0817}},
                    "is_potentially_hazardous_asteroid": false
                }
            ]
        }
    }"#;

    struct FakeSource {
        result: Result<Vec<Asteroid>, u16>,
        calls: Cell<usize>,
    }

    impl FakeSource {
        fn ok(rows: Vec<Asteroid>) -> Self {
            Self {
                result: Ok(rows),
                calls: Cell::new(0),
            }
        }

        fn failing(status: u16) -> Self {
            Self {
                result: Err(status),
                calls: Cell::new(0),
            }
        }
    }

    impl AsteroidSource for FakeSource {
        async fn fetch_asteroids(&self, _request: &FeedRequest) -> Result<Vec<Asteroid>, FeedError> {
            self.calls.set(self.calls.get() + 1);
            match &self.result {
                Ok(rows) => Ok(rows.clone()),
                Err(status) => Err(FeedError::Upstream {
                    status: *status,
                    body: "boom".to_string(),
                }),
            }
        }
    }

    fn request() -> FeedRequest {
        FeedRequest::parse("2015-09-07", 1).unwrap()
    }

    #[test]
    fn test_request_dates_and_key() {
        let req = request();
        assert_eq!(req.end_date().unwrap().to_string(), "2015-09-08");
        assert_eq!(req.cache_key(), "asteroid_cache_2015-09-07_1.json");
    }

    #[test]
    fn test_request_rejects_bad_date() {
        let err = FeedRequest::parse("09/07/2015", 1).unwrap_err();
        assert!(matches!(err, FeedError::InvalidRequest(_)));
    }

    #[test]
    fn test_flatten_feed_sorts_by_max_diameter() {
        let rows = flatten_feed(SAMPLE_FEED).unwrap();

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].name, "465633 (2009 JR5)");
        assert!(rows[0].is_hazardous);
        assert!((rows[0].max_diameter_m - 449.7).abs() < 1e-9);
        assert!((rows[0].min_diameter_m - 201.1).abs() < 1e-9);

        // Equal diameters keep date order.
        assert_eq!(rows[1].date, "2015-09-07");
        assert_eq!(rows[2].date, "2015-09-08");
    }

    #[test]
    fn test_flatten_feed_without_objects() {
        assert!(flatten_feed("{}").unwrap().is_empty());
    }

    #[test]
    fn test_flatten_feed_rejects_garbage() {
        assert!(matches!(
            flatten_feed("not json"),
            Err(FeedError::Decode(_))
        ));
    }

    #[test]
    fn test_load_fetches_then_uses_cache() {
        let dir = TempDir::new().unwrap();
        let cache = JsonCache::new(dir.path());
        let source = FakeSource::ok(flatten_feed(SAMPLE_FEED).unwrap());

        let first = tokio_test::block_on(load_asteroids(&source, Some(&cache), &request())).unwrap();
        let second =
            tokio_test::block_on(load_asteroids(&source, Some(&cache), &request())).unwrap();

        assert_eq!(source.calls.get(), 1);
        assert_eq!(first, second);
        assert!(cache.path_for(&request().cache_key()).exists());
    }

    #[test]
    fn test_load_without_cache_always_fetches() {
        let source = FakeSource::ok(Vec::new());

        tokio_test::block_on(load_asteroids(&source, None, &request())).unwrap();
        tokio_test::block_on(load_asteroids(&source, None, &request())).unwrap();

        assert_eq!(source.calls.get(), 2);
    }

    #[test]
    fn test_corrupt_cache_falls_through_to_fetch() {
        let dir = TempDir::new().unwrap();
        let cache = JsonCache::new(dir.path());
        std::fs::write(cache.path_for(&request().cache_key()), "[{\"broken\"").unwrap();
        let source = FakeSource::ok(flatten_feed(SAMPLE_FEED).unwrap());

        let rows = tokio_test::block_on(load_asteroids(&source, Some(&cache), &request())).unwrap();

        assert_eq!(source.calls.get(), 1);
        assert_eq!(rows.len(), 3);
    }

    #[test]
    fn test_upstream_failure_is_surfaced_and_not_cached() {
        let dir = TempDir::new().unwrap();
        let cache = JsonCache::new(dir.path());
        let source = FakeSource::failing(503);

        let err =
            tokio_test::block_on(load_asteroids(&source, Some(&cache), &request())).unwrap_err();

        assert!(matches!(err, FeedError::Upstream { status: 503, .. }));
        assert!(!cache.path_for(&request().cache_key()).exists());
    }
}
