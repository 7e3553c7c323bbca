//! Near-Earth object adapter.
//!
//! Upstream: `GET /neo/rest/v1/feed` (objects grouped per approach date,
//! range capped at 7 days) and `GET /neo/rest/v1/neo/{id}` (single-object
//! lookup with full approach history). Numeric fields arrive as strings
//! in the feed; normalization parses them and fails closed on anything
//! unparseable.

use chrono::{Duration, NaiveDate, Utc};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use super::{parse_upstream_date, validate_span};
use crate::cancel::Cancellation;
use crate::client::{RequestSpec, RetryingClient};
use crate::engine::danger;
use crate::types::{AstroError, DangerAssessment, NearEarthObject};

const PROVIDER: &str = "neows";
const FEED_PATH: &str = "/neo/rest/v1/feed";
const LOOKUP_PATH: &str = "/neo/rest/v1/neo";

// ---------------------------------------------------------------------------
// Upstream response shapes
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct RawFeed {
    near_earth_objects: HashMap<String, Vec<RawNeo>>,
}

#[derive(Debug, Deserialize)]
struct RawNeo {
    id: String,
    name: String,
    estimated_diameter: RawDiameter,
    is_potentially_hazardous_asteroid: bool,
    close_approach_data: Vec<RawApproach>,
}

#[derive(Debug, Deserialize)]
struct RawDiameter {
    kilometers: RawDiameterRange,
}

#[derive(Debug, Deserialize)]
struct RawDiameterRange {
    estimated_diameter_min: f64,
    estimated_diameter_max: f64,
}

#[derive(Debug, Deserialize)]
struct RawApproach {
    close_approach_date: String,
    relative_velocity: RawVelocity,
    miss_distance: RawMissDistance,
}

/// Velocity and distance come through as decimal strings.
#[derive(Debug, Deserialize)]
struct RawVelocity {
    kilometers_per_second: String,
}

#[derive(Debug, Deserialize)]
struct RawMissDistance {
    kilometers: String,
    lunar: String,
}

// ---------------------------------------------------------------------------
// Adapter
// ---------------------------------------------------------------------------

/// Read-only adapter for the near-Earth object source.
pub struct NeoAdapter {
    client: Arc<RetryingClient>,
    max_span_days: i64,
}

impl NeoAdapter {
    pub fn new(client: Arc<RetryingClient>, max_span_days: i64) -> Self {
        Self {
            client,
            max_span_days,
        }
    }

    /// All objects approaching within the inclusive range, ordered by
    /// (approach date, id). Fails with `RangeTooLarge` beyond the
    /// upstream feed cap rather than silently truncating.
    pub async fn get_by_date_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        cancel: &Cancellation,
    ) -> Result<Vec<NearEarthObject>, AstroError> {
        validate_span(start, end, self.max_span_days)?;

        let spec = RequestSpec::new(PROVIDER, FEED_PATH)
            .with_param("start_date", start.format("%Y-%m-%d"))
            .with_param("end_date", end.format("%Y-%m-%d"))
            .with_param("detailed", "true");
        let value = self.client.execute(&spec, cancel).await?;

        let feed: RawFeed = serde_json::from_value(value).map_err(malformed)?;
        let mut objects = Vec::new();
        for raw in feed.near_earth_objects.into_values().flatten() {
            objects.push(convert(raw)?);
        }
        objects.sort_by(|a, b| {
            a.approach_date
                .cmp(&b.approach_date)
                .then_with(|| a.id.cmp(&b.id))
        });

        debug!(start = %start, end = %end, count = objects.len(), "object feed fetched");
        Ok(objects)
    }

    /// Objects approaching today.
    pub async fn get_today(
        &self,
        cancel: &Cancellation,
    ) -> Result<Vec<NearEarthObject>, AstroError> {
        let today = Utc::now().date_naive();
        self.get_by_date_range(today, today, cancel).await
    }

    /// Objects approaching over the next seven days.
    pub async fn get_week(
        &self,
        cancel: &Cancellation,
    ) -> Result<Vec<NearEarthObject>, AstroError> {
        let today = Utc::now().date_naive();
        self.get_by_date_range(today, today + Duration::days(6), cancel)
            .await
    }

    /// Only the potentially hazardous objects in the range.
    pub async fn get_hazardous(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        cancel: &Cancellation,
    ) -> Result<Vec<NearEarthObject>, AstroError> {
        let objects = self.get_by_date_range(start, end, cancel).await?;
        Ok(objects.into_iter().filter(|o| o.hazardous).collect())
    }

    /// The largest object in the range by estimated max diameter.
    ///
    /// Ties break deterministically: earliest approach date first, then
    /// lexicographically smallest id.
    pub async fn get_largest_in_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        cancel: &Cancellation,
    ) -> Result<Option<NearEarthObject>, AstroError> {
        let objects = self.get_by_date_range(start, end, cancel).await?;
        Ok(pick_largest(objects))
    }

    /// Look up one object by id. Among its recorded close approaches,
    /// the closest one (minimum miss distance) is normalized.
    pub async fn get_by_id(
        &self,
        id: &str,
        cancel: &Cancellation,
    ) -> Result<NearEarthObject, AstroError> {
        let id = id.trim();
        if id.is_empty() {
            return Err(AstroError::InvalidArgument(
                "object id cannot be empty".to_string(),
            ));
        }

        let spec = RequestSpec::new(PROVIDER, format!("{LOOKUP_PATH}/{id}"));
        let value = self.client.execute(&spec, cancel).await?;
        let raw: RawNeo = serde_json::from_value(value).map_err(malformed)?;
        convert(raw)
    }

    /// Composite danger analysis for one object — a thin call into the
    /// engine's shared scorer so the formula lives in exactly one place.
    pub async fn analyze_danger(
        &self,
        id: &str,
        cancel: &Cancellation,
    ) -> Result<DangerAssessment, AstroError> {
        let object = self.get_by_id(id, cancel).await?;
        Ok(danger::assess(&object))
    }
}

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

fn convert(raw: RawNeo) -> Result<NearEarthObject, AstroError> {
    // The feed carries exactly the in-range approach; the lookup endpoint
    // carries the full history. Either way the closest approach is the
    // one we report.
    let approach = raw
        .close_approach_data
        .iter()
        .map(|a| Ok((a, parse_f64("miss_distance.kilometers", &a.miss_distance.kilometers)?)))
        .collect::<Result<Vec<_>, AstroError>>()?
        .into_iter()
        .min_by(|(_, a), (_, b)| a.total_cmp(b));

    let Some((approach, miss_distance_km)) = approach else {
        return Err(AstroError::UpstreamRejected {
            provider: PROVIDER.to_string(),
            status: None,
            message: format!("object {} has no close approach data", raw.id),
        });
    };

    let approach_date = parse_upstream_date(PROVIDER, &approach.close_approach_date)?;
    let velocity_kps = parse_f64(
        "relative_velocity.kilometers_per_second",
        &approach.relative_velocity.kilometers_per_second,
    )?;
    let miss_distance_lunar =
        parse_f64("miss_distance.lunar", &approach.miss_distance.lunar)?;

    Ok(NearEarthObject {
        id: raw.id,
        name: raw.name,
        diameter_min_km: raw.estimated_diameter.kilometers.estimated_diameter_min,
        diameter_max_km: raw.estimated_diameter.kilometers.estimated_diameter_max,
        velocity_kps,
        miss_distance_km,
        miss_distance_lunar,
        approach_date,
        hazardous: raw.is_potentially_hazardous_asteroid,
    })
}

fn pick_largest(objects: Vec<NearEarthObject>) -> Option<NearEarthObject> {
    objects.into_iter().reduce(|best, candidate| {
        match candidate.diameter_max_km.total_cmp(&best.diameter_max_km) {
            std::cmp::Ordering::Greater => candidate,
            std::cmp::Ordering::Less => best,
            std::cmp::Ordering::Equal => {
                // Equal diameters: earliest approach date, then smallest id.
                if (candidate.approach_date, &candidate.id) < (best.approach_date, &best.id) {
                    candidate
                } else {
                    best
                }
            }
        }
    })
}

fn parse_f64(field: &str, value: &str) -> Result<f64, AstroError> {
    value.parse::<f64>().map_err(|_| AstroError::UpstreamRejected {
        provider: PROVIDER.to_string(),
        status: None,
        message: format!("unparseable {field}: {value:?}"),
    })
}

fn malformed(e: serde_json::Error) -> AstroError {
    AstroError::UpstreamRejected {
        provider: PROVIDER.to_string(),
        status: None,
        message: format!("unexpected response shape: {e}"),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
