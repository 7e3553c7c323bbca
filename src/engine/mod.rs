//! Cross-source correlation engine.
//!
//! Joins the three source adapters by Earth date and derives comparative
//! metrics. This is the system's distinguishing capability: single-source
//! queries go straight to the adapters, but anything that spans sources
//! lands here.
//!
//! Partial-failure policy: a multi-source join never fails because one
//! source is down. The failed source's field is left empty and a warning
//! naming it rides along in the result. Only caller cancellation fails
//! the whole call.

pub mod danger;

use chrono::{Duration, NaiveDate};
use futures::future::join_all;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::cancel::Cancellation;
use crate::client::RetryingClient;
use crate::config::{AppConfig, RoverScaleConfig};
use crate::limiter::RateLimiter;
use crate::sources::imagery::ImageryAdapter;
use crate::sources::neo::NeoAdapter;
use crate::sources::rover::RoverAdapter;
use crate::sources::validate_span;
use crate::types::{
    AstroError, CorrelationMetrics, DateCorrelation, RoverName, RoverPhoto, SizeComparison,
    SourceKind, SourceWarning,
};

/// Correlates records from the three sources by date key.
pub struct CorrelationEngine {
    imagery: Arc<ImageryAdapter>,
    neo: Arc<NeoAdapter>,
    rovers: Arc<RoverAdapter>,
    scale: RoverScaleConfig,
    max_span_days: i64,
}

impl CorrelationEngine {
    pub fn new(
        imagery: Arc<ImageryAdapter>,
        neo: Arc<NeoAdapter>,
        rovers: Arc<RoverAdapter>,
        scale: RoverScaleConfig,
        max_span_days: i64,
    ) -> Self {
        Self {
            imagery,
            neo,
            rovers,
            scale,
            max_span_days,
        }
    }

    /// Wire up the full production stack: one shared rate limiter, one
    /// retrying client, three adapters.
    pub fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        let limiter = Arc::new(RateLimiter::new(config.rate_limit.max_requests_per_hour));
        let client = Arc::new(RetryingClient::from_config(config, limiter)?);
        Ok(Self::new(
            Arc::new(ImageryAdapter::new(
                Arc::clone(&client),
                config.spans.imagery_max_days,
            )),
            Arc::new(NeoAdapter::new(
                Arc::clone(&client),
                config.spans.neo_max_days,
            )),
            Arc::new(RoverAdapter::new(client)),
            config.rovers.clone(),
            config.spans.correlation_max_days,
        ))
    }

    /// Single-source access for callers exposing per-source operations.
    pub fn imagery(&self) -> &ImageryAdapter {
        &self.imagery
    }

    pub fn neo(&self) -> &NeoAdapter {
        &self.neo
    }

    pub fn rovers(&self) -> &RoverAdapter {
        &self.rovers
    }

    /// Join all three sources for one Earth date.
    ///
    /// The three fetches run concurrently; the rover leg itself fans out
    /// per rover. Output ordering is canonical, never completion order.
    pub async fn summarize_date(
        &self,
        date: NaiveDate,
        cancel: &Cancellation,
    ) -> Result<DateCorrelation, AstroError> {
        cancel.check()?;

        let (imagery_res, neo_res, photos_res) = tokio::join!(
            self.imagery.get_by_date(date, cancel),
            self.neo.get_by_date_range(date, date, cancel),
            self.fetch_rover_photos(date, cancel),
        );

        let mut warnings = Vec::new();

        let imagery = match imagery_res {
            Ok(record) => Some(record),
            Err(AstroError::Cancelled) => return Err(AstroError::Cancelled),
            Err(e) => {
                warn!(date = %date, error = %e, "imagery unavailable, degrading");
                warnings.push(SourceWarning {
                    source: SourceKind::Imagery,
                    message: e.to_string(),
                });
                None
            }
        };

        let mut neo_objects = match neo_res {
            Ok(objects) => objects,
            Err(AstroError::Cancelled) => return Err(AstroError::Cancelled),
            Err(e) => {
                warn!(date = %date, error = %e, "object feed unavailable, degrading");
                warnings.push(SourceWarning {
                    source: SourceKind::NearEarthObjects,
                    message: e.to_string(),
                });
                Vec::new()
            }
        };

        let (mut rover_photos, rover_warnings) = photos_res?;
        warnings.extend(rover_warnings);

        // Canonical orders, independent of completion order.
        neo_objects.sort_by(|a, b| {
            b.diameter_max_km
                .total_cmp(&a.diameter_max_km)
                .then_with(|| a.id.cmp(&b.id))
        });
        rover_photos.sort_by_key(|p| (p.rover, p.id));

        let metrics = CorrelationMetrics {
            largest_diameter_km: neo_objects
                .iter()
                .map(|o| o.diameter_max_km)
                .fold(None, |acc: Option<f64>, d| {
                    Some(acc.map_or(d, |a| a.max(d)))
                }),
            hazardous_count: neo_objects.iter().filter(|o| o.hazardous).count(),
        };

        let correlation = DateCorrelation {
            date,
            imagery,
            neo_objects,
            rover_photos,
            metrics,
            warnings,
        };
        debug!(summary = %correlation, "date correlation assembled");
        Ok(correlation)
    }

    /// Correlate every date in the inclusive range, ascending.
    ///
    /// Dates are processed concurrently under the shared rate limit.
    /// Source failures degrade per date inside `summarize_date`; only
    /// cancellation aborts the remaining dates.
    pub async fn summarize_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        cancel: &Cancellation,
    ) -> Result<Vec<DateCorrelation>, AstroError> {
        validate_span(start, end, self.max_span_days)?;

        let dates: Vec<NaiveDate> = std::iter::successors(Some(start), |d| {
            let next = *d + Duration::days(1);
            (next <= end).then_some(next)
        })
        .collect();

        info!(start = %start, end = %end, days = dates.len(), "range correlation starting");

        let results = join_all(
            dates
                .iter()
                .map(|&date| self.summarize_date(date, cancel)),
        )
        .await;

        // join_all preserves input order, so this is already ascending.
        results.into_iter().collect()
    }

    /// Compare an asteroid's estimated size against a rover's physical
    /// scale. The archive has no physical dimensions, so the rover side
    /// comes from the configured reference table.
    pub async fn compare_asteroid_to_rover(
        &self,
        asteroid_id: &str,
        rover: RoverName,
        cancel: &Cancellation,
    ) -> Result<SizeComparison, AstroError> {
        let object = self.neo.get_by_id(asteroid_id, cancel).await?;
        let dims = self.scale.dimensions_for(rover);

        let diameter_m = object.diameter_max_km * 1000.0;
        let ratio = diameter_m / dims.width_m;
        let summary = if ratio >= 2.0 {
            format!(
                "At about {diameter_m:.0} m across, {} is roughly {ratio:.0} times the width of the {rover} rover ({:.1} m).",
                object.name, dims.width_m,
            )
        } else if ratio >= 1.0 {
            format!(
                "At about {diameter_m:.0} m across, {} is about the width of the {rover} rover ({:.1} m).",
                object.name, dims.width_m,
            )
        } else {
            format!(
                "At about {diameter_m:.1} m across, {} is only {:.0}% of the width of the {rover} rover ({:.1} m).",
                object.name,
                ratio * 100.0,
                dims.width_m,
            )
        };

        Ok(SizeComparison {
            object_id: object.id,
            object_name: object.name,
            rover,
            diameter_m,
            rover_width_m: dims.width_m,
            ratio,
            summary,
        })
    }

    /// Concurrent per-rover photo fetch with per-rover degradation.
    async fn fetch_rover_photos(
        &self,
        date: NaiveDate,
        cancel: &Cancellation,
    ) -> Result<(Vec<RoverPhoto>, Vec<SourceWarning>), AstroError> {
        let fetches = RoverName::ALL.iter().map(|&rover| async move {
            (rover, self.rovers.get_by_earth_date(rover, date, cancel).await)
        });
        let results = join_all(fetches).await;

        let mut photos = Vec::new();
        let mut warnings = Vec::new();
        for (rover, result) in results {
            match result {
                Ok(batch) => photos.extend(batch),
                Err(AstroError::Cancelled) => return Err(AstroError::Cancelled),
                Err(e) => {
                    warn!(rover = %rover, date = %date, error = %e, "rover photos unavailable, degrading");
                    warnings.push(SourceWarning {
                        source: SourceKind::RoverPhotos,
                        message: format!("{rover}: {e}"),
                    });
                }
            }
        }
        Ok((photos, warnings))
    }
}
