//! Daily astronomy imagery adapter.
//!
//! Upstream: `GET /planetary/apod` — one record per calendar date, or an
//! array for `start_date`/`end_date` queries. The upstream shape is
//! inconsistent in small ways (optional copyright, video records have no
//! `hdurl`, media type as a free string); normalization folds all of it
//! into one strict `ImageryRecord`.
//!
//! Rate limit: shares the provider-wide hourly budget.

use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;

use super::{parse_upstream_date, validate_span};
use crate::cancel::Cancellation;
use crate::client::{RequestSpec, RetryingClient};
use crate::types::{AstroError, ImageryRecord, MediaKind};

const PROVIDER: &str = "apod";
const PATH: &str = "/planetary/apod";

// ---------------------------------------------------------------------------
// Upstream response shape
// ---------------------------------------------------------------------------

/// Raw APOD record. We only deserialize the fields we need.
#[derive(Debug, Deserialize)]
struct RawApod {
    date: String,
    title: String,
    explanation: String,
    url: String,
    #[serde(default)]
    hdurl: Option<String>,
    media_type: String,
    #[serde(default)]
    copyright: Option<String>,
}

// ---------------------------------------------------------------------------
// Adapter
// ---------------------------------------------------------------------------

/// Read-only adapter for the daily imagery source.
pub struct ImageryAdapter {
    client: Arc<RetryingClient>,
    max_span_days: i64,
}

impl ImageryAdapter {
    pub fn new(client: Arc<RetryingClient>, max_span_days: i64) -> Self {
        Self {
            client,
            max_span_days,
        }
    }

    /// Fetch the record for a specific date.
    pub async fn get_by_date(
        &self,
        date: NaiveDate,
        cancel: &Cancellation,
    ) -> Result<ImageryRecord, AstroError> {
        let spec =
            RequestSpec::new(PROVIDER, PATH).with_param("date", date.format("%Y-%m-%d"));
        let value = self.client.execute(&spec, cancel).await?;
        normalize_one(value)
    }

    /// Fetch today's record.
    pub async fn get_today(&self, cancel: &Cancellation) -> Result<ImageryRecord, AstroError> {
        self.get_by_date(Utc::now().date_naive(), cancel).await
    }

    /// Fetch all records in an inclusive date range, ascending by date.
    pub async fn get_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        cancel: &Cancellation,
    ) -> Result<Vec<ImageryRecord>, AstroError> {
        validate_span(start, end, self.max_span_days)?;

        let spec = RequestSpec::new(PROVIDER, PATH)
            .with_param("start_date", start.format("%Y-%m-%d"))
            .with_param("end_date", end.format("%Y-%m-%d"));
        let value = self.client.execute(&spec, cancel).await?;

        let raw: Vec<RawApod> = serde_json::from_value(value).map_err(malformed)?;
        let mut records = raw
            .into_iter()
            .map(convert)
            .collect::<Result<Vec<_>, _>>()?;
        records.sort_by_key(|r| r.date);

        debug!(
            start = %start,
            end = %end,
            count = records.len(),
            "imagery range fetched"
        );
        Ok(records)
    }
}

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

fn normalize_one(value: serde_json::Value) -> Result<ImageryRecord, AstroError> {
    let raw: RawApod = serde_json::from_value(value).map_err(malformed)?;
    convert(raw)
}

fn convert(raw: RawApod) -> Result<ImageryRecord, AstroError> {
    let media_kind = match raw.media_type.as_str() {
        "image" => MediaKind::Image,
        "video" => MediaKind::Video,
        other => {
            return Err(AstroError::UpstreamRejected {
                provider: PROVIDER.to_string(),
                status: None,
                message: format!("unknown media_type: {other:?}"),
            })
        }
    };

    Ok(ImageryRecord {
        date: parse_upstream_date(PROVIDER, &raw.date)?,
        title: raw.title,
        explanation: raw.explanation,
        media_url: raw.url,
        hd_url: raw.hdurl,
        media_kind,
        copyright: raw.copyright,
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
