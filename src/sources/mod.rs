//! NASA source adapters.
//!
//! Each adapter translates a domain-level query into one or more upstream
//! requests via the shared `RetryingClient` and normalizes the raw JSON
//! into a typed record. Normalization fails closed: an unknown-shaped
//! response is rejected rather than passed downstream as a loose value.
//!
//! Argument validation happens synchronously, before any request is
//! issued, so caller mistakes never consume rate-limit budget.

pub mod imagery;
pub mod neo;
pub mod rover;

use chrono::NaiveDate;

use crate::types::AstroError;

/// Parse a caller-supplied `YYYY-MM-DD` date.
pub fn parse_date(field: &str, value: &str) -> Result<NaiveDate, AstroError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| {
        AstroError::InvalidArgument(format!("{field} must be YYYY-MM-DD, got {value:?}"))
    })
}

/// Validate an inclusive date range against a maximum span.
///
/// Returns the span in days (`end - start`); a single-day range is 0.
pub(crate) fn validate_span(
    start: NaiveDate,
    end: NaiveDate,
    max_days: i64,
) -> Result<i64, AstroError> {
    if start > end {
        return Err(AstroError::InvalidArgument(format!(
            "start date {start} is after end date {end}"
        )));
    }
    let days = (end - start).num_days();
    if days > max_days {
        return Err(AstroError::RangeTooLarge {
            requested_days: days,
            max_days,
        });
    }
    Ok(days)
}

/// Normalization-side date parse: upstream sent the value, so a bad one
/// is a malformed response, not a caller mistake.
pub(crate) fn parse_upstream_date(
    provider: &str,
    value: &str,
) -> Result<NaiveDate, AstroError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| AstroError::UpstreamRejected {
        provider: provider.to_string(),
        status: None,
        message: format!("unparseable date in response: {value:?}"),
    })
}
