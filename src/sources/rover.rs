//! Mars rover photo archive adapter.
//!
//! Upstream: `GET /mars-photos/api/v1/rovers/{rover}` (mission manifest),
//! `/rovers/{rover}/photos` (by earth date or sol) and
//! `/rovers/{rover}/latest_photos`. Camera validity and sol bounds are
//! checked against a static per-rover registry before any request goes
//! out, so an impossible query never touches the network.

use chrono::NaiveDate;
use futures::future::join_all;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::cancel::Cancellation;
use crate::client::{RequestSpec, RetryingClient};
use crate::types::{
    AstroError, MissionStatus, RoverName, RoverPhoto, RoverStatus, SourceKind, SourceWarning,
};

const PROVIDER: &str = "mars-photos";
const BASE_PATH: &str = "/mars-photos/api/v1/rovers";

/// Upper bound on `get_latest` page size (upstream page size).
const MAX_LATEST_COUNT: usize = 100;
const DEFAULT_LATEST_COUNT: usize = 25;

/// Upper bound on `get_by_camera` results.
const MAX_CAMERA_COUNT: usize = 50;
const DEFAULT_CAMERA_COUNT: usize = 20;

// ---------------------------------------------------------------------------
// Static mission registry
// ---------------------------------------------------------------------------

/// Approximate per-rover mission bounds for fail-fast sol validation.
/// Authoritative values come from the live manifest via `get_status`.
struct MissionFacts {
    rover: RoverName,
    max_sol: u32,
}

const MISSIONS: &[MissionFacts] = &[
    MissionFacts { rover: RoverName::Curiosity, max_sol: 4400 },
    MissionFacts { rover: RoverName::Opportunity, max_sol: 5111 },
    MissionFacts { rover: RoverName::Spirit, max_sol: 2208 },
];

fn registry_max_sol(rover: RoverName) -> u32 {
    MISSIONS
        .iter()
        .find(|m| m.rover == rover)
        .map(|m| m.max_sol)
        .unwrap_or(u32::MAX)
}

// ---------------------------------------------------------------------------
// Upstream response shapes
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct RawPhotosResponse {
    photos: Vec<RawPhoto>,
}

#[derive(Debug, Deserialize)]
struct RawLatestResponse {
    latest_photos: Vec<RawPhoto>,
}

#[derive(Debug, Deserialize)]
struct RawPhoto {
    id: u64,
    sol: u32,
    camera: RawCamera,
    img_src: String,
    earth_date: String,
}

#[derive(Debug, Deserialize)]
struct RawCamera {
    name: String,
}

#[derive(Debug, Deserialize)]
struct RawManifestResponse {
    rover: RawManifest,
}

#[derive(Debug, Deserialize)]
struct RawManifest {
    launch_date: String,
    landing_date: String,
    status: String,
    max_sol: u32,
    max_date: String,
    total_photos: u64,
}

// ---------------------------------------------------------------------------
// Adapter
// ---------------------------------------------------------------------------

/// Read-only adapter for the rover photo archive.
pub struct RoverAdapter {
    client: Arc<RetryingClient>,
}

impl RoverAdapter {
    pub fn new(client: Arc<RetryingClient>) -> Self {
        Self { client }
    }

    /// Newest photos from a rover, across all cameras.
    /// `count` defaults to 25, capped at the upstream page size.
    pub async fn get_latest(
        &self,
        rover: RoverName,
        count: Option<usize>,
        cancel: &Cancellation,
    ) -> Result<Vec<RoverPhoto>, AstroError> {
        let count = count.unwrap_or(DEFAULT_LATEST_COUNT);
        if count == 0 || count > MAX_LATEST_COUNT {
            return Err(AstroError::InvalidArgument(format!(
                "count must be 1..={MAX_LATEST_COUNT}, got {count}"
            )));
        }

        let spec = RequestSpec::new(
            PROVIDER,
            format!("{BASE_PATH}/{}/latest_photos", rover.slug()),
        )
        .with_param("page", 1);
        let value = self.client.execute(&spec, cancel).await?;

        let raw: RawLatestResponse = serde_json::from_value(value).map_err(malformed)?;
        let mut photos = convert_photos(rover, raw.latest_photos)?;
        photos.truncate(count);
        Ok(photos)
    }

    /// Photos taken on a specific Earth date, ordered by photo id.
    pub async fn get_by_earth_date(
        &self,
        rover: RoverName,
        date: NaiveDate,
        cancel: &Cancellation,
    ) -> Result<Vec<RoverPhoto>, AstroError> {
        let spec = RequestSpec::new(PROVIDER, format!("{BASE_PATH}/{}/photos", rover.slug()))
            .with_param("earth_date", date.format("%Y-%m-%d"))
            .with_param("page", 1);
        let value = self.client.execute(&spec, cancel).await?;

        let raw: RawPhotosResponse = serde_json::from_value(value).map_err(malformed)?;
        let mut photos = convert_photos(rover, raw.photos)?;
        photos.sort_by_key(|p| p.id);
        Ok(photos)
    }

    /// Photos taken on a specific sol, ordered by photo id.
    pub async fn get_by_sol(
        &self,
        rover: RoverName,
        sol: u32,
        cancel: &Cancellation,
    ) -> Result<Vec<RoverPhoto>, AstroError> {
        let max_sol = registry_max_sol(rover);
        if sol > max_sol {
            return Err(AstroError::InvalidArgument(format!(
                "sol {sol} out of range for {rover} (0..={max_sol})"
            )));
        }

        let spec = RequestSpec::new(PROVIDER, format!("{BASE_PATH}/{}/photos", rover.slug()))
            .with_param("sol", sol)
            .with_param("page", 1);
        let value = self.client.execute(&spec, cancel).await?;

        let raw: RawPhotosResponse = serde_json::from_value(value).map_err(malformed)?;
        let mut photos = convert_photos(rover, raw.photos)?;
        photos.sort_by_key(|p| p.id);
        Ok(photos)
    }

    /// Recent photos from a specific camera. Camera validity is
    /// rover-specific; an invalid pairing fails before any request.
    pub async fn get_by_camera(
        &self,
        rover: RoverName,
        camera: &str,
        count: Option<usize>,
        cancel: &Cancellation,
    ) -> Result<Vec<RoverPhoto>, AstroError> {
        let count = count.unwrap_or(DEFAULT_CAMERA_COUNT);
        if count == 0 || count > MAX_CAMERA_COUNT {
            return Err(AstroError::InvalidArgument(format!(
                "count must be 1..={MAX_CAMERA_COUNT}, got {count}"
            )));
        }
        if !rover.has_camera(camera) {
            return Err(AstroError::InvalidArgument(format!(
                "camera {} is not valid for {rover} (valid: {})",
                camera.to_uppercase(),
                rover.cameras().join(", ")
            )));
        }

        let camera = camera.to_uppercase();
        let latest = self.get_latest(rover, Some(MAX_LATEST_COUNT), cancel).await?;
        let mut photos: Vec<RoverPhoto> =
            latest.into_iter().filter(|p| p.camera == camera).collect();
        photos.truncate(count);
        Ok(photos)
    }

    /// Mission manifest for one rover.
    pub async fn get_status(
        &self,
        rover: RoverName,
        cancel: &Cancellation,
    ) -> Result<RoverStatus, AstroError> {
        let spec = RequestSpec::new(PROVIDER, format!("{BASE_PATH}/{}", rover.slug()));
        let value = self.client.execute(&spec, cancel).await?;

        let raw: RawManifestResponse = serde_json::from_value(value).map_err(malformed)?;
        convert_status(rover, raw.rover)
    }

    /// Status for every known rover, fetched concurrently and returned in
    /// canonical (alphabetical) order regardless of completion order.
    ///
    /// A single rover's failure degrades to a warning rather than failing
    /// the comparison; cancellation fails the whole call.
    pub async fn compare_rovers(
        &self,
        cancel: &Cancellation,
    ) -> Result<(Vec<RoverStatus>, Vec<SourceWarning>), AstroError> {
        let fetches = RoverName::ALL
            .iter()
            .map(|&rover| async move { (rover, self.get_status(rover, cancel).await) });
        let results = join_all(fetches).await;

        let mut statuses = Vec::new();
        let mut warnings = Vec::new();
        for (rover, result) in results {
            match result {
                Ok(status) => statuses.push(status),
                Err(AstroError::Cancelled) => return Err(AstroError::Cancelled),
                Err(e) => {
                    warn!(rover = %rover, error = %e, "rover status fetch failed, continuing");
                    warnings.push(SourceWarning {
                        source: SourceKind::RoverPhotos,
                        message: format!("{rover}: {e}"),
                    });
                }
            }
        }
        statuses.sort_by_key(|s| s.rover);

        debug!(ok = statuses.len(), failed = warnings.len(), "rover comparison complete");
        Ok((statuses, warnings))
    }
}

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

fn convert_photos(
    rover: RoverName,
    raw: Vec<RawPhoto>,
) -> Result<Vec<RoverPhoto>, AstroError> {
    raw.into_iter()
        .map(|p| {
            Ok(RoverPhoto {
                id: p.id,
                rover,
                sol: p.sol,
                earth_date: super::parse_upstream_date(PROVIDER, &p.earth_date)?,
                camera: p.camera.name,
                img_src: p.img_src,
            })
        })
        .collect()
}

fn convert_status(rover: RoverName, raw: RawManifest) -> Result<RoverStatus, AstroError> {
    let status = match raw.status.as_str() {
        "active" => MissionStatus::Active,
        "complete" => MissionStatus::Complete,
        other => {
            return Err(AstroError::UpstreamRejected {
                provider: PROVIDER.to_string(),
                status: None,
                message: format!("unknown mission status: {other:?}"),
            })
        }
    };

    Ok(RoverStatus {
        rover,
        launch_date: super::parse_upstream_date(PROVIDER, &raw.launch_date)?,
        landing_date: super::parse_upstream_date(PROVIDER, &raw.landing_date)?,
        status,
        max_sol: raw.max_sol,
        max_date: super::parse_upstream_date(PROVIDER, &raw.max_date)?,
        total_photos: raw.total_photos,
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
