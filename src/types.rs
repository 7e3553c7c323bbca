//! Shared types for the ASTROLABE core.
//!
//! These types form the data model used across all modules.
//! They are designed to be stable so that source adapters and the
//! correlation engine can depend on them without circular references.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Sources
// ---------------------------------------------------------------------------

/// The three upstream data sources. Used to name partial failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceKind {
    Imagery,
    NearEarthObjects,
    RoverPhotos,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::Imagery => write!(f, "imagery"),
            SourceKind::NearEarthObjects => write!(f, "near-earth-objects"),
            SourceKind::RoverPhotos => write!(f, "rover-photos"),
        }
    }
}

/// A non-fatal problem encountered while assembling a multi-source result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceWarning {
    pub source: SourceKind,
    pub message: String,
}

impl fmt::Display for SourceWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.source, self.message)
    }
}

// ---------------------------------------------------------------------------
// Imagery
// ---------------------------------------------------------------------------

/// Media kind of a daily imagery record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaKind::Image => write!(f, "image"),
            MediaKind::Video => write!(f, "video"),
        }
    }
}

/// One astronomy-picture-of-the-day record. Identity key: date.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageryRecord {
    pub date: NaiveDate,
    pub title: String,
    pub explanation: String,
    pub media_url: String,
    /// High-resolution variant, present for most images.
    pub hd_url: Option<String>,
    pub media_kind: MediaKind,
    pub copyright: Option<String>,
}

impl fmt::Display for ImageryRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {} ({})", self.date, self.title, self.media_kind)
    }
}

// ---------------------------------------------------------------------------
// Near-Earth objects
// ---------------------------------------------------------------------------

/// A tracked asteroid/comet with an Earth approach event.
/// Identity key: id. Multiple objects share an approach date.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NearEarthObject {
    pub id: String,
    pub name: String,
    pub diameter_min_km: f64,
    pub diameter_max_km: f64,
    /// Relative velocity at closest approach, km/s.
    pub velocity_kps: f64,
    pub miss_distance_km: f64,
    pub miss_distance_lunar: f64,
    pub approach_date: NaiveDate,
    pub hazardous: bool,
}

impl fmt::Display for NearEarthObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} | {:.3}–{:.3} km | {:.1} km/s | miss {:.0} km{}",
            self.id,
            self.name,
            self.diameter_min_km,
            self.diameter_max_km,
            self.velocity_kps,
            self.miss_distance_km,
            if self.hazardous { " | HAZARDOUS" } else { "" },
        )
    }
}

impl NearEarthObject {
    /// Human-friendly size bucket based on the maximum estimated diameter.
    pub fn size_description(&self) -> String {
        let diameter_m = self.diameter_max_km * 1000.0;
        if diameter_m > 1000.0 {
            format!("about {:.1} km across, larger than most cities", self.diameter_max_km)
        } else if diameter_m > 500.0 {
            format!("about {diameter_m:.0} m, the size of a large skyscraper")
        } else if diameter_m > 100.0 {
            format!("about {diameter_m:.0} m, the size of a football field")
        } else if diameter_m > 50.0 {
            format!("about {diameter_m:.0} m, the size of a large building")
        } else if diameter_m > 10.0 {
            format!("about {diameter_m:.0} m, the size of a house")
        } else {
            format!("about {diameter_m:.0} m, the size of a car")
        }
    }
}

// ---------------------------------------------------------------------------
// Mars rovers
// ---------------------------------------------------------------------------

/// Known Mars rovers with photo archives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoverName {
    Curiosity,
    Opportunity,
    Spirit,
}

impl RoverName {
    /// All known rovers in canonical (alphabetical) order.
    pub const ALL: &'static [RoverName] = &[
        RoverName::Curiosity,
        RoverName::Opportunity,
        RoverName::Spirit,
    ];

    /// Lowercase identifier as used in upstream URL paths.
    pub fn slug(&self) -> &'static str {
        match self {
            RoverName::Curiosity => "curiosity",
            RoverName::Opportunity => "opportunity",
            RoverName::Spirit => "spirit",
        }
    }

    /// Cameras carried by this rover. Camera validity is rover-specific.
    pub fn cameras(&self) -> &'static [&'static str] {
        match self {
            RoverName::Curiosity => {
                &["FHAZ", "RHAZ", "MAST", "CHEMCAM", "MAHLI", "MARDI", "NAVCAM"]
            }
            RoverName::Opportunity | RoverName::Spirit => {
                &["FHAZ", "RHAZ", "NAVCAM", "PANCAM", "MINITES"]
            }
        }
    }

    /// Whether `camera` (case-insensitive) is valid for this rover.
    pub fn has_camera(&self, camera: &str) -> bool {
        let upper = camera.to_uppercase();
        self.cameras().iter().any(|c| *c == upper)
    }
}

impl fmt::Display for RoverName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoverName::Curiosity => write!(f, "Curiosity"),
            RoverName::Opportunity => write!(f, "Opportunity"),
            RoverName::Spirit => write!(f, "Spirit"),
        }
    }
}

impl std::str::FromStr for RoverName {
    type Err = AstroError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "curiosity" => Ok(RoverName::Curiosity),
            "opportunity" => Ok(RoverName::Opportunity),
            "spirit" => Ok(RoverName::Spirit),
            other => Err(AstroError::InvalidArgument(format!(
                "unknown rover: {other} (known: curiosity, opportunity, spirit)"
            ))),
        }
    }
}

/// Mission lifecycle state reported by the photo archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissionStatus {
    Active,
    Complete,
}

impl fmt::Display for MissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MissionStatus::Active => write!(f, "active"),
            MissionStatus::Complete => write!(f, "complete"),
        }
    }
}

/// One archived rover photo. Identity key: id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoverPhoto {
    pub id: u64,
    pub rover: RoverName,
    /// Martian solar day of the mission, counted from landing.
    pub sol: u32,
    pub earth_date: NaiveDate,
    pub camera: String,
    pub img_src: String,
}

impl fmt::Display for RoverPhoto {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{} {} sol {} ({}) via {}",
            self.id, self.rover, self.sol, self.earth_date, self.camera,
        )
    }
}

/// Mission status summary for one rover.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoverStatus {
    pub rover: RoverName,
    pub launch_date: NaiveDate,
    pub landing_date: NaiveDate,
    pub status: MissionStatus,
    pub max_sol: u32,
    /// Latest Earth date with archived photos.
    pub max_date: NaiveDate,
    pub total_photos: u64,
}

impl RoverStatus {
    /// Days between landing and the last archived photo date.
    pub fn mission_duration_days(&self) -> i64 {
        (self.max_date - self.landing_date).num_days()
    }

    /// Mission duration in (fractional) Earth years.
    pub fn mission_duration_years(&self) -> f64 {
        self.mission_duration_days() as f64 / 365.25
    }
}

impl fmt::Display for RoverStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} | {} | sol {} | {} photos | {} days on Mars",
            self.rover,
            self.status,
            self.max_sol,
            self.total_photos,
            self.mission_duration_days(),
        )
    }
}

// ---------------------------------------------------------------------------
// Threat analysis
// ---------------------------------------------------------------------------

/// Threat classification, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThreatLevel {
    Low,
    Moderate,
    High,
    Severe,
}

impl fmt::Display for ThreatLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ThreatLevel::Low => write!(f, "LOW"),
            ThreatLevel::Moderate => write!(f, "MODERATE"),
            ThreatLevel::High => write!(f, "HIGH"),
            ThreatLevel::Severe => write!(f, "SEVERE"),
        }
    }
}

/// Deterministic danger assessment for one object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DangerAssessment {
    pub object_id: String,
    pub object_name: String,
    /// Composite score in [0, 1].
    pub score: f64,
    pub level: ThreatLevel,
    /// Normalized diameter component in [0, 1].
    pub diameter_component: f64,
    /// Normalized proximity component in [0, 1] (closer = higher).
    pub proximity_component: f64,
    /// Normalized velocity component in [0, 1].
    pub velocity_component: f64,
    pub hazardous: bool,
    pub size_description: String,
}

impl fmt::Display for DangerAssessment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} | score {:.3} | {}",
            self.object_id, self.object_name, self.score, self.level,
        )
    }
}

/// Human-interpretable asteroid-vs-rover size comparison.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SizeComparison {
    pub object_id: String,
    pub object_name: String,
    pub rover: RoverName,
    /// Maximum estimated diameter of the object, meters.
    pub diameter_m: f64,
    pub rover_width_m: f64,
    /// diameter / rover width.
    pub ratio: f64,
    pub summary: String,
}

impl fmt::Display for SizeComparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.summary)
    }
}

// ---------------------------------------------------------------------------
// Date correlation
// ---------------------------------------------------------------------------

/// Metrics derived from a date's joined records.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CorrelationMetrics {
    /// Largest estimated max diameter among the date's objects, km.
    pub largest_diameter_km: Option<f64>,
    pub hazardous_count: usize,
}

/// All three sources joined for one Earth date, with per-source
/// degradation recorded in `warnings` instead of failing the join.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DateCorrelation {
    pub date: NaiveDate,
    pub imagery: Option<ImageryRecord>,
    /// Descending by max diameter, ties by id.
    pub neo_objects: Vec<NearEarthObject>,
    /// Ordered by rover name, then photo id.
    pub rover_photos: Vec<RoverPhoto>,
    pub metrics: CorrelationMetrics,
    pub warnings: Vec<SourceWarning>,
}

impl DateCorrelation {
    /// Whether at least one source failed to contribute.
    pub fn is_partial(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Whether every source came back empty or failed.
    pub fn is_empty(&self) -> bool {
        self.imagery.is_none() && self.neo_objects.is_empty() && self.rover_photos.is_empty()
    }
}

impl fmt::Display for DateCorrelation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: imagery={} objects={} ({} hazardous) photos={}{}",
            self.date,
            if self.imagery.is_some() { "yes" } else { "no" },
            self.neo_objects.len(),
            self.metrics.hazardous_count,
            self.rover_photos.len(),
            if self.is_partial() {
                format!(" [{} warning(s)]", self.warnings.len())
            } else {
                String::new()
            },
        )
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Domain-specific error taxonomy for ASTROLABE.
///
/// Every variant carries a stable kind plus a cause chain sufficient
/// for the tool-dispatch shell to render a clear agent-facing message.
#[derive(Debug, thiserror::Error)]
pub enum AstroError {
    /// Caller mistake — malformed date, reversed range, unknown
    /// rover/camera. Raised before any request is issued; never retried.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Requested span exceeds the configured maximum for the source.
    /// Raised before any request is issued.
    #[error("Range too large: {requested_days} days requested, maximum is {max_days}")]
    RangeTooLarge { requested_days: i64, max_days: i64 },

    /// Network error, 5xx, or rate-limit response. Retried internally;
    /// only surfaced after all attempts are exhausted.
    #[error("Upstream transient failure ({provider}): {message}")]
    UpstreamTransient { provider: String, message: String },

    /// Upstream rejected the request (4xx other than rate-limit) or
    /// returned a body that failed strict normalization. Not retried.
    #[error("Upstream rejected request ({provider}): {message}")]
    UpstreamRejected {
        provider: String,
        status: Option<u16>,
        message: String,
    },

    /// Caller-initiated deadline/abort.
    #[error("Operation cancelled")]
    Cancelled,
}

impl AstroError {
    /// Stable machine-readable kind for the dispatch boundary.
    pub fn kind(&self) -> &'static str {
        match self {
            AstroError::InvalidArgument(_) => "invalid_argument",
            AstroError::RangeTooLarge { .. } => "range_too_large",
            AstroError::UpstreamTransient { .. } => "upstream_transient",
            AstroError::UpstreamRejected { .. } => "upstream_rejected",
            AstroError::Cancelled => "cancelled",
        }
    }

    /// Whether the failure class is retryable by the client.
    pub fn is_transient(&self) -> bool {
        matches!(self, AstroError::UpstreamTransient { .. })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_object() -> NearEarthObject {
        NearEarthObject {
            id: "3542519".to_string(),
            name: "(2010 PK9)".to_string(),
            diameter_min_km: 0.12,
            diameter_max_km: 0.27,
            velocity_kps: 18.4,
            miss_distance_km: 4_500_000.0,
            miss_distance_lunar: 11.7,
            approach_date: NaiveDate::from_ymd_opt(2023, 7, 2).unwrap(),
            hazardous: true,
        }
    }

    // -- SourceKind / warnings --

    #[test]
    fn test_source_kind_display() {
        assert_eq!(format!("{}", SourceKind::Imagery), "imagery");
        assert_eq!(format!("{}", SourceKind::NearEarthObjects), "near-earth-objects");
        assert_eq!(format!("{}", SourceKind::RoverPhotos), "rover-photos");
    }

    #[test]
    fn test_source_warning_display() {
        let w = SourceWarning {
            source: SourceKind::Imagery,
            message: "HTTP 503".to_string(),
        };
        assert_eq!(format!("{w}"), "[imagery] HTTP 503");
    }

    // -- MediaKind --

    #[test]
    fn test_media_kind_serialization() {
        assert_eq!(serde_json::to_string(&MediaKind::Image).unwrap(), "\"image\"");
        assert_eq!(serde_json::to_string(&MediaKind::Video).unwrap(), "\"video\"");
        let parsed: MediaKind = serde_json::from_str("\"video\"").unwrap();
        assert_eq!(parsed, MediaKind::Video);
    }

    // -- NearEarthObject --

    #[test]
    fn test_neo_display_hazardous_flag() {
        let obj = sample_object();
        let display = format!("{obj}");
        assert!(display.contains("HAZARDOUS"));
        assert!(display.contains("3542519"));
    }

    #[test]
    fn test_size_description_buckets() {
        let mut obj = sample_object();

        obj.diameter_max_km = 1.4;
        assert!(obj.size_description().contains("cities"));

        obj.diameter_max_km = 0.7;
        assert!(obj.size_description().contains("skyscraper"));

        obj.diameter_max_km = 0.2;
        assert!(obj.size_description().contains("football field"));

        obj.diameter_max_km = 0.06;
        assert!(obj.size_description().contains("large building"));

        obj.diameter_max_km = 0.02;
        assert!(obj.size_description().contains("house"));

        obj.diameter_max_km = 0.005;
        assert!(obj.size_description().contains("car"));
    }

    #[test]
    fn test_neo_serialization_roundtrip() {
        let obj = sample_object();
        let json = serde_json::to_string(&obj).unwrap();
        let parsed: NearEarthObject = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.id, "3542519");
        assert!(parsed.hazardous);
        assert_eq!(parsed.approach_date, obj.approach_date);
    }

    // -- RoverName --

    #[test]
    fn test_rover_all_is_alphabetical() {
        let names: Vec<String> = RoverName::ALL.iter().map(|r| r.slug().to_string()).collect();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
    }

    #[test]
    fn test_rover_from_str() {
        assert_eq!("curiosity".parse::<RoverName>().unwrap(), RoverName::Curiosity);
        assert_eq!("OPPORTUNITY".parse::<RoverName>().unwrap(), RoverName::Opportunity);
        assert_eq!("Spirit".parse::<RoverName>().unwrap(), RoverName::Spirit);
        assert!("perseverance".parse::<RoverName>().is_err());
    }

    #[test]
    fn test_rover_cameras_are_rover_specific() {
        assert!(RoverName::Curiosity.has_camera("MAST"));
        assert!(RoverName::Curiosity.has_camera("mahli")); // case-insensitive
        assert!(!RoverName::Curiosity.has_camera("PANCAM"));
        assert!(RoverName::Spirit.has_camera("PANCAM"));
        assert!(!RoverName::Spirit.has_camera("MAST"));
    }

    #[test]
    fn test_rover_serialization() {
        assert_eq!(serde_json::to_string(&RoverName::Curiosity).unwrap(), "\"curiosity\"");
        let parsed: RoverName = serde_json::from_str("\"spirit\"").unwrap();
        assert_eq!(parsed, RoverName::Spirit);
    }

    // -- RoverStatus --

    #[test]
    fn test_rover_status_mission_duration() {
        let status = RoverStatus {
            rover: RoverName::Spirit,
            launch_date: NaiveDate::from_ymd_opt(2003, 6, 10).unwrap(),
            landing_date: NaiveDate::from_ymd_opt(2004, 1, 4).unwrap(),
            status: MissionStatus::Complete,
            max_sol: 2208,
            max_date: NaiveDate::from_ymd_opt(2010, 3, 21).unwrap(),
            total_photos: 124_550,
        };
        assert_eq!(status.mission_duration_days(), 2268);
        assert!((status.mission_duration_years() - 6.2).abs() < 0.1);
        let display = format!("{status}");
        assert!(display.contains("Spirit"));
        assert!(display.contains("complete"));
    }

    // -- ThreatLevel --

    #[test]
    fn test_threat_level_ordering() {
        assert!(ThreatLevel::Low < ThreatLevel::Moderate);
        assert!(ThreatLevel::Moderate < ThreatLevel::High);
        assert!(ThreatLevel::High < ThreatLevel::Severe);
    }

    #[test]
    fn test_threat_level_display() {
        assert_eq!(format!("{}", ThreatLevel::Low), "LOW");
        assert_eq!(format!("{}", ThreatLevel::Severe), "SEVERE");
    }

    // -- DateCorrelation --

    #[test]
    fn test_correlation_partial_and_empty() {
        let mut c = DateCorrelation {
            date: NaiveDate::from_ymd_opt(2023, 7, 2).unwrap(),
            imagery: None,
            neo_objects: Vec::new(),
            rover_photos: Vec::new(),
            metrics: CorrelationMetrics::default(),
            warnings: Vec::new(),
        };
        assert!(c.is_empty());
        assert!(!c.is_partial());

        c.warnings.push(SourceWarning {
            source: SourceKind::RoverPhotos,
            message: "timeout".to_string(),
        });
        assert!(c.is_partial());

        c.neo_objects.push(sample_object());
        assert!(!c.is_empty());
    }

    #[test]
    fn test_correlation_display() {
        let c = DateCorrelation {
            date: NaiveDate::from_ymd_opt(2023, 7, 2).unwrap(),
            imagery: None,
            neo_objects: vec![sample_object()],
            rover_photos: Vec::new(),
            metrics: CorrelationMetrics {
                largest_diameter_km: Some(0.27),
                hazardous_count: 1,
            },
            warnings: vec![SourceWarning {
                source: SourceKind::Imagery,
                message: "HTTP 500".to_string(),
            }],
        };
        let display = format!("{c}");
        assert!(display.contains("objects=1"));
        assert!(display.contains("1 warning"));
    }

    // -- AstroError --

    #[test]
    fn test_error_kinds_are_stable() {
        assert_eq!(AstroError::InvalidArgument("x".into()).kind(), "invalid_argument");
        assert_eq!(
            AstroError::RangeTooLarge { requested_days: 10, max_days: 7 }.kind(),
            "range_too_large"
        );
        assert_eq!(AstroError::Cancelled.kind(), "cancelled");
    }

    #[test]
    fn test_error_display() {
        let e = AstroError::RangeTooLarge { requested_days: 12, max_days: 7 };
        assert_eq!(format!("{e}"), "Range too large: 12 days requested, maximum is 7");

        let e = AstroError::UpstreamRejected {
            provider: "neows".to_string(),
            status: Some(404),
            message: "no such object".to_string(),
        };
        let display = format!("{e}");
        assert!(display.contains("neows"));
        assert!(display.contains("no such object"));
    }

    #[test]
    fn test_error_transient_classification() {
        let transient = AstroError::UpstreamTransient {
            provider: "apod".to_string(),
            message: "connection reset".to_string(),
        };
        assert!(transient.is_transient());
        assert!(!AstroError::Cancelled.is_transient());
        assert!(!AstroError::InvalidArgument("x".into()).is_transient());
    }
}
