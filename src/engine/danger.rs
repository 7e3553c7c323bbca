//! Deterministic threat scoring for near-Earth objects.
//!
//! A pure function of the object's fields: no network, no clock, no
//! randomness. Identical input yields bit-identical output, and the
//! classification is monotonic in every dimension — a bigger, closer,
//! or faster object never scores lower.

use crate::types::{DangerAssessment, NearEarthObject, ThreatLevel};

/// Reference diameter: objects at or above 2 km saturate the component.
pub const DIAMETER_REF_KM: f64 = 2.0;

/// Reference miss distance: beyond 10 million km the proximity
/// component bottoms out. (The Moon orbits at ~0.38 million km.)
pub const MISS_REF_KM: f64 = 10_000_000.0;

/// Reference approach velocity: 40 km/s is near the upper bound for
/// heliocentric close approaches.
pub const VELOCITY_REF_KPS: f64 = 40.0;

const W_DIAMETER: f64 = 0.40;
const W_PROXIMITY: f64 = 0.35;
const W_VELOCITY: f64 = 0.25;

/// Fixed additive bump for upstream's hazardous classification.
const HAZARD_BONUS: f64 = 0.15;

const T_MODERATE: f64 = 0.25;
const T_HIGH: f64 = 0.50;
const T_SEVERE: f64 = 0.75;

/// Score one object against the fixed reference ranges.
pub fn assess(object: &NearEarthObject) -> DangerAssessment {
    let diameter_component = (object.diameter_max_km / DIAMETER_REF_KM).clamp(0.0, 1.0);
    let proximity_component = 1.0 - (object.miss_distance_km / MISS_REF_KM).clamp(0.0, 1.0);
    let velocity_component = (object.velocity_kps / VELOCITY_REF_KPS).clamp(0.0, 1.0);

    let mut score = W_DIAMETER * diameter_component
        + W_PROXIMITY * proximity_component
        + W_VELOCITY * velocity_component;
    if object.hazardous {
        score += HAZARD_BONUS;
    }
    let score = score.clamp(0.0, 1.0);

    DangerAssessment {
        object_id: object.id.clone(),
        object_name: object.name.clone(),
        score,
        level: classify(score),
        diameter_component,
        proximity_component,
        velocity_component,
        hazardous: object.hazardous,
        size_description: object.size_description(),
    }
}

/// Map a composite score onto the four threat levels.
pub fn classify(score: f64) -> ThreatLevel {
    if score < T_MODERATE {
        ThreatLevel::Low
    } else if score < T_HIGH {
        ThreatLevel::Moderate
    } else if score < T_SEVERE {
        ThreatLevel::High
    } else {
        ThreatLevel::Severe
    }
}
