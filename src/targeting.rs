//! Targeting corrector: shift the launch point so the predicted impact
//! lands on a chosen target.
//!
//! A damped fixed-point iteration: predict the impact from the current
//! launch coordinates, measure the lat/lng miss against the target, and
//! move the launch coordinates by `miss × gain[k]`. The miss is converted
//! to kilometers with the coarse 111 km/° rule, not a geodesic.
//!
//! No convergence guarantee beyond the fixed iteration budget; callers
//! show whatever deviation remains.
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::body::{AsteroidType, Body};
use crate::constants::KM_PER_DEG;
use crate::geodesy::{ecef_to_lat_lng, wrap_longitude_delta, LatLng};
use crate::trajectory::{entry_state, predict_trajectory, StepSchedule};

/// Iteration settings for [`calculate_accurate_trajectory`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetingConfig {
    /// Damping gain per iteration; the length is the iteration budget.
    pub gains: Vec<f64>,
    /// Stop once the predicted miss is below this (km).
    pub tolerance_km: f64,
    /// Degree-to-kilometer factor for the miss estimate.
    pub km_per_deg: f64,
    /// Step schedule for each inner prediction.
    pub schedule: StepSchedule,
}

impl Default for TargetingConfig {
    fn default() -> Self {
        TargetingConfig {
            gains: vec![1.0, 0.7, 0.5, 0.4, 0.3],
            tolerance_km: 1.0,
            km_per_deg: KM_PER_DEG,
            schedule: StepSchedule::default(),
        }
    }
}

/// What the corrector needs to know about the entry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TargetingRequest {
    pub target_lat_deg: f64,
    pub target_lng_deg: f64,
    pub mass_kg: f64,
    pub diameter_m: f64,
    pub entry_speed_ms: f64,
    pub entry_altitude_m: f64,
    pub angle_deg: f64,
    pub asteroid_type: AsteroidType,
}

/// Corrected launch state and how far off the uncorrected aim was.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetingSolution {
    /// ECEF launch position (m).
    pub corrected_position: Vector3<f64>,
    /// ECEF launch velocity (m/s), corotating air included.
    pub corrected_velocity: Vector3<f64>,
    /// Launch coordinates after correction.
    pub launch: LatLng,
    /// Predicted miss when launching straight over the target (km).
    pub expected_deviation_km: f64,
    /// Miss measured in each iteration, in order (km).
    pub deviations_km: Vec<f64>,
}

impl TargetingSolution {
    /// Miss from the last prediction (km), measured for the aim before its
    /// final nudge rather than for `corrected_position`. Zero if nothing was
    /// predicted.
    pub fn last_measured_deviation_km(&self) -> f64 {
        self.deviations_km.last().copied().unwrap_or(0.0)
    }

    pub fn iterations(&self) -> usize {
        self.deviations_km.len()
    }
}

/// Find a launch point whose predicted impact lands on the target.
pub fn calculate_accurate_trajectory(req: &TargetingRequest, config: &TargetingConfig) -> TargetingSolution {
    let target = LatLng::new(req.target_lat_deg, req.target_lng_deg);
    let mut launch = target;
    let mut deviations_km = Vec::with_capacity(config.gains.len());

    for (iter, &gain) in config.gains.iter().enumerate() {
        let (pos, vel) = entry_state(launch.lat, launch.lng, req.entry_altitude_m, req.entry_speed_ms, req.angle_deg);
        let body = Body::new(req.mass_kg, req.diameter_m, pos, vel, req.asteroid_type);

        let prediction = predict_trajectory(&body, &config.schedule);
        let Some(impact_point) = prediction.impact_point else {
            log::warn!("Targeting iteration {}: no ground contact predicted, keeping current aim", iter + 1);
            break;
        };

        let impact = ecef_to_lat_lng(&impact_point);
        let lat_error = target.lat - impact.lat;
        let lng_error = wrap_longitude_delta(target.lng - impact.lng);
        let deviation_km = lat_error.hypot(lng_error) * config.km_per_deg;
        deviations_km.push(deviation_km);

        log::debug!(
            "Targeting iteration {}: impact ({:.4}, {:.4}), miss {:.2} km, gain {gain}",
            iter + 1,
            impact.lat,
            impact.lng,
            deviation_km
        );

        launch.lat += lat_error * gain;
        launch.lng = wrap_longitude_delta(launch.lng + lng_error * gain);

        if deviation_km < config.tolerance_km {
            break;
        }
    }

    let (corrected_position, corrected_velocity) =
        entry_state(launch.lat, launch.lng, req.entry_altitude_m, req.entry_speed_ms, req.angle_deg);
    let expected_deviation_km = deviations_km.first().copied().unwrap_or(0.0);

    log::info!(
        "Targeting: launch moved to ({:.4}, {:.4}) after {} iterations, uncorrected miss {:.1} km",
        launch.lat,
        launch.lng,
        deviations_km.len(),
        expected_deviation_km
    );

    TargetingSolution {
        corrected_position,
        corrected_velocity,
        launch,
        expected_deviation_km,
        deviations_km,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::Body;
    use crate::geodesy::{vincenty_distance, LatLng};

    fn request(lat: f64, lng: f64) -> TargetingRequest {
        TargetingRequest {
            target_lat_deg: lat,
            target_lng_deg: lng,
            mass_kg: 1e9,
            diameter_m: 100.0,
            entry_speed_ms: 20_000.0,
            entry_altitude_m: 120_000.0,
            angle_deg: 45.0,
            asteroid_type: AsteroidType::Rocky,
        }
    }

    fn impact_of(sol: &TargetingSolution, req: &TargetingRequest) -> LatLng {
        let body = Body::new(
            req.mass_kg,
            req.diameter_m,
            sol.corrected_position,
            sol.corrected_velocity,
            req.asteroid_type,
        );
        let pred = predict_trajectory(&body, &StepSchedule::default());
        ecef_to_lat_lng(&pred.impact_point.expect("corrected launch should reach the ground"))
    }

    #[test]
    fn test_equator_target_converges() {
        let req = request(0.0, 0.0);
        let sol = calculate_accurate_trajectory(&req, &TargetingConfig::default());

        // A 45° entry from 120 km travels well over 100 km downrange
        assert!(sol.expected_deviation_km > 50.0, "uncorrected miss {}", sol.expected_deviation_km);
        assert!(sol.iterations() >= 2);
        for pair in sol.deviations_km.windows(2) {
            assert!(pair[1] < pair[0], "deviation did not shrink: {:?}", sol.deviations_km);
        }

        // Launch point moved up-range (west, since the body flies east)
        assert!(sol.launch.lng < 0.0);

        let hit = impact_of(&sol, &req);
        let miss_km = vincenty_distance(hit, LatLng::new(0.0, 0.0)) / 1000.0;
        assert!(miss_km < 5.0, "corrected impact misses by {miss_km} km");
    }

    #[test]
    fn test_mid_latitude_target_improves() {
        let req = request(45.0, 10.0);
        let sol = calculate_accurate_trajectory(&req, &TargetingConfig::default());
        assert!(sol.last_measured_deviation_km() < sol.expected_deviation_km);
    }

    #[test]
    fn test_single_gain_is_one_prediction() {
        let req = request(0.0, 0.0);
        let config = TargetingConfig { gains: vec![1.0], ..TargetingConfig::default() };
        let sol = calculate_accurate_trajectory(&req, &config);
        assert_eq!(sol.iterations(), 1);
        assert_eq!(sol.expected_deviation_km, sol.last_measured_deviation_km());
    }

    #[test]
    fn test_antimeridian_target() {
        let req = request(0.0, 179.9);
        let sol = calculate_accurate_trajectory(&req, &TargetingConfig::default());
        // Wrapped errors keep the correction local instead of a 360° swing
        assert!(sol.last_measured_deviation_km() < sol.expected_deviation_km);
        assert!(sol.launch.lng.abs() <= 180.0);
    }
}
