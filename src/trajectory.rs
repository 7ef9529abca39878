//! Ballistic trajectory prediction to ground contact.
//!
//! Repeatedly applies [`step_atmospheric_entry`] without ablation, choosing
//! the step size from the current altitude, until the body reaches the
//! mean-radius sphere, escapes, or the step budget runs out.
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::atmosphere::{air_velocity_at, escape_velocity};
use crate::body::Body;
use crate::constants::*;
use crate::entry::{step_atmospheric_entry, StepContext};
use crate::geodesy::{llh_to_ecef, local_frame};

/// Altitude-dependent step sizes for prediction.
///
/// The step is `dt_high` above `high_alt_m`, `dt_upper` above `mid_alt_m`,
/// `dt_mid` above `low_alt_m` and `dt_low` below.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StepSchedule {
    pub high_alt_m: f64,
    pub mid_alt_m: f64,
    pub low_alt_m: f64,
    pub dt_high: f64,
    pub dt_upper: f64,
    pub dt_mid: f64,
    pub dt_low: f64,
    /// Maximum number of steps before giving up.
    pub max_steps: usize,
}

impl Default for StepSchedule {
    fn default() -> Self {
        StepSchedule {
            high_alt_m: 150_000.0,
            mid_alt_m: 50_000.0,
            low_alt_m: 10_000.0,
            dt_high: 0.5,
            dt_upper: 0.2,
            dt_mid: 0.05,
            dt_low: 0.02,
            max_steps: 4000,
        }
    }
}

impl StepSchedule {
    /// Same thresholds with every step size multiplied by `factor`.
    pub fn scaled(factor: f64) -> Self {
        let base = Self::default();
        StepSchedule {
            dt_high: base.dt_high * factor,
            dt_upper: base.dt_upper * factor,
            dt_mid: base.dt_mid * factor,
            dt_low: base.dt_low * factor,
            ..base
        }
    }

    /// Step size (s) at altitude `alt_m`.
    pub fn dt_at(&self, alt_m: f64) -> f64 {
        if alt_m < self.low_alt_m {
            self.dt_low
        } else if alt_m < self.mid_alt_m {
            self.dt_mid
        } else if alt_m < self.high_alt_m {
            self.dt_upper
        } else {
            self.dt_high
        }
    }
}

/// Why a prediction stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Termination {
    /// Reached `|r| ≤ R_EARTH`.
    Impact,
    /// Faster than escape velocity beyond two Earth radii.
    Escape,
    /// Ran out of steps.
    StepLimit,
}

/// Result of [`predict_trajectory`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrajectoryPrediction {
    /// Position after each step (ECEF, m).
    pub path: Vec<Vector3<f64>>,
    /// Final position when the body reached the ground.
    pub impact_point: Option<Vector3<f64>>,
    /// Body state at the last step.
    pub final_body: Body,
    /// Elapsed time to ground contact (s); zero without impact.
    pub time_to_impact_s: f64,
    pub max_dynamic_pressure_pa: f64,
    pub steps: usize,
    pub termination: Termination,
}

impl TrajectoryPrediction {
    pub fn hit_ground(&self) -> bool {
        self.termination == Termination::Impact
    }
}

/// True once the body is outbound faster than escape velocity beyond 2 R_E.
pub fn is_escaping(body: &Body) -> bool {
    let r = body.radius();
    r > 2.0 * R_EARTH && body.speed() > escape_velocity(r)
}

/// Integrate `body` to ground contact with ablation disabled.
pub fn predict_trajectory(body: &Body, schedule: &StepSchedule) -> TrajectoryPrediction {
    let mut current = body.clone();
    let mut path = Vec::with_capacity(schedule.max_steps.min(1024));
    let mut elapsed = 0.0;
    let mut max_q: f64 = 0.0;

    for step in 0..schedule.max_steps {
        let alt = (current.radius() - R_EARTH).max(0.0);
        let dt = schedule.dt_at(alt);

        let result = step_atmospheric_entry(&current, &StepContext::without_ablation(dt));
        current = result.body;
        path.push(current.position_m);
        elapsed += dt;
        max_q = max_q.max(result.dynamic_pressure_pa);

        if current.radius() <= R_EARTH {
            log::debug!("Prediction reached ground after {} steps ({elapsed:.2} s)", step + 1);
            return TrajectoryPrediction {
                path,
                impact_point: Some(current.position_m),
                final_body: current,
                time_to_impact_s: elapsed,
                max_dynamic_pressure_pa: max_q,
                steps: step + 1,
                termination: Termination::Impact,
            };
        }

        if is_escaping(&current) {
            log::debug!("Prediction escaped after {} steps", step + 1);
            return TrajectoryPrediction {
                path,
                impact_point: None,
                final_body: current,
                time_to_impact_s: 0.0,
                max_dynamic_pressure_pa: max_q,
                steps: step + 1,
                termination: Termination::Escape,
            };
        }
    }

    log::warn!(
        "Prediction hit the {}-step limit at {:.1} km altitude",
        schedule.max_steps,
        (current.radius() - R_EARTH) / 1000.0
    );
    TrajectoryPrediction {
        steps: path.len(),
        path,
        impact_point: None,
        final_body: current,
        time_to_impact_s: 0.0,
        max_dynamic_pressure_pa: max_q,
        termination: Termination::StepLimit,
    }
}

/// ECEF launch state over a geodetic point.
///
/// The body heads due east, pitched `angle_deg` below the horizon, at
/// `speed_ms` relative to the air; the corotating air velocity is added so
/// the returned velocity is the one the integrator expects.
pub fn entry_state(
    lat_deg: f64,
    lng_deg: f64,
    alt_m: f64,
    speed_ms: f64,
    angle_deg: f64,
) -> (Vector3<f64>, Vector3<f64>) {
    let pos = llh_to_ecef(lat_deg, lng_deg, alt_m);
    let frame = local_frame(lat_deg, lng_deg);
    let angle = angle_deg * DEG2RAD;
    let v_horiz = angle.cos() * speed_ms;
    let v_down = angle.sin() * speed_ms;

    let v_air_rel = frame.to_ecef(v_horiz, 0.0, -v_down);
    (pos, v_air_rel + air_velocity_at(&pos))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::AsteroidType;
    use approx::assert_relative_eq;

    fn default_body(lat: f64, lng: f64) -> Body {
        let (pos, vel) = entry_state(lat, lng, 120_000.0, 20_000.0, 45.0);
        Body::new(1e9, 100.0, pos, vel, AsteroidType::Rocky)
    }

    #[test]
    fn test_schedule_thresholds() {
        let s = StepSchedule::default();
        assert_eq!(s.dt_at(200_000.0), 0.5);
        assert_eq!(s.dt_at(150_000.0), 0.5);
        assert_eq!(s.dt_at(100_000.0), 0.2);
        assert_eq!(s.dt_at(20_000.0), 0.05);
        assert_eq!(s.dt_at(5_000.0), 0.02);
        assert_relative_eq!(StepSchedule::scaled(0.5).dt_low, 0.01);
    }

    #[test]
    fn test_entry_state_geometry() {
        let (pos, vel) = entry_state(0.0, 0.0, 120_000.0, 20_000.0, 45.0);
        let rel = vel - air_velocity_at(&pos);
        assert_relative_eq!(rel.norm(), 20_000.0, epsilon = 1e-6);
        let up = local_frame(0.0, 0.0).u;
        // 45° below the horizon
        assert_relative_eq!(rel.dot(&up), -20_000.0 * (45.0 * DEG2RAD).sin(), epsilon = 1e-6);
    }

    #[test]
    fn test_default_entry_hits_ground() {
        let pred = predict_trajectory(&default_body(0.0, 0.0), &StepSchedule::default());
        assert!(pred.hit_ground());
        assert!(pred.steps < 4000);
        assert!(pred.time_to_impact_s > 0.0);
        assert!(pred.max_dynamic_pressure_pa > 0.0);
        assert!(pred.impact_point.unwrap().norm() <= R_EARTH);
        assert_eq!(pred.path.len(), pred.steps);
        // No ablation in prediction
        assert_eq!(pred.final_body.mass_kg, 1e9);
    }

    #[test]
    fn test_escape_detected() {
        let pos = Vector3::new(2.5 * R_EARTH, 0.0, 0.0);
        let vel = Vector3::new(20_000.0, 0.0, 0.0);
        let body = Body::new(1e6, 10.0, pos, vel, AsteroidType::Iron);
        let pred = predict_trajectory(&body, &StepSchedule::default());
        assert_eq!(pred.termination, Termination::Escape);
        assert!(pred.impact_point.is_none());
        assert_eq!(pred.time_to_impact_s, 0.0);
    }

    #[test]
    fn test_step_limit() {
        let body = default_body(0.0, 0.0);
        let schedule = StepSchedule { max_steps: 5, ..StepSchedule::default() };
        let pred = predict_trajectory(&body, &schedule);
        assert_eq!(pred.termination, Termination::StepLimit);
        assert_eq!(pred.steps, 5);
    }
}
