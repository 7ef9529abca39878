//! Layered standard-atmosphere profile, central gravity and the
//! corotating air field.
//!
//! Four segments:
//! - troposphere (≤ 11 km): linear lapse −6.5 K/km from 288.15 K / 101 325 Pa
//! - lower stratosphere (≤ 25 km): isothermal 216.65 K, pressure scale 6341.6 m
//! - upper stratosphere (≤ 47 km): lapse +1 K/km
//! - above 47 km: ρ₀·exp(−h / 7000 m)
//!
//! Adequate for a visual/educational entry model, not for precision
//! reentry work.
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::constants::*;

const TROPOPAUSE_M: f64 = 11_000.0;
const LOWER_STRATOSPHERE_TOP_M: f64 = 25_000.0;
const STRATOPAUSE_M: f64 = 47_000.0;

const TROPOSPHERE_LAPSE: f64 = -0.0065;
const UPPER_STRATOSPHERE_LAPSE: f64 = 0.001;
const TROPOPAUSE_TEMPERATURE: f64 = 216.65;
const TROPOPAUSE_PRESSURE: f64 = 22_632.0;
const LOWER_STRATOSPHERE_SCALE_M: f64 = 6341.6;
const UPPER_STRATOSPHERE_BASE_PRESSURE: f64 = 2488.66;
const UPPER_ATMOSPHERE_SCALE_M: f64 = 7000.0;

/// Density and temperature at one altitude.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AtmosphereSample {
    /// kg/m³
    pub density: f64,
    /// K
    pub temperature: f64,
}

/// Air density (kg/m³) at a geometric altitude (m). Sea-level density at
/// or below zero altitude.
pub fn air_density_at_altitude(alt_m: f64) -> f64 {
    if alt_m <= 0.0 {
        return SEA_LEVEL_AIR_DENSITY;
    }

    if alt_m <= TROPOPAUSE_M {
        let t = SEA_LEVEL_TEMPERATURE + TROPOSPHERE_LAPSE * alt_m;
        let p = SEA_LEVEL_PRESSURE * (t / SEA_LEVEL_TEMPERATURE).powf(5.256);
        p / (R_AIR * t)
    } else if alt_m <= LOWER_STRATOSPHERE_TOP_M {
        let p = TROPOPAUSE_PRESSURE * (-(alt_m - TROPOPAUSE_M) / LOWER_STRATOSPHERE_SCALE_M).exp();
        p / (R_AIR * TROPOPAUSE_TEMPERATURE)
    } else if alt_m <= STRATOPAUSE_M {
        let t = TROPOPAUSE_TEMPERATURE + UPPER_STRATOSPHERE_LAPSE * (alt_m - LOWER_STRATOSPHERE_TOP_M);
        let p = UPPER_STRATOSPHERE_BASE_PRESSURE * (t / TROPOPAUSE_TEMPERATURE).powf(-34.163);
        p / (R_AIR * t)
    } else {
        SEA_LEVEL_AIR_DENSITY * (-alt_m / UPPER_ATMOSPHERE_SCALE_M).exp()
    }
}

/// Ambient air temperature (K) at a geometric altitude (m).
pub fn air_temperature_at_altitude(alt_m: f64) -> f64 {
    if alt_m <= TROPOPAUSE_M {
        SEA_LEVEL_TEMPERATURE + TROPOSPHERE_LAPSE * alt_m
    } else if alt_m <= LOWER_STRATOSPHERE_TOP_M {
        TROPOPAUSE_TEMPERATURE
    } else if alt_m <= STRATOPAUSE_M {
        TROPOPAUSE_TEMPERATURE + UPPER_STRATOSPHERE_LAPSE * (alt_m - LOWER_STRATOSPHERE_TOP_M)
    } else {
        (270.65 - 0.0028 * (alt_m - STRATOPAUSE_M)).max(180.0)
    }
}

/// Density and temperature together.
pub fn sample_atmosphere(alt_m: f64) -> AtmosphereSample {
    AtmosphereSample {
        density: air_density_at_altitude(alt_m),
        temperature: air_temperature_at_altitude(alt_m),
    }
}

/// Central-force gravitational acceleration (m/s²) at an ECEF position.
///
/// a = −GM / r² · r̂. The origin itself yields zero.
pub fn gravity_accel_at_pos(pos: &Vector3<f64>) -> Vector3<f64> {
    let r = pos.norm();
    if r == 0.0 {
        return Vector3::zeros();
    }
    -pos * (GM_EARTH / (r * r * r))
}

/// Velocity of the corotating atmosphere at an ECEF position: ω × r.
pub fn air_velocity_at(pos: &Vector3<f64>) -> Vector3<f64> {
    Vector3::new(0.0, 0.0, OMEGA_EARTH).cross(pos)
}

/// Local escape velocity (m/s) at radius `r_m`.
pub fn escape_velocity(r_m: f64) -> f64 {
    (2.0 * GM_EARTH / r_m).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_sea_level() {
        // Ideal-gas density at 288.15 K / 101325 Pa
        assert_relative_eq!(air_density_at_altitude(1e-3), 1.225, epsilon = 1e-3);
        assert_relative_eq!(air_density_at_altitude(0.0), SEA_LEVEL_AIR_DENSITY);
        assert_relative_eq!(air_density_at_altitude(-500.0), SEA_LEVEL_AIR_DENSITY);
        assert_relative_eq!(air_temperature_at_altitude(0.0), 288.15);
    }

    #[test]
    fn test_density_decreases_through_layers() {
        let alts = [1_000.0, 10_000.0, 20_000.0, 30_000.0, 46_000.0, 60_000.0, 100_000.0, 150_000.0];
        for pair in alts.windows(2) {
            let lo = air_density_at_altitude(pair[0]);
            let hi = air_density_at_altitude(pair[1]);
            assert!(hi < lo, "density at {} ({hi}) not below {} ({lo})", pair[1], pair[0]);
        }
    }

    #[test]
    fn test_layer_boundaries_are_close() {
        // The fit is piecewise; adjacent segments should agree within a few percent.
        let below = air_density_at_altitude(TROPOPAUSE_M);
        let above = air_density_at_altitude(TROPOPAUSE_M + 1.0);
        assert_relative_eq!(below, above, max_relative = 0.02);

        let below = air_density_at_altitude(LOWER_STRATOSPHERE_TOP_M);
        let above = air_density_at_altitude(LOWER_STRATOSPHERE_TOP_M + 1.0);
        assert_relative_eq!(below, above, max_relative = 0.02);
    }

    #[test]
    fn test_temperature_profile() {
        assert_relative_eq!(air_temperature_at_altitude(11_000.0), 216.65, epsilon = 1e-9);
        assert_relative_eq!(air_temperature_at_altitude(20_000.0), 216.65);
        assert_relative_eq!(air_temperature_at_altitude(47_000.0), 238.65, epsilon = 1e-9);
        assert_relative_eq!(air_temperature_at_altitude(300_000.0), 180.0);
        let s = sample_atmosphere(5_000.0);
        assert_relative_eq!(s.temperature, 255.65, epsilon = 1e-9);
        assert!(s.density < SEA_LEVEL_AIR_DENSITY);
    }

    #[test]
    fn test_gravity_surface() {
        let g = gravity_accel_at_pos(&Vector3::new(R_EARTH, 0.0, 0.0));
        assert_relative_eq!(g.x, -9.82, epsilon = 0.01);
        assert!(g.y.abs() < 1e-12 && g.z.abs() < 1e-12);
        assert_eq!(gravity_accel_at_pos(&Vector3::zeros()), Vector3::zeros());
    }

    #[test]
    fn test_corotating_air() {
        let v = air_velocity_at(&Vector3::new(R_EARTH, 0.0, 0.0));
        assert_relative_eq!(v.y, OMEGA_EARTH * R_EARTH, epsilon = 1e-9);
        assert!(v.x.abs() < 1e-12 && v.z.abs() < 1e-12);
        // No rotation speed on the polar axis
        assert_eq!(air_velocity_at(&Vector3::new(0.0, 0.0, R_EARTH)).norm(), 0.0);
    }

    #[test]
    fn test_escape_velocity_surface() {
        assert_relative_eq!(escape_velocity(R_EARTH), 11_186.0, epsilon = 10.0);
    }
}
