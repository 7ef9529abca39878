//! Impact consequences: TNT equivalence, crater scaling, seismic and
//! blast estimates.
//!
//! All functions accept any finite input and clamp their outputs to
//! non-negative values. These are order-of-magnitude empirical fits for
//! visualization.
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::body::ParseKindError;
use crate::constants::*;

/// Overpressure below which buildings are considered undamaged (Pa).
const BLAST_DAMAGE_THRESHOLD_PA: f64 = 1000.0;
/// Intensity below which shaking is no longer widely felt.
const FELT_INTENSITY: f64 = 3.0;
const BLAST_SCAN_MAX_KM: u32 = 100;
const SEISMIC_SCAN_MAX_KM: u32 = 1000;

/// Joules to megatons of TNT.
pub fn impact_energy_mt_tnt(energy_j: f64) -> f64 {
    energy_j / J_PER_MT
}

/// Rough crater diameter (m) for a rocky surface: 1.8 km · E^(1/3).
pub fn simple_crater_diameter(energy_mt: f64) -> f64 {
    1800.0 * energy_mt.max(0.0).cbrt()
}

/// Surface material at the impact site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetType {
    #[default]
    Sediment,
    HardRock,
    Water,
}

impl TargetType {
    /// (diameter scale k1, depth/diameter ratio k2)
    fn scaling(self) -> (f64, f64) {
        match self {
            TargetType::Sediment => (1.8, 0.13),
            TargetType::HardRock => (1.3, 0.15),
            TargetType::Water => (3.2, 0.11),
        }
    }
}

impl fmt::Display for TargetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TargetType::Sediment => "sediment",
            TargetType::HardRock => "hardrock",
            TargetType::Water => "water",
        })
    }
}

impl FromStr for TargetType {
    type Err = ParseKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sediment" => Ok(TargetType::Sediment),
            "hardrock" | "hard_rock" => Ok(TargetType::HardRock),
            "water" => Ok(TargetType::Water),
            _ => Err(ParseKindError { kind: "target type", value: s.to_string() }),
        }
    }
}

/// Crater dimensions (m).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CraterEstimate {
    pub diameter: f64,
    pub depth: f64,
    pub rim_height: f64,
    pub ejecta_range: f64,
}

/// Crater dimensions for an impact of `energy_mt` into `target`.
///
/// D = k1 · E_Mt^(1/3) · 1000 m, depth = k2·D, rim = 0.15·depth,
/// ejecta = 2.5·D.
pub fn calculate_crater_diameter(energy_mt: f64, target: TargetType) -> CraterEstimate {
    let (k1, k2) = target.scaling();
    let diameter = k1 * energy_mt.max(0.0).cbrt() * 1000.0;
    let depth = diameter * k2;
    let rim_height = depth * 0.15;
    let ejecta_range = diameter * 2.5;

    CraterEstimate {
        diameter: diameter.max(1.0),
        depth: depth.max(0.1),
        rim_height: rim_height.max(0.01),
        ejecta_range: ejecta_range.max(diameter).max(1.0),
    }
}

/// Ground shaking at a distance from the impact.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeismicEffects {
    /// Richter-like magnitude, ≥ 0
    pub magnitude: f64,
    /// Mercalli-like intensity, 1..12
    pub intensity: f64,
    /// P-wave arrival (s)
    pub arrival_time_s: f64,
}

pub fn calculate_seismic_effects(energy_mt: f64, distance_km: f64) -> SeismicEffects {
    let magnitude = 0.67 * (energy_mt * J_PER_MT).log10() - 5.87;
    let intensity = magnitude - 3.0 * distance_km.log10() + 2.0;
    let arrival_time_s = (distance_km.max(0.0) * 1000.0) / P_WAVE_SPEED;

    SeismicEffects {
        magnitude: clamp_nan(magnitude, 0.0, f64::INFINITY),
        intensity: clamp_nan(intensity, 1.0, 12.0),
        arrival_time_s,
    }
}

/// Air blast at a distance from the impact.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BlastEffects {
    /// Peak overpressure (Pa)
    pub overpressure_pa: f64,
    /// Shock arrival at the speed of sound (s)
    pub arrival_time_s: f64,
    pub dynamic_pressure_pa: f64,
    pub wind_speed_ms: f64,
}

pub fn calculate_blast_effects(energy_mt: f64, distance_km: f64) -> BlastEffects {
    let yield_kt = energy_mt * 1e3;
    let scaled_distance = distance_km / yield_kt.cbrt();

    // Two-term fit in kPa, only valid inside a scaled distance of 10
    let overpressure = if scaled_distance > 0.0 && scaled_distance < 10.0 {
        (808.0 * scaled_distance.powf(-1.3) + 1.9 * scaled_distance.powi(-2)) * 1000.0
    } else {
        0.0
    };
    let overpressure = clamp_nan(overpressure, 0.0, f64::INFINITY);

    let dynamic_pressure = overpressure * 0.5;
    let wind_speed = (2.0 * dynamic_pressure / SEA_LEVEL_AIR_DENSITY).sqrt();

    BlastEffects {
        overpressure_pa: overpressure,
        arrival_time_s: (distance_km.max(0.0) * 1000.0) / SPEED_OF_SOUND,
        dynamic_pressure_pa: dynamic_pressure,
        wind_speed_ms: wind_speed,
    }
}

/// Velocity change imparted to Earth (m/s), from a
/// proxy momentum √(2·m·E) with m = 1e9 kg, coupled at 1e-6.
pub fn earth_impulse_delta_v(energy_j: f64) -> f64 {
    const COUPLING: f64 = 1e-6;
    const PROXY_MASS_KG: f64 = 1e9;
    let p = (2.0 * PROXY_MASS_KG * energy_j.max(0.0)).sqrt() * COUPLING;
    p / M_EARTH
}

/// Radius (m) at which blast overpressure drops below building-damage level.
///
/// Scans whole kilometers 1..=100 and saturates at 100 km.
pub fn blast_damage_radius_m(energy_mt: f64) -> f64 {
    (1..=BLAST_SCAN_MAX_KM)
        .map(f64::from)
        .find(|&d| calculate_blast_effects(energy_mt, d).overpressure_pa < BLAST_DAMAGE_THRESHOLD_PA)
        .unwrap_or(f64::from(BLAST_SCAN_MAX_KM))
        * 1000.0
}

/// Radius (m) beyond which shaking is no longer widely felt.
///
/// Scans 1, 11, 21, … km and saturates at 1000 km.
pub fn seismic_felt_radius_m(energy_mt: f64) -> f64 {
    (1..=SEISMIC_SCAN_MAX_KM)
        .step_by(10)
        .map(f64::from)
        .find(|&d| calculate_seismic_effects(energy_mt, d).intensity < FELT_INTENSITY)
        .unwrap_or(f64::from(SEISMIC_SCAN_MAX_KM))
        * 1000.0
}

/// Consequences of one impact, bundled for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImpactAssessment {
    pub energy_j: f64,
    pub energy_mt: f64,
    pub target: TargetType,
    pub crater: CraterEstimate,
    /// Seismic effects at `seismic_distance_km`.
    pub seismic: SeismicEffects,
    pub seismic_distance_km: f64,
    /// Blast effects at `blast_distance_km`.
    pub blast: BlastEffects,
    pub blast_distance_km: f64,
    pub blast_radius_m: f64,
    pub seismic_radius_m: f64,
    pub earth_delta_v_ms: f64,
}

impl ImpactAssessment {
    pub fn from_energy(energy_j: f64, target: TargetType, seismic_distance_km: f64, blast_distance_km: f64) -> Self {
        let energy_mt = impact_energy_mt_tnt(energy_j);
        ImpactAssessment {
            energy_j,
            energy_mt,
            target,
            crater: calculate_crater_diameter(energy_mt, target),
            seismic: calculate_seismic_effects(energy_mt, seismic_distance_km),
            seismic_distance_km,
            blast: calculate_blast_effects(energy_mt, blast_distance_km),
            blast_distance_km,
            blast_radius_m: blast_damage_radius_m(energy_mt),
            seismic_radius_m: seismic_felt_radius_m(energy_mt),
            earth_delta_v_ms: earth_impulse_delta_v(energy_j),
        }
    }
}

/// `value.clamp(lo, hi)`, mapping NaN (log of zero energy, etc.) to `lo`.
fn clamp_nan(value: f64, lo: f64, hi: f64) -> f64 {
    if value.is_nan() {
        lo
    } else {
        value.clamp(lo, hi)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_tnt_equivalence() {
        assert_relative_eq!(impact_energy_mt_tnt(4.184e15), 1.0);
        assert_relative_eq!(simple_crater_diameter(1.0), 1800.0);
        assert_eq!(simple_crater_diameter(-5.0), 0.0);
    }

    #[test]
    fn test_crater_one_megaton() {
        let c = calculate_crater_diameter(1.0, TargetType::Sediment);
        assert_relative_eq!(c.diameter, 1800.0, epsilon = 1e-9);
        assert_relative_eq!(c.depth, 234.0, epsilon = 1e-9);
        assert_relative_eq!(c.rim_height, 35.1, epsilon = 1e-9);
        assert_relative_eq!(c.ejecta_range, 4500.0, epsilon = 1e-9);
    }

    #[test]
    fn test_crater_monotonic_in_energy() {
        for target in [TargetType::Sediment, TargetType::HardRock, TargetType::Water] {
            let mut last = 0.0;
            for e in [1e-3, 0.1, 1.0, 15.0, 1e3, 1e8] {
                let d = calculate_crater_diameter(e, target).diameter;
                assert!(d > last, "{target}: {d} not above {last}");
                last = d;
            }
        }
    }

    #[test]
    fn test_crater_floors() {
        let c = calculate_crater_diameter(0.0, TargetType::HardRock);
        assert_eq!(c.diameter, 1.0);
        assert_eq!(c.depth, 0.1);
        assert_eq!(c.rim_height, 0.01);
        assert!(c.ejecta_range >= 1.0);
    }

    #[test]
    fn test_target_materials_order() {
        let water = calculate_crater_diameter(1.0, TargetType::Water).diameter;
        let sediment = calculate_crater_diameter(1.0, TargetType::Sediment).diameter;
        let rock = calculate_crater_diameter(1.0, TargetType::HardRock).diameter;
        assert!(water > sediment && sediment > rock);
        assert_eq!("HardRock".parse::<TargetType>().unwrap(), TargetType::HardRock);
        assert!("lava".parse::<TargetType>().is_err());
    }

    #[test]
    fn test_seismic() {
        let s = calculate_seismic_effects(1.0, 100.0);
        let expected_mag = 0.67 * 4.184e15f64.log10() - 5.87;
        assert_relative_eq!(s.magnitude, expected_mag, epsilon = 1e-12);
        assert_relative_eq!(s.intensity, (expected_mag - 6.0 + 2.0).max(1.0), epsilon = 1e-12);
        assert_relative_eq!(s.arrival_time_s, 100_000.0 / 6000.0);

        let near = calculate_seismic_effects(1e6, 0.001);
        assert_eq!(near.intensity, 12.0);
        let none = calculate_seismic_effects(0.0, 10.0);
        assert_eq!(none.magnitude, 0.0);
        assert_eq!(none.intensity, 1.0);
    }

    #[test]
    fn test_blast() {
        let near = calculate_blast_effects(1.0, 5.0);
        let far = calculate_blast_effects(1.0, 20.0);
        assert!(near.overpressure_pa > far.overpressure_pa);
        assert_relative_eq!(near.dynamic_pressure_pa, near.overpressure_pa * 0.5);
        assert_relative_eq!(near.wind_speed_ms, (near.overpressure_pa / 1.225).sqrt(), epsilon = 1e-9);
        assert_relative_eq!(near.arrival_time_s, 5000.0 / 343.0);

        // Outside the fit
        let out = calculate_blast_effects(1e-6, 50.0);
        assert_eq!(out.overpressure_pa, 0.0);
        assert_eq!(out.wind_speed_ms, 0.0);
    }

    #[test]
    fn test_damage_radii_grow_with_energy() {
        let small = blast_damage_radius_m(0.5);
        let large = blast_damage_radius_m(5.0);
        assert!(large >= small);
        assert!(small >= 1000.0);

        // Far beyond the scan: saturates
        assert_eq!(blast_damage_radius_m(1e6), 100_000.0);

        assert_eq!(seismic_felt_radius_m(1.0), 21_000.0);
        assert!(seismic_felt_radius_m(1e3) > seismic_felt_radius_m(1.0));
        assert_eq!(seismic_felt_radius_m(0.0), 1000.0);
    }

    #[test]
    fn test_earth_delta_v_negligible() {
        let dv = earth_impulse_delta_v(1e20);
        assert!(dv > 0.0 && dv < 1e-15);
        assert_eq!(earth_impulse_delta_v(-1.0), 0.0);
    }

    #[test]
    fn test_assessment_bundle() {
        let a = ImpactAssessment::from_energy(4.184e15, TargetType::Sediment, 100.0, 50.0);
        assert_relative_eq!(a.energy_mt, 1.0);
        assert_relative_eq!(a.crater.diameter, 1800.0, epsilon = 1e-9);
        assert_eq!(a.seismic_distance_km, 100.0);
        assert_eq!(a.blast_distance_km, 50.0);
    }
}
