//! Scenario driver: validated entry parameters, a stepping simulation
//! with telemetry and narration triggers, and the impact summary.
//!
//! ## Example
//!
//! ```
//! use bolide::scenario::{run_scenario, ScenarioParams, SimulationConfig};
//!
//! let report = run_scenario(&ScenarioParams::default(), &SimulationConfig::default()).unwrap();
//! let impact = report.impact.expect("default scenario reaches the ground");
//! assert!(impact.energy_mt > 0.0);
//! ```

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::body::{sphere_mass, AsteroidType, Body};
use crate::constants::*;
use crate::entry::{step_atmospheric_entry, StepContext, StepResult};
use crate::geodesy::{ecef_to_lat_lng, vincenty_distance, LatLng};
use crate::impact::{impact_energy_mt_tnt, ImpactAssessment, TargetType};
use crate::targeting::{calculate_accurate_trajectory, TargetingConfig, TargetingRequest, TargetingSolution};
use crate::trajectory::{entry_state, is_escaping, Termination};

/// Rejected scenario or run configuration.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScenarioError {
    #[error("mass must be positive, got {0} kg")]
    NonPositiveMass(f64),

    #[error("diameter must be positive, got {0} m")]
    NonPositiveDiameter(f64),

    #[error("entry speed must be positive, got {0} m/s")]
    NonPositiveSpeed(f64),

    #[error("entry altitude must not be negative, got {0} m")]
    NegativeAltitude(f64),

    #[error("field '{field}' is not finite")]
    NonFinite { field: &'static str },

    #[error("target latitude must be within [-90, 90], got {0}")]
    LatitudeOutOfRange(f64),

    #[error("time step must be positive and finite, got {0} s")]
    InvalidTimeStep(f64),

    #[error("field '{field}' must be within {range}, got {value}")]
    OutOfRange {
        field: &'static str,
        range: &'static str,
        value: f64,
    },
}

/// Entry parameters for one impact scenario.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScenarioParams {
    pub mass_kg: f64,
    pub diameter_m: f64,
    /// Speed relative to the local air at entry (m/s).
    pub entry_speed_ms: f64,
    pub entry_altitude_m: f64,
    pub target_lat_deg: f64,
    pub target_lng_deg: f64,
    /// Flight-path angle below the horizon (deg).
    pub angle_deg: f64,
    pub asteroid_type: AsteroidType,
}

impl Default for ScenarioParams {
    fn default() -> Self {
        ScenarioParams {
            mass_kg: 1e9,
            diameter_m: 100.0,
            entry_speed_ms: 20_000.0,
            entry_altitude_m: 120_000.0,
            target_lat_deg: 0.0,
            target_lng_deg: 0.0,
            angle_deg: 45.0,
            asteroid_type: AsteroidType::Rocky,
        }
    }
}

impl ScenarioParams {
    /// Default scenario with the mass of a solid sphere of the given
    /// diameter and composition.
    pub fn from_diameter(diameter_m: f64, asteroid_type: AsteroidType) -> Self {
        ScenarioParams {
            mass_kg: sphere_mass(diameter_m, asteroid_type.properties().density),
            diameter_m,
            asteroid_type,
            ..Self::default()
        }
    }

    pub fn with_target(mut self, lat_deg: f64, lng_deg: f64) -> Self {
        self.target_lat_deg = lat_deg;
        self.target_lng_deg = lng_deg;
        self
    }

    /// Chelyabinsk superbolide, 15 February 2013.
    pub fn chelyabinsk() -> Self {
        ScenarioParams {
            mass_kg: 1.1e7,
            diameter_m: 18.0,
            entry_speed_ms: 19_000.0,
            entry_altitude_m: 120_000.0,
            target_lat_deg: 54.8,
            target_lng_deg: 61.1,
            angle_deg: 18.0,
            asteroid_type: AsteroidType::Rocky,
        }
    }

    /// Tunguska airburst, 30 June 1908.
    pub fn tunguska() -> Self {
        ScenarioParams {
            mass_kg: sphere_mass(60.0, AsteroidType::Icy.properties().density),
            diameter_m: 60.0,
            entry_speed_ms: 27_000.0,
            entry_altitude_m: 120_000.0,
            target_lat_deg: 60.886,
            target_lng_deg: 101.894,
            angle_deg: 30.0,
            asteroid_type: AsteroidType::Icy,
        }
    }

    /// Chicxulub impactor, end of the Cretaceous.
    pub fn chicxulub() -> Self {
        ScenarioParams {
            mass_kg: 1.3e15,
            diameter_m: 10_000.0,
            entry_speed_ms: 25_000.0,
            entry_altitude_m: 120_000.0,
            target_lat_deg: 21.4,
            target_lng_deg: -89.5,
            angle_deg: 60.0,
            asteroid_type: AsteroidType::Rocky,
        }
    }

    pub fn validate(&self) -> Result<(), ScenarioError> {
        let fields = [
            ("mass_kg", self.mass_kg),
            ("diameter_m", self.diameter_m),
            ("entry_speed_ms", self.entry_speed_ms),
            ("entry_altitude_m", self.entry_altitude_m),
            ("target_lat_deg", self.target_lat_deg),
            ("target_lng_deg", self.target_lng_deg),
            ("angle_deg", self.angle_deg),
        ];
        if let Some((field, _)) = fields.into_iter().find(|(_, v)| !v.is_finite()) {
            return Err(ScenarioError::NonFinite { field });
        }
        if self.mass_kg <= 0.0 {
            return Err(ScenarioError::NonPositiveMass(self.mass_kg));
        }
        if self.diameter_m <= 0.0 {
            return Err(ScenarioError::NonPositiveDiameter(self.diameter_m));
        }
        if self.entry_speed_ms <= 0.0 {
            return Err(ScenarioError::NonPositiveSpeed(self.entry_speed_ms));
        }
        if self.entry_altitude_m < 0.0 {
            return Err(ScenarioError::NegativeAltitude(self.entry_altitude_m));
        }
        if self.target_lat_deg.abs() > 90.0 {
            return Err(ScenarioError::LatitudeOutOfRange(self.target_lat_deg));
        }
        Ok(())
    }

    fn targeting_request(&self) -> TargetingRequest {
        TargetingRequest {
            target_lat_deg: self.target_lat_deg,
            target_lng_deg: self.target_lng_deg,
            mass_kg: self.mass_kg,
            diameter_m: self.diameter_m,
            entry_speed_ms: self.entry_speed_ms,
            entry_altitude_m: self.entry_altitude_m,
            angle_deg: self.angle_deg,
            asteroid_type: self.asteroid_type,
        }
    }
}

/// Run settings for [`Simulation`] and [`run_scenario`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Fixed physics step (s).
    pub dt: f64,
    pub max_steps: usize,
    /// Keep one telemetry sample every `sample_stride` steps.
    pub sample_stride: usize,
    pub target_type: TargetType,
    /// Distance at which seismic effects are reported (km).
    pub seismic_distance_km: f64,
    /// Distance at which blast effects are reported (km).
    pub blast_distance_km: f64,
    /// Correct the launch point so the impact lands on the target.
    pub apply_targeting: bool,
    pub targeting: TargetingConfig,
    /// Replaces the composition's ablation coefficient.
    pub ablation_coeff: Option<f64>,
    /// Cross-section scaling, 0..1.
    pub attitude_factor: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        SimulationConfig {
            dt: 0.02,
            max_steps: 100_000,
            sample_stride: 5,
            target_type: TargetType::default(),
            seismic_distance_km: 100.0,
            blast_distance_km: 50.0,
            apply_targeting: true,
            targeting: TargetingConfig::default(),
            ablation_coeff: None,
            attitude_factor: 1.0,
        }
    }
}

impl SimulationConfig {
    pub fn validate(&self) -> Result<(), ScenarioError> {
        if !(self.dt.is_finite() && self.dt > 0.0) {
            return Err(ScenarioError::InvalidTimeStep(self.dt));
        }
        let fields = [
            ("seismic_distance_km", self.seismic_distance_km),
            ("blast_distance_km", self.blast_distance_km),
            ("attitude_factor", self.attitude_factor),
        ];
        if let Some((field, _)) = fields.into_iter().find(|(_, v)| !v.is_finite()) {
            return Err(ScenarioError::NonFinite { field });
        }
        if !(0.0..=1.0).contains(&self.attitude_factor) {
            return Err(ScenarioError::OutOfRange {
                field: "attitude_factor",
                range: "[0, 1]",
                value: self.attitude_factor,
            });
        }
        for (field, value) in [
            ("seismic_distance_km", self.seismic_distance_km),
            ("blast_distance_km", self.blast_distance_km),
        ] {
            if value < 0.0 {
                return Err(ScenarioError::OutOfRange { field, range: "[0, inf)", value });
            }
        }
        if let Some(coeff) = self.ablation_coeff {
            if !coeff.is_finite() {
                return Err(ScenarioError::NonFinite { field: "ablation_coeff" });
            }
            if coeff < 0.0 {
                return Err(ScenarioError::OutOfRange { field: "ablation_coeff", range: "[0, inf)", value: coeff });
            }
        }
        Ok(())
    }

    fn step_context(&self) -> StepContext {
        let ctx = StepContext::new(self.dt).with_attitude_factor(self.attitude_factor);
        match self.ablation_coeff {
            Some(coeff) => ctx.with_ablation_coeff(coeff),
            None => ctx,
        }
    }
}

/// One charting sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySample {
    pub time_s: f64,
    pub altitude_m: f64,
    pub velocity_ms: f64,
    pub dynamic_pressure_pa: f64,
    pub heat_flux_wm2: f64,
    pub temperature_k: f64,
    pub mass_kg: f64,
}

impl TelemetrySample {
    fn from_step(time_s: f64, step: &StepResult) -> Self {
        TelemetrySample {
            time_s,
            altitude_m: step.altitude_m,
            velocity_ms: step.speed_ms,
            dynamic_pressure_pa: step.dynamic_pressure_pa,
            heat_flux_wm2: step.heat_flux_wm2,
            temperature_k: step.temperature_k,
            mass_kg: step.body.mass_kg,
        }
    }
}

/// Numeric triggers a front end turns into narration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SimEvent {
    /// The launch point was corrected before the run.
    Targeted {
        expected_deviation_km: f64,
        /// Miss of the aim measured last, before its final nudge.
        last_measured_deviation_km: f64,
        iterations: usize,
    },
    Fragmentation {
        time_s: f64,
        altitude_m: f64,
        dynamic_pressure_pa: f64,
        fragment_count: u32,
    },
    Impact {
        time_s: f64,
        lat: f64,
        lng: f64,
        energy_mt: f64,
    },
}

/// Stepping driver for one run.
///
/// Yields one [`StepResult`] per fixed step until the body reaches the
/// ground, escapes, or `max_steps` is spent.
#[derive(Debug, Clone)]
pub struct Simulation {
    body: Body,
    ctx: StepContext,
    max_steps: usize,
    steps: usize,
    elapsed_s: f64,
    peak_dynamic_pressure_pa: f64,
    peak_heat_flux_wm2: f64,
    events: Vec<SimEvent>,
    targeting: Option<TargetingSolution>,
    termination: Option<Termination>,
}

impl Simulation {
    /// Validate inputs, optionally run the targeting corrector, and place
    /// the body at its launch state.
    pub fn new(params: &ScenarioParams, config: &SimulationConfig) -> Result<Self, ScenarioError> {
        params.validate()?;
        config.validate()?;

        let mut events = Vec::new();
        let (targeting, pos, vel) = if config.apply_targeting {
            let sol = calculate_accurate_trajectory(&params.targeting_request(), &config.targeting);
            events.push(SimEvent::Targeted {
                expected_deviation_km: sol.expected_deviation_km,
                last_measured_deviation_km: sol.last_measured_deviation_km(),
                iterations: sol.iterations(),
            });
            let (pos, vel) = (sol.corrected_position, sol.corrected_velocity);
            (Some(sol), pos, vel)
        } else {
            let (pos, vel) = entry_state(
                params.target_lat_deg,
                params.target_lng_deg,
                params.entry_altitude_m,
                params.entry_speed_ms,
                params.angle_deg,
            );
            (None, pos, vel)
        };

        Ok(Simulation {
            body: Body::new(params.mass_kg, params.diameter_m, pos, vel, params.asteroid_type),
            ctx: config.step_context(),
            max_steps: config.max_steps,
            steps: 0,
            elapsed_s: 0.0,
            peak_dynamic_pressure_pa: 0.0,
            peak_heat_flux_wm2: 0.0,
            events,
            targeting,
            termination: None,
        })
    }

    pub fn body(&self) -> &Body {
        &self.body
    }

    pub fn elapsed_s(&self) -> f64 {
        self.elapsed_s
    }

    pub fn steps(&self) -> usize {
        self.steps
    }

    pub fn events(&self) -> &[SimEvent] {
        &self.events
    }

    pub fn targeting(&self) -> Option<&TargetingSolution> {
        self.targeting.as_ref()
    }

    /// `None` while the run is still going.
    pub fn termination(&self) -> Option<Termination> {
        self.termination
    }

    pub fn peak_dynamic_pressure_pa(&self) -> f64 {
        self.peak_dynamic_pressure_pa
    }

    pub fn peak_heat_flux_wm2(&self) -> f64 {
        self.peak_heat_flux_wm2
    }
}

impl Iterator for Simulation {
    type Item = StepResult;

    fn next(&mut self) -> Option<StepResult> {
        if self.termination.is_some() {
            return None;
        }
        if self.steps >= self.max_steps {
            log::warn!("Simulation stopped at the {}-step limit", self.max_steps);
            self.termination = Some(Termination::StepLimit);
            return None;
        }

        let result = step_atmospheric_entry(&self.body, &self.ctx);
        self.steps += 1;
        self.elapsed_s += self.ctx.dt;
        self.body = result.body.clone();
        self.peak_dynamic_pressure_pa = self.peak_dynamic_pressure_pa.max(result.dynamic_pressure_pa);
        self.peak_heat_flux_wm2 = self.peak_heat_flux_wm2.max(result.heat_flux_wm2);

        if result.fragmentation_occurred {
            self.events.push(SimEvent::Fragmentation {
                time_s: self.elapsed_s,
                altitude_m: result.altitude_m,
                dynamic_pressure_pa: result.dynamic_pressure_pa,
                fragment_count: result.body.fragment_count,
            });
        }

        if self.body.radius() <= R_EARTH {
            let hit = ecef_to_lat_lng(&self.body.position_m);
            self.events.push(SimEvent::Impact {
                time_s: self.elapsed_s,
                lat: hit.lat,
                lng: hit.lng,
                energy_mt: impact_energy_mt_tnt(result.energy_j),
            });
            self.termination = Some(Termination::Impact);
        } else if is_escaping(&self.body) {
            log::debug!("Simulation body escaped after {} steps", self.steps);
            self.termination = Some(Termination::Escape);
        }

        Some(result)
    }
}

/// Where and how hard the body hit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImpactSummary {
    pub time_s: f64,
    pub ecef: Vector3<f64>,
    pub lat: f64,
    pub lng: f64,
    /// Great-circle distance from the requested target (km).
    pub miss_distance_km: f64,
    pub energy_j: f64,
    pub energy_mt: f64,
    pub assessment: ImpactAssessment,
}

/// Everything a front end needs after a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationReport {
    pub params: ScenarioParams,
    pub initial_speed_ms: f64,
    pub telemetry: Vec<TelemetrySample>,
    pub events: Vec<SimEvent>,
    pub peak_dynamic_pressure_pa: f64,
    pub peak_heat_flux_wm2: f64,
    pub targeting: Option<TargetingSolution>,
    pub impact: Option<ImpactSummary>,
    pub termination: Termination,
    pub steps: usize,
    pub duration_s: f64,
}

impl SimulationReport {
    pub fn fragmented(&self) -> bool {
        self.events.iter().any(|e| matches!(e, SimEvent::Fragmentation { .. }))
    }
}

/// Run one scenario to completion.
pub fn run_scenario(params: &ScenarioParams, config: &SimulationConfig) -> Result<SimulationReport, ScenarioError> {
    let mut sim = Simulation::new(params, config)?;
    let initial_speed_ms = sim.body().speed();
    let stride = config.sample_stride.max(1);
    let mut telemetry = Vec::new();
    let mut last: Option<StepResult> = None;

    while let Some(step) = sim.next() {
        let done = sim.termination().is_some();
        if (sim.steps() - 1) % stride == 0 || done {
            telemetry.push(TelemetrySample::from_step(sim.elapsed_s(), &step));
        }
        last = Some(step);
    }

    let termination = sim.termination().unwrap_or(Termination::StepLimit);
    let impact = match (termination, &last) {
        (Termination::Impact, Some(step)) => {
            let ecef = step.body.position_m;
            let hit = ecef_to_lat_lng(&ecef);
            let target = LatLng::new(params.target_lat_deg, params.target_lng_deg);
            let energy_mt = impact_energy_mt_tnt(step.energy_j);
            log::info!(
                "Impact at ({:.4}, {:.4}) after {:.2} s, {:.3} Mt TNT",
                hit.lat,
                hit.lng,
                sim.elapsed_s(),
                energy_mt
            );
            Some(ImpactSummary {
                time_s: sim.elapsed_s(),
                ecef,
                lat: hit.lat,
                lng: hit.lng,
                miss_distance_km: vincenty_distance(hit, target) / 1000.0,
                energy_j: step.energy_j,
                energy_mt,
                assessment: ImpactAssessment::from_energy(
                    step.energy_j,
                    config.target_type,
                    config.seismic_distance_km,
                    config.blast_distance_km,
                ),
            })
        }
        _ => None,
    };

    Ok(SimulationReport {
        params: *params,
        initial_speed_ms,
        telemetry,
        peak_dynamic_pressure_pa: sim.peak_dynamic_pressure_pa(),
        peak_heat_flux_wm2: sim.peak_heat_flux_wm2(),
        steps: sim.steps(),
        duration_s: sim.elapsed_s(),
        events: sim.events,
        targeting: sim.targeting,
        impact,
        termination,
    })
}

/// Run independent scenarios in parallel, preserving input order.
pub fn run_batch(
    scenarios: &[ScenarioParams],
    config: &SimulationConfig,
) -> Vec<Result<SimulationReport, ScenarioError>> {
    use rayon::prelude::*;

    scenarios
        .par_iter()
        .map(|params| run_scenario(params, config))
        .collect()
}
