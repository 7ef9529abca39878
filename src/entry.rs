//! Atmospheric entry step: drag, gravity, ablation and fragmentation.
//!
//! `step_atmospheric_entry` is a pure transformation `(Body, StepContext) -> StepResult`.
//! It never fails and has no notion of termination; callers stop on ground
//! contact (`|r| ≤ R_EARTH`) or escape.
//!
//! # Per-step physics
//! - Drag against the corotating air: F = ½ ρ v_rel² C_d A
//! - Semi-implicit Euler: v' = v + a·dt, then r' = r + v'·dt
//! - Heat flux (simplified Sutton-Graves): q̇ = ½·sqrt(ρ / (R_E/1000))·sqrt(ρ)·v_rel³
//! - Ablation capped at 5 % of the mass per step, diameter re-derived
//!   from a constant-density sphere
//! - One-shot fragmentation when dynamic pressure exceeds strength
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::atmosphere::{air_density_at_altitude, air_temperature_at_altitude, air_velocity_at, gravity_accel_at_pos};
use crate::body::{sphere_diameter, Body};
use crate::constants::*;

/// Ablation only runs below this altitude (m).
const ABLATION_CEILING_M: f64 = 150_000.0;
/// Ablation only runs above this speed (m/s).
const ABLATION_MIN_SPEED: f64 = 100.0;
/// Largest fraction of the mass that may ablate in one step.
const MAX_MASS_LOSS_FRACTION: f64 = 0.05;
/// Strength may drop at most to this fraction of its previous value per step.
const STRENGTH_FLOOR_FRACTION: f64 = 0.9;
/// Mass never drops below this (kg).
const MIN_MASS_KG: f64 = 0.1;
const MAX_FRAGMENTS: u32 = 10;
const FRAGMENT_AREA_FACTOR: f64 = 1.5;

/// Per-step inputs other than the body.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StepContext {
    /// Step size (s). Must be small; no sub-stepping happens here.
    pub dt: f64,
    /// Effective cross-section scaling, 0..1.
    pub attitude_factor: f64,
    /// Overrides the composition's ablation coefficient. Zero disables ablation.
    pub ablation_coeff: Option<f64>,
    /// Overrides the composition's density for the diameter update.
    pub material_density: Option<f64>,
}

impl StepContext {
    pub fn new(dt: f64) -> Self {
        StepContext {
            dt,
            attitude_factor: 1.0,
            ablation_coeff: None,
            material_density: None,
        }
    }

    /// Step without mass loss, as used for trajectory prediction.
    pub fn without_ablation(dt: f64) -> Self {
        StepContext {
            ablation_coeff: Some(0.0),
            ..StepContext::new(dt)
        }
    }

    pub fn with_attitude_factor(mut self, factor: f64) -> Self {
        self.attitude_factor = factor;
        self
    }

    pub fn with_ablation_coeff(mut self, coeff: f64) -> Self {
        self.ablation_coeff = Some(coeff);
        self
    }
}

/// Everything one step produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepResult {
    pub body: Body,
    /// ½ ρ v_rel² (Pa)
    pub dynamic_pressure_pa: f64,
    /// Altitude above the mean sphere at the start of the step, clamped ≥ 0 (m)
    pub altitude_m: f64,
    /// ECEF speed after the step (m/s)
    pub speed_ms: f64,
    /// Kinetic energy after the step (J)
    pub energy_j: f64,
    pub heat_flux_wm2: f64,
    pub mass_loss_kg: f64,
    /// Stagnation temperature (K)
    pub temperature_k: f64,
    /// True only on the step where the body broke up.
    pub fragmentation_occurred: bool,
}

/// Frontal area (m²) of a sphere of diameter `d`, scaled by attitude.
pub fn cross_section_area(diameter_m: f64, attitude_factor: f64) -> f64 {
    let r = diameter_m / 2.0 * attitude_factor.sqrt();
    std::f64::consts::PI * r * r
}

/// Advance a body by one step through the atmosphere.
pub fn step_atmospheric_entry(body: &Body, ctx: &StepContext) -> StepResult {
    let dt = ctx.dt;
    let r = body.position_m.norm();
    let altitude = (r - R_EARTH).max(0.0);
    let rho = air_density_at_altitude(altitude);
    let ambient_temp = air_temperature_at_altitude(altitude);

    let props = body.properties();
    let cd = body.drag_coeff.unwrap_or(props.drag_coeff);
    let area = cross_section_area(body.diameter_m * body.area_multiplier.sqrt(), ctx.attitude_factor);

    // Drag acts on velocity relative to the corotating air
    let v_rel = body.velocity_ms - air_velocity_at(&body.position_m);
    let rel_speed = v_rel.norm();

    let drag_force = 0.5 * rho * rel_speed * rel_speed * cd * area;
    let drag_dir = if rel_speed > 0.0 { -v_rel / rel_speed } else { Vector3::zeros() };
    let a_drag = drag_dir * (drag_force / body.mass_kg);

    let a_total = gravity_accel_at_pos(&body.position_m) + a_drag;

    // Velocity first, then position with the new velocity
    let new_vel = body.velocity_ms + a_total * dt;
    let new_pos = body.position_m + new_vel * dt;

    let speed = new_vel.norm();
    let energy = 0.5 * body.mass_kg * speed * speed;
    let q = 0.5 * rho * rel_speed * rel_speed;

    let stagnation_temp = ambient_temp + rel_speed * rel_speed / (2.0 * CP_AIR);
    let heat_transfer_coeff = 0.5 * (rho / (R_EARTH / 1000.0)).sqrt();
    let heat_flux = heat_transfer_coeff * rho.sqrt() * rel_speed.powi(3);

    let ablation_coeff = ctx.ablation_coeff.unwrap_or(props.ablation_coeff);
    let mut mass_loss = 0.0;
    let mut new_mass = body.mass_kg;
    let mut new_diameter = body.diameter_m;
    let mut new_strength = body.strength.unwrap_or(props.strength);

    if ablation_coeff > 0.0 && altitude < ABLATION_CEILING_M && speed > ABLATION_MIN_SPEED {
        mass_loss = (ablation_coeff * heat_flux * area * dt)
            .max(0.0)
            .min(body.mass_kg * MAX_MASS_LOSS_FRACTION);
        new_mass = (body.mass_kg - mass_loss).max(MIN_MASS_KG);

        let density = ctx.material_density.unwrap_or(props.density);
        new_diameter = sphere_diameter(new_mass, density);

        // Thermal stress in Pa tracks the heat flux one-to-one
        new_strength = (new_strength * STRENGTH_FLOOR_FRACTION).max(new_strength - heat_flux);
    }

    let mut fragmentation_occurred = false;
    let mut fragment_count = body.fragment_count;
    let mut area_multiplier = body.area_multiplier;

    if !body.fragmented && q > new_strength {
        fragmentation_occurred = true;
        let stress_ratio = q / new_strength;
        fragment_count = (2.0 + stress_ratio).floor().min(MAX_FRAGMENTS as f64) as u32;
        area_multiplier = (fragment_count as f64).sqrt() * FRAGMENT_AREA_FACTOR;
        log::debug!(
            "Fragmentation at {:.1} km: q = {:.2} MPa > strength {:.2} MPa, {} fragments",
            altitude / 1000.0,
            q / 1e6,
            new_strength / 1e6,
            fragment_count
        );
    }

    StepResult {
        body: Body {
            position_m: new_pos,
            velocity_ms: new_vel,
            mass_kg: new_mass,
            diameter_m: new_diameter,
            strength: Some(new_strength),
            fragmented: body.fragmented || fragmentation_occurred,
            fragment_count,
            area_multiplier,
            ..body.clone()
        },
        dynamic_pressure_pa: q,
        altitude_m: altitude,
        speed_ms: speed,
        energy_j: energy,
        heat_flux_wm2: heat_flux,
        mass_loss_kg: mass_loss,
        temperature_k: stagnation_temp,
        fragmentation_occurred,
    }
}
