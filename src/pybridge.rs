//! Python bindings via PyO3 for BOLIDE.
use nalgebra::Vector3;
use pyo3::prelude::*;
use pyo3::types::PyDict;

use crate::atmosphere;
use crate::body::AsteroidType;
use crate::geodesy::{self, LatLng};
use crate::impact::{self, TargetType};
use crate::scenario::{run_scenario, ScenarioParams, SimulationConfig};
use crate::targeting::{calculate_accurate_trajectory, TargetingConfig, TargetingRequest};

fn value_error<E: std::fmt::Display>(e: E) -> PyErr {
    pyo3::exceptions::PyValueError::new_err(e.to_string())
}

fn vec3(v: &Vector3<f64>) -> Vec<f64> {
    vec![v.x, v.y, v.z]
}

// Scenario
#[pyclass(name = "Scenario")]
#[derive(Clone)]
pub struct PyScenario {
    inner: ScenarioParams,
    config: SimulationConfig,
}

#[pymethods]
impl PyScenario {
    /// Create a scenario.
    ///
    /// Args:
    ///     asteroid_type: "rocky", "iron", "icy" or "carbon"
    ///     target_type: "sediment", "hardrock" or "water"
    ///     targeting: correct the launch point toward the target (default: True)
    #[new]
    #[pyo3(signature = (
        mass_kg=1e9,
        diameter_m=100.0,
        entry_speed_ms=20_000.0,
        entry_altitude_m=120_000.0,
        target_lat_deg=0.0,
        target_lng_deg=0.0,
        angle_deg=45.0,
        asteroid_type="rocky",
        target_type="sediment",
        targeting=true,
    ))]
    #[allow(clippy::too_many_arguments)]
    fn new(
        mass_kg: f64,
        diameter_m: f64,
        entry_speed_ms: f64,
        entry_altitude_m: f64,
        target_lat_deg: f64,
        target_lng_deg: f64,
        angle_deg: f64,
        asteroid_type: &str,
        target_type: &str,
        targeting: bool,
    ) -> PyResult<Self> {
        let inner = ScenarioParams {
            mass_kg,
            diameter_m,
            entry_speed_ms,
            entry_altitude_m,
            target_lat_deg,
            target_lng_deg,
            angle_deg,
            asteroid_type: asteroid_type.parse::<AsteroidType>().map_err(value_error)?,
        };
        inner.validate().map_err(value_error)?;
        let config = SimulationConfig {
            target_type: target_type.parse::<TargetType>().map_err(value_error)?,
            apply_targeting: targeting,
            ..SimulationConfig::default()
        };
        Ok(PyScenario { inner, config })
    }

    #[staticmethod]
    fn chelyabinsk() -> Self {
        PyScenario { inner: ScenarioParams::chelyabinsk(), config: SimulationConfig::default() }
    }

    #[staticmethod]
    fn tunguska() -> Self {
        PyScenario { inner: ScenarioParams::tunguska(), config: SimulationConfig::default() }
    }

    #[staticmethod]
    fn chicxulub() -> Self {
        PyScenario { inner: ScenarioParams::chicxulub(), config: SimulationConfig::default() }
    }

    /// Run to completion and return a summary dict.
    ///
    /// `telemetry` is a list of [t, altitude, velocity, q, heat_flux, temperature, mass].
    fn run(&self, py: Python<'_>) -> PyResult<Py<PyDict>> {
        let report = run_scenario(&self.inner, &self.config).map_err(value_error)?;

        let dict = PyDict::new(py);
        dict.set_item("termination", format!("{:?}", report.termination).to_lowercase())?;
        dict.set_item("steps", report.steps)?;
        dict.set_item("duration_s", report.duration_s)?;
        dict.set_item("initial_speed_ms", report.initial_speed_ms)?;
        dict.set_item("peak_dynamic_pressure_pa", report.peak_dynamic_pressure_pa)?;
        dict.set_item("peak_heat_flux_wm2", report.peak_heat_flux_wm2)?;
        dict.set_item("fragmented", report.fragmented())?;
        dict.set_item(
            "expected_deviation_km",
            report.targeting.as_ref().map(|t| t.expected_deviation_km),
        )?;

        let telemetry: Vec<Vec<f64>> = report
            .telemetry
            .iter()
            .map(|s| {
                vec![
                    s.time_s,
                    s.altitude_m,
                    s.velocity_ms,
                    s.dynamic_pressure_pa,
                    s.heat_flux_wm2,
                    s.temperature_k,
                    s.mass_kg,
                ]
            })
            .collect();
        dict.set_item("telemetry", telemetry)?;

        match &report.impact {
            Some(hit) => {
                let a = &hit.assessment;
                let impact = PyDict::new(py);
                impact.set_item("time_s", hit.time_s)?;
                impact.set_item("lat", hit.lat)?;
                impact.set_item("lng", hit.lng)?;
                impact.set_item("ecef", vec3(&hit.ecef))?;
                impact.set_item("miss_distance_km", hit.miss_distance_km)?;
                impact.set_item("energy_j", hit.energy_j)?;
                impact.set_item("energy_mt", hit.energy_mt)?;
                impact.set_item("crater_diameter_m", a.crater.diameter)?;
                impact.set_item("crater_depth_m", a.crater.depth)?;
                impact.set_item("rim_height_m", a.crater.rim_height)?;
                impact.set_item("seismic_magnitude", a.seismic.magnitude)?;
                impact.set_item("seismic_intensity", a.seismic.intensity)?;
                impact.set_item("blast_overpressure_pa", a.blast.overpressure_pa)?;
                impact.set_item("blast_radius_m", a.blast_radius_m)?;
                impact.set_item("seismic_radius_m", a.seismic_radius_m)?;
                dict.set_item("impact", impact)?;
            }
            None => dict.set_item("impact", py.None())?,
        }
        Ok(dict.into())
    }

    #[getter] fn mass_kg(&self) -> f64 { self.inner.mass_kg }
    #[getter] fn diameter_m(&self) -> f64 { self.inner.diameter_m }
    #[getter] fn entry_speed_ms(&self) -> f64 { self.inner.entry_speed_ms }
    #[getter] fn angle_deg(&self) -> f64 { self.inner.angle_deg }
    #[getter] fn asteroid_type(&self) -> String { self.inner.asteroid_type.to_string() }

    fn __repr__(&self) -> String {
        format!(
            "Scenario({}, m={:.3e} kg, d={:.1} m, v={:.1} km/s, angle={:.1}°, target=({:.4}, {:.4}))",
            self.inner.asteroid_type,
            self.inner.mass_kg,
            self.inner.diameter_m,
            self.inner.entry_speed_ms / 1000.0,
            self.inner.angle_deg,
            self.inner.target_lat_deg,
            self.inner.target_lng_deg,
        )
    }
}

// Free functions
#[pyfunction]
fn llh_to_ecef(lat_deg: f64, lng_deg: f64, alt_m: f64) -> (f64, f64, f64) {
    let p = geodesy::llh_to_ecef(lat_deg, lng_deg, alt_m);
    (p.x, p.y, p.z)
}

#[pyfunction]
fn ecef_to_lla(x: f64, y: f64, z: f64) -> (f64, f64, f64) {
    let g = geodesy::ecef_to_lla(&Vector3::new(x, y, z));
    (g.lat, g.lng, g.alt)
}

/// Geodesic distance (m) on the WGS84 ellipsoid.
#[pyfunction]
fn vincenty_distance(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    geodesy::vincenty_distance(LatLng::new(lat1, lng1), LatLng::new(lat2, lng2))
}

#[pyfunction]
fn air_density(alt_m: f64) -> f64 {
    atmosphere::air_density_at_altitude(alt_m)
}

/// Returns (diameter, depth, rim_height, ejecta_range) in meters.
#[pyfunction]
#[pyo3(signature = (energy_mt, target_type="sediment"))]
fn crater_diameter(energy_mt: f64, target_type: &str) -> PyResult<(f64, f64, f64, f64)> {
    let target = target_type.parse::<TargetType>().map_err(value_error)?;
    let c = impact::calculate_crater_diameter(energy_mt, target);
    Ok((c.diameter, c.depth, c.rim_height, c.ejecta_range))
}

/// Returns (magnitude, intensity, arrival_time_s).
#[pyfunction]
fn seismic_effects(energy_mt: f64, distance_km: f64) -> (f64, f64, f64) {
    let s = impact::calculate_seismic_effects(energy_mt, distance_km);
    (s.magnitude, s.intensity, s.arrival_time_s)
}

#[pyfunction]
fn blast_effects(energy_mt: f64, distance_km: f64, py: Python<'_>) -> PyResult<Py<PyDict>> {
    let b = impact::calculate_blast_effects(energy_mt, distance_km);
    let dict = PyDict::new(py);
    dict.set_item("overpressure_pa", b.overpressure_pa)?;
    dict.set_item("arrival_time_s", b.arrival_time_s)?;
    dict.set_item("dynamic_pressure_pa", b.dynamic_pressure_pa)?;
    dict.set_item("wind_speed_ms", b.wind_speed_ms)?;
    dict.set_item("damage_radius_m", impact::blast_damage_radius_m(energy_mt))?;
    Ok(dict.into())
}

/// Corrected launch state for a target; position/velocity are ECEF lists.
#[pyfunction]
#[pyo3(signature = (
    target_lat_deg,
    target_lng_deg,
    mass_kg=1e9,
    diameter_m=100.0,
    entry_speed_ms=20_000.0,
    entry_altitude_m=120_000.0,
    angle_deg=45.0,
    asteroid_type="rocky",
))]
#[allow(clippy::too_many_arguments)]
fn accurate_trajectory(
    py: Python<'_>,
    target_lat_deg: f64,
    target_lng_deg: f64,
    mass_kg: f64,
    diameter_m: f64,
    entry_speed_ms: f64,
    entry_altitude_m: f64,
    angle_deg: f64,
    asteroid_type: &str,
) -> PyResult<Py<PyDict>> {
    let req = TargetingRequest {
        target_lat_deg,
        target_lng_deg,
        mass_kg,
        diameter_m,
        entry_speed_ms,
        entry_altitude_m,
        angle_deg,
        asteroid_type: asteroid_type.parse::<AsteroidType>().map_err(value_error)?,
    };
    let sol = calculate_accurate_trajectory(&req, &TargetingConfig::default());

    let dict = PyDict::new(py);
    dict.set_item("position", vec3(&sol.corrected_position))?;
    dict.set_item("velocity", vec3(&sol.corrected_velocity))?;
    dict.set_item("launch_lat", sol.launch.lat)?;
    dict.set_item("launch_lng", sol.launch.lng)?;
    dict.set_item("expected_deviation_km", sol.expected_deviation_km)?;
    dict.set_item("deviations_km", sol.deviations_km.clone())?;
    Ok(dict.into())
}

// Module registration
pub fn register(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PyScenario>()?;
    m.add_function(wrap_pyfunction!(llh_to_ecef, m)?)?;
    m.add_function(wrap_pyfunction!(ecef_to_lla, m)?)?;
    m.add_function(wrap_pyfunction!(vincenty_distance, m)?)?;
    m.add_function(wrap_pyfunction!(air_density, m)?)?;
    m.add_function(wrap_pyfunction!(crater_diameter, m)?)?;
    m.add_function(wrap_pyfunction!(seismic_effects, m)?)?;
    m.add_function(wrap_pyfunction!(blast_effects, m)?)?;
    m.add_function(wrap_pyfunction!(accurate_trajectory, m)?)?;
    Ok(())
}
