//! # BOLIDE
//!
//! **B**allistic **O**bject **L**oss, **I**mpact & **D**amage **E**stimation
//!
//! Physics core for asteroid atmospheric entry and impact.
//! Provides WGS84 geodesy, a layered atmosphere, a per-step entry
//! integrator with ablation and fragmentation, trajectory prediction,
//! a targeting corrector, empirical crater/seismic/blast scaling,
//! and a scenario driver with telemetry.

pub mod constants;
pub mod geodesy;
pub mod atmosphere;
pub mod body;
pub mod entry;
pub mod trajectory;
pub mod impact;
pub mod targeting;
pub mod scenario;

pub use body::{AsteroidType, Body};
pub use scenario::{run_batch, run_scenario, ScenarioError, ScenarioParams, SimulationConfig, SimulationReport};

#[cfg(feature = "python")]
mod pybridge;

#[cfg(feature = "python")]
use pyo3::prelude::*;

#[cfg(feature = "python")]
#[pymodule]
fn bolide(m: &Bound<'_, PyModule>) -> PyResult<()> {
    pybridge::register(m)?;
    Ok(())
}
