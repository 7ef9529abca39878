//! The falling body and its material table.
use std::fmt;
use std::str::FromStr;

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Asteroid composition class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AsteroidType {
    Rocky,
    Iron,
    Icy,
    Carbon,
}

/// Material constants for one composition class.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AsteroidProperties {
    /// Bulk density (kg/m³)
    pub density: f64,
    /// Tensile strength (Pa)
    pub strength: f64,
    /// Ablation coefficient, kg per joule of absorbed heat
    pub ablation_coeff: f64,
    /// Drag coefficient
    pub drag_coeff: f64,
}

impl AsteroidProperties {
    /// Used when a body carries no composition class.
    pub const DEFAULT: AsteroidProperties = AsteroidProperties {
        density: 3000.0,
        strength: 1e8,
        ablation_coeff: 1e-9,
        drag_coeff: 1.3,
    };
}

/// Material table, indexed by [`AsteroidType`].
pub const ASTEROID_TYPES: [(AsteroidType, AsteroidProperties); 4] = [
    (
        AsteroidType::Rocky,
        AsteroidProperties { density: 3000.0, strength: 1e8, ablation_coeff: 1e-9, drag_coeff: 1.3 },
    ),
    (
        AsteroidType::Iron,
        AsteroidProperties { density: 7800.0, strength: 5e8, ablation_coeff: 5e-10, drag_coeff: 1.1 },
    ),
    (
        AsteroidType::Icy,
        AsteroidProperties { density: 1000.0, strength: 1e6, ablation_coeff: 5e-9, drag_coeff: 1.4 },
    ),
    (
        AsteroidType::Carbon,
        AsteroidProperties { density: 2200.0, strength: 5e7, ablation_coeff: 2e-9, drag_coeff: 1.35 },
    ),
];

impl AsteroidType {
    pub const ALL: [AsteroidType; 4] = [
        AsteroidType::Rocky,
        AsteroidType::Iron,
        AsteroidType::Icy,
        AsteroidType::Carbon,
    ];

    pub fn properties(self) -> AsteroidProperties {
        ASTEROID_TYPES[self as usize].1
    }

    pub fn name(self) -> &'static str {
        match self {
            AsteroidType::Rocky => "rocky",
            AsteroidType::Iron => "iron",
            AsteroidType::Icy => "icy",
            AsteroidType::Carbon => "carbon",
        }
    }
}

impl fmt::Display for AsteroidType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Unrecognized enum name in a string conversion.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("unknown {kind} '{value}'")]
pub struct ParseKindError {
    pub kind: &'static str,
    pub value: String,
}

impl FromStr for AsteroidType {
    type Err = ParseKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rocky" => Ok(AsteroidType::Rocky),
            "iron" => Ok(AsteroidType::Iron),
            "icy" => Ok(AsteroidType::Icy),
            "carbon" => Ok(AsteroidType::Carbon),
            _ => Err(ParseKindError { kind: "asteroid type", value: s.to_string() }),
        }
    }
}

/// Mass (kg) of a sphere of the given diameter and density.
pub fn sphere_mass(diameter_m: f64, density: f64) -> f64 {
    4.0 / 3.0 * std::f64::consts::PI * (diameter_m / 2.0).powi(3) * density
}

/// Diameter (m) of a sphere of the given mass and density.
pub fn sphere_diameter(mass_kg: f64, density: f64) -> f64 {
    let volume = mass_kg / density;
    2.0 * (3.0 * volume / (4.0 * std::f64::consts::PI)).cbrt()
}

/// Simulation state of the falling body.
///
/// Each integration step returns a new `Body`; nothing is mutated in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Body {
    pub mass_kg: f64,
    pub diameter_m: f64,
    /// ECEF position (m)
    pub position_m: Vector3<f64>,
    /// ECEF velocity (m/s)
    pub velocity_ms: Vector3<f64>,
    /// Composition; `None` uses [`AsteroidProperties::DEFAULT`].
    pub asteroid_type: Option<AsteroidType>,
    /// Overrides the composition's drag coefficient.
    pub drag_coeff: Option<f64>,
    /// Cross-section inflation after fragmentation (≥ 1).
    pub area_multiplier: f64,
    /// Set once, never cleared.
    pub fragmented: bool,
    pub fragment_count: u32,
    /// Current tensile strength (Pa); `None` means the composition's value.
    pub strength: Option<f64>,
}

impl Body {
    pub fn new(
        mass_kg: f64,
        diameter_m: f64,
        position_m: Vector3<f64>,
        velocity_ms: Vector3<f64>,
        asteroid_type: AsteroidType,
    ) -> Self {
        Body {
            mass_kg,
            diameter_m,
            position_m,
            velocity_ms,
            asteroid_type: Some(asteroid_type),
            drag_coeff: None,
            area_multiplier: 1.0,
            fragmented: false,
            fragment_count: 1,
            strength: None,
        }
    }

    pub fn with_drag_coeff(mut self, cd: f64) -> Self {
        self.drag_coeff = Some(cd);
        self
    }

    /// Material constants for this body.
    pub fn properties(&self) -> AsteroidProperties {
        self.asteroid_type
            .map(AsteroidType::properties)
            .unwrap_or(AsteroidProperties::DEFAULT)
    }

    pub fn speed(&self) -> f64 {
        self.velocity_ms.norm()
    }

    /// Distance from Earth's center (m).
    pub fn radius(&self) -> f64 {
        self.position_m.norm()
    }

    /// Kinetic energy in the ECEF frame (J).
    pub fn kinetic_energy(&self) -> f64 {
        0.5 * self.mass_kg * self.velocity_ms.norm_squared()
    }
}
