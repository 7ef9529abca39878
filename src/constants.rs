//! Physical, geodetic and unit-conversion constants.
//!
//! All values are SI (meters, kilograms, seconds) unless the name says
//! otherwise. Angles at the public API boundary are degrees; everything
//! internal is radians.

/// Gravitational constant (m³ kg⁻¹ s⁻²)
pub const G: f64 = 6.67430e-11;

/// Earth mass (kg)
pub const M_EARTH: f64 = 5.972e24;

/// Earth gravitational parameter G·M (m³/s²)
pub const GM_EARTH: f64 = G * M_EARTH;

/// Mean Earth radius (m). Ground contact and altitude for the entry model
/// are measured against this sphere, not the ellipsoid.
pub const R_EARTH: f64 = 6_371_000.0;

/// Earth rotation rate (rad/s), about ECEF +Z
pub const OMEGA_EARTH: f64 = 7.2921150e-5;

// ── WGS84 ellipsoid ──

/// Semi-major axis (m)
pub const WGS84_A: f64 = 6_378_137.0;

/// Flattening
pub const WGS84_F: f64 = 1.0 / 298.257223563;

/// Semi-minor axis (m)
pub const WGS84_B: f64 = WGS84_A * (1.0 - WGS84_F);

/// First eccentricity squared
pub const WGS84_E2: f64 = 2.0 * WGS84_F - WGS84_F * WGS84_F;

/// Second eccentricity squared
pub const WGS84_EP2: f64 = (WGS84_A * WGS84_A - WGS84_B * WGS84_B) / (WGS84_B * WGS84_B);

/// Mean radius used by the haversine fallback (m)
pub const R_MEAN_HAVERSINE: f64 = 6_371_008.8;

// ── Atmosphere ──

/// Sea-level air density (kg/m³)
pub const SEA_LEVEL_AIR_DENSITY: f64 = 1.225;

/// Sea-level standard pressure (Pa)
pub const SEA_LEVEL_PRESSURE: f64 = 101_325.0;

/// Sea-level standard temperature (K)
pub const SEA_LEVEL_TEMPERATURE: f64 = 288.15;

/// Specific gas constant for dry air (J kg⁻¹ K⁻¹)
pub const R_AIR: f64 = 287.05;

/// Specific heat of air at constant pressure (J kg⁻¹ K⁻¹)
pub const CP_AIR: f64 = 1005.0;

/// Speed of sound used by the blast model (m/s)
pub const SPEED_OF_SOUND: f64 = 343.0;

/// P-wave speed in crust (m/s)
pub const P_WAVE_SPEED: f64 = 6000.0;

// ── Units ──

/// Joules per megaton of TNT
pub const J_PER_MT: f64 = 4.184e15;

/// Degrees to radians
pub const DEG2RAD: f64 = std::f64::consts::PI / 180.0;

/// Radians to degrees
pub const RAD2DEG: f64 = 180.0 / std::f64::consts::PI;

/// Rough kilometers per degree of arc, used by the targeting loop
pub const KM_PER_DEG: f64 = 111.0;
