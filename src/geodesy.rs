//! WGS84 geodesy: geodetic ↔ ECEF, local East-North-Up frames and
//! ellipsoidal distances.
//!
//! Conversions are total over finite inputs. The two iterative pieces
//! have deterministic cutoffs instead of errors:
//! - `ecef_to_lla` keeps its last latitude estimate after 10 iterations.
//! - `vincenty_distance` falls back to haversine on a mean-radius sphere
//!   when the λ iteration does not converge (nearly antipodal points).
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::constants::*;

/// Geodetic latitude/longitude in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

/// Geodetic latitude/longitude (degrees) and height above the ellipsoid (m).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Geodetic {
    pub lat: f64,
    pub lng: f64,
    pub alt: f64,
}

impl LatLng {
    pub fn new(lat: f64, lng: f64) -> Self {
        LatLng { lat, lng }
    }
}

impl Geodetic {
    pub fn new(lat: f64, lng: f64, alt: f64) -> Self {
        Geodetic { lat, lng, alt }
    }

    /// Drop the height.
    pub fn lat_lng(&self) -> LatLng {
        LatLng { lat: self.lat, lng: self.lng }
    }
}

/// Unit vectors of the local East-North-Up frame, expressed in ECEF.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnuFrame {
    pub e: Vector3<f64>,
    pub n: Vector3<f64>,
    pub u: Vector3<f64>,
}

impl EnuFrame {
    /// Map a local (east, north, up) vector into ECEF.
    pub fn to_ecef(&self, east: f64, north: f64, up: f64) -> Vector3<f64> {
        self.e * east + self.n * north + self.u * up
    }
}

/// Geodetic (degrees, meters) to ECEF (meters).
///
/// N = a / sqrt(1 - e² sin²φ)
pub fn llh_to_ecef(lat_deg: f64, lng_deg: f64, alt_m: f64) -> Vector3<f64> {
    let lat = lat_deg * DEG2RAD;
    let lng = lng_deg * DEG2RAD;
    let (sin_lat, cos_lat) = lat.sin_cos();
    let (sin_lng, cos_lng) = lng.sin_cos();
    let n = WGS84_A / (1.0 - WGS84_E2 * sin_lat * sin_lat).sqrt();

    Vector3::new(
        (n + alt_m) * cos_lat * cos_lng,
        (n + alt_m) * cos_lat * sin_lng,
        (n * (1.0 - WGS84_E2) + alt_m) * sin_lat,
    )
}

/// Maximum latitude refinements in `ecef_to_lla`.
const LLA_MAX_ITER: usize = 10;
/// Latitude convergence threshold (rad).
const LLA_TOL: f64 = 1e-12;
/// Below this distance from the polar axis (m) the point is treated as on it.
const POLAR_AXIS_EPS: f64 = 1e-6;

/// ECEF (meters) to geodetic (degrees, meters).
///
/// Bowring-style fixed point on latitude. If the estimate has not settled
/// within `LLA_MAX_ITER` refinements the last one is returned.
pub fn ecef_to_lla(ecef: &Vector3<f64>) -> Geodetic {
    let (x, y, z) = (ecef.x, ecef.y, ecef.z);
    let p = x.hypot(y);
    let lng = y.atan2(x);

    // On the polar axis cos(φ) vanishes and the height formula divides by it.
    if p < POLAR_AXIS_EPS {
        let lat = if z >= 0.0 { 90.0 } else { -90.0 };
        return Geodetic::new(lat, lng * RAD2DEG, z.abs() - WGS84_B);
    }

    let mut lat = z.atan2(p * (1.0 - WGS84_E2));
    let mut h = 0.0;
    let mut converged = false;

    for _ in 0..LLA_MAX_ITER {
        let sin_lat = lat.sin();
        let n = WGS84_A / (1.0 - WGS84_E2 * sin_lat * sin_lat).sqrt();
        h = p / lat.cos() - n;
        let next = z.atan2(p * (1.0 - WGS84_E2 * n / (n + h)));
        let delta = (next - lat).abs();
        lat = next;
        if delta < LLA_TOL {
            converged = true;
            break;
        }
    }

    if !converged {
        log::trace!("ecef_to_lla: latitude not settled after {LLA_MAX_ITER} iterations");
    }

    Geodetic::new(lat * RAD2DEG, lng * RAD2DEG, h)
}

/// ECEF to latitude/longitude, dropping the height.
pub fn ecef_to_lat_lng(ecef: &Vector3<f64>) -> LatLng {
    ecef_to_lla(ecef).lat_lng()
}

/// East-North-Up unit vectors at a geodetic point.
pub fn local_frame(lat_deg: f64, lng_deg: f64) -> EnuFrame {
    let (sin_lat, cos_lat) = (lat_deg * DEG2RAD).sin_cos();
    let (sin_lng, cos_lng) = (lng_deg * DEG2RAD).sin_cos();

    EnuFrame {
        e: Vector3::new(-sin_lng, cos_lng, 0.0),
        n: Vector3::new(-sin_lat * cos_lng, -sin_lat * sin_lng, cos_lat),
        u: Vector3::new(cos_lat * cos_lng, cos_lat * sin_lng, sin_lat),
    }
}

/// Great-circle distance on a sphere of mean radius (m).
pub fn haversine_distance(a: LatLng, b: LatLng) -> f64 {
    let d_lat = (b.lat - a.lat) * DEG2RAD;
    let d_lng = (b.lng - a.lng) * DEG2RAD;
    let lat1 = a.lat * DEG2RAD;
    let lat2 = b.lat * DEG2RAD;

    let s = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lng / 2.0).sin().powi(2);
    2.0 * R_MEAN_HAVERSINE * s.sqrt().atan2((1.0 - s).sqrt())
}

/// How a geodesic distance was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum GeodesicDistance {
    /// Vincenty inverse converged (m).
    Vincenty(f64),
    /// The two points coincide.
    Coincident,
    /// Vincenty did not converge; haversine distance on the mean sphere (m).
    HaversineFallback(f64),
}

impl GeodesicDistance {
    /// Distance in meters regardless of the branch taken.
    pub fn meters(&self) -> f64 {
        match *self {
            GeodesicDistance::Vincenty(m) | GeodesicDistance::HaversineFallback(m) => m,
            GeodesicDistance::Coincident => 0.0,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, GeodesicDistance::HaversineFallback(_))
    }
}

const VINCENTY_MAX_ITER: usize = 100;
const VINCENTY_TOL: f64 = 1e-12;

/// Vincenty inverse problem on the WGS84 ellipsoid, with the branch taken.
pub fn geodesic_distance(a: LatLng, b: LatLng) -> GeodesicDistance {
    let f = WGS84_F;
    let u1 = ((1.0 - f) * (a.lat * DEG2RAD).tan()).atan();
    let u2 = ((1.0 - f) * (b.lat * DEG2RAD).tan()).atan();
    let (sin_u1, cos_u1) = u1.sin_cos();
    let (sin_u2, cos_u2) = u2.sin_cos();

    let l = (b.lng - a.lng) * DEG2RAD;
    let mut lambda = l;

    let mut sin_sigma = 0.0;
    let mut cos_sigma = 0.0;
    let mut sigma = 0.0;
    let mut cos2_alpha = 0.0;
    let mut cos_2sigma_m = 0.0;
    let mut converged = false;

    for _ in 0..VINCENTY_MAX_ITER {
        let (sin_lambda, cos_lambda) = lambda.sin_cos();
        sin_sigma = (cos_u2 * sin_lambda).hypot(cos_u1 * sin_u2 - sin_u1 * cos_u2 * cos_lambda);
        if sin_sigma == 0.0 {
            return GeodesicDistance::Coincident;
        }
        cos_sigma = sin_u1 * sin_u2 + cos_u1 * cos_u2 * cos_lambda;
        sigma = sin_sigma.atan2(cos_sigma);
        let sin_alpha = cos_u1 * cos_u2 * sin_lambda / sin_sigma;
        cos2_alpha = 1.0 - sin_alpha * sin_alpha;
        // Equatorial line: cos²α = 0
        cos_2sigma_m = if cos2_alpha == 0.0 {
            0.0
        } else {
            cos_sigma - 2.0 * sin_u1 * sin_u2 / cos2_alpha
        };
        let c = f / 16.0 * cos2_alpha * (4.0 + f * (4.0 - 3.0 * cos2_alpha));
        let prev = lambda;
        lambda = l
            + (1.0 - c)
                * f
                * sin_alpha
                * (sigma
                    + c * sin_sigma
                        * (cos_2sigma_m + c * cos_sigma * (-1.0 + 2.0 * cos_2sigma_m * cos_2sigma_m)));
        if (lambda - prev).abs() < VINCENTY_TOL {
            converged = true;
            break;
        }
    }

    if !converged {
        let fallback = haversine_distance(a, b);
        log::warn!(
            "Vincenty did not converge between ({:.4}, {:.4}) and ({:.4}, {:.4}); using haversine {:.1} m",
            a.lat, a.lng, b.lat, b.lng, fallback
        );
        return GeodesicDistance::HaversineFallback(fallback);
    }

    let u_sq = cos2_alpha * WGS84_EP2;
    let big_a = 1.0 + u_sq / 16384.0 * (4096.0 + u_sq * (-768.0 + u_sq * (320.0 - 175.0 * u_sq)));
    let big_b = u_sq / 1024.0 * (256.0 + u_sq * (-128.0 + u_sq * (74.0 - 47.0 * u_sq)));
    let delta_sigma = big_b
        * sin_sigma
        * (cos_2sigma_m
            + big_b / 4.0
                * (cos_sigma * (-1.0 + 2.0 * cos_2sigma_m * cos_2sigma_m)
                    - big_b / 6.0
                        * cos_2sigma_m
                        * (-3.0 + 4.0 * sin_sigma * sin_sigma)
                        * (-3.0 + 4.0 * cos_2sigma_m * cos_2sigma_m)));

    let s = WGS84_B * big_a * (sigma - delta_sigma);
    GeodesicDistance::Vincenty(s.max(0.0))
}

/// Ellipsoidal distance between two points (m). Never fails; see
/// [`geodesic_distance`] for which branch produced the value.
pub fn vincenty_distance(a: LatLng, b: LatLng) -> f64 {
    geodesic_distance(a, b).meters()
}

/// Outcome of a geodetic → ECEF → geodetic round trip.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionCheck {
    pub is_valid: bool,
    /// Horizontal distance between the original and recovered point (m).
    pub error_m: f64,
    pub message: String,
}

/// Round-trip a point through ECEF and report the horizontal error.
pub fn validate_coordinate_conversion(lat: f64, lng: f64, alt: f64, tolerance_m: f64) -> ConversionCheck {
    let ecef = llh_to_ecef(lat, lng, alt);
    let back = ecef_to_lla(&ecef);
    let error_m = vincenty_distance(LatLng::new(lat, lng), back.lat_lng());

    ConversionCheck {
        is_valid: error_m <= tolerance_m,
        error_m,
        message: format!("Conversion error: {error_m:.2} m"),
    }
}

/// Wrap a longitude difference into (-180, 180].
pub fn wrap_longitude_delta(delta_deg: f64) -> f64 {
    let wrapped = (delta_deg + 180.0).rem_euclid(360.0) - 180.0;
    if wrapped == -180.0 {
        180.0
    } else {
        wrapped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_equator_prime_meridian() {
        let p = llh_to_ecef(0.0, 0.0, 0.0);
        assert_relative_eq!(p.x, WGS84_A, epsilon = 1e-6);
        assert!(p.y.abs() < 1e-9);
        assert!(p.z.abs() < 1e-9);
    }

    #[test]
    fn test_north_pole_on_semi_minor_axis() {
        let p = llh_to_ecef(90.0, 0.0, 0.0);
        assert_relative_eq!(p.z, WGS84_B, epsilon = 1e-6);
        let back = ecef_to_lat_lng(&p);
        assert!(back.lat > 89.999, "pole lat = {}", back.lat);
    }

    #[test]
    fn test_exact_polar_axis() {
        let lla = ecef_to_lla(&Vector3::new(0.0, 0.0, -(WGS84_B + 1000.0)));
        assert_relative_eq!(lla.lat, -90.0);
        assert_relative_eq!(lla.alt, 1000.0, epsilon = 1e-6);
    }

    #[test]
    fn test_round_trip_moscow_with_height() {
        let (lat, lng) = (55.7558, 37.6173);
        let lla = ecef_to_lla(&llh_to_ecef(lat, lng, 0.0));
        let d = vincenty_distance(LatLng::new(lat, lng), lla.lat_lng());
        assert!(d < 5.0);
        assert!(lla.alt.abs() < 100.0);

        let high = ecef_to_lla(&llh_to_ecef(lat, lng, 120_000.0));
        assert_relative_eq!(high.alt, 120_000.0, epsilon = 1e-3);
    }

    #[test]
    fn test_round_trip_grid() {
        for lat in (-85..=85).step_by(17) {
            for lng in (-180..180).step_by(45) {
                let (lat, lng) = (lat as f64 + 0.123, lng as f64 + 0.456);
                let back = ecef_to_lat_lng(&llh_to_ecef(lat, lng, 0.0));
                let d = vincenty_distance(LatLng::new(lat, lng), back);
                assert!(d < 5.0, "round trip error {d} m at ({lat}, {lng})");
            }
        }
    }

    #[test]
    fn test_sydney_round_trip() {
        let back = ecef_to_lat_lng(&llh_to_ecef(-33.8688, 151.2093, 0.0));
        assert!((back.lat + 33.8688).abs() < 0.01);
        assert!((back.lng - 151.2093).abs() < 0.01);
    }

    #[test]
    fn test_validate_tokyo() {
        let check = validate_coordinate_conversion(35.6895, 139.6917, 0.0, 5.0);
        assert!(check.is_valid);
        assert!(check.error_m < 5.0);
        assert!(check.message.contains(" m"));
    }

    #[test]
    fn test_local_frame_orthonormal() {
        let f = local_frame(48.8566, 2.3522);
        assert_relative_eq!(f.e.norm(), 1.0, epsilon = 1e-12);
        assert_relative_eq!(f.n.norm(), 1.0, epsilon = 1e-12);
        assert_relative_eq!(f.u.norm(), 1.0, epsilon = 1e-12);
        assert!(f.e.dot(&f.n).abs() < 1e-12);
        assert!(f.e.dot(&f.u).abs() < 1e-12);
        // Right-handed: e × n = u
        assert_relative_eq!((f.e.cross(&f.n) - f.u).norm(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_london_paris() {
        let london = LatLng::new(51.5074, -0.1278);
        let paris = LatLng::new(48.8566, 2.3522);
        let d = geodesic_distance(london, paris);
        assert!(!d.is_fallback());
        assert!((d.meters() / 1000.0 - 343.0).abs() < 1.5);

        // Sphere and ellipsoid agree to well under a percent at this range
        let h = haversine_distance(london, paris);
        assert_relative_eq!(h, d.meters(), max_relative = 0.01);
    }

    #[test]
    fn test_coincident_points() {
        let p = LatLng::new(10.0, 20.0);
        assert_eq!(geodesic_distance(p, p), GeodesicDistance::Coincident);
        assert_eq!(vincenty_distance(p, p), 0.0);
    }

    #[test]
    fn test_near_antipodal_falls_back_to_haversine() {
        let a = LatLng::new(0.0, 0.0);
        let b = LatLng::new(0.5, 179.7);
        let g = geodesic_distance(a, b);
        assert!(g.is_fallback(), "{g:?}");
        let d = vincenty_distance(a, b);
        assert!(d.is_finite());
        assert_relative_eq!(d, haversine_distance(a, b));
        assert_relative_eq!(g.meters(), d);
        assert!(geodesic_distance(a, LatLng::new(0.0, 179.9)).is_fallback());
        // Roughly half the meridian circumference
        assert!(d > 19_800_000.0 && d < 20_100_000.0, "d = {d}");
    }

    #[test]
    fn test_wrap_longitude_delta() {
        assert_relative_eq!(wrap_longitude_delta(350.0), -10.0);
        assert_relative_eq!(wrap_longitude_delta(-190.0), 170.0);
        assert_relative_eq!(wrap_longitude_delta(180.0), 180.0);
        assert_relative_eq!(wrap_longitude_delta(-180.0), 180.0);
        assert_relative_eq!(wrap_longitude_delta(12.5), 12.5);
    }
}
