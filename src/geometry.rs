// ===========================================================================
// Target geometry: lat/lon -> 3D position and lat/lon pair -> ideal distance
// ===========================================================================
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::f64::consts::{FRAC_PI_2, PI};
use std::ops::{Add, AddAssign, Mul, Sub};

/// Radius of the globe in layout units. Kept small so the layout fits a canvas
/// without scaling.
pub const GLOBE_RADIUS: f64 = 200.0;

/// Radius of the Gleason disk in layout units.
pub const GLEASON_RADIUS: f64 = 200.0;

/// [latitude, longitude] in degrees
pub type LatLonDeg = [f64; 2];

/// [latitude, longitude] in radians
pub type LatLonRad = [f64; 2];

pub type PositionFunction = fn(LatLonRad) -> Vec3;

pub type DistanceFunction = fn(LatLonRad, LatLonRad) -> f64;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn length(self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    pub fn distance(self, other: Vec3) -> f64 {
        (self - other).length()
    }

    /// Unit vector in the same direction, or `None` for the zero vector.
    pub fn normalized(self) -> Option<Vec3> {
        let len = self.length();
        if len > 0.0 && len.is_finite() {
            Some(self * (1.0 / len))
        } else {
            None
        }
    }

    pub fn lerp(self, target: Vec3, t: f64) -> Vec3 {
        self + (target - self) * t
    }

    /// Rotate around the Y axis, i.e. within the X/Z plane.
    pub fn rotate_xz(self, angle: f64) -> Vec3 {
        let (sin, cos) = angle.sin_cos();
        Vec3 {
            x: self.x * cos - self.z * sin,
            y: self.y,
            z: self.x * sin + self.z * cos,
        }
    }

    /// Uniformly distributed direction on the unit sphere.
    pub fn random_unit<R: Rng + ?Sized>(rng: &mut R) -> Vec3 {
        // Archimedes: z uniform in [-1, 1] gives a uniform point on the sphere
        let z: f64 = rng.random_range(-1.0..=1.0);
        let theta: f64 = rng.random_range(0.0..(2.0 * PI));
        let r = (1.0 - z * z).max(0.0).sqrt();
        Vec3::new(r * theta.cos(), r * theta.sin(), z)
    }

    /// Arithmetic mean of the points, `None` when there are none.
    pub fn centroid<I: IntoIterator<Item = Vec3>>(points: I) -> Option<Vec3> {
        let mut sum = Vec3::ZERO;
        let mut count = 0usize;
        for p in points {
            sum += p;
            count += 1;
        }
        if count == 0 {
            None
        } else {
            Some(sum * (1.0 / count as f64))
        }
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

impl Add for Vec3 {
    type Output = Vec3;

    fn add(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vec3 {
    type Output = Vec3;

    fn sub(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f64> for Vec3 {
    type Output = Vec3;

    fn mul(self, rhs: f64) -> Vec3 {
        Vec3::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

impl AddAssign for Vec3 {
    fn add_assign(&mut self, rhs: Vec3) {
        self.x += rhs.x;
        self.y += rhs.y;
        self.z += rhs.z;
    }
}

pub fn deg_to_rad([lat, lon]: LatLonDeg) -> LatLonRad {
    [lat.to_radians(), lon.to_radians()]
}

/// Point on a sphere of radius [`GLOBE_RADIUS`]. Y points south and the prime
/// meridian faces the viewer (negative Z) so the canvas shows the globe upright.
pub fn globe_position([lat, lon]: LatLonRad) -> Vec3 {
    let cos_lat = lat.cos();
    Vec3::new(
        GLOBE_RADIUS * cos_lat * lon.sin(),
        -GLOBE_RADIUS * lat.sin(),
        -GLOBE_RADIUS * cos_lat * lon.cos(),
    )
}

/// Great circle distance along the globe surface (haversine formula).
pub fn globe_distance([lat1, lon1]: LatLonRad, [lat2, lon2]: LatLonRad) -> f64 {
    let hav_lat = ((lat2 - lat1) / 2.0).sin().powi(2);
    let hav_lon = ((lon2 - lon1) / 2.0).sin().powi(2);

    let a = hav_lat + lat1.cos() * lat2.cos() * hav_lon;
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    GLOBE_RADIUS * c
}

/// Straight line distance through the globe.
pub fn globe_chord_distance(a: LatLonRad, b: LatLonRad) -> f64 {
    globe_position(a).distance(globe_position(b))
}

/// Azimuthal equidistant projection centred on the north pole, as on the
/// Gleason map. The south pole maps to the rim at radius [`GLEASON_RADIUS`].
pub fn gleason_position([lat, lon]: LatLonRad) -> Vec3 {
    let r = 0.5 - lat / PI;
    Vec3::new(
        GLEASON_RADIUS * r * lon.cos(),
        GLEASON_RADIUS * r * lon.sin(),
        0.0,
    )
}

pub fn gleason_distance(a: LatLonRad, b: LatLonRad) -> f64 {
    let pa = gleason_position(a);
    let pb = gleason_position(b);
    ((pa.x - pb.x).powi(2) + (pa.y - pb.y).powi(2)).sqrt()
}

/// The shape the spring layout is pulled toward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum TargetGeometry {
    /// Surface distances on a sphere
    #[default]
    Globe,
    /// Chord distances on a sphere
    GlobeChord,
    /// Planar distances on the Gleason disk
    Gleason,
}

impl TargetGeometry {
    pub fn position_function(self) -> PositionFunction {
        match self {
            TargetGeometry::Globe | TargetGeometry::GlobeChord => globe_position,
            TargetGeometry::Gleason => gleason_position,
        }
    }

    pub fn distance_function(self) -> DistanceFunction {
        match self {
            TargetGeometry::Globe => globe_distance,
            TargetGeometry::GlobeChord => globe_chord_distance,
            TargetGeometry::Gleason => gleason_distance,
        }
    }
}

impl std::fmt::Display for TargetGeometry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TargetGeometry::Globe => "globe",
            TargetGeometry::GlobeChord => "globe-chord",
            TargetGeometry::Gleason => "gleason",
        };
        f.write_str(name)
    }
}

/// Latitude of the north pole in radians.
pub const MAX_LATITUDE: f64 = FRAC_PI_2;

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    const EPS: f64 = 1e-9;

    #[test]
    fn test_globe_distance_quarter_circumference() {
        let equator = [0.0, 0.0];
        let pole = [MAX_LATITUDE, 0.0];
        let d = globe_distance(equator, pole);
        assert!((d - GLOBE_RADIUS * FRAC_PI_2).abs() < EPS);
    }

    #[test]
    fn test_globe_chord_shorter_than_arc() {
        let a = deg_to_rad([51.47, -0.45]);
        let b = deg_to_rad([40.64, -73.78]);
        let arc = globe_distance(a, b);
        let chord = globe_chord_distance(a, b);
        assert!(chord > 0.0);
        assert!(chord < arc);
    }

    #[test]
    fn test_globe_position_on_sphere() {
        let p = globe_position(deg_to_rad([35.55, 139.78]));
        assert!((p.length() - GLOBE_RADIUS).abs() < EPS);
    }

    #[test]
    fn test_gleason_poles() {
        let north = gleason_position([MAX_LATITUDE, 1.0]);
        assert!(north.length() < EPS);
        let south = gleason_position([-MAX_LATITUDE, 1.0]);
        assert!((south.length() - GLEASON_RADIUS).abs() < EPS);
        assert_eq!(south.z, 0.0);
    }

    #[test]
    fn test_random_unit_has_unit_length() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..100 {
            let v = Vec3::random_unit(&mut rng);
            assert!((v.length() - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_rotate_xz_preserves_length_and_y() {
        let v = Vec3::new(3.0, -2.0, 4.0);
        let r = v.rotate_xz(0.3);
        assert!((r.length() - v.length()).abs() < EPS);
        assert_eq!(r.y, v.y);
    }

    #[test]
    fn test_centroid_and_normalize() {
        assert_eq!(Vec3::centroid(Vec::new()), None);
        let c = Vec3::centroid(vec![Vec3::new(2.0, 0.0, 0.0), Vec3::new(0.0, 2.0, 4.0)]);
        assert_eq!(c, Some(Vec3::new(1.0, 1.0, 2.0)));
        assert_eq!(Vec3::ZERO.normalized(), None);
    }
}
