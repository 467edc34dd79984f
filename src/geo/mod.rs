//! Geographic primitives and the curated hub list
//!
//! Coordinates are kept in degrees as `[longitude, latitude]`, matching the
//! GeoJSON ordering used by the world atlas.

pub mod atlas;

use rand::Rng;

/// A point on the globe in degrees.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GeoCoord {
    pub lon: f64,
    pub lat: f64,
}

impl GeoCoord {
    pub const fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    /// True when both axes are within `tolerance` degrees.
    pub fn near(&self, other: &GeoCoord, tolerance: f64) -> bool {
        (self.lon - other.lon).abs() < tolerance && (self.lat - other.lat).abs() < tolerance
    }

    /// Unit vector (x toward lon 0/lat 0, y toward lon 90, z toward the north pole).
    pub fn to_unit(&self) -> [f64; 3] {
        let (lon, lat) = (self.lon.to_radians(), self.lat.to_radians());
        [lat.cos() * lon.cos(), lat.cos() * lon.sin(), lat.sin()]
    }

    pub fn from_unit(v: [f64; 3]) -> Self {
        let len = (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt();
        if len == 0.0 {
            return Self::new(0.0, 0.0);
        }
        Self {
            lon: v[1].atan2(v[0]).to_degrees(),
            lat: (v[2] / len).clamp(-1.0, 1.0).asin().to_degrees(),
        }
    }
}

/// Wrap a longitude into `(-180, 180]`.
pub fn wrap_longitude(lon: f64) -> f64 {
    let mut wrapped = lon;
    while wrapped > 180.0 {
        wrapped -= 360.0;
    }
    while wrapped <= -180.0 {
        wrapped += 360.0;
    }
    wrapped
}

/// Major cities/hubs, so restricted attacks start and end on land.
pub static MAJOR_HUBS: [GeoCoord; 70] = [
    GeoCoord::new(-74.006, 40.7128),    // New York
    GeoCoord::new(-118.2437, 34.0522),  // Los Angeles
    GeoCoord::new(-122.4194, 37.7749),  // San Francisco
    GeoCoord::new(-87.6298, 41.8781),   // Chicago
    GeoCoord::new(-0.1276, 51.5074),    // London
    GeoCoord::new(2.3522, 48.8566),     // Paris
    GeoCoord::new(13.4050, 52.5200),    // Berlin
    GeoCoord::new(37.6173, 55.7558),    // Moscow
    GeoCoord::new(139.6917, 35.6895),   // Tokyo
    GeoCoord::new(126.9780, 37.5665),   // Seoul
    GeoCoord::new(116.4074, 39.9042),   // Beijing
    GeoCoord::new(121.4737, 31.2304),   // Shanghai
    GeoCoord::new(72.8777, 19.0760),    // Mumbai
    GeoCoord::new(77.2090, 28.6139),    // New Delhi
    GeoCoord::new(151.2093, -33.8688),  // Sydney
    GeoCoord::new(-43.1729, -22.9068),  // Rio de Janeiro
    GeoCoord::new(-46.6333, -23.5505),  // Sao Paulo
    GeoCoord::new(-58.3816, -34.6037),  // Buenos Aires
    GeoCoord::new(31.2357, 30.0444),    // Cairo
    GeoCoord::new(28.0473, -26.2041),   // Johannesburg
    GeoCoord::new(55.2708, 25.2048),    // Dubai
    GeoCoord::new(103.8198, 1.3521),    // Singapore
    GeoCoord::new(-79.3832, 43.6532),   // Toronto
    GeoCoord::new(-123.1207, 49.2827),  // Vancouver
    GeoCoord::new(12.4964, 41.9028),    // Rome
    GeoCoord::new(-3.7038, 40.4168),    // Madrid
    GeoCoord::new(4.9041, 52.3676),     // Amsterdam
    GeoCoord::new(18.0686, 59.3293),    // Stockholm
    GeoCoord::new(30.5234, 50.4501),    // Kyiv
    GeoCoord::new(34.7818, 32.0853),    // Tel Aviv
    GeoCoord::new(106.8456, -6.2088),   // Jakarta
    GeoCoord::new(100.5018, 13.7563),   // Bangkok
    GeoCoord::new(-99.1332, 19.4326),   // Mexico City
    GeoCoord::new(-77.0369, 38.9072),   // Washington DC
    GeoCoord::new(-80.1918, 25.7617),   // Miami
    GeoCoord::new(-122.3321, 47.6062),  // Seattle
    GeoCoord::new(-71.0589, 42.3601),   // Boston
    GeoCoord::new(6.1432, 46.2044),     // Geneva
    GeoCoord::new(8.5417, 47.3769),     // Zurich
    GeoCoord::new(127.5623, 35.1595),   // Busan
    GeoCoord::new(120.9842, 14.5995),   // Manila
    GeoCoord::new(105.8342, 21.0278),   // Hanoi
    GeoCoord::new(-70.6693, -33.4489),  // Santiago
    GeoCoord::new(-74.0721, 4.7110),    // Bogota
    GeoCoord::new(36.8219, -1.2921),    // Nairobi
    GeoCoord::new(3.3792, 6.5244),      // Lagos
    GeoCoord::new(67.0011, 24.8607),    // Karachi
    GeoCoord::new(51.3890, 35.6892),    // Tehran
    GeoCoord::new(46.6753, 24.7136),    // Riyadh
    GeoCoord::new(28.9784, 41.0082),    // Istanbul
    GeoCoord::new(-73.5673, 45.5017),   // Montreal
    GeoCoord::new(-95.3698, 29.7604),   // Houston
    GeoCoord::new(-77.0428, -12.0464),  // Lima
    GeoCoord::new(-7.5898, 33.5731),    // Casablanca
    GeoCoord::new(38.7444, 9.0320),     // Addis Ababa
    GeoCoord::new(90.4125, 23.8103),    // Dhaka
    GeoCoord::new(135.5023, 34.6937),   // Osaka
    GeoCoord::new(144.9631, -37.8136),  // Melbourne
    GeoCoord::new(174.7633, -36.8485),  // Auckland
    GeoCoord::new(16.3738, 48.2082),    // Vienna
    GeoCoord::new(21.0122, 52.2297),    // Warsaw
    GeoCoord::new(23.7275, 37.9838),    // Athens
    GeoCoord::new(24.9384, 60.1699),    // Helsinki
    GeoCoord::new(10.7522, 59.9139),    // Oslo
    GeoCoord::new(12.5683, 55.6761),    // Copenhagen
    GeoCoord::new(-9.1393, 38.7223),    // Lisbon
    GeoCoord::new(-6.2603, 53.3498),    // Dublin
    GeoCoord::new(4.3517, 50.8503),     // Brussels
    GeoCoord::new(14.4378, 50.0755),    // Prague
    GeoCoord::new(19.0402, 47.4979),    // Budapest
];

/// Random coordinate roughly within inhabited latitudes.
pub fn random_global_coord<R: Rng + ?Sized>(rng: &mut R) -> GeoCoord {
    GeoCoord::new(rng.gen_range(-180.0..180.0), rng.gen_range(-60.0..70.0))
}

/// Pick a hub when restricted (and any exist), otherwise a global coordinate.
pub fn random_land_coord<R: Rng + ?Sized>(rng: &mut R, hubs: &[GeoCoord], restrict: bool) -> GeoCoord {
    if restrict && !hubs.is_empty() {
        hubs[rng.gen_range(0..hubs.len())]
    } else {
        random_global_coord(rng)
    }
}
