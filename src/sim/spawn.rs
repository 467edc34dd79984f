//! Random attack and satellite generation
//!
//! Everything here takes the RNG explicitly so a seeded [`ChaCha8Rng`]
//! reproduces the same stream of entities.
//!
//! [`ChaCha8Rng`]: rand_chacha::ChaCha8Rng

use super::{Attack, AttackType, Satellite, Velocity};
use crate::geo::{random_global_coord, random_land_coord, wrap_longitude, GeoCoord};
use rand::seq::SliceRandom;
use rand::Rng;
use std::f64::consts::TAU;
use std::net::Ipv4Addr;

pub const COMMON_PORTS: [u16; 14] = [80, 443, 22, 21, 25, 53, 3389, 8080, 445, 1433, 3306, 5432, 6379, 27017];

/// Source and target closer than this on both axes are rejected.
pub const MIN_SEPARATION: f64 = 0.1;

const TARGET_RETRIES: usize = 16;

pub fn random_ip<R: Rng + ?Sized>(rng: &mut R) -> Ipv4Addr {
    Ipv4Addr::new(
        rng.gen_range(1..=223),
        rng.gen_range(0..=254),
        rng.gen_range(0..=254),
        rng.gen_range(0..=254),
    )
}

fn pick_target<R: Rng + ?Sized>(rng: &mut R, source: GeoCoord, hubs: &[GeoCoord], restrict: bool) -> GeoCoord {
    for _ in 0..TARGET_RETRIES {
        let target = random_land_coord(rng, hubs, restrict);
        if !target.near(&source, MIN_SEPARATION) {
            return target;
        }
    }

    let target = random_global_coord(rng);
    if !target.near(&source, MIN_SEPARATION) {
        return target;
    }
    GeoCoord::new(wrap_longitude(source.lon + 1.0), target.lat)
}

/// Build a fresh attack with progress 0.
pub fn generate_attack<R: Rng + ?Sized>(rng: &mut R, hubs: &[GeoCoord], major_cities_only: bool, id: u64) -> Attack {
    let kind = AttackType::ALL[rng.gen_range(0..AttackType::ALL.len())];
    let source = random_land_coord(rng, hubs, major_cities_only);
    let target = pick_target(rng, source, hubs, major_cities_only);
    let technique = kind.techniques().choose(rng).copied().unwrap_or("Unknown");
    let port = COMMON_PORTS.choose(rng).copied().unwrap_or(443);

    Attack {
        id,
        source,
        target,
        source_ip: random_ip(rng),
        target_ip: random_ip(rng),
        technique,
        port,
        progress: 0.0,
        speed: rng.gen_range(0.005..0.015),
        kind,
        critical: rng.gen::<f64>() > 0.8,
        via_satellite: rng.gen::<f64>() > 0.7,
    }
}

pub fn generate_satellite<R: Rng + ?Sized>(rng: &mut R, id: u64) -> Satellite {
    let lon_speed = rng.gen_range(0.2..0.5);
    let direction = if rng.gen_bool(0.5) { 1.0 } else { -1.0 };
    Satellite {
        id,
        lat: rng.gen_range(-70.0..70.0),
        lon: wrap_longitude(rng.gen_range(-180.0..180.0)),
        altitude: rng.gen_range(1.1..1.4),
        velocity: Velocity {
            lat: rng.gen_range(-0.05..0.05),
            lon: lon_speed * direction,
        },
        angle: rng.gen_range(0.0..TAU),
    }
}
