//! Entity simulation
//!
//! All mutable per-frame state lives in one owned [`SimState`]. [`tick`]
//! consumes it and hands back the next frame's state, so nothing else can
//! hold a reference into the entity lists while they change.

pub mod spawn;

use crate::config::GlobeConfig;
use crate::geo::{wrap_longitude, GeoCoord, MAJOR_HUBS};
use crate::theme::{Rgba, Theme};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::fmt;
use std::net::Ipv4Addr;

/// A uniform draw above this spawns an attack while below the cap
pub const SPAWN_THRESHOLD: f64 = 0.9;

pub const RIPPLE_GROWTH: f64 = 0.5;
pub const RIPPLE_FADE: f64 = 0.02;
pub const RIPPLE_THINNING: f64 = 0.05;
pub const CRITICAL_RIPPLE_RADIUS: f64 = 25.0;
pub const NORMAL_RIPPLE_RADIUS: f64 = 10.0;

/// Icon self-rotation per tick (radians)
pub const SATELLITE_SPIN: f64 = 0.01;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AttackType {
    Ddos,
    Malware,
    Phishing,
    Exploit,
}

impl AttackType {
    pub const ALL: [AttackType; 4] = [
        AttackType::Ddos,
        AttackType::Malware,
        AttackType::Phishing,
        AttackType::Exploit,
    ];

    pub fn label(self) -> &'static str {
        match self {
            AttackType::Ddos => "DDOS",
            AttackType::Malware => "MALWARE",
            AttackType::Phishing => "PHISHING",
            AttackType::Exploit => "EXPLOIT",
        }
    }

    pub fn techniques(self) -> &'static [&'static str] {
        match self {
            AttackType::Ddos => &[
                "SYN Flood", "UDP Flood", "NTP Amp", "HTTP Flood", "Slowloris", "DNS Amp", "Smurf Attack",
            ],
            AttackType::Malware => &[
                "Ransomware", "Trojan", "Spyware", "Rootkit", "Worm", "Keylogger", "Botnet Activity",
            ],
            AttackType::Phishing => &["Spear Phish", "Whaling", "Smishing", "Clone Phish", "BEC", "Evil Twin"],
            AttackType::Exploit => &[
                "SQL Injection", "XSS", "Zero-Day RCE", "Buffer Overflow", "MITM", "Brute Force", "Priv Escalation",
            ],
        }
    }
}

impl fmt::Display for AttackType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Attack {
    pub id: u64,
    pub source: GeoCoord,
    pub target: GeoCoord,
    pub source_ip: Ipv4Addr,
    pub target_ip: Ipv4Addr,
    pub technique: &'static str,
    pub port: u16,
    /// Fraction of the route covered, `0.0..=1.0`
    pub progress: f64,
    /// Progress per tick
    pub speed: f64,
    pub kind: AttackType,
    pub critical: bool,
    pub via_satellite: bool,
}

impl Attack {
    /// Landings that get the large ripple.
    pub fn lands_hard(&self) -> bool {
        self.critical || self.kind == AttackType::Ddos
    }
}

/// Impact marker left where an attack lands. Radii are in reference pixels
/// at zoom 1; the renderer scales them by the current zoom.
#[derive(Clone, Debug, PartialEq)]
pub struct Ripple {
    pub id: u64,
    pub coordinates: GeoCoord,
    pub color: Rgba,
    pub radius: f64,
    pub max_radius: f64,
    pub alpha: f64,
    pub stroke_width: f64,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Velocity {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Satellite {
    pub id: u64,
    pub lat: f64,
    pub lon: f64,
    /// Orbit radius as a multiple of the globe radius
    pub altitude: f64,
    pub velocity: Velocity,
    /// Icon rotation (radians)
    pub angle: f64,
}

/// Rotation `[lambda, phi]` in degrees plus zoom.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewState {
    pub rotation: [f64; 2],
    pub zoom: f64,
}

impl ViewState {
    pub const MIN_ZOOM: f64 = 0.5;
    pub const MAX_ZOOM: f64 = 3.0;

    pub fn new(rotation: [f64; 2], zoom: f64) -> Self {
        let mut view = Self { rotation, zoom: 1.0 };
        view.set_phi(rotation[1]);
        view.set_zoom(zoom);
        view
    }

    pub fn lambda(&self) -> f64 {
        self.rotation[0]
    }

    pub fn phi(&self) -> f64 {
        self.rotation[1]
    }

    pub fn set_phi(&mut self, phi: f64) {
        self.rotation[1] = phi.clamp(-90.0, 90.0);
    }

    pub fn set_zoom(&mut self, zoom: f64) {
        self.zoom = zoom.clamp(Self::MIN_ZOOM, Self::MAX_ZOOM);
    }
}

impl Default for ViewState {
    fn default() -> Self {
        Self::new([0.0, -10.0], 1.0)
    }
}

/// Everything that changes from one frame to the next.
#[derive(Clone, Debug)]
pub struct SimState {
    pub view: ViewState,
    pub attacks: Vec<Attack>,
    pub ripples: Vec<Ripple>,
    pub satellites: Vec<Satellite>,
    pub rng: ChaCha8Rng,
    next_id: u64,
}

impl SimState {
    pub fn new(view: ViewState, seed: u64) -> Self {
        Self {
            view,
            attacks: Vec::new(),
            ripples: Vec::new(),
            satellites: Vec::new(),
            rng: ChaCha8Rng::seed_from_u64(seed),
            next_id: 1,
        }
    }

    fn allocate_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

/// Advance the simulation by one frame.
///
/// `on_spawn` sees every new attack exactly once, after it joined the
/// live set. Pausing stops rotation and satellite motion; attacks and
/// ripples keep moving either way.
pub fn tick<F>(mut state: SimState, config: &GlobeConfig, theme: &Theme, mut on_spawn: F) -> SimState
where
    F: FnMut(&Attack),
{
    if config.is_playing {
        state.view.rotation[0] += config.rotation_speed;
    }

    reconcile_satellites(&mut state, config.satellite_count);

    if config.is_playing {
        for sat in &mut state.satellites {
            advance_satellite(sat);
        }
    }

    land_attacks(&mut state, theme);
    decay_ripples(&mut state.ripples);

    if state.attacks.len() < config.attack_intensity && state.rng.gen::<f64>() > SPAWN_THRESHOLD {
        let id = state.allocate_id();
        let attack = spawn::generate_attack(&mut state.rng, &MAJOR_HUBS, config.major_cities_only, id);
        log::debug!(
            "attack {} {} {} -> {} ({}:{})",
            attack.id, attack.kind, attack.source_ip, attack.target_ip, attack.technique, attack.port
        );
        state.attacks.push(attack);
        if let Some(spawned) = state.attacks.last() {
            on_spawn(spawned);
        }
    }

    state
}

/// One satellite added or removed per tick, never more.
fn reconcile_satellites(state: &mut SimState, target: usize) {
    if state.satellites.len() < target {
        let id = state.allocate_id();
        let sat = spawn::generate_satellite(&mut state.rng, id);
        state.satellites.push(sat);
    } else if state.satellites.len() > target {
        state.satellites.pop();
    }
}

fn advance_satellite(sat: &mut Satellite) {
    sat.lon = wrap_longitude(sat.lon + sat.velocity.lon);
    sat.lat += sat.velocity.lat;
    if sat.lat > 90.0 || sat.lat < -90.0 {
        sat.lat = sat.lat.clamp(-90.0, 90.0);
        sat.velocity.lat = -sat.velocity.lat;
    }
    sat.angle += SATELLITE_SPIN;
}

fn land_attacks(state: &mut SimState, theme: &Theme) {
    let mut landed = Vec::new();
    state.attacks.retain_mut(|attack| {
        attack.progress += attack.speed;
        if attack.progress >= 1.0 {
            landed.push(attack.clone());
            false
        } else {
            true
        }
    });

    for attack in landed {
        let hard = attack.lands_hard();
        let id = state.allocate_id();
        state.ripples.push(Ripple {
            id,
            coordinates: attack.target,
            color: theme.attack_color(attack.kind),
            radius: 0.0,
            max_radius: if hard { CRITICAL_RIPPLE_RADIUS } else { NORMAL_RIPPLE_RADIUS },
            alpha: 1.0,
            stroke_width: if hard { 3.0 } else { 1.0 },
        });
    }
}

fn decay_ripples(ripples: &mut Vec<Ripple>) {
    ripples.retain_mut(|ripple| {
        ripple.radius += RIPPLE_GROWTH;
        ripple.alpha -= RIPPLE_FADE;
        ripple.stroke_width = (ripple.stroke_width - RIPPLE_THINNING).max(0.0);
        ripple.alpha > 0.0
    });
}
