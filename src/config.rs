use crate::geo::atlas::AtlasSource;

/// Tunables for the globe simulation and renderer
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GlobeConfig {
    pub rotation_speed: f64,     // degrees of lambda per tick, 0..=1
    pub attack_intensity: usize, // live attack cap, 0..=50
    pub is_playing: bool,
    pub show_graticule: bool,
    pub zoom: f64, // initial zoom, 0.5..=3
    pub show_satellites: bool,
    pub satellite_count: usize, // 0..=20
    pub major_cities_only: bool,
}

impl GlobeConfig {
    pub const MAX_ROTATION_SPEED: f64 = 1.0;
    pub const MAX_INTENSITY: usize = 50;
    pub const MAX_SATELLITES: usize = 20;

    /// Copy with every field forced into its valid range.
    pub fn clamped(self) -> Self {
        let rotation_speed = if self.rotation_speed.is_finite() {
            self.rotation_speed.clamp(0.0, Self::MAX_ROTATION_SPEED)
        } else {
            Self::default().rotation_speed
        };
        let zoom = if self.zoom.is_finite() { self.zoom.clamp(0.5, 3.0) } else { 1.0 };
        Self {
            rotation_speed,
            attack_intensity: self.attack_intensity.min(Self::MAX_INTENSITY),
            zoom,
            satellite_count: self.satellite_count.min(Self::MAX_SATELLITES),
            ..self
        }
    }
}

impl Default for GlobeConfig {
    fn default() -> Self {
        Self {
            rotation_speed: 0.2,
            attack_intensity: 10,
            is_playing: true,
            show_graticule: true,
            zoom: 1.0,
            show_satellites: true,
            satellite_count: 8,
            major_cities_only: true,
        }
    }
}

/// WLED controller sync
#[derive(Clone, Debug, PartialEq)]
pub struct LightingConfig {
    pub ip: Option<String>,
    pub brightness: u8,
    pub effect: u8, // WLED effect id, 0 = solid
}

impl Default for LightingConfig {
    fn default() -> Self {
        Self {
            ip: None,
            brightness: 128,
            effect: 0,
        }
    }
}

/// Everything a globe session needs, after CLI and config file are merged
#[derive(Clone, Debug)]
pub struct RunConfig {
    pub globe: GlobeConfig,
    pub theme_id: String,
    pub seed: Option<u64>,
    pub fps: u32,
    pub frames: Option<u64>,
    pub geography: Option<AtlasSource>, // None = no land layer
    pub lighting: LightingConfig,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            globe: GlobeConfig::default(),
            theme_id: "cyber".to_string(),
            seed: None,
            fps: 30,
            frames: None,
            geography: Some(AtlasSource::default()),
            lighting: LightingConfig::default(),
        }
    }
}

/// Headless render to a PNG file
#[derive(Clone, Debug)]
pub struct SnapshotConfig {
    pub run: RunConfig,
    pub out: std::path::PathBuf,
    pub ticks: u32,
    pub width: u32,
    pub height: u32,
    pub density: u32,
}
