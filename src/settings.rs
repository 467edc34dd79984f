use crate::config::RunConfig;
use crate::geo::atlas::AtlasSource;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Contents of `config.toml`. Every field is optional; command-line flags win.
#[derive(Debug, Default, Deserialize)]
pub struct Settings {
    pub theme: Option<String>,
    #[serde(default)]
    pub globe: GlobeSettings,
    #[serde(default)]
    pub lighting: LightingSettings,
    #[serde(default)]
    pub geography: GeographySettings,
}

#[derive(Debug, Default, Deserialize)]
pub struct GlobeSettings {
    pub rotation_speed: Option<f64>,
    pub attack_intensity: Option<usize>,
    pub show_graticule: Option<bool>,
    pub zoom: Option<f64>,
    pub show_satellites: Option<bool>,
    pub satellite_count: Option<usize>,
    pub major_cities_only: Option<bool>,
    pub fps: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LightingSettings {
    pub ip: Option<String>,       // WLED controller address
    pub brightness: Option<u8>,
    pub effect: Option<u8>,
}

#[derive(Debug, Default, Deserialize)]
pub struct GeographySettings {
    pub enabled: Option<bool>,
    pub source: Option<String>,   // URL or path to a TopoJSON file
}

impl Settings {
    pub fn load() -> Self {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match fs::read_to_string(path) {
            Ok(content) => Self::parse(&content).unwrap_or_else(|e| {
                log::warn!("ignoring malformed {}: {}", path.display(), e);
                Self::default()
            }),
            Err(e) => {
                log::warn!("could not read {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("netwatch")
            .join("config.toml")
    }

    /// Overlay file values onto `config`.
    pub fn apply(&self, config: &mut RunConfig) {
        if let Some(theme) = &self.theme {
            config.theme_id = theme.clone();
        }

        let g = &self.globe;
        let globe = &mut config.globe;
        if let Some(v) = g.rotation_speed {
            globe.rotation_speed = v;
        }
        if let Some(v) = g.attack_intensity {
            globe.attack_intensity = v;
        }
        if let Some(v) = g.show_graticule {
            globe.show_graticule = v;
        }
        if let Some(v) = g.zoom {
            globe.zoom = v;
        }
        if let Some(v) = g.show_satellites {
            globe.show_satellites = v;
        }
        if let Some(v) = g.satellite_count {
            globe.satellite_count = v;
        }
        if let Some(v) = g.major_cities_only {
            globe.major_cities_only = v;
        }
        if let Some(v) = g.fps {
            config.fps = v;
        }
        *globe = globe.clamped();

        if self.lighting.ip.is_some() {
            config.lighting.ip = self.lighting.ip.clone();
        }
        if let Some(v) = self.lighting.brightness {
            config.lighting.brightness = v;
        }
        if let Some(v) = self.lighting.effect {
            config.lighting.effect = v;
        }

        if self.geography.enabled == Some(false) {
            config.geography = None;
        } else if let Some(source) = &self.geography.source {
            config.geography = Some(AtlasSource::parse(source));
        }
    }
}
