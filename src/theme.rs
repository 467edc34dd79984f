//! Static colour themes
//!
//! Every theme is a compile-time table; hex literals are parsed by the
//! `const fn` [`Rgba::hex`].

use crate::sim::AttackType;

/// An sRGB colour with straight (non-premultiplied) alpha in `0.0..=1.0`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f32,
}

impl Rgba {
    pub const BLACK: Rgba = Rgba::new(0, 0, 0, 1.0);
    pub const WHITE: Rgba = Rgba::new(255, 255, 255, 1.0);
    pub const TRANSPARENT: Rgba = Rgba::new(0, 0, 0, 0.0);

    pub const fn new(r: u8, g: u8, b: u8, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Parse an opaque `#rrggbb` literal at compile time.
    pub const fn hex(s: &str) -> Self {
        let bytes = s.as_bytes();
        assert!(bytes.len() == 7 && bytes[0] == b'#', "expected #rrggbb");
        Self {
            r: hex_byte(bytes[1], bytes[2]),
            g: hex_byte(bytes[3], bytes[4]),
            b: hex_byte(bytes[5], bytes[6]),
            a: 1.0,
        }
    }

    pub fn with_alpha(self, a: f32) -> Self {
        Self { a: a.clamp(0.0, 1.0), ..self }
    }

    /// Linear blend of all four channels.
    pub fn lerp(self, other: Rgba, t: f32) -> Self {
        let t = t.clamp(0.0, 1.0);
        let mix = |a: u8, b: u8| (a as f32 + (b as f32 - a as f32) * t).round() as u8;
        Self {
            r: mix(self.r, other.r),
            g: mix(self.g, other.g),
            b: mix(self.b, other.b),
            a: self.a + (other.a - self.a) * t,
        }
    }

    pub fn rgb_array(&self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }
}

const fn hex_digit(c: u8) -> u8 {
    match c {
        b'0'..=b'9' => c - b'0',
        b'a'..=b'f' => c - b'a' + 10,
        b'A'..=b'F' => c - b'A' + 10,
        _ => panic!("invalid hex digit"),
    }
}

const fn hex_byte(hi: u8, lo: u8) -> u8 {
    hex_digit(hi) * 16 + hex_digit(lo)
}

#[derive(Clone, Copy, Debug)]
pub struct AttackColors {
    pub ddos: Rgba,
    pub malware: Rgba,
    pub phishing: Rgba,
    pub exploit: Rgba,
}

#[derive(Clone, Copy, Debug)]
pub struct ThemeColors {
    pub background: Rgba,
    pub text_primary: Rgba,
    pub text_secondary: Rgba,
    pub panel_bg: Rgba,
    pub panel_border: Rgba,
    pub accent: Rgba,
    pub globe_water: Rgba,
    pub globe_land: Rgba,
    pub globe_border: Rgba,
    pub globe_graticule: Rgba,
    pub country_border: Rgba,
    pub star_color: Rgba,
    pub halo_start: Rgba,
    pub halo_end: Rgba,
    pub attack_colors: AttackColors,
}

/// How the land layer is filled.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LandStyle {
    /// One fill for every country plus border strokes.
    Composite,
    /// Per-country fill coloured by the latitude band of its centroid.
    Biome,
}

#[derive(Clone, Copy, Debug)]
pub struct Theme {
    pub id: &'static str,
    pub name: &'static str,
    pub colors: ThemeColors,
    pub land_style: LandStyle,
    /// Attack heads take the attack colour instead of white.
    pub tinted_heads: bool,
}

impl Theme {
    pub fn attack_color(&self, kind: AttackType) -> Rgba {
        let c = &self.colors.attack_colors;
        match kind {
            AttackType::Ddos => c.ddos,
            AttackType::Malware => c.malware,
            AttackType::Phishing => c.phishing,
            AttackType::Exploit => c.exploit,
        }
    }

    /// Primary, secondary and background RGB triples for external lighting.
    pub fn lighting_palette(&self) -> [[u8; 3]; 3] {
        [
            self.colors.accent.rgb_array(),
            self.colors.text_primary.rgb_array(),
            self.colors.background.rgb_array(),
        ]
    }

    pub fn by_id(id: &str) -> Option<&'static Theme> {
        THEMES.iter().find(|t| t.id.eq_ignore_ascii_case(id))
    }

    /// The theme following `id` in [`THEMES`], wrapping around.
    pub fn next_after(id: &str) -> &'static Theme {
        let idx = THEMES.iter().position(|t| t.id == id).unwrap_or(0);
        &THEMES[(idx + 1) % THEMES.len()]
    }
}

/// Latitude band colours used by [`LandStyle::Biome`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Biome {
    Ice,
    Boreal,
    Temperate,
    Arid,
    Savannah,
    Tropical,
}

impl Biome {
    pub fn from_latitude(lat: f64) -> Self {
        let lat = lat.abs();
        if lat > 60.0 {
            Biome::Ice
        } else if lat > 50.0 {
            Biome::Boreal
        } else if lat > 35.0 {
            Biome::Temperate
        } else if lat > 23.0 {
            Biome::Arid
        } else if lat > 10.0 {
            Biome::Savannah
        } else {
            Biome::Tropical
        }
    }

    pub const fn color(self) -> Rgba {
        match self {
            Biome::Ice => Rgba::hex("#e5e7eb"),
            Biome::Boreal => Rgba::hex("#14532d"),
            Biome::Temperate => Rgba::hex("#15803d"),
            Biome::Arid => Rgba::hex("#d4b483"),
            Biome::Savannah => Rgba::hex("#3f6212"),
            Biome::Tropical => Rgba::hex("#064e3b"),
        }
    }
}

const STANDARD_ATTACKS: AttackColors = AttackColors {
    ddos: Rgba::hex("#ef4444"),
    malware: Rgba::hex("#22c55e"),
    phishing: Rgba::hex("#eab308"),
    exploit: Rgba::hex("#d946ef"),
};

pub static THEMES: [Theme; 5] = [
    Theme {
        id: "cyber",
        name: "Cyber Dark",
        colors: ThemeColors {
            background: Rgba::hex("#050505"),
            text_primary: Rgba::hex("#e0e0e0"),
            text_secondary: Rgba::hex("#94a3b8"),
            panel_bg: Rgba::new(15, 23, 42, 0.85),
            panel_border: Rgba::hex("#334155"),
            accent: Rgba::hex("#06b6d4"),
            globe_water: Rgba::hex("#111827"),
            globe_land: Rgba::hex("#1e293b"),
            globe_border: Rgba::hex("#0ea5e9"),
            globe_graticule: Rgba::hex("#1e293b"),
            country_border: Rgba::hex("#38bdf8"),
            star_color: Rgba::hex("#ffffff"),
            halo_start: Rgba::new(14, 165, 233, 0.0),
            halo_end: Rgba::new(14, 165, 233, 0.15),
            attack_colors: STANDARD_ATTACKS,
        },
        land_style: LandStyle::Composite,
        tinted_heads: false,
    },
    Theme {
        id: "light",
        name: "Corporate",
        colors: ThemeColors {
            background: Rgba::hex("#050505"),
            text_primary: Rgba::hex("#0f172a"),
            text_secondary: Rgba::hex("#64748b"),
            panel_bg: Rgba::new(255, 255, 255, 0.85),
            panel_border: Rgba::hex("#cbd5e1"),
            accent: Rgba::hex("#0284c7"),
            globe_water: Rgba::hex("#e0f2fe"),
            globe_land: Rgba::hex("#ffffff"),
            globe_border: Rgba::hex("#38bdf8"),
            globe_graticule: Rgba::hex("#94a3b8"),
            country_border: Rgba::hex("#475569"),
            star_color: Rgba::hex("#ffffff"),
            halo_start: Rgba::new(56, 189, 248, 0.0),
            halo_end: Rgba::new(56, 189, 248, 0.1),
            attack_colors: AttackColors {
                ddos: Rgba::hex("#dc2626"),
                malware: Rgba::hex("#16a34a"),
                phishing: Rgba::hex("#ca8a04"),
                exploit: Rgba::hex("#c026d3"),
            },
        },
        land_style: LandStyle::Composite,
        tinted_heads: false,
    },
    Theme {
        id: "matrix",
        name: "Terminal",
        colors: ThemeColors {
            background: Rgba::hex("#000000"),
            text_primary: Rgba::hex("#22c55e"),
            text_secondary: Rgba::hex("#15803d"),
            panel_bg: Rgba::new(0, 20, 0, 0.9),
            panel_border: Rgba::hex("#14532d"),
            accent: Rgba::hex("#4ade80"),
            globe_water: Rgba::hex("#022c22"),
            globe_land: Rgba::hex("#064e3b"),
            globe_border: Rgba::hex("#22c55e"),
            globe_graticule: Rgba::hex("#14532d"),
            country_border: Rgba::hex("#4ade80"),
            star_color: Rgba::hex("#15803d"),
            halo_start: Rgba::new(34, 197, 94, 0.0),
            halo_end: Rgba::new(34, 197, 94, 0.15),
            attack_colors: STANDARD_ATTACKS,
        },
        land_style: LandStyle::Composite,
        tinted_heads: true,
    },
    Theme {
        id: "midnight",
        name: "Midnight",
        colors: ThemeColors {
            background: Rgba::hex("#0f0518"),
            text_primary: Rgba::hex("#e9d5ff"),
            text_secondary: Rgba::hex("#7e22ce"),
            panel_bg: Rgba::new(26, 11, 46, 0.85),
            panel_border: Rgba::hex("#581c87"),
            accent: Rgba::hex("#d8b4fe"),
            globe_water: Rgba::hex("#2e1065"),
            globe_land: Rgba::hex("#4c1d95"),
            globe_border: Rgba::hex("#a855f7"),
            globe_graticule: Rgba::hex("#581c87"),
            country_border: Rgba::hex("#d8b4fe"),
            star_color: Rgba::hex("#e9d5ff"),
            halo_start: Rgba::new(168, 85, 247, 0.0),
            halo_end: Rgba::new(168, 85, 247, 0.15),
            attack_colors: AttackColors {
                ddos: Rgba::hex("#f472b6"),
                malware: Rgba::hex("#c084fc"),
                phishing: Rgba::hex("#fb7185"),
                exploit: Rgba::hex("#818cf8"),
            },
        },
        land_style: LandStyle::Composite,
        tinted_heads: false,
    },
    Theme {
        id: "geography",
        name: "Geography",
        colors: ThemeColors {
            background: Rgba::hex("#000000"),
            text_primary: Rgba::hex("#ffffff"),
            text_secondary: Rgba::hex("#94a3b8"),
            panel_bg: Rgba::new(0, 0, 0, 0.7),
            panel_border: Rgba::hex("#334155"),
            accent: Rgba::hex("#38bdf8"),
            globe_water: Rgba::hex("#001e36"),
            globe_land: Rgba::hex("#2d4c1e"),
            globe_border: Rgba::hex("#4d94ff"),
            globe_graticule: Rgba::new(255, 255, 255, 0.05),
            country_border: Rgba::TRANSPARENT,
            star_color: Rgba::hex("#ffffff"),
            halo_start: Rgba::new(77, 148, 255, 0.0),
            halo_end: Rgba::new(77, 148, 255, 0.15),
            attack_colors: STANDARD_ATTACKS,
        },
        land_style: LandStyle::Biome,
        tinted_heads: false,
    },
];
