//! Layered globe frame
//!
//! Layers are painted back to front: stars, occluding disc, water, halo,
//! graticule, land, hubs, outline, satellites, ripples, attacks.

use super::canvas::{Canvas, Paint};
use crate::config::GlobeConfig;
use crate::geo::atlas::WorldAtlas;
use crate::geo::{GeoCoord, MAJOR_HUBS};
use crate::projection::{graticule, interpolate, satellite_elevation, Projection, ScreenPoint};
use crate::sim::{Attack, SimState};
use crate::theme::{Biome, LandStyle, Rgba, Theme};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::f64::consts::TAU;

pub const STAR_COUNT: usize = 200;

const TWINKLE_RATE: f64 = 0.05;

/// Solar panel fill alpha (`0x88`)
const PANEL_ALPHA: f32 = 136.0 / 255.0;

#[derive(Clone, Debug, PartialEq)]
pub struct Star {
    pub position: ScreenPoint,
    pub size: f64,
    pub opacity: f64,
    pub phase: f64,
}

pub struct FrameRenderer {
    rng: ChaCha8Rng,
    stars: Vec<Star>,
    star_field: (u32, u32),
    graticule: Vec<Vec<GeoCoord>>,
    frame: u64,
}

impl FrameRenderer {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            stars: Vec::new(),
            star_field: (0, 0),
            graticule: graticule(),
            frame: 0,
        }
    }

    #[cfg(test)]
    pub fn stars(&self) -> &[Star] {
        &self.stars
    }

    /// Regenerate the starfield only when the logical size changed.
    fn ensure_stars(&mut self, width: u32, height: u32) {
        if self.star_field == (width, height) && !self.stars.is_empty() {
            return;
        }
        let rng = &mut self.rng;
        self.stars = (0..STAR_COUNT)
            .map(|_| Star {
                position: ScreenPoint::new(rng.gen_range(0.0..width.max(1) as f64), rng.gen_range(0.0..height.max(1) as f64)),
                size: rng.gen_range(0.0..1.5),
                opacity: rng.gen_range(0.0..1.0),
                phase: rng.gen_range(0.0..TAU),
            })
            .collect();
        self.star_field = (width, height);
        log::debug!("starfield regenerated for {}x{}", width, height);
    }

    pub fn render(
        &mut self,
        canvas: &mut Canvas,
        sim: &SimState,
        config: &GlobeConfig,
        theme: &Theme,
        atlas: Option<&WorldAtlas>,
    ) {
        let (w, h) = (canvas.width(), canvas.height());
        self.ensure_stars(w, h);
        self.frame = self.frame.wrapping_add(1);

        let proj = Projection::new(&sim.view, w as f64, h as f64);
        let colors = &theme.colors;
        canvas.clear(colors.background);

        self.draw_stars(canvas, &proj, colors.star_color);

        canvas.fill_circle(proj.center, proj.scale, Rgba::BLACK, 1.0);
        canvas.fill_circle(proj.center, proj.scale, colors.globe_water, 1.0);
        let halo = Paint::Radial {
            center: proj.center,
            inner: proj.scale * 0.8,
            outer: proj.scale * 1.2,
            from: colors.halo_start,
            to: colors.halo_end,
        };
        canvas.fill_circle(proj.center, proj.scale, halo, 1.0);

        if config.show_graticule {
            let lines: Vec<Vec<ScreenPoint>> = self.graticule.iter().flat_map(|l| proj.polyline(l)).collect();
            canvas.stroke_paths(&lines, 0.5 * proj.ui_scale(), colors.globe_graticule, 1.0);
        }

        if let Some(atlas) = atlas {
            draw_land(canvas, &proj, atlas, theme);
        }

        if config.major_cities_only {
            let radius = 1.5 * proj.zoom() * proj.ui_scale();
            for hub in MAJOR_HUBS.iter() {
                if let Some(p) = proj.project(*hub) {
                    canvas.fill_circle(p, radius, colors.text_secondary, 0.4);
                }
            }
        }

        canvas.stroke_circle(proj.center, proj.scale, proj.ui_scale(), colors.globe_border, 1.0);

        if config.show_satellites {
            draw_satellites(canvas, &proj, sim, theme);
        }
        draw_ripples(canvas, &proj, sim);
        for attack in &sim.attacks {
            draw_attack(canvas, &proj, attack, config, theme);
        }
    }

    fn draw_stars(&self, canvas: &mut Canvas, proj: &Projection, color: Rgba) {
        let t = self.frame as f64 * TWINKLE_RATE;
        for star in &self.stars {
            let twinkle = 0.75 + 0.25 * (t + star.phase).sin();
            canvas.fill_circle(star.position, star.size * proj.ui_scale().max(0.6), color, star.opacity * 0.5 * twinkle);
        }
    }
}

fn closed(mut ring: Vec<ScreenPoint>) -> Vec<ScreenPoint> {
    if let Some(&first) = ring.first() {
        ring.push(first);
    }
    ring
}

fn draw_land(canvas: &mut Canvas, proj: &Projection, atlas: &WorldAtlas, theme: &Theme) {
    match theme.land_style {
        LandStyle::Biome => {
            for feature in &atlas.features {
                let rings: Vec<Vec<ScreenPoint>> = feature
                    .polygons
                    .iter()
                    .flatten()
                    .filter_map(|ring| proj.clip_ring(ring))
                    .collect();
                if !rings.is_empty() {
                    canvas.fill_polygon(&rings, Biome::from_latitude(feature.centroid.lat).color(), 1.0);
                }
            }
        }
        LandStyle::Composite => {
            let rings: Vec<Vec<ScreenPoint>> = atlas
                .features
                .iter()
                .flat_map(|f| f.polygons.iter().flatten())
                .filter_map(|ring| proj.clip_ring(ring))
                .collect();
            if rings.is_empty() {
                return;
            }
            canvas.fill_polygon(&rings, theme.colors.globe_land, 1.0);
            let borders: Vec<Vec<ScreenPoint>> = rings.into_iter().map(closed).collect();
            canvas.stroke_paths(&borders, 0.75 * proj.ui_scale(), theme.colors.country_border, 1.0);
        }
    }
}

/// Rectangle `(x, y, w, h)` in icon space, rotated by `angle` and moved to `origin`.
fn rotated_rect(origin: ScreenPoint, angle: f64, x: f64, y: f64, w: f64, h: f64) -> Vec<ScreenPoint> {
    let (sin, cos) = angle.sin_cos();
    [(x, y), (x + w, y), (x + w, y + h), (x, y + h)]
        .iter()
        .map(|&(px, py)| ScreenPoint::new(origin.x + px * cos - py * sin, origin.y + px * sin + py * cos))
        .collect()
}

fn draw_satellites(canvas: &mut Canvas, proj: &Projection, sim: &SimState, theme: &Theme) {
    let colors = &theme.colors;
    let ui = proj.ui_scale();
    let size = 3.0 * proj.zoom() * ui;

    for sat in &sim.satellites {
        let Some(surface) = proj.project(GeoCoord::new(sat.lon, sat.lat)) else {
            continue;
        };
        let at = proj.elevate(surface, sat.altitude);

        let panels = [
            rotated_rect(at, sat.angle, -size * 2.0, -size / 2.0, size, size),
            rotated_rect(at, sat.angle, size, -size / 2.0, size, size),
        ];
        canvas.fill_polygon(&panels, colors.accent.with_alpha(PANEL_ALPHA), 1.0);
        let outlines: Vec<Vec<ScreenPoint>> = panels.into_iter().map(closed).collect();
        canvas.stroke_paths(&outlines, ui, colors.accent, 1.0);

        let body = rotated_rect(at, sat.angle, -size / 2.0, -size / 2.0, size, size);
        canvas.fill_polygon(std::slice::from_ref(&body), colors.text_primary, 1.0);
        canvas.stroke_paths(&[closed(body)], ui, colors.accent, 1.0);

        let (sin, cos) = sat.angle.sin_cos();
        let tip = ScreenPoint::new(at.x - size * 1.5 * sin, at.y + size * 1.5 * cos);
        canvas.stroke_line(at, tip, ui, colors.text_secondary, 1.0);
    }
}

fn draw_ripples(canvas: &mut Canvas, proj: &Projection, sim: &SimState) {
    let ui = proj.ui_scale();
    let zoom = proj.zoom();
    for ripple in &sim.ripples {
        let Some(p) = proj.project(ripple.coordinates) else {
            continue;
        };
        let radius = ripple.radius * zoom * ui;
        canvas.stroke_circle(p, radius, ripple.stroke_width.max(0.5) * ui, ripple.color, ripple.alpha);
        if ripple.max_radius > 15.0 {
            canvas.fill_circle(p, radius * 0.5, ripple.color, ripple.alpha * 0.3);
        }
    }
}

fn draw_attack(canvas: &mut Canvas, proj: &Projection, attack: &Attack, config: &GlobeConfig, theme: &Theme) {
    let ui = proj.ui_scale();
    let color = theme.attack_color(attack.kind);
    let via_satellite = attack.via_satellite && config.show_satellites;

    let Some(surface) = proj.project(interpolate(attack.source, attack.target, attack.progress)) else {
        return;
    };
    let head = if via_satellite {
        proj.elevate(surface, satellite_elevation(attack.progress))
    } else {
        surface
    };

    if !via_satellite {
        let route = proj.great_circle(attack.source, attack.target);
        canvas.stroke_paths(&route, ui, color, 0.1);
    }

    let base_size = if attack.critical { 4.0 } else { 2.5 };
    let head_size = base_size * ui * if via_satellite { 1.2 } else { 1.0 };
    let fill = if theme.tinted_heads { color } else { Rgba::WHITE };
    let blur = ui * if attack.critical { 20.0 } else { 10.0 };
    canvas.glow(head, head_size, blur, color);
    if via_satellite {
        let diamond = vec![
            ScreenPoint::new(head.x, head.y - head_size),
            ScreenPoint::new(head.x + head_size, head.y),
            ScreenPoint::new(head.x, head.y + head_size),
            ScreenPoint::new(head.x - head_size, head.y),
        ];
        canvas.fill_polygon(&[diamond], fill, 1.0);
    } else {
        canvas.fill_circle(head, head_size, fill, 1.0);
    }

    if attack.progress > 0.05 {
        let tail_progress = (attack.progress - 0.15).max(0.0);
        if let Some(tail_surface) = proj.project(interpolate(attack.source, attack.target, tail_progress)) {
            let tail = if via_satellite {
                proj.elevate(tail_surface, satellite_elevation(tail_progress))
            } else {
                tail_surface
            };
            let paint = Paint::Linear {
                start: head,
                end: tail,
                from: color,
                to: Rgba::TRANSPARENT,
            };
            let width = ui * if attack.critical { 3.0 } else { 2.0 };
            canvas.stroke_line(head, tail, width, paint, 1.0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::atlas::Feature;
    use crate::sim::{AttackType, Ripple, Satellite, Velocity, ViewState};
    use crate::theme::THEMES;
    use std::net::Ipv4Addr;

    fn quiet_config() -> GlobeConfig {
        GlobeConfig {
            show_graticule: false,
            major_cities_only: false,
            show_satellites: false,
            ..GlobeConfig::default()
        }
    }

    fn state() -> SimState {
        SimState::new(ViewState::new([0.0, 0.0], 1.0), 3)
    }

    /// 600px keeps `ui_scale` at 1.
    const SIDE: u32 = 600;

    fn draw(sim: &SimState, config: &GlobeConfig, theme: &Theme, atlas: Option<&WorldAtlas>) -> Canvas {
        let mut canvas = Canvas::new(SIDE, SIDE, 1);
        FrameRenderer::new(1).render(&mut canvas, sim, config, theme, atlas);
        canvas
    }

    fn pixel_at(canvas: &Canvas, p: ScreenPoint) -> [u8; 3] {
        canvas.pixel(p.x.floor() as u32, p.y.floor() as u32).unwrap()
    }

    fn assert_close(got: [u8; 3], want: [u8; 3]) {
        let near = got.iter().zip(want.iter()).all(|(a, b)| (*a as i32 - *b as i32).abs() <= 2);
        assert!(near, "got {:?}, want {:?}", got, want);
    }

    /// One polygon spanning 10 degrees on each side around (0, 65).
    fn arctic_patch() -> WorldAtlas {
        let ring = vec![
            GeoCoord::new(-5.0, 60.0),
            GeoCoord::new(-5.0, 70.0),
            GeoCoord::new(5.0, 70.0),
            GeoCoord::new(5.0, 60.0),
            GeoCoord::new(-5.0, 60.0),
        ];
        WorldAtlas {
            features: vec![Feature {
                name: "Patch".into(),
                polygons: vec![vec![ring]],
                centroid: GeoCoord::new(0.0, 65.0),
            }],
        }
    }

    fn relay_attack(via_satellite: bool) -> Attack {
        Attack {
            id: 7,
            source: GeoCoord::new(-30.0, 30.0),
            target: GeoCoord::new(30.0, 30.0),
            source_ip: Ipv4Addr::new(10, 0, 0, 1),
            target_ip: Ipv4Addr::new(10, 0, 0, 2),
            technique: "Relay",
            port: 443,
            progress: 0.5,
            speed: 0.01,
            kind: AttackType::Ddos,
            critical: false,
            via_satellite,
        }
    }

    #[test]
    fn starfield_only_regenerates_on_resize() {
        let mut renderer = FrameRenderer::new(1);
        let mut canvas = Canvas::new(60, 40, 1);
        let sim = state();
        renderer.render(&mut canvas, &sim, &quiet_config(), &THEMES[0], None);
        let first = renderer.stars().to_vec();
        assert_eq!(first.len(), STAR_COUNT);

        renderer.render(&mut canvas, &sim, &quiet_config(), &THEMES[0], None);
        assert_eq!(renderer.stars(), &first[..]);

        canvas.resize(80, 40);
        renderer.render(&mut canvas, &sim, &quiet_config(), &THEMES[0], None);
        assert_ne!(renderer.stars(), &first[..]);
        assert!(renderer.stars().iter().all(|s| s.position.x < 80.0 && s.position.y < 40.0));
    }

    #[test]
    fn globe_is_drawn_over_background() {
        let mut renderer = FrameRenderer::new(1);
        let mut canvas = Canvas::new(100, 100, 1);
        let theme = &THEMES[0];
        renderer.render(&mut canvas, &state(), &quiet_config(), theme, None);

        let bg = theme.colors.background.rgb_array();
        let mut background_pixels = 0;
        for y in 0..10 {
            for x in 0..10 {
                let p = canvas.pixel(x, y).unwrap();
                if p.iter().zip(bg.iter()).all(|(a, b)| (*a as i32 - *b as i32).abs() <= 8) {
                    background_pixels += 1;
                }
            }
        }
        assert!(background_pixels >= 80, "only {} background pixels in the corner", background_pixels);

        assert_ne!(canvas.pixel(50, 50).unwrap(), [0, 0, 0]);
    }

    #[test]
    fn ripple_on_near_side_changes_pixels() {
        let theme = &THEMES[0];
        let mut sim = state();

        let mut plain = Canvas::new(120, 120, 1);
        FrameRenderer::new(1).render(&mut plain, &sim, &quiet_config(), theme, None);

        sim.ripples.push(Ripple {
            id: 1,
            coordinates: GeoCoord::new(0.0, 0.0),
            color: Rgba::hex("#ff0000"),
            radius: 12.0,
            max_radius: 25.0,
            alpha: 1.0,
            stroke_width: 3.0,
        });
        let mut marked = Canvas::new(120, 120, 1);
        FrameRenderer::new(1).render(&mut marked, &sim, &quiet_config(), theme, None);
        assert_ne!(plain.to_image(), marked.to_image());
    }

    #[test]
    fn far_side_attack_is_skipped() {
        let theme = &THEMES[0];
        let mut sim = state();

        let mut plain = Canvas::new(80, 80, 1);
        FrameRenderer::new(1).render(&mut plain, &sim, &quiet_config(), theme, None);

        sim.attacks.push(Attack {
            id: 1,
            source: GeoCoord::new(170.0, 0.0),
            target: GeoCoord::new(175.0, 5.0),
            source_ip: Ipv4Addr::new(1, 1, 1, 1),
            target_ip: Ipv4Addr::new(2, 2, 2, 2),
            technique: "Worm",
            port: 445,
            progress: 0.5,
            speed: 0.01,
            kind: AttackType::Malware,
            critical: true,
            via_satellite: false,
        });
        let mut hidden = Canvas::new(80, 80, 1);
        FrameRenderer::new(1).render(&mut hidden, &sim, &quiet_config(), theme, None);
        assert_eq!(plain.to_image(), hidden.to_image());
    }

    #[test]
    fn biome_land_is_tinted_by_centroid_latitude() {
        let theme = Theme::by_id("geography").unwrap();
        let sim = state();
        let canvas = draw(&sim, &quiet_config(), theme, Some(&arctic_patch()));

        let proj = Projection::new(&sim.view, SIDE as f64, SIDE as f64);
        let inside = proj.project(GeoCoord::new(0.0, 65.0)).unwrap();
        assert_close(pixel_at(&canvas, inside), Biome::Ice.color().rgb_array());
    }

    #[test]
    fn composite_land_uses_theme_land_colour() {
        let theme = Theme::by_id("cyber").unwrap();
        let sim = state();
        let bare = draw(&sim, &quiet_config(), theme, None);
        let canvas = draw(&sim, &quiet_config(), theme, Some(&arctic_patch()));

        let proj = Projection::new(&sim.view, SIDE as f64, SIDE as f64);
        let inside = proj.project(GeoCoord::new(0.0, 65.0)).unwrap();
        assert_close(pixel_at(&canvas, inside), theme.colors.globe_land.rgb_array());

        let outside = proj.project(GeoCoord::new(0.0, 40.0)).unwrap();
        assert_eq!(pixel_at(&canvas, outside), pixel_at(&bare, outside));
    }

    #[test]
    fn satellite_is_drawn_at_its_altitude() {
        let theme = &THEMES[0];
        let config = GlobeConfig { show_satellites: true, ..quiet_config() };
        let mut sim = state();
        let plain = draw(&sim, &config, theme, None);

        sim.satellites.push(Satellite {
            id: 1,
            lat: 20.0,
            lon: 20.0,
            altitude: 1.3,
            velocity: Velocity { lat: 0.0, lon: 0.0 },
            angle: 0.0,
        });
        let shown = draw(&sim, &config, theme, None);

        let proj = Projection::new(&sim.view, SIDE as f64, SIDE as f64);
        let surface = proj.project(GeoCoord::new(20.0, 20.0)).unwrap();
        let orbit = proj.elevate(surface, 1.3);
        assert_ne!(pixel_at(&shown, orbit), pixel_at(&plain, orbit));
        assert_eq!(pixel_at(&shown, surface), pixel_at(&plain, surface));

        let hidden = draw(&sim, &quiet_config(), theme, None);
        assert_eq!(hidden.to_image(), draw(&state(), &quiet_config(), theme, None).to_image());
    }

    #[test]
    fn relayed_attack_head_is_elevated() {
        let theme = &THEMES[0];
        let config = GlobeConfig { show_satellites: true, ..quiet_config() };
        let proj = Projection::new(&state().view, SIDE as f64, SIDE as f64);
        let attack = relay_attack(true);
        let surface = proj.project(interpolate(attack.source, attack.target, 0.5)).unwrap();
        let lifted = proj.elevate(surface, satellite_elevation(0.5));

        let plain = draw(&state(), &config, theme, None);

        let mut sim = state();
        sim.attacks.push(attack);
        let relayed = draw(&sim, &config, theme, None);
        assert_ne!(pixel_at(&relayed, lifted), pixel_at(&plain, lifted));
        assert_eq!(pixel_at(&relayed, surface), pixel_at(&plain, surface));

        let mut sim = state();
        sim.attacks.push(relay_attack(false));
        let grounded = draw(&sim, &config, theme, None);
        assert_eq!(pixel_at(&grounded, lifted), pixel_at(&plain, lifted));
        assert_ne!(pixel_at(&grounded, surface), pixel_at(&plain, surface));
    }

    #[test]
    fn rotated_rect_turns_about_origin() {
        let r = rotated_rect(ScreenPoint::new(10.0, 10.0), std::f64::consts::FRAC_PI_2, 1.0, 0.0, 1.0, 1.0);
        assert!((r[0].x - 10.0).abs() < 1e-9);
        assert!((r[0].y - 11.0).abs() < 1e-9);
    }
}
