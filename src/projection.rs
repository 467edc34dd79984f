//! Orthographic globe projection
//!
//! Follows the d3 rotation convention: a view rotation `[lambda, phi]`
//! centres the globe on `(-lambda, -phi)`. Points are rotated into view
//! space `[depth, right, up]`, where depth > 0 is the visible hemisphere.

use crate::geo::GeoCoord;
use crate::sim::ViewState;
use std::f64::consts::{PI, TAU};

/// `base_scale` of a 600 px tall canvas; pixel sizes are tuned for it.
pub const REFERENCE_SCALE: f64 = 600.0 / 2.2;

/// Great-circle segments are split so no piece spans more than this.
const DENSIFY_STEP: f64 = 2.0;

const HORIZON_STEP: f64 = 5.0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScreenPoint {
    pub x: f64,
    pub y: f64,
}

impl ScreenPoint {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    #[cfg(test)]
    pub fn distance(&self, other: &ScreenPoint) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

type ViewVec = [f64; 3];

#[derive(Clone, Debug)]
pub struct Projection {
    pub center: ScreenPoint,
    pub base_scale: f64,
    pub scale: f64,
    zoom: f64,
    lambda: f64,
    cos_phi: f64,
    sin_phi: f64,
}

impl Projection {
    pub fn new(view: &ViewState, width: f64, height: f64) -> Self {
        let base_scale = width.min(height) / 2.2;
        let phi = view.phi().to_radians();
        Self {
            center: ScreenPoint::new(width / 2.0, height / 2.0),
            base_scale,
            scale: base_scale * view.zoom,
            zoom: view.zoom,
            lambda: view.lambda().to_radians(),
            cos_phi: phi.cos(),
            sin_phi: phi.sin(),
        }
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    /// Multiplier for sizes given in reference pixels.
    pub fn ui_scale(&self) -> f64 {
        (self.base_scale / REFERENCE_SCALE).max(0.4)
    }

    fn to_view(&self, coord: GeoCoord) -> ViewVec {
        self.rotate_unit(coord.to_unit())
    }

    fn to_screen(&self, v: ViewVec) -> ScreenPoint {
        ScreenPoint::new(self.center.x + v[1] * self.scale, self.center.y - v[2] * self.scale)
    }

    /// Screen position, or `None` on the far hemisphere.
    pub fn project(&self, coord: GeoCoord) -> Option<ScreenPoint> {
        let v = self.to_view(coord);
        if v[0] > 0.0 {
            Some(self.to_screen(v))
        } else {
            None
        }
    }

    /// Push a point radially away from the canvas centre.
    pub fn elevate(&self, point: ScreenPoint, factor: f64) -> ScreenPoint {
        ScreenPoint::new(
            self.center.x + (point.x - self.center.x) * factor,
            self.center.y + (point.y - self.center.y) * factor,
        )
    }

    /// Great-circle path from `a` to `b`, split into its visible runs.
    pub fn great_circle(&self, a: GeoCoord, b: GeoCoord) -> Vec<Vec<ScreenPoint>> {
        self.polyline(&[a, b])
    }

    /// Visible runs of a polyline whose segments are great-circle arcs.
    pub fn polyline(&self, coords: &[GeoCoord]) -> Vec<Vec<ScreenPoint>> {
        let points = self.densify(coords, false);
        let mut runs = Vec::new();
        let mut run: Vec<ScreenPoint> = Vec::new();

        for (i, &v) in points.iter().enumerate() {
            let visible = v[0] > 0.0;
            if i > 0 {
                let prev = points[i - 1];
                let prev_visible = prev[0] > 0.0;
                if prev_visible != visible {
                    run.push(self.to_screen(horizon_crossing(prev, v)));
                    if prev_visible {
                        runs.push(std::mem::take(&mut run));
                    }
                }
            }
            if visible {
                run.push(self.to_screen(v));
            }
        }
        if run.len() > 1 {
            runs.push(run);
        }
        runs.retain(|r| r.len() > 1);
        runs
    }

    /// Clip a closed ring to the visible hemisphere. Parts behind the
    /// horizon are replaced by the matching arc of the horizon circle.
    ///
    /// Rings follow the spherical convention where the interior lies on the
    /// right when walking the ring as seen from outside the globe, so the
    /// closing arcs always run clockwise on screen.
    pub fn clip_ring(&self, ring: &[GeoCoord]) -> Option<Vec<ScreenPoint>> {
        let points = self.densify(ring, true);
        let n = points.len();
        if n < 3 {
            return None;
        }
        let start = points.iter().position(|v| v[0] > 0.0)?;

        let mut out = Vec::with_capacity(n);
        let mut exit: Option<ViewVec> = None;
        for i in 0..n {
            let cur = points[(start + i) % n];
            let next = points[(start + i + 1) % n];
            let (cur_visible, next_visible) = (cur[0] > 0.0, next[0] > 0.0);

            if cur_visible {
                out.push(self.to_screen(cur));
            }
            if cur_visible && !next_visible {
                let h = horizon_crossing(cur, next);
                out.push(self.to_screen(h));
                exit = Some(h);
            } else if !cur_visible && next_visible {
                let h = horizon_crossing(cur, next);
                if let Some(e) = exit.take() {
                    self.horizon_arc(&mut out, e, h);
                }
                out.push(self.to_screen(h));
            }
        }

        if out.len() < 3 {
            None
        } else {
            Some(out)
        }
    }

    fn horizon_arc(&self, out: &mut Vec<ScreenPoint>, from: ViewVec, to: ViewVec) {
        let start = from[2].atan2(from[1]);
        let end = to[2].atan2(to[1]);
        let span = (start - end).rem_euclid(TAU);
        let steps = (span.to_degrees() / HORIZON_STEP).ceil() as usize;
        for k in 1..steps {
            let angle = start - span * k as f64 / steps as f64;
            out.push(self.to_screen([0.0, angle.cos(), angle.sin()]));
        }
    }

    /// Rotate into view space, inserting great-circle points on long edges.
    fn densify(&self, coords: &[GeoCoord], closed: bool) -> Vec<ViewVec> {
        let mut units: Vec<[f64; 3]> = coords.iter().map(|c| c.to_unit()).collect();
        if closed && units.len() > 1 && units.first() == units.last() {
            units.pop();
        }
        let segments = if closed { units.len() } else { units.len().saturating_sub(1) };

        let mut out = Vec::with_capacity(units.len() * 2);
        for i in 0..units.len() {
            out.push(self.rotate_unit(units[i]));
            if i >= segments {
                continue;
            }
            let (a, b) = (units[i], units[(i + 1) % units.len()]);
            let angle = dot(a, b).clamp(-1.0, 1.0).acos();
            let steps = (angle.to_degrees() / DENSIFY_STEP).ceil() as usize;
            let sin = angle.sin();
            if steps < 2 || sin.abs() < 1e-12 {
                continue;
            }
            for k in 1..steps {
                let t = k as f64 / steps as f64;
                let wa = ((1.0 - t) * angle).sin() / sin;
                let wb = (t * angle).sin() / sin;
                out.push(self.rotate_unit([
                    wa * a[0] + wb * b[0],
                    wa * a[1] + wb * b[1],
                    wa * a[2] + wb * b[2],
                ]));
            }
        }
        out
    }

    fn rotate_unit(&self, v: [f64; 3]) -> ViewVec {
        let (sin_l, cos_l) = self.lambda.sin_cos();
        let x = v[0] * cos_l - v[1] * sin_l;
        let y = v[0] * sin_l + v[1] * cos_l;
        let z = v[2];
        [
            x * self.cos_phi - z * self.sin_phi,
            y,
            z * self.cos_phi + x * self.sin_phi,
        ]
    }
}

fn dot(a: [f64; 3], b: [f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

/// Point where the chord from `a` to `b` meets the depth-0 plane, pushed
/// out onto the unit circle.
fn horizon_crossing(a: ViewVec, b: ViewVec) -> ViewVec {
    let denom = a[0] - b[0];
    let t = if denom.abs() < 1e-12 { 0.5 } else { a[0] / denom };
    let y = a[1] + (b[1] - a[1]) * t;
    let z = a[2] + (b[2] - a[2]) * t;
    let len = (y * y + z * z).sqrt();
    if len < 1e-12 {
        [0.0, 1.0, 0.0]
    } else {
        [0.0, y / len, z / len]
    }
}

/// Point a fraction `t` of the way along the great circle from `a` to `b`.
pub fn interpolate(a: GeoCoord, b: GeoCoord, t: f64) -> GeoCoord {
    let (x0, y0) = (a.lon.to_radians(), a.lat.to_radians());
    let (x1, y1) = (b.lon.to_radians(), b.lat.to_radians());
    let (cy0, sy0) = (y0.cos(), y0.sin());
    let (cy1, sy1) = (y1.cos(), y1.sin());

    let d = 2.0 * (haversin(y1 - y0) + cy0 * cy1 * haversin(x1 - x0)).sqrt().clamp(0.0, 1.0).asin();
    if d == 0.0 {
        return a;
    }
    let k = d.sin();
    if k.abs() < 1e-12 {
        // Antipodal: no unique great circle.
        return GeoCoord::new(a.lon + (b.lon - a.lon) * t, a.lat + (b.lat - a.lat) * t);
    }

    let wa = ((1.0 - t) * d).sin() / k;
    let wb = (t * d).sin() / k;
    let x = wa * cy0 * x0.cos() + wb * cy1 * x1.cos();
    let y = wa * cy0 * x0.sin() + wb * cy1 * x1.sin();
    let z = wa * sy0 + wb * sy1;
    GeoCoord::new(y.atan2(x).to_degrees(), z.atan2((x * x + y * y).sqrt()).to_degrees())
}

fn haversin(x: f64) -> f64 {
    let s = (x / 2.0).sin();
    s * s
}

/// Radial factor for satellite-routed attacks: 1 at both ends, 1.4 midway.
pub fn satellite_elevation(progress: f64) -> f64 {
    1.0 + (progress * PI).sin() * 0.4
}

/// 10 degree grid: meridians stop at +-80 except every 90 degrees.
pub fn graticule() -> Vec<Vec<GeoCoord>> {
    let mut lines = Vec::new();
    for lon in (-180..180).step_by(10) {
        let extent = if lon % 90 == 0 { 90 } else { 80 };
        let line = (-extent..=extent)
            .step_by(5)
            .map(|lat| GeoCoord::new(lon as f64, lat as f64))
            .collect();
        lines.push(line);
    }
    for lat in (-80..=80).step_by(10) {
        let line = (0..=144)
            .map(|i| GeoCoord::new(-180.0 + i as f64 * 2.5, lat as f64))
            .collect();
        lines.push(line);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view(lambda: f64, phi: f64) -> ViewState {
        ViewState::new([lambda, phi], 1.0)
    }

    #[test]
    fn origin_projects_to_midpoint() {
        let p = Projection::new(&view(0.0, 0.0), 800.0, 600.0);
        let s = p.project(GeoCoord::new(0.0, 0.0)).unwrap();
        assert!((s.x - 400.0).abs() < 1e-9);
        assert!((s.y - 300.0).abs() < 1e-9);
    }

    #[test]
    fn rotation_recentres_on_negated_view() {
        let p = Projection::new(&view(-30.0, -40.0), 600.0, 600.0);
        let s = p.project(GeoCoord::new(30.0, 40.0)).unwrap();
        assert!((s.x - 300.0).abs() < 1e-9);
        assert!((s.y - 300.0).abs() < 1e-9);
    }

    #[test]
    fn far_side_is_hidden() {
        let p = Projection::new(&view(0.0, 0.0), 600.0, 600.0);
        assert!(p.project(GeoCoord::new(180.0, 0.0)).is_none());
        assert!(p.project(GeoCoord::new(120.0, 10.0)).is_none());
        assert!(p.project(GeoCoord::new(60.0, 10.0)).is_some());
    }

    #[test]
    fn north_is_up_and_east_is_right() {
        let p = Projection::new(&view(0.0, 0.0), 600.0, 600.0);
        let north = p.project(GeoCoord::new(0.0, 30.0)).unwrap();
        let east = p.project(GeoCoord::new(30.0, 0.0)).unwrap();
        assert!(north.y < 300.0);
        assert!(east.x > 300.0);
    }

    #[test]
    fn scale_follows_zoom() {
        let p = Projection::new(&ViewState::new([0.0, 0.0], 2.0), 440.0, 880.0);
        assert!((p.base_scale - 200.0).abs() < 1e-9);
        assert!((p.scale - 400.0).abs() < 1e-9);
        let edge = p.project(GeoCoord::new(90.0 - 1e-9, 0.0)).unwrap();
        assert!((edge.x - (220.0 + 400.0)).abs() < 1e-3);
    }

    #[test]
    fn ui_scale_has_floor() {
        let small = Projection::new(&view(0.0, 0.0), 80.0, 48.0);
        assert_eq!(small.ui_scale(), 0.4);
        let reference = Projection::new(&view(0.0, 0.0), 800.0, 600.0);
        assert!((reference.ui_scale() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn interpolation_endpoints_and_midpoint() {
        let a = GeoCoord::new(-74.006, 40.7128);
        let b = GeoCoord::new(139.6917, 35.6895);
        assert!(interpolate(a, b, 0.0).near(&a, 1e-9));
        assert!(interpolate(a, b, 1.0).near(&b, 1e-9));

        let m = interpolate(GeoCoord::new(0.0, 0.0), GeoCoord::new(90.0, 0.0), 0.5);
        assert!(m.near(&GeoCoord::new(45.0, 0.0), 1e-9));

        let polar = interpolate(GeoCoord::new(0.0, 0.0), GeoCoord::new(0.0, 90.0), 0.5);
        assert!((polar.lat - 45.0).abs() < 1e-9);
    }

    #[test]
    fn interpolation_degenerate_cases() {
        let a = GeoCoord::new(12.0, 34.0);
        assert_eq!(interpolate(a, a, 0.7), a);

        let m = interpolate(GeoCoord::new(0.0, 0.0), GeoCoord::new(180.0, 0.0), 0.5);
        assert!(m.lon.is_finite() && m.lat.is_finite());
    }

    #[test]
    fn elevation_profile() {
        assert_eq!(satellite_elevation(0.0), 1.0);
        assert!((satellite_elevation(0.5) - 1.4).abs() < 1e-12);
        assert!((satellite_elevation(1.0) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn elevate_scales_from_centre() {
        let p = Projection::new(&view(0.0, 0.0), 200.0, 100.0);
        let e = p.elevate(ScreenPoint::new(110.0, 40.0), 1.5);
        assert!((e.x - 115.0).abs() < 1e-9);
        assert!((e.y - 35.0).abs() < 1e-9);
    }

    #[test]
    fn great_circle_splits_at_horizon() {
        let p = Projection::new(&view(0.0, 0.0), 600.0, 600.0);
        let runs = p.great_circle(GeoCoord::new(-60.0, 0.0), GeoCoord::new(150.0, 0.0));
        assert_eq!(runs.len(), 1);
        let last = runs[0].last().unwrap();
        let r = last.distance(&p.center);
        assert!((r - p.scale).abs() < 1e-6);

        let hidden = p.great_circle(GeoCoord::new(120.0, 0.0), GeoCoord::new(170.0, 10.0));
        assert!(hidden.is_empty());
    }

    #[test]
    fn visible_ring_is_kept_whole() {
        let p = Projection::new(&view(0.0, 0.0), 600.0, 600.0);
        let ring = [
            GeoCoord::new(-0.5, -0.5),
            GeoCoord::new(-0.5, 0.5),
            GeoCoord::new(0.5, 0.5),
            GeoCoord::new(0.5, -0.5),
            GeoCoord::new(-0.5, -0.5),
        ];
        let clipped = p.clip_ring(&ring).unwrap();
        assert_eq!(clipped.len(), 4);
        assert!(p.clip_ring(&[GeoCoord::new(170.0, 0.0), GeoCoord::new(171.0, 0.0), GeoCoord::new(170.0, 1.0)]).is_none());
    }

    #[test]
    fn straddling_ring_closes_on_horizon() {
        let p = Projection::new(&view(0.0, 0.0), 600.0, 600.0);
        // Clockwise seen from outside: west edge north, east edge south.
        let ring = [
            GeoCoord::new(60.0, -10.0),
            GeoCoord::new(60.0, 10.0),
            GeoCoord::new(120.0, 10.0),
            GeoCoord::new(120.0, -10.0),
            GeoCoord::new(60.0, -10.0),
        ];
        let clipped = p.clip_ring(&ring).unwrap();
        for pt in &clipped {
            assert!(pt.distance(&p.center) <= p.scale + 1e-6);
            assert!(pt.x >= 300.0);
        }
        let on_rim = clipped.iter().filter(|pt| (pt.distance(&p.center) - p.scale).abs() < 1e-6).count();
        assert!(on_rim >= 2);
    }

    #[test]
    fn graticule_shape() {
        let lines = graticule();
        assert_eq!(lines.len(), 36 + 17);
        let full = lines.iter().filter(|l| l.first().map(|c| c.lat) == Some(-90.0)).count();
        assert_eq!(full, 4);
    }
}
