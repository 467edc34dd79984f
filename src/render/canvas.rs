//! Software raster canvas
//!
//! Drawing calls take logical coordinates; the backing store holds
//! `density` pixels per logical unit on each axis. Every shape is first
//! rasterised into a coverage mask and then composited once, so
//! overlapping segments of one stroke never double up their alpha.

use crate::projection::ScreenPoint;
use crate::theme::Rgba;
use image::RgbaImage;

const SUBSCANLINES: usize = 4;

pub const MAX_DENSITY: u32 = 8;
/// Largest backing-store side in device pixels.
pub const MAX_BACKING_SIDE: u32 = 4096;

/// Fill or stroke source, positioned in logical coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Paint {
    Solid(Rgba),
    /// Concentric radial gradient between two radii
    Radial {
        center: ScreenPoint,
        inner: f64,
        outer: f64,
        from: Rgba,
        to: Rgba,
    },
    Linear {
        start: ScreenPoint,
        end: ScreenPoint,
        from: Rgba,
        to: Rgba,
    },
}

impl Paint {
    pub fn color_at(&self, x: f64, y: f64) -> Rgba {
        match *self {
            Paint::Solid(c) => c,
            Paint::Radial { center, inner, outer, from, to } => {
                let d = ((x - center.x).powi(2) + (y - center.y).powi(2)).sqrt();
                let span = outer - inner;
                let t = if span <= 0.0 { 1.0 } else { ((d - inner) / span).clamp(0.0, 1.0) };
                from.lerp(to, t as f32)
            }
            Paint::Linear { start, end, from, to } => {
                let (dx, dy) = (end.x - start.x, end.y - start.y);
                let len2 = dx * dx + dy * dy;
                let t = if len2 == 0.0 {
                    0.0
                } else {
                    (((x - start.x) * dx + (y - start.y) * dy) / len2).clamp(0.0, 1.0)
                };
                from.lerp(to, t as f32)
            }
        }
    }
}

impl From<Rgba> for Paint {
    fn from(c: Rgba) -> Self {
        Paint::Solid(c)
    }
}

#[derive(Clone, Copy, Debug)]
struct Bounds {
    x0: usize,
    y0: usize,
    x1: usize,
    y1: usize,
}

pub struct Canvas {
    width: u32,
    height: u32,
    density: u32,
    pw: usize,
    ph: usize,
    pixels: Vec<[f32; 3]>,
    mask: Vec<f32>,
    dirty: Option<Bounds>,
}

impl Canvas {
    /// Sizes are clamped so the backing store stays within [`MAX_BACKING_SIDE`].
    pub fn new(width: u32, height: u32, density: u32) -> Self {
        let density = density.clamp(1, MAX_DENSITY);
        let width = width.min(MAX_BACKING_SIDE / density);
        let height = height.min(MAX_BACKING_SIDE / density);
        let pw = (width * density) as usize;
        let ph = (height * density) as usize;
        Self {
            width,
            height,
            density,
            pw,
            ph,
            pixels: vec![[0.0; 3]; pw * ph],
            mask: vec![0.0; pw * ph],
            dirty: None,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Resize, keeping the allocation when the backing size is unchanged.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == self.width && height == self.height {
            return;
        }
        *self = Canvas::new(width, height, self.density);
    }

    pub fn clear(&mut self, color: Rgba) {
        let rgb = [color.r as f32, color.g as f32, color.b as f32];
        self.pixels.fill(rgb);
        self.mask.fill(0.0);
        self.dirty = None;
    }

    /// Backing pixel as opaque RGB.
    #[cfg(test)]
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x as usize >= self.pw || y as usize >= self.ph {
            return None;
        }
        let p = self.pixels[y as usize * self.pw + x as usize];
        Some([to_byte(p[0]), to_byte(p[1]), to_byte(p[2])])
    }

    fn scale(&self) -> f64 {
        self.density as f64
    }

    fn bounds(&self, min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Option<Bounds> {
        if !(min_x.is_finite() && min_y.is_finite() && max_x.is_finite() && max_y.is_finite()) {
            return None;
        }
        let x0 = min_x.floor().max(0.0) as usize;
        let y0 = min_y.floor().max(0.0) as usize;
        let x1 = (max_x.ceil().max(0.0) as usize).min(self.pw);
        let y1 = (max_y.ceil().max(0.0) as usize).min(self.ph);
        if x0 >= x1 || y0 >= y1 {
            None
        } else {
            Some(Bounds { x0, y0, x1, y1 })
        }
    }

    fn mark_dirty(&mut self, b: Bounds) {
        self.dirty = Some(match self.dirty {
            None => b,
            Some(d) => Bounds {
                x0: d.x0.min(b.x0),
                y0: d.y0.min(b.y0),
                x1: d.x1.max(b.x1),
                y1: d.y1.max(b.y1),
            },
        });
    }

    fn cover(&mut self, x: usize, y: usize, coverage: f32) {
        let m = &mut self.mask[y * self.pw + x];
        if coverage > *m {
            *m = coverage.min(1.0);
        }
    }

    /// Blend the pending mask with `paint` and reset it.
    fn composite(&mut self, paint: &Paint, alpha: f64) {
        let Some(b) = self.dirty.take() else {
            return;
        };
        let s = self.scale();
        for y in b.y0..b.y1 {
            for x in b.x0..b.x1 {
                let i = y * self.pw + x;
                let m = self.mask[i];
                if m <= 0.0 {
                    continue;
                }
                self.mask[i] = 0.0;
                let c = paint.color_at((x as f64 + 0.5) / s, (y as f64 + 0.5) / s);
                let a = (c.a * alpha as f32 * m).clamp(0.0, 1.0);
                if a <= 0.0 {
                    continue;
                }
                let p = &mut self.pixels[i];
                p[0] += (c.r as f32 - p[0]) * a;
                p[1] += (c.g as f32 - p[1]) * a;
                p[2] += (c.b as f32 - p[2]) * a;
            }
        }
    }

    pub fn fill_circle(&mut self, center: ScreenPoint, radius: f64, paint: impl Into<Paint>, alpha: f64) {
        if radius <= 0.0 {
            return;
        }
        let s = self.scale();
        let (cx, cy, r) = (center.x * s, center.y * s, radius * s);
        let Some(b) = self.bounds(cx - r - 1.0, cy - r - 1.0, cx + r + 1.0, cy + r + 1.0) else {
            return;
        };
        for y in b.y0..b.y1 {
            for x in b.x0..b.x1 {
                let d = ((x as f64 + 0.5 - cx).powi(2) + (y as f64 + 0.5 - cy).powi(2)).sqrt();
                let cov = (r + 0.5 - d).clamp(0.0, 1.0).min(r * 2.0);
                if cov > 0.0 {
                    self.cover(x, y, cov as f32);
                }
            }
        }
        self.mark_dirty(b);
        self.composite(&paint.into(), alpha);
    }

    pub fn stroke_circle(&mut self, center: ScreenPoint, radius: f64, width: f64, paint: impl Into<Paint>, alpha: f64) {
        if radius < 0.0 || width <= 0.0 {
            return;
        }
        let s = self.scale();
        let (cx, cy, r, hw) = (center.x * s, center.y * s, radius * s, width * s / 2.0);
        let reach = r + hw + 1.0;
        let Some(b) = self.bounds(cx - reach, cy - reach, cx + reach, cy + reach) else {
            return;
        };
        let peak = (hw * 2.0).min(1.0);
        for y in b.y0..b.y1 {
            for x in b.x0..b.x1 {
                let d = ((x as f64 + 0.5 - cx).powi(2) + (y as f64 + 0.5 - cy).powi(2)).sqrt();
                let cov = (hw + 0.5 - (d - r).abs()).clamp(0.0, peak);
                if cov > 0.0 {
                    self.cover(x, y, cov as f32);
                }
            }
        }
        self.mark_dirty(b);
        self.composite(&paint.into(), alpha);
    }

    /// Stroke any number of polylines as one path with round joins.
    pub fn stroke_paths(&mut self, paths: &[Vec<ScreenPoint>], width: f64, paint: impl Into<Paint>, alpha: f64) {
        if width <= 0.0 {
            return;
        }
        for path in paths {
            for pair in path.windows(2) {
                self.cover_segment(pair[0], pair[1], width);
            }
        }
        self.composite(&paint.into(), alpha);
    }

    pub fn stroke_line(&mut self, a: ScreenPoint, b: ScreenPoint, width: f64, paint: impl Into<Paint>, alpha: f64) {
        if width <= 0.0 {
            return;
        }
        self.cover_segment(a, b, width);
        self.composite(&paint.into(), alpha);
    }

    fn cover_segment(&mut self, a: ScreenPoint, b: ScreenPoint, width: f64) {
        let s = self.scale();
        let (ax, ay, bx, by) = (a.x * s, a.y * s, b.x * s, b.y * s);
        let hw = width * s / 2.0;
        let reach = hw + 1.0;
        let Some(bounds) = self.bounds(
            ax.min(bx) - reach,
            ay.min(by) - reach,
            ax.max(bx) + reach,
            ay.max(by) + reach,
        ) else {
            return;
        };

        let (dx, dy) = (bx - ax, by - ay);
        let len2 = dx * dx + dy * dy;
        let peak = (hw * 2.0).min(1.0);
        for y in bounds.y0..bounds.y1 {
            for x in bounds.x0..bounds.x1 {
                let (px, py) = (x as f64 + 0.5, y as f64 + 0.5);
                let t = if len2 == 0.0 {
                    0.0
                } else {
                    (((px - ax) * dx + (py - ay) * dy) / len2).clamp(0.0, 1.0)
                };
                let d = ((px - ax - t * dx).powi(2) + (py - ay - t * dy).powi(2)).sqrt();
                let cov = (hw + 0.5 - d).clamp(0.0, peak);
                if cov > 0.0 {
                    self.cover(x, y, cov as f32);
                }
            }
        }
        self.mark_dirty(bounds);
    }

    /// Even-odd fill of one or more closed rings.
    pub fn fill_polygon(&mut self, rings: &[Vec<ScreenPoint>], paint: impl Into<Paint>, alpha: f64) {
        let s = self.scale();
        let scaled: Vec<Vec<(f64, f64)>> = rings
            .iter()
            .filter(|r| r.len() >= 3)
            .map(|r| r.iter().map(|p| (p.x * s, p.y * s)).collect())
            .collect();
        if scaled.is_empty() {
            return;
        }

        let (mut min_x, mut min_y, mut max_x, mut max_y) = (f64::MAX, f64::MAX, f64::MIN, f64::MIN);
        for &(x, y) in scaled.iter().flatten() {
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }
        let Some(b) = self.bounds(min_x, min_y, max_x, max_y) else {
            return;
        };

        let mut row = vec![0.0f32; b.x1 - b.x0];
        let mut crossings: Vec<f64> = Vec::new();
        for y in b.y0..b.y1 {
            row.fill(0.0);
            for k in 0..SUBSCANLINES {
                let sy = y as f64 + (k as f64 + 0.5) / SUBSCANLINES as f64;
                crossings.clear();
                for ring in &scaled {
                    for i in 0..ring.len() {
                        let (x0, y0) = ring[i];
                        let (x1, y1) = ring[(i + 1) % ring.len()];
                        if (y0 <= sy && sy < y1) || (y1 <= sy && sy < y0) {
                            crossings.push(x0 + (sy - y0) / (y1 - y0) * (x1 - x0));
                        }
                    }
                }
                crossings.sort_by(|a, b| a.total_cmp(b));
                for span in crossings.chunks_exact(2) {
                    let (xa, xb) = (span[0].max(b.x0 as f64), span[1].min(b.x1 as f64));
                    if xb <= xa {
                        continue;
                    }
                    let first = xa.floor() as usize;
                    let last = (xb.ceil() as usize).min(b.x1);
                    for px in first..last {
                        let overlap = (xb.min(px as f64 + 1.0) - xa.max(px as f64)).max(0.0);
                        row[px - b.x0] += (overlap / SUBSCANLINES as f64) as f32;
                    }
                }
            }
            for (i, &cov) in row.iter().enumerate() {
                if cov > 0.0 {
                    self.cover(b.x0 + i, y, cov);
                }
            }
        }
        self.mark_dirty(b);
        self.composite(&paint.into(), alpha);
    }

    /// Soft halo approximating a blurred shadow around a disc.
    pub fn glow(&mut self, center: ScreenPoint, radius: f64, blur: f64, color: Rgba) {
        const LAYERS: usize = 5;
        for i in (1..=LAYERS).rev() {
            let t = i as f64 / LAYERS as f64;
            self.fill_circle(center, radius + blur * t * 0.5, color, 0.12 * (1.0 - t) + 0.04);
        }
    }

    /// Full-resolution export.
    pub fn to_image(&self) -> RgbaImage {
        RgbaImage::from_fn(self.pw as u32, self.ph as u32, |x, y| {
            let p = self.pixels[y as usize * self.pw + x as usize];
            image::Rgba([to_byte(p[0]), to_byte(p[1]), to_byte(p[2]), 255])
        })
    }

    /// Box-filtered down to one pixel per logical unit.
    pub fn to_logical_image(&self) -> RgbaImage {
        let d = self.density as usize;
        let area = (d * d) as f32;
        RgbaImage::from_fn(self.width, self.height, |x, y| {
            let mut sum = [0.0f32; 3];
            for sy in 0..d {
                let row = (y as usize * d + sy) * self.pw;
                for sx in 0..d {
                    let p = self.pixels[row + x as usize * d + sx];
                    sum[0] += p[0];
                    sum[1] += p[1];
                    sum[2] += p[2];
                }
            }
            image::Rgba([to_byte(sum[0] / area), to_byte(sum[1] / area), to_byte(sum[2] / area), 255])
        })
    }
}

fn to_byte(v: f32) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}
