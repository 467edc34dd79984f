//! World boundary polygons
//!
//! The land layer comes from the `world-atlas` TopoJSON bundle. It is
//! loaded at most once per process on a background thread and published
//! through [`AtlasCache`]; the frame loop only ever takes a snapshot.

use super::GeoCoord;
use anyhow::{anyhow, bail, Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Condvar, Mutex};
use std::thread;
use std::time::{Duration, Instant};

pub const DEFAULT_ATLAS_URL: &str = "https://cdn.jsdelivr.net/npm/world-atlas@2/countries-110m.json";

/// Object inside the topology holding the country geometries
const COUNTRIES_OBJECT: &str = "countries";

/// Upper bound on a downloaded atlas (the 110m bundle is ~100KB)
const MAX_ATLAS_SIZE: u64 = 20 * 1024 * 1024;

const FETCH_TIMEOUT: Duration = Duration::from_secs(15);

pub type Ring = Vec<GeoCoord>;
/// Exterior ring followed by any holes.
pub type Polygon = Vec<Ring>;

#[derive(Debug, Clone)]
pub struct Feature {
    pub name: String,
    pub polygons: Vec<Polygon>,
    /// Spherical area centroid
    pub centroid: GeoCoord,
}

#[derive(Debug, Clone, Default)]
pub struct WorldAtlas {
    pub features: Vec<Feature>,
}

// ============================================================================
// TopoJSON decoding
// ============================================================================

#[derive(Deserialize)]
struct Topology {
    #[serde(default)]
    transform: Option<Transform>,
    arcs: Vec<Vec<Vec<f64>>>,
    objects: HashMap<String, Geometry>,
}

#[derive(Deserialize)]
struct Transform {
    scale: [f64; 2],
    translate: [f64; 2],
}

#[derive(Deserialize, Default)]
struct Properties {
    name: Option<String>,
}

#[derive(Deserialize)]
#[serde(tag = "type")]
enum Geometry {
    GeometryCollection {
        geometries: Vec<Geometry>,
    },
    Polygon {
        arcs: Vec<Vec<i64>>,
        #[serde(default)]
        properties: Option<Properties>,
    },
    MultiPolygon {
        arcs: Vec<Vec<Vec<i64>>>,
        #[serde(default)]
        properties: Option<Properties>,
    },
    #[serde(other)]
    Other,
}

impl WorldAtlas {
    /// Decode the `countries` object of a TopoJSON topology.
    pub fn from_topojson(bytes: &[u8]) -> Result<Self> {
        let topology: Topology = serde_json::from_slice(bytes).context("invalid TopoJSON")?;
        let arcs = decode_arcs(&topology.arcs, topology.transform.as_ref());

        let root = topology
            .objects
            .get(COUNTRIES_OBJECT)
            .ok_or_else(|| anyhow!("topology has no '{}' object", COUNTRIES_OBJECT))?;

        let mut features = Vec::new();
        collect_features(root, &arcs, &mut features)?;
        Ok(Self { features })
    }
}

/// Undo quantisation and delta encoding.
fn decode_arcs(raw: &[Vec<Vec<f64>>], transform: Option<&Transform>) -> Vec<Vec<GeoCoord>> {
    raw.iter()
        .map(|arc| {
            let (mut x, mut y) = (0.0, 0.0);
            arc.iter()
                .filter(|p| p.len() >= 2)
                .map(|p| match transform {
                    Some(t) => {
                        x += p[0];
                        y += p[1];
                        GeoCoord::new(x * t.scale[0] + t.translate[0], y * t.scale[1] + t.translate[1])
                    }
                    None => GeoCoord::new(p[0], p[1]),
                })
                .collect()
        })
        .collect()
}

fn collect_features(geometry: &Geometry, arcs: &[Vec<GeoCoord>], out: &mut Vec<Feature>) -> Result<()> {
    match geometry {
        Geometry::GeometryCollection { geometries } => {
            for g in geometries {
                collect_features(g, arcs, out)?;
            }
        }
        Geometry::Polygon { arcs: rings, properties } => {
            let polygon = stitch_polygon(rings, arcs)?;
            out.push(Feature::new(feature_name(properties), vec![polygon]));
        }
        Geometry::MultiPolygon { arcs: polygons, properties } => {
            let polygons = polygons
                .iter()
                .map(|rings| stitch_polygon(rings, arcs))
                .collect::<Result<Vec<_>>>()?;
            out.push(Feature::new(feature_name(properties), polygons));
        }
        Geometry::Other => {}
    }
    Ok(())
}

fn feature_name(properties: &Option<Properties>) -> String {
    properties
        .as_ref()
        .and_then(|p| p.name.clone())
        .unwrap_or_default()
}

fn stitch_polygon(rings: &[Vec<i64>], arcs: &[Vec<GeoCoord>]) -> Result<Polygon> {
    rings.iter().map(|indices| stitch_ring(indices, arcs)).collect()
}

/// Join arcs into one ring. A negative index `~i` is arc `i` reversed;
/// consecutive arcs share their joining point.
fn stitch_ring(indices: &[i64], arcs: &[Vec<GeoCoord>]) -> Result<Ring> {
    let mut ring: Ring = Vec::new();
    for &index in indices {
        let (arc_idx, reversed) = if index >= 0 {
            (index as usize, false)
        } else {
            ((!index) as usize, true)
        };
        let Some(arc) = arcs.get(arc_idx) else {
            bail!("arc index {} out of range ({} arcs)", index, arcs.len());
        };

        let points: Box<dyn Iterator<Item = &GeoCoord>> = if reversed {
            Box::new(arc.iter().rev())
        } else {
            Box::new(arc.iter())
        };
        let skip = usize::from(!ring.is_empty());
        ring.extend(points.skip(skip).copied());
    }
    Ok(ring)
}

impl Feature {
    fn new(name: String, polygons: Vec<Polygon>) -> Self {
        let centroid = spherical_centroid(&polygons);
        log::trace!("feature {:?}: {} polygons, centroid {:?}", name, polygons.len(), centroid);
        Self { name, polygons, centroid }
    }
}

/// Direction of the vector area of the polygons: for each edge the unit
/// normal of its great circle weighted by the edge's arc length.
fn spherical_centroid(polygons: &[Polygon]) -> GeoCoord {
    let mut area = [0.0f64; 3];
    let mut mean = [0.0f64; 3];

    for ring in polygons.iter().flatten() {
        for pair in ring.windows(2) {
            let a = pair[0].to_unit();
            let b = pair[1].to_unit();
            mean = add(mean, a);

            let n = cross(a, b);
            let sin = norm(n);
            if sin < 1e-12 {
                continue;
            }
            let theta = sin.atan2(dot(a, b));
            area = add(area, scale(n, theta / sin));
        }
    }

    if norm(area) < 1e-9 {
        return GeoCoord::from_unit(mean);
    }
    // Ring winding decides the sign; the centroid is on the polygon's side.
    if dot(area, mean) < 0.0 {
        area = scale(area, -1.0);
    }
    GeoCoord::from_unit(area)
}

fn add(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [a[0] + b[0], a[1] + b[1], a[2] + b[2]]
}

fn scale(a: [f64; 3], k: f64) -> [f64; 3] {
    [a[0] * k, a[1] * k, a[2] * k]
}

fn dot(a: [f64; 3], b: [f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

fn cross(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

fn norm(a: [f64; 3]) -> f64 {
    dot(a, a).sqrt()
}

// ============================================================================
// Source
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum AtlasSource {
    Url(String),
    File(PathBuf),
}

impl Default for AtlasSource {
    fn default() -> Self {
        AtlasSource::Url(DEFAULT_ATLAS_URL.to_string())
    }
}

impl AtlasSource {
    /// Interpret a CLI/config value as a URL or a local path.
    pub fn parse(value: &str) -> Self {
        if value.starts_with("http://") || value.starts_with("https://") {
            AtlasSource::Url(value.to_string())
        } else {
            AtlasSource::File(PathBuf::from(value))
        }
    }

    /// Read and decode the atlas, using the on-disk cache for URLs.
    pub fn load(&self) -> Result<WorldAtlas> {
        match self {
            AtlasSource::File(path) => {
                let bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
                WorldAtlas::from_topojson(&bytes)
            }
            AtlasSource::Url(url) => {
                let cache_path = disk_cache_path(url);
                if let Some(path) = cache_path.as_deref().filter(|p| p.exists()) {
                    match fs::read(path).map_err(anyhow::Error::from).and_then(|b| WorldAtlas::from_topojson(&b)) {
                        Ok(atlas) => {
                            log::info!("world atlas loaded from cache {}", path.display());
                            return Ok(atlas);
                        }
                        Err(e) => log::warn!("ignoring unreadable atlas cache {}: {:#}", path.display(), e),
                    }
                }

                let bytes = fetch(url)?;
                let atlas = WorldAtlas::from_topojson(&bytes)?;
                if let Some(path) = cache_path {
                    if let Err(e) = write_cache(&path, &bytes) {
                        log::warn!("could not cache world atlas at {}: {:#}", path.display(), e);
                    }
                }
                Ok(atlas)
            }
        }
    }
}

fn fetch(url: &str) -> Result<Vec<u8>> {
    log::info!("fetching world atlas from {}", url);
    let response = ureq::get(url)
        .timeout(FETCH_TIMEOUT)
        .call()
        .with_context(|| format!("GET {}", url))?;

    let mut bytes = Vec::new();
    response
        .into_reader()
        .take(MAX_ATLAS_SIZE)
        .read_to_end(&mut bytes)
        .context("reading atlas body")?;
    Ok(bytes)
}

fn disk_cache_path(url: &str) -> Option<PathBuf> {
    let file_name = url.rsplit('/').next().filter(|n| !n.is_empty())?;
    Some(dirs::cache_dir()?.join("netwatch").join(file_name))
}

fn write_cache(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }
    fs::write(path, bytes)?;
    Ok(())
}

// ============================================================================
// Process-wide cache
// ============================================================================

#[derive(Debug, Clone)]
pub enum AtlasState {
    Uninitialized,
    Loading,
    Ready(Arc<WorldAtlas>),
    Failed(String),
}

/// Longest failure reason shown on the status line.
const STATUS_REASON_CHARS: usize = 32;

impl AtlasState {
    /// Short status-line text; empty once the map is drawn or never requested.
    pub fn label(&self) -> String {
        match self {
            AtlasState::Uninitialized | AtlasState::Ready(_) => String::new(),
            AtlasState::Loading => "map loading".to_string(),
            AtlasState::Failed(reason) => {
                let mut short: String = reason.chars().take(STATUS_REASON_CHARS).collect();
                if reason.chars().count() > STATUS_REASON_CHARS {
                    short.push('…');
                }
                format!("map offline: {}", short)
            }
        }
    }
}

/// Lifecycle: `Uninitialized -> Loading -> Ready | Failed`. Only the first
/// [`AtlasCache::try_begin`] wins; later calls are no-ops.
pub struct AtlasCache {
    state: Mutex<AtlasState>,
    settled: Condvar,
}

static GLOBAL_ATLAS: AtlasCache = AtlasCache::new();

impl AtlasCache {
    pub const fn new() -> Self {
        Self {
            state: Mutex::new(AtlasState::Uninitialized),
            settled: Condvar::new(),
        }
    }

    pub fn global() -> &'static AtlasCache {
        &GLOBAL_ATLAS
    }

    pub fn state(&self) -> AtlasState {
        self.state.lock().map(|s| s.clone()).unwrap_or(AtlasState::Uninitialized)
    }

    /// Ready atlas, if any.
    pub fn atlas(&self) -> Option<Arc<WorldAtlas>> {
        match self.state() {
            AtlasState::Ready(atlas) => Some(atlas),
            _ => None,
        }
    }

    /// Move to `Loading` if nothing has started yet.
    pub fn try_begin(&self) -> bool {
        let Ok(mut state) = self.state.lock() else {
            return false;
        };
        if matches!(*state, AtlasState::Uninitialized) {
            *state = AtlasState::Loading;
            true
        } else {
            false
        }
    }

    /// Publish the outcome of a load started with [`AtlasCache::try_begin`].
    pub fn finish(&self, result: Result<WorldAtlas>) {
        let next = match result {
            Ok(atlas) => {
                log::info!("world atlas ready: {} features", atlas.features.len());
                AtlasState::Ready(Arc::new(atlas))
            }
            Err(e) => {
                log::warn!("world atlas unavailable, drawing without land: {:#}", e);
                AtlasState::Failed(format!("{:#}", e))
            }
        };
        if let Ok(mut state) = self.state.lock() {
            if matches!(*state, AtlasState::Loading) {
                *state = next;
            }
        }
        self.settled.notify_all();
    }

    /// Block until the load settles or `timeout` passes.
    pub fn wait(&self, timeout: Duration) -> Option<Arc<WorldAtlas>> {
        let deadline = Instant::now() + timeout;
        let Ok(mut state) = self.state.lock() else {
            return None;
        };
        while matches!(*state, AtlasState::Loading) {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            state = match self.settled.wait_timeout(state, remaining) {
                Ok((guard, _)) => guard,
                Err(_) => return None,
            };
        }
        match &*state {
            AtlasState::Ready(atlas) => Some(Arc::clone(atlas)),
            _ => None,
        }
    }

    /// Load `source` on a background thread unless a load already started.
    pub fn spawn_load(&'static self, source: AtlasSource) {
        if !self.try_begin() {
            return;
        }
        thread::spawn(move || self.finish(source.load()));
    }
}
