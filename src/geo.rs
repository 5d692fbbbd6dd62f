//! Natural Earth land outlines for the map background.
//!
//! The GeoJSON is downloaded once and kept under the user cache directory.
//! A missing basemap only costs decoration, so callers fall back to an
//! empty one.

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::error::{Result, VizError};

const LAND_FILE: &str = "ne_110m_land.geojson";
const LAND_URL: &str =
    "https://raw.githubusercontent.com/nvkelso/natural-earth-vector/master/geojson/ne_110m_land.geojson";

// Land fill and outline, `#E6E6E6` and `#A1A1A1`.
pub const LAND_FILL: [u8; 3] = [0xe6, 0xe6, 0xe6];
pub const LAND_EDGE: [u8; 3] = [0xa1, 0xa1, 0xa1];

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Basemap {
    pub rings: Vec<Vec<(f64, f64)>>,
}

impl Basemap {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.rings.is_empty()
    }

    /// Reads land polygons from `cache_dir`, fetching them first if absent.
    /// Any failure is logged and yields an empty basemap.
    pub fn load_or_empty(cache_dir: &Path) -> Self {
        match load_land(cache_dir) {
            Ok(map) => map,
            Err(e) => {
                warn!("Basemap unavailable, drawing plain background: {e}");
                Self::empty()
            }
        }
    }
}

pub fn parse_geojson_land(json: &str) -> Result<Basemap> {
    let v: serde_json::Value =
        serde_json::from_str(json).map_err(|e| VizError::malformed(format!("geojson: {e}")))?;
    let features = v["features"]
        .as_array()
        .ok_or_else(|| VizError::malformed("geojson has no features"))?;
    let mut rings = Vec::new();
    for feat in features {
        let geom = &feat["geometry"];
        match geom["type"].as_str() {
            Some("Polygon") => {
                if let Some(ring) = geom["coordinates"].get(0).and_then(extract_ring) {
                    rings.push(ring);
                }
            }
            Some("MultiPolygon") => {
                if let Some(polys) = geom["coordinates"].as_array() {
                    rings.extend(polys.iter().filter_map(|p| p.get(0).and_then(extract_ring)));
                }
            }
            _ => {}
        }
    }
    Ok(Basemap { rings })
}

fn extract_ring(arr: &serde_json::Value) -> Option<Vec<(f64, f64)>> {
    let points = arr.as_array()?;
    let coords: Vec<(f64, f64)> = points
        .iter()
        .filter_map(|p| {
            let a = p.as_array()?;
            Some((a.first()?.as_f64()?, a.get(1)?.as_f64()?))
        })
        .collect();
    if coords.len() < 3 {
        None
    } else {
        Some(coords)
    }
}

pub fn dirs_cache() -> PathBuf {
    std::env::var_os("HOME")
        .map(|h| PathBuf::from(h).join(".cache"))
        .unwrap_or_else(|| PathBuf::from("."))
}

pub fn default_cache_dir() -> PathBuf {
    dirs_cache().join("netmap-viz").join("geodata")
}

fn fetch_or_cache(cache_dir: &Path, filename: &str, url: &str) -> Result<String> {
    std::fs::create_dir_all(cache_dir).map_err(|e| VizError::io(cache_dir, e))?;
    let path = cache_dir.join(filename);
    if path.exists() {
        return std::fs::read_to_string(&path).map_err(|e| VizError::io(&path, e));
    }
    info!("Downloading {url}");
    let resp = ureq::get(url)
        .call()
        .map_err(|e| VizError::Render(format!("fetching {url}: {e}")))?;
    let data = resp.into_string().map_err(|e| VizError::io(&path, e))?;
    std::fs::write(&path, &data).map_err(|e| VizError::io(&path, e))?;
    Ok(data)
}

pub fn load_land(cache_dir: &Path) -> Result<Basemap> {
    let json = fetch_or_cache(cache_dir, LAND_FILE, LAND_URL)?;
    parse_geojson_land(&json)
}
