//! Global geophysical fields drawn as translucent map overlays.
//!
//! Each input file holds one time step of a gridded variable covering the
//! whole globe, row 0 at the north edge.

use std::path::{Path, PathBuf};

use tracing::info;
use walkdir::WalkDir;

use crate::color::{cloud_colors, precipitation_colors, Rgba};
use crate::container::Container;
use crate::error::{Result, VizError};

// Columns per row in flat 1/16° MERRA-2 grids.
pub const DEFAULT_FIELD_WIDTH: usize = 5760;

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum FieldVariable {
    #[serde(rename = "TAUTOT")]
    CloudOpticalThickness,
    #[serde(rename = "PRECTOT")]
    Precipitation,
}

impl FieldVariable {
    pub fn name(&self) -> &'static str {
        match self {
            FieldVariable::CloudOpticalThickness => "TAUTOT",
            FieldVariable::Precipitation => "PRECTOT",
        }
    }

    fn encode(&self, values: &[f64]) -> Vec<Rgba> {
        match self {
            FieldVariable::CloudOpticalThickness => cloud_colors(values),
            FieldVariable::Precipitation => precipitation_colors(values),
        }
    }
}

impl std::str::FromStr for FieldVariable {
    type Err = VizError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "TAUTOT" => Ok(FieldVariable::CloudOpticalThickness),
            "PRECTOT" => Ok(FieldVariable::Precipitation),
            other => Err(VizError::InvalidArgument(format!(
                "unsupported field variable \"{other}\""
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct FieldImage {
    pub width: usize,
    pub height: usize,
    pub pixels: Vec<Rgba>,
}

impl FieldImage {
    pub fn sample(&self, lon: f64, lat: f64) -> Option<Rgba> {
        if self.width == 0 || self.height == 0 || !(-90.0..=90.0).contains(&lat) {
            return None;
        }
        let col = ((lon + 180.0) / 360.0 * self.width as f64).floor() as isize;
        let row = ((90.0 - lat) / 180.0 * self.height as f64).floor() as isize;
        let col = col.clamp(0, self.width as isize - 1) as usize;
        let row = row.clamp(0, self.height as isize - 1) as usize;
        self.pixels.get(row * self.width + col).copied()
    }
}

pub fn read_field(path: &Path, variable: FieldVariable) -> Result<FieldImage> {
    let container = Container::open(path)?;
    field_from_container(&container, variable)
}

pub fn field_from_container(container: &Container, variable: FieldVariable) -> Result<FieldImage> {
    let var = container.variable(variable.name())?;
    let values = var.values();
    // Trailing dimension is longitude; flat grids use the MERRA-2 width.
    let width = match var.dims.last() {
        Some(dim) if var.dims.len() >= 2 => container.dimension(dim)?,
        _ => DEFAULT_FIELD_WIDTH,
    };
    if width == 0 || values.is_empty() || values.len() % width != 0 {
        return Err(VizError::malformed(format!(
            "{} has {} values, not a multiple of {width} columns",
            variable.name(),
            values.len()
        )));
    }
    Ok(FieldImage {
        width,
        height: values.len() / width,
        pixels: variable.encode(values),
    })
}

/// Files directly inside `dir` ending in `extension`, sorted by path. An
/// empty listing is an error.
pub fn paths_with_extension(dir: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    let wanted = extension.trim_start_matches('.');
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| path.extension().is_some_and(|e| e == wanted))
        .collect();
    if files.is_empty() {
        return Err(VizError::InvalidArgument(format!(
            "\"{}\" has no \"*.{wanted}\"",
            dir.display()
        )));
    }
    files.sort();
    info!("Loading {} files from \"{}\"", files.len(), dir.display());
    Ok(files)
}
