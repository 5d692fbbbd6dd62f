//! Monthly equirectangular background imagery.
//!
//! One image per month lives in a background directory as `MM.jpg` or
//! `MM.png` (`01` to `12`), spanning longitude -180..180 and latitude
//! 90..-90 with row 0 at the north edge.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::error::{Result, VizError};

pub const DEFAULT_BACKGROUND_DIR: &str = "input/bm";
const EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

#[derive(Clone, Debug, PartialEq)]
pub struct Background {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<[u8; 3]>,
}

impl Background {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut reader = image::ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| VizError::malformed(format!("background format: {e}")))?;
        reader.no_limits();
        let img = reader
            .decode()
            .map_err(|e| VizError::malformed(format!("background image: {e}")))?
            .to_rgb8();
        let (width, height) = img.dimensions();
        if width == 0 || height == 0 {
            return Err(VizError::malformed("background image is empty"));
        }
        let pixels = img.pixels().map(|p| p.0).collect();
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    pub fn open(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path).map_err(|e| VizError::io(path, e))?;
        Self::from_bytes(&bytes)
    }

    /// The image for `month` under `dir`, or `None` when there is none or
    /// it cannot be decoded.
    pub fn for_month(dir: &Path, month: u32) -> Option<Self> {
        let path = month_path(dir, month)?;
        match Self::open(&path) {
            Ok(bg) => {
                info!("Processing background \"{}\"", path.display());
                Some(bg)
            }
            Err(e) => {
                warn!("Ignoring background \"{}\": {e}", path.display());
                None
            }
        }
    }

    pub fn sample(&self, lon: f64, lat: f64) -> [u8; 3] {
        let u = ((lon + 180.0) / 360.0).clamp(0.0, 1.0);
        let v = ((90.0 - lat) / 180.0).clamp(0.0, 1.0);
        let x = ((u * self.width as f64) as u32).min(self.width - 1);
        let y = ((v * self.height as f64) as u32).min(self.height - 1);
        self.pixels[(y * self.width + x) as usize]
    }
}

pub fn month_path(dir: &Path, month: u32) -> Option<PathBuf> {
    EXTENSIONS
        .iter()
        .map(|ext| dir.join(format!("{month:02}.{ext}")))
        .find(|p| p.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn save(dir: &Path, name: &str, pixels: &[[u8; 3]], width: u32) {
        let height = pixels.len() as u32 / width;
        let raw: Vec<u8> = pixels.iter().flatten().copied().collect();
        image::RgbImage::from_raw(width, height, raw)
            .unwrap()
            .save(dir.join(name))
            .unwrap();
    }

    #[test]
    fn samples_by_quadrant() {
        let dir = tempfile::tempdir().unwrap();
        save(
            dir.path(),
            "03.png",
            &[[255, 0, 0], [0, 255, 0], [0, 0, 255], [9, 9, 9]],
            2,
        );
        let bg = Background::for_month(dir.path(), 3).unwrap();
        assert_eq!((bg.width, bg.height), (2, 2));
        assert_eq!(bg.sample(-90.0, 45.0), [255, 0, 0]);
        assert_eq!(bg.sample(90.0, 45.0), [0, 255, 0]);
        assert_eq!(bg.sample(-90.0, -45.0), [0, 0, 255]);
        assert_eq!(bg.sample(180.0, -90.0), [9, 9, 9]);
    }

    #[test]
    fn missing_or_broken_month_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Background::for_month(dir.path(), 7).is_none());
        std::fs::write(dir.path().join("07.jpg"), b"not an image").unwrap();
        assert!(Background::for_month(dir.path(), 7).is_none());
    }
}
