//! Render settings shared by every subcommand.
//!
//! Defaults match the stock figures. A TOML file may override any subset of
//! fields and command-line flags override both.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::background::DEFAULT_BACKGROUND_DIR;
use crate::driver::PointStyle;
use crate::error::{Result, VizError};
use crate::geo::default_cache_dir;
use crate::render::sanitize_dimension;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Video,
    Png,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub width: u32,
    pub height: u32,
    pub title: String,
    pub style: PointStyle,
    pub point_radius: u32,
    pub line_width: u32,
    pub map_fps: u32,
    pub network_fps: u32,
    pub data_fps: u32,
    pub format: OutputFormat,
    pub contact_size: u32,
    pub seed: Option<u64>,
    pub basemap: bool,
    pub geodata_dir: Option<PathBuf>,
    pub background_dir: Option<PathBuf>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 1400,
            height: 796,
            title: "Cube Satellite Positions".to_string(),
            style: PointStyle::Groups,
            point_radius: 3,
            line_width: 1,
            map_fps: 24,
            network_fps: 10,
            data_fps: 1,
            format: OutputFormat::Video,
            contact_size: 600,
            seed: None,
            basemap: true,
            geodata_dir: None,
            background_dir: None,
        }
    }
}

impl RenderConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| VizError::io(path, e))?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        let config: RenderConfig = toml::from_str(text)
            .map_err(|e| VizError::InvalidArgument(format!("config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.width < 2 || self.height < 2 {
            return Err(VizError::InvalidArgument(format!(
                "frame size {}x{} is too small",
                self.width, self.height
            )));
        }
        if self.map_fps == 0 || self.network_fps == 0 || self.data_fps == 0 {
            return Err(VizError::InvalidArgument("frame rates must be positive".into()));
        }
        Ok(())
    }

    pub fn geodata_dir(&self) -> PathBuf {
        self.geodata_dir.clone().unwrap_or_else(default_cache_dir)
    }

    pub fn background_dir(&self) -> PathBuf {
        self.background_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_BACKGROUND_DIR))
    }

    pub fn frame_size(&self, video: bool) -> (u32, u32) {
        if video {
            (sanitize_dimension(self.width), sanitize_dimension(self.height))
        } else {
            (self.width, self.height)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let config = RenderConfig::from_toml("style = \"energy\"\nmap_fps = 30\nformat = \"png\"\n")
            .unwrap();
        assert_eq!(config.style, PointStyle::Energy);
        assert_eq!(config.map_fps, 30);
        assert_eq!(config.format, OutputFormat::Png);
        assert_eq!(config.network_fps, 10);
        assert_eq!(config.title, "Cube Satellite Positions");
    }

    #[test]
    fn odd_sizes_are_evened_for_video() {
        let config = RenderConfig::from_toml("width = 1401\nheight = 797\ndata_fps = 1").unwrap();
        assert_eq!(config.frame_size(true), (1400, 796));
        assert_eq!(config.frame_size(false), (1401, 797));
        assert_eq!(config.background_dir(), PathBuf::from("input/bm"));
    }

    #[test]
    fn zero_frame_rate_is_rejected() {
        assert!(RenderConfig::from_toml("data_fps = 0").is_err());
        assert!(RenderConfig::from_toml("style = \"rainbow\"").is_err());
    }
}
