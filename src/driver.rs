//! Turns table slices and contact graphs into drawable frames.
//!
//! Frames are produced strictly in ordinal order `0..total`, one at a time,
//! and handed to a [`DrawingSurface`].

use std::io::Write;

use rand::Rng;
use tracing::debug;

use crate::adjacency::AdjacencySeries;
use crate::color::{
    charging_colors, energy_colors, mode_colors, random_group_colors, weighted_edge_colors, Rgb,
    BLACK, WHITE,
};
use crate::error::{Result, VizError};
use crate::schema::SourceKind;
use crate::segment::{arrows, edge_segments, Arrow, GeoSegment};
use crate::table::{FrameIndex, TimeSeriesLog, TimeSlice};
use crate::time::clock_label;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointStyle {
    #[default]
    Groups,
    Energy,
    Charging,
    Mode,
}

impl PointStyle {
    pub const ALL: [PointStyle; 4] = [
        PointStyle::Groups,
        PointStyle::Energy,
        PointStyle::Charging,
        PointStyle::Mode,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            PointStyle::Groups => "groups",
            PointStyle::Energy => "energy",
            PointStyle::Charging => "charging",
            PointStyle::Mode => "mode",
        }
    }
}

impl std::str::FromStr for PointStyle {
    type Err = VizError;

    fn from_str(s: &str) -> Result<Self> {
        PointStyle::ALL
            .into_iter()
            .find(|p| p.label() == s)
            .ok_or_else(|| VizError::InvalidArgument(format!("unknown point style \"{s}\"")))
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MapPoint {
    pub lon: f64,
    pub lat: f64,
    pub color: Rgb,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MapLine {
    pub segment: GeoSegment,
    pub color: Rgb,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    pub index: usize,
    pub total: usize,
    pub time: String,
    pub clock: String,
    pub points: Vec<MapPoint>,
    pub lines: Vec<MapLine>,
    pub arrows: Vec<Arrow>,
}

pub trait DrawingSurface {
    fn draw_frame(&mut self, frame: &Frame) -> Result<()>;

    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

pub trait ProgressSink {
    fn progress(&mut self, current: usize, total: usize);

    fn finish(&mut self) {}
}

#[derive(Debug, Default)]
pub struct ConsoleProgress {
    last: Option<usize>,
}

impl ProgressSink for ConsoleProgress {
    fn progress(&mut self, current: usize, total: usize) {
        let percent = if total == 0 { 100 } else { current * 100 / total };
        if self.last == Some(percent) {
            return;
        }
        self.last = Some(percent);
        let mut err = std::io::stderr().lock();
        let _ = write!(err, "\r{percent}%");
        let _ = err.flush();
    }

    fn finish(&mut self) {
        eprintln!("\r100%");
    }
}

#[derive(Debug, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn progress(&mut self, _current: usize, _total: usize) {}
}

pub struct FrameDriver {
    log: TimeSeriesLog,
    index: FrameIndex,
    unweighted: AdjacencySeries,
    weighted: AdjacencySeries,
    style: PointStyle,
    group_colors: Vec<Rgb>,
    weight_range: (f64, f64),
}

impl FrameDriver {
    /// Checks that the log and any contact graphs line up frame by frame and
    /// entity by entity. `rng` seeds the group palette.
    pub fn new<R: Rng + ?Sized>(
        log: TimeSeriesLog,
        unweighted: AdjacencySeries,
        weighted: AdjacencySeries,
        style: PointStyle,
        rng: &mut R,
    ) -> Result<Self> {
        let index = log.frames();
        if index.is_empty() {
            return Err(VizError::malformed("log has no records"));
        }
        let entities = log.slice(&index, 0)?.len();

        for (name, series) in [("unweighted", &unweighted), ("weighted", &weighted)] {
            if !series.is_enabled() {
                continue;
            }
            if series.len() != index.len() {
                return Err(VizError::malformed(format!(
                    "{name} contact log has {} frames, node log has {}",
                    series.len(),
                    index.len()
                )));
            }
            if series.order() != Some(entities) {
                return Err(VizError::malformed(format!(
                    "{name} contact matrices are {:?} wide, node log has {entities} nodes",
                    series.order()
                )));
            }
        }

        let group_colors = match style {
            PointStyle::Groups => {
                let groups: Vec<i64> = log
                    .slice(&index, 0)?
                    .column("constellation")?
                    .iter()
                    .map(|&g| g as i64)
                    .collect();
                random_group_colors(&groups, rng)
            }
            _ => Vec::new(),
        };
        let weight_range = weighted.range().unwrap_or((0.0, 0.0));
        debug!(
            frames = index.len(),
            entities,
            style = style.label(),
            "frame driver ready"
        );

        Ok(Self {
            log,
            index,
            unweighted,
            weighted,
            style,
            group_colors,
            weight_range,
        })
    }

    pub fn frame_count(&self) -> usize {
        self.index.len()
    }

    pub fn log(&self) -> &TimeSeriesLog {
        &self.log
    }

    fn point_colors(&self, slice: &TimeSlice<'_>) -> Result<Vec<Rgb>> {
        Ok(match self.style {
            PointStyle::Groups => self.group_colors.clone(),
            PointStyle::Energy => energy_colors(&slice.column("energy")?),
            PointStyle::Charging => charging_colors(&slice.column("charging")?),
            PointStyle::Mode => mode_colors(&slice.column("mode")?),
        })
    }

    pub fn compose(&self, frame: usize) -> Result<Frame> {
        let slice = self.log.slice(&self.index, frame)?;
        let lons = slice.column("longitude")?;
        let lats = slice.column("latitude")?;
        let colors = self.point_colors(&slice)?;

        let mut lines = Vec::new();
        if let Some(weights) = self.weighted.frame(frame) {
            let (min, max) = self.weight_range;
            let palette = weighted_edge_colors(weights, min, max);
            for edge in edge_segments(weights, &lons, &lats) {
                let color = palette[(edge.tx, edge.rx)];
                lines.extend(
                    edge.split
                        .segments()
                        .into_iter()
                        .map(|segment| MapLine { segment, color }),
                );
            }
        }
        if let Some(contacts) = self.unweighted.frame(frame) {
            for edge in edge_segments(contacts, &lons, &lats) {
                lines.extend(edge.split.segments().into_iter().map(|segment| MapLine {
                    segment,
                    color: BLACK,
                }));
            }
        }

        let points = lons
            .iter()
            .zip(&lats)
            .zip(colors.iter().chain(std::iter::repeat(&BLACK)))
            .map(|((&lon, &lat), &color)| MapPoint { lon, lat, color })
            .collect();

        Ok(Frame {
            index: frame,
            total: self.frame_count(),
            time: slice.time().to_string(),
            clock: clock_label(slice.time()),
            points,
            lines,
            arrows: Vec::new(),
        })
    }

    pub fn render(
        &self,
        frame: usize,
        surface: &mut dyn DrawingSurface,
        progress: &mut dyn ProgressSink,
    ) -> Result<()> {
        progress.progress(frame, self.frame_count());
        let composed = self.compose(frame)?;
        surface.draw_frame(&composed)
    }

    pub fn run(&self, surface: &mut dyn DrawingSurface, progress: &mut dyn ProgressSink) -> Result<()> {
        for frame in 0..self.frame_count() {
            self.render(frame, surface, progress)?;
        }
        progress.finish();
        surface.finish()
    }
}

pub fn channel_frame(log: &TimeSeriesLog, row: usize) -> Result<Frame> {
    if log.kind() != SourceKind::Channel {
        return Err(VizError::InvalidArgument(format!(
            "expected a channel log, got {}",
            log.kind().label()
        )));
    }
    let key = log.keys().get(row).ok_or(VizError::FrameOutOfRange {
        index: row,
        total: log.len(),
    })?;
    let value = |name: &str| -> Result<f64> { Ok(log.column(name)?[row]) };
    let (tx_lon, rx_lon) = (value("tx_lon")?, value("rx_lon")?);
    let (tx_lat, rx_lat) = (value("tx_lat")?, value("rx_lat")?);

    Ok(Frame {
        index: row,
        total: log.len(),
        time: key.time.clone(),
        clock: clock_label(&key.time),
        points: vec![
            MapPoint {
                lon: tx_lon,
                lat: tx_lat,
                color: WHITE,
            },
            MapPoint {
                lon: rx_lon,
                lat: rx_lat,
                color: WHITE,
            },
        ],
        lines: Vec::new(),
        arrows: arrows(tx_lon, rx_lon, tx_lat, rx_lat),
    })
}
