//! Raster drawing surfaces and frame writers.
//!
//! Maps are drawn with plotters into an RGB buffer using an
//! equirectangular layout: longitude -180..180 across, latitude 90..-90
//! down, with a thin bar above and below the map for the title and clock.

use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::Command;

use nalgebra::DMatrix;
use plotters::prelude::*;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::background::Background;
use crate::color::{finite_range, normalize, to_u8, Colormap, Rgb, LINK_GREEN};
use crate::driver::{DrawingSurface, Frame};
use crate::error::{Result, VizError};
use crate::field::FieldImage;
use crate::geo::{Basemap, LAND_EDGE, LAND_FILL};

// Latitude span of the title and clock bars.
const BAR_DEGREES: f64 = 12.0;
const LAT_EXTENT: f64 = 90.0 + BAR_DEGREES;
const ARROW_HEAD_DEGREES: f64 = 6.0;

fn plot_err<E: std::fmt::Display>(err: E) -> VizError {
    VizError::Render(err.to_string())
}

fn rgb(color: [u8; 3]) -> RGBColor {
    RGBColor(color[0], color[1], color[2])
}

fn rgb_f(color: Rgb) -> RGBColor {
    RGBColor(to_u8(color[0]), to_u8(color[1]), to_u8(color[2]))
}

// YUV420 encoders need even dimensions of at least 2.
pub fn sanitize_dimension(dim: u32) -> u32 {
    let dim = dim.max(2);
    dim - dim % 2
}

#[derive(Clone, Debug)]
pub struct MapCanvas {
    width: u32,
    height: u32,
    title: String,
    basemap: Basemap,
    background: Option<Background>,
    overlay: Option<FieldImage>,
    point_radius: u32,
    line_width: u32,
}

impl MapCanvas {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: width.max(2),
            height: height.max(2),
            title: String::new(),
            basemap: Basemap::empty(),
            background: None,
            overlay: None,
            point_radius: 3,
            line_width: 1,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_ground(
        mut self,
        background: Option<Background>,
        basemap: impl FnOnce() -> Basemap,
    ) -> Self {
        match background {
            Some(background) => self.background = Some(background),
            None => self.basemap = basemap(),
        }
        self
    }

    pub fn with_point_radius(mut self, radius: u32) -> Self {
        self.point_radius = radius.max(1);
        self
    }

    pub fn with_line_width(mut self, width: u32) -> Self {
        self.line_width = width.max(1);
        self
    }

    pub fn set_overlay(&mut self, overlay: Option<FieldImage>) {
        self.overlay = overlay;
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn to_pixel(&self, lon: f64, lat: f64) -> (f64, f64) {
        (
            (lon + 180.0) / 360.0 * self.width as f64,
            (LAT_EXTENT - lat) / (2.0 * LAT_EXTENT) * self.height as f64,
        )
    }

    fn to_coord(&self, x: f64, y: f64) -> (f64, f64) {
        (
            x / self.width as f64 * 360.0 - 180.0,
            LAT_EXTENT - y / self.height as f64 * 2.0 * LAT_EXTENT,
        )
    }

    pub fn render(&self, frame: &Frame) -> Result<Vec<u8>> {
        let (w, h) = (self.width as usize, self.height as usize);
        let mut buffer = vec![0u8; w * h * 3];

        {
            let backend = BitMapBackend::with_buffer(&mut buffer, (self.width, self.height));
            let area = backend.into_drawing_area();
            area.fill(&WHITE).map_err(plot_err)?;
            let mut chart = ChartBuilder::on(&area)
                .build_cartesian_2d(-180f64..180f64, -LAT_EXTENT..LAT_EXTENT)
                .map_err(plot_err)?;
            let rings: &[Vec<(f64, f64)>] = match self.background {
                Some(_) => &[],
                None => &self.basemap.rings,
            };
            let fill = rgb(LAND_FILL);
            let edge = rgb(LAND_EDGE);
            chart
                .draw_series(
                    rings
                        .iter()
                        .map(|ring| Polygon::new(ring.clone(), fill.filled())),
                )
                .map_err(plot_err)?;
            chart
                .draw_series(
                    rings
                        .iter()
                        .map(|ring| PathElement::new(ring.clone(), ShapeStyle::from(&edge))),
                )
                .map_err(plot_err)?;
            area.present().map_err(plot_err)?;
        }

        if let Some(background) = &self.background {
            self.blit_background(&mut buffer, background);
        }
        if let Some(field) = &self.overlay {
            self.blend_field(&mut buffer, field);
        }

        {
            let backend = BitMapBackend::with_buffer(&mut buffer, (self.width, self.height));
            let area = backend.into_drawing_area();
            let mut chart = ChartBuilder::on(&area)
                .build_cartesian_2d(-180f64..180f64, -LAT_EXTENT..LAT_EXTENT)
                .map_err(plot_err)?;

            chart
                .draw_series(frame.lines.iter().map(|line| {
                    PathElement::new(
                        vec![line.segment.start(), line.segment.end()],
                        ShapeStyle::from(&rgb_f(line.color)).stroke_width(self.line_width),
                    )
                }))
                .map_err(plot_err)?;

            let green = rgb_f(LINK_GREEN);
            chart
                .draw_series(frame.arrows.iter().map(|arrow| {
                    PathElement::new(
                        vec![arrow.shaft.start(), arrow.shaft.end()],
                        ShapeStyle::from(&green).stroke_width(self.line_width + 1),
                    )
                }))
                .map_err(plot_err)?;
            chart
                .draw_series(frame.arrows.iter().map(|arrow| {
                    Polygon::new(arrow.head_triangle(ARROW_HEAD_DEGREES).to_vec(), green.filled())
                }))
                .map_err(plot_err)?;

            let r = self.point_radius;
            chart
                .draw_series(
                    frame
                        .points
                        .iter()
                        .map(|p| Circle::new((p.lon, p.lat), r + 1, BLACK.filled())),
                )
                .map_err(plot_err)?;
            chart
                .draw_series(
                    frame
                        .points
                        .iter()
                        .map(|p| Circle::new((p.lon, p.lat), r, rgb_f(p.color).filled())),
                )
                .map_err(plot_err)?;

            // title and clock bars
            for (lo, hi) in [(90.0, LAT_EXTENT), (-LAT_EXTENT, -90.0)] {
                chart
                    .draw_series(std::iter::once(Rectangle::new(
                        [(-180.0, lo), (180.0, hi)],
                        BLACK.stroke_width(1),
                    )))
                    .map_err(plot_err)?;
            }
            area.present().map_err(plot_err)?;
        }

        let scale = glyph_scale(self.height);
        let bar_px = (BAR_DEGREES / (2.0 * LAT_EXTENT) * h as f64) as usize;
        let text_y = bar_px.saturating_sub(5 * scale) / 2;
        let mut canvas = Canvas::new(&mut buffer, w, h);
        canvas.draw_text(2 * scale, text_y, &self.title, scale, [0, 0, 0]);
        if !frame.clock.is_empty() {
            let width = text_width(&frame.clock, scale);
            let x = w.saturating_sub(width + 2 * scale);
            canvas.draw_text(x, text_y, &frame.clock, scale, [0, 0, 0]);
        }
        Ok(buffer)
    }

    fn blit_background(&self, buffer: &mut [u8], background: &Background) {
        let (w, h) = (self.width as usize, self.height as usize);
        for y in 0..h {
            for x in 0..w {
                let (lon, lat) = self.to_coord(x as f64 + 0.5, y as f64 + 0.5);
                if lat.abs() > 90.0 {
                    continue;
                }
                let idx = (y * w + x) * 3;
                buffer[idx..idx + 3].copy_from_slice(&background.sample(lon, lat));
            }
        }
    }

    fn blend_field(&self, buffer: &mut [u8], field: &FieldImage) {
        let (w, h) = (self.width as usize, self.height as usize);
        for y in 0..h {
            for x in 0..w {
                let (lon, lat) = self.to_coord(x as f64 + 0.5, y as f64 + 0.5);
                let Some([r, g, b, a]) = field.sample(lon, lat) else {
                    continue;
                };
                if a <= 0.0 {
                    continue;
                }
                let idx = (y * w + x) * 3;
                for (channel, value) in buffer[idx..idx + 3].iter_mut().zip([r, g, b]) {
                    let under = *channel as f64 / 255.0;
                    *channel = to_u8(value * a + under * (1.0 - a));
                }
            }
        }
    }
}

pub struct RasterSurface<W> {
    canvas: MapCanvas,
    writer: W,
}

impl<W: FrameWriter> RasterSurface<W> {
    pub fn new(canvas: MapCanvas, writer: W) -> Self {
        Self { canvas, writer }
    }

    pub fn into_writer(self) -> W {
        self.writer
    }
}

impl<W: FrameWriter> DrawingSurface for RasterSurface<W> {
    fn draw_frame(&mut self, frame: &Frame) -> Result<()> {
        let pixels = self.canvas.render(frame)?;
        let (w, h) = self.canvas.size();
        self.writer.write_frame(&pixels, w, h)
    }

    fn finish(&mut self) -> Result<()> {
        self.writer.finish()
    }
}

pub trait FrameWriter {
    fn write_frame(&mut self, rgb: &[u8], width: u32, height: u32) -> Result<()>;

    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

impl<W: FrameWriter + ?Sized> FrameWriter for Box<W> {
    fn write_frame(&mut self, rgb: &[u8], width: u32, height: u32) -> Result<()> {
        (**self).write_frame(rgb, width, height)
    }

    fn finish(&mut self) -> Result<()> {
        (**self).finish()
    }
}

fn save_png(path: &Path, rgb: &[u8], width: u32, height: u32) -> Result<()> {
    let image = image::RgbImage::from_raw(width, height, rgb.to_vec()).ok_or_else(|| {
        VizError::Render(format!("{width}x{height} frame has {} bytes", rgb.len()))
    })?;
    image
        .save(path)
        .map_err(|e| VizError::Render(format!("{}: {e}", path.display())))
}

#[derive(Clone, Debug)]
pub struct PngFile {
    path: PathBuf,
}

impl PngFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl FrameWriter for PngFile {
    fn write_frame(&mut self, rgb: &[u8], width: u32, height: u32) -> Result<()> {
        save_png(&self.path, rgb, width, height)?;
        info!("Wrote \"{}\"", self.path.display());
        Ok(())
    }
}

#[derive(Clone, Debug)]
pub struct PngSequence {
    dir: PathBuf,
    prefix: String,
    count: usize,
}

impl PngSequence {
    pub fn new(dir: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            prefix: prefix.into(),
            count: 0,
        }
    }

    pub fn frame_path(&self, index: usize) -> PathBuf {
        self.dir.join(format!("{}{index:05}.png", self.prefix))
    }

    pub fn count(&self) -> usize {
        self.count
    }
}

impl FrameWriter for PngSequence {
    fn write_frame(&mut self, rgb: &[u8], width: u32, height: u32) -> Result<()> {
        save_png(&self.frame_path(self.count), rgb, width, height)?;
        self.count += 1;
        Ok(())
    }
}

/// Spools raw RGB frames to a temporary file and muxes them with ffmpeg
/// (H.264, yuv420p) when finished.
pub struct VideoWriter {
    path: PathBuf,
    fps: u32,
    size: Option<(u32, u32)>,
    raw: Option<BufWriter<NamedTempFile>>,
    frames: usize,
}

impl VideoWriter {
    pub fn new(path: impl Into<PathBuf>, fps: u32) -> Result<Self> {
        let raw = NamedTempFile::new().map_err(|e| VizError::io(std::env::temp_dir(), e))?;
        Ok(Self {
            path: path.into(),
            fps: fps.max(1),
            size: None,
            raw: Some(BufWriter::new(raw)),
            frames: 0,
        })
    }

    pub fn frames(&self) -> usize {
        self.frames
    }

    fn encode(&self, input: &Path, (width, height): (u32, u32)) -> Result<()> {
        let ffmpeg = std::env::var("FFMPEG_BIN").unwrap_or_else(|_| "ffmpeg".to_string());
        info!(
            "Encoding {} frames to \"{}\" at {} fps",
            self.frames,
            self.path.display(),
            self.fps
        );
        let output = Command::new(&ffmpeg)
            .arg("-hide_banner")
            .arg("-loglevel")
            .arg("error")
            .arg("-y")
            .arg("-f")
            .arg("rawvideo")
            .arg("-pix_fmt")
            .arg("rgb24")
            .arg("-s")
            .arg(format!("{width}x{height}"))
            .arg("-r")
            .arg(self.fps.to_string())
            .arg("-i")
            .arg(input)
            .arg("-frames:v")
            .arg(self.frames.to_string())
            .arg("-c:v")
            .arg("libx264")
            .arg("-pix_fmt")
            .arg("yuv420p")
            .arg(&self.path)
            .output()
            .map_err(|e| VizError::Render(format!("failed to run {ffmpeg}: {e}")))?;
        if !output.status.success() {
            return Err(VizError::Render(format!(
                "ffmpeg failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(())
    }
}

impl FrameWriter for VideoWriter {
    fn write_frame(&mut self, rgb: &[u8], width: u32, height: u32) -> Result<()> {
        if width % 2 != 0 || height % 2 != 0 {
            return Err(VizError::Render(format!(
                "video frames must have even dimensions, got {width}x{height}"
            )));
        }
        match self.size {
            None => self.size = Some((width, height)),
            Some(size) if size != (width, height) => {
                return Err(VizError::Render(format!(
                    "frame size changed from {}x{} to {width}x{height}",
                    size.0, size.1
                )))
            }
            Some(_) => {}
        }
        let raw = self
            .raw
            .as_mut()
            .ok_or_else(|| VizError::Render("video already finished".into()))?;
        raw.write_all(rgb)
            .map_err(|e| VizError::io(raw.get_ref().path(), e))?;
        self.frames += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        let Some(raw) = self.raw.take() else {
            return Ok(());
        };
        let file = raw
            .into_inner()
            .map_err(|e| VizError::io(self.path.clone(), e.into_error()))?;
        let (Some(size), true) = (self.size, self.frames > 0) else {
            warn!("No frames collected; skipping video encoding");
            return Ok(());
        };
        let spool = file.into_temp_path();
        self.encode(&spool, size)?;
        if let Err(e) = spool.close() {
            debug!("leaving spooled frames behind: {e}");
        }
        info!("Wrote \"{}\"", self.path.display());
        Ok(())
    }
}

/// Renders one contact matrix as a TX by RX image, gray for contact graphs
/// and jet for weighted ones. `invert` swaps light and dark.
pub fn render_contact_graph(
    matrix: &DMatrix<f64>,
    weighted: bool,
    invert: bool,
    size: u32,
) -> Result<Vec<u8>> {
    let size = sanitize_dimension(size.max(16)) as usize;
    let n = matrix.nrows().min(matrix.ncols());
    if n == 0 {
        return Err(VizError::InvalidArgument("contact matrix is empty".into()));
    }
    let cells: Vec<f64> = matrix
        .iter()
        .map(|v| {
            let v = if v.is_finite() { v.trunc() } else { 0.0 };
            if invert {
                -v - 1.0
            } else {
                v
            }
        })
        .collect();
    let (lo, hi) = finite_range(&cells).unwrap_or((0.0, 0.0));
    let shades = normalize(&cells, lo, hi);
    let cmap = if weighted { Colormap::Jet } else { Colormap::Gray };

    let mut buffer = vec![255u8; size * size * 3];
    let margin = size * 8 / 100;
    let inner = size - 2 * margin;
    let mut canvas = Canvas::new(&mut buffer, size, size);
    for y in 0..inner {
        for x in 0..inner {
            let row = y * n / inner;
            let col = x * n / inner;
            // nalgebra iterates column-major
            let [r, g, b] = cmap.sample(shades[col * matrix.nrows() + row]);
            canvas.put_pixel(margin + x, margin + y, [to_u8(r), to_u8(g), to_u8(b)]);
        }
    }
    let scale = glyph_scale(size as u32);
    let label_y = size - margin + margin.saturating_sub(5 * scale) / 2;
    canvas.draw_text((size - text_width("TX", scale)) / 2, label_y, "TX", scale, [0, 0, 0]);
    canvas.draw_text(
        margin.saturating_sub(text_width("RX", scale)) / 2,
        size / 2,
        "RX",
        scale,
        [0, 0, 0],
    );
    Ok(buffer)
}

pub fn write_png(path: &Path, rgb: &[u8], width: u32, height: u32) -> Result<()> {
    save_png(path, rgb, width, height)
}

struct Canvas<'a> {
    buffer: &'a mut [u8],
    width: usize,
    height: usize,
}

impl<'a> Canvas<'a> {
    fn new(buffer: &'a mut [u8], width: usize, height: usize) -> Self {
        Self {
            buffer,
            width,
            height,
        }
    }

    fn put_pixel(&mut self, x: usize, y: usize, color: [u8; 3]) {
        if x >= self.width || y >= self.height {
            return;
        }
        let idx = (y * self.width + x) * 3;
        self.buffer[idx..idx + 3].copy_from_slice(&color);
    }

    fn draw_char(&mut self, x: usize, y: usize, ch: char, scale: usize, color: [u8; 3]) {
        let glyph = glyph_bits(ch.to_ascii_uppercase());
        for (row, pattern) in glyph.iter().enumerate() {
            for col in 0..3 {
                if (pattern >> (2 - col)) & 1 == 1 {
                    for dy in 0..scale {
                        for dx in 0..scale {
                            self.put_pixel(x + col * scale + dx, y + row * scale + dy, color);
                        }
                    }
                }
            }
        }
    }

    fn draw_text(&mut self, x: usize, y: usize, text: &str, scale: usize, color: [u8; 3]) {
        let mut cursor = x;
        for ch in text.chars() {
            self.draw_char(cursor, y, ch, scale, color);
            cursor += 4 * scale;
        }
    }
}

fn glyph_scale(height: u32) -> usize {
    (height as usize / 200).max(1)
}

fn text_width(text: &str, scale: usize) -> usize {
    (text.chars().count() * 4).saturating_sub(1) * scale
}

const fn glyph_bits(ch: char) -> [u8; 5] {
    match ch {
        '0' => [0b111, 0b101, 0b101, 0b101, 0b111],
        '1' => [0b010, 0b110, 0b010, 0b010, 0b111],
        '2' => [0b111, 0b001, 0b111, 0b100, 0b111],
        '3' => [0b111, 0b001, 0b111, 0b001, 0b111],
        '4' => [0b101, 0b101, 0b111, 0b001, 0b001],
        '5' => [0b111, 0b100, 0b111, 0b001, 0b111],
        '6' => [0b111, 0b100, 0b111, 0b101, 0b111],
        '7' => [0b111, 0b001, 0b010, 0b010, 0b010],
        '8' => [0b111, 0b101, 0b111, 0b101, 0b111],
        '9' => [0b111, 0b101, 0b111, 0b001, 0b111],
        'A' => [0b010, 0b101, 0b111, 0b101, 0b101],
        'B' => [0b110, 0b101, 0b110, 0b101, 0b110],
        'C' => [0b111, 0b100, 0b100, 0b100, 0b111],
        'D' => [0b110, 0b101, 0b101, 0b101, 0b110],
        'E' => [0b111, 0b100, 0b110, 0b100, 0b111],
        'F' => [0b111, 0b100, 0b110, 0b100, 0b100],
        'G' => [0b111, 0b100, 0b101, 0b101, 0b111],
        'H' => [0b101, 0b101, 0b111, 0b101, 0b101],
        'I' => [0b111, 0b010, 0b010, 0b010, 0b111],
        'J' => [0b001, 0b001, 0b001, 0b101, 0b111],
        'K' => [0b101, 0b110, 0b100, 0b110, 0b101],
        'L' => [0b100, 0b100, 0b100, 0b100, 0b111],
        'M' => [0b101, 0b111, 0b111, 0b101, 0b101],
        'N' => [0b110, 0b101, 0b101, 0b101, 0b101],
        'O' => [0b111, 0b101, 0b101, 0b101, 0b111],
        'P' => [0b111, 0b101, 0b111, 0b100, 0b100],
        'Q' => [0b111, 0b101, 0b101, 0b111, 0b011],
        'R' => [0b110, 0b101, 0b110, 0b101, 0b101],
        'S' => [0b111, 0b100, 0b111, 0b001, 0b111],
        'T' => [0b111, 0b010, 0b010, 0b010, 0b010],
        'U' => [0b101, 0b101, 0b101, 0b101, 0b111],
        'V' => [0b101, 0b101, 0b101, 0b101, 0b010],
        'W' => [0b101, 0b101, 0b111, 0b111, 0b101],
        'X' => [0b101, 0b101, 0b010, 0b101, 0b101],
        'Y' => [0b101, 0b101, 0b010, 0b010, 0b010],
        'Z' => [0b111, 0b001, 0b010, 0b100, 0b111],
        '-' => [0b000, 0b000, 0b111, 0b000, 0b000],
        ':' => [0b000, 0b010, 0b000, 0b010, 0b000],
        '.' => [0b000, 0b000, 0b000, 0b000, 0b010],
        '(' => [0b010, 0b100, 0b100, 0b100, 0b010],
        ')' => [0b010, 0b001, 0b001, 0b001, 0b010],
        '/' => [0b001, 0b001, 0b010, 0b100, 0b100],
        '_' => [0b000, 0b000, 0b000, 0b000, 0b111],
        ' ' => [0b000; 5],
        _ => [0b111, 0b101, 0b010, 0b000, 0b010],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::{MapLine, MapPoint};
    use crate::segment::{arrows, GeoSegment};

    impl FrameWriter for Vec<Vec<u8>> {
        fn write_frame(&mut self, rgb: &[u8], _width: u32, _height: u32) -> Result<()> {
            self.push(rgb.to_vec());
            Ok(())
        }
    }

    fn frame() -> Frame {
        Frame {
            index: 0,
            total: 1,
            time: "2019-04-23 12:41:19:000000".into(),
            clock: "2019-04-23 12:41:19 UTC".into(),
            points: vec![MapPoint {
                lon: 0.0,
                lat: 0.0,
                color: [1.0, 0.0, 0.0],
            }],
            lines: vec![MapLine {
                segment: GeoSegment::new((-90.0, 90.0), (45.0, 45.0)),
                color: [0.0, 0.0, 1.0],
            }],
            arrows: Vec::new(),
        }
    }

    fn pixel(buffer: &[u8], width: usize, (x, y): (f64, f64)) -> [u8; 3] {
        let idx = (y as usize * width + x as usize) * 3;
        [buffer[idx], buffer[idx + 1], buffer[idx + 2]]
    }

    #[test]
    fn even_dimensions() {
        assert_eq!(sanitize_dimension(0), 2);
        assert_eq!(sanitize_dimension(401), 400);
        assert_eq!(sanitize_dimension(400), 400);
    }

    #[test]
    fn map_draws_points_and_lines() {
        let canvas = MapCanvas::new(360, 204).with_title("Cube Satellite Positions");
        let buffer = canvas.render(&frame()).unwrap();
        assert_eq!(buffer.len(), 360 * 204 * 3);
        assert_eq!(pixel(&buffer, 360, canvas.to_pixel(0.0, 0.0)), [255, 0, 0]);
        let (x, y) = canvas.to_pixel(0.0, 45.0);
        assert!((-2..=2).any(|dy| pixel(&buffer, 360, (x, y + dy as f64)) == [0, 0, 255]));
        assert_eq!(pixel(&buffer, 360, canvas.to_pixel(0.0, -45.0)), [255, 255, 255]);
    }

    #[test]
    fn overlay_is_blended_under_nodes() {
        let mut canvas = MapCanvas::new(360, 204);
        canvas.set_overlay(Some(FieldImage {
            width: 1,
            height: 1,
            pixels: vec![[0.0, 0.0, 0.0, 1.0]],
        }));
        let buffer = canvas.render(&frame()).unwrap();
        assert_eq!(pixel(&buffer, 360, canvas.to_pixel(90.0, -45.0)), [0, 0, 0]);
        assert_eq!(pixel(&buffer, 360, canvas.to_pixel(0.0, 0.0)), [255, 0, 0]);
    }

    #[test]
    fn monthly_background_replaces_land() {
        let empty = Frame {
            clock: String::new(),
            points: Vec::new(),
            lines: Vec::new(),
            ..frame()
        };
        let solid = |color: [u8; 3]| Background {
            width: 1,
            height: 1,
            pixels: vec![color],
        };
        let at = |canvas: &MapCanvas| {
            let buffer = canvas.render(&empty).unwrap();
            pixel(&buffer, 360, canvas.to_pixel(90.0, -45.0))
        };

        let plain = MapCanvas::new(360, 204).with_ground(None, Basemap::empty);
        assert_eq!(at(&plain), [255, 255, 255]);
        let land = MapCanvas::new(360, 204).with_ground(None, || Basemap {
            rings: vec![vec![(0.0, 0.0), (180.0, 0.0), (180.0, -90.0), (0.0, -90.0)]],
        });
        assert_eq!(at(&land), LAND_FILL);
        let march = MapCanvas::new(360, 204)
            .with_ground(Some(solid([10, 20, 30])), || panic!("basemap fetched"));
        assert_eq!(at(&march), [10, 20, 30]);
        let july = MapCanvas::new(360, 204)
            .with_ground(Some(solid([200, 180, 40])), || panic!("basemap fetched"));
        assert_eq!(at(&july), [200, 180, 40]);

        // bars stay white
        let buffer = march.render(&empty).unwrap();
        assert_eq!(pixel(&buffer, 360, march.to_pixel(90.0, 96.0)), [255, 255, 255]);
    }

    #[test]
    fn channel_arrows_are_green() {
        let channel = Frame {
            points: Vec::new(),
            lines: Vec::new(),
            arrows: arrows(0.0, 100.0, -30.0, -30.0),
            ..frame()
        };
        let canvas = MapCanvas::new(360, 204);
        let buffer = canvas.render(&channel).unwrap();
        let is_green = |lon: f64| {
            let (x, y) = canvas.to_pixel(lon, -30.0);
            (-2..=2).any(|dy| {
                let [r, g, b] = pixel(&buffer, 360, (x, y + dy as f64));
                r == 0 && b == 0 && g > 100
            })
        };
        assert!(is_green(37.0));
        assert!(is_green(70.0));
        assert!(!is_green(-60.0));
    }

    #[test]
    fn contact_graph_uses_gray_scale() {
        let m = DMatrix::from_row_slice(2, 2, &[0.0, 1.0, 0.0, 0.0]);
        let buffer = render_contact_graph(&m, false, false, 100).unwrap();
        // inner square spans 8..92, top-right cell is the only contact
        assert_eq!(pixel(&buffer, 100, (80.0, 20.0)), [255, 255, 255]);
        assert_eq!(pixel(&buffer, 100, (20.0, 20.0)), [0, 0, 0]);
        let inverted = render_contact_graph(&m, false, true, 100).unwrap();
        assert_eq!(pixel(&inverted, 100, (80.0, 20.0)), [0, 0, 0]);
    }

    #[test]
    fn png_sequence_numbers_frames() {
        let dir = tempfile::tempdir().unwrap();
        let mut seq = PngSequence::new(dir.path(), "frame_");
        seq.write_frame(&[0u8; 2 * 2 * 3], 2, 2).unwrap();
        seq.write_frame(&[255u8; 2 * 2 * 3], 2, 2).unwrap();
        assert_eq!(seq.count(), 2);
        assert!(dir.path().join("frame_00001.png").is_file());
        assert!(seq.write_frame(&[0u8; 5], 2, 2).is_err());
    }

    #[test]
    fn video_rejects_odd_frames() {
        let dir = tempfile::tempdir().unwrap();
        let mut video = VideoWriter::new(dir.path().join("a.mp4"), 24).unwrap();
        assert!(video.write_frame(&[0u8; 3 * 3 * 3], 3, 3).is_err());
        assert_eq!(video.frames(), 0);
        video.finish().unwrap();
        assert!(!dir.path().join("a.mp4").exists());
    }

    #[test]
    fn surface_forwards_rendered_frames() {
        let mut surface = RasterSurface::new(MapCanvas::new(64, 32), Vec::<Vec<u8>>::new());
        surface.draw_frame(&frame()).unwrap();
        surface.finish().unwrap();
        let frames = surface.into_writer();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].len(), 64 * 32 * 3);
    }
}
