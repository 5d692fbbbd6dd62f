//! Interactive window for stepping through rendered frames.
//!
//! Map frames are drawn as vectors on an egui_plot map; raster frames
//! (contact graphs, field overlays) are shown as textures.

use std::time::Duration;

use eframe::egui;
use egui_plot::{Line, Plot, PlotPoints, Points, Polygon};

use crate::color::{to_u8, Rgb, LINK_GREEN};
use crate::driver::{DrawingSurface, Frame};
use crate::error::{Result, VizError};
use crate::geo::{Basemap, LAND_EDGE, LAND_FILL};
use crate::render::FrameWriter;

pub enum ViewerFrame {
    Map(Frame),
    Raster {
        width: usize,
        height: usize,
        rgb: Vec<u8>,
    },
}

pub struct MapViewer {
    title: String,
    basemap: Basemap,
    fps: u32,
    frames: Vec<ViewerFrame>,
}

impl MapViewer {
    pub fn new(title: impl Into<String>, basemap: Basemap, fps: u32) -> Self {
        Self {
            title: title.into(),
            basemap,
            fps: fps.max(1),
            frames: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn show(self) -> Result<()> {
        if self.frames.is_empty() {
            return Err(VizError::Render("nothing to show".into()));
        }
        let options = eframe::NativeOptions {
            viewport: egui::ViewportBuilder::default().with_inner_size([1400.0, 760.0]),
            ..Default::default()
        };
        let title = if self.title.is_empty() {
            "netmap-viz".to_string()
        } else {
            self.title.clone()
        };
        let app = ViewerApp::new(self);
        eframe::run_native(&title, options, Box::new(|_cc| Ok(Box::new(app))))
            .map_err(|e| VizError::Render(e.to_string()))
    }
}

impl DrawingSurface for MapViewer {
    fn draw_frame(&mut self, frame: &Frame) -> Result<()> {
        self.frames.push(ViewerFrame::Map(frame.clone()));
        Ok(())
    }
}

impl FrameWriter for MapViewer {
    fn write_frame(&mut self, rgb: &[u8], width: u32, height: u32) -> Result<()> {
        self.frames.push(ViewerFrame::Raster {
            width: width as usize,
            height: height as usize,
            rgb: rgb.to_vec(),
        });
        Ok(())
    }
}

fn color32(color: Rgb) -> egui::Color32 {
    egui::Color32::from_rgb(to_u8(color[0]), to_u8(color[1]), to_u8(color[2]))
}

fn rgb32(color: [u8; 3]) -> egui::Color32 {
    egui::Color32::from_rgb(color[0], color[1], color[2])
}

struct ViewerApp {
    viewer: MapViewer,
    current: usize,
    playing: bool,
    elapsed: f64,
    texture: Option<(usize, egui::TextureHandle)>,
}

impl ViewerApp {
    fn new(viewer: MapViewer) -> Self {
        Self {
            viewer,
            current: 0,
            playing: true,
            elapsed: 0.0,
            texture: None,
        }
    }

    fn advance(&mut self, ctx: &egui::Context) {
        if !self.playing {
            return;
        }
        let step = 1.0 / self.viewer.fps as f64;
        self.elapsed += ctx.input(|i| i.stable_dt) as f64;
        while self.elapsed >= step {
            self.elapsed -= step;
            self.current = (self.current + 1) % self.viewer.frames.len();
        }
        ctx.request_repaint_after(Duration::from_secs_f64(step));
    }

    fn draw_map(&self, ui: &mut egui::Ui, frame: &Frame) {
        ui.label(&frame.clock);
        let plot = Plot::new("map")
            .data_aspect(1.0)
            .include_x(-180.0)
            .include_x(180.0)
            .include_y(-90.0)
            .include_y(90.0)
            .show_axes([true, true]);
        let fill = rgb32(LAND_FILL);
        let edge = rgb32(LAND_EDGE);
        plot.show(ui, |plot_ui| {
            for ring in &self.viewer.basemap.rings {
                let pts: Vec<[f64; 2]> = ring.iter().map(|&(lon, lat)| [lon, lat]).collect();
                plot_ui.polygon(
                    Polygon::new("", PlotPoints::new(pts))
                        .fill_color(fill)
                        .stroke(egui::Stroke::new(0.5, edge)),
                );
            }
            for line in &frame.lines {
                let (a, b) = (line.segment.start(), line.segment.end());
                plot_ui.line(
                    Line::new("", PlotPoints::new(vec![[a.0, a.1], [b.0, b.1]]))
                        .color(color32(line.color))
                        .width(1.0),
                );
            }
            let green = color32(LINK_GREEN);
            for arrow in &frame.arrows {
                let (a, b) = (arrow.shaft.start(), arrow.shaft.end());
                plot_ui.line(
                    Line::new("", PlotPoints::new(vec![[a.0, a.1], [b.0, b.1]]))
                        .color(green)
                        .width(2.0),
                );
                let head: Vec<[f64; 2]> = arrow
                    .head_triangle(6.0)
                    .iter()
                    .map(|&(lon, lat)| [lon, lat])
                    .collect();
                plot_ui.polygon(
                    Polygon::new("", PlotPoints::new(head))
                        .fill_color(green)
                        .stroke(egui::Stroke::new(1.0, green)),
                );
            }
            for point in &frame.points {
                plot_ui.points(
                    Points::new("", PlotPoints::new(vec![[point.lon, point.lat]]))
                        .color(color32(point.color))
                        .radius(4.0)
                        .filled(true),
                );
            }
        });
    }

    fn draw_raster(&mut self, ui: &mut egui::Ui, width: usize, height: usize, rgb: &[u8]) {
        let stale = self
            .texture
            .as_ref()
            .map_or(true, |(index, _)| *index != self.current);
        if stale {
            let pixels = rgb
                .chunks_exact(3)
                .map(|p| egui::Color32::from_rgb(p[0], p[1], p[2]))
                .collect();
            let image = egui::ColorImage {
                size: [width, height],
                pixels,
                source_size: egui::Vec2::ZERO,
            };
            let handle = ui.ctx().load_texture(
                format!("frame_{}", self.current),
                image,
                egui::TextureOptions::LINEAR,
            );
            self.texture = Some((self.current, handle));
        }
        if let Some((_, texture)) = &self.texture {
            ui.image(texture);
        }
    }
}

impl eframe::App for ViewerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.advance(ctx);
        let total = self.viewer.frames.len();

        egui::TopBottomPanel::top("controls").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.heading(&self.viewer.title);
                if ui.button(if self.playing { "Pause" } else { "Play" }).clicked() {
                    self.playing = !self.playing;
                }
                let mut frame = self.current;
                if ui
                    .add(egui::Slider::new(&mut frame, 0..=total.saturating_sub(1)).text("frame"))
                    .changed()
                {
                    self.current = frame;
                    self.playing = false;
                }
            });
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            // Taken out to let the raster path borrow self mutably.
            let frames = std::mem::take(&mut self.viewer.frames);
            match frames.get(self.current) {
                Some(ViewerFrame::Map(frame)) => self.draw_map(ui, frame),
                Some(ViewerFrame::Raster { width, height, rgb }) => {
                    self.draw_raster(ui, *width, *height, rgb)
                }
                None => {}
            }
            self.viewer.frames = frames;
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collects_both_frame_kinds() {
        let mut viewer = MapViewer::new("t", Basemap::empty(), 10);
        let frame = Frame {
            index: 0,
            total: 1,
            time: String::new(),
            clock: String::new(),
            points: Vec::new(),
            lines: Vec::new(),
            arrows: Vec::new(),
        };
        viewer.draw_frame(&frame).unwrap();
        viewer.write_frame(&[0u8; 12], 2, 2).unwrap();
        assert_eq!(viewer.len(), 2);
        assert!(matches!(viewer.frames[1], ViewerFrame::Raster { width: 2, .. }));
    }

    #[test]
    fn empty_viewer_refuses_to_open() {
        assert!(MapViewer::new("t", Basemap::empty(), 10).show().is_err());
    }
}
