use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use netmap_viz::adjacency::AdjacencySeries;
use netmap_viz::background::Background;
use netmap_viz::cache::CachedReader;
use netmap_viz::checks::{check_dir, check_file, check_month, check_not_file};
use netmap_viz::color::RED;
use netmap_viz::config::{OutputFormat, RenderConfig};
use netmap_viz::driver::{
    channel_frame, ConsoleProgress, DrawingSurface, Frame, FrameDriver, MapPoint, PointStyle,
    ProgressSink,
};
use netmap_viz::field::{paths_with_extension, read_field, FieldVariable};
use netmap_viz::geo::Basemap;
use netmap_viz::render::{
    render_contact_graph, sanitize_dimension, write_png, FrameWriter, MapCanvas, PngFile,
    PngSequence, RasterSurface, VideoWriter,
};
use netmap_viz::schema::SourceKind;
use netmap_viz::time::clock_label;
use netmap_viz::viewer::MapViewer;

#[derive(Parser, Debug)]
#[command(
    author,
    version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("GIT_HASH"), ")"),
    about = "Plot and animate constellation simulator logs on a world map"
)]
struct Cli {
    /// TOML file with render settings.
    #[arg(short = 'c', long = "config", value_name = "PATH", global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(ClapArgs, Debug, Default)]
struct RenderArgs {
    /// Show in a window instead of saving.
    #[arg(short = 'f', long)]
    figure: bool,
    #[arg(long)]
    width: Option<u32>,
    #[arg(long)]
    height: Option<u32>,
    /// Node coloring: groups, energy, charging or mode.
    #[arg(long)]
    style: Option<PointStyle>,
    /// Seed for group colors.
    #[arg(long)]
    seed: Option<u64>,
    /// Write numbered PNG frames instead of a video.
    #[arg(long)]
    png: bool,
    /// Skip the Natural Earth land outlines.
    #[arg(long)]
    no_basemap: bool,
}

impl RenderArgs {
    fn apply(&self, config: &mut RenderConfig) {
        if let Some(width) = self.width {
            config.width = width;
        }
        if let Some(height) = self.height {
            config.height = height;
        }
        if let Some(style) = self.style {
            config.style = style;
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
        if self.png {
            config.format = OutputFormat::Png;
        }
        if self.no_basemap {
            config.basemap = false;
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Animates node positions and connections.
    AnimateMap {
        #[arg(short = 'i', long, default_value = "output/data.json")]
        in_file: PathBuf,
        #[arg(short = 'o', long, default_value = "analysis/")]
        out_dir: PathBuf,
        /// Title for the plot.
        #[arg(short = 't', long)]
        title: Option<String>,
        /// Weighted adjacency log.
        #[arg(short = 'w', long)]
        wgt_path: Option<PathBuf>,
        /// Unweighted adjacency log.
        #[arg(short = 'u', long)]
        uwt_path: Option<PathBuf>,
        #[command(flatten)]
        render: RenderArgs,
    },
    /// Plots node positions and connections at one frame.
    PlotMap {
        #[arg(short = 'i', long, default_value = "output/data.json")]
        in_file: PathBuf,
        #[arg(short = 'o', long, default_value = "analysis/")]
        out_dir: PathBuf,
        /// The frame index.
        #[arg(short = 'n', long, default_value_t = 0)]
        index: usize,
        #[arg(short = 'w', long)]
        wgt_path: Option<PathBuf>,
        #[arg(short = 'u', long)]
        uwt_path: Option<PathBuf>,
        #[command(flatten)]
        render: RenderArgs,
    },
    /// Animates a contact graph image.
    AnimateNetwork {
        #[arg(short = 'i', long, default_value = "output/network.json")]
        in_file: PathBuf,
        #[arg(short = 'o', long, default_value = "analysis/network.mp4")]
        out_file: PathBuf,
        /// Whether the data is weighted.
        #[arg(short = 'w', long)]
        weighted: bool,
        #[command(flatten)]
        render: RenderArgs,
    },
    /// Plots a contact graph image at one frame.
    PlotNetwork {
        #[arg(short = 'i', long, default_value = "output/network.json")]
        in_file: PathBuf,
        #[arg(short = 'o', long, default_value = "analysis/")]
        out_dir: PathBuf,
        #[arg(short = 'n', long, default_value_t = 0)]
        index: usize,
        #[arg(short = 'w', long)]
        weighted: bool,
        #[command(flatten)]
        render: RenderArgs,
    },
    /// Animates a geophysical data set, one file per frame.
    AnimateData {
        #[arg(short = 'i', long, default_value = "input/fields/")]
        in_dir: PathBuf,
        #[arg(short = 'o', long, default_value = "analysis/")]
        out_dir: PathBuf,
        /// The month (1-12).
        #[arg(short = 'm', long, default_value_t = 1)]
        month: u32,
        /// The field variable name.
        #[arg(short = 'v', long, default_value = "TAUTOT")]
        variable: FieldVariable,
        /// Directory of monthly background images.
        #[arg(short = 'b', long)]
        background_dir: Option<PathBuf>,
        #[command(flatten)]
        render: RenderArgs,
    },
    /// Plots a transmitter to receiver channel at one tick.
    PlotChannel {
        #[arg(short = 'i', long, default_value = "output/channel.json")]
        in_file: PathBuf,
        #[arg(short = 'o', long, default_value = "analysis/")]
        out_dir: PathBuf,
        /// The tick index.
        #[arg(short = 'n', long, default_value_t = 0)]
        index: usize,
        #[command(flatten)]
        render: RenderArgs,
    },
    /// Plots the ground track of a measurement log.
    PlotTrack {
        #[arg(short = 'i', long, default_value = "output/measurement.json")]
        in_file: PathBuf,
        #[arg(short = 'o', long, default_value = "analysis/")]
        out_dir: PathBuf,
        #[command(flatten)]
        render: RenderArgs,
    },
}

impl Command {
    fn render_args(&self) -> &RenderArgs {
        match self {
            Command::AnimateMap { render, .. }
            | Command::PlotMap { render, .. }
            | Command::AnimateNetwork { render, .. }
            | Command::PlotNetwork { render, .. }
            | Command::AnimateData { render, .. }
            | Command::PlotChannel { render, .. }
            | Command::PlotTrack { render, .. } => render,
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut config = match &cli.config {
        Some(path) => RenderConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => RenderConfig::default(),
    };
    let render = cli.command.render_args();
    render.apply(&mut config);
    config.validate()?;
    let video = !render.figure && config.format == OutputFormat::Video;

    match &cli.command {
        Command::AnimateMap {
            in_file,
            out_dir,
            title,
            wgt_path,
            uwt_path,
            ..
        } => {
            check_file(in_file)?;
            check_dir(out_dir)?;
            check_optional(wgt_path)?;
            check_optional(uwt_path)?;
            if let Some(title) = title {
                config.title = title.clone();
            }
            let driver = node_driver(&config, in_file, wgt_path, uwt_path)?;
            let mut progress = ConsoleProgress::default();
            info!("Status: ");
            if render.figure {
                let mut viewer = MapViewer::new(&config.title, basemap(&config), config.map_fps);
                driver.run(&mut viewer, &mut progress)?;
                viewer.show()?;
            } else {
                let canvas = map_canvas(&config, video, None);
                let writer = frame_writer(&config, out_dir, "animation", config.map_fps)?;
                driver.run(&mut RasterSurface::new(canvas, writer), &mut progress)?;
            }
        }
        Command::PlotMap {
            in_file,
            out_dir,
            index,
            wgt_path,
            uwt_path,
            ..
        } => {
            check_file(in_file)?;
            check_dir(out_dir)?;
            check_optional(wgt_path)?;
            check_optional(uwt_path)?;
            let driver = node_driver(&config, in_file, wgt_path, uwt_path)?;
            let frame = driver.compose(*index)?;
            if render.figure {
                let mut viewer = MapViewer::new(&config.title, basemap(&config), 1);
                viewer.draw_frame(&frame)?;
                viewer.show()?;
            } else {
                let canvas = map_canvas(&config, false, None);
                let mut surface = RasterSurface::new(canvas, PngFile::new(out_dir.join("map.png")));
                surface.draw_frame(&frame)?;
            }
        }
        Command::AnimateNetwork {
            in_file,
            out_file,
            weighted,
            ..
        } => {
            check_file(in_file)?;
            if !render.figure {
                check_not_file(out_file)?;
            }
            let graphs = AdjacencySeries::read(Some(in_file))?;
            if !graphs.is_enabled() {
                bail!("\"{}\" has no contact frames", in_file.display());
            }
            let size = sanitize_dimension(config.contact_size);
            if render.figure {
                let mut viewer =
                    MapViewer::new("Contact graph", Basemap::empty(), config.network_fps);
                write_contact_frames(&graphs, *weighted, size, &mut viewer)?;
                viewer.show()?;
            } else {
                let mut writer = VideoWriter::new(out_file, config.network_fps)?;
                write_contact_frames(&graphs, *weighted, size, &mut writer)?;
            }
        }
        Command::PlotNetwork {
            in_file,
            out_dir,
            index,
            weighted,
            ..
        } => {
            check_file(in_file)?;
            check_dir(out_dir)?;
            let graphs = AdjacencySeries::read(Some(in_file))?;
            let graph = graphs.frame(*index).with_context(|| {
                format!("frame {index} is out of range ({} frames)", graphs.len())
            })?;
            let size = sanitize_dimension(config.contact_size);
            let rgb = render_contact_graph(graph, *weighted, true, size)?;
            if render.figure {
                let mut viewer = MapViewer::new("Contact graph", Basemap::empty(), 1);
                viewer.write_frame(&rgb, size, size)?;
                viewer.show()?;
            } else {
                let name = if *weighted { "weighted.png" } else { "unweighted.png" };
                let path = out_dir.join(name);
                write_png(&path, &rgb, size, size)?;
                info!("Wrote \"{}\"", path.display());
            }
        }
        Command::AnimateData {
            in_dir,
            out_dir,
            month,
            variable,
            background_dir,
            ..
        } => {
            check_dir(in_dir)?;
            check_dir(out_dir)?;
            check_month(*month)?;
            let files = paths_with_extension(in_dir, "json")?;
            config.title = format!("{} {month:02}", variable.name());
            let dir = background_dir
                .clone()
                .unwrap_or_else(|| config.background_dir());
            let background = Background::for_month(&dir, *month);
            let mut canvas = map_canvas(&config, video, background);
            info!("Status: ");
            if render.figure {
                let mut viewer = MapViewer::new(&config.title, Basemap::empty(), config.data_fps);
                write_field_frames(&files, *variable, &mut canvas, &mut viewer)?;
                viewer.show()?;
            } else {
                let mut writer = frame_writer(&config, out_dir, "animation", config.data_fps)?;
                write_field_frames(&files, *variable, &mut canvas, &mut writer)?;
            }
        }
        Command::PlotChannel {
            in_file,
            out_dir,
            index,
            ..
        } => {
            check_file(in_file)?;
            check_dir(out_dir)?;
            let log = CachedReader::default()
                .load(in_file, SourceKind::Channel)
                .with_context(|| format!("failed to load {}", in_file.display()))?;
            let frame = channel_frame(&log, *index)?;
            if render.figure {
                let mut viewer = MapViewer::new(&config.title, basemap(&config), 1);
                viewer.draw_frame(&frame)?;
                viewer.show()?;
            } else {
                let canvas = map_canvas(&config, false, None);
                let mut surface =
                    RasterSurface::new(canvas, PngFile::new(out_dir.join("channel.png")));
                surface.draw_frame(&frame)?;
            }
        }
        Command::PlotTrack {
            in_file, out_dir, ..
        } => {
            check_file(in_file)?;
            check_dir(out_dir)?;
            let log = CachedReader::default().load(in_file, SourceKind::Measurement)?;
            let lons = log.column("longitude")?;
            let lats = log.column("latitude")?;
            let points = lons
                .iter()
                .zip(lats)
                .map(|(&lon, &lat)| MapPoint {
                    lon,
                    lat,
                    color: RED,
                })
                .collect();
            let times = log.timestamps();
            let clock = times.first().map(|t| clock_label(t)).unwrap_or_default();
            let frame = Frame {
                index: 0,
                total: 1,
                time: times.first().map(|t| t.to_string()).unwrap_or_default(),
                clock,
                points,
                lines: Vec::new(),
                arrows: Vec::new(),
            };
            if render.figure {
                let mut viewer = MapViewer::new(&config.title, basemap(&config), 1);
                viewer.draw_frame(&frame)?;
                viewer.show()?;
            } else {
                let canvas = map_canvas(&config, false, None).with_point_radius(1);
                let mut surface =
                    RasterSurface::new(canvas, PngFile::new(out_dir.join("track.png")));
                surface.draw_frame(&frame)?;
            }
        }
    }
    Ok(())
}

fn write_contact_frames(
    graphs: &AdjacencySeries,
    weighted: bool,
    size: u32,
    writer: &mut dyn FrameWriter,
) -> Result<()> {
    let mut progress = ConsoleProgress::default();
    for (idx, graph) in graphs.frames().iter().enumerate() {
        progress.progress(idx, graphs.len());
        let rgb = render_contact_graph(graph, weighted, false, size)?;
        writer.write_frame(&rgb, size, size)?;
    }
    progress.finish();
    Ok(writer.finish()?)
}

/// One frame per field file, labelled with the file stem.
fn write_field_frames(
    files: &[PathBuf],
    variable: FieldVariable,
    canvas: &mut MapCanvas,
    writer: &mut dyn FrameWriter,
) -> Result<()> {
    let (w, h) = canvas.size();
    let mut progress = ConsoleProgress::default();
    for (idx, path) in files.iter().enumerate() {
        progress.progress(idx, files.len());
        let field = read_field(path, variable)
            .with_context(|| format!("failed to read {}", path.display()))?;
        canvas.set_overlay(Some(field));
        let frame = Frame {
            index: idx,
            total: files.len(),
            time: String::new(),
            clock: file_label(path),
            points: Vec::new(),
            lines: Vec::new(),
            arrows: Vec::new(),
        };
        writer.write_frame(&canvas.render(&frame)?, w, h)?;
    }
    progress.finish();
    Ok(writer.finish()?)
}

fn check_optional(path: &Option<PathBuf>) -> Result<()> {
    match path {
        Some(p) if !p.as_os_str().is_empty() => Ok(check_file(p)?),
        _ => Ok(()),
    }
}

fn node_driver(
    config: &RenderConfig,
    in_file: &Path,
    wgt_path: &Option<PathBuf>,
    uwt_path: &Option<PathBuf>,
) -> Result<FrameDriver> {
    let log = CachedReader::default()
        .load(in_file, SourceKind::NodeParameters)
        .with_context(|| format!("failed to load {}", in_file.display()))?;
    let unweighted = AdjacencySeries::read(uwt_path.as_deref())?;
    let weighted = AdjacencySeries::read(wgt_path.as_deref())?;
    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    Ok(FrameDriver::new(
        log,
        unweighted,
        weighted,
        config.style,
        &mut rng,
    )?)
}

fn basemap(config: &RenderConfig) -> Basemap {
    if config.basemap {
        Basemap::load_or_empty(&config.geodata_dir())
    } else {
        Basemap::empty()
    }
}

/// Canvas sized for `config`. The basemap is only fetched when there is no
/// background image.
fn map_canvas(config: &RenderConfig, video: bool, background: Option<Background>) -> MapCanvas {
    let (width, height) = config.frame_size(video);
    MapCanvas::new(width, height)
        .with_title(config.title.clone())
        .with_ground(background, || basemap(config))
        .with_point_radius(config.point_radius)
        .with_line_width(config.line_width)
}

fn frame_writer(
    config: &RenderConfig,
    out_dir: &Path,
    name: &str,
    fps: u32,
) -> Result<Box<dyn FrameWriter>> {
    Ok(match config.format {
        OutputFormat::Video => {
            let path = out_dir.join(format!("{name}.mp4"));
            check_not_file(&path)?;
            Box::new(VideoWriter::new(path, fps)?)
        }
        OutputFormat::Png => Box::new(PngSequence::new(out_dir, format!("{name}_"))),
    })
}

fn file_label(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}
