//! Renders constellation simulator logs onto a world map.
//!
//! Logs are read into indexed tables (cached beside their source), contact
//! graphs are read per timestep, and the frame driver turns each timestamp
//! into colored points and antimeridian-aware links for a drawing surface.

pub mod adjacency;
pub mod background;
pub mod cache;
pub mod checks;
pub mod color;
pub mod config;
pub mod container;
pub mod driver;
pub mod error;
pub mod field;
pub mod geo;
pub mod reader;
pub mod render;
pub mod schema;
pub mod segment;
pub mod table;
pub mod time;
pub mod viewer;

pub use adjacency::AdjacencySeries;
pub use background::Background;
pub use cache::{ArtifactCache, CachedReader, MemoryCache, TableCache};
pub use config::RenderConfig;
pub use driver::{ConsoleProgress, DrawingSurface, Frame, FrameDriver, PointStyle, ProgressSink};
pub use error::{Result, VizError};
pub use schema::SourceKind;
pub use segment::{split, GeoSegment, SegmentSplit};
pub use table::TimeSeriesLog;
