//! Renders live-stream gift statistics into PNG tables.
//!
//! Upstream JSON is fetched by [`StatsClient`], parsed into typed records,
//! laid out by the report builders and rasterized with the fonts held by a
//! shared [`FontRegistry`]. [`Service`] ties these together per request.

mod canvas;
pub mod cli;
pub mod config;
mod error;
mod fetch;
mod font;
pub mod format;
mod measure;
pub mod model;
pub mod paginate;
pub mod period;
mod raster;
pub mod report;
mod script;
pub mod service;
pub mod table;
pub mod text;
mod types;

pub use canvas::{Canvas, Command};
pub use config::{ApiConfig, Config, Platform, RenderConfig, TitleConfig, load_config};
pub use error::{ConfigError, FetchError, RenderError, ReportError};
pub use fetch::StatsClient;
pub use font::FontRegistry;
pub use measure::{MEASURE_CHAIN, MeasureStrategy, TextMeasure};
pub use period::MonthCode;
pub use report::ReportContext;
pub use script::{TextRun, is_special_glyph, split_runs};
pub use service::{ForwardBundle, ForwardNode, Query, Reply, Service};
pub use types::{Color, FontFace, Point, TextSegment};
