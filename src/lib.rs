//! mdbi_rs
//!
//! Fetch, shape and chart yearly financial indicators of multilateral development banks
//! (MDBs). Pairs with the `mdbi` CLI and the `mdbi-gui` desktop dashboard.
//!
//! ### Features
//! - Cached HTTP access to the indicators API (values, MDB listing, metric metadata)
//! - Series building with missing-value handling, YoY % change and unit scaling
//! - Line, area, small-multiple grid and latest-value bar charts with a year range slider
//! - Hover tooltips and clickable end-of-line labels, driven by a headless [`ChartSession`]
//! - SVG/PNG output through plotters
//!
//! ### Example
//! ```no_run
//! use mdbi_rs::{ChartSession, Client, config, loader, viz};
//!
//! let client = Client::default();
//! let mut session = ChartSession::new(config::preset("moodys-ratios")?);
//! if let Some(req) = session.take_load_request() {
//!     session.apply_load(loader::load_chart_data(&client, &req));
//! }
//! let frame = session.prepare(1000.0, 600.0);
//! viz::render_to_file(&frame, "leverage.svg")?;
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod api;
pub mod cache;
pub mod chart;
pub mod config;
pub mod domain;
pub mod error;
pub mod interaction;
pub mod layout;
pub mod loader;
pub mod models;
pub mod series;
pub mod slider;
pub mod transform;
pub mod viz;

pub use api::{Client, Since};
pub use chart::{ChartSession, LoadState};
pub use config::{ChartConfig, ChartKind, MetricConfig};
pub use domain::YearRange;
pub use error::{ConfigError, FetchError, RenderError};
pub use models::{Entity, EntityId, MetricMeta, RawRow, Series};
