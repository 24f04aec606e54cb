//! # Brent Dashboard
//!
//! Presentation layer of the Brent crude price forecast: renders the full
//! price history with the forecast appended, a zoom on the last year and the
//! forecast table for a horizon chosen between 7 and 180 days.
//!
//! ## Example
//!
//! ```no_run
//! use brent_dashboard::session::Dashboard;
//! use brent_dashboard::settings::AppConfig;
//! use std::path::Path;
//!
//! let dashboard = Dashboard::from_config(AppConfig::default())?;
//! let view = dashboard.view(60)?;
//! let rendered = dashboard.render(&view, Path::new("output"), true)?;
//! print!("{}", rendered.table);
//! # Ok::<(), brent_dashboard::DashboardError>(())
//! ```

pub mod charts;
pub mod cli;
pub mod error;
pub mod session;
pub mod settings;
pub mod table;

pub use crate::error::DashboardError;
pub use crate::session::Dashboard;
pub use crate::settings::AppConfig;
