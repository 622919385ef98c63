//! Weekly dengue indicators for Minas Gerais.
//!
//! Reshapes the per-week state documents (each embedding every
//! municipality's record for that week) into what the dashboard shows:
//!
//! - [`aggregate::get_state_series`]: latest week in full plus the state history.
//! - [`extract::get_city_series`]: one municipality's history.
//! - [`kpi`]: last week, trailing four weeks and year-to-date case counts.
//!
//! Documents come from a [`source::WeekSource`]; [`session::Dashboard`] keeps
//! the current selection for an interactive front end.

pub mod aggregate;
pub mod config;
pub mod error;
pub mod extract;
pub mod kpi;
pub mod loader;
pub mod output;
pub mod reports;
pub mod session;
pub mod source;
pub mod types;
pub mod util;
pub mod week;

pub use error::{DashboardError, Result};
pub use types::{CitySeries, KpiSet, StateSeries, StateWeekDocument};
pub use week::{week_to_date, EpiWeek};
