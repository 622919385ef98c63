//! Per-user dashboard state: the state series, the selected city and a
//! cache of that city's series.
//!
//! A city selection is identified by a generation number. Work started for an
//! older selection can still finish, but [`Dashboard::complete`] drops its
//! result, so a slow lookup never overwrites the city picked after it.

use crate::aggregate::get_state_series;
use crate::error::{DashboardError, Result};
use crate::extract::{extract_city_series, CityMatcher};
use crate::kpi::{city_kpis, state_kpis, SeriesKind};
use crate::loader::LoadReport;
use crate::source::WeekSource;
use crate::types::{CitySeries, KpiSet, StateSeries};

/// Handle for one city selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionTicket {
    generation: u64,
    city: String,
}

impl SelectionTicket {
    #[must_use]
    pub fn city(&self) -> &str {
        &self.city
    }
}

#[derive(Debug)]
struct Selection {
    ticket: SelectionTicket,
    series: Option<CitySeries>,
}

pub struct Dashboard<S> {
    source: S,
    state: Option<StateSeries>,
    load_report: Option<LoadReport>,
    selection: Option<Selection>,
    generation: u64,
}

impl<S: WeekSource> Dashboard<S> {
    pub const fn new(source: S) -> Self {
        Self {
            source,
            state: None,
            load_report: None,
            selection: None,
            generation: 0,
        }
    }

    pub const fn source(&self) -> &S {
        &self.source
    }

    /// Re-read the state series from the source.
    ///
    /// On failure the previous series and its load report are kept.
    pub fn refresh_state(&mut self) -> Result<&StateSeries> {
        let (documents, report) = self.source.fetch_state_weeks_reported()?;
        let series = get_state_series(&documents)?;
        self.load_report = report;
        log::info!(
            "State data loaded: {} weeks, latest SE {}",
            series.history.len(),
            series.latest.week
        );
        Ok(&*self.state.insert(series))
    }

    pub const fn state(&self) -> Option<&StateSeries> {
        self.state.as_ref()
    }

    /// Validation report of the read behind the current state series, for
    /// sources that produce one.
    pub const fn load_report(&self) -> Option<&LoadReport> {
        self.load_report.as_ref()
    }

    /// Change the selected city. `None` clears the selection.
    ///
    /// Any cached series is discarded, even when the same name is picked
    /// again.
    pub fn select_city(&mut self, city: Option<&str>) -> Option<SelectionTicket> {
        self.generation += 1;
        let city = city.map(str::trim).filter(|c| !c.is_empty());
        let Some(city) = city else {
            log::debug!("City selection cleared");
            self.selection = None;
            return None;
        };
        let ticket = SelectionTicket {
            generation: self.generation,
            city: city.to_string(),
        };
        self.selection = Some(Selection {
            ticket: ticket.clone(),
            series: None,
        });
        log::debug!("Selected city '{city}' (generation {})", self.generation);
        Some(ticket)
    }

    #[must_use]
    pub fn selected_city(&self) -> Option<&str> {
        self.selection.as_ref().map(|s| s.ticket.city.as_str())
    }

    /// Compute the series for a ticket without touching the session.
    pub fn resolve(&self, ticket: &SelectionTicket) -> Result<CitySeries> {
        let matcher = CityMatcher::new(&ticket.city)?;
        let documents = self.source.fetch_city_weeks(&matcher)?;
        extract_city_series(&documents, &matcher)
    }

    /// Store a resolved series if its ticket is still the current selection.
    ///
    /// Returns `false` when the result is stale and was dropped.
    pub fn complete(&mut self, ticket: &SelectionTicket, series: CitySeries) -> bool {
        match self.selection.as_mut() {
            Some(current) if current.ticket == *ticket => {
                current.series = Some(series);
                true
            }
            _ => {
                log::debug!(
                    "Dropping stale result for '{}' (generation {})",
                    ticket.city,
                    ticket.generation
                );
                false
            }
        }
    }

    /// Select `city` and load its series, reusing the cache when the same
    /// city is already loaded.
    pub fn load_city(&mut self, city: &str) -> Result<&CitySeries> {
        let cached = self
            .selection
            .as_ref()
            .is_some_and(|s| s.ticket.city == city.trim() && s.series.is_some());
        if !cached {
            let ticket = self
                .select_city(Some(city))
                .ok_or_else(|| DashboardError::not_found("an empty city name"))?;
            let series = self.resolve(&ticket)?;
            self.complete(&ticket, series);
        }
        self.city_series()
            .ok_or_else(|| DashboardError::not_found(format!("city '{}'", city.trim())))
    }

    pub fn city_series(&self) -> Option<&CitySeries> {
        self.selection.as_ref().and_then(|s| s.series.as_ref())
    }

    /// KPIs for the loaded city, or for the state when no city is loaded.
    pub fn kpis(&self) -> Result<(SeriesKind, KpiSet)> {
        if let Some(city) = self.city_series() {
            return Ok((SeriesKind::City, city_kpis(city, self.state.as_ref())?));
        }
        let state = self.state.as_ref().ok_or(DashboardError::InsufficientData)?;
        Ok((SeriesKind::State, state_kpis(state)?))
    }
}
