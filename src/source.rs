//! Where state-week documents come from.
//!
//! The aggregation code never performs I/O itself; it is handed documents by
//! a [`WeekSource`]. The file-backed source reads a collection export, the
//! in-memory one serves tests and callers that already hold the documents.

use crate::error::Result;
use crate::extract::CityMatcher;
use crate::loader::{load_state_weeks, LoadReport, Validation};
use crate::types::StateWeekDocument;
use std::path::{Path, PathBuf};

/// Read-only access to the stored state-week documents.
pub trait WeekSource {
    /// Every stored document, in no particular order.
    fn fetch_state_weeks(&self) -> Result<Vec<StateWeekDocument>>;

    /// Like [`WeekSource::fetch_state_weeks`], plus the validation report of
    /// that same read when the source produces one.
    fn fetch_state_weeks_reported(&self) -> Result<(Vec<StateWeekDocument>, Option<LoadReport>)> {
        Ok((self.fetch_state_weeks()?, None))
    }

    /// Documents holding at least one city that matches.
    ///
    /// The default filters [`WeekSource::fetch_state_weeks`] in process.
    fn fetch_city_weeks(&self, matcher: &CityMatcher) -> Result<Vec<StateWeekDocument>> {
        let documents = self.fetch_state_weeks()?;
        Ok(documents
            .into_iter()
            .filter(|doc| matcher.find_in(doc).is_some())
            .collect())
    }
}

/// Export of the weekly collection on disk, re-read on every fetch.
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    path: PathBuf,
    validation: Validation,
}

impl JsonFileSource {
    pub fn new(path: impl Into<PathBuf>, validation: Validation) -> Self {
        Self {
            path: path.into(),
            validation,
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl WeekSource for JsonFileSource {
    fn fetch_state_weeks(&self) -> Result<Vec<StateWeekDocument>> {
        self.fetch_state_weeks_reported().map(|(documents, _)| documents)
    }

    fn fetch_state_weeks_reported(&self) -> Result<(Vec<StateWeekDocument>, Option<LoadReport>)> {
        let (documents, report) = load_state_weeks(&self.path, self.validation)?;
        if report.skipped_documents > 0 || report.skipped_city_records > 0 {
            log::warn!(
                "{}: skipped {} document(s) and {} city record(s)",
                self.path.display(),
                report.skipped_documents,
                report.skipped_city_records
            );
        }
        Ok((documents, Some(report)))
    }
}

#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    documents: Vec<StateWeekDocument>,
}

impl InMemorySource {
    #[must_use]
    pub const fn new(documents: Vec<StateWeekDocument>) -> Self {
        Self { documents }
    }
}

impl WeekSource for InMemorySource {
    fn fetch_state_weeks(&self) -> Result<Vec<StateWeekDocument>> {
        Ok(self.documents.clone())
    }
}

impl<S: WeekSource + ?Sized> WeekSource for &S {
    fn fetch_state_weeks(&self) -> Result<Vec<StateWeekDocument>> {
        (**self).fetch_state_weeks()
    }

    fn fetch_state_weeks_reported(&self) -> Result<(Vec<StateWeekDocument>, Option<LoadReport>)> {
        (**self).fetch_state_weeks_reported()
    }

    fn fetch_city_weeks(&self, matcher: &CityMatcher) -> Result<Vec<StateWeekDocument>> {
        (**self).fetch_city_weeks(matcher)
    }
}
