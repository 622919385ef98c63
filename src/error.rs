//! Error taxonomy shared by every stage of the dashboard data layer.

/// Errors raised while loading, reshaping or summarizing weekly records.
#[derive(Debug, thiserror::Error)]
pub enum DashboardError {
    /// No data exists for the requested scope (empty collection, unknown city).
    #[error("No data found for {scope}")]
    NotFound {
        /// What was being looked up, e.g. `"state"` or `"city 'Ouro Preto'"`.
        scope: String,
    },

    /// A KPI computation was attempted on an empty series.
    #[error("Insufficient data to compute indicators")]
    InsufficientData,

    /// A record is missing a required field or carries an invalid value.
    #[error("Malformed record ({context}): {reason}")]
    MalformedRecord {
        /// Where the record came from (document index, week, city).
        context: String,
        /// What was wrong with it.
        reason: String,
    },

    /// I/O error (file read/write).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing or serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV serialization failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// The city search pattern could not be compiled.
    #[error("Invalid city pattern: {0}")]
    Pattern(#[from] regex::Error),
}

impl DashboardError {
    pub fn not_found(scope: impl Into<String>) -> Self {
        Self::NotFound {
            scope: scope.into(),
        }
    }

    pub fn malformed(context: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedRecord {
            context: context.into(),
            reason: reason.into(),
        }
    }

    /// `true` for errors that mean "nothing to show yet" rather than a failure.
    ///
    /// Callers render a placeholder for these instead of aborting.
    #[must_use]
    pub const fn is_no_data(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::InsufficientData)
    }
}

pub type Result<T, E = DashboardError> = std::result::Result<T, E>;
