//! State-wide series: the latest week in full plus a slim history.

use crate::error::{DashboardError, Result};
use crate::types::{StateSeries, StateWeekDocument, StateWeekSummary};
use crate::week::EpiWeek;
use std::collections::HashSet;

/// Build the [`StateSeries`] from every stored state-week document.
///
/// The latest entry is the document with the greatest SE (the first one
/// encountered wins a tie). The history holds one slim entry per distinct SE,
/// ascending; repeated weeks keep their first occurrence.
pub fn get_state_series(documents: &[StateWeekDocument]) -> Result<StateSeries> {
    let mut latest: Option<&StateWeekDocument> = None;
    for doc in documents {
        if latest.map_or(true, |l| doc.week > l.week) {
            latest = Some(doc);
        }
    }
    let latest = latest.ok_or_else(|| DashboardError::not_found("state"))?;

    let mut seen: HashSet<EpiWeek> = HashSet::with_capacity(documents.len());
    let mut history: Vec<StateWeekSummary> = documents
        .iter()
        .filter(|doc| seen.insert(doc.week))
        .map(StateWeekSummary::from)
        .collect();
    history.sort_by_key(|s| s.week);

    let dropped = documents.len() - history.len();
    if dropped > 0 {
        log::warn!("Dropped {dropped} duplicate state-week document(s)");
    }
    log::debug!(
        "State series: latest SE {} with {} cities, {} historical weeks",
        latest.week,
        latest.cities.len(),
        history.len()
    );

    Ok(StateSeries {
        latest: latest.clone(),
        history,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(code: u32, cases: u64) -> StateWeekDocument {
        StateWeekDocument {
            week: EpiWeek::from_code(code).unwrap(),
            total_week_cases: Some(cases),
            total_population: Some(21_000_000),
            cities_in_alert_state: Some(3),
            total_notifications_year_to_date: None,
            cities: Vec::new(),
        }
    }

    #[test]
    fn empty_collection_is_not_found() {
        let err = get_state_series(&[]).unwrap_err();
        assert!(matches!(err, DashboardError::NotFound { .. }));
    }

    #[test]
    fn picks_latest_and_sorts_history() {
        let docs = vec![doc(202402, 20), doc(202352, 5), doc(202401, 10)];
        let series = get_state_series(&docs).unwrap();
        assert_eq!(series.latest.week.code(), 202_402);
        assert_eq!(series.latest.total_week_cases, Some(20));
        let weeks: Vec<u32> = series.history.iter().map(|s| s.week.code()).collect();
        assert_eq!(weeks, vec![202_352, 202_401, 202_402]);
    }

    #[test]
    fn keeps_first_occurrence_of_duplicate_weeks() {
        let docs = vec![doc(202401, 10), doc(202402, 20), doc(202401, 99)];
        let series = get_state_series(&docs).unwrap();
        assert_eq!(series.history.len(), 2);
        assert_eq!(series.history[0].total_week_cases, Some(10));
    }

    #[test]
    fn latest_tie_resolves_to_first_encountered() {
        let docs = vec![doc(202405, 1), doc(202405, 2)];
        let series = get_state_series(&docs).unwrap();
        assert_eq!(series.latest.total_week_cases, Some(1));
    }

    #[test]
    fn is_idempotent() {
        let docs = vec![doc(202403, 3), doc(202401, 1), doc(202402, 2)];
        assert_eq!(get_state_series(&docs).unwrap(), get_state_series(&docs).unwrap());
    }

    #[test]
    fn history_is_non_decreasing() {
        let codes = [202410, 202302, 202452, 202301, 202410, 202215];
        let docs: Vec<_> = codes.iter().map(|c| doc(*c, 1)).collect();
        let series = get_state_series(&docs).unwrap();
        assert!(series.history.windows(2).all(|w| w[0].week < w[1].week));
    }
}
