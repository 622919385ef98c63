//! Headline indicators: last week, trailing four weeks and year to date.

use crate::error::{DashboardError, Result};
use crate::types::{
    AlertCount, CitySeries, CityWeekEntry, KpiSet, StateSeries, StateWeekDocument,
    StateWeekSummary,
};
use crate::util::sum_counts;
use crate::week::EpiWeek;
use std::collections::HashSet;

/// Number of most-recent weeks in the trailing window.
pub const TRAILING_WEEKS: usize = 4;

/// Anything that reports a case count for a given week.
pub trait WeeklyCases {
    fn week(&self) -> EpiWeek;
    fn weekly_cases(&self) -> Option<u64>;
}

impl WeeklyCases for CityWeekEntry {
    fn week(&self) -> EpiWeek {
        self.week
    }

    fn weekly_cases(&self) -> Option<u64> {
        self.record.cases
    }
}

impl WeeklyCases for StateWeekSummary {
    fn week(&self) -> EpiWeek {
        self.week
    }

    fn weekly_cases(&self) -> Option<u64> {
        self.total_week_cases
    }
}

impl WeeklyCases for StateWeekDocument {
    fn week(&self) -> EpiWeek {
        self.week
    }

    fn weekly_cases(&self) -> Option<u64> {
        self.total_week_cases
    }
}

/// Which series a [`KpiSet`] was computed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum SeriesKind {
    City,
    State,
}

/// Compute the KPIs over any weekly series.
///
/// Repeated weeks count once (first occurrence); a missing case count adds
/// zero. Only an empty series is an error.
pub fn compute_kpis<T: WeeklyCases>(entries: &[T], cities_in_alert: AlertCount) -> Result<KpiSet> {
    let mut seen: HashSet<EpiWeek> = HashSet::with_capacity(entries.len());
    let mut unique: Vec<&T> = entries.iter().filter(|e| seen.insert(e.week())).collect();
    unique.sort_by(|a, b| b.week().cmp(&a.week()));

    let latest = *unique.first().ok_or(DashboardError::InsufficientData)?;
    let as_of_week = latest.week();

    let missing = unique.iter().filter(|e| e.weekly_cases().is_none()).count();
    if missing > 0 {
        log::debug!("{missing} week(s) without a case count, counted as zero");
    }

    Ok(KpiSet {
        last_week_cases: latest.weekly_cases().unwrap_or(0),
        last_4_weeks_cases: sum_counts(
            unique.iter().take(TRAILING_WEEKS).map(|e| e.weekly_cases()),
        ),
        year_to_date_cases: sum_counts(
            unique
                .iter()
                .filter(|e| e.week().same_year(as_of_week))
                .map(|e| e.weekly_cases()),
        ),
        cities_in_alert_state: cities_in_alert,
        as_of_week,
        as_of_date: as_of_week.as_of_label()?,
    })
}

/// Alert counter of the latest state week, or `N/A` without state data.
#[must_use]
pub fn cities_in_alert(state: Option<&StateSeries>) -> AlertCount {
    state
        .and_then(|s| s.latest.cities_in_alert_state)
        .map_or(AlertCount::NotAvailable, AlertCount::Count)
}

pub fn state_kpis(series: &StateSeries) -> Result<KpiSet> {
    compute_kpis(&series.history, cities_in_alert(Some(series)))
}

/// City KPIs; the alert counter still comes from the state series.
pub fn city_kpis(series: &CitySeries, state: Option<&StateSeries>) -> Result<KpiSet> {
    compute_kpis(&series.data, cities_in_alert(state))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AlertLevel, CityWeekRecord, Climate};

    fn entry(code: u32, cases: Option<u64>) -> CityWeekEntry {
        CityWeekEntry {
            week: EpiWeek::from_code(code).unwrap(),
            record: CityWeekRecord {
                city: "Uberlândia".to_string(),
                geocode: 3_170_206,
                cases,
                estimated_cases: None,
                rt_probability: None,
                incidence_per_100k: None,
                alert_level: AlertLevel::Green,
                incidence_alert_level: AlertLevel::Unknown,
                rt: None,
                population: None,
                climate: Climate::default(),
                receptivity: None,
                transmission: None,
                notifications_year_to_date: None,
            },
        }
    }

    fn summary(code: u32, cases: u64) -> StateWeekSummary {
        StateWeekSummary {
            week: EpiWeek::from_code(code).unwrap(),
            total_week_cases: Some(cases),
            cities_in_alert_state: Some(0),
            total_notifications_year_to_date: None,
        }
    }

    #[test]
    fn windows_over_ten_weeks() {
        let series: Vec<_> = (1..=10u32).map(|w| entry(202_400 + w, Some(u64::from(w)))).collect();
        let kpis = compute_kpis(&series, AlertCount::NotAvailable).unwrap();
        assert_eq!(kpis.last_week_cases, 10);
        assert_eq!(kpis.last_4_weeks_cases, 7 + 8 + 9 + 10);
        assert_eq!(kpis.year_to_date_cases, 55);
        assert_eq!(kpis.as_of_week.code(), 202_410);
    }

    #[test]
    fn year_to_date_stops_at_year_boundary() {
        let series = vec![entry(202352, Some(5)), entry(202401, Some(3)), entry(202402, Some(4))];
        let kpis = compute_kpis(&series, AlertCount::NotAvailable).unwrap();
        assert_eq!(kpis.year_to_date_cases, 3 + 4);
        // The trailing window does cross the year boundary.
        assert_eq!(kpis.last_4_weeks_cases, 12);
    }

    #[test]
    fn short_series_sums_what_exists() {
        let series = vec![entry(202405, Some(2))];
        let kpis = compute_kpis(&series, AlertCount::Count(3)).unwrap();
        assert_eq!(kpis.last_4_weeks_cases, 2);
        assert_eq!(kpis.cities_in_alert_state, AlertCount::Count(3));
    }

    #[test]
    fn duplicate_weeks_count_once() {
        let series = vec![
            entry(202401, Some(1)),
            entry(202402, Some(2)),
            entry(202402, Some(50)),
            entry(202403, Some(3)),
        ];
        let kpis = compute_kpis(&series, AlertCount::NotAvailable).unwrap();
        assert_eq!(kpis.last_4_weeks_cases, 6);
        assert_eq!(kpis.year_to_date_cases, 6);
    }

    #[test]
    fn unordered_input_and_missing_counts() {
        let series = vec![entry(202403, None), entry(202401, Some(1)), entry(202402, Some(2))];
        let kpis = compute_kpis(&series, AlertCount::NotAvailable).unwrap();
        assert_eq!(kpis.last_week_cases, 0);
        assert_eq!(kpis.last_4_weeks_cases, 3);
    }

    #[test]
    fn empty_series_is_insufficient() {
        let err = compute_kpis::<CityWeekEntry>(&[], AlertCount::NotAvailable).unwrap_err();
        assert!(matches!(err, DashboardError::InsufficientData));
        assert!(err.is_no_data());
    }

    #[test]
    fn as_of_date_is_week_monday() {
        let kpis = compute_kpis(&[entry(202401, Some(1))], AlertCount::NotAvailable).unwrap();
        assert_eq!(kpis.as_of_date, "01/01/2024");
    }

    #[test]
    fn state_kpis_use_history_and_alert_counter() {
        let latest = StateWeekDocument {
            week: EpiWeek::from_code(202403).unwrap(),
            total_week_cases: Some(30),
            total_population: None,
            cities_in_alert_state: Some(17),
            total_notifications_year_to_date: None,
            cities: Vec::new(),
        };
        let series = StateSeries {
            history: vec![summary(202352, 100), summary(202401, 10), summary(202402, 20), summary(202403, 30)],
            latest,
        };
        let kpis = state_kpis(&series).unwrap();
        assert_eq!(kpis.last_week_cases, 30);
        assert_eq!(kpis.last_4_weeks_cases, 160);
        assert_eq!(kpis.year_to_date_cases, 60);
        assert_eq!(kpis.cities_in_alert_state, AlertCount::Count(17));
    }

    #[test]
    fn raw_documents_work_without_aggregating() {
        let doc = |code: u32, cases: u64| StateWeekDocument {
            week: EpiWeek::from_code(code).unwrap(),
            total_week_cases: Some(cases),
            total_population: None,
            cities_in_alert_state: None,
            total_notifications_year_to_date: None,
            cities: Vec::new(),
        };
        let docs = vec![doc(202402, 20), doc(202401, 10), doc(202402, 99)];
        let kpis = compute_kpis(&docs, AlertCount::NotAvailable).unwrap();
        assert_eq!(kpis.last_week_cases, 20);
        assert_eq!(kpis.year_to_date_cases, 30);
    }

    #[test]
    fn city_kpis_without_state_report_na() {
        let series = CitySeries {
            city: "Uberlândia".to_string(),
            geocode: 3_170_206,
            cases: Some(2),
            alert_level: AlertLevel::Green,
            incidence_per_100k: None,
            data: vec![entry(202401, Some(1)), entry(202402, Some(2))],
        };
        let kpis = city_kpis(&series, None).unwrap();
        assert_eq!(kpis.cities_in_alert_state, AlertCount::NotAvailable);
        assert_eq!(kpis.year_to_date_cases, 3);
        let json = serde_json::to_value(&kpis).unwrap();
        assert_eq!(json["citiesInAlertState"], "N/A");
        assert_eq!(json["last4WeeksCases"], 3);
        assert_eq!(json["asOfDate"], "08/01/2024");
    }
}
