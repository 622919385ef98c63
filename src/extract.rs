//! Pulls one city's history out of the per-week city arrays.

use crate::error::{DashboardError, Result};
use crate::types::{CitySeries, CityWeekEntry, CityWeekRecord, StateWeekDocument};
use crate::week::EpiWeek;
use regex::{Regex, RegexBuilder};
use std::collections::HashSet;

/// Case-insensitive substring matcher over city names.
///
/// The query is matched literally, so `"Pará de Minas"` or a stray `(` in
/// user input never turns into a pattern.
#[derive(Debug, Clone)]
pub struct CityMatcher {
    query: String,
    pattern: Regex,
}

impl CityMatcher {
    pub fn new(query: &str) -> Result<Self> {
        let query = query.trim();
        if query.is_empty() {
            return Err(DashboardError::not_found("an empty city name"));
        }
        let pattern = RegexBuilder::new(&regex::escape(query))
            .case_insensitive(true)
            .build()?;
        Ok(Self {
            query: query.to_string(),
            pattern,
        })
    }

    #[must_use]
    pub fn query(&self) -> &str {
        &self.query
    }

    #[must_use]
    pub fn is_match(&self, city: &str) -> bool {
        self.pattern.is_match(city)
    }

    /// First record of the week whose name matches.
    #[must_use]
    pub fn find_in<'a>(&self, doc: &'a StateWeekDocument) -> Option<&'a CityWeekRecord> {
        doc.cities.iter().find(|c| self.is_match(&c.city))
    }
}

/// Extract the history of the city matching `query`.
///
/// Each week contributes at most one record (the first match in its city
/// array); a week stored twice contributes only its first document. Entries
/// are ascending by SE and the summary fields come from the latest week.
pub fn get_city_series(documents: &[StateWeekDocument], query: &str) -> Result<CitySeries> {
    let matcher = CityMatcher::new(query)?;
    extract_city_series(documents, &matcher)
}

pub fn extract_city_series(
    documents: &[StateWeekDocument],
    matcher: &CityMatcher,
) -> Result<CitySeries> {
    let mut seen: HashSet<EpiWeek> = HashSet::new();
    let mut data: Vec<CityWeekEntry> = documents
        .iter()
        .filter_map(|doc| matcher.find_in(doc).map(|record| (doc.week, record)))
        .filter(|(week, _)| seen.insert(*week))
        .map(|(week, record)| CityWeekEntry {
            week,
            record: record.clone(),
        })
        .collect();
    data.sort_by_key(|e| e.week);

    let Some(latest) = data.last().map(|e| (e.week, e.record.clone())) else {
        return Err(DashboardError::not_found(format!(
            "city '{}'",
            matcher.query()
        )));
    };
    let (latest_week, latest) = latest;

    let distinct: HashSet<&str> = data.iter().map(|e| e.record.city.as_str()).collect();
    if distinct.len() > 1 {
        log::warn!(
            "Query '{}' matched {} different cities across weeks",
            matcher.query(),
            distinct.len()
        );
    }
    log::debug!(
        "City series for '{}': {} weeks, latest SE {latest_week}",
        matcher.query(),
        data.len(),
    );

    Ok(CitySeries {
        city: latest.city,
        geocode: latest.geocode,
        cases: latest.cases,
        alert_level: latest.alert_level,
        incidence_per_100k: latest.incidence_per_100k,
        data,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AlertLevel, Climate};

    fn city(name: &str, geocode: u32, cases: u64, level: i64) -> CityWeekRecord {
        CityWeekRecord {
            city: name.to_string(),
            geocode,
            cases: Some(cases),
            estimated_cases: None,
            rt_probability: None,
            incidence_per_100k: Some(cases as f64 / 10.0),
            alert_level: AlertLevel::from_level(Some(level)),
            incidence_alert_level: AlertLevel::Unknown,
            rt: None,
            population: None,
            climate: Climate::default(),
            receptivity: None,
            transmission: None,
            notifications_year_to_date: None,
        }
    }

    fn week(code: u32, cities: Vec<CityWeekRecord>) -> StateWeekDocument {
        StateWeekDocument {
            week: EpiWeek::from_code(code).unwrap(),
            total_week_cases: None,
            total_population: None,
            cities_in_alert_state: None,
            total_notifications_year_to_date: None,
            cities,
        }
    }

    fn fixture() -> Vec<StateWeekDocument> {
        vec![
            week(
                202403,
                vec![city("Contagem", 3_118_601, 9, 1), city("Belo Horizonte", 3_106_200, 30, 3)],
            ),
            week(202401, vec![city("Belo Horizonte", 3_106_200, 10, 1)]),
            week(202402, vec![city("Contagem", 3_118_601, 2, 1)]),
            week(
                202404,
                vec![city("Belo Horizonte", 3_106_200, 40, 4), city("Belo Oriente", 3_106_300, 1, 1)],
            ),
        ]
    }

    #[test]
    fn extracts_weeks_in_order() {
        let series = get_city_series(&fixture(), "Belo Horizonte").unwrap();
        let weeks: Vec<u32> = series.data.iter().map(|e| e.week.code()).collect();
        assert_eq!(weeks, vec![202_401, 202_403, 202_404]);
        assert_eq!(series.data[1].record.cases, Some(30));
    }

    #[test]
    fn summary_reflects_latest_week() {
        let series = get_city_series(&fixture(), "belo horizonte").unwrap();
        assert_eq!(series.city, "Belo Horizonte");
        assert_eq!(series.geocode, 3_106_200);
        assert_eq!(series.cases, Some(40));
        assert_eq!(series.alert_level, AlertLevel::Red);
        assert_eq!(series.incidence_per_100k, Some(4.0));
    }

    #[test]
    fn partial_names_match_first_record_per_week() {
        // "Belo" also matches "Belo Oriente" in 202404, but Belo Horizonte comes first.
        let series = get_city_series(&fixture(), "Belo").unwrap();
        assert_eq!(series.data.len(), 3);
        assert!(series.data.iter().all(|e| e.record.city == "Belo Horizonte"));
    }

    #[test]
    fn unknown_or_blank_city_is_not_found() {
        let docs = fixture();
        assert!(matches!(
            get_city_series(&docs, "Nowhereville"),
            Err(DashboardError::NotFound { .. })
        ));
        assert!(matches!(
            get_city_series(&docs, "   "),
            Err(DashboardError::NotFound { .. })
        ));
        assert!(get_city_series(&[], "Contagem").is_err());
    }

    #[test]
    fn query_is_matched_literally() {
        let docs = vec![week(202401, vec![city("Pará de Minas", 3_147_105, 5, 2)])];
        assert!(get_city_series(&docs, "pará de").is_ok());
        assert!(get_city_series(&docs, "Par.").is_err());
        assert!(CityMatcher::new("(").is_ok());
    }

    #[test]
    fn one_entry_per_week_when_documents_repeat() {
        let mut docs = fixture();
        docs.push(week(202401, vec![city("Belo Horizonte", 3_106_200, 77, 1)]));
        let series = get_city_series(&docs, "Belo Horizonte").unwrap();
        assert_eq!(series.data.len(), 3);
        assert_eq!(series.data[0].record.cases, Some(10));
    }

    #[test]
    fn entry_week_matches_source_document() {
        let docs = fixture();
        let series = get_city_series(&docs, "Contagem").unwrap();
        for entry in &series.data {
            let source = docs.iter().find(|d| d.week == entry.week).unwrap();
            assert!(source.cities.iter().any(|c| *c == entry.record));
        }
    }
}
