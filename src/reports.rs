use crate::kpi::SeriesKind;
use crate::types::{
    AlertLevel, CitySeries, CityHistoryRow, CityWeekRecord, KpiRow, KpiSet, MapRow,
    StateHistoryRow, StateSeries, StateWeekDocument, StateWeekSummary, TopCityRow,
};
use crate::util::{format_int, format_number, format_opt_count, format_opt_number, round_to};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

/// Default number of cities in the ranking.
pub const DEFAULT_TOP_LIMIT: usize = 10;

/// Minimum query length before search suggestions are offered.
pub const MIN_SUGGESTION_CHARS: usize = 3;

const WEEKS_PER_YEAR: usize = 52;

/// Which indicator orders the city ranking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, strum::Display, strum::EnumString)]
pub enum RankingMetric {
    #[default]
    #[strum(serialize = "cases")]
    Cases,
    #[strum(serialize = "per100k")]
    Per100k,
}

impl RankingMetric {
    #[allow(clippy::cast_precision_loss)]
    fn value(self, city: &CityWeekRecord) -> Option<f64> {
        match self {
            Self::Cases => city.cases.map(|c| c as f64),
            Self::Per100k => city.incidence_per_100k.map(|v| round_to(v, 2)),
        }
    }

    fn render(self, value: Option<f64>) -> String {
        match self {
            Self::Cases => format_opt_number(value, 0),
            Self::Per100k => format_opt_number(value, 2),
        }
    }
}

/// Cities of the latest week ranked by `metric`, highest first.
///
/// Cities without a value sort last; equal values keep their stored order.
pub fn top_cities(latest: &StateWeekDocument, metric: RankingMetric, limit: usize) -> Vec<TopCityRow> {
    let mut ranked: Vec<(Option<f64>, &CityWeekRecord)> =
        latest.cities.iter().map(|c| (metric.value(c), c)).collect();
    ranked.sort_by(|a, b| match (a.0, b.0) {
        (Some(x), Some(y)) => y.partial_cmp(&x).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
    ranked
        .into_iter()
        .take(limit)
        .enumerate()
        .map(|(idx, (value, city))| TopCityRow {
            rank: idx + 1,
            city: city.city.clone(),
            geocode: city.geocode,
            value: metric.render(value),
            alert_level: city.alert_level.to_string(),
        })
        .collect()
}

/// State weekly cases for one year, indexed by week (slot 0 = week 1).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct YearCurve {
    pub year: u32,
    pub weeks: Vec<Option<u64>>,
}

/// Group the state history into one curve per year, ascending by year.
///
/// Every curve has 52 slots, or 53 when that year reports a week 53.
pub fn yearly_curves(history: &[StateWeekSummary]) -> Vec<YearCurve> {
    let mut by_year: BTreeMap<u32, Vec<Option<u64>>> = BTreeMap::new();
    for entry in history {
        let slots = by_year
            .entry(entry.week.year())
            .or_insert_with(|| vec![None; WEEKS_PER_YEAR]);
        let idx = entry.week.week() as usize - 1;
        if idx >= slots.len() {
            slots.resize(idx + 1, None);
        }
        slots[idx] = entry.total_week_cases;
    }
    by_year
        .into_iter()
        .map(|(year, weeks)| YearCurve { year, weeks })
        .collect()
}

/// City names of the latest week containing `query`, case-insensitively.
///
/// Short queries return nothing so a single keystroke does not list the
/// whole state.
pub fn city_suggestions(latest: &StateWeekDocument, query: &str) -> Vec<String> {
    let query = query.trim();
    if query.chars().count() < MIN_SUGGESTION_CHARS {
        return Vec::new();
    }
    let needle = query.to_lowercase();
    latest
        .cities
        .iter()
        .filter(|c| c.city.to_lowercase().contains(&needle))
        .map(|c| c.city.clone())
        .collect()
}

/// Indicator painted on the municipality map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, strum::Display, strum::EnumString)]
pub enum MapLayer {
    #[default]
    #[strum(serialize = "casos")]
    Cases,
    #[strum(serialize = "nivel")]
    AlertLevel,
    #[strum(serialize = "incidencia")]
    Incidence,
}

/// Geocode lookup over one week's city records, for joining with map
/// boundaries.
#[derive(Debug)]
pub struct MapIndex<'a> {
    by_geocode: HashMap<u32, &'a CityWeekRecord>,
}

impl<'a> MapIndex<'a> {
    pub fn new(week: &'a StateWeekDocument) -> Self {
        let mut by_geocode = HashMap::with_capacity(week.cities.len());
        for city in &week.cities {
            by_geocode.entry(city.geocode).or_insert(city);
        }
        Self { by_geocode }
    }

    #[must_use]
    pub fn get(&self, geocode: u32) -> Option<&'a CityWeekRecord> {
        self.by_geocode.get(&geocode).copied()
    }

    /// Fill level for a municipality; those without a record draw as level 1.
    #[must_use]
    pub fn level_for(&self, geocode: u32) -> AlertLevel {
        self.get(geocode).map_or(AlertLevel::Green, |c| c.alert_level)
    }

    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn value_for(&self, geocode: u32, layer: MapLayer) -> Option<f64> {
        let city = self.get(geocode)?;
        match layer {
            MapLayer::Cases => city.cases.map(|c| c as f64),
            MapLayer::AlertLevel => city.alert_level.level().map(f64::from),
            MapLayer::Incidence => city.incidence_per_100k,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.by_geocode.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_geocode.is_empty()
    }
}

/// One row per municipality of `week` with the value of `layer` and the fill
/// level, ascending by geocode.
pub fn map_rows(week: &StateWeekDocument, layer: MapLayer) -> Vec<MapRow> {
    let index = MapIndex::new(week);
    let mut geocodes: Vec<u32> = index.by_geocode.keys().copied().collect();
    geocodes.sort_unstable();
    geocodes
        .into_iter()
        .filter_map(|geocode| {
            let city = index.get(geocode)?;
            let decimals = if layer == MapLayer::Incidence { 2 } else { 0 };
            Some(MapRow {
                geocode,
                city: city.city.clone(),
                value: format_opt_number(index.value_for(geocode, layer), decimals),
                fill: index.level_for(geocode).to_string(),
            })
        })
        .collect()
}

pub fn kpi_rows(kpis: &KpiSet, kind: SeriesKind) -> Vec<KpiRow> {
    let row = |indicator: &str, value: String| KpiRow {
        indicator: indicator.to_string(),
        value,
    };
    vec![
        row("Scope", kind.to_string()),
        row("Cases last week", format_int(kpis.last_week_cases)),
        row("Cases last 4 weeks", format_int(kpis.last_4_weeks_cases)),
        row("Cases this year", format_int(kpis.year_to_date_cases)),
        row("Cities in alert", kpis.cities_in_alert_state.to_string()),
        row("Data as of", format!("{} (SE {})", kpis.as_of_date, kpis.as_of_week)),
    ]
}

pub fn state_history_rows(series: &StateSeries) -> Vec<StateHistoryRow> {
    series
        .history
        .iter()
        .map(|s| StateHistoryRow {
            week: s.week.code(),
            week_start: s.week.as_of_label().unwrap_or_default(),
            total_week_cases: format_opt_count(s.total_week_cases),
            cities_in_alert: format_opt_count(s.cities_in_alert_state.map(u64::from)),
            notifications_year_to_date: format_opt_count(s.total_notifications_year_to_date),
        })
        .collect()
}

pub fn city_history_rows(series: &CitySeries) -> Vec<CityHistoryRow> {
    series
        .data
        .iter()
        .map(|e| {
            let r = &e.record;
            CityHistoryRow {
                week: e.week.code(),
                cases: format_opt_count(r.cases),
                incidence_per_100k: format_opt_number(r.incidence_per_100k, 2),
                alert_level: r.alert_level.to_string(),
                rt: format_opt_number(r.rt, 2),
                temp_med: format_opt_number(r.climate.temp_med, 1),
                humidity_med: format_opt_number(r.climate.humidity_med, 1),
            }
        })
        .collect()
}

/// Rendered curve for CSV export: one row per year, one column per week.
#[allow(clippy::cast_precision_loss)]
pub fn curve_cells(curve: &YearCurve) -> Vec<String> {
    std::iter::once(curve.year.to_string())
        .chain(
            curve
                .weeks
                .iter()
                .map(|w| w.map(|v| format_number(v as f64, 0)).unwrap_or_default()),
        )
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Climate;
    use crate::week::EpiWeek;

    fn city(name: &str, geocode: u32, cases: Option<u64>, per100k: Option<f64>, level: i64) -> CityWeekRecord {
        CityWeekRecord {
            city: name.to_string(),
            geocode,
            cases,
            estimated_cases: None,
            rt_probability: None,
            incidence_per_100k: per100k,
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

    fn latest() -> StateWeekDocument {
        StateWeekDocument {
            week: EpiWeek::from_code(202410).unwrap(),
            total_week_cases: Some(1_565),
            total_population: None,
            cities_in_alert_state: Some(2),
            total_notifications_year_to_date: None,
            cities: vec![
                city("Uberaba", 3_170_107, Some(40), Some(11.987), 2),
                city("Belo Horizonte", 3_106_200, Some(1_500), Some(6.0), 4),
                city("Uberlândia", 3_170_206, Some(25), Some(3.5), 1),
                city("Serro", 3_166_808, None, None, 0),
            ],
        }
    }

    fn summary(code: u32, cases: u64) -> StateWeekSummary {
        StateWeekSummary {
            week: EpiWeek::from_code(code).unwrap(),
            total_week_cases: Some(cases),
            cities_in_alert_state: None,
            total_notifications_year_to_date: None,
        }
    }

    #[test]
    fn ranks_by_cases() {
        let rows = top_cities(&latest(), RankingMetric::Cases, 3);
        let names: Vec<&str> = rows.iter().map(|r| r.city.as_str()).collect();
        assert_eq!(names, vec!["Belo Horizonte", "Uberaba", "Uberlândia"]);
        assert_eq!(rows[0].rank, 1);
        assert_eq!(rows[0].value, "1.500");
        assert_eq!(rows[0].alert_level, "vermelho");
    }

    #[test]
    fn ranks_by_incidence_with_two_decimals_and_missing_last() {
        let rows = top_cities(&latest(), RankingMetric::Per100k, DEFAULT_TOP_LIMIT);
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0].city, "Uberaba");
        assert_eq!(rows[0].value, "11,99");
        assert_eq!(rows[3].city, "Serro");
        assert_eq!(rows[3].value, "N/A");
    }

    #[test]
    fn metric_parses_from_cli_names() {
        assert_eq!("per100k".parse::<RankingMetric>().unwrap(), RankingMetric::Per100k);
        assert!("weekly".parse::<RankingMetric>().is_err());
        assert_eq!("incidencia".parse::<MapLayer>().unwrap(), MapLayer::Incidence);
    }

    #[test]
    fn curves_group_by_year() {
        let history = vec![summary(202351, 5), summary(202352, 6), summary(202401, 7), summary(202453, 9)];
        let curves = yearly_curves(&history);
        assert_eq!(curves.len(), 2);
        assert_eq!(curves[0].year, 2023);
        assert_eq!(curves[0].weeks.len(), 52);
        assert_eq!(curves[0].weeks[50], Some(5));
        assert_eq!(curves[0].weeks[0], None);
        assert_eq!(curves[1].weeks.len(), 53);
        assert_eq!(curves[1].weeks[0], Some(7));
        assert_eq!(curves[1].weeks[52], Some(9));
        assert_eq!(curve_cells(&curves[1])[1], "7");
    }

    #[test]
    fn suggestions_need_three_characters() {
        let doc = latest();
        assert!(city_suggestions(&doc, "ub").is_empty());
        assert_eq!(city_suggestions(&doc, "UBER"), vec!["Uberaba", "Uberlândia"]);
        assert_eq!(city_suggestions(&doc, "lândia"), vec!["Uberlândia"]);
    }

    #[test]
    fn map_index_defaults_unknown_municipalities_to_level_one() {
        let doc = latest();
        let index = MapIndex::new(&doc);
        assert_eq!(index.len(), 4);
        assert_eq!(index.level_for(3_106_200), AlertLevel::Red);
        assert_eq!(index.level_for(3_199_999), AlertLevel::Green);
        assert_eq!(index.value_for(3_106_200, MapLayer::Cases), Some(1_500.0));
        assert_eq!(index.value_for(3_106_200, MapLayer::AlertLevel), Some(4.0));
        assert_eq!(index.value_for(3_170_206, MapLayer::Incidence), Some(3.5));
        assert_eq!(index.value_for(3_166_808, MapLayer::Cases), None);
    }

    #[test]
    fn map_rows_follow_the_selected_layer() {
        let mut doc = latest();
        // A repeated geocode keeps its first record.
        doc.cities.push(city("Belo Horizonte (dup)", 3_106_200, Some(1), Some(0.1), 1));

        let rows = map_rows(&doc, MapLayer::Cases);
        let geocodes: Vec<u32> = rows.iter().map(|r| r.geocode).collect();
        assert_eq!(geocodes, vec![3_106_200, 3_166_808, 3_170_107, 3_170_206]);
        assert_eq!(rows[0].city, "Belo Horizonte");
        assert_eq!(rows[0].value, "1.500");
        assert_eq!(rows[0].fill, "vermelho");
        assert_eq!(rows[1].value, "N/A");
        assert_eq!(rows[1].fill, "desconhecido");

        let rows = map_rows(&doc, MapLayer::Incidence);
        assert_eq!(rows[2].value, "11,99");
        let rows = map_rows(&doc, MapLayer::AlertLevel);
        assert_eq!(rows[0].value, "4");
    }

    #[test]
    fn kpi_rows_format_counts() {
        let kpis = KpiSet {
            last_week_cases: 1_565,
            last_4_weeks_cases: 6_000,
            year_to_date_cases: 12_345,
            cities_in_alert_state: crate::types::AlertCount::NotAvailable,
            as_of_week: EpiWeek::from_code(202410).unwrap(),
            as_of_date: "04/03/2024".to_string(),
        };
        let rows = kpi_rows(&kpis, SeriesKind::State);
        assert_eq!(rows[0].value, "state");
        assert_eq!(rows[3].value, "12.345");
        assert_eq!(rows[4].value, "N/A");
        assert_eq!(rows[5].value, "04/03/2024 (SE 202410)");
    }
}
