use crate::week::EpiWeek;
use serde::ser::{SerializeStruct, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tabled::Tabled;

/// One state-week document as exported from the `statev3` collection.
///
/// Every field is kept as a raw JSON value; `loader` validates and converts.
#[derive(Debug, Deserialize)]
pub struct RawStateWeek {
    #[serde(rename = "SE")]
    pub se: Option<Value>,
    pub total_week_cases: Option<Value>,
    pub total_pop: Option<Value>,
    pub cities_in_alert_state: Option<Value>,
    pub total_notif_accum_year: Option<Value>,
    #[serde(default)]
    pub cities: Option<Vec<RawCityWeek>>,
}

#[derive(Debug, Deserialize)]
pub struct RawCityWeek {
    pub city: Option<Value>,
    pub geocode: Option<Value>,
    pub casos: Option<Value>,
    pub casprov: Option<Value>,
    pub p_rt1: Option<Value>,
    pub p_inc100k: Option<Value>,
    pub nivel: Option<Value>,
    pub nivel_inc: Option<Value>,
    #[serde(rename = "Rt")]
    pub rt: Option<Value>,
    pub pop: Option<Value>,
    pub tempmin: Option<Value>,
    pub tempmed: Option<Value>,
    pub tempmax: Option<Value>,
    pub umidmin: Option<Value>,
    pub umidmed: Option<Value>,
    pub umidmax: Option<Value>,
    pub receptivo: Option<Value>,
    pub transmissao: Option<Value>,
    pub notif_accum_year: Option<Value>,
}

/// Ordinal risk classification computed upstream (1 = lowest, 4 = highest).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, strum::Display)]
pub enum AlertLevel {
    #[strum(serialize = "verde")]
    Green,
    #[strum(serialize = "amarelo")]
    Yellow,
    #[strum(serialize = "laranja")]
    Orange,
    #[strum(serialize = "vermelho")]
    Red,
    #[default]
    #[strum(serialize = "desconhecido")]
    Unknown,
}

impl AlertLevel {
    #[must_use]
    pub const fn from_level(level: Option<i64>) -> Self {
        match level {
            Some(1) => Self::Green,
            Some(2) => Self::Yellow,
            Some(3) => Self::Orange,
            Some(4) => Self::Red,
            _ => Self::Unknown,
        }
    }

    #[must_use]
    pub const fn level(self) -> Option<u8> {
        match self {
            Self::Green => Some(1),
            Self::Yellow => Some(2),
            Self::Orange => Some(3),
            Self::Red => Some(4),
            Self::Unknown => None,
        }
    }
}

impl Serialize for AlertLevel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.level() {
            Some(l) => serializer.serialize_some(&l),
            None => serializer.serialize_none(),
        }
    }
}

/// One city's indicators for one epidemiological week.
///
/// Serializes with the collection's field names so derived series keep the
/// shape the presentation layer reads.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CityWeekRecord {
    pub city: String,
    pub geocode: u32,
    #[serde(rename = "casos")]
    pub cases: Option<u64>,
    #[serde(rename = "casprov")]
    pub estimated_cases: Option<f64>,
    #[serde(rename = "p_rt1")]
    pub rt_probability: Option<f64>,
    #[serde(rename = "p_inc100k")]
    pub incidence_per_100k: Option<f64>,
    #[serde(rename = "nivel")]
    pub alert_level: AlertLevel,
    #[serde(rename = "nivel_inc")]
    pub incidence_alert_level: AlertLevel,
    #[serde(rename = "Rt")]
    pub rt: Option<f64>,
    #[serde(rename = "pop")]
    pub population: Option<u64>,
    #[serde(flatten)]
    pub climate: Climate,
    #[serde(rename = "receptivo")]
    pub receptivity: Option<i64>,
    #[serde(rename = "transmissao")]
    pub transmission: Option<i64>,
    #[serde(rename = "notif_accum_year")]
    pub notifications_year_to_date: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Climate {
    #[serde(rename = "tempmin")]
    pub temp_min: Option<f64>,
    #[serde(rename = "tempmed")]
    pub temp_med: Option<f64>,
    #[serde(rename = "tempmax")]
    pub temp_max: Option<f64>,
    #[serde(rename = "umidmin")]
    pub humidity_min: Option<f64>,
    #[serde(rename = "umidmed")]
    pub humidity_med: Option<f64>,
    #[serde(rename = "umidmax")]
    pub humidity_max: Option<f64>,
}

/// State-wide totals for one week plus every city's record for that week.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StateWeekDocument {
    #[serde(rename = "SE")]
    pub week: EpiWeek,
    pub total_week_cases: Option<u64>,
    #[serde(rename = "total_pop")]
    pub total_population: Option<u64>,
    pub cities_in_alert_state: Option<u32>,
    #[serde(rename = "total_notif_accum_year")]
    pub total_notifications_year_to_date: Option<u64>,
    pub cities: Vec<CityWeekRecord>,
}

/// Historical projection of a [`StateWeekDocument`] without the city array.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StateWeekSummary {
    #[serde(rename = "SE")]
    pub week: EpiWeek,
    pub total_week_cases: Option<u64>,
    pub cities_in_alert_state: Option<u32>,
    #[serde(rename = "total_notif_accum_year")]
    pub total_notifications_year_to_date: Option<u64>,
}

impl From<&StateWeekDocument> for StateWeekSummary {
    fn from(doc: &StateWeekDocument) -> Self {
        Self {
            week: doc.week,
            total_week_cases: doc.total_week_cases,
            cities_in_alert_state: doc.cities_in_alert_state,
            total_notifications_year_to_date: doc.total_notifications_year_to_date,
        }
    }
}

/// Latest week in full detail plus the slim history, ascending by week.
///
/// Serializes as `[latest, ...history]`: the latest week appears twice, once
/// with its city array and once as a slim history entry.
#[derive(Debug, Clone, PartialEq)]
pub struct StateSeries {
    pub latest: StateWeekDocument,
    pub history: Vec<StateWeekSummary>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum StateSeriesEntry<'a> {
    Detailed(&'a StateWeekDocument),
    Summary(&'a StateWeekSummary),
}

impl Serialize for StateSeries {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(
            std::iter::once(StateSeriesEntry::Detailed(&self.latest))
                .chain(self.history.iter().map(StateSeriesEntry::Summary)),
        )
    }
}

/// One week of a city's history.
#[derive(Debug, Clone, PartialEq)]
pub struct CityWeekEntry {
    pub week: EpiWeek,
    pub record: CityWeekRecord,
}

impl Serialize for CityWeekEntry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let r = &self.record;
        let c = &r.climate;
        let mut s = serializer.serialize_struct("CityWeekEntry", 17)?;
        s.serialize_field("SE", &self.week)?;
        s.serialize_field("casos", &r.cases)?;
        s.serialize_field("p_rt1", &r.rt_probability)?;
        s.serialize_field("p_inc100k", &r.incidence_per_100k)?;
        s.serialize_field("nivel", &r.alert_level)?;
        s.serialize_field("nivel_inc", &r.incidence_alert_level)?;
        s.serialize_field("Rt", &r.rt)?;
        s.serialize_field("pop", &r.population)?;
        s.serialize_field("tempmin", &c.temp_min)?;
        s.serialize_field("tempmed", &c.temp_med)?;
        s.serialize_field("tempmax", &c.temp_max)?;
        s.serialize_field("umidmin", &c.humidity_min)?;
        s.serialize_field("umidmed", &c.humidity_med)?;
        s.serialize_field("umidmax", &c.humidity_max)?;
        s.serialize_field("receptivo", &r.receptivity)?;
        s.serialize_field("transmissao", &r.transmission)?;
        s.serialize_field("notif_accum_year", &r.notifications_year_to_date)?;
        s.end()
    }
}

/// A city's records across every week it appears in, ascending by week.
///
/// The summary fields mirror the most recent week.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CitySeries {
    pub city: String,
    pub geocode: u32,
    #[serde(rename = "casos")]
    pub cases: Option<u64>,
    #[serde(rename = "nivel")]
    pub alert_level: AlertLevel,
    #[serde(rename = "p_inc100k")]
    pub incidence_per_100k: Option<f64>,
    pub data: Vec<CityWeekEntry>,
}

/// Number of cities in alert, or `N/A` when no state data is loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertCount {
    Count(u32),
    NotAvailable,
}

impl std::fmt::Display for AlertCount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Count(n) => write!(f, "{}", crate::util::format_int(*n)),
            Self::NotAvailable => write!(f, "N/A"),
        }
    }
}

impl Serialize for AlertCount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Count(n) => serializer.serialize_u32(*n),
            Self::NotAvailable => serializer.serialize_str("N/A"),
        }
    }
}

/// Headline indicators for either the state or a selected city.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KpiSet {
    pub last_week_cases: u64,
    #[serde(rename = "last4WeeksCases")]
    pub last_4_weeks_cases: u64,
    pub year_to_date_cases: u64,
    pub cities_in_alert_state: AlertCount,
    #[serde(rename = "asOfSE")]
    pub as_of_week: EpiWeek,
    /// `dd/mm/yyyy` Monday of `as_of_week`.
    pub as_of_date: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct KpiRow {
    #[serde(rename = "Indicator")]
    #[tabled(rename = "Indicator")]
    pub indicator: String,
    #[serde(rename = "Value")]
    #[tabled(rename = "Value")]
    pub value: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct StateHistoryRow {
    #[serde(rename = "SE")]
    #[tabled(rename = "SE")]
    pub week: u32,
    #[serde(rename = "WeekStart")]
    #[tabled(rename = "WeekStart")]
    pub week_start: String,
    #[serde(rename = "TotalWeekCases")]
    #[tabled(rename = "TotalWeekCases")]
    pub total_week_cases: String,
    #[serde(rename = "CitiesInAlert")]
    #[tabled(rename = "CitiesInAlert")]
    pub cities_in_alert: String,
    #[serde(rename = "NotifAccumYear")]
    #[tabled(rename = "NotifAccumYear")]
    pub notifications_year_to_date: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct CityHistoryRow {
    #[serde(rename = "SE")]
    #[tabled(rename = "SE")]
    pub week: u32,
    #[serde(rename = "Cases")]
    #[tabled(rename = "Cases")]
    pub cases: String,
    #[serde(rename = "Per100k")]
    #[tabled(rename = "Per100k")]
    pub incidence_per_100k: String,
    #[serde(rename = "AlertLevel")]
    #[tabled(rename = "AlertLevel")]
    pub alert_level: String,
    #[serde(rename = "Rt")]
    #[tabled(rename = "Rt")]
    pub rt: String,
    #[serde(rename = "TempMed")]
    #[tabled(rename = "TempMed")]
    pub temp_med: String,
    #[serde(rename = "HumidityMed")]
    #[tabled(rename = "HumidityMed")]
    pub humidity_med: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct TopCityRow {
    #[serde(rename = "Rank")]
    #[tabled(rename = "Rank")]
    pub rank: usize,
    #[serde(rename = "City")]
    #[tabled(rename = "City")]
    pub city: String,
    #[serde(rename = "Geocode")]
    #[tabled(rename = "Geocode")]
    pub geocode: u32,
    #[serde(rename = "Value")]
    #[tabled(rename = "Value")]
    pub value: String,
    #[serde(rename = "AlertLevel")]
    #[tabled(rename = "AlertLevel")]
    pub alert_level: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct MapRow {
    #[serde(rename = "Geocode")]
    #[tabled(rename = "Geocode")]
    pub geocode: u32,
    #[serde(rename = "City")]
    #[tabled(rename = "City")]
    pub city: String,
    #[serde(rename = "Value")]
    #[tabled(rename = "Value")]
    pub value: String,
    #[serde(rename = "Fill")]
    #[tabled(rename = "Fill")]
    pub fill: String,
}
