use crate::error::{DashboardError, Result};
use crate::types::{AlertLevel, CityWeekRecord, Climate, RawCityWeek, RawStateWeek, StateWeekDocument};
use crate::util::{value_as_count, value_as_f64, value_as_i64, value_as_string};
use crate::week::EpiWeek;
use serde_json::Value;
use std::collections::HashSet;
use std::path::Path;

/// How the loader treats records that fail validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Validation {
    /// Skip the record, count it in [`LoadReport`] and keep going.
    #[default]
    Lenient,
    /// Fail the whole load on the first malformed record.
    Strict,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub total_documents: usize,
    pub loaded_documents: usize,
    pub skipped_documents: usize,
    pub total_city_records: usize,
    pub skipped_city_records: usize,
    pub duplicate_weeks: usize,
}

pub fn load_state_weeks(
    path: &Path,
    validation: Validation,
) -> Result<(Vec<StateWeekDocument>, LoadReport)> {
    let text = std::fs::read_to_string(path)?;
    log::debug!("Read {} bytes from {}", text.len(), path.display());
    parse_state_weeks(&text, validation)
}

/// Parse an export of the weekly collection.
///
/// Accepts either a JSON array of documents or JSON Lines (one document per
/// line, as written by `mongoexport`).
pub fn parse_state_weeks(
    text: &str,
    validation: Validation,
) -> Result<(Vec<StateWeekDocument>, LoadReport)> {
    let raw: Vec<RawStateWeek> = if text.trim_start().starts_with('[') {
        serde_json::from_str(text)?
    } else {
        text.lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str::<RawStateWeek>(line))
            .collect::<std::result::Result<_, _>>()?
    };

    let mut report = LoadReport {
        total_documents: raw.len(),
        ..LoadReport::default()
    };
    let mut seen_weeks: HashSet<EpiWeek> = HashSet::new();
    let mut documents: Vec<StateWeekDocument> = Vec::with_capacity(raw.len());

    for (idx, doc) in raw.into_iter().enumerate() {
        report.total_city_records += doc.cities.as_ref().map_or(0, Vec::len);

        let week = match parse_week(doc.se.as_ref()) {
            Ok(w) => w,
            Err(e) => match validation {
                Validation::Strict => {
                    return Err(DashboardError::malformed(format!("document {idx}"), e.to_string()))
                }
                Validation::Lenient => {
                    log::warn!("Skipping document {idx}: {e}");
                    report.skipped_documents += 1;
                    continue;
                }
            },
        };

        let mut cities = Vec::new();
        for (city_idx, raw_city) in doc.cities.unwrap_or_default().into_iter().enumerate() {
            match validate_city(raw_city) {
                Ok(c) => cities.push(c),
                Err(reason) => {
                    let context = format!("SE {week}, city record {city_idx}");
                    if validation == Validation::Strict {
                        return Err(DashboardError::malformed(context, reason));
                    }
                    log::warn!("Skipping {context}: {reason}");
                    report.skipped_city_records += 1;
                }
            }
        }

        if !seen_weeks.insert(week) {
            report.duplicate_weeks += 1;
            log::debug!("SE {week} appears more than once");
        }

        documents.push(StateWeekDocument {
            week,
            total_week_cases: value_as_count(doc.total_week_cases.as_ref()),
            total_population: value_as_count(doc.total_pop.as_ref()),
            cities_in_alert_state: value_as_count(doc.cities_in_alert_state.as_ref())
                .and_then(|n| u32::try_from(n).ok()),
            total_notifications_year_to_date: value_as_count(doc.total_notif_accum_year.as_ref()),
            cities,
        });
    }

    report.loaded_documents = documents.len();
    log::debug!("Loaded {report:?}");
    Ok((documents, report))
}

fn parse_week(v: Option<&Value>) -> Result<EpiWeek> {
    match v {
        Some(Value::String(s)) => s.parse(),
        other => {
            let code = value_as_i64(other)
                .ok_or_else(|| DashboardError::malformed("SE", "missing or not numeric"))?;
            let code = u32::try_from(code)
                .map_err(|_| DashboardError::malformed("SE", format!("{code} out of range")))?;
            EpiWeek::from_code(code)
        }
    }
}

fn validate_city(raw: RawCityWeek) -> std::result::Result<CityWeekRecord, String> {
    let city = value_as_string(raw.city.as_ref()).ok_or("missing city name")?;
    let geocode = value_as_i64(raw.geocode.as_ref())
        .and_then(|g| u32::try_from(g).ok())
        .filter(|g| *g > 0)
        .ok_or_else(|| format!("missing or invalid geocode for '{city}'"))?;

    Ok(CityWeekRecord {
        city,
        geocode,
        cases: value_as_count(raw.casos.as_ref()),
        estimated_cases: value_as_f64(raw.casprov.as_ref()),
        rt_probability: value_as_f64(raw.p_rt1.as_ref()),
        incidence_per_100k: value_as_f64(raw.p_inc100k.as_ref()),
        alert_level: AlertLevel::from_level(value_as_i64(raw.nivel.as_ref())),
        incidence_alert_level: AlertLevel::from_level(value_as_i64(raw.nivel_inc.as_ref())),
        rt: value_as_f64(raw.rt.as_ref()),
        population: value_as_count(raw.pop.as_ref()),
        climate: Climate {
            temp_min: value_as_f64(raw.tempmin.as_ref()),
            temp_med: value_as_f64(raw.tempmed.as_ref()),
            temp_max: value_as_f64(raw.tempmax.as_ref()),
            humidity_min: value_as_f64(raw.umidmin.as_ref()),
            humidity_med: value_as_f64(raw.umidmed.as_ref()),
            humidity_max: value_as_f64(raw.umidmax.as_ref()),
        },
        receptivity: value_as_i64(raw.receptivo.as_ref()),
        transmission: value_as_i64(raw.transmissao.as_ref()),
        notifications_year_to_date: value_as_count(raw.notif_accum_year.as_ref()),
    })
}
