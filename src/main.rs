// Entry point and high-level CLI flow.
//
// With a subcommand the binary prints one view and exports it; without one it
// enters the menu loop:
// - [1] loads the weekly export and builds the state series,
// - [2] prints state indicators and exports the history,
// - [3] selects a city and prints its indicators,
// - [4] clears the selection,
// - [5] exits.
// A failed action is reported and the menu keeps running.
use clap::{Parser, Subcommand};
use dengue_mg::config::{slug, Config, DATA_PATH_ENV, DEFAULT_DATA_PATH, OUT_DIR_ENV};
use dengue_mg::loader::Validation;
use dengue_mg::output;
use dengue_mg::reports::{self, MapLayer, RankingMetric};
use dengue_mg::session::Dashboard;
use dengue_mg::source::WeekSource;
use dengue_mg::util::format_int;
use dengue_mg::DashboardError;
use std::error::Error;
use std::io::{self, Write};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "dengue_mg",
    about = "Dengue indicators for Minas Gerais from weekly state documents"
)]
struct Cli {
    /// Export of the weekly state collection (JSON array or JSON Lines)
    #[arg(long, env = DATA_PATH_ENV, default_value = DEFAULT_DATA_PATH)]
    data: PathBuf,

    /// Directory for CSV/JSON outputs
    #[arg(long, env = OUT_DIR_ENV, default_value = ".")]
    out_dir: PathBuf,

    /// Fail on the first malformed record instead of skipping it
    #[arg(long)]
    strict: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// State indicators and weekly history
    State,
    /// Indicators and history of one city (partial, case-insensitive name)
    City { name: String },
    /// Cities of the latest week ranked by cases or incidence
    Top {
        /// `cases` or `per100k`
        #[arg(long, default_value_t = RankingMetric::Cases)]
        metric: RankingMetric,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// City names of the latest week containing QUERY
    Search { query: String },
    /// State weekly cases laid out per year
    Curves,
    /// Latest-week value of one map layer per municipality, keyed by geocode
    Map {
        /// `casos`, `nivel` or `incidencia`
        #[arg(long, default_value_t = MapLayer::Cases)]
        layer: MapLayer,
    },
}

impl Cli {
    fn config(&self) -> Config {
        Config {
            data_path: self.data.clone(),
            out_dir: self.out_dir.clone(),
            validation: if self.strict {
                Validation::Strict
            } else {
                Validation::Lenient
            },
            ..Config::default()
        }
    }
}

/// Print the placeholder for "nothing to show" errors; propagate the rest.
fn or_placeholder<T>(result: Result<T, DashboardError>) -> Result<Option<T>, DashboardError> {
    match result {
        Ok(v) => Ok(Some(v)),
        Err(e) if e.is_no_data() => {
            println!("No data yet: {e}\n");
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

fn print_kpis<S: WeekSource>(dash: &Dashboard<S>, config: &Config) -> Result<(), DashboardError> {
    let Some((kind, kpis)) = or_placeholder(dash.kpis())? else {
        return Ok(());
    };
    let title = match dash.city_series() {
        Some(city) => format!("Indicadores de {}", city.city),
        None => "Indicadores de Minas Gerais".to_string(),
    };
    let rows = reports::kpi_rows(&kpis, kind);
    output::preview_table(&title, None, &rows, rows.len());
    output::write_json(&config.output_path("kpis.json"), &kpis)?;
    Ok(())
}

fn handle_state<S: WeekSource>(dash: &Dashboard<S>, config: &Config) -> Result<(), DashboardError> {
    let Some(state) = dash.state() else {
        println!("Error: No data loaded. Please load the file first (option 1).\n");
        return Ok(());
    };
    print_kpis(dash, config)?;

    let rows = reports::state_history_rows(state);
    let file = config.output_path("state_history.csv");
    output::write_csv(&file, &rows)?;
    output::write_json(&config.output_path("state_series.json"), state)?;
    let recent: Vec<_> = rows.iter().rev().cloned().collect();
    output::preview_table(
        "State weekly history",
        Some("most recent first"),
        &recent,
        config.preview_rows,
    );
    println!("(Full table exported to {})\n", file.display());
    Ok(())
}

fn handle_city<S: WeekSource>(
    dash: &mut Dashboard<S>,
    config: &Config,
    name: &str,
) -> Result<(), DashboardError> {
    let Some(series) = or_placeholder(dash.load_city(name))? else {
        return Ok(());
    };
    let rows = reports::city_history_rows(series);
    let file = config.output_path(&format!("city_{}_history.csv", slug(&series.city)));
    output::write_csv(&file, &rows)?;
    output::write_json(&config.output_path("city_series.json"), series)?;

    print_kpis(dash, config)?;
    let recent: Vec<_> = rows.iter().rev().cloned().collect();
    output::preview_table("City weekly history", Some("most recent first"), &recent, config.preview_rows);
    println!("(Full table exported to {})\n", file.display());
    Ok(())
}

fn handle_top<S: WeekSource>(
    dash: &Dashboard<S>,
    config: &Config,
    metric: RankingMetric,
    limit: usize,
) -> Result<(), DashboardError> {
    let Some(state) = dash.state() else {
        return Ok(());
    };
    let rows = reports::top_cities(&state.latest, metric, limit);
    let file = config.output_path(&format!("top_cities_{metric}.csv"));
    output::write_csv(&file, &rows)?;
    output::preview_table(
        &format!("Top {limit} cities by {metric}"),
        Some(format!("SE {}", state.latest.week).as_str()),
        &rows,
        limit,
    );
    Ok(())
}

fn handle_curves<S: WeekSource>(dash: &Dashboard<S>, config: &Config) -> Result<(), DashboardError> {
    let Some(state) = dash.state() else {
        return Ok(());
    };
    let curves = reports::yearly_curves(&state.history);
    let width = curves.iter().map(|c| c.weeks.len()).max().unwrap_or(0);
    let header: Vec<String> = std::iter::once("Year".to_string())
        .chain((1..=width).map(|w| format!("W{w}")))
        .collect();
    let file = config.output_path("yearly_curves.csv");
    output::write_csv_records(&file, &header, curves.iter().map(reports::curve_cells))?;
    for curve in &curves {
        let total: u64 = curve.weeks.iter().flatten().sum();
        let reported = curve.weeks.iter().flatten().count();
        println!(
            "{}: {} cases over {} reported weeks",
            curve.year,
            format_int(total),
            reported
        );
    }
    println!("(Curves exported to {})\n", file.display());
    Ok(())
}

fn handle_map<S: WeekSource>(
    dash: &Dashboard<S>,
    config: &Config,
    layer: MapLayer,
) -> Result<(), DashboardError> {
    let Some(state) = dash.state() else {
        return Ok(());
    };
    let rows = reports::map_rows(&state.latest, layer);
    let file = config.output_path(&format!("map_{layer}.csv"));
    output::write_csv(&file, &rows)?;
    output::preview_table(
        &format!("Map layer {layer}"),
        Some(format!("SE {}, {} municipalities", state.latest.week, rows.len()).as_str()),
        &rows,
        config.preview_rows,
    );
    println!("(Full table exported to {})\n", file.display());
    Ok(())
}

/// Read a single line of input after printing `prompt`.
fn read_line(prompt: &str) -> String {
    print!("{prompt}");
    let _ = io::stdout().flush();
    let mut buf = String::new();
    io::stdin().read_line(&mut buf).ok();
    buf.trim().to_string()
}

/// Handle option [1]: load the export and build the state series.
fn handle_load<S: WeekSource>(dash: &mut Dashboard<S>) {
    let latest = match dash.refresh_state() {
        Ok(state) => state.latest.week,
        Err(e) => {
            eprintln!("Failed to load file: {e}\n");
            return;
        }
    };
    if let Some(report) = dash.load_report() {
        println!(
            "Processing dataset... ({} documents loaded, {} city records)",
            format_int(report.loaded_documents),
            format_int(report.total_city_records)
        );
        if report.skipped_documents + report.skipped_city_records > 0 {
            println!(
                "Note: {} documents and {} city records skipped due to validation errors.",
                format_int(report.skipped_documents),
                format_int(report.skipped_city_records)
            );
        }
        if report.duplicate_weeks > 0 {
            println!(
                "Info: {} repeated weeks ignored.",
                format_int(report.duplicate_weeks)
            );
        }
    }
    println!("Latest week: SE {latest}\n");
}

/// Print a failed menu action; the menu carries on.
fn report_failure(result: Result<(), DashboardError>) {
    if let Err(e) = result {
        eprintln!("Error: {e}\n");
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MenuFlow {
    Continue,
    Exit,
}

/// Run one menu choice. `prompt` supplies follow-up input (the city name).
fn menu_step<S, P>(dash: &mut Dashboard<S>, config: &Config, choice: &str, mut prompt: P) -> MenuFlow
where
    S: WeekSource,
    P: FnMut(&str) -> String,
{
    match choice {
        "1" => handle_load(dash),
        "2" => {
            println!();
            report_failure(handle_state(dash, config));
        }
        "3" => {
            let name = prompt("City name: ");
            if let Some(state) = dash.state() {
                let suggestions = reports::city_suggestions(&state.latest, &name);
                if suggestions.len() > 1 {
                    println!("Matches: {}", suggestions.join(", "));
                }
            }
            report_failure(handle_city(dash, config, &name));
        }
        "4" => {
            dash.select_city(None);
            println!("Selection cleared.\n");
        }
        "5" => {
            println!("Exiting the program.");
            return MenuFlow::Exit;
        }
        _ => println!("Invalid choice. Please enter 1 to 5.\n"),
    }
    MenuFlow::Continue
}

fn interactive(config: &Config) {
    let mut dash = Dashboard::new(config.source());
    loop {
        println!("Dengue MG indicators");
        if let Some(city) = dash.selected_city() {
            println!("(selected city: {city})");
        }
        println!("[1] Load the file");
        println!("[2] State indicators");
        println!("[3] Select city");
        println!("[4] Clear city selection");
        println!("[5] Exit\n");
        let choice = read_line("Enter choice: ");
        if menu_step(&mut dash, config, &choice, read_line) == MenuFlow::Exit {
            return;
        }
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    pretty_env_logger::init();
    let cli = Cli::parse();
    let config = cli.config();

    config.ensure_out_dir()?;
    let Some(command) = cli.command else {
        interactive(&config);
        return Ok(());
    };

    let mut dash = Dashboard::new(config.source());
    if or_placeholder(dash.refresh_state().map(|_| ()))?.is_none() {
        return Ok(());
    }

    match command {
        Commands::State => handle_state(&dash, &config)?,
        Commands::City { name } => handle_city(&mut dash, &config, &name)?,
        Commands::Top { metric, limit } => {
            handle_top(&dash, &config, metric, limit.unwrap_or(config.top_limit))?;
        }
        Commands::Search { query } => {
            if let Some(state) = dash.state() {
                let names = reports::city_suggestions(&state.latest, &query);
                if names.is_empty() {
                    println!("No cities match '{query}'.");
                }
                for name in names {
                    println!("{name}");
                }
            }
        }
        Commands::Curves => handle_curves(&dash, &config)?,
        Commands::Map { layer } => handle_map(&dash, &config, layer)?,
    }
    Ok(())
}
