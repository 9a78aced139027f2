pub mod models {
    pub mod open_meteo;
    pub mod weather;
}

pub mod client;
pub mod config;
pub mod registry;
pub mod report;
pub mod store {
    pub mod kv;
    pub mod records;
}
pub mod utils;
pub mod services {
    pub mod aggregate;
    pub mod chart;
    pub mod fake_data;
    pub mod fetch;
    pub mod refresh;
    pub mod search;
}

use crate::client::{OpenMeteoClient, WeatherApi};
use crate::config::Config;
use crate::models::weather::{DashboardMode, DateWindow, ForecastRange, MAX_WINDOW_DAYS, MIN_WINDOW_DAYS};
use crate::registry::{AddOutcome, CityRegistry};
use crate::services::chart::ChartMode;
use crate::services::fake_data::FakeWeather;
use crate::services::fetch::ValidationError;
use crate::services::refresh::{self, FetchRequest};
use crate::services::{aggregate, chart, search};
use crate::store::kv::FileStore;
use crate::store::records;
use clap::{Parser, Subcommand};
use log::{error, info, warn};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "weather-compare",
    version,
    about = "Compare forecast and historical weather across cities"
)]
struct Cli {
    /// Load environment variables from this file instead of ./.env
    #[arg(long, global = true, value_name = "PATH")]
    env_file: Option<PathBuf>,

    /// Operate on the historical dashboard instead of the forecast one
    #[arg(long, global = true)]
    historical: bool,

    /// Serve synthetic weather instead of calling Open-Meteo
    #[arg(long, global = true)]
    offline: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Look up cities by name
    Search {
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,
    },

    /// Search and track a city, then fetch its weather
    Add {
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,

        /// Which search result to add (1-based)
        #[arg(long, default_value_t = 1)]
        pick: usize,
    },

    /// Stop tracking a city, by list position or id
    Remove { city: String },

    /// Stop tracking every city
    Clear,

    /// Show tracked cities and their cached weather
    List,

    /// Re-fetch weather for every tracked city
    Refresh,

    /// Set the forecast horizon
    Range {
        #[arg(value_parser = clap::value_parser!(u8).range(7..=14))]
        days: u8,
    },

    /// Show or set the historical date window
    Window {
        /// First day, DD/MM/YYYY
        #[arg(long)]
        start: Option<String>,

        /// Number of days (1-365)
        #[arg(long, allow_negative_numbers = true)]
        days: Option<i64>,
    },

    /// Cross-city summary cards
    Summary {
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Line-chart dataset as JSON
    Chart {
        #[arg(long, value_enum, default_value_t = ChartMode::Max)]
        mode: ChartMode,
    },
}

struct Context {
    cfg: Config,
    mode: DashboardMode,
    store: FileStore,
    api: Box<dyn WeatherApi>,
}

impl Context {
    fn registry(&self) -> CityRegistry<FileStore> {
        CityRegistry::load(self.store.clone(), self.mode)
    }

    /// Fetch request for the dashboard's current range/window selection.
    fn fetch_request(&self) -> FetchRequest {
        match self.mode {
            DashboardMode::Forecast => FetchRequest::Forecast,
            DashboardMode::Historical => {
                let today = utils::today();
                FetchRequest::Historical {
                    window: records::load_date_window(&self.store, today),
                    today,
                }
            }
        }
    }

    /// Days shown by `list`, `summary` and `chart`.
    fn horizon(&self) -> Option<usize> {
        match self.mode {
            DashboardMode::Forecast => Some(records::load_forecast_range(&self.store).days()),
            DashboardMode::Historical => None,
        }
    }
}

fn run_search(ctx: &Context, query: &[String]) -> Result<Vec<models::open_meteo::GeocodingResult>, String> {
    search::search_cities(&*ctx.api, &query.join(" "), ctx.cfg.search_max_results).map_err(|e| e.to_string())
}

fn set_window(ctx: &Context, start: Option<String>, days: Option<i64>) -> Result<(), String> {
    let today = utils::today();
    let mut window = records::load_date_window(&ctx.store, today);

    if let Some(text) = start {
        window.start = utils::parse_display_date(&text).ok_or_else(|| ValidationError::InvalidDate(text).to_string())?;
    }
    if let Some(requested) = days {
        let clamped = requested.clamp(i64::from(MIN_WINDOW_DAYS), i64::from(MAX_WINDOW_DAYS));
        if clamped != requested {
            println!("{}; using {} day(s)", ValidationError::DayCountOutOfRange(requested), clamped);
        }
        window.num_days = clamped as u32;
    }
    services::fetch::validate_window(&window, today).map_err(|e| e.to_string())?;

    let mut store = ctx.store.clone();
    records::save_date_window(&mut store, window);
    print_window(window);
    Ok(())
}

fn print_window(window: DateWindow) {
    println!(
        "Window: {} day(s) from {} ({})",
        window.num_days,
        utils::display_date(window.start),
        utils::window_preview(window.start, window.end())
    );
}

fn run(cli: Cli, cfg: Config) -> Result<(), String> {
    let mode = if cli.historical {
        DashboardMode::Historical
    } else {
        DashboardMode::Forecast
    };
    let api: Box<dyn WeatherApi> = if cli.offline || cfg.offline {
        info!("Offline mode: serving synthetic weather");
        Box::new(FakeWeather::new(utils::today()))
    } else {
        Box::new(OpenMeteoClient::new(&cfg))
    };
    let ctx = Context {
        store: FileStore::new(cfg.data_dir.clone()),
        cfg,
        mode,
        api,
    };
    info!("Dashboard: {} (store {})", ctx.mode, ctx.store.dir().display());

    match cli.command {
        Command::Search { query } => {
            print!("{}", report::search_results(&run_search(&ctx, &query)?));
        }
        Command::Add { query, pick } => {
            let candidates = run_search(&ctx, &query)?;
            let candidate = pick
                .checked_sub(1)
                .and_then(|i| candidates.get(i))
                .ok_or_else(|| format!("no search result #{} for {:?}", pick, query.join(" ")))?;
            let mut registry = ctx.registry();
            match registry.add(candidate) {
                AddOutcome::Duplicate(name) => println!("{} is already in your list", name),
                AddOutcome::Added(id) => {
                    println!("Added {}", candidate.name);
                    match refresh::refresh_city(&mut registry, &*ctx.api, &ctx.fetch_request(), &id) {
                        Ok(true) => {}
                        Ok(false) => println!("Could not load weather for {}", candidate.name),
                        Err(e) => println!("Weather not loaded: {}", e),
                    }
                }
            }
        }
        Command::Remove { city } => {
            let mut registry = ctx.registry();
            match registry.remove_by_reference(&city) {
                Some(removed) => println!("Removed {}", removed.name),
                None => println!("No tracked city matches {:?}", city),
            }
        }
        Command::Clear => {
            let count = ctx.registry().clear();
            println!("Removed {} city(ies)", count);
        }
        Command::List => {
            let registry = ctx.registry();
            let days = ctx.horizon().unwrap_or(usize::MAX);
            print!("{}", report::city_list(registry.list(), ctx.mode, days));
        }
        Command::Refresh => {
            let mut registry = ctx.registry();
            let summary =
                refresh::refresh_all(&mut registry, &*ctx.api, &ctx.fetch_request()).map_err(|e| e.to_string())?;
            if summary.failed > 0 {
                println!("Failed to update {} city(ies)", summary.failed);
            } else {
                println!("Updated {} city(ies)", summary.attempted);
            }
        }
        Command::Range { days } => {
            if ctx.mode != DashboardMode::Forecast {
                return Err("`range` applies to the forecast dashboard; use `window` with --historical".into());
            }
            let range = ForecastRange::from_days(i64::from(days)).ok_or_else(|| "range must be 7 or 14".to_string())?;
            let mut store = ctx.store.clone();
            records::save_forecast_range(&mut store, range);
            println!("Forecast range: {} days", range.days());
        }
        Command::Window { start, days } => {
            if ctx.mode != DashboardMode::Historical {
                return Err("`window` applies to the historical dashboard; pass --historical".into());
            }
            if start.is_none() && days.is_none() {
                print_window(records::load_date_window(&ctx.store, utils::today()));
            } else {
                set_window(&ctx, start, days)?;
            }
        }
        Command::Summary { json } => {
            let registry = ctx.registry();
            let summary = aggregate::build_summary(registry.list(), ctx.mode, ctx.horizon());
            if json {
                let text = serde_json::to_string_pretty(&summary).map_err(|e| format!("encode summary: {}", e))?;
                println!("{}", text);
            } else {
                print!("{}", report::summary(&summary));
            }
        }
        Command::Chart { mode } => {
            let registry = ctx.registry();
            match chart::build(registry.list(), mode, ctx.mode, ctx.horizon()) {
                Some(dataset) => {
                    let text =
                        serde_json::to_string_pretty(&dataset).map_err(|e| format!("encode chart: {}", e))?;
                    println!("{}", text);
                }
                None => {
                    warn!("Chart: no city has weather data yet");
                    println!("No chart data yet");
                }
            }
        }
    }

    Ok(())
}

fn main() {
    let cli = Cli::parse();

    let loaded_env = match config::load_env(cli.env_file.as_deref()) {
        Ok(info) => info,
        Err(err) => {
            eprintln!("fatal: {}", err);
            std::process::exit(1);
        }
    };

    // Init logging after environment so RUST_LOG from .env is respected.
    let default_filter = env_logger::Env::default().default_filter_or("info");
    env_logger::Builder::from_env(default_filter)
        .format_timestamp_secs()
        .init();

    if let Some(info) = loaded_env.as_ref() {
        let origin = if info.explicit { "CLI-specified" } else { "default" };
        info!("Environment loaded from {} .env file: {}", origin, info.path.display());
    }

    info!(
        "weather-compare {} (git {}) starting",
        env!("CARGO_PKG_VERSION"),
        env!("BUILD_TIME_GIT_HASH")
    );

    let result = Config::from_env().and_then(|cfg| run(cli, cfg));
    if let Err(e) = result {
        error!("fatal: {}", e);
        std::process::exit(1);
    }
}
