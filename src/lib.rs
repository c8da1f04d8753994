// ASI Dashboard - Core Library
// Exposes all modules for use in the CLI, the web server, and tests

pub mod config;
pub mod dataset;
pub mod db;
pub mod engine;
pub mod export;
pub mod filters;
pub mod session;

// Re-export commonly used types
pub use config::{AppConfig, ConfigError, APP_TITLE, PATH_PREFIX};
pub use dataset::{Dataset, DropdownOptions, UnitLookup};
pub use db::{
    FactRow, TableImport,
    setup_database, import_reference_csvs, load_fact_rows,
    load_unit_lookup, load_unit_lookup_from_reader,
};
pub use engine::{render, ChartPoint, ChartSeries, RenderError, NO_DATA_MESSAGE};
pub use export::{export_chart, render_svg, ExportError, EXPORT_FILE_NAME, SVG_CONTENT_TYPE};
pub use filters::{
    classification_label, resolve_financial_years,
    FilterChange, FilterSelection, FinancialYears, SELECT_ALL,
};
pub use session::{step, Event, SessionState, SessionStore, SessionView, Transition};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialise `env_logger`, defaulting to `info` when `RUST_LOG` is unset
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init();
}
