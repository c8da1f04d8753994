use anyhow::{bail, Context, Result};
use rusqlite::Connection;
use std::env;
use std::path::Path;

// Use library instead of local modules
use asi_dashboard::{import_reference_csvs, setup_database, AppConfig, Dataset};

fn main() -> Result<()> {
    asi_dashboard::init_logging();

    let args: Vec<String> = env::args().collect();

    match args.get(1).map(String::as_str) {
        Some("import") => {
            let (Some(csv_dir), Some(db_path)) = (args.get(2), args.get(3)) else {
                bail!("usage: asi import <csv-dir> <db-path>");
            };
            run_import(Path::new(csv_dir), Path::new(db_path))?;
        }
        Some("inspect") => run_inspect()?,
        _ => {
            println!("ASI Dashboard v{}", asi_dashboard::VERSION);
            println!();
            println!("Usage:");
            println!("  asi import <csv-dir> <db-path>   Load asi_fact/indicator/nic/state/sector CSVs into SQLite");
            println!("  asi inspect                      Load tables from the environment config and summarise");
            println!("  asi-server                       Run the dashboard");
        }
    }

    Ok(())
}

fn run_import(csv_dir: &Path, db_path: &Path) -> Result<()> {
    println!("🗄️  ASI Import - CSV → SQLite");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    println!("\n🔧 Setting up database...");
    let conn = Connection::open(db_path)
        .with_context(|| format!("Failed to open database {}", db_path.display()))?;
    setup_database(&conn)?;
    println!("✓ Database initialized with WAL mode");

    println!("\n📂 Importing CSVs from {}...", csv_dir.display());
    let summary = import_reference_csvs(&conn, csv_dir)?;
    for table in &summary {
        println!(
            "✓ {:<10} {} inserted, {} duplicates skipped",
            table.table, table.inserted, table.duplicates
        );
    }

    println!("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("✅ Import complete: {}", db_path.display());

    Ok(())
}

fn run_inspect() -> Result<()> {
    let config = AppConfig::from_env()?;

    println!("📊 Loading tables...");
    let conn = Connection::open(&config.database_path)
        .with_context(|| format!("Failed to open database {}", config.database_path.display()))?;
    let dataset = Dataset::load(&conn, &config.indicator_csv)?;
    let options = dataset.dropdown_options();

    println!("✓ Fact rows:            {}", dataset.len());
    println!("✓ Indicator units:      {}", dataset.unit_count());
    println!("✓ Indicators:           {}", options.indicators.len());
    println!("✓ States:               {}", options.states.len());
    println!("✓ Sectors:              {}", options.sectors.len());
    println!("✓ Classification years: {:?}", options.classification_years);

    let missing: Vec<&String> = options
        .indicators
        .iter()
        .filter(|i| dataset.unit_for(i).is_none())
        .collect();
    if !missing.is_empty() {
        println!("⚠️  Indicators without a unit: {:?}", missing);
    }

    Ok(())
}
