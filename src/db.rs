// 🗄️ Reference Table Loader - SQLite source tables → in-memory snapshot
// One bulk read at startup, never re-queried

use anyhow::{Context, Result};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::Path;

use crate::dataset::UnitLookup;

/// NIC code of the all-industries aggregate; the only code the dashboard charts
pub const AGGREGATE_NIC_CODE: &str = "99999";

/// Join across the fact table and its four dimension tables
pub const FACT_QUERY: &str = "
    SELECT
        af.indicator_code,
        af.state_code,
        af.nic_code,
        af.nic_code_type,
        af.sector_code,
        af.indicator_value,
        af.classification_year,
        af.financial_year,
        i.description AS indicator_description,
        i.unit AS unit_description,
        n.description AS nic_description,
        s.description AS state_description,
        sec.description AS sector_description
    FROM
        asi_fact AS af
    JOIN
        indicator AS i ON af.indicator_code = i.indicator_code
    JOIN
        nic AS n ON af.nic_code = n.nic_code
    JOIN
        state AS s ON af.state_code = s.state_code
    JOIN
        sector AS sec ON af.sector_code = sec.sector_code
    WHERE af.nic_code = ?1
    ORDER BY
        af.financial_year";

// ============================================================================
// FACT ROW
// ============================================================================

/// One joined record: a survey indicator value with its descriptive dimensions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactRow {
    pub indicator_code: String,
    pub state_code: String,
    pub nic_code: String,
    pub nic_code_type: String,
    pub sector_code: String,
    pub indicator_value: f64,
    pub classification_year: i32,
    pub financial_year: String,
    pub indicator_description: String,
    pub unit_description: String,
    pub nic_description: String,
    pub state_description: String,
    pub sector_description: String,
}

// ============================================================================
// CSV RECORDS (raw source tables, used by `asi import`)
// ============================================================================

#[derive(Debug, Deserialize)]
struct FactRecord {
    indicator_code: String,
    state_code: String,
    nic_code: String,
    nic_code_type: String,
    sector_code: String,
    indicator_value: f64,
    classification_year: i32,
    financial_year: String,
}

#[derive(Debug, Deserialize)]
struct IndicatorRecord {
    indicator_code: String,
    description: String,
    unit: String,
}

#[derive(Debug, Deserialize)]
struct NicRecord {
    nic_code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct StateRecord {
    state_code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct SectorRecord {
    sector_code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct UnitRecord {
    description: String,
    unit: String,
}

/// Per-table outcome of a CSV import
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TableImport {
    pub table: String,
    pub inserted: usize,
    pub duplicates: usize,
}

// ============================================================================
// SCHEMA
// ============================================================================

pub fn setup_database(conn: &Connection) -> Result<()> {
    // Enable WAL mode for crash recovery
    conn.pragma_update(None, "journal_mode", "WAL")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS indicator (
            indicator_code TEXT PRIMARY KEY,
            description TEXT NOT NULL,
            unit TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS nic (
            nic_code TEXT PRIMARY KEY,
            description TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS state (
            state_code TEXT PRIMARY KEY,
            description TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS sector (
            sector_code TEXT PRIMARY KEY,
            description TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS asi_fact (
            indicator_code TEXT NOT NULL,
            state_code TEXT NOT NULL,
            nic_code TEXT NOT NULL,
            nic_code_type TEXT NOT NULL,
            sector_code TEXT NOT NULL,
            indicator_value REAL NOT NULL,
            classification_year INTEGER NOT NULL,
            financial_year TEXT NOT NULL,
            PRIMARY KEY (indicator_code, state_code, nic_code, sector_code,
                         classification_year, financial_year)
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_fact_nic ON asi_fact(nic_code)",
        [],
    )?;

    Ok(())
}

// ============================================================================
// IMPORT
// ============================================================================

/// Count a row insert, treating primary-key conflicts as duplicates
fn record_insert(result: rusqlite::Result<usize>, stats: &mut TableImport) -> Result<()> {
    match result {
        Ok(_) => {
            stats.inserted += 1;
            Ok(())
        }
        Err(rusqlite::Error::SqliteFailure(err, _))
            if err.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            stats.duplicates += 1;
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

fn read_records<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let mut rdr = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open CSV file {}", path.display()))?;

    let mut records = Vec::new();
    for (line, result) in rdr.deserialize().enumerate() {
        let record: T = result
            .with_context(|| format!("Failed to deserialize {} record {}", path.display(), line + 1))?;
        records.push(record);
    }

    Ok(records)
}

/// Import the five source tables from `asi_fact.csv`, `indicator.csv`, `nic.csv`,
/// `state.csv` and `sector.csv` inside `dir`
pub fn import_reference_csvs(conn: &Connection, dir: &Path) -> Result<Vec<TableImport>> {
    let mut summary = Vec::new();

    let mut stats = TableImport { table: "indicator".to_string(), ..Default::default() };
    for rec in read_records::<IndicatorRecord>(&dir.join("indicator.csv"))? {
        let result = conn.execute(
            "INSERT INTO indicator (indicator_code, description, unit) VALUES (?1, ?2, ?3)",
            params![rec.indicator_code, rec.description, rec.unit],
        );
        record_insert(result, &mut stats)?;
    }
    summary.push(stats);

    let mut stats = TableImport { table: "nic".to_string(), ..Default::default() };
    for rec in read_records::<NicRecord>(&dir.join("nic.csv"))? {
        let result = conn.execute(
            "INSERT INTO nic (nic_code, description) VALUES (?1, ?2)",
            params![rec.nic_code, rec.description],
        );
        record_insert(result, &mut stats)?;
    }
    summary.push(stats);

    let mut stats = TableImport { table: "state".to_string(), ..Default::default() };
    for rec in read_records::<StateRecord>(&dir.join("state.csv"))? {
        let result = conn.execute(
            "INSERT INTO state (state_code, description) VALUES (?1, ?2)",
            params![rec.state_code, rec.description],
        );
        record_insert(result, &mut stats)?;
    }
    summary.push(stats);

    let mut stats = TableImport { table: "sector".to_string(), ..Default::default() };
    for rec in read_records::<SectorRecord>(&dir.join("sector.csv"))? {
        let result = conn.execute(
            "INSERT INTO sector (sector_code, description) VALUES (?1, ?2)",
            params![rec.sector_code, rec.description],
        );
        record_insert(result, &mut stats)?;
    }
    summary.push(stats);

    let mut stats = TableImport { table: "asi_fact".to_string(), ..Default::default() };
    for rec in read_records::<FactRecord>(&dir.join("asi_fact.csv"))? {
        let result = conn.execute(
            "INSERT INTO asi_fact (
                indicator_code, state_code, nic_code, nic_code_type, sector_code,
                indicator_value, classification_year, financial_year
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                rec.indicator_code,
                rec.state_code,
                rec.nic_code,
                rec.nic_code_type,
                rec.sector_code,
                rec.indicator_value,
                rec.classification_year,
                rec.financial_year,
            ],
        );
        record_insert(result, &mut stats)?;
    }
    summary.push(stats);

    for stats in &summary {
        log::info!(
            "imported {}: {} inserted, {} duplicates skipped",
            stats.table,
            stats.inserted,
            stats.duplicates
        );
    }

    Ok(summary)
}

// ============================================================================
// LOAD
// ============================================================================

/// Run the fixed join for the all-industries aggregate, ordered by financial year
pub fn load_fact_rows(conn: &Connection) -> Result<Vec<FactRow>> {
    let mut stmt = conn.prepare(FACT_QUERY).context("Failed to prepare fact query")?;

    let rows = stmt
        .query_map([AGGREGATE_NIC_CODE], |row| {
            Ok(FactRow {
                indicator_code: row.get(0)?,
                state_code: row.get(1)?,
                nic_code: row.get(2)?,
                nic_code_type: row.get(3)?,
                sector_code: row.get(4)?,
                indicator_value: row.get(5)?,
                classification_year: row.get(6)?,
                financial_year: row.get(7)?,
                indicator_description: row.get(8)?,
                unit_description: row.get(9)?,
                nic_description: row.get(10)?,
                state_description: row.get(11)?,
                sector_description: row.get(12)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()
        .context("Failed to read fact rows")?;

    Ok(rows)
}

/// Load the indicator → unit lookup from a CSV with `description` and `unit` columns
pub fn load_unit_lookup(path: &Path) -> Result<UnitLookup> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open unit lookup {}", path.display()))?;
    load_unit_lookup_from_reader(file)
}

/// Same as [`load_unit_lookup`] but from any reader; the first row for a description wins
pub fn load_unit_lookup_from_reader<R: Read>(reader: R) -> Result<UnitLookup> {
    let mut rdr = csv::Reader::from_reader(reader);
    let mut lookup = UnitLookup::new();

    for result in rdr.deserialize() {
        let rec: UnitRecord = result.context("Failed to deserialize unit record")?;
        lookup.entry(rec.description).or_insert(rec.unit);
    }

    Ok(lookup)
}
