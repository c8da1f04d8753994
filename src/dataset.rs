// 📦 Dataset - Immutable snapshot of the reference tables
// Built once at startup, shared by handle into every filtering call

use anyhow::Result;
use rusqlite::Connection;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::hash::Hash;
use std::path::Path;

use crate::db::{self, FactRow};

/// Indicator description → unit string
pub type UnitLookup = HashMap<String, String>;

/// Static option lists for the four independent dropdowns
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DropdownOptions {
    pub indicators: Vec<String>,
    pub states: Vec<String>,
    pub sectors: Vec<String>,
    pub classification_years: Vec<i32>,
}

pub struct Dataset {
    rows: Vec<FactRow>,
    units: UnitLookup,
}

impl Dataset {
    pub fn new(rows: Vec<FactRow>, units: UnitLookup) -> Self {
        Dataset { rows, units }
    }

    /// Read the fact join and the unit lookup file
    pub fn load(conn: &Connection, unit_csv: &Path) -> Result<Self> {
        let rows = db::load_fact_rows(conn)?;
        let units = db::load_unit_lookup(unit_csv)?;

        log::info!(
            "loaded {} fact rows and {} indicator units",
            rows.len(),
            units.len()
        );

        Ok(Dataset::new(rows, units))
    }

    pub fn rows(&self) -> &[FactRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Unit string for an indicator description, as stored in the lookup file
    pub fn unit_for(&self, indicator: &str) -> Option<&str> {
        self.units.get(indicator).map(String::as_str)
    }

    pub fn unit_count(&self) -> usize {
        self.units.len()
    }

    /// Distinct values of each dimension, in first-seen order
    pub fn dropdown_options(&self) -> DropdownOptions {
        DropdownOptions {
            indicators: distinct(self.rows.iter().map(|r| r.indicator_description.clone())),
            states: distinct(self.rows.iter().map(|r| r.state_description.clone())),
            sectors: distinct(self.rows.iter().map(|r| r.sector_description.clone())),
            classification_years: distinct(self.rows.iter().map(|r| r.classification_year)),
        }
    }
}

/// Keep the first occurrence of each value, preserving order
pub(crate) fn distinct<T, I>(values: I) -> Vec<T>
where
    T: Eq + Hash + Clone,
    I: IntoIterator<Item = T>,
{
    let mut seen = HashSet::new();
    values
        .into_iter()
        .filter(|v| seen.insert(v.clone()))
        .collect()
}
