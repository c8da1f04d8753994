// 🎛️ Filter State Model - Five cascading dropdowns
// Indicator, state, sector, NIC classification year, and a multi-select of financial years

use serde::{Deserialize, Serialize};

use crate::dataset::{distinct, Dataset};

/// Synthetic financial-year option meaning "do not restrict by year"
pub const SELECT_ALL: &str = "Select All";

pub const DEFAULT_INDICATOR: &str = "Number of Factories";
pub const DEFAULT_STATE: &str = "All India";
pub const DEFAULT_SECTOR: &str = "Combined";
pub const DEFAULT_CLASSIFICATION_YEAR: i32 = 2008;

const CLASSIFICATION_LABEL: &str = "NIC Classification";

// ============================================================================
// FINANCIAL YEARS
// ============================================================================

/// Multi-select value of the financial-year dropdown
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub enum FinancialYears {
    /// The sentinel is among the chosen values
    AllSelected,

    /// Explicit subset; may hold years that are no longer offered
    Years(Vec<String>),
}

impl FinancialYears {
    pub fn from_values(values: Vec<String>) -> Self {
        if values.iter().any(|v| v == SELECT_ALL) {
            FinancialYears::AllSelected
        } else {
            FinancialYears::Years(values)
        }
    }

    /// Whether a row for `financial_year` passes this restriction; an empty
    /// subset admits nothing
    pub fn admits(&self, financial_year: &str) -> bool {
        match self {
            FinancialYears::AllSelected => true,
            FinancialYears::Years(years) => years.iter().any(|y| y == financial_year),
        }
    }
}

impl From<Vec<String>> for FinancialYears {
    fn from(values: Vec<String>) -> Self {
        FinancialYears::from_values(values)
    }
}

impl From<FinancialYears> for Vec<String> {
    fn from(years: FinancialYears) -> Self {
        match years {
            FinancialYears::AllSelected => vec![SELECT_ALL.to_string()],
            FinancialYears::Years(years) => years,
        }
    }
}

// ============================================================================
// FILTER SELECTION
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterSelection {
    pub indicator: Option<String>,
    pub state: Option<String>,
    pub sector: Option<String>,
    pub classification_year: Option<i32>,
    pub financial_years: FinancialYears,
}

impl Default for FilterSelection {
    /// Selection shown when the page first loads
    fn default() -> Self {
        FilterSelection {
            indicator: Some(DEFAULT_INDICATOR.to_string()),
            state: Some(DEFAULT_STATE.to_string()),
            sector: Some(DEFAULT_SECTOR.to_string()),
            classification_year: Some(DEFAULT_CLASSIFICATION_YEAR),
            financial_years: FinancialYears::AllSelected,
        }
    }
}

impl FilterSelection {
    /// All four dimensions chosen; the year list only narrows the rows
    pub fn is_complete(&self) -> bool {
        self.indicator.is_some()
            && self.state.is_some()
            && self.sector.is_some()
            && self.classification_year.is_some()
    }

    /// Apply one dropdown change; no other field is touched
    pub fn apply(&mut self, change: FilterChange) {
        match change {
            FilterChange::Indicator(value) => self.indicator = value,
            FilterChange::State(value) => self.state = value,
            FilterChange::Sector(value) => self.sector = value,
            FilterChange::ClassificationYear(value) => self.classification_year = value,
            FilterChange::FinancialYears(values) => {
                self.financial_years = FinancialYears::from_values(values)
            }
        }
    }

    /// Header shown above the classification-year dropdown
    pub fn classification_label(&self) -> String {
        classification_label(self.classification_year)
    }

    /// Legal financial-year options for the current dimensions
    pub fn financial_year_options(&self, dataset: &Dataset) -> Vec<String> {
        resolve_financial_years(
            dataset,
            self.classification_year,
            self.sector.as_deref(),
            self.indicator.as_deref(),
            self.state.as_deref(),
        )
    }
}

/// A single dropdown edit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "field", content = "value", rename_all = "snake_case")]
pub enum FilterChange {
    Indicator(Option<String>),
    State(Option<String>),
    Sector(Option<String>),
    ClassificationYear(Option<i32>),
    FinancialYears(Vec<String>),
}

impl FilterChange {
    pub fn field_name(&self) -> &'static str {
        match self {
            FilterChange::Indicator(_) => "indicator",
            FilterChange::State(_) => "state",
            FilterChange::Sector(_) => "sector",
            FilterChange::ClassificationYear(_) => "classification_year",
            FilterChange::FinancialYears(_) => "financial_years",
        }
    }

    /// Changes to any of the four dimensions recompute the financial-year options
    pub fn refreshes_financial_years(&self) -> bool {
        !matches!(self, FilterChange::FinancialYears(_))
    }
}

// ============================================================================
// DERIVED DISPLAY
// ============================================================================

pub fn classification_label(year: Option<i32>) -> String {
    match year {
        Some(year) => format!("{} - {}", CLASSIFICATION_LABEL, year),
        None => CLASSIFICATION_LABEL.to_string(),
    }
}

// ============================================================================
// DEPENDENT-OPTIONS RESOLVER
// ============================================================================

/// Distinct financial years among rows matching all four dimensions, in first-seen
/// order, followed by the sentinel. Empty if any dimension is unset.
///
/// Previously chosen years missing from the result are left alone; the render
/// step simply finds no rows for them.
pub fn resolve_financial_years(
    dataset: &Dataset,
    classification_year: Option<i32>,
    sector: Option<&str>,
    indicator: Option<&str>,
    state: Option<&str>,
) -> Vec<String> {
    let (Some(year), Some(sector), Some(indicator), Some(state)) =
        (classification_year, sector, indicator, state)
    else {
        return Vec::new();
    };

    let mut years = distinct(
        dataset
            .rows()
            .iter()
            .filter(|r| {
                r.classification_year == year
                    && r.sector_description == sector
                    && r.indicator_description == indicator
                    && r.state_description == state
            })
            .map(|r| r.financial_year.clone()),
    );
    years.push(SELECT_ALL.to_string());

    years
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::UnitLookup;
    use crate::db::FactRow;

    fn create_test_row(sector: &str, year: i32, fy: &str) -> FactRow {
        FactRow {
            indicator_code: "1".to_string(),
            state_code: "99".to_string(),
            nic_code: "99999".to_string(),
            nic_code_type: "Total".to_string(),
            sector_code: "3".to_string(),
            indicator_value: 1.0,
            classification_year: year,
            financial_year: fy.to_string(),
            indicator_description: "Number of Factories".to_string(),
            unit_description: "-".to_string(),
            nic_description: "All Industries".to_string(),
            state_description: "All India".to_string(),
            sector_description: sector.to_string(),
        }
    }

    fn create_test_dataset() -> Dataset {
        Dataset::new(
            vec![
                create_test_row("Combined", 2008, "2018-19"),
                create_test_row("Combined", 2008, "2017-18"),
                create_test_row("Rural", 2008, "2016-17"),
                create_test_row("Combined", 2004, "2007-08"),
                create_test_row("Combined", 2008, "2018-19"),
            ],
            UnitLookup::new(),
        )
    }

    #[test]
    fn test_resolve_first_seen_order_with_sentinel_last() {
        let dataset = create_test_dataset();

        let years = resolve_financial_years(
            &dataset,
            Some(2008),
            Some("Combined"),
            Some("Number of Factories"),
            Some("All India"),
        );

        assert_eq!(years, vec!["2018-19", "2017-18", SELECT_ALL]);
    }

    #[test]
    fn test_resolve_any_missing_input_is_empty() {
        let dataset = create_test_dataset();

        assert!(resolve_financial_years(&dataset, None, Some("Combined"), Some("Number of Factories"), Some("All India")).is_empty());
        assert!(resolve_financial_years(&dataset, Some(2008), None, Some("Number of Factories"), Some("All India")).is_empty());
        assert!(resolve_financial_years(&dataset, Some(2008), Some("Combined"), None, Some("All India")).is_empty());
        assert!(resolve_financial_years(&dataset, Some(2008), Some("Combined"), Some("Number of Factories"), None).is_empty());
    }

    #[test]
    fn test_resolve_no_matching_rows_offers_only_sentinel() {
        let dataset = create_test_dataset();

        let years = resolve_financial_years(
            &dataset,
            Some(2008),
            Some("Urban"),
            Some("Number of Factories"),
            Some("All India"),
        );

        assert_eq!(years, vec![SELECT_ALL]);
    }

    #[test]
    fn test_financial_years_sentinel_wins() {
        let years = FinancialYears::from_values(vec!["2017-18".to_string(), SELECT_ALL.to_string()]);
        assert_eq!(years, FinancialYears::AllSelected);
        assert!(years.admits("1999-00"));

        let years = FinancialYears::from_values(vec!["2017-18".to_string()]);
        assert!(years.admits("2017-18"));
        assert!(!years.admits("2018-19"));
    }

    #[test]
    fn test_selection_completeness() {
        let mut selection = FilterSelection::default();
        assert!(selection.is_complete());

        selection.apply(FilterChange::FinancialYears(Vec::new()));
        assert!(selection.is_complete());
        assert!(!selection.financial_years.admits("2017-18"));

        selection.apply(FilterChange::Sector(None));
        assert!(!selection.is_complete());
    }

    #[test]
    fn test_classification_label() {
        assert_eq!(classification_label(Some(2008)), "NIC Classification - 2008");
        assert_eq!(classification_label(None), "NIC Classification");
    }

    #[test]
    fn test_filter_change_json_shape() {
        let change: FilterChange =
            serde_json::from_str(r#"{"field":"classification_year","value":2004}"#).unwrap();
        assert_eq!(change, FilterChange::ClassificationYear(Some(2004)));

        let change: FilterChange =
            serde_json::from_str(r#"{"field":"financial_years","value":["2017-18"]}"#).unwrap();
        assert!(!change.refreshes_financial_years());
    }
}
