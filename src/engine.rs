// 📈 Query/Render Engine - Filter the fact table into a chart series
// Pure function of the dataset snapshot and one selection

use serde::Serialize;
use thiserror::Error;

use crate::dataset::Dataset;
use crate::filters::FilterSelection;

pub const X_AXIS_LABEL: &str = "Financial Year";

/// Unit string meaning "a plain count"
const COUNT_UNIT: &str = "-";
const COUNT_LABEL: &str = "Quantity";

/// Text shown when a complete selection matches no rows
pub const NO_DATA_MESSAGE: &str = "This combination does not exist. Please try another combination.";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    #[error("selection is incomplete")]
    IncompleteSelection,

    #[error("{}", NO_DATA_MESSAGE)]
    NoDataForCombination,

    #[error("no unit registered for indicator '{0}'")]
    UnknownUnit(String),
}

// ============================================================================
// CHART SERIES
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartPoint {
    pub financial_year: String,
    pub value: f64,
}

/// Line chart over a categorical financial-year axis
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSeries {
    pub points: Vec<ChartPoint>,
    pub x_label: String,
    pub y_label: String,
}

impl ChartSeries {
    /// X tick labels in plotting order
    pub fn categories(&self) -> Vec<&str> {
        self.points.iter().map(|p| p.financial_year.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

// ============================================================================
// RENDER
// ============================================================================

/// Display unit for an indicator, with plain counts shown as "Quantity"
pub fn display_unit(unit: &str) -> &str {
    if unit == COUNT_UNIT {
        COUNT_LABEL
    } else {
        unit
    }
}

pub fn y_axis_label(indicator: &str, unit: &str) -> String {
    format!("{} ({})", indicator, display_unit(unit))
}

/// Restrict the fact table to one indicator/state/sector/classification-year
/// combination (optionally a subset of years) and build the ordered series
pub fn render(dataset: &Dataset, selection: &FilterSelection) -> Result<ChartSeries, RenderError> {
    let (Some(indicator), Some(state), Some(sector), Some(year)) = (
        selection.indicator.as_deref(),
        selection.state.as_deref(),
        selection.sector.as_deref(),
        selection.classification_year,
    ) else {
        return Err(RenderError::IncompleteSelection);
    };

    let mut rows: Vec<_> = dataset
        .rows()
        .iter()
        .filter(|r| {
            r.indicator_description == indicator
                && r.state_description == state
                && r.classification_year == year
                && r.sector_description == sector
                && selection.financial_years.admits(&r.financial_year)
        })
        .collect();

    if rows.is_empty() {
        return Err(RenderError::NoDataForCombination);
    }

    rows.sort_by(|a, b| a.financial_year.cmp(&b.financial_year));

    let unit = dataset
        .unit_for(indicator)
        .ok_or_else(|| RenderError::UnknownUnit(indicator.to_string()))?;

    Ok(ChartSeries {
        points: rows
            .into_iter()
            .map(|r| ChartPoint {
                financial_year: r.financial_year.clone(),
                value: r.indicator_value,
            })
            .collect(),
        x_label: X_AXIS_LABEL.to_string(),
        y_label: y_axis_label(indicator, unit),
    })
}
