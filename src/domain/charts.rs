//! Chart-ready projections of the computed results.
//!
//! Two views back the comparison charts: margin rate per option (bar) and
//! the ancillary cost mix per option (stacked bar). Both are re-projections
//! of already-computed fields; a malformed percent label is reported as a
//! typed error so the host can show it without dropping the rest of the
//! output.

use thiserror::Error;

use super::report::ResultRecord;

#[derive(Debug, Error, PartialEq)]
pub enum ChartDataError {
    #[error("malformed percentage label '{0}'")]
    MalformedPercent(String),
}

/// One bar in the margin comparison: option label and margin rate in percent.
#[derive(Clone, Debug, PartialEq)]
pub struct MarginRatePoint {
    pub option_label: String,
    pub margin_rate_pct: f64,
}

/// One stack in the cost-mix comparison.
#[derive(Clone, Debug, PartialEq)]
pub struct CostComposition {
    pub option_label: String,
    pub ad_cost: i64,
    pub platform_fee: i64,
    pub sgna_cost: i64,
    pub shipping_fee: i64,
    pub delivery_fee: i64,
}

impl CostComposition {
    pub fn total(&self) -> i64 {
        self.ad_cost + self.platform_fee + self.sgna_cost + self.shipping_fee + self.delivery_fee
    }
}

/// Margin rate per option, recovered from the display records' percent text.
pub fn margin_rate_series(records: &[ResultRecord]) -> Result<Vec<MarginRatePoint>, ChartDataError> {
    records
        .iter()
        .map(|record| {
            Ok(MarginRatePoint {
                option_label: record.option_label.clone(),
                margin_rate_pct: parse_percent(&record.margin_rate)?,
            })
        })
        .collect()
}

/// Ancillary cost components per option for the stacked comparison.
pub fn cost_composition_series(records: &[ResultRecord]) -> Vec<CostComposition> {
    records
        .iter()
        .map(|record| CostComposition {
            option_label: record.option_label.clone(),
            ad_cost: record.ad_cost,
            platform_fee: record.platform_fee,
            sgna_cost: record.sgna_cost,
            shipping_fee: record.shipping_fee,
            delivery_fee: record.delivery_fee,
        })
        .collect()
}

/// Parse a `"12.3%"` label back into its numeric value.
pub fn parse_percent(text: &str) -> Result<f64, ChartDataError> {
    text.trim()
        .strip_suffix('%')
        .and_then(|digits| digits.trim().parse::<f64>().ok())
        .ok_or_else(|| ChartDataError::MalformedPercent(text.to_string()))
}
