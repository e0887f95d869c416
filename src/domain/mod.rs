//! Domain logic for landed-cost estimation lives here.

pub mod app_state;
pub mod charts;
pub mod costing;
pub mod entities;
pub mod report;

pub use app_state::{AppState, PersistedState, RateOrigin, SessionRates};
pub use charts::{
    cost_composition_series, margin_rate_series, parse_percent, ChartDataError, CostComposition,
    MarginRatePoint,
};
pub use costing::{cost_row, cost_rows, CostParams, CostingSummary};
pub use entities::{
    CostBreakdown, Currency, Incoterm, QuoteRow, RateTable, FALLBACK_RATE_KRW,
};
pub use report::{to_records, ResultRecord};
