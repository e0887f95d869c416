//! Presentation rows: rounded KRW integers and percent strings.

use super::entities::CostBreakdown;

/// A cost breakdown rounded for display and export. Monetary fields are
/// nearest-integer KRW; percentage fields carry one decimal and a `%` suffix.
#[derive(Clone, Debug, PartialEq)]
pub struct ResultRecord {
    pub product_name: String,
    pub option_label: String,
    pub cif_krw: i64,
    pub fob_krw: i64,
    pub duty: i64,
    pub vat: i64,
    pub shipping_fee: i64,
    pub delivery_fee: i64,
    pub ad_cost: i64,
    pub platform_fee: i64,
    pub sgna_cost: i64,
    pub unit_total_cost: i64,
    pub cost_rate: String,
    pub unit_margin: i64,
    pub margin_rate: String,
    pub target_quantity: u32,
    pub target_sales: i64,
    pub est_ad_spend: i64,
    pub est_operating_profit: i64,
    pub est_profit_rate: String,
}

impl ResultRecord {
    pub fn from_breakdown(breakdown: &CostBreakdown) -> Self {
        Self {
            product_name: breakdown.product_name.clone(),
            option_label: breakdown.option_label.clone(),
            cif_krw: round_krw(breakdown.cif_krw),
            fob_krw: round_krw(breakdown.fob_krw),
            duty: round_krw(breakdown.duty),
            vat: round_krw(breakdown.vat),
            shipping_fee: round_krw(breakdown.shipping_fee),
            delivery_fee: round_krw(breakdown.delivery_fee),
            ad_cost: round_krw(breakdown.ad_cost),
            platform_fee: round_krw(breakdown.platform_fee),
            sgna_cost: round_krw(breakdown.sgna_cost),
            unit_total_cost: round_krw(breakdown.unit_total_cost),
            cost_rate: format_percent(breakdown.cost_rate_pct),
            unit_margin: round_krw(breakdown.unit_margin),
            // Stored as a fraction; displayed scaled to percent.
            margin_rate: format_percent(breakdown.margin_rate * 100.0),
            target_quantity: breakdown.target_quantity,
            target_sales: round_krw(breakdown.target_sales),
            est_ad_spend: round_krw(breakdown.est_ad_spend),
            est_operating_profit: round_krw(breakdown.est_operating_profit),
            est_profit_rate: format_percent(breakdown.est_profit_rate_pct),
        }
    }
}

/// Build display records for a whole result set.
pub fn to_records(breakdowns: &[CostBreakdown]) -> Vec<ResultRecord> {
    breakdowns.iter().map(ResultRecord::from_breakdown).collect()
}

fn round_krw(value: f64) -> i64 {
    value.round_ties_even() as i64
}

fn format_percent(value: f64) -> String {
    format!("{value:.1}%")
}
