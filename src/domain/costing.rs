//! Landed-cost arithmetic: one quote row in, one cost breakdown out.

use serde::{Deserialize, Serialize};

use super::entities::{CostBreakdown, Incoterm, QuoteRow, RateTable};

/// Named constants behind the landed-cost formulas. They encode a fixed
/// customs/logistics regime (flat inland and freight assumptions, fixed duty
/// and VAT rates) and are kept overridable so the engine stays testable.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CostParams {
    /// Inland haulage added to the unit price, supplier currency. Applies
    /// only when the quote is on EXW terms.
    pub inland_haulage: f64,
    /// Flat ocean freight per unit, supplier currency.
    pub ocean_freight: f64,
    /// Insurance as a fraction of (EXW + inland + freight).
    pub insurance_rate: f64,
    /// Import duty as a fraction of CIF.
    pub duty_rate: f64,
    /// VAT as a fraction of (CIF + duty).
    pub vat_rate: f64,
    /// Projected ad spend as a fraction of target sales.
    pub est_ad_rate: f64,
}

impl Default for CostParams {
    fn default() -> Self {
        Self {
            inland_haulage: 100.0,
            ocean_freight: 300.0,
            insurance_rate: 0.003,
            duty_rate: 0.08,
            vat_rate: 0.10,
            est_ad_rate: 0.10,
        }
    }
}

/// Batch result: per-row breakdowns plus portfolio totals.
#[derive(Clone, Debug, PartialEq)]
pub struct CostingSummary {
    pub rows: Vec<CostBreakdown>,
    pub total_target_sales: f64,
    pub total_est_profit: f64,
}

/// Run the engine over every row with one shared rate table.
pub fn cost_rows(rows: &[QuoteRow], rates: &RateTable, params: &CostParams) -> CostingSummary {
    let mut breakdowns = Vec::with_capacity(rows.len());
    let mut total_target_sales = 0.0;
    let mut total_est_profit = 0.0;

    for row in rows {
        let breakdown = cost_row(row, rates, params);
        total_target_sales += breakdown.target_sales;
        total_est_profit += breakdown.est_operating_profit;
        breakdowns.push(breakdown);
    }

    CostingSummary {
        rows: breakdowns,
        total_target_sales,
        total_est_profit,
    }
}

/// Compute one row. Pure and total: every division with a zero denominator
/// (quantity, sale price, target sales) yields zero for the dependent ratio
/// instead of failing, so loss-making and placeholder rows pass through.
pub fn cost_row(row: &QuoteRow, rates: &RateTable, params: &CostParams) -> CostBreakdown {
    let rate = rates.rate_or_default(row.currency);

    let inland = if row.incoterm == Incoterm::Exw {
        params.inland_haulage
    } else {
        0.0
    };
    let freight = params.ocean_freight;
    let insurance = round2((row.exw_price + inland + freight) * params.insurance_rate);

    let cif_value = row.exw_price + inland + freight + insurance;
    let fob_value = row.exw_price + inland;
    let cif_krw = cif_value * rate;
    let duty = cif_krw * params.duty_rate;
    let vat = (cif_krw + duty) * params.vat_rate;

    let total_cost_sum = cif_krw
        + duty
        + vat
        + row.ad_cost
        + row.platform_fee
        + row.sgna_cost
        + row.shipping_fee
        + row.delivery_fee;

    let quantity = f64::from(row.quantity);
    let unit_total_cost = if row.quantity > 0 {
        total_cost_sum / quantity
    } else {
        0.0
    };

    let unit_margin = row.sale_price_krw - unit_total_cost;
    let margin_rate = if row.sale_price_krw > 0.0 {
        unit_margin / row.sale_price_krw
    } else {
        0.0
    };
    let cost_rate_pct = if row.sale_price_krw > 0.0 {
        unit_total_cost / row.sale_price_krw * 100.0
    } else {
        0.0
    };

    let target_quantity = f64::from(row.target_quantity);
    let target_sales = if row.target_quantity > 0 {
        target_quantity * row.sale_price_krw
    } else {
        0.0
    };
    let est_ad_spend = target_sales * params.est_ad_rate;
    // An undefined purchase quantity zeroes the whole profit estimate, not
    // just the scaled-cost term.
    let est_operating_profit = if row.quantity > 0 {
        target_sales - total_cost_sum * target_quantity / quantity
    } else {
        0.0
    };
    let est_profit_rate_pct = if target_sales > 0.0 {
        est_operating_profit / target_sales * 100.0
    } else {
        0.0
    };

    CostBreakdown {
        product_name: row.product_name.clone(),
        option_label: row.option_label.clone(),
        cif_krw,
        fob_krw: fob_value * rate,
        duty,
        vat,
        shipping_fee: row.shipping_fee,
        delivery_fee: row.delivery_fee,
        ad_cost: row.ad_cost,
        platform_fee: row.platform_fee,
        sgna_cost: row.sgna_cost,
        total_cost_sum,
        unit_total_cost,
        cost_rate_pct,
        unit_margin,
        margin_rate,
        target_quantity: row.target_quantity,
        target_sales,
        est_ad_spend,
        est_operating_profit,
        est_profit_rate_pct,
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round_ties_even() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::Currency;
    use std::collections::HashMap;

    const EPS: f64 = 1e-6;

    fn usd_row() -> QuoteRow {
        QuoteRow {
            id: "row-1".to_string(),
            brand: "Brand A".to_string(),
            product_name: "Bag".to_string(),
            option_label: "Black".to_string(),
            currency: Currency::Usd,
            exw_price: 50.0,
            sale_price_krw: 120_000.0,
            quantity: 1,
            incoterm: Incoterm::Exw,
            origin_country: "China".to_string(),
            note: String::new(),
            shipping_fee: 10_000.0,
            delivery_fee: 5_000.0,
            ad_cost: 8_000.0,
            platform_fee: 5_000.0,
            sgna_cost: 7_000.0,
            target_quantity: 100,
        }
    }

    fn usd_table(rate: f64) -> RateTable {
        RateTable::new(HashMap::from([(Currency::Usd, rate)]))
    }

    #[test]
    fn worked_usd_example_matches_by_hand_figures() {
        let breakdown = cost_row(&usd_row(), &usd_table(1350.0), &CostParams::default());

        // insurance = round((50 + 100 + 300) * 0.003, 2) = 1.35
        assert!((breakdown.cif_krw - 451.35 * 1350.0).abs() < EPS);
        assert!((breakdown.fob_krw - 150.0 * 1350.0).abs() < EPS);
        assert!((breakdown.duty - 48_745.8).abs() < EPS);
        assert!((breakdown.vat - 65_806.83).abs() < EPS);
        assert!((breakdown.total_cost_sum - 758_875.13).abs() < EPS);
        assert!((breakdown.unit_total_cost - 758_875.13).abs() < EPS);
        // Loss-making row is tolerated, not rejected.
        assert!((breakdown.unit_margin - (120_000.0 - 758_875.13)).abs() < EPS);
        assert!(breakdown.unit_margin < 0.0);
        assert!((breakdown.target_sales - 12_000_000.0).abs() < EPS);
        assert!((breakdown.est_ad_spend - 1_200_000.0).abs() < EPS);
        assert!(
            (breakdown.est_operating_profit - (12_000_000.0 - 758_875.13 * 100.0)).abs() < 1e-4
        );
    }

    #[test]
    fn fob_terms_skip_the_inland_surcharge() {
        let mut row = usd_row();
        row.incoterm = Incoterm::Fob;
        let breakdown = cost_row(&row, &usd_table(1000.0), &CostParams::default());

        // insurance = round((50 + 0 + 300) * 0.003, 2) = 1.05
        assert!((breakdown.cif_krw - 351.05 * 1000.0).abs() < EPS);
        assert!((breakdown.fob_krw - 50_000.0).abs() < EPS);
    }

    #[test]
    fn unit_cost_times_quantity_recovers_the_total() {
        let mut row = usd_row();
        row.quantity = 7;
        let breakdown = cost_row(&row, &usd_table(1350.0), &CostParams::default());
        assert!(
            (breakdown.unit_total_cost * 7.0 - breakdown.total_cost_sum).abs() < EPS
        );
        assert!(
            (breakdown.unit_margin - (row.sale_price_krw - breakdown.unit_total_cost)).abs() < EPS
        );
        assert!(
            (breakdown.margin_rate - breakdown.unit_margin / row.sale_price_krw).abs() < EPS
        );
    }

    #[test]
    fn zero_quantity_zeroes_the_unit_figures() {
        let mut row = usd_row();
        row.quantity = 0;
        let breakdown = cost_row(&row, &usd_table(1350.0), &CostParams::default());

        assert_eq!(breakdown.unit_total_cost, 0.0);
        // With a zero unit cost the margin collapses to the sale price and
        // the margin rate to exactly 1.
        assert!((breakdown.unit_margin - row.sale_price_krw).abs() < EPS);
        assert!((breakdown.margin_rate - 1.0).abs() < EPS);
        assert_eq!(breakdown.cost_rate_pct, 0.0);
        assert_eq!(breakdown.est_operating_profit, 0.0);
        assert_eq!(breakdown.est_profit_rate_pct, 0.0);
    }

    #[test]
    fn zero_sale_price_zeroes_the_ratios() {
        let mut row = usd_row();
        row.sale_price_krw = 0.0;
        let breakdown = cost_row(&row, &usd_table(1350.0), &CostParams::default());

        assert_eq!(breakdown.margin_rate, 0.0);
        assert_eq!(breakdown.cost_rate_pct, 0.0);
        assert_eq!(breakdown.target_sales, 0.0);
        assert_eq!(breakdown.est_profit_rate_pct, 0.0);
        assert!((breakdown.unit_margin - (0.0 - breakdown.unit_total_cost)).abs() < EPS);
    }

    #[test]
    fn missing_currency_behaves_like_an_explicit_1350_rate() {
        let row = usd_row();
        let with_fallback = cost_row(&row, &RateTable::default(), &CostParams::default());
        let with_explicit = cost_row(&row, &usd_table(1350.0), &CostParams::default());
        assert_eq!(with_fallback, with_explicit);
    }

    #[test]
    fn summary_totals_add_up_across_rows() {
        let rows = vec![usd_row(), {
            let mut second = usd_row();
            second.option_label = "Red".to_string();
            second.target_quantity = 10;
            second
        }];
        let summary = cost_rows(&rows, &usd_table(1350.0), &CostParams::default());

        assert_eq!(summary.rows.len(), 2);
        let expected_sales: f64 = summary.rows.iter().map(|r| r.target_sales).sum();
        let expected_profit: f64 = summary.rows.iter().map(|r| r.est_operating_profit).sum();
        assert!((summary.total_target_sales - expected_sales).abs() < EPS);
        assert!((summary.total_est_profit - expected_profit).abs() < EPS);
    }

    #[test]
    fn insurance_is_rounded_to_cents_before_entering_cif() {
        let mut row = usd_row();
        row.exw_price = 33.40;
        row.incoterm = Incoterm::Fob; // inland 0, freight 300 -> insured base 333.40
        let breakdown = cost_row(&row, &usd_table(1.0), &CostParams::default());
        // 333.40 * 0.003 = 1.0002 -> 1.00 after rounding to cents
        assert!((breakdown.cif_krw - 334.40).abs() < EPS);
    }
}
