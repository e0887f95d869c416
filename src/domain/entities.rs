use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::util::generate_id;

/// Flat KRW rate applied when a row's currency is missing from the table.
pub const FALLBACK_RATE_KRW: f64 = 1350.0;

/// Currencies accepted for EXW unit prices.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Currency {
    #[serde(rename = "USD")]
    Usd,
    #[serde(rename = "EUR")]
    Eur,
    #[serde(rename = "JPY")]
    Jpy,
    #[serde(rename = "CNY")]
    Cny,
    #[serde(rename = "HKD")]
    Hkd,
}

impl Currency {
    pub const ALL: [Currency; 5] = [
        Currency::Usd,
        Currency::Eur,
        Currency::Jpy,
        Currency::Cny,
        Currency::Hkd,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            Currency::Usd => "USD",
            Currency::Eur => "EUR",
            Currency::Jpy => "JPY",
            Currency::Cny => "CNY",
            Currency::Hkd => "HKD",
        }
    }

    pub fn from_code(code: &str) -> Option<Currency> {
        match code.trim().to_ascii_uppercase().as_str() {
            "USD" => Some(Currency::Usd),
            "EUR" => Some(Currency::Eur),
            "JPY" => Some(Currency::Jpy),
            "CNY" => Some(Currency::Cny),
            "HKD" => Some(Currency::Hkd),
            _ => None,
        }
    }

    /// Hard-coded fallback rate used when no live source is available.
    pub fn default_rate(&self) -> f64 {
        match self {
            Currency::Usd => 1350.0,
            Currency::Eur => 1450.0,
            Currency::Jpy => 9.1,
            Currency::Cny => 180.0,
            Currency::Hkd => 170.0,
        }
    }
}

/// Price basis of the supplier quote. Only EXW carries the inland surcharge.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Incoterm {
    #[default]
    #[serde(rename = "EXW")]
    Exw,
    #[serde(rename = "FOB")]
    Fob,
}

/// One user-entered quote line: a product option with its supplier price and
/// the ancillary KRW costs around it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QuoteRow {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub brand: String,
    pub product_name: String,
    pub option_label: String,
    pub currency: Currency,
    /// Supplier unit price in `currency`.
    pub exw_price: f64,
    /// Planned consumer sale price, KRW.
    pub sale_price_krw: f64,
    /// Purchase quantity; 0 means "undefined" and zeroes the unit ratios.
    pub quantity: u32,
    #[serde(default)]
    pub incoterm: Incoterm,
    #[serde(default)]
    pub origin_country: String,
    #[serde(default)]
    pub note: String,
    pub shipping_fee: f64,
    pub delivery_fee: f64,
    pub ad_cost: f64,
    pub platform_fee: f64,
    pub sgna_cost: f64,
    pub target_quantity: u32,
}

impl QuoteRow {
    /// Fill in a generated id when the row came from a file without one.
    pub fn ensure_id(&mut self) {
        if self.id.is_empty() {
            self.id = generate_id("row");
        }
    }

    /// The two seeded example rows shown on first run.
    pub fn samples() -> Vec<QuoteRow> {
        vec![
            QuoteRow {
                id: generate_id("row"),
                brand: "Brand A".to_string(),
                product_name: "Bag".to_string(),
                option_label: "Black".to_string(),
                currency: Currency::Usd,
                exw_price: 50.0,
                sale_price_krw: 120_000.0,
                quantity: 1,
                incoterm: Incoterm::Exw,
                origin_country: "China".to_string(),
                note: "Option 1".to_string(),
                shipping_fee: 10_000.0,
                delivery_fee: 5_000.0,
                ad_cost: 8_000.0,
                platform_fee: 5_000.0,
                sgna_cost: 7_000.0,
                target_quantity: 100,
            },
            QuoteRow {
                id: generate_id("row"),
                brand: "Brand B".to_string(),
                product_name: "Wallet".to_string(),
                option_label: "Brown".to_string(),
                currency: Currency::Eur,
                exw_price: 30.0,
                sale_price_krw: 85_000.0,
                quantity: 1,
                incoterm: Incoterm::Exw,
                origin_country: "Italy".to_string(),
                note: "Option 2".to_string(),
                shipping_fee: 8_000.0,
                delivery_fee: 4_000.0,
                ad_cost: 6_000.0,
                platform_fee: 4_000.0,
                sgna_cost: 6_000.0,
                target_quantity: 80,
            },
        ]
    }
}

/// KRW exchange rates for one session, keyed by currency.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RateTable {
    rates: HashMap<Currency, f64>,
}

impl RateTable {
    pub fn new(rates: HashMap<Currency, f64>) -> Self {
        Self { rates }
    }

    /// The hard-coded fallback table used when every live source fails.
    pub fn defaults() -> Self {
        let rates = Currency::ALL
            .iter()
            .map(|currency| (*currency, currency.default_rate()))
            .collect();
        Self { rates }
    }

    pub fn insert(&mut self, currency: Currency, rate: f64) {
        self.rates.insert(currency, rate);
    }

    pub fn get(&self, currency: Currency) -> Option<f64> {
        self.rates.get(&currency).copied()
    }

    /// Rate for a row; a currency missing from the table falls back to the
    /// flat default rather than failing the row.
    pub fn rate_or_default(&self, currency: Currency) -> f64 {
        self.get(currency).unwrap_or(FALLBACK_RATE_KRW)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Currency, f64)> + '_ {
        Currency::ALL
            .iter()
            .filter_map(|currency| self.get(*currency).map(|rate| (*currency, rate)))
    }
}

/// One computed result row. Values stay unrounded; rounding happens when the
/// row is turned into a display record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CostBreakdown {
    pub product_name: String,
    pub option_label: String,
    /// Landed value before duty/VAT, converted to KRW.
    pub cif_krw: f64,
    /// FOB value converted to KRW (displayed form).
    pub fob_krw: f64,
    pub duty: f64,
    pub vat: f64,
    pub shipping_fee: f64,
    pub delivery_fee: f64,
    pub ad_cost: f64,
    pub platform_fee: f64,
    pub sgna_cost: f64,
    /// Full cost of the whole purchase quantity.
    pub total_cost_sum: f64,
    pub unit_total_cost: f64,
    pub cost_rate_pct: f64,
    pub unit_margin: f64,
    /// Margin as a fraction of sale price (0.25 = 25%).
    pub margin_rate: f64,
    pub target_quantity: u32,
    pub target_sales: f64,
    pub est_ad_spend: f64,
    pub est_operating_profit: f64,
    pub est_profit_rate_pct: f64,
}
