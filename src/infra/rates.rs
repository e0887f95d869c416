//! Exchange-rate sources.
//!
//! - `RemoteApiSource`: per-currency conversion queries against a JSON API.
//! - `ListingPageSource`: a scraped bank listing page, keyed by currency
//!   code tokens; JPY listings quote per 100 yen and are normalized.
//! - `FixedSource`: the built-in fallback table.
//!
//! Any source failure degrades to the hard-coded defaults via
//! [`fetch_with_fallback`]; rate trouble never blocks a compute pass.

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, warn};

use crate::domain::{Currency, RateTable};

const DEFAULT_API_BASE_URL: &str = "https://api.exchangerate.host/";
/// Default listing page for the scraped source.
pub const DEFAULT_LISTING_URL: &str = "https://finance.naver.com/marketindex/exchangeList.naver";
const USER_AGENT: &str = "import-cost-estimator/1.0.0";

/// Listing rows are matched by code token; the divisor undoes per-100 quotes.
const LISTING_UNITS: [(Currency, f64); 5] = [
    (Currency::Usd, 1.0),
    (Currency::Eur, 1.0),
    (Currency::Jpy, 100.0),
    (Currency::Cny, 1.0),
    (Currency::Hkd, 1.0),
];

#[derive(Debug, Error)]
pub enum RateSourceError {
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("http request error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("rate payload error: {0}")]
    Payload(String),
}

/// A source of KRW exchange rates for the session.
#[async_trait]
pub trait RateProvider: Send + Sync {
    /// Short name used in logs and provenance display.
    fn name(&self) -> &'static str;

    async fn fetch_rates(&self) -> Result<RateTable, RateSourceError>;
}

/// What a degradable fetch produced.
pub struct FetchOutcome {
    pub table: RateTable,
    /// True when the source failed and the defaults stood in.
    pub degraded: bool,
}

/// Fetch from any provider, degrading to the default table on failure.
pub async fn fetch_with_fallback(provider: &dyn RateProvider) -> FetchOutcome {
    match provider.fetch_rates().await {
        Ok(table) => FetchOutcome {
            table,
            degraded: false,
        },
        Err(error) => {
            warn!(
                source = provider.name(),
                "rate fetch failed, using defaults: {error}"
            );
            FetchOutcome {
                table: RateTable::defaults(),
                degraded: true,
            }
        }
    }
}

/// Per-currency conversion queries (`latest?base=USD&symbols=KRW`).
pub struct RemoteApiSource {
    http: Client,
    base_url: Url,
}

#[derive(Debug, Deserialize)]
struct LatestRatesDto {
    #[serde(default)]
    rates: HashMap<String, f64>,
    #[serde(default)]
    date: Option<String>,
}

impl RemoteApiSource {
    pub fn new() -> Result<Self, RateSourceError> {
        Self::with_base_url(DEFAULT_API_BASE_URL)
    }

    pub fn with_base_url(base: &str) -> Result<Self, RateSourceError> {
        let base_url = Url::parse(base)?;
        let http = Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self { http, base_url })
    }

    async fn fetch_one(&self, currency: Currency) -> Result<f64, RateSourceError> {
        let mut url = self.base_url.join("latest")?;
        url.query_pairs_mut()
            .append_pair("base", currency.code())
            .append_pair("symbols", "KRW");

        let dto: LatestRatesDto = self
            .http
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if let Some(date) = dto.date.as_deref() {
            debug!(currency = currency.code(), date, "conversion quote received");
        }

        dto.rates
            .get("KRW")
            .copied()
            .map(round2)
            .ok_or_else(|| {
                RateSourceError::Payload(format!("no KRW quote for {}", currency.code()))
            })
    }
}

#[async_trait]
impl RateProvider for RemoteApiSource {
    fn name(&self) -> &'static str {
        "remote-api"
    }

    async fn fetch_rates(&self) -> Result<RateTable, RateSourceError> {
        let mut table = RateTable::default();
        for currency in Currency::ALL {
            let rate = self.fetch_one(currency).await?;
            table.insert(currency, rate);
        }
        Ok(table)
    }
}

/// A scraped exchange-rate listing page. The page is fetched as text and
/// handed to [`parse_listing`], which does the actual row matching.
pub struct ListingPageSource {
    http: Client,
    page_url: Url,
}

impl ListingPageSource {
    pub fn new(page_url: &str) -> Result<Self, RateSourceError> {
        let page_url = Url::parse(page_url)?;
        let http = Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self { http, page_url })
    }

    async fn fetch_page(&self) -> Result<String, RateSourceError> {
        Ok(self
            .http
            .get(self.page_url.clone())
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?)
    }
}

#[async_trait]
impl RateProvider for ListingPageSource {
    fn name(&self) -> &'static str {
        "listing-page"
    }

    async fn fetch_rates(&self) -> Result<RateTable, RateSourceError> {
        let body = self.fetch_page().await?;
        parse_listing(&body)
    }
}

/// Pull per-unit KRW rates out of a listing document. A currency's row is the
/// first line mentioning its code token together with a number; per-100
/// quotes (JPY) are divided down to per-unit before the table is built.
pub fn parse_listing(body: &str) -> Result<RateTable, RateSourceError> {
    let mut table = RateTable::default();

    for (currency, unit) in LISTING_UNITS {
        let listed = body
            .lines()
            .filter(|line| line.contains(currency.code()))
            .find_map(listed_number);

        match listed {
            Some(value) => table.insert(currency, value / unit),
            None => {
                return Err(RateSourceError::Payload(format!(
                    "listing has no row for {}",
                    currency.code()
                )))
            }
        }
    }

    Ok(table)
}

/// The quoted rate in a listing line: its last parseable number, thousands
/// separators stripped. Unit hints like "(100)" precede the quote, so taking
/// the last number skips them.
fn listed_number(line: &str) -> Option<f64> {
    line.split(|c: char| !(c.is_ascii_digit() || c == '.' || c == ','))
        .filter(|part| !part.is_empty())
        .filter_map(|part| part.replace(',', "").parse::<f64>().ok())
        .last()
}

/// Always answers with the hard-coded default table.
pub struct FixedSource;

#[async_trait]
impl RateProvider for FixedSource {
    fn name(&self) -> &'static str {
        "fixed-defaults"
    }

    async fn fetch_rates(&self) -> Result<RateTable, RateSourceError> {
        Ok(RateTable::defaults())
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round_ties_even() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING_SAMPLE: &str = "\
Exchange rates as of today
USD United States dollar | 1,350.50
EUR Euro | 1,448.20
JPY Japanese yen (100) | 150.00
CNY Chinese yuan | 187.55
HKD Hong Kong dollar | 172.10
";

    #[test]
    fn listing_rows_parse_into_per_unit_rates() {
        let table = parse_listing(LISTING_SAMPLE).unwrap();
        assert_eq!(table.get(Currency::Usd), Some(1350.50));
        assert_eq!(table.get(Currency::Eur), Some(1448.20));
        assert_eq!(table.get(Currency::Cny), Some(187.55));
        assert_eq!(table.get(Currency::Hkd), Some(172.10));
    }

    #[test]
    fn jpy_per_100_listing_normalizes_to_per_unit() {
        let table = parse_listing(LISTING_SAMPLE).unwrap();
        assert_eq!(table.get(Currency::Jpy), Some(1.5));
    }

    #[test]
    fn incomplete_listing_is_a_payload_error() {
        let partial = "USD | 1350.0\nEUR | 1450.0\n";
        let error = parse_listing(partial).unwrap_err();
        assert!(matches!(error, RateSourceError::Payload(_)));
    }

    #[test]
    fn listing_numbers_tolerate_separators_and_unit_hints() {
        assert_eq!(listed_number("USD | 1,350.50"), Some(1350.50));
        assert_eq!(listed_number("JPY (100) | 912.40"), Some(912.40));
        assert_eq!(listed_number("no digits here"), None);
    }

    #[test]
    fn conversion_payload_reads_the_krw_quote() {
        let dto: LatestRatesDto =
            serde_json::from_str(r#"{"rates":{"KRW":1350.456},"date":"2026-08-04"}"#).unwrap();
        assert_eq!(dto.rates.get("KRW").copied().map(round2), Some(1350.46));
    }

    #[tokio::test]
    async fn fixed_source_serves_the_default_table() {
        let table = FixedSource.fetch_rates().await.unwrap();
        assert_eq!(table, RateTable::defaults());
    }

    #[tokio::test]
    async fn fallback_wrapper_survives_a_dead_source() {
        struct Failing;

        #[async_trait]
        impl RateProvider for Failing {
            fn name(&self) -> &'static str {
                "failing"
            }

            async fn fetch_rates(&self) -> Result<RateTable, RateSourceError> {
                Err(RateSourceError::Payload("boom".to_string()))
            }
        }

        let outcome = fetch_with_fallback(&Failing).await;
        assert!(outcome.degraded);
        assert_eq!(outcome.table, RateTable::defaults());
    }

    #[tokio::test]
    async fn fallback_wrapper_passes_live_tables_through() {
        let outcome = fetch_with_fallback(&FixedSource).await;
        assert!(!outcome.degraded);
        assert_eq!(outcome.table, RateTable::defaults());
    }
}
