//! Host orchestration: rows in, rates resolved, one compute pass, output out.

use std::fs;
use std::io;
use std::path::PathBuf;

use clap::ValueEnum;
use thiserror::Error;
use tracing::{info, warn};

use crate::domain::{
    cost_composition_series, cost_rows, margin_rate_series, to_records, AppState, QuoteRow,
    RateOrigin, RateTable, ResultRecord,
};
use crate::infra::cache::{load_rates_cache, save_rates_cache, RatesCache};
use crate::infra::rates::{
    fetch_with_fallback, FixedSource, ListingPageSource, RateProvider, RateSourceError,
    RemoteApiSource, DEFAULT_LISTING_URL,
};
use crate::util::export::{write_csv, ExportError};
use crate::util::persistence::{load_persisted_state, save_persisted_state};

/// Shared front-door passphrase. Not a security boundary, just a filter.
const ACCESS_PASSPHRASE: &str = "1004";

/// Check the front-door passphrase (env `IMPORT_COST_PASSPHRASE` overrides
/// the built-in). Nothing computes until this passes.
pub fn unlock(candidate: &str) -> bool {
    let expected = std::env::var("IMPORT_COST_PASSPHRASE")
        .unwrap_or_else(|_| ACCESS_PASSPHRASE.to_string());
    candidate.trim() == expected
}

/// Which rate source backs this session.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum SourceKind {
    #[default]
    Remote,
    Listing,
    Fixed,
}

impl SourceKind {
    fn live_origin(&self) -> RateOrigin {
        match self {
            SourceKind::Remote => RateOrigin::Remote,
            SourceKind::Listing => RateOrigin::Listing,
            SourceKind::Fixed => RateOrigin::Fallback,
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("access denied: wrong passphrase")]
    AccessDenied,
    #[error("failed to read input rows: {0}")]
    Io(#[from] io::Error),
    #[error("input rows are not valid JSON: {0}")]
    Rows(#[from] serde_json::Error),
    #[error(transparent)]
    Export(#[from] ExportError),
}

pub struct ComputeOptions {
    /// JSON file with the quote rows; falls back to persisted rows, then the
    /// built-in samples.
    pub input: Option<PathBuf>,
    /// Force the built-in sample rows even when persisted rows exist.
    pub sample: bool,
    pub csv_out: Option<PathBuf>,
    pub source: SourceKind,
    pub listing_url: Option<String>,
    /// Bypass the disk cache and hit the source again.
    pub refresh: bool,
    /// Skip persisting the rows after the run.
    pub no_save: bool,
}

/// The compute command: full pass over the row sequence.
pub async fn run_compute(options: ComputeOptions) -> Result<(), AppError> {
    let mut state = AppState::default();
    if let Some(persisted) = load_persisted_state() {
        state.apply_persisted(persisted);
    }

    state.rows = load_rows(&options, &state)?;
    state.refresh_requested = options.refresh;
    resolve_rates(&mut state, options.source, options.listing_url.as_deref()).await;

    let table = state.rate_table();
    print_rate_line(&state, &table);

    let summary = cost_rows(&state.rows, &table, &state.params);
    let records = to_records(&summary.rows);

    print_results(&records);
    println!(
        "Totals: target sales {} KRW, est. operating profit {} KRW",
        summary.total_target_sales.round_ties_even() as i64,
        summary.total_est_profit.round_ties_even() as i64
    );

    print_chart_views(&records);

    if let Some(path) = options.csv_out.as_deref() {
        write_csv(path, &records)?;
        info!("wrote CSV export to {}", path.display());
    }

    if !options.no_save {
        if let Err(error) = save_persisted_state(&state.to_persisted()) {
            warn!("failed to persist rows: {error}");
        }
    }

    Ok(())
}

/// The rates command: show the session table and where it came from.
pub async fn run_rates(
    source: SourceKind,
    listing_url: Option<String>,
    refresh: bool,
) -> Result<(), AppError> {
    let mut state = AppState::default();
    state.refresh_requested = refresh;
    resolve_rates(&mut state, source, listing_url.as_deref()).await;

    let table = state.rate_table();
    print_rate_line(&state, &table);
    Ok(())
}

fn load_rows(options: &ComputeOptions, state: &AppState) -> Result<Vec<QuoteRow>, AppError> {
    if let Some(path) = options.input.as_deref() {
        let mut rows: Vec<QuoteRow> = serde_json::from_str(&fs::read_to_string(path)?)?;
        for row in &mut rows {
            row.ensure_id();
        }
        info!("loaded {} rows from {}", rows.len(), path.display());
        return Ok(rows);
    }

    if !options.sample && !state.rows.is_empty() {
        info!("using {} persisted rows", state.rows.len());
        return Ok(state.rows.clone());
    }

    info!("using built-in sample rows");
    Ok(QuoteRow::samples())
}

/// Install a rate table: disk cache first unless a refresh was requested,
/// then the chosen source with fallback to the defaults. The session table
/// is replaced in one step either way.
async fn resolve_rates(state: &mut AppState, kind: SourceKind, listing_url: Option<&str>) {
    if !state.needs_rates() {
        return;
    }

    if !state.refresh_requested {
        if let Some(cache) = load_rates_cache() {
            info!(
                "rates from disk cache (source: {}, fetched {}, age {})",
                cache.source,
                cache.fetched_at_display(),
                cache.age_string()
            );
            state.install_rates(cache.rates, RateOrigin::Cached);
            return;
        }
    }

    let (table, origin) = match build_provider(kind, listing_url) {
        Ok(provider) => {
            let outcome = fetch_with_fallback(provider.as_ref()).await;
            if outcome.degraded {
                (outcome.table, RateOrigin::Fallback)
            } else {
                if let Err(error) =
                    save_rates_cache(&RatesCache::new(provider.name(), outcome.table.clone()))
                {
                    warn!("failed to save rate cache: {error}");
                }
                (outcome.table, kind.live_origin())
            }
        }
        Err(error) => {
            warn!("failed to initialise rate source: {error}");
            (RateTable::defaults(), RateOrigin::Fallback)
        }
    };

    state.install_rates(table, origin);
}

fn build_provider(
    kind: SourceKind,
    listing_url: Option<&str>,
) -> Result<Box<dyn RateProvider>, RateSourceError> {
    Ok(match kind {
        SourceKind::Remote => Box::new(RemoteApiSource::new()?),
        SourceKind::Listing => Box::new(ListingPageSource::new(
            listing_url.unwrap_or(DEFAULT_LISTING_URL),
        )?),
        SourceKind::Fixed => Box::new(FixedSource),
    })
}

fn print_rate_line(state: &AppState, table: &RateTable) {
    let quotes = table
        .iter()
        .map(|(currency, rate)| format!("1 {} = {rate} KRW", currency.code()))
        .collect::<Vec<_>>()
        .join(" | ");
    let origin = state
        .rates
        .as_ref()
        .map(|session| session.origin.label())
        .unwrap_or("none");
    println!("Rates ({origin}): {quotes}");
}

fn print_results(records: &[ResultRecord]) {
    println!("{} result rows:", records.len());
    for record in records {
        println!(
            "- {} / {} | CIF {} | FOB {} | duty {} | VAT {} | unit cost {} ({}) | margin {} ({}) \
             | target {} pcs -> sales {}, est. ads {}, est. profit {} ({})",
            record.product_name,
            record.option_label,
            record.cif_krw,
            record.fob_krw,
            record.duty,
            record.vat,
            record.unit_total_cost,
            record.cost_rate,
            record.unit_margin,
            record.margin_rate,
            record.target_quantity,
            record.target_sales,
            record.est_ad_spend,
            record.est_operating_profit,
            record.est_profit_rate,
        );
    }
}

/// Print the two chart-ready views. A derivation error on one view is shown
/// in its place; the other view and the rest of the output still happen.
fn print_chart_views(records: &[ResultRecord]) {
    println!("Margin rate by option:");
    match margin_rate_series(records) {
        Ok(series) => {
            for point in series {
                println!("  {:<12} {:>8.1}%", point.option_label, point.margin_rate_pct);
            }
        }
        Err(error) => println!("  margin chart data error: {error}"),
    }

    println!("Cost mix by option:");
    for stack in cost_composition_series(records) {
        println!(
            "  {:<12} ads {} | platform {} | sgna {} | shipping {} | delivery {} (sum {})",
            stack.option_label,
            stack.ad_cost,
            stack.platform_fee,
            stack.sgna_cost,
            stack.shipping_fee,
            stack.delivery_fee,
            stack.total()
        );
    }
}
