use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use super::costing::CostParams;
use super::entities::{QuoteRow, RateTable};

/// Where the session's rate table came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RateOrigin {
    /// Fetched live from the conversion API.
    Remote,
    /// Parsed from a scraped listing page.
    Listing,
    /// Loaded from the on-disk cache.
    Cached,
    /// Hard-coded defaults after a source failure.
    Fallback,
}

impl RateOrigin {
    pub fn label(&self) -> &'static str {
        match self {
            RateOrigin::Remote => "remote",
            RateOrigin::Listing => "listing",
            RateOrigin::Cached => "cached",
            RateOrigin::Fallback => "fallback",
        }
    }
}

/// The rate table installed for this session, with provenance.
#[derive(Clone, Debug)]
pub struct SessionRates {
    pub table: RateTable,
    pub fetched_at: SystemTime,
    pub origin: RateOrigin,
}

/// State for one run of the estimator. The engine itself stays stateless;
/// everything it needs is handed in from here per compute pass.
#[derive(Clone, Debug, Default)]
pub struct AppState {
    pub rows: Vec<QuoteRow>,
    pub rates: Option<SessionRates>,
    /// Set by an explicit user refresh; cleared when new rates land.
    pub refresh_requested: bool,
    pub params: CostParams,
}

impl AppState {
    pub fn needs_rates(&self) -> bool {
        self.refresh_requested || self.rates.is_none()
    }

    /// Replace the session rates in one assignment. The compute pass only
    /// ever sees the table before or after this, never a partial update.
    pub fn install_rates(&mut self, table: RateTable, origin: RateOrigin) {
        self.rates = Some(SessionRates {
            table,
            fetched_at: SystemTime::now(),
            origin,
        });
        self.refresh_requested = false;
    }

    /// Table for the next compute pass; defaults if nothing was installed.
    pub fn rate_table(&self) -> RateTable {
        self.rates
            .as_ref()
            .map(|session| session.table.clone())
            .unwrap_or_else(RateTable::defaults)
    }

    pub fn apply_persisted(&mut self, persisted: PersistedState) {
        self.rows = persisted.rows;
        self.params = persisted.params;
    }

    pub fn to_persisted(&self) -> PersistedState {
        PersistedState {
            rows: self.rows.clone(),
            params: self.params.clone(),
        }
    }
}

/// The subset of state worth keeping between runs.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PersistedState {
    pub rows: Vec<QuoteRow>,
    #[serde(default)]
    pub params: CostParams,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::Currency;

    #[test]
    fn install_rates_clears_the_refresh_flag() {
        let mut state = AppState {
            refresh_requested: true,
            ..AppState::default()
        };
        assert!(state.needs_rates());

        state.install_rates(RateTable::defaults(), RateOrigin::Remote);
        assert!(!state.refresh_requested);
        assert!(!state.needs_rates());
        assert_eq!(state.rates.as_ref().unwrap().origin, RateOrigin::Remote);
    }

    #[test]
    fn rate_table_defaults_until_something_is_installed() {
        let state = AppState::default();
        assert_eq!(state.rate_table().get(Currency::Usd), Some(1350.0));
    }

    #[test]
    fn persisted_round_trip_keeps_rows_and_params() {
        let mut state = AppState::default();
        state.rows = QuoteRow::samples();
        state.params.duty_rate = 0.13;

        let mut restored = AppState::default();
        restored.apply_persisted(state.to_persisted());
        assert_eq!(restored.rows, state.rows);
        assert_eq!(restored.params.duty_rate, 0.13);
    }
}
