pub mod adapter;
pub(crate) mod cache;
pub mod provider;
pub mod validate;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::FxError;

pub use adapter::SourceFormat;
pub use provider::{FxAcquisition, FxOrigin, FxProvider, FxProviderOptions, FxSource};

/// A snapshot of exchange rates against one base currency.
///
/// Rates are units-per-base: with `base = "USD"`, `rates["XOF"] = 558.16`
/// means 558.16 XOF buy one dollar. The base's own rate is implicit 1 and
/// need not be present in the map.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FxTable {
    pub base: String,
    pub rates: HashMap<String, f64>,

    /// Optional per-code as-of dates (ISO-8601).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dates: Option<HashMap<String, String>>,
}

impl FxTable {
    /// Build a table, rejecting non-finite, zero or negative rates at
    /// ingestion. Codes are uppercased.
    pub fn try_new(
        base: impl Into<String>,
        rates: HashMap<String, f64>,
    ) -> Result<Self, FxError> {
        let mut clean = HashMap::with_capacity(rates.len());
        for (code, rate) in rates {
            if !rate.is_finite() || rate <= 0.0 {
                return Err(FxError::InvalidRate { code, rate });
            }
            clean.insert(code.to_uppercase(), rate);
        }
        Ok(Self {
            base: base.into().to_uppercase(),
            rates: clean,
            dates: None,
        })
    }

    pub fn with_dates(mut self, dates: HashMap<String, String>) -> Self {
        self.dates = Some(dates);
        self
    }

    /// Units of `code` per one unit of the base. The base itself is 1.
    pub fn rate(&self, code: &str) -> Option<f64> {
        let code = code.to_uppercase();
        if code == self.base {
            return Some(1.0);
        }
        self.rates.get(&code).copied()
    }

    /// Factor that converts an amount of `from` into `to`:
    /// `amount_to = amount_from * cross_rate(from, to)`.
    pub fn cross_rate(&self, from: &str, to: &str) -> Option<f64> {
        Some(self.rate(to)? / self.rate(from)?)
    }

    pub fn as_of(&self, code: &str) -> Option<&str> {
        self.dates
            .as_ref()?
            .get(&code.to_uppercase())
            .map(String::as_str)
    }
}
