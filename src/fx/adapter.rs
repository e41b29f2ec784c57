//! Wire-format adapters for FX sources.
//!
//! Every source declares which envelope its JSON uses; the adapter extracts
//! `{base, rates, as-of}` from the document. Two envelopes cover the APIs in
//! use: the ECB daily-reference shape and the exchangerate-api shape with its
//! aliased field names.

use std::collections::HashMap;

use chrono::DateTime;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

use crate::error::FxError;
use crate::fx::FxTable;

#[derive(Copy, Clone, Debug, Display, EnumString, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceFormat {
    /// `{base: string, rates: map, date: "YYYY-MM-DD"}`
    #[strum(serialize = "ecb-like")]
    EcbLike,

    /// `{base|base_code, rates|conversion_rates, timestamp?|date?}`
    #[strum(serialize = "exchangerate-api-like")]
    ExchangeRateApiLike,
}

impl SourceFormat {
    /// Extract an [`FxTable`] from a response body.
    pub fn parse_table(
        &self,
        body: &serde_json::Value,
        source_id: &str,
    ) -> Result<FxTable, FxError> {
        let malformed = |reason: &str| FxError::MalformedResponse {
            source_id: source_id.to_string(),
            reason: reason.to_string(),
        };

        let base = match self {
            SourceFormat::EcbLike => body.get("base"),
            SourceFormat::ExchangeRateApiLike => body.get("base").or_else(|| body.get("base_code")),
        }
        .and_then(|v| v.as_str())
        .ok_or_else(|| malformed("missing base currency"))?;

        let rates_value = match self {
            SourceFormat::EcbLike => body.get("rates"),
            SourceFormat::ExchangeRateApiLike => {
                body.get("rates").or_else(|| body.get("conversion_rates"))
            }
        }
        .and_then(|v| v.as_object())
        .ok_or_else(|| malformed("missing rates object"))?;

        let mut rates = HashMap::with_capacity(rates_value.len());
        for (code, rate) in rates_value {
            let rate = rate
                .as_f64()
                .ok_or_else(|| malformed(&format!("non-numeric rate for {code}")))?;
            rates.insert(code.clone(), rate);
        }

        let table = FxTable::try_new(base, rates)?;

        match self.extract_as_of(body) {
            Some(as_of) => {
                let dates = table
                    .rates
                    .keys()
                    .map(|code| (code.clone(), as_of.clone()))
                    .collect();
                Ok(table.with_dates(dates))
            }
            None => Ok(table),
        }
    }

    fn extract_as_of(&self, body: &serde_json::Value) -> Option<String> {
        let raw = match self {
            SourceFormat::EcbLike => body.get("date"),
            SourceFormat::ExchangeRateApiLike => body.get("timestamp").or_else(|| body.get("date")),
        }?;

        if let Some(s) = raw.as_str() {
            return Some(s.to_string());
        }
        // Unix timestamps show up on the exchangerate-api shape.
        let secs = raw.as_i64()?;
        DateTime::from_timestamp(secs, 0).map(|dt| dt.date_naive().to_string())
    }
}
