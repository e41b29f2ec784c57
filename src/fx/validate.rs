//! Sanity checks over ingested FX tables.
//!
//! Feeds with mispositioned decimal points are a recurring data-quality
//! hazard: XOF recorded as 0.56 when ~555 per USD is plausible. The check is
//! deliberately partial — codes without a recorded plausible range are not
//! checkable and pass silently.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::fx::FxTable;

/// Rough units-per-USD bands for codes whose scale errors we have actually
/// seen in the wild. Wide on purpose; these flag thousand-fold errors, not
/// market moves.
const PLAUSIBLE_RANGES: &[(&str, f64, f64)] = &[
    ("XOF", 300.0, 900.0),
    ("XAF", 300.0, 900.0),
    ("JPY", 60.0, 250.0),
    ("KRW", 700.0, 2000.0),
    ("IDR", 8_000.0, 25_000.0),
    ("VND", 15_000.0, 35_000.0),
    ("IRR", 10_000.0, 1_000_000.0),
    ("LAK", 5_000.0, 40_000.0),
    ("UGX", 1_500.0, 6_000.0),
    ("TZS", 1_000.0, 4_500.0),
    ("MGA", 1_500.0, 7_000.0),
    ("GNF", 4_000.0, 15_000.0),
    ("CLP", 400.0, 1_500.0),
    ("COP", 1_500.0, 7_000.0),
    ("PYG", 3_000.0, 12_000.0),
    ("HUF", 150.0, 600.0),
    ("ISK", 60.0, 250.0),
    ("NGN", 100.0, 3_000.0),
    ("KHR", 2_000.0, 6_000.0),
    ("MMK", 700.0, 5_000.0),
];

fn plausible_range(code: &str) -> Option<(f64, f64)> {
    PLAUSIBLE_RANGES
        .iter()
        .find(|(c, _, _)| c.eq_ignore_ascii_case(code))
        .map(|(_, lo, hi)| (*lo, *hi))
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RateIssueKind {
    /// Zero, negative, NaN or infinite.
    NonPositive,
    /// Off the plausible band by a factor of 1000 or more.
    OffByMagnitude,
}

/// One flagged rate. `corrected` carries the thousand-fold fix when applying
/// it would land the rate inside the plausible band.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateIssue {
    pub code: String,
    pub rate: f64,
    pub kind: RateIssueKind,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub corrected: Option<f64>,
}

/// Scan a table for invalid or implausible rates without modifying it.
pub fn validate_rates(table: &FxTable) -> Vec<RateIssue> {
    let mut issues = Vec::new();
    for (code, &rate) in &table.rates {
        if !rate.is_finite() || rate <= 0.0 {
            issues.push(RateIssue {
                code: code.clone(),
                rate,
                kind: RateIssueKind::NonPositive,
                corrected: None,
            });
            continue;
        }

        let Some((lo, hi)) = plausible_range(code) else {
            continue;
        };
        // A thousand-fold error either lands back in range when scaled up
        // (the classic dropped-decimals feed) or sits a factor >= 1000
        // outside the band in either direction.
        let scaled_up = rate * 1000.0;
        let correctable = scaled_up >= lo && scaled_up <= hi;
        if correctable || rate <= lo / 1000.0 || rate >= hi * 1000.0 {
            issues.push(RateIssue {
                code: code.clone(),
                rate,
                kind: RateIssueKind::OffByMagnitude,
                corrected: correctable.then_some(scaled_up),
            });
        }
    }
    issues
}

/// Apply thousand-fold corrections where validation found one; every issue is
/// reported whether or not it was correctable.
pub fn auto_correct(table: &FxTable) -> (FxTable, Vec<RateIssue>) {
    let issues = validate_rates(table);
    if issues.is_empty() {
        return (table.clone(), issues);
    }

    let mut corrected = table.clone();
    for issue in &issues {
        if let Some(fixed) = issue.corrected {
            warn!(
                code = %issue.code,
                rate = issue.rate,
                corrected = fixed,
                "auto-correcting implausible FX rate"
            );
            corrected.rates.insert(issue.code.clone(), fixed);
        }
    }
    (corrected, issues)
}
