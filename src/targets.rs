//! Majority-vote normalization targets per indicator group.
//!
//! Observations are grouped by a normalized indicator key; within a group
//! the most common parsed currency, magnitude and time basis become the
//! group's targets. Ties prefer the incumbent target when one is supplied,
//! then a fixed priority order so repeated runs agree.

use std::collections::{BTreeMap, HashMap};

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::scale::{Magnitude, TimeScale};
use crate::types::{NormalizationTargets, Observation};
use crate::unit::{parse, patterns};

/// Grouping key: lowercase, trimmed, internal whitespace collapsed, so
/// "Balance of Trade", " BALANCE OF TRADE " and "Balance  of  Trade" all
/// land in one group.
pub fn indicator_key(name: &str) -> String {
    patterns::normalize_text(name)
}

#[derive(Clone, Debug, Default)]
pub struct AutoTargetOptions {
    /// Existing targets; a tied vote keeps these rather than switching.
    pub incumbent: Option<NormalizationTargets>,
}

/// The vote's outcome for one indicator group.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoTargetSelection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub magnitude: Option<Magnitude>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<TimeScale>,

    /// dimension -> value -> fraction of group observations carrying it.
    pub shares: BTreeMap<String, BTreeMap<String, f64>>,

    pub reason: String,
}

impl AutoTargetSelection {
    pub fn targets(&self) -> NormalizationTargets {
        NormalizationTargets {
            to_currency: self.currency.clone(),
            to_magnitude: self.magnitude,
            to_time_scale: self.time,
        }
    }
}

/// Compute per-group targets over the raw (unparsed) population.
pub fn compute_auto_targets(
    observations: &[Observation],
    opts: &AutoTargetOptions,
) -> HashMap<String, AutoTargetSelection> {
    let groups = observations
        .iter()
        .map(|obs| {
            let key = indicator_key(obs.name.as_deref().unwrap_or(&obs.id));
            (key, obs)
        })
        .into_group_map();

    groups
        .into_iter()
        .map(|(key, group)| {
            let selection = select_for_group(&group, opts);
            (key, selection)
        })
        .collect()
}

fn select_for_group(group: &[&Observation], opts: &AutoTargetOptions) -> AutoTargetSelection {
    let parsed: Vec<_> = group.iter().map(|obs| parse(&obs.unit)).collect();

    let currencies: Vec<String> = parsed.iter().filter_map(|p| p.currency.clone()).collect();
    let magnitudes: Vec<String> = parsed
        .iter()
        .filter_map(|p| p.scale)
        .map(|m| m.to_string())
        .collect();
    let times: Vec<String> = parsed
        .iter()
        .filter_map(|p| p.time_scale)
        .map(|t| t.to_string())
        .collect();

    let incumbent = opts.incumbent.as_ref();

    let (currency, currency_shares) = vote(
        &currencies,
        incumbent.and_then(|t| t.to_currency.clone()),
        currency_priority,
    );
    let (magnitude_token, magnitude_shares) = vote(
        &magnitudes,
        incumbent.and_then(|t| t.to_magnitude.map(|m| m.to_string())),
        magnitude_priority,
    );
    let (time_token, time_shares) = vote(
        &times,
        incumbent.and_then(|t| t.to_time_scale.map(|t| t.to_string())),
        time_priority,
    );

    let magnitude = magnitude_token.as_deref().and_then(|t| t.parse().ok());
    let time = time_token.as_deref().and_then(|t| t.parse().ok());

    let reason = describe_vote(
        group.len(),
        currency.as_deref(),
        &currency_shares,
        magnitude_token.as_deref(),
        &magnitude_shares,
        time_token.as_deref(),
        &time_shares,
    );

    let mut shares = BTreeMap::new();
    if !currency_shares.is_empty() {
        shares.insert("currency".to_string(), currency_shares);
    }
    if !magnitude_shares.is_empty() {
        shares.insert("magnitude".to_string(), magnitude_shares);
    }
    if !time_shares.is_empty() {
        shares.insert("time".to_string(), time_shares);
    }

    AutoTargetSelection {
        currency,
        magnitude,
        time,
        shares,
        reason,
    }
}

/// Arg-max by count; ties broken by the incumbent, then ascending priority,
/// then token order.
fn vote(
    values: &[String],
    incumbent: Option<String>,
    priority: fn(&str) -> u8,
) -> (Option<String>, BTreeMap<String, f64>) {
    if values.is_empty() {
        return (None, BTreeMap::new());
    }

    let total = values.len() as f64;
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for value in values {
        *counts.entry(value.as_str()).or_default() += 1;
    }

    let shares: BTreeMap<String, f64> = counts
        .iter()
        .map(|(value, count)| (value.to_string(), *count as f64 / total))
        .collect();

    // Rank by descending count, incumbent first on ties, then the fixed
    // priority order, then the token itself for full determinism.
    let mut ranked: Vec<(&str, usize)> =
        counts.iter().map(|(value, count)| (*value, *count)).collect();
    ranked.sort_by_key(|&(value, count)| {
        let is_incumbent = incumbent.as_deref() == Some(value);
        (
            usize::MAX - count,
            if is_incumbent { 0u8 } else { 1 },
            priority(value),
            value.to_string(),
        )
    });
    let winner = ranked.first().map(|(value, _)| value.to_string());

    (winner, shares)
}

fn currency_priority(code: &str) -> u8 {
    match code {
        "USD" => 0,
        "EUR" => 1,
        _ => 2,
    }
}

fn magnitude_priority(token: &str) -> u8 {
    match token {
        "millions" => 0,
        "billions" => 1,
        "thousands" => 2,
        _ => 3,
    }
}

fn time_priority(token: &str) -> u8 {
    match token {
        "month" => 0,
        "quarter" => 1,
        "year" => 2,
        _ => 3,
    }
}

fn describe_vote(
    group_size: usize,
    currency: Option<&str>,
    currency_shares: &BTreeMap<String, f64>,
    magnitude: Option<&str>,
    magnitude_shares: &BTreeMap<String, f64>,
    time: Option<&str>,
    time_shares: &BTreeMap<String, f64>,
) -> String {
    let mut parts = Vec::new();
    if let Some(code) = currency {
        parts.push(format!(
            "currency {code} ({:.0}%)",
            currency_shares.get(code).copied().unwrap_or(0.0) * 100.0
        ));
    }
    if let Some(token) = magnitude {
        parts.push(format!(
            "magnitude {token} ({:.0}%)",
            magnitude_shares.get(token).copied().unwrap_or(0.0) * 100.0
        ));
    }
    if let Some(token) = time {
        parts.push(format!(
            "time {token} ({:.0}%)",
            time_shares.get(token).copied().unwrap_or(0.0) * 100.0
        ));
    }
    if parts.is_empty() {
        format!("no dimension had a parsed value across {group_size} observations")
    } else {
        format!(
            "majority vote over {group_size} observations: {}",
            parts.join(", ")
        )
    }
}
