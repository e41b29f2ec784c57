//! Drives whole populations of observations through the pipeline.
//!
//! Per-item failures never abort the batch; they come back as failure
//! records next to the successes. Items are processed in parallel on a
//! bounded rayon pool, but the output sequences follow input order exactly.
//! The FX snapshot is fetched (at most) once per batch and shared read-only.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use strum_macros::Display;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::error::FxError;
use crate::fx::FxProvider;
use crate::normalize::{normalize, FxProvenance, NormalizeOptions, TargetSelectionExplain};
use crate::outlier::{
    decimal_magnitude, detect_scale_outliers, outlier_warning, NormalizedPoint, OutlierOptions,
};
use crate::targets::{compute_auto_targets, indicator_key, AutoTargetOptions, AutoTargetSelection};
use crate::types::{NormalizationTargets, NormalizedObservation, Observation};

#[derive(Clone, Debug, Default)]
pub struct BatchOptions {
    /// Fixed targets applied to every item; set fields win over auto-vote
    /// results.
    pub targets: Option<NormalizationTargets>,

    /// Derive per-indicator-group targets by majority vote before
    /// processing.
    pub auto_targets: bool,
    pub auto_target_options: AutoTargetOptions,

    pub detect_scale_outliers: bool,
    pub outlier: OutlierOptions,

    pub fx: Option<Arc<crate::fx::FxTable>>,
    pub fx_provenance: Option<FxProvenance>,

    /// Upper bound on parallel workers; default lets rayon decide.
    pub workers: Option<usize>,

    /// Cooperative cancellation: remaining items are skipped and the partial
    /// result is returned.
    pub cancel: Option<CancellationToken>,
}

#[derive(Copy, Clone, Debug, Display, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum BatchStage {
    Parse,
    Normalize,
    Explain,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchFailure {
    pub id: String,
    pub stage: BatchStage,
    pub error: String,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchStats {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Items skipped because the batch was cancelled.
    pub skipped: usize,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_value: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_value: Option<f64>,

    pub elapsed_ms: u64,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResult {
    pub successful: Vec<NormalizedObservation>,
    pub failed: Vec<BatchFailure>,
    pub stats: BatchStats,
}

/// Process a batch synchronously against a pre-fetched FX snapshot.
pub fn process_batch(items: &[Observation], opts: &BatchOptions) -> BatchResult {
    let start = Instant::now();

    // Targets are voted on the raw population before anything is normalized.
    let auto = opts
        .auto_targets
        .then(|| compute_auto_targets(items, &opts.auto_target_options));

    let outcomes = run_items(items, opts, auto.as_ref());

    let mut successful = Vec::new();
    let mut failed = Vec::new();
    let mut skipped = 0usize;
    for outcome in outcomes {
        match outcome {
            Some(Ok(obs)) => successful.push(obs),
            Some(Err(failure)) => failed.push(failure),
            None => skipped += 1,
        }
    }

    if opts.detect_scale_outliers {
        annotate_outliers(items, &mut successful, &opts.outlier);
    }

    for obs in &mut successful {
        *obs = obs.clone().scored();
    }

    let min_value = successful
        .iter()
        .map(|o| o.normalized_value)
        .fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |a| a.min(v))));
    let max_value = successful
        .iter()
        .map(|o| o.normalized_value)
        .fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |a| a.max(v))));

    let stats = BatchStats {
        total: items.len(),
        succeeded: successful.len(),
        failed: failed.len(),
        skipped,
        min_value,
        max_value,
        elapsed_ms: start.elapsed().as_millis() as u64,
    };

    info!(
        total = stats.total,
        succeeded = stats.succeeded,
        failed = stats.failed,
        skipped = stats.skipped,
        elapsed_ms = stats.elapsed_ms,
        "batch processed"
    );

    BatchResult {
        successful,
        failed,
        stats,
    }
}

/// Async convenience: fetch one FX snapshot for the whole batch, then
/// process. Cancellation covers both the fetch and the items.
pub async fn process_batch_with_provider(
    items: &[Observation],
    provider: &FxProvider,
    base: &str,
    opts: &BatchOptions,
) -> Result<BatchResult, FxError> {
    let acquisition = match &opts.cancel {
        Some(token) => provider.fetch_with_cancel(base, token).await?,
        None => provider.fetch(base).await?,
    };

    let mut effective = opts.clone();
    effective.fx_provenance = Some(FxProvenance {
        origin: acquisition.origin,
        source_id: acquisition.source_id.clone(),
    });
    effective.fx = Some(Arc::new(acquisition.table));

    Ok(process_batch(items, &effective))
}

type ItemOutcome = Option<Result<NormalizedObservation, BatchFailure>>;

fn run_items(
    items: &[Observation],
    opts: &BatchOptions,
    auto: Option<&HashMap<String, AutoTargetSelection>>,
) -> Vec<ItemOutcome> {
    let work = || {
        items
            .par_iter()
            .map(|obs| {
                if opts
                    .cancel
                    .as_ref()
                    .is_some_and(CancellationToken::is_cancelled)
                {
                    return None;
                }
                Some(process_one(obs, opts, auto))
            })
            .collect()
    };

    match opts.workers {
        Some(workers) => match rayon::ThreadPoolBuilder::new().num_threads(workers).build() {
            Ok(pool) => pool.install(work),
            Err(e) => {
                warn!(error = %e, "falling back to the global rayon pool");
                work()
            }
        },
        None => work(),
    }
}

fn process_one(
    obs: &Observation,
    opts: &BatchOptions,
    auto: Option<&HashMap<String, AutoTargetSelection>>,
) -> Result<NormalizedObservation, BatchFailure> {
    let selection = auto.and_then(|targets| {
        targets.get(&indicator_key(obs.name.as_deref().unwrap_or(&obs.id)))
    });

    let targets = merge_targets(opts.targets.as_ref(), selection);

    let normalize_opts = NormalizeOptions {
        to_currency: targets.to_currency,
        to_magnitude: targets.to_magnitude,
        to_time_scale: targets.to_time_scale,
        fx: opts.fx.clone(),
        fx_provenance: opts.fx_provenance.clone(),
        explicit_currency: obs.currency_code.clone(),
        explicit_scale: obs.scale,
        explicit_time_scale: obs.time_scale,
        indicator_name: obs.name.clone(),
        indicator_type: obs.indicator_type,
        temporal_aggregation: obs.effective_aggregation(),
        reporting_frequency: obs.periodicity,
    };

    let mut normalization =
        normalize(obs.value, &obs.unit, &normalize_opts).map_err(|e| BatchFailure {
            id: obs.id.clone(),
            stage: BatchStage::Normalize,
            error: e.to_string(),
        })?;

    if let Some(selection) = selection {
        normalization.explain.target_selection = Some(TargetSelectionExplain {
            currency: selection.currency.clone(),
            magnitude: selection.magnitude,
            time: selection.time,
            reason: selection.reason.clone(),
        });
    }

    Ok(NormalizedObservation {
        id: obs.id.clone(),
        original_value: obs.value,
        original_unit: obs.unit.clone(),
        normalized_value: normalization.value,
        normalized_unit: normalization.unit,
        normalized_full_unit: normalization.full_unit,
        explain: normalization.explain,
        quality_score: None,
    })
}

/// Per-dimension merge: batch-level fixed targets beat the group vote.
fn merge_targets(
    fixed: Option<&NormalizationTargets>,
    auto: Option<&AutoTargetSelection>,
) -> NormalizationTargets {
    let voted = auto.map(AutoTargetSelection::targets).unwrap_or_default();
    match fixed {
        Some(fixed) => NormalizationTargets {
            to_currency: fixed.to_currency.clone().or(voted.to_currency),
            to_magnitude: fixed.to_magnitude.or(voted.to_magnitude),
            to_time_scale: fixed.to_time_scale.or(voted.to_time_scale),
        },
        None => voted,
    }
}

/// Group the successes by indicator and attach scale-outlier warnings.
fn annotate_outliers(
    items: &[Observation],
    successful: &mut [NormalizedObservation],
    opts: &OutlierOptions,
) {
    let key_by_id: HashMap<&str, String> = items
        .iter()
        .map(|obs| {
            (
                obs.id.as_str(),
                indicator_key(obs.name.as_deref().unwrap_or(&obs.id)),
            )
        })
        .collect();

    let mut groups: HashMap<String, Vec<NormalizedPoint>> = HashMap::new();
    for obs in successful.iter() {
        let Some(key) = key_by_id.get(obs.id.as_str()) else {
            continue;
        };
        groups.entry(key.clone()).or_default().push(NormalizedPoint {
            id: obs.id.clone(),
            normalized: obs.normalized_value,
        });
    }

    for points in groups.values() {
        let report = detect_scale_outliers(points, opts);
        if !report.has_outliers {
            continue;
        }
        for obs in successful.iter_mut() {
            if !report.outlier_ids.contains(&obs.id) {
                continue;
            }
            let magnitude = decimal_magnitude(obs.normalized_value);
            obs.explain.push_warning(outlier_warning(
                obs.normalized_value,
                magnitude,
                &report,
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fx::FxTable;
    use crate::rules::IndicatorType;
    use crate::scale::Magnitude;
    use crate::types::WarningKind;
    use std::collections::HashMap as Map;

    fn fx() -> Arc<FxTable> {
        Arc::new(
            FxTable::try_new(
                "USD",
                Map::from([("XOF".to_string(), 558.16), ("EUR".to_string(), 0.9)]),
            )
            .unwrap(),
        )
    }

    fn obs(id: &str, name: &str, value: f64, unit: &str) -> Observation {
        Observation {
            id: id.to_string(),
            name: Some(name.to_string()),
            value,
            unit: unit.to_string(),
            indicator_type: Some(IndicatorType::Flow),
            ..Default::default()
        }
    }

    #[test]
    fn output_order_matches_input_order() {
        let items: Vec<Observation> = (0..32)
            .map(|i| obs(&format!("id-{i}"), "Exports", i as f64 + 1.0, "USD Millions"))
            .collect();
        let result = process_batch(&items, &BatchOptions::default());
        assert_eq!(result.successful.len(), 32);
        for (i, out) in result.successful.iter().enumerate() {
            assert_eq!(out.id, format!("id-{i}"));
        }
    }

    #[test]
    fn per_item_failures_do_not_abort_the_batch() {
        let mut bad = obs("bad", "Trade", 5.0, "GHS Millions");
        bad.currency_code = None;
        let items = vec![
            obs("good", "Trade", 1.0, "USD Millions"),
            bad,
            obs("also-good", "Trade", 2.0, "USD Millions"),
        ];
        let opts = BatchOptions {
            targets: Some(NormalizationTargets {
                to_currency: Some("USD".into()),
                ..Default::default()
            }),
            fx: Some(fx()),
            ..Default::default()
        };
        // GHS has no rate in the table: one hard failure, two successes.
        let result = process_batch(&items, &opts);
        assert_eq!(result.stats.succeeded, 2);
        assert_eq!(result.stats.failed, 1);
        assert_eq!(result.failed[0].id, "bad");
        assert_eq!(result.failed[0].stage, BatchStage::Normalize);
    }

    #[test]
    fn stats_capture_value_range() {
        let items = vec![
            obs("a", "Exports", -5.0, "USD Millions"),
            obs("b", "Exports", 10.0, "USD Millions"),
        ];
        let result = process_batch(&items, &BatchOptions::default());
        assert_eq!(result.stats.min_value, Some(-5.0));
        assert_eq!(result.stats.max_value, Some(10.0));
        assert_eq!(result.stats.total, 2);
    }

    #[test]
    fn auto_targets_convert_the_minority_to_the_majority() {
        let items = vec![
            obs("a", "Balance of Trade", 1.0, "XOF Billions"),
            obs("b", "Balance of Trade", 2.0, "XOF Billions"),
            obs("c", "Balance of Trade", 3_000.0, "XOF Millions"),
        ];
        let opts = BatchOptions {
            auto_targets: true,
            fx: Some(fx()),
            ..Default::default()
        };
        let result = process_batch(&items, &opts);
        assert_eq!(result.stats.succeeded, 3);

        let c = result
            .successful
            .iter()
            .find(|o| o.id == "c")
            .unwrap();
        // Voted magnitude is billions: 3000 millions becomes 3 billions.
        assert!((c.normalized_value - 3.0).abs() < 1e-9);
        assert!(c.explain.target_selection.is_some());
    }

    #[test]
    fn fixed_targets_override_the_vote_per_dimension() {
        let items = vec![
            obs("a", "Exports", 1.0, "XOF Billions"),
            obs("b", "Exports", 2.0, "XOF Billions"),
        ];
        let opts = BatchOptions {
            auto_targets: true,
            targets: Some(NormalizationTargets {
                to_magnitude: Some(Magnitude::Millions),
                ..Default::default()
            }),
            fx: Some(fx()),
            ..Default::default()
        };
        let result = process_batch(&items, &opts);
        let a = &result.successful[0];
        assert!((a.normalized_value - 1000.0).abs() < 1e-9);
    }

    #[test]
    fn outlier_annotation_lands_on_the_odd_one_out() {
        let values = [3.0e8, 1.0e6, 2.0e6, 8.0e6, 5.0e5];
        let items: Vec<Observation> = values
            .iter()
            .enumerate()
            .map(|(i, v)| {
                let mut o = obs(&format!("t{i}"), "Tourist Arrivals", *v, "units");
                o.indicator_type = Some(IndicatorType::Count);
                o
            })
            .collect();
        let opts = BatchOptions {
            detect_scale_outliers: true,
            ..Default::default()
        };
        let result = process_batch(&items, &opts);
        assert_eq!(result.stats.succeeded, 5);

        let flagged = result.successful.iter().find(|o| o.id == "t0").unwrap();
        let warnings = flagged.explain.quality_warnings.as_ref().unwrap();
        let outlier = warnings
            .iter()
            .find(|w| w.kind == WarningKind::ScaleOutlier)
            .unwrap();
        let details = outlier.details.as_ref().unwrap();
        assert_eq!(details["magnitudeDifference"], 2);
        assert_eq!(details["dominantMagnitude"], 6);

        // Quality score reflects the warning.
        assert!(flagged.quality_score.unwrap() < 1.0);
        let clean = result.successful.iter().find(|o| o.id == "t1").unwrap();
        assert_eq!(clean.quality_score, Some(1.0));
    }

    #[test]
    fn cancellation_returns_partial_results() {
        let token = CancellationToken::new();
        token.cancel();
        let items: Vec<Observation> = (0..8)
            .map(|i| obs(&format!("id-{i}"), "Exports", 1.0, "USD Millions"))
            .collect();
        let opts = BatchOptions {
            cancel: Some(token),
            ..Default::default()
        };
        let result = process_batch(&items, &opts);
        assert_eq!(result.stats.skipped, 8);
        assert_eq!(result.stats.succeeded, 0);
    }
}
