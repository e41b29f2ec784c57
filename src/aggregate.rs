//! Aggregation helpers over normalized (or normalizable) series.
//!
//! Aggregating mixed units is refused unless the caller opts into
//! pre-normalization, in which case every point runs through the normalizer
//! with the supplied options before the statistic is computed.

use chrono::{DateTime, Utc};
use itertools::Itertools;
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use crate::error::AggregateError;
use crate::normalize::{normalize, NormalizeOptions};

/// One value entering an aggregation.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesPoint {
    pub value: f64,
    pub unit: String,
}

#[derive(Clone, Debug, Default)]
pub struct AggregateOptions {
    /// Normalize every point to the targets in `normalize` before
    /// aggregating; required whenever units differ.
    pub normalize_first: bool,
    pub normalize: NormalizeOptions,
}

/// How the weighted mean weighs its points.
#[derive(Clone, Debug)]
pub enum Weighting {
    /// Each point weighs its own absolute value.
    Values,
    Explicit(Vec<f64>),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateMeta {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub variance: f64,
    pub std_dev: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Aggregate {
    pub value: f64,
    pub unit: String,
    pub meta: AggregateMeta,
}

pub fn sum(points: &[SeriesPoint], opts: &AggregateOptions) -> Result<Aggregate, AggregateError> {
    let (values, unit) = prepare(points, opts)?;
    let value = values.iter().sum();
    Ok(wrap(value, unit, &values))
}

pub fn mean(points: &[SeriesPoint], opts: &AggregateOptions) -> Result<Aggregate, AggregateError> {
    let (values, unit) = prepare(points, opts)?;
    let value = values.iter().sum::<f64>() / values.len() as f64;
    Ok(wrap(value, unit, &values))
}

pub fn median(
    points: &[SeriesPoint],
    opts: &AggregateOptions,
) -> Result<Aggregate, AggregateError> {
    let (values, unit) = prepare(points, opts)?;
    let sorted: Vec<f64> = values
        .iter()
        .copied()
        .sorted_by_key(|v| OrderedFloat(*v))
        .collect();
    let mid = sorted.len() / 2;
    let value = if sorted.len() % 2 == 1 {
        sorted[mid]
    } else {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    };
    Ok(wrap(value, unit, &values))
}

pub fn weighted_mean(
    points: &[SeriesPoint],
    weighting: &Weighting,
    opts: &AggregateOptions,
) -> Result<Aggregate, AggregateError> {
    let (values, unit) = prepare(points, opts)?;

    let weights: Vec<f64> = match weighting {
        Weighting::Values => values.iter().map(|v| v.abs()).collect(),
        Weighting::Explicit(w) => {
            if w.len() != values.len() {
                return Err(AggregateError::WeightCountMismatch {
                    weights: w.len(),
                    values: values.len(),
                });
            }
            w.clone()
        }
    };

    let weight_sum: f64 = weights.iter().sum();
    if weight_sum <= 0.0 {
        return Err(AggregateError::ZeroWeightSum(weight_sum));
    }

    let value = values
        .iter()
        .zip(&weights)
        .map(|(v, w)| v * w)
        .sum::<f64>()
        / weight_sum;
    Ok(wrap(value, unit, &values))
}

pub fn geometric_mean(
    points: &[SeriesPoint],
    opts: &AggregateOptions,
) -> Result<Aggregate, AggregateError> {
    let (values, unit) = prepare(points, opts)?;
    require_positive(&values, "geometric")?;
    let log_sum: f64 = values.iter().map(|v| v.ln()).sum();
    let value = (log_sum / values.len() as f64).exp();
    Ok(wrap(value, unit, &values))
}

pub fn harmonic_mean(
    points: &[SeriesPoint],
    opts: &AggregateOptions,
) -> Result<Aggregate, AggregateError> {
    let (values, unit) = prepare(points, opts)?;
    require_positive(&values, "harmonic")?;
    let reciprocal_sum: f64 = values.iter().map(|v| 1.0 / v).sum();
    let value = values.len() as f64 / reciprocal_sum;
    Ok(wrap(value, unit, &values))
}

/// A timestamped value for the moving average.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimePoint {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
    pub unit: String,
}

/// Trailing moving average. Each output keeps the timestamp and unit of its
/// anchor (the newest point in the window); the first `window - 1` points
/// produce no output.
pub fn moving_average(
    points: &[TimePoint],
    window: usize,
) -> Result<Vec<TimePoint>, AggregateError> {
    if window == 0 {
        return Err(AggregateError::EmptyWindow);
    }
    if points.is_empty() {
        return Err(AggregateError::EmptyInput);
    }

    Ok(points
        .windows(window)
        .map(|slice| {
            let anchor = &slice[slice.len() - 1];
            TimePoint {
                timestamp: anchor.timestamp,
                value: slice.iter().map(|p| p.value).sum::<f64>() / window as f64,
                unit: anchor.unit.clone(),
            }
        })
        .collect())
}

// ================================================================================================
// Shared plumbing
// ================================================================================================

/// Validate units (or normalize them away) and extract the value vector.
fn prepare(
    points: &[SeriesPoint],
    opts: &AggregateOptions,
) -> Result<(Vec<f64>, String), AggregateError> {
    if points.is_empty() {
        return Err(AggregateError::EmptyInput);
    }

    if opts.normalize_first {
        let mut values = Vec::with_capacity(points.len());
        let mut unit = String::new();
        for point in points {
            let normalized = normalize(point.value, &point.unit, &opts.normalize)?;
            if unit.is_empty() {
                unit = normalized.unit.clone();
            }
            values.push(normalized.value);
        }
        return Ok((values, unit));
    }

    let unit = points[0].unit.clone();
    for point in &points[1..] {
        if point.unit != unit {
            return Err(AggregateError::UnitMismatch {
                expected: unit,
                found: point.unit.clone(),
            });
        }
    }
    Ok((points.iter().map(|p| p.value).collect(), unit))
}

fn require_positive(values: &[f64], kind: &str) -> Result<(), AggregateError> {
    match values.iter().find(|v| **v <= 0.0) {
        Some(bad) => Err(AggregateError::NonPositiveValue {
            kind: kind.to_string(),
            value: *bad,
        }),
        None => Ok(()),
    }
}

fn wrap(value: f64, unit: String, values: &[f64]) -> Aggregate {
    let count = values.len();
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let mean = values.iter().sum::<f64>() / count as f64;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / count as f64;

    Aggregate {
        value,
        unit,
        meta: AggregateMeta {
            count,
            min,
            max,
            variance,
            std_dev: variance.sqrt(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scale::Magnitude;
    use chrono::TimeZone;

    fn pts(values: &[f64]) -> Vec<SeriesPoint> {
        values
            .iter()
            .map(|v| SeriesPoint {
                value: *v,
                unit: "USD Millions".to_string(),
            })
            .collect()
    }

    #[test]
    fn sum_mean_median_on_uniform_units() {
        let points = pts(&[1.0, 2.0, 3.0, 4.0]);
        let opts = AggregateOptions::default();
        assert_eq!(sum(&points, &opts).unwrap().value, 10.0);
        assert_eq!(mean(&points, &opts).unwrap().value, 2.5);
        assert_eq!(median(&points, &opts).unwrap().value, 2.5);

        let odd = pts(&[5.0, 1.0, 3.0]);
        assert_eq!(median(&odd, &opts).unwrap().value, 3.0);
    }

    #[test]
    fn meta_carries_range_and_dispersion() {
        let agg = mean(&pts(&[2.0, 4.0, 6.0, 8.0]), &AggregateOptions::default()).unwrap();
        assert_eq!(agg.meta.count, 4);
        assert_eq!(agg.meta.min, 2.0);
        assert_eq!(agg.meta.max, 8.0);
        assert!((agg.meta.variance - 5.0).abs() < 1e-12);
        assert!((agg.meta.std_dev - 5.0_f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn empty_input_errors() {
        let err = sum(&[], &AggregateOptions::default());
        assert!(matches!(err, Err(AggregateError::EmptyInput)));
    }

    #[test]
    fn unit_mismatch_without_normalize_first_errors() {
        let points = vec![
            SeriesPoint {
                value: 1.0,
                unit: "USD Millions".into(),
            },
            SeriesPoint {
                value: 2.0,
                unit: "EUR Millions".into(),
            },
        ];
        let err = sum(&points, &AggregateOptions::default());
        assert!(matches!(err, Err(AggregateError::UnitMismatch { .. })));
    }

    #[test]
    fn normalize_first_reconciles_magnitudes() {
        let points = vec![
            SeriesPoint {
                value: 1.0,
                unit: "USD Billions".into(),
            },
            SeriesPoint {
                value: 500.0,
                unit: "USD Millions".into(),
            },
        ];
        let opts = AggregateOptions {
            normalize_first: true,
            normalize: NormalizeOptions {
                to_magnitude: Some(Magnitude::Millions),
                ..Default::default()
            },
        };
        let agg = sum(&points, &opts).unwrap();
        assert_eq!(agg.value, 1500.0);
        assert_eq!(agg.unit, "USD");
    }

    #[test]
    fn weighted_mean_by_own_values() {
        let points = pts(&[10.0, 30.0]);
        let agg = weighted_mean(&points, &Weighting::Values, &AggregateOptions::default()).unwrap();
        // (10*10 + 30*30) / 40 = 25
        assert_eq!(agg.value, 25.0);
    }

    #[test]
    fn weighted_mean_with_explicit_weights() {
        let points = pts(&[10.0, 20.0]);
        let agg = weighted_mean(
            &points,
            &Weighting::Explicit(vec![3.0, 1.0]),
            &AggregateOptions::default(),
        )
        .unwrap();
        assert_eq!(agg.value, 12.5);

        let err = weighted_mean(
            &points,
            &Weighting::Explicit(vec![1.0]),
            &AggregateOptions::default(),
        );
        assert!(matches!(
            err,
            Err(AggregateError::WeightCountMismatch { .. })
        ));
    }

    #[test]
    fn geometric_mean_requires_positive_values() {
        let agg = geometric_mean(&pts(&[1.0, 100.0]), &AggregateOptions::default()).unwrap();
        assert!((agg.value - 10.0).abs() < 1e-12);

        let err = geometric_mean(&pts(&[1.0, -2.0]), &AggregateOptions::default());
        assert!(matches!(err, Err(AggregateError::NonPositiveValue { .. })));
        let err = geometric_mean(&pts(&[1.0, 0.0]), &AggregateOptions::default());
        assert!(matches!(err, Err(AggregateError::NonPositiveValue { .. })));
    }

    #[test]
    fn harmonic_mean_of_two_and_six_is_three() {
        let agg = harmonic_mean(&pts(&[2.0, 6.0]), &AggregateOptions::default()).unwrap();
        assert!((agg.value - 3.0).abs() < 1e-12);
    }

    #[test]
    fn moving_average_preserves_anchor_timestamps_and_unit() {
        let t0 = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let points: Vec<TimePoint> = (0..4)
            .map(|i| TimePoint {
                timestamp: t0 + chrono::Duration::days(i),
                value: (i + 1) as f64,
                unit: "USD Millions".into(),
            })
            .collect();

        let smoothed = moving_average(&points, 2).unwrap();
        assert_eq!(smoothed.len(), 3);
        assert_eq!(smoothed[0].value, 1.5);
        assert_eq!(smoothed[0].timestamp, points[1].timestamp);
        assert_eq!(smoothed[2].value, 3.5);
        assert_eq!(smoothed[0].unit, "USD Millions");

        let err = moving_average(&points, 0);
        assert!(matches!(err, Err(AggregateError::EmptyWindow)));
    }
}
