//! Order-of-magnitude clustering over normalized values.
//!
//! Within one indicator group, most observations should share a decimal
//! order of magnitude once normalized. When a dominant cluster exists and an
//! observation sits far enough from it, that observation is flagged rather
//! than silently averaged into nonsense.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::types::{QualityWarning, WarningKind};

#[derive(Clone, Debug)]
pub struct OutlierOptions {
    /// Minimum share the dominant magnitude must hold for outliers to be
    /// called at all.
    pub cluster_threshold: f64,
    /// Orders of magnitude away from the dominant cluster that make an
    /// observation an outlier.
    pub magnitude_difference_threshold: i32,
    pub include_details: bool,
}

impl Default for OutlierOptions {
    fn default() -> Self {
        Self {
            cluster_threshold: 0.6,
            magnitude_difference_threshold: 2,
            include_details: false,
        }
    }
}

/// One id/value pair entering the detector.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedPoint {
    pub id: String,
    pub normalized: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutlierDetail {
    pub id: String,
    pub value: f64,
    pub magnitude: i32,
    pub magnitude_difference: i32,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutlierReport {
    pub has_outliers: bool,
    pub outlier_ids: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub dominant_magnitude: Option<i32>,

    /// magnitude -> observation count.
    pub distribution: BTreeMap<i32, usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub outlier_details: Option<Vec<OutlierDetail>>,
}

/// Flag observations whose `floor(log10(|value|))` strays from the group's
/// dominant magnitude. Zeros and non-finite values are excluded; fewer than
/// three usable observations produce an empty report.
pub fn detect_scale_outliers(items: &[NormalizedPoint], opts: &OutlierOptions) -> OutlierReport {
    let usable: Vec<(&NormalizedPoint, i32)> = items
        .iter()
        .filter(|p| p.normalized.is_finite() && p.normalized != 0.0)
        .map(|p| (p, decimal_magnitude(p.normalized)))
        .collect();

    if usable.len() < 3 {
        return OutlierReport::default();
    }

    let mut distribution: BTreeMap<i32, usize> = BTreeMap::new();
    for (_, magnitude) in &usable {
        *distribution.entry(*magnitude).or_default() += 1;
    }

    // Arg-max count; on a tie the smaller magnitude wins for determinism.
    let (dominant, dominant_count) = distribution
        .iter()
        .max_by_key(|(magnitude, count)| (**count, std::cmp::Reverse(**magnitude)))
        .map(|(m, c)| (*m, *c))
        .unwrap_or((0, 0));

    let dominant_share = dominant_count as f64 / usable.len() as f64;
    if dominant_share < opts.cluster_threshold {
        return OutlierReport {
            distribution,
            dominant_magnitude: Some(dominant),
            ..OutlierReport::default()
        };
    }

    let mut outlier_ids = Vec::new();
    let mut details = Vec::new();
    for (point, magnitude) in &usable {
        let difference = (magnitude - dominant).abs();
        if difference >= opts.magnitude_difference_threshold {
            outlier_ids.push(point.id.clone());
            if opts.include_details {
                details.push(OutlierDetail {
                    id: point.id.clone(),
                    value: point.normalized,
                    magnitude: *magnitude,
                    magnitude_difference: difference,
                });
            }
        }
    }

    OutlierReport {
        has_outliers: !outlier_ids.is_empty(),
        outlier_ids,
        dominant_magnitude: Some(dominant),
        distribution,
        outlier_details: opts.include_details.then_some(details),
    }
}

/// Build the quality warning attached to one flagged observation.
pub fn outlier_warning(
    value: f64,
    magnitude: i32,
    report: &OutlierReport,
) -> QualityWarning {
    let dominant = report.dominant_magnitude.unwrap_or_default();
    QualityWarning::warning(
        WarningKind::ScaleOutlier,
        format!(
            "normalized value {value} sits at magnitude 10^{magnitude}, {} orders from the group's dominant 10^{dominant}",
            (magnitude - dominant).abs()
        ),
    )
    .with_details(json!({
        "value": value,
        "magnitude": magnitude,
        "dominantMagnitude": dominant,
        "magnitudeDifference": (magnitude - dominant).abs(),
        "distribution": report
            .distribution
            .iter()
            .map(|(m, c)| (m.to_string(), *c))
            .collect::<BTreeMap<String, usize>>(),
    }))
}

pub(crate) fn decimal_magnitude(value: f64) -> i32 {
    // Nudge before flooring so exact powers of ten whose log lands a ULP
    // short (log10(1000) = 2.999...) keep their true magnitude.
    (value.abs().log10() + 1e-9).floor() as i32
}
