use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

use crate::normalize::explain::Explain;
use crate::rules::{IndicatorType, TemporalAggregation};
use crate::scale::{Magnitude, TimeScale};

/// A single reported data point entering the pipeline.
///
/// `currency_code`, `scale` and `time_scale` are explicit annotations that
/// override whatever the unit parser reads out of `unit`. `periodicity` is
/// the dataset's release cadence; it is carried into the explain record but
/// never used as a conversion basis.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Observation {
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    pub value: f64,

    pub unit: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indicator_type: Option<IndicatorType>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temporal_aggregation: Option<TemporalAggregation>,

    /// Legacy flag from the older classifier; `true` is equivalent to
    /// `temporal_aggregation = period-cumulative`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_cumulative: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub periodicity: Option<TimeScale>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency_code: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<Magnitude>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_scale: Option<TimeScale>,

    /// Opaque to the engine; round-tripped untouched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl Observation {
    /// The aggregation kind after resolving the legacy cumulative flag.
    pub fn effective_aggregation(&self) -> Option<TemporalAggregation> {
        match (self.temporal_aggregation, self.is_cumulative) {
            (Some(agg), _) => Some(agg),
            (None, Some(true)) => Some(TemporalAggregation::PeriodCumulative),
            _ => None,
        }
    }
}

/// Where every dimension of an observation should land.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizationTargets {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_currency: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_magnitude: Option<Magnitude>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_time_scale: Option<TimeScale>,
}

/// The pipeline's output for one observation.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedObservation {
    pub id: String,
    pub original_value: f64,
    pub original_unit: String,
    pub normalized_value: f64,
    pub normalized_unit: String,
    pub normalized_full_unit: String,
    pub explain: Explain,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality_score: Option<f64>,
}

impl NormalizedObservation {
    /// Derive the quality score from the attached warnings: 1.0 minus 0.1
    /// per warning and 0.05 per informational entry, floored at zero.
    pub fn scored(mut self) -> Self {
        let warnings = self.explain.quality_warnings.as_deref().unwrap_or(&[]);
        let penalty: f64 = warnings
            .iter()
            .map(|w| match w.severity {
                Severity::Warning => 0.1,
                Severity::Info => 0.05,
            })
            .sum();
        self.quality_score = Some((1.0 - penalty).max(0.0));
        self
    }
}

#[derive(Copy, Clone, Debug, Display, EnumString, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
}

#[derive(Copy, Clone, Debug, Display, EnumString, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum WarningKind {
    ScaleOutlier,
    BlockedTimeConversion,
    MissingTimeBasis,
    IncompatibleAggregation,
    SuppressedCurrency,
    UnknownCurrency,
    ImplausibleFxRate,
}

/// A soft data-quality issue attached to a normalized observation.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityWarning {
    #[serde(rename = "type")]
    pub kind: WarningKind,
    pub severity: Severity,
    pub message: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl QualityWarning {
    pub fn warning(kind: WarningKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity: Severity::Warning,
            message: message.into(),
            details: None,
        }
    }

    pub fn info(kind: WarningKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity: Severity::Info,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}
