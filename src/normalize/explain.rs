//! The machine-readable explanation attached to every normalized value.
//!
//! Consumers (tooltips, audits, QA dashboards) read this record instead of
//! re-deriving what happened. Substructures are discriminated by presence:
//! `fx` exists only when a currency conversion actually ran, `magnitude`
//! only when the scale changed, and so on.

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

use crate::fx::FxOrigin;
use crate::rules::{IndicatorType, TemporalAggregation};
use crate::scale::{Magnitude, TimeScale};
use crate::types::QualityWarning;
use crate::unit::{ParsedUnit, UnitCategory};
use crate::unit::patterns;

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Explain {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fx: Option<FxExplain>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub magnitude: Option<MagnitudeExplain>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub periodicity: Option<PeriodicityExplain>,

    pub units: UnitsExplain,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<DimensionChange<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub scale: Option<DimensionChange<Magnitude>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_scale: Option<DimensionChange<TimeScale>>,

    /// Release cadence of the dataset; informational, never a conversion
    /// basis.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reporting_frequency: Option<TimeScale>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_unit: Option<BaseUnitExplain>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<Domain>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversion: Option<ConversionExplain>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_selection: Option<TargetSelectionExplain>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality_warnings: Option<Vec<QualityWarning>>,
}

impl Explain {
    pub fn push_warning(&mut self, warning: QualityWarning) {
        self.quality_warnings
            .get_or_insert_with(Vec::new)
            .push(warning);
    }
}

/// Currency conversion provenance. Present only when FX actually ran.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FxExplain {
    /// The foreign side of the conversion.
    pub currency: String,
    pub base: String,
    /// Table rate of `currency` (units per base), rounded to 6 dp.
    pub rate: f64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub as_of: Option<String>,

    pub source: FxOrigin,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_id: Option<String>,
}

#[derive(Copy, Clone, Debug, Display, EnumString, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ScaleDirection {
    Upscale,
    Downscale,
    None,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MagnitudeExplain {
    pub original_scale: Magnitude,
    pub target_scale: Magnitude,
    pub factor: f64,
    pub direction: ScaleDirection,
    pub description: String,
}

#[derive(Copy, Clone, Debug, Display, EnumString, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TimeDirection {
    Upsample,
    Downsample,
    None,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodicityExplain {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original: Option<TimeScale>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<TimeScale>,

    pub adjusted: bool,
    pub factor: f64,
    pub direction: TimeDirection,
    pub description: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitsExplain {
    pub original_unit: String,
    pub normalized_unit: String,
    pub original_full_unit: String,
    pub normalized_full_unit: String,
}

/// Flat from/to mirror of one converted dimension.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DimensionChange<T> {
    pub from: T,
    pub to: T,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BaseUnitExplain {
    pub normalized: String,
    pub category: UnitCategory,
}

/// High-level semantic tag used by consumers for formatting.
#[derive(Copy, Clone, Debug, Display, EnumString, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Domain {
    Wages,
    Percentage,
    Count,
    Energy,
    Commodity,
    Agriculture,
    Metals,
    Emissions,
    MonetaryAggregate,
}

#[derive(Copy, Clone, Debug, Display, EnumString, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum StepKind {
    Scale,
    Currency,
    Time,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionStep {
    pub kind: StepKind,
    pub description: String,
    pub factor: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionExplain {
    /// Steps in logical processing order: scale, then currency, then time.
    pub steps: Vec<ConversionStep>,
    pub summary: String,
    pub total_factor: f64,
}

/// Recorded when a batch-level majority vote chose the targets.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetSelectionExplain {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub magnitude: Option<Magnitude>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<TimeScale>,

    pub reason: String,
}

// ================================================================================================
// Formatting and detection helpers
// ================================================================================================

/// Render a multiplicative factor the way analysts read it: "×1000" going
/// up, "÷3" going down.
pub(crate) fn factor_text(factor: f64) -> String {
    if factor >= 1.0 {
        format!("×{}", trim_number(factor))
    } else {
        format!("÷{}", trim_number(1.0 / factor))
    }
}

fn trim_number(v: f64) -> String {
    if (v - v.round()).abs() < 1e-9 {
        format!("{}", v.round() as i64)
    } else {
        let s = format!("{v:.6}");
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}

pub(crate) fn round6(v: f64) -> f64 {
    (v * 1e6).round() / 1e6
}

/// Domain precedence: a wage-like indicator name beats whatever the unit
/// says; the unit dictionaries beat the parsed category; metals beat the
/// generic commodity bucket.
pub(crate) fn detect_domain(
    indicator_name: Option<&str>,
    unit_text: &str,
    parsed: &ParsedUnit,
) -> Option<Domain> {
    let name = indicator_name.map(patterns::normalize_text).unwrap_or_default();
    let unit = patterns::normalize_text(unit_text);

    if patterns::is_wages(&name) {
        return Some(Domain::Wages);
    }
    if patterns::is_monetary_aggregate(&name) {
        return Some(Domain::MonetaryAggregate);
    }

    let combined = format!("{name} {unit}");
    if patterns::is_metals(&combined) {
        return Some(Domain::Metals);
    }
    if patterns::is_emissions(&combined) {
        return Some(Domain::Emissions);
    }
    if parsed.category == UnitCategory::Energy || patterns::energy_label(&unit).is_some() {
        return Some(Domain::Energy);
    }
    if patterns::is_agriculture(&combined) {
        return Some(Domain::Agriculture);
    }
    if patterns::is_commodity(&combined) {
        return Some(Domain::Commodity);
    }

    match parsed.category {
        UnitCategory::Percentage => Some(Domain::Percentage),
        UnitCategory::Count | UnitCategory::Population => Some(Domain::Count),
        _ => None,
    }
}

/// "Time conversion blocked (flow with period-cumulative)"
pub(crate) fn blocked_time_reason(
    indicator_type: IndicatorType,
    aggregation: TemporalAggregation,
) -> String {
    format!("Time conversion blocked ({indicator_type} with {aggregation})")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unit::parse;

    #[test]
    fn factor_rendering() {
        assert_eq!(factor_text(1000.0), "×1000");
        assert_eq!(factor_text(1.0 / 3.0), "÷3");
        assert_eq!(factor_text(1.0), "×1");
    }

    #[test]
    fn six_decimal_rounding() {
        assert_eq!(round6(558.158_999_9), 558.159);
        assert_eq!(round6(0.001_791_6), 0.001_792);
    }

    #[test]
    fn wages_beat_unit_derived_domains() {
        let parsed = parse("ARS/Month");
        let domain = detect_domain(Some("Argentina Minimum Wage"), "ARS/Month", &parsed);
        assert_eq!(domain, Some(Domain::Wages));
    }

    #[test]
    fn metals_beat_generic_commodity() {
        let parsed = parse("Tonnes");
        let domain = detect_domain(Some("Copper Production"), "Tonnes", &parsed);
        assert_eq!(domain, Some(Domain::Metals));
    }

    #[test]
    fn energy_units_tag_energy() {
        let parsed = parse("GWh");
        assert_eq!(
            detect_domain(Some("Electricity Generation"), "GWh", &parsed),
            Some(Domain::Energy)
        );
    }

    #[test]
    fn percentage_category_falls_through() {
        let parsed = parse("%");
        assert_eq!(
            detect_domain(Some("Unemployment"), "%", &parsed),
            Some(Domain::Percentage)
        );
    }

    #[test]
    fn blocked_reason_format() {
        assert_eq!(
            blocked_time_reason(
                IndicatorType::Flow,
                TemporalAggregation::PeriodCumulative
            ),
            "Time conversion blocked (flow with period-cumulative)"
        );
    }
}
