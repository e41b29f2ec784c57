//! Per-indicator-type conversion semantics.
//!
//! Each indicator type answers four questions: may the value be rescaled in
//! time, in magnitude, in currency, and should its time basis be left out of
//! the rendered unit. The temporal-aggregation kind can further veto time
//! conversion (multiplying a year-to-date figure by 12 is wrong, not merely
//! imprecise).

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};

/// Closed classification of economic indicators. `Other` is the explicit
/// fallback for anything upstream classifiers could not place.
#[derive(
    Copy, Clone, Debug, Display, EnumString, EnumIter, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum IndicatorType {
    Flow,
    Stock,
    Balance,
    Count,
    Volume,
    Price,
    Percentage,
    Ratio,
    Rate,
    Index,
    Yield,
    Spread,
    Share,
    Volatility,
    Correlation,
    Elasticity,
    Multiplier,
    Sentiment,
    Allocation,
    Probability,
    Duration,
    Score,
    Level,
    Intensity,
    Density,
    Other,
}

/// How within-period values combine into the reported figure.
#[derive(
    Copy, Clone, Debug, Display, EnumString, EnumIter, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum TemporalAggregation {
    #[strum(serialize = "point-in-time")]
    PointInTime,

    #[strum(serialize = "period-total")]
    PeriodTotal,

    #[strum(serialize = "period-average")]
    PeriodAverage,

    #[strum(serialize = "period-rate")]
    PeriodRate,

    #[strum(serialize = "period-cumulative")]
    PeriodCumulative,

    #[strum(serialize = "not-applicable")]
    NotApplicable,
}

/// The four per-type switches consulted by the normalizer core.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionRules {
    pub allow_time_dimension: bool,
    pub allow_magnitude: bool,
    pub allow_currency: bool,
    pub skip_time_in_unit: bool,
}

impl ConversionRules {
    const fn new(
        allow_time_dimension: bool,
        allow_magnitude: bool,
        allow_currency: bool,
        skip_time_in_unit: bool,
    ) -> Self {
        Self {
            allow_time_dimension,
            allow_magnitude,
            allow_currency,
            skip_time_in_unit,
        }
    }
}

// Shared rows of the matrix.
const FLOW_LIKE: ConversionRules = ConversionRules::new(true, true, true, false);
const STOCK_LIKE: ConversionRules = ConversionRules::new(false, true, true, true);
const COUNT_LIKE: ConversionRules = ConversionRules::new(true, true, false, false);
const DIMENSIONLESS: ConversionRules = ConversionRules::new(false, false, false, true);

impl IndicatorType {
    /// The rule row for this type.
    pub fn conversion_rules(&self) -> ConversionRules {
        match self {
            IndicatorType::Flow | IndicatorType::Other => FLOW_LIKE,
            IndicatorType::Stock | IndicatorType::Balance | IndicatorType::Level => STOCK_LIKE,
            IndicatorType::Count | IndicatorType::Volume => COUNT_LIKE,
            IndicatorType::Price => ConversionRules::new(false, true, true, true),
            IndicatorType::Percentage
            | IndicatorType::Ratio
            | IndicatorType::Rate
            | IndicatorType::Index
            | IndicatorType::Yield
            | IndicatorType::Spread
            | IndicatorType::Share
            | IndicatorType::Volatility
            | IndicatorType::Correlation
            | IndicatorType::Elasticity
            | IndicatorType::Multiplier
            | IndicatorType::Sentiment
            | IndicatorType::Allocation
            | IndicatorType::Probability
            | IndicatorType::Duration
            | IndicatorType::Score
            | IndicatorType::Intensity
            | IndicatorType::Density => DIMENSIONLESS,
        }
    }

    /// Count-like indicators never convert currency even when the unit text
    /// carries an ISO code ("USD Thousand" used as a count of things).
    pub fn is_count_like(&self) -> bool {
        matches!(self, IndicatorType::Count | IndicatorType::Volume)
    }
}

impl TemporalAggregation {
    /// Whether this aggregation kind permits rescaling the time basis at all.
    ///
    /// Point-in-time snapshots have no time dimension to rescale and
    /// cumulative (YTD) figures would be corrupted by one.
    pub fn permits_time_conversion(&self) -> bool {
        match self {
            TemporalAggregation::PeriodTotal
            | TemporalAggregation::PeriodAverage
            | TemporalAggregation::PeriodRate => true,
            TemporalAggregation::PointInTime
            | TemporalAggregation::PeriodCumulative
            | TemporalAggregation::NotApplicable => false,
        }
    }
}

/// A (type, aggregation) pairing that cannot describe real data.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Incompatibility {
    pub indicator_type: IndicatorType,
    pub aggregation: TemporalAggregation,
    pub reason: String,
}

/// Validate that an indicator type and a temporal aggregation can coexist.
///
/// Returns the offending pair when they cannot; callers block time
/// conversion and surface the reason as a quality warning.
pub fn validate_compatibility(
    indicator_type: IndicatorType,
    aggregation: TemporalAggregation,
) -> Option<Incompatibility> {
    use IndicatorType::*;
    use TemporalAggregation::*;

    let reason = match (indicator_type, aggregation) {
        (Stock | Balance | Level, PeriodTotal) => {
            "a stock is a snapshot; totalling it over a period is meaningless"
        }
        (Price, PeriodTotal | PeriodRate) => {
            "prices are quoted, not accumulated; only averages or snapshots apply"
        }
        (Ratio | Index | Percentage, PeriodTotal | PeriodCumulative) => {
            "dimensionless measures cannot be accumulated across a period"
        }
        (Flow | Volume | Count, NotApplicable) => {
            "flows are inherently measured over a period; an aggregation kind is required"
        }
        _ => return None,
    };

    Some(Incompatibility {
        indicator_type,
        aggregation,
        reason: reason.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn flow_allows_everything() {
        let rules = IndicatorType::Flow.conversion_rules();
        assert!(rules.allow_time_dimension);
        assert!(rules.allow_magnitude);
        assert!(rules.allow_currency);
        assert!(!rules.skip_time_in_unit);
    }

    #[test]
    fn stock_has_no_time_dimension() {
        let rules = IndicatorType::Stock.conversion_rules();
        assert!(!rules.allow_time_dimension);
        assert!(rules.allow_magnitude);
        assert!(rules.allow_currency);
        assert!(rules.skip_time_in_unit);
    }

    #[test]
    fn counts_keep_magnitude_but_never_currency() {
        for t in [IndicatorType::Count, IndicatorType::Volume] {
            let rules = t.conversion_rules();
            assert!(rules.allow_magnitude);
            assert!(!rules.allow_currency);
            assert!(t.is_count_like());
        }
    }

    #[test]
    fn dimensionless_types_convert_nothing() {
        for t in [
            IndicatorType::Percentage,
            IndicatorType::Ratio,
            IndicatorType::Rate,
            IndicatorType::Index,
            IndicatorType::Yield,
            IndicatorType::Spread,
            IndicatorType::Share,
            IndicatorType::Volatility,
            IndicatorType::Correlation,
            IndicatorType::Elasticity,
            IndicatorType::Multiplier,
            IndicatorType::Sentiment,
            IndicatorType::Allocation,
            IndicatorType::Probability,
            IndicatorType::Duration,
        ] {
            let rules = t.conversion_rules();
            assert!(!rules.allow_time_dimension, "{t} should not rescale time");
            assert!(!rules.allow_magnitude, "{t} should not rescale magnitude");
            assert!(!rules.allow_currency, "{t} should not convert currency");
        }
    }

    #[test]
    fn the_matrix_covers_all_26_types() {
        assert_eq!(IndicatorType::iter().count(), 26);
        for t in IndicatorType::iter() {
            // Every row is reachable without panicking.
            let _ = t.conversion_rules();
        }
    }

    #[test]
    fn cumulative_and_snapshot_forbid_time_conversion() {
        assert!(!TemporalAggregation::PointInTime.permits_time_conversion());
        assert!(!TemporalAggregation::PeriodCumulative.permits_time_conversion());
        assert!(!TemporalAggregation::NotApplicable.permits_time_conversion());
        assert!(TemporalAggregation::PeriodTotal.permits_time_conversion());
        assert!(TemporalAggregation::PeriodRate.permits_time_conversion());
        assert!(TemporalAggregation::PeriodAverage.permits_time_conversion());
    }

    #[test]
    fn incompatible_pairs_are_flagged() {
        assert!(
            validate_compatibility(IndicatorType::Stock, TemporalAggregation::PeriodTotal)
                .is_some()
        );
        assert!(
            validate_compatibility(IndicatorType::Price, TemporalAggregation::PeriodRate).is_some()
        );
        assert!(
            validate_compatibility(IndicatorType::Index, TemporalAggregation::PeriodCumulative)
                .is_some()
        );
        assert!(
            validate_compatibility(IndicatorType::Flow, TemporalAggregation::NotApplicable)
                .is_some()
        );
        assert!(
            validate_compatibility(IndicatorType::Flow, TemporalAggregation::PeriodTotal).is_none()
        );
    }
}
