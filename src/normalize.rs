pub mod engine;
pub mod explain;
pub(crate) mod label;

use std::sync::Arc;

use crate::fx::{FxOrigin, FxTable};
use crate::rules::{IndicatorType, TemporalAggregation};
use crate::scale::{Magnitude, TimeScale};
use crate::types::NormalizationTargets;

pub use engine::{Normalization, normalize, normalize_value};
pub use explain::{
    BaseUnitExplain, ConversionExplain, ConversionStep, DimensionChange, Domain, Explain,
    FxExplain, MagnitudeExplain, PeriodicityExplain, ScaleDirection, StepKind,
    TargetSelectionExplain, TimeDirection, UnitsExplain,
};

/// Where the FX table handed to the normalizer came from; surfaced verbatim
/// in the explain record.
#[derive(Clone, Debug)]
pub struct FxProvenance {
    pub origin: FxOrigin,
    pub source_id: Option<String>,
}

impl Default for FxProvenance {
    fn default() -> Self {
        Self {
            origin: FxOrigin::Live,
            source_id: None,
        }
    }
}

/// Everything a single normalize call may consult. No globals: each call
/// carries its own options, and the FX snapshot is shared read-only.
#[derive(Clone, Debug, Default)]
pub struct NormalizeOptions {
    pub to_currency: Option<String>,
    pub to_magnitude: Option<Magnitude>,
    pub to_time_scale: Option<TimeScale>,

    /// FX snapshot for currency conversion. The normalizer never fetches.
    pub fx: Option<Arc<FxTable>>,
    pub fx_provenance: Option<FxProvenance>,

    /// Explicit annotations; they win over whatever the unit text parses to.
    pub explicit_currency: Option<String>,
    pub explicit_scale: Option<Magnitude>,
    pub explicit_time_scale: Option<TimeScale>,

    pub indicator_name: Option<String>,
    pub indicator_type: Option<IndicatorType>,
    pub temporal_aggregation: Option<TemporalAggregation>,

    /// Release cadence of the dataset, echoed into the explain record.
    pub reporting_frequency: Option<TimeScale>,
}

impl NormalizeOptions {
    pub fn with_targets(mut self, targets: &NormalizationTargets) -> Self {
        self.to_currency = targets.to_currency.clone();
        self.to_magnitude = targets.to_magnitude;
        self.to_time_scale = targets.to_time_scale;
        self
    }

    pub fn targets(&self) -> NormalizationTargets {
        NormalizationTargets {
            to_currency: self.to_currency.clone(),
            to_magnitude: self.to_magnitude,
            to_time_scale: self.to_time_scale,
        }
    }
}
