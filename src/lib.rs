//! econorm: turn heterogeneously-labelled economic observations (mixed
//! currencies, magnitudes, time bases, physical units) into one comparable
//! representation, with a machine-readable explanation of every
//! transformation applied.

// === Public Modules (The Canonical Paths) ===
pub mod aggregate;
pub mod batch;
pub mod cpi;
pub mod error;
pub mod fx;
pub mod normalize;
pub mod outlier;
pub mod rules;
pub mod scale;
pub mod targets;
pub mod types;
pub mod unit;

// === Facades (Re-exporting the common surface) ===
pub use crate::batch::{process_batch, process_batch_with_provider, BatchOptions, BatchResult};
pub use crate::error::{EconormError, EconormResult};
pub use crate::fx::{FxProvider, FxProviderOptions, FxSource, FxTable};
pub use crate::normalize::{normalize, normalize_value, Explain, NormalizeOptions};
pub use crate::outlier::{detect_scale_outliers, OutlierOptions, OutlierReport};
pub use crate::rules::{IndicatorType, TemporalAggregation};
pub use crate::scale::{Magnitude, TimeScale};
pub use crate::targets::{compute_auto_targets, AutoTargetOptions, AutoTargetSelection};
pub use crate::types::{NormalizationTargets, NormalizedObservation, Observation};
pub use crate::unit::{parse, ParsedUnit, UnitCategory};
