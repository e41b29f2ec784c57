pub(crate) mod patterns;
pub mod parser;

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

use crate::scale::{Magnitude, TimeScale};

pub use parser::parse;
pub use patterns::is_known_currency;

/// What kind of measure a unit string describes.
#[derive(Copy, Clone, Debug, Display, EnumString, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitCategory {
    #[strum(serialize = "currency")]
    Currency,

    #[strum(serialize = "percentage")]
    Percentage,

    #[strum(serialize = "index")]
    Index,

    #[strum(serialize = "physical")]
    Physical,

    #[strum(serialize = "energy")]
    Energy,

    #[strum(serialize = "temperature")]
    Temperature,

    #[strum(serialize = "population")]
    Population,

    #[strum(serialize = "count")]
    Count,

    #[strum(serialize = "rate")]
    Rate,

    #[strum(serialize = "ratio")]
    Ratio,

    #[strum(serialize = "time")]
    Time,

    #[strum(serialize = "composite")]
    Composite,

    #[strum(serialize = "unknown")]
    Unknown,
}

/// Structured reading of a free-text unit string.
///
/// Produced by [`parse`]; parsing is deterministic and total. A string the
/// pattern library does not recognize comes back as
/// `category == UnitCategory::Unknown` with the cleaned text as its label.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedUnit {
    /// Uppercase ISO-4217 code, when one was detected.
    pub currency: Option<String>,

    /// Reported magnitude ("millions", "bn", "000s", ...).
    pub scale: Option<Magnitude>,

    /// Time basis of a flow ("per month", "/yr", "quarterly", ...).
    pub time_scale: Option<TimeScale>,

    pub category: UnitCategory,

    /// Canonical rendering of the recognized base unit, e.g. "GWh",
    /// "tonnes", "%", "XOF per quarter".
    pub normalized_label: String,

    /// Currency and time basis in one unit ("USD per month").
    pub is_composite: bool,
}

impl ParsedUnit {
    pub(crate) fn unknown(label: impl Into<String>) -> Self {
        Self {
            currency: None,
            scale: None,
            time_scale: None,
            category: UnitCategory::Unknown,
            normalized_label: label.into(),
            is_composite: false,
        }
    }
}
