//! Canonical rendering of unit strings.
//!
//! Normalized strings always say "per <time>", never "/". Indicators whose
//! rule row sets `skip_time_in_unit` drop the time suffix; stock-like
//! non-currency measures render as the bare base noun.

use crate::scale::{Magnitude, TimeScale};
use crate::unit::{ParsedUnit, UnitCategory};

pub(crate) struct UnitRender {
    pub unit: String,
    pub full_unit: String,
}

pub(crate) struct RenderInputs<'a> {
    pub currency: Option<&'a str>,
    pub magnitude: Option<Magnitude>,
    pub time: Option<TimeScale>,
    pub base_label: &'a str,
    pub show_time: bool,
    /// Per-capita series never carry a magnitude word.
    pub suppress_magnitude_label: bool,
}

pub(crate) fn render(inputs: &RenderInputs<'_>) -> UnitRender {
    let base = match inputs.currency {
        Some(code) => code.to_string(),
        None => inputs.base_label.to_string(),
    };

    let time_suffix = match (inputs.show_time, inputs.time) {
        (true, Some(time)) => format!(" per {time}"),
        _ => String::new(),
    };

    let unit = format!("{base}{time_suffix}");

    let magnitude_visible = !inputs.suppress_magnitude_label
        && inputs
            .magnitude
            .is_some_and(|m| m != Magnitude::Ones);

    let full_unit = match (magnitude_visible, inputs.currency) {
        (false, _) => unit.clone(),
        (true, Some(code)) => {
            let magnitude = inputs.magnitude.unwrap_or(Magnitude::Ones);
            format!("{code} {magnitude}{time_suffix}")
        }
        (true, None) => {
            let magnitude = inputs.magnitude.unwrap_or(Magnitude::Ones);
            format!("{magnitude} of {base}{time_suffix}")
        }
    };

    UnitRender { unit, full_unit }
}

/// Reconstruct the source unit from its parsed components, for the
/// `originalFullUnit` explain field. Unlike the normalized rendering this
/// always shows the time basis the source text carried.
pub(crate) fn render_original_full(parsed: &ParsedUnit, raw: &str) -> String {
    if parsed.category == UnitCategory::Unknown {
        return raw.to_string();
    }

    let inputs = RenderInputs {
        currency: parsed.currency.as_deref(),
        magnitude: parsed.scale,
        time: parsed.time_scale,
        base_label: &parsed.normalized_label,
        show_time: parsed.time_scale.is_some(),
        suppress_magnitude_label: false,
    };

    // Composite labels already embed "per <time>"; render from the code
    // instead so the magnitude lands between code and suffix.
    if parsed.is_composite {
        return render(&RenderInputs {
            base_label: "",
            ..inputs
        })
        .full_unit;
    }

    render(&inputs).full_unit
}
