//! Free-text unit parsing.
//!
//! `parse` is total and deterministic: any string produces a [`ParsedUnit`],
//! falling back to `Unknown` rather than erroring. Detection order follows
//! fixed precedence so that "percent of GDP" never becomes a currency and
//! "USD/Month" never becomes a price quotation.

use super::patterns;
use super::{ParsedUnit, UnitCategory};

/// Parse a free-text unit string into its structured reading.
pub fn parse(text: &str) -> ParsedUnit {
    let normalized = patterns::normalize_text(text);
    if normalized.is_empty() {
        return ParsedUnit::unknown("");
    }

    // Category detection runs in precedence order and locks on first match.
    // Currency / magnitude / time extraction still run afterwards so that a
    // percentage unit carrying "Thousands" keeps its scale information.
    let locked = detect_category(&normalized);

    let currency = detect_currency(&normalized);
    let scale = patterns::find_magnitude(&normalized);
    let time_scale = patterns::find_time_scale(&normalized);

    let (category, normalized_label, is_composite) = match locked {
        Some((category, label)) => (category, label, false),
        None => resolve_open_category(&normalized, currency.as_deref(), scale, time_scale),
    };

    ParsedUnit {
        currency,
        scale,
        time_scale,
        category,
        normalized_label,
        is_composite,
    }
}

/// Steps 2–7: categories that lock regardless of what else the string holds.
fn detect_category(text: &str) -> Option<(UnitCategory, String)> {
    if patterns::PERCENT_RE.is_match(text) {
        return Some((UnitCategory::Percentage, "%".to_string()));
    }
    if patterns::INDEX_RE.is_match(text) {
        return Some((UnitCategory::Index, "points".to_string()));
    }
    if let Some(label) = detect_rate(text) {
        return Some((UnitCategory::Rate, label));
    }
    if let Some(m) = patterns::DURATION_RE.find(text) {
        return Some((UnitCategory::Time, m.as_str().to_string()));
    }
    if patterns::RATIO_RE.is_match(text) {
        return Some((UnitCategory::Ratio, "ratio".to_string()));
    }
    if let Some(label) = patterns::energy_label(text) {
        return Some((UnitCategory::Energy, label.to_string()));
    }
    if let Some(label) = patterns::temperature_label(text) {
        return Some((UnitCategory::Temperature, label.to_string()));
    }
    if let Some(label) = patterns::physical_label(text) {
        return Some((UnitCategory::Physical, label.to_string()));
    }
    if patterns::is_population(text) {
        return Some((UnitCategory::Population, "persons".to_string()));
    }
    if let Some(label) = patterns::count_label(text) {
        return Some((UnitCategory::Count, label.to_string()));
    }
    None
}

/// Per-capita style denominators and price quotations ("USD/litre").
fn detect_rate(text: &str) -> Option<String> {
    if let Some(m) = patterns::RATE_RE.find(text) {
        return Some(m.as_str().to_string());
    }
    for caps in patterns::PRICE_RE.captures_iter(text) {
        let code = &caps[1];
        let denominator = &caps[2];
        if patterns::is_known_currency(code) && !patterns::is_time_word(denominator) {
            return Some(format!("{}/{}", code.to_uppercase(), denominator));
        }
    }
    None
}

/// Step 8: ISO codes first (word-bounded), then symbols, then currency words.
fn detect_currency(text: &str) -> Option<String> {
    patterns::find_currency_code(text)
        .or_else(|| patterns::find_currency_symbol(text).map(str::to_string))
        .or_else(|| patterns::find_currency_word(text).map(str::to_string))
}

/// Steps 8–10 for strings no dictionary claimed: currency, composite,
/// bare-magnitude counts, or unknown.
fn resolve_open_category(
    text: &str,
    currency: Option<&str>,
    scale: Option<crate::scale::Magnitude>,
    time_scale: Option<crate::scale::TimeScale>,
) -> (UnitCategory, String, bool) {
    match (currency, time_scale) {
        (Some(code), Some(time)) => (
            UnitCategory::Composite,
            format!("{code} per {time}"),
            true,
        ),
        (Some(code), None) => (UnitCategory::Currency, code.to_string(), false),
        (None, _) if scale.is_some() => (UnitCategory::Count, "units".to_string(), false),
        _ => (UnitCategory::Unknown, text.to_string(), false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scale::{Magnitude, TimeScale};

    #[test]
    fn empty_input_is_unknown() {
        let parsed = parse("   ");
        assert_eq!(parsed.category, UnitCategory::Unknown);
        assert!(parsed.normalized_label.is_empty());
    }

    #[test]
    fn currency_with_magnitude() {
        let parsed = parse("XOF Billions");
        assert_eq!(parsed.currency.as_deref(), Some("XOF"));
        assert_eq!(parsed.scale, Some(Magnitude::Billions));
        assert_eq!(parsed.category, UnitCategory::Currency);
        assert_eq!(parsed.normalized_label, "XOF");
        assert!(!parsed.is_composite);
    }

    #[test]
    fn currency_with_time_basis_is_composite() {
        let parsed = parse("XOF Billions/Quarter");
        assert_eq!(parsed.currency.as_deref(), Some("XOF"));
        assert_eq!(parsed.scale, Some(Magnitude::Billions));
        assert_eq!(parsed.time_scale, Some(TimeScale::Quarter));
        assert_eq!(parsed.category, UnitCategory::Composite);
        assert!(parsed.is_composite);
        assert_eq!(parsed.normalized_label, "XOF per quarter");
    }

    #[test]
    fn slash_month_is_a_time_basis_not_a_price() {
        let parsed = parse("ARS/Month");
        assert_eq!(parsed.currency.as_deref(), Some("ARS"));
        assert_eq!(parsed.time_scale, Some(TimeScale::Month));
        assert_eq!(parsed.category, UnitCategory::Composite);
    }

    #[test]
    fn price_quotation_is_a_rate() {
        let parsed = parse("USD/Liter");
        assert_eq!(parsed.category, UnitCategory::Rate);
        assert_eq!(parsed.normalized_label, "USD/liter");
    }

    #[test]
    fn percent_locks_before_anything_else() {
        assert_eq!(parse("%").category, UnitCategory::Percentage);
        assert_eq!(parse("percent of GDP").category, UnitCategory::Percentage);
        assert_eq!(parse("pp").category, UnitCategory::Percentage);
        assert_eq!(parse("bps").category, UnitCategory::Percentage);
        assert_eq!(parse("% of GDP").normalized_label, "%");
    }

    #[test]
    fn index_tokens() {
        assert_eq!(parse("Index Points").category, UnitCategory::Index);
        assert_eq!(parse("basis points").category, UnitCategory::Index);
        assert_eq!(parse("points").normalized_label, "points");
    }

    #[test]
    fn per_capita_is_a_rate() {
        let parsed = parse("USD per capita");
        assert_eq!(parsed.category, UnitCategory::Rate);
        assert_eq!(parsed.normalized_label, "per capita");
        // The code is still extracted for consumers that want it.
        assert_eq!(parsed.currency.as_deref(), Some("USD"));
    }

    #[test]
    fn bare_duration_is_time() {
        assert_eq!(parse("Days").category, UnitCategory::Time);
        assert_eq!(parse("years").category, UnitCategory::Time);
        // "per year" is a basis, not a duration
        assert_ne!(parse("per year").category, UnitCategory::Time);
    }

    #[test]
    fn ratio_tokens() {
        assert_eq!(parse("Times").category, UnitCategory::Ratio);
        assert_eq!(parse("debt ratio").category, UnitCategory::Ratio);
    }

    #[test]
    fn energy_and_physical_dictionaries() {
        let gwh = parse("GWh");
        assert_eq!(gwh.category, UnitCategory::Energy);
        assert_eq!(gwh.normalized_label, "GWh");

        let tonnes = parse("Metric Tonnes");
        assert_eq!(tonnes.category, UnitCategory::Physical);
        assert_eq!(tonnes.normalized_label, "tonnes");

        assert_eq!(parse("celsius").category, UnitCategory::Temperature);
    }

    #[test]
    fn subscribers_does_not_become_seychelles_rupees() {
        let parsed = parse("Subscribers");
        assert_eq!(parsed.currency, None);
        assert_eq!(parsed.category, UnitCategory::Count);
        assert_eq!(parsed.normalized_label, "subscribers");
    }

    #[test]
    fn count_with_time_basis_keeps_count_category() {
        let parsed = parse("units per year");
        assert_eq!(parsed.category, UnitCategory::Count);
        assert_eq!(parsed.time_scale, Some(TimeScale::Year));
        assert_eq!(parsed.normalized_label, "units");
    }

    #[test]
    fn bare_magnitude_is_a_count() {
        let parsed = parse("Thousands");
        assert_eq!(parsed.category, UnitCategory::Count);
        assert_eq!(parsed.scale, Some(Magnitude::Thousands));
        assert_eq!(parsed.normalized_label, "units");
    }

    #[test]
    fn population_words() {
        let parsed = parse("persons");
        assert_eq!(parsed.category, UnitCategory::Population);
    }

    #[test]
    fn symbols_fall_back_when_no_code_present() {
        let parsed = parse("$ Millions");
        assert_eq!(parsed.currency.as_deref(), Some("USD"));
        assert_eq!(parsed.scale, Some(Magnitude::Millions));
    }

    #[test]
    fn currency_words_are_last_resort() {
        let parsed = parse("billion euros");
        assert_eq!(parsed.currency.as_deref(), Some("EUR"));
        assert_eq!(parsed.scale, Some(Magnitude::Billions));
    }

    #[test]
    fn unrecognized_text_passes_through() {
        let parsed = parse("Widgets of Unusual Size");
        assert_eq!(parsed.category, UnitCategory::Unknown);
        assert_eq!(parsed.normalized_label, "widgets of unusual size");
    }

    #[test]
    fn parse_is_idempotent_on_recognized_labels() {
        for unit in [
            "XOF Billions",
            "XOF Billions/Quarter",
            "%",
            "points",
            "GWh",
            "tonnes",
            "per capita",
            "Days",
            "ratio",
            "persons",
            "units",
            "USD/Liter",
            "Thousands",
            "unrecognizable gizmos",
        ] {
            let first = parse(unit);
            let second = parse(&first.normalized_label);
            assert_eq!(
                first.category, second.category,
                "category drifted reparsing label of '{unit}': {:?} -> {:?}",
                first.category, second.category
            );
        }
    }
}
