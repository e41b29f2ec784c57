//! The staged transform at the center of the pipeline.
//!
//! Order of operations is fixed: magnitude, then time, then currency.
//! Magnitude and time commute (both are pure multiplications); running them
//! before FX means the quoted rate applies to a same-magnitude quantity.
//! The engine is fail-soft: anything short of a missing FX rate or a forced
//! impossible conversion degrades to a warning on the explain record.

use serde_json::json;

use crate::error::NormalizeError;
use crate::normalize::explain::{
    self, ConversionExplain, ConversionStep, DimensionChange, Explain, FxExplain,
    MagnitudeExplain, PeriodicityExplain, ScaleDirection, StepKind, TimeDirection, UnitsExplain,
};
use crate::normalize::label::{self, RenderInputs};
use crate::normalize::NormalizeOptions;
use crate::rules::{validate_compatibility, IndicatorType, TemporalAggregation};
use crate::scale::{magnitude_factor, time_factor, Magnitude, TimeScale};
use crate::types::{QualityWarning, WarningKind};
use crate::unit::{parse, patterns, ParsedUnit, UnitCategory};

/// One normalized value with its rendered units and explanation.
#[derive(Clone, Debug)]
pub struct Normalization {
    pub value: f64,
    pub unit: String,
    pub full_unit: String,
    pub explain: Explain,
}

/// Convenience wrapper returning only the number.
pub fn normalize_value(
    value: f64,
    unit_text: &str,
    opts: &NormalizeOptions,
) -> Result<f64, NormalizeError> {
    Ok(normalize(value, unit_text, opts)?.value)
}

/// Normalize one observation value.
pub fn normalize(
    value: f64,
    unit_text: &str,
    opts: &NormalizeOptions,
) -> Result<Normalization, NormalizeError> {
    let parsed = parse(unit_text);
    let indicator_type = opts.indicator_type.unwrap_or(IndicatorType::Other);
    let rules = indicator_type.conversion_rules();
    let aggregation = opts.temporal_aggregation;

    let mut warnings: Vec<QualityWarning> = Vec::new();

    let name = opts
        .indicator_name
        .as_deref()
        .map(patterns::normalize_text)
        .unwrap_or_default();
    let per_capita = name.contains("per capita")
        || patterns::normalize_text(unit_text).contains("per capita");
    let stock_like_count = indicator_type.is_count_like()
        && (patterns::is_population(&name) || parsed.category == UnitCategory::Population);

    let incompatibility =
        aggregation.and_then(|agg| validate_compatibility(indicator_type, agg));
    if let Some(inc) = &incompatibility {
        warnings.push(
            QualityWarning::warning(
                WarningKind::IncompatibleAggregation,
                format!(
                    "'{}' cannot be aggregated as '{}': {}",
                    inc.indicator_type, inc.aggregation, inc.reason
                ),
            )
            .with_details(json!({
                "indicatorType": inc.indicator_type,
                "aggregation": inc.aggregation,
            })),
        );
    }

    // ---- Effective inputs: explicit wins over parsed wins over inferred.
    let source_currency = resolve_currency(opts.explicit_currency.as_deref(), &parsed);
    let source_magnitude = opts.explicit_scale.or(parsed.scale).unwrap_or(Magnitude::Ones);
    let source_time = opts.explicit_time_scale.or(parsed.time_scale);

    let suppress_currency = indicator_type.is_count_like();
    if suppress_currency && parsed.currency.is_some() {
        warnings.push(QualityWarning::info(
            WarningKind::SuppressedCurrency,
            format!(
                "Unit '{}' carries currency code '{}' but '{}' indicators count things; currency conversion suppressed",
                unit_text,
                parsed.currency.as_deref().unwrap_or_default(),
                indicator_type
            ),
        ));
    }

    // A caller that both overrides the source currency and demands a target
    // is forcing a conversion; when the rule row forbids it, that is a hard
    // error rather than a silent no-op.
    if !rules.allow_currency
        && !suppress_currency
        && opts.explicit_currency.is_some()
        && opts.to_currency.is_some()
    {
        return Err(NormalizeError::UnsupportedConversion(format!(
            "currency conversion is not defined for '{indicator_type}' indicators"
        )));
    }

    let mut current = value;
    let mut steps: Vec<ConversionStep> = Vec::new();

    // ---- 1. Magnitude
    let target_magnitude = if per_capita {
        // Per-person series stay at ones whatever the caller asked for.
        Some(Magnitude::Ones)
    } else {
        opts.to_magnitude
    };

    let dimensioned = !matches!(
        parsed.category,
        UnitCategory::Physical | UnitCategory::Energy | UnitCategory::Temperature
    );
    // An unrecognized unit passes through untouched unless the caller
    // annotated a scale explicitly; the implicit ones-default is only safe
    // for units the parser understood.
    let has_scale_basis = parsed.category != UnitCategory::Unknown
        || opts.explicit_scale.is_some()
        || parsed.scale.is_some();

    let magnitude_step = match target_magnitude {
        Some(target)
            if rules.allow_magnitude
                && dimensioned
                && has_scale_basis
                && source_magnitude != target =>
        {
            let factor = magnitude_factor(source_magnitude, target);
            current *= factor;
            Some((source_magnitude, target, factor))
        }
        _ => None,
    };

    if let Some((from, to, factor)) = magnitude_step {
        steps.push(ConversionStep {
            kind: StepKind::Scale,
            description: format!("{from} → {to} ({})", explain::factor_text(factor)),
            factor,
        });
    }

    // ---- 2. Time
    let time_outcome = resolve_time(
        &rules,
        indicator_type,
        aggregation,
        incompatibility.is_some(),
        stock_like_count,
        source_time,
        opts.to_time_scale,
    )?;

    if let TimeOutcome::Applied { factor, .. } = &time_outcome {
        current *= *factor;
    }
    match &time_outcome {
        TimeOutcome::BlockedAggregation { reason } => {
            warnings.push(QualityWarning::warning(
                WarningKind::BlockedTimeConversion,
                reason.clone(),
            ));
        }
        TimeOutcome::MissingBasis { target } => {
            warnings.push(QualityWarning::warning(
                WarningKind::MissingTimeBasis,
                format!("no source time scale; cannot convert to 'per {target}'"),
            ));
        }
        _ => {}
    }

    // ---- 3. Currency
    let target_currency = match opts.to_currency.as_deref().map(str::to_uppercase) {
        Some(code) if !patterns::is_known_currency(&code) => {
            warnings.push(QualityWarning::warning(
                WarningKind::UnknownCurrency,
                format!(
                    "target currency '{code}' is not a registered ISO-4217 code; currency conversion skipped"
                ),
            ));
            None
        }
        other => other,
    };

    let currency_step = match (&source_currency, &target_currency) {
        (Some(from), Some(to))
            if rules.allow_currency && !suppress_currency && from != to =>
        {
            let table = opts.fx.as_deref().ok_or(NormalizeError::MissingFxTable)?;
            let factor =
                table
                    .cross_rate(from, to)
                    .ok_or_else(|| NormalizeError::MissingFxRate {
                        currency: if table.rate(from).is_none() {
                            from.clone()
                        } else {
                            to.clone()
                        },
                        base: table.base.clone(),
                    })?;
            current *= factor;
            Some((from.clone(), to.clone(), factor))
        }
        _ => None,
    };

    // Steps are reported scale, currency, time: the logical processing
    // order. Multiplication commutes, the ledger does not.
    if let Some((from, to, factor)) = &currency_step {
        steps.push(ConversionStep {
            kind: StepKind::Currency,
            description: format!("{from} → {to} ({})", explain::factor_text(*factor)),
            factor: *factor,
        });
    }
    if let TimeOutcome::Applied { from, to, factor } = &time_outcome {
        steps.push(ConversionStep {
            kind: StepKind::Time,
            description: format!("{from} → {to} ({})", explain::factor_text(*factor)),
            factor: *factor,
        });
    }

    // ---- Final components and rendering
    let final_currency = match (&currency_step, suppress_currency) {
        (Some((_, to, _)), _) => Some(to.clone()),
        (None, true) => None,
        (None, false) => source_currency.clone(),
    };
    let final_magnitude = magnitude_step
        .map(|(_, to, _)| to)
        .unwrap_or(source_magnitude);
    let final_time = match &time_outcome {
        TimeOutcome::Applied { to, .. } => Some(*to),
        _ => source_time,
    };

    // Counts whose unit text was all currency ("USD Thousand") have no noun
    // left once the code is suppressed; they count generic units.
    let base_label = if stock_like_count
        || (suppress_currency
            && matches!(
                parsed.category,
                UnitCategory::Currency | UnitCategory::Composite
            ))
    {
        "units"
    } else {
        parsed.normalized_label.as_str()
    };
    let show_time = !rules.skip_time_in_unit
        && !stock_like_count
        && matches!(
            parsed.category,
            UnitCategory::Currency
                | UnitCategory::Composite
                | UnitCategory::Count
                | UnitCategory::Physical
                | UnitCategory::Energy
        );

    let rendered = label::render(&RenderInputs {
        currency: final_currency.as_deref(),
        magnitude: Some(final_magnitude),
        time: final_time,
        base_label,
        show_time,
        suppress_magnitude_label: per_capita,
    });
    let original_full_unit = label::render_original_full(&parsed, unit_text);

    let units = UnitsExplain {
        original_unit: unit_text.to_string(),
        normalized_unit: rendered.unit.clone(),
        original_full_unit,
        normalized_full_unit: rendered.full_unit.clone(),
    };

    let explain = assemble_explain(ExplainParts {
        opts,
        parsed: &parsed,
        unit_text,
        units,
        magnitude_step,
        time_outcome: &time_outcome,
        currency_step: &currency_step,
        source_time,
        final_currency: final_currency.as_deref(),
        base_label,
        warnings,
        steps,
    });

    Ok(Normalization {
        value: current,
        unit: rendered.unit,
        full_unit: rendered.full_unit,
        explain,
    })
}

/// Chosen currency code after precedence and registry validation.
fn resolve_currency(explicit: Option<&str>, parsed: &ParsedUnit) -> Option<String> {
    let chosen = explicit
        .map(str::to_uppercase)
        .or_else(|| parsed.currency.clone())?;
    patterns::is_known_currency(&chosen).then_some(chosen)
}

#[derive(Clone, Debug)]
enum TimeOutcome {
    Applied {
        from: TimeScale,
        to: TimeScale,
        factor: f64,
    },
    /// Rule row has no time dimension (stocks, prices, dimensionless).
    RuleSkip {
        target: Option<TimeScale>,
    },
    BlockedAggregation {
        reason: String,
    },
    MissingBasis {
        target: TimeScale,
    },
    Noop,
}

fn resolve_time(
    rules: &crate::rules::ConversionRules,
    indicator_type: IndicatorType,
    aggregation: Option<TemporalAggregation>,
    incompatible: bool,
    stock_like_count: bool,
    source: Option<TimeScale>,
    target: Option<TimeScale>,
) -> Result<TimeOutcome, NormalizeError> {
    if !rules.allow_time_dimension || stock_like_count {
        return Ok(TimeOutcome::RuleSkip { target });
    }

    if let Some(agg) = aggregation {
        if incompatible {
            return Ok(TimeOutcome::BlockedAggregation {
                reason: explain::blocked_time_reason(indicator_type, agg),
            });
        }
        if !agg.permits_time_conversion() {
            let conversion_requested =
                target.is_some() && (source.is_none() || source != target);
            return Ok(match (agg, conversion_requested) {
                // Snapshot and YTD figures get an explicit warning when a
                // conversion was asked for; not-applicable stays silent.
                (
                    TemporalAggregation::PointInTime | TemporalAggregation::PeriodCumulative,
                    true,
                ) => TimeOutcome::BlockedAggregation {
                    reason: explain::blocked_time_reason(indicator_type, agg),
                },
                _ => TimeOutcome::Noop,
            });
        }
    }

    match (source, target) {
        (Some(from), Some(to)) if from != to => Ok(TimeOutcome::Applied {
            from,
            to,
            factor: time_factor(from, to),
        }),
        (None, Some(to)) => {
            // A period-rate figure without a basis cannot be rescaled at
            // all; anything else degrades to a warning.
            if aggregation == Some(TemporalAggregation::PeriodRate) {
                return Err(NormalizeError::InvalidTimeBasis {
                    target: to.to_string(),
                });
            }
            Ok(TimeOutcome::MissingBasis { target: to })
        }
        _ => Ok(TimeOutcome::Noop),
    }
}

struct ExplainParts<'a> {
    opts: &'a NormalizeOptions,
    parsed: &'a ParsedUnit,
    unit_text: &'a str,
    units: UnitsExplain,
    magnitude_step: Option<(Magnitude, Magnitude, f64)>,
    time_outcome: &'a TimeOutcome,
    currency_step: &'a Option<(String, String, f64)>,
    source_time: Option<TimeScale>,
    final_currency: Option<&'a str>,
    base_label: &'a str,
    warnings: Vec<QualityWarning>,
    steps: Vec<ConversionStep>,
}

fn assemble_explain(parts: ExplainParts<'_>) -> Explain {
    let mut record = Explain {
        units: parts.units,
        ..Explain::default()
    };

    if let Some((from, to, factor)) = parts.magnitude_step {
        let direction = if to.factor() > from.factor() {
            ScaleDirection::Upscale
        } else if to.factor() < from.factor() {
            ScaleDirection::Downscale
        } else {
            ScaleDirection::None
        };
        record.magnitude = Some(MagnitudeExplain {
            original_scale: from,
            target_scale: to,
            factor,
            direction,
            description: format!("{from} → {to} ({})", explain::factor_text(factor)),
        });
        record.scale = Some(DimensionChange { from, to });
    }

    record.periodicity = periodicity_explain(
        parts.time_outcome,
        parts.source_time,
        parts.opts.to_time_scale,
    );
    if let TimeOutcome::Applied { from, to, .. } = parts.time_outcome {
        record.time_scale = Some(DimensionChange {
            from: *from,
            to: *to,
        });
    }

    if let Some((from, to, _)) = parts.currency_step {
        record.currency = Some(DimensionChange {
            from: from.clone(),
            to: to.clone(),
        });
        if let Some(table) = parts.opts.fx.as_deref() {
            let foreign = if *from != table.base { from } else { to };
            let provenance = parts.opts.fx_provenance.clone().unwrap_or_default();
            record.fx = table.rate(foreign).map(|rate| FxExplain {
                currency: foreign.clone(),
                base: table.base.clone(),
                rate: explain::round6(rate),
                as_of: table.as_of(foreign).map(str::to_string),
                source: provenance.origin,
                source_id: provenance.source_id,
            });
        }
    }

    record.reporting_frequency = parts.opts.reporting_frequency;

    if parts.final_currency.is_none() && parts.parsed.category != UnitCategory::Unknown {
        record.base_unit = Some(explain::BaseUnitExplain {
            normalized: parts.base_label.to_string(),
            category: parts.parsed.category,
        });
    }

    record.domain = explain::detect_domain(
        parts.opts.indicator_name.as_deref(),
        parts.unit_text,
        parts.parsed,
    );

    if !parts.steps.is_empty() {
        let total_factor = parts.steps.iter().map(|s| s.factor).product();
        record.conversion = Some(ConversionExplain {
            summary: format!(
                "{} → {}",
                record.units.original_full_unit, record.units.normalized_full_unit
            ),
            steps: parts.steps,
            total_factor,
        });
    }

    if !parts.warnings.is_empty() {
        record.quality_warnings = Some(parts.warnings);
    }

    record
}

fn periodicity_explain(
    outcome: &TimeOutcome,
    source: Option<TimeScale>,
    target: Option<TimeScale>,
) -> Option<PeriodicityExplain> {
    match outcome {
        TimeOutcome::Applied { from, to, factor } => {
            let direction = if to.periods_per_year() > from.periods_per_year() {
                TimeDirection::Upsample
            } else {
                TimeDirection::Downsample
            };
            Some(PeriodicityExplain {
                original: Some(*from),
                target: Some(*to),
                adjusted: true,
                factor: *factor,
                direction,
                description: format!("{from} → {to} ({})", explain::factor_text(*factor)),
            })
        }
        TimeOutcome::BlockedAggregation { reason } => Some(PeriodicityExplain {
            original: source,
            target,
            adjusted: false,
            factor: 1.0,
            direction: TimeDirection::None,
            description: reason.clone(),
        }),
        TimeOutcome::MissingBasis { target } => Some(PeriodicityExplain {
            original: None,
            target: Some(*target),
            adjusted: false,
            factor: 1.0,
            direction: TimeDirection::None,
            description: "no source time scale".to_string(),
        }),
        TimeOutcome::RuleSkip {
            target: Some(requested),
        } => Some(PeriodicityExplain {
            original: source,
            target: Some(*requested),
            adjusted: false,
            factor: 1.0,
            direction: TimeDirection::None,
            description: "time dimension not applicable for this indicator".to_string(),
        }),
        _ => None,
    }
}
