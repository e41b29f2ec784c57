use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};

/// Multiplicative unit exponent of a reported value.
///
/// `HundredMillions` (1e8) exists because several Asian statistical offices
/// report in units of 10^8 (Chinese 亿 / Japanese 億).
#[derive(
    Copy, Clone, Debug, Display, EnumString, EnumIter, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum Magnitude {
    #[strum(serialize = "ones")]
    Ones,

    #[strum(serialize = "hundreds")]
    Hundreds,

    #[strum(serialize = "thousands")]
    Thousands,

    #[strum(serialize = "hundred-millions")]
    HundredMillions,

    #[strum(serialize = "millions")]
    Millions,

    #[strum(serialize = "billions")]
    Billions,

    #[strum(serialize = "trillions")]
    Trillions,
}

impl Magnitude {
    /// The exact multiplier this magnitude applies to a raw number.
    pub fn factor(&self) -> f64 {
        match self {
            Magnitude::Ones => 1.0,
            Magnitude::Hundreds => 1e2,
            Magnitude::Thousands => 1e3,
            Magnitude::HundredMillions => 1e8,
            Magnitude::Millions => 1e6,
            Magnitude::Billions => 1e9,
            Magnitude::Trillions => 1e12,
        }
    }
}

/// The denominator time basis of a flow ("per month", "per year", ...).
#[derive(
    Copy, Clone, Debug, Display, EnumString, EnumIter, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum TimeScale {
    #[strum(serialize = "hour")]
    Hour,

    #[strum(serialize = "day")]
    Day,

    #[strum(serialize = "week")]
    Week,

    #[strum(serialize = "month")]
    Month,

    #[strum(serialize = "quarter")]
    Quarter,

    #[strum(serialize = "year")]
    Year,
}

impl TimeScale {
    /// Fixed number of periods per year. Calendar conventions, not astronomy:
    /// 52 weeks, 365 days, 8760 hours.
    pub fn periods_per_year(&self) -> f64 {
        match self {
            TimeScale::Year => 1.0,
            TimeScale::Quarter => 4.0,
            TimeScale::Month => 12.0,
            TimeScale::Week => 52.0,
            TimeScale::Day => 365.0,
            TimeScale::Hour => 8760.0,
        }
    }
}

/// Factor that converts a value reported in `from` into `to`.
///
/// A value "in billions" becomes one "in millions" by multiplying with 1000.
pub fn magnitude_factor(from: Magnitude, to: Magnitude) -> f64 {
    from.factor() / to.factor()
}

pub fn rescale_magnitude(value: f64, from: Magnitude, to: Magnitude) -> f64 {
    value * magnitude_factor(from, to)
}

/// Factor that converts a per-`from` flow into a per-`to` flow.
///
/// A quarterly flow becomes a monthly one by dividing by 3
/// (4 quarters/year over 12 months/year).
pub fn time_factor(from: TimeScale, to: TimeScale) -> f64 {
    from.periods_per_year() / to.periods_per_year()
}

pub fn rescale_time(value: f64, from: TimeScale, to: TimeScale) -> f64 {
    value * time_factor(from, to)
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn magnitude_rescale_billions_to_millions() {
        let v = rescale_magnitude(-482.58, Magnitude::Billions, Magnitude::Millions);
        assert!((v - (-482_580.0)).abs() < 1e-9);
    }

    #[test]
    fn magnitude_rescale_is_inverse() {
        for from in Magnitude::iter() {
            for to in Magnitude::iter() {
                let v = rescale_magnitude(123.456, from, to);
                let back = rescale_magnitude(v, to, from);
                assert!(
                    (back - 123.456).abs() < 1e-9,
                    "{from} -> {to} roundtrip drifted: {back}"
                );
            }
        }
    }

    #[test]
    fn time_rescale_quarter_to_month_divides_by_three() {
        let v = rescale_time(-1447.74, TimeScale::Quarter, TimeScale::Month);
        assert!((v - (-1447.74 / 3.0)).abs() < 1e-9);
    }

    #[test]
    fn time_rescale_month_to_year_multiplies_by_twelve() {
        let v = rescale_time(100.0, TimeScale::Month, TimeScale::Year);
        assert!((v - 1200.0).abs() < 1e-9);
    }

    #[test]
    fn magnitude_and_time_commute() {
        let a = rescale_time(
            rescale_magnitude(7.5, Magnitude::Billions, Magnitude::Millions),
            TimeScale::Quarter,
            TimeScale::Month,
        );
        let b = rescale_magnitude(
            rescale_time(7.5, TimeScale::Quarter, TimeScale::Month),
            Magnitude::Billions,
            Magnitude::Millions,
        );
        assert!((a - b).abs() < 1e-9);
    }

    #[test]
    fn canonical_tokens_roundtrip_through_strum() {
        assert_eq!(Magnitude::HundredMillions.to_string(), "hundred-millions");
        assert_eq!(
            "hundred-millions".parse::<Magnitude>().unwrap(),
            Magnitude::HundredMillions
        );
        assert_eq!(TimeScale::Quarter.to_string(), "quarter");
        assert_eq!("quarter".parse::<TimeScale>().unwrap(), TimeScale::Quarter);
    }
}
