//! Real-value adjustment against a consumer-price index table.
//!
//! A deliberately small facility: the caller supplies annual index levels
//! and values deflate (or inflate) between any two recorded years. No
//! interpolation, no extrapolation; unknown years are an error.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::CpiError;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CpiTable {
    pub base_year: i32,
    /// year -> index level (base year conventionally 100).
    pub index: BTreeMap<i32, f64>,
}

impl CpiTable {
    /// Build a table, rejecting non-positive index levels.
    pub fn try_new(base_year: i32, index: BTreeMap<i32, f64>) -> Result<Self, CpiError> {
        for (&year, &level) in &index {
            if !level.is_finite() || level <= 0.0 {
                return Err(CpiError::InvalidLevel { year, level });
            }
        }
        Ok(Self { base_year, index })
    }

    fn level(&self, year: i32) -> Result<f64, CpiError> {
        self.index
            .get(&year)
            .copied()
            .ok_or(CpiError::UnknownYear(year))
    }

    /// Express a `from_year` nominal value in `to_year` price levels.
    pub fn deflate(&self, value: f64, from_year: i32, to_year: i32) -> Result<f64, CpiError> {
        if from_year == to_year {
            return Ok(value);
        }
        Ok(value * self.level(to_year)? / self.level(from_year)?)
    }

    /// Shorthand for deflating to the table's base year.
    pub fn to_base_year(&self, value: f64, from_year: i32) -> Result<f64, CpiError> {
        self.deflate(value, from_year, self.base_year)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> CpiTable {
        CpiTable::try_new(
            2020,
            BTreeMap::from([(2020, 100.0), (2023, 115.0), (2025, 121.9)]),
        )
        .unwrap()
    }

    #[test]
    fn deflation_follows_the_index_ratio() {
        let real = table().deflate(230.0, 2023, 2020).unwrap();
        assert!((real - 200.0).abs() < 1e-9);

        let nominal = table().deflate(200.0, 2020, 2023).unwrap();
        assert!((nominal - 230.0).abs() < 1e-9);
    }

    #[test]
    fn same_year_is_identity() {
        assert_eq!(table().deflate(42.0, 2023, 2023).unwrap(), 42.0);
    }

    #[test]
    fn unknown_year_errors() {
        let err = table().deflate(1.0, 2021, 2020);
        assert!(matches!(err, Err(CpiError::UnknownYear(2021))));
    }

    #[test]
    fn non_positive_levels_are_rejected() {
        let err = CpiTable::try_new(2020, BTreeMap::from([(2020, 0.0)]));
        assert!(matches!(err, Err(CpiError::InvalidLevel { .. })));
    }

    #[test]
    fn to_base_year_shorthand() {
        let real = table().to_base_year(121.9, 2025).unwrap();
        assert!((real - 100.0).abs() < 1e-9);
    }
}
