//! Display-ready metrics: integral money columns and a one-decimal conversion percentage.
//!
//! Rounding is half-up (away from zero) on the shortest decimal form of each
//! value, so `0.8675` becomes `86.8` and `2.5` becomes `3` regardless of how
//! the binary float happens to sit around the midpoint.

use crate::{cell::Cell, period::columns, PerfError};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};
use std::str::FromStr;

/// Columns rounded to whole numbers.
pub const INTEGRAL_COLUMNS: [&str; 3] = [columns::APE, columns::ATS, columns::APE_PER_LEAD];

/// Whether the conversion column still holds a fraction or already a percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RatioScale {
    Fraction,
    Percent,
}

/// A projected slice of one period's records.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordSubset {
    pub period: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
    pub ratio_scale: RatioScale,
}

impl RecordSubset {
    pub fn new(period: &str, columns: Vec<String>, rows: Vec<Vec<Cell>>) -> Self {
        Self {
            period: period.to_string(),
            columns,
            rows,
            ratio_scale: RatioScale::Fraction,
        }
    }

    pub fn position(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Return a normalized copy of `subset`. Columns other than the money
/// columns and the conversion ratio are left as they are.
pub fn normalize(subset: &RecordSubset) -> Result<RecordSubset, PerfError> {
    let mut out = subset.clone();

    for column in INTEGRAL_COLUMNS {
        if let Some(position) = out.position(column) {
            for row in out.rows.iter_mut() {
                row[position] = round_integral(&row[position], column, &out.period)?;
            }
        }
    }

    if let Some(position) = out.position(columns::CONVERSION) {
        let rescale = out.ratio_scale == RatioScale::Fraction;
        for row in out.rows.iter_mut() {
            row[position] = round_percent(&row[position], rescale, &out.period)?;
        }
    }
    out.ratio_scale = RatioScale::Percent;

    Ok(out)
}

fn decimal_of(cell: &Cell, column: &str, period: &str) -> Result<Option<Decimal>, PerfError> {
    match cell {
        Cell::Null => Ok(None),
        Cell::Int(v) => Ok(Some(Decimal::from(*v))),
        // Display gives the shortest representation that round-trips
        Cell::Float(v) => Decimal::from_str(&v.to_string())
            .or_else(|_| Decimal::from_f64(*v).ok_or(()))
            .map(Some)
            .map_err(|_| PerfError::coercion(column, period, v)),
        Cell::Text(s) => Err(PerfError::coercion(column, period, s)),
    }
}

fn round_integral(cell: &Cell, column: &str, period: &str) -> Result<Cell, PerfError> {
    let Some(value) = decimal_of(cell, column, period)? else {
        return Ok(Cell::Null);
    };
    value
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .map(Cell::Int)
        .ok_or_else(|| PerfError::coercion(column, period, cell))
}

fn round_percent(cell: &Cell, rescale: bool, period: &str) -> Result<Cell, PerfError> {
    let column = columns::CONVERSION;
    let Some(mut value) = decimal_of(cell, column, period)? else {
        return Ok(Cell::Null);
    };
    if rescale {
        value = value
            .checked_mul(Decimal::ONE_HUNDRED)
            .ok_or_else(|| PerfError::coercion(column, period, cell))?;
    }
    // parse the decimal text so the float is the nearest one to the displayed digits
    value
        .round_dp_with_strategy(1, RoundingStrategy::MidpointAwayFromZero)
        .to_string()
        .parse::<f64>()
        .map(Cell::Float)
        .map_err(|_| PerfError::coercion(column, period, cell))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subset(rows: Vec<Vec<Cell>>) -> RecordSubset {
        RecordSubset::new(
            "June",
            vec!["Ecode".into(), "Leads".into(), "APE".into(), "ATS".into(), "Con.%".into(), "APE/Leads".into()],
            rows,
        )
    }

    #[test]
    fn test_conversion_ratio_half_up() {
        let normalized = normalize(&subset(vec![vec![
            Cell::text("E1"),
            Cell::Int(40),
            Cell::Float(1000.0),
            Cell::Float(500.0),
            Cell::Float(0.8675),
            Cell::Float(25.0),
        ]]))
        .unwrap();
        assert_eq!(normalized.rows[0][4], Cell::Float(86.8));
        assert_eq!(normalized.ratio_scale, RatioScale::Percent);
    }

    #[test]
    fn test_money_columns_round_half_away_from_zero() {
        let normalized = normalize(&subset(vec![
            vec![Cell::text("E1"), Cell::Int(1), Cell::Float(2.5), Cell::Float(3.49), Cell::Null, Cell::Float(-2.5)],
            vec![Cell::text("E2"), Cell::Int(1), Cell::Float(0.5), Cell::Int(7), Cell::Float(0.1235), Cell::Float(1.4999)],
        ]))
        .unwrap();
        assert_eq!(normalized.rows[0][2], Cell::Int(3));
        assert_eq!(normalized.rows[0][3], Cell::Int(3));
        assert_eq!(normalized.rows[0][5], Cell::Int(-3));
        assert_eq!(normalized.rows[1][2], Cell::Int(1));
        assert_eq!(normalized.rows[1][3], Cell::Int(7));
        assert_eq!(normalized.rows[1][4], Cell::Float(12.4));
        assert_eq!(normalized.rows[1][5], Cell::Int(1));
    }

    #[test]
    fn test_other_columns_untouched_and_nulls_kept() {
        let normalized = normalize(&subset(vec![vec![
            Cell::text("E1"),
            Cell::Float(10.7),
            Cell::Null,
            Cell::Null,
            Cell::Null,
            Cell::Null,
        ]]))
        .unwrap();
        assert_eq!(normalized.rows[0][1], Cell::Float(10.7));
        assert!(normalized.rows[0][2..].iter().all(Cell::is_null));
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let once = normalize(&subset(vec![vec![
            Cell::text("E1"),
            Cell::Int(3),
            Cell::Float(1234.5),
            Cell::Float(99.5),
            Cell::Float(0.333333),
            Cell::Float(411.5),
        ]]))
        .unwrap();
        let twice = normalize(&once).unwrap();
        assert_eq!(once, twice);
        assert_eq!(twice.rows[0][4], Cell::Float(33.3));
    }

    #[test]
    fn test_text_in_metric_column_is_a_coercion_fault() {
        let result = normalize(&subset(vec![vec![
            Cell::text("E1"),
            Cell::Int(3),
            Cell::text("#DIV/0!"),
            Cell::Null,
            Cell::Null,
            Cell::Null,
        ]]));
        match result {
            Err(PerfError::TypeCoercion { column, period, .. }) => {
                assert_eq!(column, "APE");
                assert_eq!(period, "June");
            }
            other => panic!("expected coercion fault, got {:?}", other),
        }
    }
}
