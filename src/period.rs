//! One month's per-agent extract, loaded once and read-only afterwards.

use crate::{cell::Cell, extract::RawExtract, PerfError};
use itertools::Itertools;
use rustc_hash::FxHashMap;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::debug;

/// Column names of the per-agent sheet, as they read after trimming.
pub mod columns {
    pub const ECODE: &str = "Ecode";
    pub const EMPLOYEE_NAME: &str = "Employee Name";
    pub const STATUS: &str = "Status";
    pub const PROCESS: &str = "Process_Final";
    pub const LEADS: &str = "Leads";
    pub const BOOKINGS: &str = "Bkgs";
    pub const APE: &str = "APE";
    pub const ATS: &str = "ATS";
    pub const CONVERSION: &str = "Con.%";
    pub const APE_PER_LEAD: &str = "APE/Leads";
    pub const AGEING: &str = "Ageing";
    pub const MANAGER: &str = "Manager";
    pub const FIRST_REPORTING: &str = "1st Reporting";
    pub const SECOND_REPORTING: &str = "2nd Reporting";
}

/// Rows above the real header in every extract (the report banner).
pub const DEFAULT_HEADER_OFFSET: usize = 1;

#[derive(Debug, Clone)]
pub struct PeriodDataset {
    name: String,
    headers: Vec<String>,
    column_index: FxHashMap<String, usize>,
    rows: Vec<Vec<Cell>>,
    id_index: FxHashMap<String, usize>,
}

impl PeriodDataset {
    /// Build a dataset from a raw sheet grid.
    ///
    /// Missing columns are not detected here; they surface as
    /// [`PerfError::Schema`] when a query first references them.
    pub fn load(name: &str, raw: RawExtract, header_offset: usize) -> Result<Self, PerfError> {
        let mut grid = raw.rows.into_iter().skip(header_offset);
        let headers: Vec<String> = grid
            .next()
            .map(|row| row.iter().map(|cell| cell.to_string().trim().to_string()).collect())
            .unwrap_or_default();

        let mut column_index = FxHashMap::default();
        for (position, header) in headers.iter().enumerate() {
            column_index.entry(header.clone()).or_insert(position);
        }

        let width = headers.len();
        let rows: Vec<Vec<Cell>> = grid
            .filter(|row| row.iter().any(|cell| !cell.is_null()))
            .map(|mut row| {
                row.resize(width.max(row.len()), Cell::Null);
                row
            })
            .collect();

        let mut dataset = Self {
            name: name.to_string(),
            headers,
            column_index,
            rows,
            id_index: FxHashMap::default(),
        };
        dataset.build_id_index()?;

        debug!(
            period = %dataset.name,
            rows = dataset.rows.len(),
            columns = dataset.headers.len(),
            "loaded period dataset"
        );
        Ok(dataset)
    }

    fn build_id_index(&mut self) -> Result<(), PerfError> {
        let Some(&ecode) = self.column_index.get(columns::ECODE) else {
            return Ok(());
        };
        for (position, row) in self.rows.iter().enumerate() {
            let cell = &row[ecode];
            // blank identifiers mark total or note lines, never employees
            if cell.is_null() || cell.as_str().is_some_and(|s| s.trim().is_empty()) {
                continue;
            }
            let id = cell
                .canonical_id()
                .ok_or_else(|| PerfError::coercion(columns::ECODE, &self.name, display_raw(cell)))?;
            if self.id_index.insert(id.clone(), position).is_some() {
                return Err(PerfError::DuplicateIdentifier {
                    period: self.name.clone(),
                    identifier: id,
                });
            }
        }
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.column_index.contains_key(column)
    }

    /// Position of a column, or a schema fault naming it and this period.
    pub fn column(&self, column: &str) -> Result<usize, PerfError> {
        self.column_index
            .get(column)
            .copied()
            .ok_or_else(|| PerfError::schema(column, &self.name))
    }

    pub fn row(&self, position: usize) -> &[Cell] {
        &self.rows[position]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[Cell]> {
        self.rows.iter().map(|row| row.as_slice())
    }

    pub fn identifiers(&self) -> impl Iterator<Item = &str> {
        self.id_index.keys().map(|id| id.as_str())
    }

    pub fn record(&self, identifier: &str) -> Option<Record<'_>> {
        self.id_index.get(identifier).map(|&position| Record {
            dataset: self,
            position,
        })
    }

    /// Canonical identifier of a row; fails when the value cannot act as a join key.
    pub fn identifier_at(&self, position: usize) -> Result<String, PerfError> {
        let ecode = self.column(columns::ECODE)?;
        let cell = &self.rows[position][ecode];
        cell.canonical_id()
            .ok_or_else(|| PerfError::coercion(columns::ECODE, &self.name, display_raw(cell)))
    }

    /// Row positions, in extract order, whose identifier is in `identifiers`.
    pub fn positions_for(&self, identifiers: &BTreeSet<String>) -> Result<Vec<usize>, PerfError> {
        self.column(columns::ECODE)?;
        Ok(identifiers
            .iter()
            .filter_map(|id| self.id_index.get(id).copied())
            .sorted_unstable()
            .collect())
    }

    /// Distinct non-null values of a column in first-appearance order.
    pub fn attribute_values(&self, column: &str) -> Result<Vec<Cell>, PerfError> {
        let position = self.column(column)?;
        Ok(self
            .rows
            .iter()
            .map(|row| &row[position])
            .filter(|cell| !cell.is_null())
            .unique()
            .cloned()
            .collect())
    }
}

fn display_raw(cell: &Cell) -> String {
    match cell {
        Cell::Null => "<empty>".to_string(),
        other => other.to_string(),
    }
}

/// A borrowed view of one employee's row.
#[derive(Debug, Clone, Copy)]
pub struct Record<'a> {
    dataset: &'a PeriodDataset,
    position: usize,
}

impl<'a> Record<'a> {
    pub fn get(&self, column: &str) -> Result<&'a Cell, PerfError> {
        let index = self.dataset.column(column)?;
        Ok(&self.dataset.rows[self.position][index])
    }

    pub fn position(&self) -> usize {
        self.position
    }
}

/// The loaded periods of one comparison, earliest first.
#[derive(Debug, Clone)]
pub struct PeriodSet {
    periods: Vec<Arc<PeriodDataset>>,
}

impl PeriodSet {
    pub fn new(periods: Vec<Arc<PeriodDataset>>) -> Result<Self, PerfError> {
        if periods.is_empty() {
            return Err(PerfError::Config("at least one period is required".to_string()));
        }
        if let Some(name) = periods.iter().map(|p| p.name()).duplicates().next() {
            return Err(PerfError::Config(format!("period '{}' is listed twice", name)));
        }
        Ok(Self { periods })
    }

    /// The most recent period; the only trusted source for selection attributes and tenure.
    pub fn latest(&self) -> &PeriodDataset {
        // `new` guarantees at least one period
        &self.periods[self.periods.len() - 1]
    }

    pub fn iter(&self) -> impl Iterator<Item = &PeriodDataset> {
        self.periods.iter().map(|p| p.as_ref())
    }

    pub fn names(&self) -> Vec<&str> {
        self.periods.iter().map(|p| p.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.periods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.periods.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(rows: &[&[&str]]) -> RawExtract {
        RawExtract::from_text_rows(rows)
    }

    #[test]
    fn test_load_skips_banner_and_trims_headers() {
        let dataset = PeriodDataset::load(
            "June",
            raw(&[&["Agent Wise"], &[" Ecode ", "Employee Name  ", "Status"], &["E1", "Asha", "Active"]]),
            DEFAULT_HEADER_OFFSET,
        )
        .unwrap();
        assert_eq!(dataset.headers(), &["Ecode", "Employee Name", "Status"]);
        assert_eq!(dataset.len(), 1);
        let record = dataset.record("E1").unwrap();
        assert_eq!(record.get(columns::EMPLOYEE_NAME).unwrap(), &Cell::text("Asha"));
    }

    #[test]
    fn test_missing_column_is_reported_lazily() {
        let dataset =
            PeriodDataset::load("July", raw(&[&["banner"], &["Ecode", "Leads"], &["E1", "4"]]), 1).unwrap();
        match dataset.column(columns::BOOKINGS) {
            Err(PerfError::Schema { column, period }) => {
                assert_eq!(column, "Bkgs");
                assert_eq!(period, "July");
            }
            other => panic!("expected schema fault, got {:?}", other),
        }
    }

    #[test]
    fn test_blank_rows_dropped_and_short_rows_padded() {
        let dataset = PeriodDataset::load(
            "June",
            raw(&[&["banner"], &["Ecode", "Leads", "Bkgs"], &["", "", ""], &["E2", "3"]]),
            1,
        )
        .unwrap();
        assert_eq!(dataset.len(), 1);
        assert_eq!(dataset.row(0)[2], Cell::Null);
    }

    #[test]
    fn test_numeric_and_text_identifiers_share_an_index() {
        let dataset =
            PeriodDataset::load("June", raw(&[&["banner"], &["Ecode"], &["1001"], &["1002.0"]]), 1).unwrap();
        assert!(dataset.record("1001").is_some());
        assert!(dataset.record("1002").is_some());
    }

    #[test]
    fn test_fractional_identifier_is_coercion_fault() {
        let result = PeriodDataset::load(
            "June",
            raw(&[&["banner"], &["Ecode", "Employee Name"], &["1001", "Ravi"], &["1001.5", "Asha"]]),
            1,
        );
        match result {
            Err(PerfError::TypeCoercion { column, period, value }) => {
                assert_eq!(column, "Ecode");
                assert_eq!(period, "June");
                assert_eq!(value, "1001.5");
            }
            other => panic!("expected coercion fault, got {:?}", other),
        }
    }

    #[test]
    fn test_rows_without_identifier_are_not_indexed() {
        let dataset = PeriodDataset::load(
            "June",
            raw(&[&["banner"], &["Ecode", "Leads"], &["E1", "4"], &["", "40"]]),
            1,
        )
        .unwrap();
        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.identifiers().count(), 1);
    }

    #[test]
    fn test_duplicate_identifier_rejected() {
        let result = PeriodDataset::load("June", raw(&[&["banner"], &["Ecode"], &["E1"], &["E1"]]), 1);
        assert!(matches!(result, Err(PerfError::DuplicateIdentifier { .. })));
    }

    #[test]
    fn test_attribute_values_distinct_in_order() {
        let dataset = PeriodDataset::load(
            "August",
            raw(&[
                &["banner"],
                &["Ecode", "Manager"],
                &["E1", "Meera"],
                &["E2", ""],
                &["E3", "Karan"],
                &["E4", "Meera"],
                &["E5", "7"],
            ]),
            1,
        )
        .unwrap();
        let values = dataset.attribute_values(columns::MANAGER).unwrap();
        assert_eq!(values, vec![Cell::text("Meera"), Cell::text("Karan"), Cell::Int(7)]);
    }

    #[test]
    fn test_period_set_latest_is_last() {
        let load = |name: &str| Arc::new(PeriodDataset::load(name, raw(&[&["b"], &["Ecode"]]), 1).unwrap());
        let set = PeriodSet::new(vec![load("June"), load("July"), load("August")]).unwrap();
        assert_eq!(set.latest().name(), "August");
        assert_eq!(set.names(), vec!["June", "July", "August"]);
        assert!(PeriodSet::new(vec![]).is_err());
        assert!(PeriodSet::new(vec![load("June"), load("June")]).is_err());
    }
}
