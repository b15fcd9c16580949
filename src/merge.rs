//! Cross-period merge: one wide row per employee, metrics prefixed by period.

use crate::{
    cell::Cell,
    normalize::{normalize, RecordSubset},
    period::{columns, PeriodDataset, PeriodSet},
    selection::{resolve, Selection},
    table::WideTable,
    PerfError,
};
use itertools::Itertools;
use rustc_hash::FxHashMap;
use std::collections::BTreeSet;
use tracing::{debug, info, info_span, warn};

pub const DEFAULT_SEPARATOR: &str = "_";

/// Columns identifying an employee; never period-prefixed. Also the outer join key.
pub const KEY_COLUMNS: [&str; 4] = [columns::ECODE, columns::EMPLOYEE_NAME, columns::STATUS, columns::AGEING];

const IDENTITY_COLUMNS: [&str; 3] = [columns::ECODE, columns::EMPLOYEE_NAME, columns::STATUS];

const METRIC_COLUMNS: [&str; 7] = [
    columns::PROCESS,
    columns::LEADS,
    columns::BOOKINGS,
    columns::APE,
    columns::ATS,
    columns::CONVERSION,
    columns::APE_PER_LEAD,
];

/// Tenure buckets come from the latest period and nowhere else.
///
/// Earlier periods may carry an older bucket for the same employee; those
/// values are never read, even when the row being built is an earlier month.
#[derive(Debug, Clone, Default)]
pub struct LatestPeriodTenure {
    buckets: FxHashMap<String, Cell>,
}

impl LatestPeriodTenure {
    pub fn from_latest(latest: &PeriodDataset, identifiers: &BTreeSet<String>) -> Result<Self, PerfError> {
        let positions = latest.positions_for(identifiers)?;
        let mut buckets = FxHashMap::default();
        if positions.is_empty() {
            return Ok(Self { buckets });
        }
        let ageing = latest.column(columns::AGEING)?;
        for position in positions {
            buckets.insert(latest.identifier_at(position)?, latest.row(position)[ageing].clone());
        }
        Ok(Self { buckets })
    }

    /// Null when the employee is absent from the latest period.
    pub fn bucket_for(&self, identifier: &str) -> Cell {
        self.buckets.get(identifier).cloned().unwrap_or_default()
    }
}

/// One period's normalized rows, unprefixed, as the per-month view shows them.
#[derive(Debug, Clone, PartialEq)]
pub struct PeriodTable {
    pub period: String,
    pub table: WideTable,
}

pub struct MergeEngine<'a> {
    periods: &'a PeriodSet,
    separator: String,
}

impl<'a> MergeEngine<'a> {
    pub fn new(periods: &'a PeriodSet) -> Self {
        Self {
            periods,
            separator: DEFAULT_SEPARATOR.to_string(),
        }
    }

    pub fn with_separator(mut self, separator: &str) -> Self {
        self.separator = separator.to_string();
        self
    }

    /// Resolve a selection against the latest period and merge the matches,
    /// showing the dimension's extra column.
    pub fn compare(&self, selection: &Selection) -> Result<Option<WideTable>, PerfError> {
        let identifiers = resolve(selection, self.periods.latest())?;
        let extras = selection.dimension.extra_columns();
        self.merge(&identifiers, &extras)
    }

    /// Outer-join the requested employees across all periods.
    ///
    /// Returns `Ok(None)` when no period has any of the identifiers.
    pub fn merge(&self, identifiers: &BTreeSet<String>, extra_columns: &[&str]) -> Result<Option<WideTable>, PerfError> {
        let span = info_span!("merge", requested = identifiers.len());
        let _guard = span.enter();

        let frames = self.prefixed_subsets(identifiers, extra_columns)?;
        if frames.is_empty() {
            info!("no period contributed rows");
            return Ok(None);
        }

        let joined = outer_join(frames, &KEY_COLUMNS)?;
        let sorted = sort_by_identifier(joined);
        let table = arrange_columns(sorted, &KEY_COLUMNS);

        info!(rows = table.len(), columns = table.columns().len(), "merged periods");
        Ok(Some(table))
    }

    /// The per-month breakdown: one normalized table per period with matches.
    pub fn period_tables(
        &self,
        identifiers: &BTreeSet<String>,
        extra_columns: &[&str],
    ) -> Result<Vec<PeriodTable>, PerfError> {
        let tenure = LatestPeriodTenure::from_latest(self.periods.latest(), identifiers)?;
        let mut tables = Vec::new();
        for period in self.periods.iter() {
            if let Some(subset) = period_subset(period, identifiers, extra_columns, &tenure)? {
                let table = WideTable::new(subset.columns, subset.rows);
                tables.push(PeriodTable {
                    period: period.name().to_string(),
                    table: arrange_columns(table, &KEY_COLUMNS),
                });
            }
        }
        Ok(tables)
    }

    fn prefixed_subsets(
        &self,
        identifiers: &BTreeSet<String>,
        extra_columns: &[&str],
    ) -> Result<Vec<RecordSubset>, PerfError> {
        if identifiers.is_empty() {
            return Ok(Vec::new());
        }
        let tenure = LatestPeriodTenure::from_latest(self.periods.latest(), identifiers)?;

        let mut frames = Vec::new();
        for period in self.periods.iter() {
            match period_subset(period, identifiers, extra_columns, &tenure)? {
                Some(subset) => {
                    debug!(period = period.name(), rows = subset.rows.len(), "period contributes rows");
                    frames.push(prefix_columns(subset, &self.separator));
                }
                None => debug!(period = period.name(), "period has no matching rows"),
            }
        }
        Ok(frames)
    }
}

/// Select, project, attach tenure and normalize one period. `None` when the
/// period has none of the identifiers.
fn period_subset(
    period: &PeriodDataset,
    identifiers: &BTreeSet<String>,
    extra_columns: &[&str],
    tenure: &LatestPeriodTenure,
) -> Result<Option<RecordSubset>, PerfError> {
    let positions = period.positions_for(identifiers)?;
    if positions.is_empty() {
        return Ok(None);
    }

    let identity = IDENTITY_COLUMNS
        .iter()
        .map(|c| period.column(c))
        .collect::<Result<Vec<_>, _>>()?;
    let extras = extra_columns
        .iter()
        .map(|&c| period.column(c).map(|position| (c, position)))
        .collect::<Result<Vec<_>, _>>()?;
    let metrics = METRIC_COLUMNS
        .iter()
        .map(|c| period.column(c))
        .collect::<Result<Vec<_>, _>>()?;

    let mut names: Vec<String> = IDENTITY_COLUMNS.iter().map(|c| c.to_string()).collect();
    names.extend(extras.iter().map(|(c, _)| c.to_string()));
    names.extend(METRIC_COLUMNS.iter().map(|c| c.to_string()));
    names.push(columns::AGEING.to_string());

    let mut rows = Vec::with_capacity(positions.len());
    for position in positions {
        let source = period.row(position);
        let identifier = period.identifier_at(position)?;

        let mut row = Vec::with_capacity(names.len());
        row.push(Cell::Text(identifier.clone()));
        row.extend(identity[1..].iter().map(|&i| source[i].clone()));
        row.extend(extras.iter().map(|&(_, i)| source[i].clone()));
        row.extend(metrics.iter().map(|&i| source[i].clone()));
        row.push(tenure.bucket_for(&identifier));
        rows.push(row);
    }

    normalize(&RecordSubset::new(period.name(), names, rows)).map(Some)
}

fn prefix_columns(mut subset: RecordSubset, separator: &str) -> RecordSubset {
    for column in subset.columns.iter_mut() {
        if !KEY_COLUMNS.contains(&column.as_str()) {
            *column = format!("{}{}{}", subset.period, separator, column);
        }
    }
    subset
}

fn describe_identity(key: &[Cell]) -> String {
    key.iter().map(|cell| cell.to_string()).join(", ")
}

/// Full outer join of the frames, in order, on `keys`.
///
/// Output columns are the first frame's columns followed by each later
/// frame's non-key columns. A row present in some frames only carries nulls
/// for the others. An identifier whose name or status changed between
/// periods keeps one row per distinct key; the change is logged.
fn outer_join(frames: Vec<RecordSubset>, keys: &[&str]) -> Result<WideTable, PerfError> {
    let mut columns: Vec<String> = Vec::new();
    let mut rows: Vec<Vec<Cell>> = Vec::new();
    let mut row_for_key: FxHashMap<Vec<Cell>, usize> = FxHashMap::default();
    // first key seen for each identifier, and the period it came from
    let mut key_for_identifier: FxHashMap<String, (Vec<Cell>, String)> = FxHashMap::default();

    for frame in frames {
        let key_positions = keys
            .iter()
            .map(|k| frame.position(k).ok_or_else(|| PerfError::schema(k, &frame.period)))
            .collect::<Result<Vec<_>, _>>()?;

        // where each frame column lands in the output
        let mut target = Vec::with_capacity(frame.columns.len());
        for (position, name) in frame.columns.iter().enumerate() {
            let existing = key_positions
                .contains(&position)
                .then(|| columns.iter().position(|c| c == name))
                .flatten();
            target.push(existing.unwrap_or_else(|| {
                columns.push(name.clone());
                columns.len() - 1
            }));
        }
        let width = columns.len();
        for row in rows.iter_mut() {
            row.resize(width, Cell::Null);
        }

        for source in frame.rows {
            let key: Vec<Cell> = key_positions.iter().map(|&p| source[p].clone()).collect();
            let identifier = key[0].to_string();
            match key_for_identifier.get(&identifier) {
                Some((known, first_period)) if known != &key && !row_for_key.contains_key(&key) => {
                    warn!(
                        identifier = %identifier,
                        first_period = %first_period,
                        second_period = %frame.period,
                        first = %describe_identity(&known[1..]),
                        second = %describe_identity(&key[1..]),
                        "identity changed between periods, keeping separate rows"
                    );
                }
                Some(_) => {}
                None => {
                    key_for_identifier.insert(identifier, (key.clone(), frame.period.clone()));
                }
            }

            let index = *row_for_key.entry(key).or_insert_with(|| {
                rows.push(vec![Cell::Null; width]);
                rows.len() - 1
            });
            for (cell, &column) in source.into_iter().zip(target.iter()) {
                rows[index][column] = cell;
            }
        }
    }

    Ok(WideTable::new(columns, rows))
}

/// Rows ordered by identifier as strings: "10" < "100" < "9".
fn sort_by_identifier(mut table: WideTable) -> WideTable {
    if let Some(position) = table.position(columns::ECODE) {
        table.rows_mut().sort_by_cached_key(|row| row[position].to_string());
    }
    table
}

/// Put `leading` columns first, in that order, and keep the rest as they came.
/// Only shapes the display; no join semantics live here.
pub fn arrange_columns(table: WideTable, leading: &[&str]) -> WideTable {
    let (columns, rows) = table.into_parts();
    let order: Vec<usize> = leading
        .iter()
        .filter_map(|name| columns.iter().position(|c| c == name))
        .chain((0..columns.len()).filter(|&i| !leading.contains(&columns[i].as_str())))
        .collect();

    let arranged_columns = order.iter().map(|&i| columns[i].clone()).collect();
    let arranged_rows = rows
        .into_iter()
        .map(|row| order.iter().map(|&i| row[i].clone()).collect())
        .collect();
    WideTable::new(arranged_columns, arranged_rows)
}
