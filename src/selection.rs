use crate::{
    cell::Cell,
    period::{columns, PeriodDataset},
    PerfError,
};
use clap::ValueEnum;
use rustc_hash::FxHashSet;
use smallvec::{smallvec, SmallVec};
use std::collections::BTreeSet;
use std::fmt;
use tracing::debug;

/// The axis an analyst picks employees by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum Dimension {
    /// A typed employee code, matched directly
    Agent,
    Process,
    FirstReporting,
    SecondReporting,
    Manager,
    /// Tenure bucket
    Ageing,
}

impl Dimension {
    pub const ALL: [Dimension; 6] = [
        Dimension::Agent,
        Dimension::Process,
        Dimension::FirstReporting,
        Dimension::SecondReporting,
        Dimension::Manager,
        Dimension::Ageing,
    ];

    /// Column of the latest period the chosen values are matched against.
    pub fn attribute_column(self) -> &'static str {
        match self {
            Dimension::Agent => columns::ECODE,
            Dimension::Process => columns::PROCESS,
            Dimension::FirstReporting => columns::FIRST_REPORTING,
            Dimension::SecondReporting => columns::SECOND_REPORTING,
            Dimension::Manager => columns::MANAGER,
            Dimension::Ageing => columns::AGEING,
        }
    }

    /// Categorical columns shown alongside the metrics for this dimension.
    pub fn extra_columns(self) -> SmallVec<[&'static str; 1]> {
        match self {
            Dimension::FirstReporting => smallvec![columns::FIRST_REPORTING],
            Dimension::SecondReporting => smallvec![columns::SECOND_REPORTING],
            Dimension::Manager => smallvec![columns::MANAGER],
            Dimension::Agent | Dimension::Process | Dimension::Ageing => SmallVec::new(),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Dimension::Agent => "Agent-wise",
            Dimension::Process => "Process-wise",
            Dimension::FirstReporting => "1st Reporting-wise",
            Dimension::SecondReporting => "2nd Reporting-wise",
            Dimension::Manager => "Manager-wise",
            Dimension::Ageing => "Ageing-wise",
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub dimension: Dimension,
    pub values: Vec<Cell>,
}

impl Selection {
    pub fn new(dimension: Dimension, values: Vec<Cell>) -> Self {
        Self { dimension, values }
    }

    /// Selection from free-text values, typed the same way extract fields are.
    pub fn parse(dimension: Dimension, values: &[String]) -> Self {
        let values = values
            .iter()
            .map(|value| match dimension {
                // codes are compared as strings, so keep them verbatim
                Dimension::Agent => Cell::text(value.trim()),
                _ => Cell::parse(value),
            })
            .collect();
        Self { dimension, values }
    }
}

/// Tenure buckets worth offering: text carrying the month marker or "Above".
/// Malformed raw entries (dates, numbers, stray notes) are left out.
pub fn is_tenure_bucket(value: &Cell) -> bool {
    value
        .as_str()
        .is_some_and(|s| s.contains('M') || s.contains("Above"))
}

/// Choices for a dimension, drawn from the latest period.
pub fn selectable_values(dimension: Dimension, latest: &PeriodDataset) -> Result<Vec<Cell>, PerfError> {
    let values = latest.attribute_values(dimension.attribute_column())?;
    Ok(match dimension {
        Dimension::Ageing => values.into_iter().filter(is_tenure_bucket).collect(),
        _ => values,
    })
}

/// Identifiers matching a selection, judged against the latest period only.
/// No match is an empty set, not an error.
pub fn resolve(selection: &Selection, latest: &PeriodDataset) -> Result<BTreeSet<String>, PerfError> {
    let dimension = selection.dimension;

    if dimension == Dimension::Agent {
        return selection
            .values
            .iter()
            .map(|value| {
                value
                    .canonical_id()
                    .ok_or_else(|| PerfError::coercion(columns::ECODE, "selection", value))
            })
            .collect();
    }

    let chosen: FxHashSet<&Cell> = selection.values.iter().filter(|v| !v.is_null()).collect();
    let attribute = latest.column(dimension.attribute_column())?;

    let mut identifiers = BTreeSet::new();
    for (position, row) in latest.rows().enumerate() {
        if chosen.contains(&row[attribute]) {
            identifiers.insert(latest.identifier_at(position)?);
        }
    }

    debug!(
        dimension = %dimension,
        chosen = chosen.len(),
        matched = identifiers.len(),
        period = latest.name(),
        "resolved selection"
    );
    Ok(identifiers)
}
