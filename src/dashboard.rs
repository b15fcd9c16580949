//! Entry points for a presentation layer: load the periods, list choices, run a comparison.

use crate::{
    cache::DatasetCache,
    cell::Cell,
    config::DashboardConfig,
    extract::ExtractFormat,
    merge::{MergeEngine, PeriodTable},
    period::PeriodSet,
    selection::{resolve, selectable_values, Dimension, Selection},
    table::WideTable,
    PerfError,
};
use std::fs;
use tracing::info;

pub struct Dashboard {
    config: DashboardConfig,
    cache: DatasetCache,
}

impl Dashboard {
    pub fn new(config: DashboardConfig) -> Result<Self, PerfError> {
        config.validate()?;
        let cache = DatasetCache::new(config.cache_capacity);
        Ok(Self { config, cache })
    }

    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }

    pub fn cache(&self) -> &DatasetCache {
        &self.cache
    }

    /// Read every configured extract; unchanged files come from the cache.
    pub fn load_periods(&mut self) -> Result<PeriodSet, PerfError> {
        let mut periods = Vec::with_capacity(self.config.periods.len());
        for source in &self.config.periods {
            let format = ExtractFormat::from_path(&source.path)?;
            let bytes = fs::read(&source.path)?;
            periods.push(self.cache.get_or_load(
                &source.name,
                format,
                &self.config.sheet,
                self.config.header_offset,
                &bytes,
            )?);
        }
        let set = PeriodSet::new(periods)?;
        info!(periods = ?set.names(), "periods ready");
        Ok(set)
    }

    pub fn options(&mut self, dimension: Dimension) -> Result<Vec<Cell>, PerfError> {
        let periods = self.load_periods()?;
        selectable_values(dimension, periods.latest())
    }

    pub fn compare(&mut self, selection: &Selection) -> Result<Option<WideTable>, PerfError> {
        let periods = self.load_periods()?;
        MergeEngine::new(&periods)
            .with_separator(&self.config.separator)
            .compare(selection)
    }

    pub fn compare_by_period(&mut self, selection: &Selection) -> Result<Vec<PeriodTable>, PerfError> {
        let periods = self.load_periods()?;
        let identifiers = resolve(selection, periods.latest())?;
        MergeEngine::new(&periods).period_tables(&identifiers, &selection.dimension.extra_columns())
    }
}
