use crate::{cache::DEFAULT_CACHE_CAPACITY, merge::DEFAULT_SEPARATOR, period::DEFAULT_HEADER_OFFSET, PerfError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_SHEET: &str = "Agent Wise";
pub const DEFAULT_PERIOD_NAMES: [&str; 3] = ["June", "July", "August"];

const ENV_PERIODS: &str = "PERFBOARD_PERIODS";
const ENV_HEADER_OFFSET: &str = "PERFBOARD_HEADER_OFFSET";
const ENV_CACHE_CAPACITY: &str = "PERFBOARD_CACHE_CAPACITY";
const ENV_SHEET: &str = "PERFBOARD_SHEET";

/// Where one period's extract lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodSource {
    pub name: String,
    pub path: PathBuf,
}

impl PeriodSource {
    /// Parse `NAME=PATH`.
    pub fn parse(spec: &str) -> Result<Self, PerfError> {
        let (name, path) = spec
            .split_once('=')
            .ok_or_else(|| PerfError::Config(format!("expected NAME=PATH, got '{}'", spec)))?;
        let (name, path) = (name.trim(), path.trim());
        if name.is_empty() || path.is_empty() {
            return Err(PerfError::Config(format!("expected NAME=PATH, got '{}'", spec)));
        }
        Ok(Self {
            name: name.to_string(),
            path: PathBuf::from(path),
        })
    }

    /// Pair paths with the default month names, in order.
    pub fn with_default_names(paths: &[PathBuf]) -> Result<Vec<Self>, PerfError> {
        if paths.len() != DEFAULT_PERIOD_NAMES.len() {
            return Err(PerfError::Config(format!(
                "{} unnamed extracts given; name them with NAME=PATH or pass exactly {}",
                paths.len(),
                DEFAULT_PERIOD_NAMES.len()
            )));
        }
        Ok(DEFAULT_PERIOD_NAMES
            .iter()
            .zip(paths)
            .map(|(name, path)| Self {
                name: name.to_string(),
                path: path.clone(),
            })
            .collect())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// Extracts in chronological order; the last one is the latest period.
    pub periods: Vec<PeriodSource>,
    pub sheet: String,
    pub header_offset: usize,
    pub separator: String,
    pub cache_capacity: usize,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            periods: Vec::new(),
            sheet: DEFAULT_SHEET.to_string(),
            header_offset: DEFAULT_HEADER_OFFSET,
            separator: DEFAULT_SEPARATOR.to_string(),
            cache_capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}

impl DashboardConfig {
    /// Defaults overlaid with the process environment (and `.env`, if present).
    pub fn from_env() -> Result<Self, PerfError> {
        dotenv::dotenv().ok();
        let mut config = Self::default();
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, PerfError> {
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Overlay values found through `lookup`; unset keys leave fields alone.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), PerfError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(periods) = lookup(ENV_PERIODS) {
            self.periods = periods
                .split(',')
                .filter(|s| !s.trim().is_empty())
                .map(PeriodSource::parse)
                .collect::<Result<_, _>>()?;
        }
        if let Some(offset) = lookup(ENV_HEADER_OFFSET) {
            self.header_offset = parse_number(ENV_HEADER_OFFSET, &offset)?;
        }
        if let Some(capacity) = lookup(ENV_CACHE_CAPACITY) {
            self.cache_capacity = parse_number(ENV_CACHE_CAPACITY, &capacity)?;
        }
        if let Some(sheet) = lookup(ENV_SHEET) {
            self.sheet = sheet;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), PerfError> {
        if self.periods.is_empty() {
            return Err(PerfError::Config(format!(
                "no period extracts configured (use --period NAME=PATH or {})",
                ENV_PERIODS
            )));
        }
        if self.separator.is_empty() {
            return Err(PerfError::Config("column separator must not be empty".to_string()));
        }
        Ok(())
    }
}

fn parse_number(key: &str, value: &str) -> Result<usize, PerfError> {
    value
        .trim()
        .parse()
        .map_err(|_| PerfError::Config(format!("{} must be a whole number, got '{}'", key, value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_period_source_parse() {
        let source = PeriodSource::parse("June = data/june.csv").unwrap();
        assert_eq!(source.name, "June");
        assert_eq!(source.path, PathBuf::from("data/june.csv"));
        assert!(PeriodSource::parse("june.csv").is_err());
        assert!(PeriodSource::parse("=june.csv").is_err());
    }

    #[test]
    fn test_default_names_need_three_paths() {
        let paths = vec![PathBuf::from("a.csv"), PathBuf::from("b.csv"), PathBuf::from("c.csv")];
        let sources = PeriodSource::with_default_names(&paths).unwrap();
        assert_eq!(sources[2].name, "August");
        assert!(PeriodSource::with_default_names(&paths[..2]).is_err());
    }

    #[test]
    fn test_env_overlay() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("PERFBOARD_PERIODS", "May=may.csv,June=june.json"),
            ("PERFBOARD_HEADER_OFFSET", "2"),
        ]);
        let mut config = DashboardConfig::default();
        config
            .apply_env(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.periods.len(), 2);
        assert_eq!(config.periods[1].name, "June");
        assert_eq!(config.header_offset, 2);
        assert_eq!(config.cache_capacity, DEFAULT_CACHE_CAPACITY);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_bad_env_number_is_config_error() {
        let mut config = DashboardConfig::default();
        let result = config.apply_env(|key| (key == "PERFBOARD_CACHE_CAPACITY").then(|| "lots".to_string()));
        assert!(matches!(result, Err(PerfError::Config(_))));
    }

    #[test]
    fn test_partial_json_config_uses_defaults() {
        let config: DashboardConfig =
            serde_json::from_str(r#"{"periods": [{"name": "June", "path": "june.csv"}], "separator": " "}"#).unwrap();
        assert_eq!(config.sheet, "Agent Wise");
        assert_eq!(config.separator, " ");
        assert_eq!(config.header_offset, 1);
    }
}
