use std::fmt;

#[derive(Debug)]
pub enum PerfError {
    /// A column the query needs is not present in a period extract.
    Schema { column: String, period: String },
    /// A value could not be brought into the form the engine compares or rounds.
    TypeCoercion { column: String, period: String, value: String },
    DuplicateIdentifier { period: String, identifier: String },
    Config(String),
    Io(std::io::Error),
    Csv(csv::Error),
    Xlsx(calamine::XlsxError),
    Json(serde_json::Error),
    Other(String),
}

impl PerfError {
    pub fn schema(column: &str, period: &str) -> Self {
        PerfError::Schema {
            column: column.to_string(),
            period: period.to_string(),
        }
    }

    pub fn coercion(column: &str, period: &str, value: impl fmt::Display) -> Self {
        PerfError::TypeCoercion {
            column: column.to_string(),
            period: period.to_string(),
            value: value.to_string(),
        }
    }

    /// Coercion faults are reported to the user the same way as missing columns.
    pub fn is_schema_fault(&self) -> bool {
        matches!(self, PerfError::Schema { .. } | PerfError::TypeCoercion { .. })
    }
}

impl fmt::Display for PerfError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PerfError::Schema { column, period } => {
                write!(f, "Schema error: column '{}' is missing from the {} extract", column, period)
            }
            PerfError::TypeCoercion { column, period, value } => write!(
                f,
                "Schema error: value '{}' in column '{}' of the {} extract has an unusable type",
                value, column, period
            ),
            PerfError::DuplicateIdentifier { period, identifier } => write!(
                f,
                "Data error: identifier '{}' appears more than once in the {} extract",
                identifier, period
            ),
            PerfError::Config(e) => write!(f, "Config error: {}", e),
            PerfError::Io(e) => write!(f, "IO error: {}", e),
            PerfError::Csv(e) => write!(f, "CSV error: {}", e),
            PerfError::Xlsx(e) => write!(f, "Workbook error: {}", e),
            PerfError::Json(e) => write!(f, "JSON error: {}", e),
            PerfError::Other(e) => write!(f, "Error: {}", e),
        }
    }
}

impl std::error::Error for PerfError {}

impl From<std::io::Error> for PerfError {
    fn from(err: std::io::Error) -> Self {
        PerfError::Io(err)
    }
}

impl From<csv::Error> for PerfError {
    fn from(err: csv::Error) -> Self {
        PerfError::Csv(err)
    }
}

impl From<calamine::XlsxError> for PerfError {
    fn from(err: calamine::XlsxError) -> Self {
        PerfError::Xlsx(err)
    }
}

impl From<serde_json::Error> for PerfError {
    fn from(err: serde_json::Error) -> Self {
        PerfError::Json(err)
    }
}

impl From<String> for PerfError {
    fn from(err: String) -> Self {
        PerfError::Other(err)
    }
}

impl From<&str> for PerfError {
    fn from(err: &str) -> Self {
        PerfError::Other(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_message_names_column_and_period() {
        let err = PerfError::schema("Bkgs", "July");
        let message = err.to_string();
        assert!(message.contains("Bkgs"));
        assert!(message.contains("July"));
        assert!(err.is_schema_fault());
    }

    #[test]
    fn test_coercion_counts_as_schema_fault() {
        let err = PerfError::coercion("APE", "June", "n/a");
        assert!(err.is_schema_fault());
        assert!(!PerfError::Config("bad".into()).is_schema_fault());
    }
}
