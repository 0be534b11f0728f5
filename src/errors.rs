use std::path::PathBuf;
use thiserror::Error;

/// Problems with the shape or contents of the source sheet.
#[derive(Debug, Error, PartialEq)]
pub enum SchemaError {
    #[error("missing required column '{0}'")]
    MissingColumn(String),
    #[error("row {row}: column '{column}' has an unparseable date '{value}'")]
    InvalidDate {
        row: usize,
        column: String,
        value: String,
    },
    #[error("row {row}: column '{column}' has a non-numeric value '{value}'")]
    InvalidNumber {
        row: usize,
        column: String,
        value: String,
    },
}

/// Failure to produce a record batch. Fatal for the session that hit it.
#[derive(Debug, Error)]
pub enum DataSourceError {
    #[error("data source not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("failed to read data source: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to open workbook: {0}")]
    Workbook(String),
    #[error("failed to read csv: {0}")]
    Csv(String),
    #[error("unsupported data source format: {0}")]
    UnsupportedFormat(String),
    #[error("data source has no sheet or header row")]
    EmptySource,
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),
}

impl From<calamine::Error> for DataSourceError {
    fn from(value: calamine::Error) -> Self {
        Self::Workbook(value.to_string())
    }
}

impl From<csv::Error> for DataSourceError {
    fn from(value: csv::Error) -> Self {
        Self::Csv(value.to_string())
    }
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("csv export failed: {0}")]
    Csv(String),
    #[error("xlsx export failed: {0}")]
    Xlsx(String),
    #[error("failed to write export: {0}")]
    Io(#[from] std::io::Error),
}

impl From<csv::Error> for ExportError {
    fn from(value: csv::Error) -> Self {
        Self::Csv(value.to_string())
    }
}

impl From<rust_xlsxwriter::XlsxError> for ExportError {
    fn from(value: rust_xlsxwriter::XlsxError) -> Self {
        Self::Xlsx(value.to_string())
    }
}

#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("failed to build workbook: {0}")]
    Xlsx(String),
    #[error("failed to write workbook: {0}")]
    Io(#[from] std::io::Error),
}

impl From<rust_xlsxwriter::XlsxError> for GenerateError {
    fn from(value: rust_xlsxwriter::XlsxError) -> Self {
        Self::Xlsx(value.to_string())
    }
}

pub type LoadResult<T> = Result<T, DataSourceError>;
