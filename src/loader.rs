use crate::errors::{DataSourceError, LoadResult, SchemaError};
use crate::record::{Column, ProjectRecord};
use chrono::{Days, NaiveDate, NaiveDateTime};
use log::{debug, info, warn};
use std::collections::HashMap;
use std::path::Path;

/// Default location of the project workbook, relative to the working directory.
pub const DEFAULT_SOURCE: &str = "data/projets.xlsx";

static EMPTY_CELL: RawCell = RawCell::Empty;

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%d/%m/%Y", "%Y/%m/%d"];
const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
];

/// A cell value before it is coerced into a record field.
#[derive(Clone, Debug, PartialEq)]
enum RawCell {
    Empty,
    Text(String),
    Number(f64),
    Date(NaiveDate),
}

impl RawCell {
    fn is_blank(&self) -> bool {
        match self {
            RawCell::Empty => true,
            RawCell::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    fn display(&self) -> String {
        match self {
            RawCell::Empty => String::new(),
            RawCell::Text(s) => s.clone(),
            RawCell::Number(n) => format_number(*n),
            RawCell::Date(d) => d.format("%Y-%m-%d").to_string(),
        }
    }
}

/// Load project records from a workbook or CSV file
///
/// The format is picked from the file extension: `xlsx`, `xlsm`, `xls` and
/// `ods` go through calamine (first sheet only), `csv` through the csv reader.
/// Columns are matched by header name, so their order does not matter and
/// unknown columns are ignored.
///
/// # Errors
/// * `DataSourceError::NotFound` if the path does not exist
/// * `DataSourceError::Schema` if a required column is missing or a cell
///   cannot be coerced to its field type
///
/// # Examples
/// ```no_run
/// use dashboard::loader::load;
///
/// match load("data/projets.xlsx") {
///     Ok(records) => println!("Loaded {} projects", records.len()),
///     Err(e) => eprintln!("Error loading projects: {}", e),
/// }
/// ```
pub fn load(source: impl AsRef<Path>) -> LoadResult<Vec<ProjectRecord>> {
    let path = source.as_ref();
    if !path.exists() {
        return Err(DataSourceError::NotFound(path.to_path_buf()));
    }

    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase());

    let records = match extension.as_deref() {
        Some("csv") => from_csv(path)?,
        Some("xlsx") | Some("xlsm") | Some("xls") | Some("ods") => from_excel(path)?,
        Some(ext) => return Err(DataSourceError::UnsupportedFormat(ext.to_string())),
        None => return Err(DataSourceError::UnsupportedFormat("<none>".to_string())),
    };

    info!("loaded {} project records from {}", records.len(), path.display());
    Ok(records)
}

/// Load records from the first sheet of a spreadsheet workbook.
pub fn from_excel(path: &Path) -> LoadResult<Vec<ProjectRecord>> {
    use calamine::{Reader, open_workbook_auto};

    let mut workbook = open_workbook_auto(path)?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or(DataSourceError::EmptySource)??;

    let mut rows = range.rows();
    let header: Vec<String> = rows
        .next()
        .ok_or(DataSourceError::EmptySource)?
        .iter()
        .map(|cell| raw_from_excel(cell).display())
        .collect();

    let body = rows.map(|row| row.iter().map(raw_from_excel).collect::<Vec<_>>());
    records_from_rows(&header, body)
}

/// Load records from a CSV file with a header row, such as an earlier export.
pub fn from_csv(path: &Path) -> LoadResult<Vec<ProjectRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)?;

    let header: Vec<String> = reader.headers()?.iter().map(|h| h.to_string()).collect();
    if header.is_empty() {
        return Err(DataSourceError::EmptySource);
    }

    let mut rows = Vec::new();
    for row in reader.records() {
        let row = row?;
        rows.push(
            row.iter()
                .map(|field| {
                    if field.is_empty() {
                        RawCell::Empty
                    } else {
                        RawCell::Text(field.to_string())
                    }
                })
                .collect::<Vec<_>>(),
        );
    }

    records_from_rows(&header, rows.into_iter())
}

fn raw_from_excel(cell: &calamine::Data) -> RawCell {
    use calamine::Data;

    match cell {
        Data::Empty => RawCell::Empty,
        Data::String(s) => RawCell::Text(s.clone()),
        Data::Int(i) => RawCell::Number(*i as f64),
        Data::Float(f) => RawCell::Number(*f),
        Data::Bool(b) => RawCell::Text(b.to_string()),
        Data::DateTime(dt) => match excel_serial_to_date(dt.as_f64()) {
            Some(date) => RawCell::Date(date),
            None => RawCell::Number(dt.as_f64()),
        },
        Data::DateTimeIso(s) | Data::DurationIso(s) => RawCell::Text(s.clone()),
        Data::Error(e) => RawCell::Text(format!("{e:?}")),
    }
}

fn records_from_rows<I>(header: &[String], rows: I) -> LoadResult<Vec<ProjectRecord>>
where
    I: Iterator<Item = Vec<RawCell>>,
{
    let positions = column_positions(header)?;
    let mut records = Vec::new();

    // Sheet row numbers are 1-based and the header occupies row 1.
    for (index, row) in rows.enumerate() {
        let row_number = index + 2;
        if row.iter().all(RawCell::is_blank) {
            debug!("skipping blank row {}", row_number);
            continue;
        }

        let cell = |column: Column| row.get(positions[&column]).unwrap_or(&EMPTY_CELL);

        let record = ProjectRecord {
            project_id: cell(Column::ProjectId).display(),
            client: cell(Column::Client).display(),
            country: cell(Column::Country).display(),
            phase: cell(Column::Phase).display(),
            owner: cell(Column::Owner).display(),
            start_date: date_field(cell(Column::StartDate), row_number, Column::StartDate)?,
            end_date: date_field(cell(Column::EndDate), row_number, Column::EndDate)?,
            status: cell(Column::Status).display(),
            progress: number_field(cell(Column::Progress), row_number, Column::Progress)?,
            satisfaction: number_field(
                cell(Column::Satisfaction),
                row_number,
                Column::Satisfaction,
            )?,
        };
        warn_out_of_range(&record);
        records.push(record);
    }

    Ok(records)
}

fn column_positions(header: &[String]) -> Result<HashMap<Column, usize>, SchemaError> {
    let mut positions = HashMap::new();
    for (index, name) in header.iter().enumerate() {
        if let Some(column) = Column::from_header(name.trim()) {
            positions.entry(column).or_insert(index);
        }
    }

    for column in Column::ALL {
        if !positions.contains_key(&column) {
            return Err(SchemaError::MissingColumn(column.header().to_string()));
        }
    }
    Ok(positions)
}

fn date_field(cell: &RawCell, row: usize, column: Column) -> Result<NaiveDate, SchemaError> {
    let parsed = match cell {
        RawCell::Date(date) => Some(*date),
        RawCell::Number(serial) => excel_serial_to_date(*serial),
        RawCell::Text(text) => parse_date_text(text),
        RawCell::Empty => None,
    };

    parsed.ok_or_else(|| SchemaError::InvalidDate {
        row,
        column: column.header().to_string(),
        value: cell.display(),
    })
}

fn number_field(cell: &RawCell, row: usize, column: Column) -> Result<f64, SchemaError> {
    let parsed = match cell {
        RawCell::Number(n) => Some(*n),
        RawCell::Text(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    };

    parsed
        .filter(|n| n.is_finite())
        .ok_or_else(|| SchemaError::InvalidNumber {
            row,
            column: column.header().to_string(),
            value: cell.display(),
        })
}

/// Parse a date written as text. Datetimes are truncated to their day.
pub fn parse_date_text(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
                .map(|dt| dt.date())
        })
}

/// Convert an Excel serial day number (1900 date system) to a date.
pub fn excel_serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial < 1.0 {
        return None;
    }
    // Serial 60 is the fictitious 1900-02-29; day zero of 1899-12-30 absorbs it.
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    epoch.checked_add_days(Days::new(serial.floor() as u64))
}

fn warn_out_of_range(record: &ProjectRecord) {
    if !(0.0..=100.0).contains(&record.progress) {
        warn!(
            "project {}: progress {} outside 0-100, keeping as-is",
            record.project_id, record.progress
        );
    }
    if !(1.0..=5.0).contains(&record.satisfaction) {
        warn!(
            "project {}: satisfaction {} outside 1-5, keeping as-is",
            record.project_id, record.satisfaction
        );
    }
}

/// Render a number without a trailing `.0` when it is integral.
pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header() -> Vec<String> {
        Column::ALL.iter().map(|c| c.header().to_string()).collect()
    }

    fn text(s: &str) -> RawCell {
        RawCell::Text(s.to_string())
    }

    fn sample_row() -> Vec<RawCell> {
        vec![
            text("P001"),
            text("CHU"),
            text("France"),
            text("Closing"),
            text("Sophie"),
            text("2025-01-10"),
            RawCell::Number(45716.0),
            text("completed"),
            RawCell::Number(100.0),
            RawCell::Number(4.6),
        ]
    }

    #[test]
    fn parses_dates_in_supported_formats() {
        let expected = NaiveDate::from_ymd_opt(2025, 3, 7);
        assert_eq!(parse_date_text("2025-03-07"), expected);
        assert_eq!(parse_date_text("07/03/2025"), expected);
        assert_eq!(parse_date_text("2025-03-07 14:30:00"), expected);
        assert_eq!(parse_date_text("2025-03-07T14:30:00.250"), expected);
        assert_eq!(parse_date_text("March 7th"), None);
    }

    #[test]
    fn converts_excel_serials() {
        assert_eq!(
            excel_serial_to_date(45716.0),
            NaiveDate::from_ymd_opt(2025, 2, 28)
        );
        assert_eq!(
            excel_serial_to_date(45716.75),
            NaiveDate::from_ymd_opt(2025, 2, 28)
        );
        assert_eq!(excel_serial_to_date(-3.0), None);
    }

    #[test]
    fn builds_records_from_rows_in_any_column_order() {
        let mut header = header();
        let mut row = sample_row();
        header.swap(0, 9);
        row.swap(0, 9);

        let records = records_from_rows(&header, vec![row].into_iter()).unwrap();
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.project_id, "P001");
        assert_eq!(record.end_date, NaiveDate::from_ymd_opt(2025, 2, 28).unwrap());
        assert_eq!(record.satisfaction, 4.6);
    }

    #[test]
    fn skips_blank_rows() {
        let rows = vec![vec![RawCell::Empty; 10], sample_row(), vec![text("  "); 10]];
        let records = records_from_rows(&header(), rows.into_iter()).unwrap();
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn reports_missing_column() {
        let header: Vec<String> = header().into_iter().filter(|h| h != "Pays").collect();
        let err = records_from_rows(&header, std::iter::empty()).unwrap_err();
        assert!(matches!(
            err,
            DataSourceError::Schema(SchemaError::MissingColumn(ref c)) if c == "Pays"
        ));
    }

    #[test]
    fn reports_bad_date_with_row_number() {
        let mut row = sample_row();
        row[5] = text("not a date");
        let err = records_from_rows(&header(), vec![sample_row(), row].into_iter()).unwrap_err();
        match err {
            DataSourceError::Schema(SchemaError::InvalidDate { row, column, value }) => {
                assert_eq!(row, 3);
                assert_eq!(column, "Date_debut");
                assert_eq!(value, "not a date");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn reports_non_numeric_progress() {
        let mut row = sample_row();
        row[8] = text("half");
        let err = records_from_rows(&header(), vec![row].into_iter()).unwrap_err();
        assert!(matches!(
            err,
            DataSourceError::Schema(SchemaError::InvalidNumber { .. })
        ));
    }

    #[test]
    fn keeps_out_of_range_values() {
        let mut row = sample_row();
        row[9] = RawCell::Number(7.0);
        let records = records_from_rows(&header(), vec![row].into_iter()).unwrap();
        assert_eq!(records[0].satisfaction, 7.0);
    }

    #[test]
    fn categorical_text_is_kept_verbatim() {
        let mut row = sample_row();
        row[4] = text("Sophie ");
        row[2] = text(" France");
        let records = records_from_rows(&header(), vec![sample_row(), row].into_iter()).unwrap();
        assert_eq!(records[0].owner, "Sophie");
        assert_eq!(records[1].owner, "Sophie ");
        assert_eq!(records[1].country, " France");
    }

    #[test]
    fn padded_headers_dates_and_numbers_still_parse() {
        let header: Vec<String> = header().into_iter().map(|h| format!(" {h} ")).collect();
        let mut row = sample_row();
        row[5] = text(" 2025-01-10 ");
        row[8] = text(" 40 ");
        let records = records_from_rows(&header, vec![row].into_iter()).unwrap();
        assert_eq!(records[0].start_date, NaiveDate::from_ymd_opt(2025, 1, 10).unwrap());
        assert_eq!(records[0].progress, 40.0);
    }

    #[test]
    fn numeric_categoricals_render_as_text() {
        let mut row = sample_row();
        row[1] = RawCell::Number(42.0);
        let records = records_from_rows(&header(), vec![row].into_iter()).unwrap();
        assert_eq!(records[0].client, "42");
    }

    #[test]
    fn missing_file_is_not_found() {
        let err = load("definitely/not/here.xlsx").unwrap_err();
        assert!(matches!(err, DataSourceError::NotFound(_)));
    }
}
