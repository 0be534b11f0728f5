use crate::errors::ExportError;
use crate::loader::format_number;
use crate::record::{
    AnnotatedRecord, Column, DAYS_REMAINING_HEADER, OVERDUE_HEADER, ProjectRecord,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const EXPORT_SHEET: &str = "Projets";

/// Whether an export carries only the source columns or the derived ones too.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExportColumns {
    #[default]
    Source,
    WithDerived,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Csv,
    Xlsx,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Xlsx => "xlsx",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            ExportFormat::Csv => "text/csv; charset=utf-8",
            ExportFormat::Xlsx => {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            }
        }
    }
}

/// A row that can be written by the exporters.
pub trait ExportRow {
    fn record(&self) -> &ProjectRecord;

    /// `(days_remaining, is_overdue)` when the row carries derived fields.
    fn derived(&self) -> Option<(i64, bool)> {
        None
    }
}

impl ExportRow for ProjectRecord {
    fn record(&self) -> &ProjectRecord {
        self
    }
}

impl ExportRow for AnnotatedRecord {
    fn record(&self) -> &ProjectRecord {
        &self.record
    }

    fn derived(&self) -> Option<(i64, bool)> {
        Some((self.days_remaining, self.is_overdue))
    }
}

fn headers(columns: ExportColumns) -> Vec<&'static str> {
    let mut headers: Vec<&'static str> = Column::ALL.iter().map(|c| c.header()).collect();
    if columns == ExportColumns::WithDerived {
        headers.push(DAYS_REMAINING_HEADER);
        headers.push(OVERDUE_HEADER);
    }
    headers
}

fn source_value(record: &ProjectRecord, column: Column) -> String {
    match column {
        Column::ProjectId => record.project_id.clone(),
        Column::Client => record.client.clone(),
        Column::Country => record.country.clone(),
        Column::Phase => record.phase.clone(),
        Column::Owner => record.owner.clone(),
        Column::StartDate => format_date(record.start_date),
        Column::EndDate => format_date(record.end_date),
        Column::Status => record.status.clone(),
        Column::Progress => format_number(record.progress),
        Column::Satisfaction => format_number(record.satisfaction),
    }
}

fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Convert a record view to CSV
///
/// Writes a header row followed by one line per record, in the order given.
/// Columns follow the source sheet; `ExportColumns::WithDerived` appends
/// `Jours_restants` and `En_retard` (left blank for rows without derived
/// fields). An empty view produces the header row alone.
///
/// # Examples
/// ```
/// use dashboard::downloader::{to_csv, ExportColumns};
/// use dashboard::record::ProjectRecord;
///
/// let rows: Vec<ProjectRecord> = Vec::new();
/// let csv = to_csv(&rows, ExportColumns::Source).unwrap();
/// assert!(String::from_utf8(csv).unwrap().starts_with("Project_ID,Client,Pays"));
/// ```
pub fn to_csv<R: ExportRow>(rows: &[R], columns: ExportColumns) -> Result<Vec<u8>, ExportError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(headers(columns))?;

    for row in rows {
        let record = row.record();
        let mut fields: Vec<String> = Column::ALL
            .iter()
            .map(|c| source_value(record, *c))
            .collect();
        if columns == ExportColumns::WithDerived {
            match row.derived() {
                Some((days, overdue)) => {
                    fields.push(days.to_string());
                    fields.push(overdue.to_string());
                }
                None => fields.extend([String::new(), String::new()]),
            }
        }
        writer.write_record(&fields)?;
    }

    writer
        .into_inner()
        .map_err(|e| ExportError::Io(e.into_error()))
}

/// Convert a record view to an XLSX workbook with a single `Projets` sheet.
///
/// Dates are written as ISO text so the file reads back through the loader
/// without depending on cell formats.
pub fn to_xlsx<R: ExportRow>(rows: &[R], columns: ExportColumns) -> Result<Vec<u8>, ExportError> {
    use rust_xlsxwriter::{Workbook, Worksheet};

    let mut workbook = Workbook::new();
    let mut worksheet = Worksheet::new();
    worksheet.set_name(EXPORT_SHEET)?;

    for (c, header) in headers(columns).iter().enumerate() {
        worksheet.write_string(0, c as u16, *header)?;
    }

    for (r, row) in rows.iter().enumerate() {
        let line = (r + 1) as u32;
        let record = row.record();
        for (c, column) in Column::ALL.iter().enumerate() {
            match column {
                Column::Progress => worksheet.write_number(line, c as u16, record.progress)?,
                Column::Satisfaction => {
                    worksheet.write_number(line, c as u16, record.satisfaction)?
                }
                _ => worksheet.write_string(line, c as u16, &source_value(record, *column))?,
            };
        }
        if columns == ExportColumns::WithDerived {
            if let Some((days, overdue)) = row.derived() {
                let base = Column::ALL.len() as u16;
                worksheet.write_number(line, base, days as f64)?;
                worksheet.write_boolean(line, base + 1, overdue)?;
            }
        }
    }

    workbook.push_worksheet(worksheet);
    Ok(workbook.save_to_buffer()?)
}

/// Render a view in the requested format
///
/// # Arguments
/// * `rows` - Records in display order
/// * `format` - CSV or XLSX
/// * `columns` - Whether to append the derived columns
///
/// # Returns
/// The file contents, ready to be written with `write_export` or sent as a
/// download.
pub fn render<R: ExportRow>(
    rows: &[R],
    format: ExportFormat,
    columns: ExportColumns,
) -> Result<Vec<u8>, ExportError> {
    match format {
        ExportFormat::Csv => to_csv(rows, columns),
        ExportFormat::Xlsx => to_xlsx(rows, columns),
    }
}

/// `projets_export_YYYYMMDD.<ext>` for the given export date.
pub fn export_file_name(date: NaiveDate, format: ExportFormat) -> String {
    format!("projets_export_{}.{}", date.format("%Y%m%d"), format.extension())
}

/// Write an export into `dir` (created if needed) and return the file path.
pub fn write_export(
    dir: &Path,
    date: NaiveDate,
    format: ExportFormat,
    bytes: &[u8],
) -> Result<PathBuf, ExportError> {
    fs::create_dir_all(dir)?;
    let path = dir.join(export_file_name(date, format));
    fs::write(&path, bytes)?;
    log::info!("wrote {} bytes to {}", bytes.len(), path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn annotated(id: &str, client: &str, days: i64, overdue: bool) -> AnnotatedRecord {
        AnnotatedRecord {
            record: ProjectRecord {
                project_id: id.into(),
                client: client.into(),
                country: "France".into(),
                phase: "Launch".into(),
                owner: "Pierre".into(),
                start_date: NaiveDate::from_ymd_opt(2025, 1, 5).unwrap(),
                end_date: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
                status: "in progress".into(),
                progress: 22.0,
                satisfaction: 3.9,
            },
            days_remaining: days,
            is_overdue: overdue,
        }
    }

    fn text(bytes: Vec<u8>) -> String {
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn empty_export_is_header_only() {
        let rows: Vec<AnnotatedRecord> = Vec::new();
        let csv = text(to_csv(&rows, ExportColumns::Source).unwrap());
        assert_eq!(
            csv,
            "Project_ID,Client,Pays,Phase,Responsable,Date_debut,Date_fin,Status,Avancement,Satisfaction\n"
        );
    }

    #[test]
    fn writes_rows_in_order_with_derived_columns() {
        let rows = vec![
            annotated("P002", "Hospital", -5, true),
            annotated("P001", "CHU", 12, false),
        ];
        let csv = text(to_csv(&rows, ExportColumns::WithDerived).unwrap());
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].ends_with(",Jours_restants,En_retard"));
        assert_eq!(
            lines[1],
            "P002,Hospital,France,Launch,Pierre,2025-01-05,2025-03-01,in progress,22,3.9,-5,true"
        );
        assert!(lines[2].starts_with("P001,CHU,"));
    }

    #[test]
    fn quotes_fields_with_separators() {
        let rows = vec![annotated("P003", "Clinique, Lyon", 0, false)];
        let csv = text(to_csv(&rows, ExportColumns::Source).unwrap());
        assert!(csv.contains("\"Clinique, Lyon\""));
    }

    #[test]
    fn plain_records_leave_derived_cells_blank() {
        let rows = vec![annotated("P004", "CHU", 3, false).record];
        let csv = text(to_csv(&rows, ExportColumns::WithDerived).unwrap());
        assert!(csv.lines().nth(1).unwrap().ends_with(",22,3.9,,"));
    }

    #[test]
    fn file_name_carries_export_date() {
        let date = NaiveDate::from_ymd_opt(2025, 11, 3).unwrap();
        assert_eq!(
            export_file_name(date, ExportFormat::Csv),
            "projets_export_20251103.csv"
        );
        assert_eq!(
            export_file_name(date, ExportFormat::Xlsx),
            "projets_export_20251103.xlsx"
        );
    }

    #[test]
    fn xlsx_export_produces_a_zip_container() {
        let rows = vec![annotated("P001", "CHU", 1, false)];
        let bytes = to_xlsx(&rows, ExportColumns::WithDerived).unwrap();
        assert_eq!(&bytes[..2], b"PK");
    }
}
