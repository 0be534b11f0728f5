/*!
# Project Dashboard

Data core of a project-tracking dashboard, built in Rust.

## Overview

Project records are read from a spreadsheet, annotated with fields that depend
on the evaluation time, narrowed by up to four equality filters, and reduced to
the KPIs and breakdowns a dashboard displays. The filtered view can be exported
as CSV or XLSX. A seeded generator produces the sample workbook.

## Architecture

### Data Pipeline
- **Record Store** (`loader`, `store`) - Reads `data/projets.xlsx` (or a CSV export),
  checks the schema and memoizes the batch according to a `CachePolicy`
- **Derived Fields** (`derive`) - Days remaining and overdue flag against an explicit `now`
- **Filter Engine** (`filter`) - Conjunction of equality constraints on country,
  phase, owner and status
- **Aggregation** (`aggregate`) - Counts, completion rate, overdue count, means and group-bys
- **Dashboard View** (`view`) - Everything one dashboard state shows, ready to serialize

### Output Layer
- **Exporter** (`downloader`) - CSV and XLSX export of the filtered view
- **Generator** (`generator`) - Deterministic sample workbook

### Front Ends
- `dashboard` binary - Terminal rendering of a view, with optional export
- `generate_data` binary - Writes the sample workbook
- `web` binary (feature `web`) - JSON API and downloads over axum

## Modules

- **record**: Project record, column schema, derived record
- **errors**: Error taxonomy for loading, export and generation
- **loader**: Spreadsheet and CSV import
- **store**: Cached record batches
- **derive**: Derived-field calculation
- **filter**: Filter specification and selector options
- **aggregate**: KPIs and group-by summaries
- **view**: Dashboard view assembly and table sorting
- **downloader**: Export functionality (CSV, XLSX)
- **generator**: Sample data generation
- **config**: Configuration and command-line parsing
- **app**: HTTP routing (feature `web`)
*/

pub mod aggregate;
pub mod config;
pub mod derive;
pub mod downloader;
pub mod errors;
pub mod filter;
pub mod generator;
pub mod loader;
pub mod record;
pub mod store;
pub mod view;

#[cfg(feature = "web")]
pub mod app;

/// Re-export the types most callers need
pub use aggregate::Kpis;
pub use errors::{DataSourceError, ExportError, GenerateError, SchemaError};
pub use filter::{FilterField, FilterSpec};
pub use record::{AnnotatedRecord, ProjectRecord};
pub use store::{CachePolicy, RecordStore};
pub use view::DashboardView;
