//! Runtime configuration and command-line parsing for the binaries.

use crate::downloader::{ExportColumns, ExportFormat};
use crate::filter::{FilterField, FilterSpec, selector_value};
use crate::generator::{DEFAULT_COUNT, DEFAULT_SEED};
use crate::loader::{DEFAULT_SOURCE, parse_date_text};
use crate::store::{CachePolicy, RecordStore};
use crate::view::{Direction, SortKey};
use chrono::NaiveDate;
use clap::{Arg, ArgAction, ArgMatches, Command};
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::path::PathBuf;

pub const DEFAULT_BIND: &str = "127.0.0.1:3000";

/// Settings shared by the terminal and web front ends.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DashboardConfig {
    pub source: PathBuf,
    pub cache: CachePolicy,
    pub export_dir: PathBuf,
    pub bind: String,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            source: PathBuf::from(DEFAULT_SOURCE),
            cache: CachePolicy::default(),
            export_dir: PathBuf::from("."),
            bind: DEFAULT_BIND.to_string(),
        }
    }
}

impl DashboardConfig {
    pub fn record_store(&self) -> RecordStore {
        RecordStore::new(self.source.clone(), self.cache)
    }

    /// Build from parsed arguments. Front ends define different subsets of
    /// these options, so absent ones fall back to the defaults.
    fn from_matches(matches: &ArgMatches) -> Self {
        let defaults = Self::default();
        let text = |id: &str| matches.try_get_one::<String>(id).ok().flatten();
        Self {
            source: text("source").map(PathBuf::from).unwrap_or(defaults.source),
            cache: matches
                .try_get_one::<CachePolicy>("cache")
                .ok()
                .flatten()
                .copied()
                .unwrap_or(defaults.cache),
            export_dir: text("export").map(PathBuf::from).unwrap_or(defaults.export_dir),
            bind: text("bind").cloned().unwrap_or(defaults.bind),
        }
    }
}

/// One terminal dashboard invocation.
#[derive(Clone, Debug, PartialEq)]
pub struct DashboardArgs {
    pub config: DashboardConfig,
    pub filter: FilterSpec,
    pub sort: Option<SortKey>,
    pub direction: Direction,
    /// Set when `--export` was given.
    pub export: Option<ExportFormat>,
    pub columns: ExportColumns,
}

fn source_args(command: Command) -> Command {
    command
        .arg(
            Arg::new("source")
                .short('s')
                .long("source")
                .value_name("PATH")
                .help("Project workbook or CSV to load")
                .default_value(DEFAULT_SOURCE),
        )
        .arg(
            Arg::new("cache")
                .long("cache")
                .value_name("POLICY")
                .help("Record cache policy: never, forever or mtime")
                .value_parser(|s: &str| s.parse::<CachePolicy>()),
        )
}

pub fn dashboard_command() -> Command {
    let mut command = source_args(
        Command::new("dashboard")
            .version(env!("CARGO_PKG_VERSION"))
            .about("Project tracking dashboard: KPIs, breakdowns and export of a filtered view"),
    );

    for field in FilterField::ALL {
        command = command.arg(
            Arg::new(field.name())
                .long(field.name())
                .value_name("VALUE")
                .help(format!("Only keep projects whose {field} equals VALUE (\"All\" for any)")),
        );
    }

    command
        .arg(
            Arg::new("sort")
                .long("sort")
                .value_name("COLUMN")
                .help("Sort the detail table by a column header or alias")
                .value_parser(|s: &str| s.parse::<SortKey>()),
        )
        .arg(
            Arg::new("desc")
                .long("desc")
                .help("Sort descending")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("export")
                .short('e')
                .long("export")
                .value_name("DIR")
                .help("Write the filtered view to DIR/projets_export_YYYYMMDD.csv"),
        )
        .arg(
            Arg::new("xlsx")
                .long("xlsx")
                .help("Export as XLSX instead of CSV")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("derived")
                .long("derived")
                .help("Include Jours_restants and En_retard in the export")
                .action(ArgAction::SetTrue),
        )
}

pub fn parse_dashboard_args<I, T>(args: I) -> Result<DashboardArgs, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let matches = dashboard_command().try_get_matches_from(args)?;

    let mut filter = FilterSpec::new();
    for field in FilterField::ALL {
        let value = matches
            .get_one::<String>(field.name())
            .and_then(|v| selector_value(v));
        filter.set_opt(field, value);
    }

    let export = matches.get_one::<String>("export").map(|_| {
        if matches.get_flag("xlsx") {
            ExportFormat::Xlsx
        } else {
            ExportFormat::Csv
        }
    });

    Ok(DashboardArgs {
        config: DashboardConfig::from_matches(&matches),
        filter,
        sort: matches.get_one::<SortKey>("sort").copied(),
        direction: if matches.get_flag("desc") {
            Direction::Descending
        } else {
            Direction::Ascending
        },
        export,
        columns: if matches.get_flag("derived") {
            ExportColumns::WithDerived
        } else {
            ExportColumns::Source
        },
    })
}

pub fn web_command() -> Command {
    source_args(
        Command::new("web")
            .version(env!("CARGO_PKG_VERSION"))
            .about("Serve the project dashboard as a JSON API"),
    )
    .arg(
        Arg::new("bind")
            .short('b')
            .long("bind")
            .value_name("ADDR")
            .help("Address to listen on")
            .default_value(DEFAULT_BIND),
    )
}

pub fn parse_web_args<I, T>(args: I) -> Result<DashboardConfig, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let matches = web_command().try_get_matches_from(args)?;
    Ok(DashboardConfig::from_matches(&matches))
}

/// Options for the sample data generator binary.
#[derive(Clone, Debug, PartialEq)]
pub struct GenerateArgs {
    pub seed: u64,
    pub count: usize,
    pub output: PathBuf,
    /// Reference date for start offsets; `None` means today.
    pub anchor: Option<NaiveDate>,
}

pub fn generate_command() -> Command {
    Command::new("generate_data")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Write a synthetic project workbook for the dashboard")
        .arg(
            Arg::new("seed")
                .long("seed")
                .value_name("N")
                .help("Random seed")
                .default_value(DEFAULT_SEED.to_string())
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new("count")
                .short('n')
                .long("count")
                .value_name("N")
                .help("Number of projects")
                .default_value(DEFAULT_COUNT.to_string())
                .value_parser(clap::value_parser!(usize)),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("PATH")
                .help("Workbook to write")
                .default_value(DEFAULT_SOURCE),
        )
        .arg(
            Arg::new("anchor")
                .long("anchor")
                .value_name("DATE")
                .help("Reference date for project start offsets (default: today)")
                .value_parser(|s: &str| {
                    parse_date_text(s).ok_or_else(|| format!("invalid date '{s}'"))
                }),
        )
}

pub fn parse_generate_args<I, T>(args: I) -> Result<GenerateArgs, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let matches = generate_command().try_get_matches_from(args)?;
    Ok(GenerateArgs {
        seed: matches.get_one::<u64>("seed").copied().unwrap_or(DEFAULT_SEED),
        count: matches
            .get_one::<usize>("count")
            .copied()
            .unwrap_or(DEFAULT_COUNT),
        output: matches
            .get_one::<String>("output")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SOURCE)),
        anchor: matches.get_one::<NaiveDate>("anchor").copied(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Column;

    #[test]
    fn defaults_match_reference_layout() {
        let args = parse_dashboard_args(["dashboard"]).unwrap();
        assert_eq!(args.config.source, PathBuf::from("data/projets.xlsx"));
        assert_eq!(args.config.cache, CachePolicy::ModifiedTime);
        assert!(args.filter.is_empty());
        assert_eq!(args.export, None);
        assert_eq!(args.sort, None);
    }

    #[test]
    fn filters_sort_and_export_flags() {
        let args = parse_dashboard_args([
            "dashboard",
            "--country",
            "France",
            "--status",
            "All",
            "--phase",
            "Training",
            "--sort",
            "Avancement",
            "--desc",
            "--export",
            "out",
            "--xlsx",
            "--derived",
            "--cache",
            "never",
        ])
        .unwrap();

        assert_eq!(args.filter.constraint(FilterField::Country), Some("France"));
        assert_eq!(args.filter.constraint(FilterField::Phase), Some("Training"));
        assert_eq!(args.filter.constraint(FilterField::Status), None);
        assert_eq!(args.sort, Some(SortKey::Column(Column::Progress)));
        assert_eq!(args.direction, Direction::Descending);
        assert_eq!(args.export, Some(ExportFormat::Xlsx));
        assert_eq!(args.columns, ExportColumns::WithDerived);
        assert_eq!(args.config.export_dir, PathBuf::from("out"));
        assert_eq!(args.config.cache, CachePolicy::Never);
    }

    #[test]
    fn only_the_exact_wildcard_label_drops_a_filter() {
        let args =
            parse_dashboard_args(["dashboard", "--owner", "ALL", "--country", "", "--phase", "All"])
                .unwrap();
        assert_eq!(args.filter.constraint(FilterField::Owner), Some("ALL"));
        assert_eq!(args.filter.constraint(FilterField::Country), Some(""));
        assert_eq!(args.filter.constraint(FilterField::Phase), None);
    }

    #[test]
    fn rejects_unknown_cache_policy() {
        assert!(parse_dashboard_args(["dashboard", "--cache", "weekly"]).is_err());
    }

    #[test]
    fn generator_args() {
        let args = parse_generate_args(["generate_data"]).unwrap();
        assert_eq!(args.seed, 42);
        assert_eq!(args.count, 20);
        assert_eq!(args.anchor, None);

        let args = parse_generate_args([
            "generate_data",
            "--seed",
            "7",
            "-n",
            "5",
            "--anchor",
            "2025-01-15",
            "-o",
            "fixtures/p.xlsx",
        ])
        .unwrap();
        assert_eq!(args.seed, 7);
        assert_eq!(args.count, 5);
        assert_eq!(args.anchor, NaiveDate::from_ymd_opt(2025, 1, 15));
        assert_eq!(args.output, PathBuf::from("fixtures/p.xlsx"));
    }

    #[test]
    fn web_bind_address() {
        let config = parse_web_args(["web", "--bind", "0.0.0.0:8080"]).unwrap();
        assert_eq!(config.bind, "0.0.0.0:8080");
        assert_eq!(config.source, PathBuf::from(DEFAULT_SOURCE));
    }
}
