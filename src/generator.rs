//! Synthetic project data for demos and fixtures.
//!
//! Generation is fully determined by `(seed, count, anchor)`. The anchor is
//! the reference date that start dates are offset from; pass it explicitly so
//! fixtures do not drift with the calendar.

use crate::aggregate;
use crate::errors::GenerateError;
use crate::loader::format_number;
use crate::record::{Column, NumericField, ProjectRecord, STATUS_COMPLETED, STATUS_IN_PROGRESS};
use chrono::{Days, NaiveDate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::collections::HashSet;
use std::fs;
use std::ops::RangeInclusive;
use std::path::Path;

pub const DEFAULT_SEED: u64 = 42;
pub const DEFAULT_COUNT: usize = 20;

pub const PHASE_INSTALLATION: &str = "Installation";
pub const PHASE_TRAINING: &str = "Training";
pub const PHASE_LAUNCH: &str = "Launch";
pub const PHASE_CLOSING: &str = "Closing";

const START_OFFSET_DAYS: RangeInclusive<i64> = -60..=30;
const DURATION_DAYS: RangeInclusive<u64> = 30..=120;

const CLIENTS: [&str; 20] = [
    "Hôpital Saint",
    "Clinique",
    "CHU",
    "Polyclinique",
    "Hospital General",
    "Hospital",
    "Klinikum",
    "CHU M",
    "Clinic",
    "General",
    "Clinique Q",
    "Hôpital P",
    "Hospital B",
    "University Hospital",
    "Clinique",
    "CHU L",
    "Medical Center",
    "Hospital D",
    "CHU N",
    "Hospital C",
];

const COUNTRIES: [&str; 20] = [
    "France", "France", "France", "France", "Spain", "UK", "Germany", "France", "USA",
    "Canada", "Switzerland", "France", "Spain", "USA", "Belgium", "France", "Australia",
    "UAE", "France", "USA",
];

const PHASES: [&str; 20] = [
    PHASE_INSTALLATION,
    PHASE_TRAINING,
    PHASE_LAUNCH,
    PHASE_CLOSING,
    PHASE_INSTALLATION,
    PHASE_TRAINING,
    PHASE_LAUNCH,
    PHASE_INSTALLATION,
    PHASE_CLOSING,
    PHASE_INSTALLATION,
    PHASE_TRAINING,
    PHASE_LAUNCH,
    PHASE_INSTALLATION,
    PHASE_CLOSING,
    PHASE_TRAINING,
    PHASE_LAUNCH,
    PHASE_INSTALLATION,
    PHASE_TRAINING,
    PHASE_CLOSING,
    PHASE_INSTALLATION,
];

const OWNERS: [&str; 20] = [
    "Sophie", "Jean", "Marie", "Sophie", "Pierre", "Jean", "Marie", "Sophie", "Pierre", "Jean",
    "Marie", "Sophie", "Pierre", "Jean", "Marie", "Sophie", "Pierre", "Jean", "Marie", "Sophie",
];

/// Status and value ranges a phase imposes on a generated record.
#[derive(Clone, Debug, PartialEq)]
pub struct PhaseProfile {
    pub status: &'static str,
    pub progress: RangeInclusive<u32>,
    pub satisfaction: RangeInclusive<f64>,
}

/// Profile for `phase`; unknown phases are treated as training.
pub fn phase_profile(phase: &str) -> PhaseProfile {
    match phase {
        PHASE_CLOSING => PhaseProfile {
            status: STATUS_COMPLETED,
            progress: 100..=100,
            satisfaction: 4.0..=5.0,
        },
        PHASE_LAUNCH => PhaseProfile {
            status: STATUS_IN_PROGRESS,
            progress: 15..=35,
            satisfaction: 3.5..=4.5,
        },
        PHASE_INSTALLATION => PhaseProfile {
            status: STATUS_IN_PROGRESS,
            progress: 40..=70,
            satisfaction: 3.8..=4.8,
        },
        _ => PhaseProfile {
            status: STATUS_IN_PROGRESS,
            progress: 75..=95,
            satisfaction: 4.0..=4.8,
        },
    }
}

/// Build `count` records from `seed`. Identical inputs give identical output.
pub fn generate(seed: u64, count: usize, anchor: NaiveDate) -> Vec<ProjectRecord> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|i| generate_one(&mut rng, i, anchor))
        .collect()
}

fn generate_one(rng: &mut StdRng, index: usize, anchor: NaiveDate) -> ProjectRecord {
    let offset = rng.gen_range(START_OFFSET_DAYS);
    let start_date = shift(anchor, offset);
    let duration = rng.gen_range(DURATION_DAYS);
    let end_date = start_date
        .checked_add_days(Days::new(duration))
        .unwrap_or(start_date);

    let slot = index % PHASES.len();
    let phase = PHASES[slot];
    let profile = phase_profile(phase);

    let progress = if profile.progress.start() == profile.progress.end() {
        *profile.progress.start()
    } else {
        rng.gen_range(profile.progress.clone())
    };
    let satisfaction = round_tenth(rng.gen_range(profile.satisfaction.clone()));

    ProjectRecord {
        project_id: format!("P{:03}", index + 1),
        client: CLIENTS[slot].to_string(),
        country: COUNTRIES[slot].to_string(),
        phase: phase.to_string(),
        owner: OWNERS[slot].to_string(),
        start_date,
        end_date,
        status: profile.status.to_string(),
        progress: f64::from(progress),
        satisfaction,
    }
}

fn shift(anchor: NaiveDate, days: i64) -> NaiveDate {
    let shifted = if days >= 0 {
        anchor.checked_add_days(Days::new(days as u64))
    } else {
        anchor.checked_sub_days(Days::new(days.unsigned_abs()))
    };
    shifted.unwrap_or(anchor)
}

fn round_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Write records as the dashboard's source workbook (sheet `Projets`).
pub fn write_xlsx(records: &[ProjectRecord], path: &Path) -> Result<(), GenerateError> {
    use rust_xlsxwriter::{Workbook, Worksheet};

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        if !parent.exists() {
            fs::create_dir_all(parent)?;
            log::info!("created directory {}", parent.display());
        }
    }

    let mut workbook = Workbook::new();
    let mut worksheet = Worksheet::new();
    worksheet.set_name("Projets")?;

    for (c, column) in Column::ALL.iter().enumerate() {
        worksheet.write_string(0, c as u16, column.header())?;
    }

    for (r, record) in records.iter().enumerate() {
        let row = (r + 1) as u32;
        worksheet.write_string(row, 0, &record.project_id)?;
        worksheet.write_string(row, 1, &record.client)?;
        worksheet.write_string(row, 2, &record.country)?;
        worksheet.write_string(row, 3, &record.phase)?;
        worksheet.write_string(row, 4, &record.owner)?;
        worksheet.write_string(row, 5, &record.start_date.format("%Y-%m-%d").to_string())?;
        worksheet.write_string(row, 6, &record.end_date.format("%Y-%m-%d").to_string())?;
        worksheet.write_string(row, 7, &record.status)?;
        worksheet.write_number(row, 8, record.progress)?;
        worksheet.write_number(row, 9, record.satisfaction)?;
    }

    workbook.push_worksheet(worksheet);
    workbook.save(path)?;
    Ok(())
}

/// Headline figures printed after a generation run.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GenerationSummary {
    pub total: usize,
    pub in_progress: usize,
    pub completed: usize,
    pub mean_progress: Option<f64>,
    pub mean_satisfaction: Option<f64>,
    pub countries: usize,
}

impl GenerationSummary {
    pub fn from_records(records: &[ProjectRecord]) -> Self {
        GenerationSummary {
            total: records.len(),
            in_progress: records.iter().filter(|r| r.is_in_progress()).count(),
            completed: records.iter().filter(|r| r.is_completed()).count(),
            mean_progress: aggregate::mean(records, NumericField::Progress),
            mean_satisfaction: aggregate::mean(records, NumericField::Satisfaction),
            countries: records
                .iter()
                .map(|r| r.country.as_str())
                .collect::<HashSet<_>>()
                .len(),
        }
    }

    pub fn lines(&self) -> Vec<String> {
        vec![
            format!("Total projects: {}", self.total),
            format!("In progress: {}", self.in_progress),
            format!("Completed: {}", self.completed),
            format!(
                "Mean progress: {}",
                self.mean_progress
                    .map(|m| format!("{m:.1}%"))
                    .unwrap_or_else(|| "n/a".to_string())
            ),
            format!(
                "Mean satisfaction: {}",
                self.mean_satisfaction
                    .map(|m| format!("{m:.2}/5"))
                    .unwrap_or_else(|| "n/a".to_string())
            ),
            format!("Countries: {}", self.countries),
        ]
    }
}

/// One-line preview of a record, used by the generator's console output.
pub fn preview_line(record: &ProjectRecord) -> String {
    format!(
        "{:<5} {:<20} {:<12} {:<13} {:<7} {} -> {} {:<12} {:>4} {:>4}",
        record.project_id,
        record.client,
        record.country,
        record.phase,
        record.owner,
        record.start_date,
        record.end_date,
        record.status,
        format_number(record.progress),
        format_number(record.satisfaction),
    )
}
