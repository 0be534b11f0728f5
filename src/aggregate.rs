//! KPIs and group-by summaries over a (usually filtered) record view.
//!
//! All functions are total. Empty inputs follow fixed policies rather than
//! failing: rates are `0.0` and means are `None`.

use crate::record::{AnnotatedRecord, CategoryField, NumericField, ProjectRecord};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Number of projects in a view.
pub fn count<R>(records: &[R]) -> usize {
    records.len()
}

/// Share of completed projects as a percentage in `[0, 100]`; `0.0` when empty.
pub fn completion_rate<R: AsRef<ProjectRecord>>(records: &[R]) -> f64 {
    if records.is_empty() {
        return 0.0;
    }
    let completed = records.iter().filter(|r| r.as_ref().is_completed()).count();
    completed as f64 / records.len() as f64 * 100.0
}

/// Count overdue projects
///
/// # Arguments
/// * `records` - Annotated rows; the overdue flag depends on the `now` they
///   were annotated with
///
/// # Returns
/// How many rows have `is_overdue` set. Completed projects are never counted.
pub fn overdue_count(records: &[AnnotatedRecord]) -> usize {
    records.iter().filter(|r| r.is_overdue).count()
}

/// Arithmetic mean of `field`, or `None` for an empty view.
pub fn mean<R: AsRef<ProjectRecord>>(records: &[R], field: NumericField) -> Option<f64> {
    if records.is_empty() {
        return None;
    }
    let total: f64 = records.iter().map(|r| r.as_ref().numeric(field)).sum();
    Some(total / records.len() as f64)
}

/// Number of records per distinct value of `field`.
pub fn group_count<R: AsRef<ProjectRecord>>(
    records: &[R],
    field: CategoryField,
) -> HashMap<String, usize> {
    let mut counts = HashMap::new();
    for record in records {
        *counts
            .entry(record.as_ref().category(field).to_string())
            .or_insert(0) += 1;
    }
    counts
}

/// Mean of `value_field` per distinct value of `group_field`.
///
/// Every key present has at least one member, so no mean is undefined here.
pub fn group_mean<R: AsRef<ProjectRecord>>(
    records: &[R],
    group_field: CategoryField,
    value_field: NumericField,
) -> HashMap<String, f64> {
    let mut sums: HashMap<String, (f64, usize)> = HashMap::new();
    for record in records {
        let record = record.as_ref();
        let slot = sums
            .entry(record.category(group_field).to_string())
            .or_insert((0.0, 0));
        slot.0 += record.numeric(value_field);
        slot.1 += 1;
    }
    sums.into_iter()
        .map(|(key, (sum, n))| (key, sum / n as f64))
        .collect()
}

/// Counts ordered largest first, ties broken by key.
pub fn sorted_counts(counts: &HashMap<String, usize>) -> Vec<(String, usize)> {
    let mut entries: Vec<(String, usize)> =
        counts.iter().map(|(k, v)| (k.clone(), *v)).collect();
    entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    entries
}

/// Means ordered by key.
pub fn sorted_means(means: &HashMap<String, f64>) -> Vec<(String, f64)> {
    let mut entries: Vec<(String, f64)> = means.iter().map(|(k, v)| (k.clone(), *v)).collect();
    entries.sort_by(|a, b| a.0.cmp(&b.0));
    entries
}

/// The five headline indicators shown above the charts.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Kpis {
    pub total: usize,
    pub completion_rate: f64,
    pub overdue: usize,
    pub mean_progress: Option<f64>,
    pub mean_satisfaction: Option<f64>,
}

impl Kpis {
    pub fn compute(records: &[AnnotatedRecord]) -> Self {
        Kpis {
            total: count(records),
            completion_rate: completion_rate(records),
            overdue: overdue_count(records),
            mean_progress: mean(records, NumericField::Progress),
            mean_satisfaction: mean(records, NumericField::Satisfaction),
        }
    }
}
