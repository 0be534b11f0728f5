use crate::aggregate::{self, Kpis};
use crate::derive;
use crate::filter::{self, FilterField, FilterSpec};
use crate::record::{AnnotatedRecord, CategoryField, Column, NumericField, ProjectRecord};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Ascending,
    Descending,
}

/// Table column to sort by; the source columns plus the derived ones.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortKey {
    Column(Column),
    DaysRemaining,
    Overdue,
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim();
        if let Some(column) = Column::from_header(key) {
            return Ok(SortKey::Column(column));
        }
        match key.to_ascii_lowercase().as_str() {
            "id" | "project_id" => Ok(SortKey::Column(Column::ProjectId)),
            "client" => Ok(SortKey::Column(Column::Client)),
            "country" | "pays" => Ok(SortKey::Column(Column::Country)),
            "phase" => Ok(SortKey::Column(Column::Phase)),
            "owner" | "responsable" => Ok(SortKey::Column(Column::Owner)),
            "start" | "date_debut" => Ok(SortKey::Column(Column::StartDate)),
            "end" | "date_fin" => Ok(SortKey::Column(Column::EndDate)),
            "status" => Ok(SortKey::Column(Column::Status)),
            "progress" | "avancement" => Ok(SortKey::Column(Column::Progress)),
            "satisfaction" => Ok(SortKey::Column(Column::Satisfaction)),
            "days" | "days_remaining" | "jours_restants" => Ok(SortKey::DaysRemaining),
            "overdue" | "en_retard" => Ok(SortKey::Overdue),
            other => Err(format!("unknown sort column '{other}'")),
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortKey::Column(column) => f.write_str(column.header()),
            SortKey::DaysRemaining => f.write_str(crate::record::DAYS_REMAINING_HEADER),
            SortKey::Overdue => f.write_str(crate::record::OVERDUE_HEADER),
        }
    }
}

fn compare(a: &AnnotatedRecord, b: &AnnotatedRecord, key: SortKey) -> Ordering {
    let (ra, rb) = (&a.record, &b.record);
    match key {
        SortKey::Column(Column::ProjectId) => ra.project_id.cmp(&rb.project_id),
        SortKey::Column(Column::Client) => ra.client.cmp(&rb.client),
        SortKey::Column(Column::Country) => ra.country.cmp(&rb.country),
        SortKey::Column(Column::Phase) => ra.phase.cmp(&rb.phase),
        SortKey::Column(Column::Owner) => ra.owner.cmp(&rb.owner),
        SortKey::Column(Column::StartDate) => ra.start_date.cmp(&rb.start_date),
        SortKey::Column(Column::EndDate) => ra.end_date.cmp(&rb.end_date),
        SortKey::Column(Column::Status) => ra.status.cmp(&rb.status),
        SortKey::Column(Column::Progress) => ra.progress.total_cmp(&rb.progress),
        SortKey::Column(Column::Satisfaction) => ra.satisfaction.total_cmp(&rb.satisfaction),
        SortKey::DaysRemaining => a.days_remaining.cmp(&b.days_remaining),
        SortKey::Overdue => a.is_overdue.cmp(&b.is_overdue),
    }
}

/// Stable sort of table rows, so equal keys keep their filtered order.
pub fn sort_rows(rows: &mut [AnnotatedRecord], key: SortKey, direction: Direction) {
    rows.sort_by(|a, b| {
        let ord = compare(a, b, key);
        match direction {
            Direction::Ascending => ord,
            Direction::Descending => ord.reverse(),
        }
    });
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProgressBar {
    pub project_id: String,
    pub progress: f64,
    pub status: String,
}

/// One bar of the project timeline, with the details shown on hover.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TimelineEntry {
    pub project_id: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub phase: String,
    pub client: String,
    pub owner: String,
    pub progress: f64,
}

/// Selector choices, computed on the full batch so that picking one value
/// never hides the others.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterOptions {
    pub country: Vec<String>,
    pub phase: Vec<String>,
    pub owner: Vec<String>,
    pub status: Vec<String>,
}

impl FilterOptions {
    pub fn from_records(records: &[ProjectRecord]) -> Self {
        FilterOptions {
            country: filter::options(records, FilterField::Country),
            phase: filter::options(records, FilterField::Phase),
            owner: filter::options(records, FilterField::Owner),
            status: filter::options(records, FilterField::Status),
        }
    }

    /// Choices for one selector.
    pub fn get(&self, field: FilterField) -> &[String] {
        match field {
            FilterField::Country => &self.country,
            FilterField::Phase => &self.phase,
            FilterField::Owner => &self.owner,
            FilterField::Status => &self.status,
        }
    }
}

/// Everything the presentation layer needs to draw one dashboard state.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DashboardView {
    pub evaluated_at: NaiveDateTime,
    pub filter: FilterSpec,
    pub options: FilterOptions,
    pub kpis: Kpis,
    pub by_phase: Vec<(String, usize)>,
    pub by_country: Vec<(String, usize)>,
    pub by_owner: Vec<(String, usize)>,
    pub satisfaction_by_owner: Vec<(String, f64)>,
    pub progress: Vec<ProgressBar>,
    pub timeline: Vec<TimelineEntry>,
    pub rows: Vec<AnnotatedRecord>,
}

impl DashboardView {
    pub fn build(records: &[ProjectRecord], spec: &FilterSpec, now: NaiveDateTime) -> Self {
        let annotated = derive::annotate(records, now);
        let rows = spec.apply(&annotated);

        let mut progress: Vec<ProgressBar> = rows
            .iter()
            .map(|r| ProgressBar {
                project_id: r.record.project_id.clone(),
                progress: r.record.progress,
                status: r.record.status.clone(),
            })
            .collect();
        progress.sort_by(|a, b| a.progress.total_cmp(&b.progress));

        let timeline = rows
            .iter()
            .map(|r| TimelineEntry {
                project_id: r.record.project_id.clone(),
                start: r.record.start_date,
                end: r.record.end_date,
                phase: r.record.phase.clone(),
                client: r.record.client.clone(),
                owner: r.record.owner.clone(),
                progress: r.record.progress,
            })
            .collect();

        DashboardView {
            evaluated_at: now,
            filter: spec.clone(),
            options: FilterOptions::from_records(records),
            kpis: Kpis::compute(&rows),
            by_phase: aggregate::sorted_counts(&aggregate::group_count(
                &rows,
                CategoryField::Phase,
            )),
            by_country: aggregate::sorted_counts(&aggregate::group_count(
                &rows,
                CategoryField::Country,
            )),
            by_owner: aggregate::sorted_counts(&aggregate::group_count(
                &rows,
                CategoryField::Owner,
            )),
            satisfaction_by_owner: aggregate::sorted_means(&aggregate::group_mean(
                &rows,
                CategoryField::Owner,
                NumericField::Satisfaction,
            )),
            progress,
            timeline,
            rows,
        }
    }

    pub fn sorted_rows(&self, key: SortKey, direction: Direction) -> Vec<AnnotatedRecord> {
        let mut rows = self.rows.clone();
        sort_rows(&mut rows, key, direction);
        rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, phase: &str, progress: f64, end: NaiveDate) -> ProjectRecord {
        let country = if id == "P002" { "UK" } else { "France" };
        ProjectRecord {
            project_id: id.into(),
            client: "CHU".into(),
            country: country.into(),
            phase: phase.into(),
            owner: "Sophie".into(),
            start_date: end - chrono::Days::new(40),
            end_date: end,
            status: "in progress".into(),
            progress,
            satisfaction: 4.2,
        }
    }

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 4, 1)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap()
    }

    fn batch() -> Vec<ProjectRecord> {
        let d = |m, day| NaiveDate::from_ymd_opt(2025, m, day).unwrap();
        vec![
            record("P001", "Installation", 55.0, d(5, 1)),
            record("P002", "Launch", 20.0, d(3, 20)),
            record("P003", "Installation", 45.0, d(6, 1)),
        ]
    }

    #[test]
    fn builds_view_for_filtered_rows() {
        let spec = FilterSpec::new().with(FilterField::Country, "France");
        let view = DashboardView::build(&batch(), &spec, now());

        assert_eq!(view.kpis.total, 2);
        assert_eq!(view.kpis.overdue, 0);
        assert_eq!(view.by_phase, vec![("Installation".to_string(), 2)]);
        assert_eq!(view.options.country, ["France", "UK"]);
        let ranked: Vec<_> = view.progress.iter().map(|p| p.project_id.as_str()).collect();
        assert_eq!(ranked, ["P003", "P001"]);
        assert_eq!(view.timeline.len(), 2);
        assert_eq!(view.timeline[1].project_id, "P003");
        assert_eq!(view.timeline[1].progress, 45.0);
        assert_eq!(view.options.get(FilterField::Phase), ["Installation", "Launch"]);
    }

    #[test]
    fn unfiltered_view_flags_overdue() {
        let view = DashboardView::build(&batch(), &FilterSpec::new(), now());
        assert_eq!(view.kpis.total, 3);
        assert_eq!(view.kpis.overdue, 1);
        assert!(view.rows[1].is_overdue);
    }

    #[test]
    fn rows_sort_by_any_column() {
        let view = DashboardView::build(&batch(), &FilterSpec::new(), now());
        let by_end = view.sorted_rows(SortKey::Column(Column::EndDate), Direction::Descending);
        let ids: Vec<_> = by_end.iter().map(|r| r.record.project_id.as_str()).collect();
        assert_eq!(ids, ["P003", "P001", "P002"]);

        let by_days = view.sorted_rows("days".parse().unwrap(), Direction::Ascending);
        assert_eq!(by_days[0].record.project_id, "P002");
    }

    #[test]
    fn sort_keys_parse_from_headers_and_aliases() {
        assert_eq!(
            "Avancement".parse::<SortKey>(),
            Ok(SortKey::Column(Column::Progress))
        );
        assert_eq!("owner".parse::<SortKey>(), Ok(SortKey::Column(Column::Owner)));
        assert_eq!("overdue".parse::<SortKey>(), Ok(SortKey::Overdue));
        assert!("colour".parse::<SortKey>().is_err());
    }
}
