//! Fields computed from a record and an explicit evaluation time.
//!
//! Nothing here reads the clock; callers pass `now` so that the same batch
//! annotated at the same instant always yields the same result.

use crate::record::{AnnotatedRecord, ProjectRecord};
use chrono::{NaiveDateTime, NaiveTime};

const SECONDS_PER_DAY: i64 = 86_400;

/// Whole days from `now` until the start of the record's end date.
///
/// Partial days round toward negative infinity, so a project due today
/// reports `-1` as soon as the day has begun.
pub fn days_remaining(record: &ProjectRecord, now: NaiveDateTime) -> i64 {
    let deadline = record.end_date.and_time(NaiveTime::default());
    (deadline - now).num_seconds().div_euclid(SECONDS_PER_DAY)
}

/// A project is overdue when its deadline has passed and it is still running.
pub fn is_overdue(record: &ProjectRecord, days_remaining: i64) -> bool {
    days_remaining < 0 && record.is_in_progress()
}

/// Annotate a single record
///
/// # Arguments
/// * `record` - The project as loaded
/// * `now` - Evaluation time, in the same local time the dates refer to
///
/// # Returns
/// A copy of the record with `days_remaining` and `is_overdue` filled in.
///
/// # Examples
/// ```
/// use chrono::NaiveDate;
/// use dashboard::derive::annotate_one;
/// use dashboard::record::ProjectRecord;
///
/// let day = |d| NaiveDate::from_ymd_opt(2025, 3, d).unwrap();
/// let record = ProjectRecord {
///     project_id: "P001".into(),
///     client: "CHU".into(),
///     country: "France".into(),
///     phase: "Launch".into(),
///     owner: "Sophie".into(),
///     start_date: day(1),
///     end_date: day(10),
///     status: "in progress".into(),
///     progress: 25.0,
///     satisfaction: 4.0,
/// };
/// let annotated = annotate_one(&record, day(12).and_hms_opt(8, 0, 0).unwrap());
/// assert_eq!(annotated.days_remaining, -3);
/// assert!(annotated.is_overdue);
/// ```
pub fn annotate_one(record: &ProjectRecord, now: NaiveDateTime) -> AnnotatedRecord {
    let days = days_remaining(record, now);
    AnnotatedRecord {
        is_overdue: is_overdue(record, days),
        days_remaining: days,
        record: record.clone(),
    }
}

/// Attach `days_remaining` and `is_overdue` to every record, preserving order.
pub fn annotate(records: &[ProjectRecord], now: NaiveDateTime) -> Vec<AnnotatedRecord> {
    records.iter().map(|r| annotate_one(r, now)).collect()
}
