use crate::record::{CategoryField, ProjectRecord};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

/// Label a selector shows for "no constraint".
pub const WILDCARD: &str = "All";

/// The four fields a user can filter on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterField {
    Country,
    Phase,
    Owner,
    Status,
}

impl FilterField {
    pub const ALL: [FilterField; 4] = [
        FilterField::Country,
        FilterField::Phase,
        FilterField::Owner,
        FilterField::Status,
    ];

    pub fn category(self) -> CategoryField {
        match self {
            FilterField::Country => CategoryField::Country,
            FilterField::Phase => CategoryField::Phase,
            FilterField::Owner => CategoryField::Owner,
            FilterField::Status => CategoryField::Status,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            FilterField::Country => "country",
            FilterField::Phase => "phase",
            FilterField::Owner => "owner",
            FilterField::Status => "status",
        }
    }
}

impl fmt::Display for FilterField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FilterField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FilterField::ALL
            .into_iter()
            .find(|f| f.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown filter field '{s}'"))
    }
}

/// The active equality constraints. A field with no entry lets every value through.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSpec {
    constraints: BTreeMap<FilterField, String>,
}

impl FilterSpec {
    /// A spec with no constraints.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of `set`.
    pub fn with(mut self, field: FilterField, value: impl Into<String>) -> Self {
        self.set(field, value);
        self
    }

    /// Constrain `field` to exactly `value`.
    ///
    /// The value is stored as given; an empty string only matches records
    /// whose field is empty. Use `selector_value` to map a selector label
    /// first.
    pub fn set(&mut self, field: FilterField, value: impl Into<String>) {
        self.constraints.insert(field, value.into());
    }

    /// Same as `set`, but `None` clears the field.
    pub fn set_opt(&mut self, field: FilterField, value: Option<impl Into<String>>) {
        match value {
            Some(v) => self.set(field, v),
            None => self.clear(field),
        }
    }

    /// Drop the constraint on `field`, if any.
    pub fn clear(&mut self, field: FilterField) {
        self.constraints.remove(&field);
    }

    /// The value `field` must equal, or `None` when unconstrained.
    pub fn constraint(&self, field: FilterField) -> Option<&str> {
        self.constraints.get(&field).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    /// Active constraints in field order.
    pub fn constraints(&self) -> impl Iterator<Item = (FilterField, &str)> {
        self.constraints.iter().map(|(f, v)| (*f, v.as_str()))
    }

    /// True when the record satisfies every constraint.
    pub fn matches(&self, record: &ProjectRecord) -> bool {
        self.constraints
            .iter()
            .all(|(field, value)| record.category(field.category()) == value)
    }

    /// Records passing every constraint, in their original order.
    pub fn apply<R>(&self, records: &[R]) -> Vec<R>
    where
        R: AsRef<ProjectRecord> + Clone,
    {
        records
            .iter()
            .filter(|r| self.matches(r.as_ref()))
            .cloned()
            .collect()
    }
}

impl fmt::Display for FilterSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str(WILDCARD);
        }
        let parts: Vec<String> = self
            .constraints()
            .map(|(field, value)| format!("{field}={value}"))
            .collect();
        f.write_str(&parts.join(", "))
    }
}

/// Map a selector choice to a constraint value
///
/// # Arguments
/// * `value` - The label picked in a selector, CLI flag or query string
///
/// # Returns
/// `None` for the wildcard label `All` (exact match), otherwise the value
/// unchanged.
///
/// # Examples
/// ```
/// use dashboard::filter::selector_value;
///
/// assert_eq!(selector_value("All"), None);
/// assert_eq!(selector_value("France"), Some("France"));
/// assert_eq!(selector_value("ALL"), Some("ALL"));
/// ```
pub fn selector_value(value: &str) -> Option<&str> {
    (value != WILDCARD).then_some(value)
}

/// Filter a record view
///
/// # Arguments
/// * `records` - Plain or annotated records
/// * `spec` - The constraints to satisfy; an empty spec keeps everything
///
/// # Returns
/// The matching records, cloned, in their input order. Applying the same
/// spec to the result again returns it unchanged.
pub fn apply<R>(records: &[R], spec: &FilterSpec) -> Vec<R>
where
    R: AsRef<ProjectRecord> + Clone,
{
    spec.apply(records)
}

/// Distinct values of `field`, sorted, for populating a selector.
pub fn options<R>(records: &[R], field: FilterField) -> Vec<String>
where
    R: AsRef<ProjectRecord>,
{
    records
        .iter()
        .map(|r| r.as_ref().category(field.category()).to_string())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn record(id: &str, country: &str, phase: &str, owner: &str, status: &str) -> ProjectRecord {
        let day = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        ProjectRecord {
            project_id: id.into(),
            client: "CHU".into(),
            country: country.into(),
            phase: phase.into(),
            owner: owner.into(),
            start_date: day,
            end_date: day,
            status: status.into(),
            progress: 50.0,
            satisfaction: 4.0,
        }
    }

    fn batch() -> Vec<ProjectRecord> {
        vec![
            record("P001", "France", "Installation", "Sophie", "in progress"),
            record("P002", "Spain", "Training", "Jean", "in progress"),
            record("P003", "France", "Closing", "Marie", "completed"),
            record("P004", "France", "Installation", "Jean", "in progress"),
        ]
    }

    fn ids(records: &[ProjectRecord]) -> Vec<&str> {
        records.iter().map(|r| r.project_id.as_str()).collect()
    }

    #[test]
    fn empty_spec_keeps_everything() {
        let records = batch();
        assert_eq!(FilterSpec::new().apply(&records), records);
    }

    #[test]
    fn constraints_are_conjunctive_and_keep_order() {
        let records = batch();
        let spec = FilterSpec::new()
            .with(FilterField::Country, "France")
            .with(FilterField::Phase, "Installation");
        let filtered = spec.apply(&records);
        assert_eq!(ids(&filtered), ["P001", "P004"]);

        let spec = spec.with(FilterField::Owner, "Jean");
        assert_eq!(ids(&spec.apply(&records)), ["P004"]);
    }

    #[test]
    fn no_match_is_an_empty_view() {
        let spec = FilterSpec::new().with(FilterField::Country, "Japan");
        assert!(spec.apply(&batch()).is_empty());
    }

    #[test]
    fn equality_is_exact() {
        let spec = FilterSpec::new().with(FilterField::Country, "france");
        assert!(spec.apply(&batch()).is_empty());
    }

    #[test]
    fn none_clears_the_field() {
        let mut spec = FilterSpec::new().with(FilterField::Phase, "Closing");
        spec.set_opt(FilterField::Phase, None::<String>);
        assert_eq!(spec.constraint(FilterField::Phase), None);
        assert!(spec.is_empty());
    }

    #[test]
    fn empty_and_all_caps_values_are_ordinary_constraints() {
        let mut records = batch();
        records[1].country = String::new();
        records[2].owner = "ALL".into();

        let spec = FilterSpec::new().with(FilterField::Country, "");
        assert_eq!(spec.constraint(FilterField::Country), Some(""));
        assert_eq!(ids(&spec.apply(&records)), ["P002"]);

        let spec = FilterSpec::new().with(FilterField::Owner, "ALL");
        assert_eq!(ids(&spec.apply(&records)), ["P003"]);
    }

    #[test]
    fn only_the_exact_label_is_a_wildcard() {
        assert_eq!(selector_value(WILDCARD), None);
        assert_eq!(selector_value("all"), Some("all"));
        assert_eq!(selector_value(""), Some(""));
        assert_eq!(selector_value("Spain"), Some("Spain"));
    }

    #[test]
    fn applying_twice_is_idempotent() {
        let spec = FilterSpec::new().with(FilterField::Status, "in progress");
        let once = spec.apply(&batch());
        let twice = spec.apply(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn options_are_sorted_and_distinct() {
        assert_eq!(
            options(&batch(), FilterField::Country),
            ["France", "Spain"]
        );
        assert_eq!(
            options(&batch(), FilterField::Owner),
            ["Jean", "Marie", "Sophie"]
        );
    }

    #[test]
    fn field_names_parse() {
        assert_eq!("Owner".parse::<FilterField>(), Ok(FilterField::Owner));
        assert!("client".parse::<FilterField>().is_err());
        let spec = FilterSpec::new()
            .with(FilterField::Status, "completed")
            .with(FilterField::Country, "France");
        assert_eq!(spec.to_string(), "country=France, status=completed");
    }
}
