use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub const STATUS_IN_PROGRESS: &str = "in progress";
pub const STATUS_COMPLETED: &str = "completed";

/// Header of the derived days-remaining column in exports.
pub const DAYS_REMAINING_HEADER: &str = "Jours_restants";
/// Header of the derived overdue flag column in exports.
pub const OVERDUE_HEADER: &str = "En_retard";

/// Source columns, in sheet order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Column {
    ProjectId,
    Client,
    Country,
    Phase,
    Owner,
    StartDate,
    EndDate,
    Status,
    Progress,
    Satisfaction,
}

impl Column {
    pub const ALL: [Column; 10] = [
        Column::ProjectId,
        Column::Client,
        Column::Country,
        Column::Phase,
        Column::Owner,
        Column::StartDate,
        Column::EndDate,
        Column::Status,
        Column::Progress,
        Column::Satisfaction,
    ];

    /// Header text as it appears in the spreadsheet and in exports.
    pub fn header(self) -> &'static str {
        match self {
            Column::ProjectId => "Project_ID",
            Column::Client => "Client",
            Column::Country => "Pays",
            Column::Phase => "Phase",
            Column::Owner => "Responsable",
            Column::StartDate => "Date_debut",
            Column::EndDate => "Date_fin",
            Column::Status => "Status",
            Column::Progress => "Avancement",
            Column::Satisfaction => "Satisfaction",
        }
    }

    pub fn from_header(header: &str) -> Option<Self> {
        Column::ALL.into_iter().find(|c| c.header() == header)
    }
}

/// Categorical attributes usable as group-by keys.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CategoryField {
    Client,
    Country,
    Phase,
    Owner,
    Status,
}

/// Numeric attributes usable in means.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NumericField {
    Progress,
    Satisfaction,
}

/// One project row as loaded from the source sheet.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProjectRecord {
    pub project_id: String,
    pub client: String,
    pub country: String,
    pub phase: String,
    pub owner: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: String,
    pub progress: f64,
    pub satisfaction: f64,
}

impl ProjectRecord {
    pub fn category(&self, field: CategoryField) -> &str {
        match field {
            CategoryField::Client => &self.client,
            CategoryField::Country => &self.country,
            CategoryField::Phase => &self.phase,
            CategoryField::Owner => &self.owner,
            CategoryField::Status => &self.status,
        }
    }

    pub fn numeric(&self, field: NumericField) -> f64 {
        match field {
            NumericField::Progress => self.progress,
            NumericField::Satisfaction => self.satisfaction,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == STATUS_COMPLETED
    }

    pub fn is_in_progress(&self) -> bool {
        self.status == STATUS_IN_PROGRESS
    }
}

impl AsRef<ProjectRecord> for ProjectRecord {
    fn as_ref(&self) -> &ProjectRecord {
        self
    }
}

/// A record together with the fields derived from an evaluation time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnnotatedRecord {
    #[serde(flatten)]
    pub record: ProjectRecord,
    pub days_remaining: i64,
    pub is_overdue: bool,
}

impl AsRef<ProjectRecord> for AnnotatedRecord {
    fn as_ref(&self) -> &ProjectRecord {
        &self.record
    }
}
