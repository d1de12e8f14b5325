//! Data models for the usability study.
//!
//! Each dataset has a fixed record type. The field order of each struct is
//! the column order of its CSV file, and the field names are its header.

use crate::error::ValidationError;
use chrono::{Local, NaiveDateTime, SubsecRound};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Format of every `timestamp` column.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Current local time truncated to whole seconds.
pub fn now_timestamp() -> NaiveDateTime {
    Local::now().naive_local().trunc_subsecs(0)
}

/// Serde adapter writing timestamps as `YYYY-MM-DD HH:MM:SS`.
pub mod timestamp {
    use super::TIMESTAMP_FORMAT;
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.format(TIMESTAMP_FORMAT).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(raw.trim(), TIMESTAMP_FORMAT)
            .map_err(serde::de::Error::custom)
    }
}

/// The four named datasets of a study.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Dataset {
    Consent,
    Demographic,
    Task,
    Exit,
}

impl Dataset {
    /// All datasets in report order.
    pub const ALL: [Dataset; 4] = [
        Dataset::Consent,
        Dataset::Demographic,
        Dataset::Task,
        Dataset::Exit,
    ];

    /// File name of the dataset inside the data directory.
    pub fn file_name(&self) -> &'static str {
        match self {
            Dataset::Consent => "consent_data.csv",
            Dataset::Demographic => "demographic_data.csv",
            Dataset::Task => "task_data.csv",
            Dataset::Exit => "exit_data.csv",
        }
    }

    /// Column header, in file order.
    pub fn columns(&self) -> &'static [&'static str] {
        match self {
            Dataset::Consent => &["timestamp", "consent_given"],
            Dataset::Demographic => &["timestamp", "name", "age", "occupation", "familiarity"],
            Dataset::Task => &["timestamp", "task_name", "success", "duration_seconds", "notes"],
            Dataset::Exit => &["timestamp", "satisfaction", "difficulty", "open_feedback"],
        }
    }

    /// Heading used for the dataset in reports.
    pub fn title(&self) -> &'static str {
        match self {
            Dataset::Consent => "Consent Data",
            Dataset::Demographic => "Demographic Data",
            Dataset::Task => "Task Performance Data",
            Dataset::Exit => "Exit Questionnaire Data",
        }
    }
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dataset::Consent => write!(f, "consent"),
            Dataset::Demographic => write!(f, "demographic"),
            Dataset::Task => write!(f, "task"),
            Dataset::Exit => write!(f, "exit"),
        }
    }
}

/// A row type bound to one dataset.
pub trait Record: Serialize + DeserializeOwned {
    const DATASET: Dataset;
}

/// Self-reported familiarity with the system under test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Familiarity {
    #[serde(rename = "Not Familiar")]
    NotFamiliar,
    #[serde(rename = "Somewhat Familiar")]
    SomewhatFamiliar,
    #[serde(rename = "Familiar")]
    Familiar,
}

impl Familiarity {
    pub const ALL: [Familiarity; 3] = [
        Familiarity::NotFamiliar,
        Familiarity::SomewhatFamiliar,
        Familiarity::Familiar,
    ];

    /// Parse a user-supplied label. Case, dashes and underscores are ignored.
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let normalized = input.trim().to_lowercase().replace(['-', '_'], " ");

        match normalized.as_str() {
            "not familiar" => Ok(Familiarity::NotFamiliar),
            "somewhat familiar" | "somewhat" => Ok(Familiarity::SomewhatFamiliar),
            "familiar" => Ok(Familiarity::Familiar),
            _ => Err(ValidationError::UnknownOption {
                field: "familiarity",
                value: input.to_string(),
                expected: Self::ALL
                    .iter()
                    .map(|f| f.to_string())
                    .collect::<Vec<_>>()
                    .join(", "),
            }),
        }
    }
}

impl fmt::Display for Familiarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Familiarity::NotFamiliar => write!(f, "Not Familiar"),
            Familiarity::SomewhatFamiliar => write!(f, "Somewhat Familiar"),
            Familiarity::Familiar => write!(f, "Familiar"),
        }
    }
}

/// Whether a participant completed a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TaskOutcome {
    Yes,
    No,
    Partial,
}

impl fmt::Display for TaskOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskOutcome::Yes => write!(f, "Yes"),
            TaskOutcome::No => write!(f, "No"),
            TaskOutcome::Partial => write!(f, "Partial"),
        }
    }
}

/// A five-point Likert rating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Rating(u8);

impl Rating {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    /// Validate a rating for the named questionnaire field.
    pub fn new(field: &'static str, value: u8) -> Result<Self, ValidationError> {
        if (Self::MIN..=Self::MAX).contains(&value) {
            Ok(Self(value))
        } else {
            Err(ValidationError::RatingOutOfRange { field, value })
        }
    }

    pub fn value(&self) -> u8 {
        self.0
    }

    /// Label shown for an overall-satisfaction answer.
    pub fn satisfaction_label(&self) -> &'static str {
        match self.0 {
            1 => "Very Dissatisfied",
            2 => "Dissatisfied",
            3 => "Neutral",
            4 => "Satisfied",
            _ => "Very Satisfied",
        }
    }

    /// Label shown for an overall-difficulty answer.
    pub fn difficulty_label(&self) -> &'static str {
        match self.0 {
            1 => "Very Easy",
            2 => "Easy",
            3 => "Neutral",
            4 => "Difficult",
            _ => "Very Difficult",
        }
    }
}

impl TryFrom<u8> for Rating {
    type Error = ValidationError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Rating::new("rating", value)
    }
}

impl From<Rating> for u8 {
    fn from(rating: Rating) -> Self {
        rating.0
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One consent submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsentRecord {
    #[serde(with = "timestamp")]
    pub timestamp: NaiveDateTime,
    pub consent_given: bool,
}

impl Record for ConsentRecord {
    const DATASET: Dataset = Dataset::Consent;
}

/// One demographic questionnaire submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DemographicRecord {
    #[serde(with = "timestamp")]
    pub timestamp: NaiveDateTime,
    pub name: String,
    pub age: u32,
    pub occupation: String,
    pub familiarity: Familiarity,
}

impl Record for DemographicRecord {
    const DATASET: Dataset = Dataset::Demographic;
}

/// The result of one observed task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRecord {
    #[serde(with = "timestamp")]
    pub timestamp: NaiveDateTime,
    pub task_name: String,
    pub success: TaskOutcome,
    /// Elapsed seconds, rounded to two decimals; empty if the timer never stopped.
    pub duration_seconds: Option<f64>,
    pub notes: String,
}

impl Record for TaskRecord {
    const DATASET: Dataset = Dataset::Task;
}

/// One exit questionnaire submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExitRecord {
    #[serde(with = "timestamp")]
    pub timestamp: NaiveDateTime,
    pub satisfaction: Rating,
    pub difficulty: Rating,
    pub open_feedback: String,
}

impl Record for ExitRecord {
    const DATASET: Dataset = Dataset::Exit;
}

/// Round elapsed seconds to the two decimals stored on disk.
pub fn round_duration(seconds: f64) -> f64 {
    (seconds * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dataset_file_names() {
        assert_eq!(Dataset::Consent.file_name(), "consent_data.csv");
        assert_eq!(Dataset::Exit.file_name(), "exit_data.csv");
        assert_eq!(Dataset::ALL.len(), 4);
    }

    #[test]
    fn test_familiarity_parse() {
        assert_eq!(
            Familiarity::parse("not-familiar").unwrap(),
            Familiarity::NotFamiliar
        );
        assert_eq!(
            Familiarity::parse("Somewhat Familiar").unwrap(),
            Familiarity::SomewhatFamiliar
        );
        assert_eq!(Familiarity::parse("FAMILIAR").unwrap(), Familiarity::Familiar);
        assert!(matches!(
            Familiarity::parse("expert"),
            Err(ValidationError::UnknownOption { field: "familiarity", .. })
        ));
    }

    #[test]
    fn test_rating_range() {
        assert_eq!(Rating::new("satisfaction", 1).unwrap().value(), 1);
        assert_eq!(Rating::new("satisfaction", 5).unwrap().value(), 5);
        assert_eq!(
            Rating::new("difficulty", 0),
            Err(ValidationError::RatingOutOfRange {
                field: "difficulty",
                value: 0
            })
        );
        assert!(Rating::try_from(6u8).is_err());
    }

    #[test]
    fn test_rating_labels() {
        let rating = Rating::new("satisfaction", 4).unwrap();
        assert_eq!(rating.satisfaction_label(), "Satisfied");
        assert_eq!(rating.difficulty_label(), "Difficult");
    }

    #[test]
    fn test_round_duration() {
        assert_eq!(round_duration(12.3456), 12.35);
        assert_eq!(round_duration(0.004), 0.0);
    }

    #[test]
    fn test_record_columns_match_struct_fields() {
        let record = TaskRecord {
            timestamp: now_timestamp(),
            task_name: "Task 1".to_string(),
            success: TaskOutcome::Partial,
            duration_seconds: None,
            notes: String::new(),
        };

        let mut writer = csv::Writer::from_writer(vec![]);
        writer.serialize(&record).unwrap();
        let bytes = writer.into_inner().unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let header = text.lines().next().unwrap();

        assert_eq!(header, Dataset::Task.columns().join(","));
    }

    #[test]
    fn test_timestamp_format() {
        let ts = NaiveDateTime::parse_from_str("2024-03-01 09:05:07", TIMESTAMP_FORMAT).unwrap();
        let record = ConsentRecord {
            timestamp: ts,
            consent_given: true,
        };
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"2024-03-01 09:05:07\""));
    }
}
