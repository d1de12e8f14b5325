//! Submission validation.
//!
//! Each questionnaire is a form holding the raw participant input. A form
//! either validates into a typed record or is rejected with a
//! `ValidationError`, in which case nothing is written.

use crate::config::TaskDefinition;
use crate::error::{SubmitError, ValidationError};
use crate::models::{
    now_timestamp, ConsentRecord, DemographicRecord, ExitRecord, Familiarity, Rating, Record,
    TaskOutcome,
};
use crate::store::RecordStore;
use tracing::{info, warn};

/// Youngest accepted participant age.
pub const MIN_AGE: u32 = 18;
/// Oldest accepted participant age.
pub const MAX_AGE: u32 = 60;

/// A questionnaire that validates into one dataset record.
pub trait Form {
    type Output: Record;

    fn validate(&self) -> Result<Self::Output, ValidationError>;
}

/// Validate a form and append the resulting record.
pub fn submit<F: Form>(store: &RecordStore, form: &F) -> Result<F::Output, SubmitError> {
    let dataset = <F::Output as Record>::DATASET;

    let record = form.validate().map_err(|e| {
        warn!("Rejected {} submission: {}", dataset, e);
        e
    })?;

    store.append(&record)?;
    info!("Recorded {} submission", dataset);

    Ok(record)
}

/// The consent agreement checkbox.
#[derive(Debug, Clone, Default)]
pub struct ConsentForm {
    pub agreed: bool,
}

impl Form for ConsentForm {
    type Output = ConsentRecord;

    fn validate(&self) -> Result<ConsentRecord, ValidationError> {
        if !self.agreed {
            return Err(ValidationError::ConsentNotGiven);
        }

        Ok(ConsentRecord {
            timestamp: now_timestamp(),
            consent_given: true,
        })
    }
}

/// The demographic questionnaire. Every field is required.
#[derive(Debug, Clone, Default)]
pub struct DemographicForm {
    pub name: Option<String>,
    pub age: Option<u32>,
    pub occupation: Option<String>,
    pub familiarity: Option<String>,
}

impl Form for DemographicForm {
    type Output = DemographicRecord;

    fn validate(&self) -> Result<DemographicRecord, ValidationError> {
        let name = required_text("name", self.name.as_deref())?;
        let age = self.age.ok_or(ValidationError::MissingField("age"))?;
        let occupation = required_text("occupation", self.occupation.as_deref())?;
        let familiarity = required_text("familiarity", self.familiarity.as_deref())?;

        if !(MIN_AGE..=MAX_AGE).contains(&age) {
            return Err(ValidationError::AgeOutOfRange {
                value: age,
                min: MIN_AGE,
                max: MAX_AGE,
            });
        }

        Ok(DemographicRecord {
            timestamp: now_timestamp(),
            name,
            age,
            occupation,
            familiarity: Familiarity::parse(&familiarity)?,
        })
    }
}

/// The exit questionnaire.
#[derive(Debug, Clone)]
pub struct ExitForm {
    pub satisfaction: u8,
    pub difficulty: u8,
    pub open_feedback: String,
}

impl Form for ExitForm {
    type Output = ExitRecord;

    fn validate(&self) -> Result<ExitRecord, ValidationError> {
        Ok(ExitRecord {
            timestamp: now_timestamp(),
            satisfaction: Rating::new("satisfaction", self.satisfaction)?,
            difficulty: Rating::new("difficulty", self.difficulty)?,
            open_feedback: self.open_feedback.trim().to_string(),
        })
    }
}

/// Task fields entered by the observer, before timing is attached.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskDraft {
    pub task_name: String,
    pub success: TaskOutcome,
    pub notes: String,
}

/// The task results form.
#[derive(Debug, Clone)]
pub struct TaskForm {
    /// Either the catalog name ("Task 2") or its full label ("Task 2: Do Homework").
    pub task: Option<String>,
    pub success: TaskOutcome,
    pub notes: String,
}

impl TaskForm {
    /// Resolve the selected task against the catalog.
    pub fn validate(&self, catalog: &[TaskDefinition]) -> Result<TaskDraft, ValidationError> {
        let selected = required_text("task", self.task.as_deref())?;
        let definition = find_task(catalog, &selected)
            .ok_or_else(|| ValidationError::UnknownTask(selected.clone()))?;

        Ok(TaskDraft {
            task_name: definition.name.clone(),
            success: self.success,
            notes: self.notes.trim().to_string(),
        })
    }
}

/// Look up a task by name or by its `name: title` label, ignoring case.
pub fn find_task<'a>(catalog: &'a [TaskDefinition], selected: &str) -> Option<&'a TaskDefinition> {
    let name = selected.split(':').next().unwrap_or(selected).trim();

    catalog
        .iter()
        .find(|task| task.name.eq_ignore_ascii_case(name))
}

fn required_text(field: &'static str, value: Option<&str>) -> Result<String, ValidationError> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(ValidationError::MissingField(field)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StudyConfig;
    use crate::models::Dataset;
    use tempfile::tempdir;

    fn complete_demographics() -> DemographicForm {
        DemographicForm {
            name: Some("Ada Lovelace".to_string()),
            age: Some(36),
            occupation: Some("Mathematician".to_string()),
            familiarity: Some("familiar".to_string()),
        }
    }

    #[test]
    fn test_consent_requires_agreement() {
        let dir = tempdir().unwrap();
        let store = RecordStore::open(dir.path()).unwrap();

        let err = submit(&store, &ConsentForm { agreed: false }).unwrap_err();

        assert!(matches!(
            err,
            SubmitError::Validation(ValidationError::ConsentNotGiven)
        ));
        assert!(!store.path_for(Dataset::Consent).exists());
    }

    #[test]
    fn test_consent_recorded() {
        let dir = tempdir().unwrap();
        let store = RecordStore::open(dir.path()).unwrap();

        let record = submit(&store, &ConsentForm { agreed: true }).unwrap();
        assert!(record.consent_given);

        let loaded: Vec<ConsentRecord> = store.load().unwrap();
        assert_eq!(loaded, vec![record]);
    }

    #[test]
    fn test_demographics_each_submission_appends_one_row() {
        let dir = tempdir().unwrap();
        let store = RecordStore::open(dir.path()).unwrap();

        for expected in 1..=3 {
            submit(&store, &complete_demographics()).unwrap();
            let loaded: Vec<DemographicRecord> = store.load().unwrap();
            assert_eq!(loaded.len(), expected);
        }

        let content = std::fs::read_to_string(store.path_for(Dataset::Demographic)).unwrap();
        assert_eq!(content.matches("timestamp,name").count(), 1);
    }

    #[test]
    fn test_demographics_missing_fields() {
        let mut form = complete_demographics();
        form.occupation = Some("   ".to_string());
        assert_eq!(
            form.validate(),
            Err(ValidationError::MissingField("occupation"))
        );

        let mut form = complete_demographics();
        form.familiarity = None;
        assert_eq!(
            form.validate(),
            Err(ValidationError::MissingField("familiarity"))
        );

        let mut form = complete_demographics();
        form.age = None;
        assert_eq!(form.validate(), Err(ValidationError::MissingField("age")));
    }

    #[test]
    fn test_demographics_age_range() {
        let mut form = complete_demographics();
        form.age = Some(17);
        assert!(matches!(
            form.validate(),
            Err(ValidationError::AgeOutOfRange { value: 17, .. })
        ));

        form.age = Some(60);
        assert_eq!(form.validate().unwrap().age, 60);
    }

    #[test]
    fn test_demographics_trims_text() {
        let mut form = complete_demographics();
        form.name = Some("  Grace Hopper ".to_string());
        let record = form.validate().unwrap();
        assert_eq!(record.name, "Grace Hopper");
        assert_eq!(record.familiarity, Familiarity::Familiar);
    }

    #[test]
    fn test_exit_rating_range() {
        let form = ExitForm {
            satisfaction: 6,
            difficulty: 2,
            open_feedback: String::new(),
        };
        assert_eq!(
            form.validate(),
            Err(ValidationError::RatingOutOfRange {
                field: "satisfaction",
                value: 6
            })
        );

        let form = ExitForm {
            satisfaction: 5,
            difficulty: 1,
            open_feedback: " great ".to_string(),
        };
        let record = form.validate().unwrap();
        assert_eq!(record.satisfaction.value(), 5);
        assert_eq!(record.open_feedback, "great");
    }

    #[test]
    fn test_task_form_resolves_catalog() {
        let catalog = StudyConfig::default().tasks;

        let form = TaskForm {
            task: Some("Task 2: Do Homework".to_string()),
            success: TaskOutcome::Partial,
            notes: "needed a hint".to_string(),
        };
        let draft = form.validate(&catalog).unwrap();
        assert_eq!(draft.task_name, "Task 2");

        let form = TaskForm {
            task: Some("task 3".to_string()),
            ..form
        };
        assert_eq!(form.validate(&catalog).unwrap().task_name, "Task 3");
    }

    #[test]
    fn test_task_form_unknown_task() {
        let catalog = StudyConfig::default().tasks;
        let form = TaskForm {
            task: Some("Task 9".to_string()),
            success: TaskOutcome::No,
            notes: String::new(),
        };
        assert_eq!(
            form.validate(&catalog),
            Err(ValidationError::UnknownTask("Task 9".to_string()))
        );

        let form = TaskForm { task: None, ..form };
        assert_eq!(
            form.validate(&catalog),
            Err(ValidationError::MissingField("task"))
        );
    }
}
