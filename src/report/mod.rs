//! Usability report assembly and rendering.

pub mod generator;

pub use generator::{generate_json_report, generate_markdown_report, RenderOptions};

use crate::analysis::{aggregate_all, DatasetSummary};
use crate::models::Dataset;
use crate::store::RecordStore;
use chrono::{DateTime, Local};
use serde::Serialize;
use std::path::PathBuf;

/// Metadata about the report.
#[derive(Debug, Clone, Serialize)]
pub struct ReportMetadata {
    /// Study title from the configuration.
    pub study_title: String,
    /// Directory the datasets were read from.
    pub data_dir: PathBuf,
    /// When the report was generated.
    pub generated_at: DateTime<Local>,
}

/// One dataset's part of the report.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Section {
    /// The dataset was loaded; its summary may still be `NoData`.
    Ready { summary: DatasetSummary },
    /// The dataset could not be read. Other sections are unaffected.
    Unavailable { dataset: Dataset, reason: String },
}

impl Section {
    pub fn dataset(&self) -> Dataset {
        match self {
            Section::Ready { summary } => summary.dataset(),
            Section::Unavailable { dataset, .. } => *dataset,
        }
    }
}

/// The complete aggregated usability report.
#[derive(Debug, Clone, Serialize)]
pub struct UsabilityReport {
    pub metadata: ReportMetadata,
    /// One section per dataset, in `Dataset::ALL` order.
    pub sections: Vec<Section>,
}

impl UsabilityReport {
    /// Aggregate every dataset in `store`.
    pub fn build(store: &RecordStore, study_title: &str) -> Self {
        let sections = aggregate_all(store)
            .into_iter()
            .map(|(dataset, result)| match result {
                Ok(summary) => Section::Ready { summary },
                Err(e) => Section::Unavailable {
                    dataset,
                    reason: e.to_string(),
                },
            })
            .collect();

        Self {
            metadata: ReportMetadata {
                study_title: study_title.to_string(),
                data_dir: store.root().to_path_buf(),
                generated_at: Local::now(),
            },
            sections,
        }
    }

    /// Whether no dataset has any rows.
    pub fn is_empty(&self) -> bool {
        self.sections.iter().all(|section| match section {
            Section::Ready { summary } => summary.is_empty(),
            Section::Unavailable { .. } => false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{now_timestamp, ConsentRecord};
    use tempfile::tempdir;

    #[test]
    fn test_build_empty_store() {
        let dir = tempdir().unwrap();
        let store = RecordStore::open(dir.path()).unwrap();

        let report = UsabilityReport::build(&store, "Study");

        assert!(report.is_empty());
        let datasets: Vec<Dataset> = report.sections.iter().map(Section::dataset).collect();
        assert_eq!(datasets, Dataset::ALL.to_vec());
    }

    #[test]
    fn test_build_marks_unreadable_dataset() {
        let dir = tempdir().unwrap();
        let store = RecordStore::open(dir.path()).unwrap();
        std::fs::write(store.path_for(Dataset::Demographic), "bad\n").unwrap();
        store
            .append(&ConsentRecord {
                timestamp: now_timestamp(),
                consent_given: true,
            })
            .unwrap();

        let report = UsabilityReport::build(&store, "Study");

        assert!(!report.is_empty());
        assert!(matches!(report.sections[0], Section::Ready { .. }));
        assert!(matches!(
            report.sections[1],
            Section::Unavailable {
                dataset: Dataset::Demographic,
                ..
            }
        ));
    }
}
