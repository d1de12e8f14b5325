//! Dataset aggregation and statistics.
//!
//! This module loads each dataset from the record store and computes the
//! descriptive statistics shown in the report: value counts and means.

use crate::error::StoreError;
use crate::models::{
    ConsentRecord, Dataset, DemographicRecord, ExitRecord, Rating, Record, TaskOutcome,
    TaskRecord,
};
use crate::store::RecordStore;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, warn};

/// Result of aggregating one dataset.
///
/// `NoData` means nothing was ever recorded, which is different from a
/// summary whose statistics are all absent.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", content = "summary", rename_all = "snake_case")]
pub enum Aggregate<T> {
    NoData,
    Data(T),
}

impl<T> Aggregate<T> {
    pub fn is_empty(&self) -> bool {
        matches!(self, Aggregate::NoData)
    }

    pub fn as_data(&self) -> Option<&T> {
        match self {
            Aggregate::Data(summary) => Some(summary),
            Aggregate::NoData => None,
        }
    }
}

/// Pass-through summary for datasets without computed statistics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowsSummary<R> {
    pub rows: Vec<R>,
}

/// Number of rows with a given outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OutcomeCount {
    pub outcome: TaskOutcome,
    pub count: usize,
}

/// Mean duration of one task.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskDurationMean {
    pub task_name: String,
    /// `None` when no row of this task has a duration.
    pub mean_seconds: Option<f64>,
    /// Rows that contributed a duration.
    pub timed: usize,
    /// All rows of this task.
    pub attempts: usize,
}

/// Task performance statistics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskSummary {
    pub rows: Vec<TaskRecord>,
    /// Outcome frequencies, most frequent first.
    pub outcome_counts: Vec<OutcomeCount>,
    /// Mean durations by task name, sorted by name.
    pub duration_means: Vec<TaskDurationMean>,
}

/// Frequency of each rating 1 through 5.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct RatingDistribution {
    counts: [usize; 5],
}

impl RatingDistribution {
    pub fn from_ratings(ratings: impl IntoIterator<Item = Rating>) -> Self {
        let mut distribution = Self::default();
        for rating in ratings {
            distribution.counts[usize::from(rating.value() - Rating::MIN)] += 1;
        }
        distribution
    }

    /// Count for a rating value; 0 outside 1..=5.
    pub fn count(&self, value: u8) -> usize {
        if (Rating::MIN..=Rating::MAX).contains(&value) {
            self.counts[usize::from(value - Rating::MIN)]
        } else {
            0
        }
    }

    /// `(rating, count)` pairs in ascending rating order, zeros included.
    pub fn iter(&self) -> impl Iterator<Item = (u8, usize)> + '_ {
        (Rating::MIN..=Rating::MAX).map(move |value| (value, self.count(value)))
    }

    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }
}

/// Exit questionnaire statistics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExitSummary {
    pub rows: Vec<ExitRecord>,
    pub satisfaction: RatingDistribution,
    pub difficulty: RatingDistribution,
    pub mean_satisfaction: f64,
    pub mean_difficulty: f64,
}

/// Aggregated form of any dataset.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "dataset", content = "result", rename_all = "lowercase")]
pub enum DatasetSummary {
    Consent(Aggregate<RowsSummary<ConsentRecord>>),
    Demographic(Aggregate<RowsSummary<DemographicRecord>>),
    Task(Aggregate<TaskSummary>),
    Exit(Aggregate<ExitSummary>),
}

impl DatasetSummary {
    pub fn dataset(&self) -> Dataset {
        match self {
            DatasetSummary::Consent(_) => Dataset::Consent,
            DatasetSummary::Demographic(_) => Dataset::Demographic,
            DatasetSummary::Task(_) => Dataset::Task,
            DatasetSummary::Exit(_) => Dataset::Exit,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            DatasetSummary::Consent(a) => a.is_empty(),
            DatasetSummary::Demographic(a) => a.is_empty(),
            DatasetSummary::Task(a) => a.is_empty(),
            DatasetSummary::Exit(a) => a.is_empty(),
        }
    }
}

/// Load and aggregate one dataset.
pub fn aggregate(store: &RecordStore, dataset: Dataset) -> Result<DatasetSummary, StoreError> {
    let summary = match dataset {
        Dataset::Consent => DatasetSummary::Consent(load_rows(store)?),
        Dataset::Demographic => DatasetSummary::Demographic(load_rows(store)?),
        Dataset::Task => DatasetSummary::Task(summarize_tasks(store.load()?)),
        Dataset::Exit => DatasetSummary::Exit(summarize_exit(store.load()?)),
    };

    if summary.is_empty() {
        debug!("No {} data yet", dataset);
    }
    Ok(summary)
}

/// Aggregate every dataset, keeping going past unreadable ones.
pub fn aggregate_all(store: &RecordStore) -> Vec<(Dataset, Result<DatasetSummary, StoreError>)> {
    Dataset::ALL
        .iter()
        .map(|&dataset| {
            let result = aggregate(store, dataset);
            if let Err(ref e) = result {
                warn!("Failed to aggregate {} dataset: {}", dataset, e);
            }
            (dataset, result)
        })
        .collect()
}

fn load_rows<R: Record>(store: &RecordStore) -> Result<Aggregate<RowsSummary<R>>, StoreError> {
    let rows: Vec<R> = store.load()?;

    if rows.is_empty() {
        Ok(Aggregate::NoData)
    } else {
        Ok(Aggregate::Data(RowsSummary { rows }))
    }
}

/// Compute outcome counts and mean durations per task.
pub fn summarize_tasks(rows: Vec<TaskRecord>) -> Aggregate<TaskSummary> {
    if rows.is_empty() {
        return Aggregate::NoData;
    }

    Aggregate::Data(TaskSummary {
        outcome_counts: outcome_counts(&rows),
        duration_means: duration_means(&rows),
        rows,
    })
}

/// Count outcomes, most frequent first. Ties keep first-seen order.
pub fn outcome_counts(rows: &[TaskRecord]) -> Vec<OutcomeCount> {
    let mut counts: Vec<OutcomeCount> = Vec::new();

    for row in rows {
        match counts.iter_mut().find(|c| c.outcome == row.success) {
            Some(entry) => entry.count += 1,
            None => counts.push(OutcomeCount {
                outcome: row.success,
                count: 1,
            }),
        }
    }

    // Stable sort keeps first-seen order among equal counts.
    counts.sort_by_key(|c| std::cmp::Reverse(c.count));
    counts
}

/// Mean duration grouped by task name. Missing durations are excluded.
pub fn duration_means(rows: &[TaskRecord]) -> Vec<TaskDurationMean> {
    let mut grouped: BTreeMap<&str, (f64, usize, usize)> = BTreeMap::new();

    for row in rows {
        let entry = grouped.entry(row.task_name.as_str()).or_default();
        entry.2 += 1;
        if let Some(seconds) = row.duration_seconds {
            entry.0 += seconds;
            entry.1 += 1;
        }
    }

    grouped
        .into_iter()
        .map(|(task_name, (sum, timed, attempts))| TaskDurationMean {
            task_name: task_name.to_string(),
            mean_seconds: (timed > 0).then(|| sum / timed as f64),
            timed,
            attempts,
        })
        .collect()
}

/// Compute rating distributions and means.
pub fn summarize_exit(rows: Vec<ExitRecord>) -> Aggregate<ExitSummary> {
    if rows.is_empty() {
        return Aggregate::NoData;
    }

    let satisfaction = RatingDistribution::from_ratings(rows.iter().map(|r| r.satisfaction));
    let difficulty = RatingDistribution::from_ratings(rows.iter().map(|r| r.difficulty));

    Aggregate::Data(ExitSummary {
        mean_satisfaction: mean(rows.iter().map(|r| f64::from(r.satisfaction.value()))),
        mean_difficulty: mean(rows.iter().map(|r| f64::from(r.difficulty.value()))),
        satisfaction,
        difficulty,
        rows,
    })
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, n) = values.fold((0.0, 0usize), |(sum, n), v| (sum + v, n + 1));
    if n == 0 {
        0.0
    } else {
        sum / n as f64
    }
}

/// Format a mean rating with two decimals.
pub fn format_mean(value: f64) -> String {
    format!("{:.2}", value)
}

/// Number of participants per familiarity level.
pub fn familiarity_distribution(rows: &[DemographicRecord]) -> HashMap<String, usize> {
    let mut dist: HashMap<String, usize> = HashMap::new();

    for row in rows {
        *dist.entry(row.familiarity.to_string()).or_default() += 1;
    }

    dist
}
