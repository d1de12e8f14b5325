//! Markdown and JSON report generation.
//!
//! This module renders the aggregated usability report. Charts are drawn as
//! text bars inside Markdown tables.

use super::{ReportMetadata, Section, UsabilityReport};
use crate::analysis::{
    familiarity_distribution, format_mean, Aggregate, DatasetSummary, ExitSummary,
    RatingDistribution, RowsSummary, TaskSummary,
};
use crate::config::ReportConfig;
use crate::models::{
    ConsentRecord, Dataset, DemographicRecord, Rating, TaskOutcome, TIMESTAMP_FORMAT,
};
use anyhow::Result;

/// Rendering switches taken from the `[report]` config section.
#[derive(Debug, Clone, Copy)]
pub struct RenderOptions {
    pub include_rows: bool,
    pub chart_width: usize,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            include_rows: true,
            chart_width: 30,
        }
    }
}

impl From<&ReportConfig> for RenderOptions {
    fn from(config: &ReportConfig) -> Self {
        Self {
            include_rows: config.include_rows,
            chart_width: config.chart_width.max(1),
        }
    }
}

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &UsabilityReport, options: RenderOptions) -> String {
    let mut output = String::new();

    output.push_str("# Usability Report - Aggregated Results\n\n");
    output.push_str(&generate_metadata_section(&report.metadata, &report.sections));
    output.push_str(&generate_table_of_contents(&report.sections));

    for section in &report.sections {
        output.push_str(&generate_section(section, options));
    }

    output.push_str(&generate_footer());

    output
}

/// Generate a JSON report.
pub fn generate_json_report(report: &UsabilityReport) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}

fn generate_metadata_section(metadata: &ReportMetadata, sections: &[Section]) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!("- **Study:** {}\n", metadata.study_title));
    section.push_str(&format!(
        "- **Data Directory:** `{}`\n",
        metadata.data_dir.display()
    ));
    section.push_str(&format!(
        "- **Generated:** {}\n",
        metadata.generated_at.format(TIMESTAMP_FORMAT)
    ));

    let counts: Vec<String> = sections
        .iter()
        .map(|s| format!("{} {}", s.dataset(), response_count(s)))
        .collect();
    section.push_str(&format!("- **Responses:** {}\n", counts.join(" | ")));
    section.push('\n');

    section
}

fn response_count(section: &Section) -> String {
    let count = match section {
        Section::Unavailable { .. } => return "n/a".to_string(),
        Section::Ready { summary } => match summary {
            DatasetSummary::Consent(a) => a.as_data().map_or(0, |s| s.rows.len()),
            DatasetSummary::Demographic(a) => a.as_data().map_or(0, |s| s.rows.len()),
            DatasetSummary::Task(a) => a.as_data().map_or(0, |s| s.rows.len()),
            DatasetSummary::Exit(a) => a.as_data().map_or(0, |s| s.rows.len()),
        },
    };
    count.to_string()
}

fn generate_table_of_contents(sections: &[Section]) -> String {
    let mut toc = String::new();

    toc.push_str("## Table of Contents\n\n");
    toc.push_str("- [Metadata](#metadata)\n");
    for section in sections {
        let title = section.dataset().title();
        toc.push_str(&format!("- [{}](#{})\n", title, anchor(title)));
    }
    toc.push('\n');

    toc
}

fn generate_section(section: &Section, options: RenderOptions) -> String {
    let dataset = section.dataset();
    let mut out = format!("## {}\n\n", dataset.title());

    match section {
        Section::Unavailable { reason, .. } => {
            out.push_str(&format!(
                "> ⚠️ **Could not load {} data:** {}\n\n",
                dataset,
                escape_cell(reason)
            ));
        }
        Section::Ready { summary } => {
            let body = match summary {
                DatasetSummary::Consent(a) => render_or_empty(a, dataset, |s| {
                    consent_section(s, options)
                }),
                DatasetSummary::Demographic(a) => render_or_empty(a, dataset, |s| {
                    demographic_section(s, options)
                }),
                DatasetSummary::Task(a) => render_or_empty(a, dataset, |s| task_section(s, options)),
                DatasetSummary::Exit(a) => render_or_empty(a, dataset, |s| exit_section(s, options)),
            };
            out.push_str(&body);
        }
    }

    out
}

fn render_or_empty<T>(
    aggregate: &Aggregate<T>,
    dataset: Dataset,
    render: impl FnOnce(&T) -> String,
) -> String {
    match aggregate {
        Aggregate::NoData => no_data_notice(dataset),
        Aggregate::Data(summary) => render(summary),
    }
}

fn no_data_notice(dataset: Dataset) -> String {
    let label = match dataset {
        Dataset::Exit => "exit questionnaire".to_string(),
        other => other.to_string(),
    };
    format!("*No {} data available yet.*\n\n", label)
}

fn consent_section(summary: &RowsSummary<ConsentRecord>, options: RenderOptions) -> String {
    let given = summary.rows.iter().filter(|r| r.consent_given).count();
    let mut out = format!(
        "**{}** of **{}** submissions gave consent.\n\n",
        given,
        summary.rows.len()
    );

    if options.include_rows {
        let rows: Vec<Vec<String>> = summary
            .rows
            .iter()
            .map(|r| {
                vec![
                    r.timestamp.format(TIMESTAMP_FORMAT).to_string(),
                    r.consent_given.to_string(),
                ]
            })
            .collect();
        out.push_str(&markdown_table(Dataset::Consent.columns(), &rows));
    }

    out
}

fn demographic_section(summary: &RowsSummary<DemographicRecord>, options: RenderOptions) -> String {
    let mut out = String::new();

    if options.include_rows {
        let rows: Vec<Vec<String>> = summary
            .rows
            .iter()
            .map(|r| {
                vec![
                    r.timestamp.format(TIMESTAMP_FORMAT).to_string(),
                    r.name.clone(),
                    r.age.to_string(),
                    r.occupation.clone(),
                    r.familiarity.to_string(),
                ]
            })
            .collect();
        out.push_str(&markdown_table(Dataset::Demographic.columns(), &rows));
    }

    let dist = familiarity_distribution(&summary.rows);
    let mut levels: Vec<_> = dist.iter().collect();
    levels.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
    let max = levels.first().map_or(0, |(_, count)| **count);

    out.push_str("### Participants by Familiarity\n\n");
    out.push_str("| Familiarity | Participants | |\n");
    out.push_str("|:---|:---:|:---|\n");
    for (level, count) in levels {
        out.push_str(&format!(
            "| {} | {} | {} |\n",
            level,
            count,
            bar(*count as f64, max as f64, options.chart_width)
        ));
    }
    out.push('\n');

    out
}

fn task_section(summary: &TaskSummary, options: RenderOptions) -> String {
    let mut out = String::new();

    if options.include_rows {
        let rows: Vec<Vec<String>> = summary
            .rows
            .iter()
            .map(|r| {
                vec![
                    r.timestamp.format(TIMESTAMP_FORMAT).to_string(),
                    r.task_name.clone(),
                    r.success.to_string(),
                    r.duration_seconds
                        .map(|d| format!("{:.2}", d))
                        .unwrap_or_default(),
                    r.notes.clone(),
                ]
            })
            .collect();
        out.push_str(&markdown_table(Dataset::Task.columns(), &rows));
    }

    let max = summary
        .outcome_counts
        .iter()
        .map(|c| c.count)
        .max()
        .unwrap_or(0);

    out.push_str("### Task Completion Outcomes\n\n");
    out.push_str("| Outcome | Count | |\n");
    out.push_str("|:---|:---:|:---|\n");
    for entry in &summary.outcome_counts {
        out.push_str(&format!(
            "| {} {} | {} | {} |\n",
            outcome_emoji(entry.outcome),
            entry.outcome,
            entry.count,
            bar(entry.count as f64, max as f64, options.chart_width)
        ));
    }
    out.push('\n');

    let longest = summary
        .duration_means
        .iter()
        .filter_map(|m| m.mean_seconds)
        .fold(0.0_f64, f64::max);

    out.push_str("### Average Task Duration (seconds)\n\n");
    out.push_str("| Task | Mean (s) | Timed / Attempts | |\n");
    out.push_str("|:---|:---:|:---:|:---|\n");
    for mean in &summary.duration_means {
        let (value, chart) = match mean.mean_seconds {
            Some(seconds) => (
                format!("{:.2}", seconds),
                bar(seconds, longest, options.chart_width),
            ),
            None => ("-".to_string(), String::new()),
        };
        out.push_str(&format!(
            "| {} | {} | {} / {} | {} |\n",
            escape_cell(&mean.task_name),
            value,
            mean.timed,
            mean.attempts,
            chart
        ));
    }
    out.push('\n');

    out
}

fn exit_section(summary: &ExitSummary, options: RenderOptions) -> String {
    let mut out = String::new();

    if options.include_rows {
        let rows: Vec<Vec<String>> = summary
            .rows
            .iter()
            .map(|r| {
                vec![
                    r.timestamp.format(TIMESTAMP_FORMAT).to_string(),
                    r.satisfaction.to_string(),
                    r.difficulty.to_string(),
                    r.open_feedback.clone(),
                ]
            })
            .collect();
        out.push_str(&markdown_table(Dataset::Exit.columns(), &rows));
    }

    out.push_str("### Satisfaction Distribution\n\n");
    out.push_str(&rating_table(
        &summary.satisfaction,
        Rating::satisfaction_label,
        options.chart_width,
    ));

    out.push_str("### Difficulty Distribution\n\n");
    out.push_str(&rating_table(
        &summary.difficulty,
        Rating::difficulty_label,
        options.chart_width,
    ));

    out.push_str("### Average Ratings\n\n");
    out.push_str(&format!(
        "- **Average Satisfaction:** {}\n",
        format_mean(summary.mean_satisfaction)
    ));
    out.push_str(&format!(
        "- **Average Difficulty:** {}\n\n",
        format_mean(summary.mean_difficulty)
    ));

    out
}

fn rating_table(
    distribution: &RatingDistribution,
    label: fn(&Rating) -> &'static str,
    width: usize,
) -> String {
    let max = distribution.iter().map(|(_, c)| c).max().unwrap_or(0);
    let mut out = String::new();

    out.push_str("| Rating | Label | Count | |\n");
    out.push_str("|:---:|:---|:---:|:---|\n");
    for (value, count) in distribution.iter() {
        let text = Rating::new("rating", value)
            .map(|r| label(&r))
            .unwrap_or_default();
        out.push_str(&format!(
            "| {} | {} | {} | {} |\n",
            value,
            text,
            count,
            bar(count as f64, max as f64, width)
        ));
    }
    out.push_str(&format!("\n*{} responses.*\n\n", distribution.total()));

    out
}

fn markdown_table(columns: &[&str], rows: &[Vec<String>]) -> String {
    let mut table = String::new();

    table.push_str(&format!("| {} |\n", columns.join(" | ")));
    table.push_str(&format!(
        "|{}\n",
        columns.iter().map(|_| ":---|").collect::<String>()
    ));
    for row in rows {
        let cells: Vec<String> = row.iter().map(|c| escape_cell(c)).collect();
        table.push_str(&format!("| {} |\n", cells.join(" | ")));
    }
    table.push('\n');

    table
}

/// Escape a value for use inside a Markdown table cell.
fn escape_cell(value: &str) -> String {
    value
        .replace('|', "\\|")
        .replace("\r\n", "<br>")
        .replace('\n', "<br>")
}

/// Horizontal bar scaled so that `max` spans `width` blocks.
fn bar(value: f64, max: f64, width: usize) -> String {
    if value <= 0.0 || max <= 0.0 {
        return String::new();
    }
    let blocks = ((value / max) * width as f64).round().max(1.0) as usize;
    "█".repeat(blocks.min(width))
}

fn outcome_emoji(outcome: TaskOutcome) -> &'static str {
    match outcome {
        TaskOutcome::Yes => "✅",
        TaskOutcome::Partial => "🟡",
        TaskOutcome::No => "❌",
    }
}

fn anchor(title: &str) -> String {
    title.replace(' ', "-").to_lowercase()
}

fn generate_footer() -> String {
    let mut footer = String::new();

    footer.push_str("---\n\n");
    footer.push_str("*Report generated by usarec*\n");

    footer
}
