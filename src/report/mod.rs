use crate::model::{DATE_FORMAT, TrackerBook, TrackerRecord};
use crate::stats::Stats;
use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

const TOP_TRACKERS: usize = 5;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerMetric {
    pub name: String,
    pub emoji: String,
    pub completions: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsReport {
    pub date: String,
    pub generated_at: String,
    pub trackers: usize,
    pub stats: Stats,
    pub top_trackers: Vec<TrackerMetric>,
}

#[derive(Debug)]
pub struct SavedReport {
    pub markdown_path: PathBuf,
    pub json_path: PathBuf,
}

pub fn build_stats_report(
    date: NaiveDate,
    book: &TrackerBook,
    records: &[TrackerRecord],
    stats: Stats,
) -> StatsReport {
    let completions = records.iter().fold(HashMap::new(), |mut acc, record| {
        *acc.entry(record.tracker_id).or_insert(0_usize) += 1;
        acc
    });

    let mut top_trackers = book
        .trackers()
        .map(|tracker| TrackerMetric {
            name: tracker.name.clone(),
            emoji: tracker.emoji.clone(),
            completions: completions.get(&tracker.id).copied().unwrap_or_default(),
        })
        .filter(|metric| metric.completions > 0)
        .collect::<Vec<_>>();
    top_trackers.sort_by(|left, right| {
        right
            .completions
            .cmp(&left.completions)
            .then_with(|| left.name.cmp(&right.name))
    });
    top_trackers.truncate(TOP_TRACKERS);

    StatsReport {
        date: date.format(DATE_FORMAT).to_string(),
        generated_at: Utc::now().to_rfc3339(),
        trackers: book.len(),
        stats,
        top_trackers,
    }
}

pub fn render_markdown(report: &StatsReport) -> String {
    if report.stats.is_empty() {
        return format!(
            "# Statistics - {}\n\nNothing to analyze yet. Complete a tracker to see statistics.\n",
            report.date
        );
    }

    let stat_rows = report
        .stats
        .rows()
        .iter()
        .map(|(label, value)| format!("| {label} | {value} |"))
        .collect::<Vec<_>>()
        .join("\n");

    let tracker_rows = report
        .top_trackers
        .iter()
        .enumerate()
        .map(|(index, metric)| {
            format!(
                "{}. {} {} - {}",
                index + 1,
                metric.emoji,
                metric.name,
                format_days(metric.completions)
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "# Statistics - {}\n\n| Metric | Value |\n|--------|-------|\n{}\n\n## Most Completed Trackers ({} tracked)\n{}\n",
        report.date, stat_rows, report.trackers, tracker_rows
    )
}

pub fn save_report_files(report: &StatsReport, report_dir: &Path) -> Result<SavedReport> {
    fs::create_dir_all(report_dir).with_context(|| {
        format!(
            "Failed to create report directory: {}",
            report_dir.display()
        )
    })?;

    let markdown_path = report_dir.join(format!("{}-stats.md", report.date));
    let json_path = report_dir.join(format!("{}-stats.json", report.date));

    fs::write(&markdown_path, render_markdown(report)).with_context(|| {
        format!(
            "Failed to write Markdown report: {}",
            markdown_path.display()
        )
    })?;

    let json_content =
        serde_json::to_string_pretty(report).context("Failed to serialize report JSON")?;
    fs::write(&json_path, json_content)
        .with_context(|| format!("Failed to write JSON report: {}", json_path.display()))?;

    Ok(SavedReport {
        markdown_path,
        json_path,
    })
}

pub fn format_days(count: usize) -> String {
    if count == 1 {
        "1 day".to_string()
    } else {
        format!("{count} days")
    }
}
