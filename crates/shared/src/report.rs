use chrono::{DateTime, Local};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::Result;
use crate::models::{Analysis, TranscriptReference};

pub const NO_TOPICS_NOTICE: &str = "No structured topics found in the analysis.";

const MAX_FILENAME_TITLE: usize = 50;

/// Render an analysis as the markdown report format.
pub fn render_markdown(analysis: &Analysis) -> String {
    let mut md = String::new();
    md.push_str(&format!(
        "**Source:** {}\n\n",
        analysis.result.source_subject
    ));

    if analysis.result.topics.is_empty() {
        md.push_str(&format!("*{}*\n", NO_TOPICS_NOTICE));
        let raw = analysis.raw_response.trim();
        if !raw.is_empty() {
            md.push_str("\n---\n\n");
            md.push_str(raw);
            md.push('\n');
        }
        return md;
    }

    for (i, topic) in analysis.result.topics.iter().enumerate() {
        if i > 0 {
            md.push_str("---\n\n");
        }

        md.push_str(&format!("## TOPIC {}: {}\n\n", i + 1, topic.title));
        md.push_str(&format!("**Description:** {}\n\n", topic.description));

        md.push_str("**Key Insights:**\n");
        for insight in &topic.insights {
            md.push_str(&format!("- {}\n", insight));
        }
        md.push('\n');

        if !topic.quotes.is_empty() {
            md.push_str("**Notable Quotes:**\n");
            for quote in &topic.quotes {
                md.push_str(&format!("> **{}:** \"{}\"\n", quote.speaker, quote.text));
            }
            md.push('\n');
        }
    }

    md
}

fn sanitize_title(title: &str) -> String {
    title
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .take(MAX_FILENAME_TITLE)
        .collect()
}

/// `analysis_<first topic title>_<YYYYMMDD_HHMMSS>.md`, falling back to the
/// source subject when there are no topics.
pub fn report_filename(analysis: &Analysis, now: DateTime<Local>) -> String {
    let title = analysis
        .result
        .topics
        .first()
        .map(|t| t.title.as_str())
        .unwrap_or(&analysis.result.source_subject);

    format!(
        "analysis_{}_{}.md",
        sanitize_title(title),
        now.format("%Y%m%d_%H%M%S")
    )
}

/// Render a batch into one report, one numbered section per transcript.
/// Unstructured results are left out; `None` when nothing is left.
pub fn render_combined(
    entries: &[(TranscriptReference, Analysis)],
    now: DateTime<Local>,
) -> Option<String> {
    let valid: Vec<_> = entries
        .iter()
        .filter(|(_, analysis)| !analysis.is_degraded())
        .collect();
    if valid.is_empty() {
        return None;
    }

    let mut md = String::from("# Combined Analysis Report\n\n");
    md.push_str(&format!(
        "**Generated:** {}\n",
        now.format("%B %d, %Y at %I:%M %p")
    ));
    md.push_str(&format!("**Total Transcripts:** {}\n\n", valid.len()));
    md.push_str("---\n\n");

    for (i, (reference, analysis)) in valid.iter().enumerate() {
        md.push_str(&format!("# {}. {}\n", i + 1, reference.subject));
        md.push_str(&format!("**Date:** {}\n\n", reference.display_date()));
        md.push_str("---\n\n");
        md.push_str(&render_markdown(analysis));
        md.push('\n');

        if i + 1 < valid.len() {
            md.push_str(&format!("\n{}\n\n", "=".repeat(80)));
        }
    }

    Some(md)
}

/// Pick a path in `dir` that does not exist yet, appending `_2`, `_3`, ...
fn unique_path(dir: &Path, filename: &str) -> PathBuf {
    let candidate = dir.join(filename);
    if !candidate.exists() {
        return candidate;
    }

    let stem = filename.strip_suffix(".md").unwrap_or(filename);
    (2..)
        .map(|n| dir.join(format!("{stem}_{n}.md")))
        .find(|path| !path.exists())
        .unwrap_or(candidate)
}

pub struct ReportWriter {
    output_dir: PathBuf,
}

impl ReportWriter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn save(&self, analysis: &Analysis) -> Result<PathBuf> {
        self.save_at(analysis, Local::now())
    }

    pub fn save_at(&self, analysis: &Analysis, now: DateTime<Local>) -> Result<PathBuf> {
        fs::create_dir_all(&self.output_dir)?;

        let path = unique_path(&self.output_dir, &report_filename(analysis, now));
        fs::write(&path, render_markdown(analysis))?;

        info!("Saved analysis to {}", path.display());
        Ok(path)
    }

    /// Save a batch as `analysis_combined_<YYYYMMDD_HHMMSS>.md`. Returns
    /// `None` without writing when every entry is unstructured.
    pub fn save_combined(
        &self,
        entries: &[(TranscriptReference, Analysis)],
    ) -> Result<Option<PathBuf>> {
        self.save_combined_at(entries, Local::now())
    }

    pub fn save_combined_at(
        &self,
        entries: &[(TranscriptReference, Analysis)],
        now: DateTime<Local>,
    ) -> Result<Option<PathBuf>> {
        let Some(content) = render_combined(entries, now) else {
            return Ok(None);
        };

        fs::create_dir_all(&self.output_dir)?;
        let filename = format!("analysis_combined_{}.md", now.format("%Y%m%d_%H%M%S"));
        let path = unique_path(&self.output_dir, &filename);
        fs::write(&path, content)?;

        info!("Saved combined analysis of {} transcripts to {}", entries.len(), path.display());
        Ok(Some(path))
    }
}
