use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A transcript email found by the locator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptReference {
    /// The meeting name extracted from between the subject quotes
    pub subject: String,
    /// The full subject header as received
    pub raw_subject: String,
    /// Meeting date parsed from the subject, if it parsed
    pub date: Option<NaiveDate>,
    pub message_id: String,
    pub document_id: Option<String>,
    pub participants: Vec<String>,
}

impl TranscriptReference {
    pub fn display_date(&self) -> String {
        self.date
            .map(|d| d.format("%b %d, %Y").to_string())
            .unwrap_or_else(|| "Unknown date".to_string())
    }
}

/// Which named section of the meeting document the text came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceTab {
    Transcript,
    Notes,
    Unknown,
}

impl SourceTab {
    /// Only a verbatim transcript can back attributed quotes.
    pub fn allows_quotes(self) -> bool {
        matches!(self, SourceTab::Transcript)
    }
}

impl fmt::Display for SourceTab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceTab::Transcript => write!(f, "Transcript"),
            SourceTab::Notes => write!(f, "Notes"),
            SourceTab::Unknown => write!(f, "Unknown"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptContent {
    pub source_subject: String,
    pub text: String,
    pub source_tab: SourceTab,
    /// Title of the tab as it appears in the document
    pub tab_title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    pub speaker: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Topic {
    pub title: String,
    pub description: String,
    pub insights: Vec<String>,
    pub quotes: Vec<Quote>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub source_subject: String,
    pub topics: Vec<Topic>,
}

/// Whether the model response had any recognizable structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnalysisStatus {
    Structured,
    /// No topic markers were found; `topics` is empty and the raw response
    /// is kept alongside.
    Unstructured,
}

/// Analyzer output: the parsed result plus the status flag and raw text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Analysis {
    pub result: AnalysisResult,
    pub status: AnalysisStatus,
    pub source_tab: SourceTab,
    pub raw_response: String,
}

impl Analysis {
    pub fn is_degraded(&self) -> bool {
        self.status == AnalysisStatus::Unstructured
    }
}
