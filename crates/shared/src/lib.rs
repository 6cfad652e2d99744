// Public modules
pub mod analyzer;
pub mod config;
pub mod controller;
pub mod docs;
pub mod error;
pub mod extractor;
pub mod label;
pub mod locator;
pub mod mail;
pub mod models;
pub mod report;
pub mod session;
pub mod subject;

#[cfg(test)]
mod testing;

// Re-export commonly used types
pub use analyzer::{Analyze, ClaudeClient, ContentAnalyzer, LanguageModel};
pub use config::{parse_start_date, Config};
pub use controller::{BatchSave, Controller, Notice, Prompter, Selection};
pub use docs::{DocsClient, DocumentBackend};
pub use error::{Error, Result};
pub use extractor::{Extract, SectionMatcher, SectionPolicy, TranscriptExtractor};
pub use locator::{EmailLocator, ExclusionFilters, Locate, TranscriptQuery};
pub use mail::{GmailClient, MailBackend};
pub use models::{
    Analysis, AnalysisResult, AnalysisStatus, Quote, SourceTab, Topic, TranscriptContent,
    TranscriptReference,
};
pub use report::{render_markdown, ReportWriter, NO_TOPICS_NOTICE};
pub use session::GoogleSession;
