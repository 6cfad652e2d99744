//! Interactive session: list transcripts, take a selection, then extract,
//! analyze, review and optionally save each selected item in turn.

use chrono::NaiveDate;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::analyzer::Analyze;
use crate::error::{Error, Result};
use crate::extractor::Extract;
use crate::locator::{match_subject, Locate, TranscriptQuery};
use crate::models::{Analysis, SourceTab, TranscriptReference};
use crate::report::ReportWriter;

/// A parsed answer to the selection prompt. Indices are 0-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    One(usize),
    All,
    /// Inclusive range
    Range(usize, usize),
    Quit,
}

impl Selection {
    /// The references to process, in listed order.
    pub fn indices(&self, len: usize) -> Vec<usize> {
        match *self {
            Selection::One(i) => vec![i],
            Selection::All => (0..len).collect(),
            Selection::Range(start, end) => (start..=end).collect(),
            Selection::Quit => Vec::new(),
        }
    }
}

/// Parse a 1-based selection: `3`, `all`, `2-4`, or `q`/`quit`.
pub fn parse_selection(input: &str, len: usize) -> Result<Selection> {
    let input = input.trim().to_lowercase();

    match input.as_str() {
        "" => return Err(Error::InvalidSelection("nothing entered".to_string())),
        "q" | "quit" => return Ok(Selection::Quit),
        "all" | "a" => {
            if len == 0 {
                return Err(Error::InvalidSelection("nothing to select".to_string()));
            }
            return Ok(Selection::All);
        }
        _ => {}
    }

    let position = |raw: &str| -> Result<usize> {
        let n: usize = raw
            .trim()
            .parse()
            .map_err(|_| Error::InvalidSelection(format!("'{}' is not a number", raw.trim())))?;
        if n == 0 || n > len {
            return Err(Error::InvalidSelection(format!(
                "{n} is out of range (1-{len})"
            )));
        }
        Ok(n - 1)
    };

    if let Some((start, end)) = input.split_once('-') {
        let start = position(start)?;
        let end = position(end)?;
        if start > end {
            return Err(Error::InvalidSelection(format!(
                "range start {} is after end {}",
                start + 1,
                end + 1
            )));
        }
        return Ok(Selection::Range(start, end));
    }

    position(&input).map(Selection::One)
}

/// Save behaviour chosen up front for a multi-item batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchSave {
    /// One combined report for the whole batch
    Combined,
    SaveAll,
    SkipAll,
    AskEach,
}

/// Status messages the controller hands to the prompter for display.
#[derive(Debug)]
pub enum Notice<'a> {
    /// Listing came back empty
    NoTranscripts(&'a Error),
    /// A direct lookup matched nothing
    NoMatch { needle: &'a str, error: &'a Error },
    InvalidSelection(&'a Error),
    Analyzing {
        position: usize,
        total: usize,
        subject: &'a str,
    },
    TabSelected { tab: SourceTab, title: &'a str },
    NoTopics,
    ItemFailed { subject: &'a str, error: &'a Error },
    Saved(&'a Path),
    /// A combined save had no structured results to write
    NothingToSave,
    SaveFailed(&'a Error),
}

/// Terminal interaction, kept behind a trait so the session logic runs
/// without a real terminal. `None` from a reader means end of input.
pub trait Prompter {
    /// Offer a start-date filter before listing. `None` means no filter.
    fn read_start_date(&mut self) -> Option<NaiveDate>;
    fn show_references(&mut self, references: &[TranscriptReference]);
    fn read_selection(&mut self, count: usize) -> Option<String>;
    fn show_result(&mut self, analysis: &Analysis);
    fn confirm_save(&mut self) -> Option<bool>;
    fn batch_save_preference(&mut self, count: usize) -> Option<BatchSave>;
    fn continue_batch(&mut self) -> Option<bool>;
    fn notify(&mut self, notice: Notice<'_>);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

pub struct Controller {
    locator: Arc<dyn Locate>,
    extractor: Arc<dyn Extract>,
    analyzer: Arc<dyn Analyze>,
    writer: ReportWriter,
}

impl Controller {
    pub fn new(
        locator: Arc<dyn Locate>,
        extractor: Arc<dyn Extract>,
        analyzer: Arc<dyn Analyze>,
        writer: ReportWriter,
    ) -> Self {
        Self {
            locator,
            extractor,
            analyzer,
            writer,
        }
    }

    /// `--list`: show what would be offered, then stop.
    pub async fn run_list(&self, prompter: &mut dyn Prompter, query: &TranscriptQuery) -> Result<()> {
        self.listing(prompter, query).await?;
        Ok(())
    }

    pub async fn run_interactive(
        &self,
        prompter: &mut dyn Prompter,
        query: &TranscriptQuery,
    ) -> Result<()> {
        let mut query = query.clone();
        if query.label.is_none() && query.start_date.is_none() {
            query.start_date = prompter.read_start_date();
        }

        let references = self.listing(prompter, &query).await?;
        if references.is_empty() {
            return Ok(());
        }
        self.selecting(prompter, &references).await
    }

    /// `--email`: a single match is analyzed straight away; several go
    /// through the usual selection prompt; none lists everything instead.
    pub async fn run_direct(
        &self,
        prompter: &mut dyn Prompter,
        query: &TranscriptQuery,
        needle: &str,
    ) -> Result<()> {
        let references = self.locator.find(query).await?;
        let matches = match_subject(&references, needle);
        debug!("'{}' matched {} of {} references", needle, matches.len(), references.len());

        match matches.len() {
            0 => {
                let error = Error::NoTranscriptsFound;
                prompter.notify(Notice::NoMatch {
                    needle,
                    error: &error,
                });
                if references.is_empty() {
                    prompter.notify(Notice::NoTranscripts(&error));
                    return Ok(());
                }
                prompter.show_references(&references);
                self.selecting(prompter, &references).await
            }
            1 => {
                self.analyzing(prompter, &matches, &[0]).await?;
                Ok(())
            }
            _ => {
                prompter.show_references(&matches);
                self.selecting(prompter, &matches).await
            }
        }
    }

    async fn listing(
        &self,
        prompter: &mut dyn Prompter,
        query: &TranscriptQuery,
    ) -> Result<Vec<TranscriptReference>> {
        let references = self.locator.find(query).await?;
        if references.is_empty() {
            prompter.notify(Notice::NoTranscripts(&Error::NoTranscriptsFound));
        } else {
            prompter.show_references(&references);
        }
        Ok(references)
    }

    async fn selecting(
        &self,
        prompter: &mut dyn Prompter,
        references: &[TranscriptReference],
    ) -> Result<()> {
        loop {
            let Some(input) = prompter.read_selection(references.len()) else {
                return Ok(());
            };

            let selection = match parse_selection(&input, references.len()) {
                Ok(selection) => selection,
                Err(e) => {
                    prompter.notify(Notice::InvalidSelection(&e));
                    continue;
                }
            };

            if selection == Selection::Quit {
                return Ok(());
            }

            let indices = selection.indices(references.len());
            if self.analyzing(prompter, references, &indices).await? == Flow::Quit {
                return Ok(());
            }

            prompter.show_references(references);
        }
    }

    /// Process the chosen references strictly one after another.
    async fn analyzing(
        &self,
        prompter: &mut dyn Prompter,
        references: &[TranscriptReference],
        indices: &[usize],
    ) -> Result<Flow> {
        let preference = if indices.len() > 1 {
            match prompter.batch_save_preference(indices.len()) {
                Some(preference) => preference,
                None => return Ok(Flow::Quit),
            }
        } else {
            BatchSave::AskEach
        };

        let mut combined = Vec::new();
        let flow = self
            .batch(prompter, references, indices, preference, &mut combined)
            .await;

        if preference == BatchSave::Combined {
            self.saving_combined(prompter, &combined);
        }
        flow
    }

    async fn batch(
        &self,
        prompter: &mut dyn Prompter,
        references: &[TranscriptReference],
        indices: &[usize],
        preference: BatchSave,
        combined: &mut Vec<(TranscriptReference, Analysis)>,
    ) -> Result<Flow> {
        let total = indices.len();

        for (position, &index) in indices.iter().enumerate() {
            let reference = &references[index];
            prompter.notify(Notice::Analyzing {
                position: position + 1,
                total,
                subject: &reference.subject,
            });

            match self.process(prompter, reference).await {
                Ok(analysis) => {
                    if self.reviewing(prompter, &analysis, preference) == Flow::Quit {
                        return Ok(Flow::Quit);
                    }
                    if preference == BatchSave::Combined {
                        combined.push((reference.clone(), analysis));
                    }
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    warn!("Skipping '{}': {}", reference.subject, e);
                    prompter.notify(Notice::ItemFailed {
                        subject: &reference.subject,
                        error: &e,
                    });
                }
            }

            if position + 1 < total {
                match prompter.continue_batch() {
                    Some(true) => {}
                    Some(false) => return Ok(Flow::Continue),
                    None => return Ok(Flow::Quit),
                }
            }
        }

        Ok(Flow::Continue)
    }

    async fn process(
        &self,
        prompter: &mut dyn Prompter,
        reference: &TranscriptReference,
    ) -> Result<Analysis> {
        let content = self.extractor.extract(reference).await?;
        prompter.notify(Notice::TabSelected {
            tab: content.source_tab,
            title: &content.tab_title,
        });

        self.analyzer.analyze(&content).await
    }

    fn reviewing(
        &self,
        prompter: &mut dyn Prompter,
        analysis: &Analysis,
        preference: BatchSave,
    ) -> Flow {
        if analysis.result.topics.is_empty() {
            prompter.notify(Notice::NoTopics);
        }
        prompter.show_result(analysis);

        let save = match preference {
            BatchSave::SaveAll => true,
            BatchSave::SkipAll | BatchSave::Combined => false,
            BatchSave::AskEach => match prompter.confirm_save() {
                Some(answer) => answer,
                None => return Flow::Quit,
            },
        };

        if save {
            self.saving(prompter, analysis);
        }
        Flow::Continue
    }

    fn saving_combined(
        &self,
        prompter: &mut dyn Prompter,
        entries: &[(TranscriptReference, Analysis)],
    ) {
        match self.writer.save_combined(entries) {
            Ok(Some(path)) => prompter.notify(Notice::Saved(&path)),
            Ok(None) => prompter.notify(Notice::NothingToSave),
            Err(e) => {
                warn!("Failed to save combined analysis: {}", e);
                prompter.notify(Notice::SaveFailed(&e));
            }
        }
    }

    fn saving(&self, prompter: &mut dyn Prompter, analysis: &Analysis) {
        match self.writer.save(analysis) {
            Ok(path) => prompter.notify(Notice::Saved(&path)),
            Err(e) => {
                warn!("Failed to save analysis: {}", e);
                prompter.notify(Notice::SaveFailed(&e));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::ContentAnalyzer;
    use crate::testing::{reference, FakeExtractor, FakeModel, ScriptedPrompter, StaticLocator};

    const STRUCTURED: &str = "## TOPIC 1: Edge AI\n\
        **Description:** Models move to devices.\n\
        **Key Insights:**\n\
        - Latency matters\n\
        **Notable Quotes:**\n\
        > **Jane:** \"we shipped it on the phone\"\n";

    const TRANSCRIPT: &str = "Jane: honestly we shipped it on the phone last week";

    fn five_references() -> Vec<TranscriptReference> {
        (1..=5)
            .map(|n| reference(&format!("m{n}"), &format!("Meeting {n}")))
            .collect()
    }

    struct Harness {
        controller: Controller,
        locator: Arc<StaticLocator>,
        extractor: Arc<FakeExtractor>,
        model: Arc<FakeModel>,
        output: tempfile::TempDir,
    }

    fn harness(references: Vec<TranscriptReference>, tab: SourceTab, reply: &str) -> Harness {
        let extractor = Arc::new(FakeExtractor::new());
        for r in &references {
            extractor.add(&r.message_id, &r.subject, tab, TRANSCRIPT);
        }
        let model = Arc::new(FakeModel::replying(reply));
        let output = tempfile::tempdir().unwrap();
        let locator = Arc::new(StaticLocator::new(references));

        let controller = Controller::new(
            locator.clone(),
            extractor.clone(),
            Arc::new(ContentAnalyzer::new(model.clone(), "AI strategy")),
            ReportWriter::new(output.path()),
        );

        Harness {
            controller,
            locator,
            extractor,
            model,
            output,
        }
    }

    fn saved_files(dir: &tempfile::TempDir) -> usize {
        std::fs::read_dir(dir.path()).unwrap().count()
    }

    // ==================== Selection Parsing Tests ====================

    #[test]
    fn test_parse_single_index() {
        assert_eq!(parse_selection("3", 5).unwrap(), Selection::One(2));
        assert_eq!(parse_selection(" 1 ", 5).unwrap(), Selection::One(0));
    }

    #[test]
    fn test_parse_all_and_quit() {
        assert_eq!(parse_selection("ALL", 5).unwrap(), Selection::All);
        assert_eq!(parse_selection("q", 5).unwrap(), Selection::Quit);
        assert_eq!(parse_selection("quit", 5).unwrap(), Selection::Quit);
    }

    #[test]
    fn test_parse_range() {
        let selection = parse_selection("2-4", 5).unwrap();
        assert_eq!(selection, Selection::Range(1, 3));
        assert_eq!(selection.indices(5), vec![1, 2, 3]);
        assert_eq!(parse_selection("3-3", 5).unwrap().indices(5), vec![2]);
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        for input in ["4-2", "0", "6", "2-6", "abc", "", "1-", "-"] {
            assert!(
                matches!(parse_selection(input, 5), Err(Error::InvalidSelection(_))),
                "expected '{input}' to be rejected"
            );
        }
    }

    // ==================== Session Tests ====================

    #[tokio::test]
    async fn test_range_analyzes_items_in_listed_order() {
        let h = harness(five_references(), SourceTab::Transcript, STRUCTURED);
        let mut prompter = ScriptedPrompter::new(&["2-4", "q"])
            .with_batch_preference(BatchSave::SkipAll)
            .with_continue(&[true, true]);

        h.controller
            .run_interactive(&mut prompter, &TranscriptQuery::default())
            .await
            .unwrap();

        assert_eq!(h.extractor.extracted(), vec!["m2", "m3", "m4"]);
        assert_eq!(h.model.prompts().len(), 3);
        assert_eq!(prompter.results.len(), 3);
        assert_eq!(saved_files(&h.output), 0);
    }

    #[tokio::test]
    async fn test_reversed_range_reprompts_without_analyzing() {
        let h = harness(five_references(), SourceTab::Transcript, STRUCTURED);
        let mut prompter = ScriptedPrompter::new(&["4-2", "q"]);

        h.controller
            .run_interactive(&mut prompter, &TranscriptQuery::default())
            .await
            .unwrap();

        assert!(h.extractor.extracted().is_empty());
        assert_eq!(prompter.count("invalid"), 1);
        assert_eq!(prompter.selection_prompts, 2);
    }

    #[tokio::test]
    async fn test_single_item_asks_before_saving() {
        let h = harness(five_references(), SourceTab::Transcript, STRUCTURED);
        let mut prompter = ScriptedPrompter::new(&["1", "q"]).with_save_answers(&[true]);

        h.controller
            .run_interactive(&mut prompter, &TranscriptQuery::default())
            .await
            .unwrap();

        assert_eq!(prompter.save_prompts, 1);
        assert_eq!(prompter.count("saved"), 1);
        assert_eq!(saved_files(&h.output), 1);

        let result = &prompter.results[0];
        assert_eq!(result.result.topics[0].quotes.len(), 1);
    }

    #[tokio::test]
    async fn test_batch_save_all_skips_per_item_prompt() {
        let h = harness(five_references(), SourceTab::Transcript, STRUCTURED);
        let mut prompter = ScriptedPrompter::new(&["1-2", "q"])
            .with_batch_preference(BatchSave::SaveAll)
            .with_continue(&[true]);

        h.controller
            .run_interactive(&mut prompter, &TranscriptQuery::default())
            .await
            .unwrap();

        assert_eq!(prompter.save_prompts, 0);
        assert_eq!(saved_files(&h.output), 2);
    }

    #[tokio::test]
    async fn test_combined_batch_writes_one_report() {
        let h = harness(five_references(), SourceTab::Transcript, STRUCTURED);
        let mut prompter = ScriptedPrompter::new(&["1-3", "q"])
            .with_batch_preference(BatchSave::Combined)
            .with_continue(&[true, true]);

        h.controller
            .run_interactive(&mut prompter, &TranscriptQuery::default())
            .await
            .unwrap();

        assert_eq!(prompter.save_prompts, 0);
        assert_eq!(prompter.count("saved"), 1);

        let files: Vec<_> = std::fs::read_dir(h.output.path())
            .unwrap()
            .map(|entry| entry.unwrap().path())
            .collect();
        assert_eq!(files.len(), 1);

        let name = files[0].file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("analysis_combined_"));

        let saved = std::fs::read_to_string(&files[0]).unwrap();
        assert!(saved.contains("**Total Transcripts:** 3"));
        assert!(saved.contains("# 3. Meeting 3"));
    }

    #[tokio::test]
    async fn test_combined_batch_stopped_early_keeps_finished_items() {
        let h = harness(five_references(), SourceTab::Transcript, STRUCTURED);
        let mut prompter = ScriptedPrompter::new(&["1-3", "q"])
            .with_batch_preference(BatchSave::Combined)
            .with_continue(&[true, false]);

        h.controller
            .run_interactive(&mut prompter, &TranscriptQuery::default())
            .await
            .unwrap();

        assert_eq!(h.extractor.extracted(), vec!["m1", "m2"]);
        assert_eq!(saved_files(&h.output), 1);

        let path = std::fs::read_dir(h.output.path())
            .unwrap()
            .next()
            .unwrap()
            .unwrap()
            .path();
        let saved = std::fs::read_to_string(path).unwrap();
        assert!(saved.contains("**Total Transcripts:** 2"));
    }

    #[tokio::test]
    async fn test_combined_batch_of_degraded_results_saves_nothing() {
        let h = harness(five_references(), SourceTab::Transcript, "Nothing to see.");
        let mut prompter = ScriptedPrompter::new(&["1-2", "q"])
            .with_batch_preference(BatchSave::Combined)
            .with_continue(&[true]);

        h.controller
            .run_interactive(&mut prompter, &TranscriptQuery::default())
            .await
            .unwrap();

        assert_eq!(prompter.count("nothing-to-save"), 1);
        assert_eq!(saved_files(&h.output), 0);
    }

    #[tokio::test]
    async fn test_batch_ask_each_prompts_per_item() {
        let h = harness(five_references(), SourceTab::Transcript, STRUCTURED);
        let mut prompter = ScriptedPrompter::new(&["1-2", "q"])
            .with_batch_preference(BatchSave::AskEach)
            .with_save_answers(&[false, true])
            .with_continue(&[true]);

        h.controller
            .run_interactive(&mut prompter, &TranscriptQuery::default())
            .await
            .unwrap();

        assert_eq!(prompter.save_prompts, 2);
        assert_eq!(saved_files(&h.output), 1);
    }

    #[tokio::test]
    async fn test_declining_to_continue_returns_to_selection() {
        let h = harness(five_references(), SourceTab::Transcript, STRUCTURED);
        let mut prompter = ScriptedPrompter::new(&["all", "5", "q"])
            .with_batch_preference(BatchSave::SkipAll)
            .with_continue(&[false])
            .with_save_answers(&[false]);

        h.controller
            .run_interactive(&mut prompter, &TranscriptQuery::default())
            .await
            .unwrap();

        assert_eq!(h.extractor.extracted(), vec!["m1", "m5"]);
        assert_eq!(prompter.selection_prompts, 3);
    }

    #[tokio::test]
    async fn test_batch_continues_past_item_failure() {
        let h = harness(five_references(), SourceTab::Transcript, STRUCTURED);
        h.extractor.remove("m2");
        let mut prompter = ScriptedPrompter::new(&["1-3", "q"])
            .with_batch_preference(BatchSave::SkipAll)
            .with_continue(&[true, true]);

        h.controller
            .run_interactive(&mut prompter, &TranscriptQuery::default())
            .await
            .unwrap();

        assert_eq!(h.extractor.extracted(), vec!["m1", "m2", "m3"]);
        assert_eq!(prompter.count("failed"), 1);
        assert_eq!(prompter.results.len(), 2);
    }

    #[tokio::test]
    async fn test_notes_tab_result_has_no_quotes() {
        let h = harness(five_references(), SourceTab::Notes, STRUCTURED);
        let mut prompter = ScriptedPrompter::new(&["1", "q"]).with_save_answers(&[true]);

        h.controller
            .run_interactive(&mut prompter, &TranscriptQuery::default())
            .await
            .unwrap();

        assert_eq!(prompter.count("tab:Notes"), 1);
        assert!(prompter.results[0]
            .result
            .topics
            .iter()
            .all(|t| t.quotes.is_empty()));
        assert!(!h.model.prompts()[0].contains("**Notable Quotes:**"));

        let path = std::fs::read_dir(h.output.path())
            .unwrap()
            .next()
            .unwrap()
            .unwrap()
            .path();
        let saved = std::fs::read_to_string(path).unwrap();
        assert!(!saved.contains("**Notable Quotes:**"));
    }

    #[tokio::test]
    async fn test_unstructured_response_shows_notice() {
        let h = harness(five_references(), SourceTab::Transcript, "Nothing to see.");
        let mut prompter = ScriptedPrompter::new(&["1", "q"]).with_save_answers(&[false]);

        h.controller
            .run_interactive(&mut prompter, &TranscriptQuery::default())
            .await
            .unwrap();

        assert_eq!(prompter.count("no-topics"), 1);
        assert_eq!(prompter.count("failed"), 0);
        assert!(prompter.results[0].is_degraded());
    }

    #[tokio::test]
    async fn test_end_of_input_quits() {
        let h = harness(five_references(), SourceTab::Transcript, STRUCTURED);
        let mut prompter = ScriptedPrompter::new(&[]);

        h.controller
            .run_interactive(&mut prompter, &TranscriptQuery::default())
            .await
            .unwrap();

        assert_eq!(prompter.selection_prompts, 1);
        assert!(h.extractor.extracted().is_empty());
    }

    #[tokio::test]
    async fn test_empty_listing_is_not_an_error() {
        let h = harness(vec![], SourceTab::Transcript, STRUCTURED);
        let mut prompter = ScriptedPrompter::new(&["1"]);

        h.controller
            .run_interactive(&mut prompter, &TranscriptQuery::default())
            .await
            .unwrap();

        assert_eq!(prompter.events, vec!["no-transcripts:NoTranscriptsFound"]);
        assert_eq!(prompter.selection_prompts, 0);
    }

    #[tokio::test]
    async fn test_start_date_prompt_filters_listing() {
        let h = harness(five_references(), SourceTab::Transcript, STRUCTURED);
        let start = NaiveDate::from_ymd_opt(2025, 2, 1).unwrap();
        let mut prompter = ScriptedPrompter::new(&["q"]).with_start_date(start);

        h.controller
            .run_interactive(&mut prompter, &TranscriptQuery::default())
            .await
            .unwrap();

        assert_eq!(prompter.start_date_prompts, 1);
        assert_eq!(h.locator.queries()[0].start_date, Some(start));
    }

    #[tokio::test]
    async fn test_start_date_prompt_skipped_when_filter_given() {
        let h = harness(five_references(), SourceTab::Transcript, STRUCTURED);
        let start = NaiveDate::from_ymd_opt(2025, 2, 1).unwrap();
        let mut prompter = ScriptedPrompter::new(&["q", "q"]).with_start_date(start);

        let labelled = TranscriptQuery {
            label: Some("Meetings".to_string()),
            start_date: None,
        };
        h.controller
            .run_interactive(&mut prompter, &labelled)
            .await
            .unwrap();

        let dated = TranscriptQuery {
            label: None,
            start_date: NaiveDate::from_ymd_opt(2025, 1, 1),
        };
        h.controller
            .run_interactive(&mut prompter, &dated)
            .await
            .unwrap();

        assert_eq!(prompter.start_date_prompts, 0);
        assert_eq!(h.locator.queries(), vec![labelled, dated]);
    }

    #[tokio::test]
    async fn test_list_only_never_prompts() {
        let h = harness(five_references(), SourceTab::Transcript, STRUCTURED);
        let mut prompter = ScriptedPrompter::new(&["1"]);

        h.controller
            .run_list(&mut prompter, &TranscriptQuery::default())
            .await
            .unwrap();

        assert_eq!(prompter.listings, vec![5]);
        assert_eq!(prompter.selection_prompts, 0);
    }

    #[tokio::test]
    async fn test_direct_single_match_analyzes_immediately() {
        let h = harness(five_references(), SourceTab::Transcript, STRUCTURED);
        let mut prompter = ScriptedPrompter::new(&[]).with_save_answers(&[false]);

        h.controller
            .run_direct(&mut prompter, &TranscriptQuery::default(), "meeting 3")
            .await
            .unwrap();

        assert_eq!(h.extractor.extracted(), vec!["m3"]);
        assert_eq!(prompter.selection_prompts, 0);
    }

    #[tokio::test]
    async fn test_direct_multiple_matches_offer_selection() {
        let mut references = five_references();
        references.push(reference("m6", "Meeting 3 follow-up"));
        let h = harness(references, SourceTab::Transcript, STRUCTURED);
        let mut prompter = ScriptedPrompter::new(&["2", "q"]).with_save_answers(&[false]);

        h.controller
            .run_direct(&mut prompter, &TranscriptQuery::default(), "MEETING 3")
            .await
            .unwrap();

        assert_eq!(prompter.listings[0], 2);
        assert_eq!(h.extractor.extracted(), vec!["m6"]);
    }

    #[tokio::test]
    async fn test_direct_no_match_lists_everything() {
        let h = harness(five_references(), SourceTab::Transcript, STRUCTURED);
        let mut prompter = ScriptedPrompter::new(&["q"]);

        h.controller
            .run_direct(&mut prompter, &TranscriptQuery::default(), "budget")
            .await
            .unwrap();

        assert_eq!(prompter.events, vec!["no-match:budget:NoTranscriptsFound"]);
        assert_eq!(prompter.listings, vec![5]);
        assert!(h.extractor.extracted().is_empty());
    }

    #[tokio::test]
    async fn test_fatal_error_ends_session() {
        let h = harness(five_references(), SourceTab::Transcript, STRUCTURED);
        h.extractor.fail_auth("m1");
        let mut prompter = ScriptedPrompter::new(&["1-2", "q"])
            .with_batch_preference(BatchSave::SkipAll)
            .with_continue(&[true]);

        let err = h
            .controller
            .run_interactive(&mut prompter, &TranscriptQuery::default())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::AuthenticationFailure(_)));
        assert_eq!(h.extractor.extracted(), vec!["m1"]);
    }
}
