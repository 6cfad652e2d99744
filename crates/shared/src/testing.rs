//! In-memory backends and a scripted prompter for unit tests.

use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};

use crate::analyzer::LanguageModel;
use crate::controller::{BatchSave, Notice, Prompter};
use crate::docs::{Document, DocumentBackend};
use crate::error::{Error, Result};
use crate::extractor::Extract;
use crate::label::MailLabel;
use crate::locator::{Locate, TranscriptQuery};
use crate::mail::{MailBackend, MailMessage, MessageBody};
use crate::models::{Analysis, SourceTab, TranscriptContent, TranscriptReference};
use crate::session::{GoogleSession, GoogleToken};

pub fn test_session() -> Arc<GoogleSession> {
    let token = GoogleToken {
        token: "test-token".to_string(),
        refresh_token: None,
        token_uri: "https://oauth2.googleapis.com/token".to_string(),
        client_id: "client".to_string(),
        client_secret: None,
        scopes: vec![],
        expiry: Some("2999-01-01T00:00:00Z".to_string()),
        account: Some("tester@example.com".to_string()),
    };
    Arc::new(GoogleSession::with_token(token, None).unwrap())
}

pub fn message(id: &str, subject: &str, labels: &[&str], participants: &[&str]) -> MailMessage {
    MailMessage {
        id: id.to_string(),
        subject: subject.to_string(),
        label_ids: labels.iter().map(|l| l.to_string()).collect(),
        participants: participants.iter().map(|p| p.to_string()).collect(),
    }
}

pub fn reference(message_id: &str, subject: &str) -> TranscriptReference {
    TranscriptReference {
        subject: subject.to_string(),
        raw_subject: format!("Notes: \"{subject}\""),
        date: None,
        message_id: message_id.to_string(),
        document_id: None,
        participants: vec![],
    }
}

// ==================== Mail ====================

#[derive(Default)]
pub struct FakeMail {
    labels: Vec<MailLabel>,
    messages: Vec<MailMessage>,
    bodies: HashMap<String, MessageBody>,
    failing: bool,
    searched: Mutex<Vec<(String, Option<String>)>>,
}

impl FakeMail {
    pub fn new(labels: Vec<MailLabel>, messages: Vec<MailMessage>) -> Self {
        Self {
            labels,
            messages,
            ..Self::default()
        }
    }

    pub fn with_body(message_id: &str, body: MessageBody) -> Self {
        let mut mail = Self::default();
        mail.bodies.insert(message_id.to_string(), body);
        mail
    }

    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    pub fn searched_labels(&self) -> Vec<Option<String>> {
        self.searched
            .lock()
            .unwrap()
            .iter()
            .map(|(_, label)| label.clone())
            .collect()
    }

    pub fn searched_queries(&self) -> Vec<String> {
        self.searched
            .lock()
            .unwrap()
            .iter()
            .map(|(query, _)| query.clone())
            .collect()
    }

    fn check(&self) -> Result<()> {
        if self.failing {
            return Err(Error::MailBackend {
                status: 503,
                message: "backend unavailable".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl MailBackend for FakeMail {
    async fn list_labels(&self, _session: &GoogleSession) -> Result<Vec<MailLabel>> {
        self.check()?;
        Ok(self.labels.clone())
    }

    async fn search_messages(
        &self,
        _session: &GoogleSession,
        query: &str,
        label_id: Option<&str>,
    ) -> Result<Vec<MailMessage>> {
        self.check()?;
        self.searched
            .lock()
            .unwrap()
            .push((query.to_string(), label_id.map(str::to_string)));
        Ok(self
            .messages
            .iter()
            .filter(|m| label_id.map_or(true, |id| m.label_ids.iter().any(|l| l == id)))
            .cloned()
            .collect())
    }

    async fn fetch_body(&self, _session: &GoogleSession, message_id: &str) -> Result<MessageBody> {
        self.check()?;
        self.bodies
            .get(message_id)
            .cloned()
            .ok_or_else(|| Error::MailBackend {
                status: 404,
                message: format!("no message {message_id}"),
            })
    }
}

// ==================== Docs ====================

pub struct FakeDocs {
    documents: Vec<Document>,
    fetched: Mutex<Vec<String>>,
}

impl FakeDocs {
    pub fn new(documents: Vec<Document>) -> Self {
        Self {
            documents,
            fetched: Mutex::new(Vec::new()),
        }
    }

    pub fn fetched(&self) -> Vec<String> {
        self.fetched.lock().unwrap().clone()
    }
}

#[async_trait]
impl DocumentBackend for FakeDocs {
    async fn fetch_document(&self, _session: &GoogleSession, document_id: &str) -> Result<Document> {
        self.fetched.lock().unwrap().push(document_id.to_string());
        self.documents
            .iter()
            .find(|d| d.id == document_id)
            .cloned()
            .ok_or_else(|| Error::DocumentBackend {
                status: 404,
                message: format!("no document {document_id}"),
            })
    }
}

// ==================== Model ====================

pub struct FakeModel {
    reply: Option<String>,
    prompts: Mutex<Vec<String>>,
}

impl FakeModel {
    pub fn replying(reply: &str) -> Self {
        Self {
            reply: Some(reply.to_string()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            reply: None,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl LanguageModel for FakeModel {
    async fn complete(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.reply
            .clone()
            .ok_or_else(|| Error::Config("model backend unreachable".to_string()))
    }
}

// ==================== Controller seams ====================

pub struct StaticLocator {
    references: Vec<TranscriptReference>,
    queries: Mutex<Vec<TranscriptQuery>>,
}

impl StaticLocator {
    pub fn new(references: Vec<TranscriptReference>) -> Self {
        Self {
            references,
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn queries(&self) -> Vec<TranscriptQuery> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl Locate for StaticLocator {
    async fn find(&self, query: &TranscriptQuery) -> Result<Vec<TranscriptReference>> {
        self.queries.lock().unwrap().push(query.clone());
        Ok(self.references.clone())
    }
}

/// Serves canned content per message id; unknown ids have no document.
#[derive(Default)]
pub struct FakeExtractor {
    contents: Mutex<HashMap<String, TranscriptContent>>,
    auth_failures: Mutex<HashSet<String>>,
    extracted: Mutex<Vec<String>>,
}

impl FakeExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, message_id: &str, subject: &str, tab: SourceTab, text: &str) {
        self.contents.lock().unwrap().insert(
            message_id.to_string(),
            TranscriptContent {
                source_subject: subject.to_string(),
                text: text.to_string(),
                source_tab: tab,
                tab_title: tab.to_string(),
            },
        );
    }

    pub fn remove(&self, message_id: &str) {
        self.contents.lock().unwrap().remove(message_id);
    }

    pub fn fail_auth(&self, message_id: &str) {
        self.auth_failures
            .lock()
            .unwrap()
            .insert(message_id.to_string());
    }

    pub fn extracted(&self) -> Vec<String> {
        self.extracted.lock().unwrap().clone()
    }
}

#[async_trait]
impl Extract for FakeExtractor {
    async fn extract(&self, reference: &TranscriptReference) -> Result<TranscriptContent> {
        self.extracted
            .lock()
            .unwrap()
            .push(reference.message_id.clone());

        if self.auth_failures.lock().unwrap().contains(&reference.message_id) {
            return Err(Error::AuthenticationFailure("token revoked".to_string()));
        }

        self.contents
            .lock()
            .unwrap()
            .get(&reference.message_id)
            .cloned()
            .ok_or_else(|| Error::NoDocumentFound {
                message_id: reference.message_id.clone(),
            })
    }
}

// ==================== Prompter ====================

/// Replays canned answers and records what the controller showed. Running
/// out of answers behaves like end of input.
#[derive(Default)]
pub struct ScriptedPrompter {
    inputs: VecDeque<String>,
    save_answers: VecDeque<bool>,
    continue_answers: VecDeque<bool>,
    batch_preference: Option<BatchSave>,
    start_date: Option<NaiveDate>,
    pub start_date_prompts: usize,
    /// Length of each list shown
    pub listings: Vec<usize>,
    pub results: Vec<Analysis>,
    pub events: Vec<String>,
    pub selection_prompts: usize,
    pub save_prompts: usize,
}

impl ScriptedPrompter {
    pub fn new(inputs: &[&str]) -> Self {
        Self {
            inputs: inputs.iter().map(|s| s.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn with_save_answers(mut self, answers: &[bool]) -> Self {
        self.save_answers = answers.iter().copied().collect();
        self
    }

    pub fn with_continue(mut self, answers: &[bool]) -> Self {
        self.continue_answers = answers.iter().copied().collect();
        self
    }

    pub fn with_batch_preference(mut self, preference: BatchSave) -> Self {
        self.batch_preference = Some(preference);
        self
    }

    pub fn with_start_date(mut self, date: NaiveDate) -> Self {
        self.start_date = Some(date);
        self
    }

    /// Number of recorded events starting with `prefix`.
    pub fn count(&self, prefix: &str) -> usize {
        self.events.iter().filter(|e| e.starts_with(prefix)).count()
    }
}

impl Prompter for ScriptedPrompter {
    fn read_start_date(&mut self) -> Option<NaiveDate> {
        self.start_date_prompts += 1;
        self.start_date
    }

    fn show_references(&mut self, references: &[TranscriptReference]) {
        self.listings.push(references.len());
    }

    fn read_selection(&mut self, _count: usize) -> Option<String> {
        self.selection_prompts += 1;
        self.inputs.pop_front()
    }

    fn show_result(&mut self, analysis: &Analysis) {
        self.results.push(analysis.clone());
    }

    fn confirm_save(&mut self) -> Option<bool> {
        self.save_prompts += 1;
        self.save_answers.pop_front()
    }

    fn batch_save_preference(&mut self, _count: usize) -> Option<BatchSave> {
        self.batch_preference
    }

    fn continue_batch(&mut self) -> Option<bool> {
        self.continue_answers.pop_front()
    }

    fn notify(&mut self, notice: Notice<'_>) {
        let event = match notice {
            Notice::NoTranscripts(e) => format!("no-transcripts:{e:?}"),
            Notice::NoMatch { needle, error } => format!("no-match:{needle}:{error:?}"),
            Notice::InvalidSelection(e) => format!("invalid:{e}"),
            Notice::Analyzing {
                position,
                total,
                subject,
            } => format!("analyzing:{position}/{total}:{subject}"),
            Notice::TabSelected { tab, .. } => format!("tab:{tab}"),
            Notice::NoTopics => "no-topics".to_string(),
            Notice::ItemFailed { subject, error } => format!("failed:{subject}:{error}"),
            Notice::Saved(path) => format!("saved:{}", path.display()),
            Notice::NothingToSave => "nothing-to-save".to_string(),
            Notice::SaveFailed(e) => format!("save-failed:{e}"),
        };
        self.events.push(event);
    }
}
