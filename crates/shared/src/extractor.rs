use async_trait::async_trait;
use regex::Regex;
use scraper::{Html, Selector};
use std::sync::{Arc, OnceLock};
use tracing::{debug, info};
use url::Url;

use crate::docs::{DocumentBackend, DocumentTab};
use crate::error::{Error, Result};
use crate::mail::{MailBackend, MessageBody};
use crate::models::{SourceTab, TranscriptContent, TranscriptReference};
use crate::session::GoogleSession;

/// One tier of the section policy: a tab name and what it counts as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionMatcher {
    pub name: String,
    pub tab: SourceTab,
}

impl SectionMatcher {
    pub fn new(name: impl Into<String>, tab: SourceTab) -> Self {
        Self {
            name: name.into(),
            tab,
        }
    }

    fn matches(&self, title: &str) -> bool {
        title.trim().to_lowercase() == self.name.to_lowercase()
    }
}

/// Ordered list of tab matchers; the first matcher with a matching tab wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionPolicy {
    matchers: Vec<SectionMatcher>,
}

impl Default for SectionPolicy {
    fn default() -> Self {
        Self::new(vec![
            SectionMatcher::new("Transcript", SourceTab::Transcript),
            SectionMatcher::new("Notes", SourceTab::Notes),
        ])
    }
}

impl SectionPolicy {
    pub fn new(matchers: Vec<SectionMatcher>) -> Self {
        Self { matchers }
    }

    pub fn select<'a>(&self, tabs: &'a [DocumentTab]) -> Option<(SourceTab, &'a DocumentTab)> {
        self.matchers.iter().find_map(|matcher| {
            tabs.iter()
                .find(|tab| matcher.matches(&tab.title))
                .map(|tab| (matcher.tab, tab))
        })
    }
}

#[async_trait]
pub trait Extract: Send + Sync {
    async fn extract(&self, reference: &TranscriptReference) -> Result<TranscriptContent>;
}

pub struct TranscriptExtractor {
    mail: Arc<dyn MailBackend>,
    docs: Arc<dyn DocumentBackend>,
    session: Arc<GoogleSession>,
    policy: SectionPolicy,
}

impl TranscriptExtractor {
    pub fn new(
        mail: Arc<dyn MailBackend>,
        docs: Arc<dyn DocumentBackend>,
        session: Arc<GoogleSession>,
    ) -> Self {
        Self {
            mail,
            docs,
            session,
            policy: SectionPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: SectionPolicy) -> Self {
        self.policy = policy;
        self
    }

    async fn resolve_document_id(&self, reference: &TranscriptReference) -> Result<String> {
        if let Some(id) = &reference.document_id {
            return Ok(id.clone());
        }

        let body = self
            .mail
            .fetch_body(&self.session, &reference.message_id)
            .await?;

        find_document_id(&body).ok_or_else(|| Error::NoDocumentFound {
            message_id: reference.message_id.clone(),
        })
    }
}

#[async_trait]
impl Extract for TranscriptExtractor {
    async fn extract(&self, reference: &TranscriptReference) -> Result<TranscriptContent> {
        let document_id = self.resolve_document_id(reference).await?;
        debug!("Message {} links document {}", reference.message_id, document_id);

        let document = self
            .docs
            .fetch_document(&self.session, &document_id)
            .await?;

        let (source_tab, section) =
            self.policy
                .select(&document.tabs)
                .ok_or_else(|| Error::NoUsableContent {
                    document_id: document_id.clone(),
                    available: available_tabs(&document.tabs),
                })?;

        info!(
            "Selected '{}' tab ({}) from document {}",
            section.title, source_tab, document_id
        );

        Ok(TranscriptContent {
            source_subject: reference.subject.clone(),
            text: section.text.clone(),
            source_tab,
            tab_title: section.title.clone(),
        })
    }
}

fn available_tabs(tabs: &[DocumentTab]) -> String {
    let titles: Vec<&str> = tabs
        .iter()
        .map(|t| t.title.trim())
        .filter(|t| !t.is_empty())
        .collect();
    if titles.is_empty() {
        "none".to_string()
    } else {
        titles.join(", ")
    }
}

fn doc_link_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"https?://docs\.google\.com/document/(?:u/\d+/)?d/([A-Za-z0-9_-]+)")
            .expect("doc link pattern is valid")
    })
}

/// Find the Google Doc linked from a message: HTML anchors first, then any
/// bare link in the plain text or HTML source.
pub fn find_document_id(body: &MessageBody) -> Option<String> {
    if let Some(html) = &body.html {
        if let Some(id) = document_id_from_anchors(html) {
            return Some(id);
        }
    }

    [body.plain.as_deref(), body.html.as_deref()]
        .into_iter()
        .flatten()
        .find_map(|text| {
            doc_link_regex()
                .captures(text)
                .map(|caps| caps[1].to_string())
        })
}

fn document_id_from_anchors(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let selector = Selector::parse("a[href]").ok()?;

    document
        .select(&selector)
        .filter_map(|anchor| anchor.value().attr("href"))
        .find_map(document_id_from_url)
}

/// Extract the document id from a Docs URL, unwrapping Google redirect links.
pub fn document_id_from_url(href: &str) -> Option<String> {
    let url = Url::parse(href.trim()).ok()?;
    let host = url.host_str()?;

    if (host == "www.google.com" || host == "google.com") && url.path() == "/url" {
        let target = url
            .query_pairs()
            .find(|(key, _)| key == "q" || key == "url")
            .map(|(_, value)| value.into_owned())?;
        return document_id_from_url(&target);
    }

    if host != "docs.google.com" {
        return None;
    }

    let segments: Vec<&str> = url.path_segments()?.collect();
    let d_pos = segments.iter().position(|s| *s == "d")?;
    if !segments[..d_pos].contains(&"document") {
        return None;
    }

    segments
        .get(d_pos + 1)
        .filter(|id| {
            !id.is_empty()
                && id
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        })
        .map(|id| id.to_string())
}
