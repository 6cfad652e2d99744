use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, OnceLock};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::models::{
    Analysis, AnalysisResult, AnalysisStatus, Quote, SourceTab, Topic, TranscriptContent,
};
use crate::subject::normalize_quotes;

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 4096;
const MAX_TRANSCRIPT_CHARS: usize = 150_000;

/// A single-shot text completion backend.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;
}

#[derive(Serialize)]
struct ClaudeRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<Message>,
}

#[derive(Serialize, Deserialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ClaudeResponse {
    content: Vec<Content>,
}

#[derive(Deserialize)]
struct Content {
    #[serde(default)]
    text: String,
}

pub struct ClaudeClient {
    client: Client,
    api_key: String,
    model: String,
}

impl ClaudeClient {
    pub fn new(api_key: String, model: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(180))
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key,
            model,
        })
    }
}

#[async_trait]
impl LanguageModel for ClaudeClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let request = ClaudeRequest {
            model: self.model.clone(),
            max_tokens: MAX_TOKENS,
            messages: vec![Message {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
        };

        let response = self
            .client
            .post(ANTHROPIC_API_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                Error::AnalysisUnavailable(format!("Failed to send request to Claude API: {e}"))
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| String::from("unknown error"));
            return Err(Error::AnalysisUnavailable(format!(
                "Claude API error {status}: {error_text}"
            )));
        }

        let claude_response = response.json::<ClaudeResponse>().await.map_err(|e| {
            Error::AnalysisUnavailable(format!("Failed to parse Claude API response: {e}"))
        })?;

        Ok(claude_response
            .content
            .into_iter()
            .next()
            .map(|c| c.text)
            .unwrap_or_default())
    }
}

#[async_trait]
pub trait Analyze: Send + Sync {
    async fn analyze(&self, content: &TranscriptContent) -> Result<Analysis>;
}

pub struct ContentAnalyzer {
    model: Arc<dyn LanguageModel>,
    focus: String,
}

impl ContentAnalyzer {
    pub fn new(model: Arc<dyn LanguageModel>, focus: impl Into<String>) -> Self {
        Self {
            model,
            focus: focus.into(),
        }
    }
}

#[async_trait]
impl Analyze for ContentAnalyzer {
    async fn analyze(&self, content: &TranscriptContent) -> Result<Analysis> {
        let prompt = build_prompt(content, &self.focus);
        debug!(
            "Requesting analysis of '{}' ({} tab, {} prompt chars)",
            content.source_subject,
            content.source_tab,
            prompt.len()
        );

        let raw_response = self.model.complete(&prompt).await.map_err(|e| match e {
            Error::AnalysisUnavailable(_) => e,
            other => Error::AnalysisUnavailable(other.to_string()),
        })?;

        let analysis = interpret_response(content, raw_response);
        if analysis.is_degraded() {
            warn!(
                "Model response for '{}' had no recognizable topics",
                content.source_subject
            );
        }
        Ok(analysis)
    }
}

/// Truncate to at most `max` bytes on a UTF-8 boundary.
fn truncate_chars(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut end = max;
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

pub fn build_prompt(content: &TranscriptContent, focus: &str) -> String {
    let text = truncate_chars(&content.text, MAX_TRANSCRIPT_CHARS);

    let (source_description, quote_rules, quote_format) = if content.source_tab.allows_quotes() {
        (
            "a verbatim meeting transcript",
            "4. For each topic, include 1-3 notable quotes copied WORD FOR WORD from the transcript, each attributed to the speaker who said it\n\
             5. Never paraphrase, merge or invent quotes; if no exact quote supports a topic, use only the ones that do",
            "\n**Notable Quotes:**\n> **Speaker Name:** \"exact words from the transcript\"\n",
        )
    } else {
        (
            "meeting notes (a summary, NOT a verbatim transcript)",
            "4. The notes contain no verbatim dialogue: do NOT include quotes and omit the Notable Quotes section entirely\n\
             5. Do not attribute any statement to a named speaker as a quote",
            "",
        )
    };

    format!(
        r#"You are a content strategist who turns meeting discussions into article ideas about {focus}.

Below is {source_description} from the meeting "{subject}". Identify the 2-4 strongest article topics it supports.

RULES:
1. Give each topic a short, specific title
2. Write a 1-2 sentence description of the article angle
3. List 2-4 key insights per topic, each grounded in the meeting content
{quote_rules}
6. Use ONLY the meeting content - no external knowledge
7. Follow the output format exactly; separate topics with a line containing only ---

Meeting content:
{text}

Format your response as:
## TOPIC 1: Topic Title
**Description:** One or two sentences describing the article angle.

**Key Insights:**
- First insight
- Second insight
{quote_format}
---

## TOPIC 2: Topic Title
..."#,
        focus = focus,
        source_description = source_description,
        subject = content.source_subject,
        quote_rules = quote_rules,
        text = text,
        quote_format = quote_format,
    )
}

/// Parse a model response into an `Analysis`, enforcing the quote rules for
/// the content's source tab.
pub fn interpret_response(content: &TranscriptContent, raw_response: String) -> Analysis {
    let mut topics = parse_topics(&raw_response);
    let status = if topics.is_empty() {
        AnalysisStatus::Unstructured
    } else {
        AnalysisStatus::Structured
    };

    if content.source_tab.allows_quotes() {
        let haystack = normalize_for_match(&content.text);
        for topic in &mut topics {
            topic.quotes.retain(|quote| {
                let verbatim = is_verbatim(&haystack, &quote.text);
                if !verbatim {
                    debug!("Dropping non-verbatim quote from {}: {}", quote.speaker, quote.text);
                }
                verbatim
            });
        }
    } else {
        for topic in &mut topics {
            topic.quotes.clear();
        }
    }

    Analysis {
        result: AnalysisResult {
            source_subject: content.source_subject.clone(),
            topics,
        },
        status,
        source_tab: content.source_tab,
        raw_response,
    }
}

fn normalize_for_match(text: &str) -> String {
    normalize_quotes(text)
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn is_verbatim(haystack: &str, quote: &str) -> bool {
    let needle = normalize_for_match(quote);
    let needle = needle.trim_matches(|c: char| c.is_whitespace() || ".,…!?;:\"'".contains(c));
    !needle.is_empty() && haystack.contains(needle)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    None,
    Description,
    Insights,
    Quotes,
}

fn topic_header_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^#{2,3}\s*(?:\*\*)?\s*topic\s*\d*\s*[:.\-\x{2013}\x{2014}]\s*(?P<title>.+)$")
            .expect("topic header pattern is valid")
    })
}

fn speaker_first_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"^(?:\*\*(?P<bold>[^*]+?)\*\*|(?P<plain>[^:"]+?))\s*:?\s*(?:\*\*)?\s*:?\s*"(?P<text>.+)"\s*$"#)
            .expect("speaker quote pattern is valid")
    })
}

fn speaker_last_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"^"(?P<text>.+)"\s*(?:--|-|\x{2013}|\x{2014})\s*(?P<speaker>.+)$"#)
            .expect("attribution quote pattern is valid")
    })
}

/// Parse `## TOPIC n:` blocks. Returns no topics when no header is found.
pub fn parse_topics(text: &str) -> Vec<Topic> {
    let mut topics = Vec::new();
    let mut current: Option<Topic> = None;
    let mut section = Section::None;

    for line in text.lines() {
        let trimmed = line.trim();

        if let Some(caps) = topic_header_regex().captures(trimmed) {
            if let Some(topic) = current.take() {
                topics.push(topic);
            }
            current = Some(Topic {
                title: caps["title"].trim().trim_matches('*').trim().to_string(),
                ..Topic::default()
            });
            section = Section::None;
            continue;
        }

        let Some(topic) = current.as_mut() else {
            continue;
        };

        if trimmed.is_empty() {
            continue;
        }
        if trimmed.chars().all(|c| c == '-' || c == '*' || c == '_') && trimmed.len() >= 3 {
            section = Section::None;
            continue;
        }

        if let Some(rest) = strip_marker(trimmed, "Description") {
            topic.description = rest.to_string();
            section = Section::Description;
            continue;
        }
        if strip_marker(trimmed, "Key Insights").is_some() {
            section = Section::Insights;
            continue;
        }
        if strip_marker(trimmed, "Notable Quotes").is_some() {
            section = Section::Quotes;
            continue;
        }

        match section {
            Section::Description => {
                if !topic.description.is_empty() {
                    topic.description.push(' ');
                }
                topic.description.push_str(trimmed);
            }
            Section::Insights => {
                if let Some(insight) = strip_bullet(trimmed) {
                    topic.insights.push(insight.to_string());
                }
            }
            Section::Quotes => {
                if let Some(quote) = parse_quote_line(trimmed) {
                    topic.quotes.push(quote);
                }
            }
            Section::None => {}
        }
    }

    if let Some(topic) = current {
        topics.push(topic);
    }

    topics
}

/// Match a `**Name:**` style marker and return the text after it.
fn strip_marker<'a>(line: &'a str, name: &str) -> Option<&'a str> {
    let line = line.trim_start_matches(|c: char| c == '*' || c == '#' || c.is_whitespace());
    let head = line.get(..name.len())?;
    if !head.eq_ignore_ascii_case(name) {
        return None;
    }

    let rest = &line[name.len()..];
    let marker_end = rest
        .find(|c: char| c != '*' && c != ':' && !c.is_whitespace())
        .unwrap_or(rest.len());
    if !rest[..marker_end].contains(':') {
        return None;
    }
    Some(rest[marker_end..].trim())
}

fn strip_bullet(line: &str) -> Option<&str> {
    for prefix in ["- ", "* ", "\u{2022}"] {
        if let Some(stripped) = line.strip_prefix(prefix) {
            let stripped = stripped.trim();
            return (!stripped.is_empty()).then_some(stripped);
        }
    }

    let digits = line.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits > 0 {
        let rest = &line[digits..];
        if let Some(stripped) = rest.strip_prefix('.').or_else(|| rest.strip_prefix(')')) {
            let stripped = stripped.trim();
            return (!stripped.is_empty()).then_some(stripped);
        }
    }

    None
}

fn parse_quote_line(line: &str) -> Option<Quote> {
    let line = line.trim_start_matches(|c: char| c == '>' || c.is_whitespace());
    let line = strip_bullet(line).unwrap_or(line);
    let line = normalize_quotes(line);

    if let Some(caps) = speaker_first_regex().captures(&line) {
        let speaker = caps
            .name("bold")
            .or_else(|| caps.name("plain"))
            .map(|m| m.as_str().trim().trim_end_matches(':').trim().to_string())
            .unwrap_or_default();
        let text = caps["text"].trim().to_string();
        if !speaker.is_empty() && !text.is_empty() {
            return Some(Quote { speaker, text });
        }
    }

    if let Some(caps) = speaker_last_regex().captures(&line) {
        let speaker = caps["speaker"].trim().trim_matches('*').trim().to_string();
        let text = caps["text"].trim().to_string();
        if !speaker.is_empty() && !text.is_empty() {
            return Some(Quote { speaker, text });
        }
    }

    None
}
