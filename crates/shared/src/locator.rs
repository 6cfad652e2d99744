use async_trait::async_trait;
use chrono::NaiveDate;
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::Result;
use crate::label::resolve_label;
use crate::mail::{MailBackend, MailMessage};
use crate::models::TranscriptReference;
use crate::session::GoogleSession;
use crate::subject::parse_subject;

/// Gmail search that narrows the mailbox to candidate transcript emails;
/// the subject convention itself is checked locally.
pub const SUBJECT_SEARCH: &str = "subject:\"Notes:\"";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TranscriptQuery {
    pub label: Option<String>,
    pub start_date: Option<NaiveDate>,
}

/// `EXCLUDE_PEOPLE` / `EXCLUDE_SUBJECTS` settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExclusionFilters {
    pub people: Vec<String>,
    pub subjects: Vec<String>,
}

impl ExclusionFilters {
    fn excludes(&self, message: &MailMessage) -> bool {
        let subject = message.subject.to_lowercase();
        if self
            .subjects
            .iter()
            .any(|keyword| subject.contains(&keyword.to_lowercase()))
        {
            return true;
        }

        message.participants.iter().any(|participant| {
            self.people
                .iter()
                .any(|person| person.trim().eq_ignore_ascii_case(participant.trim()))
        })
    }
}

#[async_trait]
pub trait Locate: Send + Sync {
    async fn find(&self, query: &TranscriptQuery) -> Result<Vec<TranscriptReference>>;
}

pub struct EmailLocator {
    mail: Arc<dyn MailBackend>,
    session: Arc<GoogleSession>,
    exclusions: ExclusionFilters,
}

impl EmailLocator {
    pub fn new(
        mail: Arc<dyn MailBackend>,
        session: Arc<GoogleSession>,
        exclusions: ExclusionFilters,
    ) -> Self {
        Self {
            mail,
            session,
            exclusions,
        }
    }
}

#[async_trait]
impl Locate for EmailLocator {
    async fn find(&self, query: &TranscriptQuery) -> Result<Vec<TranscriptReference>> {
        let label_id = match &query.label {
            Some(requested) => {
                let index = self.mail.list_labels(&self.session).await?;
                match resolve_label(&index, requested) {
                    Some(label) => {
                        debug!("Label '{}' resolved to {}", requested, label.id);
                        Some(label.id.clone())
                    }
                    None => {
                        warn!("No mailbox label matches '{}'", requested);
                        return Ok(Vec::new());
                    }
                }
            }
            None => None,
        };

        let search = search_query(query.start_date, label_id.as_deref());
        let messages = self
            .mail
            .search_messages(&self.session, &search, label_id.as_deref())
            .await?;

        Ok(select_references(
            messages,
            query.start_date,
            label_id.as_deref(),
            &self.exclusions,
        ))
    }
}

/// Gmail search string. With a date filter in effect the server narrows by
/// `after:` too; the subject date is still checked locally.
pub fn search_query(start_date: Option<NaiveDate>, label_id: Option<&str>) -> String {
    match (start_date, label_id) {
        (Some(start), None) => format!("{} after:{}", SUBJECT_SEARCH, start.format("%Y/%m/%d")),
        _ => SUBJECT_SEARCH.to_string(),
    }
}

/// Turn raw messages into transcript references: keep convention-matching
/// subjects, apply the label or date filter and the exclusions, then sort
/// newest first with undated references last in discovery order.
///
/// A label filter takes precedence; `start_date` is ignored when
/// `label_id` is set.
pub fn select_references(
    messages: Vec<MailMessage>,
    start_date: Option<NaiveDate>,
    label_id: Option<&str>,
    exclusions: &ExclusionFilters,
) -> Vec<TranscriptReference> {
    let date_filter = if label_id.is_some() { None } else { start_date };

    let mut references: Vec<TranscriptReference> = messages
        .into_iter()
        .filter_map(|message| {
            let parsed = parse_subject(&message.subject)?;

            if let Some(label_id) = label_id {
                if !message.label_ids.iter().any(|id| id == label_id) {
                    return None;
                }
            }

            if let Some(start) = date_filter {
                match parsed.date {
                    Some(date) if date >= start => {}
                    _ => return None,
                }
            }

            if exclusions.excludes(&message) {
                debug!("Excluding '{}'", message.subject);
                return None;
            }

            Some(TranscriptReference {
                subject: parsed.topic,
                raw_subject: message.subject,
                date: parsed.date,
                message_id: message.id,
                document_id: None,
                participants: message.participants,
            })
        })
        .collect();

    // Stable sort keeps discovery order among equal and undated entries
    references.sort_by(|a, b| match (a.date, b.date) {
        (Some(a), Some(b)) => b.cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });

    references
}

/// Direct lookup: case-insensitive substring match on the extracted subject.
pub fn match_subject(references: &[TranscriptReference], needle: &str) -> Vec<TranscriptReference> {
    let needle = needle.trim().to_lowercase();
    references
        .iter()
        .filter(|r| r.subject.to_lowercase().contains(&needle))
        .cloned()
        .collect()
}
