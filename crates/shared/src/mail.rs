//! Gmail API v1 client.
//!
//! Searches for transcript emails, reads their participant headers and
//! fetches full bodies so the extractor can find the linked document.

use async_trait::async_trait;
use base64::Engine;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::label::MailLabel;
use crate::session::GoogleSession;

const GMAIL_API_BASE: &str = "https://gmail.googleapis.com/gmail/v1/users/me";
const PAGE_SIZE: u32 = 100;

/// Header-level view of one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailMessage {
    pub id: String,
    pub subject: String,
    pub label_ids: Vec<String>,
    pub participants: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageBody {
    pub plain: Option<String>,
    pub html: Option<String>,
}

#[async_trait]
pub trait MailBackend: Send + Sync {
    /// The account's label index.
    async fn list_labels(&self, session: &GoogleSession) -> Result<Vec<MailLabel>>;

    /// Messages matching a Gmail search query, optionally limited to one
    /// label id.
    async fn search_messages(
        &self,
        session: &GoogleSession,
        query: &str,
        label_id: Option<&str>,
    ) -> Result<Vec<MailMessage>>;

    async fn fetch_body(&self, session: &GoogleSession, message_id: &str) -> Result<MessageBody>;
}

#[derive(Debug, Deserialize)]
struct LabelListResponse {
    #[serde(default)]
    labels: Vec<MailLabel>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MessageListResponse {
    #[serde(default)]
    messages: Vec<MessageStub>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MessageStub {
    id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MessageDetail {
    id: String,
    #[serde(default)]
    label_ids: Vec<String>,
    #[serde(default)]
    payload: Option<Payload>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Payload {
    #[serde(default)]
    mime_type: String,
    #[serde(default)]
    headers: Vec<Header>,
    #[serde(default)]
    body: Option<PayloadBody>,
    #[serde(default)]
    parts: Vec<Payload>,
}

#[derive(Debug, Deserialize)]
struct Header {
    #[serde(default)]
    name: String,
    #[serde(default)]
    value: String,
}

#[derive(Debug, Deserialize)]
struct PayloadBody {
    #[serde(default)]
    data: Option<String>,
}

pub struct GmailClient {
    client: Client,
    base_url: String,
}

impl GmailClient {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: GMAIL_API_BASE.to_string(),
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, session: &GoogleSession, url: &str) -> Result<T> {
        let access_token = session.access_token().await?;

        let response = self
            .client
            .get(url)
            .bearer_auth(access_token)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            session.invalidate().await;
            return Err(Error::AuthenticationFailure(
                "Gmail rejected the access token".to_string(),
            ));
        }
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| String::from("unknown error"));
            return Err(Error::MailBackend {
                status: status.as_u16(),
                message: error_text,
            });
        }

        Ok(response.json::<T>().await?)
    }

    async fn fetch_metadata(&self, session: &GoogleSession, message_id: &str) -> Result<MailMessage> {
        let url = format!(
            "{}/messages/{}?format=metadata&metadataHeaders=Subject&metadataHeaders=From&metadataHeaders=To&metadataHeaders=Cc",
            self.base_url,
            urlencoding::encode(message_id)
        );
        let detail: MessageDetail = self.get_json(session, &url).await?;
        Ok(message_from_detail(detail))
    }
}

#[async_trait]
impl MailBackend for GmailClient {
    async fn list_labels(&self, session: &GoogleSession) -> Result<Vec<MailLabel>> {
        let url = format!("{}/labels", self.base_url);
        let response: LabelListResponse = self.get_json(session, &url).await?;
        Ok(response.labels)
    }

    async fn search_messages(
        &self,
        session: &GoogleSession,
        query: &str,
        label_id: Option<&str>,
    ) -> Result<Vec<MailMessage>> {
        let mut ids = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut url = format!(
                "{}/messages?q={}&maxResults={}",
                self.base_url,
                urlencoding::encode(query),
                PAGE_SIZE
            );
            if let Some(label_id) = label_id {
                url.push_str(&format!("&labelIds={}", urlencoding::encode(label_id)));
            }
            if let Some(token) = &page_token {
                url.push_str(&format!("&pageToken={}", urlencoding::encode(token)));
            }

            let page: MessageListResponse = self.get_json(session, &url).await?;
            ids.extend(page.messages.into_iter().map(|m| m.id));

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        debug!("Gmail search '{}' returned {} messages", query, ids.len());

        let mut messages = Vec::with_capacity(ids.len());
        for id in ids {
            let fetched = self.fetch_metadata(session, &id).await;
            if let Some(message) = skip_missing(&id, fetched)? {
                messages.push(message);
            }
        }
        Ok(messages)
    }

    async fn fetch_body(&self, session: &GoogleSession, message_id: &str) -> Result<MessageBody> {
        let url = format!(
            "{}/messages/{}?format=full",
            self.base_url,
            urlencoding::encode(message_id)
        );
        let detail: MessageDetail = self.get_json(session, &url).await?;
        let payload = detail.payload.unwrap_or_default();

        Ok(MessageBody {
            plain: find_part_text(&payload, "text/plain"),
            html: find_part_text(&payload, "text/html"),
        })
    }
}

/// A message deleted between search and fetch comes back 404; drop it rather
/// than failing the whole listing.
fn skip_missing(id: &str, fetched: Result<MailMessage>) -> Result<Option<MailMessage>> {
    match fetched {
        Ok(message) => Ok(Some(message)),
        Err(Error::MailBackend { status: 404, .. }) => {
            warn!("Message {} disappeared before it could be read; skipping", id);
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

fn message_from_detail(detail: MessageDetail) -> MailMessage {
    let headers = detail
        .payload
        .as_ref()
        .map(|p| &p.headers[..])
        .unwrap_or(&[]);

    let get_header = |name: &str| -> String {
        headers
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case(name))
            .map(|h| h.value.clone())
            .unwrap_or_default()
    };

    let mut participants: Vec<String> = Vec::new();
    for header in ["From", "To", "Cc"] {
        for name in parse_address_list(&get_header(header)) {
            if !participants.iter().any(|p| p.eq_ignore_ascii_case(&name)) {
                participants.push(name);
            }
        }
    }

    MailMessage {
        id: detail.id,
        subject: get_header("Subject"),
        label_ids: detail.label_ids,
        participants,
    }
}

/// Walk MIME parts depth-first for the first body of the given type.
fn find_part_text(payload: &Payload, mime_type: &str) -> Option<String> {
    if payload.mime_type.eq_ignore_ascii_case(mime_type) {
        if let Some(data) = payload.body.as_ref().and_then(|b| b.data.as_deref()) {
            if let Some(text) = decode_body(data) {
                return Some(text);
            }
        }
    }
    payload
        .parts
        .iter()
        .find_map(|part| find_part_text(part, mime_type))
}

/// Gmail bodies are URL-safe base64, with or without padding.
fn decode_body(data: &str) -> Option<String> {
    let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(data.trim_end_matches('='))
        .ok()?;
    String::from_utf8(bytes).ok()
}

/// Names from an address header such as `"Smith, Jane" <jane@x.com>, bob@y.com`.
/// Display names win; bare addresses fall back to their local part.
pub fn parse_address_list(header: &str) -> Vec<String> {
    let mut entries = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut in_angle = false;

    for c in header.chars() {
        match c {
            '"' => in_quotes = !in_quotes,
            '<' if !in_quotes => in_angle = true,
            '>' if !in_quotes => in_angle = false,
            ',' if !in_quotes && !in_angle => {
                entries.push(std::mem::take(&mut current));
                continue;
            }
            _ => {}
        }
        current.push(c);
    }
    entries.push(current);

    entries
        .iter()
        .filter_map(|entry| participant_name(entry.trim()))
        .collect()
}

fn participant_name(entry: &str) -> Option<String> {
    if entry.is_empty() {
        return None;
    }

    let (display, address) = match entry.find('<') {
        Some(start) => {
            let address = entry[start + 1..].trim_end_matches('>').trim();
            (entry[..start].trim().trim_matches('"').trim(), address)
        }
        None => ("", entry),
    };

    if !display.is_empty() {
        return Some(display.to_string());
    }

    let local = address.split('@').next().unwrap_or("").trim();
    if local.is_empty() {
        None
    } else {
        Some(local.to_string())
    }
}
