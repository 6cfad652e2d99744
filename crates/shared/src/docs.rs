//! Google Docs API v1 client.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::debug;

use crate::error::{Error, Result};
use crate::session::GoogleSession;

const DOCS_API_BASE: &str = "https://docs.googleapis.com/v1/documents";

/// A named section of a document with its plain text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentTab {
    pub title: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub id: String,
    pub title: String,
    /// Tabs in document order, child tabs following their parent
    pub tabs: Vec<DocumentTab>,
}

impl Document {
    pub fn tab_titles(&self) -> Vec<&str> {
        self.tabs.iter().map(|t| t.title.as_str()).collect()
    }
}

#[async_trait]
pub trait DocumentBackend: Send + Sync {
    async fn fetch_document(&self, session: &GoogleSession, document_id: &str) -> Result<Document>;
}

// ============================================================================
// API response types
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DocumentResponse {
    #[serde(default)]
    document_id: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    tabs: Option<Vec<TabResponse>>,
    #[serde(default)]
    body: Option<Body>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TabResponse {
    #[serde(default)]
    tab_properties: Option<TabProperties>,
    #[serde(default)]
    document_tab: Option<DocumentTabResponse>,
    #[serde(default)]
    child_tabs: Vec<TabResponse>,
}

#[derive(Debug, Deserialize)]
struct TabProperties {
    #[serde(default)]
    title: String,
}

#[derive(Debug, Deserialize)]
struct DocumentTabResponse {
    #[serde(default)]
    body: Option<Body>,
}

#[derive(Debug, Default, Deserialize)]
struct Body {
    #[serde(default)]
    content: Vec<StructuralElement>,
}

#[derive(Debug, Deserialize)]
struct StructuralElement {
    #[serde(default)]
    paragraph: Option<Paragraph>,
    #[serde(default)]
    table: Option<Table>,
}

#[derive(Debug, Deserialize)]
struct Paragraph {
    #[serde(default)]
    elements: Vec<ParagraphElement>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ParagraphElement {
    #[serde(default)]
    text_run: Option<TextRun>,
}

#[derive(Debug, Deserialize)]
struct TextRun {
    #[serde(default)]
    content: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Table {
    #[serde(default)]
    table_rows: Vec<TableRow>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TableRow {
    #[serde(default)]
    table_cells: Vec<TableCell>,
}

#[derive(Debug, Deserialize)]
struct TableCell {
    #[serde(default)]
    content: Vec<StructuralElement>,
}

// ============================================================================
// Client
// ============================================================================

pub struct DocsClient {
    client: Client,
}

impl DocsClient {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl DocumentBackend for DocsClient {
    async fn fetch_document(&self, session: &GoogleSession, document_id: &str) -> Result<Document> {
        let access_token = session.access_token().await?;
        let url = format!(
            "{}/{}?includeTabsContent=true",
            DOCS_API_BASE,
            urlencoding::encode(document_id)
        );

        let response = self
            .client
            .get(&url)
            .bearer_auth(access_token)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            session.invalidate().await;
            return Err(Error::AuthenticationFailure(
                "Docs rejected the access token".to_string(),
            ));
        }
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| String::from("unknown error"));
            return Err(Error::DocumentBackend {
                status: status.as_u16(),
                message: error_text,
            });
        }

        let raw: DocumentResponse = response.json().await?;
        let document = document_from_response(raw, document_id);
        debug!(
            "Fetched document {} with tabs {:?}",
            document.id,
            document.tab_titles()
        );
        Ok(document)
    }
}

fn document_from_response(raw: DocumentResponse, requested_id: &str) -> Document {
    let mut tabs = Vec::new();

    match raw.tabs {
        Some(tab_list) if !tab_list.is_empty() => flatten_tabs(&tab_list, &mut tabs),
        // Legacy documents have a single body and no tab structure
        _ => tabs.push(DocumentTab {
            title: String::new(),
            text: body_text(&raw.body.unwrap_or_default()),
        }),
    }

    Document {
        id: if raw.document_id.is_empty() {
            requested_id.to_string()
        } else {
            raw.document_id
        },
        title: raw.title,
        tabs,
    }
}

fn flatten_tabs(tab_list: &[TabResponse], out: &mut Vec<DocumentTab>) {
    for tab in tab_list {
        let title = tab
            .tab_properties
            .as_ref()
            .map(|p| p.title.clone())
            .unwrap_or_default();
        let text = tab
            .document_tab
            .as_ref()
            .and_then(|d| d.body.as_ref())
            .map(body_text)
            .unwrap_or_default();

        out.push(DocumentTab { title, text });
        flatten_tabs(&tab.child_tabs, out);
    }
}

fn body_text(body: &Body) -> String {
    let mut text = String::new();
    collect_text(&body.content, &mut text);
    text
}

fn collect_text(elements: &[StructuralElement], out: &mut String) {
    for element in elements {
        if let Some(paragraph) = &element.paragraph {
            for run in paragraph.elements.iter().filter_map(|e| e.text_run.as_ref()) {
                out.push_str(&run.content);
            }
        } else if let Some(table) = &element.table {
            for cell in table.table_rows.iter().flat_map(|row| &row.table_cells) {
                collect_text(&cell.content, out);
            }
        }
    }
}
