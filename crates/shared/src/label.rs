use serde::Deserialize;

/// An entry in the mailbox label index.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MailLabel {
    pub id: String,
    pub name: String,
}

/// Case-fold a label and collapse every run of spaces, hyphens and
/// underscores into a single `-`.
pub fn normalize_label(label: &str) -> String {
    let mut normalized = String::with_capacity(label.len());
    let mut pending_separator = false;

    for c in label.trim().chars() {
        if c.is_whitespace() || c == '-' || c == '_' {
            pending_separator = true;
            continue;
        }
        if pending_separator && !normalized.is_empty() {
            normalized.push('-');
        }
        pending_separator = false;
        normalized.extend(c.to_lowercase());
    }

    normalized
}

pub fn labels_match(a: &str, b: &str) -> bool {
    normalize_label(a) == normalize_label(b)
}

/// Look up a requested label name in the label index.
pub fn resolve_label<'a>(index: &'a [MailLabel], requested: &str) -> Option<&'a MailLabel> {
    index.iter().find(|label| labels_match(&label.name, requested))
}
