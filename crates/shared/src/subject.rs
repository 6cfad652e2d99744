//! Subject-line convention for meeting note emails:
//! `Notes: "<Subject>" <Mon> <Day>, <Year>`, straight or curly quotes.

use chrono::NaiveDate;
use regex::Regex;
use std::sync::OnceLock;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedSubject {
    pub topic: String,
    pub date: Option<NaiveDate>,
}

/// Replace typographic quotation marks with their ASCII equivalents.
pub fn normalize_quotes(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '\u{201C}' | '\u{201D}' | '\u{201E}' | '\u{201F}' | '\u{2033}' | '\u{00AB}'
            | '\u{00BB}' => '"',
            '\u{2018}' | '\u{2019}' | '\u{201A}' | '\u{201B}' | '\u{2032}' => '\'',
            other => other,
        })
        .collect()
}

/// Straight and typographic double quotation marks.
const QUOTE_MARKS: &str = "\"\u{201C}\u{201D}\u{201E}\u{201F}\u{00AB}\u{00BB}";

fn subject_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        let pattern = format!(
            r#"^\s*(?i:notes):\s*[{q}](?P<topic>[^{q}]+)[{q}]\s*(?P<rest>.*)$"#,
            q = QUOTE_MARKS
        );
        Regex::new(&pattern).expect("subject pattern is valid")
    })
}

fn date_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?P<month>[A-Za-z]{3,9})\.?\s+(?P<day>\d{1,2}),?\s+(?P<year>\d{4})\b")
            .expect("date pattern is valid")
    })
}

/// Parse a subject header. Returns `None` when the subject does not follow
/// the convention at all; a subject that matches but carries no readable
/// date parses with `date: None`.
pub fn parse_subject(subject: &str) -> Option<ParsedSubject> {
    // Only the enclosing marks are quote-insensitive; the topic is kept as written
    let caps = subject_regex().captures(subject)?;

    let topic = caps["topic"].trim().to_string();
    if topic.is_empty() {
        return None;
    }

    Some(ParsedSubject {
        topic,
        date: parse_subject_date(caps["rest"].trim()),
    })
}

/// Parse the `<Mon> <Day>, <Year>` tail of a subject.
pub fn parse_subject_date(text: &str) -> Option<NaiveDate> {
    let caps = date_regex().captures(text)?;
    // "Sept" and full month names reduce to the three-letter abbreviation
    let month: String = caps["month"].chars().take(3).collect();
    let candidate = format!("{} {} {}", month, &caps["day"], &caps["year"]);
    NaiveDate::parse_from_str(&candidate, "%b %d %Y").ok()
}
