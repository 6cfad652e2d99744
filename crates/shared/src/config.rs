use chrono::NaiveDate;
use std::env;
use std::path::PathBuf;

use crate::error::{Error, Result};

pub const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";
pub const DEFAULT_FOCUS: &str = "AI strategy and innovation for business leaders";

const APP_DIR: &str = "article-ideas";

#[derive(Debug, Clone)]
pub struct Config {
    pub anthropic_api_key: String,
    pub anthropic_model: String,
    pub start_date: Option<NaiveDate>,
    pub exclude_people: Vec<String>,
    pub exclude_subjects: Vec<String>,
    pub token_path: PathBuf,
    pub output_dir: PathBuf,
    pub content_focus: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        // Try to load .env from multiple locations
        Self::try_load_dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the config from any key lookup. `from_env` passes the process
    /// environment; tests pass a map.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let anthropic_api_key = get("ANTHROPIC_API_KEY").ok_or_else(|| {
            Error::Config(format!(
                "ANTHROPIC_API_KEY not found.\n\n\
                To fix this, create ~/.config/{APP_DIR}/.env with:\n  \
                ANTHROPIC_API_KEY=your_key_here\n\n\
                Get your Anthropic API key from: https://console.anthropic.com/settings/keys"
            ))
        })?;

        let start_date = match get("START_DATE") {
            Some(raw) => Some(parse_start_date(&raw).map_err(Error::Config)?),
            None => None,
        };

        let token_path = match get("GOOGLE_TOKEN_PATH") {
            Some(path) => PathBuf::from(path),
            None => default_token_path(),
        };

        Ok(Self {
            anthropic_api_key,
            anthropic_model: get("ANTHROPIC_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            start_date,
            exclude_people: split_list(get("EXCLUDE_PEOPLE").as_deref()),
            exclude_subjects: split_list(get("EXCLUDE_SUBJECTS").as_deref()),
            token_path,
            output_dir: get("OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(".")),
            content_focus: get("CONTENT_FOCUS").unwrap_or_else(|| DEFAULT_FOCUS.to_string()),
        })
    }

    fn try_load_dotenv() {
        // 1. Current directory (for development)
        if dotenvy::dotenv().is_ok() {
            return;
        }

        // 2. ~/.config/article-ideas/.env (standard config location)
        if let Some(config_dir) = dirs::config_dir() {
            let config_path = config_dir.join(APP_DIR).join(".env");
            if config_path.exists() && dotenvy::from_path(&config_path).is_ok() {
                return;
            }
        }

        // 3. ~/.env (home directory)
        if let Some(home_dir) = dirs::home_dir() {
            let home_path = home_dir.join(".env");
            if home_path.exists() && dotenvy::from_path(&home_path).is_ok() {
                return;
            }
        }

        // If none found, that's okay - environment variables might be set system-wide
    }
}

/// Parse a `MMDDYYYY` date as used by `START_DATE` and `--start-date`.
pub fn parse_start_date(raw: &str) -> std::result::Result<NaiveDate, String> {
    let raw = raw.trim();
    if raw.len() != 8 || !raw.chars().all(|c| c.is_ascii_digit()) {
        return Err(format!(
            "Invalid date '{raw}'. Expected MMDDYYYY (e.g., 10232025 for October 23, 2025)"
        ));
    }
    NaiveDate::parse_from_str(raw, "%m%d%Y").map_err(|_| {
        format!("Invalid date '{raw}'. Expected MMDDYYYY (e.g., 10232025 for October 23, 2025)")
    })
}

fn split_list(raw: Option<&str>) -> Vec<String> {
    raw.map(|s| {
        s.split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}

fn default_token_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
        .join("token.json")
}
