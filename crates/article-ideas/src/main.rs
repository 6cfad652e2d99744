mod console;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Parser;
use shared::{
    parse_start_date, ClaudeClient, Config, ContentAnalyzer, Controller, DocsClient, EmailLocator,
    ExclusionFilters, GmailClient, GoogleSession, ReportWriter, TranscriptExtractor,
    TranscriptQuery,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use crate::console::ConsolePrompter;

#[derive(Parser)]
#[command(name = "article-ideas")]
#[command(about = "Turn meeting transcripts from Gmail into article ideas with Claude")]
struct Args {
    /// List transcript emails without analyzing them
    #[arg(short, long)]
    list: bool,

    /// Analyze the transcript whose subject contains this text
    #[arg(short, long, value_name = "SUBJECT")]
    email: Option<String>,

    /// Only consider emails with this Gmail label (disables the date filter)
    #[arg(long)]
    label: Option<String>,

    /// Only consider meetings on or after this date (MMDDYYYY)
    #[arg(long, value_parser = parse_start_date)]
    start_date: Option<NaiveDate>,

    /// Audience the article ideas should target
    #[arg(long)]
    focus: Option<String>,

    /// Directory for saved analyses
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Show debug logging on stderr
    #[arg(short, long)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let config = Config::from_env()?;

    println!("🔑 Connecting to Google...");
    let session = Arc::new(
        GoogleSession::initialize(&config.token_path)
            .await
            .context("Failed to start Google session")?,
    );
    if let Some(account) = session.account().await {
        println!("✓ Signed in as {}", account);
    }

    let mail = Arc::new(GmailClient::new()?);
    let docs = Arc::new(DocsClient::new()?);
    let model = Arc::new(ClaudeClient::new(
        config.anthropic_api_key.clone(),
        config.anthropic_model.clone(),
    )?);

    let exclusions = ExclusionFilters {
        people: config.exclude_people.clone(),
        subjects: config.exclude_subjects.clone(),
    };
    let focus = args.focus.unwrap_or(config.content_focus);
    let output_dir = args.output_dir.unwrap_or(config.output_dir);

    let controller = Controller::new(
        Arc::new(EmailLocator::new(mail.clone(), session.clone(), exclusions)),
        Arc::new(TranscriptExtractor::new(mail, docs, session)),
        Arc::new(ContentAnalyzer::new(model, focus)),
        ReportWriter::new(output_dir),
    );

    let query = TranscriptQuery {
        label: args.label,
        start_date: args.start_date.or(config.start_date),
    };
    if query.label.is_some() && query.start_date.is_some() {
        println!("⚠ Label filter active; ignoring the start date");
    }

    let mut prompter = ConsolePrompter::new();
    println!("\n📬 Searching Gmail for meeting transcripts...");

    if args.list {
        controller
            .run_list(&mut prompter, &query)
            .await
            .context("Failed to list transcripts")?;
    } else if let Some(needle) = args.email {
        controller
            .run_direct(&mut prompter, &query, &needle)
            .await
            .context("Failed to analyze transcript")?;
    } else {
        controller
            .run_interactive(&mut prompter, &query)
            .await
            .context("Session ended with an error")?;
    }

    Ok(())
}
