use chrono::NaiveDate;
use shared::{
    parse_start_date, render_markdown, Analysis, BatchSave, Notice, Prompter, SourceTab,
    TranscriptReference,
};
use std::io::{self as stdio, BufRead, Write};

/// Terminal prompter: tables and progress on stdout, answers from stdin.
pub struct ConsolePrompter {
    stdin: stdio::Stdin,
}

impl Default for ConsolePrompter {
    fn default() -> Self {
        Self::new()
    }
}

impl ConsolePrompter {
    pub fn new() -> Self {
        Self {
            stdin: stdio::stdin(),
        }
    }

    /// Print a prompt and read one trimmed line. `None` on end of input or
    /// a read error.
    fn ask(&mut self, prompt: &str) -> Option<String> {
        print!("{}", prompt);
        stdio::stdout().flush().ok()?;

        let mut input = String::new();
        match self.stdin.lock().read_line(&mut input) {
            Ok(0) | Err(_) => {
                println!();
                None
            }
            Ok(_) => Some(input.trim().to_string()),
        }
    }

    fn ask_yes_no(&mut self, prompt: &str) -> Option<bool> {
        loop {
            let answer = self.ask(prompt)?;
            match answer.to_lowercase().as_str() {
                "y" | "yes" => return Some(true),
                "n" | "no" | "" => return Some(false),
                _ => println!("Please answer y or n."),
            }
        }
    }
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}

impl Prompter for ConsolePrompter {
    fn read_start_date(&mut self) -> Option<NaiveDate> {
        if !self.ask_yes_no("\n📅 Filter transcripts by start date? (y/N): ")? {
            return None;
        }
        loop {
            let raw = self.ask("Start date (MMDDYYYY): ")?;
            match parse_start_date(&raw) {
                Ok(date) => return Some(date),
                Err(e) => println!("⚠ {}", e),
            }
        }
    }

    fn show_references(&mut self, references: &[TranscriptReference]) {
        println!("\n✓ Found {} transcript(s):\n", references.len());
        println!("{:>4}  {:<50}  {:<13}  {}", "#", "Subject", "Date", "People");
        println!("{}", "-".repeat(80));
        for (i, reference) in references.iter().enumerate() {
            println!(
                "{:>4}  {:<50}  {:<13}  {}",
                i + 1,
                truncate(&reference.subject, 50),
                reference.display_date(),
                reference.participants.len()
            );
        }
    }

    fn read_selection(&mut self, count: usize) -> Option<String> {
        self.ask(&format!(
            "\nSelect a transcript (1-{count}), 'all', a range like 1-3, or 'q' to quit: "
        ))
    }

    fn show_result(&mut self, analysis: &Analysis) {
        println!("\n{}", "=".repeat(80));
        println!("{}", render_markdown(analysis));
        println!("{}", "=".repeat(80));
    }

    fn confirm_save(&mut self) -> Option<bool> {
        self.ask_yes_no("\n💾 Save this analysis? (y/N): ")
    }

    fn batch_save_preference(&mut self, count: usize) -> Option<BatchSave> {
        println!("\n{} transcripts selected. Save results?", count);
        println!("  1) One combined report (default)");
        println!("  2) Separate file per transcript");
        println!("  3) Don't save");
        println!("  4) Ask after each");
        loop {
            match self.ask("\nEnter your choice (1-4): ")?.as_str() {
                "1" | "" => return Some(BatchSave::Combined),
                "2" => return Some(BatchSave::SaveAll),
                "3" => return Some(BatchSave::SkipAll),
                "4" => return Some(BatchSave::AskEach),
                _ => println!("Invalid selection. Please choose 1, 2, 3, or 4."),
            }
        }
    }

    fn continue_batch(&mut self) -> Option<bool> {
        match self.ask("\nContinue to the next transcript? (Y/n): ")?.to_lowercase().as_str() {
            "n" | "no" => Some(false),
            _ => Some(true),
        }
    }

    fn notify(&mut self, notice: Notice<'_>) {
        match notice {
            Notice::NoTranscripts(e) => println!("\n{}", e),
            Notice::NoMatch { needle, error } => {
                println!("\n⚠ {}: no subject contains \"{}\"", error, needle);
            }
            Notice::InvalidSelection(e) => println!("⚠ {}", e),
            Notice::Analyzing {
                position,
                total,
                subject,
            } => {
                if total > 1 {
                    println!("\n🤖 Analyzing {}/{}: {}", position, total, subject);
                } else {
                    println!("\n🤖 Analyzing: {}", subject);
                }
                println!("  (This may take a minute...)");
            }
            Notice::TabSelected { tab, title } => match tab {
                SourceTab::Transcript => println!("✓ Processing {} tab", title),
                SourceTab::Notes => {
                    println!("✓ Using {} tab (no Transcript tab available)", title);
                }
                SourceTab::Unknown => println!("✓ Using {} tab", title),
            },
            Notice::NoTopics => {
                println!("⚠ No structured topics found; showing the raw response");
            }
            Notice::ItemFailed { subject, error } => {
                println!("✗ \"{}\": {}", subject, error);
            }
            Notice::Saved(path) => println!("✅ Saved to {}", path.display()),
            Notice::NothingToSave => {
                println!("⚠ No structured results to combine; nothing saved");
            }
            Notice::SaveFailed(e) => println!("✗ Could not save analysis: {}", e),
        }
    }
}
