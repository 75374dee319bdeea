//! `ragchat chat` — Interactive or single-message chat mode.

use std::io::Write;

use ragchat_core::conversation::ConversationSummary;
use ragchat_engine::{ChatSession, SessionSettings};
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::backends::Backends;

/// One line typed into the interactive shell.
#[derive(Debug, PartialEq, Eq)]
pub enum ShellInput {
    Exit,
    Reset,
    Summary,
    Blank,
    Query(String),
}

impl ShellInput {
    /// Control tokens match the whole trimmed line, ignoring case.
    pub fn parse(line: &str) -> Self {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Self::Blank;
        }
        match trimmed.to_lowercase().as_str() {
            "exit" => Self::Exit,
            "reset" => Self::Reset,
            "summary" => Self::Summary,
            _ => Self::Query(trimmed.to_string()),
        }
    }
}

pub async fn run(
    message: Option<String>,
    num_results: Option<usize>,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config()?;
    let backends = Backends::connect(&config).await?;

    let settings = SessionSettings::from_config(&config);
    let k = num_results.unwrap_or(settings.num_results);
    let mut session = ChatSession::new(backends.index, backends.store, backends.provider, settings);

    if let Some(msg) = message {
        // Single message mode
        eprint!("  Thinking...");
        let result = session.chat(&msg, k).await;
        eprint!("\r              \r");
        let result = result?;

        if json {
            println!("{}", serde_json::to_string_pretty(&result)?);
        } else {
            println!("{}", result.response);
        }
        return Ok(());
    }

    // Interactive mode
    println!();
    println!("  ╔══════════════════════════════════════════════╗");
    println!("  ║          ragchat — Interactive Mode          ║");
    println!("  ╚══════════════════════════════════════════════╝");
    println!();
    println!("  Provider:  {}", config.default_provider);
    println!("  Model:     {}", config.default_model);
    println!("  Results:   {k} per question");
    println!("  History:   last {} turns", config.chat.history_window);
    println!();
    println!("  Type 'exit' to end the conversation.");
    println!("  Type 'reset' to clear conversation history.");
    println!("  Type 'summary' to see a conversation summary.");
    println!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("  You > ");
        std::io::stdout().flush()?;

        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => None,
        };
        // EOF or Ctrl+C
        let Some(line) = line else {
            println!();
            break;
        };

        match ShellInput::parse(&line) {
            ShellInput::Exit => break,
            ShellInput::Blank => continue,
            ShellInput::Reset => {
                session.reset();
                println!("\n  Conversation history cleared!\n");
            }
            ShellInput::Summary => {
                println!();
                print_summary(&session.summary());
                println!();
            }
            ShellInput::Query(query) => {
                eprint!("  ...");
                let outcome = session.chat(&query, k).await;
                eprint!("\r     \r");
                match outcome {
                    Ok(result) => {
                        println!();
                        for line in result.response.lines() {
                            println!("  Assistant > {line}");
                        }
                        println!();
                    }
                    Err(e) => {
                        eprintln!("  [Error] {e}");
                        eprintln!("  Please try again.");
                        println!();
                    }
                }
            }
        }
    }

    println!();
    println!("  Ending chat session. Goodbye!");
    println!();
    Ok(())
}

fn print_summary(summary: &ConversationSummary) {
    let fmt = |t: Option<chrono::DateTime<chrono::Utc>>| {
        t.map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
            .unwrap_or_else(|| "-".into())
    };
    println!("  Conversation Summary:");
    println!("    Total turns: {}", summary.total_turns);
    println!("    Start time:  {}", fmt(summary.start_time));
    println!("    End time:    {}", fmt(summary.end_time));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn control_tokens_ignore_case_and_padding() {
        assert_eq!(ShellInput::parse("exit"), ShellInput::Exit);
        assert_eq!(ShellInput::parse("  EXIT \n"), ShellInput::Exit);
        assert_eq!(ShellInput::parse("Reset"), ShellInput::Reset);
        assert_eq!(ShellInput::parse("SUMMARY"), ShellInput::Summary);
    }

    #[test]
    fn blank_lines_are_ignored() {
        assert_eq!(ShellInput::parse(""), ShellInput::Blank);
        assert_eq!(ShellInput::parse(" \t "), ShellInput::Blank);
    }

    #[test]
    fn tokens_must_match_whole_line() {
        assert_eq!(
            ShellInput::parse("exit the form"),
            ShellInput::Query("exit the form".into())
        );
        assert_eq!(
            ShellInput::parse("  how do I reset a form?  "),
            ShellInput::Query("how do I reset a form?".into())
        );
    }
}
