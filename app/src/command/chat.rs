//! Conversation command.
//!
//! Runs the interactive chatbot, or a single turn when a message is given.

use std::io::{IsTerminal, Write};
use std::path::PathBuf;

use parley_conversation::{ChatSession, SessionEnd};
use parley_core::TextGenerator;
use tracing::info;

use super::{build_provider, load_config};

/// Input parameters for the Chat command strategy.
#[derive(Debug, Clone)]
pub struct ChatInput {
    /// Config file override
    pub config_path: Option<PathBuf>,
    /// Optional single message to send (non-interactive mode)
    pub message: Option<String>,
    /// Optional model override
    pub model: Option<String>,
    /// Optional override of the prompt window size
    pub max_turns: Option<usize>,
}

/// Strategy for executing the Chat command.
#[derive(Debug, Clone, Copy)]
pub struct ChatStrategy;

impl super::CommandStrategy for ChatStrategy {
    type Input = ChatInput;

    async fn execute(&self, input: Self::Input) -> anyhow::Result<()> {
        let mut config = load_config(input.config_path.as_deref())?;
        if let Some(model) = input.model {
            config.model.name = model;
        }
        if let Some(max_turns) = input.max_turns {
            config.window.max_turns = max_turns;
        }

        let provider = build_provider(&config);
        let mut session = ChatSession::new(provider, config.window, config.extraction)?;

        if let Some(msg) = input.message {
            let result = session.process_turn(&msg).await?;
            println!("{}", result.reply);
            info!("Turn {} completed.", result.turn_number);
            return Ok(());
        }

        print_banner(session.generator().model_name())?;
        let end = session.run_interactive().await?;

        info!(
            "Conversation ended: {} total messages",
            session.window().len()
        );
        if end == SessionEnd::Interrupted {
            // stdin may still be blocked in a read the runtime would wait on
            std::io::stdout().flush()?;
            std::process::exit(0);
        }
        Ok(())
    }
}

fn print_banner(model: &str) -> anyhow::Result<()> {
    let mut stdout = std::io::stdout();
    if stdout.is_terminal() {
        // clear screen, cursor home
        write!(stdout, "\x1B[2J\x1B[1;1H")?;
    }

    let rule = "=".repeat(50);
    writeln!(stdout, "\n{rule}")?;
    writeln!(stdout, " Welcome to parley! Talking to {model}.")?;
    writeln!(stdout, " Type your message and press Enter.")?;
    writeln!(stdout, " Commands: /history, /clear, /exit")?;
    writeln!(stdout, "{rule}\n")?;
    stdout.flush()?;
    Ok(())
}
