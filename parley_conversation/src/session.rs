//! Chat session driving one conversation.
//!
//! A `ChatSession` owns the window, the extraction settings and the text
//! generator. Each turn renders a prompt, asks the generator for a
//! continuation, cleans it up and records the exchange.

use std::future::Future;
use std::io::Write;
use std::sync::Arc;

use parley_core::{Role, TextGenerator};
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::extract::{ExtractionConfig, ResponseExtractor};
use crate::window::{ConversationWindow, WindowConfig, WindowError};

/// Errors that can occur while running a conversation.
#[derive(Debug, Error)]
pub enum ConversationError {
    #[error("Text generation failed: {0}")]
    Generation(#[from] anyhow::Error),

    #[error(transparent)]
    Window(#[from] WindowError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Outcome of one successful turn.
#[derive(Debug, Clone)]
pub struct TurnResult {
    /// Cleaned assistant reply, as stored in the window
    pub reply: String,
    /// Prompt that was sent to the generator
    pub prompt: String,
    /// Untouched generator output
    pub raw_output: String,
    pub turn_number: usize,
}

/// How an interactive loop came to an end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The user typed `/exit`
    Exit,
    /// Input was exhausted
    EndOfInput,
    /// Ctrl+C, at the prompt or while a reply was being generated
    Interrupted,
}

/// Input line interpreted by the interactive loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReplCommand<'a> {
    Exit,
    Clear,
    History,
    Skip,
    Say(&'a str),
}

impl ReplCommand<'_> {
    fn parse(line: &str) -> ReplCommand<'_> {
        let input = line.trim();
        if input.is_empty() {
            return ReplCommand::Skip;
        }
        match input.to_lowercase().as_str() {
            "/exit" => ReplCommand::Exit,
            "/clear" => ReplCommand::Clear,
            "/history" => ReplCommand::History,
            _ => ReplCommand::Say(input),
        }
    }
}

/// One conversation: window, extraction settings and generator.
pub struct ChatSession<G = Arc<dyn TextGenerator>> {
    id: Uuid,
    generator: G,
    window: ConversationWindow,
    extraction: ExtractionConfig,
}

impl<G> ChatSession<G>
where
    G: TextGenerator,
{
    /// Create a session with an empty window.
    pub fn new(
        generator: G,
        window_config: WindowConfig,
        extraction: ExtractionConfig,
    ) -> Result<Self, ConversationError> {
        let window = ConversationWindow::new(window_config)?;
        let id = Uuid::now_v7();
        info!(
            "Creating chat session {id} (model: {}, max turns: {})",
            generator.model_name(),
            window.config().max_turns
        );

        Ok(Self {
            id,
            generator,
            window,
            extraction,
        })
    }

    /// Run a single turn.
    ///
    /// Nothing is recorded unless the generator succeeds, so a failed turn
    /// leaves the window exactly as it was.
    pub async fn process_turn(
        &mut self,
        user_input: &str,
    ) -> Result<TurnResult, ConversationError> {
        let turn_number = self.window.turn_count() + 1;
        info!("Processing turn {turn_number} for session: {}", self.id);

        let prompt = self.window.render_with_pending(Role::User, user_input);
        debug!("Prompt fed to model:\n{prompt}");

        let raw_output = self.generator.generate(&prompt).await?;
        debug!("Raw model output:\n{raw_output}");

        let reply = ResponseExtractor::extract(&raw_output, &prompt, &self.extraction);

        self.window.append(Role::User, user_input);
        self.window.append(Role::Assistant, reply.clone());

        debug!("Turn {turn_number} completed successfully");

        Ok(TurnResult {
            reply,
            prompt,
            raw_output,
            turn_number,
        })
    }

    /// Run the read-eval-print loop on stdin and stdout.
    ///
    /// After [`SessionEnd::Interrupted`] a blocking stdin read may still be
    /// pending, so callers should exit the process rather than wait for the
    /// runtime to shut down.
    pub async fn run_interactive(&mut self) -> Result<SessionEnd, ConversationError> {
        let stdin = tokio::io::BufReader::new(tokio::io::stdin());
        let mut stdout = std::io::stdout();
        self.run_with_io(stdin, &mut stdout).await
    }

    /// Run the read-eval-print loop over arbitrary input and output, stopping
    /// on Ctrl+C.
    pub async fn run_with_io<R, W>(
        &mut self,
        reader: R,
        writer: &mut W,
    ) -> Result<SessionEnd, ConversationError>
    where
        R: AsyncBufRead + Unpin,
        W: Write,
    {
        self.run_until(reader, writer, ctrl_c()).await
    }

    /// Run the read-eval-print loop until `/exit`, end of input or
    /// `shutdown` resolves.
    ///
    /// `shutdown` is watched for the whole loop, including while the
    /// generator is running. An interrupted turn records nothing. Failed
    /// turns are reported and the loop carries on.
    pub async fn run_until<R, W, S>(
        &mut self,
        reader: R,
        writer: &mut W,
        shutdown: S,
    ) -> Result<SessionEnd, ConversationError>
    where
        R: AsyncBufRead + Unpin,
        W: Write,
        S: Future<Output = ()>,
    {
        let labels = self.window.config().role_labels.clone();
        let mut lines = reader.lines();
        tokio::pin!(shutdown);

        let end = loop {
            write!(writer, "{}: ", labels.user)?;
            writer.flush()?;

            let line = tokio::select! {
                line = lines.next_line() => line?,
                () = &mut shutdown => {
                    writeln!(writer, "\nExiting chatbot. Goodbye!")?;
                    break SessionEnd::Interrupted;
                }
            };

            let Some(line) = line else {
                writeln!(writer)?;
                break SessionEnd::EndOfInput;
            };

            match ReplCommand::parse(&line) {
                ReplCommand::Exit => {
                    writeln!(writer, "Exiting chatbot. Goodbye!")?;
                    break SessionEnd::Exit;
                }
                ReplCommand::Skip => {}
                ReplCommand::Clear => {
                    self.clear();
                    writeln!(writer, "Conversation history cleared.")?;
                }
                ReplCommand::History => {
                    if self.window.is_empty() {
                        writeln!(writer, "(no messages yet)")?;
                    }
                    for msg in self.window.messages() {
                        writeln!(writer, "{}: {}", labels.label(msg.role()), msg.text())?;
                    }
                }
                ReplCommand::Say(input) => {
                    let outcome = tokio::select! {
                        outcome = self.process_turn(input) => outcome,
                        () = &mut shutdown => {
                            writeln!(writer, "\nExiting chatbot. Goodbye!")?;
                            break SessionEnd::Interrupted;
                        }
                    };
                    match outcome {
                        Ok(result) => writeln!(writer, "{}: {}", labels.assistant, result.reply)?,
                        Err(e) => {
                            warn!("Turn failed for session {}: {e}", self.id);
                            writeln!(writer, "An error occurred: {e}")?;
                            writeln!(writer, "Please try again or type '/exit' to quit.")?;
                        }
                    }
                }
            }
        };

        info!(
            "Session {} ended ({end:?}) after {} turns",
            self.id,
            self.window.turn_count()
        );
        Ok(end)
    }

    /// Forget the conversation so far.
    pub fn clear(&mut self) {
        self.window.clear();
        info!("Conversation history cleared for session: {}", self.id);
    }

    #[must_use]
    pub const fn window(&self) -> &ConversationWindow {
        &self.window
    }

    #[must_use]
    pub const fn generator(&self) -> &G {
        &self.generator
    }

    #[must_use]
    pub const fn extraction(&self) -> &ExtractionConfig {
        &self.extraction
    }

    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }
}

/// Resolves on the first Ctrl+C. Never resolves if the handler cannot be
/// installed.
async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl+C: {e}");
        std::future::pending::<()>().await;
    }
}
