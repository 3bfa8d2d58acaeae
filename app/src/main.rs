#![deny(
    clippy::all,
    clippy::nursery,
    clippy::pedantic,
    clippy::style,
    clippy::complexity,
    clippy::perf,
    clippy::correctness,
    clippy::suspicious,
    clippy::unwrap_used,
    clippy::expect_used
)]
#![allow(
    clippy::similar_names,
    clippy::missing_safety_doc,
    clippy::missing_panics_doc,
    clippy::missing_errors_doc
)]

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

mod command;

use command::{
    ChatInput, ChatStrategy, CommandStrategy, InfoStrategy, InitStrategy, VersionStrategy,
};

#[derive(Parser)]
#[command(name = "parley")]
#[command(about = "parley: terminal chatbot for completion models", long_about = None)]
struct Cli {
    /// Config file to use instead of ~/parley/config.json
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Chat interactively, or send a single message
    Chat {
        /// Single message to send
        #[arg(short = 'm', long)]
        message: Option<String>,

        /// Model to use
        #[arg(short = 'M', long)]
        model: Option<String>,

        /// User/bot pairs kept in the prompt
        #[arg(long)]
        max_turns: Option<usize>,
    },
    /// Initialize configuration
    Init,
    /// Show effective configuration
    Info,
    /// Show version
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let cli = Cli::parse();

    match cli.command {
        Commands::Chat {
            message,
            model,
            max_turns,
        } => {
            ChatStrategy
                .execute(ChatInput {
                    config_path: cli.config,
                    message,
                    model,
                    max_turns,
                })
                .await
        }
        Commands::Init => InitStrategy.execute(cli.config).await,
        Commands::Info => InfoStrategy.execute(cli.config).await,
        Commands::Version => VersionStrategy.execute(()).await,
    }
}
