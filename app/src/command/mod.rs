//! Static strategy pattern for CLI commands.
//!
//! Each command is a separate strategy with its own input type, dispatched
//! statically from `main`.

use std::path::Path;

use parley_config::Config;
use parley_providers::HuggingFaceProvider;
use parley_providers::retry::delays_from_secs;
use tracing::info;

mod chat;
mod info;
mod init;
mod version;

pub use chat::{ChatInput, ChatStrategy};
pub use info::InfoStrategy;
pub use init::InitStrategy;
pub use version::VersionStrategy;

/// Core trait defining the contract for all command strategies.
///
/// # Example
/// ```rust,ignore
/// struct MyStrategy;
///
/// impl CommandStrategy for MyStrategy {
///     type Input = MyInput;
///
///     async fn execute(&self, input: Self::Input) -> anyhow::Result<()> {
///         // Command logic here
///         Ok(())
///     }
/// }
/// ```
pub trait CommandStrategy: Send + Sync + 'static {
    /// The input type this strategy accepts.
    type Input;

    /// Execute the command with the given input.
    ///
    /// # Errors
    /// Returns an error if command execution fails.
    async fn execute(&self, input: Self::Input) -> anyhow::Result<()>;
}

/// Load the configuration from `path` or the default location.
fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let config = Config::load_or_default_path(path)?;
    info!("Using model {} at {}", config.model.name, config.model.base_url);
    Ok(config)
}

/// Build the text generation provider described by the config.
fn build_provider(config: &Config) -> HuggingFaceProvider {
    HuggingFaceProvider::new(config.model.name.clone(), config.model.api_key.clone())
        .with_base_url(config.model.base_url.clone())
        .with_params(config.model.params.clone())
        .with_retry_delays(delays_from_secs(&config.model.retry_delays_secs))
}
