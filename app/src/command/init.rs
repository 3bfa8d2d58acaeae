use std::path::PathBuf;

use parley_config::Config;

/// Strategy for initializing the configuration.
///
/// Writes the default configuration to `~/parley/config.json`, or to the
/// path given with `--config`.
#[derive(Debug, Clone, Copy)]
pub struct InitStrategy;

impl super::CommandStrategy for InitStrategy {
    type Input = Option<PathBuf>;

    async fn execute(&self, input: Self::Input) -> anyhow::Result<()> {
        match input {
            Some(path) => Config::create_config_at(&path),
            None => Config::create_config().map(|_| ()),
        }
    }
}
