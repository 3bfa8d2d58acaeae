use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use parley_conversation::{ExtractionConfig, WindowConfig};
use parley_core::{DEFAULT_FALLBACK_TEXT, DEFAULT_MODEL, GenerationParams};

/// Stop markers tuned for small instruction-following completion models.
pub const DEFAULT_STOP_MARKERS: [&str; 10] = [
    "\nUser:",
    "\nBot:",
    "\nInstruct:",
    "\nQuestion:",
    "\nAnswer:",
    "\nExercise",
    "\n1.",
    "\n2.",
    "\n-",
    "\n\n",
];

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default = "Config::default_window")]
    pub window: WindowConfig,
    #[serde(default = "Config::default_extraction")]
    pub extraction: ExtractionConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model: ModelConfig::default(),
            window: Self::default_window(),
            extraction: Self::default_extraction(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ModelConfig {
    #[serde(default = "ModelConfig::default_name")]
    pub name: String,
    #[serde(default = "ModelConfig::default_base_url")]
    pub base_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(flatten)]
    pub params: GenerationParams,
    #[serde(default = "ModelConfig::default_retry_delays")]
    pub retry_delays_secs: Vec<u64>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            name: Self::default_name(),
            base_url: Self::default_base_url(),
            api_key: None,
            params: GenerationParams::default(),
            retry_delays_secs: Self::default_retry_delays(),
        }
    }
}

impl ModelConfig {
    fn default_name() -> String {
        DEFAULT_MODEL.to_string()
    }

    fn default_base_url() -> String {
        "https://api-inference.huggingface.co".to_string()
    }

    fn default_retry_delays() -> Vec<u64> {
        vec![2, 4, 6, 8]
    }
}

impl Config {
    /// `Instruct: <dialogue>\nOutput:` framing with `User`/`Bot` speakers.
    fn default_window() -> WindowConfig {
        WindowConfig::default()
            .with_max_turns(5)
            .with_role_labels("User", "Bot")
            .with_preamble("Instruct: ")
            .with_trailing_cue("\nOutput:")
    }

    fn default_extraction() -> ExtractionConfig {
        ExtractionConfig::default()
            .with_sentinel("Output:")
            .with_stop_markers(DEFAULT_STOP_MARKERS)
            .with_assistant_prefixes(["Bot", "Assistant"])
            .with_fallback_text(DEFAULT_FALLBACK_TEXT)
    }

    /// Default location: `~/parley/config.json`.
    pub fn default_path() -> anyhow::Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.json"))
    }

    fn config_dir() -> anyhow::Result<PathBuf> {
        Ok(dirs::home_dir()
            .ok_or_else(|| anyhow::anyhow!("Cannot find home directory"))?
            .join("parley"))
    }

    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&Self::default_path()?)
    }

    pub fn load_from(config_path: &Path) -> anyhow::Result<Self> {
        if !config_path.exists() {
            anyhow::bail!(
                "Config file not found at: {}. Please run 'parley init' to create config.",
                config_path.display()
            );
        }

        let content = std::fs::read_to_string(config_path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;

        tracing::debug!("Loaded config from {}", config_path.display());
        Ok(config)
    }

    /// Load from `path`, or the default location when `None`.
    pub fn load_or_default_path(path: Option<&Path>) -> anyhow::Result<Self> {
        path.map_or_else(Self::load, Self::load_from)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        self.window.validate()?;
        for warning in self.prompt_warnings() {
            tracing::warn!("{warning}");
        }
        Ok(())
    }

    /// Mismatches between the window and extraction sections that still load
    /// but make replies harder to isolate.
    #[must_use]
    pub fn prompt_warnings(&self) -> Vec<String> {
        let cue = self.window.trailing_cue();
        self.extraction
            .sentinel
            .as_deref()
            .filter(|sentinel| !sentinel.is_empty() && !cue.contains(sentinel))
            .map(|sentinel| {
                format!(
                    "extraction.sentinel {sentinel:?} never appears in window.trailing_cue \
                     {cue:?}; replies will be isolated by removing the prompt instead"
                )
            })
            .into_iter()
            .collect()
    }

    pub fn ensure_config_dir() -> anyhow::Result<PathBuf> {
        let config_dir = Self::config_dir()?;
        std::fs::create_dir_all(&config_dir)?;
        Ok(config_dir)
    }

    pub fn create_config() -> anyhow::Result<PathBuf> {
        let config_dir = Self::ensure_config_dir()?;
        let config_path = config_dir.join("config.json");
        Self::create_config_at(&config_path)?;
        Ok(config_path)
    }

    /// Write the default configuration to `config_path`. Never overwrites.
    pub fn create_config_at(config_path: &Path) -> anyhow::Result<()> {
        if config_path.exists() {
            anyhow::bail!(
                "Config file already exists at: {}. Please edit it directly.",
                config_path.display()
            );
        }
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let template = serde_json::to_string_pretty(&Self::default())?;
        std::fs::write(config_path, template)?;

        println!("✅ Created config file at: {}", config_path.display());
        println!();
        println!("📝 Next steps:");
        println!("   1. Add your Hugging Face token as model.api_key (optional for public models)");
        println!("   2. Point model.base_url at a local text-generation server if you run one");
        println!("   3. Run 'parley chat' to start a conversation");
        println!();
        println!("🔧 Configuration options:");
        println!("   - model.name: model to query (microsoft/phi-1_5, microsoft/phi-2, etc.)");
        println!("   - window.max_turns: user/bot pairs kept in the prompt");
        println!("   - extraction.stop_markers: text that ends a reply");
        println!("   - window.trailing_cue should contain extraction.sentinel; a window");
        println!("     section without trailing_cue ends prompts with the assistant label");
        println!();
        Ok(())
    }
}
