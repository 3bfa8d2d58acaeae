use std::path::PathBuf;

use super::load_config;

/// Strategy for displaying configuration information.
///
/// Prints the model endpoint (API key masked), sampling parameters, the
/// prompt window and the reply extraction settings.
#[derive(Debug, Clone, Copy)]
pub struct InfoStrategy;

impl super::CommandStrategy for InfoStrategy {
    type Input = Option<PathBuf>;

    async fn execute(&self, input: Self::Input) -> anyhow::Result<()> {
        let config = load_config(input.as_deref())?;

        println!("=== parley Configuration ===\n");

        println!("Model:");
        println!("  Name: {}", config.model.name);
        println!("  Base URL: {}", config.model.base_url);
        let api_key = config
            .model
            .api_key
            .as_deref()
            .map_or_else(|| "(not set)".to_string(), mask_key);
        println!("  API Key: {api_key}");
        println!("  Max New Tokens: {}", config.model.params.max_new_tokens);
        println!("  Temperature: {}", config.model.params.temperature);
        println!("  Top K: {}", config.model.params.top_k);
        println!("  Top P: {}", config.model.params.top_p);
        println!("  Sampling: {}", config.model.params.do_sample);
        println!("  Retry Delays (s): {:?}", config.model.retry_delays_secs);
        println!();

        println!("Window:");
        println!("  Max Turns: {}", config.window.max_turns);
        println!(
            "  Labels: {} / {}",
            config.window.role_labels.user, config.window.role_labels.assistant
        );
        println!("  Preamble: {:?}", config.window.preamble);
        println!("  Trailing Cue: {:?}", config.window.trailing_cue());
        println!();

        println!("Extraction:");
        match &config.extraction.sentinel {
            Some(sentinel) => println!("  Sentinel: {sentinel:?}"),
            None => println!("  Sentinel: (none)"),
        }
        println!("  Stop Markers: {:?}", config.extraction.stop_markers);
        println!(
            "  Assistant Prefixes: {}",
            config.extraction.assistant_prefixes.join(", ")
        );
        println!(
            "  Fallback: {}",
            truncate(&config.extraction.fallback_text, 60)
        );

        for warning in config.prompt_warnings() {
            println!("\n⚠️  {warning}");
        }

        Ok(())
    }
}

fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() > 8 {
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{head}...{tail}")
    } else {
        "***".to_string()
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{head}...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masks_long_keys() {
        assert_eq!(mask_key("hf_abcdefghijkl"), "hf_a...ijkl");
        assert_eq!(mask_key("short"), "***");
    }

    #[test]
    fn truncates_on_char_boundaries() {
        assert_eq!(truncate("hello", 10), "hello");
        assert_eq!(truncate("ééééééé", 5), "éé...");
    }
}
