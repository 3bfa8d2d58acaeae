use std::time::Duration;

use async_trait::async_trait;
use parley_core::{GenerationParams, TextGenerator};
use reqwest::Client;
use serde_json::{Value, json};
use tracing::{debug, info};

use crate::retry::retry_with_backoff;

/// Text generation over the Hugging Face inference HTTP API.
///
/// Also works against a self-hosted text-generation-inference server, which
/// answers with a bare object instead of a one-element array.
pub struct HuggingFaceProvider {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    model: String,
    params: GenerationParams,
    retry_delays: Vec<Duration>,
}

impl HuggingFaceProvider {
    pub fn new(model: String, api_key: Option<String>) -> Self {
        info!("Creating HuggingFaceProvider for model '{model}'");
        Self {
            client: Client::new(),
            api_key: api_key.filter(|k| !k.is_empty()),
            base_url: "https://api-inference.huggingface.co".to_string(),
            model,
            params: GenerationParams::default(),
            retry_delays: [2, 4, 6, 8].into_iter().map(Duration::from_secs).collect(),
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    #[must_use]
    pub const fn with_params(mut self, params: GenerationParams) -> Self {
        self.params = params;
        self
    }

    #[must_use]
    pub fn with_retry_delays(mut self, delays: Vec<Duration>) -> Self {
        self.retry_delays = delays;
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}", self.base_url.trim_end_matches('/'), self.model)
    }

    fn request_body(&self, prompt: &str) -> Value {
        json!({
            "inputs": prompt,
            "parameters": {
                "max_new_tokens": self.params.max_new_tokens,
                "temperature": self.params.temperature,
                "top_k": self.params.top_k,
                "top_p": self.params.top_p,
                "do_sample": self.params.do_sample,
                "return_full_text": true,
            },
        })
    }

    /// Helper method to send a single request
    async fn try_send(&self, body: &Value) -> anyhow::Result<String> {
        let mut request = self.client.post(self.endpoint()).json(body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await?
            .error_for_status()?
            .json::<Value>()
            .await?;

        parse_generated_text(&response)
    }
}

/// Pull `generated_text` out of either `[{..}]` or `{..}`.
fn parse_generated_text(response: &Value) -> anyhow::Result<String> {
    let entry = match response {
        Value::Array(items) => items
            .first()
            .ok_or_else(|| anyhow::anyhow!("Invalid response format: empty result list"))?,
        other => other,
    };

    entry["generated_text"]
        .as_str()
        .map(ToString::to_string)
        .ok_or_else(|| anyhow::anyhow!("Invalid response format: missing generated_text"))
}

#[async_trait]
impl TextGenerator for HuggingFaceProvider {
    async fn generate(&self, prompt: &str) -> anyhow::Result<String> {
        let body = self.request_body(prompt);

        info!("Sending request to Hugging Face: model={}", self.model);
        debug!("Prompt length: {} chars", prompt.len());

        let text = retry_with_backoff(|| self.try_send(&body), &self.retry_delays).await?;

        info!("Received response from Hugging Face");
        Ok(text)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[expect(clippy::unwrap_used, reason = "Test failure should panic")]
    fn parses_array_response() {
        let value = json!([{ "generated_text": "Instruct: hi\nOutput: hello" }]);
        assert_eq!(
            parse_generated_text(&value).unwrap(),
            "Instruct: hi\nOutput: hello"
        );
    }

    #[test]
    #[expect(clippy::unwrap_used, reason = "Test failure should panic")]
    fn parses_object_response() {
        let value = json!({ "generated_text": "hello" });
        assert_eq!(parse_generated_text(&value).unwrap(), "hello");
    }

    #[test]
    fn rejects_malformed_response() {
        assert!(parse_generated_text(&json!([])).is_err());
        assert!(parse_generated_text(&json!({ "error": "Model is loading" })).is_err());
    }

    #[test]
    fn request_body_carries_params() {
        let provider = HuggingFaceProvider::new("microsoft/phi-1_5".to_string(), None)
            .with_params(GenerationParams {
                max_new_tokens: 64,
                ..GenerationParams::default()
            });

        let body = provider.request_body("User: hi\nBot:");
        assert_eq!(body["inputs"], "User: hi\nBot:");
        assert_eq!(body["parameters"]["max_new_tokens"], 64);
        assert_eq!(body["parameters"]["return_full_text"], true);
    }

    #[test]
    fn endpoint_joins_model_path() {
        let provider = HuggingFaceProvider::new("org/model".to_string(), Some(String::new()))
            .with_base_url("http://localhost:8080/".to_string());
        assert_eq!(provider.endpoint(), "http://localhost:8080/models/org/model");
        assert!(provider.api_key.is_none());
    }
}
