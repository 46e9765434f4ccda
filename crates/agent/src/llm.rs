use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use teleassist_core::config::{LlmConfig, LlmProvider};

const OPENAI_API_BASE: &str = "https://api.openai.com";
const ANTHROPIC_API_BASE: &str = "https://api.anthropic.com";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const MAX_OUTPUT_TOKENS: u32 = 1024;
const RETRY_BASE_DELAY_MS: u64 = 250;

/// One completion call. `grounding` carries the account facts the answer must be built
/// from; providers see it inside `prompt`, the offline client returns it verbatim.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LlmRequest {
    pub system: String,
    pub prompt: String,
    pub grounding: String,
}

impl LlmRequest {
    pub fn new(
        system: impl Into<String>,
        prompt: impl Into<String>,
        grounding: impl Into<String>,
    ) -> Self {
        Self { system: system.into(), prompt: prompt.into(), grounding: grounding.into() }
    }
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    fn provider(&self) -> &'static str;
    async fn complete(&self, request: &LlmRequest) -> Result<String>;
}

pub fn build_llm_client(config: &LlmConfig) -> Result<Arc<dyn LlmClient>> {
    let client: Arc<dyn LlmClient> = match config.provider {
        LlmProvider::Offline => Arc::new(OfflineLlmClient),
        LlmProvider::OpenAi => Arc::new(OpenAiCompatibleClient::new(
            "openai",
            config.base_url.as_deref().unwrap_or(OPENAI_API_BASE),
            Some(require_api_key(config)?),
            config,
        )?),
        LlmProvider::Ollama => {
            let base_url = config
                .base_url
                .as_deref()
                .ok_or_else(|| anyhow!("llm.base_url is required for the ollama provider"))?;
            Arc::new(OpenAiCompatibleClient::new("ollama", base_url, None, config)?)
        }
        LlmProvider::Anthropic => Arc::new(AnthropicClient::new(
            config.base_url.as_deref().unwrap_or(ANTHROPIC_API_BASE),
            require_api_key(config)?,
            config,
        )?),
    };

    debug!(
        event_name = "llm.client_built",
        provider = client.provider(),
        model = %config.model,
        "language model client ready"
    );
    Ok(client)
}

fn require_api_key(config: &LlmConfig) -> Result<SecretString> {
    config
        .api_key
        .clone()
        .ok_or_else(|| anyhow!("llm.api_key is required for the {} provider", config.provider.as_str()))
}

fn http_client(config: &LlmConfig) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()
        .context("failed to build HTTP client for language model provider")
}

/// Runs `attempt` up to `max_retries + 1` times with exponential backoff.
pub(crate) async fn with_retries<F, Fut>(
    provider: &'static str,
    max_retries: u32,
    mut attempt: F,
) -> Result<String>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<String>>,
{
    let mut retries = 0;
    loop {
        match attempt().await {
            Ok(text) => return Ok(text),
            Err(error) if retries < max_retries => {
                retries += 1;
                warn!(
                    event_name = "llm.retry",
                    provider,
                    attempt = retries,
                    error = %error,
                    "language model call failed; retrying"
                );
                let delay = RETRY_BASE_DELAY_MS.saturating_mul(1 << retries.min(6));
                tokio::time::sleep(Duration::from_millis(delay)).await;
            }
            Err(error) => return Err(error),
        }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Deserialize)]
struct ChatMessageResponse {
    content: Option<String>,
}

/// OpenAI `/v1/chat/completions`; Ollama serves the same route without an API key.
pub struct OpenAiCompatibleClient {
    provider: &'static str,
    endpoint: String,
    api_key: Option<SecretString>,
    model: String,
    temperature: f32,
    max_retries: u32,
    client: reqwest::Client,
}

impl OpenAiCompatibleClient {
    pub fn new(
        provider: &'static str,
        base_url: &str,
        api_key: Option<SecretString>,
        config: &LlmConfig,
    ) -> Result<Self> {
        Ok(Self {
            provider,
            endpoint: format!("{}/v1/chat/completions", base_url.trim_end_matches('/')),
            api_key,
            model: config.model.clone(),
            temperature: config.temperature,
            max_retries: config.max_retries,
            client: http_client(config)?,
        })
    }

    async fn complete_once(&self, request: &LlmRequest) -> Result<String> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage { role: "system", content: &request.system },
                ChatMessage { role: "user", content: &request.prompt },
            ],
            temperature: self.temperature,
            max_tokens: MAX_OUTPUT_TOKENS,
        };

        let mut call = self.client.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            call = call.bearer_auth(key.expose_secret());
        }

        let response = call
            .send()
            .await
            .with_context(|| format!("{} request failed", self.provider))?;
        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            bail!("{} API error {status}: {detail}", self.provider);
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .with_context(|| format!("{} response parse failed", self.provider))?;
        parsed
            .choices
            .into_iter()
            .find_map(|choice| choice.message.content)
            .filter(|text| !text.trim().is_empty())
            .ok_or_else(|| anyhow!("{} returned no completion text", self.provider))
    }
}

#[async_trait]
impl LlmClient for OpenAiCompatibleClient {
    fn provider(&self) -> &'static str {
        self.provider
    }

    async fn complete(&self, request: &LlmRequest) -> Result<String> {
        with_retries(self.provider, self.max_retries, || self.complete_once(request)).await
    }
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    system: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: String,
}

/// Anthropic `/v1/messages`.
pub struct AnthropicClient {
    endpoint: String,
    api_key: SecretString,
    model: String,
    temperature: f32,
    max_retries: u32,
    client: reqwest::Client,
}

impl AnthropicClient {
    pub fn new(base_url: &str, api_key: SecretString, config: &LlmConfig) -> Result<Self> {
        Ok(Self {
            endpoint: format!("{}/v1/messages", base_url.trim_end_matches('/')),
            api_key,
            model: config.model.clone(),
            temperature: config.temperature,
            max_retries: config.max_retries,
            client: http_client(config)?,
        })
    }

    async fn complete_once(&self, request: &LlmRequest) -> Result<String> {
        let body = MessagesRequest {
            model: &self.model,
            system: &request.system,
            messages: vec![ChatMessage { role: "user", content: &request.prompt }],
            temperature: self.temperature,
            max_tokens: MAX_OUTPUT_TOKENS,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .header("x-api-key", self.api_key.expose_secret())
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await
            .context("anthropic request failed")?;
        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            bail!("anthropic API error {status}: {detail}");
        }

        let parsed: MessagesResponse =
            response.json().await.context("anthropic response parse failed")?;
        let text = parsed
            .content
            .into_iter()
            .filter(|block| block.kind == "text")
            .map(|block| block.text)
            .collect::<Vec<_>>()
            .join("\n");
        if text.trim().is_empty() {
            bail!("anthropic returned no completion text");
        }
        Ok(text)
    }
}

#[async_trait]
impl LlmClient for AnthropicClient {
    fn provider(&self) -> &'static str {
        "anthropic"
    }

    async fn complete(&self, request: &LlmRequest) -> Result<String> {
        with_retries("anthropic", self.max_retries, || self.complete_once(request)).await
    }
}

/// No network access: answers with the grounded facts, or the prompt when there are none.
#[derive(Clone, Copy, Debug, Default)]
pub struct OfflineLlmClient;

#[async_trait]
impl LlmClient for OfflineLlmClient {
    fn provider(&self) -> &'static str {
        "offline"
    }

    async fn complete(&self, request: &LlmRequest) -> Result<String> {
        let grounding = request.grounding.trim();
        if grounding.is_empty() {
            return Ok(request.prompt.trim().to_string());
        }
        Ok(grounding.to_string())
    }
}

/// Scripted client that always answers with the same text and records every request.
#[derive(Debug, Default)]
pub struct StaticLlmClient {
    reply: String,
    requests: Mutex<Vec<LlmRequest>>,
}

impl StaticLlmClient {
    pub fn new(reply: impl Into<String>) -> Self {
        Self { reply: reply.into(), requests: Mutex::new(Vec::new()) }
    }

    pub fn requests(&self) -> Vec<LlmRequest> {
        self.requests.lock().map(|requests| requests.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl LlmClient for StaticLlmClient {
    fn provider(&self) -> &'static str {
        "static"
    }

    async fn complete(&self, request: &LlmRequest) -> Result<String> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }
        Ok(self.reply.clone())
    }
}

/// Scripted client whose every call fails, for exercising handler failure paths.
#[derive(Debug, Default)]
pub struct FailingLlmClient {
    calls: AtomicUsize,
}

impl FailingLlmClient {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmClient for FailingLlmClient {
    fn provider(&self) -> &'static str {
        "failing"
    }

    async fn complete(&self, _request: &LlmRequest) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        bail!("language model provider unavailable")
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use anyhow::anyhow;
    use secrecy::SecretString;
    use teleassist_core::config::{AppConfig, LlmConfig, LlmProvider};

    use super::{
        build_llm_client, with_retries, FailingLlmClient, LlmClient, LlmRequest, OfflineLlmClient,
        StaticLlmClient,
    };

    fn config(provider: LlmProvider) -> LlmConfig {
        LlmConfig { provider, ..AppConfig::default().llm }
    }

    #[tokio::test]
    async fn offline_client_returns_grounding() {
        let request = LlmRequest::new("system", "prompt with facts", "Total: $80.99");
        let text = OfflineLlmClient.complete(&request).await.expect("offline completion");
        assert_eq!(text, "Total: $80.99");

        let bare = LlmRequest::new("system", "  only a prompt ", "");
        assert_eq!(OfflineLlmClient.complete(&bare).await.expect("completion"), "only a prompt");
    }

    #[tokio::test]
    async fn static_client_records_requests() {
        let client = StaticLlmClient::new("scripted");
        let request = LlmRequest::new("s", "p", "g");
        assert_eq!(client.complete(&request).await.expect("completion"), "scripted");
        assert_eq!(client.requests(), vec![request]);
    }

    #[tokio::test]
    async fn failing_client_counts_calls() {
        let client = FailingLlmClient::default();
        assert!(client.complete(&LlmRequest::default()).await.is_err());
        assert_eq!(client.calls(), 1);
    }

    #[test]
    fn builds_clients_per_provider() {
        assert_eq!(build_llm_client(&config(LlmProvider::Offline)).expect("offline").provider(), "offline");

        let missing_key = build_llm_client(&config(LlmProvider::OpenAi));
        assert!(missing_key.is_err());

        let mut openai = config(LlmProvider::OpenAi);
        openai.api_key = Some(SecretString::from("sk-test".to_string()));
        assert_eq!(build_llm_client(&openai).expect("openai").provider(), "openai");

        let mut ollama = config(LlmProvider::Ollama);
        assert!(build_llm_client(&ollama).is_err());
        ollama.base_url = Some("http://localhost:11434".to_string());
        assert_eq!(build_llm_client(&ollama).expect("ollama").provider(), "ollama");

        let mut anthropic = config(LlmProvider::Anthropic);
        anthropic.api_key = Some(SecretString::from("key".to_string()));
        assert_eq!(build_llm_client(&anthropic).expect("anthropic").provider(), "anthropic");
    }

    #[tokio::test]
    async fn retries_until_success_within_budget() {
        let attempts = AtomicUsize::new(0);
        let text = with_retries("test", 2, || {
            let attempt = attempts.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt < 2 {
                    Err(anyhow!("transient"))
                } else {
                    Ok("done".to_string())
                }
            }
        })
        .await
        .expect("third attempt succeeds");
        assert_eq!(text, "done");
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_retries() {
        let attempts = AtomicUsize::new(0);
        let result = with_retries("test", 1, || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Err::<String, _>(anyhow!("down")) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }
}
