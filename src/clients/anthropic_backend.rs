//! Anthropic Messages API 后端
//!
//! 直接通过 `reqwest` 调用 `/messages` 接口

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::clients::backend::GenerationBackend;
use crate::config::Config;
use crate::error::BackendError;

const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    messages: Vec<Message<'a>>,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: String,
}

/// Anthropic 文本生成后端
pub struct AnthropicBackend {
    client: reqwest::Client,
    api_key: String,
    endpoint: String,
    model_name: String,
    temperature: f32,
    max_tokens: u32,
}

impl AnthropicBackend {
    pub fn new(config: &Config) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: config.anthropic_api_key.clone(),
            endpoint: format!(
                "{}/messages",
                config.anthropic_api_base_url.trim_end_matches('/')
            ),
            model_name: config.anthropic_model_name.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }
    }
}

#[async_trait]
impl GenerationBackend for AnthropicBackend {
    fn name(&self) -> &str {
        "anthropic"
    }

    async fn complete(&self, prompt: &str, timeout: Duration) -> Result<String, BackendError> {
        debug!("调用 Anthropic API，模型: {}", self.model_name);

        let request = MessagesRequest {
            model: &self.model_name,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            messages: vec![Message {
                role: "user",
                content: prompt,
            }],
        };

        let response = self
            .client
            .post(&self.endpoint)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .timeout(timeout)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    BackendError::Timeout(timeout)
                } else {
                    BackendError::Network(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            warn!("Anthropic API 返回错误: HTTP {}", status);
            return Err(BackendError::from_status(status.as_u16(), error_text));
        }

        let body: MessagesResponse = response.json().await.map_err(|e| BackendError::Provider {
            status: Some(status.as_u16()),
            message: format!("响应解析失败: {}", e),
        })?;

        debug!("Anthropic API 调用成功");

        let text = body
            .content
            .into_iter()
            .map(|block| block.text)
            .collect::<Vec<_>>()
            .join("");
        let text = text.trim();
        if text.is_empty() {
            return Err(BackendError::EmptyResponse);
        }
        Ok(text.to_string())
    }
}
