//! OpenAI 兼容后端
//!
//! ## 技术栈
//! - 使用 `async-openai` crate 进行 API 调用
//! - 支持自定义 API 端点和模型
//! - 兼容 OpenAI API 的服务（如 Azure, Gemini, Doubao 等）

use std::time::Duration;

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use tracing::{debug, warn};

use crate::clients::backend::GenerationBackend;
use crate::config::Config;
use crate::error::BackendError;

const SYSTEM_MESSAGE: &str = "You are a professional business content writer. \
Follow the formatting instructions in the user message exactly.";

/// OpenAI 兼容的文本生成后端
pub struct OpenAiBackend {
    client: Client<OpenAIConfig>,
    model_name: String,
    temperature: f32,
    max_tokens: u32,
}

impl OpenAiBackend {
    /// 创建新的 OpenAI 后端
    pub fn new(config: &Config) -> Self {
        // 配置 OpenAI 客户端（兼容 OpenAI API 的服务）
        let openai_config = OpenAIConfig::new()
            .with_api_key(&config.openai_api_key)
            .with_api_base(&config.openai_api_base_url);

        Self {
            client: Client::with_config(openai_config),
            model_name: config.openai_model_name.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }
    }

    fn build_messages(
        &self,
        prompt: &str,
    ) -> Result<Vec<ChatCompletionRequestMessage>, OpenAIError> {
        let system_msg = ChatCompletionRequestSystemMessageArgs::default()
            .content(SYSTEM_MESSAGE)
            .build()?;
        let user_msg = ChatCompletionRequestUserMessageArgs::default()
            .content(prompt)
            .build()?;
        Ok(vec![
            ChatCompletionRequestMessage::System(system_msg),
            ChatCompletionRequestMessage::User(user_msg),
        ])
    }
}

#[async_trait]
impl GenerationBackend for OpenAiBackend {
    fn name(&self) -> &str {
        "openai"
    }

    async fn complete(&self, prompt: &str, _timeout: Duration) -> Result<String, BackendError> {
        debug!("调用 OpenAI API，模型: {}", self.model_name);
        debug!("提示词长度: {} 字符", prompt.len());

        let messages = self
            .build_messages(prompt)
            .map_err(|e| BackendError::InvalidRequest(e.to_string()))?;

        // 构建请求
        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model_name)
            .messages(messages)
            .temperature(self.temperature)
            .max_tokens(self.max_tokens)
            .build()
            .map_err(|e| BackendError::InvalidRequest(e.to_string()))?;

        // 调用 API
        let response = self.client.chat().create(request).await.map_err(|e| {
            warn!("OpenAI API 调用失败: {}", e);
            map_openai_error(e)
        })?;

        debug!("OpenAI API 调用成功");

        // 提取响应内容
        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .ok_or(BackendError::EmptyResponse)?;

        Ok(content)
    }
}

fn map_openai_error(err: OpenAIError) -> BackendError {
    match err {
        OpenAIError::Reqwest(e) => match e.status() {
            Some(status) => BackendError::from_status(status.as_u16(), e.to_string()),
            None => BackendError::Network(e.to_string()),
        },
        OpenAIError::ApiError(api) => {
            let message = api.message.clone();
            match api.r#type.as_deref() {
                Some("invalid_api_key") | Some("authentication_error") => {
                    BackendError::Authentication(message)
                }
                Some("rate_limit_exceeded") | Some("insufficient_quota") => {
                    BackendError::RateLimited
                }
                _ => BackendError::Provider {
                    status: None,
                    message,
                },
            }
        }
        OpenAIError::InvalidArgument(msg) => BackendError::InvalidRequest(msg),
        other => BackendError::Provider {
            status: None,
            message: other.to_string(),
        },
    }
}
