//! 向量化客户端
//!
//! 把简报文本转换为与语料同维度的向量

use async_openai::{
    config::OpenAIConfig, types::embeddings::CreateEmbeddingRequestArgs, Client,
};
use async_trait::async_trait;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::EmbeddingError;

/// 向量化服务
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

    /// 输出维度，未知时返回 None
    fn dimension(&self) -> Option<usize> {
        None
    }
}

/// OpenAI 兼容的 `/embeddings` 客户端
pub struct OpenAiEmbedder {
    client: Client<OpenAIConfig>,
    model_name: String,
    dimension: Option<usize>,
}

impl OpenAiEmbedder {
    pub fn new(config: &Config) -> Self {
        let openai_config = OpenAIConfig::new()
            .with_api_key(&config.embedding_api_key)
            .with_api_base(&config.embedding_api_base_url);

        Self {
            client: Client::with_config(openai_config),
            model_name: config.embedding_model_name.clone(),
            dimension: config
                .embedding_dimension
                .or_else(|| known_dimension(&config.embedding_model_name)),
        }
    }
}

/// 常见向量模型的输出维度
fn known_dimension(model_name: &str) -> Option<usize> {
    match model_name {
        "text-embedding-3-small" | "text-embedding-ada-002" => Some(1536),
        "text-embedding-3-large" => Some(3072),
        _ => None,
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        debug!("调用向量 API，模型: {}", self.model_name);

        let request = CreateEmbeddingRequestArgs::default()
            .model(&self.model_name)
            .input(text)
            .build()
            .map_err(|e| EmbeddingError::ApiCallFailed {
                model: self.model_name.clone(),
                message: e.to_string(),
            })?;

        let response = self.client.embeddings().create(request).await.map_err(|e| {
            warn!("向量 API 调用失败: {}", e);
            EmbeddingError::ApiCallFailed {
                model: self.model_name.clone(),
                message: e.to_string(),
            }
        })?;

        response
            .data
            .into_iter()
            .next()
            .map(|e| e.embedding)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| EmbeddingError::EmptyResponse {
                model: self.model_name.clone(),
            })
    }

    fn dimension(&self) -> Option<usize> {
        self.dimension
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configured_dimension_wins() {
        let config = Config {
            embedding_dimension: Some(384),
            ..Default::default()
        };
        assert_eq!(OpenAiEmbedder::new(&config).dimension(), Some(384));
    }

    #[test]
    fn test_dimension_inferred_from_model() {
        let config = Config {
            embedding_model_name: "text-embedding-3-large".to_string(),
            ..Default::default()
        };
        assert_eq!(OpenAiEmbedder::new(&config).dimension(), Some(3072));

        let config = Config {
            embedding_model_name: "in-house-encoder".to_string(),
            ..Default::default()
        };
        assert_eq!(OpenAiEmbedder::new(&config).dimension(), None);
    }
}
