use std::time::Duration;

use thiserror::Error;

use crate::models::result::AttemptRecord;

/// 应用程序错误类型
///
/// 调用方只会看到这几类错误，后端级别的错误在编排器内部被吸收
#[derive(Debug, Error)]
pub enum StyleError {
    /// 语料加载错误（启动阶段致命）
    #[error("语料错误: {0}")]
    CorpusLoad(#[from] CorpusLoadError),
    /// 查询错误（单次请求）
    #[error("查询错误: {0}")]
    InvalidQuery(#[from] InvalidQueryError),
    /// 所有后端均失败
    #[error("生成错误: {0}")]
    GenerationExhausted(#[from] GenerationExhaustedError),
    /// 简报参数错误
    #[error("简报错误: {0}")]
    InvalidBrief(#[from] BriefError),
}

/// 语料加载错误
#[derive(Debug, Error)]
pub enum CorpusLoadError {
    /// 文件不存在
    #[error("语料文件不存在: {path}")]
    NotFound { path: String },
    /// 读取文件失败
    #[error("读取语料文件失败 ({path}): {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// JSON 格式错误
    #[error("语料文件格式错误 ({path}): {source}")]
    Malformed {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    /// 语料为空
    #[error("语料为空: {path}")]
    Empty { path: String },
    /// 向量维度不一致
    #[error("文章 {id} 的向量维度为 {actual}，期望 {expected}")]
    DimensionMismatch {
        id: String,
        expected: usize,
        actual: usize,
    },
    /// 向量非法（空向量或包含 NaN / 无穷大）
    #[error("文章 {id} 的向量非法: {reason}")]
    InvalidEmbedding { id: String, reason: String },
    /// 文章 ID 重复
    #[error("文章 ID 重复: {id}")]
    DuplicateId { id: String },
    /// 向量化模型与语料维度不一致
    #[error("向量化模型维度为 {embedder}，语料维度为 {corpus}")]
    EmbedderDimensionMismatch { embedder: usize, corpus: usize },
}

/// 查询错误
#[derive(Debug, Error)]
pub enum InvalidQueryError {
    /// 查询向量维度与语料不一致
    #[error("查询向量维度为 {actual}，语料维度为 {expected}")]
    DimensionMismatch { expected: usize, actual: usize },
    /// 查询向量为空
    #[error("查询向量为空")]
    EmptyQuery,
    /// 查询向量包含 NaN 或无穷大
    #[error("查询向量包含非有限值")]
    NonFinite,
    /// k 必须 ≥ 1
    #[error("k 必须大于 0，实际为 {k}")]
    InvalidK { k: usize },
    /// 向量化失败
    #[error("简报向量化失败: {0}")]
    Embedding(#[from] EmbeddingError),
}

/// 向量化服务错误
#[derive(Debug, Error)]
pub enum EmbeddingError {
    /// API 调用失败
    #[error("向量 API 调用失败 (模型: {model}): {message}")]
    ApiCallFailed { model: String, message: String },
    /// 返回结果为空
    #[error("向量 API 返回结果为空 (模型: {model})")]
    EmptyResponse { model: String },
}

/// 单个后端的调用错误，只在编排器内部流转
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BackendError {
    /// 调用超时
    #[error("调用超时 ({0:?})")]
    Timeout(Duration),
    /// 网络错误
    #[error("网络错误: {0}")]
    Network(String),
    /// 鉴权失败
    #[error("鉴权失败: {0}")]
    Authentication(String),
    /// 请求频率限制
    #[error("请求频率限制")]
    RateLimited,
    /// 服务端返回错误
    #[error("服务端错误 (status={status:?}): {message}")]
    Provider {
        status: Option<u16>,
        message: String,
    },
    /// 返回内容为空
    #[error("返回内容为空")]
    EmptyResponse,
    /// 请求构建失败
    #[error("请求构建失败: {0}")]
    InvalidRequest(String),
}

impl BackendError {
    /// 是否值得在同一个后端上重试
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            BackendError::Timeout(_) | BackendError::Network(_) | BackendError::RateLimited
        )
    }
}

/// 所有后端（包括兜底模板）都失败
///
/// 正常情况下不可达，出现即需要告警
#[derive(Debug, Error)]
pub enum GenerationExhaustedError {
    /// 所有后端均失败
    #[error("所有后端均失败，共尝试 {} 次", attempts.len())]
    AllBackendsFailed { attempts: Vec<AttemptRecord> },
    /// 请求已被取消
    #[error("请求已被取消，已尝试 {} 次", attempts.len())]
    Cancelled { attempts: Vec<AttemptRecord> },
}

impl GenerationExhaustedError {
    /// 返回失败前的所有尝试记录
    pub fn attempts(&self) -> &[AttemptRecord] {
        match self {
            GenerationExhaustedError::AllBackendsFailed { attempts }
            | GenerationExhaustedError::Cancelled { attempts } => attempts,
        }
    }
}

/// 简报参数错误
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BriefError {
    /// 主题为空
    #[error("主题不能为空")]
    EmptyTopic,
    /// 目标字数为 0
    #[error("目标字数必须大于 0")]
    ZeroLength,
}

// ========== 便捷构造函数 ==========

impl CorpusLoadError {
    /// 创建读取失败错误
    pub fn read(path: impl Into<String>, source: std::io::Error) -> Self {
        CorpusLoadError::Read {
            path: path.into(),
            source,
        }
    }

    /// 创建格式错误
    pub fn malformed(path: impl Into<String>, source: serde_json::Error) -> Self {
        CorpusLoadError::Malformed {
            path: path.into(),
            source,
        }
    }
}

impl BackendError {
    /// 根据 HTTP 状态码创建错误
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            401 | 403 => BackendError::Authentication(message),
            429 => BackendError::RateLimited,
            _ => BackendError::Provider {
                status: Some(status),
                message,
            },
        }
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type StyleResult<T> = Result<T, StyleError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_error_from_status() {
        assert_eq!(
            BackendError::from_status(401, "bad key"),
            BackendError::Authentication("bad key".to_string())
        );
        assert_eq!(BackendError::from_status(429, ""), BackendError::RateLimited);
        assert_eq!(
            BackendError::from_status(500, "boom"),
            BackendError::Provider {
                status: Some(500),
                message: "boom".to_string()
            }
        );
    }

    #[test]
    fn test_retryable() {
        assert!(BackendError::Timeout(Duration::from_secs(1)).is_retryable());
        assert!(BackendError::RateLimited.is_retryable());
        assert!(!BackendError::Authentication(String::new()).is_retryable());
        assert!(!BackendError::EmptyResponse.is_retryable());
    }

    #[test]
    fn test_style_error_from_corpus_error() {
        let err: StyleError = CorpusLoadError::NotFound {
            path: "corpus.json".to_string(),
        }
        .into();
        assert!(matches!(err, StyleError::CorpusLoad(_)));
        assert!(err.to_string().contains("corpus.json"));
    }
}
