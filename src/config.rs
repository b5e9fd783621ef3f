use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

/// 程序配置文件
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 参考文章语料文件（含预计算向量）
    pub corpus_path: String,
    /// 每次请求选取的范例数量
    pub top_k: usize,
    /// 范例最低相似度
    pub min_similarity: f64,
    /// 是否按分类挑选多样化范例
    pub diverse_examples: bool,
    /// 简报未指定分类时，是否按相似文章推断分类
    pub infer_category: bool,
    /// 每个范例摘录的最大字符数
    pub excerpt_char_cap: usize,
    /// 单个后端的超时时间（毫秒）
    pub backend_timeout_ms: u64,
    /// 整个请求的截止时间（毫秒）
    pub overall_deadline_ms: u64,
    /// 单个后端的最大尝试次数
    pub max_attempts_per_backend: u32,
    /// 重试间隔（毫秒）
    pub retry_backoff_ms: u64,
    /// 结果缓存容量（0 表示关闭）
    pub cache_capacity: usize,
    /// 批量生成的最大并发数
    pub max_concurrent_requests: usize,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    /// 是否输出 JSON 格式日志
    pub json_logs: bool,
    /// 后端调用顺序
    pub provider_order: Vec<String>,
    // --- 生成参数 ---
    pub temperature: f32,
    pub max_tokens: u32,
    // --- OpenAI 兼容服务配置 ---
    pub openai_api_key: String,
    pub openai_api_base_url: String,
    pub openai_model_name: String,
    // --- Anthropic 配置 ---
    pub anthropic_api_key: String,
    pub anthropic_api_base_url: String,
    pub anthropic_model_name: String,
    // --- 向量服务配置 ---
    pub embedding_api_key: String,
    pub embedding_api_base_url: String,
    pub embedding_model_name: String,
    /// 向量维度，未配置时按模型名推断
    pub embedding_dimension: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            corpus_path: "data/reference_corpus.json".to_string(),
            top_k: 3,
            min_similarity: 0.1,
            diverse_examples: true,
            infer_category: true,
            excerpt_char_cap: 600,
            backend_timeout_ms: 30_000,
            overall_deadline_ms: 60_000,
            max_attempts_per_backend: 2,
            retry_backoff_ms: 500,
            cache_capacity: 128,
            max_concurrent_requests: 4,
            verbose_logging: false,
            json_logs: false,
            provider_order: vec!["anthropic".to_string(), "openai".to_string()],
            temperature: 0.8,
            max_tokens: 1000,
            openai_api_key: String::new(),
            openai_api_base_url: "https://api.openai.com/v1".to_string(),
            openai_model_name: "gpt-3.5-turbo".to_string(),
            anthropic_api_key: String::new(),
            anthropic_api_base_url: "https://api.anthropic.com/v1".to_string(),
            anthropic_model_name: "claude-3-haiku-20240307".to_string(),
            embedding_api_key: String::new(),
            embedding_api_base_url: "https://api.openai.com/v1".to_string(),
            embedding_model_name: "text-embedding-3-small".to_string(),
            embedding_dimension: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// 从 TOML 文件加载配置，环境变量优先
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("无法读取配置文件: {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("无法解析配置文件: {}", path.display()))?;
        Ok(config.with_env_overrides())
    }

    fn with_env_overrides(self) -> Self {
        let default = self;
        // Anthropic 的 key 兼容两个变量名
        let anthropic_api_key = env_string("ANTHROPIC_API_KEY")
            .or_else(|| env_string("CLAUDE_API_KEY"))
            .map(|k| k.trim().to_string())
            .unwrap_or(default.anthropic_api_key);
        let openai_api_key = env_string("OPENAI_API_KEY")
            .map(|k| k.trim().to_string())
            .unwrap_or(default.openai_api_key);
        // 向量服务默认复用 OpenAI 的 key
        let embedding_api_key = env_string("STYLED_EMBEDDING_API_KEY").unwrap_or_else(|| {
            if default.embedding_api_key.is_empty() {
                openai_api_key.clone()
            } else {
                default.embedding_api_key.clone()
            }
        });

        Self {
            corpus_path: env_string("STYLED_CORPUS_PATH").unwrap_or(default.corpus_path),
            top_k: env_parse("STYLED_TOP_K").unwrap_or(default.top_k),
            min_similarity: env_parse("STYLED_MIN_SIMILARITY").unwrap_or(default.min_similarity),
            diverse_examples: env_parse("STYLED_DIVERSE_EXAMPLES").unwrap_or(default.diverse_examples),
            infer_category: env_parse("STYLED_INFER_CATEGORY").unwrap_or(default.infer_category),
            excerpt_char_cap: env_parse("STYLED_EXCERPT_CHAR_CAP").unwrap_or(default.excerpt_char_cap),
            backend_timeout_ms: env_parse("STYLED_BACKEND_TIMEOUT_MS").unwrap_or(default.backend_timeout_ms),
            overall_deadline_ms: env_parse("STYLED_OVERALL_DEADLINE_MS").unwrap_or(default.overall_deadline_ms),
            max_attempts_per_backend: env_parse("STYLED_MAX_ATTEMPTS").unwrap_or(default.max_attempts_per_backend),
            retry_backoff_ms: env_parse("STYLED_RETRY_BACKOFF_MS").unwrap_or(default.retry_backoff_ms),
            cache_capacity: env_parse("STYLED_CACHE_CAPACITY").unwrap_or(default.cache_capacity),
            max_concurrent_requests: env_parse("STYLED_MAX_CONCURRENT").unwrap_or(default.max_concurrent_requests),
            verbose_logging: env_parse("VERBOSE_LOGGING").unwrap_or(default.verbose_logging),
            json_logs: env_parse("STYLED_JSON_LOGS").unwrap_or(default.json_logs),
            provider_order: env_string("STYLED_PROVIDER_ORDER")
                .map(|v| parse_provider_order(&v))
                .unwrap_or(default.provider_order),
            temperature: env_parse("STYLED_TEMPERATURE").unwrap_or(default.temperature),
            max_tokens: env_parse("STYLED_MAX_TOKENS").unwrap_or(default.max_tokens),
            openai_api_key,
            openai_api_base_url: env_string("OPENAI_API_BASE_URL").unwrap_or(default.openai_api_base_url),
            openai_model_name: env_string("OPENAI_MODEL_NAME").unwrap_or(default.openai_model_name),
            anthropic_api_key,
            anthropic_api_base_url: env_string("ANTHROPIC_API_BASE_URL").unwrap_or(default.anthropic_api_base_url),
            anthropic_model_name: env_string("ANTHROPIC_MODEL_NAME").unwrap_or(default.anthropic_model_name),
            embedding_api_key,
            embedding_api_base_url: env_string("STYLED_EMBEDDING_API_BASE_URL").unwrap_or(default.embedding_api_base_url),
            embedding_model_name: env_string("STYLED_EMBEDDING_MODEL_NAME").unwrap_or(default.embedding_model_name),
            embedding_dimension: env_parse("STYLED_EMBEDDING_DIMENSION").or(default.embedding_dimension),
        }
    }

    /// 按配置顺序返回已启用（配置了 key）的后端名称
    pub fn enabled_providers(&self) -> Vec<String> {
        self.provider_order
            .iter()
            .filter(|name| match name.as_str() {
                "openai" => !self.openai_api_key.is_empty(),
                "anthropic" => !self.anthropic_api_key.is_empty(),
                _ => false,
            })
            .cloned()
            .collect()
    }
}

fn env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

fn parse_provider_order(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}
