//! 风格化文章生成器 - 编排层
//!
//! ## 职责
//!
//! 本模块是对外的唯一入口，把一份简报变成一篇带元数据的文章。
//!
//! ## 核心功能
//!
//! 1. **资源装配**：加载语料、按配置创建后端列表（`from_config`）
//! 2. **单次生成**：向量化 → 选范例 → 推断分类 → 组装提示词 → 编排生成 → 评分
//! 3. **结果缓存**：可选的 LRU 缓存，键为（归一化简报, 范例 ID）
//! 4. **批量生成**：使用 Semaphore 限制并发数量
//! 5. **风格参考**：按主题列出相似文章、列出语料中的分类
//!
//! ## 设计特点
//!
//! - **资源所有者**：持有语料、向量化客户端和编排器，全部只读共享
//! - **无业务逻辑**：具体能力委托给 services 和 workflow

use std::borrow::Cow;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use futures::future::join_all;
use lru::LruCache;
use tokio::sync::{Mutex, Semaphore};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::clients::{
    AnthropicBackend, Embedder, GenerationBackend, OpenAiBackend, OpenAiEmbedder, TemplateBackend,
};
use crate::config::Config;
use crate::error::{BriefError, CorpusLoadError, InvalidQueryError, StyleResult};
use crate::models::article::count_words;
use crate::models::brief::Brief;
use crate::models::result::{
    ExemplarRef, ExemplarSelection, GenerationMetadata, GenerationResult, StyleRecommendation,
};
use crate::services::corpus_store::CorpusStore;
use crate::services::prompt_assembler::{self, StyleGuideRules};
use crate::services::quality_scorer;
use crate::services::similarity_ranker::{self, SimilarityRanker};
use crate::utils::logging;
use crate::workflow::generation_orchestrator::{GenerationOrchestrator, OrchestratorPolicy};
use crate::workflow::request_ctx::RequestCtx;

/// 生成器运行参数
#[derive(Debug, Clone)]
pub struct GeneratorSettings {
    /// 每次请求最多选取的范例数
    pub top_k: usize,
    pub min_similarity: f64,
    /// 是否优先选取不同分类的范例
    pub diverse_examples: bool,
    /// 简报未指定分类时按最相似的文章推断分类
    pub infer_category: bool,
    pub overall_deadline: Duration,
    /// 结果缓存容量，0 表示不缓存
    pub cache_capacity: usize,
    pub max_concurrent_requests: usize,
}

impl Default for GeneratorSettings {
    fn default() -> Self {
        Self {
            top_k: 3,
            min_similarity: crate::services::similarity_ranker::DEFAULT_MIN_SIMILARITY,
            diverse_examples: true,
            infer_category: true,
            overall_deadline: Duration::from_secs(60),
            cache_capacity: 128,
            max_concurrent_requests: 4,
        }
    }
}

impl GeneratorSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            top_k: config.top_k.max(1),
            min_similarity: config.min_similarity,
            diverse_examples: config.diverse_examples,
            infer_category: config.infer_category,
            overall_deadline: Duration::from_millis(config.overall_deadline_ms),
            cache_capacity: config.cache_capacity,
            max_concurrent_requests: config.max_concurrent_requests.max(1),
        }
    }
}

type ResultCache = Mutex<LruCache<String, GenerationResult>>;

/// 推断分类时参与投票的文章数
const CATEGORY_VOTES: usize = 3;

/// 风格参考预览的最大字符数
const PREVIEW_CHARS: usize = 200;

/// 风格化文章生成器
pub struct StyledArticleGenerator {
    corpus: Arc<CorpusStore>,
    embedder: Arc<dyn Embedder>,
    ranker: SimilarityRanker,
    orchestrator: GenerationOrchestrator,
    rules: StyleGuideRules,
    settings: GeneratorSettings,
    cache: Option<ResultCache>,
}

impl StyledArticleGenerator {
    /// 创建生成器
    ///
    /// 向量化模型声明的维度与语料维度不一致时直接失败，不会拖到第一次请求
    pub fn new(
        corpus: Arc<CorpusStore>,
        embedder: Arc<dyn Embedder>,
        orchestrator: GenerationOrchestrator,
        rules: StyleGuideRules,
        settings: GeneratorSettings,
    ) -> Result<Self, CorpusLoadError> {
        if let Some(dimension) = embedder.dimension() {
            if dimension != corpus.dimension() {
                error!(
                    "❌ 向量化模型维度 ({}) 与语料维度 ({}) 不一致",
                    dimension,
                    corpus.dimension()
                );
                return Err(CorpusLoadError::EmbedderDimensionMismatch {
                    embedder: dimension,
                    corpus: corpus.dimension(),
                });
            }
        }

        let ranker = SimilarityRanker::new(corpus.dimension(), settings.min_similarity);
        let cache = NonZeroUsize::new(settings.cache_capacity).map(|cap| Mutex::new(LruCache::new(cap)));

        Ok(Self {
            corpus,
            embedder,
            ranker,
            orchestrator,
            rules,
            settings,
            cache,
        })
    }

    /// 按配置装配生产环境的生成器
    ///
    /// 语料加载失败直接返回错误；外部后端按 `provider_order` 排列，模板后端始终兜底
    pub async fn from_config(config: &Config) -> anyhow::Result<Self> {
        logging::log_startup(config);

        let corpus = CorpusStore::load(&config.corpus_path)
            .await
            .with_context(|| format!("无法加载参考语料: {}", config.corpus_path))?;
        logging::log_corpus_stats(&corpus.category_statistics());

        let backends = build_backends(config);
        if backends.is_empty() {
            warn!("⚠️ 未配置任何外部生成后端，所有请求将使用模板生成");
        }

        let orchestrator = GenerationOrchestrator::new(
            backends,
            Arc::new(TemplateBackend::new()),
            OrchestratorPolicy::from_config(config),
        );
        let policy = orchestrator.policy();
        info!(
            "🔗 后端顺序: {} (单次超时 {:?}, 每个后端最多 {} 次)",
            orchestrator.backend_names().join(" → "),
            policy.per_backend_timeout,
            policy.max_attempts_per_backend
        );

        let rules = StyleGuideRules {
            excerpt_char_cap: config.excerpt_char_cap,
            max_exemplars: config.top_k.max(1),
            ..Default::default()
        };

        let generator = Self::new(
            Arc::new(corpus),
            Arc::new(OpenAiEmbedder::new(config)),
            orchestrator,
            rules,
            GeneratorSettings::from_config(config),
        )
        .context("向量化模型与参考语料不匹配")?;
        Ok(generator)
    }

    /// 语料中的全部分类（按名称排序）
    pub fn available_categories(&self) -> Vec<String> {
        self.corpus.category_statistics().into_keys().collect()
    }

    /// 列出与主题最相似的参考文章
    ///
    /// # 参数
    /// - `topic`: 主题文本，直接向量化
    /// - `count`: 最多返回的文章数，必须大于 0
    pub async fn style_recommendations(
        &self,
        topic: &str,
        count: usize,
    ) -> StyleResult<Vec<StyleRecommendation>> {
        let query = self
            .embedder
            .embed(topic)
            .await
            .map_err(InvalidQueryError::Embedding)?;
        let ranked = similarity_ranker::rank(&query, self.corpus.articles(), count)?;
        debug!("主题 \"{}\" 的风格参考: {} 篇", topic, ranked.len());

        Ok(ranked
            .iter()
            .map(|exemplar| {
                let article = &exemplar.article;
                StyleRecommendation {
                    id: article.id.clone(),
                    title: article.title.clone(),
                    category: article.category.clone(),
                    word_count: article.word_count,
                    similarity: exemplar.similarity,
                    url: article.url.clone(),
                    preview: preview(&article.body_text),
                }
            })
            .collect())
    }

    /// 生成一篇风格化文章
    pub async fn generate_styled_article(&self, brief: &Brief) -> StyleResult<GenerationResult> {
        self.generate_styled_article_with_cancel(brief, CancellationToken::new())
            .await
    }

    /// 生成一篇风格化文章，`cancel` 触发后放弃剩余的后端调用
    pub async fn generate_styled_article_with_cancel(
        &self,
        brief: &Brief,
        cancel: CancellationToken,
    ) -> StyleResult<GenerationResult> {
        let ctx = RequestCtx::new(brief.topic.clone());
        self.run(brief, &ctx, &cancel).await
    }

    /// 批量生成，结果顺序与输入一致
    ///
    /// # 参数
    /// - `briefs`: 简报列表
    /// - `max_concurrency`: 最大并发数，0 时使用配置值
    pub async fn generate_batch(
        &self,
        briefs: &[Brief],
        max_concurrency: usize,
    ) -> Vec<StyleResult<GenerationResult>> {
        let limit = if max_concurrency == 0 {
            self.settings.max_concurrent_requests.max(1)
        } else {
            max_concurrency
        };
        let semaphore = Semaphore::new(limit);
        let cancel = CancellationToken::new();

        info!("📦 开始批量生成: {} 篇, 最大并发 {}", briefs.len(), limit);

        let tasks = briefs.iter().enumerate().map(|(idx, brief)| {
            let semaphore = &semaphore;
            let cancel = cancel.clone();
            async move {
                // 信号量不会被关闭
                let _permit = semaphore.acquire().await.ok();
                let ctx = RequestCtx::new(brief.topic.clone()).with_batch_index(idx + 1);
                let result = self.run(brief, &ctx, &cancel).await;
                if let Err(e) = &result {
                    error!("{} ❌ 生成失败: {}", ctx, e);
                }
                result
            }
        });
        let results = join_all(tasks).await;

        let success = results.iter().filter(|r| r.is_ok()).count();
        logging::print_final_stats(success, results.len() - success, results.len());
        results
    }

    async fn run(
        &self,
        brief: &Brief,
        ctx: &RequestCtx,
        cancel: &CancellationToken,
    ) -> StyleResult<GenerationResult> {
        let started = Instant::now();
        let deadline = started + self.settings.overall_deadline;

        // 1. 校验简报
        validate_brief(brief)?;
        info!("{} 🔍 开始生成 (分类: {})", ctx, brief.category_filter().unwrap_or("全部"));

        // 2. 向量化简报
        let query = self
            .embedder
            .embed(&brief.embedding_text())
            .await
            .map_err(InvalidQueryError::Embedding)?;

        // 3. 选择范例
        let selection = self.select_exemplars(brief, &query)?;
        info!("{} ✓ 选出 {} 个参考范例", ctx, selection.len());

        // 4. 查询缓存
        let cache_key = cache_key(brief, &selection);
        if let Some(cached) = self.cache_get(&cache_key).await {
            info!("{} ♻️ 命中缓存", ctx);
            return Ok(cached);
        }

        // 5. 未指定分类时推断分类，只影响提示词和元数据
        let inferred = if brief.category_filter().is_none() && self.settings.infer_category {
            self.infer_category(&query)?
        } else {
            None
        };
        let prompt_brief = match &inferred {
            Some(category) => {
                info!("{} 🏷️ 推断分类: {}", ctx, category);
                Cow::Owned(Brief {
                    category: category.clone(),
                    ..brief.clone()
                })
            }
            None => Cow::Borrowed(brief),
        };

        // 6. 组装提示词并生成
        let prompt = prompt_assembler::assemble(&prompt_brief, &selection, &self.rules);
        debug!("{} 提示词长度: {} 字符", ctx, prompt.len());

        let outcome = self
            .orchestrator
            .generate(&prompt, deadline, cancel)
            .await?;

        // 7. 拆分标题、评分、构建元数据
        let quality = quality_scorer::evaluate(&outcome.text, brief);
        let (title, body) = outcome.split_title();
        let title = title.unwrap_or_else(|| brief.topic.clone());

        let result = GenerationResult {
            title,
            latency_ms: started.elapsed().as_millis() as u64,
            backend_used: outcome.backend_used.clone(),
            quality_score: quality.overall,
            metadata: GenerationMetadata {
                category: prompt_brief.category.clone(),
                category_inferred: inferred.is_some(),
                keywords: brief.keywords.clone(),
                target_audience: brief.target_audience.clone(),
                tone: brief.tone.clone(),
                word_count: count_words(&body),
                exemplars: selection.iter().map(ExemplarRef::from).collect(),
                used_style_examples: !selection.is_empty(),
                fallback_used: outcome.fallback_used,
                attempts: outcome.attempts,
                quality,
                generated_at: chrono::Local::now().to_rfc3339(),
                cache_hit: false,
            },
            text: body,
        };

        logging::log_generation_summary(&result);

        // 8. 写入缓存
        self.cache_put(cache_key, &result).await;

        Ok(result)
    }

    fn select_exemplars(
        &self,
        brief: &Brief,
        query: &[f32],
    ) -> Result<ExemplarSelection, InvalidQueryError> {
        let subset = match brief.category_filter() {
            Some(category) => self.corpus.by_category(category),
            None => self.corpus.articles().to_vec(),
        };

        if self.settings.diverse_examples && brief.category_filter().is_none() {
            self.ranker.select_diverse(query, &subset, self.settings.top_k)
        } else {
            self.ranker.select(query, &subset, self.settings.top_k)
        }
    }

    /// 最相似的几篇文章中出现最多的分类，票数相同时取排名靠前的
    fn infer_category(&self, query: &[f32]) -> Result<Option<String>, InvalidQueryError> {
        let top = similarity_ranker::rank(query, self.corpus.articles(), CATEGORY_VOTES)?;
        Ok(majority_category(&top))
    }

    async fn cache_get(&self, key: &str) -> Option<GenerationResult> {
        let cache = self.cache.as_ref()?;
        let mut guard = cache.lock().await;
        guard.get(key).cloned().map(|mut hit| {
            hit.metadata.cache_hit = true;
            hit
        })
    }

    async fn cache_put(&self, key: String, result: &GenerationResult) {
        if let Some(cache) = &self.cache {
            cache.lock().await.put(key, result.clone());
        }
    }
}

/// 按配置顺序创建已启用的外部后端
fn build_backends(config: &Config) -> Vec<Arc<dyn GenerationBackend>> {
    config
        .enabled_providers()
        .into_iter()
        .filter_map(|provider| -> Option<Arc<dyn GenerationBackend>> {
            match provider.as_str() {
                "openai" => Some(Arc::new(OpenAiBackend::new(config))),
                "anthropic" => Some(Arc::new(AnthropicBackend::new(config))),
                other => {
                    warn!("⚠️ 未知的生成后端: {}", other);
                    None
                }
            }
        })
        .collect()
}

fn validate_brief(brief: &Brief) -> Result<(), BriefError> {
    if brief.topic.trim().is_empty() {
        return Err(BriefError::EmptyTopic);
    }
    if brief.desired_length == 0 {
        return Err(BriefError::ZeroLength);
    }
    Ok(())
}

fn majority_category(top: &ExemplarSelection) -> Option<String> {
    let mut votes: Vec<(&str, usize)> = Vec::new();
    for exemplar in top {
        let category = exemplar.article.category.as_str();
        match votes.iter_mut().find(|(c, _)| *c == category) {
            Some(entry) => entry.1 += 1,
            None => votes.push((category, 1)),
        }
    }
    votes
        .into_iter()
        .fold(None, |best: Option<(&str, usize)>, (category, count)| match best {
            Some((_, best_count)) if best_count >= count => best,
            _ => Some((category, count)),
        })
        .map(|(category, _)| category.to_string())
}

fn preview(body: &str) -> String {
    match body.char_indices().nth(PREVIEW_CHARS) {
        Some((cut, _)) => format!("{}...", &body[..cut]),
        None => body.to_string(),
    }
}

fn cache_key(brief: &Brief, selection: &ExemplarSelection) -> String {
    let ids: Vec<&str> = selection.iter().map(|e| e.article.id.as_str()).collect();
    format!("{}#{}", brief.cache_key(), ids.join(","))
}
