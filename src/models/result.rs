//! 生成结果相关的数据结构

use std::sync::Arc;

use serde::Serialize;

use crate::models::article::ReferenceArticle;

/// 一个被选中的范例
#[derive(Debug, Clone)]
pub struct Exemplar {
    pub article: Arc<ReferenceArticle>,
    pub similarity: f64,
}

/// 按相似度降序排列的范例，长度 ≤ K
pub type ExemplarSelection = Vec<Exemplar>;

/// 结果元数据中记录的范例摘要
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExemplarRef {
    pub id: String,
    pub title: String,
    pub category: String,
    pub similarity: f64,
}

impl From<&Exemplar> for ExemplarRef {
    fn from(exemplar: &Exemplar) -> Self {
        Self {
            id: exemplar.article.id.clone(),
            title: exemplar.article.title.clone(),
            category: exemplar.article.category.clone(),
            similarity: exemplar.similarity,
        }
    }
}

/// 单次后端调用的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptOutcome {
    Success,
    Failed,
    TimedOut,
    /// 截止时间已过，未调用
    Skipped,
}

/// 单次后端调用的观测记录
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttemptRecord {
    pub backend: String,
    pub outcome: AttemptOutcome,
    pub latency_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// 质量评分明细
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QualityReport {
    /// 总分 0-100
    pub overall: f64,
    /// 字数接近度得分（满分 40）
    pub length_score: f64,
    /// 关键词覆盖得分（满分 40）
    pub keyword_score: f64,
    /// 结构得分（满分 20）
    pub structure_score: f64,
    /// 关键词覆盖率 0-1
    pub keyword_coverage: f64,
    pub word_count: usize,
    pub grade: String,
    pub recommendations: Vec<String>,
}

/// 生成结果的元数据
#[derive(Debug, Clone, Serialize)]
pub struct GenerationMetadata {
    /// 生成时使用的分类，简报未指定时为推断结果
    pub category: String,
    /// 分类是否由相似文章推断得出
    pub category_inferred: bool,
    pub keywords: Vec<String>,
    pub target_audience: String,
    pub tone: String,
    pub word_count: usize,
    pub exemplars: Vec<ExemplarRef>,
    pub used_style_examples: bool,
    /// 是否由兜底模板生成
    pub fallback_used: bool,
    pub attempts: Vec<AttemptRecord>,
    pub quality: QualityReport,
    pub generated_at: String,
    pub cache_hit: bool,
}

/// 与主题相似的参考文章，供调用方参考写作风格
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StyleRecommendation {
    pub id: String,
    pub title: String,
    pub category: String,
    pub word_count: usize,
    pub similarity: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// 正文前 200 个字符
    pub preview: String,
}

/// 最终返回给调用方的结果
#[derive(Debug, Clone, Serialize)]
pub struct GenerationResult {
    pub title: String,
    pub text: String,
    pub backend_used: String,
    pub latency_ms: u64,
    pub quality_score: f64,
    pub metadata: GenerationMetadata,
}
