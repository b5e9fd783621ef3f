//! 参考文章
//!
//! 由离线的向量化流程生成，运行时只读

use serde::{Deserialize, Serialize};

/// 参考文章（含预计算向量）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceArticle {
    /// 语料内唯一的文章 ID
    pub id: String,
    /// 标题
    pub title: String,
    /// 正文
    pub body_text: String,
    /// 分类（如 Futurist / Marketing）
    pub category: String,
    /// 预计算的向量
    pub embedding: Vec<f32>,
    /// 正文字数
    pub word_count: usize,
    /// 原文链接
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl ReferenceArticle {
    /// 创建参考文章，字数按空白分词计算
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        body_text: impl Into<String>,
        category: impl Into<String>,
        embedding: Vec<f32>,
    ) -> Self {
        let body_text = body_text.into();
        let word_count = count_words(&body_text);
        Self {
            id: id.into(),
            title: title.into(),
            body_text,
            category: category.into(),
            embedding,
            word_count,
            url: None,
        }
    }

    /// 分类是否匹配（忽略大小写和首尾空白）
    pub fn in_category(&self, category: &str) -> bool {
        normalize_category(&self.category) == normalize_category(category)
    }
}

/// 统一分类名称的比较形式
pub fn normalize_category(category: &str) -> String {
    category.trim().to_lowercase()
}

/// 按空白分词统计字数
pub fn count_words(text: &str) -> usize {
    text.split_whitespace().count()
}
