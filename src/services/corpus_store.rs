//! 语料存储 - 业务能力层
//!
//! 启动时加载一次，之后只读，通过 `Arc` 在请求间共享

use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use crate::error::CorpusLoadError;
use crate::models::article::ReferenceArticle;
use crate::models::loaders::load_corpus_file;

/// 单个分类的统计信息
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryStats {
    pub count: usize,
    pub total_words: usize,
    pub avg_words: f64,
}

/// 语料存储
///
/// 职责：
/// - 加载参考文章及其向量
/// - 校验向量维度一致
/// - 提供只读遍历和按分类过滤
pub struct CorpusStore {
    articles: Vec<Arc<ReferenceArticle>>,
    dimension: usize,
}

impl CorpusStore {
    /// 从语料文件加载
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, CorpusLoadError> {
        let path = path.as_ref();
        info!("📚 正在加载参考语料: {}", path.display());

        let articles = load_corpus_file(path).await?;
        if articles.is_empty() {
            return Err(CorpusLoadError::Empty {
                path: path.display().to_string(),
            });
        }

        let store = Self::from_articles(articles)?;
        info!(
            "✓ 成功加载 {} 篇参考文章 (向量维度: {})",
            store.len(),
            store.dimension
        );
        Ok(store)
    }

    /// 从内存中的文章构建，做与 `load` 相同的校验
    pub fn from_articles(articles: Vec<ReferenceArticle>) -> Result<Self, CorpusLoadError> {
        let first = articles.first().ok_or_else(|| CorpusLoadError::Empty {
            path: "<memory>".to_string(),
        })?;
        let dimension = first.embedding.len();

        let mut seen_ids = HashSet::new();
        for article in &articles {
            if article.embedding.is_empty() {
                return Err(CorpusLoadError::InvalidEmbedding {
                    id: article.id.clone(),
                    reason: "向量为空".to_string(),
                });
            }
            if article.embedding.len() != dimension {
                return Err(CorpusLoadError::DimensionMismatch {
                    id: article.id.clone(),
                    expected: dimension,
                    actual: article.embedding.len(),
                });
            }
            if article.embedding.iter().any(|v| !v.is_finite()) {
                return Err(CorpusLoadError::InvalidEmbedding {
                    id: article.id.clone(),
                    reason: "包含 NaN 或无穷大".to_string(),
                });
            }
            if !seen_ids.insert(article.id.clone()) {
                return Err(CorpusLoadError::DuplicateId {
                    id: article.id.clone(),
                });
            }
        }

        Ok(Self {
            articles: articles.into_iter().map(Arc::new).collect(),
            dimension,
        })
    }

    /// 全部文章（保持语料顺序）
    pub fn articles(&self) -> &[Arc<ReferenceArticle>] {
        &self.articles
    }

    /// 按分类过滤，未知分类返回空列表
    pub fn by_category(&self, category: &str) -> Vec<Arc<ReferenceArticle>> {
        let matched: Vec<_> = self
            .articles
            .iter()
            .filter(|a| a.in_category(category))
            .cloned()
            .collect();
        debug!("分类 '{}' 下共有 {} 篇文章", category, matched.len());
        matched
    }

    pub fn get(&self, id: &str) -> Option<&Arc<ReferenceArticle>> {
        self.articles.iter().find(|a| a.id == id)
    }

    /// 向量维度
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn len(&self) -> usize {
        self.articles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.articles.is_empty()
    }

    /// 各分类的文章数与字数统计
    pub fn category_statistics(&self) -> BTreeMap<String, CategoryStats> {
        let mut stats: BTreeMap<String, CategoryStats> = BTreeMap::new();
        for article in &self.articles {
            let entry = stats
                .entry(article.category.clone())
                .or_insert(CategoryStats {
                    count: 0,
                    total_words: 0,
                    avg_words: 0.0,
                });
            entry.count += 1;
            entry.total_words += article.word_count;
        }
        for entry in stats.values_mut() {
            entry.avg_words = entry.total_words as f64 / entry.count as f64;
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn article(id: &str, category: &str, embedding: Vec<f32>) -> ReferenceArticle {
        ReferenceArticle::new(id, format!("Title {}", id), "Some body text here.", category, embedding)
    }

    #[test]
    fn test_by_category_is_case_normalized() {
        let store = CorpusStore::from_articles(vec![
            article("1", "Marketing", vec![1.0, 0.0]),
            article("2", "Futurist", vec![0.0, 1.0]),
            article("3", "marketing", vec![0.5, 0.5]),
        ])
        .unwrap();

        let ids: Vec<_> = store
            .by_category(" MARKETING ")
            .iter()
            .map(|a| a.id.clone())
            .collect();
        assert_eq!(ids, vec!["1".to_string(), "3".to_string()]);
        assert!(store.by_category("Nonexistent").is_empty());
    }

    #[test]
    fn test_inconsistent_dimension_rejected() {
        let err = CorpusStore::from_articles(vec![
            article("1", "A", vec![1.0, 0.0]),
            article("2", "A", vec![1.0, 0.0, 0.0]),
        ])
        .err()
        .unwrap();
        assert!(matches!(
            err,
            CorpusLoadError::DimensionMismatch { expected: 2, actual: 3, .. }
        ));
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let err = CorpusStore::from_articles(vec![
            article("1", "A", vec![1.0]),
            article("1", "B", vec![0.5]),
        ])
        .err()
        .unwrap();
        assert!(matches!(err, CorpusLoadError::DuplicateId { .. }));
    }

    #[test]
    fn test_non_finite_embedding_rejected() {
        let err = CorpusStore::from_articles(vec![article("1", "A", vec![f32::NAN, 1.0])])
            .err()
            .unwrap();
        assert!(matches!(err, CorpusLoadError::InvalidEmbedding { .. }));
    }

    #[test]
    fn test_category_statistics() {
        let store = CorpusStore::from_articles(vec![
            article("1", "A", vec![1.0]),
            article("2", "A", vec![1.0]),
            article("3", "B", vec![1.0]),
        ])
        .unwrap();
        let stats = store.category_statistics();
        assert_eq!(stats["A"].count, 2);
        assert_eq!(stats["A"].total_words, 8);
        assert_eq!(stats["B"].avg_words, 4.0);
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"id": "a", "title": "A", "body_text": "x y", "category": "Tech", "embedding": [0.1, 0.2]}}]"#
        )
        .unwrap();

        let store = CorpusStore::load(file.path()).await.unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.dimension(), 2);
        assert!(store.get("a").is_some());
    }

    #[tokio::test]
    async fn test_load_empty_file_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "[]").unwrap();
        let err = CorpusStore::load(file.path()).await.err().unwrap();
        assert!(matches!(err, CorpusLoadError::Empty { .. }));
    }
}
