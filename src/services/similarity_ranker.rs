//! 相似度排序 - 业务能力层
//!
//! 只负责"按向量相似度挑选范例"，纯函数，无副作用

use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::Arc;

use tracing::debug;

use crate::error::InvalidQueryError;
use crate::models::article::{normalize_category, ReferenceArticle};
use crate::models::result::{Exemplar, ExemplarSelection};

/// 默认最低相似度
pub const DEFAULT_MIN_SIMILARITY: f64 = 0.1;

/// 余弦相似度
///
/// 任一向量模长为 0 时返回 0.0，结果限制在 [-1, 1]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let (mut dot, mut norm_a, mut norm_b) = (0.0f64, 0.0f64, 0.0f64);
    for (x, y) in a.iter().zip(b.iter()) {
        let (x, y) = (*x as f64, *y as f64);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f64::EPSILON {
        0.0
    } else {
        (dot / denom).clamp(-1.0, 1.0)
    }
}

/// 对候选文章排序，返回相似度最高的 k 篇
///
/// 相似度相同时保持语料顺序；候选不足 k 篇时全部返回
pub fn rank(
    query: &[f32],
    subset: &[Arc<ReferenceArticle>],
    k: usize,
) -> Result<ExemplarSelection, InvalidQueryError> {
    validate_query(query, k)?;

    if let Some(bad) = subset.iter().find(|a| a.embedding.len() != query.len()) {
        return Err(InvalidQueryError::DimensionMismatch {
            expected: bad.embedding.len(),
            actual: query.len(),
        });
    }

    let mut scored: Vec<Exemplar> = subset
        .iter()
        .map(|article| Exemplar {
            similarity: cosine_similarity(query, &article.embedding),
            article: Arc::clone(article),
        })
        .collect();

    // sort_by 是稳定排序
    scored.sort_by(|a, b| {
        b.similarity
            .partial_cmp(&a.similarity)
            .unwrap_or(Ordering::Equal)
    });
    scored.truncate(k);

    Ok(scored)
}

fn validate_query(query: &[f32], k: usize) -> Result<(), InvalidQueryError> {
    if k == 0 {
        return Err(InvalidQueryError::InvalidK { k });
    }
    if query.is_empty() {
        return Err(InvalidQueryError::EmptyQuery);
    }
    if query.iter().any(|v| !v.is_finite()) {
        return Err(InvalidQueryError::NonFinite);
    }
    Ok(())
}

/// 范例选择器
///
/// 在 `rank` 的基础上加入最低相似度阈值和分类多样化
#[derive(Debug, Clone)]
pub struct SimilarityRanker {
    dimension: usize,
    min_similarity: f64,
}

impl SimilarityRanker {
    pub fn new(dimension: usize, min_similarity: f64) -> Self {
        Self {
            dimension,
            min_similarity,
        }
    }

    /// 选出相似度不低于阈值的前 k 篇
    pub fn select(
        &self,
        query: &[f32],
        subset: &[Arc<ReferenceArticle>],
        k: usize,
    ) -> Result<ExemplarSelection, InvalidQueryError> {
        self.check_dimension(query)?;
        let mut selection = rank(query, subset, k)?;
        selection.retain(|e| e.similarity >= self.min_similarity);

        debug!(
            "选出 {} 个范例 (候选 {} 篇, 阈值 {:.2})",
            selection.len(),
            subset.len(),
            self.min_similarity
        );
        Ok(selection)
    }

    /// 选出 k 篇尽量覆盖不同分类的范例
    ///
    /// 先从 3k 个候选中为每个分类取最相似的一篇，不足时再按相似度补齐
    pub fn select_diverse(
        &self,
        query: &[f32],
        subset: &[Arc<ReferenceArticle>],
        k: usize,
    ) -> Result<ExemplarSelection, InvalidQueryError> {
        let candidates = self.select(query, subset, k.saturating_mul(3))?;

        let mut picked = vec![false; candidates.len()];
        let mut used_categories = HashSet::new();
        let mut count = 0;

        for (i, candidate) in candidates.iter().enumerate() {
            if count >= k {
                break;
            }
            if used_categories.insert(normalize_category(&candidate.article.category)) {
                picked[i] = true;
                count += 1;
            }
        }
        for flag in picked.iter_mut() {
            if count >= k {
                break;
            }
            if !*flag {
                *flag = true;
                count += 1;
            }
        }

        // candidates 已按相似度降序，按原顺序收集即保持降序
        let selection: ExemplarSelection = candidates
            .into_iter()
            .zip(picked)
            .filter_map(|(candidate, keep)| keep.then_some(candidate))
            .collect();

        debug!(
            "多样化范例分类: {:?}",
            selection
                .iter()
                .map(|e| e.article.category.as_str())
                .collect::<Vec<_>>()
        );
        Ok(selection)
    }

    fn check_dimension(&self, query: &[f32]) -> Result<(), InvalidQueryError> {
        if query.is_empty() {
            return Err(InvalidQueryError::EmptyQuery);
        }
        if query.len() != self.dimension {
            return Err(InvalidQueryError::DimensionMismatch {
                expected: self.dimension,
                actual: query.len(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corpus(entries: &[(&str, &str, Vec<f32>)]) -> Vec<Arc<ReferenceArticle>> {
        entries
            .iter()
            .map(|(id, category, embedding)| {
                Arc::new(ReferenceArticle::new(
                    *id,
                    format!("Article {}", id),
                    "Body.",
                    *category,
                    embedding.clone(),
                ))
            })
            .collect()
    }

    fn ids(selection: &ExemplarSelection) -> Vec<String> {
        selection.iter().map(|e| e.article.id.clone()).collect()
    }

    #[test]
    fn test_three_article_scenario() {
        let subset = corpus(&[
            ("article1", "A", vec![1.0, 0.0]),
            ("article2", "A", vec![0.0, 1.0]),
            ("article3", "A", vec![0.7, 0.7]),
        ]);

        let result = rank(&[1.0, 0.0], &subset, 2).unwrap();
        assert_eq!(ids(&result), vec!["article1", "article3"]);
        assert!((result[0].similarity - 1.0).abs() < 1e-9);
        assert!((result[1].similarity - std::f64::consts::FRAC_1_SQRT_2).abs() < 1e-6);
    }

    #[test]
    fn test_identical_embedding_ranks_first_with_score_one() {
        let subset = corpus(&[
            ("a", "A", vec![0.2, 0.9, 0.1]),
            ("b", "A", vec![0.5, 0.4, 0.3]),
            ("c", "A", vec![0.9, 0.1, 0.0]),
        ]);
        let result = rank(&[0.5, 0.4, 0.3], &subset, 3).unwrap();
        assert_eq!(result[0].article.id, "b");
        assert!((result[0].similarity - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_rank_bounds_order_and_idempotence() {
        let subset = corpus(&[
            ("a", "A", vec![0.3, 0.1]),
            ("b", "A", vec![-0.5, 0.2]),
            ("c", "A", vec![0.9, 0.8]),
            ("d", "A", vec![0.0, 1.0]),
        ]);
        let query = [0.6, 0.4];
        for k in 1..=6 {
            let first = rank(&query, &subset, k).unwrap();
            assert!(first.len() <= k);
            assert!(first
                .windows(2)
                .all(|w| w[0].similarity >= w[1].similarity));

            let second = rank(&query, &subset, k).unwrap();
            assert_eq!(ids(&first), ids(&second));
        }
        assert_eq!(rank(&query, &subset, 10).unwrap().len(), 4);
    }

    #[test]
    fn test_ties_keep_corpus_order() {
        let subset = corpus(&[
            ("first", "A", vec![0.6, 0.8]),
            ("second", "B", vec![0.6, 0.8]),
            ("third", "C", vec![0.6, 0.8]),
        ]);
        let result = rank(&[1.0, 0.0], &subset, 3).unwrap();
        assert_eq!(ids(&result), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_zero_norm_is_similarity_zero() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
        let subset = corpus(&[("z", "A", vec![0.0, 0.0]), ("x", "A", vec![1.0, 0.0])]);
        let result = rank(&[1.0, 0.0], &subset, 2).unwrap();
        assert_eq!(ids(&result), vec!["x", "z"]);
        assert_eq!(result[1].similarity, 0.0);
    }

    #[test]
    fn test_invalid_queries() {
        let subset = corpus(&[("a", "A", vec![1.0, 0.0])]);
        assert!(matches!(
            rank(&[1.0, 0.0, 0.0], &subset, 1),
            Err(InvalidQueryError::DimensionMismatch { expected: 2, actual: 3 })
        ));
        assert!(matches!(
            rank(&[1.0, 0.0], &subset, 0),
            Err(InvalidQueryError::InvalidK { k: 0 })
        ));
        assert!(matches!(rank(&[], &subset, 1), Err(InvalidQueryError::EmptyQuery)));
        assert!(matches!(
            rank(&[f32::NAN, 0.0], &subset, 1),
            Err(InvalidQueryError::NonFinite)
        ));
    }

    #[test]
    fn test_select_applies_threshold_and_dimension() {
        let subset = corpus(&[
            ("a", "A", vec![1.0, 0.0]),
            ("b", "A", vec![0.0, 1.0]),
        ]);
        let ranker = SimilarityRanker::new(2, 0.5);
        assert_eq!(ids(&ranker.select(&[1.0, 0.0], &subset, 2).unwrap()), vec!["a"]);

        // 空候选集也要校验维度
        assert!(matches!(
            ranker.select(&[1.0], &[], 2),
            Err(InvalidQueryError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_select_diverse_prefers_new_categories() {
        let subset = corpus(&[
            ("m1", "Marketing", vec![1.0, 0.0]),
            ("m2", "Marketing", vec![0.99, 0.05]),
            ("f1", "Futurist", vec![0.8, 0.6]),
            ("t1", "Technology", vec![0.6, 0.8]),
        ]);
        let ranker = SimilarityRanker::new(2, 0.0);

        let diverse = ranker.select_diverse(&[1.0, 0.0], &subset, 3).unwrap();
        assert_eq!(ids(&diverse), vec!["m1", "f1", "t1"]);

        let plain = ranker.select(&[1.0, 0.0], &subset, 3).unwrap();
        assert_eq!(ids(&plain), vec!["m1", "m2", "f1"]);
    }

    #[test]
    fn test_select_diverse_fills_with_best_leftovers() {
        let subset = corpus(&[
            ("m1", "Marketing", vec![1.0, 0.0]),
            ("m2", "Marketing", vec![0.9, 0.1]),
            ("m3", "Marketing", vec![0.5, 0.5]),
        ]);
        let ranker = SimilarityRanker::new(2, 0.0);
        let diverse = ranker.select_diverse(&[1.0, 0.0], &subset, 2).unwrap();
        assert_eq!(ids(&diverse), vec!["m1", "m2"]);
    }
}
