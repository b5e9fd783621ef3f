use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use tokio::fs;

use crate::error::CorpusLoadError;
use crate::models::article::{count_words, ReferenceArticle};
use crate::models::brief::{Brief, BriefInput};

/// 语料文件中的单条记录
#[derive(Debug, Deserialize)]
struct ArticleRecord {
    #[serde(default)]
    id: Option<RecordId>,
    #[serde(default)]
    title: Option<String>,
    #[serde(alias = "content")]
    body_text: String,
    #[serde(default)]
    category: Option<String>,
    embedding: Vec<f32>,
    #[serde(default)]
    word_count: Option<usize>,
    #[serde(default)]
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RecordId {
    Text(String),
    Number(u64),
}

/// 语料文件：文章数组，或带维度声明的对象
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CorpusFile {
    Articles(Vec<ArticleRecord>),
    Wrapped {
        #[serde(default)]
        dimension: Option<usize>,
        articles: Vec<ArticleRecord>,
    },
}

/// 从 JSON 文件加载参考文章
///
/// 只负责解析，维度一致性等校验由 `CorpusStore` 完成
pub async fn load_corpus_file(path: &Path) -> Result<Vec<ReferenceArticle>, CorpusLoadError> {
    let display = path.display().to_string();

    if !fs::try_exists(path).await.unwrap_or(false) {
        return Err(CorpusLoadError::NotFound { path: display });
    }

    let content = fs::read_to_string(path)
        .await
        .map_err(|e| CorpusLoadError::read(&display, e))?;

    parse_corpus(&content, &display)
}

/// 解析语料 JSON 文本
pub fn parse_corpus(content: &str, source: &str) -> Result<Vec<ReferenceArticle>, CorpusLoadError> {
    let file: CorpusFile =
        serde_json::from_str(content).map_err(|e| CorpusLoadError::malformed(source, e))?;

    let (declared_dimension, records) = match file {
        CorpusFile::Articles(records) => (None, records),
        CorpusFile::Wrapped {
            dimension,
            articles,
        } => (dimension, articles),
    };

    let articles: Vec<ReferenceArticle> = records
        .into_iter()
        .enumerate()
        .map(|(index, record)| into_article(index, record))
        .collect();

    if let Some(expected) = declared_dimension {
        if let Some(bad) = articles.iter().find(|a| a.embedding.len() != expected) {
            return Err(CorpusLoadError::DimensionMismatch {
                id: bad.id.clone(),
                expected,
                actual: bad.embedding.len(),
            });
        }
    }

    Ok(articles)
}

fn into_article(index: usize, record: ArticleRecord) -> ReferenceArticle {
    let id = match record.id {
        Some(RecordId::Text(id)) => id,
        Some(RecordId::Number(id)) => id.to_string(),
        // 带前缀，避免与数字 ID 冲突
        None => format!("article-{}", index),
    };
    let word_count = record
        .word_count
        .unwrap_or_else(|| count_words(&record.body_text));

    ReferenceArticle {
        id,
        title: record
            .title
            .unwrap_or_else(|| format!("Article {}", index + 1)),
        body_text: record.body_text,
        category: record.category.unwrap_or_else(|| "Unknown".to_string()),
        embedding: record.embedding,
        word_count,
        url: record.url,
    }
}

/// 从 TOML 文件加载内容简报
pub async fn load_brief_from_toml(toml_file_path: &Path) -> Result<Brief> {
    let content = fs::read_to_string(toml_file_path)
        .await
        .with_context(|| format!("无法读取简报文件: {}", toml_file_path.display()))?;

    let input: BriefInput = toml::from_str(&content)
        .with_context(|| format!("无法解析简报文件: {}", toml_file_path.display()))?;

    let brief = input
        .into_brief()
        .with_context(|| format!("简报参数无效: {}", toml_file_path.display()))?;

    tracing::info!("成功加载简报: {}", brief.topic);

    Ok(brief)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_array_with_aliases_and_defaults() {
        let json = r#"[
            {"id": 7, "title": "A", "content": "one two three", "category": "Marketing", "embedding": [1.0, 0.0]},
            {"body_text": "four five", "embedding": [0.0, 1.0], "word_count": 99}
        ]"#;
        let articles = parse_corpus(json, "inline").unwrap();
        assert_eq!(articles.len(), 2);
        assert_eq!(articles[0].id, "7");
        assert_eq!(articles[0].word_count, 3);
        assert_eq!(articles[1].id, "article-1");
        assert_eq!(articles[1].title, "Article 2");
        assert_eq!(articles[1].category, "Unknown");
        assert_eq!(articles[1].word_count, 99);
    }

    #[test]
    fn test_missing_id_does_not_collide_with_numeric_id() {
        let json = r#"[
            {"id": 1, "body_text": "first", "embedding": [1.0, 0.0]},
            {"body_text": "second", "embedding": [0.0, 1.0]}
        ]"#;
        let articles = parse_corpus(json, "inline").unwrap();
        let ids: Vec<_> = articles.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "article-1"]);

        let store = crate::services::CorpusStore::from_articles(articles).unwrap();
        assert_eq!(store.articles().len(), 2);
    }

    #[test]
    fn test_parse_wrapped_checks_declared_dimension() {
        let json = r#"{"dimension": 3, "articles": [
            {"id": "a", "body_text": "x", "embedding": [1.0, 0.0]}
        ]}"#;
        let err = parse_corpus(json, "inline").unwrap_err();
        assert!(matches!(
            err,
            CorpusLoadError::DimensionMismatch { expected: 3, actual: 2, .. }
        ));
    }

    #[test]
    fn test_parse_malformed() {
        let err = parse_corpus("{not json", "inline").unwrap_err();
        assert!(matches!(err, CorpusLoadError::Malformed { .. }));
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        let err = load_corpus_file(Path::new("/definitely/not/here.json"))
            .await
            .unwrap_err();
        assert!(matches!(err, CorpusLoadError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_load_brief_from_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "topic = \"AI in banking\"\ncategory = \"Futurist\"\nkeywords = [\"AI\", \"banking\"]\ncontent_length = \"Short\""
        )
        .unwrap();

        let brief = load_brief_from_toml(file.path()).await.unwrap();
        assert_eq!(brief.topic, "AI in banking");
        assert_eq!(brief.keywords.len(), 2);
        assert_eq!(brief.desired_length, 400);
    }
}
