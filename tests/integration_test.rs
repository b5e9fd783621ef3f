use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use styled_article::error::{BackendError, EmbeddingError, GenerationExhaustedError};
use styled_article::models::AttemptOutcome;
use styled_article::{
    Brief, CorpusStore, Embedder, GenerationBackend, GenerationOrchestrator, GeneratorSettings,
    OrchestratorPolicy, StyleError, StyleGuideRules, StyledArticleGenerator, TemplateBackend,
};
use tokio_util::sync::CancellationToken;

/// 按主题关键词返回固定向量
struct KeywordEmbedder;

#[async_trait]
impl Embedder for KeywordEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let lower = text.to_lowercase();
        if lower.contains("marketing") || lower.contains("brand") {
            Ok(vec![0.0, 1.0, 0.0])
        } else if lower.contains("cloud") {
            Ok(vec![0.0, 0.0, 1.0])
        } else {
            Ok(vec![1.0, 0.0, 0.0])
        }
    }

    fn dimension(&self) -> Option<usize> {
        Some(3)
    }
}

/// 永远超时的外部后端
struct HangingBackend;

#[async_trait]
impl GenerationBackend for HangingBackend {
    fn name(&self) -> &str {
        "hanging"
    }

    async fn complete(&self, _prompt: &str, _timeout: Duration) -> Result<String, BackendError> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Err(BackendError::Network("unreachable".to_string()))
    }
}

/// 回显提示词中主题的外部后端
struct EchoBackend;

#[async_trait]
impl GenerationBackend for EchoBackend {
    fn name(&self) -> &str {
        "echo"
    }

    async fn complete(&self, prompt: &str, _timeout: Duration) -> Result<String, BackendError> {
        let topic = prompt
            .lines()
            .find_map(|l| l.strip_prefix("Topic: "))
            .unwrap_or("Untitled");
        Ok(format!(
            "# {}\n\nAI is changing banking.\n\n## Key Takeaways\nMove early.",
            topic
        ))
    }
}

fn write_corpus() -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{
  "dimension": 3,
  "articles": [
    {{"id": "fut-1", "title": "Future of Banking", "content": "In today's digital era, banks must adapt. Digital transformation is no longer optional.", "category": "Futurist", "embedding": [1.0, 0.0, 0.0]}},
    {{"id": "fut-2", "title": "AI Horizons", "content": "The rapidly evolving AI landscape rewards bold strategy.", "category": "Futurist", "embedding": [0.9, 0.1, 0.0]}},
    {{"id": "mkt-1", "title": "Brand Building", "content": "Brands win with consistent stories. Contact us to get started.", "category": "Marketing", "embedding": [0.0, 1.0, 0.0]}},
    {{"id": "tech-1", "title": "Cloud First", "content": "Modern businesses run on the cloud. 1. Plan 2. Migrate", "category": "Technology", "embedding": [0.1, 0.0, 0.9]}}
  ]
}}"#
    )
    .unwrap();
    file
}

async fn generator_with(
    backends: Vec<Arc<dyn GenerationBackend>>,
    policy: OrchestratorPolicy,
    settings: GeneratorSettings,
) -> StyledArticleGenerator {
    let file = write_corpus();
    let corpus = CorpusStore::load(file.path()).await.unwrap();
    let orchestrator =
        GenerationOrchestrator::new(backends, Arc::new(TemplateBackend::new()), policy);
    StyledArticleGenerator::new(
        Arc::new(corpus),
        Arc::new(KeywordEmbedder),
        orchestrator,
        StyleGuideRules::default(),
        settings,
    )
    .unwrap()
}

#[tokio::test]
async fn test_full_pipeline_with_external_backend() {
    let generator = generator_with(
        vec![Arc::new(EchoBackend)],
        OrchestratorPolicy::default(),
        GeneratorSettings::default(),
    )
    .await;

    let brief = Brief::new("AI in Banking", "Futurist", ["AI", "banking"]).unwrap();
    let result = generator.generate_styled_article(&brief).await.unwrap();

    assert_eq!(result.title, "AI in Banking");
    assert_eq!(result.backend_used, "echo");
    assert!(!result.metadata.fallback_used);
    assert_eq!(result.metadata.attempts.len(), 1);
    assert_eq!(result.metadata.attempts[0].outcome, AttemptOutcome::Success);

    let ids: Vec<_> = result.metadata.exemplars.iter().map(|e| e.id.as_str()).collect();
    assert_eq!(ids, vec!["fut-1", "fut-2"]);
    assert!((result.metadata.exemplars[0].similarity - 1.0).abs() < 1e-9);
    assert_eq!(result.metadata.quality.keyword_coverage, 1.0);
}

#[tokio::test(start_paused = true)]
async fn test_hanging_primary_falls_back_to_template() {
    let policy = OrchestratorPolicy {
        per_backend_timeout: Duration::from_secs(5),
        max_attempts_per_backend: 1,
        retry_backoff: Duration::from_millis(10),
    };
    let generator = generator_with(
        vec![Arc::new(HangingBackend)],
        policy,
        GeneratorSettings::default(),
    )
    .await;

    let brief = Brief::new("Brand storytelling", "", ["brand", "story"]).unwrap();
    let result = generator.generate_styled_article(&brief).await.unwrap();

    assert_eq!(result.backend_used, "template");
    assert!(result.metadata.fallback_used);
    let outcomes: Vec<_> = result.metadata.attempts.iter().map(|a| a.outcome).collect();
    assert_eq!(outcomes, vec![AttemptOutcome::TimedOut, AttemptOutcome::Success]);
    assert!(result.metadata.word_count >= 150);
    assert_eq!(result.metadata.exemplars[0].id, "mkt-1");
}

#[tokio::test(start_paused = true)]
async fn test_overall_deadline_cuts_primary_short() {
    let policy = OrchestratorPolicy {
        per_backend_timeout: Duration::from_secs(30),
        max_attempts_per_backend: 3,
        retry_backoff: Duration::from_millis(10),
    };
    let settings = GeneratorSettings {
        overall_deadline: Duration::from_secs(1),
        ..Default::default()
    };
    let generator = generator_with(
        vec![Arc::new(HangingBackend), Arc::new(EchoBackend)],
        policy,
        settings,
    )
    .await;

    let started = tokio::time::Instant::now();
    let brief = Brief::new("Cloud migration", "Technology", ["cloud"]).unwrap();
    let result = generator.generate_styled_article(&brief).await.unwrap();

    assert!(started.elapsed() < Duration::from_secs(30));
    assert_eq!(result.backend_used, "template");
    let outcomes: Vec<_> = result.metadata.attempts.iter().map(|a| a.outcome).collect();
    assert_eq!(
        outcomes,
        vec![
            AttemptOutcome::TimedOut,
            AttemptOutcome::Skipped,
            AttemptOutcome::Success
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_cancellation_surfaces_as_exhausted() {
    let generator = generator_with(
        vec![Arc::new(HangingBackend)],
        OrchestratorPolicy::default(),
        GeneratorSettings::default(),
    )
    .await;

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        trigger.cancel();
    });

    let brief = Brief::new("AI in Banking", "", ["AI"]).unwrap();
    let err = generator
        .generate_styled_article_with_cancel(&brief, cancel)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        StyleError::GenerationExhausted(GenerationExhaustedError::Cancelled { .. })
    ));
}

/// 声明 2 维输出的向量化客户端
struct NarrowEmbedder;

#[async_trait]
impl Embedder for NarrowEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbeddingError> {
        Ok(vec![1.0, 0.0])
    }

    fn dimension(&self) -> Option<usize> {
        Some(2)
    }
}

#[tokio::test]
async fn test_embedder_dimension_mismatch_fails_at_startup() {
    let file = write_corpus();
    let corpus = CorpusStore::load(file.path()).await.unwrap();
    let orchestrator = GenerationOrchestrator::new(
        Vec::new(),
        Arc::new(TemplateBackend::new()),
        OrchestratorPolicy::default(),
    );

    let err = StyledArticleGenerator::new(
        Arc::new(corpus),
        Arc::new(NarrowEmbedder),
        orchestrator,
        StyleGuideRules::default(),
        GeneratorSettings::default(),
    )
    .err()
    .unwrap();
    let err: StyleError = err.into();
    assert!(matches!(err, StyleError::CorpusLoad(_)));
}

#[tokio::test]
async fn test_uncategorized_brief_gets_inferred_category() {
    let generator = generator_with(
        vec![Arc::new(EchoBackend)],
        OrchestratorPolicy::default(),
        GeneratorSettings::default(),
    )
    .await;

    let brief = Brief::new("AI in Banking", "", ["AI"]).unwrap();
    let result = generator.generate_styled_article(&brief).await.unwrap();
    assert_eq!(result.metadata.category, "Futurist");
    assert!(result.metadata.category_inferred);

    assert_eq!(
        generator.available_categories(),
        vec!["Futurist", "Marketing", "Technology"]
    );
    let recommendations = generator.style_recommendations("brand", 1).await.unwrap();
    assert_eq!(recommendations[0].id, "mkt-1");
}

#[tokio::test]
async fn test_missing_corpus_is_load_error() {
    let err = CorpusStore::load("/no/such/corpus.json").await.err().unwrap();
    let err: StyleError = err.into();
    assert!(matches!(err, StyleError::CorpusLoad(_)));
}

#[tokio::test]
async fn test_batch_generation() {
    let generator = generator_with(
        vec![Arc::new(EchoBackend)],
        OrchestratorPolicy::default(),
        GeneratorSettings::default(),
    )
    .await;

    let briefs = vec![
        Brief::new("AI in Banking", "", ["AI"]).unwrap(),
        Brief::new("Brand building", "Marketing", ["brand"]).unwrap(),
    ];
    let results = generator.generate_batch(&briefs, 1).await;
    let titles: Vec<_> = results
        .iter()
        .map(|r| tokio_test::assert_ok!(r.as_ref()).title.clone())
        .collect();
    assert_eq!(titles, vec!["AI in Banking", "Brand building"]);
}
