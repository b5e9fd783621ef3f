pub mod corpus_store;
pub mod prompt_assembler;
pub mod quality_scorer;
pub mod similarity_ranker;

pub use corpus_store::{CategoryStats, CorpusStore};
pub use prompt_assembler::{assemble, truncate_at_sentence, StyleGuideRules};
pub use quality_scorer::{evaluate, score};
pub use similarity_ranker::{cosine_similarity, rank, SimilarityRanker};
