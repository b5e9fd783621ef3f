pub mod article;
pub mod brief;
pub mod loaders;
pub mod result;

pub use article::ReferenceArticle;
pub use brief::{Brief, CallToAction, ContentLength};
pub use loaders::{load_brief_from_toml, load_corpus_file};
pub use result::{
    AttemptOutcome, AttemptRecord, Exemplar, ExemplarSelection, GenerationMetadata,
    GenerationResult, QualityReport, StyleRecommendation,
};
