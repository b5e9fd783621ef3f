pub mod anthropic_backend;
pub mod backend;
pub mod embedder;
pub mod openai_backend;
pub mod template_backend;

pub use anthropic_backend::AnthropicBackend;
pub use backend::GenerationBackend;
pub use embedder::{Embedder, OpenAiEmbedder};
pub use openai_backend::OpenAiBackend;
pub use template_backend::TemplateBackend;
