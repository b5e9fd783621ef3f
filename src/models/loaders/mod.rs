pub mod corpus_loader;

pub use corpus_loader::{load_brief_from_toml, load_corpus_file, parse_corpus};
