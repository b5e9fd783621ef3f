pub mod generation_orchestrator;
pub mod request_ctx;

pub use generation_orchestrator::{
    split_title, GenerationOrchestrator, GenerationOutcome, GenerationState, OrchestratorPolicy,
};
pub use request_ctx::RequestCtx;
