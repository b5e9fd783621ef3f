//! # Styled Article
//!
//! 根据参考语料的写作风格生成商业文章
//!
//! ## 架构设计
//!
//! 本系统采用四层架构：
//!
//! ### ① 外部客户端层（Clients）
//! - `clients/` - 封装外部服务，只暴露能力
//! - `Embedder` - 文本向量化
//! - `GenerationBackend` - 文本生成（OpenAI / Anthropic / 模板兜底）
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，纯函数或只读状态
//! - `CorpusStore` - 参考语料存储
//! - `SimilarityRanker` - 余弦相似度排序与范例选择
//! - `prompt_assembler` - 提示词组装
//! - `quality_scorer` - 质量评分
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一次生成"的后端调用流程
//! - `RequestCtx` - 请求上下文封装
//! - `GenerationOrchestrator` - 按序调用、超时、重试、兜底
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/style_generator` - 对外入口，装配资源、缓存、批量生成
//!
//! ## 模块结构

pub mod clients;
pub mod config;
pub mod error;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use clients::{Embedder, GenerationBackend, TemplateBackend};
pub use config::Config;
pub use error::{StyleError, StyleResult};
pub use models::{Brief, CallToAction, ContentLength, GenerationResult, ReferenceArticle};
pub use orchestrator::{GeneratorSettings, StyledArticleGenerator};
pub use services::{CorpusStore, StyleGuideRules};
pub use workflow::{GenerationOrchestrator, OrchestratorPolicy};
