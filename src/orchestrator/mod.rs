//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层是对外的入口，负责资源装配、缓存和批量调度。
//!
//! ## 模块划分
//!
//! ### `style_generator` - 风格化文章生成器
//! - 管理进程级资源（语料、向量化客户端、后端列表）
//! - 单次生成：简报 → GenerationResult
//! - 可选的 LRU 结果缓存
//! - 批量生成，控制并发数量（Semaphore）
//!
//! ## 层次关系
//!
//! ```text
//! style_generator (处理 Brief / Vec<Brief>)
//!     ↓
//! workflow::GenerationOrchestrator (按顺序调用后端)
//!     ↓
//! services (能力层：语料 / 排序 / 提示词 / 评分)
//!     ↓
//! clients (外部服务：向量化 / 生成后端)
//! ```
//!
//! ## 设计原则
//!
//! 1. **资源隔离**：只有编排层装配客户端和语料
//! 2. **向下依赖**：编排层 → workflow → services → clients
//! 3. **无业务逻辑**：只做调度、缓存和统计

pub mod style_generator;

// 重新导出主要类型
pub use style_generator::{GeneratorSettings, StyledArticleGenerator};
