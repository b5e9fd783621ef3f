//! 生成编排 - 流程层
//!
//! 核心职责：定义"一次生成"的后端调用顺序
//!
//! 流程顺序：
//! 1. 按配置顺序依次调用外部后端，可重试的错误在同一后端上退避重试
//! 2. 截止时间到达后跳过剩余外部后端
//! 3. 兜底模板（本地，不会超时）

use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::clients::backend::GenerationBackend;
use crate::config::Config;
use crate::error::{BackendError, GenerationExhaustedError};
use crate::models::result::{AttemptOutcome, AttemptRecord};

/// 单次请求的生成状态
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationState {
    Pending,
    /// 正在尝试第 `index` 个后端的第 `attempt` 次调用
    Trying { index: usize, attempt: u32 },
    Success { backend: String },
    Exhausted,
}

impl Display for GenerationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GenerationState::Pending => write!(f, "Pending"),
            GenerationState::Trying { index, attempt } => {
                write!(f, "Trying({}, attempt {})", index, attempt)
            }
            GenerationState::Success { backend } => write!(f, "Success({})", backend),
            GenerationState::Exhausted => write!(f, "Exhausted"),
        }
    }
}

/// 重试与超时策略
#[derive(Debug, Clone)]
pub struct OrchestratorPolicy {
    pub per_backend_timeout: Duration,
    /// 每个后端最多调用次数（≥ 1）
    pub max_attempts_per_backend: u32,
    /// 第 n 次重试前等待 `retry_backoff * n`
    pub retry_backoff: Duration,
}

impl Default for OrchestratorPolicy {
    fn default() -> Self {
        Self {
            per_backend_timeout: Duration::from_secs(30),
            max_attempts_per_backend: 2,
            retry_backoff: Duration::from_millis(500),
        }
    }
}

impl OrchestratorPolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            per_backend_timeout: Duration::from_millis(config.backend_timeout_ms),
            max_attempts_per_backend: config.max_attempts_per_backend.max(1),
            retry_backoff: Duration::from_millis(config.retry_backoff_ms),
        }
    }
}

/// 编排结果
#[derive(Debug, Clone)]
pub struct GenerationOutcome {
    /// 后端返回的完整文本
    pub text: String,
    pub backend_used: String,
    /// 是否由兜底后端生成
    pub fallback_used: bool,
    pub attempts: Vec<AttemptRecord>,
    pub latency: Duration,
}

impl GenerationOutcome {
    /// 拆分标题和正文
    pub fn split_title(&self) -> (Option<String>, String) {
        split_title(&self.text)
    }
}

/// 生成编排器
///
/// - 持有有序的外部后端列表和一个本地兜底后端
/// - 不关心提示词内容，只负责调用顺序、超时、重试和取消
pub struct GenerationOrchestrator {
    backends: Vec<Arc<dyn GenerationBackend>>,
    fallback: Arc<dyn GenerationBackend>,
    policy: OrchestratorPolicy,
}

/// 单次调用的结果
enum CallResult {
    Done(Result<String, BackendError>),
    Cancelled,
}

impl GenerationOrchestrator {
    pub fn new(
        backends: Vec<Arc<dyn GenerationBackend>>,
        fallback: Arc<dyn GenerationBackend>,
        policy: OrchestratorPolicy,
    ) -> Self {
        Self {
            backends,
            fallback,
            policy,
        }
    }

    /// 后端名称（按调用顺序，兜底在最后）
    pub fn backend_names(&self) -> Vec<String> {
        self.backends
            .iter()
            .chain(std::iter::once(&self.fallback))
            .map(|b| b.name().to_string())
            .collect()
    }

    pub fn policy(&self) -> &OrchestratorPolicy {
        &self.policy
    }

    /// 生成文本
    ///
    /// # 参数
    /// - `prompt`: 组装好的提示词
    /// - `deadline`: 整体截止时间，过后不再调用外部后端
    /// - `cancel`: 取消令牌，触发后丢弃正在进行的调用
    ///
    /// # 返回
    /// 第一个成功后端的输出和全部尝试记录；只有兜底也失败或请求被取消时才返回错误
    pub async fn generate(
        &self,
        prompt: &str,
        deadline: Instant,
        cancel: &CancellationToken,
    ) -> Result<GenerationOutcome, GenerationExhaustedError> {
        let started = Instant::now();
        let mut attempts: Vec<AttemptRecord> = Vec::new();
        let mut state = GenerationState::Pending;

        for (index, backend) in self.backends.iter().enumerate() {
            if cancel.is_cancelled() {
                return Err(self.cancelled(attempts));
            }

            if backend.is_external() && Instant::now() >= deadline {
                debug!("截止时间已过，跳过后端 {}", backend.name());
                push_attempt(
                    &mut attempts,
                    backend.name(),
                    AttemptOutcome::Skipped,
                    Duration::ZERO,
                    Some("截止时间已过".to_string()),
                );
                continue;
            }

            for attempt in 1..=self.policy.max_attempts_per_backend {
                let budget = self.budget_for(backend.as_ref(), deadline);
                transition(&mut state, GenerationState::Trying { index, attempt });

                let call_started = Instant::now();
                let result = call_backend(backend.as_ref(), prompt, budget, cancel).await;
                let latency = call_started.elapsed();

                let err = match result {
                    CallResult::Cancelled => {
                        push_attempt(
                            &mut attempts,
                            backend.name(),
                            AttemptOutcome::Failed,
                            latency,
                            Some("请求已取消".to_string()),
                        );
                        return Err(self.cancelled(attempts));
                    }
                    CallResult::Done(Ok(text)) => {
                        push_attempt(
                            &mut attempts,
                            backend.name(),
                            AttemptOutcome::Success,
                            latency,
                            None,
                        );
                        transition(
                            &mut state,
                            GenerationState::Success {
                                backend: backend.name().to_string(),
                            },
                        );
                        return Ok(GenerationOutcome {
                            text,
                            backend_used: backend.name().to_string(),
                            fallback_used: false,
                            attempts,
                            latency: started.elapsed(),
                        });
                    }
                    CallResult::Done(Err(err)) => err,
                };

                let outcome = match err {
                    BackendError::Timeout(_) => AttemptOutcome::TimedOut,
                    _ => AttemptOutcome::Failed,
                };
                warn!(
                    "⚠️ 后端 {} 第 {} 次调用失败: {}",
                    backend.name(),
                    attempt,
                    err
                );
                push_attempt(
                    &mut attempts,
                    backend.name(),
                    outcome,
                    latency,
                    Some(err.to_string()),
                );

                if !err.is_retryable() || attempt >= self.policy.max_attempts_per_backend {
                    break;
                }

                // 退避后仍在截止时间内才重试
                let backoff = self.policy.retry_backoff * attempt;
                if Instant::now() + backoff >= deadline {
                    debug!("剩余时间不足以重试后端 {}", backend.name());
                    break;
                }
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Err(self.cancelled(attempts)),
                    _ = tokio::time::sleep(backoff) => {}
                }
            }
        }

        // ========== 兜底 ==========
        if cancel.is_cancelled() {
            return Err(self.cancelled(attempts));
        }

        let index = self.backends.len();
        transition(&mut state, GenerationState::Trying { index, attempt: 1 });
        info!("使用兜底后端 {}", self.fallback.name());

        let call_started = Instant::now();
        let budget = self.policy.per_backend_timeout;
        let result = call_backend(self.fallback.as_ref(), prompt, budget, cancel).await;
        let latency = call_started.elapsed();

        match result {
            CallResult::Done(Ok(text)) => {
                push_attempt(
                    &mut attempts,
                    self.fallback.name(),
                    AttemptOutcome::Success,
                    latency,
                    None,
                );
                transition(
                    &mut state,
                    GenerationState::Success {
                        backend: self.fallback.name().to_string(),
                    },
                );
                Ok(GenerationOutcome {
                    text,
                    backend_used: self.fallback.name().to_string(),
                    fallback_used: true,
                    attempts,
                    latency: started.elapsed(),
                })
            }
            CallResult::Done(Err(err)) => {
                let outcome = match err {
                    BackendError::Timeout(_) => AttemptOutcome::TimedOut,
                    _ => AttemptOutcome::Failed,
                };
                push_attempt(
                    &mut attempts,
                    self.fallback.name(),
                    outcome,
                    latency,
                    Some(err.to_string()),
                );
                transition(&mut state, GenerationState::Exhausted);
                error!(
                    target: "styled_article::alert",
                    attempts = attempts.len(),
                    "❌ 兜底后端 {} 也失败了: {}",
                    self.fallback.name(),
                    err
                );
                Err(GenerationExhaustedError::AllBackendsFailed { attempts })
            }
            CallResult::Cancelled => Err(self.cancelled(attempts)),
        }
    }

    /// 本次调用的时间预算：外部后端不超过剩余时间
    fn budget_for(&self, backend: &dyn GenerationBackend, deadline: Instant) -> Duration {
        if backend.is_external() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            self.policy.per_backend_timeout.min(remaining)
        } else {
            self.policy.per_backend_timeout
        }
    }

    fn cancelled(&self, attempts: Vec<AttemptRecord>) -> GenerationExhaustedError {
        info!("请求已取消，放弃剩余后端 (已尝试 {} 次)", attempts.len());
        GenerationExhaustedError::Cancelled { attempts }
    }
}

/// 在超时和取消的约束下调用一次后端
async fn call_backend(
    backend: &dyn GenerationBackend,
    prompt: &str,
    budget: Duration,
    cancel: &CancellationToken,
) -> CallResult {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => CallResult::Cancelled,
        result = tokio::time::timeout(budget, backend.complete(prompt, budget)) => {
            match result {
                Ok(Ok(text)) if text.trim().is_empty() => {
                    CallResult::Done(Err(BackendError::EmptyResponse))
                }
                Ok(inner) => CallResult::Done(inner),
                Err(_) => CallResult::Done(Err(BackendError::Timeout(budget))),
            }
        }
    }
}

fn transition(state: &mut GenerationState, next: GenerationState) {
    debug!("状态变更: {} → {}", state, next);
    *state = next;
}

fn push_attempt(
    attempts: &mut Vec<AttemptRecord>,
    backend: &str,
    outcome: AttemptOutcome,
    latency: Duration,
    error: Option<String>,
) {
    let record = AttemptRecord {
        backend: backend.to_string(),
        outcome,
        latency_ms: latency.as_millis() as u64,
        error,
    };
    info!(
        target: "styled_article::attempt",
        backend = %record.backend,
        outcome = ?record.outcome,
        latency_ms = record.latency_ms,
        error = record.error.as_deref().unwrap_or(""),
        "后端调用结束"
    );
    attempts.push(record);
}

/// 拆分标题和正文
///
/// 第一个非空行是 markdown 标题、`Title:` 行或不以句号结尾的短行时作为标题，
/// 否则返回 None，正文为全文
pub fn split_title(text: &str) -> (Option<String>, String) {
    let trimmed = text.trim();
    let (first, rest) = match trimmed.split_once('\n') {
        Some((first, rest)) => (first.trim(), rest),
        None => (trimmed, ""),
    };

    let title = if first.starts_with('#') {
        Some(first.trim_start_matches('#').trim())
    } else if first
        .get(..6)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("title:"))
    {
        first.get(6..).map(str::trim)
    } else if !rest.is_empty() && first.chars().count() <= 120 && !first.ends_with('.') {
        Some(first)
    } else {
        None
    };

    match title {
        Some(title) if !title.is_empty() => {
            let title = title.trim_matches('*').trim().to_string();
            (Some(title), rest.trim().to_string())
        }
        _ => (None, trimmed.to_string()),
    }
}
