use std::time::Duration;

use async_trait::async_trait;

use crate::error::BackendError;

/// 文本生成后端
///
/// 编排器按配置顺序依次调用，调用方不关心具体实现
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// 后端名称，用于日志和尝试记录
    fn name(&self) -> &str;

    /// 是否调用外部服务
    ///
    /// 截止时间到达后编排器会跳过所有外部后端
    fn is_external(&self) -> bool {
        true
    }

    /// 根据提示词生成文本
    ///
    /// `timeout` 是本次调用剩余的时间预算，实现可以把它传给底层 HTTP 客户端；
    /// 编排器自身也会用 `tokio::time::timeout` 兜底
    async fn complete(&self, prompt: &str, timeout: Duration) -> Result<String, BackendError>;
}
