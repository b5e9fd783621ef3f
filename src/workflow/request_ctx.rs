//! 请求上下文
//!
//! 封装"我正在处理哪一个简报"这一信息，只用于日志

use std::fmt::Display;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_REQUEST_ID: AtomicU64 = AtomicU64::new(1);

/// 请求上下文
#[derive(Debug, Clone)]
pub struct RequestCtx {
    /// 进程内递增的请求编号
    pub request_id: u64,

    /// 批量处理时的序号（从1开始），单次请求为 None
    pub batch_index: Option<usize>,

    pub topic: String,
}

impl RequestCtx {
    /// 创建新的请求上下文
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            request_id: NEXT_REQUEST_ID.fetch_add(1, Ordering::Relaxed),
            batch_index: None,
            topic: topic.into(),
        }
    }

    pub fn with_batch_index(mut self, index: usize) -> Self {
        self.batch_index = Some(index);
        self
    }
}

impl Display for RequestCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.batch_index {
            Some(index) => write!(
                f,
                "[请求 #{} 批次#{} 主题#{}]",
                self.request_id, index, self.topic
            ),
            None => write!(f, "[请求 #{} 主题#{}]", self.request_id, self.topic),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_increase_and_display() {
        let a = RequestCtx::new("AI");
        let b = RequestCtx::new("Retail").with_batch_index(2);
        assert!(b.request_id > a.request_id);
        assert_eq!(a.to_string(), format!("[请求 #{} 主题#AI]", a.request_id));
        assert!(b.to_string().contains("批次#2"));
    }
}
