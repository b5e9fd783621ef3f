/// 日志工具模块
///
/// 提供日志初始化、格式化和输出的辅助函数
use std::collections::BTreeMap;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::models::result::GenerationResult;
use crate::services::corpus_store::CategoryStats;

/// 初始化日志订阅器
///
/// 优先读取 `RUST_LOG`，否则按 `verbose` 选择 debug / info
///
/// # 参数
/// - `verbose`: 是否输出调试日志
/// - `json`: 是否输出 JSON 格式日志
pub fn init(verbose: bool, json: bool) -> Result<()> {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .context("无法创建日志过滤器")?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(verbose);

    let result = if json {
        builder.json().try_init()
    } else {
        builder.compact().try_init()
    };
    result.map_err(|e| anyhow::anyhow!("日志初始化失败: {}", e))
}

/// 记录程序启动信息
pub fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 风格化文章生成");
    info!("📚 参考语料: {}", config.corpus_path);
    info!(
        "🔌 生成后端: {:?} + template",
        config.enabled_providers()
    );
    info!(
        "⏱️ 单次超时: {}ms / 整体截止: {}ms",
        config.backend_timeout_ms, config.overall_deadline_ms
    );
    info!("{}", "=".repeat(60));
}

/// 记录语料分类统计
pub fn log_corpus_stats(stats: &BTreeMap<String, CategoryStats>) {
    info!("📊 语料分类统计:");
    for (category, stat) in stats {
        info!(
            "  - {}: {} 篇, 平均 {:.0} 词",
            category, stat.count, stat.avg_words
        );
    }
}

/// 记录单次生成的结果摘要
pub fn log_generation_summary(result: &GenerationResult) {
    info!("\n{}", "─".repeat(60));
    info!("✅ 生成完成: {}", truncate_text(&result.title, 60));
    info!(
        "🔌 后端: {}{} / 耗时: {}ms",
        result.backend_used,
        if result.metadata.fallback_used {
            " (兜底)"
        } else {
            ""
        },
        result.latency_ms
    );
    info!(
        "📝 字数: {} / 质量评分: {:.1} ({})",
        result.metadata.word_count, result.quality_score, result.metadata.quality.grade
    );
    info!("📎 参考范例: {} 篇", result.metadata.exemplars.len());
    info!("{}", "─".repeat(60));
}

/// 打印批量处理的最终统计
///
/// # 参数
/// - `success`: 成功数量
/// - `failed`: 失败数量
/// - `total`: 总数
pub fn print_final_stats(success: usize, failed: usize, total: usize) {
    info!("\n{}", "=".repeat(60));
    info!("📊 全部处理完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 成功: {}/{}", success, total);
    info!("❌ 失败: {}", failed);
    info!("{}", "=".repeat(60));
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
