//! 质量评分 - 业务能力层
//!
//! 启发式打分，只用于日志和元数据，不影响是否返回结果
//!
//! 评分构成（满分 100）：
//! - 字数接近度 40 分
//! - 关键词覆盖 40 分
//! - 结构 20 分（标题 10 分 + 结尾总结 10 分）

use crate::models::article::count_words;
use crate::models::brief::Brief;
use crate::models::result::QualityReport;

const LENGTH_WEIGHT: f64 = 40.0;
const KEYWORD_WEIGHT: f64 = 40.0;
const HEADING_POINTS: f64 = 10.0;
const SUMMARY_POINTS: f64 = 10.0;

const SUMMARY_MARKERS: [&str; 4] = ["conclusion", "summary", "key takeaways", "final thoughts"];

/// 计算总分，范围 [0, 100]
pub fn score(text: &str, brief: &Brief) -> f64 {
    evaluate(text, brief).overall
}

/// 计算评分明细
pub fn evaluate(text: &str, brief: &Brief) -> QualityReport {
    if text.trim().is_empty() {
        return QualityReport {
            overall: 0.0,
            length_score: 0.0,
            keyword_score: 0.0,
            structure_score: 0.0,
            keyword_coverage: 0.0,
            word_count: 0,
            grade: grade_for(0.0).to_string(),
            recommendations: vec!["Generated text is empty".to_string()],
        };
    }

    let word_count = count_words(text);
    let length_score = length_score(word_count, brief.desired_length);
    let keyword_coverage = keyword_coverage(text, &brief.keywords);
    let keyword_score = KEYWORD_WEIGHT * keyword_coverage;

    let has_heading = has_heading(text);
    let has_summary = has_closing_summary(text);
    let structure_score = if has_heading { HEADING_POINTS } else { 0.0 }
        + if has_summary { SUMMARY_POINTS } else { 0.0 };

    let overall = (length_score + keyword_score + structure_score).clamp(0.0, 100.0);

    let mut recommendations = Vec::new();
    if length_score < LENGTH_WEIGHT * 0.75 {
        recommendations.push(format!(
            "Adjust length toward the {} word target (currently {} words)",
            brief.desired_length, word_count
        ));
    }
    if keyword_coverage < 1.0 {
        let missing: Vec<&str> = brief
            .keywords
            .iter()
            .filter(|k| !contains_ignore_case(text, k))
            .map(String::as_str)
            .collect();
        recommendations.push(format!(
            "Improve keyword integration, missing: {}",
            missing.join(", ")
        ));
    }
    if !has_heading {
        recommendations.push("Add a markdown title and section headings".to_string());
    }
    if !has_summary {
        recommendations.push("Close with a conclusion or key takeaways section".to_string());
    }

    QualityReport {
        overall,
        length_score,
        keyword_score,
        structure_score,
        keyword_coverage,
        word_count,
        grade: grade_for(overall).to_string(),
        recommendations,
    }
}

/// 分数对应的等级
pub fn grade_for(score: f64) -> &'static str {
    match score {
        s if s >= 90.0 => "A+",
        s if s >= 85.0 => "A",
        s if s >= 80.0 => "B+",
        s if s >= 75.0 => "B",
        s if s >= 70.0 => "C+",
        s if s >= 65.0 => "C",
        _ => "D",
    }
}

fn length_score(word_count: usize, desired: usize) -> f64 {
    if desired == 0 {
        return 0.0;
    }
    let deviation = (word_count as f64 - desired as f64).abs() / desired as f64;
    LENGTH_WEIGHT * (1.0 - deviation).max(0.0)
}

/// 关键词覆盖率，没有关键词时视为全覆盖
fn keyword_coverage(text: &str, keywords: &[String]) -> f64 {
    if keywords.is_empty() {
        return 1.0;
    }
    let found = keywords
        .iter()
        .filter(|k| contains_ignore_case(text, k))
        .count();
    found as f64 / keywords.len() as f64
}

fn contains_ignore_case(text: &str, needle: &str) -> bool {
    text.to_lowercase().contains(&needle.to_lowercase())
}

fn has_heading(text: &str) -> bool {
    text.lines().any(|line| line.trim_start().starts_with('#'))
}

fn has_closing_summary(text: &str) -> bool {
    text.lines().any(|line| {
        let lower = line.to_lowercase();
        SUMMARY_MARKERS.iter().any(|m| lower.contains(m))
    })
}
