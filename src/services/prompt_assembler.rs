//! 提示词组装 - 业务能力层
//!
//! 把简报参数和范例拼成一条生成指令，纯函数，不会失败
//!
//! 固定顺序：
//! 1. 角色设定与写作风格
//! 2. 简报参数块
//! 3. 范例摘录（每篇按句子边界截断）
//! 4. 输出格式要求

use std::sync::OnceLock;

use regex::Regex;

use crate::models::brief::{Brief, CallToAction};
use crate::models::result::ExemplarSelection;

/// 没有范例时使用的通用角色设定
pub const GENERIC_PERSONA: &str = "You are an experienced business writer producing clear, \
well-structured articles for professional readers.";

/// 没有范例时写入提示词的说明
pub const NO_EXAMPLES_NOTICE: &str = "No reference examples are available for this request.";

const HOUSE_PERSONA: &str = "You are an expert content writer for a leading digital \
transformation and marketing consultancy. Match the voice of the reference articles below.";

/// 写作风格规则
#[derive(Debug, Clone)]
pub struct StyleGuideRules {
    /// 有范例时使用的角色设定
    pub persona: String,
    pub guidelines: Vec<String>,
    /// 每篇范例摘录的最大字符数
    pub excerpt_char_cap: usize,
    pub max_exemplars: usize,
    /// 要求输出的章节（二级标题）
    pub section_structure: Vec<String>,
    /// 字数允许的上下浮动比例
    pub length_tolerance: f64,
}

impl Default for StyleGuideRules {
    fn default() -> Self {
        Self {
            persona: HOUSE_PERSONA.to_string(),
            guidelines: vec![
                "Open with a forward-looking line such as \"In today's digital era...\"".to_string(),
                "Use clear, business-focused language that is accessible yet professional".to_string(),
                "Include practical examples and case studies".to_string(),
                "Structure content with numbered lists and clear sections".to_string(),
                "Focus on business value and practical implementation".to_string(),
                "End with a call to action".to_string(),
            ],
            excerpt_char_cap: 600,
            max_exemplars: 3,
            section_structure: vec![
                "Introduction".to_string(),
                "Why It Matters".to_string(),
                "Key Strategies".to_string(),
                "Implementation Roadmap".to_string(),
                "Conclusion".to_string(),
            ],
            length_tolerance: 0.15,
        }
    }
}

/// 组装生成指令
pub fn assemble(brief: &Brief, selection: &ExemplarSelection, rules: &StyleGuideRules) -> String {
    let mut parts: Vec<String> = Vec::new();

    // 1. 角色设定
    let persona = if selection.is_empty() {
        GENERIC_PERSONA
    } else {
        rules.persona.as_str()
    };
    parts.push(persona.to_string());
    if !rules.guidelines.is_empty() {
        let lines: Vec<String> = rules.guidelines.iter().map(|g| format!("• {}", g)).collect();
        parts.push(format!("WRITING STYLE GUIDELINES:\n{}", lines.join("\n")));
    }

    // 2. 简报参数
    parts.push(render_parameter_block(brief));

    // 3. 范例
    if selection.is_empty() {
        parts.push(format!(
            "{} Write in the style described by the guidelines above.",
            NO_EXAMPLES_NOTICE
        ));
    } else {
        let mut examples = vec![
            "Write content that matches the style demonstrated in these reference articles:"
                .to_string(),
        ];
        for (i, exemplar) in selection.iter().take(rules.max_exemplars).enumerate() {
            let article = &exemplar.article;
            examples.push(format!(
                "EXAMPLE {} - {} Category (Similarity: {:.3}):\nTitle: {}\nExcerpt: {}\nWord Count: {} words\nKey Patterns: {}",
                i + 1,
                article.category,
                exemplar.similarity,
                article.title,
                truncate_at_sentence(&article.body_text, rules.excerpt_char_cap),
                article.word_count,
                identify_style_patterns(&article.body_text)
            ));
        }
        parts.push(examples.join("\n\n"));
    }

    // 4. 输出格式
    parts.push(render_output_format(brief, rules));

    parts.join("\n\n")
}

/// 简报参数块的各行前缀，兜底模板按这些前缀解析参数
const TOPIC_LABEL: &str = "Topic: ";
const CATEGORY_LABEL: &str = "Category: ";
const INDUSTRY_LABEL: &str = "Industry: ";
const CONTEXT_LABEL: &str = "Company context: ";
const AUDIENCE_LABEL: &str = "Target audience: ";
const TONE_LABEL: &str = "Tone: ";
const KEYWORDS_LABEL: &str = "Keywords:";
const KEYWORD_ITEM: &str = "  - ";
const LENGTH_LABEL: &str = "Target length: ";
const CTA_LABEL: &str = "Call to action: ";
const NO_KEYWORDS: &str = "(none)";

/// 简报参数块，每个字段一行；关键词每个一行，关键词本身可以含逗号
fn render_parameter_block(brief: &Brief) -> String {
    let mut lines = vec![
        "CONTENT BRIEF:".to_string(),
        format!("{TOPIC_LABEL}{}", brief.topic),
        format!("{CATEGORY_LABEL}{}", brief.category_filter().unwrap_or("General")),
    ];
    if let Some(industry) = &brief.industry {
        lines.push(format!("{INDUSTRY_LABEL}{}", industry));
    }
    if let Some(context) = &brief.company_context {
        lines.push(format!("{CONTEXT_LABEL}{}", context));
    }
    lines.push(format!("{AUDIENCE_LABEL}{}", brief.target_audience));
    lines.push(format!("{TONE_LABEL}{}", brief.tone));
    if brief.keywords.is_empty() {
        lines.push(format!("{KEYWORDS_LABEL} {NO_KEYWORDS}"));
    } else {
        lines.push(KEYWORDS_LABEL.to_string());
        lines.extend(brief.keywords.iter().map(|k| format!("{KEYWORD_ITEM}{}", k)));
    }
    lines.push(format!("{LENGTH_LABEL}{} words", brief.desired_length));
    lines.push(format!("{CTA_LABEL}{}", brief.call_to_action.as_str()));
    lines.join("\n")
}

fn render_output_format(brief: &Brief, rules: &StyleGuideRules) -> String {
    let (min_words, max_words) = word_range(brief.desired_length, rules.length_tolerance);

    let mut requirements = vec![
        "The first line must be the article title formatted as \"# <title>\".".to_string(),
        format!("Length: between {} and {} words.", min_words, max_words),
    ];
    if !rules.section_structure.is_empty() {
        requirements.push(format!(
            "Organize the body under these \"## \" section headings, in order: {}.",
            rules.section_structure.join(", ")
        ));
    }
    if let Some(industry) = &brief.industry {
        requirements.push(format!(
            "Frame examples and implications for the {} industry.",
            industry
        ));
    }
    if brief.include_statistics {
        requirements.push("Include relevant statistics and data points.".to_string());
    }
    if brief.include_case_studies {
        requirements.push("Include real-world examples and case studies.".to_string());
    }
    requirements.push(match brief.call_to_action.invitation() {
        Some(invitation) => format!(
            "Close with a short summary of the key takeaways followed by a call to action inviting readers to {}.",
            invitation
        ),
        None => "Close with a short summary of the key takeaways.".to_string(),
    });
    if !brief.keywords.is_empty() {
        requirements.push(format!(
            "Work every keyword naturally into the text: {}.",
            brief.keywords.join("; ")
        ));
    }

    let mut lines = vec!["OUTPUT FORMAT:".to_string()];
    lines.extend(
        requirements
            .iter()
            .enumerate()
            .map(|(i, line)| format!("{}. {}", i + 1, line)),
    );

    if let Some(focus) = brief.category_filter().and_then(category_focus) {
        lines.push(String::new());
        lines.push(format!("{} CATEGORY FOCUS:", brief.category.to_uppercase()));
        lines.extend(focus.iter().map(|l| format!("• {}", l)));
    }

    lines.join("\n")
}

/// 目标字数的允许范围
pub fn word_range(desired: usize, tolerance: f64) -> (usize, usize) {
    let tolerance = tolerance.clamp(0.0, 1.0);
    let min = (desired as f64 * (1.0 - tolerance)).round() as usize;
    let max = (desired as f64 * (1.0 + tolerance)).round() as usize;
    (min, max)
}

/// 各分类的写作侧重点
fn category_focus(category: &str) -> Option<&'static [&'static str]> {
    let focus: &'static [&'static str] = match category.trim().to_lowercase().as_str() {
        "futurist" => &[
            "Focus on emerging trends and future implications",
            "Include technology adoption and innovation themes",
            "Emphasize forward-thinking business strategies",
        ],
        "marketing" => &[
            "Emphasize practical marketing strategies and tactics",
            "Include case studies and campaign examples",
            "Focus on measurable business results and ROI",
        ],
        "technology" => &[
            "Explain technical concepts in business-friendly terms",
            "Include implementation considerations and best practices",
            "Focus on digital transformation and efficiency gains",
        ],
        "consumer insights" => &[
            "Include customer behavior analysis and psychology",
            "Focus on actionable insights for business decisions",
            "Emphasize customer experience and satisfaction",
        ],
        "experience" => &[
            "Focus on user experience and the customer journey",
            "Include experiential marketing and engagement strategies",
            "Emphasize emotional connection and brand loyalty",
        ],
        "utility & sustainability" => &[
            "Include sustainability and environmental considerations",
            "Focus on long-term business value and responsibility",
            "Emphasize efficiency and resource optimization",
        ],
        _ => return None,
    };
    Some(focus)
}

/// 在不超过 `cap` 个字符的前提下，按最近的句子边界截断
///
/// 先把连续空白压缩为一个空格；找不到句子边界时退回到词边界，绝不在词中间截断
pub fn truncate_at_sentence(text: &str, cap: usize) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= cap {
        return collapsed;
    }

    // cap 个字符对应的字节位置
    let cut = collapsed
        .char_indices()
        .nth(cap)
        .map(|(idx, _)| idx)
        .unwrap_or(collapsed.len());
    let prefix = &collapsed[..cut];

    let sentence_end = prefix
        .char_indices()
        .filter(|(_, c)| matches!(c, '.' | '!' | '?'))
        .map(|(idx, c)| idx + c.len_utf8())
        .filter(|&end| end >= collapsed.len() || collapsed[end..].starts_with(' '))
        .last();

    if let Some(end) = sentence_end {
        return prefix[..end].to_string();
    }

    // 没有句子边界，退回到词边界
    if collapsed[cut..].starts_with(' ') {
        return prefix.trim_end().to_string();
    }
    match prefix.rfind(' ') {
        Some(space) => prefix[..space].trim_end().to_string(),
        None => String::new(),
    }
}

fn numbered_list_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)(^|\s)\d+\.\s").expect("valid regex"))
}

/// 识别文章中的风格特征
pub fn identify_style_patterns(content: &str) -> String {
    let lower = content.to_lowercase();
    let mut patterns = Vec::new();

    if content.contains("In today's digital era") {
        patterns.push("Digital era opening");
    }
    if lower.contains("digital transformation") {
        patterns.push("Digital transformation focus");
    }
    if ["In recent years", "The rapidly evolving", "Modern businesses"]
        .iter()
        .any(|p| content.contains(p))
    {
        patterns.push("Industry context setting");
    }
    if numbered_list_regex().is_match(content) {
        patterns.push("Numbered lists");
    }
    if ["strategy", "solution", "implementation"]
        .iter()
        .any(|w| lower.contains(w))
    {
        patterns.push("Business-focused language");
    }
    if ["contact us", "ready to help", "get started"]
        .iter()
        .any(|p| lower.contains(p))
    {
        patterns.push("Call-to-action");
    }

    if patterns.is_empty() {
        "Standard business writing".to_string()
    } else {
        patterns.join(", ")
    }
}

/// 从生成指令中解析出的简报参数
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptParameters {
    pub topic: String,
    pub category: String,
    pub industry: Option<String>,
    pub target_audience: String,
    pub tone: String,
    pub keywords: Vec<String>,
    pub desired_length: usize,
    pub call_to_action: CallToAction,
}

impl Default for PromptParameters {
    fn default() -> Self {
        Self {
            topic: "Business Strategy".to_string(),
            category: "General".to_string(),
            industry: None,
            target_audience: crate::models::brief::DEFAULT_AUDIENCE.to_string(),
            tone: crate::models::brief::DEFAULT_TONE.to_string(),
            keywords: Vec::new(),
            desired_length: crate::models::brief::DEFAULT_LENGTH,
            call_to_action: CallToAction::default(),
        }
    }
}

/// 解析 `assemble` 输出中的简报参数块，缺失的字段使用默认值
pub fn parse_parameter_block(prompt: &str) -> PromptParameters {
    let mut params = PromptParameters::default();
    let block = match prompt.find("CONTENT BRIEF:") {
        Some(start) => &prompt[start..],
        None => return params,
    };

    for line in block.lines().skip(1) {
        if line.trim().is_empty() {
            break;
        }
        if let Some(v) = line.strip_prefix(KEYWORD_ITEM) {
            let keyword = v.trim();
            if !keyword.is_empty() {
                params.keywords.push(keyword.to_string());
            }
        } else if let Some(v) = line.strip_prefix(TOPIC_LABEL) {
            params.topic = v.trim().to_string();
        } else if let Some(v) = line.strip_prefix(CATEGORY_LABEL) {
            params.category = v.trim().to_string();
        } else if let Some(v) = line.strip_prefix(INDUSTRY_LABEL) {
            params.industry = Some(v.trim().to_string()).filter(|i| !i.is_empty());
        } else if let Some(v) = line.strip_prefix(AUDIENCE_LABEL) {
            params.target_audience = v.trim().to_string();
        } else if let Some(v) = line.strip_prefix(TONE_LABEL) {
            params.tone = v.trim().to_string();
        } else if let Some(v) = line.strip_prefix(LENGTH_LABEL) {
            if let Some(n) = v.split_whitespace().next().and_then(|n| n.parse().ok()) {
                params.desired_length = n;
            }
        } else if let Some(v) = line.strip_prefix(CTA_LABEL) {
            if let Some(cta) = CallToAction::parse(v) {
                params.call_to_action = cta;
            }
        }
    }
    params
}
