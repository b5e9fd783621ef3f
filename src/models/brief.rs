//! 内容简报
//!
//! 每次请求由调用方创建，创建后不再修改

use serde::{Deserialize, Serialize};

use crate::error::BriefError;

pub const DEFAULT_AUDIENCE: &str = "Business Leaders";
pub const DEFAULT_TONE: &str = "Professional";
pub const DEFAULT_LENGTH: usize = 800;

/// 文章篇幅档位
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContentLength {
    Short,
    Medium,
    Long,
    Comprehensive,
}

impl ContentLength {
    /// 对应的目标字数
    pub fn word_count(self) -> usize {
        match self {
            ContentLength::Short => 400,
            ContentLength::Medium => 800,
            ContentLength::Long => 1200,
            ContentLength::Comprehensive => 1600,
        }
    }
}

/// 结尾行动号召的类型
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallToAction {
    #[default]
    Consultation,
    Contact,
    Demo,
    Whitepaper,
    Newsletter,
    None,
}

impl CallToAction {
    pub fn as_str(self) -> &'static str {
        match self {
            CallToAction::Consultation => "consultation",
            CallToAction::Contact => "contact",
            CallToAction::Demo => "demo",
            CallToAction::Whitepaper => "whitepaper",
            CallToAction::Newsletter => "newsletter",
            CallToAction::None => "none",
        }
    }

    /// 按名称解析（忽略大小写），未知名称返回 None
    pub fn parse(name: &str) -> Option<Self> {
        let cta = match name.trim().to_lowercase().as_str() {
            "consultation" => CallToAction::Consultation,
            "contact" => CallToAction::Contact,
            "demo" => CallToAction::Demo,
            "whitepaper" => CallToAction::Whitepaper,
            "newsletter" => CallToAction::Newsletter,
            "none" => CallToAction::None,
            _ => return None,
        };
        Some(cta)
    }

    /// 邀请读者采取的行动，`None` 类型没有行动
    pub fn invitation(self) -> Option<&'static str> {
        match self {
            CallToAction::Consultation => Some("book a consultation with our team"),
            CallToAction::Contact => Some("contact our team"),
            CallToAction::Demo => Some("request a demo"),
            CallToAction::Whitepaper => Some("download the full whitepaper"),
            CallToAction::Newsletter => Some("subscribe to our newsletter"),
            CallToAction::None => None,
        }
    }
}

/// 内容简报
///
/// 所有文本字段在创建时压缩空白，不含换行
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Brief {
    pub topic: String,
    /// 为空表示不按分类过滤
    pub category: String,
    /// 去重后的关键词，保持输入顺序
    pub keywords: Vec<String>,
    pub target_audience: String,
    pub tone: String,
    /// 目标字数
    pub desired_length: usize,
    /// 行业侧重
    pub industry: Option<String>,
    /// 公司或品牌背景
    pub company_context: Option<String>,
    pub include_statistics: bool,
    pub include_case_studies: bool,
    pub call_to_action: CallToAction,
}

impl Brief {
    /// 创建简报，清洗输入并校验
    pub fn new<I, S>(
        topic: impl Into<String>,
        category: impl Into<String>,
        keywords: I,
    ) -> Result<Self, BriefError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let topic = collapse_whitespace(&topic.into());
        if topic.is_empty() {
            return Err(BriefError::EmptyTopic);
        }

        Ok(Self {
            topic,
            category: collapse_whitespace(&category.into()),
            keywords: dedup_keywords(keywords),
            target_audience: DEFAULT_AUDIENCE.to_string(),
            tone: DEFAULT_TONE.to_string(),
            desired_length: DEFAULT_LENGTH,
            industry: None,
            company_context: None,
            include_statistics: true,
            include_case_studies: true,
            call_to_action: CallToAction::default(),
        })
    }

    pub fn with_audience(mut self, audience: impl Into<String>) -> Self {
        let audience = collapse_whitespace(&audience.into());
        if !audience.is_empty() {
            self.target_audience = audience;
        }
        self
    }

    pub fn with_tone(mut self, tone: impl Into<String>) -> Self {
        let tone = collapse_whitespace(&tone.into());
        if !tone.is_empty() {
            self.tone = tone;
        }
        self
    }

    pub fn with_industry(mut self, industry: impl Into<String>) -> Self {
        self.industry = non_empty(&industry.into());
        self
    }

    pub fn with_company_context(mut self, context: impl Into<String>) -> Self {
        self.company_context = non_empty(&context.into());
        self
    }

    pub fn with_statistics(mut self, include: bool) -> Self {
        self.include_statistics = include;
        self
    }

    pub fn with_case_studies(mut self, include: bool) -> Self {
        self.include_case_studies = include;
        self
    }

    pub fn with_call_to_action(mut self, cta: CallToAction) -> Self {
        self.call_to_action = cta;
        self
    }

    pub fn with_desired_length(mut self, words: usize) -> Result<Self, BriefError> {
        if words == 0 {
            return Err(BriefError::ZeroLength);
        }
        self.desired_length = words;
        Ok(self)
    }

    pub fn with_content_length(mut self, length: ContentLength) -> Self {
        self.desired_length = length.word_count();
        self
    }

    /// 分类过滤条件（空分类返回 None）
    pub fn category_filter(&self) -> Option<&str> {
        if self.category.is_empty() {
            None
        } else {
            Some(&self.category)
        }
    }

    /// 用于向量化的简报文本
    pub fn embedding_text(&self) -> String {
        let mut text = format!("Write about {}", self.topic);
        if let Some(industry) = &self.industry {
            text.push_str(&format!(" specifically for the {} industry", industry));
        }
        if !self.keywords.is_empty() {
            text.push_str(&format!(" including keywords: {}", self.keywords.join(", ")));
        }
        if !self.target_audience.is_empty() {
            text.push_str(&format!(" for {}", self.target_audience));
        }
        text
    }

    /// 归一化后的简报，用作缓存键的一部分
    pub fn cache_key(&self) -> String {
        let mut keywords: Vec<String> = self.keywords.iter().map(|k| k.to_lowercase()).collect();
        keywords.sort();
        format!(
            "{}|{}|{}|{}|{}|{}|{}|{}|{}{}|{}",
            self.topic.to_lowercase(),
            self.category.to_lowercase(),
            keywords.join(","),
            self.target_audience.to_lowercase(),
            self.tone.to_lowercase(),
            self.desired_length,
            self.industry.as_deref().unwrap_or("").to_lowercase(),
            self.company_context.as_deref().unwrap_or("").to_lowercase(),
            u8::from(self.include_statistics),
            u8::from(self.include_case_studies),
            self.call_to_action.as_str()
        )
    }
}

/// 简报原始输入（TOML / JSON）
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BriefInput {
    pub topic: String,
    pub category: String,
    pub keywords: Vec<String>,
    pub target_audience: Option<String>,
    pub tone: Option<String>,
    pub desired_length: Option<usize>,
    pub content_length: Option<ContentLength>,
    pub industry: Option<String>,
    pub company_context: Option<String>,
    pub include_statistics: Option<bool>,
    pub include_case_studies: Option<bool>,
    pub call_to_action_type: Option<CallToAction>,
}

impl BriefInput {
    /// 转换为校验后的简报，`desired_length` 优先于 `content_length`
    pub fn into_brief(self) -> Result<Brief, BriefError> {
        let mut brief = Brief::new(self.topic, self.category, self.keywords)?;
        if let Some(audience) = self.target_audience {
            brief = brief.with_audience(audience);
        }
        if let Some(tone) = self.tone {
            brief = brief.with_tone(tone);
        }
        if let Some(length) = self.content_length {
            brief = brief.with_content_length(length);
        }
        if let Some(words) = self.desired_length {
            brief = brief.with_desired_length(words)?;
        }
        if let Some(industry) = self.industry {
            brief = brief.with_industry(industry);
        }
        if let Some(context) = self.company_context {
            brief = brief.with_company_context(context);
        }
        if let Some(include) = self.include_statistics {
            brief = brief.with_statistics(include);
        }
        if let Some(include) = self.include_case_studies {
            brief = brief.with_case_studies(include);
        }
        if let Some(cta) = self.call_to_action_type {
            brief = brief.with_call_to_action(cta);
        }
        Ok(brief)
    }
}

fn dedup_keywords<I, S>(keywords: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = std::collections::HashSet::new();
    keywords
        .into_iter()
        .map(|k| collapse_whitespace(k.as_ref()))
        .filter(|k| !k.is_empty())
        .filter(|k| seen.insert(k.to_lowercase()))
        .collect()
}

/// 去掉首尾空白并把内部连续空白（含换行）压缩为一个空格
fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn non_empty(text: &str) -> Option<String> {
    Some(collapse_whitespace(text)).filter(|t| !t.is_empty())
}
