//! 风险分级
//!
//! 单条消息的简单分级与整段会话的累计评分。

use serde::{Deserialize, Serialize};

use mc_core::Sentiment;

use crate::emotion::EmotionLabel;
use crate::lexicon::{self, CONCERN_KEYWORDS, CRISIS_KEYWORDS, SEVERE_KEYWORDS};

/// 会话评分达到此值判为高风险
pub const HIGH_RISK_SCORE: f32 = 15.0;

/// 会话评分达到此值判为中风险
pub const MEDIUM_RISK_SCORE: f32 = 7.0;

/// 风险等级
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::Critical => "critical",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "low" => Some(RiskLevel::Low),
            "medium" => Some(RiskLevel::Medium),
            "high" => Some(RiskLevel::High),
            "critical" => Some(RiskLevel::Critical),
            _ => None,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            RiskLevel::Low => "低风险",
            RiskLevel::Medium => "中风险",
            RiskLevel::High => "高风险",
            RiskLevel::Critical => "危机",
        }
    }

    /// 对会话风险分的贡献
    pub fn weight(&self) -> f32 {
        match self {
            RiskLevel::Low => 0.0,
            RiskLevel::Medium => 2.0,
            RiskLevel::High => 5.0,
            RiskLevel::Critical => 10.0,
        }
    }

    /// 需要人工咨询师跟进
    pub fn needs_counselor(&self) -> bool {
        *self >= RiskLevel::High
    }
}

/// 单条消息的简单风险评估
pub fn assess_risk_level_simple(text: &str) -> RiskLevel {
    let normalized = lexicon::normalize(text);
    if normalized.is_empty() {
        return RiskLevel::Low;
    }

    if lexicon::contains_any(&normalized, CRISIS_KEYWORDS) {
        RiskLevel::Critical
    } else if lexicon::contains_any(&normalized, SEVERE_KEYWORDS) {
        RiskLevel::High
    } else if lexicon::contains_any(&normalized, CONCERN_KEYWORDS) {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}

/// 单轮评估信号
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TurnSignal {
    pub emotion: EmotionLabel,
    pub risk: RiskLevel,
    pub sentiment: Option<Sentiment>,
}

impl TurnSignal {
    pub fn new(emotion: EmotionLabel, risk: RiskLevel, sentiment: Option<Sentiment>) -> Self {
        Self {
            emotion,
            risk,
            sentiment,
        }
    }

    /// 本轮对会话风险分的贡献
    pub fn score(&self) -> f32 {
        let sentiment = self
            .sentiment
            .filter(|s| s.polarity == mc_core::Polarity::Negative)
            .map(|s| 2.0 * s.confidence)
            .unwrap_or(0.0);
        self.risk.weight() + self.emotion.weight() + sentiment
    }
}

/// 会话级风险评估结果
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub level: RiskLevel,
    pub score: f32,
    /// 单轮最高风险
    pub peak: RiskLevel,
}

/// 累计整段会话的风险
///
/// 任一轮为 `Critical` 则整体为 `Critical`；任一轮为 `High` 则整体至少为 `High`。
pub fn calculate_risk_level(turns: &[TurnSignal]) -> RiskAssessment {
    let score = turns.iter().map(TurnSignal::score).sum::<f32>().max(0.0);
    let peak = turns
        .iter()
        .map(|t| t.risk)
        .max()
        .unwrap_or(RiskLevel::Low);

    let level = if peak == RiskLevel::Critical {
        RiskLevel::Critical
    } else if peak == RiskLevel::High || score >= HIGH_RISK_SCORE {
        RiskLevel::High
    } else if score >= MEDIUM_RISK_SCORE {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    };

    RiskAssessment { level, score, peak }
}
