//! 评估报告 (结果页数据)

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use mc_core::SessionId;

use crate::emotion::EmotionLabel;
use crate::risk::{calculate_risk_level, RiskAssessment, RiskLevel, TurnSignal};

/// 危机求助渠道
pub const CRISIS_HOTLINES: &[&str] = &[
    "全国心理援助热线：400-161-9995",
    "北京心理危机研究与干预中心：010-82951332",
    "紧急情况请立即拨打 120 或 110",
];

/// 评估报告
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssessmentReport {
    pub session_id: SessionId,
    pub risk: RiskAssessment,
    pub dominant_emotion: EmotionLabel,
    pub emotion_distribution: BTreeMap<EmotionLabel, u32>,
    pub turns: u32,
    pub needs_counselor: bool,
    pub recommendations: Vec<String>,
    pub generated_at: DateTime<Utc>,
}

impl AssessmentReport {
    /// 由各轮信号生成报告
    pub fn build(session_id: SessionId, signals: &[TurnSignal]) -> Self {
        let risk = calculate_risk_level(signals);

        let mut emotion_distribution = BTreeMap::new();
        for signal in signals {
            *emotion_distribution.entry(signal.emotion).or_insert(0u32) += 1;
        }

        Self {
            session_id,
            dominant_emotion: dominant_emotion(&emotion_distribution),
            emotion_distribution,
            turns: signals.len() as u32,
            needs_counselor: risk.level.needs_counselor(),
            recommendations: recommendations(risk.level),
            risk,
            generated_at: Utc::now(),
        }
    }

    /// 结果页摘要
    pub fn summary(&self) -> String {
        format!(
            "本次评估共 {} 轮，主要情绪：{}，风险等级：{}",
            self.turns,
            self.dominant_emotion.display_name(),
            self.risk.level.display_name()
        )
    }
}

/// 出现次数最多的非中性情绪，并列时按安全优先级；全部中性时为 `Neutral`
fn dominant_emotion(distribution: &BTreeMap<EmotionLabel, u32>) -> EmotionLabel {
    distribution
        .iter()
        .filter(|(label, _)| **label != EmotionLabel::Neutral)
        .max_by_key(|(label, count)| (**count, label.safety_priority()))
        .map(|(label, _)| *label)
        .unwrap_or(EmotionLabel::Neutral)
}

fn recommendations(level: RiskLevel) -> Vec<String> {
    let mut items: Vec<String> = match level {
        RiskLevel::Low => vec![
            "保持规律作息和适量运动".to_string(),
            "遇到困扰时可以随时回来聊聊".to_string(),
        ],
        RiskLevel::Medium => vec![
            "尝试记录每天的情绪变化，留意触发因素".to_string(),
            "与信任的朋友或家人沟通你的感受".to_string(),
            "建议预约学校心理咨询中心进行面谈".to_string(),
        ],
        RiskLevel::High => vec![
            "我们建议你尽快预约专业心理咨询师".to_string(),
            "不要独自承受，请告诉身边信任的人".to_string(),
            "学校心理咨询中心会主动与你联系".to_string(),
        ],
        RiskLevel::Critical => vec![
            "请立即联系专业危机干预热线，你并不孤单".to_string(),
            "请留在安全的地方，并告知身边的人".to_string(),
        ],
    };
    if level == RiskLevel::Critical {
        items.extend(CRISIS_HOTLINES.iter().map(|s| s.to_string()));
    }
    items
}
