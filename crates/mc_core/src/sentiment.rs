//! 情感极性 (外部 BERT 模型的输出)

use serde::{Deserialize, Serialize};

/// 情感极性
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Polarity {
    Positive,
    Neutral,
    Negative,
}

impl Polarity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Polarity::Positive => "positive",
            Polarity::Neutral => "neutral",
            Polarity::Negative => "negative",
        }
    }

    /// 解析模型标签，兼容 `positive` / `POSITIVE` / `LABEL_n` 等写法
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "positive" | "pos" | "label_2" | "积极" => Some(Polarity::Positive),
            "neutral" | "neu" | "label_1" | "中性" => Some(Polarity::Neutral),
            "negative" | "neg" | "label_0" | "消极" => Some(Polarity::Negative),
            _ => None,
        }
    }
}

/// 情感分析结果
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sentiment {
    /// 极性
    pub polarity: Polarity,
    /// 置信度 [0, 1]
    pub confidence: f32,
}

impl Sentiment {
    /// 创建情感结果，置信度被截断到 [0, 1]
    pub fn new(polarity: Polarity, confidence: f32) -> Self {
        let confidence = if confidence.is_nan() {
            0.0
        } else {
            confidence.clamp(0.0, 1.0)
        };
        Self {
            polarity,
            confidence,
        }
    }

    /// 置信度不低于阈值的负面情感
    pub fn is_negative_at(&self, threshold: f32) -> bool {
        self.polarity == Polarity::Negative && self.confidence >= threshold
    }

    /// 置信度不低于阈值的正面情感
    pub fn is_positive_at(&self, threshold: f32) -> bool {
        self.polarity == Polarity::Positive && self.confidence >= threshold
    }
}
