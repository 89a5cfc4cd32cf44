//! 情绪识别
//!
//! 关键词命中为主，外部情感模型为辅的情绪标签映射。

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use mc_core::Sentiment;

use crate::lexicon::{self, EMOTION_KEYWORDS};

/// 模型在无关键词命中时被采信的最低置信度
pub const SENTIMENT_FALLBACK_THRESHOLD: f32 = 0.6;

/// 模型推翻正面关键词所需的置信度
pub const SENTIMENT_OVERRIDE_THRESHOLD: f32 = 0.85;

/// 情绪标签
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmotionLabel {
    Happy,
    Neutral,
    Anxious,
    Sad,
    Angry,
    Stressed,
    Lonely,
    Hopeless,
}

impl EmotionLabel {
    pub const ALL: [EmotionLabel; 8] = [
        EmotionLabel::Happy,
        EmotionLabel::Neutral,
        EmotionLabel::Anxious,
        EmotionLabel::Sad,
        EmotionLabel::Angry,
        EmotionLabel::Stressed,
        EmotionLabel::Lonely,
        EmotionLabel::Hopeless,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EmotionLabel::Happy => "happy",
            EmotionLabel::Neutral => "neutral",
            EmotionLabel::Anxious => "anxious",
            EmotionLabel::Sad => "sad",
            EmotionLabel::Angry => "angry",
            EmotionLabel::Stressed => "stressed",
            EmotionLabel::Lonely => "lonely",
            EmotionLabel::Hopeless => "hopeless",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|label| label.as_str() == value)
    }

    /// 结果页展示名称
    pub fn display_name(&self) -> &'static str {
        match self {
            EmotionLabel::Happy => "愉快",
            EmotionLabel::Neutral => "平静",
            EmotionLabel::Anxious => "焦虑",
            EmotionLabel::Sad => "低落",
            EmotionLabel::Angry => "愤怒",
            EmotionLabel::Stressed => "压力",
            EmotionLabel::Lonely => "孤独",
            EmotionLabel::Hopeless => "绝望",
        }
    }

    pub fn is_negative(&self) -> bool {
        !matches!(self, EmotionLabel::Happy | EmotionLabel::Neutral)
    }

    /// 对会话风险分的贡献
    pub fn weight(&self) -> f32 {
        match self {
            EmotionLabel::Hopeless => 3.0,
            EmotionLabel::Sad | EmotionLabel::Anxious | EmotionLabel::Lonely => 2.0,
            EmotionLabel::Stressed | EmotionLabel::Angry => 1.0,
            EmotionLabel::Neutral => 0.0,
            EmotionLabel::Happy => -1.0,
        }
    }

    /// 并列时的安全优先级，越大越优先
    pub fn safety_priority(&self) -> u8 {
        match self {
            EmotionLabel::Hopeless => 7,
            EmotionLabel::Sad => 6,
            EmotionLabel::Anxious => 5,
            EmotionLabel::Lonely => 4,
            EmotionLabel::Stressed => 3,
            EmotionLabel::Angry => 2,
            EmotionLabel::Happy => 1,
            EmotionLabel::Neutral => 0,
        }
    }
}

/// 统计每种情绪的关键词命中数 (每个关键词至多计一次)
///
/// 被否定前缀修饰的正面关键词计入 `Sad`。
pub fn keyword_hits(text: &str) -> BTreeMap<EmotionLabel, u32> {
    let normalized = lexicon::normalize(text);
    let mut hits = BTreeMap::new();
    if normalized.is_empty() {
        return hits;
    }

    for table in EMOTION_KEYWORDS {
        for kw in table.keywords {
            let mut plain = false;
            let mut negated = false;
            for idx in lexicon::keyword_positions(&normalized, kw) {
                if table.label == EmotionLabel::Happy && lexicon::is_negated_at(&normalized, idx) {
                    negated = true;
                } else {
                    plain = true;
                }
            }
            if plain {
                *hits.entry(table.label).or_insert(0) += 1;
            }
            if negated {
                *hits.entry(EmotionLabel::Sad).or_insert(0) += 1;
            }
        }
    }

    hits
}

/// 命中最多的情绪，并列时按安全优先级
fn strongest(hits: &BTreeMap<EmotionLabel, u32>) -> Option<EmotionLabel> {
    hits.iter()
        .filter(|(_, count)| **count > 0)
        .max_by_key(|(label, count)| (**count, label.safety_priority()))
        .map(|(label, _)| *label)
}

/// 将消息映射为情绪标签
///
/// 关键词命中优先；正面关键词在模型给出高置信度负面判断时被推翻为 `Sad`，
/// 负面关键词从不被正面模型推翻。无命中时退回模型极性，模型缺失则为 `Neutral`。
pub fn intelligent_emotion_mapping(text: &str, sentiment: Option<Sentiment>) -> EmotionLabel {
    if text.trim().is_empty() {
        return EmotionLabel::Neutral;
    }

    let hits = keyword_hits(text);
    if let Some(label) = strongest(&hits) {
        if label == EmotionLabel::Happy
            && sentiment.is_some_and(|s| s.is_negative_at(SENTIMENT_OVERRIDE_THRESHOLD))
        {
            tracing::debug!("positive keywords overridden by negative sentiment");
            return EmotionLabel::Sad;
        }
        return label;
    }

    match sentiment {
        Some(s) if s.is_negative_at(SENTIMENT_FALLBACK_THRESHOLD) => EmotionLabel::Sad,
        Some(s) if s.is_positive_at(SENTIMENT_FALLBACK_THRESHOLD) => EmotionLabel::Happy,
        _ => EmotionLabel::Neutral,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mc_core::Polarity;

    fn negative(confidence: f32) -> Option<Sentiment> {
        Some(Sentiment::new(Polarity::Negative, confidence))
    }

    fn positive(confidence: f32) -> Option<Sentiment> {
        Some(Sentiment::new(Polarity::Positive, confidence))
    }

    #[test]
    fn test_keyword_mapping() {
        assert_eq!(
            intelligent_emotion_mapping("最近考试太多，压力好大", None),
            EmotionLabel::Stressed
        );
        assert_eq!(
            intelligent_emotion_mapping("宿舍里没人理解我，好孤单", None),
            EmotionLabel::Lonely
        );
        assert_eq!(
            intelligent_emotion_mapping("I'm so worried and nervous", None),
            EmotionLabel::Anxious
        );
    }

    #[test]
    fn test_english_substrings_do_not_hit() {
        assert_eq!(
            intelligent_emotion_mapping("Whatever, for example my dad retired", None),
            EmotionLabel::Neutral
        );
        assert_eq!(intelligent_emotion_mapping("two exams this week", None), EmotionLabel::Stressed);
    }

    #[test]
    fn test_negated_positive_is_sad() {
        assert_eq!(intelligent_emotion_mapping("我不开心", None), EmotionLabel::Sad);
        assert_eq!(
            intelligent_emotion_mapping("honestly I am not happy", None),
            EmotionLabel::Sad
        );
    }

    #[test]
    fn test_tie_broken_by_safety_priority() {
        // 一个焦虑命中、一个愤怒命中
        assert_eq!(intelligent_emotion_mapping("又紧张又生气", None), EmotionLabel::Anxious);
        // 一个正面、一个负面
        assert_eq!(intelligent_emotion_mapping("有点开心也有点难过", None), EmotionLabel::Sad);
    }

    #[test]
    fn test_strong_negative_model_overrides_positive_keyword() {
        assert_eq!(
            intelligent_emotion_mapping("还不错吧", negative(0.9)),
            EmotionLabel::Sad
        );
        assert_eq!(
            intelligent_emotion_mapping("还不错吧", negative(0.7)),
            EmotionLabel::Happy
        );
    }

    #[test]
    fn test_negative_keyword_not_overridden_by_positive_model() {
        assert_eq!(
            intelligent_emotion_mapping("我很焦虑", positive(0.99)),
            EmotionLabel::Anxious
        );
    }

    #[test]
    fn test_sentiment_fallback_without_keywords() {
        assert_eq!(intelligent_emotion_mapping("今天去了图书馆", negative(0.8)), EmotionLabel::Sad);
        assert_eq!(intelligent_emotion_mapping("今天去了图书馆", positive(0.65)), EmotionLabel::Happy);
        assert_eq!(intelligent_emotion_mapping("今天去了图书馆", negative(0.5)), EmotionLabel::Neutral);
        assert_eq!(intelligent_emotion_mapping("今天去了图书馆", None), EmotionLabel::Neutral);
    }

    #[test]
    fn test_empty_text_is_neutral() {
        assert_eq!(intelligent_emotion_mapping("   ", negative(0.99)), EmotionLabel::Neutral);
        assert!(keyword_hits("").is_empty());
    }

    #[test]
    fn test_label_round_trip_through_str() {
        for label in EmotionLabel::ALL {
            assert_eq!(EmotionLabel::parse(label.as_str()), Some(label));
        }
    }
}
