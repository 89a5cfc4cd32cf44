//! 关键词词典
//!
//! 所有关键词均为小写，匹配前先对消息做 `to_lowercase()`。
//! 中文为主要语料，英文作为补充。

use crate::emotion::EmotionLabel;

/// 情绪关键词表
pub struct EmotionKeywords {
    pub label: EmotionLabel,
    pub keywords: &'static [&'static str],
}

pub const EMOTION_KEYWORDS: &[EmotionKeywords] = &[
    EmotionKeywords {
        label: EmotionLabel::Happy,
        keywords: &[
            "开心", "高兴", "快乐", "愉快", "幸福", "满足", "兴奋", "不错", "挺好", "轻松",
            "happy", "glad", "great", "excited", "joyful", "relieved",
        ],
    },
    EmotionKeywords {
        label: EmotionLabel::Anxious,
        keywords: &[
            "焦虑", "紧张", "担心", "不安", "害怕", "恐惧", "心慌", "忐忑",
            "anxious", "anxiety", "nervous", "worried", "panic", "afraid", "scared",
        ],
    },
    EmotionKeywords {
        label: EmotionLabel::Sad,
        keywords: &[
            "难过", "伤心", "悲伤", "抑郁", "沮丧", "失落", "想哭", "哭了", "痛苦", "低落", "郁闷",
            "sad", "depressed", "unhappy", "upset", "crying", "miserable",
        ],
    },
    EmotionKeywords {
        label: EmotionLabel::Angry,
        keywords: &[
            "生气", "愤怒", "气死", "烦死", "恼火", "讨厌", "不公平", "火大",
            "angry", "furious", "mad at", "hate", "hated", "annoyed", "irritated",
        ],
    },
    EmotionKeywords {
        label: EmotionLabel::Stressed,
        keywords: &[
            "压力", "好累", "很累", "太累", "累了", "疲惫", "很忙", "太忙", "考试", "作业", "论文",
            "期末", "挂科", "熬夜", "绩点", "内卷",
            "stress", "stressed", "exhausted", "tired", "overwhelmed", "deadline", "deadlines",
            "exam", "exams",
        ],
    },
    EmotionKeywords {
        label: EmotionLabel::Lonely,
        keywords: &[
            "孤独", "寂寞", "孤单", "没有朋友", "没人理解", "被孤立", "没人陪", "一个人",
            "lonely", "alone", "isolated", "no friends", "nobody understands",
        ],
    },
    EmotionKeywords {
        label: EmotionLabel::Hopeless,
        keywords: &[
            "绝望", "没有希望", "活着没意思", "没意义", "撑不下去", "熬不下去", "看不到未来",
            "无所谓了", "放弃了",
            "hopeless", "pointless", "no future", "give up", "can't go on",
        ],
    },
];

/// 紧接在正面关键词之前时将其翻转为负面的否定前缀
pub const NEGATION_PREFIXES: &[&str] = &[
    "不", "没", "没有", "并不", "不太", "不是很", "not", "never", "n't", "no longer",
];

/// 危机关键词 (自杀意图)
pub const CRISIS_KEYWORDS: &[&str] = &[
    "自杀", "想死", "不想活", "结束生命", "轻生", "跳楼", "割腕", "遗书", "了结自己", "死了算了",
    "suicide", "suicidal", "kill myself", "end my life", "want to die", "take my own life",
];

/// 严重关键词 (自伤 / 绝望)
pub const SEVERE_KEYWORDS: &[&str] = &[
    "自残", "伤害自己", "划伤自己", "绝望", "活着没意思", "活着没意义", "撑不下去", "没有希望",
    "self-harm", "self harm", "hurt myself", "cut myself", "hopeless", "can't go on",
];

/// 关注关键词 (困扰症状)
pub const CONCERN_KEYWORDS: &[&str] = &[
    "失眠", "睡不着", "焦虑", "抑郁", "崩溃", "压力很大", "压力大", "孤独", "难过", "想哭", "痛苦",
    "害怕",
    "insomnia", "can't sleep", "anxious", "depressed", "breakdown", "overwhelmed", "lonely",
    "panic",
];

/// 用户主动结束评估的表达
pub const EARLY_END_PHRASES: &[&str] = &[
    "结束评估", "结束对话", "不想聊了", "先这样吧", "再见",
    "end assessment", "stop assessment", "goodbye", "bye",
];

/// 统一的大小写归一
pub fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

/// 关键词在已归一文本中的出现位置 (字节偏移)
///
/// 英文关键词要求两侧为单词边界，中文关键词按子串匹配。
pub fn keyword_positions<'a>(normalized: &'a str, keyword: &'a str) -> impl Iterator<Item = usize> + 'a {
    let ascii = keyword.is_ascii();
    normalized
        .match_indices(keyword)
        .map(|(idx, _)| idx)
        .filter(move |&idx| !ascii || on_word_boundary(normalized, idx, idx + keyword.len()))
}

fn on_word_boundary(text: &str, start: usize, end: usize) -> bool {
    let before = text[..start].chars().next_back();
    let after = text[end..].chars().next();
    let is_word = |c: char| c.is_ascii_alphanumeric();
    !before.is_some_and(is_word) && !after.is_some_and(is_word)
}

/// 是否出现某个关键词
pub fn contains_keyword(normalized: &str, keyword: &str) -> bool {
    keyword_positions(normalized, keyword).next().is_some()
}

/// 已归一文本中出现的关键词
pub fn matched<'a>(normalized: &str, keywords: &'a [&'a str]) -> Vec<&'a str> {
    keywords
        .iter()
        .copied()
        .filter(|kw| contains_keyword(normalized, kw))
        .collect()
}

/// 已归一文本是否命中任一关键词
pub fn contains_any(normalized: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|kw| contains_keyword(normalized, kw))
}

/// 关键词的一次出现是否被否定前缀修饰
pub fn is_negated_at(normalized: &str, byte_index: usize) -> bool {
    let prefix = normalized[..byte_index].trim_end();
    NEGATION_PREFIXES.iter().any(|neg| prefix.ends_with(neg))
}

/// 用户是否要求提前结束评估
pub fn wants_to_end(text: &str) -> bool {
    contains_any(&normalize(text), EARLY_END_PHRASES)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_keywords_lowercase() {
        let tables = EMOTION_KEYWORDS
            .iter()
            .flat_map(|t| t.keywords.iter())
            .chain(CRISIS_KEYWORDS)
            .chain(SEVERE_KEYWORDS)
            .chain(CONCERN_KEYWORDS)
            .chain(EARLY_END_PHRASES);
        for kw in tables {
            assert_eq!(*kw, kw.to_lowercase(), "keyword must be lowercase: {kw}");
        }
    }

    #[test]
    fn test_negation_detection() {
        let text = normalize("我今天不开心");
        let idx = text.find("开心").unwrap();
        assert!(is_negated_at(&text, idx));

        let text = normalize("I am not happy");
        let idx = text.find("happy").unwrap();
        assert!(is_negated_at(&text, idx));

        let text = normalize("今天很开心");
        let idx = text.find("开心").unwrap();
        assert!(!is_negated_at(&text, idx));
    }

    #[test]
    fn test_early_end_phrases() {
        assert!(wants_to_end("好的，结束评估吧"));
        assert!(wants_to_end("OK, Bye"));
        assert!(!wants_to_end("我还想继续聊聊"));
    }

    #[test]
    fn test_matched_keywords() {
        let hits = matched(&normalize("最近失眠，压力很大"), CONCERN_KEYWORDS);
        assert_eq!(hits, vec!["失眠", "压力很大"]);
    }

    #[test]
    fn test_english_keywords_need_word_boundary() {
        assert!(!contains_keyword(&normalize("Whatever, it's fine"), "hate"));
        assert!(!contains_keyword(&normalize("for example"), "exam"));
        assert!(!contains_keyword(&normalize("my dad retired"), "tired"));
        assert!(contains_keyword(&normalize("I hate this"), "hate"));
        assert!(contains_keyword(&normalize("so tired."), "tired"));
        assert!(contains_keyword(&normalize("exam-week"), "exam"));
        // 中文无词边界
        assert!(contains_keyword(&normalize("期末考试好难"), "考试"));
        assert!(contains_keyword(&normalize("今天考试exam"), "考试"));
    }
}
