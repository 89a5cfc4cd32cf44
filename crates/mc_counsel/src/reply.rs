//! 回复文本：开场白、系统提示、兜底回复与危机回复

use mc_assess::report::CRISIS_HOTLINES;
use mc_assess::{EmotionLabel, RiskLevel};
use mc_durable::{MessageRecord, MessageRole};
use mc_llm::{PromptAst, PromptNode};

/// 会话开场白
pub fn greeting(max_turns: u32) -> String {
    format!(
        "你好，我是心桥 AI 心理助手。接下来我们会用大约 {max_turns} 轮对话了解你最近的状态，\
         你说的内容会被严格保密。最近感觉怎么样？"
    )
}

/// 评估结束提示
pub const CLOSING_NOTICE: &str = "本次评估已完成，正在为你生成评估结果，请稍候查看。";

/// 评估过程中依次覆盖的话题
const FOLLOW_UP_QUESTIONS: &[&str] = &[
    "最近的睡眠和饮食情况怎么样？",
    "学习或考试方面有没有让你感到压力的事情？",
    "和室友、同学或家人的相处还顺利吗？",
    "这种状态大概持续多久了？",
    "平时有没有可以倾诉、给你支持的人？",
];

/// 按轮次取下一个追问话题
pub fn follow_up_question(turn: u32) -> &'static str {
    let idx = (turn.saturating_sub(1) as usize) % FOLLOW_UP_QUESTIONS.len();
    FOLLOW_UP_QUESTIONS[idx]
}

fn empathy_line(emotion: EmotionLabel) -> &'static str {
    match emotion {
        EmotionLabel::Happy => "听到你状态不错，我也替你高兴。",
        EmotionLabel::Neutral => "谢谢你的分享，我在认真听。",
        EmotionLabel::Anxious => "感到紧张和担心是很正常的反应，你不需要一个人扛着。",
        EmotionLabel::Sad => "听起来你最近心里不太好受，谢谢你愿意说出来。",
        EmotionLabel::Angry => "遇到这样的事情会生气是可以理解的。",
        EmotionLabel::Stressed => "这段时间你承受了不少压力，辛苦了。",
        EmotionLabel::Lonely => "一个人的感觉确实不好受，我会在这里陪你聊。",
        EmotionLabel::Hopeless => "我能感受到你现在很疲惫、很难看到希望，你愿意告诉我这些很重要。",
    }
}

/// 文本生成不可用时的兜底回复
pub fn fallback_reply(emotion: EmotionLabel, turn: u32, completes: bool) -> String {
    if completes {
        format!("{} {}", empathy_line(emotion), CLOSING_NOTICE)
    } else {
        format!("{} {}", empathy_line(emotion), follow_up_question(turn))
    }
}

/// 危机回复，不经过文本生成
pub fn crisis_reply() -> String {
    let mut reply = String::from(
        "我非常在意你现在的安全。你提到的想法很重要，请不要独自面对。\
         请尽快联系下面的专业求助渠道，学校心理咨询中心的老师也会尽快联系你：",
    );
    for line in CRISIS_HOTLINES {
        reply.push('\n');
        reply.push_str(line);
    }
    reply
}

/// 评估阶段的系统提示
pub fn system_prompt(
    emotion: EmotionLabel,
    risk: RiskLevel,
    turn: u32,
    max_turns: u32,
    completes: bool,
) -> String {
    let stage = if completes {
        "这是评估的最后一轮，请温和地总结并感谢对方，不要再提问。".to_string()
    } else {
        format!("请共情回应后，自然地询问：{}", follow_up_question(turn))
    };
    format!(
        "你是高校心理健康中心的 AI 心理助手，正在与学生进行心理状态评估对话 (第 {turn}/{max_turns} 轮)。\
         系统识别到对方当前情绪为「{}」，风险等级为「{}」。\
         要求：使用中文，语气温暖真诚，不做医学诊断，不给出药物建议，回复不超过 150 字。{stage}",
        emotion.display_name(),
        risk.display_name(),
    )
}

/// 由历史消息与当前输入构建 Prompt AST
pub fn build_prompt(system: String, history: &[MessageRecord], current: &str) -> PromptAst {
    let mut ast = PromptAst::new().push(PromptNode::System(system));
    for message in history {
        ast = ast.push(match message.role {
            MessageRole::User => PromptNode::User(message.content.clone()),
            MessageRole::Assistant => PromptNode::Assistant(message.content.clone()),
        });
    }
    ast.push(PromptNode::User(current.to_string()))
}
