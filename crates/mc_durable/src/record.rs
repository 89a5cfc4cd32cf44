//! 存储记录定义

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use mc_assess::{DialogueState, EmotionLabel, RiskLevel, TurnSignal};
use mc_core::{Sentiment, SessionId, StudentId};

/// 咨询会话记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: SessionId,
    pub student_id: StudentId,
    pub state: DialogueState,
    /// 已完成的用户轮数
    pub turn: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SessionRecord {
    /// 创建新会话
    pub fn new(student_id: impl Into<StudentId>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            student_id: student_id.into(),
            state: DialogueState::Active,
            turn: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// 更新对话进度
    pub fn advance_to(&mut self, turn: u32, state: DialogueState) {
        self.turn = turn;
        self.state = state;
        self.updated_at = Utc::now();
    }
}

/// 消息角色
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    User,
    Assistant,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "user" => Some(MessageRole::User),
            "assistant" => Some(MessageRole::Assistant),
            _ => None,
        }
    }
}

/// 消息记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageRecord {
    pub id: Uuid,
    pub session_id: SessionId,
    pub role: MessageRole,
    pub content: String,
    /// 仅用户消息携带评估结果
    pub emotion: Option<EmotionLabel>,
    pub risk: Option<RiskLevel>,
    pub sentiment: Option<Sentiment>,
    pub created_at: DateTime<Utc>,
}

impl MessageRecord {
    /// 已评估的用户消息
    pub fn user(session_id: SessionId, content: impl Into<String>, signal: TurnSignal) -> Self {
        Self {
            id: Uuid::new_v4(),
            session_id,
            role: MessageRole::User,
            content: content.into(),
            emotion: Some(signal.emotion),
            risk: Some(signal.risk),
            sentiment: signal.sentiment,
            created_at: Utc::now(),
        }
    }

    /// 助手回复
    pub fn assistant(session_id: SessionId, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            session_id,
            role: MessageRole::Assistant,
            content: content.into(),
            emotion: None,
            risk: None,
            sentiment: None,
            created_at: Utc::now(),
        }
    }

    /// 用户消息的评估信号
    pub fn signal(&self) -> Option<TurnSignal> {
        match (self.role, self.emotion, self.risk) {
            (MessageRole::User, Some(emotion), Some(risk)) => {
                Some(TurnSignal::new(emotion, risk, self.sentiment))
            }
            _ => None,
        }
    }
}

/// 从消息历史中提取全部评估信号
pub fn signals(messages: &[MessageRecord]) -> Vec<TurnSignal> {
    messages.iter().filter_map(MessageRecord::signal).collect()
}
