//! 咨询事件定义 (用于审计日志与预警订阅)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entity::SessionId;

/// 咨询事件
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CounselEvent {
    /// 事件唯一标识
    pub id: Uuid,
    /// 事件类型
    pub kind: CounselEventKind,
    /// 关联会话
    pub session_id: SessionId,
    /// 事件时间戳
    pub timestamp: DateTime<Utc>,
    /// 事件载荷 (JSON)
    pub payload: serde_json::Value,
}

impl CounselEvent {
    /// 创建新事件
    pub fn new(kind: CounselEventKind, session_id: SessionId, payload: serde_json::Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            session_id,
            timestamp: Utc::now(),
            payload,
        }
    }
}

/// 事件类型枚举
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum CounselEventKind {
    SessionStarted,
    MessageAssessed,
    AssessmentCompleted,
    CrisisEscalated,

    // 协作者降级
    LlmFallback,
    SentimentUnavailable,

    Custom(String),
}

impl CounselEventKind {
    /// 获取事件类型名称
    pub fn as_str(&self) -> &str {
        match self {
            CounselEventKind::SessionStarted => "session_started",
            CounselEventKind::MessageAssessed => "message_assessed",
            CounselEventKind::AssessmentCompleted => "assessment_completed",
            CounselEventKind::CrisisEscalated => "crisis_escalated",
            CounselEventKind::LlmFallback => "llm_fallback",
            CounselEventKind::SentimentUnavailable => "sentiment_unavailable",
            CounselEventKind::Custom(name) => name,
        }
    }
}
