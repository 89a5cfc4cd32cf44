//! 核心实体标识

use uuid::Uuid;

/// 咨询会话 ID
pub type SessionId = Uuid;

/// 学生标识 (由外部用户系统签发，核心层不解析其结构)
pub type StudentId = String;

/// 结果页路径
pub fn result_path(session_id: SessionId) -> String {
    format!("/counsel/result/{session_id}")
}
