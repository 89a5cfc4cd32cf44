//! 会话存储抽象

use async_trait::async_trait;

use mc_assess::AssessmentReport;
use mc_core::{Result, SessionId};

use crate::record::{MessageRecord, SessionRecord};

/// 会话存储
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// 创建会话
    async fn create_session(&self, record: &SessionRecord) -> Result<()>;

    /// 查询会话
    async fn get_session(&self, id: SessionId) -> Result<Option<SessionRecord>>;

    /// 更新会话进度，会话不存在时返回 `SessionNotFound`
    async fn update_session(&self, record: &SessionRecord) -> Result<()>;

    /// 追加消息，会话不存在时返回 `SessionNotFound`
    async fn append_message(&self, message: &MessageRecord) -> Result<()>;

    /// 原子地记录一轮问答：更新会话进度并追加用户与助手消息
    ///
    /// 三项写入要么全部生效，要么全部不生效；会话不存在时返回 `SessionNotFound`。
    async fn record_turn(
        &self,
        session: &SessionRecord,
        user: &MessageRecord,
        assistant: &MessageRecord,
    ) -> Result<()>;

    /// 按写入顺序列出会话消息
    async fn list_messages(&self, session_id: SessionId) -> Result<Vec<MessageRecord>>;

    /// 保存 (覆盖) 评估报告
    async fn save_report(&self, report: &AssessmentReport) -> Result<()>;

    /// 查询评估报告
    async fn get_report(&self, session_id: SessionId) -> Result<Option<AssessmentReport>>;

    /// 学生的全部会话，最新的在前
    async fn list_sessions_for_student(&self, student_id: &str) -> Result<Vec<SessionRecord>>;
}
