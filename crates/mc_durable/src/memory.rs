//! 内存会话存储

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use mc_assess::AssessmentReport;
use mc_core::{MindCareError, Result, SessionId};

use crate::record::{MessageRecord, SessionRecord};
use crate::store::SessionStore;

/// 内存会话存储 (进程退出即丢失)
#[derive(Clone, Default)]
pub struct MemorySessionStore {
    sessions: Arc<RwLock<HashMap<SessionId, SessionRecord>>>,
    messages: Arc<RwLock<HashMap<SessionId, Vec<MessageRecord>>>>,
    reports: Arc<RwLock<HashMap<SessionId, AssessmentReport>>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 会话数量
    pub async fn count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn create_session(&self, record: &SessionRecord) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        if sessions.contains_key(&record.id) {
            return Err(MindCareError::Database(format!(
                "session already exists: {}",
                record.id
            )));
        }
        sessions.insert(record.id, record.clone());
        Ok(())
    }

    async fn get_session(&self, id: SessionId) -> Result<Option<SessionRecord>> {
        Ok(self.sessions.read().await.get(&id).cloned())
    }

    async fn update_session(&self, record: &SessionRecord) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        match sessions.get_mut(&record.id) {
            Some(existing) => {
                *existing = record.clone();
                Ok(())
            }
            None => Err(MindCareError::SessionNotFound(record.id.to_string())),
        }
    }

    async fn append_message(&self, message: &MessageRecord) -> Result<()> {
        if !self.sessions.read().await.contains_key(&message.session_id) {
            return Err(MindCareError::SessionNotFound(message.session_id.to_string()));
        }
        self.messages
            .write()
            .await
            .entry(message.session_id)
            .or_default()
            .push(message.clone());
        Ok(())
    }

    async fn record_turn(
        &self,
        session: &SessionRecord,
        user: &MessageRecord,
        assistant: &MessageRecord,
    ) -> Result<()> {
        // 固定加锁顺序：sessions -> messages
        let mut sessions = self.sessions.write().await;
        let mut messages = self.messages.write().await;
        let Some(existing) = sessions.get_mut(&session.id) else {
            return Err(MindCareError::SessionNotFound(session.id.to_string()));
        };
        *existing = session.clone();
        let log = messages.entry(session.id).or_default();
        log.push(user.clone());
        log.push(assistant.clone());
        Ok(())
    }

    async fn list_messages(&self, session_id: SessionId) -> Result<Vec<MessageRecord>> {
        Ok(self
            .messages
            .read()
            .await
            .get(&session_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn save_report(&self, report: &AssessmentReport) -> Result<()> {
        self.reports
            .write()
            .await
            .insert(report.session_id, report.clone());
        Ok(())
    }

    async fn get_report(&self, session_id: SessionId) -> Result<Option<AssessmentReport>> {
        Ok(self.reports.read().await.get(&session_id).cloned())
    }

    async fn list_sessions_for_student(&self, student_id: &str) -> Result<Vec<SessionRecord>> {
        let mut sessions: Vec<SessionRecord> = self
            .sessions
            .read()
            .await
            .values()
            .filter(|s| s.student_id == student_id)
            .cloned()
            .collect();
        sessions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(sessions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mc_assess::{DialogueState, EmotionLabel, RiskLevel, TurnSignal};

    #[test]
    fn test_session_lifecycle() {
        tokio_test::block_on(async {
            let store = MemorySessionStore::new();
            let mut session = SessionRecord::new("2021001");
            store.create_session(&session).await.unwrap();
            assert!(store.create_session(&session).await.is_err());

            session.advance_to(3, DialogueState::Active);
            store.update_session(&session).await.unwrap();

            let loaded = store.get_session(session.id).await.unwrap().unwrap();
            assert_eq!(loaded.turn, 3);
            assert_eq!(store.count().await, 1);
        });
    }

    #[test]
    fn test_messages_require_session() {
        tokio_test::block_on(async {
            let store = MemorySessionStore::new();
            let orphan = MessageRecord::assistant(uuid::Uuid::new_v4(), "hello");
            let err = store.append_message(&orphan).await.unwrap_err();
            assert!(matches!(err, MindCareError::SessionNotFound(_)));
        });
    }

    #[test]
    fn test_messages_keep_order() {
        tokio_test::block_on(async {
            let store = MemorySessionStore::new();
            let session = SessionRecord::new("2021001");
            store.create_session(&session).await.unwrap();

            store
                .append_message(&MessageRecord::assistant(session.id, "你好"))
                .await
                .unwrap();
            store
                .append_message(&MessageRecord::user(
                    session.id,
                    "有点累",
                    TurnSignal::new(EmotionLabel::Stressed, RiskLevel::Low, None),
                ))
                .await
                .unwrap();

            let messages = store.list_messages(session.id).await.unwrap();
            assert_eq!(messages.len(), 2);
            assert_eq!(messages[1].content, "有点累");
        });
    }

    #[test]
    fn test_record_turn_writes_all_or_nothing() {
        tokio_test::block_on(async {
            let store = MemorySessionStore::new();
            let mut session = SessionRecord::new("2021001");
            let user = MessageRecord::user(
                session.id,
                "有点累",
                TurnSignal::new(EmotionLabel::Stressed, RiskLevel::Low, None),
            );
            let assistant = MessageRecord::assistant(session.id, "辛苦了");

            let err = store.record_turn(&session, &user, &assistant).await.unwrap_err();
            assert!(matches!(err, MindCareError::SessionNotFound(_)));
            assert!(store.list_messages(session.id).await.unwrap().is_empty());

            store.create_session(&session).await.unwrap();
            session.advance_to(1, DialogueState::Active);
            store.record_turn(&session, &user, &assistant).await.unwrap();

            assert_eq!(store.get_session(session.id).await.unwrap().unwrap().turn, 1);
            assert_eq!(store.list_messages(session.id).await.unwrap().len(), 2);
        });
    }

    #[test]
    fn test_update_missing_session() {
        tokio_test::block_on(async {
            let store = MemorySessionStore::new();
            let session = SessionRecord::new("2021001");
            let err = store.update_session(&session).await.unwrap_err();
            assert!(matches!(err, MindCareError::SessionNotFound(_)));
        });
    }
}
