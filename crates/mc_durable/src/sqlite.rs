//! SQLite 会话存储

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::{
    Sqlite, SqliteArguments, SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow,
};
use sqlx::Row;
use uuid::Uuid;

use mc_assess::{AssessmentReport, DialogueState, EmotionLabel, RiskLevel};
use mc_core::{MindCareError, Polarity, Result, Sentiment, SessionId};

use crate::record::{MessageRecord, MessageRole, SessionRecord};
use crate::store::SessionStore;

/// 存储配置
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// 数据库 URL
    pub database_url: String,
    /// 连接池大小
    pub max_connections: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite://mindcare.db".to_string(),
            max_connections: 5,
        }
    }
}

const MIGRATIONS: &[&str] = &[
    r#"CREATE TABLE IF NOT EXISTS counsel_sessions (
        id          TEXT PRIMARY KEY,
        student_id  TEXT NOT NULL,
        state       TEXT NOT NULL,
        turn        INTEGER NOT NULL DEFAULT 0,
        created_at  TEXT NOT NULL,
        updated_at  TEXT NOT NULL
    )"#,
    r#"CREATE INDEX IF NOT EXISTS idx_counsel_sessions_student
        ON counsel_sessions (student_id, created_at)"#,
    r#"CREATE TABLE IF NOT EXISTS counsel_messages (
        id                   TEXT PRIMARY KEY,
        session_id           TEXT NOT NULL REFERENCES counsel_sessions(id) ON DELETE CASCADE,
        role                 TEXT NOT NULL,
        content              TEXT NOT NULL,
        emotion              TEXT,
        risk_level           TEXT,
        sentiment_polarity   TEXT,
        sentiment_confidence REAL,
        created_at           TEXT NOT NULL
    )"#,
    r#"CREATE INDEX IF NOT EXISTS idx_counsel_messages_session
        ON counsel_messages (session_id)"#,
    r#"CREATE TABLE IF NOT EXISTS assessment_reports (
        session_id  TEXT PRIMARY KEY REFERENCES counsel_sessions(id) ON DELETE CASCADE,
        risk_level  TEXT NOT NULL,
        risk_score  REAL NOT NULL,
        report_json TEXT NOT NULL,
        created_at  TEXT NOT NULL
    )"#,
];

fn db_err(e: sqlx::Error) -> MindCareError {
    MindCareError::Database(e.to_string())
}

fn corrupt(column: &str, value: &str) -> MindCareError {
    MindCareError::Database(format!("invalid {column} value in database: {value}"))
}

/// 固定宽度的 UTC 时间文本，保证按字符串排序即按时间排序
fn ts(t: &DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_time(column: &str, value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|_| corrupt(column, value))
}

fn parse_uuid(column: &str, value: &str) -> Result<Uuid> {
    Uuid::parse_str(value).map_err(|_| corrupt(column, value))
}

type SqliteQuery<'q> = sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>>;

fn update_session(record: &SessionRecord) -> SqliteQuery<'_> {
    sqlx::query("UPDATE counsel_sessions SET state = ?, turn = ?, updated_at = ? WHERE id = ?")
        .bind(record.state.as_str())
        .bind(i64::from(record.turn))
        .bind(ts(&record.updated_at))
        .bind(record.id.to_string())
}

fn insert_message(message: &MessageRecord) -> SqliteQuery<'_> {
    sqlx::query(
        "INSERT INTO counsel_messages
            (id, session_id, role, content, emotion, risk_level,
             sentiment_polarity, sentiment_confidence, created_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(message.id.to_string())
    .bind(message.session_id.to_string())
    .bind(message.role.as_str())
    .bind(&message.content)
    .bind(message.emotion.map(|e| e.as_str()))
    .bind(message.risk.map(|r| r.as_str()))
    .bind(message.sentiment.map(|s| s.polarity.as_str()))
    .bind(message.sentiment.map(|s| f64::from(s.confidence)))
    .bind(ts(&message.created_at))
}

/// 外键失败说明会话不存在
fn insert_err(e: sqlx::Error, session_id: SessionId) -> MindCareError {
    match e.as_database_error() {
        Some(db) if matches!(db.kind(), sqlx::error::ErrorKind::ForeignKeyViolation) => {
            MindCareError::SessionNotFound(session_id.to_string())
        }
        _ => db_err(e),
    }
}

/// SQLite 会话存储
#[derive(Clone)]
pub struct SqliteSessionStore {
    pool: SqlitePool,
}

impl SqliteSessionStore {
    /// 连接数据库并执行迁移
    pub async fn connect(config: &StoreConfig) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(&config.database_url)
            .map_err(db_err)?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(options)
            .await
            .map_err(db_err)?;

        let store = Self { pool };
        store.migrate().await?;
        tracing::info!(url = %config.database_url, "sqlite session store ready");
        Ok(store)
    }

    /// 单连接内存数据库 (测试用)
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(db_err)?
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(db_err)?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    /// 建表
    pub async fn migrate(&self) -> Result<()> {
        for statement in MIGRATIONS {
            sqlx::query(*statement)
                .execute(&self.pool)
                .await
                .map_err(db_err)?;
        }
        Ok(())
    }

    fn session_from_row(row: &SqliteRow) -> Result<SessionRecord> {
        let id: String = row.try_get("id").map_err(db_err)?;
        let state: String = row.try_get("state").map_err(db_err)?;
        let turn: i64 = row.try_get("turn").map_err(db_err)?;
        let created_at: String = row.try_get("created_at").map_err(db_err)?;
        let updated_at: String = row.try_get("updated_at").map_err(db_err)?;

        Ok(SessionRecord {
            id: parse_uuid("id", &id)?,
            student_id: row.try_get("student_id").map_err(db_err)?,
            state: DialogueState::parse(&state).ok_or_else(|| corrupt("state", &state))?,
            turn: u32::try_from(turn).map_err(|_| corrupt("turn", &turn.to_string()))?,
            created_at: parse_time("created_at", &created_at)?,
            updated_at: parse_time("updated_at", &updated_at)?,
        })
    }

    fn message_from_row(row: &SqliteRow) -> Result<MessageRecord> {
        let id: String = row.try_get("id").map_err(db_err)?;
        let session_id: String = row.try_get("session_id").map_err(db_err)?;
        let role: String = row.try_get("role").map_err(db_err)?;
        let emotion: Option<String> = row.try_get("emotion").map_err(db_err)?;
        let risk: Option<String> = row.try_get("risk_level").map_err(db_err)?;
        let polarity: Option<String> = row.try_get("sentiment_polarity").map_err(db_err)?;
        let confidence: Option<f64> = row.try_get("sentiment_confidence").map_err(db_err)?;
        let created_at: String = row.try_get("created_at").map_err(db_err)?;

        let emotion = emotion
            .map(|v| EmotionLabel::parse(&v).ok_or_else(|| corrupt("emotion", &v)))
            .transpose()?;
        let risk = risk
            .map(|v| RiskLevel::parse(&v).ok_or_else(|| corrupt("risk_level", &v)))
            .transpose()?;
        let sentiment = match (polarity, confidence) {
            (Some(p), Some(c)) => {
                let polarity =
                    Polarity::from_label(&p).ok_or_else(|| corrupt("sentiment_polarity", &p))?;
                Some(Sentiment::new(polarity, c as f32))
            }
            _ => None,
        };

        Ok(MessageRecord {
            id: parse_uuid("id", &id)?,
            session_id: parse_uuid("session_id", &session_id)?,
            role: MessageRole::parse(&role).ok_or_else(|| corrupt("role", &role))?,
            content: row.try_get("content").map_err(db_err)?,
            emotion,
            risk,
            sentiment,
            created_at: parse_time("created_at", &created_at)?,
        })
    }
}

#[async_trait]
impl SessionStore for SqliteSessionStore {
    async fn create_session(&self, record: &SessionRecord) -> Result<()> {
        sqlx::query(
            "INSERT INTO counsel_sessions (id, student_id, state, turn, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(record.id.to_string())
        .bind(&record.student_id)
        .bind(record.state.as_str())
        .bind(i64::from(record.turn))
        .bind(ts(&record.created_at))
        .bind(ts(&record.updated_at))
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn get_session(&self, id: SessionId) -> Result<Option<SessionRecord>> {
        let row = sqlx::query("SELECT * FROM counsel_sessions WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        row.as_ref().map(Self::session_from_row).transpose()
    }

    async fn update_session(&self, record: &SessionRecord) -> Result<()> {
        let result = update_session(record)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

        if result.rows_affected() == 0 {
            return Err(MindCareError::SessionNotFound(record.id.to_string()));
        }
        Ok(())
    }

    async fn append_message(&self, message: &MessageRecord) -> Result<()> {
        insert_message(message)
            .execute(&self.pool)
            .await
            .map_err(|e| insert_err(e, message.session_id))?;
        Ok(())
    }

    async fn record_turn(
        &self,
        session: &SessionRecord,
        user: &MessageRecord,
        assistant: &MessageRecord,
    ) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        let result = update_session(session)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        if result.rows_affected() == 0 {
            return Err(MindCareError::SessionNotFound(session.id.to_string()));
        }
        for message in [user, assistant] {
            insert_message(message)
                .execute(&mut *tx)
                .await
                .map_err(|e| insert_err(e, message.session_id))?;
        }

        tx.commit().await.map_err(db_err)?;
        Ok(())
    }

    async fn list_messages(&self, session_id: SessionId) -> Result<Vec<MessageRecord>> {
        let rows = sqlx::query("SELECT * FROM counsel_messages WHERE session_id = ? ORDER BY rowid")
            .bind(session_id.to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        rows.iter().map(Self::message_from_row).collect()
    }

    async fn save_report(&self, report: &AssessmentReport) -> Result<()> {
        let json = serde_json::to_string(report)?;
        sqlx::query(
            "INSERT INTO assessment_reports (session_id, risk_level, risk_score, report_json, created_at)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT(session_id) DO UPDATE SET
                risk_level = excluded.risk_level,
                risk_score = excluded.risk_score,
                report_json = excluded.report_json,
                created_at = excluded.created_at",
        )
        .bind(report.session_id.to_string())
        .bind(report.risk.level.as_str())
        .bind(f64::from(report.risk.score))
        .bind(json)
        .bind(ts(&report.generated_at))
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn get_report(&self, session_id: SessionId) -> Result<Option<AssessmentReport>> {
        let row = sqlx::query("SELECT report_json FROM assessment_reports WHERE session_id = ?")
            .bind(session_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;

        match row {
            Some(row) => {
                let json: String = row.try_get("report_json").map_err(db_err)?;
                Ok(Some(serde_json::from_str(&json)?))
            }
            None => Ok(None),
        }
    }

    async fn list_sessions_for_student(&self, student_id: &str) -> Result<Vec<SessionRecord>> {
        let rows = sqlx::query(
            "SELECT * FROM counsel_sessions WHERE student_id = ? ORDER BY created_at DESC, rowid DESC",
        )
        .bind(student_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        rows.iter().map(Self::session_from_row).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mc_assess::TurnSignal;

    #[tokio::test]
    async fn test_session_round_trip() {
        let store = SqliteSessionStore::in_memory().await.unwrap();
        let mut session = SessionRecord::new("2021001");
        store.create_session(&session).await.unwrap();

        session.advance_to(6, DialogueState::Completed);
        store.update_session(&session).await.unwrap();

        let loaded = store.get_session(session.id).await.unwrap().unwrap();
        assert_eq!(loaded.state, DialogueState::Completed);
        assert_eq!(loaded.turn, 6);
        assert_eq!(loaded.student_id, "2021001");
        assert!(store.get_session(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_missing_session() {
        let store = SqliteSessionStore::in_memory().await.unwrap();
        let err = store
            .update_session(&SessionRecord::new("x"))
            .await
            .unwrap_err();
        assert!(matches!(err, MindCareError::SessionNotFound(_)));
    }

    #[tokio::test]
    async fn test_messages_preserve_assessment() {
        let store = SqliteSessionStore::in_memory().await.unwrap();
        let session = SessionRecord::new("2021001");
        store.create_session(&session).await.unwrap();

        let signal = TurnSignal::new(
            EmotionLabel::Anxious,
            RiskLevel::Medium,
            Some(Sentiment::new(Polarity::Negative, 0.5)),
        );
        store
            .append_message(&MessageRecord::assistant(session.id, "你好"))
            .await
            .unwrap();
        store
            .append_message(&MessageRecord::user(session.id, "考试好焦虑", signal))
            .await
            .unwrap();

        let messages = store.list_messages(session.id).await.unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, MessageRole::Assistant);
        assert_eq!(messages[1].signal(), Some(signal));
    }

    #[tokio::test]
    async fn test_record_turn_is_atomic() {
        let store = SqliteSessionStore::in_memory().await.unwrap();
        let mut session = SessionRecord::new("2021001");
        let signal = TurnSignal::new(EmotionLabel::Sad, RiskLevel::Medium, None);

        // 会话尚未创建：整轮回滚，不留下任何消息
        let user = MessageRecord::user(session.id, "好难过", signal);
        let assistant = MessageRecord::assistant(session.id, "我在听");
        let err = store
            .record_turn(&session, &user, &assistant)
            .await
            .unwrap_err();
        assert!(matches!(err, MindCareError::SessionNotFound(_)));

        store.create_session(&session).await.unwrap();
        assert!(store.list_messages(session.id).await.unwrap().is_empty());

        // 同一 id 的消息重复写入会失败，会话进度也不应推进
        session.advance_to(1, DialogueState::Active);
        store.record_turn(&session, &user, &assistant).await.unwrap();
        session.advance_to(2, DialogueState::Active);
        assert!(store.record_turn(&session, &user, &assistant).await.is_err());

        let loaded = store.get_session(session.id).await.unwrap().unwrap();
        assert_eq!(loaded.turn, 1);
        assert_eq!(store.list_messages(session.id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_orphan_message_is_session_not_found() {
        let store = SqliteSessionStore::in_memory().await.unwrap();
        let err = store
            .append_message(&MessageRecord::assistant(Uuid::new_v4(), "hi"))
            .await
            .unwrap_err();
        assert!(matches!(err, MindCareError::SessionNotFound(_)));
    }

    #[tokio::test]
    async fn test_report_upsert() {
        let store = SqliteSessionStore::in_memory().await.unwrap();
        let session = SessionRecord::new("2021001");
        store.create_session(&session).await.unwrap();

        let low = AssessmentReport::build(
            session.id,
            &[TurnSignal::new(EmotionLabel::Neutral, RiskLevel::Low, None)],
        );
        store.save_report(&low).await.unwrap();

        let high = AssessmentReport::build(
            session.id,
            &[TurnSignal::new(EmotionLabel::Hopeless, RiskLevel::High, None)],
        );
        store.save_report(&high).await.unwrap();

        let loaded = store.get_report(session.id).await.unwrap().unwrap();
        assert_eq!(loaded.risk.level, RiskLevel::High);
        assert_eq!(loaded.dominant_emotion, EmotionLabel::Hopeless);
    }

    #[tokio::test]
    async fn test_sessions_for_student_newest_first() {
        let store = SqliteSessionStore::in_memory().await.unwrap();
        let mut older = SessionRecord::new("2021001");
        older.created_at = older.created_at - chrono::Duration::hours(1);
        let newer = SessionRecord::new("2021001");
        store.create_session(&older).await.unwrap();
        store.create_session(&newer).await.unwrap();
        store.create_session(&SessionRecord::new("other")).await.unwrap();

        let sessions = store.list_sessions_for_student("2021001").await.unwrap();
        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions[0].id, newer.id);
    }
}
