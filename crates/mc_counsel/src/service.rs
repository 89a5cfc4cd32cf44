//! 咨询服务
//!
//! 单条用户消息的处理流程：
//! 1. 校验输入并加载会话
//! 2. 情感模型打分 (失败时退化为无模型信号)
//! 3. 情绪映射与单条风险分级
//! 4. 推进六轮评估状态机
//! 5. 生成回复 (危机固定回复 / LLM / 兜底回复)
//! 6. 持久化，评估结束时生成报告
//! 7. 高风险时推送预警

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, Mutex};

use mc_assess::{
    assess_risk_level_simple, intelligent_emotion_mapping, AssessmentDialogue, AssessmentReport,
    DialogueConfig, DialogueState, EmotionLabel, RiskLevel, TurnOutcome, TurnSignal,
};
use mc_core::entity::result_path;
use mc_core::{CounselEvent, CounselEventKind, MindCareError, Result, Sentiment, SessionId};
use mc_durable::record::signals;
use mc_durable::{MessageRecord, SessionRecord, SessionStore};
use mc_llm::{SentimentAnalyzer, TextGenerator};

use crate::alert::{AlertBus, CrisisAlert};
use crate::reply;

/// 咨询服务配置
#[derive(Debug, Clone)]
pub struct CounselConfig {
    pub dialogue: DialogueConfig,
    /// 单条消息最大字符数
    pub max_message_chars: usize,
    /// 预警 / 事件队列容量
    pub alert_capacity: usize,
}

impl Default for CounselConfig {
    fn default() -> Self {
        Self {
            dialogue: DialogueConfig::default(),
            max_message_chars: 2000,
            alert_capacity: 256,
        }
    }
}

/// 新建会话的结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStart {
    pub session: SessionRecord,
    pub greeting: String,
}

/// 单轮回复
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CounselReply {
    pub session_id: SessionId,
    pub reply: String,
    pub emotion: EmotionLabel,
    pub risk: RiskLevel,
    pub turn: u32,
    pub remaining_turns: u32,
    pub state: DialogueState,
    /// 评估结束后跳转的结果页
    pub redirect: Option<String>,
}

/// 咨询服务
pub struct CounselingService {
    store: Arc<dyn SessionStore>,
    sentiment: Option<Arc<dyn SentimentAnalyzer>>,
    generator: Option<Arc<dyn TextGenerator>>,
    config: CounselConfig,
    alerts: AlertBus<CrisisAlert>,
    events: AlertBus<CounselEvent>,
    /// 同一会话的消息串行处理
    session_locks: Mutex<HashMap<SessionId, Arc<Mutex<()>>>>,
}

impl CounselingService {
    pub fn new(store: Arc<dyn SessionStore>, config: CounselConfig) -> Self {
        Self {
            store,
            sentiment: None,
            generator: None,
            alerts: AlertBus::new(config.alert_capacity),
            events: AlertBus::new(config.alert_capacity),
            config,
            session_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_sentiment(mut self, analyzer: Arc<dyn SentimentAnalyzer>) -> Self {
        self.sentiment = Some(analyzer);
        self
    }

    pub fn with_generator(mut self, generator: Arc<dyn TextGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }

    pub fn config(&self) -> &CounselConfig {
        &self.config
    }

    /// 订阅危机预警
    pub fn subscribe_alerts(&self) -> broadcast::Receiver<CrisisAlert> {
        self.alerts.subscribe()
    }

    /// 订阅咨询事件
    pub fn subscribe_events(&self) -> broadcast::Receiver<CounselEvent> {
        self.events.subscribe()
    }

    /// 开始一次评估会话
    pub async fn start_session(&self, student_id: &str) -> Result<SessionStart> {
        let student_id = student_id.trim();
        if student_id.is_empty() {
            return Err(MindCareError::InvalidInput("student_id is required".to_string()));
        }

        let session = SessionRecord::new(student_id);
        self.store.create_session(&session).await?;

        let greeting = reply::greeting(self.config.dialogue.max_turns);
        self.store
            .append_message(&MessageRecord::assistant(session.id, &greeting))
            .await?;

        tracing::info!(session_id = %session.id, "counsel session started");
        self.emit(CounselEventKind::SessionStarted, session.id, serde_json::json!({}));

        Ok(SessionStart { session, greeting })
    }

    /// 处理一条用户消息
    pub async fn send_message(&self, session_id: SessionId, text: &str) -> Result<CounselReply> {
        let text = self.validate_message(text)?;

        let lock = self.session_lock(session_id).await;
        let result = {
            let _guard = lock.lock().await;
            self.process_message(session_id, text).await
        };
        drop(lock);
        self.release_session_lock(session_id).await;
        result
    }

    async fn process_message(&self, session_id: SessionId, text: &str) -> Result<CounselReply> {
        let mut session = self
            .store
            .get_session(session_id)
            .await?
            .ok_or_else(|| MindCareError::SessionNotFound(session_id.to_string()))?;

        if session.state.is_closed() {
            return Err(MindCareError::SessionClosed(session_id.to_string()));
        }
        let mut dialogue =
            AssessmentDialogue::resume(self.config.dialogue.clone(), session.turn, session.state);

        let (sentiment, history) = futures::join!(
            self.analyze_sentiment(session_id, text),
            self.store.list_messages(session_id)
        );
        let history = history?;

        let emotion = intelligent_emotion_mapping(text, sentiment);
        let risk = assess_risk_level_simple(text);
        let signal = TurnSignal::new(emotion, risk, sentiment);
        let outcome = dialogue.advance(text, risk)?;

        tracing::info!(
            session_id = %session_id,
            turn = dialogue.turn(),
            emotion = emotion.as_str(),
            risk = risk.as_str(),
            chars = text.chars().count(),
            "message assessed"
        );

        let reply_text = self
            .compose_reply(session_id, &history, text, emotion, risk, &dialogue, outcome)
            .await;

        session.advance_to(dialogue.turn(), dialogue.state());
        self.store
            .record_turn(
                &session,
                &MessageRecord::user(session_id, text, signal),
                &MessageRecord::assistant(session_id, &reply_text),
            )
            .await?;

        self.emit(
            CounselEventKind::MessageAssessed,
            session_id,
            serde_json::json!({
                "turn": dialogue.turn(),
                "emotion": emotion,
                "risk": risk,
            }),
        );

        if risk.needs_counselor() {
            self.raise_alert(&session, emotion, risk);
        }

        let redirect = if outcome.ends_assessment() {
            let mut all_signals = signals(&history);
            all_signals.push(signal);
            self.finalize(&session, outcome, &all_signals).await?;
            Some(result_path(session_id))
        } else {
            None
        };

        Ok(CounselReply {
            session_id,
            reply: reply_text,
            emotion,
            risk,
            turn: dialogue.turn(),
            remaining_turns: dialogue.remaining(),
            state: dialogue.state(),
            redirect,
        })
    }

    /// 查询评估报告
    ///
    /// 已结束但尚无报告的会话会即时生成并保存；进行中的会话返回 `InvalidInput`。
    pub async fn get_report(&self, session_id: SessionId) -> Result<AssessmentReport> {
        let session = self
            .store
            .get_session(session_id)
            .await?
            .ok_or_else(|| MindCareError::SessionNotFound(session_id.to_string()))?;

        if let Some(report) = self.store.get_report(session_id).await? {
            return Ok(report);
        }

        if !session.state.is_closed() {
            return Err(MindCareError::InvalidInput(format!(
                "assessment still in progress ({}/{} turns)",
                session.turn, self.config.dialogue.max_turns
            )));
        }

        let messages = self.store.list_messages(session_id).await?;
        let report = AssessmentReport::build(session_id, &signals(&messages));
        self.store.save_report(&report).await?;
        Ok(report)
    }

    /// 会话消息历史
    pub async fn history(&self, session_id: SessionId) -> Result<Vec<MessageRecord>> {
        if self.store.get_session(session_id).await?.is_none() {
            return Err(MindCareError::SessionNotFound(session_id.to_string()));
        }
        self.store.list_messages(session_id).await
    }

    /// 学生的全部会话
    pub async fn sessions_for_student(&self, student_id: &str) -> Result<Vec<SessionRecord>> {
        self.store.list_sessions_for_student(student_id.trim()).await
    }

    fn validate_message<'a>(&self, text: &'a str) -> Result<&'a str> {
        let text = text.trim();
        if text.is_empty() {
            return Err(MindCareError::InvalidInput("message is empty".to_string()));
        }
        let chars = text.chars().count();
        if chars > self.config.max_message_chars {
            return Err(MindCareError::InvalidInput(format!(
                "message too long: {chars} > {} chars",
                self.config.max_message_chars
            )));
        }
        Ok(text)
    }

    async fn session_lock(&self, session_id: SessionId) -> Arc<Mutex<()>> {
        self.session_locks
            .lock()
            .await
            .entry(session_id)
            .or_default()
            .clone()
    }

    /// 没有其他请求持有或等待时移除会话锁
    async fn release_session_lock(&self, session_id: SessionId) {
        let mut locks = self.session_locks.lock().await;
        if locks
            .get(&session_id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(&session_id);
        }
    }

    /// 情感模型打分，失败时返回 `None`
    async fn analyze_sentiment(&self, session_id: SessionId, text: &str) -> Option<Sentiment> {
        let analyzer = self.sentiment.as_ref()?;
        match analyzer.analyze(text).await {
            Ok(sentiment) => Some(sentiment),
            Err(e) => {
                tracing::warn!(session_id = %session_id, error = %e, "sentiment model unavailable");
                self.emit(
                    CounselEventKind::SentimentUnavailable,
                    session_id,
                    serde_json::json!({ "error": e.to_string() }),
                );
                None
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn compose_reply(
        &self,
        session_id: SessionId,
        history: &[MessageRecord],
        text: &str,
        emotion: EmotionLabel,
        risk: RiskLevel,
        dialogue: &AssessmentDialogue,
        outcome: TurnOutcome,
    ) -> String {
        let completes = matches!(outcome, TurnOutcome::Complete);
        match outcome {
            TurnOutcome::Escalate => return reply::crisis_reply(),
            TurnOutcome::Continue { .. } | TurnOutcome::Complete => {}
        }

        let generated = match &self.generator {
            Some(generator) => {
                let system = reply::system_prompt(
                    emotion,
                    risk,
                    dialogue.turn(),
                    self.config.dialogue.max_turns,
                    completes,
                );
                let ast = reply::build_prompt(system, history, text);
                match generator.generate(&ast).await {
                    Ok(text) => Some(text),
                    Err(e) => {
                        tracing::warn!(session_id = %session_id, error = %e, "text generation failed, using fallback reply");
                        self.emit(
                            CounselEventKind::LlmFallback,
                            session_id,
                            serde_json::json!({ "error": e.to_string() }),
                        );
                        None
                    }
                }
            }
            None => None,
        };

        match generated {
            Some(text) if completes => format!("{text}\n\n{}", reply::CLOSING_NOTICE),
            Some(text) => text,
            None => reply::fallback_reply(emotion, dialogue.turn(), completes),
        }
    }

    async fn finalize(
        &self,
        session: &SessionRecord,
        outcome: TurnOutcome,
        all_signals: &[TurnSignal],
    ) -> Result<()> {
        let report = AssessmentReport::build(session.id, all_signals);
        self.store.save_report(&report).await?;

        let kind = match outcome {
            TurnOutcome::Escalate => CounselEventKind::CrisisEscalated,
            _ => CounselEventKind::AssessmentCompleted,
        };
        tracing::info!(
            session_id = %session.id,
            level = report.risk.level.as_str(),
            score = report.risk.score,
            "assessment finished"
        );
        self.emit(
            kind,
            session.id,
            serde_json::json!({
                "level": report.risk.level,
                "score": report.risk.score,
                "dominant_emotion": report.dominant_emotion,
            }),
        );
        Ok(())
    }

    fn raise_alert(&self, session: &SessionRecord, emotion: EmotionLabel, risk: RiskLevel) {
        tracing::warn!(
            session_id = %session.id,
            risk = risk.as_str(),
            "high risk message, notifying counselors"
        );
        self.alerts.publish(CrisisAlert {
            session_id: session.id,
            student_id: session.student_id.clone(),
            risk,
            emotion,
            turn: session.turn,
            created_at: Utc::now(),
        });
    }

    fn emit(&self, kind: CounselEventKind, session_id: SessionId, payload: serde_json::Value) {
        tracing::debug!(session_id = %session_id, event = kind.as_str(), "counsel event");
        self.events.publish(CounselEvent::new(kind, session_id, payload));
    }
}
