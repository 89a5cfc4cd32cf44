//! 全局错误处理机制

use thiserror::Error;

/// MindCare 统一错误类型
#[derive(Error, Debug)]
pub enum MindCareError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Session closed: {0}")]
    SessionClosed(String),

    #[error("LLM provider error: {0}")]
    LlmProvider(String),

    #[error("Sentiment model error: {0}")]
    Sentiment(String),

    #[error("Token bucket exhausted: {0}")]
    TokenBucketExhausted(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl MindCareError {
    /// 是否为上游模型 (LLM / BERT) 的故障
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            MindCareError::LlmProvider(_)
                | MindCareError::Sentiment(_)
                | MindCareError::TokenBucketExhausted(_)
        )
    }
}

/// 统一 Result 类型别名
pub type Result<T> = std::result::Result<T, MindCareError>;
