//! LLM Provider 子模块

pub mod ollama;
pub mod openai;

use async_trait::async_trait;

use crate::prompt_ast::PromptAst;

pub use ollama::{OllamaConfig, OllamaProvider};
pub use openai::{OpenAIConfig, OpenAIProvider};

/// 不透明的文本生成协作者
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Provider 名称 (用于日志)
    fn name(&self) -> &str;

    /// 根据对话上下文生成回复
    async fn generate(&self, ast: &PromptAst) -> crate::Result<String>;
}

/// 构建带超时的 HTTP 客户端
pub(crate) fn http_client(timeout: std::time::Duration) -> crate::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| crate::MindCareError::Config(format!("http client: {e}")))
}
