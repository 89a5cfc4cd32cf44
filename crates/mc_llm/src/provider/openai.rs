//! OpenAI 兼容 Provider
//!
//! 适配所有实现 `/chat/completions` 的服务 (OpenAI、DeepSeek、通义千问兼容模式等)。

use std::time::Duration;

use async_trait::async_trait;

use crate::prompt_ast::PromptAst;
use crate::provider::{http_client, TextGenerator};

/// OpenAI 配置
#[derive(Debug, Clone)]
pub struct OpenAIConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub temperature: f32,
    pub timeout: Duration,
}

impl Default for OpenAIConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: "gpt-4o-mini".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            temperature: 0.7,
            timeout: Duration::from_secs(30),
        }
    }
}

/// OpenAI 兼容 Provider
pub struct OpenAIProvider {
    config: OpenAIConfig,
    client: reqwest::Client,
}

impl OpenAIProvider {
    pub fn new(config: OpenAIConfig) -> crate::Result<Self> {
        let client = http_client(config.timeout)?;
        Ok(Self { config, client })
    }

    /// 将 Prompt AST 编译为 OpenAI 兼容请求体
    pub fn compile_request(&self, ast: &PromptAst) -> serde_json::Value {
        serde_json::json!({
            "model": self.config.model,
            "messages": ast.to_openai_messages(),
            "temperature": self.config.temperature,
            "stream": false
        })
    }

    fn build_url(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }
}

/// 提取 `choices[0].message.content`
pub(crate) fn parse_chat_completion(raw: &str) -> crate::Result<String> {
    let json: serde_json::Value = serde_json::from_str(raw).map_err(|e| {
        crate::MindCareError::LlmProvider(format!("openai: decode failed: {e}"))
    })?;

    json.pointer("/choices/0/message/content")
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| {
            crate::MindCareError::LlmProvider("openai: empty completion".to_string())
        })
}

#[async_trait]
impl TextGenerator for OpenAIProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn generate(&self, ast: &PromptAst) -> crate::Result<String> {
        let mut req = self.client.post(self.build_url()).json(&self.compile_request(ast));
        if !self.config.api_key.is_empty() {
            req = req.bearer_auth(&self.config.api_key);
        }

        let resp = req.send().await.map_err(|e| {
            crate::MindCareError::LlmProvider(format!("openai: request failed: {e}"))
        })?;

        let status = resp.status();
        let raw_text = resp.text().await.unwrap_or_default();

        if !status.is_success() {
            return Err(crate::MindCareError::LlmProvider(format!(
                "openai: chat completion failed ({}): {}",
                status,
                raw_text.trim()
            )));
        }

        parse_chat_completion(&raw_text)
    }
}
