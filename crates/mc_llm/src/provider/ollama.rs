//! Ollama Provider (本地模型)

use std::time::Duration;

use async_trait::async_trait;

use crate::prompt_ast::PromptAst;
use crate::provider::{http_client, TextGenerator};

/// Ollama 配置
#[derive(Debug, Clone)]
pub struct OllamaConfig {
    pub base_url: String,
    pub model: String,
    pub timeout: Duration,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            model: "qwen2.5:7b".to_string(),
            timeout: Duration::from_secs(120),
        }
    }
}

/// Ollama Provider
pub struct OllamaProvider {
    config: OllamaConfig,
    client: reqwest::Client,
}

impl OllamaProvider {
    pub fn new(config: OllamaConfig) -> crate::Result<Self> {
        let client = http_client(config.timeout)?;
        Ok(Self { config, client })
    }

    /// 将 Prompt AST 编译为 Ollama 友好的 ChatML 请求
    pub fn compile_request(&self, ast: &PromptAst) -> serde_json::Value {
        serde_json::json!({
            "model": self.config.model,
            "prompt": ast.to_chatml(),
            "stream": false
        })
    }
}

#[async_trait]
impl TextGenerator for OllamaProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn generate(&self, ast: &PromptAst) -> crate::Result<String> {
        let url = format!("{}/api/generate", self.config.base_url.trim_end_matches('/'));
        let resp = self
            .client
            .post(&url)
            .json(&self.compile_request(ast))
            .send()
            .await
            .map_err(|e| crate::MindCareError::LlmProvider(format!("ollama: request failed: {e}")))?;

        let status = resp.status();
        let raw_text = resp.text().await.unwrap_or_default();

        if !status.is_success() {
            return Err(crate::MindCareError::LlmProvider(format!(
                "ollama: generate failed ({}): {}",
                status,
                raw_text.trim()
            )));
        }

        let json: serde_json::Value = serde_json::from_str(&raw_text).map_err(|e| {
            crate::MindCareError::LlmProvider(format!("ollama: decode failed: {e}"))
        })?;
        json.get("response")
            .and_then(|v| v.as_str())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| crate::MindCareError::LlmProvider("ollama: empty response".to_string()))
    }
}
