//! 断流重试与降级路由

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::prompt_ast::PromptAst;
use crate::provider::{OllamaConfig, OllamaProvider, OpenAIConfig, OpenAIProvider, TextGenerator};

/// Provider 类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// OpenAI 兼容 `/chat/completions`
    OpenAICompat,
    /// Ollama `/api/generate`
    Ollama,
}

impl ProviderKind {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "openai" | "openai_compat" | "deepseek" | "qwen" => Some(ProviderKind::OpenAICompat),
            "ollama" => Some(ProviderKind::Ollama),
            _ => None,
        }
    }
}

/// LLM 提供商配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// 提供商类型
    pub kind: ProviderKind,
    /// API 端点
    pub endpoint: String,
    /// API 密钥 (可选)，序列化时省略
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    /// 模型名称
    pub model: String,
    /// 优先级 (越小越优先)
    pub priority: u8,
    /// 单个 provider 的重试次数
    pub max_retries: u32,
    /// 超时时间
    pub timeout: Duration,
    /// 是否启用
    pub enabled: bool,
}

impl ProviderConfig {
    /// 按配置构建 provider
    pub fn build(&self) -> crate::Result<Box<dyn TextGenerator>> {
        let generator: Box<dyn TextGenerator> = match self.kind {
            ProviderKind::OpenAICompat => Box::new(OpenAIProvider::new(OpenAIConfig {
                api_key: self.api_key.clone().unwrap_or_default(),
                model: self.model.clone(),
                base_url: self.endpoint.clone(),
                timeout: self.timeout,
                ..Default::default()
            })?),
            ProviderKind::Ollama => Box::new(OllamaProvider::new(OllamaConfig {
                base_url: self.endpoint.clone(),
                model: self.model.clone(),
                timeout: self.timeout,
            })?),
        };
        Ok(generator)
    }
}

struct Route {
    generator: Box<dyn TextGenerator>,
    max_retries: u32,
}

/// 降级路由器
///
/// 按优先级依次尝试各 provider，返回第一个成功的回复。
pub struct FallbackRouter {
    routes: Vec<Route>,
}

impl FallbackRouter {
    /// 由配置创建，禁用的 provider 被跳过
    pub fn from_configs(mut configs: Vec<ProviderConfig>) -> crate::Result<Self> {
        configs.sort_by_key(|p| p.priority);
        let mut routes = Vec::new();
        for config in configs.iter().filter(|c| c.enabled) {
            routes.push(Route {
                generator: config.build()?,
                max_retries: config.max_retries,
            });
        }
        Ok(Self { routes })
    }

    /// 由现成的 generator 创建 (按给定顺序)
    pub fn from_generators(generators: Vec<Box<dyn TextGenerator>>) -> Self {
        let routes = generators
            .into_iter()
            .map(|generator| Route {
                generator,
                max_retries: 0,
            })
            .collect();
        Self { routes }
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// 当前启用的 provider 名称
    pub fn provider_names(&self) -> Vec<&str> {
        self.routes.iter().map(|r| r.generator.name()).collect()
    }
}

#[async_trait]
impl TextGenerator for FallbackRouter {
    fn name(&self) -> &str {
        "fallback"
    }

    async fn generate(&self, ast: &PromptAst) -> crate::Result<String> {
        let mut last_error = None;

        for route in &self.routes {
            for attempt in 0..=route.max_retries {
                match route.generator.generate(ast).await {
                    Ok(text) => return Ok(text),
                    Err(e) => {
                        tracing::warn!(
                            provider = route.generator.name(),
                            attempt,
                            error = %e,
                            "llm provider failed"
                        );
                        last_error = Some(e);
                    }
                }
            }
        }

        Err(match last_error {
            Some(e) => crate::MindCareError::LlmProvider(format!("all providers failed: {e}")),
            None => crate::MindCareError::LlmProvider(
                "no provider available in fallback router".to_string(),
            ),
        })
    }
}
