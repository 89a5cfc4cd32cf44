//! 守护进程配置 (MINDCARE_* 环境变量)

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Context};

use mc_assess::DialogueConfig;
use mc_counsel::CounselConfig;
use mc_durable::StoreConfig;
use mc_http::HttpServerConfig;
use mc_llm::{ProviderConfig, ProviderKind, SentimentConfig, TokenBucketConfig};

/// 守护进程完整配置
#[derive(Debug, Clone)]
pub struct DaemonConfig {
    pub http: HttpServerConfig,
    pub store: StoreConfig,
    pub counsel: CounselConfig,
    pub token_bucket: TokenBucketConfig,
    /// 为空时仅使用兜底回复
    pub providers: Vec<ProviderConfig>,
    /// 为空时仅使用关键词映射
    pub sentiment: Option<SentimentConfig>,
}

impl DaemonConfig {
    /// 读取进程环境变量
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 通过任意键值来源构建配置
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let mut http = HttpServerConfig::default();
        if let Some(addr) = get("MINDCARE_ADDR") {
            http.addr = SocketAddr::from_str(&addr)
                .with_context(|| format!("invalid MINDCARE_ADDR: {addr}"))?;
        }

        let mut store = StoreConfig::default();
        if let Some(url) = get("MINDCARE_DATABASE_URL") {
            store.database_url = url;
        }
        if let Some(n) = get("MINDCARE_DB_MAX_CONNECTIONS") {
            store.max_connections = parse(&n, "MINDCARE_DB_MAX_CONNECTIONS")?;
        }

        let mut dialogue = DialogueConfig::default();
        if let Some(n) = get("MINDCARE_MAX_TURNS") {
            dialogue.max_turns = parse(&n, "MINDCARE_MAX_TURNS")?;
            if dialogue.max_turns == 0 {
                bail!("MINDCARE_MAX_TURNS must be at least 1");
            }
        }
        let mut counsel = CounselConfig {
            dialogue,
            ..Default::default()
        };
        if let Some(n) = get("MINDCARE_MAX_MESSAGE_CHARS") {
            counsel.max_message_chars = parse(&n, "MINDCARE_MAX_MESSAGE_CHARS")?;
        }

        let mut token_bucket = TokenBucketConfig::default();
        if let Some(n) = get("MINDCARE_MODEL_CONCURRENCY") {
            token_bucket.capacity = parse(&n, "MINDCARE_MODEL_CONCURRENCY")?;
        }

        let mut providers = Vec::new();
        if let Some(kind) = get("MINDCARE_LLM_PROVIDER") {
            let kind = ProviderKind::parse(&kind)
                .with_context(|| format!("unknown MINDCARE_LLM_PROVIDER: {kind}"))?;
            let (endpoint, model) = match kind {
                ProviderKind::OpenAICompat => ("https://api.openai.com/v1", "gpt-4o-mini"),
                ProviderKind::Ollama => ("http://localhost:11434", "qwen2.5:7b"),
            };
            providers.push(ProviderConfig {
                kind,
                endpoint: get("MINDCARE_LLM_ENDPOINT").unwrap_or_else(|| endpoint.to_string()),
                api_key: get("MINDCARE_LLM_API_KEY"),
                model: get("MINDCARE_LLM_MODEL").unwrap_or_else(|| model.to_string()),
                priority: 0,
                max_retries: 1,
                timeout: Duration::from_secs(30),
                enabled: true,
            });
        }
        // 本地 Ollama 作为备用
        if let Some(endpoint) = get("MINDCARE_OLLAMA_URL") {
            providers.push(ProviderConfig {
                kind: ProviderKind::Ollama,
                endpoint,
                api_key: None,
                model: get("MINDCARE_OLLAMA_MODEL").unwrap_or_else(|| "qwen2.5:7b".to_string()),
                priority: 10,
                max_retries: 0,
                timeout: Duration::from_secs(120),
                enabled: true,
            });
        }

        let sentiment = get("MINDCARE_SENTIMENT_URL").map(|endpoint| SentimentConfig {
            endpoint,
            api_key: get("MINDCARE_SENTIMENT_API_KEY"),
            ..Default::default()
        });

        Ok(Self {
            http,
            store,
            counsel,
            token_bucket,
            providers,
            sentiment,
        })
    }
}

fn parse<T>(value: &str, key: &str) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .trim()
        .parse()
        .with_context(|| format!("invalid {key}: {value}"))
}
