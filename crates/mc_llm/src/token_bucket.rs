//! 全局令牌桶流量控制器
//!
//! 限制同时在途的模型调用数，防止高峰期压垮上游 LLM / BERT 服务。

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// 令牌桶配置
#[derive(Debug, Clone)]
pub struct TokenBucketConfig {
    /// 桶容量 (最大并发请求数)
    pub capacity: usize,
    /// 最大等待时间
    pub max_wait: Duration,
}

impl Default for TokenBucketConfig {
    fn default() -> Self {
        Self {
            capacity: 16,
            max_wait: Duration::from_secs(10),
        }
    }
}

/// 全局令牌桶
#[derive(Debug, Clone)]
pub struct TokenBucket {
    config: TokenBucketConfig,
    semaphore: Arc<Semaphore>,
}

/// 持有期间占用一个令牌，drop 时归还
#[derive(Debug)]
pub struct Token {
    _permit: OwnedSemaphorePermit,
}

impl TokenBucket {
    /// 创建新的令牌桶
    pub fn new(config: TokenBucketConfig) -> Self {
        let semaphore = Arc::new(Semaphore::new(config.capacity));
        Self { config, semaphore }
    }

    /// 创建默认配置的令牌桶
    pub fn default_bucket() -> Self {
        Self::new(TokenBucketConfig::default())
    }

    /// 获取令牌 (异步等待，超时报错)
    pub async fn acquire(&self) -> crate::Result<Token> {
        let permit = tokio::time::timeout(
            self.config.max_wait,
            self.semaphore.clone().acquire_owned(),
        )
        .await
        .map_err(|_| {
            crate::MindCareError::TokenBucketExhausted("Timeout waiting for token".to_string())
        })?
        .map_err(|_| crate::MindCareError::TokenBucketExhausted("Semaphore closed".to_string()))?;

        Ok(Token { _permit: permit })
    }

    /// 尝试获取令牌 (非阻塞)
    pub fn try_acquire(&self) -> crate::Result<Token> {
        self.semaphore
            .clone()
            .try_acquire_owned()
            .map(|permit| Token { _permit: permit })
            .map_err(|_| {
                crate::MindCareError::TokenBucketExhausted("No tokens available".to_string())
            })
    }

    /// 获取当前可用令牌数
    pub fn available_tokens(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// 获取配置
    pub fn config(&self) -> &TokenBucketConfig {
        &self.config
    }
}
