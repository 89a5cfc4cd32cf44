//! # mc_llm - MindCare Model Gateway
//!
//! 模型网关层：Prompt AST、文本生成 Provider、降级路由、令牌桶限流，
//! 以及外部 BERT 情感模型客户端。两类模型对核心层都是不透明的协作者。

pub mod fallback;
pub mod gateway;
pub mod prompt_ast;
pub mod provider;
pub mod sentiment;
pub mod token_bucket;

pub use fallback::{FallbackRouter, ProviderConfig, ProviderKind};
pub use gateway::LlmGateway;
pub use prompt_ast::{PromptAst, PromptNode};
pub use provider::TextGenerator;
pub use sentiment::{BertSentimentClient, SentimentAnalyzer, SentimentConfig};
pub use token_bucket::{TokenBucket, TokenBucketConfig};

pub use mc_core::{MindCareError, Result};
