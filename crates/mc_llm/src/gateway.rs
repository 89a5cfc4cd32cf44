//! LLM Gateway 执行编排层
//!
//! 负责：
//! - 走令牌桶限流
//! - 截断过长的对话上下文
//! - 交给降级路由生成回复

use async_trait::async_trait;

use crate::fallback::FallbackRouter;
use crate::prompt_ast::PromptAst;
use crate::provider::TextGenerator;
use crate::token_bucket::TokenBucket;

/// 发往模型的最大对话节点数 (不含系统提示)
pub const DEFAULT_CONTEXT_TURNS: usize = 12;

pub struct LlmGateway {
    token_bucket: TokenBucket,
    router: FallbackRouter,
    context_turns: usize,
}

impl LlmGateway {
    pub fn new(token_bucket: TokenBucket, router: FallbackRouter) -> Self {
        Self {
            token_bucket,
            router,
            context_turns: DEFAULT_CONTEXT_TURNS,
        }
    }

    pub fn with_context_turns(mut self, turns: usize) -> Self {
        self.context_turns = turns;
        self
    }

    pub fn providers(&self) -> Vec<&str> {
        self.router.provider_names()
    }
}

#[async_trait]
impl TextGenerator for LlmGateway {
    fn name(&self) -> &str {
        "gateway"
    }

    async fn generate(&self, ast: &PromptAst) -> crate::Result<String> {
        let _token = self.token_bucket.acquire().await?;
        let ast = ast.truncated(self.context_turns);
        self.router.generate(&ast).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::prompt_ast::PromptNode;
    use crate::token_bucket::TokenBucketConfig;

    struct Echo;

    #[async_trait]
    impl TextGenerator for Echo {
        fn name(&self) -> &str {
            "echo"
        }

        async fn generate(&self, ast: &PromptAst) -> crate::Result<String> {
            Ok(format!("{} nodes", ast.nodes().len()))
        }
    }

    #[tokio::test]
    async fn test_gateway_truncates_context() {
        let gateway = LlmGateway::new(
            TokenBucket::default_bucket(),
            FallbackRouter::from_generators(vec![Box::new(Echo)]),
        )
        .with_context_turns(1);

        let ast = PromptAst::new()
            .push(PromptNode::System("sys".to_string()))
            .push(PromptNode::User("a".to_string()))
            .push(PromptNode::Assistant("b".to_string()))
            .push(PromptNode::User("c".to_string()));

        assert_eq!(gateway.generate(&ast).await.unwrap(), "2 nodes");
        assert_eq!(gateway.providers(), vec!["echo"]);
    }

    #[tokio::test]
    async fn test_gateway_respects_token_bucket() {
        let bucket = TokenBucket::new(TokenBucketConfig {
            capacity: 1,
            max_wait: Duration::from_millis(20),
        });
        let _held = bucket.try_acquire().unwrap();
        let gateway = LlmGateway::new(
            bucket.clone(),
            FallbackRouter::from_generators(vec![Box::new(Echo)]),
        );

        let ast = PromptAst::new().push(PromptNode::User("a".to_string()));
        assert!(gateway.generate(&ast).await.is_err());
    }
}
