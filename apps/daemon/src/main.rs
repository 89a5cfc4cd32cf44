//! MindCare Daemon - 心理咨询 HTTP 服务守护进程

mod config;

use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mc_counsel::CounselingService;
use mc_durable::SqliteSessionStore;
use mc_http::HttpServer;
use mc_llm::{BertSentimentClient, FallbackRouter, LlmGateway, TokenBucket};

use crate::config::DaemonConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 初始化日志
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mindcare_daemon=debug,mc_counsel=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("MindCare Daemon starting...");
    let config = DaemonConfig::from_env()?;

    // 初始化会话存储
    let store = SqliteSessionStore::connect(&config.store).await?;
    tracing::info!(url = %config.store.database_url, "Session store initialized");

    // 初始化令牌桶 (LLM 与情感模型共享)
    let token_bucket = TokenBucket::new(config.token_bucket.clone());
    tracing::info!("Token bucket initialized with capacity {}", token_bucket.available_tokens());

    let mut service = CounselingService::new(Arc::new(store), config.counsel.clone());

    // 初始化 LLM 网关
    let router = FallbackRouter::from_configs(config.providers.clone())?;
    if router.is_empty() {
        tracing::warn!("No LLM provider configured, replies fall back to templates");
    } else {
        let gateway = LlmGateway::new(token_bucket.clone(), router);
        tracing::info!(providers = ?gateway.providers(), "LLM gateway initialized");
        service = service.with_generator(Arc::new(gateway));
    }

    // 初始化情感模型客户端
    match &config.sentiment {
        Some(sentiment) => {
            let client = BertSentimentClient::new(sentiment.clone(), token_bucket.clone())?;
            tracing::info!(endpoint = %sentiment.endpoint, "Sentiment client initialized");
            service = service.with_sentiment(Arc::new(client));
        }
        None => tracing::warn!("No sentiment endpoint configured, using keyword mapping only"),
    }

    let service = Arc::new(service);

    // 危机预警消费者
    let mut alerts = service.subscribe_alerts();
    tokio::spawn(async move {
        loop {
            match alerts.recv().await {
                Ok(alert) => tracing::warn!(
                    session_id = %alert.session_id,
                    student_id = %alert.student_id,
                    risk = alert.risk.as_str(),
                    turn = alert.turn,
                    "CRISIS ALERT: counselor follow-up required"
                ),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::error!(skipped, "crisis alert consumer lagged, alerts skipped")
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    // 启动 HTTP 服务
    let server = HttpServer::new(config.http.clone(), service);
    tracing::info!("MindCare Daemon is ready on {}", server.config().addr);
    tracing::info!("Press Ctrl+C to shutdown...");

    server
        .start_with_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for shutdown signal");
            }
        })
        .await?;

    tracing::info!("Shutting down...");
    Ok(())
}
