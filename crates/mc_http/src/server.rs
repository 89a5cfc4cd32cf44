//! HTTP 服务器

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;

use mc_core::{MindCareError, Result};
use mc_counsel::CounselingService;

use crate::routes::router;

/// HTTP 服务器配置
#[derive(Debug, Clone)]
pub struct HttpServerConfig {
    /// 监听地址
    pub addr: SocketAddr,
}

impl Default for HttpServerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
        }
    }
}

/// HTTP 服务器
pub struct HttpServer {
    config: HttpServerConfig,
    service: Arc<CounselingService>,
}

impl HttpServer {
    pub fn new(config: HttpServerConfig, service: Arc<CounselingService>) -> Self {
        Self { config, service }
    }

    /// 构建 Axum 路由
    pub fn build_router(&self) -> Router {
        router(self.service.clone())
    }

    /// 启动服务器
    pub async fn start(&self) -> Result<()> {
        self.start_with_shutdown(std::future::pending()).await
    }

    /// 启动服务器，`shutdown` 完成后优雅退出
    pub async fn start_with_shutdown<F>(&self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = tokio::net::TcpListener::bind(&self.config.addr).await?;
        tracing::info!(addr = %self.config.addr, "counsel http server listening");

        axum::serve(listener, self.build_router())
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| MindCareError::Unknown(format!("http server: {e}")))?;

        Ok(())
    }

    pub fn config(&self) -> &HttpServerConfig {
        &self.config
    }
}
