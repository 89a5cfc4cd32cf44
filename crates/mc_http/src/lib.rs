//! # mc_http - MindCare HTTP Interface
//!
//! 咨询服务的 REST 接口：创建会话、逐轮发送消息、查询历史与评估结果。

pub mod error;
pub mod routes;
pub mod server;

pub use error::ApiError;
pub use routes::router;
pub use server::{HttpServer, HttpServerConfig};
