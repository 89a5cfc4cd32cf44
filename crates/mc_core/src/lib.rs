//! # mc_core - MindCare Core Primitives
//!
//! 核心原语层，定义统一错误类型、会话/学生标识、情感极性与咨询事件。
//! 此 crate 是整个项目的基础依赖，不依赖其他业务 crate。

pub mod entity;
pub mod error;
pub mod event;
pub mod sentiment;

pub use entity::{SessionId, StudentId};
pub use error::{MindCareError, Result};
pub use event::{CounselEvent, CounselEventKind};
pub use sentiment::{Polarity, Sentiment};
