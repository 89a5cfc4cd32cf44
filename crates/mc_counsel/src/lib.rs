//! # mc_counsel - MindCare Counseling Service
//!
//! 咨询服务层：把情感模型、评估引擎、文本生成与会话存储编排成
//! 一次完整的六轮评估对话，并在出现高风险信号时向咨询师推送预警。

pub mod alert;
pub mod reply;
pub mod service;

pub use alert::{AlertBus, CrisisAlert};
pub use service::{CounselConfig, CounselReply, CounselingService, SessionStart};
