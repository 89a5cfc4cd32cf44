//! # mc_assess - MindCare Assessment Engine
//!
//! 评估引擎：基于关键词词典与外部情感模型的情绪映射、风险分级，
//! 以及决定何时结束六轮评估并跳转结果页的对话状态机。

pub mod dialogue;
pub mod emotion;
pub mod lexicon;
pub mod report;
pub mod risk;

pub use dialogue::{AssessmentDialogue, DialogueConfig, DialogueState, TurnOutcome};
pub use emotion::{intelligent_emotion_mapping, EmotionLabel};
pub use report::AssessmentReport;
pub use risk::{assess_risk_level_simple, calculate_risk_level, RiskAssessment, RiskLevel, TurnSignal};
