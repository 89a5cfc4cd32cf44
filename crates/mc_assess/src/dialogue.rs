//! 评估对话状态机
//!
//! 一次评估最多进行 `max_turns` 轮用户发言 (默认 6 轮)，
//! 达到上限、用户主动结束或出现危机信号时关闭，并交由结果页展示。

use serde::{Deserialize, Serialize};

use mc_core::{MindCareError, Result};

use crate::lexicon;
use crate::risk::RiskLevel;

/// 默认评估轮数
pub const DEFAULT_MAX_TURNS: u32 = 6;

/// 对话配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DialogueConfig {
    /// 最大轮数
    pub max_turns: u32,
    /// 出现危机信号时立即结束评估
    pub end_on_crisis: bool,
    /// 允许用户主动结束评估
    pub allow_early_end: bool,
}

impl Default for DialogueConfig {
    fn default() -> Self {
        Self {
            max_turns: DEFAULT_MAX_TURNS,
            end_on_crisis: true,
            allow_early_end: true,
        }
    }
}

/// 对话状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DialogueState {
    /// 评估进行中
    Active,
    /// 正常完成
    Completed,
    /// 因危机信号转介
    Escalated,
}

impl DialogueState {
    pub fn as_str(&self) -> &'static str {
        match self {
            DialogueState::Active => "active",
            DialogueState::Completed => "completed",
            DialogueState::Escalated => "escalated",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "active" => Some(DialogueState::Active),
            "completed" => Some(DialogueState::Completed),
            "escalated" => Some(DialogueState::Escalated),
            _ => None,
        }
    }

    pub fn is_closed(&self) -> bool {
        !matches!(self, DialogueState::Active)
    }
}

/// 单轮推进结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TurnOutcome {
    /// 继续评估
    Continue { remaining: u32 },
    /// 评估完成，跳转结果页
    Complete,
    /// 危机转介，跳转结果页并提示求助渠道
    Escalate,
}

impl TurnOutcome {
    pub fn ends_assessment(&self) -> bool {
        !matches!(self, TurnOutcome::Continue { .. })
    }
}

/// 评估对话
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssessmentDialogue {
    config: DialogueConfig,
    turn: u32,
    state: DialogueState,
}

impl AssessmentDialogue {
    pub fn new(config: DialogueConfig) -> Self {
        Self {
            config,
            turn: 0,
            state: DialogueState::Active,
        }
    }

    /// 从持久化状态恢复
    pub fn resume(config: DialogueConfig, turn: u32, state: DialogueState) -> Self {
        Self {
            config,
            turn,
            state,
        }
    }

    pub fn turn(&self) -> u32 {
        self.turn
    }

    pub fn state(&self) -> DialogueState {
        self.state
    }

    pub fn remaining(&self) -> u32 {
        if self.state.is_closed() {
            0
        } else {
            self.config.max_turns.saturating_sub(self.turn)
        }
    }

    /// 记录一轮用户发言并推进状态
    pub fn advance(&mut self, text: &str, risk: RiskLevel) -> Result<TurnOutcome> {
        if self.state.is_closed() {
            return Err(MindCareError::SessionClosed(format!(
                "assessment already {}",
                self.state.as_str()
            )));
        }

        self.turn += 1;

        if risk == RiskLevel::Critical && self.config.end_on_crisis {
            self.state = DialogueState::Escalated;
            tracing::warn!(turn = self.turn, "assessment escalated on crisis signal");
            return Ok(TurnOutcome::Escalate);
        }

        if self.turn >= self.config.max_turns {
            self.state = DialogueState::Completed;
            return Ok(TurnOutcome::Complete);
        }

        if self.config.allow_early_end && lexicon::wants_to_end(text) {
            self.state = DialogueState::Completed;
            tracing::debug!(turn = self.turn, "assessment ended early by user");
            return Ok(TurnOutcome::Complete);
        }

        Ok(TurnOutcome::Continue {
            remaining: self.remaining(),
        })
    }
}

impl Default for AssessmentDialogue {
    fn default() -> Self {
        Self::new(DialogueConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_six_turns_then_complete() {
        let mut dialogue = AssessmentDialogue::default();
        for turn in 1..6 {
            let outcome = dialogue.advance("最近还好", RiskLevel::Low).unwrap();
            assert_eq!(outcome, TurnOutcome::Continue { remaining: 6 - turn });
        }
        assert_eq!(
            dialogue.advance("就这些", RiskLevel::Low).unwrap(),
            TurnOutcome::Complete
        );
        assert_eq!(dialogue.state(), DialogueState::Completed);
        assert_eq!(dialogue.turn(), 6);
        assert_eq!(dialogue.remaining(), 0);
    }

    #[test]
    fn test_closed_dialogue_rejects_messages() {
        let mut dialogue = AssessmentDialogue::resume(
            DialogueConfig::default(),
            6,
            DialogueState::Completed,
        );
        let err = dialogue.advance("还在吗", RiskLevel::Low).unwrap_err();
        assert!(matches!(err, MindCareError::SessionClosed(_)));
        assert_eq!(dialogue.turn(), 6);
    }

    #[test]
    fn test_crisis_escalates_immediately() {
        let mut dialogue = AssessmentDialogue::default();
        dialogue.advance("你好", RiskLevel::Low).unwrap();
        let outcome = dialogue.advance("不想活了", RiskLevel::Critical).unwrap();
        assert_eq!(outcome, TurnOutcome::Escalate);
        assert!(outcome.ends_assessment());
        assert_eq!(dialogue.state(), DialogueState::Escalated);
    }

    #[test]
    fn test_crisis_without_early_end_continues() {
        let config = DialogueConfig {
            end_on_crisis: false,
            ..Default::default()
        };
        let mut dialogue = AssessmentDialogue::new(config);
        let outcome = dialogue.advance("不想活了", RiskLevel::Critical).unwrap();
        assert_eq!(outcome, TurnOutcome::Continue { remaining: 5 });
    }

    #[test]
    fn test_user_can_end_early() {
        let mut dialogue = AssessmentDialogue::default();
        dialogue.advance("你好", RiskLevel::Low).unwrap();
        assert_eq!(
            dialogue.advance("我不想聊了", RiskLevel::Low).unwrap(),
            TurnOutcome::Complete
        );
        assert_eq!(dialogue.turn(), 2);
    }

    #[test]
    fn test_custom_turn_limit() {
        let mut dialogue = AssessmentDialogue::new(DialogueConfig {
            max_turns: 2,
            ..Default::default()
        });
        assert_eq!(
            dialogue.advance("a", RiskLevel::Low).unwrap(),
            TurnOutcome::Continue { remaining: 1 }
        );
        assert_eq!(dialogue.advance("b", RiskLevel::Low).unwrap(), TurnOutcome::Complete);
    }

    #[test]
    fn test_state_parse() {
        for state in [DialogueState::Active, DialogueState::Completed, DialogueState::Escalated] {
            assert_eq!(DialogueState::parse(state.as_str()), Some(state));
        }
        assert_eq!(DialogueState::parse("paused"), None);
    }
}
