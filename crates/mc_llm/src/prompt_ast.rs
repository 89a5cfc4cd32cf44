//! Prompt AST 与方言编译器
//!
//! 服务层以 AST 组织对话上下文，再按 Provider 方言编译：
//! OpenAI 兼容接口使用 messages 数组，Ollama generate 接口使用 ChatML 文本。

use serde::{Deserialize, Serialize};

/// Prompt AST 节点
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PromptNode {
    System(String),
    User(String),
    Assistant(String),
}

/// Prompt AST 容器
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PromptAst {
    nodes: Vec<PromptNode>,
}

impl PromptAst {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(mut self, node: PromptNode) -> Self {
        self.nodes.push(node);
        self
    }

    pub fn nodes(&self) -> &[PromptNode] {
        &self.nodes
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// 仅保留最近 `max_turns` 条非系统节点，系统节点始终保留
    pub fn truncated(&self, max_turns: usize) -> Self {
        let dialogue = self
            .nodes
            .iter()
            .filter(|n| !matches!(n, PromptNode::System(_)))
            .count();
        let mut skip = dialogue.saturating_sub(max_turns);
        let nodes = self
            .nodes
            .iter()
            .filter(|n| {
                if matches!(n, PromptNode::System(_)) {
                    return true;
                }
                if skip > 0 {
                    skip -= 1;
                    false
                } else {
                    true
                }
            })
            .cloned()
            .collect();
        Self { nodes }
    }

    /// OpenAI 兼容 messages JSON
    pub fn to_openai_messages(&self) -> Vec<serde_json::Value> {
        self.nodes
            .iter()
            .map(|node| match node {
                PromptNode::System(v) => serde_json::json!({"role":"system","content":v}),
                PromptNode::User(v) => serde_json::json!({"role":"user","content":v}),
                PromptNode::Assistant(v) => {
                    serde_json::json!({"role":"assistant","content":v})
                }
            })
            .collect()
    }

    /// Ollama 友好的 ChatML 扁平化，末尾留出 assistant 起始标记
    pub fn to_chatml(&self) -> String {
        let mut lines = Vec::new();
        for node in &self.nodes {
            match node {
                PromptNode::System(v) => lines.push(format!("<|system|>\n{v}")),
                PromptNode::User(v) => lines.push(format!("<|user|>\n{v}")),
                PromptNode::Assistant(v) => lines.push(format!("<|assistant|>\n{v}")),
            }
        }
        lines.push("<|assistant|>".to_string());
        lines.join("\n")
    }
}
