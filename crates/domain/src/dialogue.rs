//! Model dialogue: an append-only, ordered sequence of role-tagged turns.

use serde::{Deserialize, Serialize};

use crate::tool::{ToolInvocation, ToolResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Model,
    ToolResult,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TurnPart {
    Text { text: String },
    ToolCall { invocation: ToolInvocation },
    ToolResult { result: ToolResult },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DialogueTurn {
    pub role: Role,
    pub parts: Vec<TurnPart>,
}

impl DialogueTurn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            parts: vec![TurnPart::Text { text: text.into() }],
        }
    }

    /// One turn carrying a whole batch of tool results, in invocation order.
    pub fn tool_results(results: Vec<ToolResult>) -> Self {
        Self {
            role: Role::ToolResult,
            parts: results
                .into_iter()
                .map(|result| TurnPart::ToolResult { result })
                .collect(),
        }
    }
}

/// The ongoing conversation with the model for one user.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dialogue {
    turns: Vec<DialogueTurn>,
}

impl Dialogue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn turns(&self) -> &[DialogueTurn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn push(&mut self, turn: DialogueTurn) {
        self.turns.push(turn);
    }

    pub fn extend(&mut self, turns: impl IntoIterator<Item = DialogueTurn>) {
        self.turns.extend(turns);
    }
}
