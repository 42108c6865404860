use serde::{Deserialize, Serialize};

use super::AllData;

/// Body handed to the chat transport.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub user_input: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_data: Option<AllData>,
}

impl ChatRequest {
    pub fn new(user_input: impl Into<String>, user_data: Option<AllData>) -> Self {
        Self {
            user_input: user_input.into(),
            user_data,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatResponse {
    pub response: String,
}
