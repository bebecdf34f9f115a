use super::ledger::Tag;
use super::quote::Route;
use serde::{Deserialize, Serialize};

/// Execution order sent to a venue, both for direct execution and for
/// preparing an unsigned message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapOrder {
    pub route: Route,
    pub from_token_id: String,
    pub to_token_id: String,
    /// Raw units of the sell token.
    pub amount: String,
    /// Minimum acceptable output in raw units of the buy token.
    pub min_amount: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_address: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteSwapResponse {
    #[serde(default)]
    pub message_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnsignedMessage {
    pub process: String,
    #[serde(default)]
    pub tags: Vec<Tag>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreparedSwapMessage {
    pub unsigned_message: UnsignedMessage,
}

/// Settlement status tags reported by the status endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SwapStatus {
    Pending,
    Processing,
    Received,
    Sent,
    Hop1Sent,
    Hop2Sent,
    Completed,
    Refunded,
    Failed,
    #[serde(other)]
    Unknown,
}

impl SwapStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            SwapStatus::Completed | SwapStatus::Refunded | SwapStatus::Failed
        )
    }

    /// User-facing progress line, `None` when there is nothing specific to say.
    pub fn friendly_text(self) -> Option<&'static str> {
        match self {
            SwapStatus::Received => Some("Order received..."),
            SwapStatus::Sent => Some("Swap submitted..."),
            SwapStatus::Hop1Sent => Some("First hop sent..."),
            SwapStatus::Hop2Sent => Some("Second hop sent..."),
            SwapStatus::Completed => Some("Swap completed"),
            SwapStatus::Refunded => Some("Swap refunded"),
            SwapStatus::Failed => Some("Swap failed"),
            SwapStatus::Pending | SwapStatus::Processing | SwapStatus::Unknown => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwapStatusResponse {
    pub status: SwapStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}
