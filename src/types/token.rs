use serde::{Deserialize, Serialize};

/// A tradable asset as listed by the token catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenInfo {
    pub name: String,
    pub ticker: String,
    /// Number of decimal places in one whole token.
    pub denomination: u32,
    pub logo: String,
    /// Ledger process identifier, unique per token.
    pub process_id: String,
}

impl TokenInfo {
    /// Matches either the ticker (case-insensitive) or the exact process id.
    pub fn matches(&self, reference: &str) -> bool {
        self.process_id == reference || self.ticker.eq_ignore_ascii_case(reference)
    }
}
