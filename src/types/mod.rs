pub mod ledger;
pub mod price;
pub mod quote;
pub mod swap;
pub mod token;

pub use ledger::{DryRunResult, LedgerMessage, Tag};
pub use price::{TokenPriceEntry, TokenPrices};
pub use quote::{
    BotegaRoute, PermaswapRoute, QuoteOutcome, QuoteRequest, QuoteResult, ReverseQuoteRequest,
    Route, Venue,
};
pub use swap::{
    ExecuteSwapResponse, PreparedSwapMessage, SwapOrder, SwapStatus, SwapStatusResponse,
    UnsignedMessage,
};
pub use token::TokenInfo;

/// Raw amounts arrive as JSON strings, but some services send plain numbers.
pub(crate) mod amount_string {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<Value>::deserialize(deserializer)? {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s)),
            Some(Value::Number(n)) => Ok(Some(n.to_string())),
            Some(other) => Err(D::Error::custom(format!(
                "expected an amount string, found {other}"
            ))),
        }
    }
}
