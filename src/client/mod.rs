//! Seams to the external services the swap core depends on.
//!
//! Each service is a trait so components can be driven by the HTTP clients in
//! this module or by the mocks in `test_fixtures`.

mod ao;
mod catalog;
pub(crate) mod http;
mod oracle;
mod vento;

#[cfg(test)]
pub(crate) mod test_fixtures;

pub use ao::AoLedgerClient;
pub use catalog::CatalogClient;
pub use oracle::PriceOracleClient;
pub use vento::VentoClient;

use crate::error::ClientError;
use crate::types::{
    DryRunResult, ExecuteSwapResponse, PreparedSwapMessage, QuoteRequest, QuoteResult,
    ReverseQuoteRequest, SwapOrder, SwapStatusResponse, TokenPrices, UnsignedMessage,
};
use async_trait::async_trait;

/// DEX aggregation service: routing quotes, execution and settlement status.
#[async_trait]
pub trait Aggregator: Send + Sync {
    async fn get_swap_quote(&self, request: &QuoteRequest) -> Result<QuoteResult, ClientError>;

    async fn get_reverse_quote(
        &self,
        request: &ReverseQuoteRequest,
    ) -> Result<QuoteResult, ClientError>;

    /// Direct execution for venues that settle from a single call.
    async fn execute_swap(&self, order: &SwapOrder) -> Result<ExecuteSwapResponse, ClientError>;

    /// First phase of the two-phase venues: an unsigned message to be signed
    /// and dispatched by a [`MessageSigner`].
    async fn prepare_swap_message(
        &self,
        order: &SwapOrder,
    ) -> Result<PreparedSwapMessage, ClientError>;

    async fn get_swap_status(&self, swap_id: &str) -> Result<SwapStatusResponse, ClientError>;
}

/// Read-only balance lookups against a token's ledger process.
#[async_trait]
pub trait Ledger: Send + Sync {
    async fn balance(&self, process_id: &str, address: &str)
        -> Result<DryRunResult, ClientError>;
}

#[async_trait]
pub trait PriceOracle: Send + Sync {
    async fn fetch_prices(&self, process_ids: &[String]) -> Result<TokenPrices, ClientError>;
}

/// Source of the raw token list. Entries are validated by the catalog.
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn fetch_tokens(&self) -> Result<serde_json::Value, ClientError>;
}

/// Wallet capability that signs an unsigned message and dispatches it,
/// returning the message id.
#[async_trait]
pub trait MessageSigner: Send + Sync {
    async fn send(&self, message: &UnsignedMessage) -> Result<String, ClientError>;
}
