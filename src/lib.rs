//! Swap-quoting core for the Vento DEX aggregator.
//!
//! Amounts travel as decimal strings end to end. Components publish their
//! state through `tokio::sync::watch` channels and are driven by intent
//! methods (set amount, select token, refetch, confirm).

pub mod balance;
pub mod catalog;
pub mod client;
pub mod config;
pub mod decimal;
pub mod error;
pub mod format;
pub mod prices;
pub mod quote;
pub mod session;
pub mod swap;
pub mod telemetry;
pub mod types;

mod task;

#[cfg(test)]
mod test_helpers;

pub use error::{ClientError, SwapError};
pub use session::{Services, SessionView, SwapSession};
