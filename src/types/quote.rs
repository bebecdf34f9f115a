use serde::{Deserialize, Serialize};
use std::fmt;

/// Execution venue of a route. Fee denomination and the execution call shape
/// both depend on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Venue {
    Botega,
    Permaswap,
}

impl fmt::Display for Venue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Venue::Botega => f.write_str("botega"),
            Venue::Permaswap => f.write_str("permaswap"),
        }
    }
}

fn single_hop() -> u32 {
    1
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BotegaRoute {
    #[serde(default = "single_hop")]
    pub hops: u32,
    #[serde(
        default,
        deserialize_with = "super::amount_string::deserialize",
        skip_serializing_if = "Option::is_none"
    )]
    pub estimated_output: Option<String>,
    #[serde(
        default,
        deserialize_with = "super::amount_string::deserialize",
        skip_serializing_if = "Option::is_none"
    )]
    pub required_input: Option<String>,
    /// Final-hop fee, denominated in the intermediate token on multi-hop
    /// routes and in the sell token otherwise.
    #[serde(
        default,
        deserialize_with = "super::amount_string::deserialize",
        skip_serializing_if = "Option::is_none"
    )]
    pub estimated_fee: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intermediate_token_id: Option<String>,
    /// First-hop fee, denominated in the sell token.
    #[serde(
        default,
        deserialize_with = "super::amount_string::deserialize",
        skip_serializing_if = "Option::is_none"
    )]
    pub intermediate_estimated_fee: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermaswapRoute {
    #[serde(default = "single_hop")]
    pub hops: u32,
    #[serde(
        default,
        deserialize_with = "super::amount_string::deserialize",
        skip_serializing_if = "Option::is_none"
    )]
    pub estimated_output: Option<String>,
    #[serde(
        default,
        deserialize_with = "super::amount_string::deserialize",
        skip_serializing_if = "Option::is_none"
    )]
    pub required_input: Option<String>,
    /// Denominated in the buy token.
    #[serde(
        default,
        deserialize_with = "super::amount_string::deserialize",
        skip_serializing_if = "Option::is_none"
    )]
    pub estimated_fee: Option<String>,
}

/// Best route returned by the aggregator. Amounts are raw base units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "dex", rename_all = "lowercase")]
pub enum Route {
    Botega(BotegaRoute),
    Permaswap(PermaswapRoute),
}

impl Route {
    pub fn venue(&self) -> Venue {
        match self {
            Route::Botega(_) => Venue::Botega,
            Route::Permaswap(_) => Venue::Permaswap,
        }
    }

    pub fn hops(&self) -> u32 {
        match self {
            Route::Botega(r) => r.hops,
            Route::Permaswap(r) => r.hops,
        }
    }

    pub fn estimated_output(&self) -> Option<&str> {
        match self {
            Route::Botega(r) => r.estimated_output.as_deref(),
            Route::Permaswap(r) => r.estimated_output.as_deref(),
        }
    }

    pub fn required_input(&self) -> Option<&str> {
        match self {
            Route::Botega(r) => r.required_input.as_deref(),
            Route::Permaswap(r) => r.required_input.as_deref(),
        }
    }

    pub fn estimated_fee(&self) -> Option<&str> {
        match self {
            Route::Botega(r) => r.estimated_fee.as_deref(),
            Route::Permaswap(r) => r.estimated_fee.as_deref(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteRequest {
    pub from_token_id: String,
    pub to_token_id: String,
    /// Raw units of the sell token.
    pub amount: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_address: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReverseQuoteRequest {
    pub from_token_id: String,
    pub to_token_id: String,
    /// Raw units of the buy token.
    pub desired_output: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_address: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteResult {
    #[serde(default)]
    pub best_route: Option<Route>,
    #[serde(default)]
    pub total_routes_found: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuoteOutcome {
    Routed,
    /// Nothing can route this pair; terminal for the current input.
    NoRoutes,
    /// Routes exist but none could be priced; worth retrying.
    EstimateFailed,
}

impl QuoteResult {
    pub fn outcome(&self) -> QuoteOutcome {
        match (&self.best_route, self.total_routes_found) {
            (Some(_), _) => QuoteOutcome::Routed,
            (None, 0) => QuoteOutcome::NoRoutes,
            (None, _) => QuoteOutcome::EstimateFailed,
        }
    }
}
