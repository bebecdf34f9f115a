use crate::decimal::to_human_units;
use crate::format::format_token_amount;
use crate::types::{Route, TokenInfo};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeePart {
    /// Formatted human amount.
    pub amount: String,
    pub ticker: String,
}

/// Estimated venue fee, possibly split across the hops of a route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapFee {
    pub parts: Vec<FeePart>,
}

impl fmt::Display for SwapFee {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, part) in self.parts.iter().enumerate() {
            if i > 0 {
                f.write_str(" + ")?;
            }
            write!(f, "{} {}", part.amount, part.ticker)?;
        }
        Ok(())
    }
}

fn part(raw: &str, token: &TokenInfo) -> FeePart {
    FeePart {
        amount: format_token_amount(&to_human_units(raw, token.denomination)),
        ticker: token.ticker.clone(),
    }
}

/// Works out the fee shown for `route`.
///
/// Multi-hop botega routes report the first hop's fee in the sell token and
/// the final hop's fee in the intermediate token, which is resolved through
/// `tokens`. Everything else carries one fee, in the sell token on botega and
/// in the buy token on permaswap.
pub fn swap_fee(
    route: &Route,
    sell: &TokenInfo,
    buy: &TokenInfo,
    tokens: &[TokenInfo],
) -> Option<SwapFee> {
    if let Route::Botega(botega) = route {
        if botega.hops >= 2 {
            let intermediate = botega
                .intermediate_token_id
                .as_deref()
                .and_then(|id| tokens.iter().find(|t| t.process_id == id));

            let mut parts = Vec::new();
            if let Some(raw) = botega.intermediate_estimated_fee.as_deref() {
                parts.push(part(raw, sell));
            }
            if let (Some(raw), Some(token)) = (botega.estimated_fee.as_deref(), intermediate) {
                parts.push(part(raw, token));
            }
            if !parts.is_empty() {
                return Some(SwapFee { parts });
            }
        }
    }

    let raw = route.estimated_fee()?;
    let token = match route {
        Route::Botega(_) => sell,
        Route::Permaswap(_) => buy,
    };
    Some(SwapFee {
        parts: vec![part(raw, token)],
    })
}
