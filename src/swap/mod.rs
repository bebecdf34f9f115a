//! Swap execution: preparation, confirmation, submission and settlement
//! tracking for a single attempt at a time.

pub mod fees;
pub mod status;

pub use fees::{swap_fee, FeePart, SwapFee};
pub use status::{StatusState, StatusTracker, TerminalHook, DEFAULT_STATUS_POLL};

use crate::client::{Aggregator, MessageSigner};
use crate::decimal::to_raw_units;
use crate::error::SwapError;
use crate::types::{PreparedSwapMessage, Route, SwapOrder, SwapStatus, TokenInfo, Venue};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Shown next to the quote. It is not applied to the minimum output.
pub const DEFAULT_SLIPPAGE_PERCENT: f64 = 1.0;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SwapPhase {
    #[default]
    Idle,
    Preparing,
    AwaitingConfirmation,
    Submitting,
    Submitted { swap_id: String },
    Polling { swap_id: String },
    Finished { swap_id: String, status: SwapStatus },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlowState {
    pub phase: SwapPhase,
    /// Order built from the route, tokens and amount at initiation. The
    /// wallet address is filled in on confirmation.
    pub pending_order: Option<SwapOrder>,
    pub prepared: Option<PreparedSwapMessage>,
    pub swap_id: Option<String>,
    pub is_swap_loading: bool,
    pub confirm_open: bool,
}

/// Everything the form knows when the user initiates or confirms a swap.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SwapRequest {
    pub sell_token: Option<TokenInfo>,
    pub buy_token: Option<TokenInfo>,
    /// Human amount of the sell token.
    pub sell_amount: String,
    /// Human amount of the buy token, as quoted.
    pub buy_amount: String,
    pub best_route: Option<Route>,
    pub user_address: Option<String>,
}

fn swap_order(
    route: &Route,
    sell: &TokenInfo,
    buy: &TokenInfo,
    sell_amount: &str,
    user_address: Option<&str>,
) -> SwapOrder {
    SwapOrder {
        route: route.clone(),
        from_token_id: sell.process_id.clone(),
        to_token_id: buy.process_id.clone(),
        amount: to_raw_units(sell_amount, sell.denomination),
        // TODO: derive the minimum from DEFAULT_SLIPPAGE_PERCENT once the
        // aggregator accepts a buffered minimum; today the raw estimate is sent.
        min_amount: route.estimated_output().unwrap_or("0").to_string(),
        user_address: user_address.map(str::to_string),
    }
}

/// Drives one swap attempt from initiation to settlement.
#[derive(Clone)]
pub struct SwapFlow {
    aggregator: Arc<dyn Aggregator>,
    signer: Option<Arc<dyn MessageSigner>>,
    attempt: Arc<AtomicU64>,
    state: Arc<watch::Sender<FlowState>>,
    tracker: StatusTracker,
}

impl SwapFlow {
    /// `on_terminal` runs after the attempt has moved to its finished phase.
    pub fn new(
        aggregator: Arc<dyn Aggregator>,
        signer: Option<Arc<dyn MessageSigner>>,
        status_poll: Duration,
        on_terminal: Option<TerminalHook>,
    ) -> Self {
        let (state, _) = watch::channel(FlowState::default());
        let state = Arc::new(state);

        let hook: TerminalHook = {
            let state = state.clone();
            Arc::new(move |status: SwapStatus| {
                state.send_if_modified(|s| {
                    let swap_id = match &s.phase {
                        SwapPhase::Submitted { swap_id } | SwapPhase::Polling { swap_id } => {
                            swap_id.clone()
                        }
                        _ => return false,
                    };
                    s.phase = SwapPhase::Finished { swap_id, status };
                    true
                });
                if let Some(on_terminal) = &on_terminal {
                    on_terminal(status);
                }
            })
        };

        Self {
            tracker: StatusTracker::new(aggregator.clone(), status_poll, Some(hook)),
            aggregator,
            signer,
            attempt: Arc::new(AtomicU64::new(0)),
            state,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<FlowState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> FlowState {
        self.state.borrow().clone()
    }

    pub fn status(&self) -> &StatusTracker {
        &self.tracker
    }

    /// Initiates an attempt: snapshots the order and, for permaswap, fetches
    /// the unsigned message to be signed on confirmation. Incomplete forms are
    /// ignored.
    pub async fn swap_click(&self, request: &SwapRequest) -> Result<(), SwapError> {
        let (Some(sell), Some(buy)) = (&request.sell_token, &request.buy_token) else {
            return Ok(());
        };
        if request.sell_amount.is_empty() || request.buy_amount.is_empty() {
            return Ok(());
        }

        let pending_order = request.best_route.as_ref().map(|route| {
            swap_order(
                route,
                sell,
                buy,
                &request.sell_amount,
                request.user_address.as_deref(),
            )
        });

        let attempt = self.attempt.fetch_add(1, Ordering::SeqCst) + 1;
        self.tracker.track(None);
        self.state.send_replace(FlowState {
            phase: SwapPhase::Preparing,
            pending_order: pending_order.clone(),
            prepared: None,
            swap_id: None,
            is_swap_loading: true,
            confirm_open: true,
        });

        let prepared = match &pending_order {
            Some(order) if order.route.venue() == Venue::Permaswap => {
                match self.aggregator.prepare_swap_message(order).await {
                    Ok(prepared) => Some(prepared),
                    Err(e) => {
                        tracing::error!(error = %e, "failed to prepare swap message");
                        if self.is_current(attempt) {
                            self.state.send_replace(FlowState::default());
                        }
                        return Err(e.into());
                    }
                }
            }
            _ => None,
        };

        self.state.send_if_modified(|s| {
            if !self.is_current(attempt) {
                return false;
            }
            s.phase = SwapPhase::AwaitingConfirmation;
            s.prepared = prepared;
            s.is_swap_loading = false;
            true
        });
        Ok(())
    }

    /// Submits the order snapshotted by `swap_click`; edits made to the form
    /// since then are not sent. Returns the swap id, or `None` when the request
    /// is incomplete or no attempt is awaiting confirmation.
    pub async fn confirm(&self, request: &SwapRequest) -> Result<Option<String>, SwapError> {
        let (Some(_), Some(_), Some(user)) = (
            &request.sell_token,
            &request.buy_token,
            request.user_address.as_deref(),
        ) else {
            return Ok(None);
        };
        if request.sell_amount.is_empty() {
            return Ok(None);
        }

        let mut claimed = None;
        self.state.send_if_modified(|s| {
            if s.phase != SwapPhase::AwaitingConfirmation {
                return false;
            }
            let Some(order) = s.pending_order.clone() else {
                return false;
            };
            s.phase = SwapPhase::Submitting;
            s.is_swap_loading = true;
            claimed = Some((order, s.prepared.clone(), self.attempt.load(Ordering::SeqCst)));
            true
        });
        let Some((mut order, prepared, attempt)) = claimed else {
            return Ok(None);
        };
        order.user_address = Some(user.to_string());
        let venue = order.route.venue();

        let result = self.submit(&order, prepared.as_ref()).await;

        match result {
            Ok(swap_id) => {
                tracing::info!(swap_id = %swap_id, venue = %venue, "swap submitted");
                if !self.is_current(attempt) {
                    return Ok(Some(swap_id));
                }
                self.state.send_modify(|s| {
                    s.swap_id = Some(swap_id.clone());
                    s.phase = SwapPhase::Submitted {
                        swap_id: swap_id.clone(),
                    };
                    s.is_swap_loading = false;
                });
                self.tracker.track(Some(swap_id.clone()));
                self.state.send_if_modified(|s| {
                    let SwapPhase::Submitted { swap_id } = &s.phase else {
                        return false;
                    };
                    s.phase = SwapPhase::Polling {
                        swap_id: swap_id.clone(),
                    };
                    true
                });
                Ok(Some(swap_id))
            }
            Err(e) => {
                tracing::error!(error = %e, venue = %venue, "swap submission failed");
                self.state.send_if_modified(|s| {
                    if !self.is_current(attempt) {
                        return false;
                    }
                    s.phase = SwapPhase::AwaitingConfirmation;
                    s.swap_id = None;
                    s.is_swap_loading = false;
                    true
                });
                Err(e)
            }
        }
    }

    async fn submit(
        &self,
        order: &SwapOrder,
        prepared: Option<&PreparedSwapMessage>,
    ) -> Result<String, SwapError> {
        match order.route.venue() {
            Venue::Botega => {
                let response = self.aggregator.execute_swap(order).await?;
                response.message_id.ok_or(SwapError::MissingMessageId)
            }
            Venue::Permaswap => {
                let prepared = prepared.ok_or(SwapError::NotPrepared(Venue::Permaswap))?;
                let signer = self
                    .signer
                    .as_ref()
                    .ok_or(SwapError::SignerUnavailable(Venue::Permaswap))?;
                Ok(signer.send(&prepared.unsigned_message).await?)
            }
        }
    }

    /// Abandons the current attempt and stops status polling.
    pub fn reset(&self) {
        self.attempt.fetch_add(1, Ordering::SeqCst);
        self.tracker.track(None);
        self.state.send_replace(FlowState::default());
    }

    fn is_current(&self, attempt: u64) -> bool {
        self.attempt.load(Ordering::SeqCst) == attempt
    }
}
