//! Debounced quote fetching.
//!
//! Input changes restart a debounce timer; when it fires the current
//! parameters are snapshotted and sent to the aggregator. Every dispatch and
//! every input change advances a sequence counter, and a response is applied
//! only while its sequence number is still the latest one issued.

use crate::client::Aggregator;
use crate::decimal::{is_positive_amount, to_human_units, to_raw_units};
use crate::task::TaskSlot;
use crate::types::{QuoteOutcome, QuoteRequest, QuoteResult, ReverseQuoteRequest, Route, TokenInfo};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::Instrument;

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(400);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QuoteDirection {
    /// The sell amount is known; quote the buy amount.
    #[default]
    Forward,
    /// The buy amount is known; quote the required sell amount.
    Reverse,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuoteParams {
    pub sell_token: Option<TokenInfo>,
    pub buy_token: Option<TokenInfo>,
    /// Human amount of the sell token (forward) or buy token (reverse).
    pub amount: String,
    pub direction: QuoteDirection,
    pub user_address: Option<String>,
}

impl QuoteParams {
    fn is_quotable(&self) -> bool {
        self.sell_token.is_some() && self.buy_token.is_some() && is_positive_amount(&self.amount)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuoteState {
    /// Human amount of the opposite token.
    pub output_amount: Option<String>,
    pub loading: bool,
    pub error: Option<String>,
    pub raw_quote: Option<QuoteResult>,
    pub best_route: Option<Route>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuoteAvailability {
    Idle,
    Loading,
    Failed,
    Ready,
    NoRoutes,
    EstimateFailed,
}

impl QuoteState {
    pub fn availability(&self) -> QuoteAvailability {
        if self.loading {
            return QuoteAvailability::Loading;
        }
        if self.error.is_some() {
            return QuoteAvailability::Failed;
        }
        match self.raw_quote.as_ref().map(QuoteResult::outcome) {
            None => QuoteAvailability::Idle,
            Some(QuoteOutcome::Routed) => QuoteAvailability::Ready,
            Some(QuoteOutcome::NoRoutes) => QuoteAvailability::NoRoutes,
            Some(QuoteOutcome::EstimateFailed) => QuoteAvailability::EstimateFailed,
        }
    }
}

struct Inner {
    aggregator: Arc<dyn Aggregator>,
    debounce: Duration,
    params: Mutex<QuoteParams>,
    latest: AtomicU64,
    timer: TaskSlot,
    state: watch::Sender<QuoteState>,
}

/// Quote fetcher for one swap form.
#[derive(Clone)]
pub struct QuoteClient {
    inner: Arc<Inner>,
}

impl QuoteClient {
    pub fn new(aggregator: Arc<dyn Aggregator>, debounce: Duration) -> Self {
        let (state, _) = watch::channel(QuoteState::default());
        Self {
            inner: Arc::new(Inner {
                aggregator,
                debounce,
                params: Mutex::new(QuoteParams::default()),
                latest: AtomicU64::new(0),
                timer: TaskSlot::default(),
                state,
            }),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<QuoteState> {
        self.inner.state.subscribe()
    }

    pub fn state(&self) -> QuoteState {
        self.inner.state.borrow().clone()
    }

    pub fn params(&self) -> QuoteParams {
        self.inner.params().clone()
    }

    /// Replaces the quote inputs and restarts the debounce timer.
    pub fn set_params(&self, params: QuoteParams) {
        self.update_params(|p| *p = params);
    }

    pub fn update_params(&self, update: impl FnOnce(&mut QuoteParams)) {
        let quotable = {
            let mut params = self.inner.params();
            update(&mut params);
            params.is_quotable()
        };
        self.inner.latest.fetch_add(1, Ordering::SeqCst);

        if !quotable {
            self.inner.timer.cancel();
            self.inner.state.send_replace(QuoteState::default());
            return;
        }

        let inner = self.inner.clone();
        self.inner.timer.spawn(
            async move {
                tokio::time::sleep(inner.debounce).await;
                // Detached so a later timer reset cannot abort an in-flight
                // request; staleness is decided by sequence number instead.
                inner.dispatch();
            }
            .in_current_span(),
        );
    }

    /// Dispatches immediately, cancelling any pending debounce timer.
    /// Returns `None` when the current inputs cannot be quoted.
    pub fn refetch(&self) -> Option<JoinHandle<()>> {
        self.inner.timer.cancel();
        self.inner.dispatch()
    }
}

impl Inner {
    fn params(&self) -> MutexGuard<'_, QuoteParams> {
        self.params.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn is_latest(&self, seq: u64) -> bool {
        self.latest.load(Ordering::SeqCst) == seq
    }

    fn dispatch(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        let params = self.params().clone();
        let seq = self.latest.fetch_add(1, Ordering::SeqCst) + 1;
        let (Some(sell), Some(buy)) = (params.sell_token.clone(), params.buy_token.clone()) else {
            return None;
        };
        if !is_positive_amount(&params.amount) {
            return None;
        }

        self.state.send_modify(|s| {
            s.loading = true;
            s.error = None;
        });

        let inner = self.clone();
        let handle = tokio::spawn(
            async move {
                let result = inner.fetch(&params, &sell, &buy).await;
                inner.apply(seq, &params, &sell, &buy, result);
            }
            .in_current_span(),
        );
        Some(handle)
    }

    async fn fetch(
        &self,
        params: &QuoteParams,
        sell: &TokenInfo,
        buy: &TokenInfo,
    ) -> Result<QuoteResult, crate::error::ClientError> {
        match params.direction {
            QuoteDirection::Forward => {
                let request = QuoteRequest {
                    from_token_id: sell.process_id.clone(),
                    to_token_id: buy.process_id.clone(),
                    amount: to_raw_units(&params.amount, sell.denomination),
                    user_address: params.user_address.clone(),
                };
                self.aggregator.get_swap_quote(&request).await
            }
            QuoteDirection::Reverse => {
                let request = ReverseQuoteRequest {
                    from_token_id: sell.process_id.clone(),
                    to_token_id: buy.process_id.clone(),
                    desired_output: to_raw_units(&params.amount, buy.denomination),
                    user_address: params.user_address.clone(),
                };
                self.aggregator.get_reverse_quote(&request).await
            }
        }
    }

    fn apply(
        &self,
        seq: u64,
        params: &QuoteParams,
        sell: &TokenInfo,
        buy: &TokenInfo,
        result: Result<QuoteResult, crate::error::ClientError>,
    ) {
        let next = match result {
            Ok(quote) => {
                let route = quote.best_route.clone();
                let output = route.as_ref().and_then(|r| match params.direction {
                    QuoteDirection::Forward => r
                        .estimated_output()
                        .map(|raw| to_human_units(raw, buy.denomination)),
                    QuoteDirection::Reverse => r
                        .required_input()
                        .map(|raw| to_human_units(raw, sell.denomination)),
                });
                QuoteState {
                    output_amount: output,
                    loading: false,
                    error: None,
                    raw_quote: Some(quote),
                    best_route: route,
                }
            }
            Err(e) => QuoteState {
                output_amount: None,
                loading: false,
                error: Some(e.to_string()),
                raw_quote: None,
                best_route: None,
            },
        };

        let applied = self.state.send_if_modified(|state| {
            if !self.is_latest(seq) {
                return false;
            }
            *state = next.clone();
            true
        });

        if !applied {
            tracing::debug!(seq, amount = %params.amount, "dropping stale quote response");
        } else if let Some(error) = &next.error {
            tracing::warn!(seq, error = %error, "quote request failed");
        } else {
            tracing::debug!(seq, output = ?next.output_amount, "quote applied");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::test_fixtures::MockAggregator;
    use crate::error::ClientError;
    use crate::types::token::test_fixtures::{ao, usdc};
    use tracing_test::traced_test;

    fn forward(amount: &str) -> QuoteParams {
        QuoteParams {
            sell_token: Some(usdc()),
            buy_token: Some(ao()),
            amount: amount.to_string(),
            direction: QuoteDirection::Forward,
            user_address: Some("wallet-1".to_string()),
        }
    }

    fn client() -> (Arc<MockAggregator>, QuoteClient) {
        let aggregator = Arc::new(MockAggregator::default());
        let client = QuoteClient::new(aggregator.clone(), DEFAULT_DEBOUNCE);
        (aggregator, client)
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(500)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_rapid_inputs_issue_one_request() {
        let (aggregator, client) = client();

        client.set_params(forward("1"));
        tokio::time::sleep(Duration::from_millis(100)).await;
        client.set_params(forward("2"));
        tokio::time::sleep(Duration::from_millis(100)).await;
        client.set_params(forward("3"));
        settle().await;

        assert_eq!(aggregator.quote_amounts(), vec!["3000000"]);
        let state = client.state();
        // echo route: 3_000_000 raw units of a 12-decimal token
        assert_eq!(state.output_amount.as_deref(), Some("0.000003"));
        assert!(!state.loading);
        assert_eq!(state.availability(), QuoteAvailability::Ready);
    }

    #[tokio::test(start_paused = true)]
    #[traced_test]
    async fn test_stale_response_is_dropped() {
        let (aggregator, client) = client();
        aggregator.delay_for("1000000", Duration::from_secs(2));

        client.set_params(forward("1"));
        settle().await;
        assert!(client.state().loading);

        client.set_params(forward("2"));
        settle().await;
        assert_eq!(client.state().output_amount.as_deref(), Some("0.000002"));

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(aggregator.quote_amounts(), vec!["1000000", "2000000"]);
        assert_eq!(client.state().output_amount.as_deref(), Some("0.000002"));
        assert!(logs_contain("dropping stale quote response"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_input_clears_without_request() {
        let (aggregator, client) = client();
        client.set_params(forward("5"));
        settle().await;
        assert!(client.state().output_amount.is_some());

        for amount in ["", "0", "0.000", "abc", "-1"] {
            client.set_params(forward(amount));
            settle().await;
            assert_eq!(client.state(), QuoteState::default());
        }

        client.update_params(|p| {
            p.amount = "4".into();
            p.buy_token = None;
        });
        settle().await;
        assert_eq!(client.state().availability(), QuoteAvailability::Idle);
        assert_eq!(aggregator.quote_amounts().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reverse_quote_converts_both_ways() {
        let (aggregator, client) = client();
        client.set_params(QuoteParams {
            direction: QuoteDirection::Reverse,
            ..forward("0.5")
        });
        settle().await;

        let calls = aggregator.reverse_calls.lock().unwrap().clone();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].desired_output, "500000000000");
        // required input echoes the desired output, read in USDC's 6 decimals
        assert_eq!(client.state().output_amount.as_deref(), Some("500000"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_error_clears_output_and_route() {
        let (aggregator, client) = client();
        client.set_params(forward("1"));
        settle().await;
        assert!(client.state().best_route.is_some());

        aggregator.set_quote_result(Err(ClientError::Rejected("no liquidity".into())));
        client.refetch().unwrap().await.unwrap();

        let state = client.state();
        assert_eq!(state.error.as_deref(), Some("no liquidity"));
        assert!(state.output_amount.is_none());
        assert!(state.best_route.is_none());
        assert_eq!(state.availability(), QuoteAvailability::Failed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refetch_bypasses_debounce() {
        let (aggregator, client) = client();
        client.set_params(forward("7"));
        client.refetch().unwrap().await.unwrap();
        assert_eq!(aggregator.quote_amounts(), vec!["7000000"]);

        settle().await;
        assert_eq!(aggregator.quote_amounts().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_routes_and_estimate_failed() {
        let (aggregator, client) = client();
        aggregator.set_quote_result(Ok(QuoteResult {
            best_route: None,
            total_routes_found: 0,
        }));
        client.set_params(forward("1"));
        settle().await;
        assert_eq!(client.state().availability(), QuoteAvailability::NoRoutes);
        assert!(client.state().output_amount.is_none());

        aggregator.set_quote_result(Ok(QuoteResult {
            best_route: None,
            total_routes_found: 4,
        }));
        client.refetch().unwrap().await.unwrap();
        assert_eq!(
            client.state().availability(),
            QuoteAvailability::EstimateFailed
        );
    }
}
