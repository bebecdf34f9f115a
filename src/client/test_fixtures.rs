//! In-memory service doubles for component tests.

use super::{Aggregator, Ledger, MessageSigner, PriceOracle, TokenSource};
use crate::error::ClientError;
use crate::types::{
    BotegaRoute, DryRunResult, ExecuteSwapResponse, LedgerMessage, PreparedSwapMessage,
    QuoteRequest, QuoteResult, ReverseQuoteRequest, Route, SwapOrder, SwapStatus,
    SwapStatusResponse, Tag, TokenPriceEntry, TokenPrices, UnsignedMessage,
};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

/// Aggregator double. Unless a fixed result is set, quotes echo the request:
/// a botega route whose estimated output equals the input amount, and whose
/// required input equals the desired output.
#[derive(Default)]
pub struct MockAggregator {
    delays: Mutex<HashMap<String, Duration>>,
    quote_result: Mutex<Option<Result<QuoteResult, ClientError>>>,
    execute_result: Mutex<Option<Result<ExecuteSwapResponse, ClientError>>>,
    prepare_result: Mutex<Option<Result<PreparedSwapMessage, ClientError>>>,
    statuses: Mutex<VecDeque<Result<SwapStatus, ClientError>>>,
    pub quote_calls: Mutex<Vec<QuoteRequest>>,
    pub reverse_calls: Mutex<Vec<ReverseQuoteRequest>>,
    pub execute_calls: Mutex<Vec<SwapOrder>>,
    pub prepare_calls: Mutex<Vec<SwapOrder>>,
    pub status_calls: Mutex<Vec<String>>,
}

impl MockAggregator {
    /// Delays the quote or execution whose raw amount (or desired output)
    /// equals `amount`.
    pub fn delay_for(&self, amount: &str, delay: Duration) {
        self.delays
            .lock()
            .unwrap()
            .insert(amount.to_string(), delay);
    }

    pub fn set_quote_result(&self, result: Result<QuoteResult, ClientError>) {
        *self.quote_result.lock().unwrap() = Some(result);
    }

    pub fn set_execute_result(&self, result: Result<ExecuteSwapResponse, ClientError>) {
        *self.execute_result.lock().unwrap() = Some(result);
    }

    pub fn set_prepare_result(&self, result: Result<PreparedSwapMessage, ClientError>) {
        *self.prepare_result.lock().unwrap() = Some(result);
    }

    /// Statuses returned in order; the last one repeats.
    pub fn push_status(&self, status: Result<SwapStatus, ClientError>) {
        self.statuses.lock().unwrap().push_back(status);
    }

    pub fn quote_amounts(&self) -> Vec<String> {
        self.quote_calls
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.amount.clone())
            .collect()
    }

    pub fn status_call_count(&self) -> usize {
        self.status_calls.lock().unwrap().len()
    }

    async fn pause_for(&self, amount: &str) {
        let delay = self.delays.lock().unwrap().get(amount).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }

    fn fixed_quote(&self) -> Option<Result<QuoteResult, ClientError>> {
        self.quote_result.lock().unwrap().clone()
    }
}

fn echo_route(estimated_output: Option<&str>, required_input: Option<&str>) -> QuoteResult {
    QuoteResult {
        best_route: Some(Route::Botega(BotegaRoute {
            hops: 1,
            estimated_output: estimated_output.map(str::to_string),
            required_input: required_input.map(str::to_string),
            estimated_fee: None,
            intermediate_token_id: None,
            intermediate_estimated_fee: None,
        })),
        total_routes_found: 1,
    }
}

#[async_trait]
impl Aggregator for MockAggregator {
    async fn get_swap_quote(&self, request: &QuoteRequest) -> Result<QuoteResult, ClientError> {
        self.quote_calls.lock().unwrap().push(request.clone());
        self.pause_for(&request.amount).await;
        self.fixed_quote()
            .unwrap_or_else(|| Ok(echo_route(Some(&request.amount), None)))
    }

    async fn get_reverse_quote(
        &self,
        request: &ReverseQuoteRequest,
    ) -> Result<QuoteResult, ClientError> {
        self.reverse_calls.lock().unwrap().push(request.clone());
        self.pause_for(&request.desired_output).await;
        self.fixed_quote().unwrap_or_else(|| {
            Ok(echo_route(
                Some(&request.desired_output),
                Some(&request.desired_output),
            ))
        })
    }

    async fn execute_swap(&self, order: &SwapOrder) -> Result<ExecuteSwapResponse, ClientError> {
        self.execute_calls.lock().unwrap().push(order.clone());
        self.pause_for(&order.amount).await;
        self.execute_result.lock().unwrap().clone().unwrap_or_else(|| {
            Ok(ExecuteSwapResponse {
                message_id: Some("msg-1".to_string()),
            })
        })
    }

    async fn prepare_swap_message(
        &self,
        order: &SwapOrder,
    ) -> Result<PreparedSwapMessage, ClientError> {
        self.prepare_calls.lock().unwrap().push(order.clone());
        self.prepare_result
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| Ok(prepared_message(&order.from_token_id)))
    }

    async fn get_swap_status(&self, swap_id: &str) -> Result<SwapStatusResponse, ClientError> {
        self.status_calls.lock().unwrap().push(swap_id.to_string());
        let mut statuses = self.statuses.lock().unwrap();
        let next = if statuses.len() > 1 {
            statuses.pop_front()
        } else {
            statuses.front().cloned()
        };
        next.unwrap_or(Ok(SwapStatus::Pending))
            .map(|status| SwapStatusResponse {
                status,
                details: None,
            })
    }
}

pub fn prepared_message(process: &str) -> PreparedSwapMessage {
    PreparedSwapMessage {
        unsigned_message: UnsignedMessage {
            process: process.to_string(),
            tags: vec![Tag::new("Action", "Transfer")],
            data: None,
        },
    }
}

/// Ledger double answering from a per-process balance table.
#[derive(Default)]
pub struct MockLedger {
    balances: Mutex<HashMap<String, Result<String, ClientError>>>,
    delays: Mutex<HashMap<String, Duration>>,
    pub calls: Mutex<Vec<(String, String)>>,
    /// Process ids whose fetch ran past its delay, i.e. was not aborted.
    pub completed: Mutex<Vec<String>>,
}

impl MockLedger {
    pub fn set_balance(&self, process_id: &str, raw: &str) {
        self.balances
            .lock()
            .unwrap()
            .insert(process_id.to_string(), Ok(raw.to_string()));
    }

    pub fn set_error(&self, process_id: &str, error: ClientError) {
        self.balances
            .lock()
            .unwrap()
            .insert(process_id.to_string(), Err(error));
    }

    pub fn delay_for(&self, process_id: &str, delay: Duration) {
        self.delays
            .lock()
            .unwrap()
            .insert(process_id.to_string(), delay);
    }

    pub fn calls_for(&self, process_id: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(pid, _)| pid == process_id)
            .count()
    }
}

#[async_trait]
impl Ledger for MockLedger {
    async fn balance(
        &self,
        process_id: &str,
        address: &str,
    ) -> Result<DryRunResult, ClientError> {
        self.calls
            .lock()
            .unwrap()
            .push((process_id.to_string(), address.to_string()));
        let delay = self.delays.lock().unwrap().get(process_id).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.completed.lock().unwrap().push(process_id.to_string());
        let raw = self
            .balances
            .lock()
            .unwrap()
            .get(process_id)
            .cloned()
            .unwrap_or_else(|| Ok("0".to_string()))?;
        Ok(DryRunResult {
            messages: vec![LedgerMessage {
                data: Some(serde_json::Value::String(raw.clone())),
                tags: vec![Tag::new("Balance", &raw)],
            }],
        })
    }
}

#[derive(Default)]
pub struct MockPriceOracle {
    prices: Mutex<HashMap<String, f64>>,
    failure: Mutex<Option<ClientError>>,
    pub calls: Mutex<Vec<Vec<String>>>,
}

impl MockPriceOracle {
    pub fn set_price(&self, process_id: &str, price: f64) {
        self.prices
            .lock()
            .unwrap()
            .insert(process_id.to_string(), price);
    }

    pub fn fail_with(&self, error: Option<ClientError>) {
        *self.failure.lock().unwrap() = error;
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl PriceOracle for MockPriceOracle {
    async fn fetch_prices(&self, process_ids: &[String]) -> Result<TokenPrices, ClientError> {
        self.calls.lock().unwrap().push(process_ids.to_vec());
        if let Some(error) = self.failure.lock().unwrap().clone() {
            return Err(error);
        }
        let prices = self.prices.lock().unwrap();
        let mut result = TokenPrices {
            currency: "usd".to_string(),
            ..Default::default()
        };
        result.prices.processes = process_ids
            .iter()
            .filter_map(|id| {
                prices.get(id).map(|price| TokenPriceEntry {
                    id: id.clone(),
                    price: *price,
                    is_outdated: false,
                })
            })
            .collect();
        Ok(result)
    }
}

pub struct MockTokenSource {
    pub body: Mutex<Result<serde_json::Value, ClientError>>,
}

impl MockTokenSource {
    pub fn new(body: serde_json::Value) -> Self {
        Self {
            body: Mutex::new(Ok(body)),
        }
    }
}

#[async_trait]
impl TokenSource for MockTokenSource {
    async fn fetch_tokens(&self) -> Result<serde_json::Value, ClientError> {
        self.body.lock().unwrap().clone()
    }
}

#[derive(Default)]
pub struct MockSigner {
    failure: Mutex<Option<ClientError>>,
    pub sent: Mutex<Vec<UnsignedMessage>>,
}

impl MockSigner {
    pub fn fail_with(&self, error: ClientError) {
        *self.failure.lock().unwrap() = Some(error);
    }
}

#[async_trait]
impl MessageSigner for MockSigner {
    async fn send(&self, message: &UnsignedMessage) -> Result<String, ClientError> {
        if let Some(error) = self.failure.lock().unwrap().clone() {
            return Err(error);
        }
        let mut sent = self.sent.lock().unwrap();
        sent.push(message.clone());
        Ok(format!("signed-{}", sent.len()))
    }
}
