use super::http::{build_client, join_segments, parse_url, send_json};
use super::Aggregator;
use crate::error::ClientError;
use crate::types::{
    ExecuteSwapResponse, PreparedSwapMessage, QuoteRequest, QuoteResult, ReverseQuoteRequest,
    SwapOrder, SwapStatusResponse,
};
use async_trait::async_trait;
use reqwest::{Client, Url};
use std::time::Duration;

/// HTTP client for the Vento aggregation API.
#[derive(Debug, Clone)]
pub struct VentoClient {
    http: Client,
    base_url: Url,
}

impl VentoClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ClientError> {
        Ok(Self {
            http: build_client(timeout)?,
            base_url: parse_url(base_url)?,
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, ClientError> {
        join_segments(&self.base_url, segments)
    }
}

#[async_trait]
impl Aggregator for VentoClient {
    async fn get_swap_quote(&self, request: &QuoteRequest) -> Result<QuoteResult, ClientError> {
        tracing::debug!(
            from = %request.from_token_id,
            to = %request.to_token_id,
            amount = %request.amount,
            "requesting swap quote"
        );
        let url = self.endpoint(&["quote"])?;
        send_json(self.http.post(url).json(request), "Failed to get quote").await
    }

    async fn get_reverse_quote(
        &self,
        request: &ReverseQuoteRequest,
    ) -> Result<QuoteResult, ClientError> {
        tracing::debug!(
            from = %request.from_token_id,
            to = %request.to_token_id,
            desired_output = %request.desired_output,
            "requesting reverse quote"
        );
        let url = self.endpoint(&["quote", "reverse"])?;
        send_json(self.http.post(url).json(request), "Failed to get quote").await
    }

    async fn execute_swap(&self, order: &SwapOrder) -> Result<ExecuteSwapResponse, ClientError> {
        let url = self.endpoint(&["swap", "execute"])?;
        send_json(self.http.post(url).json(order), "Failed to execute swap").await
    }

    async fn prepare_swap_message(
        &self,
        order: &SwapOrder,
    ) -> Result<PreparedSwapMessage, ClientError> {
        let url = self.endpoint(&["swap", "prepare"])?;
        send_json(self.http.post(url).json(order), "Failed to prepare swap").await
    }

    async fn get_swap_status(&self, swap_id: &str) -> Result<SwapStatusResponse, ClientError> {
        let url = self.endpoint(&["swap", "status", swap_id])?;
        send_json(self.http.get(url), "Failed to fetch swap status").await
    }
}
