use super::http::{build_client, parse_url, send_json};
use super::PriceOracle;
use crate::error::ClientError;
use crate::types::TokenPrices;
use async_trait::async_trait;
use reqwest::{Client, Url};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct PriceOracleClient {
    http: Client,
    url: Url,
}

impl PriceOracleClient {
    pub fn new(url: &str, timeout: Duration) -> Result<Self, ClientError> {
        Ok(Self {
            http: build_client(timeout)?,
            url: parse_url(url)?,
        })
    }
}

#[async_trait]
impl PriceOracle for PriceOracleClient {
    async fn fetch_prices(&self, process_ids: &[String]) -> Result<TokenPrices, ClientError> {
        let mut url = self.url.clone();
        {
            let mut query = url.query_pairs_mut();
            for id in process_ids {
                query.append_pair("processes", id);
            }
        }
        send_json(self.http.get(url), "Failed to fetch token prices").await
    }
}
