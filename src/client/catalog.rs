use super::http::{build_client, parse_url, send_json};
use super::TokenSource;
use crate::error::ClientError;
use async_trait::async_trait;
use reqwest::{Client, Url};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct CatalogClient {
    http: Client,
    url: Url,
}

impl CatalogClient {
    pub fn new(url: &str, timeout: Duration) -> Result<Self, ClientError> {
        Ok(Self {
            http: build_client(timeout)?,
            url: parse_url(url)?,
        })
    }
}

#[async_trait]
impl TokenSource for CatalogClient {
    async fn fetch_tokens(&self) -> Result<serde_json::Value, ClientError> {
        send_json(self.http.get(self.url.clone()), "Failed to load tokens").await
    }
}
