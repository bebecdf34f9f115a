use super::http::{build_client, join_segments, parse_url, send_json};
use super::Ledger;
use crate::error::ClientError;
use crate::types::{DryRunResult, Tag};
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Serialize;
use std::time::Duration;

/// Placeholder identity used for unsigned dry-run messages.
const DRY_RUN_ID: &str = "1234";

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct DryRunMessage<'a> {
    id: &'a str,
    target: &'a str,
    owner: &'a str,
    anchor: &'a str,
    data: &'a str,
    tags: Vec<Tag>,
}

/// Ledger lookups through an AO compute unit's dry-run endpoint.
#[derive(Debug, Clone)]
pub struct AoLedgerClient {
    http: Client,
    compute_unit: Url,
}

impl AoLedgerClient {
    pub fn new(compute_unit_url: &str, timeout: Duration) -> Result<Self, ClientError> {
        Ok(Self {
            http: build_client(timeout)?,
            compute_unit: parse_url(compute_unit_url)?,
        })
    }
}

#[async_trait]
impl Ledger for AoLedgerClient {
    async fn balance(
        &self,
        process_id: &str,
        address: &str,
    ) -> Result<DryRunResult, ClientError> {
        let mut url = join_segments(&self.compute_unit, &["dry-run"])?;
        url.query_pairs_mut().append_pair("process-id", process_id);

        let message = DryRunMessage {
            id: DRY_RUN_ID,
            target: process_id,
            owner: DRY_RUN_ID,
            anchor: "0",
            data: DRY_RUN_ID,
            tags: vec![
                Tag::new("Action", "Balance"),
                Tag::new("Recipient", address),
                Tag::new("Data-Protocol", "ao"),
                Tag::new("Type", "Message"),
                Tag::new("Variant", "ao.TN.1"),
            ],
        };

        send_json(self.http.post(url).json(&message), "Failed to fetch balance").await
    }
}
