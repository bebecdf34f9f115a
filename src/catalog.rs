use crate::client::TokenSource;
use crate::error::ClientError;
use crate::types::TokenInfo;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::watch;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CatalogState {
    pub tokens: Vec<TokenInfo>,
    pub loading: bool,
    pub error: Option<String>,
}

/// The list of tradable tokens, loaded once and refreshed on demand.
#[derive(Clone)]
pub struct TokenCatalog {
    source: Arc<dyn TokenSource>,
    state: Arc<watch::Sender<CatalogState>>,
}

impl TokenCatalog {
    pub fn new(source: Arc<dyn TokenSource>) -> Self {
        let (state, _) = watch::channel(CatalogState::default());
        Self {
            source,
            state: Arc::new(state),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<CatalogState> {
        self.state.subscribe()
    }

    pub fn tokens(&self) -> Vec<TokenInfo> {
        self.state.borrow().tokens.clone()
    }

    /// Looks a token up by ticker or process id.
    pub fn find(&self, reference: &str) -> Option<TokenInfo> {
        self.state
            .borrow()
            .tokens
            .iter()
            .find(|t| t.matches(reference))
            .cloned()
    }

    pub async fn refresh(&self) -> Result<Vec<TokenInfo>, ClientError> {
        self.state.send_modify(|s| {
            s.loading = true;
            s.error = None;
        });

        match self.source.fetch_tokens().await {
            Ok(body) => {
                let tokens = parse_token_list(&body);
                tracing::info!(count = tokens.len(), "token catalog loaded");
                self.state.send_modify(|s| {
                    s.tokens = tokens.clone();
                    s.loading = false;
                });
                Ok(tokens)
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to load token catalog");
                self.state.send_modify(|s| {
                    s.loading = false;
                    s.error = Some(e.to_string());
                });
                Err(e)
            }
        }
    }
}

/// Keeps the well-formed entries of a catalog body. Anything that is not an
/// array yields an empty list.
pub fn parse_token_list(body: &Value) -> Vec<TokenInfo> {
    let Some(entries) = body.as_array() else {
        tracing::warn!("token catalog body is not an array");
        return Vec::new();
    };

    entries
        .iter()
        .filter_map(|entry| match token_from_entry(entry) {
            Some(token) => Some(token),
            None => {
                tracing::debug!(entry = %entry, "dropping malformed catalog entry");
                None
            }
        })
        .collect()
}

/// Amounts are padded to the denomination width, so larger values are
/// rejected rather than allocated.
pub const MAX_DENOMINATION: u32 = 255;

fn token_from_entry(entry: &Value) -> Option<TokenInfo> {
    let obj = entry.as_object()?;
    let text = |key: &str| obj.get(key)?.as_str().map(str::to_string);
    let denomination = u32::try_from(obj.get("denomination")?.as_u64()?).ok()?;
    if denomination > MAX_DENOMINATION {
        return None;
    }

    Some(TokenInfo {
        name: text("name")?,
        ticker: text("ticker")?,
        denomination,
        logo: text("logo")?,
        process_id: text("processId")?,
    })
}
