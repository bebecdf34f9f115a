use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub log_dir: Option<String>,
    #[serde(default)]
    pub endpoints: Endpoints,
    #[serde(default)]
    pub timing: Timing,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    pub aggregator_url: String,
    pub token_catalog_url: String,
    pub price_oracle_url: String,
    pub ledger_url: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            aggregator_url: "https://api.ventoswap.com".into(),
            token_catalog_url: "https://api.ventoswap.com/app-config/tokens".into(),
            price_oracle_url: "https://api-eu.beaconwallet.dev/prices".into(),
            ledger_url: "https://cu.ao-testnet.xyz".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Timing {
    pub quote_debounce_ms: u64,
    pub price_poll_ms: u64,
    pub status_poll_ms: u64,
    /// Balance polling is off unless set.
    pub balance_poll_ms: Option<u64>,
    pub request_timeout_ms: u64,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            quote_debounce_ms: 400,
            price_poll_ms: 10_000,
            status_poll_ms: 3_000,
            balance_poll_ms: None,
            request_timeout_ms: 15_000,
        }
    }
}

impl Timing {
    pub fn quote_debounce(&self) -> Duration {
        Duration::from_millis(self.quote_debounce_ms)
    }

    pub fn price_poll(&self) -> Duration {
        Duration::from_millis(self.price_poll_ms)
    }

    pub fn status_poll(&self) -> Duration {
        Duration::from_millis(self.status_poll_ms)
    }

    pub fn balance_poll(&self) -> Option<Duration> {
        self.balance_poll_ms.map(Duration::from_millis)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, String> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| format!("failed to read config: {e}"))?;
        toml::from_str(&contents).map_err(|e| format!("failed to parse config: {e}"))
    }
}
