use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPriceEntry {
    pub id: String,
    pub price: f64,
    #[serde(default)]
    pub is_outdated: bool,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PriceTable {
    #[serde(default)]
    pub ar: f64,
    #[serde(default)]
    pub ao: f64,
    #[serde(default)]
    pub processes: Vec<TokenPriceEntry>,
}

/// Oracle response for one batch of token ids.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TokenPrices {
    pub currency: String,
    #[serde(default)]
    pub prices: PriceTable,
}

impl TokenPrices {
    pub fn entry(&self, process_id: &str) -> Option<&TokenPriceEntry> {
        self.prices.processes.iter().find(|p| p.id == process_id)
    }

    pub fn price_of(&self, process_id: &str) -> Option<f64> {
        self.entry(process_id).map(|p| p.price)
    }
}
