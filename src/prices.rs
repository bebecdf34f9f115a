use crate::client::PriceOracle;
use crate::task::TaskSlot;
use crate::types::TokenPrices;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::Instrument;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceState {
    pub prices: Option<TokenPrices>,
    pub loading: bool,
    pub error: Option<String>,
}

impl PriceState {
    pub fn price_of(&self, process_id: &str) -> Option<f64> {
        self.prices.as_ref()?.price_of(process_id)
    }
}

struct Inner {
    oracle: Arc<dyn PriceOracle>,
    poll_interval: Duration,
    ids: Mutex<Vec<String>>,
    poller: TaskSlot,
    state: watch::Sender<PriceState>,
}

/// Polls USD prices for a set of tokens, one batch request per tick.
#[derive(Clone)]
pub struct PriceFetcher {
    inner: Arc<Inner>,
}

impl PriceFetcher {
    pub fn new(oracle: Arc<dyn PriceOracle>, poll_interval: Duration) -> Self {
        let (state, _) = watch::channel(PriceState::default());
        Self {
            inner: Arc::new(Inner {
                oracle,
                poll_interval,
                ids: Mutex::new(Vec::new()),
                poller: TaskSlot::default(),
                state,
            }),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<PriceState> {
        self.inner.state.subscribe()
    }

    pub fn state(&self) -> PriceState {
        self.inner.state.borrow().clone()
    }

    /// Replaces the tracked token set. Duplicates are dropped, first
    /// occurrence wins. An unchanged set keeps the running poller.
    pub fn set_tokens<I, S>(&self, process_ids: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut ids: Vec<String> = Vec::new();
        for id in process_ids {
            let id = id.into();
            if !ids.contains(&id) {
                ids.push(id);
            }
        }

        {
            let mut current = self.inner.ids();
            if *current == ids && (ids.is_empty() || self.inner.poller.is_active()) {
                return;
            }
            *current = ids.clone();
        }

        self.inner.poller.cancel();
        if ids.is_empty() {
            self.inner.state.send_replace(PriceState::default());
            return;
        }
        self.inner.start_polling(ids);
    }
}

impl Inner {
    fn ids(&self) -> MutexGuard<'_, Vec<String>> {
        self.ids.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn start_polling(self: &Arc<Self>, ids: Vec<String>) {
        let weak: Weak<Inner> = Arc::downgrade(self);
        let period = self.poll_interval;
        self.poller.spawn(
            async move {
                let mut ticker = tokio::time::interval(period);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
                loop {
                    ticker.tick().await;
                    let Some(inner) = weak.upgrade() else {
                        break;
                    };
                    inner.fetch(&ids).await;
                }
            }
            .in_current_span(),
        );
    }

    async fn fetch(&self, ids: &[String]) {
        self.state.send_modify(|s| s.loading = true);
        match self.oracle.fetch_prices(ids).await {
            Ok(prices) => {
                tracing::debug!(count = prices.prices.processes.len(), "prices updated");
                self.state.send_replace(PriceState {
                    prices: Some(prices),
                    loading: false,
                    error: None,
                });
            }
            Err(e) => {
                tracing::warn!(error = %e, "price fetch failed");
                self.state.send_replace(PriceState {
                    prices: None,
                    loading: false,
                    error: Some(e.to_string()),
                });
            }
        }
    }
}
