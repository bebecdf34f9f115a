use crate::client::Aggregator;
use crate::task::TaskSlot;
use crate::types::SwapStatus;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::Instrument;

pub const DEFAULT_STATUS_POLL: Duration = Duration::from_secs(3);

/// Called once per tracked swap when it reaches a terminal status.
pub type TerminalHook = Arc<dyn Fn(SwapStatus) + Send + Sync>;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatusState {
    pub swap_id: Option<String>,
    pub status: Option<SwapStatus>,
    pub details: Option<serde_json::Value>,
    pub loading: bool,
    pub error: Option<String>,
}

impl StatusState {
    pub fn is_completed(&self) -> bool {
        self.status.is_some_and(SwapStatus::is_terminal)
    }
}

struct Inner {
    aggregator: Arc<dyn Aggregator>,
    poll_interval: Duration,
    epoch: AtomicU64,
    poller: TaskSlot,
    state: watch::Sender<StatusState>,
    on_terminal: Option<TerminalHook>,
}

/// Polls the settlement status of one submitted swap at a time.
#[derive(Clone)]
pub struct StatusTracker {
    inner: Arc<Inner>,
}

impl StatusTracker {
    pub fn new(
        aggregator: Arc<dyn Aggregator>,
        poll_interval: Duration,
        on_terminal: Option<TerminalHook>,
    ) -> Self {
        let (state, _) = watch::channel(StatusState::default());
        Self {
            inner: Arc::new(Inner {
                aggregator,
                poll_interval,
                epoch: AtomicU64::new(0),
                poller: TaskSlot::default(),
                state,
                on_terminal,
            }),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<StatusState> {
        self.inner.state.subscribe()
    }

    pub fn state(&self) -> StatusState {
        self.inner.state.borrow().clone()
    }

    pub fn is_polling(&self) -> bool {
        self.inner.poller.is_active()
    }

    /// Switches the tracked swap. Polling for the previous id stops at once.
    pub fn track(&self, swap_id: Option<String>) {
        let epoch = self.inner.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        self.inner.poller.cancel();
        self.inner.state.send_replace(StatusState {
            swap_id: swap_id.clone(),
            ..Default::default()
        });

        if let Some(swap_id) = swap_id {
            tracing::info!(swap_id = %swap_id, "tracking swap status");
            self.inner.start_polling(swap_id, epoch);
        }
    }

    /// Stops polling and keeps the last observed status.
    pub fn stop(&self) {
        self.inner.epoch.fetch_add(1, Ordering::SeqCst);
        self.inner.poller.cancel();
        self.inner.state.send_if_modified(|s| std::mem::replace(&mut s.loading, false));
    }
}

impl Inner {
    fn start_polling(self: &Arc<Self>, swap_id: String, epoch: u64) {
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
                    if let Some(status) = inner.poll_once(&swap_id, epoch).await {
                        if status.is_terminal() {
                            tracing::info!(swap_id = %swap_id, status = ?status, "swap settled");
                            if let Some(hook) = &inner.on_terminal {
                                hook(status);
                            }
                            break;
                        }
                    }
                }
            }
            .in_current_span(),
        );
    }

    /// Returns the status written for this subject, if any.
    async fn poll_once(&self, swap_id: &str, epoch: u64) -> Option<SwapStatus> {
        self.state.send_modify(|s| s.loading = true);
        let result = self.aggregator.get_swap_status(swap_id).await;

        let current = || self.epoch.load(Ordering::SeqCst) == epoch;
        let mut written = None;
        self.state.send_if_modified(|state| {
            if !current() {
                return false;
            }
            state.loading = false;
            match &result {
                Ok(response) => {
                    state.status = Some(response.status);
                    state.details = response.details.clone();
                    state.error = None;
                    written = Some(response.status);
                }
                Err(e) => {
                    state.error = Some(e.to_string());
                }
            }
            true
        });

        if let Err(e) = &result {
            tracing::warn!(swap_id = %swap_id, error = %e, "swap status poll failed");
        }
        written
    }
}
