use crate::client::Ledger;
use crate::decimal::to_human_units;
use crate::task::TaskSlot;
use crate::types::TokenInfo;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::Instrument;

/// Whose balance of which token is being tracked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceSubject {
    pub token: TokenInfo,
    pub address: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BalanceState {
    /// Human amount, `None` until the first successful fetch for the subject.
    pub balance: Option<String>,
    pub loading: bool,
    pub error: Option<String>,
}

struct Inner {
    ledger: Arc<dyn Ledger>,
    poll_interval: Option<Duration>,
    subject: Mutex<Option<BalanceSubject>>,
    epoch: AtomicU64,
    fetch: TaskSlot,
    poller: TaskSlot,
    state: watch::Sender<BalanceState>,
}

/// Tracks one token balance for one wallet.
#[derive(Clone)]
pub struct BalanceFetcher {
    inner: Arc<Inner>,
}

impl BalanceFetcher {
    pub fn new(ledger: Arc<dyn Ledger>, poll_interval: Option<Duration>) -> Self {
        let (state, _) = watch::channel(BalanceState::default());
        Self {
            inner: Arc::new(Inner {
                ledger,
                poll_interval,
                subject: Mutex::new(None),
                epoch: AtomicU64::new(0),
                fetch: TaskSlot::default(),
                poller: TaskSlot::default(),
                state,
            }),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<BalanceState> {
        self.inner.state.subscribe()
    }

    pub fn state(&self) -> BalanceState {
        self.inner.state.borrow().clone()
    }

    pub fn subject(&self) -> Option<BalanceSubject> {
        self.inner.subject().clone()
    }

    /// Switches to a new subject. Work for the previous subject is aborted
    /// and can no longer write state.
    pub fn set_subject(&self, subject: Option<BalanceSubject>) {
        {
            let mut current = self.inner.subject();
            if *current == subject {
                return;
            }
            *current = subject.clone();
        }
        self.inner.epoch.fetch_add(1, Ordering::SeqCst);
        self.inner.fetch.cancel();
        self.inner.poller.cancel();
        self.inner.state.send_replace(BalanceState::default());

        let Some(subject) = subject else {
            return;
        };
        tracing::debug!(
            token = %subject.token.ticker,
            address = %subject.address,
            "balance subject changed"
        );
        self.inner.spawn_fetch();
        if let Some(period) = self.inner.poll_interval {
            self.inner.start_polling(period);
        }
    }

    /// Fetches now. Returns `None` when there is no subject.
    pub fn refetch(&self) -> Option<JoinHandle<()>> {
        self.inner.spawn_fetch()
    }
}

impl Inner {
    fn subject(&self) -> MutexGuard<'_, Option<BalanceSubject>> {
        self.subject.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn spawn_fetch(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        let subject = self.subject().clone()?;
        let epoch = self.epoch.load(Ordering::SeqCst);
        self.state.send_modify(|s| s.loading = true);

        let inner = self.clone();
        let handle = self.fetch.spawn(
            async move {
                let result = inner
                    .ledger
                    .balance(&subject.token.process_id, &subject.address)
                    .await;

                let written = inner.state.send_if_modified(|state| {
                    if inner.epoch.load(Ordering::SeqCst) != epoch {
                        return false;
                    }
                    state.loading = false;
                    match &result {
                        Ok(reply) => {
                            let raw = reply.raw_balance();
                            state.balance = Some(to_human_units(&raw, subject.token.denomination));
                            state.error = None;
                        }
                        Err(e) => {
                            state.balance = None;
                            state.error = Some(e.to_string());
                        }
                    }
                    true
                });

                match (written, &result) {
                    (false, _) => tracing::debug!(
                        token = %subject.token.ticker,
                        "discarding balance for superseded subject"
                    ),
                    (true, Err(e)) => tracing::warn!(
                        token = %subject.token.ticker,
                        error = %e,
                        "balance fetch failed"
                    ),
                    (true, Ok(_)) => {}
                }
            }
            .in_current_span(),
        );
        Some(handle)
    }

    fn start_polling(self: &Arc<Self>, period: Duration) {
        let weak: Weak<Inner> = Arc::downgrade(self);
        self.poller.spawn(
            async move {
                let mut ticker = interval_at(Instant::now() + period, period);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
                loop {
                    ticker.tick().await;
                    let Some(inner) = weak.upgrade() else {
                        break;
                    };
                    inner.spawn_fetch();
                }
            }
            .in_current_span(),
        );
    }
}
