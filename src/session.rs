//! The swap form as a whole: token selection, amount entry, derived display
//! values and the wiring between quote, balance, price and swap components.

use crate::balance::{BalanceFetcher, BalanceSubject};
use crate::catalog::TokenCatalog;
use crate::client::{Aggregator, Ledger, MessageSigner, PriceOracle};
use crate::config::Timing;
use crate::decimal::{compare_amounts, is_numeric_amount, is_positive_amount};
use crate::error::SwapError;
use crate::format::{format_currency, format_token_amount};
use crate::prices::PriceFetcher;
use crate::quote::{QuoteAvailability, QuoteClient, QuoteParams};
use crate::swap::{swap_fee, SwapFlow, SwapRequest, TerminalHook, DEFAULT_SLIPPAGE_PERCENT};
use crate::task::TaskSlot;
use crate::types::{SwapStatus, TokenInfo};
use std::cmp::Ordering;
use std::sync::{Arc, Weak};
use tokio::sync::watch;
use tracing::Instrument;

const PROCESSING_TEXT: &str = "Processing...";

/// External services a session talks to.
#[derive(Clone)]
pub struct Services {
    pub aggregator: Arc<dyn Aggregator>,
    pub ledger: Arc<dyn Ledger>,
    pub oracle: Arc<dyn PriceOracle>,
    /// Needed for permaswap routes only.
    pub signer: Option<Arc<dyn MessageSigner>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormState {
    pub sell_token: Option<TokenInfo>,
    pub buy_token: Option<TokenInfo>,
    pub sell_amount: String,
    pub user_address: Option<String>,
}

/// Display values derived from the form and every component's state.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionView {
    pub sell_token: Option<TokenInfo>,
    pub buy_token: Option<TokenInfo>,
    pub sell_amount: String,
    /// Formatted quoted amount; empty while loading or when there is no quote.
    pub buy_amount: String,
    pub sell_balance: Option<String>,
    pub buy_balance: Option<String>,
    pub sell_usd: String,
    pub buy_usd: String,
    pub exchange_rate: Option<String>,
    pub fee: Option<String>,
    pub slippage_percent: f64,
    pub is_sell_amount_valid: bool,
    pub quote_loading: bool,
    pub quote_error: Option<String>,
    pub no_routes: bool,
    pub estimate_failed: bool,
    pub swap_id: Option<String>,
    pub status_text: Option<String>,
}

struct Inner {
    catalog: TokenCatalog,
    quote: QuoteClient,
    sell_balance: BalanceFetcher,
    buy_balance: BalanceFetcher,
    prices: PriceFetcher,
    flow: SwapFlow,
    form: watch::Sender<FormState>,
    wallet_listener: TaskSlot,
}

#[derive(Clone)]
pub struct SwapSession {
    inner: Arc<Inner>,
}

impl SwapSession {
    pub fn new(services: Services, catalog: TokenCatalog, timing: &Timing) -> Self {
        let sell_balance = BalanceFetcher::new(services.ledger.clone(), timing.balance_poll());
        let buy_balance = BalanceFetcher::new(services.ledger.clone(), timing.balance_poll());

        let refresh_balances: TerminalHook = {
            let sell = sell_balance.clone();
            let buy = buy_balance.clone();
            Arc::new(move |status: SwapStatus| {
                tracing::info!(status = ?status, "swap finished, refreshing balances");
                sell.refetch();
                buy.refetch();
            })
        };

        let (form, _) = watch::channel(FormState::default());
        Self {
            inner: Arc::new(Inner {
                catalog,
                quote: QuoteClient::new(services.aggregator.clone(), timing.quote_debounce()),
                sell_balance,
                buy_balance,
                prices: PriceFetcher::new(services.oracle, timing.price_poll()),
                flow: SwapFlow::new(
                    services.aggregator,
                    services.signer,
                    timing.status_poll(),
                    Some(refresh_balances),
                ),
                form,
                wallet_listener: TaskSlot::default(),
            }),
        }
    }

    pub fn catalog(&self) -> &TokenCatalog {
        &self.inner.catalog
    }

    pub fn quote(&self) -> &QuoteClient {
        &self.inner.quote
    }

    pub fn flow(&self) -> &SwapFlow {
        &self.inner.flow
    }

    pub fn sell_balance(&self) -> &BalanceFetcher {
        &self.inner.sell_balance
    }

    pub fn buy_balance(&self) -> &BalanceFetcher {
        &self.inner.buy_balance
    }

    pub fn prices(&self) -> &PriceFetcher {
        &self.inner.prices
    }

    pub fn subscribe(&self) -> watch::Receiver<FormState> {
        self.inner.form.subscribe()
    }

    pub fn form(&self) -> FormState {
        self.inner.form.borrow().clone()
    }

    /// Selects the first two catalog tokens for any side still empty.
    pub fn apply_default_tokens(&self) {
        let tokens = self.inner.catalog.tokens();
        self.inner.update_form(|form| {
            if form.sell_token.is_none() {
                form.sell_token = tokens.first().cloned();
            }
            if form.buy_token.is_none() {
                form.buy_token = tokens.get(1).cloned();
            }
        });
    }

    pub fn select_sell(&self, token: TokenInfo) {
        self.inner.update_form(|form| form.sell_token = Some(token));
    }

    pub fn select_buy(&self, token: TokenInfo) {
        self.inner.update_form(|form| form.buy_token = Some(token));
    }

    pub fn set_sell_amount(&self, amount: impl Into<String>) {
        let amount = amount.into();
        self.inner.update_form(|form| form.sell_amount = amount);
    }

    /// Swaps the two sides and clears the amount. Needs both tokens.
    pub fn flip(&self) {
        let form = self.form();
        if form.sell_token.is_none() || form.buy_token.is_none() {
            return;
        }
        self.inner.update_form(|form| {
            std::mem::swap(&mut form.sell_token, &mut form.buy_token);
            form.sell_amount.clear();
        });
    }

    /// Applies a wallet change: the current attempt is abandoned, balances
    /// follow the new address and the quote is re-issued for it.
    pub fn set_user_address(&self, address: Option<String>) {
        self.inner.set_user_address(address);
    }

    /// Follows wallet changes until the sender is dropped.
    pub fn watch_wallet(&self, mut wallet: watch::Receiver<Option<String>>) {
        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        let initial = wallet.borrow_and_update().clone();
        self.inner.set_user_address(initial);

        self.inner.wallet_listener.spawn(
            async move {
                while wallet.changed().await.is_ok() {
                    let address = wallet.borrow_and_update().clone();
                    let Some(inner) = weak.upgrade() else {
                        break;
                    };
                    inner.set_user_address(address);
                }
            }
            .in_current_span(),
        );
    }

    pub fn refresh_balances(&self) {
        self.inner.sell_balance.refetch();
        self.inner.buy_balance.refetch();
    }

    pub async fn swap_click(&self) -> Result<(), SwapError> {
        self.inner.flow.swap_click(&self.swap_request()).await
    }

    pub async fn confirm(&self) -> Result<Option<String>, SwapError> {
        self.inner.flow.confirm(&self.swap_request()).await
    }

    fn swap_request(&self) -> SwapRequest {
        let form = self.form();
        let quote = self.inner.quote.state();
        let buy_amount = if quote.loading || quote.error.is_some() {
            String::new()
        } else {
            quote.output_amount.unwrap_or_default()
        };
        SwapRequest {
            sell_token: form.sell_token,
            buy_token: form.buy_token,
            sell_amount: form.sell_amount,
            buy_amount,
            best_route: quote.best_route,
            user_address: form.user_address,
        }
    }

    pub fn view(&self) -> SessionView {
        let form = self.form();
        let quote = self.inner.quote.state();
        let prices = self.inner.prices.state();
        let sell_balance = self.inner.sell_balance.state().balance;
        let buy_balance = self.inner.buy_balance.state().balance;
        let flow = self.inner.flow.state();
        let status = self.inner.flow.status().state();

        let availability = quote.availability();
        let no_routes = availability == QuoteAvailability::NoRoutes;
        let estimate_failed = availability == QuoteAvailability::EstimateFailed;
        let quoted = if quote.loading || quote.error.is_some() {
            None
        } else {
            quote.output_amount.clone()
        };

        let usd = |token: &Option<TokenInfo>, amount: Option<&str>| {
            let price = token
                .as_ref()
                .and_then(|t| prices.price_of(&t.process_id))
                .unwrap_or(0.0);
            format_currency(Some(parse_amount(amount.unwrap_or("0")) * price))
        };

        let exchange_rate = match (&form.sell_token, &form.buy_token) {
            (Some(sell), Some(buy)) => {
                let s = parse_amount(&form.sell_amount);
                let b = parse_amount(quoted.as_deref().unwrap_or("0"));
                (s > 0.0 && b > 0.0)
                    .then(|| format!("1 {} ≈ {:.6} {}", sell.ticker, b / s, buy.ticker))
            }
            _ => None,
        };

        let fee = match (&quote.best_route, &form.sell_token, &form.buy_token) {
            (Some(route), Some(sell), Some(buy))
                if is_positive_amount(&form.sell_amount)
                    && availability == QuoteAvailability::Ready =>
            {
                swap_fee(route, sell, buy, &self.inner.catalog.tokens()).map(|f| f.to_string())
            }
            _ => None,
        };

        let buy_amount = match &quoted {
            Some(amount) if !no_routes && !estimate_failed && !amount.is_empty() => {
                format_token_amount(amount)
            }
            _ => String::new(),
        };

        let status_text = flow.swap_id.as_ref().map(|_| {
            status
                .status
                .and_then(SwapStatus::friendly_text)
                .unwrap_or(PROCESSING_TEXT)
                .to_string()
        });

        SessionView {
            sell_usd: usd(&form.sell_token, Some(&form.sell_amount)),
            buy_usd: usd(&form.buy_token, quoted.as_deref()),
            is_sell_amount_valid: sell_amount_valid(&form.sell_amount, sell_balance.as_deref()),
            sell_token: form.sell_token,
            buy_token: form.buy_token,
            sell_amount: form.sell_amount,
            buy_amount,
            sell_balance,
            buy_balance,
            exchange_rate,
            fee,
            slippage_percent: DEFAULT_SLIPPAGE_PERCENT,
            quote_loading: quote.loading,
            quote_error: quote.error,
            no_routes,
            estimate_failed,
            swap_id: flow.swap_id,
            status_text,
        }
    }
}

impl Inner {
    fn update_form(&self, update: impl FnOnce(&mut FormState)) {
        self.form.send_modify(update);
        self.sync();
    }

    fn set_user_address(&self, address: Option<String>) {
        tracing::info!(address = ?address, "wallet changed");
        self.flow.reset();
        self.update_form(|form| form.user_address = address);
    }

    /// Pushes the form into the components that depend on it.
    fn sync(&self) {
        let form = self.form.borrow().clone();
        let subject = |token: &Option<TokenInfo>| match (token, &form.user_address) {
            (Some(token), Some(address)) => Some(BalanceSubject {
                token: token.clone(),
                address: address.clone(),
            }),
            _ => None,
        };
        self.sell_balance.set_subject(subject(&form.sell_token));
        self.buy_balance.set_subject(subject(&form.buy_token));
        self.prices.set_tokens(
            form.sell_token
                .iter()
                .chain(form.buy_token.iter())
                .map(|t| t.process_id.clone()),
        );
        self.quote.update_params(|params| {
            *params = QuoteParams {
                sell_token: form.sell_token.clone(),
                buy_token: form.buy_token.clone(),
                amount: form.sell_amount.clone(),
                direction: params.direction,
                user_address: form.user_address.clone(),
            }
        });
    }
}

/// Lenient numeric read used for display math only.
fn parse_amount(amount: &str) -> f64 {
    amount
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}

/// An empty amount is valid. A non-numeric or negative one is not, and a
/// known balance caps it.
fn sell_amount_valid(amount: &str, balance: Option<&str>) -> bool {
    if amount.is_empty() {
        return true;
    }
    if !is_numeric_amount(amount) || compare_amounts(amount, "0").is_none() {
        return false;
    }
    match balance.filter(|b| !b.is_empty()) {
        Some(balance) => compare_amounts(amount, balance) != Some(Ordering::Greater),
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::test_fixtures::{MockAggregator, MockLedger, MockPriceOracle, MockTokenSource};
    use crate::swap::SwapPhase;
    use crate::types::token::test_fixtures::{ao, usdc};
    use std::time::Duration;

    struct Harness {
        aggregator: Arc<MockAggregator>,
        ledger: Arc<MockLedger>,
        session: SwapSession,
    }

    async fn harness() -> Harness {
        let aggregator = Arc::new(MockAggregator::default());
        let ledger = Arc::new(MockLedger::default());
        ledger.set_balance("usdc-process", "10000000");
        ledger.set_balance("ao-process", "3000000000000");
        let oracle = Arc::new(MockPriceOracle::default());
        oracle.set_price("usdc-process", 1.0);
        oracle.set_price("ao-process", 14.5);

        let catalog = TokenCatalog::new(Arc::new(MockTokenSource::new(
            serde_json::to_value(vec![usdc(), ao()]).unwrap(),
        )));
        catalog.refresh().await.unwrap();

        let session = SwapSession::new(
            Services {
                aggregator: aggregator.clone(),
                ledger: ledger.clone(),
                oracle,
                signer: None,
            },
            catalog,
            &Timing::default(),
        );
        session.apply_default_tokens();
        Harness {
            aggregator,
            ledger,
            session,
        }
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(500)).await;
    }

    #[test]
    fn test_sell_amount_validity() {
        assert!(sell_amount_valid("", Some("1")));
        assert!(sell_amount_valid("5", None));
        assert!(sell_amount_valid("10", Some("10")));
        assert!(!sell_amount_valid("10.000001", Some("10")));
        assert!(!sell_amount_valid("-1", None));
        assert!(!sell_amount_valid("abc", None));
        assert!(sell_amount_valid("1", Some("")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_default_tokens_and_derived_view() {
        let h = harness().await;
        h.session.set_user_address(Some("wallet-1".into()));
        h.session.set_sell_amount("2");
        settle().await;

        let view = h.session.view();
        assert_eq!(view.sell_token, Some(usdc()));
        assert_eq!(view.buy_token, Some(ao()));
        assert_eq!(view.sell_balance.as_deref(), Some("10"));
        assert_eq!(view.buy_balance.as_deref(), Some("3"));
        assert_eq!(view.buy_amount, "0.000002");
        assert_eq!(view.sell_usd, "$2");
        assert_eq!(view.buy_usd, "$0.000029");
        assert_eq!(view.exchange_rate.as_deref(), Some("1 USDC ≈ 0.000001 AO"));
        assert_eq!(view.fee, None);
        assert!(view.is_sell_amount_valid);
        assert!(!view.no_routes);
        assert_eq!(view.status_text, None);

        h.session.set_sell_amount("11");
        assert!(!h.session.view().is_sell_amount_valid);

        let calls = h.aggregator.quote_calls.lock().unwrap().clone();
        let last = calls.last().unwrap();
        assert_eq!(last.user_address.as_deref(), Some("wallet-1"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_flip_swaps_tokens_and_clears_amount() {
        let h = harness().await;
        h.session.set_sell_amount("2");
        settle().await;

        h.session.flip();
        let view = h.session.view();
        assert_eq!(view.sell_token, Some(ao()));
        assert_eq!(view.buy_token, Some(usdc()));
        assert_eq!(view.sell_amount, "");
        assert_eq!(view.buy_amount, "");
        assert_eq!(h.session.quote().state().availability(), QuoteAvailability::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_routes_hides_buy_amount() {
        let h = harness().await;
        h.aggregator.set_quote_result(Ok(crate::types::QuoteResult {
            best_route: None,
            total_routes_found: 0,
        }));
        h.session.set_sell_amount("2");
        settle().await;

        let view = h.session.view();
        assert!(view.no_routes);
        assert!(!view.estimate_failed);
        assert_eq!(view.buy_amount, "");
        assert_eq!(view.exchange_rate, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_completed_swap_refreshes_each_balance_once() {
        let h = harness().await;
        h.aggregator.push_status(Ok(SwapStatus::Sent));
        h.aggregator.push_status(Ok(SwapStatus::Completed));
        let (wallet_tx, wallet_rx) = watch::channel(Some("wallet-1".to_string()));
        h.session.watch_wallet(wallet_rx);
        h.session.set_sell_amount("2");
        settle().await;
        assert_eq!(h.ledger.calls_for("usdc-process"), 1);
        assert_eq!(h.ledger.calls_for("ao-process"), 1);

        h.session.swap_click().await.unwrap();
        let swap_id = h.session.confirm().await.unwrap();
        assert_eq!(swap_id.as_deref(), Some("msg-1"));

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(h.session.view().status_text.as_deref(), Some("Swap submitted..."));

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(h.ledger.calls_for("usdc-process"), 2);
        assert_eq!(h.ledger.calls_for("ao-process"), 2);
        assert_eq!(h.aggregator.status_call_count(), 2);
        assert_eq!(h.session.view().status_text.as_deref(), Some("Swap completed"));
        assert!(matches!(
            h.session.flow().state().phase,
            SwapPhase::Finished { .. }
        ));
        drop(wallet_tx);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wallet_change_resets_attempt_and_follows_address() {
        let h = harness().await;
        let (wallet_tx, wallet_rx) = watch::channel(Some("wallet-1".to_string()));
        h.session.watch_wallet(wallet_rx);
        h.session.set_sell_amount("2");
        settle().await;
        h.session.swap_click().await.unwrap();
        h.session.confirm().await.unwrap();
        assert!(h.session.flow().status().is_polling());

        wallet_tx.send(Some("wallet-2".to_string())).unwrap();
        settle().await;

        assert_eq!(h.session.flow().state().phase, SwapPhase::Idle);
        assert!(!h.session.flow().status().is_polling());
        assert_eq!(
            h.session.sell_balance().subject().unwrap().address,
            "wallet-2"
        );
        let calls = h.aggregator.quote_calls.lock().unwrap().clone();
        assert_eq!(calls.last().unwrap().user_address.as_deref(), Some("wallet-2"));
        let ledger_calls = h.ledger.calls.lock().unwrap().clone();
        assert!(ledger_calls.iter().any(|(_, addr)| addr == "wallet-2"));

        wallet_tx.send(None).unwrap();
        settle().await;
        assert!(h.session.sell_balance().subject().is_none());
        assert_eq!(h.session.view().sell_balance, None);
    }
}
