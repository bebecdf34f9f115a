use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tokio::sync::watch;
use vento_swap::catalog::TokenCatalog;
use vento_swap::client::{
    AoLedgerClient, CatalogClient, Ledger, PriceOracle, PriceOracleClient, VentoClient,
};
use vento_swap::config::Config;
use vento_swap::decimal::to_human_units;
use vento_swap::format::{format_currency, format_token_amount};
use vento_swap::quote::{QuoteClient, QuoteDirection, QuoteParams};
use vento_swap::swap::{swap_fee, StatusState, StatusTracker};
use vento_swap::types::{SwapStatus, TokenInfo};
use vento_swap::{telemetry, ClientError, Services, SwapError, SwapSession};

#[derive(Parser)]
#[command(name = "vento_swap", about = "Quote and execute swaps through the Vento aggregator")]
struct Cli {
    /// TOML configuration file. Defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the tradable tokens
    Tokens,
    /// Quote a swap. Tokens are tickers or process ids.
    Quote {
        sell: String,
        buy: String,
        amount: String,
        /// Treat the amount as the desired buy amount
        #[arg(long)]
        reverse: bool,
        #[arg(long)]
        address: Option<String>,
    },
    /// Show a wallet's balances
    Balance {
        address: String,
        #[arg(required = true)]
        tokens: Vec<String>,
    },
    /// Show USD prices
    Prices {
        #[arg(required = true)]
        tokens: Vec<String>,
    },
    /// Follow a submitted swap until it settles
    Status { swap_id: String },
    /// Execute a swap on the best route and follow it until it settles
    Swap {
        sell: String,
        buy: String,
        amount: String,
        #[arg(long)]
        address: String,
    },
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("unknown token: {0}")]
    UnknownToken(String),
    #[error("no route available for this pair and amount")]
    NoRoute,
    #[error(transparent)]
    Client(#[from] ClientError),
    #[error(transparent)]
    Swap(#[from] SwapError),
}

struct App {
    config: Config,
    catalog: TokenCatalog,
    aggregator: Arc<VentoClient>,
    ledger: Arc<AoLedgerClient>,
    oracle: Arc<PriceOracleClient>,
}

impl App {
    fn new(config: Config) -> Result<Self, ClientError> {
        let timeout = config.timing.request_timeout();
        let endpoints = &config.endpoints;
        let catalog = TokenCatalog::new(Arc::new(CatalogClient::new(
            &endpoints.token_catalog_url,
            timeout,
        )?));
        Ok(Self {
            catalog,
            aggregator: Arc::new(VentoClient::new(&endpoints.aggregator_url, timeout)?),
            ledger: Arc::new(AoLedgerClient::new(&endpoints.ledger_url, timeout)?),
            oracle: Arc::new(PriceOracleClient::new(&endpoints.price_oracle_url, timeout)?),
            config,
        })
    }

    fn token(&self, reference: &str) -> Result<TokenInfo, CliError> {
        self.catalog
            .find(reference)
            .ok_or_else(|| CliError::UnknownToken(reference.to_string()))
    }

    async fn run(&self, command: Command) -> Result<(), CliError> {
        self.catalog.refresh().await?;

        match command {
            Command::Tokens => {
                for token in self.catalog.tokens() {
                    println!(
                        "{:<8} {:>3}  {}  {}",
                        token.ticker, token.denomination, token.process_id, token.name
                    );
                }
                Ok(())
            }
            Command::Quote {
                sell,
                buy,
                amount,
                reverse,
                address,
            } => self.quote(&sell, &buy, amount, reverse, address).await,
            Command::Balance { address, tokens } => self.balances(&address, &tokens).await,
            Command::Prices { tokens } => self.prices(&tokens).await,
            Command::Status { swap_id } => {
                let tracker = StatusTracker::new(
                    self.aggregator.clone(),
                    self.config.timing.status_poll(),
                    None,
                );
                tracker.track(Some(swap_id));
                follow_status(tracker.subscribe()).await;
                Ok(())
            }
            Command::Swap {
                sell,
                buy,
                amount,
                address,
            } => self.swap(&sell, &buy, amount, address).await,
        }
    }

    async fn quote(
        &self,
        sell: &str,
        buy: &str,
        amount: String,
        reverse: bool,
        user_address: Option<String>,
    ) -> Result<(), CliError> {
        let (sell, buy) = (self.token(sell)?, self.token(buy)?);
        let client = QuoteClient::new(self.aggregator.clone(), self.config.timing.quote_debounce());
        client.set_params(QuoteParams {
            sell_token: Some(sell.clone()),
            buy_token: Some(buy.clone()),
            amount,
            direction: if reverse {
                QuoteDirection::Reverse
            } else {
                QuoteDirection::Forward
            },
            user_address,
        });
        if let Some(fetch) = client.refetch() {
            let _ = fetch.await;
        }

        let state = client.state();
        if let Some(error) = state.error {
            println!("quote failed: {error}");
            return Ok(());
        }
        let (Some(route), Some(output)) = (state.best_route, state.output_amount) else {
            return Err(CliError::NoRoute);
        };
        let ticker = if reverse { &sell.ticker } else { &buy.ticker };
        println!("{} {ticker}", format_token_amount(&output));
        println!("venue: {} ({} hop(s))", route.venue(), route.hops());
        if let Some(fee) = swap_fee(&route, &sell, &buy, &self.catalog.tokens()) {
            println!("fee: {fee}");
        }
        Ok(())
    }

    async fn balances(&self, address: &str, references: &[String]) -> Result<(), CliError> {
        let tokens = references
            .iter()
            .map(|r| self.token(r))
            .collect::<Result<Vec<_>, _>>()?;
        let replies = futures::future::join_all(
            tokens
                .iter()
                .map(|t| self.ledger.balance(&t.process_id, address)),
        )
        .await;

        for (token, reply) in tokens.iter().zip(replies) {
            match reply {
                Ok(reply) => {
                    let human = to_human_units(&reply.raw_balance(), token.denomination);
                    println!("{:<8} {}", token.ticker, format_token_amount(&human));
                }
                Err(e) => println!("{:<8} error: {e}", token.ticker),
            }
        }
        Ok(())
    }

    async fn prices(&self, references: &[String]) -> Result<(), CliError> {
        let tokens = references
            .iter()
            .map(|r| self.token(r))
            .collect::<Result<Vec<_>, _>>()?;
        let ids: Vec<String> = tokens.iter().map(|t| t.process_id.clone()).collect();
        let prices = self.oracle.fetch_prices(&ids).await?;

        for token in &tokens {
            let marker = match prices.entry(&token.process_id) {
                Some(entry) if entry.is_outdated => " (outdated)",
                _ => "",
            };
            println!(
                "{:<8} {}{marker}",
                token.ticker,
                format_currency(prices.price_of(&token.process_id))
            );
        }
        Ok(())
    }

    async fn swap(
        &self,
        sell: &str,
        buy: &str,
        amount: String,
        address: String,
    ) -> Result<(), CliError> {
        let (sell, buy) = (self.token(sell)?, self.token(buy)?);
        let session = SwapSession::new(
            Services {
                aggregator: self.aggregator.clone(),
                ledger: self.ledger.clone(),
                oracle: self.oracle.clone(),
                signer: None,
            },
            self.catalog.clone(),
            &self.config.timing,
        );
        let (_wallet, wallet_rx) = watch::channel(Some(address));
        session.watch_wallet(wallet_rx);
        session.select_sell(sell);
        session.select_buy(buy);
        session.set_sell_amount(amount);
        if let Some(fetch) = session.quote().refetch() {
            let _ = fetch.await;
        }

        let view = session.view();
        if let Some(error) = view.quote_error {
            println!("quote failed: {error}");
            return Ok(());
        }
        if view.buy_amount.is_empty() {
            return Err(CliError::NoRoute);
        }
        println!(
            "selling {} for ~{} (max. slippage {}%)",
            view.sell_amount, view.buy_amount, view.slippage_percent
        );
        if let Some(fee) = view.fee {
            println!("fee: {fee}");
        }

        session.swap_click().await?;
        match session.confirm().await? {
            Some(swap_id) => println!("submitted: {swap_id}"),
            None => return Ok(()),
        }
        follow_status(session.flow().status().subscribe()).await;
        Ok(())
    }
}

async fn follow_status(mut updates: watch::Receiver<StatusState>) -> Option<SwapStatus> {
    let mut last = None;
    loop {
        {
            let state = updates.borrow_and_update();
            if state.status.is_some() && state.status != last {
                let text = state
                    .status
                    .and_then(SwapStatus::friendly_text)
                    .unwrap_or("Processing...");
                println!("{text}");
                last = state.status;
            }
            if state.is_completed() {
                return last;
            }
        }
        if updates.changed().await.is_err() {
            return last;
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = match cli.config.as_deref().map(Config::load) {
        Some(Ok(config)) => config,
        Some(Err(e)) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
        None => Config::default(),
    };
    let _log_guard = telemetry::init(config.log_dir.as_deref().map(Path::new));

    let app = match App::new(config) {
        Ok(app) => app,
        Err(e) => {
            tracing::error!(error = %e, "failed to build clients");
            return ExitCode::FAILURE;
        }
    };

    match app.run(cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "command failed");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
