//! Minimal Draw
//!
//! Terminal client for the Minimal Draw lottery. Deploys an in-process
//! lottery contract with a keeper, connects a wallet and keeps the round
//! view in step with the contract.
//! Type a ticket number to buy it, `reload` to reconnect, `quit` to exit.

use anyhow::Result;
use clap::Parser;
use draw_bridge::{ContractConfig, Keeper, SimulatedContract, SimulatedWallet};
use draw_core::{Clock, DrawError, LotterySession, SystemClock};
use draw_types::{is_valid_ticket, MAX_TICKET, MIN_TICKET};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod config;
mod render;

use config::ClientConfig;

/// Minimal Draw lottery client
#[derive(Parser, Debug)]
#[command(name = "minimal-draw")]
#[command(about = "Ten-ticket lottery client with a simulated contract", long_about = None)]
struct Args {
    /// JSON config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Contract admin address
    #[arg(long)]
    admin: Option<String>,

    /// Wallet account address
    #[arg(long)]
    signer: Option<String>,

    /// Start with a locked wallet
    #[arg(long)]
    no_wallet: bool,

    /// Round duration in seconds
    #[arg(long)]
    round_secs: Option<u64>,

    /// Keeper check interval in seconds
    #[arg(long)]
    keeper_interval: Option<u64>,

    /// Purchase confirmation delay in milliseconds
    #[arg(long)]
    confirmation_ms: Option<u64>,

    /// Delay before checking the winner of a closed round, in seconds
    #[arg(long)]
    settlement_delay: Option<u64>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

impl Args {
    fn apply(&self, config: &mut ClientConfig) {
        if let Some(admin) = &self.admin {
            config.admin = admin.clone();
        }
        if let Some(signer) = &self.signer {
            config.signer = Some(signer.clone());
        }
        if self.no_wallet {
            config.signer = None;
        }
        if let Some(secs) = self.round_secs {
            config.round_duration_secs = secs;
        }
        if let Some(secs) = self.keeper_interval {
            config.keeper_interval_secs = secs;
        }
        if let Some(ms) = self.confirmation_ms {
            config.confirmation_delay_ms = ms;
        }
        if let Some(secs) = self.settlement_delay {
            config.settlement_delay_secs = secs;
        }
    }
}

/// A line typed by the user
#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Buy(u8),
    Reload,
    Help,
    Quit,
    Unknown(String),
}

impl Command {
    fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        let command = match line {
            "reload" | "r" => Command::Reload,
            "help" | "h" | "?" => Command::Help,
            "quit" | "q" | "exit" => Command::Quit,
            other => match other.parse::<u8>() {
                Ok(ticket) if is_valid_ticket(ticket) => Command::Buy(ticket),
                _ => Command::Unknown(other.to_string()),
            },
        };
        Some(command)
    }
}

fn print_help() {
    println!(
        "Commands: {}-{} buy that ticket, reload, help, quit",
        MIN_TICKET, MAX_TICKET
    );
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Logs go to stderr so they don't interleave with the rendered view
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut config = match &args.config {
        Some(path) => ClientConfig::load(path)?,
        None => ClientConfig::default(),
    };
    args.apply(&mut config);

    run(config).await
}

async fn run(config: ClientConfig) -> Result<()> {
    config.validate()?;
    let admin = config.admin_address()?;
    let signer = config.signer_address()?;

    tracing::info!("Starting Minimal Draw");
    tracing::info!("  Admin: {}", admin);
    match &signer {
        Some(signer) => tracing::info!("  Wallet: {}", signer),
        None => tracing::info!("  Wallet: locked"),
    }
    tracing::info!("  Ticket price: {} ETH", config.ticket_price);
    tracing::info!("  Round duration: {}s", config.round_duration_secs);
    tracing::info!("  Keeper interval: {}s", config.keeper_interval_secs);
    tracing::info!("  Settlement delay: {}s", config.settlement_delay_secs);

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let mut contract_config = ContractConfig::new(admin);
    contract_config.ticket_price = config.ticket_price()?;
    contract_config.round_duration = config.round_duration();
    let contract = Arc::new(SimulatedContract::deploy(contract_config, clock.clone()));

    let keeper = Keeper::new(contract.clone())
        .with_interval(config.keeper_interval())
        .spawn();

    let wallet = match signer {
        Some(signer) => SimulatedWallet::connected(contract.clone(), signer),
        None => SimulatedWallet::locked(contract.clone()),
    }
    .with_confirmation_delay(config.confirmation_delay());

    let session = Arc::new(LotterySession::new(clock, config.session_config()));

    // Redraw on every published state change
    let mut updates = session.subscribe();
    let render_session = session.clone();
    let renderer = tokio::spawn(async move {
        loop {
            match updates.recv().await {
                Ok(_) | Err(RecvError::Lagged(_)) => {
                    println!("{}", render::render(&render_session.view()));
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    connect(&session, &wallet).await;
    print_help();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match Command::parse(&line) {
                    Some(Command::Buy(ticket)) => {
                        if !session.view().is_selectable(ticket) {
                            println!("Ticket {} is not available", ticket);
                            continue;
                        }
                        println!("Buying ticket {}...", ticket);
                        let session = session.clone();
                        tokio::spawn(async move {
                            match session.purchase(ticket).await {
                                Ok(receipt) => tracing::info!(
                                    "Ticket {} confirmed in block {}",
                                    ticket,
                                    receipt.block_number
                                ),
                                Err(e) => tracing::warn!("Ticket {} not bought: {}", ticket, e),
                            }
                        });
                    }
                    Some(Command::Reload) => connect(&session, &wallet).await,
                    Some(Command::Help) => print_help(),
                    Some(Command::Quit) => break,
                    Some(Command::Unknown(input)) => {
                        println!("Unknown command: {}", input);
                        print_help();
                    }
                    None => {}
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    tracing::info!("Shutting down...");
    session.shutdown();
    renderer.abort();
    keeper.stop();
    tracing::info!("Client stopped ({} rounds drawn)", keeper.draws());

    Ok(())
}

async fn connect(session: &LotterySession, wallet: &SimulatedWallet) {
    match session.bootstrap(wallet).await {
        Ok(()) => tracing::info!("Lottery state loaded"),
        Err(DrawError::SessionUnavailable) => tracing::info!("No wallet session available"),
        Err(e) => tracing::warn!("Bootstrap failed: {}", e),
    }
}
