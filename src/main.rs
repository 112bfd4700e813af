//! SGChain Wallet CLI
//!
//! Command-line interface for the wallet unlock flow and the sensitive
//! operations gated behind it.

use clap::{Parser, Subcommand};
use secrecy::{ExposeSecret, SecretString};
use sgc_wallet_client::api::types::{SwapQuoteRequest, SwapRequest};
use sgc_wallet_client::api::WalletApi;
use sgc_wallet_client::gateway::audit::AuditLog;
use sgc_wallet_client::session::store::FileStore;
use sgc_wallet_client::{
    Config, Error, Pin, PinSetup, Result, SensitiveGateway, UnlockRequirement, UnlockSession,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "sgc-wallet")]
#[command(about = "SGChain wallet unlock and sensitive operations")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the current lock state
    Status,

    /// Set the wallet PIN (first-run flow; does not unlock)
    SetPin {
        /// The PIN: exactly 4 characters (digits or emoji)
        #[arg(long)]
        pin: String,

        /// Confirmation entry; must match
        #[arg(long)]
        confirm: String,
    },

    /// Verify the PIN and open the unlock window
    Unlock {
        #[arg(long)]
        pin: String,
    },

    /// Lock the wallet immediately
    Lock,

    /// Reveal the wallet's sensitive details
    Reveal {
        /// Verify this PIN first if the session has no token in memory
        #[arg(long)]
        pin: Option<String>,

        /// Print the private key, not just the on-chain address
        #[arg(long)]
        show_key: bool,
    },

    /// Get a swap quote (not gated)
    Quote {
        #[arg(long)]
        token_in: String,

        #[arg(long)]
        token_out: String,

        #[arg(long)]
        amount_in: String,
    },

    /// Execute a swap (gated behind the unlock window)
    Swap {
        #[arg(long)]
        token_in: String,

        #[arg(long)]
        token_out: String,

        #[arg(long)]
        amount_in: String,

        /// Slippage tolerance percent
        #[arg(long)]
        slippage: Option<f64>,

        /// Verify this PIN first if the session has no token in memory
        #[arg(long)]
        pin: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (ignore if not found)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    // Load config
    let config = if let Some(config_path) = cli.config {
        Config::load(&config_path)?
    } else {
        Config::from_env()?
    };

    let gateway = build_gateway(&config).await;

    match cli.command {
        Commands::Status => {
            run_status(&gateway).await;
        }
        Commands::SetPin { pin, confirm } => {
            run_set_pin(&gateway, &pin, &confirm).await?;
        }
        Commands::Unlock { pin } => {
            run_unlock(&gateway, &pin).await?;
        }
        Commands::Lock => {
            gateway.lock().await;
            println!("Wallet locked.");
        }
        Commands::Reveal { pin, show_key } => {
            run_reveal(&gateway, pin.as_deref(), show_key).await?;
        }
        Commands::Quote {
            token_in,
            token_out,
            amount_in,
        } => {
            run_quote(&gateway, token_in, token_out, amount_in).await?;
        }
        Commands::Swap {
            token_in,
            token_out,
            amount_in,
            slippage,
            pin,
        } => {
            run_swap(
                &gateway,
                SwapRequest {
                    token_in,
                    token_out,
                    amount_in,
                    slippage,
                },
                pin.as_deref(),
            )
            .await?;
        }
    }

    Ok(())
}

/// Wire up the api client, rehydrate the session, and build the gateway.
/// Rehydration completes here, before any command can make a gating
/// decision.
async fn build_gateway(config: &Config) -> SensitiveGateway {
    let primary_token = Config::primary_token_from_env().map(SecretString::from);
    if primary_token.is_none() {
        tracing::warn!(
            "{} not set - platform calls will be unauthenticated",
            sgc_wallet_client::ACCESS_TOKEN_ENV
        );
    }

    let api = Arc::new(WalletApi::new(config.api_base_url.clone(), primary_token));
    let store = Arc::new(FileStore::new(&config.state_file));
    let session = UnlockSession::restore(store, config.unlock).await;
    let audit = config.audit_log_path.as_ref().map(AuditLog::new);

    SensitiveGateway::new(api, session, audit)
}

async fn run_status(gateway: &SensitiveGateway) {
    let session = gateway.session();
    match session.remaining().await {
        Some(remaining) => {
            println!(
                "Wallet unlocked; {}s remaining in the window.",
                remaining.as_secs()
            );
        }
        None => println!("Wallet locked."),
    }
}

async fn run_set_pin(gateway: &SensitiveGateway, pin: &str, confirm: &str) -> Result<()> {
    let mut setup = PinSetup::new();
    setup.enter(Pin::parse(pin)?);
    let confirmed = setup.confirm(Pin::parse(confirm)?)?;

    gateway.set_pin(&confirmed).await?;
    println!("PIN set. Unlocking still requires a separate verification.");
    Ok(())
}

async fn run_unlock(gateway: &SensitiveGateway, pin: &str) -> Result<()> {
    match gateway.request_unlock().await? {
        UnlockRequirement::AlreadyUnlocked => {
            println!("Wallet is already unlocked.");
            return Ok(());
        }
        UnlockRequirement::CreatePin => {
            println!("No PIN set for this account. Run `sgc-wallet set-pin` first.");
            return Ok(());
        }
        UnlockRequirement::VerifyPin => {}
    }

    gateway.verify_pin(&Pin::parse(pin)?).await?;
    run_status(gateway).await;
    Ok(())
}

/// Verify the PIN inline when a sensitive call needs a token the session
/// doesn't hold (locked, or unlocked-after-reload).
async fn unlock_if_needed(gateway: &SensitiveGateway, pin: Option<&str>) -> Result<()> {
    let unlocked = gateway.session().is_unlocked().await;
    if unlocked && gateway.session().access_token().await.is_some() {
        return Ok(());
    }
    match pin {
        Some(pin) => gateway.verify_pin(&Pin::parse(pin)?).await,
        // Unlocked after a reload still means no token in memory.
        None if unlocked => Err(Error::TokenUnavailable),
        None => Err(Error::NotAuthorized),
    }
}

async fn run_reveal(
    gateway: &SensitiveGateway,
    pin: Option<&str>,
    show_key: bool,
) -> Result<()> {
    unlock_if_needed(gateway, pin).await?;

    let details = gateway.fetch_sensitive_payload().await?;
    println!("On-chain address: {}", details.address());
    if show_key {
        println!("Private key: {}", details.private_key.expose_secret());
    }

    // Don't leave the payload resident after a one-shot command.
    gateway.clear_sensitive_payload();
    Ok(())
}

async fn run_quote(
    gateway: &SensitiveGateway,
    token_in: String,
    token_out: String,
    amount_in: String,
) -> Result<()> {
    let quote = gateway
        .api()
        .swap_quote(&SwapQuoteRequest {
            token_in,
            token_out,
            amount_in,
        })
        .await?;
    println!("Expected out: {}", quote.amount_out);
    Ok(())
}

async fn run_swap(
    gateway: &SensitiveGateway,
    request: SwapRequest,
    pin: Option<&str>,
) -> Result<()> {
    unlock_if_needed(gateway, pin).await?;

    let receipt = gateway.execute_swap(&request).await?;
    println!("{}", serde_json::to_string_pretty(&receipt).expect("receipt serializes"));
    Ok(())
}
