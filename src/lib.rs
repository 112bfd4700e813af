//! SGChain Wallet Client
//!
//! Client-side wallet unlock and sensitive-operation gating for the SGChain
//! custodial dashboard:
//! - Exchange a wallet PIN for a short-lived wallet access token
//! - Track the unlock window and re-lock automatically when it elapses
//! - Persist the minimal unlock state across restarts and reconcile it
//!   against wall-clock time on startup
//! - Gate every sensitive call (reveal key, execute swap) through one point
//!
//! # Security Model
//!
//! - The wallet access token is memory-only; persisted state is the unlock
//!   flag and timestamp, nothing else
//! - Any ambiguous or error condition resolves to `Locked`
//! - The server's view of token validity is authoritative: a rejected token
//!   re-locks the client even if the local window hasn't elapsed
//! - PIN hashing and adjudication are server-side; the PIN plaintext exists
//!   client-side only long enough to be submitted

pub mod api;
pub mod config;
pub mod gateway;
pub mod pin;
pub mod session;

mod error;

// Re-export commonly used types
pub use config::{Config, UnlockPolicy, ACCESS_TOKEN_ENV};
pub use error::{Error, Result};
pub use gateway::{SensitiveGateway, UnlockRequirement};
pub use pin::{Pin, PinSetup};
pub use session::{LockState, UnlockSession};
