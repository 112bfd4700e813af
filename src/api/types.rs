//! Wire types for the platform API
//!
//! Field names follow the platform's camelCase JSON convention.

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

/// Wallet summary from `GET /me/wallet`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletSummary {
    pub user_id: String,
    pub wallet_id: String,
    pub sgc_balance: f64,
    pub sgc_official_price_usd: f64,
    pub sgc_value_usd: f64,
    pub total_account_value_usd: f64,
    pub status: String,
    /// Whether a wallet PIN has been set for this account. Drives the
    /// create-vs-verify unlock prompt.
    pub has_pin: bool,
}

/// Successful PIN verification: a short-lived wallet access token and its
/// server-side validity window.
///
/// The token is memory-only. `SecretString` has no `Serialize` impl, so the
/// grant cannot end up in any serialized form.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnlockGrant {
    pub access_token: SecretString,
    pub ttl_seconds: u64,
}

/// Sensitive wallet details from `GET /me/wallet/details`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SensitiveDetails {
    pub onchain_address: String,
    pub private_key: SecretString,
}

impl SensitiveDetails {
    /// The on-chain address, safe to display.
    pub fn address(&self) -> &str {
        &self.onchain_address
    }
}

impl Clone for SensitiveDetails {
    fn clone(&self) -> Self {
        use secrecy::ExposeSecret;
        Self {
            onchain_address: self.onchain_address.clone(),
            private_key: SecretString::from(self.private_key.expose_secret().to_owned()),
        }
    }
}

/// Parameters for `GET /swap/quote`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapQuoteRequest {
    pub token_in: String,
    pub token_out: String,
    pub amount_in: String,
}

/// Response from `GET /swap/quote`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapQuoteResponse {
    pub amount_out: String,
}

/// Payload for `POST /swap/execute`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapRequest {
    pub token_in: String,
    pub token_out: String,
    pub amount_in: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slippage: Option<f64>,
}

/// Response from `POST /swap/execute`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapReceipt {
    pub status: String,
    pub tx_hash: String,
    pub amount_in: String,
    pub token_in: String,
    pub token_out: String,
    pub expected_amount_out: String,
    pub min_amount_out: String,
}

/// Error payload shape used across platform endpoints.
#[derive(Debug, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}
