//! HTTP client for the platform API
//!
//! Two credential paths, never mixed:
//! - ordinary calls carry the primary login bearer;
//! - sensitive calls (`/me/wallet/details`, `/swap/execute`) carry ONLY the
//!   short-lived wallet access token obtained from PIN verification.
//!
//! HTTP outcomes are mapped onto the crate error taxonomy here, so callers
//! see `InvalidCredential` / `RateLimited` / `TransientFailure` rather than
//! raw transport errors.

pub mod types;

use crate::pin::Pin;
use crate::{Error, Result};
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use types::{
    ApiErrorBody, SensitiveDetails, SwapQuoteRequest, SwapQuoteResponse, SwapReceipt,
    SwapRequest, UnlockGrant, WalletSummary,
};
use url::Url;

/// Client for the SGChain platform API.
pub struct WalletApi {
    client: Client,
    base_url: Url,
    primary_token: Option<SecretString>,
}

impl WalletApi {
    pub fn new(base_url: Url, primary_token: Option<SecretString>) -> Self {
        Self {
            client: Client::new(),
            base_url,
            primary_token,
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    fn with_primary_auth(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.primary_token {
            Some(token) => request.bearer_auth(token.expose_secret()),
            None => request,
        }
    }

    /// `GET /me/wallet`: wallet summary for the logged-in user.
    pub async fn fetch_wallet(&self) -> Result<WalletSummary> {
        let response = self
            .with_primary_auth(self.client.get(self.endpoint("me/wallet")))
            .send()
            .await
            .map_err(transport_failure)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(map_platform_failure(status, &body));
        }
        parse_body(response).await
    }

    /// `POST /me/wallet/set-pin`: register a wallet PIN.
    ///
    /// Setting a PIN does not unlock the session; a subsequent verification
    /// is a separate operation.
    pub async fn set_pin(&self, pin: &Pin) -> Result<()> {
        let response = self
            .with_primary_auth(self.client.post(self.endpoint("me/wallet/set-pin")))
            .json(&json!({ "pin": pin.expose() }))
            .send()
            .await
            .map_err(transport_failure)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(map_set_pin_failure(status, &body));
        }
        Ok(())
    }

    /// `POST /me/wallet/verify-pin`: exchange the PIN for a wallet access
    /// token and its validity window.
    pub async fn verify_pin(&self, pin: &Pin) -> Result<UnlockGrant> {
        let response = self
            .with_primary_auth(self.client.post(self.endpoint("me/wallet/verify-pin")))
            .json(&json!({ "pin": pin.expose() }))
            .send()
            .await
            .map_err(transport_failure)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(map_credential_failure(status, &body));
        }
        parse_body(response).await
    }

    /// `GET /me/wallet/details`: sensitive wallet payload. Wallet access
    /// token only; the primary bearer is deliberately not attached.
    pub async fn wallet_details(&self, access_token: &SecretString) -> Result<SensitiveDetails> {
        let response = self
            .client
            .get(self.endpoint("me/wallet/details"))
            .bearer_auth(access_token.expose_secret())
            .send()
            .await
            .map_err(transport_failure)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(map_sensitive_failure(status, &body));
        }
        parse_body(response).await
    }

    /// `GET /swap/quote`: read-only quote, primary bearer.
    pub async fn swap_quote(&self, request: &SwapQuoteRequest) -> Result<SwapQuoteResponse> {
        let response = self
            .with_primary_auth(self.client.get(self.endpoint("swap/quote")))
            .query(request)
            .send()
            .await
            .map_err(transport_failure)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(map_platform_failure(status, &body));
        }
        parse_body(response).await
    }

    /// `POST /swap/execute`: sensitive; wallet access token only.
    pub async fn execute_swap(
        &self,
        access_token: &SecretString,
        request: &SwapRequest,
    ) -> Result<SwapReceipt> {
        let response = self
            .client
            .post(self.endpoint("swap/execute"))
            .bearer_auth(access_token.expose_secret())
            .json(request)
            .send()
            .await
            .map_err(transport_failure)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(map_sensitive_failure(status, &body));
        }
        parse_body(response).await
    }
}

impl std::fmt::Debug for WalletApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalletApi")
            .field("base_url", &self.base_url.as_str())
            .field("primary_token", &"[REDACTED]")
            .finish()
    }
}

fn transport_failure(e: reqwest::Error) -> Error {
    Error::TransientFailure(e.to_string())
}

async fn parse_body<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    response
        .json::<T>()
        .await
        .map_err(|e| Error::TransientFailure(format!("malformed response: {}", e)))
}

/// Best-effort extraction of the server's error detail.
fn error_detail(body: &str) -> Option<String> {
    let parsed: ApiErrorBody = serde_json::from_str(body).ok()?;
    parsed.message.or(parsed.error)
}

/// Failure mapping for PIN verification.
///
/// Every non-rate-limit 4xx collapses to `InvalidCredential` so the caller
/// cannot tell a wrong PIN from an unset one.
fn map_credential_failure(status: StatusCode, body: &str) -> Error {
    match status {
        StatusCode::TOO_MANY_REQUESTS => Error::RateLimited(
            error_detail(body).unwrap_or_else(|| "too many attempts".to_string()),
        ),
        s if s.is_client_error() => Error::InvalidCredential,
        s => Error::TransientFailure(format!("verify-pin failed with status {}", s)),
    }
}

/// Failure mapping for PIN registration.
fn map_set_pin_failure(status: StatusCode, body: &str) -> Error {
    match status {
        StatusCode::TOO_MANY_REQUESTS => Error::RateLimited(
            error_detail(body).unwrap_or_else(|| "too many attempts".to_string()),
        ),
        s if s.is_client_error() => Error::InvalidPin(
            error_detail(body).unwrap_or_else(|| "PIN rejected".to_string()),
        ),
        s => Error::TransientFailure(format!("set-pin failed with status {}", s)),
    }
}

/// Failure mapping for calls authorized by the wallet access token.
///
/// The server's view of token validity is authoritative; 401/403 becomes
/// `TokenExpired` or `TokenInvalid` and the caller must re-lock locally.
fn map_sensitive_failure(status: StatusCode, body: &str) -> Error {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            let code = error_detail(body).unwrap_or_default().to_ascii_lowercase();
            if code.contains("expired") {
                Error::TokenExpired
            } else {
                Error::TokenInvalid
            }
        }
        StatusCode::TOO_MANY_REQUESTS => Error::RateLimited(
            error_detail(body).unwrap_or_else(|| "too many requests".to_string()),
        ),
        s => Error::TransientFailure(format!("sensitive call failed with status {}", s)),
    }
}

/// Failure mapping for ordinary platform reads.
fn map_platform_failure(status: StatusCode, body: &str) -> Error {
    match status {
        StatusCode::TOO_MANY_REQUESTS => Error::RateLimited(
            error_detail(body).unwrap_or_else(|| "too many requests".to_string()),
        ),
        s => Error::TransientFailure(
            error_detail(body)
                .map(|d| format!("status {}: {}", s, d))
                .unwrap_or_else(|| format!("request failed with status {}", s)),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrong_pin_and_unset_pin_are_indistinguishable() {
        let wrong = map_credential_failure(
            StatusCode::UNAUTHORIZED,
            r#"{"error":"pin_mismatch"}"#,
        );
        let unset = map_credential_failure(
            StatusCode::NOT_FOUND,
            r#"{"error":"pin_not_set"}"#,
        );
        assert!(matches!(wrong, Error::InvalidCredential));
        assert!(matches!(unset, Error::InvalidCredential));
        assert_eq!(wrong.to_string(), unset.to_string());
    }

    #[test]
    fn rate_limit_message_surfaced_verbatim() {
        let err = map_credential_failure(
            StatusCode::TOO_MANY_REQUESTS,
            r#"{"message":"Try again in 60 seconds"}"#,
        );
        match err {
            Error::RateLimited(msg) => assert_eq!(msg, "Try again in 60 seconds"),
            other => panic!("expected RateLimited, got {:?}", other),
        }
    }

    #[test]
    fn server_errors_are_transient() {
        let err = map_credential_failure(StatusCode::BAD_GATEWAY, "");
        assert!(err.is_retryable());
    }

    #[test]
    fn expired_token_detected_from_error_code() {
        let err = map_sensitive_failure(
            StatusCode::UNAUTHORIZED,
            r#"{"error":"TOKEN_EXPIRED"}"#,
        );
        assert!(matches!(err, Error::TokenExpired));
    }

    #[test]
    fn unrecognized_auth_failure_is_token_invalid() {
        let err = map_sensitive_failure(StatusCode::FORBIDDEN, r#"{"error":"bad_signature"}"#);
        assert!(matches!(err, Error::TokenInvalid));
        let err = map_sensitive_failure(StatusCode::UNAUTHORIZED, "not json");
        assert!(matches!(err, Error::TokenInvalid));
    }

    #[test]
    fn set_pin_rejection_carries_server_detail() {
        let err = map_set_pin_failure(
            StatusCode::UNPROCESSABLE_ENTITY,
            r#"{"message":"PIN must be 4 characters"}"#,
        );
        match err {
            Error::InvalidPin(msg) => assert_eq!(msg, "PIN must be 4 characters"),
            other => panic!("expected InvalidPin, got {:?}", other),
        }
    }
}
