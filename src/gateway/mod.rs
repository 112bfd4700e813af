//! Sensitive operation gateway
//!
//! The single choke point for anything that needs the wallet access token:
//! revealing wallet details, executing swaps, and any future gated call.
//! Callers never touch the token directly; they go through
//! [`SensitiveGateway::authorized_call`], which fails fast when the session
//! is locked and re-locks locally when the server rejects the token.
//!
//! The decrypted payload cache lives here and only here. It is erased
//! synchronously whenever the session locks (registered as the session's
//! on-lock hook, so the erase precedes the persisted lock record) and on
//! every explicit hide action.

pub mod audit;

use crate::api::types::{SensitiveDetails, SwapReceipt, SwapRequest};
use crate::api::WalletApi;
use crate::pin::Pin;
use crate::session::{LockReason, UnlockSession};
use crate::{Error, Result};
use audit::{AuditEvent, AuditLog};
use secrecy::SecretString;
use std::future::Future;
use std::sync::{Arc, Mutex};

/// What the presentation layer should render in response to
/// [`SensitiveGateway::request_unlock`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnlockRequirement {
    /// Session already unlocked; proceed with the operation.
    AlreadyUnlocked,
    /// No PIN exists yet; render the first-run PIN creation surface.
    CreatePin,
    /// Render the PIN entry surface in verification mode.
    VerifyPin,
}

/// Gateway in front of all sensitive wallet operations.
pub struct SensitiveGateway {
    api: Arc<WalletApi>,
    session: UnlockSession,
    payload: Arc<Mutex<Option<SensitiveDetails>>>,
    audit: Option<AuditLog>,
}

impl SensitiveGateway {
    pub fn new(api: Arc<WalletApi>, session: UnlockSession, audit: Option<AuditLog>) -> Self {
        let payload = Arc::new(Mutex::new(None));
        let cache = Arc::clone(&payload);
        session.set_on_lock(move || {
            *cache.lock().expect("payload cache poisoned") = None;
        });
        Self {
            api,
            session,
            payload,
            audit,
        }
    }

    pub fn session(&self) -> &UnlockSession {
        &self.session
    }

    /// The underlying API client, for ungated platform calls.
    pub fn api(&self) -> &WalletApi {
        &self.api
    }

    /// Ask for access to sensitive operations. Tells the caller whether to
    /// proceed, verify the existing PIN, or run the first-time creation
    /// flow (the server knows whether a PIN exists).
    pub async fn request_unlock(&self) -> Result<UnlockRequirement> {
        if self.session.is_unlocked().await {
            return Ok(UnlockRequirement::AlreadyUnlocked);
        }
        let summary = self.api.fetch_wallet().await?;
        Ok(if summary.has_pin {
            UnlockRequirement::VerifyPin
        } else {
            UnlockRequirement::CreatePin
        })
    }

    /// Register a PIN (first-run flow). Setting a PIN does not unlock the
    /// session; the caller chains an explicit [`Self::verify_pin`] if it
    /// wants to.
    pub async fn set_pin(&self, pin: &Pin) -> Result<()> {
        self.api.set_pin(pin).await?;
        self.audit_ok(AuditEvent::PinSet).await;
        tracing::info!("wallet PIN set");
        Ok(())
    }

    /// Verify the PIN and unlock the session on success.
    pub async fn verify_pin(&self, pin: &Pin) -> Result<()> {
        match self.api.verify_pin(pin).await {
            Ok(grant) => {
                self.session.apply_unlock(grant).await;
                self.audit_ok(AuditEvent::UnlockSucceeded).await;
                Ok(())
            }
            Err(e) => {
                self.audit_err(AuditEvent::UnlockFailed, &e).await;
                Err(e)
            }
        }
    }

    /// User-initiated lock.
    pub async fn lock(&self) {
        self.session.lock().await;
        self.audit_ok(AuditEvent::Locked).await;
    }

    /// Fetch the sensitive wallet payload and cache it.
    ///
    /// Requires an unlocked session AND a token in memory: a session
    /// resumed from storage is unlocked without a token, and this call then
    /// fails with `TokenUnavailable` so the caller re-triggers
    /// verification.
    pub async fn fetch_sensitive_payload(&self) -> Result<SensitiveDetails> {
        if !self.session.is_unlocked().await {
            return Err(Error::NotAuthorized);
        }
        let token = self
            .session
            .access_token()
            .await
            .ok_or(Error::TokenUnavailable)?;

        match self.api.wallet_details(&token).await {
            Ok(details) => {
                *self.payload.lock().expect("payload cache poisoned") = Some(details.clone());
                self.audit_ok(AuditEvent::SensitiveFetch).await;
                Ok(details)
            }
            Err(e) => {
                self.converge_on_rejection(&e).await;
                self.audit_err(AuditEvent::SensitiveFetch, &e).await;
                Err(e)
            }
        }
    }

    /// Erase the cached payload. Idempotent, always safe; used by explicit
    /// hide actions and as part of every lock transition. Clearing the
    /// cache does not lock the session.
    pub fn clear_sensitive_payload(&self) {
        *self.payload.lock().expect("payload cache poisoned") = None;
    }

    /// Cached payload from the most recent fetch, if still resident.
    pub fn cached_payload(&self) -> Option<SensitiveDetails> {
        self.payload.lock().expect("payload cache poisoned").clone()
    }

    /// Run a sensitive network operation with the wallet access token.
    ///
    /// Fails fast with `NotAuthorized`/`TokenUnavailable` without invoking
    /// the operation. A `TokenExpired`/`TokenInvalid` result forces a local
    /// lock so the client's view converges on the server's. Success does
    /// not extend the unlock window.
    pub async fn authorized_call<T, F, Fut>(&self, op: F) -> Result<T>
    where
        F: FnOnce(SecretString) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        if !self.session.is_unlocked().await {
            return Err(Error::NotAuthorized);
        }
        let token = self
            .session
            .access_token()
            .await
            .ok_or(Error::TokenUnavailable)?;

        match op(token).await {
            Ok(value) => Ok(value),
            Err(e) => {
                self.converge_on_rejection(&e).await;
                Err(e)
            }
        }
    }

    /// Execute a swap through the gateway.
    pub async fn execute_swap(&self, request: &SwapRequest) -> Result<SwapReceipt> {
        let api = Arc::clone(&self.api);
        let result = self
            .authorized_call(|token| async move { api.execute_swap(&token, request).await })
            .await;

        match &result {
            Ok(_) => self.audit_ok(AuditEvent::SwapExecuted).await,
            Err(e) => self.audit_err(AuditEvent::SwapExecuted, e).await,
        }
        result
    }

    /// The server's notion of token validity is authoritative: a rejection
    /// triggers the same clearing sequence as local expiry.
    async fn converge_on_rejection(&self, error: &Error) {
        if matches!(error, Error::TokenExpired | Error::TokenInvalid) {
            self.session
                .lock_with_reason(LockReason::ServerRejected)
                .await;
        }
    }

    async fn audit_ok(&self, event: AuditEvent) {
        if let Some(log) = &self.audit {
            log.record(event, None).await;
        }
    }

    async fn audit_err(&self, event: AuditEvent, error: &Error) {
        if let Some(log) = &self.audit {
            log.record(event, Some(error.to_string())).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::types::UnlockGrant;
    use crate::config::UnlockPolicy;
    use crate::session::store::{MemoryStore, PersistedLockState, StateStore};
    use crate::session::LockState;
    use secrecy::ExposeSecret;
    use std::sync::atomic::{AtomicBool, Ordering};
    use url::Url;

    fn unroutable_api() -> Arc<WalletApi> {
        Arc::new(WalletApi::new(
            Url::parse("http://127.0.0.1:9/api").unwrap(),
            None,
        ))
    }

    fn policy() -> UnlockPolicy {
        UnlockPolicy { window_ms: 300_000 }
    }

    fn grant(token: &str) -> UnlockGrant {
        UnlockGrant {
            access_token: SecretString::from(token.to_owned()),
            ttl_seconds: 300,
        }
    }

    fn details() -> SensitiveDetails {
        serde_json::from_value(serde_json::json!({
            "onchainAddress": "0xabc",
            "privateKey": "pk-secret"
        }))
        .unwrap()
    }

    fn gateway_with(session: UnlockSession) -> SensitiveGateway {
        SensitiveGateway::new(unroutable_api(), session, None)
    }

    #[tokio::test]
    async fn request_unlock_short_circuits_when_unlocked() {
        let session = UnlockSession::new(Arc::new(MemoryStore::new()), policy());
        session.apply_unlock(grant("wat-1")).await;
        let gateway = gateway_with(session);

        // No network call happens: the API target is unroutable.
        let requirement = gateway.request_unlock().await.unwrap();
        assert_eq!(requirement, UnlockRequirement::AlreadyUnlocked);
    }

    #[tokio::test]
    async fn clearing_the_payload_does_not_lock() {
        let session = UnlockSession::new(Arc::new(MemoryStore::new()), policy());
        session.apply_unlock(grant("wat-1")).await;
        let gateway = gateway_with(session);

        *gateway.payload.lock().unwrap() = Some(details());
        gateway.clear_sensitive_payload();

        assert!(gateway.cached_payload().is_none());
        assert!(gateway.session().is_unlocked().await);

        // Idempotent.
        gateway.clear_sensitive_payload();
        assert!(gateway.cached_payload().is_none());
    }

    #[tokio::test]
    async fn locking_erases_the_payload_cache() {
        let session = UnlockSession::new(Arc::new(MemoryStore::new()), policy());
        session.apply_unlock(grant("wat-1")).await;
        let gateway = gateway_with(session);

        *gateway.payload.lock().unwrap() = Some(details());
        gateway.lock().await;

        assert!(gateway.cached_payload().is_none());
        assert_eq!(gateway.session().status().await, LockState::Locked);
    }

    #[tokio::test]
    async fn authorized_call_fails_fast_when_locked() {
        let gateway =
            gateway_with(UnlockSession::new(Arc::new(MemoryStore::new()), policy()));

        let ran = Arc::new(AtomicBool::new(false));
        let flag = ran.clone();
        let result: Result<()> = gateway
            .authorized_call(|_token| async move {
                flag.store(true, Ordering::SeqCst);
                Ok(())
            })
            .await;

        assert!(matches!(result, Err(Error::NotAuthorized)));
        assert!(!ran.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn resumed_session_without_token_is_token_unavailable() {
        // A rehydrated session is Unlocked but holds no token.
        let store = MemoryStore::with_state(PersistedLockState::unlocked_at(
            chrono::Utc::now().timestamp_millis() - 1_000,
        ));
        let session = UnlockSession::restore(Arc::new(store), policy()).await;
        assert!(session.is_unlocked().await);
        let gateway = gateway_with(session);

        let result: Result<()> = gateway
            .authorized_call(|_token| async move { Ok(()) })
            .await;
        assert!(matches!(result, Err(Error::TokenUnavailable)));

        let fetch = gateway.fetch_sensitive_payload().await;
        assert!(matches!(fetch, Err(Error::TokenUnavailable)));
        // The I1 gap does not change the session status.
        assert!(gateway.session().is_unlocked().await);
    }

    #[tokio::test]
    async fn authorized_call_passes_the_token_through() {
        let session = UnlockSession::new(Arc::new(MemoryStore::new()), policy());
        session.apply_unlock(grant("wat-42")).await;
        let gateway = gateway_with(session);

        let seen = gateway
            .authorized_call(|token| async move { Ok(token.expose_secret().to_owned()) })
            .await
            .unwrap();
        assert_eq!(seen, "wat-42");
    }

    #[tokio::test]
    async fn server_token_rejection_forces_a_local_lock() {
        let store = MemoryStore::new();
        let session = UnlockSession::new(Arc::new(store.clone()), policy());
        session.apply_unlock(grant("wat-1")).await;
        let gateway = gateway_with(session);
        *gateway.payload.lock().unwrap() = Some(details());

        let result: Result<()> = gateway
            .authorized_call(|_token| async move { Err(Error::TokenExpired) })
            .await;

        assert!(matches!(result, Err(Error::TokenExpired)));
        assert_eq!(gateway.session().status().await, LockState::Locked);
        assert!(gateway.cached_payload().is_none());
        assert_eq!(
            store.load().await.unwrap(),
            PersistedLockState::locked()
        );
    }

    #[tokio::test]
    async fn transient_op_failure_does_not_lock() {
        let session = UnlockSession::new(Arc::new(MemoryStore::new()), policy());
        session.apply_unlock(grant("wat-1")).await;
        let gateway = gateway_with(session);

        let result: Result<()> = gateway
            .authorized_call(|_token| async move {
                Err(Error::TransientFailure("gateway timeout".into()))
            })
            .await;

        assert!(matches!(result, Err(Error::TransientFailure(_))));
        assert!(gateway.session().is_unlocked().await);
    }
}
