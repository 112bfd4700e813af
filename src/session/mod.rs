//! Unlock session state machine
//!
//! Tracks whether the wallet is unlocked for sensitive operations. The
//! grace window is absolute from the moment of PIN verification, not an
//! idle timeout; the only way to extend it is a fresh verification.
//!
//! Exactly one expiry timer is armed at any time. Arming disarms the
//! previous timer first, and a generation counter makes a superseded timer
//! a no-op even if it was already past its sleep when it was replaced.

pub mod store;

use crate::api::types::UnlockGrant;
use crate::config::UnlockPolicy;
use chrono::Utc;
use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;
use std::time::Duration;
use store::{PersistedLockState, StateStore};
use tokio::sync::{watch, RwLock};
use tokio::task::JoinHandle;

/// Wallet lock state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockState {
    Locked,
    Unlocked,
}

/// Why a session transitioned to `Locked`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockReason {
    /// The unlock window elapsed.
    WindowElapsed,
    /// User-initiated lock.
    Explicit,
    /// The server rejected the wallet access token before the local timer
    /// fired; the server's notion of validity wins.
    ServerRejected,
}

type LockHook = Box<dyn Fn() + Send + Sync>;

struct SessionInner {
    status: LockState,
    /// Epoch milliseconds of the most recent transition into `Unlocked`.
    unlocked_at: Option<i64>,
    /// Wallet access token. Memory-only; never persisted.
    access_token: Option<SecretString>,
    timer: Option<JoinHandle<()>>,
    timer_generation: u64,
}

/// Handle to the unlock session. Cloning yields another handle to the same
/// session; the timer and all state live in the instance, not in module
/// globals, so independent sessions (tests, multiple profiles) don't share
/// anything.
#[derive(Clone)]
pub struct UnlockSession {
    inner: Arc<RwLock<SessionInner>>,
    store: Arc<dyn StateStore>,
    policy: UnlockPolicy,
    state_tx: Arc<watch::Sender<LockState>>,
    on_lock: Arc<std::sync::RwLock<Option<LockHook>>>,
}

impl UnlockSession {
    /// Create a locked session with nothing to reconcile.
    pub fn new(store: Arc<dyn StateStore>, policy: UnlockPolicy) -> Self {
        let (state_tx, _) = watch::channel(LockState::Locked);
        Self {
            inner: Arc::new(RwLock::new(SessionInner {
                status: LockState::Locked,
                unlocked_at: None,
                access_token: None,
                timer: None,
                timer_generation: 0,
            })),
            store,
            policy,
            state_tx: Arc::new(state_tx),
            on_lock: Arc::new(std::sync::RwLock::new(None)),
        }
    }

    /// Rehydrate a session from durable storage.
    ///
    /// Runs the reconciliation to completion before returning, so no gating
    /// decision can observe a half-restored session. A partially elapsed
    /// window resumes with a timer armed for the REMAINING time only; a
    /// reload never resets the security clock. Stale, malformed or
    /// unreadable state fails closed to `Locked`.
    pub async fn restore(store: Arc<dyn StateStore>, policy: UnlockPolicy) -> Self {
        let session = Self::new(store.clone(), policy);

        let persisted = match store.load().await {
            Ok(state) => state,
            Err(e) => {
                tracing::warn!(error = %e, "unreadable persisted lock state, failing closed");
                return session;
            }
        };

        if !persisted.is_wallet_unlocked {
            return session;
        }
        let Some(unlocked_at) = persisted.unlock_timestamp else {
            tracing::warn!("persisted unlock flag without timestamp, failing closed");
            session.persist(&PersistedLockState::locked()).await;
            return session;
        };

        let elapsed = now_ms() - unlocked_at;
        let window_ms = policy.window_ms as i64;
        if elapsed < 0 || elapsed >= window_ms {
            tracing::info!(elapsed_ms = elapsed, "persisted unlock is stale, re-locking");
            session.persist(&PersistedLockState::locked()).await;
            return session;
        }

        let remaining = Duration::from_millis((window_ms - elapsed) as u64);
        {
            let mut inner = session.inner.write().await;
            inner.status = LockState::Unlocked;
            inner.unlocked_at = Some(unlocked_at);
            session.arm_timer(&mut inner, remaining);
        }
        session.state_tx.send_replace(LockState::Unlocked);
        tracing::info!(
            remaining_ms = remaining.as_millis() as u64,
            "unlock session resumed"
        );
        session
    }

    pub async fn status(&self) -> LockState {
        self.inner.read().await.status
    }

    pub async fn is_unlocked(&self) -> bool {
        self.inner.read().await.status == LockState::Unlocked
    }

    /// Moment of the most recent unlock, epoch milliseconds.
    pub async fn unlocked_at(&self) -> Option<i64> {
        self.inner.read().await.unlocked_at
    }

    /// Time left in the current unlock window. Recomputed from the unlock
    /// timestamp on every call, never cached.
    pub async fn remaining(&self) -> Option<Duration> {
        let inner = self.inner.read().await;
        if inner.status != LockState::Unlocked {
            return None;
        }
        let unlocked_at = inner.unlocked_at?;
        let left = self.policy.window_ms as i64 - (now_ms() - unlocked_at);
        Some(Duration::from_millis(left.max(0) as u64))
    }

    /// Current wallet access token, if one is held in memory. A resumed
    /// session is `Unlocked` without a token until the next verification.
    pub async fn access_token(&self) -> Option<SecretString> {
        self.inner
            .read()
            .await
            .access_token
            .as_ref()
            .map(|t| SecretString::from(t.expose_secret().to_owned()))
    }

    /// Subscribe to lock-state transitions.
    pub fn subscribe(&self) -> watch::Receiver<LockState> {
        self.state_tx.subscribe()
    }

    /// Register the hook that erases sensitive material on lock. Invoked
    /// before the locked state is persisted.
    pub fn set_on_lock<F>(&self, hook: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        *self.on_lock.write().expect("lock hook poisoned") = Some(Box::new(hook));
    }

    /// Enter `Unlocked` with a fresh grant from PIN verification.
    ///
    /// Re-unlocking while already unlocked refreshes the unlock moment and
    /// re-arms the full window; this is the only extension mechanism.
    pub async fn apply_unlock(&self, grant: UnlockGrant) {
        let unlocked_at = now_ms();
        {
            let mut inner = self.inner.write().await;
            inner.status = LockState::Unlocked;
            inner.unlocked_at = Some(unlocked_at);
            inner.access_token = Some(grant.access_token);
            self.arm_timer(&mut inner, self.policy.window());
        }
        tracing::debug!(
            server_ttl_seconds = grant.ttl_seconds,
            window_ms = self.policy.window_ms,
            "wallet unlocked"
        );
        self.persist(&PersistedLockState::unlocked_at(unlocked_at))
            .await;
        self.state_tx.send_replace(LockState::Unlocked);
    }

    /// User-initiated lock.
    pub async fn lock(&self) {
        self.lock_with_reason(LockReason::Explicit).await;
    }

    /// Transition to `Locked`: clear the token, run the erase hook, then
    /// persist the cleared state. No-op if already locked.
    pub(crate) async fn lock_with_reason(&self, reason: LockReason) {
        {
            let mut inner = self.inner.write().await;
            if inner.status == LockState::Locked {
                return;
            }
            if let Some(handle) = inner.timer.take() {
                handle.abort();
            }
            inner.status = LockState::Locked;
            inner.unlocked_at = None;
            inner.access_token = None;
        }
        self.complete_lock(reason).await;
    }

    /// Cancel the expiry timer without transitioning. For component
    /// teardown; persisted state stays as-is and the next start reconciles.
    pub async fn shutdown(&self) {
        let mut inner = self.inner.write().await;
        if let Some(handle) = inner.timer.take() {
            handle.abort();
        }
    }

    /// Timer-fire path. The generation check makes a superseded timer
    /// harmless even if it raced past its sleep before being aborted.
    async fn expire(&self, generation: u64) {
        {
            let mut inner = self.inner.write().await;
            if inner.timer_generation != generation || inner.status == LockState::Locked {
                return;
            }
            // This is the current timer; drop its handle without aborting.
            inner.timer = None;
            inner.status = LockState::Locked;
            inner.unlocked_at = None;
            inner.access_token = None;
        }
        self.complete_lock(LockReason::WindowElapsed).await;
    }

    /// Ordering contract: erase hook first, then persist, then notify.
    async fn complete_lock(&self, reason: LockReason) {
        self.run_lock_hook();
        self.persist(&PersistedLockState::locked()).await;
        self.state_tx.send_replace(LockState::Locked);
        tracing::info!(?reason, "wallet locked");
    }

    fn run_lock_hook(&self) {
        if let Some(hook) = self.on_lock.read().expect("lock hook poisoned").as_ref() {
            hook();
        }
    }

    async fn persist(&self, state: &PersistedLockState) {
        if let Err(e) = self.store.save(state).await {
            // A write failure degrades durability, not safety: an absent or
            // stale record rehydrates as Locked.
            tracing::warn!(error = %e, "failed to persist lock state");
        }
    }

    /// Disarm-before-arm. Caller holds the write lock.
    fn arm_timer(&self, inner: &mut SessionInner, window: Duration) {
        if let Some(handle) = inner.timer.take() {
            handle.abort();
        }
        inner.timer_generation += 1;
        let generation = inner.timer_generation;
        let session = self.clone();
        inner.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(window).await;
            session.expire(generation).await;
        }));
    }
}

impl std::fmt::Debug for UnlockSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnlockSession")
            .field("window_ms", &self.policy.window_ms)
            .finish_non_exhaustive()
    }
}

fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}
