//! Error types for the SGChain wallet client

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Wrong PIN, or no PIN set for the account. The two cases are
    /// deliberately indistinguishable to the caller.
    #[error("incorrect PIN")]
    InvalidCredential,

    /// Server-imposed cooldown after too many attempts. The message is the
    /// server's own wording, surfaced verbatim.
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// Network or server failure unrelated to the credential. Eligible for
    /// a user-initiated retry without re-entering the PIN.
    #[error("request failed: {0}")]
    TransientFailure(String),

    /// The server rejected the wallet access token as expired.
    #[error("wallet access token expired")]
    TokenExpired,

    /// The server rejected the wallet access token as invalid.
    #[error("wallet access token invalid")]
    TokenInvalid,

    /// The session is unlocked but no access token is held in memory
    /// (e.g. after a reload). The caller must re-trigger PIN verification.
    #[error("no wallet access token in memory")]
    TokenUnavailable,

    /// Sensitive operation attempted while the wallet is locked.
    #[error("wallet is locked")]
    NotAuthorized,

    /// PIN and confirmation entry did not match during setup.
    #[error("PINs do not match")]
    PinMismatch,

    /// PIN fails the format contract (exactly 4 keypad keys).
    #[error("invalid PIN: {0}")]
    InvalidPin(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Whether the UI should offer "retry" instead of "re-enter PIN".
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::TransientFailure(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_transient_failures_are_retryable() {
        assert!(Error::TransientFailure("502".into()).is_retryable());
        assert!(!Error::InvalidCredential.is_retryable());
        assert!(!Error::RateLimited("wait 60s".into()).is_retryable());
        assert!(!Error::TokenExpired.is_retryable());
    }

    #[test]
    fn invalid_credential_message_gives_no_hints() {
        let msg = Error::InvalidCredential.to_string();
        assert_eq!(msg, "incorrect PIN");
    }
}
