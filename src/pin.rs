//! Wallet PIN handling
//!
//! The PIN is a secondary secret, distinct from the login password: exactly
//! four keypad keys, where a key may be a digit or an emoji. The plaintext
//! only exists long enough to be submitted for verification; hashing and
//! adjudication happen server-side.

use crate::{Error, Result};
use secrecy::{ExposeSecret, SecretString};

/// Number of keypad keys in a wallet PIN.
pub const PIN_LENGTH: usize = 4;

/// A captured wallet PIN.
///
/// Never serialized, never logged; `Debug` is redacted.
pub struct Pin(SecretString);

impl Pin {
    /// Build a PIN from keypad key presses.
    ///
    /// One emoji on the keypad is one key, regardless of how many Unicode
    /// scalars it occupies.
    pub fn from_keys(keys: &[String]) -> Result<Self> {
        if keys.len() != PIN_LENGTH {
            return Err(Error::InvalidPin(format!(
                "PIN must be {} characters long",
                PIN_LENGTH
            )));
        }
        if keys.iter().any(|k| k.is_empty() || k.contains(char::is_whitespace)) {
            return Err(Error::InvalidPin("PIN contains an empty or blank key".into()));
        }
        Ok(Self(SecretString::from(keys.concat())))
    }

    /// Parse a PIN typed as a single string (CLI path).
    ///
    /// Counts `char`s, which matches the keypad alphabet of digits and
    /// single-scalar emoji.
    pub fn parse(s: &str) -> Result<Self> {
        let keys: Vec<String> = s.chars().map(String::from).collect();
        Self::from_keys(&keys)
    }

    /// Expose the PIN plaintext for submission to the credential store.
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }

    fn matches(&self, other: &Pin) -> bool {
        self.expose() == other.expose()
    }
}

impl std::fmt::Debug for Pin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Pin").field(&"[REDACTED]").finish()
    }
}

/// Two-step PIN setup: capture, then confirm.
///
/// A mismatch at the confirm step resets the flow; the first entry is
/// discarded and the user starts over.
#[derive(Debug, Default)]
pub struct PinSetup {
    first: Option<Pin>,
}

impl PinSetup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the flow is waiting for the confirmation entry.
    pub fn awaiting_confirmation(&self) -> bool {
        self.first.is_some()
    }

    /// Capture the first entry.
    pub fn enter(&mut self, pin: Pin) {
        self.first = Some(pin);
    }

    /// Capture the confirmation entry. On a match, returns the confirmed
    /// PIN ready for submission; on a mismatch, resets the flow.
    pub fn confirm(&mut self, confirmation: Pin) -> Result<Pin> {
        let first = self.first.take().ok_or_else(|| {
            Error::InvalidPin("confirmation entered before the first PIN".into())
        })?;
        if first.matches(&confirmation) {
            Ok(first)
        } else {
            Err(Error::PinMismatch)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn accepts_four_emoji_keys() {
        let pin = Pin::from_keys(&keys(&["😀", "🌸", "🔥", "💧"])).unwrap();
        assert_eq!(pin.expose(), "😀🌸🔥💧");
    }

    #[test]
    fn accepts_four_digit_keys() {
        let pin = Pin::parse("4821").unwrap();
        assert_eq!(pin.expose(), "4821");
    }

    #[test]
    fn rejects_wrong_length() {
        assert!(matches!(
            Pin::parse("123"),
            Err(Error::InvalidPin(_))
        ));
        assert!(matches!(
            Pin::from_keys(&keys(&["😀", "🌸", "🔥", "💧", "⚡"])),
            Err(Error::InvalidPin(_))
        ));
    }

    #[test]
    fn rejects_blank_keys() {
        assert!(matches!(
            Pin::from_keys(&keys(&["1", "2", " ", "4"])),
            Err(Error::InvalidPin(_))
        ));
    }

    #[test]
    fn debug_redacts_pin() {
        let pin = Pin::parse("4821").unwrap();
        let debug = format!("{:?}", pin);
        assert!(!debug.contains("4821"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn setup_confirm_match_yields_pin() {
        let mut setup = PinSetup::new();
        setup.enter(Pin::parse("😀🌸🔥💧").unwrap());
        assert!(setup.awaiting_confirmation());

        let confirmed = setup.confirm(Pin::parse("😀🌸🔥💧").unwrap()).unwrap();
        assert_eq!(confirmed.expose(), "😀🌸🔥💧");
        assert!(!setup.awaiting_confirmation());
    }

    #[test]
    fn setup_mismatch_resets_flow() {
        let mut setup = PinSetup::new();
        setup.enter(Pin::parse("4821").unwrap());

        let err = setup.confirm(Pin::parse("4822").unwrap()).unwrap_err();
        assert!(matches!(err, Error::PinMismatch));
        // Flow starts over from the first entry.
        assert!(!setup.awaiting_confirmation());
    }
}
