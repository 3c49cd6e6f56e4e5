//! Opaque `state` values for correlating a callback with its login

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngExt;

/// Number of random bytes behind each state value.
const STATE_BYTES: usize = 24;

/// Generate a fresh random state value.
///
/// 24 random bytes encoded as URL-safe base64 without padding, so the value
/// is 32 characters and needs no escaping in a query string.
pub fn generate_state() -> String {
    let mut bytes = [0u8; STATE_BYTES];
    rand::rng().fill(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_is_url_safe_base64() {
        let state = generate_state();
        assert_eq!(state.len(), 32);
        assert!(
            state
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'),
            "state must be URL-safe base64 (no padding): {state}"
        );
    }

    #[test]
    fn states_are_unique() {
        assert_ne!(generate_state(), generate_state());
    }
}
