//! Environment-driven settings with process-wide code overrides.

use std::{
    collections::HashMap,
    sync::{OnceLock, RwLock},
    time::Duration,
};

/// HTTP client timeout in milliseconds.
pub const HTTP_TIMEOUT_MS_ENV: &str = "THOR_TX_HTTP_TIMEOUT_MS";
/// Default expiration, in blocks, used by new builders.
pub const DEFAULT_EXPIRATION_ENV: &str = "THOR_TX_DEFAULT_EXPIRATION";
/// Delegation service URL used by gas payer options read from the environment.
pub const GAS_PAYER_URL_ENV: &str = "THOR_TX_GAS_PAYER_URL";

/// Timeout applied when nothing is configured.
pub const DEFAULT_HTTP_TIMEOUT_MS: u64 = 10_000;
/// Expiration applied when nothing is configured.
pub const DEFAULT_EXPIRATION: u32 = 32;

/// Global overrides consulted before the process environment.
static ENV_OVERRIDES: OnceLock<RwLock<HashMap<String, String>>> = OnceLock::new();

/// Returns the lazily initialized override map.
fn env_overrides() -> &'static RwLock<HashMap<String, String>> {
    ENV_OVERRIDES.get_or_init(|| RwLock::new(HashMap::new()))
}

/// Returns a setting, preferring code overrides over the process environment.
#[must_use]
pub fn read_env_var(name: &str) -> Option<String> {
    if let Ok(guard) = env_overrides().read()
        && let Some(value) = guard.get(name)
    {
        return Some(value.clone());
    }
    std::env::var(name).ok()
}

/// Replaces all code overrides.
pub fn set_env_overrides(overrides: impl IntoIterator<Item = (String, String)>) {
    let mut map = HashMap::new();
    map.extend(overrides);
    if let Ok(mut guard) = env_overrides().write() {
        *guard = map;
    }
}

/// Clears all code overrides.
pub fn clear_env_overrides() {
    if let Ok(mut guard) = env_overrides().write() {
        guard.clear();
    }
}

/// Timeout for the HTTP delegation and submit clients.
#[must_use]
pub fn read_http_timeout() -> Duration {
    let millis = read_env_var(HTTP_TIMEOUT_MS_ENV)
        .and_then(|value| value.parse::<u64>().ok())
        .filter(|value| *value > 0)
        .map(|value| value.clamp(100, 120_000))
        .unwrap_or(DEFAULT_HTTP_TIMEOUT_MS);
    Duration::from_millis(millis)
}

/// Expiration used by [`crate::TxBuilder::new`].
#[must_use]
pub fn read_default_expiration() -> u32 {
    read_env_var(DEFAULT_EXPIRATION_ENV)
        .and_then(|value| value.parse::<u32>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(DEFAULT_EXPIRATION)
}

/// Delegation service URL, if configured.
#[must_use]
pub fn read_gas_payer_url() -> Option<String> {
    read_env_var(GAS_PAYER_URL_ENV)
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    /// Serializes tests that touch the global override map.
    static LOCK: Mutex<()> = Mutex::new(());

    fn with_overrides(pairs: &[(&str, &str)], check: impl FnOnce()) {
        let _guard = LOCK.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        set_env_overrides(
            pairs
                .iter()
                .map(|(name, value)| ((*name).to_owned(), (*value).to_owned())),
        );
        check();
        clear_env_overrides();
    }

    #[test]
    fn http_timeout_is_clamped() {
        with_overrides(&[(HTTP_TIMEOUT_MS_ENV, "5")], || {
            assert_eq!(read_http_timeout(), Duration::from_millis(100));
        });
        with_overrides(&[(HTTP_TIMEOUT_MS_ENV, "999999")], || {
            assert_eq!(read_http_timeout(), Duration::from_millis(120_000));
        });
        with_overrides(&[(HTTP_TIMEOUT_MS_ENV, "0")], || {
            assert_eq!(
                read_http_timeout(),
                Duration::from_millis(DEFAULT_HTTP_TIMEOUT_MS)
            );
        });
    }

    #[test]
    fn default_expiration_override() {
        with_overrides(&[(DEFAULT_EXPIRATION_ENV, "720")], || {
            assert_eq!(read_default_expiration(), 720);
        });
        with_overrides(&[(DEFAULT_EXPIRATION_ENV, "soon")], || {
            assert_eq!(read_default_expiration(), DEFAULT_EXPIRATION);
        });
    }

    #[test]
    fn blank_gas_payer_url_is_ignored() {
        with_overrides(&[(GAS_PAYER_URL_ENV, "  ")], || {
            assert_eq!(read_gas_payer_url(), None);
        });
        with_overrides(&[(GAS_PAYER_URL_ENV, " https://sponsor.example/sign ")], || {
            assert_eq!(
                read_gas_payer_url().as_deref(),
                Some("https://sponsor.example/sign")
            );
        });
    }
}
