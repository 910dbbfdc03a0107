//! Configuration resolution with explicit-argument > environment-variable >
//! built-in-default precedence.
//!
//! Every subsystem builder (`CacheConfig`, `JobQueueConfig`,
//! `RateLimiterConfig`, `CsrfConfig`, `EncryptionConfig`, `SanitizeConfig`)
//! calls these helpers instead of reading `std::env::var` directly, so the
//! precedence rule is enforced in one place rather than re-implemented per
//! builder.

use std::env::VarError;
use std::str::FromStr;
use std::time::Duration;

/// Resolves a required setting: `explicit`, else `env_var` parsed via
/// `FromStr`, else `default`.
///
/// Parse failures in the environment variable are logged and fall through
/// to `default` rather than aborting construction — a malformed env var
/// should degrade to the default, not crash the process.
pub fn resolve<T>(explicit: Option<T>, env_var: &str, default: T) -> T
where
    T: FromStr + Clone,
{
    if let Some(value) = explicit {
        return value;
    }

    match std::env::var(env_var) {
        Ok(raw) => match raw.parse::<T>() {
            Ok(value) => value,
            Err(_) => {
                tracing::warn!(env_var, raw, "failed to parse env var, using default");
                default
            }
        },
        Err(VarError::NotPresent) => default,
        Err(VarError::NotUnicode(_)) => {
            tracing::warn!(env_var, "env var is not valid unicode, using default");
            default
        }
    }
}

/// Resolves an optional setting with the same precedence as [`resolve`],
/// but with no built-in default: `explicit`, else `env_var`, else `None`.
pub fn resolve_opt<T>(explicit: Option<T>, env_var: &str) -> Option<T>
where
    T: FromStr,
{
    if explicit.is_some() {
        return explicit;
    }

    std::env::var(env_var).ok().and_then(|raw| raw.parse().ok())
}

/// Resolves a required string setting without reading the environment
/// variable, erroring via the caller's own validation if still absent —
/// used for secrets (`CSRF_SECRET`, `ENCRYPTION_KEY`) where the caller must
/// decide what "missing" means.
pub fn resolve_required_string(explicit: Option<String>, env_var: &str) -> Option<String> {
    explicit.or_else(|| std::env::var(env_var).ok())
}

/// Resolves a duration given in milliseconds, same precedence as [`resolve`].
pub fn resolve_duration_ms(explicit: Option<Duration>, env_var: &str, default: Duration) -> Duration {
    if let Some(value) = explicit {
        return value;
    }

    match std::env::var(env_var).ok().and_then(|raw| raw.parse::<u64>().ok()) {
        Some(millis) => Duration::from_millis(millis),
        None => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn explicit_argument_wins_over_everything() {
        let _guard = ENV_LOCK.lock().unwrap();
        std::env::set_var("AEGIS_TEST_RESOLVE_A", "99");
        let value = resolve(Some(5usize), "AEGIS_TEST_RESOLVE_A", 1);
        assert_eq!(value, 5);
        std::env::remove_var("AEGIS_TEST_RESOLVE_A");
    }

    #[test]
    fn env_var_wins_over_default() {
        let _guard = ENV_LOCK.lock().unwrap();
        std::env::set_var("AEGIS_TEST_RESOLVE_B", "42");
        let value: usize = resolve(None, "AEGIS_TEST_RESOLVE_B", 1);
        assert_eq!(value, 42);
        std::env::remove_var("AEGIS_TEST_RESOLVE_B");
    }

    #[test]
    fn default_used_when_nothing_else_is_set() {
        let _guard = ENV_LOCK.lock().unwrap();
        std::env::remove_var("AEGIS_TEST_RESOLVE_C");
        let value: usize = resolve(None, "AEGIS_TEST_RESOLVE_C", 7);
        assert_eq!(value, 7);
    }

    #[test]
    fn unparseable_env_var_falls_back_to_default() {
        let _guard = ENV_LOCK.lock().unwrap();
        std::env::set_var("AEGIS_TEST_RESOLVE_D", "not-a-number");
        let value: usize = resolve(None, "AEGIS_TEST_RESOLVE_D", 3);
        assert_eq!(value, 3);
        std::env::remove_var("AEGIS_TEST_RESOLVE_D");
    }

    #[test]
    fn duration_ms_resolves_from_env() {
        let _guard = ENV_LOCK.lock().unwrap();
        std::env::set_var("AEGIS_TEST_RESOLVE_DUR", "1500");
        let value = resolve_duration_ms(None, "AEGIS_TEST_RESOLVE_DUR", Duration::from_secs(1));
        assert_eq!(value, Duration::from_millis(1500));
        std::env::remove_var("AEGIS_TEST_RESOLVE_DUR");
    }
}
