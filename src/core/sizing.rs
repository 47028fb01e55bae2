//! Sizing and timeout validation shared by both flavours' constructors, so
//! the policy cannot drift between them.

use std::time::Duration;

use crate::error::PoolError;

/// Validates and normalizes `(min_size, max_size)`.
///
/// `max_size == None` defaults to `min_size`. Shared by both flavours'
/// constructors so the sizing policy cannot drift between them.
pub fn check_size<E>(min_size: u32, max_size: Option<u32>) -> Result<(u32, u32), PoolError<E>>
where
    E: std::error::Error + Send + Sync + 'static,
{
    if min_size == 0 {
        return Err(PoolError::Config("min_size must be greater than 0".into()));
    }

    let max_size = max_size.unwrap_or(min_size);
    if max_size < min_size {
        return Err(PoolError::Config(
            "max_size must be greater than or equal to min_size".into(),
        ));
    }

    Ok((min_size, max_size))
}

/// Validates the three timing knobs, logging the `keep_alive < 60s` advisory.
pub fn check_timeouts<E>(
    conn_timeout: Duration,
    keep_alive: Duration,
    check_interval: Duration,
) -> Result<(), PoolError<E>>
where
    E: std::error::Error + Send + Sync + 'static,
{
    if conn_timeout.is_zero() {
        return Err(PoolError::Config("conn_timeout must be greater than 0".into()));
    }
    if keep_alive.is_zero() {
        return Err(PoolError::Config("keep_alive must be greater than 0".into()));
    }
    if check_interval.is_zero() {
        return Err(PoolError::Config("check_interval must be greater than 0".into()));
    }
    if keep_alive < Duration::from_secs(60) {
        tracing::warn!(
            keep_alive_secs = keep_alive.as_secs_f64(),
            "keep_alive is less than 60 seconds, this is not recommended"
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, thiserror::Error)]
    #[error("fake")]
    struct FakeErr;

    #[test]
    fn max_defaults_to_min() {
        let (min, max) = check_size::<FakeErr>(3, None).unwrap();
        assert_eq!(min, 3);
        assert_eq!(max, 3);
    }

    #[test]
    fn zero_min_size_is_rejected() {
        assert!(check_size::<FakeErr>(0, Some(5)).is_err());
    }

    #[test]
    fn max_below_min_is_rejected() {
        assert!(check_size::<FakeErr>(5, Some(2)).is_err());
    }
}
