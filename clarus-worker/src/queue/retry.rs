//! Bounded retry with a fixed delay

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

/// Run `op` up to `attempts` times (at least once), sleeping `delay` between
/// failures. Returns the first success or the last error.
pub async fn retry_fixed<T, E, F, Fut>(
    what: &str,
    attempts: u32,
    delay: Duration,
    mut op: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let attempts = attempts.max(1);
    let mut attempt = 1;

    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < attempts => {
                tracing::warn!("{} failed (attempt {}/{}): {}", what, attempt, attempts, e);
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => {
                tracing::error!("{} failed (attempt {}/{}): {}", what, attempt, attempts, e);
                return Err(e);
            }
        }
    }
}
