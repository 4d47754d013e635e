//! Bounded retry combinator.

use std::future::Future;

/// Runs `op` up to `attempts` times, retrying only errors the predicate
/// classifies as retryable.
///
/// The generator receives the zero-based attempt index, so each attempt can
/// derive fresh input (the username bootstrap draws a new suffix per
/// attempt). Attempts are strictly sequential. A fatal error, or a retryable
/// error on the final attempt, is returned as-is.
pub async fn retry_bounded<T, E, F, Fut, P>(attempts: usize, mut op: F, is_retryable: P) -> Result<T, E>
where
    F: FnMut(usize) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
{
    for attempt in 0.. {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(err) if attempt + 1 < attempts && is_retryable(&err) => continue,
            Err(err) => return Err(err),
        }
    }
    unreachable!("loop only exits by return")
}
