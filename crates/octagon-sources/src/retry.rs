//! Bounded exponential backoff for transient upstream failures.

use std::{future::Future, time::Duration};

use octagon_core::SourceError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
  /// Total attempts, including the first.
  pub attempts: u32,
  pub initial:  Duration,
  pub factor:   u32,
}

impl Default for RetryPolicy {
  fn default() -> Self {
    Self { attempts: 5, initial: Duration::from_secs(1), factor: 2 }
  }
}

/// Run `op` until it succeeds, fails with a non-transient error, or the
/// attempts run out. The last error is returned.
pub async fn with_retry<T, F, Fut>(policy: RetryPolicy, mut op: F) -> Result<T, SourceError>
where
  F: FnMut() -> Fut,
  Fut: Future<Output = Result<T, SourceError>>,
{
  let mut delay = policy.initial;
  let mut attempt = 1;
  loop {
    match op().await {
      Ok(value) => return Ok(value),
      Err(e) if e.is_transient() && attempt < policy.attempts => {
        tracing::warn!(attempt, error = %e, ?delay, "transient upstream failure, retrying");
        tokio::time::sleep(delay).await;
        delay = delay.saturating_mul(policy.factor);
        attempt += 1;
      }
      Err(e) => return Err(e),
    }
  }
}

#[cfg(test)]
mod tests {
  use std::sync::atomic::{AtomicU32, Ordering};

  use super::*;

  fn fast(attempts: u32) -> RetryPolicy {
    RetryPolicy { attempts, initial: Duration::from_millis(1), factor: 2 }
  }

  #[tokio::test]
  async fn retries_transient_errors_until_success() {
    let counter = AtomicU32::new(0);
    let calls = &counter;
    let out = with_retry(fast(5), move || async move {
      if calls.fetch_add(1, Ordering::SeqCst) < 2 {
        Err(SourceError::Status { status: 503, body: String::new() })
      } else {
        Ok("done")
      }
    })
    .await;
    assert_eq!(out.unwrap(), "done");
    assert_eq!(calls.load(Ordering::SeqCst), 3);
  }

  #[tokio::test]
  async fn gives_up_after_the_last_attempt() {
    let counter = AtomicU32::new(0);
    let calls = &counter;
    let out: Result<(), _> = with_retry(fast(3), move || async move {
      calls.fetch_add(1, Ordering::SeqCst);
      Err(SourceError::Http("connection reset".into()))
    })
    .await;
    assert!(matches!(out, Err(SourceError::Http(_))));
    assert_eq!(calls.load(Ordering::SeqCst), 3);
  }

  #[tokio::test]
  async fn client_errors_are_not_retried() {
    let counter = AtomicU32::new(0);
    let calls = &counter;
    let out: Result<(), _> = with_retry(fast(5), move || async move {
      calls.fetch_add(1, Ordering::SeqCst);
      Err(SourceError::Status { status: 401, body: "bad key".into() })
    })
    .await;
    assert!(out.is_err());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
  }
}
