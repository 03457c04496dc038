//! Delayed callbacks bound to a component lifetime.
//!
//! [`DelayedCallback`] wraps a callback and a delay. Each
//! [`trigger`](DelayedCallback::trigger) schedules one independent
//! invocation `delay` after the call (two triggers mean two invocations; this
//! is not a debounce). Once the owning [`Lifetime`] is torn down, pending
//! invocations never run.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use universal_query::delayed::DelayedCallback;
//! use universal_query::lifetime::Lifetime;
//!
//! # async fn run() {
//! let lifetime = Lifetime::new();
//! let hide_toast = DelayedCallback::new(|| println!("hidden"), Duration::from_secs(3), &lifetime);
//!
//! hide_toast.trigger();
//!
//! // Component unmounts: the toast is never hidden by this callback.
//! lifetime.teardown();
//! # }
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep_until};

use crate::lifetime::Lifetime;

/// A cloneable trigger that runs a callback after a fixed delay.
#[derive(Clone)]
pub struct DelayedCallback {
    callback: Arc<dyn Fn() + Send + Sync>,
    delay: Duration,
    lifetime: Lifetime,
}

impl DelayedCallback {
    /// Binds `callback` to `lifetime` with the given delay.
    #[must_use]
    pub fn new<F>(callback: F, delay: Duration, lifetime: &Lifetime) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self {
            callback: Arc::new(callback),
            delay,
            lifetime: lifetime.clone(),
        }
    }

    #[must_use]
    pub const fn delay(&self) -> Duration {
        self.delay
    }

    /// Schedules one invocation `delay` from now.
    ///
    /// The returned task resolves to `true` if the callback ran and `false`
    /// if teardown suppressed it. Dropping the handle does not cancel the
    /// invocation.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn trigger(&self) -> JoinHandle<bool> {
        let deadline = Instant::now() + self.delay;
        let callback = self.callback.clone();
        let lifetime = self.lifetime.clone();
        let token = lifetime.token();

        tokio::spawn(async move {
            tokio::select! {
                biased;
                () = token.cancelled() => false,
                () = sleep_until(deadline) => lifetime.run_if_alive(|| callback()).is_some(),
            }
        })
    }
}

impl fmt::Debug for DelayedCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DelayedCallback")
            .field("delay", &self.delay)
            .field("lifetime", &self.lifetime)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::time::advance;

    fn counter() -> (Arc<AtomicUsize>, impl Fn() + Send + Sync + 'static) {
        let count = Arc::new(AtomicUsize::new(0));
        let inner = count.clone();
        (count, move || {
            inner.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_not_called_right_away() {
        let lifetime = Lifetime::new();
        let (count, callback) = counter();
        let delayed = DelayedCallback::new(callback, Duration::from_millis(1000), &lifetime);

        let _handle = delayed.trigger();
        tokio::task::yield_now().await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_called_once_after_delay() {
        let lifetime = Lifetime::new();
        let (count, callback) = counter();
        let delayed = DelayedCallback::new(callback, Duration::from_millis(250), &lifetime);

        let start = Instant::now();
        let fired = delayed.trigger().await.expect("task should finish");

        assert!(fired);
        assert!(start.elapsed() >= Duration::from_millis(250));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_each_trigger_schedules_independently() {
        let lifetime = Lifetime::new();
        let (count, callback) = counter();
        let delayed = DelayedCallback::new(callback, Duration::from_millis(100), &lifetime);

        let first = delayed.trigger();
        advance(Duration::from_millis(40)).await;
        let second = delayed.trigger();

        assert!(first.await.expect("first task"));
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(second.await.expect("second task"));
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_teardown_before_delay_suppresses() {
        let lifetime = Lifetime::new();
        let (count, callback) = counter();
        let delayed = DelayedCallback::new(callback, Duration::from_millis(300), &lifetime);

        let handle = delayed.trigger();
        lifetime.teardown();
        advance(Duration::from_millis(299)).await;

        assert!(!handle.await.expect("task should finish"));
        advance(Duration::from_millis(10)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_trigger_after_teardown_never_fires() {
        let lifetime = Lifetime::new();
        let (count, callback) = counter();
        let delayed = DelayedCallback::new(callback, Duration::from_millis(10), &lifetime);

        lifetime.teardown();
        assert!(!delayed.trigger().await.expect("task should finish"));
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_teardown_after_fire_is_not_retroactive() {
        let lifetime = Lifetime::new();
        let (count, callback) = counter();
        let delayed = DelayedCallback::new(callback, Duration::from_millis(10), &lifetime);

        assert!(delayed.trigger().await.expect("task should finish"));
        lifetime.teardown();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_callback_may_tear_down_its_owner() {
        let lifetime = Lifetime::new();
        let owner = lifetime.clone();
        let delayed =
            DelayedCallback::new(move || owner.teardown(), Duration::from_millis(5), &lifetime);

        assert!(delayed.trigger().await.expect("task should finish"));
        assert!(!lifetime.is_alive());
    }
}
