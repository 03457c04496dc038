//! Component lifetime.
//!
//! A [`Lifetime`] stands for one mounted component. Work bound to it (see
//! [`crate::delayed`]) stops once [`Lifetime::teardown`] runs.

use std::cell::Cell;
use std::fmt;
use std::sync::Arc;

use parking_lot::ReentrantMutex;
use tokio_util::sync::CancellationToken;

struct Inner {
    /// Gate shared by teardown and callback execution.
    alive: ReentrantMutex<Cell<bool>>,
    token: CancellationToken,
}

/// Liveness of one mounted component. Clones share the same state.
#[derive(Clone)]
pub struct Lifetime {
    inner: Arc<Inner>,
}

impl Lifetime {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                alive: ReentrantMutex::new(Cell::new(true)),
                token: CancellationToken::new(),
            }),
        }
    }

    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.inner.alive.lock().get()
    }

    /// Marks the component as torn down. Idempotent.
    ///
    /// Waits for a callback that is already running under
    /// [`Self::run_if_alive`] on another thread; no callback starts after this
    /// returns. Calling it from inside such a callback does not deadlock.
    pub fn teardown(&self) {
        let gate = self.inner.alive.lock();
        let was_alive = gate.replace(false);
        drop(gate);

        self.inner.token.cancel();
        if was_alive {
            tracing::trace!("lifetime torn down");
        }
    }

    /// Runs `f` only if the component is still alive.
    pub fn run_if_alive<R>(&self, f: impl FnOnce() -> R) -> Option<R> {
        let gate = self.inner.alive.lock();
        if gate.get() { Some(f()) } else { None }
    }

    /// Token cancelled on teardown.
    #[must_use]
    pub fn token(&self) -> CancellationToken {
        self.inner.token.clone()
    }

    /// Resolves once the component is torn down.
    pub async fn torn_down(&self) {
        self.inner.token.cancelled().await;
    }
}

impl Default for Lifetime {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Lifetime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lifetime")
            .field("alive", &self.is_alive())
            .finish()
    }
}
