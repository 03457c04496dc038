//! Server-render request extraction.
//!
//! During a server render, descendants issue requests that are still in
//! flight when the render itself returns. [`ExtractionTracker`] sits at the
//! front of the chain, records every request as pending until it settles,
//! and [`ExtractionTracker::drain`] waits until nothing is pending before the
//! cache snapshot is taken.
//!
//! ```
//! use universal_query::mode::ExecutionMode;
//! use universal_query::ssr::ExtractionTracker;
//!
//! # let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
//! # rt.block_on(async {
//! let tracker = ExtractionTracker::new(ExecutionMode::Server);
//! // Nothing in flight: drain just runs `finalize`.
//! let value = tracker.drain(|| 42).await;
//! assert_eq!(value, 42);
//! # });
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use dashmap::DashMap;
use futures::FutureExt;
use futures::future::BoxFuture;
use tokio::sync::watch;

use crate::link::{Link, LinkResult, Next};
use crate::mode::ExecutionMode;
use crate::operation::Operation;

/// Work that has started and not settled yet.
#[derive(Debug, Clone)]
pub struct PendingRequest {
    /// Operation name, or the label passed to [`ExtractionTracker::begin`].
    pub label: String,
    /// When the work was registered.
    pub started_at: Instant,
}

#[derive(Debug)]
struct Shared {
    pending: DashMap<u64, PendingRequest>,
    count: watch::Sender<usize>,
}

/// Keeps one unit of work pending until dropped.
///
/// Dropping happens when the work settles, successfully or not, and also
/// when the caller drops it without finishing.
#[must_use = "work stops being tracked as soon as the guard is dropped"]
#[derive(Debug)]
pub struct Pending {
    id: u64,
    shared: Arc<Shared>,
}

impl Drop for Pending {
    fn drop(&mut self) {
        if self.shared.pending.remove(&self.id).is_some() {
            self.shared
                .count
                .send_modify(|count| *count = count.saturating_sub(1));
        }
    }
}

/// Outermost link of a provider's chain.
///
/// Requests are forwarded unchanged. In server mode each one is recorded
/// from the moment it enters the chain until its result resolves or rejects;
/// in client mode nothing is recorded.
///
/// Work outside the chain can be kept pending with [`Self::begin`]. The
/// client holds such a guard until a query's result is in the cache, and
/// [`ClientContext::spawn`](crate::provider::ClientContext::spawn) holds one
/// for the lifetime of a render task.
#[derive(Debug)]
pub struct ExtractionTracker {
    recording: bool,
    next_id: AtomicU64,
    shared: Arc<Shared>,
}

impl ExtractionTracker {
    #[must_use]
    pub fn new(mode: ExecutionMode) -> Self {
        let (count, _) = watch::channel(0);
        Self {
            recording: mode.is_server(),
            next_id: AtomicU64::new(0),
            shared: Arc::new(Shared {
                pending: DashMap::new(),
                count,
            }),
        }
    }

    /// Whether requests are being recorded.
    #[must_use]
    pub const fn is_recording(&self) -> bool {
        self.recording
    }

    /// Number of units of work currently pending.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        *self.shared.count.borrow()
    }

    /// Labels of the pending work, oldest first.
    #[must_use]
    pub fn pending_operations(&self) -> Vec<String> {
        let mut pending: Vec<_> = self
            .shared
            .pending
            .iter()
            .map(|entry| (*entry.key(), entry.value().label.clone()))
            .collect();
        pending.sort_by_key(|(id, _)| *id);
        pending.into_iter().map(|(_, label)| label).collect()
    }

    /// Registers one unit of work, pending until the guard drops.
    ///
    /// Returns `None` when not recording.
    pub fn begin(&self, label: &impl ToString) -> Option<Pending> {
        if !self.recording {
            return None;
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let label = label.to_string();
        tracing::trace!(id, label = %label, "pending");
        self.shared.pending.insert(
            id,
            PendingRequest {
                label,
                started_at: Instant::now(),
            },
        );
        self.shared.count.send_modify(|count| *count += 1);

        Some(Pending {
            id,
            shared: self.shared.clone(),
        })
    }

    /// Waits until nothing is pending, then returns `finalize()`.
    ///
    /// Work registered while draining, such as a follow-up request issued by
    /// a render task after an earlier request settled, is waited for too, as
    /// long as it is registered before the guard that caused it drops.
    /// `finalize` runs with no guard alive.
    ///
    /// A request future that is held but never polled keeps the drain
    /// waiting.
    pub async fn drain<T>(&self, finalize: impl FnOnce() -> T) -> T {
        if let Some(oldest) = self.oldest_pending() {
            tracing::debug!(
                pending = ?self.pending_operations(),
                oldest_ms = oldest.elapsed().as_millis(),
                "draining"
            );
        }

        let mut rx = self.shared.count.subscribe();
        // The sender lives as long as `self`, so this cannot fail.
        let _ = rx.wait_for(|pending| *pending == 0).await;

        tracing::debug!("extraction drained");
        finalize()
    }

    fn oldest_pending(&self) -> Option<Instant> {
        self.shared
            .pending
            .iter()
            .map(|entry| entry.value().started_at)
            .min()
    }
}

impl Link for ExtractionTracker {
    fn request(&self, operation: Operation, next: Next) -> BoxFuture<'static, LinkResult> {
        let Some(guard) = self.begin(&operation.name) else {
            return next.run(operation);
        };

        let response = next.run(operation);
        async move {
            let result = response.await;
            drop(guard);
            result
        }
        .boxed()
    }

    fn name(&self) -> &'static str {
        "ExtractionTracker"
    }
}
