//! Cancellation tokens for pipeline invocations.
//!
//! A token is a shared flag backed by a `tokio::sync::watch` channel.
//! Futures run under [`CancelToken::run`] are dropped as soon as the flag
//! flips, which aborts any HTTP request they were awaiting.

use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::watch;

/// The token fired before the guarded future finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("cancelled")]
pub struct Cancelled;

/// A cloneable cancellation flag. All clones observe the same flag.
#[derive(Debug, Clone)]
pub struct CancelToken {
    tx: Arc<watch::Sender<bool>>,
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelToken {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Fire the token. Idempotent.
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    /// Whether both tokens share one flag.
    pub fn same_as(&self, other: &CancelToken) -> bool {
        Arc::ptr_eq(&self.tx, &other.tx)
    }

    /// Resolves once the token has fired.
    pub async fn cancelled(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives as long as `self`, so this can't observe a closed channel.
        let _ = rx.wait_for(|fired| *fired).await;
    }

    /// Drive `fut` to completion unless the token fires first.
    ///
    /// On cancellation `fut` is dropped without being polled again.
    pub async fn run<F: Future>(&self, fut: F) -> Result<F::Output, Cancelled> {
        if self.is_cancelled() {
            return Err(Cancelled);
        }

        tokio::select! {
            biased;
            () = self.cancelled() => Err(Cancelled),
            out = fut => Ok(out),
        }
    }
}

/// Holds the token of the most recent invocation for one logical caller.
///
/// Starting a new invocation swaps in a fresh token and fires the old one,
/// so at most one run is ever live per slot.
#[derive(Debug, Default)]
pub struct InvocationSlot {
    current: Mutex<Option<CancelToken>>,
}

impl InvocationSlot {
    /// Replace the current token with a new one and cancel the previous.
    pub fn begin(&self) -> CancelToken {
        let token = CancelToken::new();
        let previous = self
            .current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(token.clone());

        if let Some(previous) = previous {
            previous.cancel();
        }

        token
    }

    /// Cancel whatever invocation is in flight, if any.
    pub fn cancel(&self) {
        if let Some(token) = self
            .current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
        {
            token.cancel();
        }
    }

    /// Whether `token` belongs to the latest invocation.
    pub fn is_current(&self, token: &CancelToken) -> bool {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|current| current.same_as(token))
    }
}
