//! Live state and cancellation for an in-flight streaming request.
//!
//! # Design
//! The request task is the only writer; callers observe through
//! `tokio::sync::watch` receivers, so no locking guards the hot path. The
//! cancellation token lives in a shared slot that is emptied on the first
//! cancel and on every terminal transition, which makes `cancel` idempotent
//! and a permanent no-op once the stream has finished either way.

use std::sync::{Arc, Mutex};

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// Cancels an in-flight streaming request. Clonable and safe to invoke from
/// any context, any number of times.
#[derive(Clone)]
pub struct CancelHandle {
    slot: Arc<Mutex<Option<CancellationToken>>>,
    loading: Arc<watch::Sender<bool>>,
}

impl CancelHandle {
    pub(crate) fn new(
        token: CancellationToken,
        loading: Arc<watch::Sender<bool>>,
    ) -> (Self, Arc<Mutex<Option<CancellationToken>>>) {
        let slot = Arc::new(Mutex::new(Some(token)));
        (
            Self {
                slot: Arc::clone(&slot),
                loading,
            },
            slot,
        )
    }

    /// A handle whose `cancel` does nothing, for requests that never left
    /// the ground.
    pub(crate) fn inert(loading: Arc<watch::Sender<bool>>) -> Self {
        Self {
            slot: Arc::new(Mutex::new(None)),
            loading,
        }
    }

    /// Abort the underlying request and force `loading` to false. A no-op
    /// if the request already reached a terminal state.
    pub fn cancel(&self) {
        let Ok(mut slot) = self.slot.lock() else {
            return;
        };
        if let Some(token) = slot.take() {
            token.cancel();
            self.loading.send_replace(false);
        }
    }
}

/// What [`SseClient::request`](crate::SseClient::request) hands back: live
/// accumulated data, a loading flag, and the cancellation handle.
pub struct SseHandle {
    data: watch::Receiver<String>,
    loading: watch::Receiver<bool>,
    cancel: CancelHandle,
}

impl SseHandle {
    pub(crate) fn new(
        data: watch::Receiver<String>,
        loading: watch::Receiver<bool>,
        cancel: CancelHandle,
    ) -> Self {
        Self {
            data,
            loading,
            cancel,
        }
    }

    /// Snapshot of the accumulated text so far.
    pub fn data(&self) -> String {
        self.data.borrow().clone()
    }

    /// Watch receiver over the accumulated text, for callers that want to
    /// await changes instead of polling.
    pub fn data_watch(&self) -> watch::Receiver<String> {
        self.data.clone()
    }

    /// True from dispatch until any terminal transition.
    pub fn is_loading(&self) -> bool {
        *self.loading.borrow()
    }

    /// Cancellation handle; clonable, idempotent.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Cancel the request. See [`CancelHandle::cancel`].
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Wait until the request reaches a terminal state (`loading == false`).
    pub async fn finished(&self) {
        let mut loading = self.loading.clone();
        // wait_for errs only if the sender side is gone, which also means
        // the request can no longer be loading.
        let _ = loading.wait_for(|l| !*l).await;
    }
}
