use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Notify;

/// Cooperative pause switch shared by every driver of one dispatch.
#[derive(Debug, Clone, Default)]
pub struct PauseToken {
    inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    paused: AtomicBool,
    notify: Notify,
}

impl PauseToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pause(&self) {
        self.inner.paused.store(true, Ordering::Release);
    }

    pub fn resume(&self) {
        self.inner.paused.store(false, Ordering::Release);
        self.inner.notify.notify_waiters();
    }

    /// Flips the current state and returns `true` if the token is now paused.
    pub fn toggle(&self) -> bool {
        if self.is_paused() {
            self.resume();
            false
        } else {
            self.pause();
            true
        }
    }

    pub fn is_paused(&self) -> bool {
        self.inner.paused.load(Ordering::Acquire)
    }

    pub async fn wait_resumed(&self) {
        loop {
            // Register before checking the flag so a concurrent `resume` is not missed.
            let notified = self.inner.notify.notified();
            if !self.is_paused() {
                return;
            }
            notified.await;
        }
    }
}
