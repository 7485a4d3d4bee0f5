use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::types::RoomCode;

/// One pending Day-expiry task per room
#[derive(Default)]
pub struct DayTimers {
    pending: Mutex<HashMap<RoomCode, JoinHandle<()>>>,
}

impl DayTimers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `on_expiry` after `delay` unless cancelled first. Replaces any timer
    /// already pending for `code`.
    pub async fn arm<F>(&self, code: RoomCode, delay: Duration, on_expiry: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            on_expiry.await;
        });
        if let Some(previous) = self.pending.lock().await.insert(code, handle) {
            previous.abort();
        }
    }

    /// Abort the pending timer for `code`, if any
    pub async fn cancel(&self, code: &RoomCode) -> bool {
        match self.pending.lock().await.remove(code) {
            Some(handle) => {
                handle.abort();
                true
            }
            None => false,
        }
    }

    /// Drop the bookkeeping for a timer that is firing right now, without
    /// aborting it
    pub async fn forget(&self, code: &RoomCode) {
        self.pending.lock().await.remove(code);
    }

    pub async fn is_armed(&self, code: &RoomCode) -> bool {
        self.pending
            .lock()
            .await
            .get(code)
            .is_some_and(|h| !h.is_finished())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn code() -> RoomCode {
        "ABCD".parse().unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_fires_after_delay() {
        let timers = DayTimers::new();
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = fired.clone();
        timers
            .arm(code(), Duration::from_secs(240), async move {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .await;

        tokio::time::sleep(Duration::from_secs(239)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_timer_never_fires() {
        let timers = DayTimers::new();
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = fired.clone();
        timers
            .arm(code(), Duration::from_secs(10), async move {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .await;
        assert!(timers.is_armed(&code()).await);

        assert!(timers.cancel(&code()).await);
        assert!(!timers.cancel(&code()).await);
        tokio::time::sleep(Duration::from_secs(20)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rearming_replaces_previous_timer() {
        let timers = DayTimers::new();
        let fired = Arc::new(AtomicUsize::new(0));
        for _ in 0..3 {
            let counter = fired.clone();
            timers
                .arm(code(), Duration::from_secs(5), async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                })
                .await;
        }
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }
}
