//! Latches bridging protocol events to waiting operations.

use std::time::Duration;

use futures::future::select_all;
use tokio::sync::watch;

/// A flag operations can wait on.
///
/// A manual latch stays set until reset. An auto latch is cleared by the
/// wait it wakes.
pub(crate) struct Latch {
    state: watch::Sender<bool>,
    auto_reset: bool,
}

impl Latch {
    pub(crate) fn manual() -> Self {
        Self {
            state: watch::channel(false).0,
            auto_reset: false,
        }
    }

    pub(crate) fn auto() -> Self {
        Self {
            state: watch::channel(false).0,
            auto_reset: true,
        }
    }

    pub(crate) fn set(&self) {
        self.state.send_replace(true);
    }

    pub(crate) fn reset(&self) {
        self.state.send_replace(false);
    }

    #[cfg(test)]
    pub(crate) fn is_set(&self) -> bool {
        *self.state.borrow()
    }

    async fn wait(&self) {
        let mut rx = self.state.subscribe();
        // Sender lives as long as self.
        let _ = rx.wait_for(|set| *set).await;
    }

    fn consume(&self) {
        if self.auto_reset {
            self.state.send_if_modified(|set| std::mem::replace(set, false));
        }
    }
}

/// Wait until one of `latches` is set, for at most `timeout`.
///
/// Returns the index of the latch that fired, lowest index first when
/// several are set.
pub(crate) async fn wait_any(latches: &[&Latch], timeout: Duration) -> Option<usize> {
    let waits = latches.iter().map(|l| Box::pin(l.wait()));
    match tokio::time::timeout(timeout, select_all(waits)).await {
        Ok((_, index, _)) => {
            latches[index].consume();
            Some(index)
        }
        Err(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use ldn_test::assert_elapsed;
    use tokio::time::Instant;

    #[tokio::test]
    async fn lowest_set_latch_wins() {
        let a = Latch::manual();
        let b = Latch::manual();
        a.set();
        b.set();

        assert_eq!(wait_any(&[&a, &b], Duration::from_millis(10)).await, Some(0));
        assert!(a.is_set());
    }

    #[tokio::test]
    async fn auto_latch_is_consumed_by_wait() {
        let a = Latch::auto();
        a.set();

        assert_eq!(wait_any(&[&a], Duration::from_millis(10)).await, Some(0));
        assert!(!a.is_set());
        assert_eq!(wait_any(&[&a], Duration::from_millis(10)).await, None);
    }

    #[tokio::test]
    async fn wakes_on_later_set() {
        let a = Arc::new(Latch::manual());
        let b = Arc::new(Latch::manual());
        tokio::spawn({
            let b = b.clone();
            async move {
                tokio::time::sleep(Duration::from_millis(20)).await;
                b.set();
            }
        });

        assert_eq!(wait_any(&[&a, &b], Duration::from_secs(1)).await, Some(1));
    }

    #[tokio::test]
    async fn times_out() {
        let a = Latch::manual();
        a.set();
        a.reset();

        let start = Instant::now();
        assert_eq!(wait_any(&[&a], Duration::from_millis(100)).await, None);
        assert_elapsed!(start, Duration::from_millis(100), Duration::from_millis(50));
    }
}
