use std::time::Duration;

use futures::Future;
use parking_lot::Mutex;
use tokio::task::JoinHandle;

/// Runs an action once no refresh happened for a while.
pub(crate) struct IdleTimeout {
    duration: Duration,
    timer: Mutex<Option<JoinHandle<()>>>,
}

impl IdleTimeout {
    pub(crate) fn new(duration: Duration) -> Self {
        Self {
            duration,
            timer: Mutex::new(None),
        }
    }

    /// Restart the countdown, `on_expire` replaces any pending action.
    pub(crate) fn refresh<F>(&self, on_expire: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let duration = self.duration;
        let timer = tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            // Detached so a refresh racing the expiry can't abort it halfway.
            tokio::spawn(on_expire);
        });

        if let Some(old) = self.timer.lock().replace(timer) {
            old.abort();
        }
    }

    pub(crate) fn disable(&self) {
        if let Some(timer) = self.timer.lock().take() {
            timer.abort();
        }
    }
}

impl Drop for IdleTimeout {
    fn drop(&mut self) {
        self.disable();
    }
}
