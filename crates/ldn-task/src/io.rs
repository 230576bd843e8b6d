//! Queues feeding workers and fanning events out of them.

use tokio::sync::{broadcast, mpsc};

/// Capacity used by the `Default` queues.
pub const DEFAULT_BUFFER_SIZE: usize = 4096;

/// Bounded single consumer queue halves.
pub mod chan {
    /// Producer half.
    pub type Tx<T> = tokio::sync::mpsc::Sender<T>;
    /// Consumer half, owned by one worker.
    pub type Rx<T> = tokio::sync::mpsc::Receiver<T>;
}

/// Bounded queue with a single consumer.
pub struct Chan<T> {
    /// Consumer half.
    pub rx: chan::Rx<T>,
    /// Producer half, clone it for more producers.
    pub tx: chan::Tx<T>,
}

impl<T: Send> Chan<T> {
    /// Queue holding at most `capacity` items.
    pub fn new(capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity);
        Self { rx, tx }
    }
}

impl<T: Send> Default for Chan<T> {
    fn default() -> Self {
        Self::new(DEFAULT_BUFFER_SIZE)
    }
}

/// Broadcast halves, every subscriber sees every event.
pub mod mc_chan {
    /// Publishing half, [Tx::subscribe] adds consumers.
    pub type Tx<T> = tokio::sync::broadcast::Sender<T>;
    /// Subscriber half.
    pub type Rx<T> = tokio::sync::broadcast::Receiver<T>;
}

/// Event broadcast. Slow subscribers lag and lose the oldest events.
pub struct McChan<T> {
    /// First subscriber.
    pub rx: mc_chan::Rx<T>,
    /// Publishing half.
    pub tx: mc_chan::Tx<T>,
}

impl<T: Clone> McChan<T> {
    /// Broadcast retaining up to `capacity` undelivered events.
    pub fn new(capacity: usize) -> Self {
        let (tx, rx) = broadcast::channel(capacity);
        Self { rx, tx }
    }
}

impl<T: Clone> Default for McChan<T> {
    fn default() -> Self {
        Self::new(DEFAULT_BUFFER_SIZE)
    }
}
