use std::any::Any;

use async_trait::async_trait;
use futures::{
    future::{ready, BoxFuture},
    Future, FutureExt,
};
use tokio::{sync::oneshot, task::JoinHandle};

use ldn_utils::{ldn_log_debug, ldn_log_warn};

/// State of a background worker driven by [Task].
#[async_trait]
pub trait Runtime: Sized {
    /// Name used in logs.
    const NAME: &'static str;

    /// Error ending the worker loop.
    type Err: Send + 'static;

    /// Wait for the next event and return the work it triggers.
    ///
    /// Waiting may be cut short by [Task::stop], the returned work may not.
    /// Build responses with [RuntimeExt].
    async fn wait(&mut self) -> WaitResponse<'_, Self::Err>;

    /// Cleanup once the loop has ended, for whatever reason.
    async fn stop(self) {}
}

/// Constructors for [WaitResponse].
pub trait RuntimeExt: Runtime {
    /// Run `work` to completion before the next wait.
    fn guard<'a, F>(work: F) -> WaitResponse<'a, Self::Err>
    where
        F: Future<Output = Result<(), Self::Err>> + Send + 'a,
    {
        WaitResponse(work.boxed())
    }

    /// Nothing to do, wait again.
    fn next() -> WaitResponse<'static, Self::Err> {
        WaitResponse(ready(Ok(())).boxed())
    }

    /// End the loop with `e`.
    fn error(e: Self::Err) -> WaitResponse<'static, Self::Err> {
        WaitResponse(ready(Err(e)).boxed())
    }
}

impl<T: Runtime> RuntimeExt for T {}

/// Work returned from [Runtime::wait].
pub struct WaitResponse<'a, E>(BoxFuture<'a, Result<(), E>>);

/// How a worker ended.
#[derive(Debug)]
pub enum StopResult<E> {
    /// Stopped on request.
    Ok,
    /// Loop ended with an error before the stop request.
    Err(E),
    /// Worker panicked.
    Panic(Box<dyn Any + Send + 'static>),
}

/// Spawned worker owning its [Runtime] state.
///
/// Must be stopped with [Task::stop]. Dropping it signals the worker too, but
/// nothing waits for the cleanup.
pub struct Task<S: Runtime> {
    stop: Option<oneshot::Sender<()>>,
    join: Option<JoinHandle<Result<(), S::Err>>>,
}

impl<S> Task<S>
where
    S: Runtime + Send + 'static,
{
    /// Spawn the worker loop for `state`.
    pub fn start(mut state: S) -> Self {
        let (stop, mut stopped) = oneshot::channel::<()>();

        let join = tokio::spawn(async move {
            let res = loop {
                let work = tokio::select! {
                    biased;
                    _ = &mut stopped => break Ok(()),
                    response = state.wait() => response.0,
                };
                if let Err(e) = work.await {
                    break Err(e);
                }
            };
            state.stop().await;
            res
        });

        ldn_log_debug!("{} started", S::NAME);
        Self {
            stop: Some(stop),
            join: Some(join),
        }
    }

    /// Signal the worker and wait for its cleanup.
    pub async fn stop(mut self) -> StopResult<S::Err> {
        ldn_log_debug!("Stopping {}", S::NAME);
        if let Some(stop) = self.stop.take() {
            // Already gone if the loop ended on its own.
            let _ = stop.send(());
        }

        match self.join.take() {
            None => StopResult::Ok,
            Some(join) => match join.await {
                Ok(Ok(())) => StopResult::Ok,
                Ok(Err(e)) => StopResult::Err(e),
                Err(e) if e.is_panic() => StopResult::Panic(e.into_panic()),
                Err(_) => StopResult::Ok,
            },
        }
    }
}

impl<S: Runtime> Drop for Task<S> {
    fn drop(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if matches!(&self.join, Some(join) if !join.is_finished()) {
            ldn_log_warn!("{} dropped without stop", S::NAME);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::time::timeout;

    use super::*;
    use crate::io::{chan, Chan};

    struct Echo {
        input: chan::Rx<&'static str>,
        output: chan::Tx<&'static str>,
        cleaned_up: Option<oneshot::Sender<()>>,
    }

    #[async_trait]
    impl Runtime for Echo {
        const NAME: &'static str = "Echo";

        type Err = &'static str;

        async fn wait(&mut self) -> WaitResponse<'_, Self::Err> {
            match self.input.recv().await {
                Some("fail") => Self::error("fail"),
                Some("panic") => panic!("asked to"),
                Some("skip") => Self::next(),
                Some(msg) => Self::guard(async move {
                    self.output.send(msg).await.map_err(|_| "closed")
                }),
                None => Self::error("input closed"),
            }
        }

        async fn stop(mut self) {
            if let Some(done) = self.cleaned_up.take() {
                let _ = done.send(());
            }
        }
    }

    struct Harness {
        task: Task<Echo>,
        input: chan::Tx<&'static str>,
        output: chan::Rx<&'static str>,
        cleaned_up: oneshot::Receiver<()>,
    }

    fn start() -> Harness {
        let input = Chan::default();
        let output = Chan::default();
        let (done, cleaned_up) = oneshot::channel();
        let task = Task::start(Echo {
            input: input.rx,
            output: output.tx,
            cleaned_up: Some(done),
        });
        Harness {
            task,
            input: input.tx,
            output: output.rx,
            cleaned_up,
        }
    }

    #[tokio::test]
    async fn handles_events_in_order() {
        let mut h = start();
        for msg in ["a", "skip", "b", "c"] {
            h.input.send(msg).await.unwrap();
        }
        for msg in ["a", "b", "c"] {
            assert_eq!(h.output.recv().await, Some(msg));
        }

        assert!(matches!(h.task.stop().await, StopResult::Ok));
        assert!(timeout(Duration::from_secs(1), h.cleaned_up).await.is_ok());
    }

    #[tokio::test]
    async fn error_ends_loop_and_cleans_up() {
        let h = start();
        h.input.send("fail").await.unwrap();
        assert!(timeout(Duration::from_secs(1), h.cleaned_up).await.is_ok());
        assert!(matches!(h.task.stop().await, StopResult::Err("fail")));
    }

    #[tokio::test]
    async fn panic_is_reported() {
        let h = start();
        h.input.send("panic").await.unwrap();

        // The stop signal must not win the race against the panic.
        timeout(Duration::from_secs(1), async {
            while !h.task.join.as_ref().map_or(true, |join| join.is_finished()) {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();

        assert!(matches!(h.task.stop().await, StopResult::Panic(_)));
    }

    #[tokio::test]
    async fn idle_worker_stops_promptly() {
        let h = start();
        let res = timeout(Duration::from_secs(1), h.task.stop()).await;
        assert!(matches!(res, Ok(StopResult::Ok)));
        assert!(timeout(Duration::from_secs(1), h.cleaned_up).await.is_ok());
    }
}
