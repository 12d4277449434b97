//! Bounded-parallelism task scheduler

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::oneshot;
use tracing::debug;

use crate::core::errors::{Result, TranslationError};

type Job = Box<dyn FnOnce() -> Pin<Box<dyn Future<Output = ()> + Send>> + Send>;

#[derive(Default)]
struct State {
    running: usize,
    queue: VecDeque<Job>,
}

struct Inner {
    max_concurrent: usize,
    state: Mutex<State>,
}

/// Runs submitted tasks with at most `max_concurrent` in flight.
///
/// Tasks are admitted strictly in submission order. A failed or panicking
/// task only frees its slot; it never blocks the queue. Must be used from
/// inside a Tokio runtime.
#[derive(Clone)]
pub struct ConcurrencyController {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for ConcurrencyController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConcurrencyController")
            .field("max_concurrent", &self.inner.max_concurrent)
            .field("running", &self.running())
            .field("queued", &self.queued())
            .finish()
    }
}

impl ConcurrencyController {
    /// Create a controller; a limit of 0 is treated as 1
    pub fn new(max_concurrent: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                max_concurrent: max_concurrent.max(1),
                state: Mutex::new(State::default()),
            }),
        }
    }

    /// Queue `task` and return a future resolving to its output.
    ///
    /// The task is enqueued when `execute` is called, not when the returned
    /// future is first polled, so call order is admission order.
    pub fn execute<F, Fut, T>(&self, task: F) -> impl Future<Output = Result<T>> + Send + 'static
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let job: Job = Box::new(move || {
            Box::pin(async move {
                let output = task().await;
                // Receiver may have been dropped; the task still ran.
                let _ = tx.send(output);
            }) as Pin<Box<dyn Future<Output = ()> + Send>>
        });

        self.lock().queue.push_back(job);
        self.drain();

        async move { rx.await.map_err(|_| TranslationError::TaskAborted) }
    }

    /// Tasks currently running
    pub fn running(&self) -> usize {
        self.lock().running
    }

    /// Tasks waiting for a slot
    pub fn queued(&self) -> usize {
        self.lock().queue.len()
    }

    /// Configured limit
    pub fn max_concurrent(&self) -> usize {
        self.inner.max_concurrent
    }

    /// Start queued jobs while slots are free
    fn drain(&self) {
        // Spawn outside the lock: a refused spawn drops the slot, which locks again.
        let admitted: Vec<Job> = {
            let mut state = self.lock();
            let mut admitted = Vec::new();
            while state.running < self.inner.max_concurrent {
                let Some(job) = state.queue.pop_front() else {
                    break;
                };
                state.running += 1;
                admitted.push(job);
            }
            if !admitted.is_empty() {
                debug!(
                    "Admitted {} task(s) ({} running, {} queued)",
                    admitted.len(),
                    state.running,
                    state.queue.len()
                );
            }
            admitted
        };

        for job in admitted {
            let slot = Slot {
                controller: self.clone(),
            };
            tokio::spawn(async move {
                let _slot = slot;
                job().await;
            });
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        // Nothing panics while holding the lock, so poisoning carries no torn state.
        self.inner
            .state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

/// Frees a slot when the job finishes, fails or unwinds
struct Slot {
    controller: ConcurrencyController,
}

impl Drop for Slot {
    fn drop(&mut self) {
        {
            let mut state = self.controller.lock();
            state.running = state.running.saturating_sub(1);
        }
        self.controller.drain();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio_test::{assert_err, assert_ok};

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_never_exceeds_limit() {
        for limit in [1, 2, 5] {
            let controller = ConcurrencyController::new(limit);
            let in_flight = Arc::new(AtomicUsize::new(0));
            let peak = Arc::new(AtomicUsize::new(0));

            let handles: Vec<_> = (0..40)
                .map(|i| {
                    let in_flight = Arc::clone(&in_flight);
                    let peak = Arc::clone(&peak);
                    controller.execute(move || async move {
                        let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                        peak.fetch_max(now, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(1 + (i % 3))).await;
                        in_flight.fetch_sub(1, Ordering::SeqCst);
                        i
                    })
                })
                .collect();

            for (i, handle) in handles.into_iter().enumerate() {
                assert_eq!(handle.await.unwrap(), i as u64);
            }

            assert!(peak.load(Ordering::SeqCst) <= limit);
            assert!(peak.load(Ordering::SeqCst) >= 1);
            assert_eq!(controller.running(), 0);
            assert_eq!(controller.queued(), 0);
        }
    }

    #[tokio::test]
    async fn test_fifo_admission() {
        let controller = ConcurrencyController::new(8);
        let order = Arc::new(Mutex::new(Vec::new()));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let order = Arc::clone(&order);
                controller.execute(move || async move {
                    order.lock().unwrap().push(i);
                })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(*order.lock().unwrap(), (0..8).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_fifo_admission_when_saturated() {
        let controller = ConcurrencyController::new(1);
        let order = Arc::new(Mutex::new(Vec::new()));

        let handles: Vec<_> = (0..5)
            .map(|i| {
                let order = Arc::clone(&order);
                controller.execute(move || async move {
                    tokio::time::sleep(Duration::from_millis(2)).await;
                    order.lock().unwrap().push(i);
                })
            })
            .collect();

        assert_eq!(controller.queued(), 4);

        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_failure_frees_slot() {
        let controller = ConcurrencyController::new(1);

        let failing = controller.execute(|| async { Err::<u32, String>("boom".to_string()) });
        let next = controller.execute(|| async { Ok::<u32, String>(7) });

        assert_err!(failing.await.unwrap());
        assert_eq!(assert_ok!(next.await.unwrap()), 7);
        assert_eq!(controller.running(), 0);
    }

    #[tokio::test]
    async fn test_panic_frees_slot() {
        let controller = ConcurrencyController::new(1);

        let panicking = controller.execute(|| async {
            if true {
                panic!("task blew up");
            }
            1u32
        });
        let next = controller.execute(|| async { 2u32 });

        assert!(matches!(panicking.await, Err(TranslationError::TaskAborted)));
        assert_eq!(next.await.unwrap(), 2);
    }

    #[test]
    fn test_zero_limit_is_one() {
        assert_eq!(ConcurrencyController::new(0).max_concurrent(), 1);
    }
}
