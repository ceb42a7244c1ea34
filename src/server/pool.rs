//! Fixed-size worker pool: one accept thread hands connections off to N
//! long-lived worker threads through a bounded FIFO guarded by a
//! `Mutex`/`Condvar` pair.
//!
//! Grounded on the thread-pool chapter's `ThreadPool`/`Worker` split (same
//! idea: a fixed number of long-lived threads pulling boxed closures off a
//! shared queue), adapted from that chapter's `mpsc` channel to an explicit
//! `Mutex<VecDeque<Job>>` + `Condvar` so the queue can enforce
//! `max_queue_len` and reject work when full instead of growing unbounded.

use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};

use log::{error, info};

type Job = Box<dyn FnOnce() + Send + 'static>;

struct Shared {
    queue: Mutex<VecDeque<Job>>,
    not_empty: Condvar,
    max_len: usize,
    shutting_down: Mutex<bool>,
}

/// A fixed-size pool of worker threads draining a bounded job queue.
pub struct WorkerPool {
    shared: Arc<Shared>,
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawns `worker_count` threads, each looping on `queue.pop_front()`
    /// until the pool is dropped. `max_queue_len` bounds how many pending
    /// jobs `submit` will accept before returning `Err`.
    pub fn new(worker_count: usize, max_queue_len: usize) -> Self {
        assert!(worker_count >= 1, "worker pool needs at least one thread");
        let shared = Arc::new(Shared {
            queue: Mutex::new(VecDeque::new()),
            not_empty: Condvar::new(),
            max_len: max_queue_len,
            shutting_down: Mutex::new(false),
        });

        let workers = (0..worker_count)
            .map(|id| {
                let shared = Arc::clone(&shared);
                thread::Builder::new()
                    .name(format!("webcc-worker-{id}"))
                    .spawn(move || {
                        info!("worker {id} started");
                        worker_loop(shared);
                        info!("worker {id} stopped");
                    })
                    .expect("failed to spawn worker thread")
            })
            .collect();

        WorkerPool { shared, workers }
    }

    /// Pushes `job` onto the queue, waking one worker. Returns `Err(job)`
    /// with the job handed back when the queue is already at
    /// `max_queue_len`, so the caller (the acceptor) can apply backpressure
    /// instead of growing memory without bound.
    pub fn submit(&self, job: Job) -> Result<(), Job> {
        let mut queue = self.shared.queue.lock().unwrap();
        if queue.len() >= self.shared.max_len {
            return Err(job);
        }
        queue.push_back(job);
        self.shared.not_empty.notify_one();
        Ok(())
    }

    pub fn pending(&self) -> usize {
        self.shared.queue.lock().unwrap().len()
    }

    /// `true` iff `submit` would currently accept another job. The acceptor
    /// checks this before doing any work to build the job closure, so it can
    /// answer `503` on the stream it would otherwise have handed off.
    pub fn has_capacity(&self) -> bool {
        self.shared.queue.lock().unwrap().len() < self.shared.max_len
    }
}

fn worker_loop(shared: Arc<Shared>) {
    loop {
        let job = {
            let mut queue = shared.queue.lock().unwrap();
            loop {
                if let Some(job) = queue.pop_front() {
                    break Some(job);
                }
                if *shared.shutting_down.lock().unwrap() {
                    return;
                }
                queue = shared.not_empty.wait(queue).unwrap();
            }
        };
        if let Some(job) = job {
            // A panicking job must not take the worker thread down with it.
            if let Err(panic) = panic::catch_unwind(AssertUnwindSafe(job)) {
                let message = panic
                    .downcast_ref::<&str>()
                    .copied()
                    .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
                    .unwrap_or("<non-string panic payload>");
                error!("worker job panicked: {message}");
            }
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        *self.shared.shutting_down.lock().unwrap() = true;
        self.shared.not_empty.notify_all();
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[test]
    fn submitted_jobs_run() {
        let pool = WorkerPool::new(2, 16);
        let counter = Arc::new(AtomicUsize::new(0));
        for _ in 0..8 {
            let counter = Arc::clone(&counter);
            pool.submit(Box::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }))
            .unwrap();
        }
        thread::sleep(Duration::from_millis(200));
        assert_eq!(counter.load(Ordering::SeqCst), 8);
    }

    #[test]
    fn a_panicking_job_does_not_stop_the_worker_from_taking_more_work() {
        let pool = WorkerPool::new(1, 16);
        pool.submit(Box::new(|| panic!("boom"))).unwrap();
        let counter = Arc::new(AtomicUsize::new(0));
        let counter_clone = Arc::clone(&counter);
        pool.submit(Box::new(move || {
            counter_clone.fetch_add(1, Ordering::SeqCst);
        }))
        .unwrap();
        thread::sleep(Duration::from_millis(200));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn full_queue_rejects_submission() {
        let pool = WorkerPool::new(1, 1);
        // Occupy the single worker so the queue backs up.
        let (tx, rx) = std::sync::mpsc::channel::<()>();
        pool.submit(Box::new(move || {
            let _ = rx.recv();
        }))
        .unwrap();
        thread::sleep(Duration::from_millis(100));
        pool.submit(Box::new(|| {})).unwrap();
        assert!(pool.submit(Box::new(|| {})).is_err());
        let _ = tx.send(());
    }
}
