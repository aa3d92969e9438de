//! A fixed-size pool of worker threads fed by a shared job queue.
//!
//! [`ThreadPool::new`] hands back the pool, a cloneable [`JobSender`] and the
//! receiving end of the result queue. Jobs may enqueue further jobs through a
//! cloned sender; the result queue closes once every sender is gone and the
//! workers have drained the job queue.
//!
//! ```
//! use threadpool::ThreadPool;
//!
//! let (pool, jobs, results) = ThreadPool::new::<u64>(4);
//! for i in 0..10 {
//!     jobs.add(Box::new(move || i * i));
//! }
//! drop(jobs);
//! let total: u64 = results.into_iter().map(|r| r.unwrap()).sum();
//! drop(pool);
//! assert_eq!(total, 285);
//! ```

use std::{
    panic::{self, AssertUnwindSafe},
    sync::{
        atomic::{AtomicBool, Ordering},
        mpsc::{channel, Receiver, Sender},
        Arc, Mutex, PoisonError,
    },
    thread::{self, JoinHandle},
};

use tracing::{debug, warn};

pub type Job<T> = Box<dyn FnOnce() -> T + Send + 'static>;

/// Result of one job. `Err` carries the panic payload if the job panicked.
pub type JobResult<T> = thread::Result<T>;

pub struct ThreadPool {
    handles: Vec<JoinHandle<()>>,
    cancelled: Arc<AtomicBool>,
}

pub struct ThreadPoolJobSender<T> {
    job_sender: Sender<Job<T>>,
}

pub type JobSender<T> = ThreadPoolJobSender<T>;

impl<T> Clone for ThreadPoolJobSender<T> {
    fn clone(&self) -> Self {
        Self {
            job_sender: self.job_sender.clone(),
        }
    }
}

impl<T> ThreadPoolJobSender<T> {
    /// Queues a job. Returns `false` if every worker has already exited.
    pub fn add(&self, job: Job<T>) -> bool {
        self.job_sender.send(job).is_ok()
    }
}

impl ThreadPool {
    pub fn new<T: Send + 'static>(
        cap: usize,
    ) -> (Self, ThreadPoolJobSender<T>, Receiver<JobResult<T>>) {
        assert_ne!(cap, 0);
        let (job_sender, job_receiver) = channel::<Job<T>>();
        let (result_sender, result_receiver) = channel::<JobResult<T>>();
        let receiver = Arc::new(Mutex::new(job_receiver));
        let cancelled = Arc::new(AtomicBool::new(false));
        let mut handles = Vec::with_capacity(cap);
        for id in 0..cap {
            let rc = Arc::clone(&receiver);
            let results = result_sender.clone();
            let cancelled = Arc::clone(&cancelled);
            handles.push(thread::spawn(move || loop {
                // Guard must drop before the job runs or the queue serializes.
                let job = rc.lock().unwrap_or_else(PoisonError::into_inner).recv();
                let Ok(job) = job else {
                    debug!(worker = id, "job queue closed");
                    break;
                };
                if cancelled.load(Ordering::Acquire) {
                    drop(job);
                    continue;
                }
                let out = panic::catch_unwind(AssertUnwindSafe(job));
                if out.is_err() {
                    warn!(worker = id, "job panicked");
                }
                let _ = results.send(out);
            }));
        }
        (
            ThreadPool { handles, cancelled },
            ThreadPoolJobSender { job_sender },
            result_receiver,
        )
    }

    /// Stops queued jobs from running. Jobs already executing finish normally.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    pub fn size(&self) -> usize {
        self.handles.len()
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        while let Some(handle) = self.handles.pop() {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn runs_every_job() {
        let (pool, jobs, results) = ThreadPool::new::<u64>(8);
        assert_eq!(pool.size(), 8);
        for i in 0..200 {
            assert!(jobs.add(Box::new(move || i * i)));
        }
        drop(jobs);
        let mut squares: Vec<u64> = results.into_iter().map(|r| r.unwrap()).collect();
        drop(pool);
        squares.sort_unstable();
        assert_eq!(squares, (0..200).map(|i| i * i).collect::<Vec<_>>());
    }

    #[test]
    fn jobs_can_enqueue_jobs() {
        let (pool, jobs, results) = ThreadPool::new::<usize>(2);
        let inner = jobs.clone();
        jobs.add(Box::new(move || {
            for i in 1..=3 {
                inner.add(Box::new(move || i));
            }
            0
        }));
        drop(jobs);
        let total: usize = results.into_iter().map(|r| r.unwrap()).sum();
        drop(pool);
        assert_eq!(total, 6);
    }

    #[test]
    fn panicking_job_is_reported() {
        let (pool, jobs, results) = ThreadPool::new::<u8>(1);
        jobs.add(Box::new(|| panic!("boom")));
        jobs.add(Box::new(|| 7));
        drop(jobs);
        let outcomes: Vec<JobResult<u8>> = results.into_iter().collect();
        drop(pool);
        assert_eq!(outcomes.len(), 2);
        assert!(outcomes[0].is_err());
        assert_eq!(*outcomes[1].as_ref().unwrap(), 7);
    }

    #[test]
    fn cancelled_pool_skips_queued_jobs() {
        let (pool, jobs, results) = ThreadPool::new::<()>(1);
        let ran = Arc::new(AtomicUsize::new(0));
        pool.cancel();
        for _ in 0..5 {
            let ran = Arc::clone(&ran);
            jobs.add(Box::new(move || {
                ran.fetch_add(1, Ordering::SeqCst);
            }));
        }
        drop(jobs);
        assert_eq!(results.into_iter().count(), 0);
        assert!(pool.is_cancelled());
        drop(pool);
        assert_eq!(ran.load(Ordering::SeqCst), 0);
    }
}
