use crate::{Job, JobQueue, PoolError};
use parking_lot::{Condvar, Mutex};
use std::{
    sync::Arc,
    thread::{self, JoinHandle},
};
use tracing::{debug, error, info, trace};

pub const DEFAULT_THREAD_NAME: &str = "mr-worker";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PoolStats {
    /// Jobs accepted over the pool's whole lifetime.
    pub submitted: u64,
    /// Jobs that have finished running, panicked ones included.
    pub completed: u64,
    /// Jobs waiting in the queue.
    pub queued: usize,
}

impl PoolStats {
    pub fn in_flight(&self) -> u64 {
        self.submitted - self.completed - self.queued as u64
    }
}

#[derive(Debug, Default)]
struct State {
    queue: JobQueue,
    submitted: u64,
    completed: u64,
    shutdown: bool,
}

#[derive(Debug, Default)]
struct Shared {
    state: Mutex<State>,
    available: Condvar,
    all_done: Condvar,
}

impl Shared {
    fn submit(&self, job: Job) -> Result<(), PoolError> {
        let mut state = self.state.lock();
        if state.shutdown {
            return Err(PoolError::ShutDown);
        }
        trace!(size = job.size(), queued = state.queue.len(), "job submitted");
        state.queue.push(job);
        state.submitted += 1;
        self.available.notify_one();
        Ok(())
    }

    fn barrier(&self) {
        let mut state = self.state.lock();
        while state.completed < state.submitted {
            self.all_done.wait(&mut state);
        }
    }

    fn shutdown(&self) {
        let mut state = self.state.lock();
        if !state.shutdown {
            state.shutdown = true;
            info!(queued = state.queue.len(), "thread pool shutting down");
        }
        self.available.notify_all();
    }

    fn stats(&self) -> PoolStats {
        let state = self.state.lock();
        PoolStats {
            submitted: state.submitted,
            completed: state.completed,
            queued: state.queue.len(),
        }
    }

    /// Blocks until a job is available. `None` once shut down and drained.
    fn next_job(&self) -> Option<Job> {
        let mut state = self.state.lock();
        while state.queue.is_empty() && !state.shutdown {
            self.available.wait(&mut state);
        }
        let job = state.queue.pop();
        if job.is_none() {
            self.all_done.notify_all();
        }
        job
    }

    fn complete(&self) {
        let mut state = self.state.lock();
        state.completed += 1;
        if state.completed == state.submitted {
            self.all_done.notify_all();
        }
    }

    fn work(&self) {
        let name = thread::current().name().unwrap_or_default().to_string();
        debug!(worker = %name, "worker started");
        while let Some(job) = self.next_job() {
            let size = job.size();
            trace!(worker = %name, size, "job dequeued");
            // the queue lock is not held here
            if job.run().is_err() {
                error!(worker = %name, size, "job panicked");
            }
            self.complete();
        }
        debug!(worker = %name, "worker exiting");
    }
}

/// Cloneable handle for submitting work from outside the owning scope,
/// including from inside running jobs.
#[derive(Debug, Clone)]
pub struct PoolHandle {
    shared: Arc<Shared>,
}

impl PoolHandle {
    pub fn submit<F>(&self, size: u32, f: F) -> Result<(), PoolError>
    where
        F: FnOnce() + Send + 'static,
    {
        self.shared.submit(Job::new(size, f))
    }

    /// Must not be called from inside a job of the same pool: the calling
    /// job is itself counted as outstanding.
    pub fn barrier(&self) {
        self.shared.barrier()
    }

    pub fn stats(&self) -> PoolStats {
        self.shared.stats()
    }
}

/// Fixed set of worker threads serving one [`JobQueue`].
///
/// Dropping the pool is equivalent to [`ThreadPool::join`]: intake stops,
/// every queued job still runs, and all workers are joined.
#[derive(Debug)]
pub struct ThreadPool {
    shared: Arc<Shared>,
    workers: Vec<JoinHandle<()>>,
}

impl ThreadPool {
    pub fn new(threads: usize) -> Result<Self, PoolError> {
        Self::with_name(threads, DEFAULT_THREAD_NAME)
    }

    /// Worker threads are named `{prefix}-{index}`.
    pub fn with_name(threads: usize, prefix: &str) -> Result<Self, PoolError> {
        if threads == 0 {
            return Err(PoolError::InvalidThreadCount);
        }
        // on a spawn failure `pool` is dropped, which joins the workers
        // spawned so far
        let mut pool = Self {
            shared: Arc::new(Shared::default()),
            workers: Vec::with_capacity(threads),
        };
        for index in 0..threads {
            let shared = Arc::clone(&pool.shared);
            let handle = thread::Builder::new()
                .name(format!("{prefix}-{index}"))
                .spawn(move || shared.work())?;
            pool.workers.push(handle);
        }
        info!(threads, "thread pool created");
        Ok(pool)
    }

    pub fn threads(&self) -> usize {
        self.workers.len()
    }

    /// Queues `f` with the declared `size`. Fails once shut down.
    pub fn submit<F>(&self, size: u32, f: F) -> Result<(), PoolError>
    where
        F: FnOnce() + Send + 'static,
    {
        self.shared.submit(Job::new(size, f))
    }

    /// Blocks until every job submitted so far has completed.
    pub fn barrier(&self) {
        self.shared.barrier()
    }

    /// Stops intake and wakes idle workers. Queued jobs still run.
    pub fn shutdown(&self) {
        self.shared.shutdown()
    }

    pub fn stats(&self) -> PoolStats {
        self.shared.stats()
    }

    pub fn handle(&self) -> PoolHandle {
        PoolHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Shuts down, drains the queue and joins every worker.
    pub fn join(mut self) {
        self.destroy();
    }

    fn destroy(&mut self) {
        if self.workers.is_empty() {
            return;
        }
        self.shared.shutdown();
        for handle in self.workers.drain(..) {
            if handle.join().is_err() {
                error!("worker thread panicked outside a job");
            }
        }
        info!("all worker threads joined");
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        self.destroy();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_queue::SegQueue;
    use rand::Rng;
    use std::{
        sync::{
            atomic::{AtomicUsize, Ordering},
            mpsc,
        },
        time::Duration,
    };

    #[test]
    fn test_zero_threads_rejected() {
        assert!(matches!(
            ThreadPool::new(0),
            Err(PoolError::InvalidThreadCount)
        ));
    }

    #[test]
    fn test_worker_names() {
        let pool = ThreadPool::with_name(2, "test-pool").unwrap();
        let names = Arc::new(SegQueue::new());
        for _ in 0..2 {
            let names = Arc::clone(&names);
            pool.submit(1, move || {
                names.push(thread::current().name().unwrap().to_string());
            })
            .unwrap();
        }
        pool.barrier();
        while let Some(name) = names.pop() {
            assert!(name.starts_with("test-pool-"), "{name}");
        }
        assert_eq!(pool.threads(), 2);
    }

    #[test]
    fn test_random_sizes_each_run_once() {
        let pool = ThreadPool::new(4).unwrap();
        let runs: Arc<Vec<AtomicUsize>> = Arc::new((0..10).map(|_| AtomicUsize::new(0)).collect());
        let mut rng = rand::thread_rng();
        for i in 0..10 {
            let runs = Arc::clone(&runs);
            let size = rng.gen_range(0..100);
            pool.submit(size, move || {
                thread::sleep(Duration::from_millis(10));
                runs[i].fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
        }
        pool.barrier();

        let stats = pool.stats();
        assert_eq!(stats.submitted, 10);
        assert_eq!(stats.completed, 10);
        assert_eq!(stats.queued, 0);
        assert_eq!(stats.in_flight(), 0);
        assert!(runs.iter().all(|r| r.load(Ordering::SeqCst) == 1));
        pool.join();
    }

    #[test]
    fn test_dequeue_order_is_sjf() {
        // a single worker held on a gate makes dequeue order observable
        let pool = ThreadPool::new(1).unwrap();
        let (open, gate) = mpsc::channel::<()>();
        pool.submit(0, move || {
            gate.recv().unwrap();
        })
        .unwrap();

        let order = Arc::new(SegQueue::new());
        let mut rng = rand::thread_rng();
        let mut submitted = vec![];
        for i in 0..10 {
            let size = rng.gen_range(0..5);
            submitted.push((size, i));
            let order = Arc::clone(&order);
            pool.submit(size, move || order.push((size, i))).unwrap();
        }
        open.send(()).unwrap();
        pool.barrier();

        let mut observed = vec![];
        while let Some(entry) = order.pop() {
            observed.push(entry);
        }
        // stable sort keeps submission order among ties
        submitted.sort_by_key(|&(size, _)| size);
        assert_eq!(observed, submitted);
    }

    #[test]
    fn test_barrier_reusable_across_phases() {
        let pool = ThreadPool::new(3).unwrap();
        let counter = Arc::new(AtomicUsize::new(0));

        for _ in 0..5 {
            let counter = Arc::clone(&counter);
            pool.submit(10, move || {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
        }
        pool.barrier();
        assert_eq!(counter.load(Ordering::SeqCst), 5);

        for _ in 0..7 {
            let counter = Arc::clone(&counter);
            pool.submit(20, move || {
                thread::sleep(Duration::from_millis(5));
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
        }
        pool.barrier();
        assert_eq!(counter.load(Ordering::SeqCst), 12);
        assert_eq!(pool.stats().completed, 12);
    }

    #[test]
    fn test_barrier_with_no_jobs_returns() {
        let pool = ThreadPool::new(2).unwrap();
        pool.barrier();
        assert_eq!(pool.stats(), PoolStats::default());
    }

    #[test]
    fn test_submit_after_shutdown_rejected() {
        let pool = ThreadPool::new(2).unwrap();
        pool.shutdown();
        assert!(matches!(pool.submit(1, || {}), Err(PoolError::ShutDown)));
        pool.join();
    }

    #[test]
    fn test_submit_during_join_rejected() {
        let pool = ThreadPool::new(2).unwrap();
        let handle = pool.handle();
        let (tx, rx) = mpsc::channel();
        pool.submit(1, move || {
            thread::sleep(Duration::from_millis(100));
            tx.send(handle.submit(1, || {}).is_err()).unwrap();
        })
        .unwrap();
        pool.join();
        assert!(rx.recv().unwrap());
    }

    #[test]
    fn test_join_drains_queued_jobs() {
        let pool = ThreadPool::new(2).unwrap();
        let counter = Arc::new(AtomicUsize::new(0));
        for i in 0..20 {
            let counter = Arc::clone(&counter);
            pool.submit(i % 3, move || {
                thread::sleep(Duration::from_millis(2));
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
        }
        pool.join();
        assert_eq!(counter.load(Ordering::SeqCst), 20);
    }

    #[test]
    fn test_drop_joins_workers() {
        let counter = Arc::new(AtomicUsize::new(0));
        {
            let pool = ThreadPool::new(2).unwrap();
            for _ in 0..4 {
                let counter = Arc::clone(&counter);
                pool.submit(1, move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                })
                .unwrap();
            }
        }
        assert_eq!(counter.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn test_panicking_job_still_completes() {
        let pool = ThreadPool::new(2).unwrap();
        pool.submit(1, || panic!("job failure")).unwrap();
        pool.submit(2, || {}).unwrap();
        pool.barrier();
        assert_eq!(pool.stats().completed, 2);
        // the worker survived and keeps serving
        let (tx, rx) = mpsc::channel();
        pool.submit(1, move || tx.send(()).unwrap()).unwrap();
        pool.barrier();
        assert!(rx.try_recv().is_ok());
    }

    #[test]
    fn test_nested_submit_through_handle() {
        let pool = ThreadPool::new(2).unwrap();
        let handle = pool.handle();
        let counter = Arc::new(AtomicUsize::new(0));
        let inner = Arc::clone(&counter);
        pool.submit(1, move || {
            let counter = Arc::clone(&inner);
            handle
                .submit(1, move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                })
                .unwrap();
            inner.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();
        // the nested job is counted before the outer one completes
        pool.barrier();
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }
}
