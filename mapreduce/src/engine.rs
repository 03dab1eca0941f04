use crate::{
    Djb2, MapContext, MapReduceError, PartitionStore, Partitioner, ReduceContext, RunConfig,
};
use std::{
    panic::{self, AssertUnwindSafe},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::{Duration, Instant},
};
use threadpool::ThreadPool;
use tracing::{debug, info, info_span, warn, Span};
use uuid::Uuid;

/// Declared size of a map job.
pub const MAP_JOB_SIZE: u32 = 10;
/// Declared size of a reduce job; larger than [`MAP_JOB_SIZE`] so pending
/// map work is always dequeued first.
pub const REDUCE_JOB_SIZE: u32 = 20;

pub type Mapper = dyn Fn(&MapContext<'_>, &str) -> anyhow::Result<()> + Send + Sync;
pub type Reducer = dyn Fn(&ReduceContext<'_>, &str, usize) -> anyhow::Result<()> + Send + Sync;

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub inputs: usize,
    pub partitions: usize,
    pub keys_reduced: usize,
    pub map_failures: usize,
    pub reduce_failures: usize,
    pub elapsed: Duration,
}

/// State of one run, shared by all of its jobs.
struct Session {
    store: PartitionStore,
    mapper: Arc<Mapper>,
    reducer: Arc<Reducer>,
    keys_reduced: AtomicUsize,
    map_failures: AtomicUsize,
    reduce_failures: AtomicUsize,
}

/// Runs a user callable, turning both an error and a panic into a message.
fn guarded(f: impl FnOnce() -> anyhow::Result<()>) -> Result<(), String> {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(format!("{e:#}")),
        Err(payload) => Err(match payload.downcast_ref::<&str>() {
            Some(msg) => format!("panicked: {msg}"),
            None => match payload.downcast_ref::<String>() {
                Some(msg) => format!("panicked: {msg}"),
                None => "panicked".to_string(),
            },
        }),
    }
}

impl Session {
    fn map(&self, input: &str) {
        let ctx = MapContext::new(&self.store, input);
        if let Err(e) = guarded(|| (self.mapper)(&ctx, input)) {
            warn!(input, "mapper failed: {e}");
            self.map_failures.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Every key gets one reducer call, even after an earlier key failed.
    fn reduce(&self, partition: usize) {
        let keys = self.store.sorted_keys(partition);
        debug!(partition, keys = keys.len(), "reducing partition");
        let ctx = ReduceContext::new(&self.store, partition);
        for key in &keys {
            if let Err(e) = guarded(|| (self.reducer)(&ctx, key, partition)) {
                warn!(partition, key = %key, "reducer failed: {e}");
                self.reduce_failures.fetch_add(1, Ordering::Relaxed);
            }
            self.store.release(key, partition);
            self.keys_reduced.fetch_add(1, Ordering::Relaxed);
        }
    }
}

/// A mapper/reducer pair that can be run over any number of input sets.
#[derive(Clone)]
pub struct MapReduce {
    mapper: Arc<Mapper>,
    reducer: Arc<Reducer>,
    partitioner: Arc<dyn Partitioner>,
}

impl MapReduce {
    pub fn new<M, R>(mapper: M, reducer: R) -> Self
    where
        M: Fn(&MapContext<'_>, &str) -> anyhow::Result<()> + Send + Sync + 'static,
        R: Fn(&ReduceContext<'_>, &str, usize) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Self {
            mapper: Arc::new(mapper),
            reducer: Arc::new(reducer),
            partitioner: Arc::new(Djb2),
        }
    }

    pub fn with_partitioner(mut self, partitioner: impl Partitioner + 'static) -> Self {
        self.partitioner = Arc::new(partitioner);
        self
    }

    /// Runs on a fresh pool sized by `config`, destroyed before returning.
    pub fn run_with<I: AsRef<str>>(
        &self,
        config: &RunConfig,
        inputs: &[I],
    ) -> Result<RunSummary, MapReduceError> {
        config.validate()?;
        let pool = ThreadPool::with_name(config.workers, &config.thread_name)?;
        let summary = self.run_on(&pool, config.partitions, inputs);
        pool.join();
        summary
    }

    /// Runs on a caller-owned pool, which stays usable afterwards.
    ///
    /// Phases are separated with [`ThreadPool::barrier`], so the call also
    /// waits for any unrelated work submitted to `pool` meanwhile.
    pub fn run_on<I: AsRef<str>>(
        &self,
        pool: &ThreadPool,
        partitions: usize,
        inputs: &[I],
    ) -> Result<RunSummary, MapReduceError> {
        let run_id = Uuid::new_v4();
        let span = info_span!("run", %run_id);
        let _enter = span.enter();
        let started = Instant::now();

        let session = Arc::new(Session {
            store: PartitionStore::with_partitioner(partitions, Arc::clone(&self.partitioner))?,
            mapper: Arc::clone(&self.mapper),
            reducer: Arc::clone(&self.reducer),
            keys_reduced: AtomicUsize::new(0),
            map_failures: AtomicUsize::new(0),
            reduce_failures: AtomicUsize::new(0),
        });

        info!(inputs = inputs.len(), partitions, workers = pool.threads(), "starting map phase");
        for input in inputs {
            let session = Arc::clone(&session);
            let input = input.as_ref().to_owned();
            let span = Span::current();
            pool.submit(MAP_JOB_SIZE, move || {
                let _enter = span.enter();
                session.map(&input);
            })?;
        }
        pool.barrier();
        info!(keys = session.store.len(), "map phase completed");

        for partition in 0..partitions {
            let session = Arc::clone(&session);
            let span = Span::current();
            pool.submit(REDUCE_JOB_SIZE, move || {
                let _enter = span.enter();
                session.reduce(partition);
            })?;
        }
        pool.barrier();

        let summary = RunSummary {
            run_id,
            inputs: inputs.len(),
            partitions,
            keys_reduced: session.keys_reduced.load(Ordering::Relaxed),
            map_failures: session.map_failures.load(Ordering::Relaxed),
            reduce_failures: session.reduce_failures.load(Ordering::Relaxed),
            elapsed: started.elapsed(),
        };
        info!(
            keys = summary.keys_reduced,
            map_failures = summary.map_failures,
            reduce_failures = summary.reduce_failures,
            elapsed_ms = summary.elapsed.as_millis() as u64,
            "reduce phase completed"
        );
        Ok(summary)
    }
}

/// Runs `mapper` over every input and `reducer` over every key, using
/// `workers` threads and `partitions` shards. Returns once both phases
/// are done and the pool is torn down.
pub fn run<I, M, R>(
    inputs: &[I],
    mapper: M,
    reducer: R,
    workers: usize,
    partitions: usize,
) -> Result<RunSummary, MapReduceError>
where
    I: AsRef<str>,
    M: Fn(&MapContext<'_>, &str) -> anyhow::Result<()> + Send + Sync + 'static,
    R: Fn(&ReduceContext<'_>, &str, usize) -> anyhow::Result<()> + Send + Sync + 'static,
{
    MapReduce::new(mapper, reducer).run_with(&RunConfig::new(workers, partitions), inputs)
}
