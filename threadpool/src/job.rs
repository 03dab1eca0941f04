use std::{
    fmt,
    panic::{self, AssertUnwindSafe},
    thread,
};

type Task = Box<dyn FnOnce() + Send + 'static>;

/// A unit of work with a declared size used for SJF ordering.
pub struct Job {
    size: u32,
    task: Task,
}

impl Job {
    pub fn new<F>(size: u32, task: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            size,
            task: Box::new(task),
        }
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    /// Consumes the job and runs it, catching a panic in the callable.
    pub fn run(self) -> thread::Result<()> {
        panic::catch_unwind(AssertUnwindSafe(self.task))
    }
}

impl fmt::Debug for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Job").field("size", &self.size).finish()
    }
}
