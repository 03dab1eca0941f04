use crate::Job;
use std::collections::VecDeque;

/// Jobs ordered by ascending size, oldest first among equal sizes.
#[derive(Debug, Default)]
pub struct JobQueue {
    jobs: VecDeque<Job>,
}

impl JobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts after every queued job whose size is `<=` the new one.
    /// Linear in the queue length.
    pub fn push(&mut self, job: Job) {
        let at = self
            .jobs
            .iter()
            .position(|queued| queued.size() > job.size())
            .unwrap_or(self.jobs.len());
        self.jobs.insert(at, job);
    }

    /// Removes the head: the smallest job, oldest among ties.
    pub fn pop(&mut self) -> Option<Job> {
        self.jobs.pop_front()
    }

    pub fn peek_size(&self) -> Option<u32> {
        self.jobs.front().map(Job::size)
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}
