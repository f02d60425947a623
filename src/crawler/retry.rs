//! Retry / engine-fallback state machine
//!
//! Each URL carries `(attempt, engine)` state. A retriable status burns
//! attempts on the current engine first, then falls through to the next
//! engine with a fresh attempt counter, and only when the engine list is
//! exhausted does the last response become terminal. Re-enqueues go through
//! the OUT queue and never touch the quota counters: the original
//! reservation is still live.

use crate::crawler::request::{FetchRequest, FetchResponse};

/// What to do with a completed fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryVerdict {
    /// Push this follow-up request back to OUT; counters untouched
    Reenqueue(FetchRequest),
    /// Emit the response downstream and complete the domain slot
    Terminal,
}

/// Immutable retry policy shared by all workers
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    maximum_retries: u32,
    codes_to_retry: Vec<i32>,
    engine_count: usize,
}

impl RetryPolicy {
    pub fn new(maximum_retries: u32, codes_to_retry: Vec<i32>, engine_count: usize) -> Self {
        Self {
            maximum_retries,
            codes_to_retry,
            engine_count,
        }
    }

    fn is_retriable(&self, status_code: i32) -> bool {
        status_code == -1 || self.codes_to_retry.contains(&status_code)
    }

    /// Applies the state machine to one completed fetch
    pub fn assess(&self, response: &FetchResponse) -> RetryVerdict {
        if !self.is_retriable(response.status_code) {
            return RetryVerdict::Terminal;
        }

        let request = &response.request;
        if request.attempt + 1 <= self.maximum_retries {
            return RetryVerdict::Reenqueue(request.retried());
        }
        if request.engine + 1 < self.engine_count {
            return RetryVerdict::Reenqueue(request.on_next_engine());
        }
        RetryVerdict::Terminal
    }

    /// Upper bound of fetches a single URL can cost:
    /// `(maximum_retries + 1) * engine_count`
    pub fn max_fetches_per_url(&self) -> u32 {
        (self.maximum_retries + 1) * self.engine_count as u32
    }
}
