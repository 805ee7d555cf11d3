//! Elastic pool of consumer threads draining the dispatch queue
//!
//! Each consumer moves through `Running → Draining → Terminated`:
//!
//! - **Running**: blocks on the queue, processes records, flushes sinks when
//!   the queue runs dry or the flush interval elapses.
//! - **Draining**: the queue has been closed; remaining records are
//!   processed without blocking.
//! - **Terminated**: sinks flushed, live count decremented, shutdown notified.
//!
//! The live count lives under its own mutex, independent of the logger's
//! configuration lock. Starting a consumer checks the maximum and the closing
//! flag and increments the count in one critical section, so the pool never
//! exceeds its maximum and never grows once shutdown has begun. There is no
//! scale-down.

use super::{
    error::{panic_message, LoggerError},
    record::Record,
};
use crossbeam_channel::{Receiver, RecvTimeoutError};
use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Lifecycle of a single consumer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumerState {
    Running,
    Draining,
    Terminated,
}

/// Work a consumer performs for each dequeued record
pub trait RecordProcessor: Send + Sync {
    /// Run the record through hooks, formatting and sinks, then recycle it
    fn process(&self, record: Box<Record>, consumer: usize);

    /// Flush buffered sink output
    fn flush(&self, consumer: usize);

    /// Whether the producer side has been closed
    fn is_closing(&self) -> bool;

    /// A record's processing panicked; the record is gone
    fn on_panic(&self, error: LoggerError);
}

#[derive(Debug, Default)]
struct PoolState {
    live: usize,
    closing: bool,
}

pub struct ConsumerPool {
    state: Mutex<PoolState>,
    terminated: Condvar,
    max: usize,
    flush_interval: Duration,
    receiver: Receiver<Box<Record>>,
    next_id: AtomicUsize,
}

impl ConsumerPool {
    pub fn new(receiver: Receiver<Box<Record>>, max: usize, flush_interval: Duration) -> Self {
        Self {
            state: Mutex::new(PoolState::default()),
            terminated: Condvar::new(),
            max: max.max(1),
            flush_interval,
            receiver,
            next_id: AtomicUsize::new(0),
        }
    }

    /// Number of consumers that have started and not yet terminated
    pub fn live(&self) -> usize {
        self.state.lock().live
    }

    pub fn max(&self) -> usize {
        self.max
    }

    pub fn is_closing(&self) -> bool {
        self.state.lock().closing
    }

    /// Start one consumer unless the pool is full or closing
    ///
    /// Returns whether a consumer was started.
    pub fn try_spawn(self: &Arc<Self>, processor: Arc<dyn RecordProcessor>) -> bool {
        {
            let mut state = self.state.lock();
            if state.closing || state.live >= self.max {
                return false;
            }
            state.live += 1;
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let pool = Arc::clone(self);
        let spawned = thread::Builder::new()
            .name(format!("log-consumer-{}", id))
            .spawn(move || pool.run(processor, id));

        match spawned {
            Ok(_) => true,
            Err(e) => {
                // The thread never ran, so its live slot is given back here.
                LiveGuard { pool: self }.release();
                eprintln!("[LOGGER ERROR] Failed to start consumer #{}: {}", id, e);
                false
            }
        }
    }

    /// Refuse further consumers; the live ones keep draining
    pub fn begin_close(&self) {
        self.state.lock().closing = true;
    }

    /// Refuse further consumers and block until every live one terminates
    pub fn close_and_wait(&self) {
        let mut state = self.state.lock();
        state.closing = true;
        while state.live > 0 {
            self.terminated.wait(&mut state);
        }
    }

    fn run(&self, processor: Arc<dyn RecordProcessor>, id: usize) {
        // Decrements the live count even if this thread unwinds.
        let _guard = LiveGuard { pool: self };
        let mut state = ConsumerState::Running;

        while state != ConsumerState::Terminated {
            state = match state {
                ConsumerState::Running => match self.receiver.recv_timeout(self.flush_interval) {
                    Ok(record) => {
                        self.handle(&*processor, record, id);
                        if processor.is_closing() {
                            ConsumerState::Draining
                        } else {
                            ConsumerState::Running
                        }
                    }
                    Err(RecvTimeoutError::Timeout) => {
                        processor.flush(id);
                        ConsumerState::Running
                    }
                    Err(RecvTimeoutError::Disconnected) => ConsumerState::Draining,
                },
                ConsumerState::Draining => match self.receiver.try_recv() {
                    Ok(record) => {
                        self.handle(&*processor, record, id);
                        ConsumerState::Draining
                    }
                    Err(_) => {
                        processor.flush(id);
                        ConsumerState::Terminated
                    }
                },
                ConsumerState::Terminated => ConsumerState::Terminated,
            };
        }
    }

    fn handle(&self, processor: &dyn RecordProcessor, record: Box<Record>, id: usize) {
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            processor.process(record, id)
        }));

        if let Err(panic_info) = result {
            processor.on_panic(LoggerError::ConsumerPanicked {
                consumer: id,
                message: panic_message(panic_info.as_ref()),
            });
        }

        if self.receiver.is_empty() {
            processor.flush(id);
        }
    }
}

struct LiveGuard<'a> {
    pool: &'a ConsumerPool,
}

impl LiveGuard<'_> {
    fn release(self) {
        // Drop does the work.
    }
}

impl Drop for LiveGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.pool.state.lock();
        state.live = state.live.saturating_sub(1);
        if state.live == 0 {
            self.pool.terminated.notify_all();
        }
    }
}
