//! Reuse pool for log records
//!
//! A lock-free free-list bounds allocation churn on the emit path. The pool
//! never blocks: an empty pool allocates, a full pool lets the record drop.

use super::record::Record;
use crossbeam_queue::ArrayQueue;
use std::sync::atomic::{AtomicU64, Ordering};

pub struct RecordPool {
    free: ArrayQueue<Box<Record>>,
    reused: AtomicU64,
    allocated: AtomicU64,
}

impl RecordPool {
    /// Create a pool retaining at most `retain` idle records
    pub fn new(retain: usize) -> Self {
        Self {
            free: ArrayQueue::new(retain.max(1)),
            reused: AtomicU64::new(0),
            allocated: AtomicU64::new(0),
        }
    }

    /// Take a record with no fields, reusing an idle one when available
    pub fn acquire(&self) -> Box<Record> {
        match self.free.pop() {
            Some(record) => {
                self.reused.fetch_add(1, Ordering::Relaxed);
                record
            }
            None => {
                self.allocated.fetch_add(1, Ordering::Relaxed);
                Box::new(Record::new())
            }
        }
    }

    /// Clear a record and return it to the pool
    pub fn release(&self, mut record: Box<Record>) {
        record.reset();
        // Dropped when the pool is already at its retention bound.
        let _ = self.free.push(record);
    }

    /// Number of idle records currently held
    pub fn idle(&self) -> usize {
        self.free.len()
    }

    pub fn reused_count(&self) -> u64 {
        self.reused.load(Ordering::Relaxed)
    }

    pub fn allocated_count(&self) -> u64 {
        self.allocated.load(Ordering::Relaxed)
    }
}
