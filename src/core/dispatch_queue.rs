//! Bounded multi-producer multi-consumer hand-off queue
//!
//! Records cross from producers to consumers as `Box<Record>`; a send moves
//! ownership into the channel and a receive moves it out to one consumer.
//! Closing drops the only sender: consumers keep receiving what is already
//! buffered and then observe disconnection.

use super::record::Record;
use crossbeam_channel::{bounded, Receiver, SendTimeoutError, Sender, TrySendError};
use parking_lot::RwLock;
use std::time::Duration;

/// Reasons a send did not enqueue; the record is handed back
#[derive(Debug)]
pub enum SendError {
    Full(Box<Record>),
    TimedOut(Box<Record>),
    Closed(Box<Record>),
}

impl SendError {
    pub fn into_record(self) -> Box<Record> {
        match self {
            SendError::Full(r) | SendError::TimedOut(r) | SendError::Closed(r) => r,
        }
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, SendError::Closed(_))
    }
}

pub struct DispatchQueue {
    sender: RwLock<Option<Sender<Box<Record>>>>,
    receiver: Receiver<Box<Record>>,
    capacity: usize,
}

impl DispatchQueue {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (sender, receiver) = bounded(capacity);
        Self {
            sender: RwLock::new(Some(sender)),
            receiver,
            capacity,
        }
    }

    /// Non-blocking enqueue
    pub fn try_send(&self, record: Box<Record>) -> Result<(), SendError> {
        let guard = self.sender.read();
        let Some(sender) = guard.as_ref() else {
            return Err(SendError::Closed(record));
        };
        match sender.try_send(record) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(r)) => Err(SendError::Full(r)),
            Err(TrySendError::Disconnected(r)) => Err(SendError::Closed(r)),
        }
    }

    /// Enqueue, waiting at most `timeout` for a free slot
    pub fn send_timeout(&self, record: Box<Record>, timeout: Duration) -> Result<(), SendError> {
        let guard = self.sender.read();
        let Some(sender) = guard.as_ref() else {
            return Err(SendError::Closed(record));
        };
        match sender.send_timeout(record, timeout) {
            Ok(()) => Ok(()),
            Err(SendTimeoutError::Timeout(r)) => Err(SendError::TimedOut(r)),
            Err(SendTimeoutError::Disconnected(r)) => Err(SendError::Closed(r)),
        }
    }

    /// Stop accepting sends; returns `false` if already closed
    pub fn close(&self) -> bool {
        self.sender.write().take().is_some()
    }

    pub fn is_closed(&self) -> bool {
        self.sender.read().is_none()
    }

    /// Receiving handle for a consumer
    pub fn receiver(&self) -> Receiver<Box<Record>> {
        self.receiver.clone()
    }

    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Fraction of slots in use, `0.0..=1.0`
    pub fn occupancy(&self) -> f64 {
        self.len() as f64 / self.capacity as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::LogLevel;
    use std::time::Instant;

    fn record(message: &str) -> Box<Record> {
        Box::new(Record::with_message(LogLevel::Info, message))
    }

    #[test]
    fn test_fifo_order() {
        let queue = DispatchQueue::new(8);
        for i in 0..5 {
            queue.try_send(record(&format!("m{}", i))).expect("send");
        }
        let rx = queue.receiver();
        let received: Vec<String> = (0..5).map(|_| rx.recv().expect("recv").message).collect();
        assert_eq!(received, vec!["m0", "m1", "m2", "m3", "m4"]);
    }

    #[test]
    fn test_full_returns_record() {
        let queue = DispatchQueue::new(1);
        queue.try_send(record("first")).expect("send");
        match queue.try_send(record("second")) {
            Err(SendError::Full(r)) => assert_eq!(r.message, "second"),
            other => panic!("expected Full, got {:?}", other),
        }
        assert_eq!(queue.occupancy(), 1.0);
    }

    #[test]
    fn test_send_timeout_is_bounded() {
        let queue = DispatchQueue::new(1);
        queue.try_send(record("first")).expect("send");

        let start = Instant::now();
        let result = queue.send_timeout(record("second"), Duration::from_millis(30));
        let elapsed = start.elapsed();

        assert!(matches!(result, Err(SendError::TimedOut(_))));
        assert!(elapsed >= Duration::from_millis(30));
        assert!(elapsed < Duration::from_millis(500));
    }

    #[test]
    fn test_close_rejects_sends_and_drains() {
        let queue = DispatchQueue::new(4);
        queue.try_send(record("buffered")).expect("send");

        assert!(queue.close());
        assert!(!queue.close());
        assert!(queue.is_closed());
        assert!(queue.try_send(record("late")).unwrap_err().is_closed());

        let rx = queue.receiver();
        assert_eq!(rx.recv().expect("buffered record").message, "buffered");
        assert!(rx.recv().is_err());
    }
}
