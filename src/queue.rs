//! Bounded priority frame queue, the hand-off point between adjacent
//! pipeline stages (Virtual Channel → Master Channel → Physical Channel).
//!
//! No crate in the reference corpus offers bounded + blocking/non-blocking
//! + priority-ordered + explicitly-closable semantics together:
//! `crossbeam-channel` gives bounded MPSC with blocking and non-blocking
//! variants but no priority ordering, and a binary-heap-based priority
//! queue crate gives ordering but no blocking receive or close signal. The
//! combination is built directly on `std::sync::{Mutex, Condvar}`, the same
//! primitives `crossbeam-channel` itself is built from, rather than forcing
//! a poor fit onto an ecosystem crate (see DESIGN.md).
//!
//! Every enqueued payload is a fully serialized Transfer Frame, not an
//! opaque buffer: `send` rejects anything whose length doesn't match the
//! queue's fixed frame size, and `receive` CRC-checks the dequeued frame's
//! FECF before handing it back, so a corrupted frame is rejected at the
//! hand-off rather than silently forwarded downstream.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::{Result, TmFrameError};
use crate::fecf;

/// A queued frame tagged with its sending priority. Higher `priority`
/// values are delivered first; frames of equal priority are delivered FIFO.
#[derive(Debug, Clone)]
struct Entry {
    priority: u8,
    payload: Vec<u8>,
}

struct Inner {
    entries: VecDeque<Entry>,
    closed: bool,
}

/// A bounded, priority-ordered queue of serialized frames.
///
/// `capacity` bounds the number of entries, not bytes: every enqueued
/// payload is expected to already be a fixed-size serialized frame, so
/// entry count and octet count are proportional.
pub struct FrameQueue {
    name: &'static str,
    capacity: usize,
    frame_size: usize,
    state: Mutex<Inner>,
    not_empty: Condvar,
    not_full: Condvar,
}

impl FrameQueue {
    /// Create a new queue with the given bounded capacity, holding only
    /// serialized frames of exactly `frame_size` octets.
    pub fn create(name: &'static str, capacity: usize, frame_size: usize) -> Self {
        Self {
            name,
            capacity,
            frame_size,
            state: Mutex::new(Inner {
                entries: VecDeque::new(),
                closed: false,
            }),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
        }
    }

    fn validate_outgoing(&self, payload: &[u8]) -> Result<()> {
        if payload.len() != self.frame_size {
            return Err(TmFrameError::SizeMismatch {
                expected: self.frame_size,
                actual: payload.len(),
            });
        }
        Ok(())
    }

    fn validate_incoming(&self, payload: Vec<u8>) -> Result<Vec<u8>> {
        if payload.len() != self.frame_size {
            return Err(TmFrameError::SizeMismatch {
                expected: self.frame_size,
                actual: payload.len(),
            });
        }
        fecf::verify(&payload)?;
        Ok(payload)
    }

    /// Enqueue `payload` at `priority`, blocking the caller while the queue
    /// is full. Fails with [TmFrameError::SizeMismatch] if `payload` isn't a
    /// full serialized frame, or [TmFrameError::QueueClosed] if the queue
    /// has been closed, whether before or during the wait.
    pub fn send_blocking(&self, payload: Vec<u8>, priority: u8) -> Result<()> {
        self.validate_outgoing(&payload)?;
        let mut state = self.state.lock().unwrap();
        loop {
            if state.closed {
                return Err(TmFrameError::QueueClosed(self.name));
            }
            if state.entries.len() < self.capacity {
                self.insert_ordered(&mut state, priority, payload);
                self.not_empty.notify_one();
                return Ok(());
            }
            state = self.not_full.wait(state).unwrap();
        }
    }

    /// Enqueue `payload` at `priority` without blocking. Fails with
    /// [TmFrameError::SizeMismatch] if `payload` isn't a full serialized
    /// frame, [TmFrameError::QueueFull] if the queue is at capacity, or
    /// [TmFrameError::QueueClosed] if the queue is closed.
    pub fn send_nonblocking(&self, payload: Vec<u8>, priority: u8) -> Result<()> {
        self.validate_outgoing(&payload)?;
        let mut state = self.state.lock().unwrap();
        if state.closed {
            return Err(TmFrameError::QueueClosed(self.name));
        }
        if state.entries.len() >= self.capacity {
            warn!(queue = self.name, capacity = self.capacity, "queue full, dropping send");
            return Err(TmFrameError::QueueFull(self.name));
        }
        self.insert_ordered(&mut state, priority, payload);
        self.not_empty.notify_one();
        Ok(())
    }

    /// Dequeue the highest-priority (oldest among ties) entry, blocking the
    /// caller while the queue is empty. Fails with
    /// [TmFrameError::QueueClosed] once the queue is closed and drained, or
    /// [TmFrameError::CrcMismatch]/[TmFrameError::SizeMismatch] if the
    /// dequeued frame fails validation.
    pub fn receive_blocking(&self) -> Result<Vec<u8>> {
        let mut state = self.state.lock().unwrap();
        loop {
            if let Some(entry) = state.entries.pop_front() {
                self.not_full.notify_one();
                return self.validate_incoming(entry.payload);
            }
            if state.closed {
                return Err(TmFrameError::QueueClosed(self.name));
            }
            state = self.not_empty.wait(state).unwrap();
        }
    }

    /// Dequeue without blocking. Fails with [TmFrameError::QueueEmpty] if
    /// nothing is queued, [TmFrameError::QueueClosed] if the queue is
    /// closed and drained, or [TmFrameError::CrcMismatch]/
    /// [TmFrameError::SizeMismatch] if the dequeued frame fails validation.
    pub fn receive_nonblocking(&self) -> Result<Vec<u8>> {
        let mut state = self.state.lock().unwrap();
        if let Some(entry) = state.entries.pop_front() {
            self.not_full.notify_one();
            return self.validate_incoming(entry.payload);
        }
        if state.closed {
            return Err(TmFrameError::QueueClosed(self.name));
        }
        Err(TmFrameError::QueueEmpty(self.name))
    }

    /// Dequeue, blocking up to `timeout` while the queue is empty.
    pub fn receive_timeout(&self, timeout: Duration) -> Result<Vec<u8>> {
        let mut state = self.state.lock().unwrap();
        loop {
            if let Some(entry) = state.entries.pop_front() {
                self.not_full.notify_one();
                return self.validate_incoming(entry.payload);
            }
            if state.closed {
                return Err(TmFrameError::QueueClosed(self.name));
            }
            let (next, timed_out) = self.not_empty.wait_timeout(state, timeout).unwrap();
            state = next;
            if timed_out.timed_out() {
                return Err(TmFrameError::QueueEmpty(self.name));
            }
        }
    }

    /// Close the queue: every future `send_*` fails immediately, and
    /// `receive_*` continues to drain whatever is already queued before it
    /// also starts failing.
    pub fn close(&self) {
        let mut state = self.state.lock().unwrap();
        state.closed = true;
        debug!(queue = self.name, pending = state.entries.len(), "queue closed");
        self.not_empty.notify_all();
        self.not_full.notify_all();
    }

    /// Number of entries currently queued.
    pub fn len(&self) -> usize {
        self.state.lock().unwrap().entries.len()
    }

    /// Whether the queue currently holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn insert_ordered(&self, state: &mut Inner, priority: u8, payload: Vec<u8>) {
        let pos = state
            .entries
            .iter()
            .position(|e| e.priority < priority)
            .unwrap_or(state.entries.len());
        state.entries.insert(pos, Entry { priority, payload });
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    const FRAME_SIZE: usize = 4;

    /// A tiny but fully valid "frame": a 2-octet body tagged with `tag`,
    /// followed by its real CRC-16-CCITT FECF.
    fn frame(tag: u8) -> Vec<u8> {
        let body = [tag, 0u8];
        let mut out = body.to_vec();
        fecf::insert(&body, &mut out);
        out
    }

    #[test]
    fn fifo_within_priority() {
        let q = FrameQueue::create("test", 8, FRAME_SIZE);
        q.send_nonblocking(frame(1), 0).unwrap();
        q.send_nonblocking(frame(2), 0).unwrap();
        q.send_nonblocking(frame(3), 0).unwrap();
        assert_eq!(q.receive_nonblocking().unwrap(), frame(1));
        assert_eq!(q.receive_nonblocking().unwrap(), frame(2));
        assert_eq!(q.receive_nonblocking().unwrap(), frame(3));
    }

    #[test]
    fn higher_priority_delivered_first() {
        let q = FrameQueue::create("test", 8, FRAME_SIZE);
        q.send_nonblocking(frame(1), 0).unwrap();
        q.send_nonblocking(frame(2), 5).unwrap();
        q.send_nonblocking(frame(3), 1).unwrap();
        assert_eq!(q.receive_nonblocking().unwrap(), frame(2));
        assert_eq!(q.receive_nonblocking().unwrap(), frame(3));
        assert_eq!(q.receive_nonblocking().unwrap(), frame(1));
    }

    #[test]
    fn nonblocking_send_on_full_queue_fails() {
        let q = FrameQueue::create("test", 1, FRAME_SIZE);
        q.send_nonblocking(frame(1), 0).unwrap();
        assert!(matches!(
            q.send_nonblocking(frame(2), 0),
            Err(TmFrameError::QueueFull("test"))
        ));
    }

    #[test]
    fn nonblocking_receive_on_empty_queue_fails() {
        let q = FrameQueue::create("test", 1, FRAME_SIZE);
        assert!(matches!(
            q.receive_nonblocking(),
            Err(TmFrameError::QueueEmpty("test"))
        ));
    }

    #[test]
    fn closed_queue_rejects_sends_but_drains_first() {
        let q = FrameQueue::create("test", 4, FRAME_SIZE);
        q.send_nonblocking(frame(1), 0).unwrap();
        q.close();
        assert!(matches!(
            q.send_nonblocking(frame(2), 0),
            Err(TmFrameError::QueueClosed("test"))
        ));
        assert_eq!(q.receive_nonblocking().unwrap(), frame(1));
        assert!(matches!(
            q.receive_nonblocking(),
            Err(TmFrameError::QueueClosed("test"))
        ));
    }

    #[test]
    fn blocking_receive_wakes_on_send() {
        let q = Arc::new(FrameQueue::create("test", 4, FRAME_SIZE));
        let consumer = Arc::clone(&q);
        let handle = thread::spawn(move || consumer.receive_blocking().unwrap());

        thread::sleep(Duration::from_millis(20));
        q.send_blocking(frame(9), 0).unwrap();

        assert_eq!(handle.join().unwrap(), frame(9));
    }

    #[test]
    fn blocking_receive_unblocks_on_close() {
        let q = Arc::new(FrameQueue::create("test", 4, FRAME_SIZE));
        let consumer = Arc::clone(&q);
        let handle = thread::spawn(move || consumer.receive_blocking());

        thread::sleep(Duration::from_millis(20));
        q.close();

        assert!(matches!(
            handle.join().unwrap(),
            Err(TmFrameError::QueueClosed("test"))
        ));
    }

    #[test]
    fn blocking_send_waits_for_capacity() {
        let q = Arc::new(FrameQueue::create("test", 1, FRAME_SIZE));
        q.send_nonblocking(frame(1), 0).unwrap();

        let producer = Arc::clone(&q);
        let handle = thread::spawn(move || producer.send_blocking(frame(2), 0));

        thread::sleep(Duration::from_millis(20));
        assert_eq!(q.receive_nonblocking().unwrap(), frame(1));
        handle.join().unwrap().unwrap();
        assert_eq!(q.receive_nonblocking().unwrap(), frame(2));
    }

    #[test]
    fn send_rejects_payload_of_wrong_length() {
        let q = FrameQueue::create("test", 4, FRAME_SIZE);
        assert!(matches!(
            q.send_nonblocking(vec![0u8; FRAME_SIZE - 1], 0),
            Err(TmFrameError::SizeMismatch { .. })
        ));
    }

    #[test]
    fn receive_rejects_a_frame_whose_fecf_was_corrupted_in_the_queue() {
        let q = FrameQueue::create("test", 4, FRAME_SIZE);
        let mut corrupt = frame(1);
        let last = corrupt.len() - 1;
        corrupt[last] ^= 0xFF;
        // bypass send's own validation to simulate corruption at rest
        q.state.lock().unwrap().entries.push_back(Entry {
            priority: 0,
            payload: corrupt,
        });
        assert!(matches!(
            q.receive_nonblocking(),
            Err(TmFrameError::CrcMismatch { .. })
        ));
    }
}
