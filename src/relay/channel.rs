//! Bounded FIFO byte channel with blocking timeouts on both ends.
//!
//! One producer stage fills a channel, one consumer stage drains it; the six
//! relay channels are created once at startup and live for the process
//! lifetime. A send is all-or-nothing: either the whole payload fits within
//! the timeout or the channel reports `Rejected` and the caller drops the
//! data. Receives return whatever is buffered, up to the requested maximum —
//! partial reads are the normal case, not an error.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant};

use crate::error::ChannelError;

/// Bounded byte buffer shared between exactly one producer task and one
/// consumer task (the type itself tolerates more of each).
pub struct ByteChannel {
    capacity: usize,
    buf: Mutex<VecDeque<u8>>,
    /// Signalled when bytes arrive.
    readable: Condvar,
    /// Signalled when space frees up.
    writable: Condvar,
}

impl ByteChannel {
    /// Create a channel holding at most `capacity` bytes.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "byte channel needs a non-zero capacity");
        Self {
            capacity,
            buf: Mutex::new(VecDeque::with_capacity(capacity)),
            readable: Condvar::new(),
            writable: Condvar::new(),
        }
    }

    /// Enqueue `data` as a single unit, blocking up to `timeout` for space.
    ///
    /// The payload is never split: either all of it is buffered or none of
    /// it is. On `Rejected` the channel state is unchanged and the caller
    /// is expected to drop the data — there is no internal retry.
    pub fn send(&self, data: &[u8], timeout: Duration) -> Result<(), ChannelError> {
        if data.is_empty() {
            return Ok(());
        }
        if data.len() > self.capacity {
            // Could never fit, not even into an empty buffer.
            return Err(ChannelError::Rejected);
        }

        let deadline = Instant::now() + timeout;
        let mut buf = self.buf.lock().expect("byte channel mutex poisoned");
        loop {
            if self.capacity - buf.len() >= data.len() {
                buf.extend(data);
                self.readable.notify_all();
                return Ok(());
            }
            let now = Instant::now();
            if now >= deadline {
                return Err(ChannelError::Rejected);
            }
            let (guard, _) = self
                .writable
                .wait_timeout(buf, deadline - now)
                .expect("byte channel mutex poisoned");
            buf = guard;
        }
    }

    /// Dequeue up to `max_len` bytes, blocking up to `timeout` for the first
    /// byte. Returns `None` only when nothing at all arrived in time.
    pub fn recv_up_to(&self, max_len: usize, timeout: Duration) -> Option<Vec<u8>> {
        if max_len == 0 {
            return None;
        }

        let deadline = Instant::now() + timeout;
        let mut buf = self.buf.lock().expect("byte channel mutex poisoned");
        loop {
            if !buf.is_empty() {
                let n = buf.len().min(max_len);
                let out: Vec<u8> = buf.drain(..n).collect();
                self.writable.notify_all();
                return Some(out);
            }
            let now = Instant::now();
            if now >= deadline {
                return None;
            }
            let (guard, _) = self
                .readable
                .wait_timeout(buf, deadline - now)
                .expect("byte channel mutex poisoned");
            buf = guard;
        }
    }

    /// Bytes currently buffered.
    pub fn len(&self) -> usize {
        self.buf.lock().expect("byte channel mutex poisoned").len()
    }

    /// True when nothing is buffered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    const T0: Duration = Duration::ZERO;
    const SHORT: Duration = Duration::from_millis(50);

    #[test]
    fn fifo_order_across_partial_reads() {
        let ch = ByteChannel::new(16);
        ch.send(b"abcdef", T0).unwrap();
        assert_eq!(ch.recv_up_to(4, T0).unwrap(), b"abcd");
        assert_eq!(ch.recv_up_to(4, T0).unwrap(), b"ef");
        assert!(ch.recv_up_to(4, T0).is_none());
    }

    #[test]
    fn send_is_all_or_nothing() {
        let ch = ByteChannel::new(8);
        ch.send(b"12345", T0).unwrap();
        // 4 more bytes would exceed capacity; nothing may be enqueued.
        assert_eq!(ch.send(b"6789", T0), Err(ChannelError::Rejected));
        assert_eq!(ch.len(), 5);
        assert_eq!(ch.recv_up_to(8, T0).unwrap(), b"12345");
    }

    #[test]
    fn oversized_payload_rejected_immediately() {
        let ch = ByteChannel::new(4);
        let start = Instant::now();
        assert_eq!(
            ch.send(b"toolong", Duration::from_secs(5)),
            Err(ChannelError::Rejected)
        );
        // Must not have waited out the timeout for a payload that can never fit.
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn empty_send_is_a_no_op() {
        let ch = ByteChannel::new(4);
        ch.send(b"", T0).unwrap();
        assert!(ch.is_empty());
    }

    #[test]
    fn recv_times_out_with_none() {
        let ch = ByteChannel::new(4);
        assert!(ch.recv_up_to(4, SHORT).is_none());
    }

    #[test]
    fn send_unblocks_when_consumer_drains() {
        let ch = Arc::new(ByteChannel::new(4));
        ch.send(b"full", T0).unwrap();

        let producer = {
            let ch = Arc::clone(&ch);
            thread::spawn(move || ch.send(b"next", Duration::from_secs(2)))
        };

        thread::sleep(Duration::from_millis(20));
        assert_eq!(ch.recv_up_to(4, T0).unwrap(), b"full");
        producer.join().unwrap().unwrap();
        assert_eq!(ch.recv_up_to(4, SHORT).unwrap(), b"next");
    }

    #[test]
    fn recv_wakes_on_send() {
        let ch = Arc::new(ByteChannel::new(16));
        let consumer = {
            let ch = Arc::clone(&ch);
            thread::spawn(move || ch.recv_up_to(16, Duration::from_secs(2)))
        };
        thread::sleep(Duration::from_millis(20));
        ch.send(b"wake", T0).unwrap();
        assert_eq!(consumer.join().unwrap().unwrap(), b"wake");
    }

    #[test]
    fn exact_capacity_fill_and_drain() {
        let ch = ByteChannel::new(4);
        ch.send(b"abcd", T0).unwrap();
        assert_eq!(ch.len(), 4);
        assert_eq!(ch.recv_up_to(64, T0).unwrap(), b"abcd");
        ch.send(b"efgh", T0).unwrap();
        assert_eq!(ch.recv_up_to(64, T0).unwrap(), b"efgh");
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Whatever chunking the producer uses, the consumer observes the
        /// exact same byte sequence, in order.
        #[test]
        fn stream_preserved_across_arbitrary_chunking(
            payload in proptest::collection::vec(any::<u8>(), 0..512),
            chunk in 1usize..64,
            read in 1usize..64,
        ) {
            let ch = ByteChannel::new(1028);
            let mut seen = Vec::new();
            for piece in payload.chunks(chunk) {
                ch.send(piece, Duration::ZERO).unwrap();
                // Drain as we go so the channel never overflows.
                while let Some(bytes) = ch.recv_up_to(read, Duration::ZERO) {
                    seen.extend(bytes);
                }
            }
            prop_assert_eq!(seen, payload);
        }

        /// Buffered bytes never exceed the configured capacity.
        #[test]
        fn occupancy_never_exceeds_capacity(
            ops in proptest::collection::vec((any::<bool>(), 1usize..32), 1..100),
        ) {
            let ch = ByteChannel::new(64);
            for (is_send, n) in ops {
                if is_send {
                    let _ = ch.send(&vec![0xAA; n], Duration::ZERO);
                } else {
                    let _ = ch.recv_up_to(n, Duration::ZERO);
                }
                prop_assert!(ch.len() <= ch.capacity());
            }
        }
    }
}
