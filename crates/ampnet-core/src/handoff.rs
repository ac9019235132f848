//! Single-slot handoff of owned values from a control thread to the audio thread.
//!
//! The producer publishes at most one value at a time and waits until the
//! consumer has taken it before publishing the next; nothing is overwritten or
//! dropped. The consumer side is a single atomic pointer swap and never blocks.
//!
//! Ordering: the producer stores the pending pointer, then the sequence number
//! (both `Release`). The consumer loads the sequence (`Acquire`), so a new
//! sequence number always comes with a fully constructed value behind it.

use std::fmt;
use std::ptr;
use std::sync::atomic::{AtomicPtr, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Default interval between producer polls while a request is outstanding.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(5);

struct Slot<T> {
    pending: AtomicPtr<T>,
    requested: AtomicU64,
    adopted: AtomicU64,
}

// The slot only ever hands a `Box<T>` from one thread to another.
unsafe impl<T: Send> Send for Slot<T> {}
unsafe impl<T: Send> Sync for Slot<T> {}

impl<T> Drop for Slot<T> {
    fn drop(&mut self) {
        let ptr = *self.pending.get_mut();
        if !ptr.is_null() {
            drop(unsafe { Box::from_raw(ptr) });
        }
    }
}

/// Create a connected producer/consumer pair.
pub fn mailbox<T: Send>() -> (SwapProducer<T>, SwapConsumer<T>) {
    let slot = Arc::new(Slot {
        pending: AtomicPtr::new(ptr::null_mut()),
        requested: AtomicU64::new(0),
        adopted: AtomicU64::new(0),
    });
    (
        SwapProducer {
            slot: Arc::clone(&slot),
            poll_interval: DEFAULT_POLL_INTERVAL,
            timeout: None,
        },
        SwapConsumer { slot, seen: 0 },
    )
}

/// Error returned when a swap request cannot be published.
#[derive(Error)]
pub enum HandoffError<T> {
    /// The previous request was not consumed in time. The unpublished value is
    /// handed back so the caller decides where it is dropped.
    #[error("previous swap request still pending after {waited:?}")]
    Timeout { waited: Duration, value: Box<T> },

    /// The consumer was dropped, so nothing will ever adopt the value.
    #[error("swap consumer has been dropped")]
    Disconnected { value: Box<T> },
}

impl<T> HandoffError<T> {
    pub fn into_inner(self) -> Box<T> {
        match self {
            HandoffError::Timeout { value, .. } | HandoffError::Disconnected { value } => value,
        }
    }
}

impl<T> fmt::Debug for HandoffError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandoffError::Timeout { waited, .. } => f
                .debug_struct("Timeout")
                .field("waited", waited)
                .finish_non_exhaustive(),
            HandoffError::Disconnected { .. } => {
                f.debug_struct("Disconnected").finish_non_exhaustive()
            }
        }
    }
}

/// Control-thread half. Not `Clone`: there is exactly one producer.
pub struct SwapProducer<T> {
    slot: Arc<Slot<T>>,
    poll_interval: Duration,
    timeout: Option<Duration>,
}

impl<T: Send> SwapProducer<T> {
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// `None` waits forever for the consumer.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Sequence number of the most recent published request.
    pub fn requested(&self) -> u64 {
        self.slot.requested.load(Ordering::Relaxed)
    }

    /// Sequence number of the most recent request the consumer has taken.
    pub fn adopted(&self) -> u64 {
        self.slot.adopted.load(Ordering::Acquire)
    }

    /// True when no request is waiting for the consumer.
    pub fn is_idle(&self) -> bool {
        self.adopted() == self.requested()
    }

    /// False once the consumer has been dropped.
    pub fn is_connected(&self) -> bool {
        Arc::strong_count(&self.slot) > 1
    }

    /// Wait until the consumer has taken the outstanding request.
    ///
    /// Returns `false` if the configured timeout elapsed first or the consumer
    /// went away while a request was outstanding.
    pub fn wait_idle(&self) -> bool {
        let start = Instant::now();
        while !self.is_idle() {
            if !self.is_connected() {
                return false;
            }
            if let Some(limit) = self.timeout {
                if start.elapsed() >= limit {
                    return false;
                }
            }
            std::thread::sleep(self.poll_interval);
        }
        true
    }

    /// Publish `value` for the consumer, waiting for any earlier request to be
    /// consumed first. Never call this from the audio thread.
    ///
    /// Returns the sequence number assigned to the request.
    pub fn request_swap(&mut self, value: Box<T>) -> Result<u64, HandoffError<T>> {
        let start = Instant::now();
        if !self.is_connected() {
            return Err(HandoffError::Disconnected { value });
        }
        if !self.wait_idle() {
            if !self.is_connected() {
                return Err(HandoffError::Disconnected { value });
            }
            return Err(HandoffError::Timeout {
                waited: start.elapsed(),
                value,
            });
        }

        let sequence = self.requested() + 1;
        let previous = self
            .slot
            .pending
            .swap(Box::into_raw(value), Ordering::Release);
        debug_assert!(previous.is_null(), "idle slot held a pending value");
        self.slot.requested.store(sequence, Ordering::Release);
        Ok(sequence)
    }
}

/// A value taken from the mailbox by the consumer.
pub struct Adopted<T> {
    pub value: Box<T>,
    pub sequence: u64,
}

/// Audio-thread half. Every method is wait-free.
pub struct SwapConsumer<T> {
    slot: Arc<Slot<T>>,
    seen: u64,
}

impl<T: Send> SwapConsumer<T> {
    #[inline]
    pub fn has_pending(&self) -> bool {
        self.slot.requested.load(Ordering::Acquire) != self.seen
    }

    /// Sequence number of the last adopted request (0 before the first).
    #[inline]
    pub fn adopted(&self) -> u64 {
        self.seen
    }

    /// Take the pending value, if any.
    #[inline]
    pub fn try_adopt(&mut self) -> Option<Adopted<T>> {
        let requested = self.slot.requested.load(Ordering::Acquire);
        if requested == self.seen {
            return None;
        }

        let ptr = self.slot.pending.swap(ptr::null_mut(), Ordering::AcqRel);
        if ptr.is_null() {
            return None;
        }

        self.seen = requested;
        self.slot.adopted.store(requested, Ordering::Release);
        Some(Adopted {
            value: unsafe { Box::from_raw(ptr) },
            sequence: requested,
        })
    }
}
