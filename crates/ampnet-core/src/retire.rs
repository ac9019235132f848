//! Deferred destruction of values the audio thread no longer needs.
//!
//! The audio thread moves superseded values into a preallocated SPSC ring
//! ([`Retirer`]); a background thread ([`Collector`]) pops and drops them.
//! Pushing never allocates, and a full ring hands the value back instead of
//! dropping it.

use crate::error::{Error, Result};
use crossbeam_channel::{RecvTimeoutError, Sender};
use ringbuf::{traits::*, HeapCons, HeapProd, HeapRb};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

/// Create a retirement ring holding up to `capacity` values.
pub fn retire_queue<T: Send>(capacity: usize) -> (Retirer<T>, Collector<T>) {
    let rb = HeapRb::new(capacity.max(1));
    let (producer, consumer) = rb.split();
    (
        Retirer { producer },
        Collector {
            consumer,
            collected: 0,
        },
    )
}

/// Audio-thread half of the retirement ring.
pub struct Retirer<T> {
    producer: HeapProd<T>,
}

impl<T> Retirer<T> {
    /// True if the next [`retire`](Self::retire) is guaranteed to succeed.
    #[inline]
    pub fn has_room(&self) -> bool {
        !self.producer.is_full()
    }

    /// Hand `value` to the collector. Returns it back if the ring is full.
    #[inline]
    pub fn retire(&mut self, value: T) -> core::result::Result<(), T> {
        self.producer.try_push(value)
    }

    pub fn capacity(&self) -> usize {
        self.producer.capacity().get()
    }

    pub fn len(&self) -> usize {
        self.producer.occupied_len()
    }

    pub fn is_empty(&self) -> bool {
        self.producer.is_empty()
    }
}

/// Non-real-time half of the retirement ring. Dropping values happens here.
pub struct Collector<T> {
    consumer: HeapCons<T>,
    collected: u64,
}

impl<T: Send + 'static> Collector<T> {
    /// Drop everything currently queued. Returns how many values were dropped.
    pub fn drain(&mut self) -> usize {
        let mut count = 0;
        while let Some(value) = self.consumer.try_pop() {
            drop(value);
            count += 1;
        }
        self.collected += count as u64;
        count
    }

    /// Total number of values dropped by this collector.
    pub fn collected(&self) -> u64 {
        self.collected
    }

    /// Move the collector onto a background thread that drains every `interval`
    /// and whenever [`CollectorHandle::collect_now`] is called.
    pub fn spawn(self, interval: Duration) -> Result<CollectorHandle> {
        let (cmd_tx, cmd_rx) = crossbeam_channel::bounded::<CollectorCommand>(16);
        let collected = Arc::new(AtomicU64::new(self.collected));
        let running = Arc::new(AtomicBool::new(true));

        let collected_clone = collected.clone();
        let running_clone = running.clone();
        let mut collector = self;

        let thread = std::thread::Builder::new()
            .name("ampnet-collector".into())
            .spawn(move || {
                tracing::debug!("Collector thread started (interval: {:?})", interval);
                loop {
                    let shutdown = match cmd_rx.recv_timeout(interval) {
                        Ok(CollectorCommand::Collect) | Err(RecvTimeoutError::Timeout) => false,
                        Ok(CollectorCommand::Shutdown) | Err(RecvTimeoutError::Disconnected) => {
                            true
                        }
                    };

                    let dropped = collector.drain();
                    if dropped > 0 {
                        tracing::debug!("Collector dropped {} retired value(s)", dropped);
                        collected_clone.store(collector.collected(), Ordering::Release);
                    }

                    if shutdown {
                        break;
                    }
                }
                running_clone.store(false, Ordering::Release);
                tracing::debug!("Collector thread stopped");
            })
            .map_err(|source| Error::Spawn {
                name: "ampnet-collector",
                source,
            })?;

        Ok(CollectorHandle {
            cmd_tx,
            collected,
            running,
            thread: Some(thread),
        })
    }
}

enum CollectorCommand {
    Collect,
    Shutdown,
}

/// Owner of a running collector thread. Dropping it drains and joins the thread.
pub struct CollectorHandle {
    cmd_tx: Sender<CollectorCommand>,
    collected: Arc<AtomicU64>,
    running: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl CollectorHandle {
    /// Ask the collector to drain now rather than at its next interval.
    ///
    /// Best-effort: silently ignored if the command channel is full.
    pub fn collect_now(&self) {
        let _ = self.cmd_tx.try_send(CollectorCommand::Collect);
    }

    /// Total number of values dropped so far.
    pub fn collected(&self) -> u64 {
        self.collected.load(Ordering::Acquire)
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Drain once more and stop the thread.
    pub fn shutdown(&mut self) {
        let _ = self.cmd_tx.send(CollectorCommand::Shutdown);
        if let Some(handle) = self.thread.take() {
            if handle.join().is_err() {
                tracing::error!("Collector thread panicked");
            }
        }
    }
}

impl Drop for CollectorHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}
