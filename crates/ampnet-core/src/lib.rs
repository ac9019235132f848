//! Lock-free real-time plumbing for swapping neural models under an audio callback.
//!
//! # Primary API
//!
//! - [`mailbox`]: single-slot [`SwapProducer`] / [`SwapConsumer`] handoff
//! - [`retire_queue`]: [`Retirer`] / [`Collector`] pair for deferred destruction
//! - [`AtomicMode`] / [`ProcessMode`]: per-block execution path flag
//!
//! Nothing on the consumer side of these types allocates, frees, blocks or locks.
//!
//! # Example
//!
//! ```ignore
//! use ampnet_core::{mailbox, retire_queue};
//!
//! let (mut producer, mut consumer) = mailbox::<Vec<f32>>();
//! let (mut retirer, collector) = retire_queue(8);
//! let _collector = collector.spawn(Duration::from_millis(20))?;
//!
//! producer.request_swap(Box::new(vec![0.0; 64]))?;
//!
//! // audio thread
//! if retirer.has_room() {
//!     if let Some(adopted) = consumer.try_adopt() {
//!         let _ = retirer.retire(adopted.value);
//!     }
//! }
//! ```

pub mod error;
pub use error::{Error, Result};

pub mod handoff;
pub use handoff::{mailbox, Adopted, HandoffError, SwapConsumer, SwapProducer};

pub mod retire;
pub use retire::{retire_queue, Collector, CollectorHandle, Retirer};

mod lockfree;
pub use lockfree::{AtomicMode, ProcessMode};
