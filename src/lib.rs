//! Deferred execution for no-std embedded targets.
//!
//! Interrupt handlers stay short: they submit a handler plus a small payload, and the
//! main loop runs the handler later in thread context.
//!
//! # Highlights
//! - Fixed-capacity FIFO of `fn(&[u8])` handlers with inline payload copies.
//! - No allocation. Storage is reserved by const generics, limits are set once at startup.
//! - Safe against nested interrupts via the `critical-section` crate.
//!
//! # Quick start
//! ```
//! use ph_defer::DeferQueue;
//!
//! static QUEUE: DeferQueue<10, 4> = DeferQueue::new();
//!
//! fn on_button(payload: &[u8]) {
//!     assert_eq!(payload, &[13]);
//! }
//!
//! QUEUE.initialize(4, 10).unwrap();
//!
//! // GPIO interrupt:
//! QUEUE.submit(on_button, &[13]).unwrap();
//!
//! // main loop, after waking from wait-for-interrupt:
//! if QUEUE.has_pending() {
//!     assert_eq!(QUEUE.drain(), 1);
//! }
//! ```
//!
//! # No-std
//! The crate is `#![no_std]`. A `critical-section` implementation must be linked: embedded
//! HALs provide one, hosts can enable the `std` feature. Tests require `std`.
//!
//! # Safety and concurrency
//! Any number of producers may call `submit`, from any interrupt priority. Exactly one
//! consumer may call `drain`, and never from inside a handler. Handlers run with
//! interrupts enabled.
//!
//! # Semantics
//! - Events run exactly once, in the order their submits succeeded.
//! - A full queue rejects the new event with `SubmitError::QueueFull`; nothing is evicted.
//! - `drain` keeps going until the queue is observed empty, or the queue is paused.
//! - Using the queue before `initialize` panics in debug builds and is rejected in release.
#![no_std]

pub mod error;
pub mod event;
pub mod queue;

pub use error::{ConfigError, SubmitError};
pub use event::EventHandler;
pub use queue::{DeferQueue, QueueStats};

#[cfg(test)]
extern crate std;
