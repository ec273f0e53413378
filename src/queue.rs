//! Deferred execution queue: interrupt handlers submit, the main loop drains.
//!
//! # Overview
//! - Any number of producers (interrupt handlers, possibly nested) call `submit`.
//! - Exactly one consumer (the main loop) calls `drain`.
//! - Strict FIFO. A full queue rejects new events; pending events are never evicted.
//! - `drain` runs until the queue is observed empty, so events submitted by a handler
//!   (or by an interrupt firing while a handler runs) are executed in the same call.
//!
//! # Critical sections
//! All slot and index bookkeeping happens inside `critical_section::with`. The payload
//! copy is part of the same section; payloads are bounded by `MAX_EVENT_SIZE` so the
//! section stays short. `drain` copies the head record out, frees the slot and only
//! then leaves the section to run the handler with interrupts enabled.
//!
//! # Configuration
//! `SLOTS` and `MAX_EVENT_SIZE` reserve storage at compile time. `initialize` picks the
//! runtime capacity and maximum payload size within those bounds, once.

use core::cell::RefCell;

#[cfg(not(feature = "portable-atomic"))]
use core::sync::atomic::{AtomicBool, AtomicU8, Ordering};
#[cfg(feature = "portable-atomic")]
use portable_atomic::{AtomicBool, AtomicU8, Ordering};

use critical_section::Mutex;
use log::{debug, trace, warn};

use crate::error::{ConfigError, SubmitError};
use crate::event::{EventHandler, EventRecord};

/// Snapshot of queue utilisation.
#[must_use]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct QueueStats {
    pub pending: usize,
    pub capacity: usize,
    /// Highest number of simultaneously pending events since initialization.
    pub peak: usize,
    /// Submits rejected since initialization (wrapping).
    pub dropped: u32,
    /// Handlers executed since initialization (wrapping).
    pub executed: u32,
}

struct Ring<const SLOTS: usize, const MAX_EVENT_SIZE: usize> {
    // zero until initialized
    capacity: usize,
    max_event_size: usize,
    head: usize,
    tail: usize,
    count: usize,
    peak: usize,
    dropped: u32,
    // drops already logged by the consumer
    dropped_reported: u32,
    executed: u32,
    slots: [EventRecord<MAX_EVENT_SIZE>; SLOTS],
}

impl<const SLOTS: usize, const MAX_EVENT_SIZE: usize> Ring<SLOTS, MAX_EVENT_SIZE> {
    const fn new() -> Self {
        Self {
            capacity: 0,
            max_event_size: 0,
            head: 0,
            tail: 0,
            count: 0,
            peak: 0,
            dropped: 0,
            dropped_reported: 0,
            executed: 0,
            slots: [EventRecord::EMPTY; SLOTS],
        }
    }

    #[inline]
    fn is_initialized(&self) -> bool {
        self.capacity != 0
    }

    fn configure(&mut self, max_event_size: usize, capacity: usize) -> Result<(), ConfigError> {
        if self.is_initialized() {
            return Err(ConfigError::AlreadyInitialized);
        }
        if capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        if max_event_size == 0 {
            return Err(ConfigError::ZeroEventSize);
        }
        if capacity > SLOTS {
            return Err(ConfigError::CapacityExceedsStorage {
                requested: capacity,
                available: SLOTS,
            });
        }
        if max_event_size > MAX_EVENT_SIZE {
            return Err(ConfigError::EventSizeExceedsStorage {
                requested: max_event_size,
                available: MAX_EVENT_SIZE,
            });
        }

        self.capacity = capacity;
        self.max_event_size = max_event_size;
        Ok(())
    }

    fn push(&mut self, handler: EventHandler, payload: &[u8]) -> Result<(), SubmitError> {
        if !self.is_initialized() {
            return Err(SubmitError::NotInitialized);
        }
        if payload.len() > self.max_event_size {
            self.dropped = self.dropped.wrapping_add(1);
            return Err(SubmitError::PayloadTooLarge {
                len: payload.len(),
                max: self.max_event_size,
            });
        }
        if self.count == self.capacity {
            self.dropped = self.dropped.wrapping_add(1);
            return Err(SubmitError::QueueFull);
        }

        self.slots[self.tail].fill(handler, payload);
        self.tail = (self.tail + 1) % self.capacity;
        self.count += 1;
        if self.count > self.peak {
            self.peak = self.count;
        }
        Ok(())
    }

    fn pop(&mut self) -> Option<EventRecord<MAX_EVENT_SIZE>> {
        if self.count == 0 {
            return None;
        }

        let record = core::mem::replace(&mut self.slots[self.head], EventRecord::EMPTY);
        self.head = (self.head + 1) % self.capacity;
        self.count -= 1;
        self.executed = self.executed.wrapping_add(1);
        Some(record)
    }

    /// Drops since the previous call. Consumer side only.
    fn take_unreported_drops(&mut self) -> u32 {
        let fresh = self.dropped.wrapping_sub(self.dropped_reported);
        self.dropped_reported = self.dropped;
        fresh
    }
}

/// Clears the drain-in-progress flag when the drain loop exits, including by unwinding.
struct DrainGuard<'a>(&'a AtomicBool);

impl<'a> DrainGuard<'a> {
    fn enter(flag: &'a AtomicBool) -> Option<Self> {
        if flag.swap(true, Ordering::Acquire) {
            None
        } else {
            Some(Self(flag))
        }
    }
}

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Fixed-capacity FIFO of deferred handlers.
///
/// Meant to live in a `static` shared by interrupt handlers and the main loop.
/// Nothing is allocated: `SLOTS` records of `MAX_EVENT_SIZE` payload bytes are
/// reserved inline.
pub struct DeferQueue<const SLOTS: usize, const MAX_EVENT_SIZE: usize> {
    ring: Mutex<RefCell<Ring<SLOTS, MAX_EVENT_SIZE>>>,
    pause_depth: AtomicU8,
    draining: AtomicBool,
}

impl<const SLOTS: usize, const MAX_EVENT_SIZE: usize> DeferQueue<SLOTS, MAX_EVENT_SIZE> {
    /// Create an uninitialized queue. Call [`initialize`](Self::initialize) before use.
    pub const fn new() -> Self {
        assert!(SLOTS > 0);
        Self {
            ring: Mutex::new(RefCell::new(Ring::new())),
            pause_depth: AtomicU8::new(0),
            draining: AtomicBool::new(false),
        }
    }

    /// Fix the maximum payload size and the number of usable slots.
    ///
    /// Must be called exactly once, before any `submit` or `drain`. A second call
    /// fails with [`ConfigError::AlreadyInitialized`] and leaves the first
    /// configuration in place.
    pub fn initialize(&self, max_event_size: usize, capacity: usize) -> Result<(), ConfigError> {
        let result = critical_section::with(|cs| {
            self.ring
                .borrow_ref_mut(cs)
                .configure(max_event_size, capacity)
        });

        match result {
            Ok(()) => debug!(
                "defer queue initialized: capacity={} max_event_size={}",
                capacity, max_event_size
            ),
            Err(err) => warn!("defer queue initialize rejected: {}", err),
        }
        result
    }

    /// Queue `handler` to run later with a copy of `data`.
    ///
    /// Safe to call from any interrupt priority. The handler is never invoked here.
    /// On error the queue is left untouched and the event is dropped.
    pub fn submit(&self, handler: EventHandler, data: &[u8]) -> Result<(), SubmitError> {
        let result = critical_section::with(|cs| self.ring.borrow_ref_mut(cs).push(handler, data));

        debug_assert!(
            result != Err(SubmitError::NotInitialized),
            "submit called before initialize"
        );
        result
    }

    /// Execute pending events in submission order until the queue is empty.
    ///
    /// Only the single consumer context may call this, and never from inside a
    /// handler. Stops early if the queue is paused, including by a handler.
    /// Returns the number of handlers executed.
    pub fn drain(&self) -> usize {
        let initialized = self.is_initialized();
        debug_assert!(initialized, "drain called before initialize");
        if !initialized {
            return 0;
        }

        let guard = DrainGuard::enter(&self.draining);
        debug_assert!(guard.is_some(), "drain called from inside an event handler");
        let Some(_guard) = guard else {
            return 0;
        };

        let mut executed = 0usize;
        while !self.is_paused() {
            let Some(record) = critical_section::with(|cs| self.ring.borrow_ref_mut(cs).pop())
            else {
                break;
            };
            if record.execute() {
                executed += 1;
            }
        }

        if executed > 0 {
            trace!("defer queue drained {} events", executed);
        }
        let dropped =
            critical_section::with(|cs| self.ring.borrow_ref_mut(cs).take_unreported_drops());
        if dropped > 0 {
            warn!("defer queue rejected {} submits since last drain", dropped);
        }
        executed
    }

    /// True when at least one event is waiting. The consumer's wake condition.
    #[inline]
    pub fn has_pending(&self) -> bool {
        !self.is_empty()
    }

    /// Number of pending events.
    pub fn len(&self) -> usize {
        critical_section::with(|cs| self.ring.borrow_ref(cs).count)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Free slots left before submits start failing with `QueueFull`.
    pub fn space(&self) -> usize {
        critical_section::with(|cs| {
            let ring = self.ring.borrow_ref(cs);
            ring.capacity - ring.count
        })
    }

    /// Configured capacity, `0` before initialization.
    pub fn capacity(&self) -> usize {
        critical_section::with(|cs| self.ring.borrow_ref(cs).capacity)
    }

    /// Configured maximum payload size, `0` before initialization.
    pub fn max_event_size(&self) -> usize {
        critical_section::with(|cs| self.ring.borrow_ref(cs).max_event_size)
    }

    pub fn is_initialized(&self) -> bool {
        critical_section::with(|cs| self.ring.borrow_ref(cs).is_initialized())
    }

    pub fn stats(&self) -> QueueStats {
        critical_section::with(|cs| {
            let ring = self.ring.borrow_ref(cs);
            QueueStats {
                pending: ring.count,
                capacity: ring.capacity,
                peak: ring.peak,
                dropped: ring.dropped,
                executed: ring.executed,
            }
        })
    }

    /// Suspend draining. Nests; each `pause` needs a matching `resume`.
    /// Submits are still accepted while paused.
    pub fn pause(&self) {
        let updated = self
            .pause_depth
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |depth| {
                depth.checked_add(1)
            });
        debug_assert!(updated.is_ok(), "defer queue pause depth overflow");
    }

    pub fn resume(&self) {
        let updated = self
            .pause_depth
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |depth| {
                depth.checked_sub(1)
            });
        debug_assert!(updated.is_ok(), "resume without matching pause");
    }

    #[inline]
    pub fn is_paused(&self) -> bool {
        self.pause_depth.load(Ordering::Acquire) != 0
    }
}

impl<const SLOTS: usize, const MAX_EVENT_SIZE: usize> Default
    for DeferQueue<SLOTS, MAX_EVENT_SIZE>
{
    fn default() -> Self {
        Self::new()
    }
}
