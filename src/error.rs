//! Errors reported by [`DeferQueue`](crate::DeferQueue).

use core::fmt;

/// Rejected call to [`DeferQueue::initialize`](crate::DeferQueue::initialize).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ConfigError {
    ZeroCapacity,
    ZeroEventSize,
    /// Requested more slots than the queue reserves at compile time.
    CapacityExceedsStorage {
        requested: usize,
        available: usize,
    },
    /// Requested a larger payload than a slot can hold.
    EventSizeExceedsStorage {
        requested: usize,
        available: usize,
    },
    AlreadyInitialized,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::ZeroCapacity => write!(f, "queue capacity must be non-zero"),
            ConfigError::ZeroEventSize => write!(f, "maximum event size must be non-zero"),
            ConfigError::CapacityExceedsStorage {
                requested,
                available,
            } => write!(
                f,
                "capacity {} exceeds the {} reserved slots",
                requested, available
            ),
            ConfigError::EventSizeExceedsStorage {
                requested,
                available,
            } => write!(
                f,
                "event size {} exceeds the {} byte slot payload",
                requested, available
            ),
            ConfigError::AlreadyInitialized => write!(f, "queue is already initialized"),
        }
    }
}

impl core::error::Error for ConfigError {}

/// Rejected call to [`DeferQueue::submit`](crate::DeferQueue::submit).
///
/// The queue is never modified when a submit fails.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SubmitError {
    /// Every slot holds a pending event; the new one is dropped.
    QueueFull,
    PayloadTooLarge { len: usize, max: usize },
    NotInitialized,
}

impl fmt::Display for SubmitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubmitError::QueueFull => write!(f, "event queue full"),
            SubmitError::PayloadTooLarge { len, max } => {
                write!(f, "payload of {} bytes exceeds maximum of {}", len, max)
            }
            SubmitError::NotInitialized => write!(f, "event queue used before initialize"),
        }
    }
}

impl core::error::Error for SubmitError {}
