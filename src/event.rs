//! Event records stored in the queue slots.

/// Deferred procedure. Receives the payload captured at submit time.
///
/// The slice borrows a copy owned by the draining context, so the slot it came
/// from may already be reused by a producer while the handler runs.
pub type EventHandler = fn(&[u8]);

/// Handler plus an inline copy of its payload.
#[derive(Copy, Clone)]
pub(crate) struct EventRecord<const MAX_EVENT_SIZE: usize> {
    handler: Option<EventHandler>,
    len: usize,
    data: [u8; MAX_EVENT_SIZE],
}

impl<const MAX_EVENT_SIZE: usize> EventRecord<MAX_EVENT_SIZE> {
    pub(crate) const EMPTY: Self = Self {
        handler: None,
        len: 0,
        data: [0; MAX_EVENT_SIZE],
    };

    /// Caller guarantees `payload.len() <= MAX_EVENT_SIZE`.
    #[inline]
    pub(crate) fn fill(&mut self, handler: EventHandler, payload: &[u8]) {
        self.data[..payload.len()].copy_from_slice(payload);
        self.len = payload.len();
        self.handler = Some(handler);
    }

    #[inline]
    pub(crate) fn payload(&self) -> &[u8] {
        &self.data[..self.len]
    }

    /// Run the handler, if the record holds one. Returns true if it ran.
    #[inline]
    pub(crate) fn execute(&self) -> bool {
        match self.handler {
            Some(handler) => {
                handler(self.payload());
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::EventRecord;
    use std::sync::Mutex;
    use std::vec::Vec;

    #[test]
    fn fill_keeps_only_valid_bytes() {
        let mut record = EventRecord::<8>::EMPTY;
        record.fill(|_| {}, b"abc");
        assert_eq!(record.payload(), b"abc");

        record.fill(|_| {}, b"");
        assert!(record.payload().is_empty());
    }

    #[test]
    fn empty_record_does_not_execute() {
        assert!(!EventRecord::<4>::EMPTY.execute());
    }

    #[test]
    fn execute_passes_payload() {
        static SEEN: Mutex<Vec<u8>> = Mutex::new(Vec::new());
        fn collect(payload: &[u8]) {
            SEEN.lock().unwrap().extend_from_slice(payload);
        }

        let mut record = EventRecord::<4>::EMPTY;
        record.fill(collect, &[1, 2, 3, 4]);
        assert!(record.execute());
        assert_eq!(&SEEN.lock().unwrap()[..], &[1, 2, 3, 4]);
    }
}
