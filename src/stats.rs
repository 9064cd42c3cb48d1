// Operation counters kept by the engine and reported as a plain copy

use std::sync::atomic::{AtomicUsize, Ordering};

// Operation counters for an engine. Searches take `&self`, so the counters are atomic.
#[derive(Debug, Default)]
pub struct EngineStats {
    pub searches: AtomicUsize,
    pub bookings: AtomicUsize,
    pub rejected_bookings: AtomicUsize,
    pub cancellations: AtomicUsize,
    pub rejected_cancellations: AtomicUsize,
    pub guests_registered: AtomicUsize,
    pub persist_failures: AtomicUsize,
}

// Point-in-time copy of the counters
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct EngineStatsReport {
    pub searches: usize,
    pub bookings: usize,
    pub rejected_bookings: usize,
    pub cancellations: usize,
    pub rejected_cancellations: usize,
    pub guests_registered: usize,
    pub persist_failures: usize,
}

impl EngineStats {
    pub(crate) fn incr(counter: &AtomicUsize) {
        counter.fetch_add(1, Ordering::SeqCst);
    }

    pub fn report(&self) -> EngineStatsReport {
        EngineStatsReport {
            searches: self.searches.load(Ordering::SeqCst),
            bookings: self.bookings.load(Ordering::SeqCst),
            rejected_bookings: self.rejected_bookings.load(Ordering::SeqCst),
            cancellations: self.cancellations.load(Ordering::SeqCst),
            rejected_cancellations: self.rejected_cancellations.load(Ordering::SeqCst),
            guests_registered: self.guests_registered.load(Ordering::SeqCst),
            persist_failures: self.persist_failures.load(Ordering::SeqCst),
        }
    }
}
