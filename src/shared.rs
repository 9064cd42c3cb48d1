// Thread-safe handle for hosting the engine behind concurrent callers. Every
// operation runs inside one engine-wide critical section, so no caller can see
// a unit flipped without its reservation appended, or the reverse.

use crate::catalog::{Category, Unit};
use crate::engine::{Conflict, EngineError, ReservationEngine};
use crate::guest::Guest;
use crate::reservation::Reservation;
use crate::snapshot::Snapshot;
use crate::stats::EngineStatsReport;
use chrono::NaiveDate;
use parking_lot::Mutex;
use std::sync::Arc;

#[derive(Clone)]
pub struct SharedEngine {
    inner: Arc<Mutex<ReservationEngine>>,
}

impl SharedEngine {
    pub fn new(engine: ReservationEngine) -> Self {
        Self {
            inner: Arc::new(Mutex::new(engine)),
        }
    }

    // Every unit in inventory order, booked or not
    pub fn units(&self) -> Vec<Unit> {
        self.inner.lock().units().to_vec()
    }

    pub fn unit(&self, unit_id: u32) -> Option<Unit> {
        self.inner.lock().unit(unit_id).cloned()
    }

    pub fn reservation(&self, reservation_id: u32) -> Option<Reservation> {
        self.inner.lock().reservation(reservation_id).cloned()
    }

    pub fn search(&self, check_in: NaiveDate, check_out: NaiveDate) -> Vec<Unit> {
        self.inner.lock().search(check_in, check_out)
    }

    pub fn book(
        &self,
        guest: Guest,
        unit_id: u32,
        check_in: NaiveDate,
        check_out: NaiveDate,
    ) -> Option<Reservation> {
        self.inner.lock().book(guest, unit_id, check_in, check_out)
    }

    pub fn try_book(
        &self,
        guest: Guest,
        unit_id: u32,
        check_in: NaiveDate,
        check_out: NaiveDate,
    ) -> Result<Reservation, EngineError> {
        self.inner.lock().try_book(guest, unit_id, check_in, check_out)
    }

    // Search and book under a single lock, taking the lowest numbered unit that
    // matches the category (any category when `None`)
    pub fn book_first_available(
        &self,
        guest: Guest,
        check_in: NaiveDate,
        check_out: NaiveDate,
        category: Option<Category>,
    ) -> Option<Reservation> {
        let mut engine = self.inner.lock();
        let unit_id = engine
            .search(check_in, check_out)
            .into_iter()
            .find(|unit| category.map_or(true, |c| unit.category == c))?
            .id;
        engine.book(guest, unit_id, check_in, check_out)
    }

    pub fn cancel(&self, reservation_id: u32) -> bool {
        self.inner.lock().cancel(reservation_id)
    }

    pub fn try_cancel(&self, reservation_id: u32) -> Result<Reservation, EngineError> {
        self.inner.lock().try_cancel(reservation_id)
    }

    pub fn register_guest(&self, guest: Guest) {
        self.inner.lock().register_guest(guest)
    }

    pub fn reservations_for(&self, phone: &str) -> Vec<Reservation> {
        self.inner.lock().reservations_for(phone)
    }

    pub fn conflicts(&self) -> Vec<Conflict> {
        self.inner.lock().conflicts()
    }

    pub fn snapshot(&self) -> Snapshot {
        self.inner.lock().snapshot()
    }

    pub fn stats(&self) -> EngineStatsReport {
        self.inner.lock().stats()
    }
}

impl From<ReservationEngine> for SharedEngine {
    fn from(engine: ReservationEngine) -> Self {
        Self::new(engine)
    }
}
