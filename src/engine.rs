// Reservation engine: owns the room inventory, the guest registry and the
// reservation ledger, and is the only place any of them is mutated.

use crate::catalog::{default_catalog, Unit, UnitSeed};
use crate::guest::Guest;
use crate::reservation::{Reservation, ReservationStatus};
use crate::snapshot::{Snapshot, SnapshotSink};
use crate::stats::{EngineStats, EngineStatsReport};
use chrono::NaiveDate;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("Unit {0} not found")]
    UnitNotFound(u32),

    #[error("Unit {0} is not available for booking")]
    Unavailable(u32),

    #[error("Reservation {0} not found")]
    ReservationNotFound(u32),

    #[error("Reservation {0} is already cancelled")]
    AlreadyCancelled(u32),

    #[error("Reservation ids are exhausted")]
    IdsExhausted,
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    // Units seeded at startup, or when a restored snapshot carries none
    pub catalog: Vec<UnitSeed>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            catalog: default_catalog(),
        }
    }
}

// Two confirmed reservations on the same unit whose ranges overlap
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Conflict {
    pub unit_id: u32,
    pub first: u32,
    pub second: u32,
}

pub struct ReservationEngine {
    units: Vec<Unit>,
    reservations: Vec<Reservation>,
    guests: Vec<Guest>,
    // None once the id space is used up
    next_reservation_id: Option<u32>,
    sink: Option<Box<dyn SnapshotSink>>,
    stats: EngineStats,
}

impl ReservationEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            units: seed_units(config.catalog),
            reservations: Vec::new(),
            guests: Vec::new(),
            next_reservation_id: Some(1),
            sink: None,
            stats: EngineStats::default(),
        }
    }

    pub fn with_sink(config: EngineConfig, sink: impl SnapshotSink + 'static) -> Self {
        let mut engine = Self::new(config);
        engine.set_sink(sink);
        engine
    }

    // Rebuild an engine from a previously persisted snapshot. Unit flags are taken
    // as stored; ids continue after the highest restored reservation id. A ledger
    // that already holds `u32::MAX` restores fine but accepts no further bookings.
    pub fn restore(config: EngineConfig, snapshot: Snapshot) -> Self {
        let units = if snapshot.units.is_empty() {
            seed_units(config.catalog)
        } else {
            let mut units = snapshot.units;
            units.sort_by_key(|u| u.id);
            units.dedup_by_key(|u| u.id);
            units
        };
        let next_reservation_id = snapshot
            .reservations
            .iter()
            .map(|r| r.id)
            .max()
            .map_or(Some(1), |id| id.checked_add(1));

        tracing::info!(
            units = units.len(),
            reservations = snapshot.reservations.len(),
            guests = snapshot.guests.len(),
            ?next_reservation_id,
            "engine restored from snapshot"
        );

        Self {
            units,
            reservations: snapshot.reservations,
            guests: snapshot.guests,
            next_reservation_id,
            sink: None,
            stats: EngineStats::default(),
        }
    }

    pub fn set_sink(&mut self, sink: impl SnapshotSink + 'static) {
        self.sink = Some(Box::new(sink));
    }

    pub fn units(&self) -> &[Unit] {
        &self.units
    }

    pub fn unit(&self, unit_id: u32) -> Option<&Unit> {
        self.units.iter().find(|u| u.id == unit_id)
    }

    pub fn reservations(&self) -> &[Reservation] {
        &self.reservations
    }

    pub fn reservation(&self, reservation_id: u32) -> Option<&Reservation> {
        self.reservations.iter().find(|r| r.id == reservation_id)
    }

    pub fn guests(&self) -> &[Guest] {
        &self.guests
    }

    pub fn stats(&self) -> EngineStatsReport {
        self.stats.report()
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            units: self.units.clone(),
            reservations: self.reservations.clone(),
            guests: self.guests.clone(),
        }
    }

    /// Units that are bookable and have no confirmed reservation overlapping
    /// `[check_in, check_out]`, in ascending unit id order.
    ///
    /// The range is used as given; a reversed range is not reordered.
    pub fn search(&self, check_in: NaiveDate, check_out: NaiveDate) -> Vec<Unit> {
        EngineStats::incr(&self.stats.searches);

        let available: Vec<Unit> = self
            .units
            .iter()
            .filter(|unit| unit.bookable && !self.is_reserved(unit.id, check_in, check_out))
            .cloned()
            .collect();

        tracing::debug!(
            %check_in,
            %check_out,
            available = available.len(),
            "availability search"
        );
        available
    }

    fn is_reserved(&self, unit_id: u32, check_in: NaiveDate, check_out: NaiveDate) -> bool {
        self.reservations
            .iter()
            .any(|r| r.unit_id == unit_id && r.is_confirmed() && r.overlaps(check_in, check_out))
    }

    pub fn register_guest(&mut self, guest: Guest) {
        tracing::info!(name = %guest.name, phone = %guest.phone, "guest registered");
        self.guests.push(guest);
        EngineStats::incr(&self.stats.guests_registered);
        self.persist();
    }

    // Book `unit_id` for the guest. Only the unit's bookable flag is checked; callers
    // are expected to have searched the range first.
    pub fn try_book(
        &mut self,
        guest: Guest,
        unit_id: u32,
        check_in: NaiveDate,
        check_out: NaiveDate,
    ) -> Result<Reservation, EngineError> {
        match self.reserve(guest, unit_id, check_in, check_out) {
            Ok(reservation) => {
                EngineStats::incr(&self.stats.bookings);
                tracing::info!(
                    reservation_id = reservation.id,
                    unit_id,
                    %check_in,
                    %check_out,
                    total_charge = reservation.total_charge,
                    "reservation confirmed"
                );
                self.persist();
                Ok(reservation)
            }
            Err(e) => {
                EngineStats::incr(&self.stats.rejected_bookings);
                tracing::warn!(unit_id, error = %e, "booking rejected");
                Err(e)
            }
        }
    }

    pub fn book(
        &mut self,
        guest: Guest,
        unit_id: u32,
        check_in: NaiveDate,
        check_out: NaiveDate,
    ) -> Option<Reservation> {
        self.try_book(guest, unit_id, check_in, check_out).ok()
    }

    fn reserve(
        &mut self,
        guest: Guest,
        unit_id: u32,
        check_in: NaiveDate,
        check_out: NaiveDate,
    ) -> Result<Reservation, EngineError> {
        let unit = self
            .units
            .iter_mut()
            .find(|u| u.id == unit_id)
            .ok_or(EngineError::UnitNotFound(unit_id))?;
        if !unit.bookable {
            return Err(EngineError::Unavailable(unit_id));
        }
        let id = self.next_reservation_id.ok_or(EngineError::IdsExhausted)?;

        let reservation = Reservation::confirmed(id, guest, unit, check_in, check_out);
        unit.bookable = false;
        self.next_reservation_id = id.checked_add(1);
        self.reservations.push(reservation.clone());

        Ok(reservation)
    }

    // Cancel a confirmed reservation and reopen its unit once no confirmed
    // reservation holds it any more. Returns the cancelled reservation.
    pub fn try_cancel(&mut self, reservation_id: u32) -> Result<Reservation, EngineError> {
        match self.release(reservation_id) {
            Ok(reservation) => {
                EngineStats::incr(&self.stats.cancellations);
                tracing::info!(reservation_id, unit_id = reservation.unit_id, "reservation cancelled");
                self.persist();
                Ok(reservation)
            }
            Err(e) => {
                EngineStats::incr(&self.stats.rejected_cancellations);
                tracing::warn!(reservation_id, error = %e, "cancellation rejected");
                Err(e)
            }
        }
    }

    pub fn cancel(&mut self, reservation_id: u32) -> bool {
        self.try_cancel(reservation_id).is_ok()
    }

    fn release(&mut self, reservation_id: u32) -> Result<Reservation, EngineError> {
        let reservation = self
            .reservations
            .iter_mut()
            .find(|r| r.id == reservation_id)
            .ok_or(EngineError::ReservationNotFound(reservation_id))?;
        if !reservation.is_confirmed() {
            return Err(EngineError::AlreadyCancelled(reservation_id));
        }
        reservation.status = ReservationStatus::Cancelled;
        let cancelled = reservation.clone();

        let still_held = self
            .reservations
            .iter()
            .any(|r| r.unit_id == cancelled.unit_id && r.is_confirmed());
        if let Some(unit) = self.units.iter_mut().find(|u| u.id == cancelled.unit_id) {
            unit.bookable = !still_held;
        }

        Ok(cancelled)
    }

    // Every reservation made under this phone number, cancelled ones included, in booking order
    pub fn reservations_for(&self, phone: &str) -> Vec<Reservation> {
        self.reservations
            .iter()
            .filter(|r| r.guest.phone == phone)
            .cloned()
            .collect()
    }

    // Pairs of confirmed reservations on one unit that overlap. Booking does not
    // re-run the overlap test, so this is how such pairs are detected.
    pub fn conflicts(&self) -> Vec<Conflict> {
        let confirmed: Vec<&Reservation> =
            self.reservations.iter().filter(|r| r.is_confirmed()).collect();

        let mut conflicts = Vec::new();
        for (i, first) in confirmed.iter().enumerate() {
            for second in &confirmed[i + 1..] {
                if first.unit_id == second.unit_id
                    && first.overlaps(second.check_in, second.check_out)
                {
                    conflicts.push(Conflict {
                        unit_id: first.unit_id,
                        first: first.id,
                        second: second.id,
                    });
                }
            }
        }
        conflicts
    }

    // Hand the current state to the sink. A failed write is logged and the
    // in-memory state stays as it is.
    fn persist(&mut self) {
        if self.sink.is_none() {
            return;
        }
        let snapshot = self.snapshot();
        if let Some(sink) = self.sink.as_mut() {
            if let Err(e) = sink.persist(&snapshot) {
                EngineStats::incr(&self.stats.persist_failures);
                tracing::warn!(error = %e, "failed to persist snapshot");
            }
        }
    }
}

impl Default for ReservationEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

// Inventory in ascending id order; a repeated id keeps its first entry
fn seed_units(catalog: Vec<UnitSeed>) -> Vec<Unit> {
    let mut units: Vec<Unit> = catalog.into_iter().map(Unit::from).collect();
    units.sort_by_key(|u| u.id);
    units.dedup_by_key(|u| u.id);
    units
}
