// Reservations: a guest's claim on a unit for a date range, and the overlap test
// used to decide whether two claims on the same unit collide

use crate::catalog::Unit;
use crate::guest::Guest;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReservationStatus {
    Confirmed,
    Cancelled,
}

impl ReservationStatus {
    pub fn name(&self) -> &'static str {
        match self {
            ReservationStatus::Confirmed => "CONFIRMED",
            ReservationStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim() {
            "CONFIRMED" => Some(ReservationStatus::Confirmed),
            "CANCELLED" => Some(ReservationStatus::Cancelled),
            _ => None,
        }
    }
}

impl fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    pub id: u32,
    pub guest: Guest,
    pub unit_id: u32,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub total_charge: i64,
    pub status: ReservationStatus,
}

impl Reservation {
    // The charge is fixed here and never recomputed afterwards
    pub(crate) fn confirmed(
        id: u32,
        guest: Guest,
        unit: &Unit,
        check_in: NaiveDate,
        check_out: NaiveDate,
    ) -> Self {
        Self {
            id,
            guest,
            unit_id: unit.id,
            check_in,
            check_out,
            total_charge: nights(check_in, check_out) * unit.rate(),
            status: ReservationStatus::Confirmed,
        }
    }

    pub fn is_confirmed(&self) -> bool {
        self.status == ReservationStatus::Confirmed
    }

    pub fn nights(&self) -> i64 {
        nights(self.check_in, self.check_out)
    }

    pub fn overlaps(&self, check_in: NaiveDate, check_out: NaiveDate) -> bool {
        ranges_overlap(check_in, check_out, self.check_in, self.check_out)
    }
}

impl fmt::Display for Reservation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Booking #{} | {} | Room {} | {} to {} | {} | {}",
            self.id,
            self.guest,
            self.unit_id,
            self.check_in.format("%d-%m-%Y"),
            self.check_out.format("%d-%m-%Y"),
            self.total_charge,
            self.status
        )
    }
}

// Nights between the two dates; negative when the range is reversed
pub fn nights(check_in: NaiveDate, check_out: NaiveDate) -> i64 {
    (check_out - check_in).num_days()
}

/// Returns true when `[check_in, check_out]` collides with `[other_in, other_out]`.
///
/// Both boundaries are inclusive: a stay that checks out on the day another
/// stay checks in counts as overlapping, so same-day turnover is rejected.
pub fn ranges_overlap(
    check_in: NaiveDate,
    check_out: NaiveDate,
    other_in: NaiveDate,
    other_out: NaiveDate,
) -> bool {
    !(check_out < other_in) && !(check_in > other_out)
}
