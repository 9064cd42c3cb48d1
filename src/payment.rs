// Simulated payment step run after a booking is confirmed. Nothing is charged;
// the receipt just echoes the reservation total.

use crate::reservation::Reservation;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum PaymentError {
    #[error("Reservation {0} is cancelled")]
    ReservationCancelled(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentStatus {
    Processed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentReceipt {
    pub reservation_id: u32,
    pub amount: i64,
    pub status: PaymentStatus,
    pub reference: String,
}

pub fn simulate_payment(reservation: &Reservation) -> Result<PaymentReceipt, PaymentError> {
    if !reservation.is_confirmed() {
        return Err(PaymentError::ReservationCancelled(reservation.id));
    }

    let receipt = PaymentReceipt {
        reservation_id: reservation.id,
        amount: reservation.total_charge,
        status: PaymentStatus::Processed,
        reference: format!("PAY-{:06}", reservation.id),
    };
    tracing::info!(
        reservation_id = receipt.reservation_id,
        amount = receipt.amount,
        reference = %receipt.reference,
        "payment processed"
    );
    Ok(receipt)
}
