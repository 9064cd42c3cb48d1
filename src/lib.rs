// Hotel reservation engine: room inventory, availability search and the
// booking lifecycle, with a snapshot port for persistence

pub mod catalog;
pub mod engine;
pub mod guest;
pub mod payment;
pub mod reservation;
pub mod shared;
pub mod snapshot;
pub mod stats;

// Re-export key types for convenience
pub use catalog::{default_catalog, CatalogError, Category, Unit, UnitSeed};
pub use engine::{Conflict, EngineConfig, EngineError, ReservationEngine};
pub use guest::Guest;
pub use payment::{simulate_payment, PaymentError, PaymentReceipt, PaymentStatus};
pub use reservation::{nights, ranges_overlap, Reservation, ReservationStatus};
pub use shared::SharedEngine;
pub use snapshot::{
    FileSnapshotStore, MemorySnapshotStore, PersistenceError, Snapshot, SnapshotSink,
    StoreConfig, StoreFormat,
};
pub use stats::{EngineStats, EngineStatsReport};
