pub mod registry;
pub mod repository;
pub mod slot;
pub mod validation;

pub use registry::{BookingService, SlotSummary, VehicleLocation};
pub use repository::SlotRepository;
pub use slot::{Occupant, ParkingSlot, SlotId, SlotStatus};

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("{0}")]
    ValidationError(String),
    #[error("{0}")]
    ConflictError(String),
    #[error("{0}")]
    NotFoundError(String),
    #[error("Storage error: {0}")]
    StorageError(String),
}

pub type CoreResult<T> = Result<T, CoreError>;
