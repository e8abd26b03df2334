pub mod models;
pub mod pii;

pub use models::events::OccupancyUpdate;
pub use pii::Masked;
