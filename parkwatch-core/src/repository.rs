use async_trait::async_trait;

use crate::slot::{Occupant, ParkingSlot, SlotId};
use crate::CoreResult;

/// Repository trait for the slot registry
#[async_trait]
pub trait SlotRepository: Send + Sync {
    /// All slots in seed order.
    async fn list_slots(&self) -> CoreResult<Vec<ParkingSlot>>;

    async fn get_slot(&self, slot_id: &SlotId) -> CoreResult<Option<ParkingSlot>>;

    /// Marks a vacant slot occupied. Returns `false` when the slot was not
    /// vacant (or does not exist) and nothing changed.
    async fn occupy(&self, slot_id: &SlotId, occupant: &Occupant) -> CoreResult<bool>;

    /// Clears an occupied slot. Returns `false` when it was not occupied.
    async fn release(&self, slot_id: &SlotId) -> CoreResult<bool>;

    /// First slot (in seed order) holding this registration.
    async fn find_by_registration(&self, registration: &str) -> CoreResult<Option<ParkingSlot>>;
}
