use parkwatch_shared::Masked;
use std::sync::Arc;
use tracing::{debug, info};

use crate::repository::SlotRepository;
use crate::slot::{Occupant, ParkingSlot, SlotId, SlotStatus};
use crate::{CoreError, CoreResult};

pub const SLOT_OCCUPIED: &str = "Slot is already occupied!";
pub const SLOT_VACANT: &str = "Slot is already vacant!";
pub const VEHICLE_NOT_FOUND: &str = "Vehicle not found!";

/// Every slot plus the vacant/occupied tallies.
#[derive(Debug, Clone)]
pub struct SlotSummary {
    pub slots: Vec<ParkingSlot>,
    pub vacant_count: usize,
    pub occupied_count: usize,
}

impl SlotSummary {
    pub fn from_slots(slots: Vec<ParkingSlot>) -> Self {
        let occupied_count = slots
            .iter()
            .filter(|s| s.status() == SlotStatus::Occupied)
            .count();
        let vacant_count = slots.len() - occupied_count;
        Self {
            slots,
            vacant_count,
            occupied_count,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VehicleLocation {
    pub slot_id: SlotId,
    pub phone: Masked<String>,
}

/// Booking rules on top of a [`SlotRepository`].
#[derive(Clone)]
pub struct BookingService {
    repo: Arc<dyn SlotRepository>,
}

impl BookingService {
    pub fn new(repo: Arc<dyn SlotRepository>) -> Self {
        Self { repo }
    }

    pub async fn book(&self, slot_id: &str, registration: &str, phone: &str) -> CoreResult<ParkingSlot> {
        // Format checks come first so they fail whatever state the slot is in.
        let occupant = Occupant::new(registration, phone)?;

        // Any id that names no vacant slot, unknown or malformed included,
        // is reported as taken.
        let Some(slot_id) = self.known_slot(slot_id, "Booking").await? else {
            return Err(CoreError::ConflictError(SLOT_OCCUPIED.to_string()));
        };

        if self.repo.occupy(&slot_id, &occupant).await? {
            info!("Slot {} booked for {}", slot_id, occupant.registration);
            return Ok(ParkingSlot {
                slot_id,
                occupant: Some(occupant),
            });
        }

        Err(CoreError::ConflictError(SLOT_OCCUPIED.to_string()))
    }

    pub async fn unbook(&self, slot_id: &str) -> CoreResult<ParkingSlot> {
        let Some(slot_id) = self.known_slot(slot_id, "Unbooking").await? else {
            return Err(CoreError::ConflictError(SLOT_VACANT.to_string()));
        };

        if self.repo.release(&slot_id).await? {
            info!("Slot {} released", slot_id);
            return Ok(ParkingSlot::vacant(slot_id));
        }

        Err(CoreError::ConflictError(SLOT_VACANT.to_string()))
    }

    /// Resolves a caller supplied id to a slot that exists in storage.
    async fn known_slot(&self, raw: &str, action: &str) -> CoreResult<Option<SlotId>> {
        let Ok(slot_id) = raw.parse::<SlotId>() else {
            debug!("{} rejected, malformed slot id {:?}", action, raw);
            return Ok(None);
        };
        if self.repo.get_slot(&slot_id).await?.is_none() {
            debug!("{} rejected, no slot {}", action, slot_id);
            return Ok(None);
        }
        Ok(Some(slot_id))
    }

    pub async fn find(&self, registration: &str) -> CoreResult<VehicleLocation> {
        let slot = self
            .repo
            .find_by_registration(registration)
            .await?
            .ok_or_else(|| CoreError::NotFoundError(VEHICLE_NOT_FOUND.to_string()))?;

        match slot.occupant {
            Some(occupant) => Ok(VehicleLocation {
                slot_id: slot.slot_id,
                phone: occupant.phone,
            }),
            None => Err(CoreError::NotFoundError(VEHICLE_NOT_FOUND.to_string())),
        }
    }

    pub async fn list(&self) -> CoreResult<SlotSummary> {
        let slots = self.repo.list_slots().await?;
        Ok(SlotSummary::from_slots(slots))
    }
}
