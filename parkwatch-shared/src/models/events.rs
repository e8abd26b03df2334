use serde::{Deserialize, Serialize};

/// Live occupancy report pushed to viewers on the `update` event.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct OccupancyUpdate {
    pub free_slots: usize,
    pub total_slots: usize,
    pub occupied_slots: Vec<String>,
    pub is_full: bool,
    /// Annotated frame, base64 encoded JPEG.
    pub image: String,
    pub frame: u64,
    pub captured_at: i64,
}

impl OccupancyUpdate {
    pub fn is_occupied(&self, slot_id: &str) -> bool {
        self.occupied_slots.iter().any(|s| s == slot_id)
    }
}
