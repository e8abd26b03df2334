use parkwatch_core::SlotId;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use tracing::info;

use crate::{VisionError, VisionResult};

/// Top-left corner of one slot rectangle, tied to its slot by id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotPosition {
    pub slot_id: SlotId,
    pub x: u32,
    pub y: u32,
}

impl SlotPosition {
    /// Strict containment, the border itself does not count.
    pub fn contains(&self, px: u32, py: u32, width: u32, height: u32) -> bool {
        let (px, py) = (px as u64, py as u64);
        let (x, y) = (self.x as u64, self.y as u64);
        x < px && px < x + width as u64 && y < py && py < y + height as u64
    }
}

/// Every slot rectangle in the frame. All rectangles share one size.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotLayout {
    pub width: u32,
    pub height: u32,
    pub positions: Vec<SlotPosition>,
}

impl SlotLayout {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            positions: Vec::new(),
        }
    }

    /// Reads a layout file. A missing file is an empty layout of the given
    /// rectangle size.
    pub fn load_or_default(path: impl AsRef<Path>, width: u32, height: u32) -> VisionResult<Self> {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(raw) => {
                let layout: SlotLayout = serde_json::from_str(&raw)?;
                info!("Loaded {} slot positions from {}", layout.len(), path.display());
                Ok(layout)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!("No layout at {}, starting empty", path.display());
                Ok(Self::new(width, height))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Replaces whatever the file held before.
    pub fn save(&self, path: impl AsRef<Path>) -> VisionResult<()> {
        let raw = serde_json::to_string_pretty(self)?;
        fs::write(path.as_ref(), raw)?;
        info!("Saved {} slot positions to {}", self.len(), path.as_ref().display());
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn position(&self, slot_id: &SlotId) -> Option<&SlotPosition> {
        self.positions.iter().find(|p| &p.slot_id == slot_id)
    }

    pub fn add(&mut self, slot_id: SlotId, x: u32, y: u32) -> VisionResult<()> {
        if self.position(&slot_id).is_some() {
            return Err(VisionError::DuplicateSlot(slot_id.to_string()));
        }
        self.positions.push(SlotPosition { slot_id, x, y });
        Ok(())
    }

    /// Drops every rectangle under the point and returns them.
    pub fn remove_at(&mut self, x: u32, y: u32) -> Vec<SlotPosition> {
        let (width, height) = (self.width, self.height);
        let mut removed = Vec::new();
        self.positions.retain(|p| {
            if p.contains(x, y, width, height) {
                removed.push(*p);
                false
            } else {
                true
            }
        });
        removed
    }

    /// First id of the lot, zone by zone, that has no rectangle yet.
    pub fn next_slot_id(&self, zones: &[char], slots_per_zone: u32) -> Option<SlotId> {
        SlotId::seed_set(zones, slots_per_zone)
            .ok()?
            .into_iter()
            .find(|id| self.position(id).is_none())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> SlotId {
        s.parse().unwrap()
    }

    #[test]
    fn test_remove_only_strictly_containing() {
        let mut layout = SlotLayout::new(107, 48);
        layout.add(id("A-1"), 100, 100).unwrap();
        layout.add(id("A-2"), 300, 100).unwrap();

        // On the border: nothing removed.
        assert!(layout.remove_at(100, 120).is_empty());
        assert!(layout.remove_at(207, 120).is_empty());
        assert_eq!(layout.len(), 2);

        let removed = layout.remove_at(150, 120);
        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].slot_id, id("A-1"));
        assert_eq!(layout.positions[0].slot_id, id("A-2"));
    }

    #[test]
    fn test_remove_drops_overlapping_rectangles() {
        let mut layout = SlotLayout::new(107, 48);
        layout.add(id("A-1"), 100, 100).unwrap();
        layout.add(id("A-2"), 120, 110).unwrap();
        layout.add(id("A-3"), 400, 400).unwrap();

        assert_eq!(layout.remove_at(150, 130).len(), 2);
        assert_eq!(layout.len(), 1);
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let mut layout = SlotLayout::new(107, 48);
        layout.add(id("B-1"), 0, 0).unwrap();
        assert!(matches!(
            layout.add(id("B-1"), 10, 10),
            Err(VisionError::DuplicateSlot(_))
        ));
    }

    #[test]
    fn test_next_slot_id_fills_gaps() {
        let mut layout = SlotLayout::new(107, 48);
        assert_eq!(layout.next_slot_id(&['A', 'B'], 2), Some(id("A-1")));

        layout.add(id("A-1"), 0, 0).unwrap();
        layout.add(id("B-1"), 0, 0).unwrap();
        assert_eq!(layout.next_slot_id(&['A', 'B'], 2), Some(id("A-2")));

        layout.add(id("A-2"), 0, 0).unwrap();
        layout.add(id("B-2"), 0, 0).unwrap();
        assert_eq!(layout.next_slot_id(&['A', 'B'], 2), None);
    }

    #[test]
    fn test_save_replaces_file_and_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("layout.json");

        let missing = SlotLayout::load_or_default(&path, 107, 48).unwrap();
        assert!(missing.is_empty());
        assert_eq!((missing.width, missing.height), (107, 48));

        let mut layout = SlotLayout::new(107, 48);
        layout.add(id("A-1"), 10, 20).unwrap();
        layout.add(id("A-2"), 130, 20).unwrap();
        layout.save(&path).unwrap();

        let mut smaller = SlotLayout::new(107, 48);
        smaller.add(id("C-5"), 1, 2).unwrap();
        smaller.save(&path).unwrap();

        let loaded = SlotLayout::load_or_default(&path, 1, 1).unwrap();
        assert_eq!(loaded, smaller);
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("layout.json");
        fs::write(&path, "[(1, 2)]").unwrap();
        assert!(matches!(
            SlotLayout::load_or_default(&path, 107, 48),
            Err(VisionError::Layout(_))
        ));
    }
}
