use image::{GrayImage, RgbImage};
use parkwatch_core::SlotId;

use crate::layout::SlotLayout;
use crate::preprocess::{preprocess, PreprocessParams};

/// Foreground pixels at which a slot counts as taken.
pub const DEFAULT_PIXEL_THRESHOLD: u32 = 900;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotReading {
    pub slot_id: SlotId,
    pub x: u32,
    pub y: u32,
    pub foreground: u32,
    pub occupied: bool,
}

/// Result for one frame. Readings keep layout order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OccupancySnapshot {
    pub frame: u64,
    pub captured_at: i64,
    pub readings: Vec<SlotReading>,
}

impl OccupancySnapshot {
    pub fn occupied_slots(&self) -> Vec<String> {
        self.readings
            .iter()
            .filter(|r| r.occupied)
            .map(|r| r.slot_id.to_string())
            .collect()
    }

    pub fn free_count(&self) -> usize {
        self.readings.iter().filter(|r| !r.occupied).count()
    }

    pub fn total(&self) -> usize {
        self.readings.len()
    }

    /// An empty layout is never full.
    pub fn is_full(&self) -> bool {
        !self.readings.is_empty() && self.readings.iter().all(|r| r.occupied)
    }
}

/// Counts non-zero pixels in a rectangle, clipped to the image.
pub fn count_foreground(mask: &GrayImage, x: u32, y: u32, width: u32, height: u32) -> u32 {
    let x_end = x.saturating_add(width).min(mask.width());
    let y_end = y.saturating_add(height).min(mask.height());

    let mut count = 0;
    for py in y.min(y_end)..y_end {
        for px in x.min(x_end)..x_end {
            if mask.get_pixel(px, py)[0] != 0 {
                count += 1;
            }
        }
    }
    count
}

pub struct OccupancyDetector {
    layout: SlotLayout,
    pixel_threshold: u32,
    params: PreprocessParams,
}

impl OccupancyDetector {
    pub fn new(layout: SlotLayout, pixel_threshold: u32) -> Self {
        Self {
            layout,
            pixel_threshold,
            params: PreprocessParams::default(),
        }
    }

    pub fn layout(&self) -> &SlotLayout {
        &self.layout
    }

    /// Classifies every slot against an already preprocessed mask.
    pub fn classify(&self, mask: &GrayImage, frame: u64) -> OccupancySnapshot {
        let readings = self
            .layout
            .positions
            .iter()
            .map(|pos| {
                let foreground =
                    count_foreground(mask, pos.x, pos.y, self.layout.width, self.layout.height);
                SlotReading {
                    slot_id: pos.slot_id,
                    x: pos.x,
                    y: pos.y,
                    foreground,
                    occupied: foreground >= self.pixel_threshold,
                }
            })
            .collect();

        OccupancySnapshot {
            frame,
            captured_at: chrono::Utc::now().timestamp_millis(),
            readings,
        }
    }

    pub fn detect(&self, frame: &RgbImage, sequence: u64) -> OccupancySnapshot {
        let mask = preprocess(frame, &self.params);
        self.classify(&mask, sequence)
    }
}
