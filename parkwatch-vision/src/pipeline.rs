use image::RgbImage;
use parkwatch_shared::OccupancyUpdate;

use crate::annotate::{annotate, encode_jpeg_base64};
use crate::detector::{OccupancyDetector, OccupancySnapshot};
use crate::VisionResult;

/// One frame in, classified snapshot plus the viewer payload out.
pub struct FrameAnalyzer {
    detector: OccupancyDetector,
    jpeg_quality: u8,
}

impl FrameAnalyzer {
    pub fn new(detector: OccupancyDetector, jpeg_quality: u8) -> Self {
        Self {
            detector,
            jpeg_quality,
        }
    }

    pub fn detector(&self) -> &OccupancyDetector {
        &self.detector
    }

    pub fn analyze(
        &self,
        mut frame: RgbImage,
        sequence: u64,
    ) -> VisionResult<(OccupancySnapshot, OccupancyUpdate)> {
        let snapshot = self.detector.detect(&frame, sequence);
        annotate(&mut frame, self.detector.layout(), &snapshot);
        let image = encode_jpeg_base64(&frame, self.jpeg_quality)?;

        let update = OccupancyUpdate {
            free_slots: snapshot.free_count(),
            total_slots: snapshot.total(),
            occupied_slots: snapshot.occupied_slots(),
            is_full: snapshot.is_full(),
            image,
            frame: snapshot.frame,
            captured_at: snapshot.captured_at,
        };
        Ok((snapshot, update))
    }
}
