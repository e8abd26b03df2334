use base64::Engine;
use image::codecs::jpeg::JpegEncoder;
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut};
use imageproc::rect::Rect;

use crate::detector::OccupancySnapshot;
use crate::layout::SlotLayout;
use crate::VisionResult;

pub const FREE_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
pub const OCCUPIED_COLOR: Rgb<u8> = Rgb([255, 0, 0]);
const GAUGE_BACKGROUND: Rgb<u8> = Rgb([40, 40, 40]);
const GAUGE_FILL: Rgb<u8> = Rgb([0, 200, 0]);
const GAUGE_WIDTH: u32 = 300;
const GAUGE_HEIGHT: u32 = 24;

/// 2px outline of one rectangle.
fn draw_outline(frame: &mut RgbImage, x: u32, y: u32, width: u32, height: u32, color: Rgb<u8>) {
    if width == 0 || height == 0 {
        return;
    }
    draw_hollow_rect_mut(frame, Rect::at(x as i32, y as i32).of_size(width, height), color);
    if width > 2 && height > 2 {
        draw_hollow_rect_mut(
            frame,
            Rect::at(x as i32 + 1, y as i32 + 1).of_size(width - 2, height - 2),
            color,
        );
    }
}

/// Draws each slot (green free, red occupied) and a free/total gauge in the
/// top-left corner.
pub fn annotate(frame: &mut RgbImage, layout: &SlotLayout, snapshot: &OccupancySnapshot) {
    for reading in &snapshot.readings {
        let color = if reading.occupied { OCCUPIED_COLOR } else { FREE_COLOR };
        draw_outline(frame, reading.x, reading.y, layout.width, layout.height, color);
    }

    let total = snapshot.total();
    draw_filled_rect_mut(
        frame,
        Rect::at(20, 20).of_size(GAUGE_WIDTH, GAUGE_HEIGHT),
        GAUGE_BACKGROUND,
    );
    if total > 0 && snapshot.free_count() > 0 {
        let filled = (GAUGE_WIDTH as usize * snapshot.free_count() / total).max(1) as u32;
        draw_filled_rect_mut(
            frame,
            Rect::at(20, 20).of_size(filled, GAUGE_HEIGHT),
            GAUGE_FILL,
        );
    }
}

/// Outlines only, for the position editor preview.
pub fn draw_layout(frame: &mut RgbImage, layout: &SlotLayout) {
    for pos in &layout.positions {
        draw_outline(frame, pos.x, pos.y, layout.width, layout.height, FREE_COLOR);
    }
}

pub fn encode_jpeg(frame: &RgbImage, quality: u8) -> VisionResult<Vec<u8>> {
    let mut buffer = Vec::new();
    {
        let mut encoder = JpegEncoder::new_with_quality(&mut buffer, quality.clamp(1, 100));
        encoder.encode_image(frame)?;
    }
    Ok(buffer)
}

pub fn encode_jpeg_base64(frame: &RgbImage, quality: u8) -> VisionResult<String> {
    let jpeg = encode_jpeg(frame, quality)?;
    Ok(base64::engine::general_purpose::STANDARD.encode(jpeg))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector::SlotReading;

    fn snapshot(occupied: [bool; 2]) -> OccupancySnapshot {
        OccupancySnapshot {
            frame: 0,
            captured_at: 0,
            readings: vec![
                SlotReading {
                    slot_id: "A-1".parse().unwrap(),
                    x: 50,
                    y: 60,
                    foreground: 0,
                    occupied: occupied[0],
                },
                SlotReading {
                    slot_id: "A-2".parse().unwrap(),
                    x: 200,
                    y: 60,
                    foreground: 2000,
                    occupied: occupied[1],
                },
            ],
        }
    }

    #[test]
    fn test_outline_colors_follow_occupancy() {
        let layout = SlotLayout::new(107, 48);
        let mut frame = RgbImage::new(400, 200);
        annotate(&mut frame, &layout, &snapshot([false, true]));

        assert_eq!(*frame.get_pixel(50, 60), FREE_COLOR);
        assert_eq!(*frame.get_pixel(51, 61), FREE_COLOR);
        assert_eq!(*frame.get_pixel(200, 100), OCCUPIED_COLOR);
        // Interior untouched.
        assert_eq!(*frame.get_pixel(100, 80), Rgb([0, 0, 0]));
    }

    #[test]
    fn test_gauge_reflects_free_share() {
        let layout = SlotLayout::new(107, 48);
        let mut frame = RgbImage::new(400, 200);
        annotate(&mut frame, &layout, &snapshot([false, true]));

        assert_eq!(*frame.get_pixel(25, 30), GAUGE_FILL);
        assert_eq!(*frame.get_pixel(20 + 200, 30), GAUGE_BACKGROUND);
    }

    #[test]
    fn test_annotation_clips_at_frame_edge() {
        let layout = SlotLayout::new(107, 48);
        let mut frame = RgbImage::new(120, 70);
        annotate(&mut frame, &layout, &snapshot([true, true]));
        assert_eq!(*frame.get_pixel(50, 60), OCCUPIED_COLOR);
    }

    #[test]
    fn test_jpeg_payload_is_base64_jpeg() {
        let frame = RgbImage::from_pixel(32, 16, Rgb([10, 200, 30]));
        let encoded = encode_jpeg_base64(&frame, 80).unwrap();
        let bytes = base64::engine::general_purpose::STANDARD.decode(encoded).unwrap();
        // SOI marker
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
    }
}
