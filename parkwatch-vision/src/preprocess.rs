use image::{imageops, GrayImage, Luma, RgbImage};
use imageproc::distance_transform::Norm;
use imageproc::filter::{gaussian_blur_f32, median_filter};
use imageproc::morphology::dilate;

/// Knobs for the frame preprocessing chain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PreprocessParams {
    pub blur_sigma: f32,
    /// Odd neighbourhood size for the adaptive threshold.
    pub threshold_block: u32,
    /// Subtracted from the local mean before comparing.
    pub threshold_offset: i16,
    pub median_radius: u32,
    pub dilate_radius: u8,
}

impl Default for PreprocessParams {
    fn default() -> Self {
        Self {
            blur_sigma: 1.0,
            threshold_block: 25,
            threshold_offset: 16,
            median_radius: 2,
            dilate_radius: 1,
        }
    }
}

/// grayscale -> gaussian blur -> inverse adaptive threshold -> median -> dilate.
///
/// The result is a binary mask where dark, textured areas (cars, shadows,
/// edges) are 255 and flat asphalt is 0.
pub fn preprocess(frame: &RgbImage, params: &PreprocessParams) -> GrayImage {
    let gray = imageops::grayscale(frame);
    let blurred = gaussian_blur_f32(&gray, params.blur_sigma);
    let mask = adaptive_threshold_inv(&blurred, params.threshold_block, params.threshold_offset);
    let median = median_filter(&mask, params.median_radius, params.median_radius);
    dilate(&median, Norm::LInf, params.dilate_radius)
}

/// Gaussian-weighted adaptive threshold, inverted: a pixel becomes 255 when it
/// is at or below its neighbourhood mean minus `offset`.
pub fn adaptive_threshold_inv(image: &GrayImage, block_size: u32, offset: i16) -> GrayImage {
    let block_size = block_size.max(3) | 1;
    // Same sigma OpenCV derives for a kernel of this size.
    let sigma = 0.3 * ((block_size as f32 - 1.0) * 0.5 - 1.0) + 0.8;
    let local_mean = gaussian_blur_f32(image, sigma);

    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        let value = image.get_pixel(x, y)[0] as i16;
        let threshold = local_mean.get_pixel(x, y)[0] as i16 - offset;
        if value <= threshold {
            Luma([255])
        } else {
            Luma([0])
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_flat_frame_has_no_foreground() {
        let frame = RgbImage::from_pixel(120, 80, Rgb([128, 128, 128]));
        let mask = preprocess(&frame, &PreprocessParams::default());
        assert_eq!(mask.dimensions(), (120, 80));
        assert!(mask.pixels().all(|p| p[0] == 0));
    }

    #[test]
    fn test_dark_stripes_on_bright_ground_are_foreground() {
        // Vertical dark bars every 8 px, like car edges against asphalt.
        let frame = RgbImage::from_fn(120, 80, |x, _| {
            if x % 8 < 3 {
                Rgb([20, 20, 20])
            } else {
                Rgb([220, 220, 220])
            }
        });
        let mask = preprocess(&frame, &PreprocessParams::default());
        let lit = mask.pixels().filter(|p| p[0] != 0).count();
        assert!(lit > (120 * 80) / 4, "only {} foreground pixels", lit);
    }

    #[test]
    fn test_adaptive_threshold_is_inverse_binary() {
        let mut image = GrayImage::from_pixel(31, 31, Luma([200]));
        image.put_pixel(15, 15, Luma([10]));

        let mask = adaptive_threshold_inv(&image, 25, 16);
        assert_eq!(mask.get_pixel(15, 15)[0], 255);
        assert_eq!(mask.get_pixel(0, 0)[0], 0);
        assert!(mask.pixels().all(|p| p[0] == 0 || p[0] == 255));
    }
}
