//! Crop geometry, color swatches, and the visual overlay.
//!
//! The recognizer receives a padded crop of each detection box, upscaled when
//! it is too small to read. The overlay draws every box and a label bar onto
//! the processed frame before transport encoding.

use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage};

use crate::detect::BoundingBox;

/// Crops narrower than this are upscaled before recognition.
pub const MIN_CROP_WIDTH: u32 = 100;
/// Crops shorter than this are upscaled before recognition.
pub const MIN_CROP_HEIGHT: u32 = 30;
/// Upscale factor applied to small crops.
pub const CROP_UPSCALE_FACTOR: u32 = 2;

const OUTLINE_THICKNESS: u32 = 2;
const LABEL_BAR_HEIGHT: u32 = 6;

/// Integer rectangle clamped to frame bounds, with `x1 < x2` and `y1 < y2`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PixelRect {
    pub x1: u32,
    pub y1: u32,
    pub x2: u32,
    pub y2: u32,
}

impl PixelRect {
    /// Clamp a model box (optionally padded) to frame bounds. Returns `None`
    /// for degenerate boxes that collapse to zero width or height.
    pub fn from_box(bbox: &BoundingBox, width: u32, height: u32, padding: u32) -> Option<Self> {
        let pad = padding as f32;
        let x1 = (bbox.x1 - pad).floor().max(0.0) as u32;
        let y1 = (bbox.y1 - pad).floor().max(0.0) as u32;
        let x2 = ((bbox.x2 + pad).ceil() as i64).clamp(0, width as i64) as u32;
        let y2 = ((bbox.y2 + pad).ceil() as i64).clamp(0, height as i64) as u32;
        (x2 > x1 && y2 > y1).then_some(Self { x1, y1, x2, y2 })
    }

    pub fn width(&self) -> u32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> u32 {
        self.y2 - self.y1
    }
}

/// Copy out the rectangle as an owned crop.
pub fn crop_rect(image: &RgbImage, rect: &PixelRect) -> RgbImage {
    imageops::crop_imm(image, rect.x1, rect.y1, rect.width(), rect.height()).to_image()
}

/// Upscale a crop that is too small for reliable recognition.
pub fn upscale_if_small(crop: RgbImage) -> RgbImage {
    let (w, h) = (crop.width(), crop.height());
    if w >= MIN_CROP_WIDTH && h >= MIN_CROP_HEIGHT {
        return crop;
    }
    imageops::resize(
        &crop,
        w * CROP_UPSCALE_FACTOR,
        h * CROP_UPSCALE_FACTOR,
        FilterType::CatmullRom,
    )
}

/// Mean color of a region, for the UI swatch.
pub fn mean_color(image: &RgbImage) -> [u8; 3] {
    let count = (image.width() as u64 * image.height() as u64).max(1);
    let mut sums = [0u64; 3];
    for pixel in image.pixels() {
        for (sum, channel) in sums.iter_mut().zip(pixel.0) {
            *sum += channel as u64;
        }
    }
    [
        (sums[0] / count) as u8,
        (sums[1] / count) as u8,
        (sums[2] / count) as u8,
    ]
}

/// `#rrggbb` form of a color swatch.
pub fn color_hex(color: [u8; 3]) -> String {
    format!("#{:02x}{:02x}{:02x}", color[0], color[1], color[2])
}

/// Draw a box outline plus a filled label bar above it.
pub fn draw_detection(image: &mut RgbImage, rect: &PixelRect, color: [u8; 3]) {
    let pixel = Rgb(color);
    let (w, h) = (image.width(), image.height());

    for t in 0..OUTLINE_THICKNESS {
        let (top, bottom) = (rect.y1 + t, rect.y2.saturating_sub(1 + t));
        for x in rect.x1..rect.x2.min(w) {
            if top < h {
                image.put_pixel(x, top, pixel);
            }
            if bottom < h && bottom > top {
                image.put_pixel(x, bottom, pixel);
            }
        }
        let (left, right) = (rect.x1 + t, rect.x2.saturating_sub(1 + t));
        for y in rect.y1..rect.y2.min(h) {
            if left < w {
                image.put_pixel(left, y, pixel);
            }
            if right < w && right > left {
                image.put_pixel(right, y, pixel);
            }
        }
    }

    let bar_top = rect.y1.saturating_sub(LABEL_BAR_HEIGHT);
    for y in bar_top..rect.y1 {
        for x in rect.x1..rect.x2.min(w) {
            image.put_pixel(x, y, pixel);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gray(width: u32, height: u32) -> RgbImage {
        RgbImage::from_pixel(width, height, Rgb([50, 50, 50]))
    }

    #[test]
    fn padded_rect_clamps_to_frame_bounds() {
        let bbox = BoundingBox::new(5.0, 5.0, 630.0, 470.0);
        let rect = PixelRect::from_box(&bbox, 640, 480, 10).unwrap();
        assert_eq!(rect, PixelRect { x1: 0, y1: 0, x2: 640, y2: 480 });
    }

    #[test]
    fn degenerate_box_yields_none() {
        let bbox = BoundingBox::new(700.0, 10.0, 720.0, 40.0);
        assert!(PixelRect::from_box(&bbox, 640, 480, 0).is_none());
    }

    #[test]
    fn inverted_box_yields_none() {
        let bbox = BoundingBox::new(100.0, 100.0, 50.0, 50.0);
        assert!(PixelRect::from_box(&bbox, 640, 480, 0).is_none());
    }

    #[test]
    fn crop_matches_rect_dimensions() {
        let image = gray(640, 480);
        let rect = PixelRect { x1: 10, y1: 20, x2: 110, y2: 60 };
        let crop = crop_rect(&image, &rect);
        assert_eq!((crop.width(), crop.height()), (100, 40));
    }

    #[test]
    fn small_crop_is_upscaled() {
        let crop = gray(40, 20);
        let scaled = upscale_if_small(crop);
        assert_eq!((scaled.width(), scaled.height()), (80, 40));
    }

    #[test]
    fn large_crop_is_untouched() {
        let crop = gray(120, 40);
        let scaled = upscale_if_small(crop);
        assert_eq!((scaled.width(), scaled.height()), (120, 40));
    }

    #[test]
    fn mean_color_of_solid_region() {
        let image = RgbImage::from_pixel(8, 8, Rgb([10, 200, 30]));
        assert_eq!(mean_color(&image), [10, 200, 30]);
        assert_eq!(color_hex([10, 200, 30]), "#0ac81e");
    }

    #[test]
    fn overlay_draws_outline_and_bar() {
        let mut image = gray(100, 100);
        let rect = PixelRect { x1: 20, y1: 30, x2: 60, y2: 70 };
        draw_detection(&mut image, &rect, [255, 0, 0]);

        assert_eq!(image.get_pixel(20, 30), &Rgb([255, 0, 0])); // outline corner
        assert_eq!(image.get_pixel(40, 25), &Rgb([255, 0, 0])); // label bar
        assert_eq!(image.get_pixel(40, 50), &Rgb([50, 50, 50])); // interior untouched
    }
}
