//! Frame annotation for the live view
//!
//! Composites the region-of-interest box, the winning motion box, the
//! status banner, and the delta panel into a frame before it is published
//! or written to a sink.

use crate::models::{MotionEvent, RegionOfInterest};
use image::{imageops, GrayImage, Rgb, RgbImage};

/// ROI outline color
const ROI_COLOR: Rgb<u8> = Rgb([0, 0, 255]);
/// Motion bounding-box color
const MOTION_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
/// Status banner color
const TEXT_COLOR: Rgb<u8> = Rgb([255, 0, 0]);
/// Banner position
const TEXT_POS: (u32, u32) = (10, 35);

/// Annotate a frame in place.
///
/// The delta image replaces the ROI pixels (resized to fit), mirroring
/// what the detector actually compared.
pub fn annotate(
    image: &mut RgbImage,
    roi: &RegionOfInterest,
    event: Option<&MotionEvent>,
    delta: &GrayImage,
    status: &str,
) {
    // Panel first so the boxes stay visible on top of it
    composite_delta_panel(image, roi, delta);

    draw_rect(
        image,
        roi.x,
        roi.y,
        roi.x + roi.width - 1,
        roi.y + roi.height - 1,
        ROI_COLOR,
        2,
    );

    if let Some(event) = event {
        // Motion bounds are ROI-relative; offset into frame coordinates
        let x0 = roi.x + event.bounds.x;
        let y0 = roi.y + event.bounds.y;
        draw_rect(
            image,
            x0,
            y0,
            x0 + event.bounds.width - 1,
            y0 + event.bounds.height - 1,
            MOTION_COLOR,
            2,
        );
    }

    draw_text(image, TEXT_POS.0, TEXT_POS.1, status, TEXT_COLOR, 2);
}

/// Paste the (resized) grayscale delta into the ROI area
fn composite_delta_panel(image: &mut RgbImage, roi: &RegionOfInterest, delta: &GrayImage) {
    let panel = if delta.dimensions() == (roi.width, roi.height) {
        delta.clone()
    } else {
        imageops::resize(
            delta,
            roi.width,
            roi.height,
            imageops::FilterType::Triangle,
        )
    };
    let (frame_w, frame_h) = image.dimensions();
    for (px, py, pixel) in panel.enumerate_pixels() {
        let x = roi.x + px;
        let y = roi.y + py;
        if x < frame_w && y < frame_h {
            let v = pixel.0[0];
            image.put_pixel(x, y, Rgb([v, v, v]));
        }
    }
}

/// Draw a rectangle border with the given thickness, clamped to bounds
pub fn draw_rect(image: &mut RgbImage, x0: u32, y0: u32, x1: u32, y1: u32, color: Rgb<u8>, thickness: u32) {
    let (w, h) = image.dimensions();
    for t in 0..thickness {
        let top = y0.saturating_add(t);
        let bottom = y1.saturating_sub(t);
        let left = x0.saturating_add(t);
        let right = x1.saturating_sub(t);
        if left > right || top > bottom {
            continue;
        }
        for x in left..=right.min(w.saturating_sub(1)) {
            if top < h {
                image.put_pixel(x, top, color);
            }
            if bottom < h {
                image.put_pixel(x, bottom, color);
            }
        }
        for y in top..=bottom.min(h.saturating_sub(1)) {
            if left < w {
                image.put_pixel(left, y, color);
            }
            if right < w {
                image.put_pixel(right, y, color);
            }
        }
    }
}

/// Render a status string with the built-in 5x7 glyph set.
///
/// Covers the status banner character set (digits plus the letters of the
/// movement banner); anything else renders as a blank cell.
pub fn draw_text(image: &mut RgbImage, x: u32, y: u32, text: &str, color: Rgb<u8>, scale: u32) {
    let (w, h) = image.dimensions();
    let mut cursor = x;
    for c in text.chars().flat_map(|c| c.to_uppercase()) {
        if let Some(rows) = glyph(c) {
            for (row, bits) in rows.iter().enumerate() {
                for col in 0..5u32 {
                    if bits & (0b10000 >> col) == 0 {
                        continue;
                    }
                    for dy in 0..scale {
                        for dx in 0..scale {
                            let px = cursor + col * scale + dx;
                            let py = y + row as u32 * scale + dy;
                            if px < w && py < h {
                                image.put_pixel(px, py, color);
                            }
                        }
                    }
                }
            }
        }
        // 5 columns plus 1 of spacing
        cursor += 6 * scale;
    }
}

/// 5x7 glyph rows, bit 4 = leftmost column
fn glyph(c: char) -> Option<[u8; 7]> {
    let rows = match c {
        '0' => [0b01110, 0b10001, 0b10011, 0b10101, 0b11001, 0b10001, 0b01110],
        '1' => [0b00100, 0b01100, 0b00100, 0b00100, 0b00100, 0b00100, 0b01110],
        '2' => [0b01110, 0b10001, 0b00001, 0b00010, 0b00100, 0b01000, 0b11111],
        '3' => [0b11111, 0b00010, 0b00100, 0b00010, 0b00001, 0b10001, 0b01110],
        '4' => [0b00010, 0b00110, 0b01010, 0b10010, 0b11111, 0b00010, 0b00010],
        '5' => [0b11111, 0b10000, 0b11110, 0b00001, 0b00001, 0b10001, 0b01110],
        '6' => [0b00110, 0b01000, 0b10000, 0b11110, 0b10001, 0b10001, 0b01110],
        '7' => [0b11111, 0b00001, 0b00010, 0b00100, 0b01000, 0b01000, 0b01000],
        '8' => [0b01110, 0b10001, 0b10001, 0b01110, 0b10001, 0b10001, 0b01110],
        '9' => [0b01110, 0b10001, 0b10001, 0b01111, 0b00001, 0b00010, 0b01100],
        'C' => [0b01110, 0b10001, 0b10000, 0b10000, 0b10000, 0b10001, 0b01110],
        'D' => [0b11110, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b11110],
        'E' => [0b11111, 0b10000, 0b10000, 0b11110, 0b10000, 0b10000, 0b11111],
        'M' => [0b10001, 0b11011, 0b10101, 0b10101, 0b10001, 0b10001, 0b10001],
        'N' => [0b10001, 0b10001, 0b11001, 0b10101, 0b10011, 0b10001, 0b10001],
        'O' => [0b01110, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01110],
        'T' => [0b11111, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100],
        'V' => [0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01010, 0b00100],
        _ => return None,
    };
    Some(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Bounds;

    fn test_roi() -> RegionOfInterest {
        RegionOfInterest {
            x: 40,
            y: 40,
            width: 30,
            height: 20,
        }
    }

    #[test]
    fn test_roi_outline_drawn() {
        let mut image = RgbImage::new(120, 120);
        let roi = test_roi();
        let delta = GrayImage::new(roi.width, roi.height);
        annotate(&mut image, &roi, None, &delta, "");

        assert_eq!(*image.get_pixel(40, 40), ROI_COLOR);
        assert_eq!(*image.get_pixel(69, 40), ROI_COLOR);
        assert_eq!(*image.get_pixel(40, 59), ROI_COLOR);
    }

    #[test]
    fn test_motion_box_offset_into_frame_coordinates() {
        let mut image = RgbImage::new(120, 120);
        let roi = test_roi();
        let delta = GrayImage::new(roi.width, roi.height);
        let event = MotionEvent {
            bounds: Bounds {
                x: 5,
                y: 5,
                width: 10,
                height: 8,
            },
            area: 80,
        };
        annotate(&mut image, &roi, Some(&event), &delta, "");

        // Top-left of the motion box: ROI origin + bounds origin
        assert_eq!(*image.get_pixel(45, 45), MOTION_COLOR);
    }

    #[test]
    fn test_delta_panel_replaces_roi_interior() {
        let mut image = RgbImage::new(120, 120);
        let roi = test_roi();
        let delta = GrayImage::from_pixel(roi.width, roi.height, image::Luma([77]));
        annotate(&mut image, &roi, None, &delta, "");

        // Interior pixel carries the delta value on all channels
        assert_eq!(*image.get_pixel(55, 50), Rgb([77, 77, 77]));
    }

    #[test]
    fn test_text_renders_known_glyphs() {
        let mut image = RgbImage::new(200, 60);
        draw_text(&mut image, 0, 0, "NO 5", TEXT_COLOR, 1);

        // 'N' sets its top-left pixel
        assert_eq!(*image.get_pixel(0, 0), TEXT_COLOR);
        // Space cell stays blank
        assert_eq!(*image.get_pixel(13, 0), Rgb([0, 0, 0]));
    }

    #[test]
    fn test_rect_clamped_at_frame_edge() {
        let mut image = RgbImage::new(50, 50);
        // Rectangle partially outside the frame must not panic
        draw_rect(&mut image, 40, 40, 60, 60, ROI_COLOR, 2);
        assert_eq!(*image.get_pixel(40, 40), ROI_COLOR);
    }
}
