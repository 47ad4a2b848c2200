//! MotionDetector - Frame Differencing Against a Reference Model
//!
//! ## Responsibilities
//!
//! - Maintain a blurred grayscale reference crop of the region of interest,
//!   hard-replaced on a fixed cadence regardless of motion state
//! - Per processed frame: absdiff -> binary threshold -> dilation ->
//!   connected component extraction -> largest qualifying component
//! - Emit at most one MotionEvent per processed frame
//!
//! Mis-sized frames are rejected with a capture error; the caller logs and
//! skips them.

use crate::error::{Error, Result};
use crate::models::{Bounds, Frame, MotionEvent, RegionOfInterest};
use image::{imageops, GrayImage, Luma};

/// Detector tuning
#[derive(Debug, Clone)]
pub struct DetectorConfig {
    /// Detection sub-rectangle
    pub roi: RegionOfInterest,
    /// Hard-replace the reference every N processed frames
    pub reference_swap_frames: u32,
    /// Gaussian blur sigma (0 disables blurring)
    pub blur_sigma: f32,
    /// Binary threshold on the delta image
    pub diff_threshold: u8,
    /// Dilation passes merging mask fragments
    pub dilate_iterations: u32,
    /// Minimum component area in pixels
    pub min_area: u32,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            roi: RegionOfInterest {
                x: 495,
                y: 255,
                width: 210,
                height: 75,
            },
            reference_swap_frames: 10,
            blur_sigma: 3.5,
            diff_threshold: 25,
            dilate_iterations: 2,
            min_area: 1000,
        }
    }
}

/// Output of one processed frame
pub struct Detection {
    /// The single largest qualifying motion region, if any
    pub event: Option<MotionEvent>,
    /// ROI-sized delta image, composited into the published frame
    pub delta: GrayImage,
}

/// A connected component of the thresholded mask
#[derive(Debug, Clone, Copy)]
struct Component {
    area: u32,
    bounds: Bounds,
}

/// MotionDetector instance.
///
/// Stateless per frame aside from the reference model and its swap counter.
pub struct MotionDetector {
    config: DetectorConfig,
    /// Current reference crop (blurred grayscale ROI)
    reference: Option<GrayImage>,
    /// ROI crop of the previously processed frame; becomes the reference
    /// on the next swap
    next_reference: Option<GrayImage>,
    /// Processed frames since the last reference replacement
    frames_since_swap: u32,
}

impl MotionDetector {
    /// Create a detector with the given tuning
    pub fn new(config: DetectorConfig) -> Self {
        Self {
            config,
            reference: None,
            next_reference: None,
            frames_since_swap: 0,
        }
    }

    /// Processed frames since the reference model was last replaced.
    ///
    /// Never exceeds the swap interval.
    pub fn reference_age(&self) -> u32 {
        self.frames_since_swap
    }

    /// Process one frame and return the detection result.
    ///
    /// The reference swap cadence is driven by its own counter, decoupled
    /// from whether motion was detected.
    pub fn process(&mut self, frame: &Frame) -> Result<Detection> {
        let (width, height) = frame.dimensions();
        if !self.config.roi.fits_within(width, height) {
            return Err(Error::Capture(format!(
                "frame {}x{} does not contain ROI at ({}, {}) {}x{}",
                width,
                height,
                self.config.roi.x,
                self.config.roi.y,
                self.config.roi.width,
                self.config.roi.height
            )));
        }

        let gray = imageops::grayscale(&frame.image);
        let blurred = if self.config.blur_sigma > 0.0 {
            imageops::blur(&gray, self.config.blur_sigma)
        } else {
            gray
        };
        let roi = imageops::crop_imm(
            &blurred,
            self.config.roi.x,
            self.config.roi.y,
            self.config.roi.width,
            self.config.roi.height,
        )
        .to_image();

        let reference = self.reference.get_or_insert_with(|| roi.clone());

        let delta = abs_diff(reference, &roi);
        let mut mask = threshold_mask(&delta, self.config.diff_threshold);
        for _ in 0..self.config.dilate_iterations {
            mask = dilate(&mask);
        }

        let event = largest_component(&mask, self.config.min_area).map(|c| MotionEvent {
            bounds: c.bounds,
            area: c.area,
        });

        // Reference replacement: hard swap to the previous frame's crop
        // every swap interval, independent of motion state.
        self.frames_since_swap += 1;
        if self.frames_since_swap >= self.config.reference_swap_frames {
            self.frames_since_swap = 0;
            let replacement = self.next_reference.take().unwrap_or_else(|| roi.clone());
            self.reference = Some(replacement);
        }
        self.next_reference = Some(roi);

        Ok(Detection { event, delta })
    }
}

/// Per-pixel absolute difference of two same-sized grayscale images
fn abs_diff(a: &GrayImage, b: &GrayImage) -> GrayImage {
    let (width, height) = a.dimensions();
    let mut out = GrayImage::new(width, height);
    for (x, y, pixel) in out.enumerate_pixels_mut() {
        let pa = a.get_pixel(x, y).0[0];
        let pb = b.get_pixel(x, y).0[0];
        *pixel = Luma([pa.abs_diff(pb)]);
    }
    out
}

/// Binary threshold: pixels strictly above the cutoff become 255
fn threshold_mask(delta: &GrayImage, cutoff: u8) -> GrayImage {
    let (width, height) = delta.dimensions();
    let mut out = GrayImage::new(width, height);
    for (x, y, pixel) in out.enumerate_pixels_mut() {
        let v = delta.get_pixel(x, y).0[0];
        *pixel = Luma([if v > cutoff { 255 } else { 0 }]);
    }
    out
}

/// One 3x3 dilation pass over a binary mask
fn dilate(mask: &GrayImage) -> GrayImage {
    let (width, height) = mask.dimensions();
    let mut out = GrayImage::new(width, height);
    for y in 0..height {
        for x in 0..width {
            let mut hit = false;
            'scan: for dy in -1i64..=1 {
                for dx in -1i64..=1 {
                    let nx = x as i64 + dx;
                    let ny = y as i64 + dy;
                    if nx < 0 || ny < 0 || nx >= width as i64 || ny >= height as i64 {
                        continue;
                    }
                    if mask.get_pixel(nx as u32, ny as u32).0[0] > 0 {
                        hit = true;
                        break 'scan;
                    }
                }
            }
            out.put_pixel(x, y, Luma([if hit { 255 } else { 0 }]));
        }
    }
    out
}

/// Extract 8-connected components and return the largest whose area exceeds
/// the minimum.
///
/// Area is the component's pixel count. Ties on area break on the smaller
/// bounding-box top-left y, then smaller x, so the winner is independent of
/// scan order.
fn largest_component(mask: &GrayImage, min_area: u32) -> Option<Component> {
    let (width, height) = mask.dimensions();
    let w = width as usize;
    let mut visited = vec![false; w * height as usize];
    let mut best: Option<Component> = None;

    for start_y in 0..height {
        for start_x in 0..width {
            let idx = start_y as usize * w + start_x as usize;
            if visited[idx] || mask.get_pixel(start_x, start_y).0[0] == 0 {
                continue;
            }

            // Flood fill this component, tracking area and bounding box
            let mut area = 0u32;
            let (mut min_x, mut min_y) = (start_x, start_y);
            let (mut max_x, mut max_y) = (start_x, start_y);
            let mut stack = vec![(start_x, start_y)];
            visited[idx] = true;

            while let Some((x, y)) = stack.pop() {
                area += 1;
                min_x = min_x.min(x);
                min_y = min_y.min(y);
                max_x = max_x.max(x);
                max_y = max_y.max(y);

                for dy in -1i64..=1 {
                    for dx in -1i64..=1 {
                        if dx == 0 && dy == 0 {
                            continue;
                        }
                        let nx = x as i64 + dx;
                        let ny = y as i64 + dy;
                        if nx < 0 || ny < 0 || nx >= width as i64 || ny >= height as i64 {
                            continue;
                        }
                        let (nx, ny) = (nx as u32, ny as u32);
                        let nidx = ny as usize * w + nx as usize;
                        if !visited[nidx] && mask.get_pixel(nx, ny).0[0] > 0 {
                            visited[nidx] = true;
                            stack.push((nx, ny));
                        }
                    }
                }
            }

            if area <= min_area {
                continue;
            }
            let candidate = Component {
                area,
                bounds: Bounds {
                    x: min_x,
                    y: min_y,
                    width: max_x - min_x + 1,
                    height: max_y - min_y + 1,
                },
            };
            best = Some(match best {
                None => candidate,
                Some(current) => {
                    if candidate.area > current.area
                        || (candidate.area == current.area
                            && (candidate.bounds.y, candidate.bounds.x)
                                < (current.bounds.y, current.bounds.x))
                    {
                        candidate
                    } else {
                        current
                    }
                }
            });
        }
    }

    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    fn test_config() -> DetectorConfig {
        DetectorConfig {
            roi: RegionOfInterest {
                x: 10,
                y: 10,
                width: 100,
                height: 100,
            },
            reference_swap_frames: 10,
            // Disable smoothing/dilation so pixel counts are exact
            blur_sigma: 0.0,
            diff_threshold: 25,
            dilate_iterations: 0,
            min_area: 1000,
        }
    }

    fn dark_frame() -> Frame {
        Frame::new(RgbImage::from_pixel(200, 200, image::Rgb([0, 0, 0])))
    }

    /// Frame with a white block at ROI-relative (bx, by), sized bw x bh
    fn frame_with_block(bx: u32, by: u32, bw: u32, bh: u32) -> Frame {
        let mut img = RgbImage::from_pixel(200, 200, image::Rgb([0, 0, 0]));
        for y in by..by + bh {
            for x in bx..bx + bw {
                img.put_pixel(10 + x, 10 + y, image::Rgb([255, 255, 255]));
            }
        }
        Frame::new(img)
    }

    #[test]
    fn test_no_motion_on_static_scene() {
        let mut detector = MotionDetector::new(test_config());
        for _ in 0..5 {
            let detection = detector.process(&dark_frame()).expect("process");
            assert!(detection.event.is_none());
        }
    }

    #[test]
    fn test_block_above_minimum_triggers_event() {
        let mut detector = MotionDetector::new(test_config());
        detector.process(&dark_frame()).expect("seed reference");

        let detection = detector
            .process(&frame_with_block(20, 30, 40, 40))
            .expect("process");
        let event = detection.event.expect("motion event");
        assert_eq!(event.area, 1600);
        assert_eq!(event.bounds.x, 20);
        assert_eq!(event.bounds.y, 30);
        assert_eq!(event.bounds.width, 40);
        assert_eq!(event.bounds.height, 40);
    }

    #[test]
    fn test_block_below_minimum_ignored() {
        let mut detector = MotionDetector::new(test_config());
        detector.process(&dark_frame()).expect("seed reference");

        // 31x31 = 961 < 1000
        let detection = detector
            .process(&frame_with_block(5, 5, 31, 31))
            .expect("process");
        assert!(detection.event.is_none());
    }

    #[test]
    fn test_largest_component_wins() {
        let mut detector = MotionDetector::new(test_config());
        detector.process(&dark_frame()).expect("seed reference");

        let mut img = RgbImage::from_pixel(200, 200, image::Rgb([0, 0, 0]));
        // Small qualifying block top-left, larger one bottom-right
        for y in 0..35 {
            for x in 0..35 {
                img.put_pixel(10 + x, 10 + y, image::Rgb([255, 255, 255]));
            }
        }
        for y in 50..95 {
            for x in 50..95 {
                img.put_pixel(10 + x, 10 + y, image::Rgb([255, 255, 255]));
            }
        }
        let detection = detector.process(&Frame::new(img)).expect("process");
        let event = detection.event.expect("motion event");
        assert_eq!(event.area, 45 * 45);
        assert_eq!(event.bounds.x, 50);
    }

    #[test]
    fn test_equal_area_tie_breaks_topmost_leftmost() {
        let mut detector = MotionDetector::new(test_config());
        detector.process(&dark_frame()).expect("seed reference");

        let mut img = RgbImage::from_pixel(200, 200, image::Rgb([0, 0, 0]));
        // Two identical 35x35 blocks at different positions
        for y in 0..35 {
            for x in 0..35 {
                img.put_pixel(10 + 60 + x, 10 + y, image::Rgb([255, 255, 255]));
                img.put_pixel(10 + x, 10 + 60 + y, image::Rgb([255, 255, 255]));
            }
        }
        let detection = detector.process(&Frame::new(img)).expect("process");
        let event = detection.event.expect("motion event");
        // Topmost block wins (y = 0 beats y = 60)
        assert_eq!(event.bounds.y, 0);
        assert_eq!(event.bounds.x, 60);
    }

    #[test]
    fn test_reference_swaps_on_fixed_cadence() {
        let mut config = test_config();
        config.reference_swap_frames = 4;
        let mut detector = MotionDetector::new(config);

        // Reference age cycles through 0..4 regardless of motion state
        for i in 1..=12u32 {
            let frame = if i % 3 == 0 {
                frame_with_block(20, 20, 40, 40)
            } else {
                dark_frame()
            };
            detector.process(&frame).expect("process");
            assert_eq!(detector.reference_age(), i % 4);
        }
    }

    #[test]
    fn test_persistent_object_absorbed_after_swap() {
        let mut config = test_config();
        config.reference_swap_frames = 3;
        let mut detector = MotionDetector::new(config);
        detector.process(&dark_frame()).expect("seed reference");

        // A block that appears and then stays put is eventually absorbed
        // into the reference and stops registering as motion.
        let still = frame_with_block(20, 20, 40, 40);
        let mut last_event = None;
        for _ in 0..8 {
            last_event = detector.process(&still).expect("process").event;
        }
        assert!(last_event.is_none());
    }

    #[test]
    fn test_mis_sized_frame_rejected() {
        let mut detector = MotionDetector::new(test_config());
        let tiny = Frame::new(RgbImage::from_pixel(50, 50, image::Rgb([0, 0, 0])));
        assert!(matches!(
            detector.process(&tiny),
            Err(crate::error::Error::Capture(_))
        ));
    }
}
