//! Classical lane-boundary detection.
//!
//! Pipeline per frame: crop to the bottom-half region of interest, isolate the
//! lane-marker color in HSV space, extract edges from the binary mask, detect
//! line segments with a probabilistic Hough transform, then average the
//! segment fits into at most one lane line per side.
//!
//! "No segments found" is a normal low-information outcome and comes back as
//! an empty lane-line list, never as an error.

use crate::annotate;
use crate::geometry::{make_points, segment_length};
use crate::types::{Frame, LaneConfig, LaneLine, LineSegment};
use tracing::debug;

/// Detect lane boundaries in `frame`.
///
/// Returns the detected lane lines (0, 1, or 2; left first when both are
/// present) and an annotated copy of the cropped frame. With zero lane lines
/// the cropped frame comes back without any overlay.
pub fn detect(frame: &Frame, config: &LaneConfig) -> (Vec<LaneLine>, Frame) {
    let cropped = crop_to_roi(frame);
    let mask = color_mask(&cropped, config);
    let edges = edge_map(
        &mask,
        cropped.width,
        cropped.height,
        config.edge_low_threshold,
        config.edge_high_threshold,
    );
    let segments = detect_line_segments(&edges, cropped.width, cropped.height, config);
    debug!("detected {} line segments", segments.len());

    let lane_lines = average_slope_intercept(cropped.width, cropped.height, &segments);
    debug!("aggregated into {} lane line(s)", lane_lines.len());

    if lane_lines.is_empty() {
        return (lane_lines, cropped);
    }
    let annotated = annotate::draw_lane_lines(&cropped, &lane_lines);
    (lane_lines, annotated)
}

/// Zero out everything above the vertical midline. Lane-relevant content is
/// assumed to sit in the bottom half of the frame; dimensions are unchanged.
pub fn crop_to_roi(frame: &Frame) -> Frame {
    let mut cropped = frame.clone();
    let cutoff = frame.height / 2;
    let top_bytes = cutoff * frame.width * 3;
    cropped.data[..top_bytes].fill(0);
    cropped
}

/// Convert RGB to HSV. Returns (H: 0-360, S: 0-100, V: 0-255).
#[inline]
fn rgb_to_hsv(r: f32, g: f32, b: f32) -> (f32, f32, f32) {
    let r_n = r / 255.0;
    let g_n = g / 255.0;
    let b_n = b / 255.0;

    let max = r_n.max(g_n).max(b_n);
    let min = r_n.min(g_n).min(b_n);
    let delta = max - min;

    let h = if delta < 1e-6 {
        0.0
    } else if (max - r_n).abs() < 1e-6 {
        60.0 * (((g_n - b_n) / delta) % 6.0)
    } else if (max - g_n).abs() < 1e-6 {
        60.0 * (((b_n - r_n) / delta) + 2.0)
    } else {
        60.0 * (((r_n - g_n) / delta) + 4.0)
    };
    let h = if h < 0.0 { h + 360.0 } else { h };

    let s = if max < 1e-6 {
        0.0
    } else {
        (delta / max) * 100.0
    };

    (h, s, max * 255.0)
}

/// Threshold the configured lane-marker color band. Output is one byte per
/// pixel, 255 inside the band, 0 outside.
fn color_mask(frame: &Frame, config: &LaneConfig) -> Vec<u8> {
    let mut mask = vec![0u8; frame.width * frame.height];
    for (i, px) in frame.data.chunks_exact(3).enumerate() {
        let (h, s, v) = rgb_to_hsv(px[0] as f32, px[1] as f32, px[2] as f32);
        if h >= config.hue_min
            && h <= config.hue_max
            && s >= config.sat_min
            && v >= config.val_min
        {
            mask[i] = 255;
        }
    }
    mask
}

/// Canny-style edge extraction over the binary color mask: Sobel gradients,
/// non-maximum suppression along the gradient direction, then hysteresis with
/// the configured low/high magnitude thresholds.
fn edge_map(mask: &[u8], width: usize, height: usize, low: f32, high: f32) -> Vec<u8> {
    if width < 3 || height < 3 {
        return vec![0u8; width * height];
    }

    let at = |x: usize, y: usize| -> i32 { mask[y * width + x] as i32 };

    let mut magnitude = vec![0.0f32; width * height];
    let mut sector = vec![0u8; width * height];

    for y in 1..height - 1 {
        for x in 1..width - 1 {
            let gx = -at(x - 1, y - 1) + at(x + 1, y - 1) - 2 * at(x - 1, y)
                + 2 * at(x + 1, y)
                - at(x - 1, y + 1)
                + at(x + 1, y + 1);
            let gy = -at(x - 1, y - 1) - 2 * at(x, y - 1) - at(x + 1, y - 1)
                + at(x - 1, y + 1)
                + 2 * at(x, y + 1)
                + at(x + 1, y + 1);

            let idx = y * width + x;
            magnitude[idx] = ((gx * gx + gy * gy) as f32).sqrt();

            // Quantize the gradient direction into 4 sectors for suppression.
            let angle = (gy as f32).atan2(gx as f32).to_degrees();
            let angle = if angle < 0.0 { angle + 180.0 } else { angle };
            sector[idx] = if !(22.5..157.5).contains(&angle) {
                0 // horizontal gradient, compare left/right
            } else if angle < 67.5 {
                1 // diagonal /
            } else if angle < 112.5 {
                2 // vertical gradient, compare up/down
            } else {
                3 // diagonal \
            };
        }
    }

    // Non-maximum suppression: keep only local maxima along the gradient.
    let mut strong = vec![false; width * height];
    let mut weak = vec![false; width * height];
    for y in 1..height - 1 {
        for x in 1..width - 1 {
            let idx = y * width + x;
            let m = magnitude[idx];
            if m < low {
                continue;
            }
            let (a, b) = match sector[idx] {
                0 => (magnitude[idx - 1], magnitude[idx + 1]),
                1 => (magnitude[idx - width + 1], magnitude[idx + width - 1]),
                2 => (magnitude[idx - width], magnitude[idx + width]),
                _ => (magnitude[idx - width - 1], magnitude[idx + width + 1]),
            };
            if m >= a && m >= b {
                if m >= high {
                    strong[idx] = true;
                } else {
                    weak[idx] = true;
                }
            }
        }
    }

    // Hysteresis: weak edges survive only when connected to a strong edge.
    let mut edges = vec![0u8; width * height];
    let mut stack: Vec<usize> = strong
        .iter()
        .enumerate()
        .filter(|(_, &s)| s)
        .map(|(i, _)| i)
        .collect();
    for &idx in &stack {
        edges[idx] = 255;
    }
    while let Some(idx) = stack.pop() {
        let x = idx % width;
        let y = idx / width;
        for ny in y.saturating_sub(1)..=(y + 1).min(height - 1) {
            for nx in x.saturating_sub(1)..=(x + 1).min(width - 1) {
                let n = ny * width + nx;
                if weak[n] && edges[n] == 0 {
                    edges[n] = 255;
                    stack.push(n);
                }
            }
        }
    }
    edges
}

/// Probabilistic Hough transform over the edge image.
///
/// Resolution is fixed at 1-pixel rho bins and 1-degree theta bins; the vote
/// threshold, minimum segment length, and maximum merged gap come from config.
/// Edge points are consumed in scan order: once a point pushes some line over
/// the vote threshold, the line is traced through the image, the covered run
/// becomes a segment (if long enough), and its pixels are removed from the
/// accumulator so they cannot support a second line.
fn detect_line_segments(
    edges: &[u8],
    width: usize,
    height: usize,
    config: &LaneConfig,
) -> Vec<LineSegment> {
    const NUM_THETA: usize = 180;

    let diag = ((width * width + height * height) as f64).sqrt().ceil() as i32;
    let num_rho = (2 * diag + 1) as usize;
    let trig: Vec<(f64, f64)> = (0..NUM_THETA)
        .map(|t| {
            let theta = (t as f64).to_radians();
            (theta.cos(), theta.sin())
        })
        .collect();

    let bin = |x: usize, y: usize, t: usize| -> usize {
        let rho = (x as f64 * trig[t].0 + y as f64 * trig[t].1).round() as i32;
        t * num_rho + (rho + diag) as usize
    };

    let mut accumulator = vec![0i32; NUM_THETA * num_rho];
    let mut remaining: Vec<bool> = edges.iter().map(|&e| e != 0).collect();
    let mut voted = vec![false; width * height];
    let mut segments = Vec::new();

    for y in 0..height {
        for x in 0..width {
            let idx = y * width + x;
            if !remaining[idx] {
                continue;
            }

            let mut best_theta = 0usize;
            let mut best_votes = 0i32;
            for t in 0..NUM_THETA {
                let b = bin(x, y, t);
                accumulator[b] += 1;
                if accumulator[b] > best_votes {
                    best_votes = accumulator[b];
                    best_theta = t;
                }
            }
            voted[idx] = true;

            if best_votes < config.hough_threshold as i32 {
                continue;
            }

            // Trace the winning line through this point. The direction along
            // the line for normal angle theta is (-sin, cos).
            let (cos_t, sin_t) = trig[best_theta];
            let (dx, dy) = (-sin_t, cos_t);
            let run = trace_run(&remaining, width, height, x, y, dx, dy, config.max_line_gap);

            // Consume the run's pixels either way; short runs are noise and
            // must not keep re-triggering the same accumulator cell.
            for &(px, py) in &run {
                let p = py * width + px;
                if remaining[p] {
                    remaining[p] = false;
                    if voted[p] {
                        for t in 0..NUM_THETA {
                            accumulator[bin(px, py, t)] -= 1;
                        }
                    }
                }
            }

            if let (Some(&(sx, sy)), Some(&(ex, ey))) = (run.first(), run.last()) {
                let seg = LineSegment::new(sx as i32, sy as i32, ex as i32, ey as i32);
                if segment_length(&seg) >= config.min_line_length as f64 {
                    debug!(
                        "line segment {:?} of length {:.1}",
                        seg,
                        segment_length(&seg)
                    );
                    segments.push(seg);
                }
            }
        }
    }

    segments
}

/// Walk along a line through (x, y) in both directions, collecting edge pixels
/// until the gap between hits exceeds `max_gap`. Returned pixels are ordered
/// from one end of the run to the other.
fn trace_run(
    remaining: &[bool],
    width: usize,
    height: usize,
    x: usize,
    y: usize,
    dx: f64,
    dy: f64,
    max_gap: u32,
) -> Vec<(usize, usize)> {
    // Normal direction, for tolerating 1px of jitter across the line.
    let (nx, ny) = (dy.round() as i32, (-dx).round() as i32);

    let hit_near = |px: i32, py: i32| -> Option<(usize, usize)> {
        for (cx, cy) in [(px, py), (px + nx, py + ny), (px - nx, py - ny)] {
            if cx >= 0 && cy >= 0 && (cx as usize) < width && (cy as usize) < height {
                if remaining[cy as usize * width + cx as usize] {
                    return Some((cx as usize, cy as usize));
                }
            }
        }
        None
    };

    let mut backward: Vec<(usize, usize)> = Vec::new();
    let mut forward: Vec<(usize, usize)> = Vec::new();

    for (sign, out) in [(-1.0f64, &mut backward), (1.0f64, &mut forward)] {
        // Step 0 (the seed pixel itself) only belongs to the forward pass.
        let mut step = if sign > 0.0 { 0i64 } else { 1i64 };
        let mut gap = 0u32;
        loop {
            let px = (x as f64 + sign * dx * step as f64).round() as i32;
            let py = (y as f64 + sign * dy * step as f64).round() as i32;
            if px < 0 || py < 0 || px >= width as i32 || py >= height as i32 {
                break;
            }
            match hit_near(px, py) {
                Some(hit) => {
                    if out.last() != Some(&hit) {
                        out.push(hit);
                    }
                    gap = 0;
                }
                None => {
                    gap += 1;
                    if gap > max_gap {
                        break;
                    }
                }
            }
            step += 1;
        }
    }

    backward.reverse();
    backward.extend(forward);
    backward
}

/// Combine line segments into at most one lane line per side.
///
/// Segments are split by slope sign: negative slope with both endpoints on the
/// left 2/3 of the frame feeds the left lane, non-negative slope with both
/// endpoints on the right 2/3 feeds the right lane. Each side's (slope,
/// intercept) fits are averaged into a single line. Vertical segments
/// (x1 == x2, undefined slope) are skipped outright.
fn average_slope_intercept(
    width: usize,
    height: usize,
    segments: &[LineSegment],
) -> Vec<LaneLine> {
    let mut left_fits: Vec<(f64, f64)> = Vec::new();
    let mut right_fits: Vec<(f64, f64)> = Vec::new();

    let boundary = 1.0 / 3.0;
    let left_region_boundary = width as f64 * (1.0 - boundary);
    let right_region_boundary = width as f64 * boundary;

    for seg in segments {
        if seg.x1 == seg.x2 {
            debug!("skipping vertical line segment (slope=inf): {:?}", seg);
            continue;
        }
        let slope = (seg.y2 - seg.y1) as f64 / (seg.x2 - seg.x1) as f64;
        let intercept = seg.y1 as f64 - slope * seg.x1 as f64;
        if slope < 0.0 {
            if (seg.x1 as f64) < left_region_boundary && (seg.x2 as f64) < left_region_boundary {
                left_fits.push((slope, intercept));
            }
        } else if (seg.x1 as f64) > right_region_boundary
            && (seg.x2 as f64) > right_region_boundary
        {
            right_fits.push((slope, intercept));
        }
    }

    let mut lane_lines = Vec::new();
    if let Some((slope, intercept)) = average_fit(&left_fits) {
        lane_lines.push(make_points(width, height, slope, intercept));
    }
    if let Some((slope, intercept)) = average_fit(&right_fits) {
        lane_lines.push(make_points(width, height, slope, intercept));
    }
    lane_lines
}

fn average_fit(fits: &[(f64, f64)]) -> Option<(f64, f64)> {
    if fits.is_empty() {
        return None;
    }
    let n = fits.len() as f64;
    let slope = fits.iter().map(|f| f.0).sum::<f64>() / n;
    let intercept = fits.iter().map(|f| f.1).sum::<f64>() / n;
    Some((slope, intercept))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::LaneConfig;

    fn test_config() -> LaneConfig {
        LaneConfig {
            hue_min: 60.0,
            hue_max: 300.0,
            sat_min: 15.0,
            val_min: 0.0,
            edge_low_threshold: 200.0,
            edge_high_threshold: 400.0,
            hough_threshold: 10,
            min_line_length: 8,
            max_line_gap: 4,
        }
    }

    fn set_pixel(frame: &mut Frame, x: usize, y: usize, rgb: [u8; 3]) {
        let idx = (y * frame.width + x) * 3;
        frame.data[idx..idx + 3].copy_from_slice(&rgb);
    }

    #[test]
    fn test_rgb_to_hsv_known_colors() {
        let (h, s, v) = rgb_to_hsv(0.0, 0.0, 255.0); // pure blue
        assert!((h - 240.0).abs() < 0.5);
        assert!((s - 100.0).abs() < 0.5);
        assert!((v - 255.0).abs() < 0.5);

        let (_, s, v) = rgb_to_hsv(255.0, 255.0, 255.0); // white
        assert!(s < 0.5);
        assert!((v - 255.0).abs() < 0.5);

        let (h, _, _) = rgb_to_hsv(255.0, 0.0, 0.0); // red
        assert!(h < 0.5 || h > 359.5);
    }

    #[test]
    fn test_crop_zeroes_top_half_only() {
        let mut frame = Frame::new(8, 8, 0.0);
        frame.data.fill(200);
        let cropped = crop_to_roi(&frame);
        assert_eq!(cropped.width, 8);
        assert_eq!(cropped.height, 8);
        assert!(cropped.data[..8 * 4 * 3].iter().all(|&b| b == 0));
        assert!(cropped.data[8 * 4 * 3..].iter().all(|&b| b == 200));
    }

    #[test]
    fn test_color_mask_selects_band() {
        let mut frame = Frame::new(4, 1, 0.0);
        set_pixel(&mut frame, 0, 0, [0, 0, 255]); // blue, in band
        set_pixel(&mut frame, 1, 0, [255, 0, 0]); // red, out of band
        set_pixel(&mut frame, 2, 0, [0, 255, 0]); // green, in band
        set_pixel(&mut frame, 3, 0, [0, 0, 0]); // black, zero saturation
        let mask = color_mask(&frame, &test_config());
        assert_eq!(mask, vec![255, 0, 255, 0]);
    }

    #[test]
    fn test_edge_map_marks_mask_boundary() {
        // Left half set, right half clear: edges at the vertical boundary.
        let width = 16;
        let height = 16;
        let mut mask = vec![0u8; width * height];
        for y in 0..height {
            for x in 0..8 {
                mask[y * width + x] = 255;
            }
        }
        let edges = edge_map(&mask, width, height, 200.0, 400.0);
        let boundary_hits: usize = (1..height - 1)
            .filter(|&y| (6..10).any(|x| edges[y * width + x] != 0))
            .count();
        assert!(boundary_hits >= height - 4);
        // Deep inside either half there is no gradient.
        assert_eq!(edges[8 * width + 2], 0);
        assert_eq!(edges[8 * width + 13], 0);
    }

    #[test]
    fn test_hough_finds_vertical_line() {
        let width = 64;
        let height = 64;
        let mut edges = vec![0u8; width * height];
        for y in 10..50 {
            edges[y * width + 30] = 255;
        }
        let segments = detect_line_segments(&edges, width, height, &test_config());
        assert_eq!(segments.len(), 1);
        let seg = segments[0];
        assert_eq!(seg.x1, 30);
        assert_eq!(seg.x2, 30);
        assert!(segment_length(&seg) >= 35.0);
    }

    #[test]
    fn test_hough_finds_diagonal_line() {
        let width = 64;
        let height = 64;
        let mut edges = vec![0u8; width * height];
        for i in 5..55 {
            edges[i * width + i] = 255;
        }
        let segments = detect_line_segments(&edges, width, height, &test_config());
        assert!(!segments.is_empty());
        let longest = segments
            .iter()
            .max_by(|a, b| segment_length(a).partial_cmp(&segment_length(b)).unwrap())
            .unwrap();
        assert!(segment_length(longest) >= 40.0);
        let slope = (longest.y2 - longest.y1) as f64 / (longest.x2 - longest.x1) as f64;
        assert!((slope - 1.0).abs() < 0.2);
    }

    #[test]
    fn test_hough_respects_min_length() {
        let width = 64;
        let height = 64;
        let mut edges = vec![0u8; width * height];
        // 5 pixels is under both the vote threshold and the minimum length.
        for y in 10..15 {
            edges[y * width + 30] = 255;
        }
        let segments = detect_line_segments(&edges, width, height, &test_config());
        assert!(segments.is_empty());
    }

    #[test]
    fn test_aggregation_skips_vertical_segments() {
        let segments = vec![LineSegment::new(100, 400, 100, 300)];
        let lanes = average_slope_intercept(640, 480, &segments);
        assert!(lanes.is_empty());
    }

    #[test]
    fn test_aggregation_orders_left_then_right() {
        // Left boundary leaning right (negative slope in image coordinates:
        // y decreases as x increases), right boundary the mirror image.
        let segments = vec![
            LineSegment::new(100, 450, 200, 300),
            LineSegment::new(540, 450, 440, 300),
        ];
        let lanes = average_slope_intercept(640, 480, &segments);
        assert_eq!(lanes.len(), 2);
        // Index 0 is the negative-slope (left) line.
        let slope0 = (lanes[0].y2 - lanes[0].y1) as f64 / (lanes[0].x2 - lanes[0].x1) as f64;
        let slope1 = (lanes[1].y2 - lanes[1].y1) as f64 / (lanes[1].x2 - lanes[1].x1) as f64;
        assert!(slope0 < 0.0);
        assert!(slope1 > 0.0);
        assert_eq!(lanes[0].y1, 480);
        assert_eq!(lanes[0].y2, 240);
    }

    #[test]
    fn test_aggregation_region_filter() {
        // A negative-slope segment sitting on the far right must not feed the
        // left lane average.
        let segments = vec![LineSegment::new(600, 450, 630, 420)];
        let lanes = average_slope_intercept(640, 480, &segments);
        assert!(lanes.is_empty());
    }

    #[test]
    fn test_detect_empty_frame_returns_no_lanes() {
        let frame = Frame::new(64, 64, 0.0);
        let config = test_config();
        let (lanes, annotated) = detect(&frame, &config);
        assert!(lanes.is_empty());
        // The annotated frame is the cropped frame, untouched.
        assert_eq!(annotated.data, crop_to_roi(&frame).data);
    }

    #[test]
    fn test_detect_synthetic_road() {
        // Paint two thick blue lane markers converging toward mid-frame.
        let width = 128;
        let height = 128;
        let mut frame = Frame::new(width, height, 0.0);
        for step in 0..60 {
            let y = height - 1 - step;
            let left_x = 20 + step / 2;
            let right_x = width - 20 - step / 2;
            for t in 0..4 {
                set_pixel(&mut frame, left_x + t, y, [0, 0, 255]);
                set_pixel(&mut frame, right_x - t, y, [0, 0, 255]);
            }
        }
        let (lanes, _) = detect(&frame, &test_config());
        assert_eq!(lanes.len(), 2, "expected both lane lines, got {:?}", lanes);
        let slope0 = (lanes[0].y2 - lanes[0].y1) as f64 / (lanes[0].x2 - lanes[0].x1) as f64;
        let slope1 = (lanes[1].y2 - lanes[1].y1) as f64 / (lanes[1].x2 - lanes[1].x1) as f64;
        assert!(slope0 < 0.0, "left line should have negative slope");
        assert!(slope1 > 0.0, "right line should have positive slope");
    }
}
