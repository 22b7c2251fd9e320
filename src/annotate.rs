//! Frame annotation on raw RGB buffers: lane-line overlay and the heading
//! indicator drawn by the lane follower.

use crate::geometry::heading_line;
use crate::types::{Frame, LineSegment};

pub const LANE_COLOR: [u8; 3] = [0, 255, 0];
pub const HEADING_COLOR: [u8; 3] = [255, 0, 0];

const LANE_LINE_WIDTH: i32 = 4;
const HEADING_LINE_WIDTH: i32 = 2;

/// Copy of `frame` with the detected lane lines drawn on top.
pub fn draw_lane_lines(frame: &Frame, lanes: &[LineSegment]) -> Frame {
    let mut out = frame.clone();
    for lane in lanes {
        draw_segment(&mut out, lane, LANE_COLOR, LANE_LINE_WIDTH);
    }
    out
}

/// Copy of `frame` with the heading indicator for `steering_angle` drawn from
/// the bottom-center toward mid-height.
pub fn draw_heading(frame: &Frame, steering_angle: i32) -> Frame {
    let mut out = frame.clone();
    let line = heading_line(frame.width, frame.height, steering_angle);
    draw_segment(&mut out, &line, HEADING_COLOR, HEADING_LINE_WIDTH);
    out
}

/// Bresenham line with a square brush of the given width. Out-of-frame
/// coordinates are clipped per pixel, so heavily extrapolated lane lines are
/// safe to draw.
pub fn draw_segment(frame: &mut Frame, seg: &LineSegment, color: [u8; 3], width: i32) {
    let (mut x, mut y) = (seg.x1, seg.y1);
    let dx = (seg.x2 - seg.x1).abs();
    let dy = -(seg.y2 - seg.y1).abs();
    let sx = if seg.x1 < seg.x2 { 1 } else { -1 };
    let sy = if seg.y1 < seg.y2 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        stamp(frame, x, y, color, width);
        if x == seg.x2 && y == seg.y2 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
    }
}

fn stamp(frame: &mut Frame, x: i32, y: i32, color: [u8; 3], width: i32) {
    let half = width / 2;
    for py in (y - half)..=(y + half) {
        for px in (x - half)..=(x + half) {
            if px < 0 || py < 0 || px >= frame.width as i32 || py >= frame.height as i32 {
                continue;
            }
            let idx = (py as usize * frame.width + px as usize) * 3;
            frame.data[idx..idx + 3].copy_from_slice(&color);
        }
    }
}
