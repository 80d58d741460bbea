use std::sync::Arc;

use gpui::RenderImage;
use image::{Frame as ImageFrame, ImageBuffer, Rgba, RgbaImage};

use crate::types::Frame;

const CONNECTIONS: &[(usize, usize)] = &[
    (0, 1),
    (1, 2),
    (2, 3),
    (3, 4),
    (0, 5),
    (5, 6),
    (6, 7),
    (7, 8),
    (0, 9),
    (9, 10),
    (10, 11),
    (11, 12),
    (0, 13),
    (13, 14),
    (14, 15),
    (15, 16),
    (0, 17),
    (17, 18),
    (18, 19),
    (19, 20),
    (5, 9),
    (9, 13),
    (13, 17),
];

const SKELETON_LINE_THICKNESS: i32 = 3;
const LINE_COLOR: [u8; 4] = [96, 165, 250, 255];
const POINT_COLOR: [u8; 4] = [59, 130, 246, 255];

/// Camera frame as a selfie-style (mirrored) texture with hand skeletons drawn on.
pub(super) fn frame_to_image(frame: &Frame, hands: &[Vec<(f32, f32)>]) -> Option<Arc<RenderImage>> {
    let mut rgba = frame.rgba.clone();
    for points in hands {
        draw_skeleton(&mut rgba, frame.width, frame.height, points);
    }
    let bgra = mirror_to_bgra(&rgba, frame.width);
    bgra_to_image(frame.width, frame.height, bgra)
}

pub(super) fn rgba_to_image(image: RgbaImage) -> Option<Arc<RenderImage>> {
    let (width, height) = image.dimensions();
    let mut raw = image.into_raw();
    for px in raw.chunks_exact_mut(4) {
        px.swap(0, 2);
    }
    bgra_to_image(width, height, raw)
}

fn bgra_to_image(width: u32, height: u32, bgra: Vec<u8>) -> Option<Arc<RenderImage>> {
    // GPUI takes BGRA frames directly, which skips the async asset loader.
    let buffer = ImageBuffer::<Rgba<u8>, Vec<u8>>::from_raw(width, height, bgra)?;
    Some(Arc::new(RenderImage::new(vec![ImageFrame::new(buffer)])))
}

/// Flips each row horizontally and swaps R and B.
fn mirror_to_bgra(rgba: &[u8], width: u32) -> Vec<u8> {
    let row_len = width as usize * 4;
    if row_len == 0 {
        return Vec::new();
    }
    let mut out = Vec::with_capacity(rgba.len());
    for row in rgba.chunks_exact(row_len) {
        for px in row.chunks_exact(4).rev() {
            out.extend_from_slice(&[px[2], px[1], px[0], px[3]]);
        }
    }
    out
}

fn draw_skeleton(buffer: &mut [u8], width: u32, height: u32, points: &[(f32, f32)]) {
    if points.len() < 2 {
        return;
    }

    for &(a, b) in CONNECTIONS {
        if let (Some(pa), Some(pb)) = (points.get(a), points.get(b)) {
            draw_line(buffer, width, height, *pa, *pb);
        }
    }
    for &(x, y) in points {
        draw_dot(buffer, width, height, (x as i32, y as i32), 3);
    }
}

fn draw_line(buffer: &mut [u8], width: u32, height: u32, p0: (f32, f32), p1: (f32, f32)) {
    let (mut x, mut y) = (p0.0 as i32, p0.1 as i32);
    let (x1, y1) = (p1.0 as i32, p1.1 as i32);
    let dx = (x1 - x).abs();
    let dy = -(y1 - y).abs();
    let step_x = if x < x1 { 1 } else { -1 };
    let step_y = if y < y1 { 1 } else { -1 };
    let mut err = dx + dy;
    let radius = (SKELETON_LINE_THICKNESS - 1) / 2;

    loop {
        for ox in -radius..=radius {
            for oy in -radius..=radius {
                if ox.abs() + oy.abs() <= radius {
                    put_pixel(buffer, width, height, x + ox, y + oy, LINE_COLOR);
                }
            }
        }
        if x == x1 && y == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += step_x;
        }
        if e2 <= dx {
            err += dx;
            y += step_y;
        }
    }
}

fn draw_dot(buffer: &mut [u8], width: u32, height: u32, center: (i32, i32), radius: i32) {
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            if dx * dx + dy * dy <= radius * radius {
                put_pixel(buffer, width, height, center.0 + dx, center.1 + dy, POINT_COLOR);
            }
        }
    }
}

fn put_pixel(buffer: &mut [u8], width: u32, height: u32, x: i32, y: i32, color: [u8; 4]) {
    if x < 0 || y < 0 || x as u32 >= width || y as u32 >= height {
        return;
    }
    let idx = (y as usize * width as usize + x as usize) * 4;
    if let Some(px) = buffer.get_mut(idx..idx + 4) {
        px.copy_from_slice(&color);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mirror_reverses_rows_and_swaps_channels() {
        let rgba = [
            1, 2, 3, 4, 5, 6, 7, 8, //
            9, 10, 11, 12, 13, 14, 15, 16,
        ];
        assert_eq!(
            mirror_to_bgra(&rgba, 2),
            vec![7, 6, 5, 8, 3, 2, 1, 4, 15, 14, 13, 16, 11, 10, 9, 12]
        );
    }

    #[test]
    fn skeleton_stays_inside_the_buffer() {
        let (w, h) = (16u32, 16u32);
        let mut buffer = vec![0u8; (w * h * 4) as usize];
        let points: Vec<(f32, f32)> = (0..21).map(|i| (i as f32 * 2.0 - 10.0, 8.0)).collect();
        draw_skeleton(&mut buffer, w, h, &points);
        assert_eq!(buffer.len(), (w * h * 4) as usize);
        assert!(buffer.chunks_exact(4).any(|px| px == LINE_COLOR || px == POINT_COLOR));
    }
}
