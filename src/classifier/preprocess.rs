use anyhow::{Context, Result, anyhow};
use fast_image_resize as fir;
use ndarray::Array4;
use rayon::prelude::*;

use crate::types::{Frame, Landmark};

pub const HANDPOSE_INPUT_SIZE: u32 = 224;
pub const NUM_LANDMARKS: usize = 21;

/// How a frame was scaled and padded into the square model input.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Letterbox {
    pub scale: f32,
    pub pad_x: f32,
    pub pad_y: f32,
    pub frame_w: u32,
    pub frame_h: u32,
}

impl Letterbox {
    pub fn for_frame(frame_w: u32, frame_h: u32, target: u32) -> Self {
        let scale = target as f32 / frame_w.max(frame_h).max(1) as f32;
        let new_w = (frame_w as f32 * scale).round().max(1.0) as u32;
        let new_h = (frame_h as f32 * scale).round().max(1.0) as u32;
        Self {
            scale,
            pad_x: target.saturating_sub(new_w) as f32 / 2.0,
            pad_y: target.saturating_sub(new_h) as f32 / 2.0,
            frame_w,
            frame_h,
        }
    }

    fn scaled_size(&self) -> (u32, u32) {
        (
            (self.frame_w as f32 * self.scale).round().max(1.0) as u32,
            (self.frame_h as f32 * self.scale).round().max(1.0) as u32,
        )
    }

    /// Maps a point in model input pixels to normalized frame coordinates.
    pub fn to_frame(&self, x: f32, y: f32) -> (f32, f32) {
        let px = (x - self.pad_x.floor()) / self.scale;
        let py = (y - self.pad_y.floor()) / self.scale;
        (
            (px / self.frame_w.max(1) as f32).clamp(0.0, 1.0),
            (py / self.frame_h.max(1) as f32).clamp(0.0, 1.0),
        )
    }
}

/// Resizes the frame into a `target`-sized square NHWC tensor with values in [0, 1].
pub fn letterbox_tensor(frame: &Frame, target: u32) -> Result<(Array4<f32>, Letterbox)> {
    let expected_len = (frame.width as usize)
        .saturating_mul(frame.height as usize)
        .saturating_mul(4);
    if frame.width == 0 || frame.height == 0 || frame.rgba.len() != expected_len {
        return Err(anyhow!(
            "frame buffer size mismatch: got {} bytes for {}x{}",
            frame.rgba.len(),
            frame.width,
            frame.height
        ));
    }

    let letterbox = Letterbox::for_frame(frame.width, frame.height, target);
    let (new_w, new_h) = letterbox.scaled_size();

    let src = fir::images::Image::from_vec_u8(
        frame.width,
        frame.height,
        frame.rgba.clone(),
        fir::PixelType::U8x4,
    )?;
    let mut dst = fir::images::Image::new(new_w, new_h, fir::PixelType::U8x4);
    let options = fir::ResizeOptions::new()
        .resize_alg(fir::ResizeAlg::Interpolation(fir::FilterType::Bilinear));
    fir::Resizer::new()
        .resize(&src, &mut dst, Some(&options))
        .context("frame resize failed")?;
    let resized = dst.into_vec();

    let side = target as usize;
    let pad_x = letterbox.pad_x as usize;
    let pad_y = letterbox.pad_y as usize;
    let row_len = new_w as usize * 4;
    let mut canvas = vec![0u8; side * side * 4];
    for (row, src_row) in resized.chunks_exact(row_len).enumerate() {
        let offset = ((pad_y + row) * side + pad_x) * 4;
        canvas[offset..offset + row_len].copy_from_slice(src_row);
    }

    let values: Vec<f32> = canvas
        .par_chunks_exact(4)
        .flat_map_iter(|px| {
            [
                px[0] as f32 / 255.0,
                px[1] as f32 / 255.0,
                px[2] as f32 / 255.0,
            ]
        })
        .collect();
    let tensor = Array4::from_shape_vec((1, side, side, 3), values)
        .map_err(|err| anyhow!("failed to shape input tensor: {err}"))?;

    Ok((tensor, letterbox))
}

/// Reads `NUM_LANDMARKS` xyz triples from a flat model output.
pub fn decode_landmarks(flat: &[f32]) -> Result<Vec<[f32; 3]>> {
    if flat.len() < NUM_LANDMARKS * 3 {
        return Err(anyhow!(
            "expected {} landmark values, got {}",
            NUM_LANDMARKS * 3,
            flat.len()
        ));
    }
    Ok(flat
        .chunks_exact(3)
        .take(NUM_LANDMARKS)
        .map(|c| [c[0], c[1], c[2]])
        .collect())
}

pub fn project_landmarks(raw: &[[f32; 3]], letterbox: &Letterbox) -> Vec<Landmark> {
    raw.iter()
        .map(|[x, y, z]| {
            let (nx, ny) = letterbox.to_frame(*x, *y);
            Landmark {
                x: nx,
                y: ny,
                z: *z / HANDPOSE_INPUT_SIZE as f32,
            }
        })
        .collect()
}

/// Wrist-relative, palm-width scaled xy features in the layout the landmark
/// classifier was trained on: `[x0, y0, x1, y1, ..., x20, y20]`.
pub fn classifier_features(raw: &[[f32; 3]]) -> Option<Vec<f32>> {
    if raw.len() != NUM_LANDMARKS {
        return None;
    }

    let wrist = raw[0];
    let rel: Vec<[f32; 2]> = raw
        .iter()
        .map(|p| [p[0] - wrist[0], p[1] - wrist[1]])
        .collect();

    let palm_width = (rel[5][0] - rel[17][0]).hypot(rel[5][1] - rel[17][1]);
    let scale = if palm_width > 1e-6 {
        palm_width
    } else {
        rel[9][0].hypot(rel[9][1])
    };
    if scale <= 1e-6 {
        return None;
    }

    Some(rel.iter().flat_map(|p| [p[0] / scale, p[1] / scale]).collect())
}
