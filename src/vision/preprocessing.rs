// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Image preprocessing for the SigLIP2 vision tower
//!
//! Two input layouts are supported:
//! - fixed resolution: bilinear resize to a square, NCHW `pixel_values`
//! - NaFlex: aspect-preserving resize to a patch grid, padded patch sequence
//!   plus `pixel_attention_mask` and `spatial_shapes`

use image::{imageops::FilterType, RgbImage};
use ndarray::{Array2, Array3, Array4};

/// SigLIP normalization mean values
pub const SIGLIP_MEAN: [f32; 3] = [0.5, 0.5, 0.5];

/// SigLIP normalization std values
pub const SIGLIP_STD: [f32; 3] = [0.5, 0.5, 0.5];

/// Per-channel normalization: (pixel / 255 - mean) / std
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Normalization {
    pub mean: [f32; 3],
    pub std: [f32; 3],
}

impl Default for Normalization {
    fn default() -> Self {
        Self {
            mean: SIGLIP_MEAN,
            std: SIGLIP_STD,
        }
    }
}

impl Normalization {
    #[inline]
    fn apply(&self, value: u8, channel: usize) -> f32 {
        (value as f32 / 255.0 - self.mean[channel]) / self.std[channel]
    }
}

/// NaFlex tower inputs for a batch
#[derive(Debug, Clone)]
pub struct NaflexBatch {
    /// [batch, max_num_patches, patch * patch * 3]
    pub pixel_values: Array3<f32>,
    /// [batch, max_num_patches], 1 for real patches
    pub pixel_attention_mask: Array2<i64>,
    /// [batch, 2] patch grid (rows, cols)
    pub spatial_shapes: Array2<i64>,
}

/// Builds the NCHW tensor [batch, 3, size, size] for fixed-resolution towers
pub fn fixed_resolution_batch(
    images: &[RgbImage],
    size: u32,
    norm: &Normalization,
) -> Array4<f32> {
    let side = size as usize;
    let mut tensor = Array4::zeros((images.len(), 3, side, side));

    for (b, image) in images.iter().enumerate() {
        let resized = image::imageops::resize(image, size, size, FilterType::Triangle);
        for (x, y, pixel) in resized.enumerate_pixels() {
            for c in 0..3 {
                tensor[[b, c, y as usize, x as usize]] = norm.apply(pixel[c], c);
            }
        }
    }

    tensor
}

/// Target (height, width) for a NaFlex image
///
/// Finds the largest scale at which the patch-aligned image still fits in
/// `max_num_patches`, by bisection over the scale factor.
pub fn naflex_target_size(
    height: u32,
    width: u32,
    patch_size: u32,
    max_num_patches: usize,
) -> (u32, u32) {
    const EPS: f64 = 1e-5;

    let scaled = |scale: f64, size: u32| -> u32 {
        let p = patch_size as f64;
        let s = ((size as f64 * scale) / p).ceil() * p;
        s.max(p) as u32
    };

    let mut scale_min = EPS / 10.0;
    let mut scale_max = 100.0;
    while scale_max - scale_min >= EPS {
        let scale = (scale_min + scale_max) / 2.0;
        let h = scaled(scale, height);
        let w = scaled(scale, width);
        let patches = (h / patch_size) as usize * (w / patch_size) as usize;
        if patches <= max_num_patches {
            scale_min = scale;
        } else {
            scale_max = scale;
        }
    }

    (scaled(scale_min, height), scaled(scale_min, width))
}

/// Builds padded NaFlex patch sequences for a batch
pub fn naflex_batch(
    images: &[RgbImage],
    patch_size: u32,
    max_num_patches: usize,
    norm: &Normalization,
) -> NaflexBatch {
    let p = patch_size as usize;
    let patch_dim = p * p * 3;

    let mut pixel_values = Array3::zeros((images.len(), max_num_patches, patch_dim));
    let mut pixel_attention_mask = Array2::zeros((images.len(), max_num_patches));
    let mut spatial_shapes = Array2::zeros((images.len(), 2));

    for (b, image) in images.iter().enumerate() {
        let (th, tw) = naflex_target_size(image.height(), image.width(), patch_size, max_num_patches);
        let resized = image::imageops::resize(image, tw, th, FilterType::Triangle);

        let rows = th as usize / p;
        let cols = tw as usize / p;
        spatial_shapes[[b, 0]] = rows as i64;
        spatial_shapes[[b, 1]] = cols as i64;

        // Patch vectors are laid out row-major within the patch, channel last
        for row in 0..rows {
            for col in 0..cols {
                let patch = row * cols + col;
                pixel_attention_mask[[b, patch]] = 1;
                for dy in 0..p {
                    for dx in 0..p {
                        let pixel =
                            resized.get_pixel((col * p + dx) as u32, (row * p + dy) as u32);
                        for c in 0..3 {
                            pixel_values[[b, patch, (dy * p + dx) * 3 + c]] =
                                norm.apply(pixel[c], c);
                        }
                    }
                }
            }
        }
    }

    NaflexBatch {
        pixel_values,
        pixel_attention_mask,
        spatial_shapes,
    }
}
