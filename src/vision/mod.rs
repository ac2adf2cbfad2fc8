// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Image handling for the vision tower
//!
//! This module provides:
//! - decoding of uploaded bytes and base64 payloads to RGB
//! - fixed-resolution and NaFlex tensor preprocessing

pub mod image_utils;
pub mod preprocessing;

pub use image_utils::{decode_base64_image, decode_image_bytes, detect_format, ImageError};
pub use preprocessing::{NaflexBatch, Normalization};
