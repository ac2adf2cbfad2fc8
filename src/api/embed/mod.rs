// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Embedding endpoints
//!
//! - `POST /embed/text`: JSON batch of texts
//! - `POST /embed/image`: one image as a file part or base64 field
//! - `POST /embed/images`: repeated `files` parts

pub mod handler;
pub mod request;
pub mod response;

pub use handler::{embed_image_handler, embed_images_handler, embed_text_handler};
pub use request::EmbedTextRequest;
pub use response::EmbedResponse;
