// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Cross-modal scoring endpoints: POST /similarity and POST /rank

pub mod handler;
pub mod response;

pub use handler::{rank_handler, similarity_handler};
pub use response::{RankResponse, SimilarityResponse, SIMILARITY_NOTE};
