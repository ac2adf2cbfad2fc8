// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod embed;
pub mod errors;
pub mod handlers;
pub mod http_server;
pub mod multipart;
pub mod similarity;

pub use embed::{EmbedResponse, EmbedTextRequest};
pub use errors::{ApiError, ErrorResponse};
pub use handlers::{HealthResponse, InfoResponse};
pub use http_server::{create_app, shutdown_signal, start_server, AppState};
pub use similarity::{RankResponse, SimilarityResponse};
