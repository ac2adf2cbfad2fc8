// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! EmbeddingPipeline behavior against the deterministic backend

use crate::common::{blue_png, green_png, l2_norm, png_bytes, red_png, test_pipeline, pipeline_with, FakeBackend};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use bytes::Bytes;
use siglip_embed_server::embeddings::{EmbedError, ImageSource, NamedImage, PipelineConfig};
use std::time::Duration;

fn texts(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn test_embed_text_normalized_and_ordered() {
    let pipeline = test_pipeline();
    let input = texts(&["first", "second", "third", "fourth"]);

    let embeddings = pipeline.embed_text(input.clone(), true).await.unwrap();
    assert_eq!(embeddings.len(), input.len());
    assert!(embeddings.iter().all(|e| (l2_norm(e) - 1.0).abs() < 1e-5));

    let third = pipeline.embed_text(texts(&["third"]), true).await.unwrap();
    assert_eq!(embeddings[2], third[0]);
}

#[tokio::test]
async fn test_zero_vector_stays_zero_when_normalized() {
    let pipeline = test_pipeline();
    let black = png_bytes([0, 0, 0], 8, 8);

    let embedding = pipeline
        .embed_image(ImageSource::Bytes(Bytes::from(black)), true)
        .await
        .unwrap();
    assert!(embedding.iter().all(|v| *v == 0.0));
}

#[tokio::test]
async fn test_embed_image_sources_agree() {
    let pipeline = test_pipeline();
    let png = blue_png();

    let from_bytes = pipeline
        .embed_image(ImageSource::Bytes(Bytes::from(png.clone())), true)
        .await
        .unwrap();
    let from_base64 = pipeline
        .embed_image(
            ImageSource::Base64(format!("data:image/png;base64,{}", STANDARD.encode(&png))),
            true,
        )
        .await
        .unwrap();
    assert_eq!(from_bytes, from_base64);
}

#[tokio::test]
async fn test_decode_failure_names_image() {
    let pipeline = test_pipeline();
    let images = vec![
        NamedImage::new("ok.png", red_png()),
        NamedImage::new("notes.txt", b"plain text, not an image".to_vec()),
    ];

    let err = pipeline.embed_images(images, true).await.unwrap_err();
    match err {
        EmbedError::Decode {
            index, filename, ..
        } => {
            assert_eq!(index, Some(1));
            assert_eq!(filename.as_deref(), Some("notes.txt"));
        }
        other => panic!("expected decode error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_similarity_and_ranking() {
    let pipeline = test_pipeline();
    let images = || {
        vec![
            NamedImage::new("red.png", red_png()),
            NamedImage::new("green.png", green_png()),
            NamedImage::new("blue.png", blue_png()),
        ]
    };

    let output = pipeline
        .compute_similarity(texts(&["blue", "green"]), images())
        .await
        .unwrap();
    assert_eq!(output.similarities.len(), 2);
    assert_eq!(output.similarities[0].len(), 3);
    assert!(output.similarities[0][2] > output.similarities[0][0]);
    assert!(output.similarities[1][1] > output.similarities[1][2]);

    let ranked = pipeline
        .rank_images("green".to_string(), images())
        .await
        .unwrap();
    assert_eq!(ranked[0].filename, "green.png");
    assert_eq!(ranked[0].rank, 1);
    assert_eq!(ranked.len(), 3);
}

#[tokio::test]
async fn test_rank_requires_images() {
    let pipeline = test_pipeline();
    let err = pipeline.rank_images("red".to_string(), vec![]).await.unwrap_err();
    assert!(matches!(err, EmbedError::Validation { ref field, .. } if field == "files"));
}

#[tokio::test]
async fn test_shutdown_rejects_new_work() {
    let pipeline = test_pipeline();
    pipeline.shutdown();

    let err = pipeline.embed_text(texts(&["late"]), true).await.unwrap_err();
    assert!(matches!(err, EmbedError::ShuttingDown));
}

#[tokio::test]
async fn test_queued_request_waits_for_slot() {
    let config = PipelineConfig {
        max_batch_size: 8,
        max_concurrent_inferences: 1,
        max_queued_requests: 1,
    };
    let pipeline = pipeline_with(FakeBackend::slow(Duration::from_millis(200)), config);

    let first = {
        let pipeline = pipeline.clone();
        tokio::spawn(async move { pipeline.embed_text(texts(&["one"]), true).await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;

    // Fits in the queue, so it waits rather than failing
    let second = pipeline.embed_text(texts(&["two"]), true).await;
    assert!(second.is_ok());
    assert!(first.await.unwrap().is_ok());
}
