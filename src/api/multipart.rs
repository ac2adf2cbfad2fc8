// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Buffered multipart form handling shared by the image endpoints

use axum_extra::extract::multipart::{Multipart, MultipartRejection};
use bytes::Bytes;

use crate::api::ApiError;
use crate::embeddings::NamedImage;

/// One multipart part, fully buffered
#[derive(Debug, Clone)]
pub struct FormPart {
    pub name: String,
    pub filename: Option<String>,
    pub data: Bytes,
}

impl FormPart {
    /// A part with neither a filename nor any content (an empty file input)
    pub fn is_blank(&self) -> bool {
        self.filename.as_deref().map_or(true, str::is_empty) && self.data.is_empty()
    }
}

/// All parts of a multipart body, in arrival order
#[derive(Debug, Clone, Default)]
pub struct MultipartForm {
    parts: Vec<FormPart>,
}

impl MultipartForm {
    pub async fn from_request(
        multipart: Result<Multipart, MultipartRejection>,
    ) -> Result<Self, ApiError> {
        let mut multipart = multipart.map_err(|e| {
            ApiError::rejection(
                e.status(),
                ApiError::InvalidRequest(format!("Expected multipart form data: {}", e)),
            )
        })?;

        let mut parts = Vec::new();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| {
                ApiError::rejection(
                    e.status(),
                    ApiError::InvalidRequest(format!("Invalid multipart body: {}", e)),
                )
            })?
        {
            let name = field.name().unwrap_or_default().to_string();
            let filename = field.file_name().map(str::to_string);
            let data = field.bytes().await.map_err(|e| {
                ApiError::rejection(
                    e.status(),
                    ApiError::InvalidRequest(format!("Failed to read form field '{}': {}", name, e)),
                )
            })?;
            parts.push(FormPart {
                name,
                filename,
                data,
            });
        }

        Ok(Self { parts })
    }

    pub fn from_parts(parts: Vec<FormPart>) -> Self {
        Self { parts }
    }

    /// First non-blank part with the given name
    pub fn part(&self, name: &str) -> Option<&FormPart> {
        self.parts
            .iter()
            .find(|p| p.name == name && !p.is_blank())
    }

    /// First part with the given name, as UTF-8 text
    pub fn text(&self, name: &str) -> Result<Option<String>, ApiError> {
        match self.parts.iter().find(|p| p.name == name) {
            None => Ok(None),
            Some(part) => String::from_utf8(part.data.to_vec())
                .map(Some)
                .map_err(|_| ApiError::validation(name, format!("{} must be valid UTF-8 text", name))),
        }
    }

    /// Boolean form field, `default` when absent
    pub fn flag(&self, name: &str, default: bool) -> Result<bool, ApiError> {
        match self.text(name)? {
            None => Ok(default),
            Some(value) => parse_bool(&value).ok_or_else(|| {
                ApiError::validation(
                    name,
                    format!("{} must be a boolean, got '{}'", name, value.trim()),
                )
            }),
        }
    }

    /// All non-blank parts with the given name as images
    ///
    /// Parts without a filename are reported as `image_<index>`.
    pub fn images(&self, name: &str) -> Vec<NamedImage> {
        self.parts
            .iter()
            .filter(|p| p.name == name && !p.is_blank())
            .enumerate()
            .map(|(index, part)| {
                let filename = match part.filename.as_deref() {
                    Some(f) if !f.is_empty() => f.to_string(),
                    _ => format!("image_{}", index),
                };
                NamedImage::new(filename, part.data.clone())
            })
            .collect()
    }
}

/// Parses `true/false/1/0/yes/no/on/off`, case-insensitive
pub fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}
