//! Asset store: where uploaded images live and how they are removed.

pub mod cloudinary;
pub mod http;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::content::ImageRef;
use crate::error::AssetError;

pub use cloudinary::{CloudinaryConfig, CloudinaryStore};
pub use http::HttpAssetStore;

pub const RESULT_OK: &str = "ok";
pub const RESULT_NOT_FOUND: &str = "not found";
pub const RESULT_SKIPPED: &str = "skipped";

/// A file selected locally and not uploaded yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

impl LocalFile {
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: None,
            bytes: bytes.into(),
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn mime(&self) -> &str {
        self.content_type
            .as_deref()
            .unwrap_or("application/octet-stream")
    }
}

/// What happened to one image of a delete batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteOutcome {
    pub url: String,
    #[serde(default)]
    pub external_id: String,
    pub result: String,
}

impl DeleteOutcome {
    pub fn new(image: &ImageRef, external_id: impl Into<String>, result: impl Into<String>) -> Self {
        Self {
            url: image.url.clone(),
            external_id: external_id.into(),
            result: result.into(),
        }
    }

    /// The image is gone, was already gone, or had nothing addressable.
    pub fn is_success(&self) -> bool {
        matches!(
            self.result.as_str(),
            RESULT_OK | RESULT_NOT_FOUND | RESULT_SKIPPED
        )
    }
}

#[async_trait]
pub trait AssetStore: Send + Sync {
    async fn upload(&self, file: &LocalFile) -> Result<ImageRef, AssetError>;

    /// Best-effort delete. Transport failure of the whole batch is an error;
    /// per-image failures are reported in the outcomes.
    async fn delete(&self, images: &[ImageRef]) -> Result<Vec<DeleteOutcome>, AssetError>;
}

/// Delete `images`, failing unless every one of them succeeded.
pub async fn delete_all(
    store: &dyn AssetStore,
    images: &[ImageRef],
) -> Result<Vec<DeleteOutcome>, AssetError> {
    let outcomes = store.delete(images).await?;
    let failed = outcomes.iter().filter(|o| !o.is_success()).count();
    if failed > 0 {
        for outcome in outcomes.iter().filter(|o| !o.is_success()) {
            tracing::warn!(url = %outcome.url, result = %outcome.result, "image not deleted");
        }
        return Err(AssetError::Incomplete {
            failed,
            total: outcomes.len(),
        });
    }
    Ok(outcomes)
}

/// Used when no CDN credentials are configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAssetStore;

#[async_trait]
impl AssetStore for NoAssetStore {
    async fn upload(&self, _file: &LocalFile) -> Result<ImageRef, AssetError> {
        Err(AssetError::Unavailable)
    }

    async fn delete(&self, _images: &[ImageRef]) -> Result<Vec<DeleteOutcome>, AssetError> {
        Err(AssetError::Unavailable)
    }
}

/// Body of `POST /api/delete-image`.
///
/// `images` carries stored references; the URL fields are the legacy shape
/// whose asset ids are parsed from the URL.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteImagesRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main_image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub gallery_urls: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<ImageRef>,
}

impl DeleteImagesRequest {
    pub fn for_images(images: &[ImageRef]) -> Self {
        Self {
            images: images.to_vec(),
            ..Default::default()
        }
    }

    /// Every image named by the request, stored references first. A legacy
    /// URL already covered by a stored reference is not repeated.
    pub fn into_images(self) -> Vec<ImageRef> {
        let mut images = self.images;
        let legacy = self.main_image_url.into_iter().chain(self.gallery_urls);
        for url in legacy {
            if url.trim().is_empty() || images.iter().any(|i| i.url == url) {
                continue;
            }
            images.push(ImageRef::from_url(url));
        }
        images
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeleteImagesResponse {
    pub results: Vec<DeleteOutcome>,
}
