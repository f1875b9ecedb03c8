//! Cloudinary upload and destroy calls over its signed REST API.
//!
//! Requests are signed with SHA-256, so the account must have SHA-256
//! signatures enabled.

use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use sha2::{Digest, Sha256};

use super::{AssetStore, DeleteOutcome, LocalFile, RESULT_SKIPPED};
use crate::content::ImageRef;
use crate::error::AssetError;

const DEFAULT_API_BASE: &str = "https://api.cloudinary.com/v1_1";
const DEFAULT_FOLDER: &str = "properties";
/// Incoming transformation applied to every upload.
const UPLOAD_TRANSFORMATION: &str = "q_auto:good,f_auto";

#[derive(Debug, Clone)]
pub struct CloudinaryConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
    pub folder: String,
    pub api_base: String,
}

impl CloudinaryConfig {
    /// `None` unless all three credentials are present.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Option<Self> {
        let required = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        Some(Self {
            cloud_name: required("CLOUDINARY_CLOUD_NAME")?,
            api_key: required("CLOUDINARY_API_KEY")?,
            api_secret: required("CLOUDINARY_API_SECRET")?,
            folder: required("CLOUDINARY_FOLDER").unwrap_or_else(|| DEFAULT_FOLDER.to_string()),
            api_base: required("CLOUDINARY_API_BASE")
                .unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
        })
    }
}

#[derive(Debug, Deserialize)]
struct UploadResult {
    secure_url: String,
    public_id: String,
}

#[derive(Debug, Deserialize)]
struct DestroyResult {
    result: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorMessage,
}

#[derive(Debug, Deserialize)]
struct ApiErrorMessage {
    message: String,
}

#[derive(Debug, Clone)]
pub struct CloudinaryStore {
    config: CloudinaryConfig,
    client: reqwest::Client,
}

impl CloudinaryStore {
    pub fn new(config: CloudinaryConfig, timeout: Duration) -> Result<Self, AssetError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { config, client })
    }

    fn endpoint(&self, action: &str) -> String {
        format!(
            "{}/{}/image/{}",
            self.config.api_base.trim_end_matches('/'),
            self.config.cloud_name,
            action
        )
    }

    /// Signed parameter list: the given params plus `api_key` and `signature`.
    fn signed(&self, mut params: Vec<(&'static str, String)>) -> Vec<(&'static str, String)> {
        let signature = sign(&params, &self.config.api_secret);
        params.push(("api_key", self.config.api_key.clone()));
        params.push(("signature", signature));
        params
    }

    async fn destroy(&self, public_id: &str) -> Result<String, AssetError> {
        let params = self.signed(vec![
            ("public_id", public_id.to_string()),
            ("timestamp", timestamp()),
        ]);
        let response = self
            .client
            .post(self.endpoint("destroy"))
            .form(&params)
            .send()
            .await?;
        let response = check(response).await?;
        let body: DestroyResult = response
            .json()
            .await
            .map_err(|e| AssetError::Malformed(e.to_string()))?;
        Ok(body.result)
    }
}

/// `sha256("k1=v1&k2=v2..." + secret)` over params sorted by name.
fn sign(params: &[(&'static str, String)], secret: &str) -> String {
    let mut sorted: Vec<_> = params.iter().filter(|(_, v)| !v.is_empty()).collect();
    sorted.sort_by(|a, b| a.0.cmp(b.0));
    let joined = sorted
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");

    let mut hasher = Sha256::new();
    hasher.update(joined.as_bytes());
    hasher.update(secret.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn timestamp() -> String {
    chrono::Utc::now().timestamp().to_string()
}

async fn check(response: reqwest::Response) -> Result<reqwest::Response, AssetError> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status().as_u16();
    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ApiErrorBody>(&text)
        .map(|b| b.error.message)
        .unwrap_or(text);
    Err(AssetError::Rejected { status, message })
}

#[async_trait]
impl AssetStore for CloudinaryStore {
    async fn upload(&self, file: &LocalFile) -> Result<ImageRef, AssetError> {
        let params = self.signed(vec![
            ("folder", self.config.folder.clone()),
            ("timestamp", timestamp()),
            ("transformation", UPLOAD_TRANSFORMATION.to_string()),
        ]);

        let part = Part::bytes(file.bytes.to_vec())
            .file_name(file.file_name.clone())
            .mime_str(file.mime())?;
        let form = params
            .into_iter()
            .fold(Form::new(), |form, (k, v)| form.text(k, v))
            .part("file", part);

        let response = self
            .client
            .post(self.endpoint("upload"))
            .multipart(form)
            .send()
            .await?;
        let response = check(response).await?;
        let body: UploadResult = response
            .json()
            .await
            .map_err(|e| AssetError::Malformed(e.to_string()))?;

        tracing::info!(
            file = %file.file_name,
            size = file.bytes.len(),
            public_id = %body.public_id,
            "image uploaded"
        );
        Ok(ImageRef::new(body.secure_url, body.public_id))
    }

    async fn delete(&self, images: &[ImageRef]) -> Result<Vec<DeleteOutcome>, AssetError> {
        let outcomes = images.iter().map(|image| async move {
            let Some(public_id) = image.resolved_external_id() else {
                tracing::warn!(url = %image.url, "no asset id for image, skipping");
                return DeleteOutcome::new(image, "", RESULT_SKIPPED);
            };
            let result = match self.destroy(&public_id).await {
                Ok(result) => result,
                Err(e) => {
                    tracing::error!(public_id = %public_id, error = %e, "image destroy failed");
                    format!("error: {e}")
                }
            };
            DeleteOutcome::new(image, public_id, result)
        });
        Ok(join_all(outcomes).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    fn store() -> CloudinaryStore {
        let config = CloudinaryConfig::from_lookup(lookup(&[
            ("CLOUDINARY_CLOUD_NAME", "demo"),
            ("CLOUDINARY_API_KEY", "key"),
            ("CLOUDINARY_API_SECRET", "secret"),
        ]))
        .unwrap();
        CloudinaryStore::new(config, Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_config_requires_all_credentials() {
        assert!(CloudinaryConfig::from_lookup(lookup(&[
            ("CLOUDINARY_CLOUD_NAME", "demo"),
            ("CLOUDINARY_API_KEY", "key"),
        ]))
        .is_none());

        let store = store();
        assert_eq!(store.config.folder, "properties");
        assert_eq!(
            store.endpoint("destroy"),
            "https://api.cloudinary.com/v1_1/demo/image/destroy"
        );
    }

    #[test]
    fn test_signature_sorts_params() {
        let a = sign(
            &[("timestamp", "1".to_string()), ("public_id", "x".to_string())],
            "s",
        );
        let b = sign(
            &[("public_id", "x".to_string()), ("timestamp", "1".to_string())],
            "s",
        );
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);

        let mut hasher = Sha256::new();
        hasher.update(b"public_id=x&timestamp=1s");
        assert_eq!(a, format!("{:x}", hasher.finalize()));
    }

    #[test]
    fn test_signed_params_carry_key() {
        let params = store().signed(vec![("timestamp", "1".to_string())]);
        let names: Vec<_> = params.iter().map(|(k, _)| *k).collect();
        assert_eq!(names, vec!["timestamp", "api_key", "signature"]);
    }

    #[tokio::test]
    async fn test_unaddressable_images_are_skipped() {
        let outcomes = store()
            .delete(&[ImageRef::from_url("https://elsewhere.test/a.jpg")])
            .await
            .unwrap();
        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].result, RESULT_SKIPPED);
        assert!(outcomes[0].is_success());
    }
}
