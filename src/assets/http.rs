//! Asset store reached through this service's own upload endpoints, for
//! editors running outside the server process.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};

use super::{AssetStore, DeleteImagesRequest, DeleteImagesResponse, DeleteOutcome, LocalFile};
use crate::client::read_rejection;
use crate::content::ImageRef;
use crate::error::AssetError;

#[derive(Debug, Clone)]
pub struct HttpAssetStore {
    base_url: String,
    token: Option<String>,
    client: reqwest::Client,
}

impl HttpAssetStore {
    pub fn new(base_url: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
            client,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    fn post(&self, path: &str) -> reqwest::RequestBuilder {
        let request = self.client.post(format!("{}{}", self.base_url, path));
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, AssetError> {
    if response.status().is_success() {
        Ok(response)
    } else {
        let (status, message) = read_rejection(response).await;
        Err(AssetError::Rejected { status, message })
    }
}

#[async_trait]
impl AssetStore for HttpAssetStore {
    async fn upload(&self, file: &LocalFile) -> Result<ImageRef, AssetError> {
        let part = Part::bytes(file.bytes.to_vec())
            .file_name(file.file_name.clone())
            .mime_str(file.mime())?;
        let response = self
            .post("/api/upload")
            .multipart(Form::new().part("file", part))
            .send()
            .await?;
        let response = ensure_success(response).await?;
        response
            .json::<ImageRef>()
            .await
            .map_err(|e| AssetError::Malformed(e.to_string()))
    }

    async fn delete(&self, images: &[ImageRef]) -> Result<Vec<DeleteOutcome>, AssetError> {
        let response = self
            .post("/api/delete-image")
            .json(&DeleteImagesRequest::for_images(images))
            .send()
            .await?;
        let response = ensure_success(response).await?;
        let body = response
            .json::<DeleteImagesResponse>()
            .await
            .map_err(|e| AssetError::Malformed(e.to_string()))?;
        Ok(body.results)
    }
}
