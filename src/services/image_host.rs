//! Image host client
//!
//! Uploads images through an unsigned upload preset and returns the public URL
//! the host assigns. The image content is never inspected.

use std::time::Duration;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info};
use crate::config::ImageHostConfig;
use crate::utils::errors::{GoLoopError, ImageHostError, Result};

/// Subset of the upload response we rely on
#[derive(Debug, Clone, Deserialize)]
pub struct UploadResponse {
    pub secure_url: Option<String>,
    pub public_id: Option<String>,
}

/// Image to upload
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

#[derive(Clone)]
#[derive(Debug)]
pub struct ImageHostClient {
    client: Client,
    config: ImageHostConfig,
}

impl ImageHostClient {
    pub fn new(config: ImageHostConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(concat!("GoLoop/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(ImageHostError::RequestFailed)?;

        Ok(Self { client, config })
    }

    /// Upload an image and return its public URL
    pub async fn upload(&self, image: ImageUpload) -> Result<String> {
        if image.bytes.is_empty() {
            return Err(GoLoopError::InvalidInput("Image file is empty".to_string()));
        }

        let size = image.bytes.len();
        let mut part = Part::bytes(image.bytes).file_name(image.file_name.clone());
        if let Some(content_type) = &image.content_type {
            part = part
                .mime_str(content_type)
                .map_err(|_| GoLoopError::InvalidInput(format!("Invalid content type: {}", content_type)))?;
        }

        let form = Form::new()
            .part("file", part)
            .text("upload_preset", self.config.upload_preset.clone());

        debug!(file_name = %image.file_name, size, "Uploading image");

        let response = self
            .client
            .post(&self.config.upload_url)
            .multipart(form)
            .send()
            .await
            .map_err(ImageHostError::RequestFailed)?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(ImageHostError::Rejected { status, message }.into());
        }

        let body: UploadResponse = response
            .json()
            .await
            .map_err(|e| ImageHostError::InvalidResponse(e.to_string()))?;

        let url = body
            .secure_url
            .ok_or_else(|| ImageHostError::InvalidResponse("response has no secure_url".to_string()))?;

        info!(public_id = ?body.public_id, "Image uploaded");
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_response_deserialization() {
        let json = r#"{"secure_url": "https://res.example/image/upload/v1/proof.jpg", "public_id": "proof", "width": 800}"#;
        let response: UploadResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.secure_url.as_deref(), Some("https://res.example/image/upload/v1/proof.jpg"));
    }

    #[tokio::test]
    async fn test_empty_upload_is_rejected_locally() {
        let client = ImageHostClient::new(crate::config::Settings::default().image_host).unwrap();
        let result = client
            .upload(ImageUpload {
                file_name: "empty.jpg".to_string(),
                content_type: None,
                bytes: vec![],
            })
            .await;
        assert!(matches!(result, Err(GoLoopError::InvalidInput(_))));
    }
}
