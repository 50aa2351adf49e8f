use std::time::Duration;

use anyhow::{Context, Result};
use image::ImageFormat;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;

use super::{PostingService, UploadPayload};
use crate::error::Error;

const UPLOAD_PATH: &str = "/api/uploadimages/";
const STATUS_PATH: &str = "/api/uploadstatus/";

/// Body of the upload status endpoint
#[derive(Debug, Deserialize)]
struct UploadStatus {
    /// Highest completed-post id
    data: u64,
}

/// Posting service reached over its REST API
pub struct HttpPostingService {
    client: reqwest::Client,
    base_url: String,
}

impl HttpPostingService {
    /// Create a client for the service at `base_url`; every request is bounded
    /// by `request_timeout`
    pub fn new(base_url: &str, request_timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .user_agent(concat!("photo-poster/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl PostingService for HttpPostingService {
    async fn upload(&self, payload: &UploadPayload) -> Result<()> {
        let url = self.url(UPLOAD_PATH);
        let form = build_form(payload)?;

        tracing::debug!(
            "POST {} with {} files, order {:?}",
            url,
            payload.files.len(),
            payload.image_order
        );

        let response = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .with_context(|| format!("Failed to send upload to {}", url))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .context("Failed to read upload response")?;

        if !status.is_success() {
            anyhow::bail!("upload failed with HTTP status {}: {}", status, body);
        }

        // Only the shape matters; the content is informational
        serde_json::from_str::<serde_json::Value>(&body)
            .with_context(|| format!("Upload response is not JSON: {}", body))?;

        Ok(())
    }

    async fn latest_completed_id(&self) -> Result<u64> {
        let url = self.url(STATUS_PATH);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("Failed to query upload status at {}", url))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .context("Failed to read upload status response")?;

        if !status.is_success() {
            anyhow::bail!("upload status failed with HTTP status {}: {}", status, body);
        }

        let latest = parse_status(&body)?;
        tracing::debug!("GET {} -> latest completed id {}", url, latest);
        Ok(latest)
    }
}

/// Multipart body: repeated `files`, the three metadata fields, then repeated
/// `image_order`
fn build_form(payload: &UploadPayload) -> Result<Form> {
    let mut form = Form::new();

    for file in &payload.files {
        let part = Part::bytes(file.bytes.clone())
            .file_name(file.name.clone())
            .mime_str(mime_type(&file.name))
            .with_context(|| format!("Invalid content type for {}", file.name))?;
        form = form.part("files", part);
    }

    form = form
        .text("caption", payload.caption.clone())
        .text("location", payload.location.clone())
        .text("hashtags", payload.hashtags.clone());

    for name in &payload.image_order {
        form = form.text("image_order", name.clone());
    }

    Ok(form)
}

fn mime_type(name: &str) -> &'static str {
    ImageFormat::from_path(name)
        .map(|format| format.to_mime_type())
        .unwrap_or("application/octet-stream")
}

/// Validate and extract the completed-post id from a status body
fn parse_status(body: &str) -> Result<u64, Error> {
    let status: UploadStatus = serde_json::from_str(body)
        .map_err(|e| Error::MalformedStatus(format!("{} in {:?}", e, body)))?;
    Ok(status.data)
}
