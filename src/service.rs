//! Seam between the post workflow and the remote posting service

#[cfg(test)]
pub mod fake;
mod http;

use std::future::Future;

use anyhow::Result;

pub use http::HttpPostingService;

/// One file part of an upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

/// Everything the posting service needs to create one post
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadPayload {
    /// Files in display order
    pub files: Vec<UploadFile>,
    pub caption: String,
    pub location: String,
    pub hashtags: String,
    /// File names in display order, so the service can rebuild the ordering
    pub image_order: Vec<String>,
}

/// Remote service that accepts posts and reports the latest completed one
pub trait PostingService: Send + Sync + 'static {
    /// Upload files and metadata for a new post
    fn upload(&self, payload: &UploadPayload) -> impl Future<Output = Result<()>> + Send;

    /// Highest completed-post id known to the service
    fn latest_completed_id(&self) -> impl Future<Output = Result<u64>> + Send;
}
