use std::{io::Cursor, path::Path};

use anyhow::{Context, Result};
use image::{ImageFormat, ImageReader};

/// A file handed to the staging area, before it gets a preview and an ordinal.
#[derive(Debug, Clone)]
pub struct RawFile {
    /// Original file name; doubles as the photo's identity in `image_order`
    pub name: String,
    pub bytes: Vec<u8>,
    /// Pixel dimensions (width, height), when the image header could be read
    pub dimensions: Option<(u32, u32)>,
}

impl RawFile {
    /// Wrap in-memory content, probing the image header for its dimensions
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let dimensions = probe_dimensions(&bytes);
        Self {
            name: name.into(),
            bytes,
            dimensions,
        }
    }

    /// Read a file from disk
    pub fn from_path(path: &Path) -> Result<Self> {
        let name = path
            .file_name()
            .and_then(|name| name.to_str())
            .with_context(|| format!("Invalid file name: {:?}", path))?
            .to_string();

        let bytes =
            std::fs::read(path).with_context(|| format!("Failed to read image file: {:?}", path))?;

        tracing::debug!("read {} ({} bytes) from {:?}", name, bytes.len(), path);
        Ok(Self::new(name, bytes))
    }

    #[cfg(test)]
    pub fn with_dimensions(mut self, width: u32, height: u32) -> Self {
        self.dimensions = Some((width, height));
        self
    }

    /// Image format implied by the file extension, limited to what the
    /// posting service accepts
    pub fn format(&self) -> Option<ImageFormat> {
        ImageFormat::from_path(&self.name)
            .ok()
            .filter(|format| matches!(format, ImageFormat::Jpeg | ImageFormat::Png))
    }
}

fn probe_dimensions(bytes: &[u8]) -> Option<(u32, u32)> {
    ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .ok()?
        .into_dimensions()
        .ok()
}
