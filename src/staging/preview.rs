use std::{io::Write, path::Path};

use tempfile::NamedTempFile;

use crate::error::Error;

/// Renderable copy of a staged photo.
///
/// Backed by a temp file that is removed when the handle is dropped, so a
/// superseded batch releases its previews as soon as nothing references them.
#[derive(Debug)]
pub struct Preview {
    file: NamedTempFile,
}

impl Preview {
    pub fn create(name: &str, content: &[u8]) -> Result<Self, Error> {
        // Keep the extension so viewers can sniff the type from the path
        let suffix = Path::new(name)
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy()))
            .unwrap_or_default();

        let mut file = tempfile::Builder::new()
            .prefix("photo-poster-preview-")
            .suffix(&suffix)
            .tempfile()?;
        file.write_all(content)?;
        file.flush()?;

        Ok(Self { file })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    #[cfg(test)]
    pub fn path_buf(&self) -> std::path::PathBuf {
        self.file.path().to_path_buf()
    }
}
