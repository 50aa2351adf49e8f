//! Photo staging area
//!
//! Holds the ordered batch of photos waiting to be posted. A new batch
//! replaces the previous one wholesale; reordering produces a fresh sequence
//! so snapshots handed out earlier never change underneath their readers.

mod preview;
mod raw_file;

use std::{collections::HashSet, sync::Arc};

pub use preview::Preview;
pub use raw_file::RawFile;

use crate::error::Error;

/// Upper bound on photos in one post
pub const MAX_STAGED_PHOTOS: usize = 10;

/// Every staged photo is laid out at this height; width follows the aspect
pub const DISPLAY_HEIGHT: u32 = 4;

/// Display aspect (width, height) when the image size is unknown
const DEFAULT_ASPECT: (u32, u32) = (3, 4);

/// A photo accepted into the staging area
#[derive(Debug, Clone)]
pub struct StagedPhoto {
    /// Original file name, used to reconstruct ordering server-side
    pub name: String,
    pub preview: Arc<Preview>,
    pub display_width: u32,
    pub display_height: u32,
    /// Position in the display order, always `0..len`
    pub ordinal: usize,
    bytes: Arc<Vec<u8>>,
}

impl StagedPhoto {
    /// Raw file content as it will be uploaded
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// Ordered collection of staged photos
#[derive(Debug, Default)]
pub struct PhotoStage {
    photos: Arc<Vec<StagedPhoto>>,
}

impl PhotoStage {
    /// Replace the staged collection with a new batch.
    ///
    /// The batch is validated as a whole before anything is acquired: it is
    /// rejected (never truncated) when it exceeds [`MAX_STAGED_PHOTOS`],
    /// holds a non-JPEG/PNG file, or repeats a file name. On rejection the
    /// previous collection is left untouched.
    pub fn stage_files(&mut self, batch: Vec<RawFile>) -> Result<(), Error> {
        validate_batch(&batch)?;

        let photos = batch
            .into_iter()
            .enumerate()
            .map(|(ordinal, raw)| {
                let preview = Preview::create(&raw.name, &raw.bytes)?;
                let (display_width, display_height) = display_aspect(raw.dimensions);
                Ok(StagedPhoto {
                    name: raw.name,
                    preview: Arc::new(preview),
                    display_width,
                    display_height,
                    ordinal,
                    bytes: Arc::new(raw.bytes),
                })
            })
            .collect::<Result<Vec<_>, Error>>()?;

        tracing::info!(
            "staged {} photos (replacing {})",
            photos.len(),
            self.photos.len()
        );

        // Dropping the old sequence releases its previews unless a snapshot
        // still holds them
        self.photos = Arc::new(photos);
        Ok(())
    }

    /// Move the photo at `old_index` to `new_index`, shifting the photos in
    /// between, and renumber ordinals.
    pub fn reorder(&mut self, old_index: usize, new_index: usize) -> Result<(), Error> {
        let len = self.photos.len();
        for index in [old_index, new_index] {
            if index >= len {
                return Err(Error::IndexOutOfRange { index, len });
            }
        }

        let mut photos = self.photos.as_ref().clone();
        let photo = photos.remove(old_index);
        photos.insert(new_index, photo);
        for (ordinal, photo) in photos.iter_mut().enumerate() {
            photo.ordinal = ordinal;
        }

        tracing::debug!("moved photo {} -> {}", old_index, new_index);
        self.photos = Arc::new(photos);
        Ok(())
    }

    /// Consistent view of the current order
    pub fn snapshot(&self) -> Arc<Vec<StagedPhoto>> {
        Arc::clone(&self.photos)
    }

    /// Photo identities in display order
    pub fn image_order(&self) -> Vec<String> {
        self.photos.iter().map(|photo| photo.name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.photos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.photos.is_empty()
    }
}

fn validate_batch(batch: &[RawFile]) -> Result<(), Error> {
    if batch.len() > MAX_STAGED_PHOTOS {
        return Err(Error::TooManyFiles {
            attempted: batch.len(),
            max: MAX_STAGED_PHOTOS,
        });
    }

    let mut seen = HashSet::new();
    for raw in batch {
        if raw.format().is_none() {
            return Err(Error::UnsupportedFile(raw.name.clone()));
        }
        if !seen.insert(raw.name.as_str()) {
            return Err(Error::DuplicateName(raw.name.clone()));
        }
    }

    Ok(())
}

/// Display (width, height) at a fixed height, keeping the image's aspect
fn display_aspect(dimensions: Option<(u32, u32)>) -> (u32, u32) {
    match dimensions {
        Some((width, height)) if width > 0 && height > 0 => {
            let scaled = (DISPLAY_HEIGHT as f64 * width as f64 / height as f64).round() as u32;
            (scaled.max(1), DISPLAY_HEIGHT)
        }
        _ => DEFAULT_ASPECT,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(name: &str) -> RawFile {
        RawFile::new(name, format!("content of {}", name).into_bytes())
    }

    fn batch(count: usize) -> Vec<RawFile> {
        (0..count).map(|i| raw(&format!("photo{}.jpg", i))).collect()
    }

    fn names(stage: &PhotoStage) -> Vec<String> {
        stage.image_order()
    }

    #[test]
    fn test_stage_assigns_ordinals_and_default_aspect() {
        let mut stage = PhotoStage::default();
        stage.stage_files(vec![raw("a.jpg"), raw("b.jpg")]).unwrap();

        let photos = stage.snapshot();
        assert_eq!(photos.len(), 2);
        assert_eq!(photos[0].name, "a.jpg");
        assert_eq!(photos[1].name, "b.jpg");
        assert_eq!(photos[0].ordinal, 0);
        assert_eq!(photos[1].ordinal, 1);
        assert_eq!((photos[0].display_width, photos[0].display_height), (3, 4));
        assert_eq!(photos[1].bytes(), b"content of b.jpg");
    }

    #[test]
    fn test_display_aspect_from_dimensions() {
        assert_eq!(display_aspect(Some((1080, 1350))), (3, 4));
        assert_eq!(display_aspect(Some((1920, 1080))), (7, 4));
        assert_eq!(display_aspect(Some((1000, 1000))), (4, 4));
        assert_eq!(display_aspect(Some((1, 1000))), (1, 4));
        assert_eq!(display_aspect(Some((100, 0))), (3, 4));
        assert_eq!(display_aspect(None), (3, 4));

        let mut stage = PhotoStage::default();
        stage
            .stage_files(vec![raw("wide.png").with_dimensions(1600, 800)])
            .unwrap();
        assert_eq!(stage.snapshot()[0].display_width, 8);
    }

    #[test]
    fn test_new_batch_replaces_previous() {
        let mut stage = PhotoStage::default();
        stage.stage_files(vec![raw("a.jpg"), raw("b.jpg")]).unwrap();
        stage.stage_files(vec![raw("c.jpg")]).unwrap();
        assert_eq!(names(&stage), vec!["c.jpg"]);

        stage.stage_files(Vec::new()).unwrap();
        assert!(stage.is_empty());
    }

    #[test]
    fn test_cap_is_inclusive() {
        let mut stage = PhotoStage::default();
        stage.stage_files(batch(MAX_STAGED_PHOTOS)).unwrap();
        assert_eq!(stage.len(), MAX_STAGED_PHOTOS);
    }

    #[test]
    fn test_oversized_batch_rejected_whole() {
        let mut stage = PhotoStage::default();
        let result = stage.stage_files(batch(11));
        assert!(matches!(
            result,
            Err(Error::TooManyFiles {
                attempted: 11,
                max: 10
            })
        ));
        assert!(stage.is_empty());

        stage.stage_files(vec![raw("a.jpg"), raw("b.jpg")]).unwrap();
        assert!(stage.stage_files(batch(11)).is_err());
        assert_eq!(names(&stage), vec!["a.jpg", "b.jpg"]);
    }

    #[test]
    fn test_length_never_exceeds_cap() {
        let mut stage = PhotoStage::default();
        for count in [3, 12, 10, 0, 11, 7, 25, 1] {
            let _ = stage.stage_files(batch(count));
            assert!(stage.len() <= MAX_STAGED_PHOTOS);
        }
        assert_eq!(stage.len(), 1);
    }

    #[test]
    fn test_unsupported_file_rejects_batch() {
        let mut stage = PhotoStage::default();
        stage.stage_files(vec![raw("keep.png")]).unwrap();

        let result = stage.stage_files(vec![raw("a.jpg"), raw("notes.txt")]);
        assert!(matches!(result, Err(Error::UnsupportedFile(name)) if name == "notes.txt"));
        assert_eq!(names(&stage), vec!["keep.png"]);
    }

    #[test]
    fn test_duplicate_names_reject_batch() {
        let mut stage = PhotoStage::default();
        let result = stage.stage_files(vec![raw("a.jpg"), raw("b.jpg"), raw("a.jpg")]);
        assert!(matches!(result, Err(Error::DuplicateName(name)) if name == "a.jpg"));
        assert!(stage.is_empty());
    }

    #[test]
    fn test_reorder_moves_one_element() {
        let mut stage = PhotoStage::default();
        stage
            .stage_files(vec![raw("a.jpg"), raw("b.jpg"), raw("c.jpg"), raw("d.jpg")])
            .unwrap();

        stage.reorder(3, 1).unwrap();
        assert_eq!(names(&stage), vec!["a.jpg", "d.jpg", "b.jpg", "c.jpg"]);

        stage.reorder(0, 3).unwrap();
        assert_eq!(names(&stage), vec!["d.jpg", "b.jpg", "c.jpg", "a.jpg"]);

        stage.reorder(2, 2).unwrap();
        assert_eq!(names(&stage), vec!["d.jpg", "b.jpg", "c.jpg", "a.jpg"]);
    }

    #[test]
    fn test_reorder_all_pairs_is_permutation() {
        let original: Vec<String> = (0..5).map(|i| format!("photo{}.jpg", i)).collect();

        for old_index in 0..original.len() {
            for new_index in 0..original.len() {
                let mut stage = PhotoStage::default();
                stage.stage_files(batch(5)).unwrap();
                stage.reorder(old_index, new_index).unwrap();

                let mut expected = original.clone();
                let moved = expected.remove(old_index);
                expected.insert(new_index, moved);
                assert_eq!(names(&stage), expected);

                let ordinals: Vec<usize> = stage.snapshot().iter().map(|p| p.ordinal).collect();
                assert_eq!(ordinals, (0..5).collect::<Vec<_>>());
            }
        }
    }

    #[test]
    fn test_reorder_out_of_range() {
        let mut stage = PhotoStage::default();
        stage.stage_files(vec![raw("a.jpg"), raw("b.jpg")]).unwrap();

        assert!(matches!(
            stage.reorder(2, 0),
            Err(Error::IndexOutOfRange { index: 2, len: 2 })
        ));
        assert!(matches!(
            stage.reorder(0, 5),
            Err(Error::IndexOutOfRange { index: 5, len: 2 })
        ));
        assert_eq!(names(&stage), vec!["a.jpg", "b.jpg"]);

        let mut empty = PhotoStage::default();
        assert!(empty.reorder(0, 0).is_err());
    }

    #[test]
    fn test_snapshot_is_stable_across_reorder() {
        let mut stage = PhotoStage::default();
        stage.stage_files(vec![raw("a.jpg"), raw("b.jpg")]).unwrap();

        let before = stage.snapshot();
        stage.reorder(1, 0).unwrap();

        assert_eq!(before[0].name, "a.jpg");
        assert_eq!(before[0].ordinal, 0);
        assert_eq!(stage.snapshot()[0].name, "b.jpg");
    }

    #[test]
    fn test_previews_released_when_superseded() {
        let mut stage = PhotoStage::default();
        stage.stage_files(vec![raw("a.jpg")]).unwrap();

        let old_path = stage.snapshot()[0].preview.path_buf();
        assert!(old_path.exists());

        stage.stage_files(vec![raw("a.jpg"), raw("b.jpg")]).unwrap();
        assert!(!old_path.exists());

        let held = stage.snapshot();
        let held_path = held[1].preview.path_buf();
        // Reordering shares the same preview handles
        stage.reorder(1, 0).unwrap();
        assert!(held_path.exists());
        stage.stage_files(vec![raw("c.jpg")]).unwrap();
        assert!(held_path.exists());

        drop(held);
        assert!(!held_path.exists());

        let last_path = stage.snapshot()[0].preview.path_buf();
        drop(stage);
        assert!(!last_path.exists());
    }
}
