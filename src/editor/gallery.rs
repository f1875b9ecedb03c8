//! Gallery bookkeeping for one edit session.
//!
//! Every image lives in exactly one ordered entry, tagged with its state, so
//! an image can never be both kept and removed.

use uuid::Uuid;

use crate::assets::LocalFile;
use crate::content::ImageRef;

/// A locally selected file plus the preview handle shown until upload.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingImage {
    pub preview: String,
    pub file: LocalFile,
}

impl PendingImage {
    pub fn new(file: LocalFile) -> Self {
        Self {
            preview: format!("blob:local/{}", Uuid::new_v4()),
            file,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum GalleryEntry {
    /// Stored image kept on the next save.
    Existing(ImageRef),
    /// Stored image dropped from the next save. The asset itself stays on
    /// the CDN until the entity is deleted.
    Removed(ImageRef),
    /// New file, uploaded on submit.
    Pending(PendingImage),
}

impl GalleryEntry {
    /// What the preview grid shows for this entry, if anything.
    pub fn preview(&self) -> Option<&str> {
        match self {
            GalleryEntry::Existing(image) => Some(&image.url),
            GalleryEntry::Removed(_) => None,
            GalleryEntry::Pending(pending) => Some(&pending.preview),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GallerySession {
    entries: Vec<GalleryEntry>,
}

impl GallerySession {
    pub fn load(images: &[ImageRef]) -> Self {
        Self {
            entries: images.iter().cloned().map(GalleryEntry::Existing).collect(),
        }
    }

    pub fn entries(&self) -> &[GalleryEntry] {
        &self.entries
    }

    /// Queue files for upload and return their preview handles. Identical
    /// files are queued once per selection.
    pub fn add_files(&mut self, files: impl IntoIterator<Item = LocalFile>) -> Vec<String> {
        files
            .into_iter()
            .map(|file| {
                let pending = PendingImage::new(file);
                let preview = pending.preview.clone();
                self.entries.push(GalleryEntry::Pending(pending));
                preview
            })
            .collect()
    }

    /// Drop the image shown under `key` (a stored URL or a pending preview).
    ///
    /// A stored image becomes `Removed`; a pending file is discarded outright.
    /// Returns `false` when nothing visible matches.
    pub fn remove(&mut self, key: &str) -> bool {
        for entry in &mut self.entries {
            if let GalleryEntry::Existing(image) = entry {
                if image.url == key {
                    *entry = GalleryEntry::Removed(image.clone());
                    return true;
                }
            }
        }

        let pending = self
            .entries
            .iter()
            .position(|e| matches!(e, GalleryEntry::Pending(p) if p.preview == key));
        match pending {
            Some(index) => {
                self.entries.remove(index);
                true
            }
            None => false,
        }
    }

    /// Stored images still kept, in their original order.
    pub fn retained(&self) -> Vec<ImageRef> {
        self.entries
            .iter()
            .filter_map(|e| match e {
                GalleryEntry::Existing(image) => Some(image.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn removed(&self) -> Vec<ImageRef> {
        self.entries
            .iter()
            .filter_map(|e| match e {
                GalleryEntry::Removed(image) => Some(image.clone()),
                _ => None,
            })
            .collect()
    }

    /// Files awaiting upload, in selection order.
    pub fn pending(&self) -> impl Iterator<Item = &PendingImage> {
        self.entries.iter().filter_map(|e| match e {
            GalleryEntry::Pending(pending) => Some(pending),
            _ => None,
        })
    }

    /// Visible previews: stored images first, then new files.
    pub fn previews(&self) -> Vec<String> {
        let stored = self
            .entries
            .iter()
            .filter(|e| matches!(e, GalleryEntry::Existing(_)));
        let new = self
            .entries
            .iter()
            .filter(|e| matches!(e, GalleryEntry::Pending(_)));
        stored
            .chain(new)
            .filter_map(GalleryEntry::preview)
            .map(String::from)
            .collect()
    }

    pub fn is_dirty(&self) -> bool {
        self.entries
            .iter()
            .any(|e| !matches!(e, GalleryEntry::Existing(_)))
    }
}
