use crate::assets::LocalFile;
use crate::content::ImageRef;

use super::gallery::PendingImage;

/// The single main (cover) image of an edit session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MainImageSlot {
    current: Option<ImageRef>,
    pending: Option<PendingImage>,
}

impl MainImageSlot {
    pub fn load(current: Option<&ImageRef>) -> Self {
        Self {
            current: current.cloned(),
            pending: None,
        }
    }

    /// Replace any earlier selection; returns the new preview handle.
    pub fn select(&mut self, file: LocalFile) -> String {
        let pending = PendingImage::new(file);
        let preview = pending.preview.clone();
        self.pending = Some(pending);
        preview
    }

    pub fn clear_selection(&mut self) {
        self.pending = None;
    }

    pub fn current(&self) -> Option<&ImageRef> {
        self.current.as_ref()
    }

    pub fn pending(&self) -> Option<&PendingImage> {
        self.pending.as_ref()
    }

    pub fn preview(&self) -> Option<&str> {
        self.pending
            .as_ref()
            .map(|p| p.preview.as_str())
            .or_else(|| self.current.as_ref().map(|c| c.url.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_selection_replaces_previous() {
        let stored = ImageRef::new("https://cdn.test/upload/main.jpg", "main");
        let mut slot = MainImageSlot::load(Some(&stored));
        assert_eq!(slot.preview(), Some(stored.url.as_str()));

        let first = slot.select(LocalFile::new("a.jpg", vec![1]));
        let second = slot.select(LocalFile::new("b.jpg", vec![2]));
        assert_ne!(first, second);
        assert_eq!(slot.preview(), Some(second.as_str()));
        assert_eq!(slot.pending().map(|p| p.file.file_name.as_str()), Some("b.jpg"));
        assert_eq!(slot.current(), Some(&stored));

        slot.clear_selection();
        assert_eq!(slot.preview(), Some(stored.url.as_str()));
    }

    #[test]
    fn test_empty_slot_has_no_preview() {
        assert_eq!(MainImageSlot::default().preview(), None);
    }
}
