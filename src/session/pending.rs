use crate::media::MediaBlob;

/// Maximum number of images attached to one request
pub const MAX_PENDING_IMAGES: usize = 7;

/// Ordered images waiting to be submitted. Insertion order is display order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingImages {
    images: Vec<MediaBlob>,
}

impl PendingImages {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append images, dropping any beyond the cap. Returns how many were kept.
    pub fn extend(&mut self, images: impl IntoIterator<Item = MediaBlob>) -> usize {
        let room = MAX_PENDING_IMAGES.saturating_sub(self.images.len());
        let before = self.images.len();
        self.images.extend(images.into_iter().take(room));
        self.images.len() - before
    }

    /// Remove by index; out-of-range indices are ignored
    pub fn remove(&mut self, index: usize) -> Option<MediaBlob> {
        (index < self.images.len()).then(|| self.images.remove(index))
    }

    pub fn as_slice(&self) -> &[MediaBlob] {
        &self.images
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.images.len() >= MAX_PENDING_IMAGES
    }

    pub fn into_vec(self) -> Vec<MediaBlob> {
        self.images
    }
}
