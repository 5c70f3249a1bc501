//! The unit of output carried from acquisition through delivery.

use std::fmt;

/// A labelled binary payload (typically an image) produced by acquisition and
/// delivered unchanged.
#[derive(Clone, PartialEq, Eq)]
pub struct DeliverableItem {
    label: String,
    payload: Vec<u8>,
}

impl DeliverableItem {
    pub fn new(label: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            label: label.into(),
            payload: payload.into(),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// File extension guessed from the payload's magic bytes.
    pub fn extension(&self) -> &'static str {
        match ImageKind::sniff(&self.payload) {
            Some(kind) => kind.extension(),
            None => "bin",
        }
    }

    /// MIME type guessed from the payload's magic bytes.
    pub fn mime_type(&self) -> &'static str {
        match ImageKind::sniff(&self.payload) {
            Some(kind) => kind.mime_type(),
            None => "application/octet-stream",
        }
    }
}

impl fmt::Debug for DeliverableItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeliverableItem")
            .field("label", &self.label)
            .field("bytes", &self.payload.len())
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ImageKind {
    Png,
    Jpeg,
    Gif,
    Webp,
}

impl ImageKind {
    fn sniff(data: &[u8]) -> Option<Self> {
        if data.starts_with(b"\x89PNG\r\n\x1a\n") {
            Some(ImageKind::Png)
        } else if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            Some(ImageKind::Jpeg)
        } else if data.starts_with(b"GIF87a") || data.starts_with(b"GIF89a") {
            Some(ImageKind::Gif)
        } else if data.len() >= 12 && &data[0..4] == b"RIFF" && &data[8..12] == b"WEBP" {
            Some(ImageKind::Webp)
        } else {
            None
        }
    }

    fn extension(self) -> &'static str {
        match self {
            ImageKind::Png => "png",
            ImageKind::Jpeg => "jpg",
            ImageKind::Gif => "gif",
            ImageKind::Webp => "webp",
        }
    }

    fn mime_type(self) -> &'static str {
        match self {
            ImageKind::Png => "image/png",
            ImageKind::Jpeg => "image/jpeg",
            ImageKind::Gif => "image/gif",
            ImageKind::Webp => "image/webp",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sniffs_common_image_formats() {
        let png = DeliverableItem::new("a", b"\x89PNG\r\n\x1a\nrest".to_vec());
        assert_eq!(png.extension(), "png");
        assert_eq!(png.mime_type(), "image/png");
        let jpg = DeliverableItem::new("b", vec![0xFF, 0xD8, 0xFF, 0xE0, 0, 0]);
        assert_eq!(jpg.extension(), "jpg");
        let webp = DeliverableItem::new("c", b"RIFF\0\0\0\0WEBPVP8 ".to_vec());
        assert_eq!(webp.mime_type(), "image/webp");
    }

    #[test]
    fn unknown_payload_is_binary() {
        let item = DeliverableItem::new("x", b"hello".to_vec());
        assert_eq!(item.extension(), "bin");
        assert_eq!(item.mime_type(), "application/octet-stream");
    }

    #[test]
    fn debug_hides_payload_bytes() {
        let item = DeliverableItem::new("chart", vec![1u8; 2048]);
        let dbg = format!("{:?}", item);
        assert!(dbg.contains("chart"));
        assert!(dbg.contains("2048"));
    }
}
