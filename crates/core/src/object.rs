//! Published repository objects.

use bytes::Bytes;
use time::OffsetDateTime;

use crate::ContentHash;

/// A decoded object from an RRDP snapshot, ready to be written to disk.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RpkiObject {
    /// The `rsync://` URI from the `<publish>` element, kept verbatim.
    pub url: String,
    pub bytes: Bytes,
    /// Modification time given to the file on disk.
    pub modification_time: OffsetDateTime,
}

impl RpkiObject {
    pub fn new(url: impl Into<String>, bytes: Bytes, modification_time: OffsetDateTime) -> Self {
        Self {
            url: url.into(),
            bytes,
            modification_time,
        }
    }

    pub fn content_hash(&self) -> ContentHash {
        ContentHash::compute(&self.bytes)
    }
}
