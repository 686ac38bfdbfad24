//! Metadata tagging for finished audio files
//!
//! Writes ID3 frames (title, artist, album, track, cover) to a file in
//! place. Cover handling degrades gracefully: a failed thumbnail fetch or an
//! unrecognizable image format drops the cover but never fails the job.
//! Only the final tag write on the target file is fatal.

use crate::error::{Error, Result};
use crate::types::Metadata;
use id3::frame::{Picture, PictureType};
use id3::{Tag, TagLike, Version};
use std::path::Path;
use tracing::{debug, info, warn};

/// Rewrites the tag frames of a finished audio file
#[derive(Clone, Default)]
pub struct MetadataTagger {
    http: reqwest::Client,
}

impl MetadataTagger {
    /// Create a tagger with a fresh HTTP client for thumbnail fetching
    pub fn new() -> Self {
        Self::default()
    }

    /// Write the tag set described by `metadata` to `path`.
    ///
    /// Steps, each independently fallible:
    /// 1. Strip any pre-existing tag frames (no-op when none exist)
    /// 2. Fetch cover bytes from the thumbnail URL when not supplied
    /// 3. Sniff the image MIME type from the byte signature
    /// 4. Write the new tag set in place
    ///
    /// Steps 2 and 3 degrade: on failure the textual tags are still written,
    /// just without a cover.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Tag`] only when the final tag write on the target
    /// file fails.
    pub async fn tag(&self, path: &Path, metadata: &Metadata) -> Result<()> {
        // Strip old frames. A corrupt existing tag is not fatal here; the
        // write below replaces whatever is present.
        match Tag::remove_from_path(path) {
            Ok(removed) => {
                if removed {
                    debug!(path = %path.display(), "stripped pre-existing tag frames");
                }
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "could not strip existing tags");
            }
        }

        let cover = self.ensure_cover(metadata).await;

        let mut tag = Tag::new();
        tag.set_title(&metadata.title);
        tag.set_artist(&metadata.artist);
        tag.set_album(&metadata.album);
        tag.set_track(metadata.track);

        if let Some((mime, bytes)) = cover {
            tag.add_frame(Picture {
                mime_type: mime,
                picture_type: PictureType::CoverFront,
                description: "Cover".to_string(),
                data: bytes,
            });
        }

        tag.write_to_path(path, Version::Id3v24)
            .map_err(|e| Error::Tag {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        info!(path = %path.display(), title = %metadata.title, "tags written");
        Ok(())
    }

    /// Resolve cover bytes and MIME, degrading to `None` on any failure.
    async fn ensure_cover(&self, metadata: &Metadata) -> Option<(String, Vec<u8>)> {
        let bytes = match &metadata.cover_bytes {
            Some(bytes) => bytes.clone(),
            None => {
                let url = metadata.thumbnail_url.as_deref()?;
                match self.fetch_cover(url).await {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        warn!(
                            url = url,
                            error = %Error::MetadataDegraded(e.to_string()),
                            "cover fetch failed, tagging without cover"
                        );
                        return None;
                    }
                }
            }
        };

        let mime = match &metadata.cover_mime {
            Some(mime) => mime.clone(),
            None => match detect_image_mime(&bytes) {
                Some(mime) => mime.to_string(),
                None => {
                    warn!(
                        error = %Error::MetadataDegraded("unrecognized image signature".into()),
                        "skipping cover field"
                    );
                    return None;
                }
            },
        };

        Some((mime, bytes))
    }

    async fn fetch_cover(&self, url: &str) -> Result<Vec<u8>> {
        let response = self.http.get(url).send().await?.error_for_status()?;
        Ok(response.bytes().await?.to_vec())
    }
}

/// Detect an image MIME type from the leading byte signature
pub fn detect_image_mime(bytes: &[u8]) -> Option<&'static str> {
    let kind = infer::get(bytes)?;
    if kind.matcher_type() == infer::MatcherType::Image {
        Some(kind.mime_type())
    } else {
        None
    }
}
