//! External collaborator interfaces
//!
//! The pipeline depends on two library-provided services, specified here at
//! their interface boundary: a stream-resolution service that enumerates
//! available encodings for a media identifier and opens a byte stream for
//! one, and a playlist-listing service that returns the ordered items of a
//! playlist. Implementations live outside this crate (or in test mocks).

use crate::error::Result;
use crate::types::{MediaDetails, PlaylistBatch, StreamDescriptor};
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;

/// A resolved media item: its descriptive details plus the available encodings
#[derive(Clone, Debug)]
pub struct ResolvedMedia {
    /// Title, channel, duration, thumbnail
    pub details: MediaDetails,
    /// Every encoding the service offers for this item
    pub descriptors: Vec<StreamDescriptor>,
}

/// An open byte stream for one encoding of a media item.
///
/// Bytes arrive in chunks; the fetcher forwards them to a sink file without
/// buffering the whole payload. `total_bytes` may be unknown for some
/// sources, in which case progress degrades to "bytes received only".
pub struct MediaStream {
    /// Total payload size, when the source reports one
    pub total_bytes: Option<u64>,
    /// The chunk stream; ends after the last chunk or an error
    pub chunks: BoxStream<'static, Result<Bytes>>,
}

impl MediaStream {
    /// Wrap a chunk stream with an optional known total size
    pub fn new(total_bytes: Option<u64>, chunks: BoxStream<'static, Result<Bytes>>) -> Self {
        Self { total_bytes, chunks }
    }
}

impl std::fmt::Debug for MediaStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaStream")
            .field("total_bytes", &self.total_bytes)
            .finish_non_exhaustive()
    }
}

/// Stream-resolution service: enumerates encodings and opens byte streams
#[async_trait]
pub trait StreamResolver: Send + Sync {
    /// Resolve a media identifier to its details and available encodings
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidSource`] when the identifier does not
    /// resolve to any media item, or a network error for transport faults.
    async fn resolve(&self, identifier: &str) -> Result<ResolvedMedia>;

    /// Open a byte stream for one encoding of a media item
    ///
    /// # Errors
    ///
    /// Returns an error when the source is unreachable or the descriptor is
    /// no longer valid on the service side.
    async fn open_stream(
        &self,
        identifier: &str,
        descriptor: &StreamDescriptor,
    ) -> Result<MediaStream>;
}

/// Playlist-listing service: returns an ordered snapshot of a playlist
#[async_trait]
pub trait PlaylistProvider: Send + Sync {
    /// List the items of a playlist, in source order.
    ///
    /// The snapshot is taken once at batch start and not refreshed mid-run.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidSource`] when the playlist identifier
    /// does not resolve, or a network error for transport faults.
    async fn list(&self, list_identifier: &str) -> Result<PlaylistBatch>;
}
