//! Stream fetching: drives remote bytes into a sink file
//!
//! The fetcher validates the chosen descriptor against the resolved
//! descriptor list before any body I/O, then forwards chunks to the sink as
//! they arrive. Progress is published on the broadcast event channel;
//! the single terminal outcome is the returned `Result`.

use crate::error::{Error, Result};
use crate::services::{ResolvedMedia, StreamResolver};
use crate::types::{Event, JobId, MediaSource, StreamDescriptor};
use futures::StreamExt;
use std::path::Path;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

/// Fetches one encoding of a media item into a sink file
#[derive(Clone)]
pub struct StreamFetcher {
    event_tx: tokio::sync::broadcast::Sender<Event>,
}

impl StreamFetcher {
    /// Create a fetcher publishing progress on the given event channel
    pub fn new(event_tx: tokio::sync::broadcast::Sender<Event>) -> Self {
        Self { event_tx }
    }

    /// Stream the chosen encoding of `source` into `sink`.
    ///
    /// Returns the number of bytes written. Bytes are forwarded chunk by
    /// chunk; the payload is never buffered in memory.
    ///
    /// # Errors
    ///
    /// - [`Error::StreamUnavailable`] when `descriptor` is not present in the
    ///   resolved descriptor list (checked before any stream body I/O)
    /// - Network errors from the stream itself
    /// - I/O errors from the sink file
    pub async fn fetch(
        &self,
        resolver: &dyn StreamResolver,
        resolved: &ResolvedMedia,
        source: &MediaSource,
        descriptor: &StreamDescriptor,
        sink: &Path,
        job: &JobId,
    ) -> Result<u64> {
        if !resolved
            .descriptors
            .iter()
            .any(|d| d.format_id == descriptor.format_id)
        {
            return Err(Error::StreamUnavailable(format!(
                "format '{}' is not offered for '{}'",
                descriptor.format_id, source.identifier
            )));
        }

        debug!(
            job = %job,
            format = %descriptor.format_id,
            sink = %sink.display(),
            "opening stream"
        );

        let mut stream = resolver.open_stream(&source.identifier, descriptor).await?;
        let mut file = tokio::fs::File::create(sink).await?;
        let mut received: u64 = 0;

        while let Some(chunk) = stream.chunks.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            received += chunk.len() as u64;

            // Progress is a notification, not an awaited call; receivers may
            // lag or be absent.
            let _ = self.event_tx.send(Event::FetchProgress {
                id: job.clone(),
                bytes_received: received,
                bytes_total: stream.total_bytes,
            });
        }

        file.flush().await?;

        info!(job = %job, bytes = received, "fetch complete");
        Ok(received)
    }
}
