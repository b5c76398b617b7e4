//! Download body that removes its session once fully sent
//!
//! The body yields the exported document in fixed-size chunks. After the
//! last chunk has been handed to the connection the session is destroyed on
//! a blocking worker, provided it is still at the exported revision. A body
//! dropped before completion (client went away) leaves the session in
//! place, so the download can be retried. So does an edit committed while
//! the transfer was running.

use std::io;
use std::sync::Arc;

use axum::body::{Body, Bytes};
use futures::stream::{self, StreamExt};
use pdfedit_core::{Editor, Export, SessionId};
use tracing::{info, warn};

const CHUNK_SIZE: usize = 64 * 1024;

/// Streamed response body for `export` that destroys session `id` at end of stream
pub fn cleanup_body(export: Export, editor: Arc<Editor>, id: SessionId) -> Body {
    let revision = export.revision;
    let bytes = Bytes::from(export.bytes);
    let len = bytes.len();
    let chunks = (0..len).step_by(CHUNK_SIZE).map(move |start| {
        let end = (start + CHUNK_SIZE).min(len);
        Ok::<_, io::Error>(bytes.slice(start..end))
    });

    let cleanup = stream::once(async move {
        let session = id.clone();
        let destroyed =
            tokio::task::spawn_blocking(move || editor.destroy_if_revision(&session, revision))
                .await;
        match destroyed {
            Ok(Ok(true)) => info!("Session {}: downloaded and removed", id),
            Ok(Ok(false)) => {}
            Ok(Err(e)) => warn!("Session {}: cleanup after download failed: {}", id, e),
            Err(e) => warn!("Session {}: cleanup task failed: {}", id, e),
        }
        None::<Result<Bytes, io::Error>>
    })
    .filter_map(futures::future::ready);

    Body::from_stream(stream::iter(chunks).chain(cleanup))
}
