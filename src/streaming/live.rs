//! Live stream relay.
//!
//! Bridges a transcoding engine's output pipe to an HTTP response body
//! through a bounded channel: a producer task reads fixed-size chunks off
//! the pipe while the body streams from the channel, so the client
//! receives data as it is encoded. When the client disconnects the
//! channel closes, the producer stops, and dropping the [`LiveStream`]
//! terminates the engine process.

use bytes::Bytes;
use futures::Stream;
use tokio::io::AsyncReadExt;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, warn};

use crate::engine::LiveStream;

/// Read size off the engine pipe, and the unit the client is flushed in.
const CHUNK_SIZE: usize = 32 * 1024;

/// Chunks buffered between the engine and a slow client.
const CHANNEL_DEPTH: usize = 8;

/// Spawn the relay for a live conversion, returning the body stream.
pub fn relay(mut live: LiveStream) -> impl Stream<Item = Result<Bytes, std::io::Error>> + Send {
    let (tx, rx) = mpsc::channel(CHANNEL_DEPTH);

    tokio::spawn(async move {
        let mut buf = vec![0u8; CHUNK_SIZE];
        loop {
            match live.read(&mut buf).await {
                Ok(0) => {
                    debug!("live transcode finished");
                    break;
                }
                Ok(n) => {
                    if tx.send(Ok(Bytes::copy_from_slice(&buf[..n]))).await.is_err() {
                        // Receiver dropped: the client went away. Dropping
                        // `live` terminates the engine process.
                        debug!("client disconnected, stopping live relay");
                        break;
                    }
                }
                Err(e) => {
                    // Headers are long gone; nothing to report but a log line.
                    warn!(error = %e, "error reading live transcode output");
                    let _ = tx.send(Err(e)).await;
                    break;
                }
            }
        }
    });

    ReceiverStream::new(rx)
}
