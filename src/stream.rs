use futures::StreamExt;
use tokio_util::sync::CancellationToken;

use crate::error::{PipelineError, Result};
use crate::gemini::{GenerativeBackend, ModelRequest, PartStream, StreamPart};

/// Start a streaming call, abandoning the connect if cancelled first
pub async fn open_stream(
    backend: &dyn GenerativeBackend,
    request: ModelRequest,
    cancel: &CancellationToken,
) -> Result<PartStream> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(PipelineError::Cancelled),
        stream = backend.stream_generate(request) => Ok(stream?),
    }
}

/// Await the next chunk unless the request sequence is cancelled first.
///
/// Returns `Ok(None)` at end of stream.
pub async fn next_chunk(
    stream: &mut PartStream,
    cancel: &CancellationToken,
) -> Result<Option<Vec<StreamPart>>> {
    if cancel.is_cancelled() {
        return Err(PipelineError::Cancelled);
    }

    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(PipelineError::Cancelled),
        chunk = stream.next() => match chunk {
            Some(parts) => Ok(Some(parts?)),
            None => Ok(None),
        },
    }
}
