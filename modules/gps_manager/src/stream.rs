use common::reading::Reading;
use futures::{Stream, StreamExt, stream::BoxStream};
use std::{
    pin::Pin,
    task::{Context, Poll},
};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// The readings of one listener session.
///
/// The stream starts with the first reading produced after it was created and
/// completes as soon as the session is stopped. It cannot be restarted, a new
/// session needs a new stream.
pub struct ReadingStream {
    inner: BoxStream<'static, Reading>,
}

impl ReadingStream {
    pub(crate) fn new(receiver: broadcast::Receiver<Reading>, stopped: CancellationToken) -> Self {
        let inner = futures::stream::unfold(
            (receiver, stopped),
            |(mut receiver, stopped)| async move {
                loop {
                    let next = tokio::select! {
                        biased;
                        _ = stopped.cancelled() => None,
                        result = receiver.recv() => Some(result),
                    };
                    match next {
                        None | Some(Err(RecvError::Closed)) => return None,
                        Some(Ok(reading)) => return Some((reading, (receiver, stopped))),
                        Some(Err(RecvError::Lagged(skipped))) => {
                            warn!("Reading stream fell behind, skipped {skipped} readings");
                        }
                    }
                }
            },
        );
        ReadingStream {
            inner: inner.boxed(),
        }
    }

    /// A stream that is already complete, handed out while no listener is active.
    pub(crate) fn completed() -> Self {
        ReadingStream {
            inner: futures::stream::empty().boxed(),
        }
    }
}

impl Stream for ReadingStream {
    type Item = Reading;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.poll_next_unpin(cx)
    }
}

impl std::fmt::Debug for ReadingStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadingStream").finish_non_exhaustive()
    }
}
