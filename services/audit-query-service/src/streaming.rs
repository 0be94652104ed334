//! Adapts a C7 `Watch` into an actix-web chunked response body: one JSON
//! frame per line (spec §4.9 "watch variant with chunked streaming
//! frames"). Dropping the stream — client disconnect, request
//! cancellation — cancels the underlying bus subscription.

use actix_web::web::Bytes;
use futures::Stream;
use serde::Serialize;
use std::pin::Pin;
use std::task::{Context, Poll};
use telemetry_bus::{Frame, Watch};
use telemetry_common::error::AppError;
use tokio_util::sync::CancellationToken;

pub struct WatchStream<T> {
    watch: Watch<T>,
}

impl<T> WatchStream<T> {
    pub fn new(watch: Watch<T>) -> Self {
        Self { watch }
    }
}

impl<T: Serialize + Unpin> Stream for WatchStream<T> {
    type Item = Result<Bytes, AppError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        match this.watch.frames.poll_recv(cx) {
            Poll::Ready(Some(frame)) => Poll::Ready(Some(Ok(encode_frame(&frame)))),
            Poll::Ready(None) => Poll::Ready(None),
            Poll::Pending => Poll::Pending,
        }
    }
}

impl<T> Drop for WatchStream<T> {
    fn drop(&mut self) {
        self.watch.cancel.cancel();
    }
}

fn encode_frame<T: Serialize>(frame: &Frame<T>) -> Bytes {
    let mut bytes = serde_json::to_vec(frame).unwrap_or_default();
    bytes.push(b'\n');
    Bytes::from(bytes)
}

/// A no-op accessor so callers that need the cancellation token directly
/// (e.g. to tie it to a request guard) can reach it without consuming the
/// stream.
pub fn cancellation_token<T>(stream: &WatchStream<T>) -> CancellationToken {
    stream.watch.cancel.clone()
}
