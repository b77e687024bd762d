// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Upload Stream
//!
//! Writable side of a remote upload. Bytes written here are piped to a
//! background task that streams them into the remote store; the task ends
//! when the stream is shut down or dropped. Shutting the stream down waits
//! for the task and reports its outcome as an `io::Error`.

use std::future::Future;
use std::io;
use std::pin::Pin;
use std::task::{ready, Context, Poll};
use tokio::io::{AsyncWrite, AsyncWriteExt, DuplexStream};
use tokio::task::{JoinError, JoinHandle};

use crate::domain::remote_store::{ByteReader, StoreError};

const PIPE_CAPACITY: usize = 64 * 1024;

/// Writable byte stream backed by a remote upload
///
/// `shutdown()` (or [`WriteStream::finish`]) closes the pipe and waits for
/// the upload to be committed, reporting its outcome. A stream dropped
/// without being closed still commits what was written; the outcome is
/// then only logged.
pub struct WriteStream {
    pipe: DuplexStream,
    /// `None` once the outcome has been reported
    upload: Option<JoinHandle<Result<(), StoreError>>>,
}

fn join_outcome(
    joined: Result<Result<(), StoreError>, JoinError>,
) -> Result<(), StoreError> {
    joined.map_err(|e| StoreError::Io(format!("upload task failed: {e}")))?
}

impl WriteStream {
    /// Spawn `upload` with the read end of a fresh pipe and return the
    /// write end.
    pub fn spawn<F, Fut>(upload: F) -> Self
    where
        F: FnOnce(ByteReader) -> Fut,
        Fut: Future<Output = Result<(), StoreError>> + Send + 'static,
    {
        let (pipe, reader) = tokio::io::duplex(PIPE_CAPACITY);
        let upload = tokio::spawn(upload(Box::pin(reader)));
        Self {
            pipe,
            upload: Some(upload),
        }
    }

    /// Close the stream and wait for the upload to be committed.
    pub async fn finish(mut self) -> Result<(), StoreError> {
        if let Err(e) = self.pipe.shutdown().await {
            tracing::debug!(error = %e, "Upload pipe already closed");
        }
        match self.upload.take() {
            Some(upload) => join_outcome(upload.await),
            None => Ok(()),
        }
    }
}

impl AsyncWrite for WriteStream {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.pipe).poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.pipe).poll_flush(cx)
    }

    /// Closes the pipe, then resolves with the upload's outcome.
    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let this = &mut *self;
        if let Err(e) = ready!(Pin::new(&mut this.pipe).poll_shutdown(cx)) {
            tracing::debug!(error = %e, "Upload pipe already closed");
        }

        let Some(upload) = this.upload.as_mut() else {
            return Poll::Ready(Ok(()));
        };
        let joined = ready!(Pin::new(upload).poll(cx));
        this.upload = None;
        Poll::Ready(join_outcome(joined).map_err(io::Error::other))
    }
}

impl Drop for WriteStream {
    fn drop(&mut self) {
        let Some(upload) = self.upload.take() else {
            return;
        };
        // Dropping the pipe ends the upload; log how it went
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(async move {
                    match join_outcome(upload.await) {
                        Ok(()) => tracing::debug!("Unclosed upload stream committed"),
                        Err(e) => tracing::warn!(
                            error_kind = e.kind(),
                            error = %e,
                            "Upload failed after stream was dropped without shutdown"
                        ),
                    }
                });
            }
            Err(_) => {
                tracing::warn!("Upload stream dropped outside a runtime, outcome unknown");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use tokio::io::AsyncReadExt;

    #[tokio::test]
    async fn test_bytes_reach_upload_task() {
        let received = Arc::new(Mutex::new(Vec::new()));
        let sink = received.clone();

        let mut stream = WriteStream::spawn(move |mut reader| async move {
            let mut buf = Vec::new();
            reader.read_to_end(&mut buf).await?;
            *sink.lock().unwrap() = buf;
            Ok(())
        });

        stream.write_all(b"hello ").await.unwrap();
        stream.write_all(b"world").await.unwrap();
        stream.finish().await.unwrap();

        assert_eq!(received.lock().unwrap().as_slice(), b"hello world");
    }

    #[tokio::test]
    async fn test_upload_error_surfaces_on_finish() {
        let stream = WriteStream::spawn(|_reader| async move {
            Err(StoreError::Unavailable("namenode down".to_string()))
        });

        assert!(matches!(stream.finish().await, Err(StoreError::Unavailable(_))));
    }

    #[tokio::test]
    async fn test_shutdown_reports_upload_error() {
        let mut stream = WriteStream::spawn(|mut reader| async move {
            let mut buf = Vec::new();
            reader.read_to_end(&mut buf).await?;
            Err(StoreError::Remote {
                exception: "ParentNotDirectoryException".to_string(),
                message: "/blob is not a directory".to_string(),
            })
        });

        stream.write_all(b"payload").await.unwrap();
        let err = stream.shutdown().await.unwrap_err();
        assert!(err.to_string().contains("/blob is not a directory"));

        // Outcome is reported once
        assert!(stream.shutdown().await.is_ok());
    }

    #[tokio::test]
    async fn test_shutdown_waits_for_commit() {
        let received = Arc::new(Mutex::new(Vec::new()));
        let sink = received.clone();

        let mut stream = WriteStream::spawn(move |mut reader| async move {
            let mut buf = Vec::new();
            reader.read_to_end(&mut buf).await?;
            tokio::task::yield_now().await;
            *sink.lock().unwrap() = buf;
            Ok(())
        });

        stream.write_all(b"committed").await.unwrap();
        stream.shutdown().await.unwrap();
        assert_eq!(received.lock().unwrap().as_slice(), b"committed");
        drop(stream);
    }

    #[tokio::test]
    async fn test_dropped_stream_still_commits() {
        let (tx, rx) = tokio::sync::oneshot::channel();

        let mut stream = WriteStream::spawn(move |mut reader| async move {
            let mut buf = Vec::new();
            reader.read_to_end(&mut buf).await?;
            let _ = tx.send(buf);
            Ok(())
        });

        stream.write_all(b"partial").await.unwrap();
        drop(stream);
        assert_eq!(rx.await.unwrap(), b"partial");
    }
}
