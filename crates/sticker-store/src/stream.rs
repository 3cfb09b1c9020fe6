//! Upload byte streams and the streaming size guard.

use bytes::Bytes;
use futures::stream::{self, BoxStream, StreamExt};
use thiserror::Error;

/// A chunked upload body.
pub type ByteStream = BoxStream<'static, std::result::Result<Bytes, StreamError>>;

/// Failures while reading an upload body.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StreamError {
    #[error("the sticker file needs to be at most {limit} bytes")]
    TooLarge { limit: u64 },

    #[error("failed to read upload body: {0}")]
    Read(String),
}

/// Wrap `content` so it fails as soon as more than `limit` bytes have passed.
///
/// The error is yielded in place of the chunk that crossed the limit and the
/// stream ends right after it, so nothing past that chunk is ever pulled from
/// the source.
pub fn limit_size(content: ByteStream, limit: u64) -> ByteStream {
    stream::unfold(
        (content, 0u64, false),
        move |(mut content, mut seen, done)| async move {
            if done {
                return None;
            }
            let item = match content.next().await? {
                Ok(bytes) => {
                    seen += bytes.len() as u64;
                    if seen > limit {
                        Err(StreamError::TooLarge { limit })
                    } else {
                        Ok(bytes)
                    }
                }
                Err(e) => Err(e),
            };
            let failed = item.is_err();
            Some((item, (content, seen, failed)))
        },
    )
    .boxed()
}

/// Split an in-memory body into a stream of `chunk_size` pieces.
pub fn chunked(data: impl Into<Bytes>, chunk_size: usize) -> ByteStream {
    let data = data.into();
    let chunk_size = chunk_size.max(1);
    let chunks: Vec<_> = (0..data.len())
        .step_by(chunk_size)
        .map(|start| Ok(data.slice(start..(start + chunk_size).min(data.len()))))
        .collect();
    stream::iter(chunks).boxed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    const MIB: usize = 1024 * 1024;

    /// A source of `chunks` chunks of `size` bytes that counts pulls.
    fn counting_source(chunks: usize, size: usize, pulled: Arc<AtomicUsize>) -> ByteStream {
        stream::iter(0..chunks)
            .map(move |_| {
                pulled.fetch_add(1, Ordering::SeqCst);
                Ok(Bytes::from(vec![0u8; size]))
            })
            .boxed()
    }

    async fn drain(mut content: ByteStream) -> std::result::Result<usize, StreamError> {
        let mut total = 0;
        while let Some(chunk) = content.next().await {
            total += chunk?.len();
        }
        Ok(total)
    }

    #[tokio::test]
    async fn test_exact_limit_passes() {
        let body = chunked(vec![1u8; 2 * MIB], 64 * 1024);
        let total = drain(limit_size(body, 2 * MIB as u64)).await.unwrap();
        assert_eq!(total, 2 * MIB);
    }

    #[tokio::test]
    async fn test_one_byte_over_fails() {
        let body = chunked(vec![1u8; 2 * MIB + 1], 64 * 1024);
        let err = drain(limit_size(body, 2 * MIB as u64)).await.unwrap_err();
        assert_eq!(err, StreamError::TooLarge { limit: 2 * MIB as u64 });
    }

    #[tokio::test]
    async fn test_aborts_before_whole_body_is_read() {
        let pulled = Arc::new(AtomicUsize::new(0));
        // 64 chunks of 64 KiB = 4 MiB against a 2 MiB limit
        let source = counting_source(64, 64 * 1024, pulled.clone());
        let mut guarded = limit_size(source, 2 * MIB as u64);

        let mut retained = Vec::new();
        while let Some(chunk) = guarded.next().await {
            match chunk {
                Ok(bytes) => retained.extend_from_slice(&bytes),
                Err(_) => break,
            }
        }

        assert_eq!(retained.len(), 2 * MIB);
        assert_eq!(pulled.load(Ordering::SeqCst), 33);
        assert!(guarded.next().await.is_none());
    }

    #[tokio::test]
    async fn test_read_errors_end_the_stream() {
        let source = stream::iter(vec![
            Ok(Bytes::from_static(b"ab")),
            Err(StreamError::Read("reset".into())),
            Ok(Bytes::from_static(b"cd")),
        ])
        .boxed();
        let mut guarded = limit_size(source, 10);
        assert!(guarded.next().await.unwrap().is_ok());
        assert!(guarded.next().await.unwrap().is_err());
        assert!(guarded.next().await.is_none());
    }

    #[test]
    fn test_chunked_splits_evenly() {
        let chunks: Vec<_> = futures::executor::block_on(chunked(vec![0u8; 10], 4).collect::<Vec<_>>());
        let sizes: Vec<_> = chunks.into_iter().map(|c| c.unwrap().len()).collect();
        assert_eq!(sizes, vec![4, 4, 2]);
    }

    proptest::proptest! {
        #[test]
        fn guard_passes_iff_within_limit(len in 0usize..4096, chunk in 1usize..512, limit in 0u64..4096) {
            let guarded = limit_size(chunked(vec![7u8; len], chunk), limit);
            let result = futures::executor::block_on(drain(guarded));
            if len as u64 <= limit {
                proptest::prop_assert_eq!(result, Ok(len));
            } else {
                proptest::prop_assert_eq!(result, Err(StreamError::TooLarge { limit }));
            }
        }
    }
}
