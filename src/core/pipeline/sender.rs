//! Outbound file sending.
//!
//! One `file-meta` envelope, then the file's bytes as fixed-size binary
//! chunks in offset order, then one `file-end`. Chunks are fire-and-forget:
//! no per-chunk acknowledgement or retry — reliability is delegated
//! entirely to the ordered, reliable data channel underneath.
//!
//! The loop yields back to the scheduler between chunks so a large file
//! cannot starve inbound event processing, and so the transport gets a
//! chance to apply backpressure.

use std::path::Path;

use bytes::Bytes;
use tokio::io::AsyncReadExt;
use tokio::sync::mpsc;
use tracing::info;

use crate::core::config::{CHUNK_SIZE, PROGRESS_CHUNK_INTERVAL};
use crate::core::error::SessionError;
use crate::core::protocol::{self, FileMeta, Frame, WireMessage};
use crate::core::session::{Direction, SessionEvent};
use crate::core::transport::FrameSender;

/// Build the metadata announcement for a file on disk.
pub async fn file_meta_for(path: &Path) -> Result<FileMeta, SessionError> {
    let size = tokio::fs::metadata(path).await?.len();
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "file".into());
    let mime = mime_guess::from_path(path)
        .first_or_octet_stream()
        .to_string();
    Ok(FileMeta { name, size, mime })
}

/// Send one file over the data channel: meta, chunks, end.
pub async fn send_file<S: FrameSender>(
    sender: S,
    path: impl AsRef<Path>,
    events: mpsc::UnboundedSender<SessionEvent>,
) -> Result<(), SessionError> {
    let path = path.as_ref();
    let meta = file_meta_for(path).await?;
    info!(name = %meta.name, size = meta.size, "sending file");

    sender
        .send(protocol::encode_message(&WireMessage::FileMeta(meta.clone()))?)
        .await?;

    let mut file = tokio::fs::File::open(path).await?;
    let mut sent: u64 = 0;
    let mut chunk_no: u64 = 0;
    loop {
        let len = (CHUNK_SIZE as u64).min(meta.size - sent) as usize;
        if len == 0 {
            break;
        }
        let mut buf = vec![0u8; len];
        file.read_exact(&mut buf).await?;
        sender.send(Frame::Binary(Bytes::from(buf))).await?;

        sent += len as u64;
        chunk_no += 1;
        if chunk_no % PROGRESS_CHUNK_INTERVAL == 0 || sent == meta.size {
            let _ = events.send(SessionEvent::TransferProgress {
                name: meta.name.clone(),
                direction: Direction::Outbound,
                transferred: sent,
                total: meta.size,
            });
        }

        // Cooperative yield: keep the event loop responsive mid-transfer.
        tokio::task::yield_now().await;
    }

    sender
        .send(protocol::encode_message(&WireMessage::FileEnd)?)
        .await?;
    info!(name = %meta.name, bytes = sent, "file sent");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Frame sink that records everything it is asked to send.
    #[derive(Clone, Default)]
    struct RecordingSender {
        frames: Arc<Mutex<Vec<Frame>>>,
    }

    impl FrameSender for RecordingSender {
        fn send(
            &self,
            frame: Frame,
        ) -> impl std::future::Future<Output = Result<(), SessionError>> + Send {
            let frames = self.frames.clone();
            async move {
                frames.lock().unwrap().push(frame);
                Ok(())
            }
        }
    }

    fn test_dir(name: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join("pastelink_test").join(name);
        let _ = std::fs::create_dir_all(&dir);
        dir
    }

    fn cleanup(path: &Path) {
        let _ = std::fs::remove_dir_all(path);
    }

    async fn collect_frames(data: &[u8], filename: &str) -> Vec<Frame> {
        let dir = test_dir(filename);
        let path = dir.join(filename);
        std::fs::write(&path, data).unwrap();

        let sender = RecordingSender::default();
        let (tx, _rx) = mpsc::unbounded_channel();
        send_file(sender.clone(), &path, tx).await.unwrap();

        cleanup(&dir);
        sender.frames.lock().unwrap().clone()
    }

    #[tokio::test]
    async fn meta_then_chunks_then_end() {
        let data = vec![0x5A; CHUNK_SIZE * 2 + 100];
        let frames = collect_frames(&data, "three_chunks.bin").await;
        assert_eq!(frames.len(), 1 + 3 + 1);

        match protocol::decode_frame(frames[0].clone()) {
            WireMessage::FileMeta(meta) => {
                assert_eq!(meta.name, "three_chunks.bin");
                assert_eq!(meta.size, data.len() as u64);
                assert_eq!(meta.mime, "application/octet-stream");
            }
            other => panic!("expected file-meta first, got {other:?}"),
        }

        let mut payload = Vec::new();
        for frame in &frames[1..frames.len() - 1] {
            let Frame::Binary(bytes) = frame else {
                panic!("middle frames must be binary chunks");
            };
            assert!(bytes.len() <= CHUNK_SIZE);
            payload.extend_from_slice(bytes);
        }
        assert_eq!(payload, data);

        assert_eq!(
            protocol::decode_frame(frames.last().unwrap().clone()),
            WireMessage::FileEnd
        );
    }

    #[tokio::test]
    async fn empty_file_sends_no_chunks() {
        let frames = collect_frames(&[], "empty.bin").await;
        assert_eq!(frames.len(), 2);
        assert!(matches!(
            protocol::decode_frame(frames[0].clone()),
            WireMessage::FileMeta(_)
        ));
        assert_eq!(
            protocol::decode_frame(frames[1].clone()),
            WireMessage::FileEnd
        );
    }

    #[tokio::test]
    async fn exact_chunk_size_file_is_one_chunk() {
        let data = vec![7u8; CHUNK_SIZE];
        let frames = collect_frames(&data, "one_chunk.bin").await;
        assert_eq!(frames.len(), 3);
        let Frame::Binary(bytes) = &frames[1] else {
            panic!("expected a single binary chunk");
        };
        assert_eq!(bytes.len(), CHUNK_SIZE);
    }

    #[tokio::test]
    async fn meta_resolves_mime_from_extension() {
        let dir = test_dir("mime_resolution");
        let cases = [
            ("a.svg", "image/svg+xml"),
            ("a.csv", "text/csv"),
            ("a.webp", "image/webp"),
            ("a.PNG", "image/png"),
            ("noext", "application/octet-stream"),
        ];
        for (name, expected) in cases {
            let path = dir.join(name);
            std::fs::write(&path, b"x").unwrap();
            let meta = file_meta_for(&path).await.unwrap();
            assert_eq!(meta.mime, expected, "mime for {name}");
        }
        cleanup(&dir);
    }
}
