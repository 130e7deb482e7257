//! Accumulation/encoding pipeline owned by the capture worker

use crate::domain::recording::{Container, EncodedChunk, RawFrame};

use super::frame_buffer::FrameBuffer;
use super::ports::{ContainerWriter, Encoder, WriteError};

/// Either buffer everything and write at the end, or encode and write
/// as frames arrive.
pub enum Pipeline {
    Buffered {
        buffer: FrameBuffer,
        writer: Box<dyn ContainerWriter>,
    },
    Streaming {
        encoder: Box<dyn Encoder>,
        writer: Box<dyn ContainerWriter>,
    },
}

impl Pipeline {
    pub fn buffered(writer: Box<dyn ContainerWriter>) -> Self {
        Self::Buffered {
            buffer: FrameBuffer::new(),
            writer,
        }
    }

    pub fn streaming(encoder: Box<dyn Encoder>, writer: Box<dyn ContainerWriter>) -> Self {
        Self::Streaming { encoder, writer }
    }

    pub fn container(&self) -> Container {
        match self {
            Self::Buffered { writer, .. } | Self::Streaming { writer, .. } => writer.container(),
        }
    }

    pub fn is_buffered(&self) -> bool {
        matches!(self, Self::Buffered { .. })
    }

    /// Create the output file
    pub fn open(&mut self) -> Result<(), WriteError> {
        match self {
            Self::Buffered { writer, .. } | Self::Streaming { writer, .. } => writer.open(),
        }
    }

    /// Hand one captured frame to the pipeline
    pub fn push(&mut self, frame: RawFrame) -> Result<(), WriteError> {
        match self {
            Self::Buffered { buffer, .. } => {
                buffer.append(frame);
                Ok(())
            }
            Self::Streaming { encoder, writer } => {
                for chunk in encoder.encode(frame)? {
                    writer.write_chunk(chunk)?;
                }
                Ok(())
            }
        }
    }

    /// Flush remaining audio and complete the container. Returns file size.
    pub fn finalize(self) -> Result<u64, WriteError> {
        match self {
            Self::Buffered { buffer, mut writer } => {
                if !buffer.is_empty() {
                    writer.write_chunk(EncodedChunk::pcm(buffer.drain()))?;
                }
                writer.finalize()
            }
            Self::Streaming { encoder, mut writer } => {
                let tail = match encoder.finish() {
                    Ok(tail) => tail,
                    Err(e) => {
                        // Still close out what was already written
                        if let Err(finalize_err) = writer.finalize() {
                            tracing::warn!("Finalizing after encoder failure: {}", finalize_err);
                        }
                        return Err(e.into());
                    }
                };
                for chunk in tail {
                    writer.write_chunk(chunk)?;
                }
                writer.finalize()
            }
        }
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = if self.is_buffered() { "Buffered" } else { "Streaming" };
        f.debug_struct("Pipeline")
            .field("kind", &kind)
            .field("container", &self.container())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use parking_lot::Mutex;

    use super::*;
    use crate::application::ports::EncodeError;
    use crate::domain::recording::ChunkKind;

    #[derive(Default)]
    struct Log {
        opened: bool,
        chunks: Vec<EncodedChunk>,
        finalized: bool,
    }

    struct RecordingWriter {
        log: Arc<Mutex<Log>>,
    }

    impl ContainerWriter for RecordingWriter {
        fn container(&self) -> Container {
            Container::Ogg
        }

        fn open(&mut self) -> Result<(), WriteError> {
            self.log.lock().opened = true;
            Ok(())
        }

        fn write_chunk(&mut self, chunk: EncodedChunk) -> Result<(), WriteError> {
            self.log.lock().chunks.push(chunk);
            Ok(())
        }

        fn finalize(self: Box<Self>) -> Result<u64, WriteError> {
            let mut log = self.log.lock();
            log.finalized = true;
            Ok(log.chunks.iter().map(|c| c.len() as u64).sum())
        }
    }

    /// Emits a header on the first frame and echoes every frame as a packet
    struct EchoEncoder {
        started: bool,
        position: u64,
        fail_finish: bool,
    }

    impl Encoder for EchoEncoder {
        fn encode(&mut self, frame: RawFrame) -> Result<Vec<EncodedChunk>, EncodeError> {
            let mut out = Vec::new();
            if !self.started {
                self.started = true;
                out.push(EncodedChunk::header(b"HEAD".to_vec()));
            }
            self.position += 1;
            out.push(EncodedChunk::audio(frame.into_bytes(), self.position));
            Ok(out)
        }

        fn finish(self: Box<Self>) -> Result<Vec<EncodedChunk>, EncodeError> {
            if self.fail_finish {
                return Err(EncodeError::Encode("flush".into()));
            }
            Ok(vec![EncodedChunk::audio(b"TAIL".to_vec(), self.position + 1)])
        }
    }

    fn writer() -> (Box<dyn ContainerWriter>, Arc<Mutex<Log>>) {
        let log = Arc::new(Mutex::new(Log::default()));
        (Box::new(RecordingWriter { log: log.clone() }), log)
    }

    #[test]
    fn buffered_writes_single_chunk_at_finalize() {
        let (writer, log) = writer();
        let mut pipeline = Pipeline::buffered(writer);
        pipeline.open().unwrap();
        pipeline.push(RawFrame::from_bytes(vec![1, 2])).unwrap();
        pipeline.push(RawFrame::from_bytes(vec![3, 4])).unwrap();
        assert!(log.lock().chunks.is_empty());

        let size = pipeline.finalize().unwrap();
        let log = log.lock();
        assert!(log.opened && log.finalized);
        assert_eq!(log.chunks.len(), 1);
        assert_eq!(log.chunks[0].as_bytes(), &[1, 2, 3, 4]);
        assert_eq!(size, 4);
    }

    #[test]
    fn streaming_preserves_production_order() {
        let (writer, log) = writer();
        let encoder = Box::new(EchoEncoder {
            started: false,
            position: 0,
            fail_finish: false,
        });
        let mut pipeline = Pipeline::streaming(encoder, writer);
        pipeline.open().unwrap();
        pipeline.push(RawFrame::from_bytes(vec![1])).unwrap();
        pipeline.push(RawFrame::from_bytes(vec![2])).unwrap();
        pipeline.finalize().unwrap();

        let log = log.lock();
        let bytes: Vec<&[u8]> = log.chunks.iter().map(|c| c.as_bytes()).collect();
        assert_eq!(bytes, vec![&b"HEAD"[..], &[1][..], &[2][..], &b"TAIL"[..]]);
        assert_eq!(log.chunks[0].kind(), ChunkKind::Header);
        assert_eq!(log.chunks[3].position(), 3);
    }

    #[test]
    fn encoder_failure_still_finalizes_writer() {
        let (writer, log) = writer();
        let encoder = Box::new(EchoEncoder {
            started: false,
            position: 0,
            fail_finish: true,
        });
        let mut pipeline = Pipeline::streaming(encoder, writer);
        pipeline.open().unwrap();
        pipeline.push(RawFrame::from_bytes(vec![1])).unwrap();

        let err = pipeline.finalize().unwrap_err();
        assert!(matches!(err, WriteError::Encode(_)));
        assert!(log.lock().finalized);
    }
}
