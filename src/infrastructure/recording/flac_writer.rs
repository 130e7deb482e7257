//! FLAC file writer
//!
//! Frames are appended as the encoder produces them. At finalize the
//! STREAMINFO body is rewritten in place with the total sample count and
//! the smallest and largest frame sizes seen.

use std::fs::File;
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::PathBuf;

use crate::application::ports::{ContainerWriter, WriteError};
use crate::domain::recording::{AudioFormat, ChunkKind, Container, EncodedChunk};

use super::flac_encoder::{stream_info_block, STREAM_HEADER_SIZE, STREAM_INFO_OFFSET};

pub struct FlacWriter {
    path: PathBuf,
    format: AudioFormat,
    file: Option<BufWriter<File>>,
    written: u64,
    /// The stream opened with our own STREAMINFO and can be patched
    patchable: bool,
    min_frame: u32,
    max_frame: u32,
    total_samples: u64,
}

impl FlacWriter {
    pub fn new(path: impl Into<PathBuf>, format: AudioFormat) -> Self {
        Self {
            path: path.into(),
            format,
            file: None,
            written: 0,
            patchable: false,
            min_frame: u32::MAX,
            max_frame: 0,
            total_samples: 0,
        }
    }

    fn frame_sizes(&self) -> (u32, u32) {
        if self.max_frame == 0 {
            (0, 0)
        } else {
            (self.min_frame, self.max_frame)
        }
    }
}

impl ContainerWriter for FlacWriter {
    fn container(&self) -> Container {
        Container::Flac
    }

    fn open(&mut self) -> Result<(), WriteError> {
        let file = File::create(&self.path).map_err(|e| WriteError::io(&self.path, e))?;
        self.file = Some(BufWriter::new(file));
        Ok(())
    }

    fn write_chunk(&mut self, chunk: EncodedChunk) -> Result<(), WriteError> {
        let file = self.file.as_mut().ok_or_else(|| WriteError::NotOpen {
            path: self.path.clone(),
        })?;
        file.write_all(chunk.as_bytes())
            .map_err(|e| WriteError::io(&self.path, e))?;

        match chunk.kind() {
            ChunkKind::Header => {
                if self.written == 0 && chunk.len() == STREAM_HEADER_SIZE {
                    self.patchable = true;
                }
            }
            ChunkKind::Audio => {
                let len = u32::try_from(chunk.len()).unwrap_or(u32::MAX);
                self.min_frame = self.min_frame.min(len);
                self.max_frame = self.max_frame.max(len);
                self.total_samples = chunk.position();
            }
        }
        self.written += chunk.len() as u64;
        Ok(())
    }

    fn finalize(self: Box<Self>) -> Result<u64, WriteError> {
        let frame_sizes = self.frame_sizes();
        let FlacWriter {
            path,
            format,
            file,
            written,
            patchable,
            total_samples,
            ..
        } = *self;
        let mut file = file.ok_or_else(|| WriteError::NotOpen { path: path.clone() })?;

        let io = |e| WriteError::io(&path, e);
        if patchable && total_samples > 0 {
            let block = stream_info_block(&format, frame_sizes, total_samples);
            file.seek(SeekFrom::Start(STREAM_INFO_OFFSET)).map_err(io)?;
            file.write_all(&block).map_err(io)?;
            file.seek(SeekFrom::End(0)).map_err(io)?;
        }
        file.flush().map_err(io)?;

        Ok(written)
    }
}
