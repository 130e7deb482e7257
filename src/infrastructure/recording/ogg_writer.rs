//! Ogg page writer for Opus packets

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use ogg::writing::{PacketWriteEndInfo, PacketWriter};

use crate::application::ports::{ContainerWriter, WriteError};
use crate::domain::recording::{ChunkKind, Container, EncodedChunk};

/// Writes header packets on their own pages and audio packets as they
/// arrive. One audio packet is held back so the last one can carry the
/// end-of-stream flag.
pub struct OggWriter {
    path: PathBuf,
    serial: u32,
    writer: Option<PacketWriter<'static, BufWriter<File>>>,
    held: Option<EncodedChunk>,
}

impl OggWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            serial: rand_serial(),
            writer: None,
            held: None,
        }
    }

    fn write_packet(
        &mut self,
        chunk: EncodedChunk,
        end_info: PacketWriteEndInfo,
    ) -> Result<(), WriteError> {
        let writer = self.writer.as_mut().ok_or_else(|| WriteError::NotOpen {
            path: self.path.clone(),
        })?;
        let position = chunk.position();
        writer
            .write_packet(chunk.into_bytes(), self.serial, end_info, position)
            .map_err(|e| WriteError::io(&self.path, e))
    }
}

impl ContainerWriter for OggWriter {
    fn container(&self) -> Container {
        Container::Ogg
    }

    fn open(&mut self) -> Result<(), WriteError> {
        let file = File::create(&self.path).map_err(|e| WriteError::io(&self.path, e))?;
        self.writer = Some(PacketWriter::new(BufWriter::new(file)));
        Ok(())
    }

    fn write_chunk(&mut self, chunk: EncodedChunk) -> Result<(), WriteError> {
        match chunk.kind() {
            ChunkKind::Header => self.write_packet(chunk, PacketWriteEndInfo::EndPage),
            ChunkKind::Audio => match self.held.replace(chunk) {
                Some(previous) => self.write_packet(previous, PacketWriteEndInfo::NormalPacket),
                None => Ok(()),
            },
        }
    }

    fn finalize(mut self: Box<Self>) -> Result<u64, WriteError> {
        if let Some(last) = self.held.take() {
            self.write_packet(last, PacketWriteEndInfo::EndStream)?;
        }

        let writer = self.writer.take().ok_or_else(|| WriteError::NotOpen {
            path: self.path.clone(),
        })?;
        let mut inner = writer.into_inner();
        inner.flush().map_err(|e| WriteError::io(&self.path, e))?;
        drop(inner);

        let size = std::fs::metadata(&self.path)
            .map_err(|e| WriteError::io(&self.path, e))?
            .len();
        Ok(size)
    }
}

/// Generate a pseudo-random serial number for the Ogg stream
fn rand_serial() -> u32 {
    use std::time::{SystemTime, UNIX_EPOCH};
    let duration = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    (duration.as_secs() as u32) ^ duration.subsec_nanos()
}
