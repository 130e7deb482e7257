//! RIFF/WAVE container writer
//!
//! Header layout:
//! ```text
//! [0-3]    "RIFF"
//! [4-7]    36 + data_size
//! [8-11]   "WAVE"
//! [12-15]  "fmt "
//! [16-19]  16 (PCM format chunk size)
//! [20-21]  1 (PCM format code)
//! [22-23]  channels
//! [24-27]  sample_rate
//! [28-31]  byte_rate = sample_rate * channels * bit_depth / 8
//! [32-33]  block_align = channels * bit_depth / 8
//! [34-35]  bit_depth
//! [36-39]  "data"
//! [40-43]  data_size
//! ```

use std::fs::File;
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::PathBuf;

use crate::application::ports::{ContainerWriter, WriteError};
use crate::domain::recording::{AudioFormat, Container, EncodedChunk};

/// Size of the RIFF header in bytes
pub const WAV_HEADER_SIZE: usize = 44;

/// Build the 44-byte header for `data_size` bytes of PCM
pub fn wav_header(format: &AudioFormat, data_size: u32) -> [u8; WAV_HEADER_SIZE] {
    let channels = format.channel_count();
    let bit_depth = format.sample_width_bits();

    let mut header = [0u8; WAV_HEADER_SIZE];
    header[0..4].copy_from_slice(b"RIFF");
    header[4..8].copy_from_slice(&riff_chunk_size(data_size).to_le_bytes());
    header[8..12].copy_from_slice(b"WAVE");

    header[12..16].copy_from_slice(b"fmt ");
    header[16..20].copy_from_slice(&16u32.to_le_bytes());
    header[20..22].copy_from_slice(&1u16.to_le_bytes());
    header[22..24].copy_from_slice(&channels.to_le_bytes());
    header[24..28].copy_from_slice(&format.sample_rate().to_le_bytes());
    header[28..32].copy_from_slice(&format.byte_rate().to_le_bytes());
    header[32..34].copy_from_slice(&format.block_align().to_le_bytes());
    header[34..36].copy_from_slice(&bit_depth.to_le_bytes());

    header[36..40].copy_from_slice(b"data");
    header[40..44].copy_from_slice(&data_size.to_le_bytes());
    header
}

fn riff_chunk_size(data_size: u32) -> u32 {
    data_size.saturating_add(36)
}

/// Writes PCM chunks behind a RIFF header.
///
/// The header is emitted with the first chunk and declares that chunk's
/// length. When more data follows, the length fields are patched at
/// finalize.
pub struct WavWriter {
    path: PathBuf,
    format: AudioFormat,
    file: Option<BufWriter<File>>,
    declared_len: Option<u64>,
    data_len: u64,
}

impl WavWriter {
    pub fn new(path: impl Into<PathBuf>, format: AudioFormat) -> Self {
        Self {
            path: path.into(),
            format,
            file: None,
            declared_len: None,
            data_len: 0,
        }
    }

    fn io(&self, source: std::io::Error) -> WriteError {
        WriteError::io(&self.path, source)
    }
}

impl ContainerWriter for WavWriter {
    fn container(&self) -> Container {
        Container::Wav
    }

    fn open(&mut self) -> Result<(), WriteError> {
        let file = File::create(&self.path).map_err(|e| self.io(e))?;
        self.file = Some(BufWriter::new(file));
        Ok(())
    }

    fn write_chunk(&mut self, chunk: EncodedChunk) -> Result<(), WriteError> {
        let len = chunk.len() as u64;
        let header = match self.declared_len {
            None => Some(wav_header(&self.format, clamp_u32(len))),
            Some(_) => None,
        };

        let file = match self.file.as_mut() {
            Some(file) => file,
            None => {
                return Err(WriteError::NotOpen {
                    path: self.path.clone(),
                })
            }
        };
        if let Some(header) = header {
            file.write_all(&header)
                .map_err(|e| WriteError::io(&self.path, e))?;
        }
        file.write_all(chunk.as_bytes())
            .map_err(|e| WriteError::io(&self.path, e))?;

        if self.declared_len.is_none() {
            self.declared_len = Some(len);
        }
        self.data_len += len;
        Ok(())
    }

    fn finalize(self: Box<Self>) -> Result<u64, WriteError> {
        let WavWriter {
            path,
            format,
            file,
            declared_len,
            data_len,
        } = *self;
        let mut file = file.ok_or_else(|| WriteError::NotOpen { path: path.clone() })?;

        let io = |e| WriteError::io(&path, e);
        match declared_len {
            None => file.write_all(&wav_header(&format, 0)).map_err(io)?,
            Some(declared) if declared != data_len => {
                let data_size = clamp_u32(data_len);
                file.seek(SeekFrom::Start(4)).map_err(io)?;
                file.write_all(&riff_chunk_size(data_size).to_le_bytes())
                    .map_err(io)?;
                file.seek(SeekFrom::Start(40)).map_err(io)?;
                file.write_all(&data_size.to_le_bytes()).map_err(io)?;
                file.seek(SeekFrom::End(0)).map_err(io)?;
            }
            Some(_) => {}
        }
        file.flush().map_err(io)?;

        Ok(WAV_HEADER_SIZE as u64 + data_len)
    }
}

fn clamp_u32(value: u64) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}
