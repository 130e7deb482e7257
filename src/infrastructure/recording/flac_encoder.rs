//! Streaming FLAC encoder
//!
//! Samples are encoded one fixed-size block at a time as they arrive. The
//! STREAMINFO sent ahead of the first frame leaves the sample count and
//! frame sizes unset; `FlacWriter` fills them in at finalize.

use flacenc::bitsink::ByteSink;
use flacenc::component::{BitRepr, StreamInfo};
use flacenc::config;
use flacenc::constant::MIN_BLOCK_SIZE;
use flacenc::error::{Verified, Verify};
use flacenc::source::{Fill, FrameBuf};

use crate::application::ports::{EncodeError, Encoder};
use crate::domain::recording::{AudioFormat, EncodedChunk, RawFrame};

/// Samples per channel in every frame but the last
pub const BLOCK_SIZE: usize = 4096;

/// `fLaC` marker, metadata block header and STREAMINFO body
pub const STREAM_HEADER_SIZE: usize = 42;

/// Offset of the STREAMINFO body inside the stream
pub const STREAM_INFO_OFFSET: u64 = 8;

const STREAM_INFO_LEN: usize = 34;

/// Largest value of the 24-bit frame size fields
const MAX_FRAME_SIZE_FIELD: u32 = 0xFF_FFFF;

/// STREAMINFO body.
///
/// `frame_sizes` of `(0, 0)` and a zero `total_samples` mean unknown.
/// The MD5 signature is always left unset.
pub fn stream_info_block(
    format: &AudioFormat,
    frame_sizes: (u32, u32),
    total_samples: u64,
) -> [u8; STREAM_INFO_LEN] {
    let mut block = [0u8; STREAM_INFO_LEN];
    let block_size = BLOCK_SIZE as u16;
    block[0..2].copy_from_slice(&block_size.to_be_bytes());
    block[2..4].copy_from_slice(&block_size.to_be_bytes());

    let (min_frame, max_frame) = frame_sizes;
    block[4..7].copy_from_slice(&min_frame.min(MAX_FRAME_SIZE_FIELD).to_be_bytes()[1..]);
    block[7..10].copy_from_slice(&max_frame.min(MAX_FRAME_SIZE_FIELD).to_be_bytes()[1..]);

    // 20 bits rate, 3 bits channels-1, 5 bits bps-1, 36 bits total samples
    let rate = u64::from(format.sample_rate()) & 0xF_FFFF;
    let channels = u64::from(format.channel_count() - 1) & 0x7;
    let bps = u64::from(format.sample_width_bits() - 1) & 0x1F;
    let total = total_samples & 0xF_FFFF_FFFF;
    let packed = (rate << 44) | (channels << 41) | (bps << 36) | total;
    block[10..18].copy_from_slice(&packed.to_be_bytes());
    block
}

/// `fLaC` marker plus a lone STREAMINFO block with nothing counted yet
pub fn stream_header(format: &AudioFormat) -> Vec<u8> {
    let mut out = Vec::with_capacity(STREAM_HEADER_SIZE);
    out.extend_from_slice(b"fLaC");
    // Last-metadata-block flag, type 0 (STREAMINFO), length 34
    out.extend_from_slice(&[0x80, 0x00, 0x00, STREAM_INFO_LEN as u8]);
    out.extend_from_slice(&stream_info_block(format, (0, 0), 0));
    out
}

fn verified(encoder: config::Encoder) -> Result<Verified<config::Encoder>, EncodeError> {
    encoder
        .into_verified()
        .map_err(|(_, e)| EncodeError::Config(format!("{:?}", e)))
}

pub struct FlacEncoder {
    format: AudioFormat,
    channels: usize,
    config: Verified<config::Encoder>,
    /// Verbatim coding for a tail block too short for prediction
    tail_config: Verified<config::Encoder>,
    stream_info: StreamInfo,
    framebuf: FrameBuf,
    /// Interleaved samples short of a full block
    pending: Vec<i32>,
    frame_number: usize,
    /// Per-channel samples encoded so far
    encoded: u64,
    header_sent: bool,
}

impl FlacEncoder {
    pub fn new(format: AudioFormat) -> Result<Self, EncodeError> {
        let channels = format.channel_count() as usize;

        let mut encoder = config::Encoder::default();
        encoder.block_size = BLOCK_SIZE;
        let mut tail = encoder.clone();
        tail.subframe_coding.use_fixed = false;
        tail.subframe_coding.use_lpc = false;

        let stream_info = StreamInfo::new(
            format.sample_rate() as usize,
            channels,
            format.sample_width_bits() as usize,
        )
        .map_err(|e| EncodeError::Config(format!("{:?}", e)))?;
        let framebuf = FrameBuf::with_size(channels, BLOCK_SIZE)
            .map_err(|e| EncodeError::Config(format!("{:?}", e)))?;

        Ok(Self {
            format,
            channels,
            config: verified(encoder)?,
            tail_config: verified(tail)?,
            stream_info,
            framebuf,
            pending: Vec::with_capacity(BLOCK_SIZE * channels),
            frame_number: 0,
            encoded: 0,
            header_sent: false,
        })
    }

    fn header(&mut self, out: &mut Vec<EncodedChunk>) {
        if !self.header_sent {
            self.header_sent = true;
            out.push(EncodedChunk::header(stream_header(&self.format)));
        }
    }

    /// Encode one block of interleaved samples into a FLAC frame
    fn encode_block(&mut self, interleaved: &[i32]) -> Result<EncodedChunk, EncodeError> {
        let block_size = interleaved.len() / self.channels;
        if self.framebuf.size() != block_size {
            self.framebuf.resize(block_size);
        }
        self.framebuf
            .fill_interleaved(interleaved)
            .map_err(|e| EncodeError::Encode(format!("{:?}", e)))?;

        let config = if block_size < MIN_BLOCK_SIZE {
            &self.tail_config
        } else {
            &self.config
        };
        let frame = flacenc::encode_fixed_size_frame(
            config,
            &self.framebuf,
            self.frame_number,
            &self.stream_info,
        )
        .map_err(|e| EncodeError::Encode(format!("{:?}", e)))?;

        let mut sink = ByteSink::new();
        frame
            .write(&mut sink)
            .map_err(|e| EncodeError::Encode(e.to_string()))?;

        self.frame_number += 1;
        self.encoded += block_size as u64;
        Ok(EncodedChunk::audio(sink.into_inner(), self.encoded))
    }
}

impl Encoder for FlacEncoder {
    fn encode(&mut self, frame: RawFrame) -> Result<Vec<EncodedChunk>, EncodeError> {
        let mut out = Vec::new();
        self.header(&mut out);

        self.pending.extend(frame.samples().map(i32::from));
        let block_len = BLOCK_SIZE * self.channels;
        while self.pending.len() >= block_len {
            let block: Vec<i32> = self.pending.drain(..block_len).collect();
            out.push(self.encode_block(&block)?);
        }
        Ok(out)
    }

    fn finish(mut self: Box<Self>) -> Result<Vec<EncodedChunk>, EncodeError> {
        let mut out = Vec::new();
        self.header(&mut out);

        let mut tail = std::mem::take(&mut self.pending);
        tail.truncate(tail.len() - tail.len() % self.channels);
        if !tail.is_empty() {
            out.push(self.encode_block(&tail)?);
        }

        tracing::debug!(
            "FLAC stream holds {} samples per channel in {} frames",
            self.encoded,
            self.frame_number
        );
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::domain::recording::{Channels, ChunkKind, Codec};

    /// (sample rate, channels, bits per sample, total samples) from STREAMINFO
    fn stream_info(bytes: &[u8]) -> (u32, u16, u16, u64) {
        let mut packed = [0u8; 8];
        packed.copy_from_slice(&bytes[18..26]);
        let packed = u64::from_be_bytes(packed);
        (
            (packed >> 44) as u32,
            ((packed >> 41) & 0x7) as u16 + 1,
            ((packed >> 36) & 0x1F) as u16 + 1,
            packed & 0xF_FFFF_FFFF,
        )
    }

    fn flac_format(channels: Channels, rate: u32) -> AudioFormat {
        AudioFormat::new(channels, rate, Codec::Flac).unwrap()
    }

    fn encode_all(format: AudioFormat, frames: &[Vec<i16>]) -> Vec<EncodedChunk> {
        let mut encoder = Box::new(FlacEncoder::new(format).unwrap());
        let mut chunks = Vec::new();
        for frame in frames {
            chunks.extend(encoder.encode(RawFrame::from_samples(frame)).unwrap());
        }
        chunks.extend(encoder.finish().unwrap());
        chunks
    }

    fn decode(chunks: &[EncodedChunk]) -> Vec<i16> {
        let bytes: Vec<u8> = chunks.iter().flat_map(|c| c.as_bytes().to_vec()).collect();
        let mut reader = claxon::FlacReader::new(Cursor::new(bytes)).unwrap();
        reader.samples().map(|s| s.unwrap() as i16).collect()
    }

    fn noise(len: usize) -> Vec<i16> {
        let mut state = 0x2545_f491u32;
        (0..len)
            .map(|_| {
                state ^= state << 13;
                state ^= state >> 17;
                state ^= state << 5;
                (state >> 16) as i16
            })
            .collect()
    }

    #[test]
    fn header_comes_first() {
        let format = flac_format(Channels::Mono, 44100);
        let chunks = encode_all(format, &[vec![0; 100]]);

        assert_eq!(chunks[0].kind(), ChunkKind::Header);
        let header = chunks[0].as_bytes();
        assert_eq!(header.len(), STREAM_HEADER_SIZE);
        assert_eq!(&header[0..4], b"fLaC");
        assert_eq!(stream_info(header), (44100, 1, 16, 0));
    }

    #[test]
    fn full_blocks_are_emitted_before_finish() {
        let format = flac_format(Channels::Stereo, 11025);
        let mut encoder = Box::new(FlacEncoder::new(format).unwrap());

        // 3000 samples per channel in each frame
        let frame = RawFrame::from_samples(&[7i16; 6000]);
        let first = encoder.encode(frame.clone()).unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].kind(), ChunkKind::Header);

        let second = encoder.encode(frame.clone()).unwrap();
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].kind(), ChunkKind::Audio);
        assert_eq!(second[0].position(), 4096);

        let third = encoder.encode(frame).unwrap();
        assert_eq!(third.len(), 1);
        assert_eq!(third[0].position(), 8192);

        let tail = encoder.finish().unwrap();
        assert_eq!(tail.len(), 1);
        assert_eq!(tail[0].position(), 9000);
    }

    #[test]
    fn decodes_to_exact_input() {
        let format = flac_format(Channels::Stereo, 22050);
        let frames: Vec<Vec<i16>> = (0..5).map(|i| noise(2048 + i)).collect();
        // Keep every frame whole stereo pairs
        let frames: Vec<Vec<i16>> = frames
            .into_iter()
            .map(|mut f| {
                f.truncate(f.len() & !1);
                f
            })
            .collect();
        let expected: Vec<i16> = frames.concat();

        let decoded = decode(&encode_all(format, &frames));
        assert_eq!(decoded.len(), expected.len());
        assert_eq!(decoded, expected);
    }

    #[test]
    fn tiny_tail_block_decodes() {
        let format = flac_format(Channels::Mono, 44100);
        let mut samples = noise(BLOCK_SIZE);
        samples.extend_from_slice(&[5, -5, 300]);

        let chunks = encode_all(format, &[samples.clone()]);
        assert_eq!(chunks.last().unwrap().position(), BLOCK_SIZE as u64 + 3);
        assert_eq!(decode(&chunks), samples);
    }

    #[test]
    fn empty_stream_is_header_only() {
        let format = flac_format(Channels::Stereo, 44100);
        let chunks = Box::new(FlacEncoder::new(format).unwrap()).finish().unwrap();
        assert_eq!(chunks.len(), 1);
        let bytes = chunks[0].as_bytes();
        assert_eq!(bytes.len(), STREAM_HEADER_SIZE);
        assert_eq!(stream_info(bytes), (44100, 2, 16, 0));
    }

    #[test]
    fn stream_info_block_packs_counts() {
        let format = flac_format(Channels::Mono, 11025);
        let block = stream_info_block(&format, (14, 0x1234), 5000);
        assert_eq!(&block[0..4], &[0x10, 0x00, 0x10, 0x00]);
        assert_eq!(&block[4..7], &[0, 0, 14]);
        assert_eq!(&block[7..10], &[0, 0x12, 0x34]);

        let mut header = stream_header(&format);
        header[8..42].copy_from_slice(&block);
        assert_eq!(stream_info(&header), (11025, 1, 16, 5000));
    }
}
