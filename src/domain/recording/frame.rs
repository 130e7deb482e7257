//! Captured and encoded audio chunks

use super::format::BYTES_PER_SAMPLE;

/// One chunk of interleaved little-endian i16 PCM as delivered by a device.
///
/// Immutable once created; ownership moves from the device handle to the
/// consumer on capture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    bytes: Vec<u8>,
}

impl RawFrame {
    /// Wrap raw PCM bytes
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    /// Serialize i16 samples as little-endian PCM
    pub fn from_samples(samples: &[i16]) -> Self {
        let mut bytes = Vec::with_capacity(samples.len() * BYTES_PER_SAMPLE);
        for sample in samples {
            bytes.extend_from_slice(&sample.to_le_bytes());
        }
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Decode the PCM payload; a trailing odd byte is ignored
    pub fn samples(&self) -> impl Iterator<Item = i16> + '_ {
        self.bytes
            .chunks_exact(BYTES_PER_SAMPLE)
            .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
    }
}

/// Role of an encoded chunk inside its container
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkKind {
    /// Stream headers that must sit on their own page/at the start
    Header,
    /// Audio payload
    Audio,
}

/// An immutable run of codec bytes, written in the order it was produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedChunk {
    bytes: Vec<u8>,
    kind: ChunkKind,
    /// Codec-defined stream position after this chunk (Ogg granule)
    position: u64,
}

impl EncodedChunk {
    pub fn header(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            kind: ChunkKind::Header,
            position: 0,
        }
    }

    pub fn audio(bytes: Vec<u8>, position: u64) -> Self {
        Self {
            bytes,
            kind: ChunkKind::Audio,
            position,
        }
    }

    /// Uncompressed PCM payload, as drained from a frame buffer
    pub fn pcm(bytes: Vec<u8>) -> Self {
        let position = bytes.len() as u64;
        Self::audio(bytes, position)
    }

    /// Same payload at a corrected stream position
    pub fn with_position(self, position: u64) -> Self {
        Self { position, ..self }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn kind(&self) -> ChunkKind {
        self.kind
    }

    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_samples_is_little_endian() {
        let frame = RawFrame::from_samples(&[1, -2]);
        assert_eq!(frame.as_bytes(), &[0x01, 0x00, 0xFE, 0xFF]);
        assert_eq!(frame.samples().collect::<Vec<_>>(), vec![1, -2]);
    }

    #[test]
    fn odd_trailing_byte_ignored() {
        let frame = RawFrame::from_bytes(vec![0x10, 0x00, 0x7F]);
        assert_eq!(frame.len(), 3);
        assert_eq!(frame.samples().count(), 1);
    }

    #[test]
    fn chunk_kinds() {
        assert_eq!(EncodedChunk::header(vec![1]).kind(), ChunkKind::Header);
        let pcm = EncodedChunk::pcm(vec![0; 8]);
        assert_eq!(pcm.kind(), ChunkKind::Audio);
        assert_eq!(pcm.position(), 8);
    }
}
