//! Opus encoder producing Ogg-ready packets
//!
//! Opus runs at 8/12/16/24/48 kHz. Other device rates (44100, 22050,
//! 11025) are resampled to 48 kHz with rubato; the OpusHead still records
//! the original input rate.

use rubato::{FftFixedIn, Resampler};

use crate::application::ports::{EncodeError, Encoder};
use crate::domain::recording::{AudioFormat, Channels, ChunkKind, EncodedChunk, RawFrame};

/// Rate of Ogg/Opus granule positions
pub const GRANULE_RATE: u32 = 48000;

/// Rates the codec accepts without resampling
const NATIVE_RATES: &[u32] = &[8000, 12000, 16000, 24000, 48000];

/// Packet duration in milliseconds
const FRAME_MS: u32 = 20;

/// Granule advance per packet
const GRANULE_PER_PACKET: u64 = (GRANULE_RATE / 1000 * FRAME_MS) as u64;

/// Max Opus packet size
const MAX_PACKET_BYTES: usize = 4000;

/// Resampler input chunk size in frames
const RESAMPLER_CHUNK: usize = 1024;

const VENDOR: &[u8] = b"trial-recorder";

/// Build the OpusHead identification packet.
///
/// `pre_skip` is the encoder delay in 48 kHz samples.
pub fn opus_head(format: &AudioFormat, pre_skip: u16) -> Vec<u8> {
    let mut id_header = Vec::with_capacity(19);
    id_header.extend_from_slice(b"OpusHead");
    id_header.push(1); // Version
    id_header.push(format.channel_count() as u8);
    id_header.extend_from_slice(&pre_skip.to_le_bytes());
    id_header.extend_from_slice(&format.sample_rate().to_le_bytes());
    id_header.extend_from_slice(&0i16.to_le_bytes()); // Output gain
    id_header.push(0); // Channel mapping family
    id_header
}

/// Build the OpusTags comment packet
pub fn opus_tags() -> Vec<u8> {
    let mut comment_header = Vec::new();
    comment_header.extend_from_slice(b"OpusTags");
    comment_header.extend_from_slice(&(VENDOR.len() as u32).to_le_bytes());
    comment_header.extend_from_slice(VENDOR);
    comment_header.extend_from_slice(&0u32.to_le_bytes()); // No user comments
    comment_header
}

/// Per-channel FFT resampler with its pending input
struct ChannelResampler {
    inner: FftFixedIn<f32>,
    input: Vec<Vec<f32>>,
}

impl ChannelResampler {
    fn new(from_rate: u32, channels: usize) -> Result<Self, EncodeError> {
        let inner = FftFixedIn::<f32>::new(
            from_rate as usize,
            GRANULE_RATE as usize,
            RESAMPLER_CHUNK,
            2,
            channels,
        )
        .map_err(|e| EncodeError::Config(format!("Resampler init failed: {}", e)))?;
        Ok(Self {
            inner,
            input: vec![Vec::new(); channels],
        })
    }

    /// Queue interleaved samples; returns interleaved output ready so far
    fn push(&mut self, interleaved: &[i16]) -> Result<Vec<i16>, EncodeError> {
        let channels = self.input.len();
        for frame in interleaved.chunks_exact(channels) {
            for (channel, &sample) in frame.iter().enumerate() {
                self.input[channel].push(sample as f32 / 32768.0);
            }
        }

        let mut output = Vec::new();
        loop {
            let needed = self.inner.input_frames_next();
            if self.input[0].len() < needed {
                break;
            }
            let chunk: Vec<Vec<f32>> = self
                .input
                .iter_mut()
                .map(|channel| channel.drain(..needed).collect())
                .collect();
            self.process(&chunk, &mut output)?;
        }
        Ok(output)
    }

    /// Pad what is left and push one extra chunk of silence through so the
    /// filter delay is flushed
    fn flush(&mut self) -> Result<Vec<i16>, EncodeError> {
        let mut output = Vec::new();
        for _ in 0..2 {
            let needed = self.inner.input_frames_next();
            let chunk: Vec<Vec<f32>> = self
                .input
                .iter_mut()
                .map(|channel| {
                    let mut padded: Vec<f32> = std::mem::take(channel);
                    padded.resize(needed, 0.0);
                    padded
                })
                .collect();
            self.process(&chunk, &mut output)?;
        }
        Ok(output)
    }

    fn process(&mut self, chunk: &[Vec<f32>], output: &mut Vec<i16>) -> Result<(), EncodeError> {
        let resampled = self
            .inner
            .process(chunk, None)
            .map_err(|e| EncodeError::Resample(e.to_string()))?;
        let frames = resampled.first().map(|c| c.len()).unwrap_or(0);
        for i in 0..frames {
            for channel in &resampled {
                output.push((channel[i].clamp(-1.0, 1.0) * 32767.0) as i16);
            }
        }
        Ok(())
    }
}

/// Streaming Opus encoder emitting OpusHead, OpusTags and 20 ms packets
pub struct OpusEncoder {
    format: AudioFormat,
    encoder: opus::Encoder,
    channels: usize,
    /// Interleaved samples per packet at the encoder rate
    packet_len: usize,
    encode_rate: u32,
    resampler: Option<ChannelResampler>,
    /// Interleaved samples at the encoder rate awaiting a full packet
    pending: Vec<i16>,
    /// Per-channel samples received from the device
    input_frames: u64,
    /// Per-channel samples handed to `pending`
    queued_frames: u64,
    /// Encoder delay at the encoder rate, per channel
    lookahead: usize,
    /// Encoder delay at the granule rate
    pre_skip: u16,
    granule: u64,
    headers_sent: bool,
}

impl OpusEncoder {
    pub fn new(format: AudioFormat) -> Result<Self, EncodeError> {
        let channels = format.channel_count() as usize;
        let (encode_rate, resampler) = if NATIVE_RATES.contains(&format.sample_rate()) {
            (format.sample_rate(), None)
        } else {
            (
                GRANULE_RATE,
                Some(ChannelResampler::new(format.sample_rate(), channels)?),
            )
        };

        let opus_channels = match format.channels() {
            Channels::Mono => opus::Channels::Mono,
            Channels::Stereo => opus::Channels::Stereo,
        };
        let mut encoder = opus::Encoder::new(encode_rate, opus_channels, opus::Application::Audio)
            .map_err(|e| EncodeError::Config(e.to_string()))?;
        encoder
            .set_vbr(true)
            .map_err(|e| EncodeError::Config(e.to_string()))?;
        let lookahead = encoder
            .get_lookahead()
            .map_err(|e| EncodeError::Config(e.to_string()))?
            .max(0) as usize;
        let pre_skip = u16::try_from(lookahead as u64 * GRANULE_RATE as u64 / encode_rate as u64)
            .map_err(|_| EncodeError::Config(format!("Encoder delay too large: {}", lookahead)))?;

        tracing::debug!(
            "Opus encoder at {} Hz for {} input{}, pre-skip {}",
            encode_rate,
            format,
            if resampler.is_some() { " (resampled)" } else { "" },
            pre_skip
        );

        Ok(Self {
            format,
            encoder,
            channels,
            packet_len: (encode_rate / 1000 * FRAME_MS) as usize * channels,
            encode_rate,
            resampler,
            pending: Vec::new(),
            input_frames: 0,
            queued_frames: 0,
            lookahead,
            pre_skip,
            granule: u64::from(pre_skip),
            headers_sent: false,
        })
    }

    fn headers(&mut self, out: &mut Vec<EncodedChunk>) {
        if !self.headers_sent {
            self.headers_sent = true;
            out.push(EncodedChunk::header(opus_head(&self.format, self.pre_skip)));
            out.push(EncodedChunk::header(opus_tags()));
        }
    }

    fn queue(&mut self, samples: Vec<i16>) {
        self.queued_frames += (samples.len() / self.channels) as u64;
        self.pending.extend(samples);
    }

    fn encode_packet(&mut self, pcm: &[i16]) -> Result<EncodedChunk, EncodeError> {
        let mut packet = vec![0u8; MAX_PACKET_BYTES];
        let len = self
            .encoder
            .encode(pcm, &mut packet)
            .map_err(|e| EncodeError::Encode(e.to_string()))?;
        packet.truncate(len);
        self.granule += GRANULE_PER_PACKET;
        Ok(EncodedChunk::audio(packet, self.granule))
    }

    fn drain_packets(&mut self, out: &mut Vec<EncodedChunk>) -> Result<(), EncodeError> {
        while self.pending.len() >= self.packet_len {
            let pcm: Vec<i16> = self.pending.drain(..self.packet_len).collect();
            out.push(self.encode_packet(&pcm)?);
        }
        Ok(())
    }

    /// Granule position of the last real sample, after the encoder delay
    fn end_granule(&self) -> u64 {
        u64::from(self.pre_skip)
            + self.input_frames * GRANULE_RATE as u64 / self.format.sample_rate() as u64
    }
}

impl Encoder for OpusEncoder {
    fn encode(&mut self, frame: RawFrame) -> Result<Vec<EncodedChunk>, EncodeError> {
        let mut out = Vec::new();
        self.headers(&mut out);

        let samples: Vec<i16> = frame.samples().collect();
        self.input_frames += (samples.len() / self.channels) as u64;

        let ready = match self.resampler.as_mut() {
            Some(resampler) => resampler.push(&samples)?,
            None => samples,
        };
        self.queue(ready);
        self.drain_packets(&mut out)?;
        Ok(out)
    }

    fn finish(mut self: Box<Self>) -> Result<Vec<EncodedChunk>, EncodeError> {
        let mut out = Vec::new();
        self.headers(&mut out);

        if let Some(mut resampler) = self.resampler.take() {
            let tail = resampler.flush()?;
            self.queue(tail);
        }

        // Drop resampler padding beyond the real audio
        let expected = self.input_frames * self.encode_rate as u64 / self.format.sample_rate() as u64;
        if self.queued_frames > expected {
            let excess = ((self.queued_frames - expected) as usize) * self.channels;
            let keep = self.pending.len().saturating_sub(excess);
            self.pending.truncate(keep);
            self.queued_frames = expected;
        }

        // Push the delayed tail out of the encoder
        let padded = self.pending.len() + self.lookahead * self.channels;
        self.pending.resize(padded, 0);

        self.drain_packets(&mut out)?;
        if !self.pending.is_empty() || self.granule == u64::from(self.pre_skip) {
            let mut pcm = std::mem::take(&mut self.pending);
            pcm.resize(self.packet_len, 0);
            out.push(self.encode_packet(&pcm)?);
        }

        // Last packet's granule marks where real audio ends
        let end = self.end_granule();
        let previous = self.granule.saturating_sub(GRANULE_PER_PACKET);
        if let Some(last) = out.pop() {
            let last = match last.kind() {
                ChunkKind::Audio => last.with_position(end.clamp(previous, self.granule)),
                ChunkKind::Header => last,
            };
            out.push(last);
        }

        tracing::debug!("Opus stream ends at granule {}", end);
        Ok(out)
    }
}
