//! Recording infrastructure module
//!
//! Container writers and codec encoders behind the pipeline ports.
//! WAV is buffered and written at stop; FLAC and Ogg/Opus stream
//! through an encoder.

mod factory;
mod flac_encoder;
mod flac_writer;
#[cfg(feature = "opus")]
mod ogg_writer;
#[cfg(feature = "opus")]
mod opus_encoder;
mod wav_writer;

pub use factory::ContainerFactory;
pub use flac_encoder::FlacEncoder;
pub use flac_writer::FlacWriter;
#[cfg(feature = "opus")]
pub use ogg_writer::OggWriter;
#[cfg(feature = "opus")]
pub use opus_encoder::{opus_head, opus_tags, OpusEncoder, GRANULE_RATE};
pub use wav_writer::{wav_header, WavWriter, WAV_HEADER_SIZE};
