//! Recording domain module

mod duration;
mod format;
mod frame;
mod state;
mod target;

pub use duration::Duration;
pub use format::{
    parse_sample_rate, AudioFormat, Channels, Codec, Container, BYTES_PER_SAMPLE,
    DEFAULT_COMPRESSED_GRACE, DEFAULT_SAMPLE_RATE, SAMPLE_WIDTH_BITS, STANDARD_SAMPLE_RATES,
};
pub use frame::{ChunkKind, EncodedChunk, RawFrame};
pub use state::{InvalidStateTransition, SessionState, SessionStateCell};
pub use target::{next_free_path, with_codec_extension, ExistingFileAction, OutputTarget};
