//! Pipeline selection per codec

use crate::application::error::RecorderError;
use crate::application::pipeline::Pipeline;
use crate::application::ports::PipelineFactory;
use crate::domain::recording::{Codec, OutputTarget};

use super::flac_encoder::FlacEncoder;
use super::flac_writer::FlacWriter;
use super::wav_writer::WavWriter;

/// Builds the buffered WAV pipeline or a streaming encoder pipeline
#[derive(Debug, Default, Clone, Copy)]
pub struct ContainerFactory;

impl ContainerFactory {
    pub fn new() -> Self {
        Self
    }

    /// Whether this build can produce `codec`
    pub fn supports(codec: Codec) -> bool {
        match codec {
            Codec::Wav | Codec::Flac => true,
            Codec::Opus => cfg!(feature = "opus"),
        }
    }
}

impl PipelineFactory for ContainerFactory {
    fn build(&self, target: &OutputTarget) -> Result<Pipeline, RecorderError> {
        let format = target.format();
        let path = target.path();

        match format.codec() {
            Codec::Wav => Ok(Pipeline::buffered(Box::new(WavWriter::new(path, format)))),
            Codec::Flac => {
                let encoder = FlacEncoder::new(format)
                    .map_err(|e| RecorderError::UnsupportedFormat(e.to_string()))?;
                Ok(Pipeline::streaming(
                    Box::new(encoder),
                    Box::new(FlacWriter::new(path, format)),
                ))
            }
            Codec::Opus => build_opus(target),
        }
    }
}

#[cfg(feature = "opus")]
fn build_opus(target: &OutputTarget) -> Result<Pipeline, RecorderError> {
    use super::ogg_writer::OggWriter;
    use super::opus_encoder::OpusEncoder;

    let encoder = OpusEncoder::new(target.format())
        .map_err(|e| RecorderError::UnsupportedFormat(e.to_string()))?;
    Ok(Pipeline::streaming(
        Box::new(encoder),
        Box::new(OggWriter::new(target.path())),
    ))
}

#[cfg(not(feature = "opus"))]
fn build_opus(_target: &OutputTarget) -> Result<Pipeline, RecorderError> {
    Err(RecorderError::UnsupportedFormat(
        "opus support is not compiled in (rebuild with --features opus)".to_string(),
    ))
}
