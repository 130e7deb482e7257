//! Pipeline construction port

use crate::application::error::RecorderError;
use crate::application::pipeline::Pipeline;
use crate::domain::recording::OutputTarget;

/// Port for building the accumulation/encoding pipeline of a target.
///
/// Fails with `RecorderError::UnsupportedFormat` when the codec is not
/// available in this build or the channel/rate combination is rejected.
pub trait PipelineFactory: Send + Sync {
    fn build(&self, target: &OutputTarget) -> Result<Pipeline, RecorderError>;
}
