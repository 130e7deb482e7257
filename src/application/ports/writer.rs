//! Container writer port interface

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::domain::recording::{Container, EncodedChunk};

use super::encoder::EncodeError;

/// Output errors. Fatal to the session; the file may be incomplete.
#[derive(Debug, Error)]
pub enum WriteError {
    #[error("Failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Encode(#[from] EncodeError),

    #[error("Output {path} is not open")]
    NotOpen { path: PathBuf },
}

impl WriteError {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Port for serializing audio into a container file.
///
/// `open` creates the file, `write_chunk` appends in production order and
/// `finalize` consumes the writer, completing headers/trailers. Returns the
/// final file size in bytes.
pub trait ContainerWriter: Send {
    fn container(&self) -> Container;

    fn open(&mut self) -> Result<(), WriteError>;

    fn write_chunk(&mut self, chunk: EncodedChunk) -> Result<(), WriteError>;

    fn finalize(self: Box<Self>) -> Result<u64, WriteError>;
}
