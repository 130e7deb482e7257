//! Trial Recorder - audio capture for experiment runners
//!
//! Records one audio input device into a WAV, FLAC or Ogg/Opus file while
//! a host drives the recording through prepare, start and stop calls.
//!
//! # Architecture
//!
//! The crate follows hexagonal (ports & adapters) architecture:
//!
//! - **Domain**: Audio formats, output targets, session state, config values
//! - **Application**: Recording session, pipeline, registry and port traits
//! - **Infrastructure**: Adapters for cpal devices, codecs, container files and config
//! - **CLI**: Command-line interface, argument parsing, and signal handling

pub mod application;
pub mod cli;
pub mod domain;
pub mod infrastructure;
