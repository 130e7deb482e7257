//! Recorder service: prepare, run and stop recordings for a host process

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::domain::recording::{AudioFormat, ExistingFileAction, OutputTarget};

use super::error::RecorderError;
use super::ports::{DeviceSource, PipelineFactory};
use super::registry::SessionRegistry;
use super::session::{RecordingSession, RecordingSummary, SessionOptions};

/// What the host asks to record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordingRequest {
    /// Output path, absolute or relative to the service base directory
    pub output: PathBuf,
    pub format: AudioFormat,
    /// Input device name; overrides the service default when set
    pub device: Option<String>,
    pub if_exists: ExistingFileAction,
    /// When false the prepared recording does nothing
    pub enabled: bool,
}

impl RecordingRequest {
    pub fn new(output: impl Into<PathBuf>, format: AudioFormat) -> Self {
        Self {
            output: output.into(),
            format,
            device: None,
            if_exists: ExistingFileAction::default(),
            enabled: true,
        }
    }
}

/// Result of `prepare`
#[derive(Debug, Clone)]
pub enum PreparedRecording {
    Session(Arc<RecordingSession>),
    /// Recording switched off; start and stop are no-ops
    Disabled,
}

impl PreparedRecording {
    pub fn session(&self) -> Option<&Arc<RecordingSession>> {
        match self {
            Self::Session(session) => Some(session),
            Self::Disabled => None,
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.session().map(|session| session.path())
    }

    pub fn is_recording(&self) -> bool {
        self.session()
            .map(|session| session.is_recording())
            .unwrap_or(false)
    }

    pub fn is_disabled(&self) -> bool {
        matches!(self, Self::Disabled)
    }

    pub fn summary(&self) -> Option<RecordingSummary> {
        self.session().and_then(|session| session.summary())
    }
}

/// Entry point for hosts that drive recordings across a trial sequence
pub struct RecorderService {
    source: Arc<dyn DeviceSource>,
    factory: Arc<dyn PipelineFactory>,
    registry: Arc<SessionRegistry>,
    options: SessionOptions,
    base_dir: PathBuf,
    disabled: AtomicBool,
}

impl RecorderService {
    pub fn new(
        source: Arc<dyn DeviceSource>,
        factory: Arc<dyn PipelineFactory>,
        registry: Arc<SessionRegistry>,
        options: SessionOptions,
        base_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            source,
            factory,
            registry,
            options,
            base_dir: base_dir.into(),
            disabled: AtomicBool::new(false),
        }
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Resolve the output and build an idle session for it.
    ///
    /// Fails with `Concurrency` while another recording is running.
    pub fn prepare(&self, request: RecordingRequest) -> Result<PreparedRecording, RecorderError> {
        if self.registry.is_recording() {
            return Err(RecorderError::Concurrency);
        }

        if !request.enabled {
            tracing::debug!("Recording disabled; preparing a no-op recorder");
            self.disabled.store(true, Ordering::Relaxed);
            return Ok(PreparedRecording::Disabled);
        }
        self.disabled.store(false, Ordering::Relaxed);

        let target = OutputTarget::resolve(
            &self.base_dir,
            &request.output,
            request.format,
            request.if_exists,
        );
        tracing::debug!("Resolved output to {}", target.path().display());

        let pipeline = self.factory.build(&target)?;

        let mut options = self.options.clone();
        if request.device.is_some() {
            options.device = request.device;
        }

        let session = RecordingSession::new(target, Arc::clone(&self.source), pipeline, options);
        Ok(PreparedRecording::Session(Arc::new(session)))
    }

    /// Start a prepared recording and register it as the active one
    pub fn run(&self, prepared: &PreparedRecording) -> Result<(), RecorderError> {
        match prepared {
            PreparedRecording::Session(session) => self.registry.start(session),
            PreparedRecording::Disabled => Ok(()),
        }
    }

    /// Stop the active recording
    pub fn stop(&self) -> Result<(), RecorderError> {
        match self.registry.stop_active() {
            Err(RecorderError::NoActiveSession) if self.disabled.load(Ordering::Relaxed) => Ok(()),
            other => other,
        }
    }

    pub fn is_recording(&self) -> bool {
        self.registry.is_recording()
    }
}

impl std::fmt::Debug for RecorderService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecorderService")
            .field("base_dir", &self.base_dir)
            .field("options", &self.options)
            .field("recording", &self.is_recording())
            .finish()
    }
}
