//! Recording session: device → pipeline → container on a dedicated worker

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{self, SyncSender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration as StdDuration, Instant};

use parking_lot::Mutex;
use serde::Serialize;

use crate::domain::config::{DEFAULT_POLL_INTERVAL_MS, MAX_POLL_INTERVAL_MS};
use crate::domain::recording::{
    AudioFormat, Container, InvalidStateTransition, OutputTarget, RawFrame, SessionState,
    SessionStateCell,
};

use super::error::RecorderError;
use super::pipeline::Pipeline;
use super::ports::{DeviceHandle, DeviceSource, OpenRequest, DEFAULT_FRAME_SAMPLES};

/// Tuning knobs for one session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOptions {
    /// Upper bound on a single blocking device read
    pub poll_interval: StdDuration,
    /// Time to keep reading after stop; `None` uses the codec default
    pub finalize_grace: Option<StdDuration>,
    /// Samples per channel requested per frame
    pub frame_samples: usize,
    /// Input device name; `None` selects the default device
    pub device: Option<String>,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            poll_interval: StdDuration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            finalize_grace: None,
            frame_samples: DEFAULT_FRAME_SAMPLES,
            device: None,
        }
    }
}

impl SessionOptions {
    fn effective_poll_interval(&self) -> StdDuration {
        self.poll_interval.clamp(
            StdDuration::from_millis(1),
            StdDuration::from_millis(MAX_POLL_INTERVAL_MS),
        )
    }

    fn effective_grace(&self, format: &AudioFormat) -> StdDuration {
        self.finalize_grace
            .unwrap_or_else(|| format.codec().default_finalize_grace())
    }
}

/// Outcome of a stopped session
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordingSummary {
    pub path: PathBuf,
    pub container: Container,
    pub frames: u64,
    pub payload_bytes: u64,
    pub file_bytes: u64,
    pub duration_ms: u64,
}

#[derive(Debug, Default)]
struct CaptureCounters {
    frames: AtomicU64,
    bytes: AtomicU64,
}

impl CaptureCounters {
    fn record(&self, frame: &RawFrame) {
        self.frames.fetch_add(1, Ordering::Relaxed);
        self.bytes.fetch_add(frame.len() as u64, Ordering::Relaxed);
    }
}

/// How the worker thread ended
enum WorkerExit {
    /// Device could not be opened; nothing was created
    Aborted(Pipeline),
    /// Output could not be opened; device already closed
    OutputFailed,
    /// Capture ran; file size or the first error encountered
    Finished(Result<u64, RecorderError>),
}

#[derive(Default)]
struct Control {
    pipeline: Option<Pipeline>,
    worker: Option<JoinHandle<WorkerExit>>,
}

/// One recording from start to stop.
///
/// State machine:
///   IDLE -> RECORDING (start)
///   RECORDING -> STOPPED (stop)
///   IDLE -> STOPPED (output could not be opened)
///
/// A session is single-use. Once stopped, record again with a new session.
pub struct RecordingSession {
    target: OutputTarget,
    source: Arc<dyn DeviceSource>,
    options: SessionOptions,
    state: SessionStateCell,
    stop_flag: Arc<AtomicBool>,
    counters: Arc<CaptureCounters>,
    control: Mutex<Control>,
    summary: Mutex<Option<RecordingSummary>>,
}

impl RecordingSession {
    pub fn new(
        target: OutputTarget,
        source: Arc<dyn DeviceSource>,
        pipeline: Pipeline,
        options: SessionOptions,
    ) -> Self {
        Self {
            target,
            source,
            options,
            state: SessionStateCell::new(),
            stop_flag: Arc::new(AtomicBool::new(false)),
            counters: Arc::new(CaptureCounters::default()),
            control: Mutex::new(Control {
                pipeline: Some(pipeline),
                worker: None,
            }),
            summary: Mutex::new(None),
        }
    }

    pub fn target(&self) -> &OutputTarget {
        &self.target
    }

    pub fn path(&self) -> &Path {
        self.target.path()
    }

    pub fn state(&self) -> SessionState {
        self.state.get()
    }

    /// Lock-free; safe to call from any thread at any rate
    pub fn is_recording(&self) -> bool {
        self.state.is_recording()
    }

    pub fn frames_captured(&self) -> u64 {
        self.counters.frames.load(Ordering::Relaxed)
    }

    pub fn bytes_captured(&self) -> u64 {
        self.counters.bytes.load(Ordering::Relaxed)
    }

    /// Available once the session has stopped
    pub fn summary(&self) -> Option<RecordingSummary> {
        self.summary.lock().clone()
    }

    /// Open the device and output on a new worker and begin capturing.
    ///
    /// Returns once the worker is capturing. A device failure leaves the
    /// session idle so it can be started again; an output failure stops it.
    pub fn start(&self) -> Result<(), RecorderError> {
        let mut control = self.control.lock();

        let current = self.state.get();
        if current != SessionState::Idle {
            return Err(InvalidStateTransition {
                current_state: current,
                action: "start recording".to_string(),
            }
            .into());
        }
        let pipeline = control.pipeline.take().ok_or_else(|| {
            RecorderError::Worker("session has no pipeline to start".to_string())
        })?;

        let mut request = OpenRequest::new(self.target.format());
        request.device = self.options.device.clone();
        request.frame_samples = self.options.frame_samples;

        let worker = CaptureWorker {
            request,
            source: Arc::clone(&self.source),
            stop_flag: Arc::clone(&self.stop_flag),
            counters: Arc::clone(&self.counters),
            poll_interval: self.options.effective_poll_interval(),
            grace: self.options.effective_grace(&self.target.format()),
            path: self.target.path().to_path_buf(),
        };

        let (ready_tx, ready_rx) = mpsc::sync_channel(1);
        let handle = thread::Builder::new()
            .name("capture-worker".to_string())
            .spawn(move || worker.run(pipeline, ready_tx))
            .map_err(|e| RecorderError::Worker(e.to_string()))?;

        match ready_rx.recv() {
            Ok(Ok(())) => {
                self.state.start_recording()?;
                control.worker = Some(handle);
                tracing::info!(
                    "Recording started: {} ({})",
                    self.target.path().display(),
                    self.target.format()
                );
                Ok(())
            }
            Ok(Err(e)) => {
                match handle.join() {
                    Ok(WorkerExit::Aborted(pipeline)) => control.pipeline = Some(pipeline),
                    _ => {
                        self.state.abort()?;
                    }
                }
                Err(e)
            }
            Err(_) => {
                // Worker dropped the channel without reporting: it panicked
                let _ = handle.join();
                self.state.abort()?;
                Err(RecorderError::Worker(
                    "capture worker exited before it was ready".to_string(),
                ))
            }
        }
    }

    /// Signal the worker, wait for it to finalize the output and move to
    /// stopped. A no-op when already stopped.
    ///
    /// Errors raised inside the worker while recording are returned here;
    /// the partial file is still finalized as far as possible.
    pub fn stop(&self) -> Result<(), RecorderError> {
        let mut control = self.control.lock();

        match self.state.get() {
            SessionState::Stopped => return Ok(()),
            SessionState::Idle => {
                return Err(InvalidStateTransition {
                    current_state: SessionState::Idle,
                    action: "stop recording".to_string(),
                }
                .into())
            }
            SessionState::Recording => {}
        }

        self.stop_flag.store(true, Ordering::Release);

        let outcome = match control.worker.take() {
            Some(handle) => match handle.join() {
                Ok(WorkerExit::Finished(result)) => result,
                Ok(_) => Err(RecorderError::Worker(
                    "capture worker ended without recording".to_string(),
                )),
                Err(_) => Err(RecorderError::Worker("capture worker panicked".to_string())),
            },
            None => Err(RecorderError::Worker("no capture worker running".to_string())),
        };

        self.state.stop_recording()?;

        let payload_bytes = self.bytes_captured();
        let file_bytes = match &outcome {
            Ok(size) => *size,
            Err(_) => std::fs::metadata(self.target.path())
                .map(|m| m.len())
                .unwrap_or(0),
        };
        let summary = RecordingSummary {
            path: self.target.path().to_path_buf(),
            container: self.target.container(),
            frames: self.frames_captured(),
            payload_bytes,
            file_bytes,
            duration_ms: self.target.format().duration_of(payload_bytes).as_millis() as u64,
        };
        tracing::info!(
            "Recording stopped: {} frames, {} bytes written to {}",
            summary.frames,
            summary.file_bytes,
            summary.path.display()
        );
        *self.summary.lock() = Some(summary);

        outcome.map(|_| ())
    }
}

impl Drop for RecordingSession {
    fn drop(&mut self) {
        if self.state.is_recording() {
            if let Err(e) = self.stop() {
                tracing::warn!("Stopping recording on cleanup failed: {}", e);
            }
        }
    }
}

impl std::fmt::Debug for RecordingSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordingSession")
            .field("target", &self.target)
            .field("state", &self.state.get())
            .field("frames", &self.frames_captured())
            .finish()
    }
}

/// Everything the worker thread owns
struct CaptureWorker {
    request: OpenRequest,
    source: Arc<dyn DeviceSource>,
    stop_flag: Arc<AtomicBool>,
    counters: Arc<CaptureCounters>,
    poll_interval: StdDuration,
    grace: StdDuration,
    path: PathBuf,
}

impl CaptureWorker {
    fn run(
        self,
        mut pipeline: Pipeline,
        ready: SyncSender<Result<(), RecorderError>>,
    ) -> WorkerExit {
        let mut handle = match self.source.open(&self.request) {
            Ok(handle) => handle,
            Err(e) => {
                tracing::debug!("Opening device {} failed: {}", self.request.device_label(), e);
                let _ = ready.send(Err(e.into()));
                return WorkerExit::Aborted(pipeline);
            }
        };
        tracing::debug!(
            "Opened device {} ({} samples per frame)",
            self.request.device_label(),
            self.request.frame_samples
        );

        if let Err(e) = pipeline.open() {
            handle.close();
            let _ = ready.send(Err(e.into()));
            return WorkerExit::OutputFailed;
        }

        if ready.send(Ok(())).is_err() {
            tracing::warn!("Recording of {} abandoned before start", self.path.display());
            self.stop_flag.store(true, Ordering::Release);
        }

        let captured = self.capture(handle.as_mut(), &mut pipeline);
        if let Err(e) = &captured {
            tracing::warn!("Capture into {} failed: {}", self.path.display(), e);
        }
        let finalized = pipeline.finalize();
        handle.close();

        tracing::debug!(
            "Capture worker finished after {} frames",
            self.counters.frames.load(Ordering::Relaxed)
        );

        let result = match (captured, finalized) {
            (Err(e), _) => Err(e),
            (Ok(()), Err(e)) => Err(e.into()),
            (Ok(()), Ok(size)) => Ok(size),
        };
        WorkerExit::Finished(result)
    }

    fn capture(
        &self,
        handle: &mut dyn DeviceHandle,
        pipeline: &mut Pipeline,
    ) -> Result<(), RecorderError> {
        while !self.stop_flag.load(Ordering::Acquire) {
            if let Some(frame) = handle.read_frame(self.poll_interval)? {
                self.accept(pipeline, frame)?;
            }
        }

        // In-flight audio after stop was requested
        let deadline = Instant::now() + self.grace;
        loop {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            let wait = (deadline - now).min(self.poll_interval);
            if let Some(frame) = handle.read_frame(wait)? {
                self.accept(pipeline, frame)?;
            }
        }

        handle.halt();
        while let Some(frame) = handle.read_frame(StdDuration::ZERO)? {
            self.accept(pipeline, frame)?;
        }
        Ok(())
    }

    fn accept(&self, pipeline: &mut Pipeline, frame: RawFrame) -> Result<(), RecorderError> {
        if frame.is_empty() {
            return Ok(());
        }
        self.counters.record(&frame);
        pipeline.push(frame)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::{ContainerWriter, DeviceError, WriteError};
    use crate::domain::recording::{EncodedChunk, RawFrame};
    use std::collections::VecDeque;

    struct QueueSource {
        frames: Mutex<VecDeque<RawFrame>>,
        fail: Option<DeviceError>,
    }

    struct QueueHandle {
        frames: VecDeque<RawFrame>,
    }

    impl DeviceHandle for QueueHandle {
        fn read_frame(&mut self, timeout: StdDuration) -> Result<Option<RawFrame>, DeviceError> {
            match self.frames.pop_front() {
                Some(frame) => Ok(Some(frame)),
                None => {
                    thread::sleep(timeout);
                    Ok(None)
                }
            }
        }

        fn close(&mut self) {}
    }

    impl DeviceSource for QueueSource {
        fn open(&self, _request: &OpenRequest) -> Result<Box<dyn DeviceHandle>, DeviceError> {
            if let Some(e) = &self.fail {
                return Err(e.clone());
            }
            let frames = std::mem::take(&mut *self.frames.lock());
            Ok(Box::new(QueueHandle { frames }))
        }
    }

    struct MemoryWriter {
        sink: Arc<Mutex<Vec<u8>>>,
        fail_open: bool,
    }

    impl ContainerWriter for MemoryWriter {
        fn container(&self) -> Container {
            Container::Wav
        }

        fn open(&mut self) -> Result<(), WriteError> {
            if self.fail_open {
                return Err(WriteError::io(
                    "memory",
                    std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
                ));
            }
            Ok(())
        }

        fn write_chunk(&mut self, chunk: EncodedChunk) -> Result<(), WriteError> {
            self.sink.lock().extend_from_slice(chunk.as_bytes());
            Ok(())
        }

        fn finalize(self: Box<Self>) -> Result<u64, WriteError> {
            Ok(self.sink.lock().len() as u64)
        }
    }

    fn session(
        frames: Vec<RawFrame>,
        fail: Option<DeviceError>,
        fail_open: bool,
    ) -> (RecordingSession, Arc<Mutex<Vec<u8>>>) {
        let sink = Arc::new(Mutex::new(Vec::new()));
        let source = Arc::new(QueueSource {
            frames: Mutex::new(frames.into()),
            fail,
        });
        let writer = Box::new(MemoryWriter {
            sink: sink.clone(),
            fail_open,
        });
        let target = OutputTarget::new("memory.wav", AudioFormat::default());
        let options = SessionOptions {
            poll_interval: StdDuration::from_millis(5),
            ..SessionOptions::default()
        };
        let session = RecordingSession::new(target, source, Pipeline::buffered(writer), options);
        (session, sink)
    }

    fn wait_for_frames(session: &RecordingSession, expected: u64) {
        let deadline = Instant::now() + StdDuration::from_secs(5);
        while session.frames_captured() < expected && Instant::now() < deadline {
            thread::sleep(StdDuration::from_millis(2));
        }
    }

    #[test]
    fn start_stop_captures_all_frames() {
        let frames = vec![
            RawFrame::from_bytes(vec![1, 2]),
            RawFrame::from_bytes(vec![3, 4]),
        ];
        let (session, sink) = session(frames, None, false);

        assert!(!session.is_recording());
        session.start().unwrap();
        assert!(session.is_recording());
        wait_for_frames(&session, 2);
        session.stop().unwrap();

        assert!(!session.is_recording());
        assert_eq!(session.state(), SessionState::Stopped);
        assert_eq!(*sink.lock(), vec![1, 2, 3, 4]);

        let summary = session.summary().unwrap();
        assert_eq!(summary.frames, 2);
        assert_eq!(summary.payload_bytes, 4);
        assert_eq!(summary.file_bytes, 4);
    }

    #[test]
    fn stop_is_idempotent() {
        let (session, _) = session(vec![], None, false);
        session.start().unwrap();
        session.stop().unwrap();
        session.stop().unwrap();
        assert_eq!(session.state(), SessionState::Stopped);
    }

    #[test]
    fn stop_while_idle_is_illegal() {
        let (session, _) = session(vec![], None, false);
        let err = session.stop().unwrap_err();
        assert!(matches!(err, RecorderError::IllegalState(_)));
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[test]
    fn start_twice_is_illegal() {
        let (session, _) = session(vec![], None, false);
        session.start().unwrap();
        let err = session.start().unwrap_err();
        assert!(matches!(err, RecorderError::IllegalState(_)));
        assert!(session.is_recording());
        session.stop().unwrap();

        let err = session.start().unwrap_err();
        assert!(matches!(err, RecorderError::IllegalState(_)));
    }

    #[test]
    fn device_failure_keeps_session_idle_and_restartable() {
        let (session, _) = session(vec![], Some(DeviceError::NoDefaultDevice), false);
        let err = session.start().unwrap_err();
        assert!(matches!(err, RecorderError::Device(DeviceError::NoDefaultDevice)));
        assert_eq!(session.state(), SessionState::Idle);

        // The pipeline was handed back, so a retry reaches the device again
        let err = session.start().unwrap_err();
        assert!(matches!(err, RecorderError::Device(_)));
    }

    #[test]
    fn output_failure_stops_session() {
        let (session, _) = session(vec![], None, true);
        let err = session.start().unwrap_err();
        assert!(matches!(err, RecorderError::Write(_)));
        assert_eq!(session.state(), SessionState::Stopped);
        assert!(session.stop().is_ok());
    }

    #[test]
    fn drop_stops_active_session() {
        let (session, sink) = session(vec![RawFrame::from_bytes(vec![9, 9])], None, false);
        session.start().unwrap();
        wait_for_frames(&session, 1);
        drop(session);
        assert_eq!(*sink.lock(), vec![9, 9]);
    }

    #[test]
    fn poll_interval_is_clamped() {
        let options = SessionOptions {
            poll_interval: StdDuration::from_secs(2),
            ..SessionOptions::default()
        };
        assert_eq!(options.effective_poll_interval(), StdDuration::from_millis(50));
    }
}
