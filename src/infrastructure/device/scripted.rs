//! Deterministic in-memory input device

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::application::ports::{DeviceError, DeviceHandle, DeviceSource, OpenRequest};
use crate::domain::recording::RawFrame;

use super::describe_available;

#[derive(Debug, Clone)]
enum Script {
    /// Fixed frames, consumed across opens
    Frames(Arc<Mutex<VecDeque<RawFrame>>>),
    /// Endless digital silence sized to the request
    Silence,
}

/// Device that plays back a script instead of touching hardware.
///
/// Used for dry runs and tests. Only one handle may be open at a time;
/// a second `open` reports the device as busy.
#[derive(Debug, Clone)]
pub struct ScriptedSource {
    name: String,
    script: Script,
    pacing: Option<Duration>,
    sample_rates: Option<Vec<u32>>,
    in_use: Arc<AtomicBool>,
}

impl ScriptedSource {
    pub const DEFAULT_NAME: &'static str = "scripted";

    /// Deliver `frames` in order, then report no data
    pub fn with_frames(frames: impl IntoIterator<Item = RawFrame>) -> Self {
        Self::from_script(Script::Frames(Arc::new(Mutex::new(
            frames.into_iter().collect(),
        ))))
    }

    /// Deliver silence forever, paced in real time unless overridden
    pub fn silence() -> Self {
        Self::from_script(Script::Silence)
    }

    fn from_script(script: Script) -> Self {
        Self {
            name: Self::DEFAULT_NAME.to_string(),
            script,
            pacing: None,
            sample_rates: None,
            in_use: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Minimum time between two delivered frames
    pub fn with_pacing(mut self, pacing: Duration) -> Self {
        self.pacing = Some(pacing);
        self
    }

    /// Restrict the rates `open` accepts
    pub fn with_sample_rates(mut self, rates: &[u32]) -> Self {
        self.sample_rates = Some(rates.to_vec());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Scripted frames not yet delivered; `None` for silence
    pub fn remaining(&self) -> Option<usize> {
        match &self.script {
            Script::Frames(frames) => Some(frames.lock().len()),
            Script::Silence => None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.in_use.load(Ordering::Acquire)
    }
}

impl DeviceSource for ScriptedSource {
    fn open(&self, request: &OpenRequest) -> Result<Box<dyn DeviceHandle>, DeviceError> {
        if let Some(requested) = request.device.as_deref() {
            if !requested.eq_ignore_ascii_case(&self.name) {
                return Err(DeviceError::NotFound {
                    requested: requested.to_string(),
                    available: describe_available(std::slice::from_ref(&self.name)),
                });
            }
        }

        let sample_rate = request.format.sample_rate();
        if let Some(rates) = &self.sample_rates {
            if !rates.contains(&sample_rate) {
                return Err(DeviceError::UnsupportedConfig {
                    device: self.name.clone(),
                    channels: request.format.channel_count(),
                    sample_rate,
                });
            }
        }

        if self.in_use.swap(true, Ordering::AcqRel) {
            return Err(DeviceError::Busy(self.name.clone()));
        }

        let pacing = match (&self.script, self.pacing) {
            (_, Some(pacing)) => Some(pacing),
            (Script::Silence, None) => Some(
                request
                    .format
                    .duration_of(request.frame_bytes() as u64)
                    .max(Duration::from_millis(1)),
            ),
            (Script::Frames(_), None) => None,
        };

        Ok(Box::new(ScriptedHandle {
            script: self.script.clone(),
            frame_bytes: request.frame_bytes(),
            pacing,
            next_due: Instant::now(),
            halted: false,
            in_use: Some(Arc::clone(&self.in_use)),
        }))
    }
}

struct ScriptedHandle {
    script: Script,
    frame_bytes: usize,
    pacing: Option<Duration>,
    next_due: Instant,
    halted: bool,
    in_use: Option<Arc<AtomicBool>>,
}

impl ScriptedHandle {
    fn has_data(&self) -> bool {
        match &self.script {
            Script::Frames(frames) => !frames.lock().is_empty(),
            Script::Silence => true,
        }
    }

    fn next_frame(&mut self) -> Option<RawFrame> {
        match &self.script {
            Script::Frames(frames) => frames.lock().pop_front(),
            Script::Silence => Some(RawFrame::from_bytes(vec![0; self.frame_bytes])),
        }
    }
}

impl DeviceHandle for ScriptedHandle {
    fn read_frame(&mut self, timeout: Duration) -> Result<Option<RawFrame>, DeviceError> {
        if self.halted || self.in_use.is_none() {
            return Ok(None);
        }
        if !self.has_data() {
            thread::sleep(timeout);
            return Ok(None);
        }

        if let Some(pacing) = self.pacing {
            let now = Instant::now();
            if self.next_due > now {
                let wait = self.next_due - now;
                if wait > timeout {
                    thread::sleep(timeout);
                    return Ok(None);
                }
                thread::sleep(wait);
            }
            self.next_due = self.next_due.max(now) + pacing;
        }

        Ok(self.next_frame())
    }

    fn halt(&mut self) {
        self.halted = true;
    }

    fn close(&mut self) {
        if let Some(in_use) = self.in_use.take() {
            in_use.store(false, Ordering::Release);
        }
    }
}

impl Drop for ScriptedHandle {
    fn drop(&mut self) {
        self.close();
    }
}
