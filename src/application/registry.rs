//! Tracks the one session allowed to record at a time

use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use super::error::RecorderError;
use super::session::RecordingSession;

#[derive(Debug, Default)]
struct Slot {
    session: Option<Weak<RecordingSession>>,
    /// A `start` is opening its device outside the lock
    starting: bool,
}

impl Slot {
    fn current(&self) -> Option<Arc<RecordingSession>> {
        self.session.as_ref().and_then(Weak::upgrade)
    }
}

/// Holds a weak reference to the active session.
///
/// Owned by the orchestration layer and passed to whoever starts or stops
/// recordings. The registry never keeps a session alive.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    slot: Mutex<Slot>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The registered session, if it is still alive
    pub fn active(&self) -> Option<Arc<RecordingSession>> {
        self.slot.lock().current()
    }

    /// Whether the registered session is currently recording
    pub fn is_recording(&self) -> bool {
        self.active()
            .map(|session| session.is_recording())
            .unwrap_or(false)
    }

    /// Start `session` unless another one is recording or starting.
    ///
    /// The check and the reservation happen under one lock, so two callers
    /// cannot both get through. Opening the device happens after the lock
    /// is released.
    pub fn start(&self, session: &Arc<RecordingSession>) -> Result<(), RecorderError> {
        let previous = {
            let mut slot = self.slot.lock();
            if slot.starting {
                return Err(RecorderError::Concurrency);
            }
            if let Some(current) = slot.current() {
                if current.is_recording() && !Arc::ptr_eq(&current, session) {
                    return Err(RecorderError::Concurrency);
                }
            }
            slot.starting = true;
            slot.session.replace(Arc::downgrade(session))
        };

        let result = session.start();

        let mut slot = self.slot.lock();
        slot.starting = false;
        if result.is_err() {
            slot.session = previous;
        }
        result
    }

    /// Stop the registered session
    pub fn stop_active(&self) -> Result<(), RecorderError> {
        let session = self.active().ok_or(RecorderError::NoActiveSession)?;
        session.stop()
    }
}
