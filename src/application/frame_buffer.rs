//! Buffer-then-write accumulation of captured frames

use crate::domain::recording::RawFrame;

/// Unbounded, append-only store of frames in arrival order.
///
/// Drained exactly once after capture has stopped; `drain` consumes the
/// buffer so a second drain cannot compile.
#[derive(Debug, Default)]
pub struct FrameBuffer {
    frames: Vec<RawFrame>,
    total_bytes: usize,
}

impl FrameBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a frame. Amortized O(1).
    pub fn append(&mut self, frame: RawFrame) {
        self.total_bytes += frame.len();
        self.frames.push(frame);
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Total payload bytes held
    pub fn len(&self) -> usize {
        self.total_bytes
    }

    pub fn is_empty(&self) -> bool {
        self.total_bytes == 0
    }

    /// Concatenate all frames in arrival order
    pub fn drain(self) -> Vec<u8> {
        let mut payload = Vec::with_capacity(self.total_bytes);
        for frame in self.frames {
            payload.extend_from_slice(frame.as_bytes());
        }
        payload
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drain_concatenates_in_order() {
        let mut buffer = FrameBuffer::new();
        buffer.append(RawFrame::from_bytes(vec![1, 2]));
        buffer.append(RawFrame::from_bytes(vec![3]));
        buffer.append(RawFrame::from_bytes(vec![4, 5, 6]));

        assert_eq!(buffer.frame_count(), 3);
        assert_eq!(buffer.len(), 6);
        assert_eq!(buffer.drain(), vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn empty_buffer_drains_to_nothing() {
        let buffer = FrameBuffer::new();
        assert!(buffer.is_empty());
        assert!(buffer.drain().is_empty());
    }
}
