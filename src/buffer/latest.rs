use std::sync::{Arc, Mutex};

use super::Frame;

/// Single-slot mailbox for the latest annotated frame.
///
/// The capture pipeline is the only writer; every connected stream client
/// is a reader. The lock is held only for the reference swap or clone,
/// never across capture, detection, or JPEG encoding. Readers may see the
/// same frame twice or miss one entirely; both are expected.
pub struct FrameBuffer {
    slot: Arc<Mutex<Option<Arc<Frame>>>>,
}

impl FrameBuffer {
    pub fn new() -> Self {
        Self {
            slot: Arc::new(Mutex::new(None)),
        }
    }

    /// Replace the held frame unconditionally.
    pub fn publish(&self, frame: Arc<Frame>) {
        *self.slot.lock().unwrap() = Some(frame);
    }

    /// Latest published frame, or `None` before the first publish.
    pub fn snapshot(&self) -> Option<Arc<Frame>> {
        self.slot.lock().unwrap().clone()
    }
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for FrameBuffer {
    fn clone(&self) -> Self {
        Self {
            slot: Arc::clone(&self.slot),
        }
    }
}
