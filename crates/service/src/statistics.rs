use std::sync::atomic::{AtomicUsize, Ordering};

/// The type of information reported by a push task.
#[derive(Debug, Clone, Copy)]
pub enum Stats {
    SendFrames(usize),
    SendBytes(usize),
    DroppedFrames(usize),
}

#[derive(Debug, Default)]
pub struct Count(AtomicUsize);

impl Count {
    pub fn add(&self, value: usize) {
        self.0.fetch_add(value, Ordering::Relaxed);
    }

    pub fn get(&self) -> usize {
        self.0.load(Ordering::Relaxed)
    }
}

/// Counters of a single connection.
///
/// # Example
///
/// ```
/// use sse_push_service::statistics::*;
///
/// let counts = Counts::default();
///
/// counts.add(&Stats::SendFrames(1));
/// counts.add(&Stats::SendBytes(64));
/// counts.add(&Stats::SendBytes(64));
///
/// assert_eq!(counts.send_frames.get(), 1);
/// assert_eq!(counts.send_bytes.get(), 128);
/// assert_eq!(counts.dropped_frames.get(), 0);
/// ```
#[derive(Debug, Default)]
pub struct Counts {
    pub send_frames: Count,
    /// Payload bytes handed to the stream, without the event framing.
    pub send_bytes: Count,
    pub dropped_frames: Count,
}

impl Counts {
    pub fn add(&self, payload: &Stats) {
        match payload {
            Stats::SendFrames(v) => self.send_frames.add(*v),
            Stats::SendBytes(v) => self.send_bytes.add(*v),
            Stats::DroppedFrames(v) => self.dropped_frames.add(*v),
        }
    }
}
