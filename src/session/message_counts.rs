use std::fmt;

/// Frames in and out on one neighbor link, reported at shutdown.
#[derive(Debug, Default)]
pub struct MessageCounts {
    frames_in: u64,
    frames_out: u64,
}

impl MessageCounts {
    pub fn new() -> Self {
        MessageCounts::default()
    }

    pub fn record_in(&mut self) {
        self.frames_in += 1;
    }

    pub fn record_out(&mut self) {
        self.frames_out += 1;
    }
}

impl fmt::Display for MessageCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "in={} out={}", self.frames_in, self.frames_out)
    }
}
