//! Frame scheduling for one processing call
//!
//! For input length L, hop H and frame size N:
//! frame count = 1 + ceil((L-1)/H), working length = (count-1)*H + N.

/// Frame layout of a single buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FramePlan {
    input_len: usize,
    hop: usize,
    frame_size: usize,
    frame_count: usize,
}

impl FramePlan {
    /// Plan frames for an input of `input_len` samples
    ///
    /// An empty input plans zero frames.
    pub fn new(input_len: usize, hop: usize, frame_size: usize) -> Self {
        let frame_count = if input_len == 0 {
            0
        } else {
            1 + (input_len - 1).div_ceil(hop)
        };

        Self {
            input_len,
            hop,
            frame_size,
            frame_count,
        }
    }

    pub fn frame_count(&self) -> usize {
        self.frame_count
    }

    pub fn input_len(&self) -> usize {
        self.input_len
    }

    /// Length of the overlap-add working buffer
    pub fn buffer_len(&self) -> usize {
        match self.frame_count {
            0 => 0,
            n => (n - 1) * self.hop + self.frame_size,
        }
    }

    /// Start sample of each frame in order
    pub fn frame_starts(&self) -> impl Iterator<Item = usize> {
        let hop = self.hop;
        (0..self.frame_count).map(move |frame| frame * hop)
    }
}
