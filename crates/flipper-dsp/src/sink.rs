//! Audio output seam.

/// Consumer of the audio DMA sample stream.
pub trait AudioSink {
    /// Pushes interleaved stereo frames (left, right, left, ...) of signed
    /// 16-bit PCM. The slice length is always even.
    fn push_interleaved_i16(&mut self, samples: &[i16]);
}

/// Discards all samples.
pub struct NullSink;

impl AudioSink for NullSink {
    fn push_interleaved_i16(&mut self, _samples: &[i16]) {}
}

/// Test double that accumulates every pushed sample.
#[derive(Default)]
pub struct CaptureSink {
    pub samples: Vec<i16>,
}

impl CaptureSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AudioSink for CaptureSink {
    fn push_interleaved_i16(&mut self, samples: &[i16]) {
        self.samples.extend_from_slice(samples);
    }
}
