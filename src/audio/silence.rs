//! Zero-valued sample source used to keep the output device busy

use crate::audio::AudioFormat;

/// Infinite source of silent samples in a fixed format.
///
/// Holds nothing but the format descriptor, so it can be copied onto the
/// render thread and pulled from there while the control thread starts or
/// stops the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SilentSource {
    format: AudioFormat,
}

impl SilentSource {
    pub fn new(format: AudioFormat) -> Self {
        Self { format }
    }

    /// Get the audio format
    pub fn format(&self) -> &AudioFormat {
        &self.format
    }

    /// Produce `count` samples, all zero
    pub fn produce_frames(&self, count: usize) -> Vec<f32> {
        vec![0.0; count]
    }

    /// Fill a raw device buffer with silence.
    ///
    /// Returns the number of whole frames written. Trailing bytes that do
    /// not make up a full frame are zeroed as well.
    pub fn fill_bytes(&self, buf: &mut [u8]) -> u32 {
        // 0.0f32 is all-zero bits, so byte-wise zeroing is valid silence
        buf.fill(0);
        self.format.bytes_to_frames(buf.len())
    }
}

impl Default for SilentSource {
    fn default() -> Self {
        Self::new(AudioFormat::SPEAKER)
    }
}
