//! Silent audio output: format, sample source, and playback session

pub(crate) mod session;
mod silence;
#[cfg(windows)]
mod wasapi;

pub use session::{OutputDeviceFactory, OutputStream, PlaybackSession, PlaybackState};
pub use silence::SilentSource;
#[cfg(windows)]
pub use wasapi::{WasapiOutputFactory, WasapiStream};

use crate::error::{GuardError, Result};

/// Sample encoding carried by the output stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleEncoding {
    /// 32-bit IEEE float
    Float32,
}

impl SampleEncoding {
    /// Size of one sample in bytes
    pub const fn bytes_per_sample(self) -> u16 {
        match self {
            SampleEncoding::Float32 => 4,
        }
    }
}

/// Audio format information
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioFormat {
    sample_rate: u32,
    channels: u16,
    encoding: SampleEncoding,
}

impl AudioFormat {
    /// The format used to keep speakers awake: 44.1kHz stereo float
    pub const SPEAKER: AudioFormat = AudioFormat {
        sample_rate: crate::AUDIO_SAMPLE_RATE,
        channels: crate::AUDIO_CHANNELS,
        encoding: SampleEncoding::Float32,
    };

    /// Create a float32 format, rejecting a zero rate or channel count
    pub fn new(sample_rate: u32, channels: u16) -> Result<Self> {
        if sample_rate == 0 {
            return Err(GuardError::InvalidConfig(
                "sample rate must be greater than zero".into(),
            ));
        }
        if channels == 0 {
            return Err(GuardError::InvalidConfig(
                "channel count must be greater than zero".into(),
            ));
        }

        Ok(Self {
            sample_rate,
            channels,
            encoding: SampleEncoding::Float32,
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn encoding(&self) -> SampleEncoding {
        self.encoding
    }

    pub fn bits_per_sample(&self) -> u16 {
        self.encoding.bytes_per_sample() * 8
    }

    /// Bytes per interleaved frame
    pub fn block_align(&self) -> u16 {
        self.channels * self.encoding.bytes_per_sample()
    }

    /// Calculate bytes per second
    pub fn bytes_per_second(&self) -> u32 {
        self.sample_rate * self.block_align() as u32
    }

    /// Calculate bytes for given number of frames
    pub fn frames_to_bytes(&self, frames: u32) -> usize {
        frames as usize * self.block_align() as usize
    }

    /// Calculate number of whole frames for given bytes
    pub fn bytes_to_frames(&self, bytes: usize) -> u32 {
        (bytes / self.block_align() as usize) as u32
    }
}

impl Default for AudioFormat {
    fn default() -> Self {
        Self::SPEAKER
    }
}

impl std::fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let encoding = match self.encoding {
            SampleEncoding::Float32 => "float",
        };
        write!(
            f,
            "{}Hz {}ch {}bit {}",
            self.sample_rate,
            self.channels,
            self.bits_per_sample(),
            encoding
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_speaker_format() {
        let format = AudioFormat::SPEAKER;
        assert_eq!(format.sample_rate(), 44100);
        assert_eq!(format.channels(), 2);
        assert_eq!(format.encoding(), SampleEncoding::Float32);
        assert_eq!(format.block_align(), 8);
        assert_eq!(format.bytes_per_second(), 352_800);
        assert_eq!(format.to_string(), "44100Hz 2ch 32bit float");
    }

    #[test]
    fn test_frame_conversions() {
        let format = AudioFormat::new(48000, 6).unwrap();
        assert_eq!(format.frames_to_bytes(10), 240);
        assert_eq!(format.bytes_to_frames(250), 10);
    }

    #[test]
    fn test_rejects_zero_rate_or_channels() {
        assert!(matches!(
            AudioFormat::new(0, 2),
            Err(GuardError::InvalidConfig(_))
        ));
        assert!(matches!(
            AudioFormat::new(44100, 0),
            Err(GuardError::InvalidConfig(_))
        ));
    }
}
