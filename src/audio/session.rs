//! Playback session lifecycle: owns at most one open output stream

use crate::audio::{AudioFormat, SilentSource};
use crate::error::{GuardError, Result};
use tracing::{debug, info, warn};

/// State of a playback session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    /// No device is held
    Stopped,
    /// A device stream is open and pulling silence
    Playing,
}

/// An open output stream.
///
/// Dropping a stream must release the device even if `close` was never
/// called or failed.
pub trait OutputStream: Send {
    /// Halt output and release the device
    fn close(&mut self) -> Result<()>;
}

/// Capability to open an output stream fed by a [`SilentSource`]
pub trait OutputDeviceFactory {
    type Stream: OutputStream;

    /// Open the default output device in `format` and start pulling from `source`
    fn open(&self, format: &AudioFormat, source: SilentSource) -> Result<Self::Stream>;
}

/// Keep-alive playback session.
///
/// The session is `Playing` exactly when it holds a stream. Calls are
/// expected from a single control thread.
pub struct PlaybackSession<F: OutputDeviceFactory> {
    format: AudioFormat,
    factory: F,
    stream: Option<F::Stream>,
}

impl<F: OutputDeviceFactory> PlaybackSession<F> {
    /// Create a stopped session with the given format
    pub fn new(factory: F, format: AudioFormat) -> Self {
        Self {
            format,
            factory,
            stream: None,
        }
    }

    /// Get the audio format
    pub fn format(&self) -> &AudioFormat {
        &self.format
    }

    /// Get current state
    pub fn state(&self) -> PlaybackState {
        if self.stream.is_some() {
            PlaybackState::Playing
        } else {
            PlaybackState::Stopped
        }
    }

    pub fn is_playing(&self) -> bool {
        self.stream.is_some()
    }

    /// Start playing silence. No-op when already playing.
    pub fn start(&mut self) -> Result<()> {
        if self.stream.is_some() {
            return Ok(());
        }

        let source = SilentSource::new(self.format);
        let stream = self.factory.open(&self.format, source).map_err(|e| match e {
            GuardError::DeviceUnavailable(_) => e,
            other => GuardError::device_unavailable(other),
        })?;

        self.stream = Some(stream);
        info!("Playback started: {}", self.format);
        Ok(())
    }

    /// Stop playing and release the device. No-op when already stopped.
    ///
    /// The session is `Stopped` afterwards even if the release reported an
    /// error; the stream is dropped either way.
    pub fn stop(&mut self) -> Result<()> {
        let Some(mut stream) = self.stream.take() else {
            return Ok(());
        };

        let result = stream.close();
        drop(stream);

        match result {
            Ok(()) => {
                info!("Playback stopped");
                Ok(())
            }
            Err(e) => {
                warn!("Playback stopped with teardown error: {}", e);
                Err(match e {
                    GuardError::DeviceTeardown(_) => e,
                    other => GuardError::device_teardown(other),
                })
            }
        }
    }

    /// Stop if playing, otherwise start. Returns the resulting state.
    pub fn toggle(&mut self) -> Result<PlaybackState> {
        if self.is_playing() {
            self.stop()?;
        } else {
            self.start()?;
        }
        debug!("Playback toggled to {:?}", self.state());
        Ok(self.state())
    }
}

impl<F: OutputDeviceFactory> Drop for PlaybackSession<F> {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            warn!("Failed to stop playback on shutdown: {}", e);
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-memory device factory that counts live streams

    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Debug, Default)]
    pub struct DeviceCounters {
        pub live: AtomicUsize,
        pub opened: AtomicUsize,
        pub closed: AtomicUsize,
    }

    impl DeviceCounters {
        pub fn live(&self) -> usize {
            self.live.load(Ordering::SeqCst)
        }

        pub fn opened(&self) -> usize {
            self.opened.load(Ordering::SeqCst)
        }
    }

    #[derive(Clone, Default)]
    pub struct FakeFactory {
        pub counters: Arc<DeviceCounters>,
        pub fail_open: bool,
        pub fail_close: bool,
    }

    pub struct FakeStream {
        counters: Arc<DeviceCounters>,
        fail_close: bool,
        released: bool,
    }

    impl FakeStream {
        fn release(&mut self) {
            if !self.released {
                self.released = true;
                self.counters.live.fetch_sub(1, Ordering::SeqCst);
            }
        }
    }

    impl OutputStream for FakeStream {
        fn close(&mut self) -> Result<()> {
            self.counters.closed.fetch_add(1, Ordering::SeqCst);
            if self.fail_close {
                return Err(GuardError::device_teardown("IAudioClient::Stop failed"));
            }
            self.release();
            Ok(())
        }
    }

    impl Drop for FakeStream {
        fn drop(&mut self) {
            self.release();
        }
    }

    impl OutputDeviceFactory for FakeFactory {
        type Stream = FakeStream;

        fn open(&self, format: &AudioFormat, source: SilentSource) -> Result<FakeStream> {
            assert_eq!(source.format(), format);
            if self.fail_open {
                return Err(GuardError::device_unavailable("no default render endpoint"));
            }
            self.counters.opened.fetch_add(1, Ordering::SeqCst);
            self.counters.live.fetch_add(1, Ordering::SeqCst);
            Ok(FakeStream {
                counters: self.counters.clone(),
                fail_close: self.fail_close,
                released: false,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::FakeFactory;
    use super::*;

    fn session(factory: &FakeFactory) -> PlaybackSession<FakeFactory> {
        PlaybackSession::new(factory.clone(), AudioFormat::SPEAKER)
    }

    #[test]
    fn test_new_session_is_stopped() {
        let factory = FakeFactory::default();
        let session = session(&factory);
        assert_eq!(session.state(), PlaybackState::Stopped);
        assert!(!session.is_playing());
        assert_eq!(factory.counters.live(), 0);
    }

    #[test]
    fn test_start_is_idempotent() {
        let factory = FakeFactory::default();
        let mut session = session(&factory);

        session.start().unwrap();
        session.start().unwrap();

        assert!(session.is_playing());
        assert_eq!(factory.counters.opened(), 1);
        assert_eq!(factory.counters.live(), 1);
    }

    #[test]
    fn test_stop_on_stopped_session_is_noop() {
        let factory = FakeFactory::default();
        let mut session = session(&factory);

        session.stop().unwrap();
        session.stop().unwrap();

        assert_eq!(session.state(), PlaybackState::Stopped);
        assert_eq!(factory.counters.opened(), 0);
    }

    #[test]
    fn test_start_then_stop_releases_device() {
        let factory = FakeFactory::default();
        let mut session = session(&factory);

        session.start().unwrap();
        session.stop().unwrap();

        assert_eq!(session.state(), PlaybackState::Stopped);
        assert_eq!(factory.counters.live(), 0);
    }

    #[test]
    fn test_toggle_alternates() {
        let factory = FakeFactory::default();
        let mut session = session(&factory);

        let states: Vec<_> = (0..4).map(|_| session.toggle().unwrap()).collect();
        assert_eq!(
            states,
            vec![
                PlaybackState::Playing,
                PlaybackState::Stopped,
                PlaybackState::Playing,
                PlaybackState::Stopped,
            ]
        );
        assert_eq!(factory.counters.live(), 0);
    }

    #[test]
    fn test_open_failure_leaves_session_stopped() {
        let factory = FakeFactory {
            fail_open: true,
            ..Default::default()
        };
        let mut session = session(&factory);

        let err = session.start().unwrap_err();
        assert!(matches!(err, GuardError::DeviceUnavailable(_)));
        assert_eq!(session.state(), PlaybackState::Stopped);
        assert_eq!(factory.counters.live(), 0);
    }

    #[test]
    fn test_teardown_failure_still_releases_device() {
        let factory = FakeFactory {
            fail_close: true,
            ..Default::default()
        };
        let mut session = session(&factory);

        session.start().unwrap();
        let err = session.stop().unwrap_err();

        assert!(matches!(err, GuardError::DeviceTeardown(_)));
        assert_eq!(session.state(), PlaybackState::Stopped);
        assert_eq!(factory.counters.live(), 0);

        // Already stopped, so a second stop is a clean no-op
        session.stop().unwrap();
    }

    #[test]
    fn test_drop_releases_device() {
        let factory = FakeFactory::default();
        {
            let mut session = session(&factory);
            session.start().unwrap();
            assert_eq!(factory.counters.live(), 1);
        }
        assert_eq!(factory.counters.live(), 0);
    }
}
