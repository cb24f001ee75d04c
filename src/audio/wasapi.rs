//! WASAPI render stream that feeds silence to the default output device

use crate::audio::{AudioFormat, OutputDeviceFactory, OutputStream, SilentSource};
use crate::error::{GuardError, Result};
use crossbeam_channel::{bounded, Receiver, Sender, TryRecvError};
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, error, info, trace, warn};
use windows::{
    core::PCWSTR,
    Win32::{
        Devices::FunctionDiscovery::PKEY_Device_FriendlyName,
        Foundation::{CloseHandle, HANDLE, WAIT_OBJECT_0},
        Media::Audio::{
            eConsole, eRender, IAudioClient, IAudioRenderClient, IMMDevice,
            IMMDeviceEnumerator, MMDeviceEnumerator, AUDCLNT_BUFFERFLAGS_SILENT,
            AUDCLNT_SHAREMODE_SHARED, AUDCLNT_STREAMFLAGS_AUTOCONVERTPCM,
            AUDCLNT_STREAMFLAGS_EVENTCALLBACK, AUDCLNT_STREAMFLAGS_SRC_DEFAULT_QUALITY,
            WAVEFORMATEX,
        },
        System::{
            Com::{
                CoCreateInstance, CoInitializeEx, CoUninitialize, CLSCTX_ALL,
                COINIT_MULTITHREADED, STGM_READ,
            },
            Threading::{CreateEventW, WaitForSingleObject},
        },
    },
};

/// wFormatTag for IEEE float samples
const WAVE_FORMAT_IEEE_FLOAT: u16 = 3;

/// PROPVARIANT type for wide string pointers
const VT_LPWSTR: u16 = 31;

/// Shared-mode buffer duration in 100-nanosecond units (50ms)
const BUFFER_DURATION_HNS: i64 = 500_000;

/// How long the render loop waits for a buffer event before re-checking for stop
const WAIT_TIMEOUT_MS: u32 = 100;

/// Command sent to the render thread
enum RenderCommand {
    Stop,
}

/// Opens [`WasapiStream`]s on the system default render endpoint
#[derive(Debug, Clone, Copy, Default)]
pub struct WasapiOutputFactory;

impl OutputDeviceFactory for WasapiOutputFactory {
    type Stream = WasapiStream;

    fn open(&self, format: &AudioFormat, source: SilentSource) -> Result<WasapiStream> {
        WasapiStream::open(*format, source)
    }
}

/// Handle to a running render thread.
///
/// All COM objects live on the render thread; this handle only carries the
/// stop channel and the join handle, so it is `Send`.
pub struct WasapiStream {
    device_name: String,
    command_tx: Option<Sender<RenderCommand>>,
    handle: Option<JoinHandle<()>>,
    failure: Arc<Mutex<Option<String>>>,
}

impl WasapiStream {
    /// Spawn the render thread and wait until the device is initialized
    fn open(format: AudioFormat, source: SilentSource) -> Result<Self> {
        let (ready_tx, ready_rx) = bounded::<Result<String>>(1);
        let (command_tx, command_rx) = bounded::<RenderCommand>(1);
        let failure = Arc::new(Mutex::new(None));
        let thread_failure = failure.clone();

        let handle = thread::Builder::new()
            .name("silence-render".into())
            .spawn(move || render_thread(format, source, ready_tx, command_rx, thread_failure))
            .map_err(GuardError::device_unavailable)?;

        match ready_rx.recv() {
            Ok(Ok(device_name)) => Ok(Self {
                device_name,
                command_tx: Some(command_tx),
                handle: Some(handle),
                failure,
            }),
            Ok(Err(e)) => {
                let _ = handle.join();
                Err(e)
            }
            Err(_) => {
                let _ = handle.join();
                Err(GuardError::device_unavailable(
                    "render thread exited during initialization",
                ))
            }
        }
    }

    /// Friendly name of the device being kept awake
    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    fn shutdown(&mut self) -> Result<()> {
        let Some(handle) = self.handle.take() else {
            return Ok(());
        };

        if let Some(tx) = self.command_tx.take() {
            let _ = tx.send(RenderCommand::Stop);
        }

        if handle.join().is_err() {
            return Err(GuardError::device_teardown("render thread panicked"));
        }

        match self.failure.lock().take() {
            Some(message) => Err(GuardError::DeviceTeardown(message)),
            None => Ok(()),
        }
    }
}

impl OutputStream for WasapiStream {
    fn close(&mut self) -> Result<()> {
        self.shutdown()
    }
}

impl Drop for WasapiStream {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            warn!("Render stream for {} closed with error: {}", self.device_name, e);
        }
    }
}

/// Auto-reset event handle closed on drop
struct OwnedEvent(HANDLE);

impl OwnedEvent {
    fn new() -> windows::core::Result<Self> {
        unsafe { Ok(Self(CreateEventW(None, false, false, None)?)) }
    }
}

impl Drop for OwnedEvent {
    fn drop(&mut self) {
        unsafe {
            if !self.0.is_invalid() {
                let _ = CloseHandle(self.0);
            }
        }
    }
}

/// Shared-mode render client on the default endpoint
struct SilentRenderer {
    device_name: String,
    audio_client: IAudioClient,
    render_client: IAudioRenderClient,
    format: AudioFormat,
    event: OwnedEvent,
    buffer_frames: u32,
    started: bool,
}

impl SilentRenderer {
    /// Activate and initialize the default render endpoint in `format`.
    ///
    /// COM must already be initialized on the calling thread.
    fn open_default(format: &AudioFormat) -> windows::core::Result<Self> {
        unsafe {
            let enumerator: IMMDeviceEnumerator =
                CoCreateInstance(&MMDeviceEnumerator, None, CLSCTX_ALL)?;
            let device = enumerator.GetDefaultAudioEndpoint(eRender, eConsole)?;

            let device_name =
                device_friendly_name(&device).unwrap_or_else(|| "Unknown".to_string());
            debug!("Opening silent renderer on: {}", device_name);

            let audio_client: IAudioClient = device.Activate(CLSCTX_ALL, None)?;
            let wave_format = wave_format_for(format);

            // Shared mode runs at the engine mix format; let WASAPI convert
            audio_client.Initialize(
                AUDCLNT_SHAREMODE_SHARED,
                AUDCLNT_STREAMFLAGS_EVENTCALLBACK
                    | AUDCLNT_STREAMFLAGS_AUTOCONVERTPCM
                    | AUDCLNT_STREAMFLAGS_SRC_DEFAULT_QUALITY,
                BUFFER_DURATION_HNS,
                0,
                &wave_format,
                None,
            )?;

            let event = OwnedEvent::new()?;
            audio_client.SetEventHandle(event.0)?;

            let buffer_frames = audio_client.GetBufferSize()?;
            debug!("Renderer {} buffer size: {} frames", device_name, buffer_frames);

            let render_client: IAudioRenderClient = audio_client.GetService()?;

            info!("Renderer format for {}: {}", device_name, format);

            Ok(Self {
                device_name,
                audio_client,
                render_client,
                format: *format,
                event,
                buffer_frames,
                started: false,
            })
        }
    }

    fn device_name(&self) -> &str {
        &self.device_name
    }

    /// Pre-fill the buffer and start the stream
    fn start(&mut self, source: &SilentSource) -> windows::core::Result<()> {
        if self.started {
            return Ok(());
        }

        self.write_silence(source)?;
        unsafe {
            self.audio_client.Start()?;
        }
        self.started = true;
        info!("Renderer started: {}", self.device_name);
        Ok(())
    }

    fn stop(&mut self) -> windows::core::Result<()> {
        if !self.started {
            return Ok(());
        }

        unsafe {
            self.audio_client.Stop()?;
        }
        self.started = false;
        info!("Renderer stopped: {}", self.device_name);
        Ok(())
    }

    /// Fill all free buffer space with silence, returning frames written
    fn write_silence(&mut self, source: &SilentSource) -> windows::core::Result<u32> {
        unsafe {
            let padding = self.audio_client.GetCurrentPadding()?;
            let available = self.buffer_frames.saturating_sub(padding);
            if available == 0 {
                return Ok(0);
            }

            let buffer_ptr = self.render_client.GetBuffer(available)?;
            let buffer =
                std::slice::from_raw_parts_mut(buffer_ptr, self.format.frames_to_bytes(available));
            let frames = source.fill_bytes(buffer);

            self.render_client
                .ReleaseBuffer(frames, AUDCLNT_BUFFERFLAGS_SILENT.0 as u32)?;

            trace!("Renderer {} wrote {} frames", self.device_name, frames);
            Ok(frames)
        }
    }

    /// Block until the device asks for more data or the timeout elapses
    fn wait_for_buffer(&self, timeout_ms: u32) -> bool {
        unsafe { WaitForSingleObject(self.event.0, timeout_ms) == WAIT_OBJECT_0 }
    }
}

impl Drop for SilentRenderer {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

fn wave_format_for(format: &AudioFormat) -> WAVEFORMATEX {
    WAVEFORMATEX {
        wFormatTag: WAVE_FORMAT_IEEE_FLOAT,
        nChannels: format.channels(),
        nSamplesPerSec: format.sample_rate(),
        nAvgBytesPerSec: format.bytes_per_second(),
        nBlockAlign: format.block_align(),
        wBitsPerSample: format.bits_per_sample(),
        cbSize: 0,
    }
}

fn device_friendly_name(device: &IMMDevice) -> Option<String> {
    unsafe {
        let store = device.OpenPropertyStore(STGM_READ).ok()?;
        let prop = store.GetValue(&PKEY_Device_FriendlyName).ok()?;

        #[repr(C)]
        struct PropVariantRaw {
            vt: u16,
            w_reserved1: u16,
            w_reserved2: u16,
            w_reserved3: u16,
            data: *const u16,
        }

        let raw = &*((&prop) as *const windows_core::PROPVARIANT as *const PropVariantRaw);
        if raw.vt == VT_LPWSTR && !raw.data.is_null() {
            return PCWSTR(raw.data).to_string().ok();
        }
        None
    }
}

/// Render thread body: owns COM and every device resource
fn render_thread(
    format: AudioFormat,
    source: SilentSource,
    ready_tx: Sender<Result<String>>,
    command_rx: Receiver<RenderCommand>,
    failure: Arc<Mutex<Option<String>>>,
) {
    unsafe {
        let _ = CoInitializeEx(None, COINIT_MULTITHREADED);
    }

    match SilentRenderer::open_default(&format) {
        Ok(mut renderer) => match renderer.start(&source) {
            Ok(()) => {
                let _ = ready_tx.send(Ok(renderer.device_name().to_string()));
                render_loop(&mut renderer, &source, &command_rx, &failure);

                if let Err(e) = renderer.stop() {
                    error!("Failed to stop renderer {}: {}", renderer.device_name(), e);
                    failure
                        .lock()
                        .get_or_insert_with(|| format!("IAudioClient::Stop failed: {}", e));
                }
            }
            Err(e) => {
                error!("Failed to start renderer {}: {}", renderer.device_name(), e);
                let _ = ready_tx.send(Err(GuardError::device_unavailable(e)));
            }
        },
        Err(e) => {
            error!("Failed to open default output device: {}", e);
            let _ = ready_tx.send(Err(GuardError::device_unavailable(e)));
        }
    }

    unsafe {
        CoUninitialize();
    }
    debug!("Render thread exited");
}

fn render_loop(
    renderer: &mut SilentRenderer,
    source: &SilentSource,
    command_rx: &Receiver<RenderCommand>,
    failure: &Mutex<Option<String>>,
) {
    info!("Render thread started for: {}", renderer.device_name());

    loop {
        match command_rx.try_recv() {
            Ok(RenderCommand::Stop) | Err(TryRecvError::Disconnected) => break,
            Err(TryRecvError::Empty) => {}
        }

        if !renderer.wait_for_buffer(WAIT_TIMEOUT_MS) {
            trace!("Renderer {} wait timeout", renderer.device_name());
            continue;
        }

        if let Err(e) = renderer.write_silence(source) {
            // Typically AUDCLNT_E_DEVICE_INVALIDATED; nothing is retried
            error!("Renderer {} write error: {}", renderer.device_name(), e);
            *failure.lock() = Some(format!("render failed: {}", e));
            break;
        }
    }

    info!("Render thread stopped for: {}", renderer.device_name());
}
