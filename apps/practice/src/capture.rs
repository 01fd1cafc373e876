//! Audio capture seam.
//!
//! The device itself is an external collaborator. The session only ever holds
//! a handle through `CaptureGuard`, which stops and releases the device when it
//! is dropped, so a handle cannot outlive the session on any exit path.

use std::io::ErrorKind;
use std::path::PathBuf;

use bytes::Bytes;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("permission to use the capture device was denied")]
    PermissionDenied,

    #[error("{0}")]
    Device(String),
}

/// Something that can hand out exclusive recording handles (a microphone).
pub trait CaptureDevice: Send {
    fn acquire(&mut self) -> Result<Box<dyn CaptureHandle>, CaptureError>;
}

/// An open, exclusively owned recording handle.
pub trait CaptureHandle: Send {
    fn start(&mut self) -> Result<(), CaptureError>;

    /// Stops recording and returns everything captured since `start`.
    fn stop(&mut self) -> Result<Bytes, CaptureError>;

    /// Closes the device. Must tolerate being called after `stop`.
    fn release(&mut self);
}

/// Acquires and immediately releases the device, so a refused permission
/// surfaces before any countdown starts.
pub fn check_access(device: &mut dyn CaptureDevice) -> Result<(), CaptureError> {
    let mut handle = device.acquire()?;
    handle.release();
    debug!("Capture device available");
    Ok(())
}

/// Scoped ownership of a capture handle.
pub struct CaptureGuard {
    handle: Option<Box<dyn CaptureHandle>>,
    recording: bool,
}

impl CaptureGuard {
    /// Acquires the device and starts recording.
    pub fn start(device: &mut dyn CaptureDevice) -> Result<Self, CaptureError> {
        let handle = device.acquire()?;
        let mut guard = Self {
            handle: Some(handle),
            recording: false,
        };
        // On failure the guard drops here and releases the handle.
        if let Some(handle) = guard.handle.as_mut() {
            handle.start()?;
        }
        guard.recording = true;
        debug!("Capture started");
        Ok(guard)
    }

    pub fn is_recording(&self) -> bool {
        self.recording
    }

    /// Stops recording, releases the device and returns the captured audio.
    pub fn finish(mut self) -> Result<Bytes, CaptureError> {
        let mut handle = self
            .handle
            .take()
            .ok_or_else(|| CaptureError::Device("capture handle already released".to_string()))?;
        self.recording = false;
        let result = handle.stop();
        handle.release();
        debug!("Capture finished and released");
        result
    }
}

impl Drop for CaptureGuard {
    fn drop(&mut self) {
        if let Some(mut handle) = self.handle.take() {
            if self.recording {
                if let Err(e) = handle.stop() {
                    warn!("Failed to stop capture during release: {e}");
                }
            }
            handle.release();
            debug!("Capture released");
        }
    }
}

/// Replays a pre-recorded clip from disk in place of a live microphone.
/// The file is read when recording stops, so it may be written while the
/// speaking countdown runs.
pub struct ClipDevice {
    path: PathBuf,
}

impl ClipDevice {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl CaptureDevice for ClipDevice {
    fn acquire(&mut self) -> Result<Box<dyn CaptureHandle>, CaptureError> {
        match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() && !dir.is_dir() => {
                return Err(CaptureError::Device(format!(
                    "clip directory {} does not exist",
                    dir.display()
                )))
            }
            _ => {}
        }
        Ok(Box::new(ClipHandle {
            path: self.path.clone(),
            started: false,
        }))
    }
}

struct ClipHandle {
    path: PathBuf,
    started: bool,
}

impl CaptureHandle for ClipHandle {
    fn start(&mut self) -> Result<(), CaptureError> {
        self.started = true;
        debug!(path = %self.path.display(), "Clip capture started");
        Ok(())
    }

    fn stop(&mut self) -> Result<Bytes, CaptureError> {
        if !std::mem::take(&mut self.started) {
            return Err(CaptureError::Device("clip capture was not started".to_string()));
        }
        match std::fs::read(&self.path) {
            Ok(audio) => Ok(Bytes::from(audio)),
            Err(e) if e.kind() == ErrorKind::PermissionDenied => Err(CaptureError::PermissionDenied),
            Err(e) => Err(CaptureError::Device(format!(
                "failed to read clip {}: {e}",
                self.path.display()
            ))),
        }
    }

    fn release(&mut self) {
        self.started = false;
    }
}

/// In-memory capture device used by the session and runner tests.
#[cfg(test)]
pub(crate) mod fake {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;

    #[derive(Debug, Default)]
    pub struct Counters {
        pub acquired: AtomicUsize,
        pub started: AtomicUsize,
        pub stopped: AtomicUsize,
        pub released: AtomicUsize,
    }

    impl Counters {
        pub fn get(counter: &AtomicUsize) -> usize {
            counter.load(Ordering::SeqCst)
        }

        /// Every acquired handle has been released.
        pub fn all_released(&self) -> bool {
            Self::get(&self.acquired) == Self::get(&self.released)
        }
    }

    pub struct FakeDevice {
        pub counters: Arc<Counters>,
        pub deny: bool,
        pub payload: &'static [u8],
    }

    impl FakeDevice {
        pub fn new() -> (Self, Arc<Counters>) {
            let counters = Arc::new(Counters::default());
            (
                Self {
                    counters: counters.clone(),
                    deny: false,
                    payload: b"webm-audio",
                },
                counters,
            )
        }

        pub fn denying() -> (Self, Arc<Counters>) {
            let (mut device, counters) = Self::new();
            device.deny = true;
            (device, counters)
        }
    }

    impl CaptureDevice for FakeDevice {
        fn acquire(&mut self) -> Result<Box<dyn CaptureHandle>, CaptureError> {
            if self.deny {
                return Err(CaptureError::PermissionDenied);
            }
            self.counters.acquired.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(FakeHandle {
                counters: self.counters.clone(),
                payload: self.payload,
            }))
        }
    }

    struct FakeHandle {
        counters: Arc<Counters>,
        payload: &'static [u8],
    }

    impl CaptureHandle for FakeHandle {
        fn start(&mut self) -> Result<(), CaptureError> {
            self.counters.started.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn stop(&mut self) -> Result<Bytes, CaptureError> {
            self.counters.stopped.fetch_add(1, Ordering::SeqCst);
            Ok(Bytes::from_static(self.payload))
        }

        fn release(&mut self) {
            self.counters.released.fetch_add(1, Ordering::SeqCst);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fake::{Counters, FakeDevice};
    use super::*;

    #[test]
    fn test_finish_returns_audio_and_releases() {
        let (mut device, counters) = FakeDevice::new();
        let guard = CaptureGuard::start(&mut device).unwrap();
        assert!(guard.is_recording());
        let audio = guard.finish().unwrap();
        assert_eq!(&audio[..], b"webm-audio");
        assert_eq!(Counters::get(&counters.stopped), 1);
        assert!(counters.all_released());
    }

    #[test]
    fn test_drop_stops_and_releases() {
        let (mut device, counters) = FakeDevice::new();
        {
            let _guard = CaptureGuard::start(&mut device).unwrap();
        }
        assert_eq!(Counters::get(&counters.stopped), 1);
        assert_eq!(Counters::get(&counters.released), 1);
    }

    #[test]
    fn test_denied_acquire_holds_nothing() {
        let (mut device, counters) = FakeDevice::denying();
        let err = CaptureGuard::start(&mut device).err().unwrap();
        assert!(matches!(err, CaptureError::PermissionDenied));
        assert_eq!(Counters::get(&counters.acquired), 0);
    }

    #[test]
    fn test_check_access_releases_handle() {
        let (mut device, counters) = FakeDevice::new();
        check_access(&mut device).unwrap();
        assert_eq!(Counters::get(&counters.acquired), 1);
        assert_eq!(Counters::get(&counters.started), 0);
        assert!(counters.all_released());

        let (mut denying, _) = FakeDevice::denying();
        assert!(matches!(check_access(&mut denying), Err(CaptureError::PermissionDenied)));
    }

    #[test]
    fn test_clip_device_reads_file_on_stop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("answer.webm");
        let mut device = ClipDevice::new(&path);
        let guard = CaptureGuard::start(&mut device).unwrap();
        std::fs::write(&path, b"clip-bytes").unwrap();
        assert_eq!(&guard.finish().unwrap()[..], b"clip-bytes");
    }

    #[test]
    fn test_clip_device_missing_file_is_device_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut device = ClipDevice::new(dir.path().join("missing.webm"));
        let guard = CaptureGuard::start(&mut device).unwrap();
        assert!(matches!(guard.finish(), Err(CaptureError::Device(_))));
    }

    #[test]
    fn test_clip_device_missing_directory_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut device = ClipDevice::new(dir.path().join("nope").join("a.webm"));
        assert!(CaptureGuard::start(&mut device).is_err());
    }
}
