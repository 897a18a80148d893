//! Audio capture lifecycle
//!
//! A recording acquires a hardware-backed stream on start, buffers chunks
//! while running and turns them into one immutable [`AudioClip`] on stop.
//! `stop` consumes the stream handle, so a finished recording can never
//! leave the device open.

use std::sync::Arc;

use crate::error::CaptureError;

/// Container type used when the source does not report one
pub const DEFAULT_AUDIO_MIME: &str = "audio/webm";

/// Upper bound on buffered audio per recording (about 100 minutes of opus)
pub const DEFAULT_MAX_RECORDING_BYTES: usize = 25 * 1024 * 1024;

/// Finalized recording, cheap to clone
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioClip {
    pub mime_type: String,
    bytes: Arc<[u8]>,
}

impl AudioClip {
    pub fn new(mime_type: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        let mime_type = mime_type.into();
        Self {
            mime_type: if mime_type.trim().is_empty() {
                DEFAULT_AUDIO_MIME.to_string()
            } else {
                mime_type
            },
            bytes: bytes.into(),
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Shared handle to the audio, no copy
    pub fn shared_bytes(&self) -> Arc<[u8]> {
        Arc::clone(&self.bytes)
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// A device that can hand out a recording stream
pub trait CaptureSource: Send + Sync {
    /// Acquire the stream; a refused permission is `RecordingDenied`
    fn acquire(&self) -> Result<Box<dyn CaptureStream>, CaptureError>;
}

/// An open hardware stream
pub trait CaptureStream: Send {
    /// Container type of the chunks this stream produces
    fn mime_type(&self) -> &str {
        DEFAULT_AUDIO_MIME
    }

    /// Release the underlying device
    fn release(self: Box<Self>);
}

struct ActiveRecording {
    stream: Box<dyn CaptureStream>,
    chunks: Vec<u8>,
    chunk_count: usize,
}

/// Recorder state machine: idle or recording
pub struct AudioRecorder {
    active: Option<ActiveRecording>,
    max_bytes: usize,
}

impl Default for AudioRecorder {
    fn default() -> Self {
        Self::with_limit(DEFAULT_MAX_RECORDING_BYTES)
    }
}

impl AudioRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorder refusing chunks once `max_bytes` are buffered
    pub fn with_limit(max_bytes: usize) -> Self {
        Self {
            active: None,
            max_bytes,
        }
    }

    pub fn is_recording(&self) -> bool {
        self.active.is_some()
    }

    /// Bytes buffered so far in the current recording
    pub fn buffered_len(&self) -> usize {
        self.active.as_ref().map_or(0, |active| active.chunks.len())
    }

    pub fn start(&mut self, source: &dyn CaptureSource) -> Result<(), CaptureError> {
        if self.active.is_some() {
            return Err(CaptureError::AlreadyRecording);
        }
        let stream = source.acquire()?;
        tracing::debug!(mime_type = stream.mime_type(), "Recording started");
        self.active = Some(ActiveRecording {
            stream,
            chunks: Vec::new(),
            chunk_count: 0,
        });
        Ok(())
    }

    /// Append a captured chunk; empty chunks are skipped.
    ///
    /// A chunk that would push the buffer past the limit is rejected whole
    /// and the recording keeps what it had.
    pub fn push_chunk(&mut self, chunk: &[u8]) -> Result<(), CaptureError> {
        let active = self.active.as_mut().ok_or(CaptureError::NotRecording)?;
        if active.chunks.len() + chunk.len() > self.max_bytes {
            return Err(CaptureError::TooLarge {
                limit: self.max_bytes,
            });
        }
        if !chunk.is_empty() {
            active.chunks.extend_from_slice(chunk);
            active.chunk_count += 1;
        }
        Ok(())
    }

    /// Finalize the recording and release the stream
    pub fn stop(&mut self) -> Result<AudioClip, CaptureError> {
        let active = self.active.take().ok_or(CaptureError::NotRecording)?;
        let mime_type = active.stream.mime_type().to_string();
        active.stream.release();

        tracing::debug!(
            chunks = active.chunk_count,
            bytes = active.chunks.len(),
            "Recording stopped"
        );
        Ok(AudioClip::new(mime_type, active.chunks))
    }
}

impl Drop for AudioRecorder {
    fn drop(&mut self) {
        if let Some(active) = self.active.take() {
            active.stream.release();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct FakeDevice {
        deny: bool,
        open: Arc<AtomicUsize>,
    }

    struct FakeStream {
        open: Arc<AtomicUsize>,
    }

    impl CaptureSource for FakeDevice {
        fn acquire(&self) -> Result<Box<dyn CaptureStream>, CaptureError> {
            if self.deny {
                return Err(CaptureError::RecordingDenied("microphone blocked".into()));
            }
            self.open.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(FakeStream {
                open: self.open.clone(),
            }))
        }
    }

    impl CaptureStream for FakeStream {
        fn mime_type(&self) -> &str {
            "audio/ogg"
        }

        fn release(self: Box<Self>) {
            self.open.fetch_sub(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_lifecycle_releases_stream_on_stop() {
        let device = FakeDevice::default();
        let mut recorder = AudioRecorder::new();

        recorder.start(&device).unwrap();
        assert_eq!(device.open.load(Ordering::SeqCst), 1);

        recorder.push_chunk(b"abc").unwrap();
        recorder.push_chunk(b"").unwrap();
        recorder.push_chunk(b"def").unwrap();
        assert_eq!(recorder.buffered_len(), 6);

        let clip = recorder.stop().unwrap();
        assert_eq!(clip.bytes(), b"abcdef");
        assert_eq!(clip.mime_type, "audio/ogg");
        assert_eq!(device.open.load(Ordering::SeqCst), 0);
        assert!(!recorder.is_recording());
    }

    #[test]
    fn test_denied_permission() {
        let device = FakeDevice {
            deny: true,
            ..Default::default()
        };
        let mut recorder = AudioRecorder::new();

        assert!(matches!(
            recorder.start(&device),
            Err(CaptureError::RecordingDenied(_))
        ));
        assert!(!recorder.is_recording());
    }

    #[test]
    fn test_invalid_transitions() {
        let device = FakeDevice::default();
        let mut recorder = AudioRecorder::new();

        assert_eq!(recorder.stop(), Err(CaptureError::NotRecording));
        assert_eq!(recorder.push_chunk(b"x"), Err(CaptureError::NotRecording));

        recorder.start(&device).unwrap();
        assert_eq!(recorder.start(&device), Err(CaptureError::AlreadyRecording));
        assert_eq!(device.open.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_drop_releases_open_stream() {
        let device = FakeDevice::default();
        {
            let mut recorder = AudioRecorder::new();
            recorder.start(&device).unwrap();
        }
        assert_eq!(device.open.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_chunks_past_limit_are_rejected() {
        let device = FakeDevice::default();
        let mut recorder = AudioRecorder::with_limit(8);
        recorder.start(&device).unwrap();

        recorder.push_chunk(b"12345").unwrap();
        assert_eq!(
            recorder.push_chunk(b"6789"),
            Err(CaptureError::TooLarge { limit: 8 })
        );
        recorder.push_chunk(b"678").unwrap();

        let clip = recorder.stop().unwrap();
        assert_eq!(clip.bytes(), b"12345678");
    }

    #[test]
    fn test_shared_bytes_do_not_copy() {
        let clip = AudioClip::new("audio/webm", vec![7u8; 16]);
        assert!(Arc::ptr_eq(&clip.shared_bytes(), &clip.shared_bytes()));
    }

    #[test]
    fn test_clip_defaults_mime() {
        let clip = AudioClip::new("", vec![1u8, 2, 3]);
        assert_eq!(clip.mime_type, DEFAULT_AUDIO_MIME);
        assert_eq!(clip.len(), 3);
    }
}
