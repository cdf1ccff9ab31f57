//! Canned audio payload.
//!
//! The engine replays a single PCM recording. The file is a standard WAV
//! container whose fixed 44-byte header is stripped; the remaining bytes are
//! streamed verbatim on every `speak` call.

use crate::error::{EngineError, EngineResult};
use crate::wave_format::WaveFormat;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};
use tracing::{debug, info, warn};

static SHARED_PAYLOADS: Lazy<Mutex<HashMap<PathBuf, Weak<AudioPayload>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

/// Immutable PCM bytes replayed by the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioPayload {
    data: Vec<u8>,
}

impl AudioPayload {
    /// Wrap raw PCM bytes that already match the canonical format
    #[must_use]
    pub const fn from_pcm(data: Vec<u8>) -> Self {
        Self { data }
    }

    /// Load a WAV file and strip its 44-byte header
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is shorter than the header
    pub fn load<P: AsRef<Path>>(path: P) -> EngineResult<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| {
            EngineError::payload(format!("Failed to read {}: {e}", path.display()))
        })?;

        let payload = Self::from_wav_bytes(bytes).map_err(|e| match e {
            EngineError::PayloadLoad { message } => {
                EngineError::payload(format!("{}: {message}", path.display()))
            }
            other => other,
        })?;

        info!(
            "Loaded {} payload bytes from {}",
            payload.len(),
            path.display()
        );
        Ok(payload)
    }

    /// Strip the 44-byte header from an in-memory WAV image
    ///
    /// # Errors
    ///
    /// Returns an error if `bytes` is shorter than the header
    pub fn from_wav_bytes(mut bytes: Vec<u8>) -> EngineResult<Self> {
        if bytes.len() < crate::WAV_HEADER_LEN {
            return Err(EngineError::payload(format!(
                "file is {} bytes, shorter than the {}-byte header",
                bytes.len(),
                crate::WAV_HEADER_LEN
            )));
        }

        inspect_header(&bytes);
        bytes.drain(..crate::WAV_HEADER_LEN);
        Ok(Self { data: bytes })
    }

    /// Load through the process-wide cache.
    ///
    /// Engines opened on the same path share one read-only buffer; it is
    /// released when the last of them drops.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload is not cached and loading fails
    pub fn shared<P: AsRef<Path>>(path: P) -> EngineResult<Arc<Self>> {
        let path = path.as_ref().to_path_buf();
        let mut cache = SHARED_PAYLOADS.lock();

        if let Some(payload) = cache.get(&path).and_then(Weak::upgrade) {
            debug!("Reusing cached payload for {}", path.display());
            return Ok(payload);
        }

        let payload = Arc::new(Self::load(&path)?);
        cache.retain(|_, weak| weak.strong_count() > 0);
        cache.insert(path, Arc::downgrade(&payload));
        Ok(payload)
    }

    /// Raw PCM bytes
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Payload length in bytes
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the payload holds no audio
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Playback duration of the payload in the canonical format
    #[must_use]
    pub fn duration(&self) -> std::time::Duration {
        let rate = u64::from(WaveFormat::canonical().avg_bytes_per_sec);
        let millis = self.data.len() as u64 * 1000 / rate;
        std::time::Duration::from_millis(millis)
    }
}

/// Warn when the header does not describe canonical PCM.
///
/// The header is stripped by size regardless; this is diagnostics only.
fn inspect_header(bytes: &[u8]) {
    match hound::WavReader::new(Cursor::new(bytes)) {
        Ok(reader) => {
            let spec = reader.spec();
            let canonical = WaveFormat::canonical();
            if spec.sample_format != hound::SampleFormat::Int
                || spec.channels != canonical.channels
                || spec.sample_rate != canonical.sample_rate
                || spec.bits_per_sample != canonical.bits_per_sample
            {
                warn!(
                    "Payload header describes {} ch / {} Hz / {} bit, engine reports {}",
                    spec.channels, spec.sample_rate, spec.bits_per_sample, canonical
                );
            }
        }
        Err(e) => warn!("Payload header is not a readable WAV header: {}", e),
    }
}
