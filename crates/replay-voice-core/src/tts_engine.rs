//! Synthesis engine.
//!
//! `TtsEngine` implements the two halves of the host contract: format
//! negotiation and `speak`. Both are stateless with respect to the engine's
//! lifecycle; only `set_object_token` moves the engine from `Ready` to
//! `TokenBound`.
//!
//! The host serializes calls on one instance. The token field sits behind a
//! mutex and the counters are atomics, so misuse from several threads cannot
//! corrupt state, but event/audio ordering is only guaranteed per call.

use crate::allocator::FormatAllocator;
use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::output_site::{OutputSite, SpeakFlags, SynthesisEvent};
use crate::payload::AudioPayload;
use crate::text_fragment::{self, FragmentLink};
use crate::wave_format::{WaveFormat, WAVE_FORMAT_EX_ID};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Opaque handle to the host's voice registry entry.
///
/// The engine stores and returns it verbatim; it never dereferences,
/// validates or reference-counts the handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectToken(usize);

impl ObjectToken {
    /// Wrap a host handle
    #[must_use]
    pub const fn from_raw(handle: usize) -> Self {
        Self(handle)
    }

    /// The host handle
    #[must_use]
    pub const fn as_raw(self) -> usize {
        self.0
    }
}

/// Lifecycle position of an engine instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EngineState {
    /// Payload loaded, no token associated yet
    Ready,
    /// A token has been associated
    TokenBound,
}

impl std::fmt::Display for EngineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ready => write!(f, "Ready"),
            Self::TokenBound => write!(f, "TokenBound"),
        }
    }
}

/// Result of format negotiation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NegotiatedFormat<T> {
    /// Format-kind identifier, always [`WAVE_FORMAT_EX_ID`]
    pub format_id: Uuid,
    /// Descriptor allocated by the caller's allocator
    pub format: T,
}

/// Outcome of one `speak` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpeakReport {
    /// Total text length across all fragments
    pub text_length: u32,
    /// Bytes handed to the site
    pub bytes_requested: u32,
    /// Bytes the site reported as written
    pub bytes_written: u32,
}

impl SpeakReport {
    /// Whether the site accepted fewer bytes than requested
    #[must_use]
    pub const fn short_write(&self) -> bool {
        self.bytes_written != self.bytes_requested
    }
}

/// Engine statistics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineStats {
    /// Current lifecycle position
    pub state: EngineState,
    /// Completed and failed `speak` calls
    pub speak_calls: u64,
    /// `speak` calls whose write came back short
    pub short_writes: u64,
    /// Bytes the site reported as written, over all calls
    pub bytes_written: u64,
    /// Size of the replayed payload
    pub payload_len: usize,
}

/// Replaying TTS engine
#[derive(Debug)]
pub struct TtsEngine {
    config: EngineConfig,
    payload: Arc<AudioPayload>,
    payload_len: u32,
    token: Mutex<Option<ObjectToken>>,
    speak_calls: AtomicU64,
    short_writes: AtomicU64,
    bytes_written: AtomicU64,
}

impl TtsEngine {
    /// Create an engine from discovered configuration
    ///
    /// # Errors
    ///
    /// Returns an error if configuration or the payload cannot be loaded
    pub fn new() -> EngineResult<Self> {
        Self::with_config(EngineConfig::discover()?)
    }

    /// Create an engine, loading the payload named by `config`
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the payload fails
    /// to load; no engine exists in that case
    pub fn with_config(config: EngineConfig) -> EngineResult<Self> {
        config.validate()?;
        info!("Creating TTS engine with config: {:?}", config);

        let payload = if config.share_payload {
            AudioPayload::shared(&config.payload_path)?
        } else {
            Arc::new(AudioPayload::load(&config.payload_path)?)
        };

        Self::with_payload(config, payload)
    }

    /// Create an engine around an already loaded payload
    ///
    /// # Errors
    ///
    /// Returns an error if the payload cannot be written in a single call
    pub fn with_payload(config: EngineConfig, payload: Arc<AudioPayload>) -> EngineResult<Self> {
        let payload_len = u32::try_from(payload.len()).map_err(|_| {
            EngineError::payload(format!(
                "payload of {} bytes exceeds a single write",
                payload.len()
            ))
        })?;

        Ok(Self {
            config,
            payload,
            payload_len,
            token: Mutex::new(None),
            speak_calls: AtomicU64::new(0),
            short_writes: AtomicU64::new(0),
            bytes_written: AtomicU64::new(0),
        })
    }

    /// Current lifecycle position
    #[must_use]
    pub fn state(&self) -> EngineState {
        if self.token.lock().is_some() {
            EngineState::TokenBound
        } else {
            EngineState::Ready
        }
    }

    /// Associate the host's registry token, replacing any previous one
    pub fn set_object_token(&self, token: ObjectToken) {
        debug!("SetObjectToken: {:#x}", token.as_raw());
        let previous = self.token.lock().replace(token);
        if let Some(previous) = previous {
            debug!("Replaced object token {:#x}", previous.as_raw());
        }
    }

    /// The associated registry token
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::MissingToken`] if no token was ever set
    pub fn object_token(&self) -> EngineResult<ObjectToken> {
        let token = *self.token.lock();
        token.ok_or_else(|| {
            warn!("GetObjectToken called before SetObjectToken");
            EngineError::MissingToken
        })
    }

    /// Report the format `speak` will produce.
    ///
    /// Always the canonical PCM format, whatever was requested. Each call
    /// allocates a fresh descriptor through `allocator`; ownership passes to
    /// the caller.
    ///
    /// # Errors
    ///
    /// Returns an error if the allocator fails
    pub fn get_output_format<A: FormatAllocator>(
        &self,
        requested_id: Option<&Uuid>,
        requested_format: Option<&WaveFormat>,
        allocator: &A,
    ) -> EngineResult<NegotiatedFormat<A::Allocation>> {
        match (requested_id, requested_format) {
            (None, _) => debug!("GetOutputFormat: no target format"),
            (Some(id), Some(format)) => debug!("GetOutputFormat: target {} ({})", id, format),
            (Some(id), None) => debug!("GetOutputFormat: target {} without descriptor", id),
        }

        let format = allocator.allocate(&WaveFormat::canonical())?;
        Ok(NegotiatedFormat {
            format_id: WAVE_FORMAT_EX_ID,
            format,
        })
    }

    /// Render one utterance to the host's output site.
    ///
    /// Pushes a single sentence boundary event carrying the total text length,
    /// then writes the whole payload in one call. The event always precedes
    /// the audio. `flags` and the format arguments are logged only.
    ///
    /// # Errors
    ///
    /// - [`EngineError::SinkRejected`] if the site refuses the event; no audio
    ///   is written
    /// - [`EngineError::WriteFailed`] if the site fails the write
    /// - [`EngineError::ShortWrite`] on a short write, only when
    ///   `fail_on_short_write` is configured
    pub fn speak<F, S>(
        &self,
        flags: SpeakFlags,
        format_id: &Uuid,
        format: Option<&WaveFormat>,
        fragments: Option<&F>,
        site: &S,
    ) -> EngineResult<SpeakReport>
    where
        F: FragmentLink,
        S: OutputSite + ?Sized,
    {
        self.speak_calls.fetch_add(1, Ordering::Relaxed);
        debug!("Speak: flags={}, format_id={}", flags, format_id);
        if let Some(format) = format {
            if *format != WaveFormat::canonical() {
                warn!("Speak asked for {}, payload is canonical PCM", format);
            }
        }

        let text_length = if self.config.log_fragments {
            text_fragment::log_fragments(fragments)
        } else {
            text_fragment::measure_total_length(fragments)
        };

        let actions = site.get_actions();
        debug!("Pending actions: {}", actions);

        let event = SynthesisEvent::sentence_boundary(text_length);
        let status = site.add_events(std::slice::from_ref(&event));
        if !status.is_success() {
            warn!("Output site rejected sentence boundary event: {}", status);
            return Err(EngineError::SinkRejected { status });
        }

        let bytes_written = site.write(self.payload.as_bytes()).map_err(|status| {
            warn!("Output site write failed: {}", status);
            EngineError::WriteFailed { status }
        })?;
        self.bytes_written
            .fetch_add(u64::from(bytes_written), Ordering::Relaxed);

        let report = SpeakReport {
            text_length,
            bytes_requested: self.payload_len,
            bytes_written,
        };

        if report.short_write() {
            self.short_writes.fetch_add(1, Ordering::Relaxed);
            warn!(
                "Short write: {} of {} bytes accepted",
                bytes_written, self.payload_len
            );
            if self.config.fail_on_short_write {
                return Err(EngineError::ShortWrite {
                    requested: self.payload_len,
                    written: bytes_written,
                });
            }
        }

        info!(
            "Spoke {} characters as {} audio bytes",
            text_length, bytes_written
        );
        Ok(report)
    }

    /// The replayed payload
    #[must_use]
    pub fn payload(&self) -> &AudioPayload {
        &self.payload
    }

    /// Get engine configuration
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Get engine statistics
    #[must_use]
    pub fn stats(&self) -> EngineStats {
        EngineStats {
            state: self.state(),
            speak_calls: self.speak_calls.load(Ordering::Relaxed),
            short_writes: self.short_writes.load(Ordering::Relaxed),
            bytes_written: self.bytes_written.load(Ordering::Relaxed),
            payload_len: self.payload.len(),
        }
    }
}
