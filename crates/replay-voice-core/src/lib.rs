//! # Replay Voice Core
//!
//! Synthesis-engine contract for a SAPI-style text-to-speech host.
//!
//! The engine does not synthesize speech. It replays a canned PCM waveform,
//! emits a sentence boundary event for the submitted text and tells the host
//! which sample format it produces. Everything the host owns (the fragment
//! list, the output site, the out-parameter allocator) is reached through a
//! trait so the same engine drives both the COM surface and plain Rust tests.
//!
//! ## Features
//!
//! - Canonical 16 kHz / 16-bit / mono PCM output format negotiation
//! - Borrowed traversal of caller-owned text fragment chains
//! - Event-before-audio ordering on the host output site
//! - Offline voice registration script generation
//!
//! ## Example
//!
//! ```rust,no_run
//! use replay_voice_core::{
//!     BoxAllocator, EngineConfig, SpeakFlags, TextFragment, TtsEngine, WAVE_FORMAT_EX_ID,
//! };
//! # use replay_voice_core::{ActionSet, OutputSite, StatusCode, SynthesisEvent};
//! # struct Site;
//! # impl OutputSite for Site {
//! #     fn get_actions(&self) -> ActionSet { ActionSet::CONTINUE }
//! #     fn add_events(&self, _: &[SynthesisEvent]) -> StatusCode { StatusCode::OK }
//! #     fn write(&self, data: &[u8]) -> Result<u32, StatusCode> { Ok(data.len() as u32) }
//! # }
//!
//! fn main() -> replay_voice_core::EngineResult<()> {
//!     let engine = TtsEngine::with_config(EngineConfig::default())?;
//!     let negotiated = engine.get_output_format(None, None, &BoxAllocator)?;
//!
//!     let text: Vec<u16> = "Open the pod-bay doors, Hal.".encode_utf16().collect();
//!     let fragment = TextFragment::new(&text, 0);
//!     let report = engine.speak(
//!         SpeakFlags::DEFAULT,
//!         &WAVE_FORMAT_EX_ID,
//!         Some(&*negotiated.format),
//!         Some(&fragment),
//!         &Site,
//!     )?;
//!     assert_eq!(report.text_length, 28);
//!     Ok(())
//! }
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod allocator;
pub mod config;
pub mod error;
pub mod output_site;
pub mod payload;
pub mod registration;
pub mod status;
pub mod text_fragment;
pub mod tts_engine;
pub mod wave_format;

// Re-export main types for convenience
pub use allocator::{BoxAllocator, FormatAllocator};
pub use config::EngineConfig;
pub use error::{EngineError, EngineResult};
pub use output_site::{ActionSet, EventId, OutputSite, ParamType, SpeakFlags, SynthesisEvent};
pub use payload::AudioPayload;
pub use registration::{ComServerEntry, Gender, RegistrationScript, VoiceRegistryEntry};
pub use status::StatusCode;
pub use text_fragment::{fragments, measure_total_length, FragmentLink, Fragments, TextFragment};
pub use tts_engine::{
    EngineState, EngineStats, NegotiatedFormat, ObjectToken, SpeakReport, TtsEngine,
};
pub use wave_format::{FormatTag, WaveFormat, WAVE_FORMAT_EX_ID};

/// Version information for the replay-voice-core crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Sample rate of the canonical output format (16 kHz)
pub const CANONICAL_SAMPLE_RATE: u32 = 16_000;

/// Channel count of the canonical output format (mono)
pub const CANONICAL_CHANNELS: u16 = 1;

/// Bit depth of the canonical output format
pub const CANONICAL_BITS_PER_SAMPLE: u16 = 16;

/// Size of the container header stripped from the canned payload file
pub const WAV_HEADER_LEN: usize = 44;
