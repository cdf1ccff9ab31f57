//! Host output site contract.
//!
//! The host implements [`OutputSite`]; the engine only consumes it. Every call
//! is a blocking call into host code with no latency bound.

use crate::status::StatusCode;
use serde::{Deserialize, Serialize};

/// Callback surface the host provides to a `speak` call
#[cfg_attr(test, mockall::automock)]
pub trait OutputSite {
    /// Actions the host wants the engine to take (non-blocking, may be empty)
    fn get_actions(&self) -> ActionSet;

    /// Queue events on the host's event stream.
    ///
    /// Anything other than [`StatusCode::OK`] is fatal for the current call.
    fn add_events(&self, events: &[SynthesisEvent]) -> StatusCode;

    /// Write raw audio bytes, returning how many the host accepted.
    ///
    /// A short count is not an error at this layer.
    ///
    /// # Errors
    ///
    /// Returns the host's failure status if the write failed outright
    fn write(&self, data: &[u8]) -> Result<u32, StatusCode>;
}

/// Event identifiers understood by the host event stream (`SPEVENTENUM`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u16)]
pub enum EventId {
    /// Start of an input stream
    StartInputStream = 1,
    /// End of an input stream
    EndInputStream = 2,
    /// Voice changed
    VoiceChange = 3,
    /// Bookmark reached
    Bookmark = 4,
    /// Word boundary
    WordBoundary = 5,
    /// Phoneme boundary
    Phoneme = 6,
    /// Sentence boundary
    SentenceBoundary = 7,
    /// Viseme change
    Viseme = 8,
    /// Audio level
    AudioLevel = 9,
}

impl EventId {
    /// Raw `SPEI_*` value
    #[must_use]
    pub const fn raw(self) -> u16 {
        self as u16
    }
}

/// Meaning of an event's `l_param` (`SPEVENTLPARAMTYPE`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u16)]
pub enum ParamType {
    /// `l_param` carries no defined meaning
    Undefined = 0,
    /// `l_param` is an object token
    Token = 1,
    /// `l_param` is a COM object
    Object = 2,
    /// `l_param` points to allocated memory
    Pointer = 3,
    /// `l_param` points to a string
    String = 4,
}

impl ParamType {
    /// Raw `SPET_LPARAM_*` value
    #[must_use]
    pub const fn raw(self) -> u16 {
        self as u16
    }
}

/// One timed event pushed to the output site
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SynthesisEvent {
    /// Event kind
    pub event_id: EventId,
    /// Interpretation of `l_param`
    pub param_type: ParamType,
    /// Stream the event belongs to
    pub stream_number: u32,
    /// Byte offset in the audio stream at which the event fires
    pub audio_stream_offset: u64,
    /// Integer parameter
    pub w_param: usize,
    /// Integer-or-pointer parameter
    pub l_param: isize,
}

impl SynthesisEvent {
    /// Sentence boundary carrying the utterance's total text length in `w_param`
    #[must_use]
    pub const fn sentence_boundary(text_length: u32) -> Self {
        Self {
            event_id: EventId::SentenceBoundary,
            param_type: ParamType::Undefined,
            stream_number: 0,
            audio_stream_offset: 0,
            w_param: text_length as usize,
            l_param: 0,
        }
    }
}

macro_rules! bit_set {
    (
        $(#[$meta:meta])*
        $name:ident { $($(#[$flag_meta:meta])* $flag:ident = $value:expr),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(u32);

        impl $name {
            $($(#[$flag_meta])* pub const $flag: Self = Self($value);)+

            /// Wrap raw bits from the host
            #[must_use]
            pub const fn from_bits(bits: u32) -> Self {
                Self(bits)
            }

            /// Raw bits
            #[must_use]
            pub const fn bits(self) -> u32 {
                self.0
            }

            /// Whether every bit of `other` is set
            #[must_use]
            pub const fn contains(self, other: Self) -> bool {
                self.0 & other.0 == other.0
            }

            /// Whether no bit is set
            #[must_use]
            pub const fn is_empty(self) -> bool {
                self.0 == 0
            }
        }

        impl std::ops::BitOr for $name {
            type Output = Self;

            fn bitor(self, rhs: Self) -> Self {
                Self(self.0 | rhs.0)
            }
        }

        impl std::fmt::Debug for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                let names: Vec<&str> = [$((stringify!($flag), Self::$flag.0)),+]
                    .iter()
                    .filter(|(_, bits)| *bits != 0 && self.0 & bits == *bits)
                    .map(|(name, _)| *name)
                    .collect();
                if names.is_empty() {
                    write!(f, "{}(0x{:X})", stringify!($name), self.0)
                } else {
                    write!(f, "{}(0x{:X}: {})", stringify!($name), self.0, names.join(" | "))
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                std::fmt::Debug::fmt(self, f)
            }
        }
    };
}

bit_set! {
    /// Pending host actions returned by [`OutputSite::get_actions`] (`SPVESACTIONS`)
    ActionSet {
        /// Nothing pending
        CONTINUE = 0,
        /// Abort the current utterance
        ABORT = 1 << 0,
        /// Skip ahead
        SKIP = 1 << 1,
        /// Rate changed
        RATE = 1 << 2,
        /// Volume changed
        VOLUME = 1 << 3,
    }
}

bit_set! {
    /// Flags the host passes to `speak` (`SPEAKFLAGS`)
    SpeakFlags {
        /// No flags
        DEFAULT = 0,
        /// Asynchronous speak request
        ASYNC = 1 << 0,
        /// Purge pending requests before speaking
        PURGE_BEFORE_SPEAK = 1 << 1,
        /// Text is a file name
        IS_FILENAME = 1 << 2,
        /// Text is XML markup
        IS_XML = 1 << 3,
        /// Text is not XML markup
        IS_NOT_XML = 1 << 4,
        /// Persist XML state changes
        PERSIST_XML = 1 << 5,
        /// Speak punctuation
        NLP_SPEAK_PUNC = 1 << 6,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentence_boundary_event() {
        let event = SynthesisEvent::sentence_boundary(22);
        assert_eq!(event.event_id, EventId::SentenceBoundary);
        assert_eq!(event.event_id.raw(), 7);
        assert_eq!(event.param_type.raw(), 0);
        assert_eq!(event.stream_number, 0);
        assert_eq!(event.audio_stream_offset, 0);
        assert_eq!(event.w_param, 22);
        assert_eq!(event.l_param, 0);
    }

    #[test]
    fn test_action_set_contains() {
        let actions = ActionSet::ABORT | ActionSet::VOLUME;
        assert!(actions.contains(ActionSet::ABORT));
        assert!(actions.contains(ActionSet::VOLUME));
        assert!(!actions.contains(ActionSet::SKIP));
        assert!(ActionSet::CONTINUE.is_empty());
        assert_eq!(actions.bits(), 0b1001);
    }

    #[test]
    fn test_flag_debug_names() {
        let flags = SpeakFlags::ASYNC | SpeakFlags::IS_XML;
        assert_eq!(format!("{flags:?}"), "SpeakFlags(0x9: ASYNC | IS_XML)");
        assert_eq!(SpeakFlags::DEFAULT.to_string(), "SpeakFlags(0x0)");
        assert_eq!(SpeakFlags::from_bits(0x100).to_string(), "SpeakFlags(0x100)");
    }
}
