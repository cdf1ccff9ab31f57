//! SAPI 5 bindings for the Replay Voice engine
//!
//! This crate exposes [`replay_voice_core::TtsEngine`] to a SAPI host as an
//! in-process COM object implementing `ISpTTSEngine` and `ISpObjectWithToken`.
//! [`ReplayVoice_CreateEngine`] is the construction entry point; class factory
//! and self-registration plumbing stay with the hosting shim.
//!
//! Voice registration itself is an offline step, see the `replay-voice-register`
//! binary.

#![warn(clippy::all)]
#![allow(non_snake_case, clippy::upper_case_acronyms, clippy::missing_safety_doc)]

pub mod engine_object;
pub mod error;
pub mod ffi_types;
pub mod logging;
pub mod site;
pub mod task_alloc;

pub use engine_object::{EngineObject, ReplayVoice_CreateEngine};
pub use error::{BoundaryError, BoundaryResult, IntoHResult};
pub use site::{HostFragment, SiteAdapter};
pub use task_alloc::{TaskMemAllocator, TaskMemFormat};

#[cfg(not(windows))]
pub use task_alloc::ReplayVoice_TaskMemFree;
