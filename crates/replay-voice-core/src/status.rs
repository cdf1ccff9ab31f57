//! Host-visible status codes.
//!
//! The host interprets every entry point's return value as an HRESULT-style
//! code: `0` is success, anything else is a failure the host decodes itself.

use serde::{Deserialize, Serialize};

/// Status code returned across the host boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatusCode(pub i32);

#[allow(clippy::cast_possible_wrap)]
impl StatusCode {
    /// Success (`S_OK`)
    pub const OK: Self = Self(0);
    /// Unspecified failure (`E_FAIL`)
    pub const FAIL: Self = Self(0x8000_4005_u32 as i32);
    /// Allocation failed (`E_OUTOFMEMORY`)
    pub const OUT_OF_MEMORY: Self = Self(0x8007_000E_u32 as i32);
    /// Invalid argument (`E_INVALIDARG`)
    pub const INVALID_ARG: Self = Self(0x8007_0057_u32 as i32);
    /// Null out-pointer (`E_POINTER`)
    pub const POINTER: Self = Self(0x8000_4003_u32 as i32);
    /// Unexpected failure, used for panics caught at the boundary (`E_UNEXPECTED`)
    pub const UNEXPECTED: Self = Self(0x8000_FFFF_u32 as i32);
    /// Interface not supported (`E_NOINTERFACE`)
    pub const NO_INTERFACE: Self = Self(0x8000_4002_u32 as i32);
    /// Object not initialized (`SPERR_UNINITIALIZED`)
    pub const UNINITIALIZED: Self = Self(0x8004_5001_u32 as i32);

    /// Whether this is the success code
    #[must_use]
    pub const fn is_success(self) -> bool {
        self.0 == 0
    }

    /// Raw HRESULT value
    #[must_use]
    pub const fn raw(self) -> i32 {
        self.0
    }
}

impl Default for StatusCode {
    fn default() -> Self {
        Self::OK
    }
}

impl From<i32> for StatusCode {
    fn from(raw: i32) -> Self {
        Self(raw)
    }
}

impl std::fmt::Display for StatusCode {
    #[allow(clippy::cast_sign_loss)]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{:08X}", self.0 as u32)
    }
}
