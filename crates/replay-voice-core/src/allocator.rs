//! Out-parameter allocation.
//!
//! Format descriptors handed back to the host must come from the allocator the
//! host designates, because the host frees them itself. The engine never keeps
//! a handle to an allocation once it has been returned.

use crate::error::EngineResult;
use crate::wave_format::WaveFormat;

/// Allocator for format descriptors returned across the host boundary
pub trait FormatAllocator {
    /// Owned handle to an allocated descriptor
    type Allocation;

    /// Allocate a fresh descriptor initialised from `format`
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Allocation`](crate::EngineError::Allocation) if
    /// memory could not be obtained
    fn allocate(&self, format: &WaveFormat) -> EngineResult<Self::Allocation>;
}

/// Allocator for in-process Rust hosts, backed by the global heap
#[derive(Debug, Clone, Copy, Default)]
pub struct BoxAllocator;

impl FormatAllocator for BoxAllocator {
    type Allocation = Box<WaveFormat>;

    fn allocate(&self, format: &WaveFormat) -> EngineResult<Self::Allocation> {
        Ok(Box::new(*format))
    }
}
