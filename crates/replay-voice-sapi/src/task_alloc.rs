//! Host task-memory allocation for returned format descriptors.
//!
//! On Windows descriptors come from `CoTaskMemAlloc`, so the host releases them
//! with `CoTaskMemFree`. Elsewhere the global allocator backs them and
//! [`ReplayVoice_TaskMemFree`] releases them.

use crate::ffi_types::WAVEFORMATEX;
use replay_voice_core::{EngineError, EngineResult, FormatAllocator, WaveFormat};
use std::ptr::NonNull;

/// Allocator for descriptors whose ownership passes to the host
#[derive(Debug, Clone, Copy, Default)]
pub struct TaskMemAllocator;

/// A descriptor in task memory, freed on drop unless released to the host
#[derive(Debug)]
pub struct TaskMemFormat {
    ptr: NonNull<WAVEFORMATEX>,
}

impl TaskMemFormat {
    /// Hand the descriptor to the host, which becomes responsible for freeing it
    #[must_use]
    pub fn into_raw(self) -> *mut WAVEFORMATEX {
        let ptr = self.ptr.as_ptr();
        std::mem::forget(self);
        ptr
    }

    /// The descriptor's contents
    #[must_use]
    pub fn format(&self) -> WaveFormat {
        // SAFETY: ptr is a live, initialised allocation owned by self
        WaveFormat::from(unsafe { self.ptr.as_ptr().read_unaligned() })
    }
}

impl Drop for TaskMemFormat {
    fn drop(&mut self) {
        // SAFETY: ptr came from task_alloc and was not released to the host
        unsafe { task_free(self.ptr.as_ptr().cast()) }
    }
}

impl FormatAllocator for TaskMemAllocator {
    type Allocation = TaskMemFormat;

    fn allocate(&self, format: &WaveFormat) -> EngineResult<Self::Allocation> {
        let raw = task_alloc(std::mem::size_of::<WAVEFORMATEX>()).cast::<WAVEFORMATEX>();
        let ptr = NonNull::new(raw).ok_or_else(|| {
            EngineError::allocation("task memory allocation for WAVEFORMATEX failed")
        })?;

        // SAFETY: ptr is a fresh allocation sized for one WAVEFORMATEX
        unsafe { ptr.as_ptr().write_unaligned(WAVEFORMATEX::from(format)) };
        Ok(TaskMemFormat { ptr })
    }
}

#[cfg(windows)]
fn task_alloc(size: usize) -> *mut u8 {
    // SAFETY: CoTaskMemAlloc has no preconditions
    unsafe { winapi::um::combaseapi::CoTaskMemAlloc(size) }.cast()
}

#[cfg(windows)]
unsafe fn task_free(ptr: *mut u8) {
    winapi::um::combaseapi::CoTaskMemFree(ptr.cast());
}

#[cfg(not(windows))]
fn task_layout() -> std::alloc::Layout {
    std::alloc::Layout::new::<WAVEFORMATEX>()
}

#[cfg(not(windows))]
fn task_alloc(size: usize) -> *mut u8 {
    debug_assert_eq!(size, task_layout().size());
    // SAFETY: the layout has non-zero size
    unsafe { std::alloc::alloc(task_layout()) }
}

#[cfg(not(windows))]
unsafe fn task_free(ptr: *mut u8) {
    if !ptr.is_null() {
        std::alloc::dealloc(ptr, task_layout());
    }
}

/// Release a descriptor returned by `GetOutputFormat`.
///
/// Non-Windows hosts have no `CoTaskMemFree`; they call this instead.
///
/// # Safety
///
/// `ptr` must be null or a descriptor returned by this library and not yet freed.
#[cfg(not(windows))]
#[no_mangle]
pub unsafe extern "C" fn ReplayVoice_TaskMemFree(ptr: *mut WAVEFORMATEX) {
    task_free(ptr.cast());
}
