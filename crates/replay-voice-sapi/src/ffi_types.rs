//! `#[repr(C)]` mirrors of the SAPI 5 engine ABI.
//!
//! Only the structures the engine reads or writes are declared. Field names
//! follow Rust conventions; layout follows `sapiddk.h`.

use replay_voice_core::{FormatTag, StatusCode, SynthesisEvent, WaveFormat};
use std::ffi::c_void;
use uuid::Uuid;

/// COM status code
pub type HRESULT = i32;

/// `S_OK`
pub const S_OK: HRESULT = StatusCode::OK.raw();

/// COM `GUID`
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct GUID {
    pub data1: u32,
    pub data2: u16,
    pub data3: u16,
    pub data4: [u8; 8],
}

impl GUID {
    /// Build from the 128-bit big-endian form, e.g. `0x00000000_0000_0000_C000_000000000046`
    #[must_use]
    pub const fn from_u128(value: u128) -> Self {
        Self {
            data1: (value >> 96) as u32,
            data2: (value >> 80) as u16,
            data3: (value >> 64) as u16,
            data4: (value as u64).to_be_bytes(),
        }
    }

    #[must_use]
    pub fn from_uuid(id: Uuid) -> Self {
        Self::from_u128(id.as_u128())
    }

    #[must_use]
    pub fn to_uuid(&self) -> Uuid {
        Uuid::from_fields(self.data1, self.data2, self.data3, &self.data4)
    }
}

impl From<Uuid> for GUID {
    fn from(id: Uuid) -> Self {
        Self::from_uuid(id)
    }
}

impl From<GUID> for Uuid {
    fn from(guid: GUID) -> Self {
        guid.to_uuid()
    }
}

/// `IID_IUnknown`
pub const IID_IUNKNOWN: GUID = GUID::from_u128(0x0000_0000_0000_0000_C000_0000_0000_0046);

/// `IID_ISpTTSEngine`
pub const IID_ISP_TTS_ENGINE: GUID = GUID::from_u128(0xA74D_7C8E_4CC5_4F2F_A6EB_804D_EE18_500E);

/// `IID_ISpObjectWithToken`
pub const IID_ISP_OBJECT_WITH_TOKEN: GUID =
    GUID::from_u128(0x5B55_9F40_E952_11D2_BB91_00C0_4F8E_E6C0);

/// Packed `WAVEFORMATEX`, 18 bytes
#[repr(C, packed)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WAVEFORMATEX {
    pub format_tag: u16,
    pub channels: u16,
    pub samples_per_sec: u32,
    pub avg_bytes_per_sec: u32,
    pub block_align: u16,
    pub bits_per_sample: u16,
    pub cb_size: u16,
}

impl From<&WaveFormat> for WAVEFORMATEX {
    fn from(format: &WaveFormat) -> Self {
        Self {
            format_tag: format.tag.raw(),
            channels: format.channels,
            samples_per_sec: format.sample_rate,
            avg_bytes_per_sec: format.avg_bytes_per_sec,
            block_align: format.block_align,
            bits_per_sample: format.bits_per_sample,
            cb_size: format.extra_size,
        }
    }
}

impl From<WAVEFORMATEX> for WaveFormat {
    fn from(raw: WAVEFORMATEX) -> Self {
        Self {
            tag: FormatTag::from_raw(raw.format_tag),
            channels: raw.channels,
            sample_rate: raw.samples_per_sec,
            avg_bytes_per_sec: raw.avg_bytes_per_sec,
            block_align: raw.block_align,
            bits_per_sample: raw.bits_per_sample,
            extra_size: raw.cb_size,
        }
    }
}

/// `SPVPITCH`
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct SPVPITCH {
    pub middle_adj: i32,
    pub range_adj: i32,
}

/// `SPVCONTEXT`
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct SPVCONTEXT {
    pub category: *const u16,
    pub before: *const u16,
    pub after: *const u16,
}

/// `SPVSTATE`: per-fragment rendering state
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct SPVSTATE {
    pub action: i32,
    pub lang_id: u16,
    pub reserved: u16,
    pub emph_adj: i32,
    pub rate_adj: i32,
    pub volume: u32,
    pub pitch_adj: SPVPITCH,
    pub silence_msecs: u32,
    pub phone_ids: *mut u16,
    pub part_of_speech: i32,
    pub context: SPVCONTEXT,
}

impl Default for SPVSTATE {
    fn default() -> Self {
        Self {
            action: 0,
            lang_id: 0x409,
            reserved: 0,
            emph_adj: 0,
            rate_adj: 0,
            volume: 100,
            pitch_adj: SPVPITCH::default(),
            silence_msecs: 0,
            phone_ids: std::ptr::null_mut(),
            part_of_speech: 0,
            context: SPVCONTEXT {
                category: std::ptr::null(),
                before: std::ptr::null(),
                after: std::ptr::null(),
            },
        }
    }
}

/// `SPVTEXTFRAG`: one node of the host's fragment list
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct SPVTEXTFRAG {
    pub next: *mut SPVTEXTFRAG,
    pub state: SPVSTATE,
    pub text_start: *const u16,
    pub text_len: u32,
    pub text_src_offset: u32,
}

/// `SPEVENT`
///
/// The event id and parameter type are 16-bit bitfields sharing one 32-bit
/// unit in the C declaration.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SPEVENT {
    pub event_id: u16,
    pub param_type: u16,
    pub stream_num: u32,
    pub audio_stream_offset: u64,
    pub w_param: usize,
    pub l_param: isize,
}

impl From<&SynthesisEvent> for SPEVENT {
    fn from(event: &SynthesisEvent) -> Self {
        Self {
            event_id: event.event_id.raw(),
            param_type: event.param_type.raw(),
            stream_num: event.stream_number,
            audio_stream_offset: event.audio_stream_offset,
            w_param: event.w_param,
            l_param: event.l_param,
        }
    }
}

/// `ISpTTSEngineSite` vtable, `IUnknown` and `ISpEventSink` methods first
#[repr(C)]
pub struct ISpTTSEngineSiteVtbl {
    pub query_interface:
        unsafe extern "system" fn(*mut ISpTTSEngineSite, *const GUID, *mut *mut c_void) -> HRESULT,
    pub add_ref: unsafe extern "system" fn(*mut ISpTTSEngineSite) -> u32,
    pub release: unsafe extern "system" fn(*mut ISpTTSEngineSite) -> u32,
    pub add_events:
        unsafe extern "system" fn(*mut ISpTTSEngineSite, *const SPEVENT, u32) -> HRESULT,
    pub get_event_interest: unsafe extern "system" fn(*mut ISpTTSEngineSite, *mut u64) -> HRESULT,
    pub get_actions: unsafe extern "system" fn(*mut ISpTTSEngineSite) -> u32,
    pub write:
        unsafe extern "system" fn(*mut ISpTTSEngineSite, *const c_void, u32, *mut u32) -> HRESULT,
    pub get_rate: unsafe extern "system" fn(*mut ISpTTSEngineSite, *mut i32) -> HRESULT,
    pub get_volume: unsafe extern "system" fn(*mut ISpTTSEngineSite, *mut u16) -> HRESULT,
    pub get_skip_info:
        unsafe extern "system" fn(*mut ISpTTSEngineSite, *mut i32, *mut i32) -> HRESULT,
    pub complete_skip: unsafe extern "system" fn(*mut ISpTTSEngineSite, i32) -> HRESULT,
}

/// Host output site interface pointer target
#[repr(C)]
pub struct ISpTTSEngineSite {
    pub vtbl: *const ISpTTSEngineSiteVtbl,
}

/// `ISpTTSEngine` vtable
#[repr(C)]
pub struct ISpTTSEngineVtbl {
    pub query_interface:
        unsafe extern "system" fn(*mut ISpTTSEngine, *const GUID, *mut *mut c_void) -> HRESULT,
    pub add_ref: unsafe extern "system" fn(*mut ISpTTSEngine) -> u32,
    pub release: unsafe extern "system" fn(*mut ISpTTSEngine) -> u32,
    pub speak: unsafe extern "system" fn(
        *mut ISpTTSEngine,
        u32,
        *const GUID,
        *const WAVEFORMATEX,
        *const SPVTEXTFRAG,
        *mut ISpTTSEngineSite,
    ) -> HRESULT,
    pub get_output_format: unsafe extern "system" fn(
        *mut ISpTTSEngine,
        *const GUID,
        *const WAVEFORMATEX,
        *mut GUID,
        *mut *mut WAVEFORMATEX,
    ) -> HRESULT,
}

/// Engine interface pointer target
#[repr(C)]
pub struct ISpTTSEngine {
    pub vtbl: &'static ISpTTSEngineVtbl,
}

/// `ISpObjectWithToken` vtable
#[repr(C)]
pub struct ISpObjectWithTokenVtbl {
    pub query_interface: unsafe extern "system" fn(
        *mut ISpObjectWithToken,
        *const GUID,
        *mut *mut c_void,
    ) -> HRESULT,
    pub add_ref: unsafe extern "system" fn(*mut ISpObjectWithToken) -> u32,
    pub release: unsafe extern "system" fn(*mut ISpObjectWithToken) -> u32,
    pub set_object_token:
        unsafe extern "system" fn(*mut ISpObjectWithToken, *mut c_void) -> HRESULT,
    pub get_object_token:
        unsafe extern "system" fn(*mut ISpObjectWithToken, *mut *mut c_void) -> HRESULT,
}

/// Token-association interface pointer target
#[repr(C)]
pub struct ISpObjectWithToken {
    pub vtbl: &'static ISpObjectWithTokenVtbl,
}

#[cfg(test)]
mod tests {
    use super::*;
    use replay_voice_core::WAVE_FORMAT_EX_ID;
    use std::mem::size_of;

    #[test]
    fn test_layouts() {
        assert_eq!(size_of::<GUID>(), 16);
        assert_eq!(size_of::<WAVEFORMATEX>(), 18);
        assert_eq!(size_of::<SPEVENT>(), 16 + 2 * size_of::<usize>());
    }

    #[test]
    fn test_guid_fields() {
        let guid = GUID::from(WAVE_FORMAT_EX_ID);
        assert_eq!(guid.data1, 0xC31A_DBAE);
        assert_eq!(guid.data2, 0x527F);
        assert_eq!(guid.data3, 0x4FF5);
        assert_eq!(guid.data4, [0xA2, 0x30, 0xF6, 0x2B, 0xB6, 0x1F, 0xF7, 0x0C]);
        assert_eq!(guid.to_uuid(), WAVE_FORMAT_EX_ID);
    }

    #[test]
    fn test_waveformatex_matches_encoding() {
        let canonical = WaveFormat::canonical();
        let raw = WAVEFORMATEX::from(&canonical);
        // SAFETY: WAVEFORMATEX is packed plain data of exactly 18 bytes
        let bytes: [u8; 18] = unsafe { std::mem::transmute(raw) };
        assert_eq!(bytes, canonical.to_le_bytes());
        assert_eq!(WaveFormat::from(raw), canonical);
    }
}
