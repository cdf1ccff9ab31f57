//! The engine as a COM object.
//!
//! One heap block carries both interface pointers (`ISpTTSEngine` at offset 0,
//! `ISpObjectWithToken` one pointer later), an atomic reference count and the
//! core [`TtsEngine`]. Every entry point catches panics and reports failures
//! as an `HRESULT`; nothing unwinds into the host.

use crate::error::{BoundaryError, BoundaryResult, IntoHResult};
use crate::ffi_types::{
    ISpObjectWithToken, ISpObjectWithTokenVtbl, ISpTTSEngine, ISpTTSEngineSite, ISpTTSEngineVtbl,
    GUID, HRESULT, IID_ISP_OBJECT_WITH_TOKEN, IID_ISP_TTS_ENGINE, IID_IUNKNOWN, SPVTEXTFRAG,
    WAVEFORMATEX,
};
use crate::site::{HostFragment, SiteAdapter};
use crate::task_alloc::TaskMemAllocator;
use replay_voice_core::{EngineConfig, ObjectToken, SpeakFlags, StatusCode, TtsEngine, WaveFormat};
use std::ffi::{c_char, c_void, CStr};
use std::mem::offset_of;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{fence, AtomicU32, Ordering};
use tracing::{debug, info};

/// COM object wrapping one [`TtsEngine`]
#[repr(C)]
pub struct EngineObject {
    tts: ISpTTSEngine,
    token: ISpObjectWithToken,
    ref_count: AtomicU32,
    engine: TtsEngine,
}

impl EngineObject {
    /// Box an engine with a reference count of one and return its
    /// `ISpTTSEngine` pointer. The caller owns that reference.
    #[must_use]
    pub fn into_raw(engine: TtsEngine) -> *mut ISpTTSEngine {
        let object = Box::new(Self {
            tts: ISpTTSEngine { vtbl: &TTS_VTBL },
            token: ISpObjectWithToken { vtbl: &TOKEN_VTBL },
            ref_count: AtomicU32::new(1),
            engine,
        });
        Box::into_raw(object).cast()
    }

    /// The wrapped engine
    #[must_use]
    pub const fn engine(&self) -> &TtsEngine {
        &self.engine
    }

    const fn tts_object(this: *mut ISpTTSEngine) -> *mut Self {
        this.cast()
    }

    unsafe fn token_object(this: *mut ISpObjectWithToken) -> *mut Self {
        this.cast::<u8>()
            .sub(offset_of!(EngineObject, token))
            .cast()
    }

    unsafe fn from_tts<'a>(this: *mut ISpTTSEngine) -> &'a Self {
        &*Self::tts_object(this)
    }

    unsafe fn from_token<'a>(this: *mut ISpObjectWithToken) -> &'a Self {
        &*Self::token_object(this)
    }

    fn tts_ptr(&self) -> *mut c_void {
        std::ptr::addr_of!(self.tts).cast_mut().cast()
    }

    fn token_ptr(&self) -> *mut c_void {
        std::ptr::addr_of!(self.token).cast_mut().cast()
    }

    unsafe fn query_interface(&self, riid: *const GUID, ppv: *mut *mut c_void) -> HRESULT {
        if ppv.is_null() {
            return StatusCode::POINTER.raw();
        }
        *ppv = std::ptr::null_mut();

        let Some(iid) = riid.as_ref() else {
            return StatusCode::POINTER.raw();
        };

        let interface = if *iid == IID_IUNKNOWN || *iid == IID_ISP_TTS_ENGINE {
            self.tts_ptr()
        } else if *iid == IID_ISP_OBJECT_WITH_TOKEN {
            self.token_ptr()
        } else {
            debug!("QueryInterface: unsupported interface {}", iid.to_uuid());
            return StatusCode::NO_INTERFACE.raw();
        };

        self.add_ref();
        *ppv = interface;
        StatusCode::OK.raw()
    }

    fn add_ref(&self) -> u32 {
        self.ref_count.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Drop one reference, freeing the object when it was the last
    unsafe fn release(this: *mut Self) -> u32 {
        let remaining = (*this).ref_count.fetch_sub(1, Ordering::Release) - 1;
        if remaining == 0 {
            fence(Ordering::Acquire);
            debug!("Releasing engine object");
            drop(Box::from_raw(this));
        }
        remaining
    }

    unsafe fn speak(
        &self,
        flags: u32,
        format_id: *const GUID,
        format: *const WAVEFORMATEX,
        fragments: *const SPVTEXTFRAG,
        site: *mut ISpTTSEngineSite,
    ) -> BoundaryResult<()> {
        let format_id = format_id
            .as_ref()
            .ok_or_else(|| BoundaryError::null("rguidFormatId"))?
            .to_uuid();
        let format = format.as_ref().map(|raw| WaveFormat::from(*raw));
        let site = SiteAdapter::from_raw(site).ok_or_else(|| BoundaryError::null("pOutputSite"))?;
        let fragments = HostFragment::from_raw(fragments);

        self.engine.speak(
            SpeakFlags::from_bits(flags),
            &format_id,
            format.as_ref(),
            fragments,
            &site,
        )?;
        Ok(())
    }

    unsafe fn get_output_format(
        &self,
        target_id: *const GUID,
        target_format: *const WAVEFORMATEX,
        output_id: *mut GUID,
        output_format: *mut *mut WAVEFORMATEX,
    ) -> BoundaryResult<()> {
        if output_format.is_null() {
            return Err(BoundaryError::null("ppCoMemOutputWaveFormatEx"));
        }
        *output_format = std::ptr::null_mut();
        if output_id.is_null() {
            return Err(BoundaryError::null("pOutputFormatId"));
        }

        let target_id = target_id.as_ref().map(GUID::to_uuid);
        let target_format = target_format.as_ref().map(|raw| WaveFormat::from(*raw));

        let negotiated = self.engine.get_output_format(
            target_id.as_ref(),
            target_format.as_ref(),
            &TaskMemAllocator,
        )?;

        *output_id = GUID::from(negotiated.format_id);
        *output_format = negotiated.format.into_raw();
        Ok(())
    }

    /// Stored without `AddRef`; the host keeps the token alive
    fn set_object_token(&self, token: *mut c_void) {
        self.engine
            .set_object_token(ObjectToken::from_raw(token as usize));
    }

    unsafe fn get_object_token(&self, out: *mut *mut c_void) -> BoundaryResult<()> {
        if out.is_null() {
            return Err(BoundaryError::null("ppToken"));
        }
        *out = std::ptr::null_mut();

        let token = self.engine.object_token()?;
        *out = token.as_raw() as *mut c_void;
        Ok(())
    }
}

/// Run `body`, converting a panic into `E_UNEXPECTED`
fn guarded<F: FnOnce() -> BoundaryResult<()>>(body: F) -> HRESULT {
    catch_unwind(AssertUnwindSafe(body))
        .unwrap_or_else(|payload| {
            tracing::error!("Panic at the COM boundary");
            Err(BoundaryError::from_panic(payload.as_ref()))
        })
        .into_hresult()
}

unsafe extern "system" fn tts_query_interface(
    this: *mut ISpTTSEngine,
    riid: *const GUID,
    ppv: *mut *mut c_void,
) -> HRESULT {
    EngineObject::from_tts(this).query_interface(riid, ppv)
}

unsafe extern "system" fn tts_add_ref(this: *mut ISpTTSEngine) -> u32 {
    EngineObject::from_tts(this).add_ref()
}

unsafe extern "system" fn tts_release(this: *mut ISpTTSEngine) -> u32 {
    EngineObject::release(EngineObject::tts_object(this))
}

unsafe extern "system" fn tts_speak(
    this: *mut ISpTTSEngine,
    flags: u32,
    format_id: *const GUID,
    format: *const WAVEFORMATEX,
    fragments: *const SPVTEXTFRAG,
    site: *mut ISpTTSEngineSite,
) -> HRESULT {
    guarded(|| EngineObject::from_tts(this).speak(flags, format_id, format, fragments, site))
}

unsafe extern "system" fn tts_get_output_format(
    this: *mut ISpTTSEngine,
    target_id: *const GUID,
    target_format: *const WAVEFORMATEX,
    output_id: *mut GUID,
    output_format: *mut *mut WAVEFORMATEX,
) -> HRESULT {
    guarded(|| {
        EngineObject::from_tts(this).get_output_format(
            target_id,
            target_format,
            output_id,
            output_format,
        )
    })
}

unsafe extern "system" fn token_query_interface(
    this: *mut ISpObjectWithToken,
    riid: *const GUID,
    ppv: *mut *mut c_void,
) -> HRESULT {
    EngineObject::from_token(this).query_interface(riid, ppv)
}

unsafe extern "system" fn token_add_ref(this: *mut ISpObjectWithToken) -> u32 {
    EngineObject::from_token(this).add_ref()
}

unsafe extern "system" fn token_release(this: *mut ISpObjectWithToken) -> u32 {
    EngineObject::release(EngineObject::token_object(this))
}

unsafe extern "system" fn token_set_object_token(
    this: *mut ISpObjectWithToken,
    token: *mut c_void,
) -> HRESULT {
    guarded(|| {
        EngineObject::from_token(this).set_object_token(token);
        Ok(())
    })
}

unsafe extern "system" fn token_get_object_token(
    this: *mut ISpObjectWithToken,
    out: *mut *mut c_void,
) -> HRESULT {
    guarded(|| EngineObject::from_token(this).get_object_token(out))
}

static TTS_VTBL: ISpTTSEngineVtbl = ISpTTSEngineVtbl {
    query_interface: tts_query_interface,
    add_ref: tts_add_ref,
    release: tts_release,
    speak: tts_speak,
    get_output_format: tts_get_output_format,
};

static TOKEN_VTBL: ISpObjectWithTokenVtbl = ISpObjectWithTokenVtbl {
    query_interface: token_query_interface,
    add_ref: token_add_ref,
    release: token_release,
    set_object_token: token_set_object_token,
    get_object_token: token_get_object_token,
};

fn create_engine(config_path: *const c_char) -> BoundaryResult<TtsEngine> {
    let config = if config_path.is_null() {
        EngineConfig::discover()?
    } else {
        // SAFETY: the caller passes a NUL-terminated string when non-null
        let path = unsafe { CStr::from_ptr(config_path) }
            .to_str()
            .map_err(|e| {
                BoundaryError::invalid_argument(format!("config path is not UTF-8: {e}"))
            })?;
        EngineConfig::load(path)?
    };

    Ok(TtsEngine::with_config(config)?)
}

/// Create an engine and return its `ISpTTSEngine` pointer in `ppv`.
///
/// A null `config_path` discovers configuration from `REPLAY_VOICE_CONFIG` or
/// the platform configuration directory. The returned reference is owned by
/// the caller and released through the interface's `Release`.
///
/// # Safety
///
/// `config_path` must be null or a NUL-terminated string; `ppv` must be null or
/// writable.
#[no_mangle]
pub unsafe extern "C" fn ReplayVoice_CreateEngine(
    config_path: *const c_char,
    ppv: *mut *mut c_void,
) -> HRESULT {
    crate::logging::init();

    guarded(|| {
        if ppv.is_null() {
            return Err(BoundaryError::null("ppv"));
        }
        *ppv = std::ptr::null_mut();

        let engine = create_engine(config_path)?;
        info!("Created replay engine, {} payload bytes", engine.payload().len());
        *ppv = EngineObject::into_raw(engine).cast();
        Ok(())
    })
}
