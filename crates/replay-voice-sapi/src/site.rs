//! Host-owned objects seen through the core traits.

use crate::ffi_types::{ISpTTSEngineSite, SPEVENT, SPVTEXTFRAG};
use replay_voice_core::{ActionSet, FragmentLink, OutputSite, StatusCode, SynthesisEvent};
use std::ptr::NonNull;

/// The host's `ISpTTSEngineSite`, borrowed for one `Speak` call.
///
/// Holds no reference count; the host keeps the site alive for the call.
#[derive(Debug)]
pub struct SiteAdapter {
    site: NonNull<ISpTTSEngineSite>,
}

impl SiteAdapter {
    /// Wrap a raw site pointer; `None` if it is null
    ///
    /// # Safety
    ///
    /// A non-null `site` must point to a live `ISpTTSEngineSite` with a valid
    /// vtable for as long as the adapter is used.
    pub unsafe fn from_raw(site: *mut ISpTTSEngineSite) -> Option<Self> {
        NonNull::new(site).map(|site| Self { site })
    }

    fn vtbl(&self) -> &crate::ffi_types::ISpTTSEngineSiteVtbl {
        // SAFETY: guaranteed live by the from_raw contract
        unsafe { &*(*self.site.as_ptr()).vtbl }
    }
}

impl OutputSite for SiteAdapter {
    fn get_actions(&self) -> ActionSet {
        // SAFETY: guaranteed live by the from_raw contract
        let raw = unsafe { (self.vtbl().get_actions)(self.site.as_ptr()) };
        ActionSet::from_bits(raw)
    }

    fn add_events(&self, events: &[SynthesisEvent]) -> StatusCode {
        let raw: Vec<SPEVENT> = events.iter().map(SPEVENT::from).collect();
        let Ok(count) = u32::try_from(raw.len()) else {
            return StatusCode::INVALID_ARG;
        };
        // SAFETY: raw outlives the call and holds count events
        StatusCode(unsafe { (self.vtbl().add_events)(self.site.as_ptr(), raw.as_ptr(), count) })
    }

    fn write(&self, data: &[u8]) -> Result<u32, StatusCode> {
        let len = u32::try_from(data.len()).map_err(|_| StatusCode::INVALID_ARG)?;
        let mut written = 0u32;
        // SAFETY: data outlives the call and holds len bytes
        let hr = unsafe {
            (self.vtbl().write)(self.site.as_ptr(), data.as_ptr().cast(), len, &mut written)
        };

        let status = StatusCode(hr);
        if status.is_success() {
            Ok(written)
        } else {
            Err(status)
        }
    }
}

/// A node of the host's fragment list.
///
/// Only reachable through [`HostFragment::from_raw`], whose contract covers the
/// whole chain, so following `next` is sound.
#[repr(transparent)]
#[derive(Debug)]
pub struct HostFragment(SPVTEXTFRAG);

impl HostFragment {
    /// View a raw fragment list; `None` if `head` is null
    ///
    /// # Safety
    ///
    /// Every node reachable from a non-null `head` must be valid for `'a` and
    /// the chain must be acyclic.
    pub unsafe fn from_raw<'a>(head: *const SPVTEXTFRAG) -> Option<&'a Self> {
        head.cast::<Self>().as_ref()
    }

    /// The fragment's UTF-16 text, empty when the host passed no buffer
    #[must_use]
    pub fn text(&self) -> &[u16] {
        if self.0.text_start.is_null() || self.0.text_len == 0 {
            return &[];
        }
        // SAFETY: the host guarantees text_len code units at text_start
        unsafe { std::slice::from_raw_parts(self.0.text_start, self.0.text_len as usize) }
    }

    /// Language id from the fragment's rendering state
    #[must_use]
    pub const fn lang_id(&self) -> u16 {
        self.0.state.lang_id
    }
}

impl FragmentLink for HostFragment {
    fn text_len(&self) -> u32 {
        self.0.text_len
    }

    fn source_offset(&self) -> u32 {
        self.0.text_src_offset
    }

    fn next_fragment(&self) -> Option<&Self> {
        // SAFETY: covered by the from_raw contract for the whole chain
        unsafe { self.0.next.cast_const().cast::<Self>().as_ref() }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! A fake `ISpTTSEngineSite` driven through its real vtable.

    use super::*;
    use crate::ffi_types::{ISpTTSEngineSiteVtbl, GUID, HRESULT, S_OK};
    use std::cell::RefCell;
    use std::ffi::c_void;

    /// What the fake site was asked to do, in order
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum SiteCall {
        Actions,
        Events(Vec<SPEVENT>),
        Write(Vec<u8>),
    }

    #[repr(C)]
    pub struct FakeSite {
        iface: ISpTTSEngineSite,
        pub calls: RefCell<Vec<SiteCall>>,
        pub event_status: HRESULT,
        pub write_status: HRESULT,
        pub accept_limit: Option<u32>,
    }

    impl FakeSite {
        pub fn new() -> Box<Self> {
            Box::new(Self {
                iface: ISpTTSEngineSite { vtbl: &FAKE_VTBL },
                calls: RefCell::new(Vec::new()),
                event_status: S_OK,
                write_status: S_OK,
                accept_limit: None,
            })
        }

        /// Interface pointer; `iface` is the first field of this `repr(C)` struct
        pub fn as_raw(&mut self) -> *mut ISpTTSEngineSite {
            (self as *mut Self).cast()
        }

        pub fn calls(&self) -> Vec<SiteCall> {
            self.calls.borrow().clone()
        }
    }

    unsafe fn this<'a>(site: *mut ISpTTSEngineSite) -> &'a FakeSite {
        &*site.cast::<FakeSite>()
    }

    unsafe extern "system" fn query_interface(
        _: *mut ISpTTSEngineSite,
        _: *const GUID,
        ppv: *mut *mut c_void,
    ) -> HRESULT {
        *ppv = std::ptr::null_mut();
        StatusCode::NO_INTERFACE.raw()
    }

    unsafe extern "system" fn add_ref(_: *mut ISpTTSEngineSite) -> u32 {
        1
    }

    unsafe extern "system" fn release(_: *mut ISpTTSEngineSite) -> u32 {
        1
    }

    unsafe extern "system" fn add_events(
        site: *mut ISpTTSEngineSite,
        events: *const SPEVENT,
        count: u32,
    ) -> HRESULT {
        let site = this(site);
        let events = std::slice::from_raw_parts(events, count as usize).to_vec();
        site.calls.borrow_mut().push(SiteCall::Events(events));
        site.event_status
    }

    unsafe extern "system" fn get_event_interest(
        _: *mut ISpTTSEngineSite,
        interest: *mut u64,
    ) -> HRESULT {
        *interest = 1 << 7;
        S_OK
    }

    unsafe extern "system" fn get_actions(site: *mut ISpTTSEngineSite) -> u32 {
        this(site).calls.borrow_mut().push(SiteCall::Actions);
        0
    }

    unsafe extern "system" fn write(
        site: *mut ISpTTSEngineSite,
        buffer: *const c_void,
        len: u32,
        written: *mut u32,
    ) -> HRESULT {
        let site = this(site);
        let data = std::slice::from_raw_parts(buffer.cast::<u8>(), len as usize).to_vec();
        site.calls.borrow_mut().push(SiteCall::Write(data));
        if site.write_status == S_OK {
            *written = site.accept_limit.map_or(len, |limit| limit.min(len));
        }
        site.write_status
    }

    unsafe extern "system" fn get_rate(_: *mut ISpTTSEngineSite, rate: *mut i32) -> HRESULT {
        *rate = 0;
        S_OK
    }

    unsafe extern "system" fn get_volume(_: *mut ISpTTSEngineSite, volume: *mut u16) -> HRESULT {
        *volume = 100;
        S_OK
    }

    unsafe extern "system" fn get_skip_info(
        _: *mut ISpTTSEngineSite,
        kind: *mut i32,
        count: *mut i32,
    ) -> HRESULT {
        *kind = 0;
        *count = 0;
        S_OK
    }

    unsafe extern "system" fn complete_skip(_: *mut ISpTTSEngineSite, _: i32) -> HRESULT {
        S_OK
    }

    static FAKE_VTBL: ISpTTSEngineSiteVtbl = ISpTTSEngineSiteVtbl {
        query_interface,
        add_ref,
        release,
        add_events,
        get_event_interest,
        get_actions,
        write,
        get_rate,
        get_volume,
        get_skip_info,
        complete_skip,
    };

    /// Build a linked fragment list over `texts`; nodes must not move afterwards
    pub fn fragment_list(texts: &[Vec<u16>]) -> Vec<SPVTEXTFRAG> {
        let mut offset = 0u32;
        let mut nodes: Vec<SPVTEXTFRAG> = texts
            .iter()
            .map(|text| {
                let len = u32::try_from(text.len()).unwrap();
                let node = SPVTEXTFRAG {
                    next: std::ptr::null_mut(),
                    state: crate::ffi_types::SPVSTATE::default(),
                    text_start: text.as_ptr(),
                    text_len: len,
                    text_src_offset: offset,
                };
                offset += len;
                node
            })
            .collect();

        let base = nodes.as_mut_ptr();
        for i in 1..nodes.len() {
            // SAFETY: i - 1 and i are in bounds of the fully built vector
            unsafe { (*base.add(i - 1)).next = base.add(i) };
        }
        nodes
    }
}
