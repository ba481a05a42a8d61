//! Dynamic TCTI
//!
//! Loads a TSS2 TCTI shared library at runtime. Construction follows the
//! library's published protocol, and each step has its own [`LoadError`]:
//!
//! 1. `dlopen` the library by name ([`LoadError::Open`])
//! 2. resolve `Tss2_Tcti_Info` and validate the table it returns
//!    ([`LoadError::MissingSymbol`], [`LoadError::InvalidInfo`])
//! 3. call `init` once to size the context and once to initialize it with the
//!    configuration string ([`LoadError::InvalidConf`], [`LoadError::Init`])
//!
//! After that, commands go through the context's v1 function table.

use std::ffi::{c_char, c_void, CStr, CString};
use std::mem;
use std::ptr;
use std::time::Duration;

use super::kind::TransportKind;
use super::traits::{LoadError, Transport, TransportError};
use super::TPM_MAX_BUFFER;

/// Symbol every TCTI library exports
pub const TCTI_INFO_SYMBOL: &str = "Tss2_Tcti_Info";

const TCTI_INFO_SYMBOL_C: &CStr = c"Tss2_Tcti_Info";

/// `TSS2_TCTI_RC_LAYER | TSS2_BASE_RC_NOT_IMPLEMENTED`
const TCTI_RC_NOT_IMPLEMENTED: u32 = 0x000a_0003;

/// `TSS2_TCTI_TIMEOUT_BLOCK`
const TCTI_TIMEOUT_BLOCK: i32 = -1;

type InitFn = unsafe extern "C" fn(*mut c_void, *mut usize, *const c_char) -> u32;
type InfoFn = unsafe extern "C" fn() -> *const TctiInfo;

#[allow(dead_code)]
#[repr(C)]
struct TctiInfo {
    version: u32,
    name: *const c_char,
    description: *const c_char,
    config_help: *const c_char,
    init: Option<InitFn>,
}

#[allow(dead_code)]
#[repr(C)]
struct TctiContextCommonV1 {
    magic: u64,
    version: u32,
    transmit: Option<unsafe extern "C" fn(*mut c_void, usize, *const u8) -> u32>,
    receive: Option<unsafe extern "C" fn(*mut c_void, *mut usize, *mut u8, i32) -> u32>,
    finalize: Option<unsafe extern "C" fn(*mut c_void)>,
    cancel: Option<unsafe extern "C" fn(*mut c_void) -> u32>,
    get_poll_handles: Option<unsafe extern "C" fn(*mut c_void, *mut c_void, *mut usize) -> u32>,
    set_locality: Option<unsafe extern "C" fn(*mut c_void, u8) -> u32>,
}

/// Owned `dlopen` handle, closed on drop
struct Library {
    handle: *mut c_void,
}

impl Library {
    fn open(name: &str) -> Result<Self, LoadError> {
        let c_name = CString::new(name).map_err(|_| LoadError::Open {
            library: name.to_string(),
            reason: "library name contains a NUL byte".to_string(),
        })?;

        let handle = unsafe { libc::dlopen(c_name.as_ptr(), libc::RTLD_NOW) };
        if handle.is_null() {
            return Err(LoadError::Open {
                library: name.to_string(),
                reason: last_dl_error(),
            });
        }
        Ok(Self { handle })
    }

    fn symbol(&self, name: &CStr) -> Option<*mut c_void> {
        let sym = unsafe { libc::dlsym(self.handle, name.as_ptr()) };
        (!sym.is_null()).then_some(sym)
    }
}

impl Drop for Library {
    fn drop(&mut self) {
        unsafe {
            libc::dlclose(self.handle);
        }
    }
}

fn last_dl_error() -> String {
    let msg = unsafe { libc::dlerror() };
    if msg.is_null() {
        "unknown loader error".to_string()
    } else {
        unsafe { CStr::from_ptr(msg) }.to_string_lossy().into_owned()
    }
}

/// TCTI backed by a dynamically loaded library
pub struct DynamicTransport {
    library_name: String,
    tcti_name: String,
    // u64 storage keeps the context 8-byte aligned
    context: Vec<u64>,
    // Declared last: the library must outlive the finalized context
    _library: Library,
}

// The context and handle are only reached through `&mut self`.
unsafe impl Send for DynamicTransport {}

impl DynamicTransport {
    /// Load `library` and initialize it with `conf`
    ///
    /// An absent or empty `conf` is passed as a NULL configuration string.
    ///
    /// # Errors
    ///
    /// Returns the [`LoadError`] for whichever protocol step failed.
    pub fn load(library: &str, conf: Option<&str>) -> Result<Self, LoadError> {
        let lib = Library::open(library)?;

        let info_sym = lib
            .symbol(TCTI_INFO_SYMBOL_C)
            .ok_or_else(|| LoadError::MissingSymbol {
                library: library.to_string(),
                symbol: TCTI_INFO_SYMBOL,
            })?;
        let info_fn: InfoFn = unsafe { mem::transmute::<*mut c_void, InfoFn>(info_sym) };

        let info = unsafe { info_fn() };
        if info.is_null() {
            return Err(LoadError::InvalidInfo {
                library: library.to_string(),
                reason: "info function returned NULL",
            });
        }
        let info = unsafe { &*info };
        let init = info.init.ok_or_else(|| LoadError::InvalidInfo {
            library: library.to_string(),
            reason: "no init entry point",
        })?;
        let tcti_name = if info.name.is_null() {
            library.to_string()
        } else {
            unsafe { CStr::from_ptr(info.name) }
                .to_string_lossy()
                .into_owned()
        };

        let conf = conf
            .filter(|c| !c.is_empty())
            .map(CString::new)
            .transpose()
            .map_err(|_| LoadError::InvalidConf {
                library: library.to_string(),
            })?;
        let conf_ptr = conf.as_ref().map_or(ptr::null(), |c| c.as_ptr());

        let mut size = 0usize;
        let rc = unsafe { init(ptr::null_mut(), &mut size, conf_ptr) };
        if rc != 0 {
            return Err(LoadError::Init {
                library: library.to_string(),
                rc,
            });
        }
        if size < mem::size_of::<TctiContextCommonV1>() {
            return Err(LoadError::InvalidInfo {
                library: library.to_string(),
                reason: "context size smaller than the common header",
            });
        }

        let mut context = vec![0u64; size.div_ceil(mem::size_of::<u64>())];
        let rc = unsafe { init(context.as_mut_ptr().cast(), &mut size, conf_ptr) };
        if rc != 0 {
            return Err(LoadError::Init {
                library: library.to_string(),
                rc,
            });
        }

        tracing::info!(
            library = %library,
            tcti = %tcti_name,
            version = info.version,
            "Loaded TCTI library"
        );

        Ok(Self {
            library_name: library.to_string(),
            tcti_name,
            context,
            _library: lib,
        })
    }

    /// Name the library reports for itself
    #[must_use]
    pub fn tcti_name(&self) -> &str {
        &self.tcti_name
    }

    fn common(&self) -> &TctiContextCommonV1 {
        unsafe { &*self.context.as_ptr().cast::<TctiContextCommonV1>() }
    }

    fn context_ptr(&mut self) -> *mut c_void {
        self.context.as_mut_ptr().cast()
    }
}

impl Transport for DynamicTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Dynamic
    }

    fn describe(&self) -> String {
        format!("dynamic:{} ({})", self.library_name, self.tcti_name)
    }

    fn transmit(&mut self, command: &[u8]) -> Result<(), TransportError> {
        let transmit = self.common().transmit.ok_or(TransportError::ResponseCode {
            rc: TCTI_RC_NOT_IMPLEMENTED,
        })?;

        let ctx = self.context_ptr();
        let rc = unsafe { transmit(ctx, command.len(), command.as_ptr()) };
        if rc != 0 {
            return Err(TransportError::ResponseCode { rc });
        }
        Ok(())
    }

    fn receive(&mut self, timeout: Option<Duration>) -> Result<Vec<u8>, TransportError> {
        let receive = self.common().receive.ok_or(TransportError::ResponseCode {
            rc: TCTI_RC_NOT_IMPLEMENTED,
        })?;
        let timeout_ms = timeout.map_or(TCTI_TIMEOUT_BLOCK, |t| {
            i32::try_from(t.as_millis()).unwrap_or(i32::MAX)
        });

        let mut buf = vec![0u8; TPM_MAX_BUFFER];
        let mut size = buf.len();
        let ctx = self.context_ptr();
        let rc = unsafe { receive(ctx, &mut size, buf.as_mut_ptr(), timeout_ms) };
        if rc != 0 {
            return Err(TransportError::ResponseCode { rc });
        }
        buf.truncate(size);
        Ok(buf)
    }
}

impl Drop for DynamicTransport {
    fn drop(&mut self) {
        if let Some(finalize) = self.common().finalize {
            let ctx = self.context_ptr();
            unsafe { finalize(ctx) };
        }
        tracing::debug!(library = %self.library_name, "Finalized TCTI context");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_library_fails_at_open() {
        let err = DynamicTransport::load("libtss2-tcti-does-not-exist.so.0", None)
            .err()
            .expect("load should fail");
        match err {
            LoadError::Open { library, reason } => {
                assert_eq!(library, "libtss2-tcti-does-not-exist.so.0");
                assert!(!reason.is_empty());
            }
            other => panic!("Expected Open, got: {other}"),
        }
    }

    #[test]
    fn test_nul_in_library_name_fails_at_open() {
        let err = DynamicTransport::load("lib\0tcti.so", None).err().unwrap();
        assert!(matches!(err, LoadError::Open { .. }));
    }

    #[cfg(all(target_os = "linux", target_env = "gnu"))]
    #[test]
    fn test_library_without_info_symbol_fails_at_resolve() {
        let err = DynamicTransport::load("libc.so.6", Some("ignored"))
            .err()
            .expect("libc is not a TCTI");
        assert_eq!(
            err,
            LoadError::MissingSymbol {
                library: "libc.so.6".into(),
                symbol: TCTI_INFO_SYMBOL,
            }
        );
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn test_common_header_layout() {
        // magic + version (padded) + six function pointers
        let ptr = mem::size_of::<usize>();
        assert_eq!(mem::size_of::<TctiContextCommonV1>(), 16 + 6 * ptr);
    }
}
