//! Binding to the CSPICE error subsystem
//!
//! Only compiled with the `cspice` feature; linking requires `libcspice`
//! on the library search path.

use std::ffi::CStr;
use std::sync::atomic::{AtomicBool, Ordering};

use log::debug;

use super::{MessageKind, NativeLibrary};
use crate::errors::{Result, SpiceError};
use crate::marshal::{from_native_string, string_out_buffer, to_native_string};
use crate::types::{from_spice_bool, SpiceBoolean, SpiceChar, SpiceInt};

#[link(name = "cspice")]
extern "C" {
    fn failed_c() -> SpiceBoolean;
    fn getmsg_c(option: *const SpiceChar, lenout: SpiceInt, msg: *mut SpiceChar);
    fn qcktrc_c(lenout: SpiceInt, trace: *mut SpiceChar);
    fn reset_c();
    fn tkvrsn_c(item: *const SpiceChar) -> *const SpiceChar;
    fn erract_c(op: *const SpiceChar, lenout: SpiceInt, action: *mut SpiceChar);
    fn errprt_c(op: *const SpiceChar, lenout: SpiceInt, list: *mut SpiceChar);
}

/// Set once a handle has been claimed; the library state is process-global
static CLAIMED: AtomicBool = AtomicBool::new(false);

/// Handle to the linked CSPICE library
///
/// At most one handle exists per process. Wrap it in a
/// [`super::Session`] to serialize calls.
#[derive(Debug)]
pub struct Cspice {
    _private: (),
}

fn native_len(len: usize) -> Result<SpiceInt> {
    SpiceInt::try_from(len)
        .map_err(|_| SpiceError::invalid_argument(format!("buffer length {} too large", len)))
}

fn set_option(
    routine: unsafe extern "C" fn(*const SpiceChar, SpiceInt, *mut SpiceChar),
    value: &str,
) -> Result<()> {
    let op = to_native_string("SET")?;
    let mut value = to_native_string(value)?.into_bytes_with_nul();
    let len = native_len(value.len())?;
    unsafe { routine(op.as_ptr(), len, value.as_mut_ptr() as *mut SpiceChar) };
    Ok(())
}

impl Cspice {
    /// Claim the library and switch it to return-on-error with printing off
    pub fn init() -> Result<Self> {
        if CLAIMED.swap(true, Ordering::SeqCst) {
            return Err(SpiceError::invalid_argument(
                "the CSPICE library is already owned by another handle",
            ));
        }
        set_option(erract_c, "RETURN")?;
        set_option(errprt_c, "NONE")?;
        debug!("CSPICE error action set to RETURN");
        Ok(Self { _private: () })
    }

    fn read_into(len: usize, fill: impl FnOnce(SpiceInt, *mut SpiceChar)) -> String {
        let len = len.max(1);
        let mut buffer = string_out_buffer(len);
        match native_len(len) {
            Ok(native) => {
                fill(native, buffer.as_mut_ptr() as *mut SpiceChar);
                from_native_string(&buffer)
            }
            Err(_) => String::new(),
        }
    }
}

impl Drop for Cspice {
    fn drop(&mut self) {
        CLAIMED.store(false, Ordering::SeqCst);
    }
}

impl NativeLibrary for Cspice {
    fn failed(&mut self) -> bool {
        from_spice_bool(unsafe { failed_c() })
    }

    fn getmsg(&mut self, kind: MessageKind, lenout: usize) -> String {
        let option = match to_native_string(kind.option()) {
            Ok(option) => option,
            Err(_) => return String::new(),
        };
        Self::read_into(lenout, |len, out| unsafe { getmsg_c(option.as_ptr(), len, out) })
    }

    fn qcktrc(&mut self, lenout: usize) -> String {
        Self::read_into(lenout, |len, out| unsafe { qcktrc_c(len, out) })
    }

    fn reset(&mut self) {
        unsafe { reset_c() }
    }

    fn toolkit_version(&mut self) -> String {
        let item = match to_native_string("TOOLKIT") {
            Ok(item) => item,
            Err(_) => return String::new(),
        };
        let version = unsafe { tkvrsn_c(item.as_ptr()) };
        if version.is_null() {
            return String::new();
        }
        unsafe { CStr::from_ptr(version) }
            .to_string_lossy()
            .into_owned()
    }
}
