//! Native scalar types used at the call boundary
//!
//! Every native entry point declares its arguments in terms of these aliases.
//! The marshaling converters produce exactly these types and nothing wider or
//! narrower.

use std::ffi::{c_char, c_double, c_int};

/// Native integer (`SpiceInt`)
pub type SpiceInt = c_int;

/// Native double-precision value (`SpiceDouble`)
pub type SpiceDouble = c_double;

/// Native boolean, stored in an integer-sized slot (`SpiceBoolean`)
pub type SpiceBoolean = c_int;

/// Native character (`SpiceChar`)
pub type SpiceChar = c_char;

/// Native `true`
pub const SPICETRUE: SpiceBoolean = 1;

/// Native `false`
pub const SPICEFALSE: SpiceBoolean = 0;

/// Scalar types that may appear as elements of a native numeric buffer
///
/// The trait is sealed to the three native word types so converters cannot be
/// instantiated with a host type the native side would misread.
pub trait NativeElement: Copy + Default + PartialEq + std::fmt::Debug + sealed::Sealed {
    /// Host-visible name of the element type, matching the dtype tags used by
    /// [`crate::marshal::HostArray`]
    const DTYPE: &'static str;
}

impl NativeElement for SpiceDouble {
    const DTYPE: &'static str = "float64";
}

impl NativeElement for SpiceInt {
    const DTYPE: &'static str = "int32";
}

mod sealed {
    pub trait Sealed {}
    impl Sealed for super::SpiceDouble {}
    impl Sealed for super::SpiceInt {}
}

/// Convert a native boolean into a host `bool`
///
/// Any non-zero value is true, as the native library treats it.
#[inline]
pub fn from_spice_bool(value: SpiceBoolean) -> bool {
    value != SPICEFALSE
}

/// Convert a host `bool` into a native boolean
#[inline]
pub fn to_spice_bool(value: bool) -> SpiceBoolean {
    if value {
        SPICETRUE
    } else {
        SPICEFALSE
    }
}
