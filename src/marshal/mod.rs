//! Marshaling between host collections and native call buffers
//!
//! # Main Components
//!
//! - `numeric`: 1-D vectors and row-major 2-D matrices of native words
//! - `strings`: fixed-width string slots (also the char-cell data layout)
//! - `host`: dtype-tagged arrays handed over by a host runtime
//!
//! Every `*_into` variant writes into a caller-owned buffer so a wrapper can
//! reuse one allocation across calls. Conversions are validated in full
//! before the output buffer is touched.

pub mod host;
pub mod numeric;
pub mod strings;

pub use self::host::{HostArray, HostValue, WireElement};
pub use self::numeric::{
    from_native_bools, from_native_matrix, from_native_vector, matrix3_from_native,
    matrix3_to_native, matrix_from_array, to_native_matrix, to_native_matrix_into,
    to_native_vector, to_native_vector_into, vector3_from_native, vector3_to_native, NativeMatrix,
    ToNative,
};
pub use self::strings::{
    from_native_string, from_native_string_array, string_out_buffer, to_native_string,
    to_native_string_array, to_native_string_array_into, NativeStringArray,
};
