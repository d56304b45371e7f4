//! Fixed-width string slots
//!
//! Native string arrays are laid out as `count` contiguous slots of `width`
//! bytes each. A slot holds at most `width - 1` bytes of text followed by NUL
//! padding. Character cells use exactly the same slot layout for their data
//! area, so the slot helpers here are shared with [`crate::cell`].

use std::ffi::CString;

use crate::errors::{Result, SpiceError};
use crate::types::SpiceChar;

/// A contiguous block of fixed-width string slots ready for a native call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeStringArray {
    data: Vec<u8>,
    width: usize,
    count: usize,
}

impl NativeStringArray {
    /// Allocate `count` empty slots of `width` bytes, for use as an output buffer
    pub fn zeroed(count: usize, width: usize) -> Result<Self> {
        if width == 0 {
            return Err(SpiceError::invalid_argument(
                "string slot width must be at least 1",
            ));
        }
        Ok(Self {
            data: vec![0u8; array_bytes(count, width)?],
            width,
            count,
        })
    }

    /// Byte width of every slot, terminator included
    pub fn width(&self) -> usize {
        self.width
    }

    /// Number of slots
    pub fn len(&self) -> usize {
        self.count
    }

    /// True when there are no slots
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Raw bytes of all slots
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Raw bytes of one slot
    pub fn slot(&self, index: usize) -> Option<&[u8]> {
        if index >= self.count {
            return None;
        }
        let start = index * self.width;
        Some(&self.data[start..start + self.width])
    }

    /// Pointer to the first slot, as a native `char` array
    pub fn as_ptr(&self) -> *const SpiceChar {
        self.data.as_ptr().cast()
    }

    /// Mutable pointer to the first slot, for native output parameters
    pub fn as_mut_ptr(&mut self) -> *mut SpiceChar {
        self.data.as_mut_ptr().cast()
    }

    /// Decode every slot back into host strings
    pub fn to_strings(&self) -> Vec<String> {
        self.data.chunks_exact(self.width).map(read_slot).collect()
    }
}

/// Write `text` into `slot`, truncating to `slot.len() - 1` bytes and NUL padding the rest
///
/// Truncation never splits a UTF-8 sequence. For ASCII input (all the native
/// library accepts) the stored text is exactly the first `width - 1` characters.
pub fn write_slot(slot: &mut [u8], text: &str) {
    slot.fill(0);
    if slot.is_empty() {
        return;
    }
    let limit = slot.len() - 1;
    let mut end = text.len().min(limit);
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    slot[..end].copy_from_slice(&text.as_bytes()[..end]);
}

/// Decode one slot: text up to the first NUL, with trailing blanks removed
///
/// Trailing blanks appear when the native side pads with spaces rather than NULs.
pub fn read_slot(slot: &[u8]) -> String {
    let end = slot.iter().position(|&b| b == 0).unwrap_or(slot.len());
    String::from_utf8_lossy(&slot[..end]).trim_end().to_string()
}

/// Decode a fixed-size native `char` field (e.g. a table name in a descriptor)
pub fn read_c_chars(chars: &[SpiceChar]) -> String {
    let bytes: Vec<u8> = chars.iter().map(|&c| c as u8).collect();
    read_slot(&bytes)
}

/// Encode `text` into a fixed-size native `char` field
pub fn write_c_chars(chars: &mut [SpiceChar], text: &str) {
    let mut bytes = vec![0u8; chars.len()];
    write_slot(&mut bytes, text);
    for (dst, src) in chars.iter_mut().zip(bytes) {
        *dst = src as SpiceChar;
    }
}

/// Total bytes of `count` slots of `width` bytes
fn array_bytes(count: usize, width: usize) -> Result<usize> {
    count.checked_mul(width).ok_or_else(|| {
        SpiceError::invalid_argument(format!(
            "string array of {} slots of {} bytes exceeds the addressable size",
            count, width
        ))
    })
}

/// Resolve the slot width and row count for a string array
fn string_array_shape<S: AsRef<str>>(
    strings: &[S],
    width: Option<usize>,
    count: Option<usize>,
) -> Result<(usize, usize)> {
    let width = match width {
        Some(0) => {
            return Err(SpiceError::invalid_argument(
                "string slot width must be at least 1",
            ))
        }
        Some(w) => w,
        None => strings.iter().map(|s| s.as_ref().len()).max().unwrap_or(0) + 1,
    };
    let count = count.unwrap_or(strings.len());
    if count < strings.len() {
        return Err(SpiceError::invalid_argument(format!(
            "string array row count {} is smaller than the {} strings supplied",
            count,
            strings.len()
        )));
    }
    Ok((width, count))
}

/// Lay out `strings` as fixed-width native slots
///
/// `width` defaults to the longest input plus one terminator byte; `count`
/// defaults to the number of inputs and may be larger to reserve empty rows.
pub fn to_native_string_array<S: AsRef<str>>(
    strings: &[S],
    width: Option<usize>,
    count: Option<usize>,
) -> Result<NativeStringArray> {
    let mut data = Vec::new();
    let (width, count) = to_native_string_array_into(strings, width, count, &mut data)?;
    Ok(NativeStringArray { data, width, count })
}

/// Like [`to_native_string_array`], reusing a caller-owned buffer
///
/// Returns `(width, count)`. The buffer is untouched when the shape is invalid.
pub fn to_native_string_array_into<S: AsRef<str>>(
    strings: &[S],
    width: Option<usize>,
    count: Option<usize>,
    out: &mut Vec<u8>,
) -> Result<(usize, usize)> {
    let (width, count) = string_array_shape(strings, width, count)?;
    let total = array_bytes(count, width)?;
    out.clear();
    out.resize(total, 0);
    for (slot, text) in out.chunks_exact_mut(width).zip(strings) {
        write_slot(slot, text.as_ref());
    }
    Ok((width, count))
}

/// Decode a contiguous block of `width`-byte slots into host strings
pub fn from_native_string_array(buffer: &[u8], width: usize) -> Result<Vec<String>> {
    if width == 0 {
        return Err(SpiceError::invalid_argument(
            "string slot width must be at least 1",
        ));
    }
    if buffer.len() % width != 0 {
        return Err(SpiceError::type_mismatch(format!(
            "buffer of {} bytes is not a whole number of {}-byte slots",
            buffer.len(),
            width
        )));
    }
    Ok(buffer.chunks_exact(width).map(read_slot).collect())
}

/// NUL-terminate a single string input argument
pub fn to_native_string(text: &str) -> Result<CString> {
    CString::new(text).map_err(|e| {
        SpiceError::invalid_argument(format!(
            "string contains interior NUL byte at position {}",
            e.nul_position()
        ))
    })
}

/// Zeroed buffer for a native string output argument of `len` bytes
pub fn string_out_buffer(len: usize) -> Vec<u8> {
    vec![0u8; len.max(1)]
}

/// Decode a native string output argument
pub fn from_native_string(buffer: &[u8]) -> String {
    read_slot(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_fixed_width_layout() {
        let array = to_native_string_array(&["AB", "C"], Some(4), None).unwrap();
        assert_eq!(array.width(), 4);
        assert_eq!(array.len(), 2);
        assert_eq!(array.slot(0).unwrap(), b"AB\0\0");
        assert_eq!(array.slot(1).unwrap(), b"C\0\0\0");
        assert_eq!(array.as_bytes(), b"AB\0\0C\0\0\0");

        let back = from_native_string_array(array.as_bytes(), 4).unwrap();
        assert_eq!(back, vec!["AB", "C"]);
    }

    #[test]
    fn test_oversized_shape_is_rejected() {
        assert!(matches!(
            NativeStringArray::zeroed(usize::MAX, 2),
            Err(SpiceError::InvalidArgument(_))
        ));

        let mut out = vec![7u8; 3];
        let result = to_native_string_array_into(&["A"], Some(usize::MAX), Some(2), &mut out);
        assert!(matches!(result, Err(SpiceError::InvalidArgument(_))));
        assert_eq!(out, vec![7u8; 3]);
    }

    #[test]
    fn test_default_width_is_longest_plus_terminator() {
        let array = to_native_string_array(&["EARTH", "SUN", ""], None, None).unwrap();
        assert_eq!(array.width(), 6);
        assert_eq!(array.to_strings(), vec!["EARTH", "SUN", ""]);
    }

    #[test]
    fn test_empty_input_still_has_terminator_width() {
        let empty: [&str; 0] = [];
        let array = to_native_string_array(&empty, None, None).unwrap();
        assert_eq!(array.width(), 1);
        assert!(array.is_empty());
        assert!(array.as_bytes().is_empty());
    }

    #[rstest]
    #[case(2, vec!["A", "B"])]
    #[case(3, vec!["AB", "BC"])]
    #[case(8, vec!["ABCDEFG", "BCD"])]
    fn test_truncation_at_width_boundary(#[case] width: usize, #[case] expected: Vec<&str>) {
        let input = ["ABCDEFGHIJ", "BCD"];
        let array = to_native_string_array(&input, Some(width), None).unwrap();
        let back = from_native_string_array(array.as_bytes(), width).unwrap();
        assert_eq!(back, expected);

        // already-truncated input is a fixed point
        let again = to_native_string_array(&back, Some(width), None).unwrap();
        assert_eq!(again, array);
    }

    #[test]
    fn test_extra_rows_are_empty() {
        let array = to_native_string_array(&["X"], Some(3), Some(3)).unwrap();
        assert_eq!(array.to_strings(), vec!["X", "", ""]);
    }

    #[test]
    fn test_invalid_shapes() {
        assert!(matches!(
            to_native_string_array(&["A", "B"], Some(2), Some(1)),
            Err(SpiceError::InvalidArgument(_))
        ));
        assert!(matches!(
            to_native_string_array(&["A"], Some(0), None),
            Err(SpiceError::InvalidArgument(_))
        ));
        assert!(matches!(
            from_native_string_array(b"ABCDE", 2),
            Err(SpiceError::TypeMismatch(_))
        ));
    }

    #[test]
    fn test_failed_conversion_leaves_buffer_untouched() {
        let mut out = b"keep".to_vec();
        let result = to_native_string_array_into(&["A", "B", "C"], Some(2), Some(2), &mut out);
        assert!(result.is_err());
        assert_eq!(out, b"keep");
    }

    #[test]
    fn test_buffer_reuse() {
        let mut out = Vec::with_capacity(64);
        to_native_string_array_into(&["MOON"], Some(8), None, &mut out).unwrap();
        let ptr = out.as_ptr();
        to_native_string_array_into(&["SUN", "MARS"], Some(8), None, &mut out).unwrap();
        assert_eq!(out.as_ptr(), ptr);
        assert_eq!(from_native_string_array(&out, 8).unwrap(), vec!["SUN", "MARS"]);
    }

    #[test]
    fn test_truncation_respects_char_boundaries() {
        let mut slot = [0u8; 3];
        write_slot(&mut slot, "é!");
        assert_eq!(read_slot(&slot), "é");
        write_slot(&mut slot, "aé");
        assert_eq!(read_slot(&slot), "a");
    }

    #[test]
    fn test_read_slot_trims_blank_padding() {
        assert_eq!(read_slot(b"J2000   "), "J2000");
        assert_eq!(read_slot(b"ECLIPJ2000\0garbage"), "ECLIPJ2000");
    }

    #[test]
    fn test_single_strings() {
        let arg = to_native_string("EARTH").unwrap();
        assert_eq!(arg.as_bytes_with_nul(), b"EARTH\0");
        assert!(to_native_string("EA\0RTH").is_err());

        let mut out = string_out_buffer(10);
        out[..4].copy_from_slice(b"MARS");
        assert_eq!(from_native_string(&out), "MARS");
        assert_eq!(string_out_buffer(0).len(), 1);
    }

    #[test]
    fn test_c_char_fields() {
        let mut field = [0 as SpiceChar; 6];
        write_c_chars(&mut field, "BODIES");
        assert_eq!(read_c_chars(&field), "BODIE");
    }
}
