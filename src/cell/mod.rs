//! Fixed-capacity, kind-tagged cells shared with the native library
//!
//! A [`Cell`] is the host-side owner of a native `SpiceCell`: a descriptor plus
//! a flat data buffer in a single allocation (see [`layout`]). The native
//! library may change the cardinality and contents in place when a cell is
//! passed to it by reference, so every read goes through the descriptor's
//! cardinality rather than a cached length.
//!
//! # Example
//!
//! ```
//! use spicebind::cell::{Cell, CellValue};
//!
//! let mut cell = Cell::double(5).unwrap();
//! cell.append(3.14).unwrap();
//! cell.append(2.71).unwrap();
//! assert_eq!(cell.len(), 2);
//! assert_eq!(cell.get(-1).unwrap(), CellValue::Double(2.71));
//! ```

pub mod iter;
pub mod layout;


use std::cmp::Ordering;
use std::fmt;
use std::mem;

use log::warn;

use crate::errors::{Result, SpiceError};
use crate::marshal::strings::{read_slot, write_slot};
use crate::types::{from_spice_bool, to_spice_bool, SpiceDouble, SpiceInt, SPICEFALSE};

pub use self::iter::CellIter;
pub use self::layout::{SpiceCell, CELL_CTRLSZ};

use self::layout::CellBuffer;

/// Element kind of a cell
///
/// Discriminants are the native `SpiceCellDataType` tags.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CellKind {
    Char = 0,
    Double = 1,
    Int = 2,
    Time = 3,
    Bool = 4,
}

impl CellKind {
    /// Decode a native kind tag
    pub fn from_raw(tag: SpiceInt) -> Option<Self> {
        match tag {
            0 => Some(CellKind::Char),
            1 => Some(CellKind::Double),
            2 => Some(CellKind::Int),
            3 => Some(CellKind::Time),
            4 => Some(CellKind::Bool),
            _ => None,
        }
    }

    /// Bytes per element; `width` is only used for character cells
    pub fn slot_size(self, width: usize) -> usize {
        match self {
            CellKind::Char => width,
            CellKind::Double => mem::size_of::<SpiceDouble>(),
            // time and bool live in integer-sized slots
            CellKind::Int | CellKind::Time | CellKind::Bool => mem::size_of::<SpiceInt>(),
        }
    }
}

/// One element read from or written to a cell
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Char(String),
    Double(SpiceDouble),
    Int(SpiceInt),
    Time(SpiceInt),
    Bool(bool),
}

impl CellValue {
    /// The cell kind that stores this value
    pub fn kind(&self) -> CellKind {
        match self {
            CellValue::Char(_) => CellKind::Char,
            CellValue::Double(_) => CellKind::Double,
            CellValue::Int(_) => CellKind::Int,
            CellValue::Time(_) => CellKind::Time,
            CellValue::Bool(_) => CellKind::Bool,
        }
    }

    /// Ordering between two values of the same kind, as used for set insertion
    fn order(&self, other: &CellValue) -> Ordering {
        match (self, other) {
            (CellValue::Char(a), CellValue::Char(b)) => a.cmp(b),
            (CellValue::Double(a), CellValue::Double(b)) => a.total_cmp(b),
            (CellValue::Int(a), CellValue::Int(b)) | (CellValue::Time(a), CellValue::Time(b)) => {
                a.cmp(b)
            }
            (CellValue::Bool(a), CellValue::Bool(b)) => a.cmp(b),
            _ => Ordering::Equal,
        }
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Double(value)
    }
}

impl From<i32> for CellValue {
    fn from(value: i32) -> Self {
        CellValue::Int(value)
    }
}

impl From<bool> for CellValue {
    fn from(value: bool) -> Self {
        CellValue::Bool(value)
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Char(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::Char(value)
    }
}

/// A fixed-capacity, variable-cardinality container with the native cell layout
pub struct Cell {
    kind: CellKind,
    buffer: CellBuffer,
}

impl Cell {
    /// Create an empty cell
    ///
    /// `width` is the byte width of each string slot (terminator included) and
    /// must be given for, and only for, character cells.
    pub fn create(kind: CellKind, capacity: usize, width: Option<usize>) -> Result<Self> {
        let width = match (kind, width) {
            (CellKind::Char, Some(0)) => {
                return Err(SpiceError::invalid_argument(
                    "character cell element width must be positive",
                ))
            }
            (CellKind::Char, Some(w)) => w,
            (CellKind::Char, None) => {
                return Err(SpiceError::invalid_argument(
                    "character cells require an element width",
                ))
            }
            (_, Some(_)) => {
                return Err(SpiceError::invalid_argument(format!(
                    "element width is only meaningful for character cells, not {:?}",
                    kind
                )))
            }
            (_, None) => 0,
        };

        let buffer = CellBuffer::allocate(kind, capacity, kind.slot_size(width))?;
        Ok(Self { kind, buffer })
    }

    /// Empty double-precision cell
    pub fn double(capacity: usize) -> Result<Self> {
        Self::create(CellKind::Double, capacity, None)
    }

    /// Empty integer cell
    pub fn int(capacity: usize) -> Result<Self> {
        Self::create(CellKind::Int, capacity, None)
    }

    /// Empty character cell with `width`-byte string slots
    pub fn char(capacity: usize, width: usize) -> Result<Self> {
        Self::create(CellKind::Char, capacity, Some(width))
    }

    /// Empty time cell
    pub fn time(capacity: usize) -> Result<Self> {
        Self::create(CellKind::Time, capacity, None)
    }

    /// Empty boolean cell
    pub fn bool(capacity: usize) -> Result<Self> {
        Self::create(CellKind::Bool, capacity, None)
    }

    pub fn kind(&self) -> CellKind {
        self.kind
    }

    pub fn is_char(&self) -> bool {
        self.kind == CellKind::Char
    }

    pub fn is_double(&self) -> bool {
        self.kind == CellKind::Double
    }

    pub fn is_int(&self) -> bool {
        self.kind == CellKind::Int
    }

    pub fn is_time(&self) -> bool {
        self.kind == CellKind::Time
    }

    pub fn is_bool(&self) -> bool {
        self.kind == CellKind::Bool
    }

    /// Maximum number of elements
    pub fn capacity(&self) -> usize {
        self.buffer.layout().capacity
    }

    /// String slot width for character cells
    pub fn element_width(&self) -> Option<usize> {
        match self.kind {
            CellKind::Char => Some(self.buffer.layout().slot_size),
            _ => None,
        }
    }

    /// Current cardinality
    pub fn len(&self) -> usize {
        // the descriptor is re-validated after every native call
        self.buffer.header().card.max(0) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether duplicate-free, ordered set semantics are asserted
    pub fn is_set(&self) -> bool {
        from_spice_bool(self.buffer.header().is_set)
    }

    /// Assert or withdraw set semantics
    pub fn set_is_set(&mut self, is_set: bool) {
        self.buffer.header_mut().is_set = to_spice_bool(is_set);
    }

    /// Empty the cell and clear the native initialization flag
    ///
    /// Memory is kept; use this before passing the cell to a native call that
    /// fills it from scratch.
    pub fn reset(&mut self) {
        let header = self.buffer.header_mut();
        header.card = 0;
        header.init = SPICEFALSE;
    }

    /// Set the cardinality directly
    pub fn set_cardinality(&mut self, card: usize) -> Result<()> {
        if card > self.capacity() {
            return Err(SpiceError::invalid_argument(format!(
                "cardinality {} exceeds cell capacity {}",
                card,
                self.capacity()
            )));
        }
        self.buffer.header_mut().card = card as SpiceInt;
        Ok(())
    }

    /// Map a possibly negative index onto `[0, len)`
    fn resolve(&self, index: isize) -> Result<usize> {
        let len = self.len();
        let resolved = if index < 0 {
            index + len as isize
        } else {
            index
        };
        if resolved < 0 || resolved as usize >= len {
            return Err(SpiceError::IndexOutOfRange { index, len });
        }
        Ok(resolved as usize)
    }

    /// Element at `index`; negative indices count from the end
    pub fn get(&self, index: isize) -> Result<CellValue> {
        let i = self.resolve(index)?;
        Ok(self.read(i))
    }

    /// Elements in `start..stop` with Python slice semantics
    ///
    /// Missing bounds default to the ends, negative bounds count from the end
    /// and out-of-range bounds are clamped.
    pub fn slice(&self, start: Option<isize>, stop: Option<isize>) -> Vec<CellValue> {
        let len = self.len() as isize;
        let clamp = |bound: isize| {
            let bound = if bound < 0 { bound + len } else { bound };
            bound.clamp(0, len) as usize
        };
        let start = clamp(start.unwrap_or(0));
        let stop = clamp(stop.unwrap_or(len));
        (start..stop.max(start)).map(|i| self.read(i)).collect()
    }

    /// Iterate over the live elements
    pub fn iter(&self) -> CellIter<'_> {
        CellIter::new(self)
    }

    /// All live elements
    pub fn to_vec(&self) -> Vec<CellValue> {
        self.iter().collect()
    }

    /// Live elements of a double cell
    pub fn as_doubles(&self) -> Option<&[SpiceDouble]> {
        match self.kind {
            CellKind::Double => Some(&self.buffer.doubles()[..self.len()]),
            _ => None,
        }
    }

    /// Live elements of an integer or time cell
    pub fn as_ints(&self) -> Option<&[SpiceInt]> {
        match self.kind {
            CellKind::Int | CellKind::Time => Some(&self.buffer.ints()[..self.len()]),
            _ => None,
        }
    }

    /// Linear membership test
    pub fn contains<V: Into<CellValue>>(&self, value: V) -> bool {
        match self.check_kind(value.into()) {
            Ok(value) => self.iter().any(|element| element == value),
            Err(_) => false,
        }
    }

    /// Append to the end, growing the cardinality by one
    pub fn append<V: Into<CellValue>>(&mut self, value: V) -> Result<()> {
        let value = self.check_kind(value.into())?;
        let len = self.len();
        if len == self.capacity() {
            return Err(SpiceError::CellFull {
                capacity: self.capacity(),
            });
        }
        self.write(len, &value);
        self.buffer.header_mut().card += 1;
        Ok(())
    }

    /// Insert into an ordered set
    ///
    /// Returns `false` when the value is already present. The cell must
    /// assert set semantics.
    pub fn insert<V: Into<CellValue>>(&mut self, value: V) -> Result<bool> {
        let value = self.check_kind(value.into())?;
        if !self.is_set() {
            return Err(SpiceError::invalid_argument(
                "insert requires a cell with set semantics",
            ));
        }

        let len = self.len();
        let mut position = len;
        for i in 0..len {
            match self.read(i).order(&value) {
                Ordering::Less => continue,
                Ordering::Equal => return Ok(false),
                Ordering::Greater => {
                    position = i;
                    break;
                }
            }
        }

        if len == self.capacity() {
            return Err(SpiceError::CellFull {
                capacity: self.capacity(),
            });
        }
        let slot = self.buffer.layout().slot_size;
        self.buffer
            .bytes_mut()
            .copy_within(position * slot..len * slot, (position + 1) * slot);
        self.write(position, &value);
        self.buffer.header_mut().card += 1;
        Ok(true)
    }

    /// Remove the first element equal to `value`
    ///
    /// Returns `false` when no element matched.
    pub fn remove<V: Into<CellValue>>(&mut self, value: V) -> Result<bool> {
        let value = self.check_kind(value.into())?;
        let len = self.len();
        let Some(position) = self.iter().position(|element| element == value) else {
            return Ok(false);
        };

        let slot = self.buffer.layout().slot_size;
        let bytes = self.buffer.bytes_mut();
        bytes.copy_within((position + 1) * slot..len * slot, position * slot);
        bytes[(len - 1) * slot..len * slot].fill(0);
        self.buffer.header_mut().card -= 1;
        Ok(true)
    }

    /// Hand the native descriptor to a native call
    ///
    /// The descriptor is re-validated when `call` returns. If the native side
    /// left a cardinality outside `[0, capacity]` it is clamped and an
    /// `InvalidArgument` error is returned.
    ///
    /// # Safety
    ///
    /// The pointer is valid only for the duration of `call` and must not be
    /// retained. The native side must not write past `capacity` slots or change
    /// `size`, `dtype`, `length`, `base` or `data`.
    pub unsafe fn with_native<R>(&mut self, call: impl FnOnce(*mut SpiceCell) -> R) -> Result<R> {
        let result = call(self.buffer.header_ptr());

        let capacity = self.capacity();
        let header = self.buffer.header_mut();
        if header.card < 0 || header.card as usize > capacity {
            warn!(
                "native call left cell cardinality {} outside [0, {}]",
                header.card, capacity
            );
            header.card = header.card.clamp(0, capacity as SpiceInt);
            return Err(SpiceError::invalid_argument(
                "native call left the cell with an invalid cardinality",
            ));
        }
        Ok(result)
    }

    /// Check the value's kind and bring it to the form a slot stores
    ///
    /// Strings are truncated and right-trimmed exactly as a slot round trip
    /// would, so comparisons against stored elements are exact.
    fn check_kind(&self, value: CellValue) -> Result<CellValue> {
        if value.kind() != self.kind {
            return Err(SpiceError::KindMismatch {
                expected: self.kind,
                actual: value.kind(),
            });
        }
        Ok(match value {
            CellValue::Char(text) => {
                let mut slot = vec![0u8; self.buffer.layout().slot_size];
                write_slot(&mut slot, &text);
                CellValue::Char(read_slot(&slot))
            }
            other => other,
        })
    }

    /// Read slot `i`, which must be below the capacity
    pub(crate) fn read(&self, i: usize) -> CellValue {
        match self.kind {
            CellKind::Char => {
                let width = self.buffer.layout().slot_size;
                CellValue::Char(read_slot(&self.buffer.bytes()[i * width..(i + 1) * width]))
            }
            CellKind::Double => CellValue::Double(self.buffer.doubles()[i]),
            CellKind::Int => CellValue::Int(self.buffer.ints()[i]),
            CellKind::Time => CellValue::Time(self.buffer.ints()[i]),
            CellKind::Bool => CellValue::Bool(from_spice_bool(self.buffer.ints()[i])),
        }
    }

    /// Write slot `i`; the value kind has already been checked
    fn write(&mut self, i: usize, value: &CellValue) {
        match value {
            CellValue::Char(text) => {
                let width = self.buffer.layout().slot_size;
                write_slot(&mut self.buffer.bytes_mut()[i * width..(i + 1) * width], text);
            }
            CellValue::Double(x) => self.buffer.doubles_mut()[i] = *x,
            CellValue::Int(n) | CellValue::Time(n) => self.buffer.ints_mut()[i] = *n,
            CellValue::Bool(b) => self.buffer.ints_mut()[i] = to_spice_bool(*b),
        }
    }

    /// Element-wise comparison against a plain sequence
    pub fn eq_values<V>(&self, other: &[V]) -> bool
    where
        V: Clone + Into<CellValue>,
    {
        self.len() == other.len()
            && self
                .iter()
                .zip(other)
                .all(|(element, value)| element == Into::<CellValue>::into(value.clone()))
    }
}

impl Clone for Cell {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            buffer: self.buffer.duplicate(),
        }
    }
}

// Cells of different kind or different set flag are never equal, even with
// identical elements.
impl PartialEq for Cell {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
            && self.is_set() == other.is_set()
            && self.len() == other.len()
            && self.iter().eq(other.iter())
    }
}

impl PartialEq<[CellValue]> for Cell {
    fn eq(&self, other: &[CellValue]) -> bool {
        self.len() == other.len() && self.iter().zip(other).all(|(a, b)| a == *b)
    }
}

impl PartialEq<Vec<CellValue>> for Cell {
    fn eq(&self, other: &Vec<CellValue>) -> bool {
        *self == other[..]
    }
}

impl fmt::Debug for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cell")
            .field("kind", &self.kind)
            .field("card", &self.len())
            .field("size", &self.capacity())
            .field("is_set", &self.is_set())
            .field("elements", &self.to_vec())
            .finish()
    }
}

impl<'a> IntoIterator for &'a Cell {
    type Item = CellValue;
    type IntoIter = CellIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
