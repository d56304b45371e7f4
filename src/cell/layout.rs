//! Physical layout of a cell
//!
//! A cell is one heap allocation:
//!
//! ```text
//! +-----------------------+----------------------------+-----------------------------+
//! | SpiceCell descriptor  | control area               | data area                   |
//! | (#[repr(C)], 48 bytes | CELL_CTRLSZ * slot_size    | capacity * slot_size        |
//! |  on 64-bit targets)   | (reserved for the library) |                             |
//! +-----------------------+----------------------------+-----------------------------+
//!                         ^ base                       ^ data
//! ```
//!
//! The native library receives a pointer to the descriptor and follows `base`
//! and `data` into the same allocation, so the descriptor field order and
//! widths are pinned to the native struct. `slot_size` is the string width for
//! character cells and the native word size otherwise.

use std::alloc::{self, Layout};
use std::ffi::c_void;
use std::mem;
use std::ptr::NonNull;

use crate::cell::CellKind;
use crate::errors::{Result, SpiceError};
use crate::types::{SpiceBoolean, SpiceDouble, SpiceInt, SPICEFALSE, SPICETRUE};

/// Number of control slots preceding the data area
pub const CELL_CTRLSZ: usize = 6;

/// Alignment of a cell allocation and of its control area
///
/// Wide enough for the descriptor and for double slots on every target.
pub const CELL_ALIGN: usize = if mem::align_of::<SpiceCell>() > mem::align_of::<SpiceDouble>() {
    mem::align_of::<SpiceCell>()
} else {
    mem::align_of::<SpiceDouble>()
};

/// Native cell descriptor
///
/// Field order and widths match the native `SpiceCell` struct exactly.
#[repr(C)]
#[derive(Debug)]
pub struct SpiceCell {
    /// Element kind tag (see [`CellKind`])
    pub dtype: SpiceInt,
    /// String slot width for character cells, 0 otherwise
    pub length: SpiceInt,
    /// Capacity in elements
    pub size: SpiceInt,
    /// Cardinality
    pub card: SpiceInt,
    /// Set semantics asserted
    pub is_set: SpiceBoolean,
    /// Reserved for the native library
    pub adjust: SpiceBoolean,
    /// Native "control area initialized" flag
    pub init: SpiceBoolean,
    /// Start of the control area
    pub base: *mut c_void,
    /// Start of the data area
    pub data: *mut c_void,
}

/// Byte offsets of the regions inside a cell allocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellLayout {
    pub slot_size: usize,
    pub capacity: usize,
    pub control_offset: usize,
    pub data_offset: usize,
    pub total: usize,
}

impl CellLayout {
    /// Compute the layout for `capacity` slots of `slot_size` bytes
    pub fn new(capacity: usize, slot_size: usize) -> Result<Self> {
        let overflow = || {
            SpiceError::invalid_argument(format!(
                "cell of {} slots of {} bytes exceeds the addressable size",
                capacity, slot_size
            ))
        };

        // padding after the descriptor keeps double slots aligned on 32-bit targets
        let control_offset = mem::size_of::<SpiceCell>().next_multiple_of(CELL_ALIGN);
        let control_len = CELL_CTRLSZ.checked_mul(slot_size).ok_or_else(overflow)?;
        let data_offset = control_offset
            .checked_add(control_len)
            .ok_or_else(overflow)?;
        let data_len = capacity.checked_mul(slot_size).ok_or_else(overflow)?;
        let total = data_offset.checked_add(data_len).ok_or_else(overflow)?;

        Ok(Self {
            slot_size,
            capacity,
            control_offset,
            data_offset,
            total,
        })
    }

    fn alloc_layout(&self) -> Result<Layout> {
        Layout::from_size_align(self.total, CELL_ALIGN)
            .map_err(|e| SpiceError::invalid_argument(format!("invalid cell layout: {}", e)))
    }
}

/// Owner of one cell allocation
///
/// Released exactly once, on drop.
pub(crate) struct CellBuffer {
    ptr: NonNull<u8>,
    layout: CellLayout,
    alloc_layout: Layout,
}

// The allocation is exclusively owned and never aliased outside `&mut self`.
unsafe impl Send for CellBuffer {}

impl CellBuffer {
    /// Allocate a zeroed cell with an empty cardinality
    pub(crate) fn allocate(kind: CellKind, capacity: usize, slot_size: usize) -> Result<Self> {
        let size = SpiceInt::try_from(capacity).map_err(|_| {
            SpiceError::invalid_argument(format!(
                "cell capacity {} does not fit in a native integer",
                capacity
            ))
        })?;
        let length = match kind {
            CellKind::Char => SpiceInt::try_from(slot_size).map_err(|_| {
                SpiceError::invalid_argument(format!(
                    "string width {} does not fit in a native integer",
                    slot_size
                ))
            })?,
            _ => 0,
        };

        let layout = CellLayout::new(capacity, slot_size)?;
        let alloc_layout = layout.alloc_layout()?;

        // SAFETY: the layout is never zero-sized, it always holds the descriptor.
        let raw = unsafe { alloc::alloc_zeroed(alloc_layout) };
        let ptr = match NonNull::new(raw) {
            Some(ptr) => ptr,
            None => alloc::handle_alloc_error(alloc_layout),
        };

        let mut buffer = Self {
            ptr,
            layout,
            alloc_layout,
        };
        let (base, data) = buffer.region_pointers();
        // SAFETY: the allocation starts with a properly aligned, zeroed descriptor.
        unsafe {
            buffer.ptr.as_ptr().cast::<SpiceCell>().write(SpiceCell {
                dtype: kind as SpiceInt,
                length,
                size,
                card: 0,
                is_set: SPICETRUE,
                adjust: SPICEFALSE,
                init: SPICEFALSE,
                base,
                data,
            });
        }
        Ok(buffer)
    }

    /// Copy this allocation byte for byte into a fresh one
    pub(crate) fn duplicate(&self) -> Self {
        let alloc_layout = self.alloc_layout;
        // SAFETY: same non-zero layout as the source allocation.
        let raw = unsafe { alloc::alloc(alloc_layout) };
        let ptr = match NonNull::new(raw) {
            Some(ptr) => ptr,
            None => alloc::handle_alloc_error(alloc_layout),
        };
        // SAFETY: both regions are `total` bytes long and do not overlap.
        unsafe {
            std::ptr::copy_nonoverlapping(self.ptr.as_ptr(), ptr.as_ptr(), self.layout.total);
        }
        let mut copy = Self {
            ptr,
            layout: self.layout,
            alloc_layout,
        };
        let (base, data) = copy.region_pointers();
        let header = copy.header_mut();
        header.base = base;
        header.data = data;
        copy
    }

    fn region_pointers(&mut self) -> (*mut c_void, *mut c_void) {
        // SAFETY: both offsets lie within (or one past the end of) the allocation.
        unsafe {
            (
                self.ptr.as_ptr().add(self.layout.control_offset).cast(),
                self.ptr.as_ptr().add(self.layout.data_offset).cast(),
            )
        }
    }

    pub(crate) fn layout(&self) -> &CellLayout {
        &self.layout
    }

    pub(crate) fn header(&self) -> &SpiceCell {
        // SAFETY: written in `allocate`, alive as long as `self`.
        unsafe { &*self.ptr.as_ptr().cast::<SpiceCell>() }
    }

    pub(crate) fn header_mut(&mut self) -> &mut SpiceCell {
        // SAFETY: as above, and `&mut self` guarantees exclusivity.
        unsafe { &mut *self.ptr.as_ptr().cast::<SpiceCell>() }
    }

    pub(crate) fn header_ptr(&mut self) -> *mut SpiceCell {
        self.ptr.as_ptr().cast()
    }

    /// Whole data area as bytes, all `capacity` slots
    pub(crate) fn bytes(&self) -> &[u8] {
        // SAFETY: the data area is `capacity * slot_size` initialized bytes.
        unsafe {
            std::slice::from_raw_parts(
                self.ptr.as_ptr().add(self.layout.data_offset),
                self.layout.capacity * self.layout.slot_size,
            )
        }
    }

    pub(crate) fn bytes_mut(&mut self) -> &mut [u8] {
        // SAFETY: as above, with exclusive access.
        unsafe {
            std::slice::from_raw_parts_mut(
                self.ptr.as_ptr().add(self.layout.data_offset),
                self.layout.capacity * self.layout.slot_size,
            )
        }
    }

    /// Data area of a double cell as native doubles
    pub(crate) fn doubles(&self) -> &[SpiceDouble] {
        debug_assert_eq!(self.layout.slot_size, mem::size_of::<SpiceDouble>());
        // SAFETY: the control offset is a multiple of CELL_ALIGN, the control
        // area is a whole number of 8-byte slots and the allocation is
        // CELL_ALIGN-aligned, so the data area is aligned for doubles.
        unsafe {
            std::slice::from_raw_parts(
                self.ptr.as_ptr().add(self.layout.data_offset).cast(),
                self.layout.capacity,
            )
        }
    }

    pub(crate) fn doubles_mut(&mut self) -> &mut [SpiceDouble] {
        debug_assert_eq!(self.layout.slot_size, mem::size_of::<SpiceDouble>());
        // SAFETY: as for `doubles`.
        unsafe {
            std::slice::from_raw_parts_mut(
                self.ptr.as_ptr().add(self.layout.data_offset).cast(),
                self.layout.capacity,
            )
        }
    }

    /// Data area of an int, time or bool cell as native integers
    pub(crate) fn ints(&self) -> &[SpiceInt] {
        debug_assert_eq!(self.layout.slot_size, mem::size_of::<SpiceInt>());
        // SAFETY: the data offset is a multiple of 4 for 4-byte slots.
        unsafe {
            std::slice::from_raw_parts(
                self.ptr.as_ptr().add(self.layout.data_offset).cast(),
                self.layout.capacity,
            )
        }
    }

    pub(crate) fn ints_mut(&mut self) -> &mut [SpiceInt] {
        debug_assert_eq!(self.layout.slot_size, mem::size_of::<SpiceInt>());
        // SAFETY: as for `ints`.
        unsafe {
            std::slice::from_raw_parts_mut(
                self.ptr.as_ptr().add(self.layout.data_offset).cast(),
                self.layout.capacity,
            )
        }
    }
}

impl Drop for CellBuffer {
    fn drop(&mut self) {
        // SAFETY: allocated with this exact layout and never freed elsewhere.
        unsafe { alloc::dealloc(self.ptr.as_ptr(), self.alloc_layout) };
    }
}
