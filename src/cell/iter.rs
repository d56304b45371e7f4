//! Iteration over the live elements of a cell

use std::iter::FusedIterator;

use crate::cell::{Cell, CellValue};

/// Iterator over the first `len()` elements of a cell
///
/// The cardinality is captured when the iterator is created; calling
/// [`Cell::iter`] again starts over from index 0.
pub struct CellIter<'a> {
    cell: &'a Cell,
    front: usize,
    back: usize,
}

impl<'a> CellIter<'a> {
    pub(crate) fn new(cell: &'a Cell) -> Self {
        Self {
            cell,
            front: 0,
            back: cell.len(),
        }
    }
}

impl Iterator for CellIter<'_> {
    type Item = CellValue;

    fn next(&mut self) -> Option<CellValue> {
        if self.front >= self.back {
            return None;
        }
        let value = self.cell.read(self.front);
        self.front += 1;
        Some(value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.back - self.front;
        (remaining, Some(remaining))
    }
}

impl DoubleEndedIterator for CellIter<'_> {
    fn next_back(&mut self) -> Option<CellValue> {
        if self.front >= self.back {
            return None;
        }
        self.back -= 1;
        Some(self.cell.read(self.back))
    }
}

impl ExactSizeIterator for CellIter<'_> {}

impl FusedIterator for CellIter<'_> {}
