//! Numeric vectors and matrices
//!
//! Conversions validate the whole input before anything is written to the
//! output buffer, so a failed conversion never leaves a half-filled buffer.

use nalgebra::{Matrix3, Vector3};
use ndarray::{Array2, ArrayView2};
use num_traits::ToPrimitive;

use crate::errors::{Result, SpiceError};
use crate::types::{from_spice_bool, to_spice_bool, NativeElement, SpiceBoolean, SpiceDouble, SpiceInt};

/// Host scalars that convert losslessly into the native element type `N`
pub trait ToNative<N: NativeElement>: Copy {
    /// Host type name used in error messages
    const HOST_TYPE: &'static str;

    /// The native value, or `None` if it does not fit
    fn to_native(self) -> Option<N>;
}

impl ToNative<SpiceDouble> for f64 {
    const HOST_TYPE: &'static str = "f64";

    #[inline]
    fn to_native(self) -> Option<SpiceDouble> {
        Some(self)
    }
}

impl ToNative<SpiceInt> for bool {
    const HOST_TYPE: &'static str = "bool";

    #[inline]
    fn to_native(self) -> Option<SpiceBoolean> {
        Some(to_spice_bool(self))
    }
}

macro_rules! int_to_native {
    ($($t:ty),*) => {
        $(
            impl ToNative<SpiceInt> for $t {
                const HOST_TYPE: &'static str = stringify!($t);

                #[inline]
                fn to_native(self) -> Option<SpiceInt> {
                    self.to_i32()
                }
            }
        )*
    };
}

int_to_native!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

fn convert<N, T>(value: T, position: usize) -> Result<N>
where
    N: NativeElement,
    T: ToNative<N>,
{
    value.to_native().ok_or_else(|| {
        SpiceError::type_mismatch(format!(
            "element {} of type {} does not fit in native {}",
            position,
            T::HOST_TYPE,
            N::DTYPE
        ))
    })
}

/// A row-major matrix buffer ready for a native call
#[derive(Debug, Clone, PartialEq)]
pub struct NativeMatrix<N> {
    data: Vec<N>,
    nrows: usize,
    ncols: usize,
}

impl<N: NativeElement> NativeMatrix<N> {
    /// Zero-filled matrix for use as a native output parameter
    pub fn zeroed(nrows: usize, ncols: usize) -> Self {
        Self {
            data: vec![N::default(); nrows * ncols],
            nrows,
            ncols,
        }
    }

    pub(crate) fn from_parts(data: Vec<N>, nrows: usize, ncols: usize) -> Self {
        debug_assert_eq!(data.len(), nrows * ncols);
        Self { data, nrows, ncols }
    }

    /// `(rows, columns)`
    pub fn shape(&self) -> (usize, usize) {
        (self.nrows, self.ncols)
    }

    /// Row-major element storage
    pub fn as_slice(&self) -> &[N] {
        &self.data
    }

    /// Pointer to the first element
    pub fn as_ptr(&self) -> *const N {
        self.data.as_ptr()
    }

    /// Mutable pointer to the first element, for native output parameters
    pub fn as_mut_ptr(&mut self) -> *mut N {
        self.data.as_mut_ptr()
    }

    /// Copy back into a host 2-D array
    pub fn to_array(&self) -> Array2<N> {
        // shape always matches data length by construction
        Array2::from_shape_fn((self.nrows, self.ncols), |(r, c)| self.data[r * self.ncols + c])
    }
}

/// Convert a host sequence into a native vector
pub fn to_native_vector<N, T>(values: &[T]) -> Result<Vec<N>>
where
    N: NativeElement,
    T: ToNative<N>,
{
    let mut out = Vec::with_capacity(values.len());
    to_native_vector_into(values, &mut out)?;
    Ok(out)
}

/// Like [`to_native_vector`], reusing a caller-owned buffer
pub fn to_native_vector_into<N, T>(values: &[T], out: &mut Vec<N>) -> Result<()>
where
    N: NativeElement,
    T: ToNative<N>,
{
    for (i, &value) in values.iter().enumerate() {
        convert::<N, T>(value, i)?;
    }
    out.clear();
    out.extend(values.iter().map(|&v| v.to_native().unwrap_or_default()));
    Ok(())
}

/// Convert host rows into a row-major native matrix, rejecting ragged input
pub fn to_native_matrix<N, T, R>(rows: &[R]) -> Result<NativeMatrix<N>>
where
    N: NativeElement,
    T: ToNative<N>,
    R: AsRef<[T]>,
{
    let mut data = Vec::new();
    let (nrows, ncols) = to_native_matrix_into(rows, &mut data)?;
    Ok(NativeMatrix { data, nrows, ncols })
}

/// Like [`to_native_matrix`], reusing a caller-owned buffer
///
/// Returns `(rows, columns)`.
pub fn to_native_matrix_into<N, T, R>(rows: &[R], out: &mut Vec<N>) -> Result<(usize, usize)>
where
    N: NativeElement,
    T: ToNative<N>,
    R: AsRef<[T]>,
{
    let ncols = rows.first().map(|r| r.as_ref().len()).unwrap_or(0);
    for (r, row) in rows.iter().enumerate() {
        let row = row.as_ref();
        if row.len() != ncols {
            return Err(SpiceError::type_mismatch(format!(
                "ragged matrix: row {} has {} columns, expected {}",
                r,
                row.len(),
                ncols
            )));
        }
        for (c, &value) in row.iter().enumerate() {
            convert::<N, T>(value, r * ncols + c)?;
        }
    }

    out.clear();
    out.reserve(rows.len() * ncols);
    for row in rows {
        out.extend(row.as_ref().iter().map(|&v| v.to_native().unwrap_or_default()));
    }
    Ok((rows.len(), ncols))
}

/// Convert an `ndarray` view into a row-major native matrix
///
/// Works for any memory order of the view; elements are taken in logical
/// row-major order.
pub fn matrix_from_array<N, T>(array: ArrayView2<'_, T>) -> Result<NativeMatrix<N>>
where
    N: NativeElement,
    T: ToNative<N>,
{
    let (nrows, ncols) = array.dim();
    let mut data = Vec::with_capacity(nrows * ncols);
    for (i, &value) in array.iter().enumerate() {
        data.push(convert::<N, T>(value, i)?);
    }
    Ok(NativeMatrix { data, nrows, ncols })
}

/// Copy a native vector back into a host vector, bit for bit
pub fn from_native_vector<N: NativeElement>(buffer: &[N]) -> Vec<N> {
    buffer.to_vec()
}

/// Decode a native boolean vector
pub fn from_native_bools(buffer: &[SpiceBoolean]) -> Vec<bool> {
    buffer.iter().map(|&b| from_spice_bool(b)).collect()
}

/// Copy a row-major native buffer of the given shape into a host 2-D array
pub fn from_native_matrix<N: NativeElement>(
    buffer: &[N],
    nrows: usize,
    ncols: usize,
) -> Result<Array2<N>> {
    Array2::from_shape_vec((nrows, ncols), buffer.to_vec()).map_err(|e| {
        SpiceError::type_mismatch(format!(
            "buffer of {} elements cannot be shaped {}x{}: {}",
            buffer.len(),
            nrows,
            ncols,
            e
        ))
    })
}

/// Native layout of a 3-vector
pub fn vector3_to_native(v: &Vector3<f64>) -> [SpiceDouble; 3] {
    [v.x, v.y, v.z]
}

/// Host 3-vector from its native layout
pub fn vector3_from_native(v: &[SpiceDouble; 3]) -> Vector3<f64> {
    Vector3::new(v[0], v[1], v[2])
}

/// Native (row-major) layout of a 3x3 matrix
pub fn matrix3_to_native(m: &Matrix3<f64>) -> [[SpiceDouble; 3]; 3] {
    let mut out = [[0.0; 3]; 3];
    for (r, row) in out.iter_mut().enumerate() {
        for (c, value) in row.iter_mut().enumerate() {
            *value = m[(r, c)];
        }
    }
    out
}

/// Host 3x3 matrix from its native (row-major) layout
pub fn matrix3_from_native(m: &[[SpiceDouble; 3]; 3]) -> Matrix3<f64> {
    Matrix3::from_fn(|r, c| m[r][c])
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_double_round_trip_is_exact() {
        let xs = vec![0.1, -2.5e-300, f64::MAX, f64::MIN_POSITIVE, 3.141592653589793];
        let native: Vec<SpiceDouble> = to_native_vector(&xs).unwrap();
        assert_eq!(from_native_vector(&native), xs);
        for (a, b) in xs.iter().zip(&native) {
            assert_eq!(a.to_bits(), b.to_bits());
        }
    }

    #[test]
    fn test_int_round_trip() {
        let xs: Vec<i32> = vec![0, -1, i32::MAX, i32::MIN, 399];
        let native: Vec<SpiceInt> = to_native_vector(&xs).unwrap();
        assert_eq!(from_native_vector(&native), xs);
    }

    #[test]
    fn test_bool_round_trip() {
        let xs = vec![true, false, true];
        let native: Vec<SpiceBoolean> = to_native_vector(&xs).unwrap();
        assert_eq!(native, vec![1, 0, 1]);
        assert_eq!(from_native_bools(&native), xs);
    }

    #[test]
    fn test_integer_overflow_is_type_mismatch() {
        let xs: Vec<i64> = vec![1, i64::from(i32::MAX) + 1];
        let result: Result<Vec<SpiceInt>> = to_native_vector(&xs);
        assert!(matches!(result, Err(SpiceError::TypeMismatch(_))));

        let negative: Vec<u64> = vec![u64::MAX];
        let result: Result<Vec<SpiceInt>> = to_native_vector(&negative);
        assert!(result.is_err());
    }

    #[test]
    fn test_failed_vector_conversion_leaves_buffer_untouched() {
        let mut out: Vec<SpiceInt> = vec![7, 8, 9];
        let bad: Vec<i64> = vec![1, 2, i64::MAX];
        assert!(to_native_vector_into(&bad, &mut out).is_err());
        assert_eq!(out, vec![7, 8, 9]);

        let good: Vec<i64> = vec![4, 5];
        to_native_vector_into(&good, &mut out).unwrap();
        assert_eq!(out, vec![4, 5]);
    }

    #[test]
    fn test_matrix_row_major() {
        let rows = vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]];
        let m = to_native_matrix::<SpiceDouble, f64, _>(&rows).unwrap();
        assert_eq!(m.shape(), (2, 3));
        assert_eq!(m.as_slice(), &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert_eq!(m.to_array(), array![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]);
    }

    #[test]
    fn test_fixed_size_rows() {
        let rows = [[1i32, 2], [3, 4], [5, 6]];
        let m = to_native_matrix::<SpiceInt, i32, _>(&rows).unwrap();
        assert_eq!(m.shape(), (3, 2));
        assert_eq!(m.as_slice(), &[1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_ragged_matrix_rejected() {
        let rows = vec![vec![1.0, 2.0], vec![3.0]];
        let mut out = vec![42.0];
        let result = to_native_matrix_into::<SpiceDouble, f64, _>(&rows, &mut out);
        assert!(matches!(result, Err(SpiceError::TypeMismatch(_))));
        assert_eq!(out, vec![42.0]);
    }

    #[test]
    fn test_empty_matrix() {
        let rows: Vec<Vec<f64>> = Vec::new();
        let m = to_native_matrix::<SpiceDouble, f64, _>(&rows).unwrap();
        assert_eq!(m.shape(), (0, 0));
    }

    #[test]
    fn test_ndarray_column_major_view() {
        let a = array![[1.0, 2.0], [3.0, 4.0]];
        let t = a.t();
        let m: NativeMatrix<SpiceDouble> = matrix_from_array(t).unwrap();
        assert_eq!(m.as_slice(), &[1.0, 3.0, 2.0, 4.0]);
    }

    #[test]
    fn test_from_native_matrix_shape_check() {
        let buffer = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let a = from_native_matrix(&buffer, 3, 2).unwrap();
        assert_eq!(a[(2, 1)], 6.0);
        assert!(matches!(
            from_native_matrix(&buffer, 4, 2),
            Err(SpiceError::TypeMismatch(_))
        ));
    }

    #[test]
    fn test_nalgebra_layouts() {
        let v = Vector3::new(1.0, -2.0, 3.5);
        assert_eq!(vector3_from_native(&vector3_to_native(&v)), v);

        let m = Matrix3::new(1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0);
        let native = matrix3_to_native(&m);
        assert_eq!(native[0], [1.0, 2.0, 3.0]);
        assert_eq!(native[2], [7.0, 8.0, 9.0]);
        assert_eq!(matrix3_from_native(&native), m);
    }

    #[test]
    fn test_zeroed_output_matrix() {
        let mut m = NativeMatrix::<SpiceDouble>::zeroed(3, 3);
        unsafe {
            *m.as_mut_ptr().add(4) = 1.0;
        }
        assert_eq!(m.to_array()[(1, 1)], 1.0);
    }
}
