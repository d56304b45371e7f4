//! Fixed-shape native structs
//!
//! Planes, ellipses and the DLA/DSK/EK descriptor records are passed to and
//! from native calls by pointer. Unlike cells they never resize, so they are
//! plain `#[repr(C)]` value types with read-only accessors.

use nalgebra::Vector3;

use crate::marshal::numeric::{vector3_from_native, vector3_to_native};
use crate::marshal::strings::read_c_chars;
use crate::types::{from_spice_bool, SpiceBoolean, SpiceChar, SpiceDouble, SpiceInt};

/// Length of an EK table name, terminator included
pub const SPICE_EK_TSTRLN: usize = 65;
/// Length of an EK column name, terminator included
pub const SPICE_EK_CSTRLN: usize = 33;
/// Maximum number of columns in an EK segment
pub const SPICE_EK_MXCLSG: usize = 100;
/// Number of coordinate parameters in a DSK descriptor
pub const SPICE_DSK_NSYPAR: usize = 10;

/// A plane as `{x : <normal, x> = constant}`, with a unit normal
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Plane {
    normal: [SpiceDouble; 3],
    constant: SpiceDouble,
}

impl Plane {
    /// Build from a unit normal vector and the plane constant
    pub fn new(normal: Vector3<f64>, constant: f64) -> Self {
        Self {
            normal: vector3_to_native(&normal),
            constant,
        }
    }

    pub fn normal(&self) -> Vector3<f64> {
        vector3_from_native(&self.normal)
    }

    pub fn constant(&self) -> f64 {
        self.constant
    }

    /// The point of the plane closest to the origin
    pub fn point(&self) -> Vector3<f64> {
        self.normal() * self.constant
    }
}

/// An ellipse given by its center and semi-axis vectors
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Ellipse {
    center: [SpiceDouble; 3],
    semi_major: [SpiceDouble; 3],
    semi_minor: [SpiceDouble; 3],
}

impl Ellipse {
    pub fn new(center: Vector3<f64>, semi_major: Vector3<f64>, semi_minor: Vector3<f64>) -> Self {
        Self {
            center: vector3_to_native(&center),
            semi_major: vector3_to_native(&semi_major),
            semi_minor: vector3_to_native(&semi_minor),
        }
    }

    pub fn center(&self) -> Vector3<f64> {
        vector3_from_native(&self.center)
    }

    pub fn semi_major(&self) -> Vector3<f64> {
        vector3_from_native(&self.semi_major)
    }

    pub fn semi_minor(&self) -> Vector3<f64> {
        vector3_from_native(&self.semi_minor)
    }
}

/// DLA segment descriptor
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DlaDescr {
    bwdptr: SpiceInt,
    fwdptr: SpiceInt,
    ibase: SpiceInt,
    isize: SpiceInt,
    dbase: SpiceInt,
    dsize: SpiceInt,
    cbase: SpiceInt,
    csize: SpiceInt,
}

impl DlaDescr {
    /// Backward pointer to the previous segment
    pub fn bwdptr(&self) -> SpiceInt {
        self.bwdptr
    }

    /// Forward pointer to the next segment
    pub fn fwdptr(&self) -> SpiceInt {
        self.fwdptr
    }

    /// Base address and size of the integer component
    pub fn integers(&self) -> (SpiceInt, SpiceInt) {
        (self.ibase, self.isize)
    }

    /// Base address and size of the double component
    pub fn doubles(&self) -> (SpiceInt, SpiceInt) {
        (self.dbase, self.dsize)
    }

    /// Base address and size of the character component
    pub fn characters(&self) -> (SpiceInt, SpiceInt) {
        (self.cbase, self.csize)
    }
}

/// DSK segment descriptor
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DskDescr {
    surfce: SpiceInt,
    center: SpiceInt,
    dclass: SpiceInt,
    dtype: SpiceInt,
    frmcde: SpiceInt,
    corsys: SpiceInt,
    corpar: [SpiceDouble; SPICE_DSK_NSYPAR],
    co1min: SpiceDouble,
    co1max: SpiceDouble,
    co2min: SpiceDouble,
    co2max: SpiceDouble,
    co3min: SpiceDouble,
    co3max: SpiceDouble,
    start: SpiceDouble,
    stop: SpiceDouble,
}

impl DskDescr {
    pub fn surface(&self) -> SpiceInt {
        self.surfce
    }

    pub fn center(&self) -> SpiceInt {
        self.center
    }

    pub fn data_class(&self) -> SpiceInt {
        self.dclass
    }

    pub fn data_type(&self) -> SpiceInt {
        self.dtype
    }

    pub fn frame_code(&self) -> SpiceInt {
        self.frmcde
    }

    pub fn coordinate_system(&self) -> SpiceInt {
        self.corsys
    }

    pub fn coordinate_parameters(&self) -> &[SpiceDouble; SPICE_DSK_NSYPAR] {
        &self.corpar
    }

    /// `[(min, max); 3]` bounds of the three coordinates
    pub fn bounds(&self) -> [(SpiceDouble, SpiceDouble); 3] {
        [
            (self.co1min, self.co1max),
            (self.co2min, self.co2max),
            (self.co3min, self.co3max),
        ]
    }

    /// Coverage interval in TDB seconds past J2000
    pub fn coverage(&self) -> (SpiceDouble, SpiceDouble) {
        (self.start, self.stop)
    }
}

/// EK column data type
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EkDataType {
    Char = 0,
    Double = 1,
    Int = 2,
    Time = 3,
}

impl EkDataType {
    /// Decode a native data type tag
    pub fn from_raw(tag: SpiceInt) -> Option<Self> {
        match tag {
            0 => Some(EkDataType::Char),
            1 => Some(EkDataType::Double),
            2 => Some(EkDataType::Int),
            3 => Some(EkDataType::Time),
            _ => None,
        }
    }
}

/// EK column attribute descriptor
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EkAttDsc {
    cclass: SpiceInt,
    dtype: SpiceInt,
    strlen: SpiceInt,
    size: SpiceInt,
    indexd: SpiceBoolean,
    nullok: SpiceBoolean,
}

impl EkAttDsc {
    pub fn column_class(&self) -> SpiceInt {
        self.cclass
    }

    /// Column data type, `None` for a tag this crate does not know
    pub fn data_type(&self) -> Option<EkDataType> {
        EkDataType::from_raw(self.dtype)
    }

    /// Declared string length, for character columns
    pub fn string_length(&self) -> SpiceInt {
        self.strlen
    }

    /// Number of elements per entry
    pub fn size(&self) -> SpiceInt {
        self.size
    }

    pub fn is_indexed(&self) -> bool {
        from_spice_bool(self.indexd)
    }

    pub fn nulls_ok(&self) -> bool {
        from_spice_bool(self.nullok)
    }
}

/// EK segment summary
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct EkSegSum {
    tabnam: [SpiceChar; SPICE_EK_TSTRLN],
    nrows: SpiceInt,
    ncols: SpiceInt,
    cnames: [[SpiceChar; SPICE_EK_CSTRLN]; SPICE_EK_MXCLSG],
    cdescrs: [EkAttDsc; SPICE_EK_MXCLSG],
}

impl Default for EkSegSum {
    fn default() -> Self {
        Self {
            tabnam: [0; SPICE_EK_TSTRLN],
            nrows: 0,
            ncols: 0,
            cnames: [[0; SPICE_EK_CSTRLN]; SPICE_EK_MXCLSG],
            cdescrs: [EkAttDsc::default(); SPICE_EK_MXCLSG],
        }
    }
}

impl EkSegSum {
    pub fn table_name(&self) -> String {
        read_c_chars(&self.tabnam)
    }

    pub fn nrows(&self) -> usize {
        self.nrows.max(0) as usize
    }

    pub fn ncols(&self) -> usize {
        (self.ncols.max(0) as usize).min(SPICE_EK_MXCLSG)
    }

    /// Names of the populated columns
    pub fn column_names(&self) -> Vec<String> {
        self.cnames[..self.ncols()]
            .iter()
            .map(|name| read_c_chars(name))
            .collect()
    }

    /// Attribute descriptors of the populated columns
    pub fn column_descriptors(&self) -> &[EkAttDsc] {
        &self.cdescrs[..self.ncols()]
    }

    /// Descriptor of a column by name
    pub fn column(&self, name: &str) -> Option<&EkAttDsc> {
        self.column_names()
            .iter()
            .position(|column| column == name)
            .map(|i| &self.cdescrs[i])
    }

    #[cfg(test)]
    pub(crate) fn with_columns(table: &str, nrows: SpiceInt, columns: &[(&str, EkAttDsc)]) -> Self {
        use crate::marshal::strings::write_c_chars;

        let mut summary = Self::default();
        write_c_chars(&mut summary.tabnam, table);
        summary.nrows = nrows;
        summary.ncols = columns.len() as SpiceInt;
        for (i, (name, descr)) in columns.iter().enumerate() {
            write_c_chars(&mut summary.cnames[i], name);
            summary.cdescrs[i] = *descr;
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::mem::{offset_of, size_of};

    #[test]
    fn test_struct_sizes() {
        assert_eq!(size_of::<Plane>(), 32);
        assert_eq!(size_of::<Ellipse>(), 72);
        assert_eq!(size_of::<DlaDescr>(), 32);
        assert_eq!(size_of::<DskDescr>(), 168);
        assert_eq!(size_of::<EkAttDsc>(), 24);
        assert_eq!(size_of::<EkSegSum>(), 5776);
    }

    #[test]
    fn test_field_offsets() {
        assert_eq!(offset_of!(Plane, constant), 24);
        assert_eq!(offset_of!(Ellipse, semi_minor), 48);
        assert_eq!(offset_of!(DlaDescr, csize), 28);
        assert_eq!(offset_of!(DskDescr, corpar), 24);
        assert_eq!(offset_of!(DskDescr, co1min), 104);
        assert_eq!(offset_of!(DskDescr, stop), 160);
        assert_eq!(offset_of!(EkAttDsc, dtype), 4);
        assert_eq!(offset_of!(EkAttDsc, nullok), 20);
        assert_eq!(offset_of!(EkSegSum, nrows), 68);
        assert_eq!(offset_of!(EkSegSum, cnames), 76);
        assert_eq!(offset_of!(EkSegSum, cdescrs), 3376);
    }

    #[test]
    fn test_plane_accessors() {
        let plane = Plane::new(Vector3::new(0.0, 0.0, 1.0), 2.5);
        assert_eq!(plane.normal(), Vector3::z());
        assert_relative_eq!(plane.point().z, 2.5);
    }

    #[test]
    fn test_ellipse_accessors() {
        let e = Ellipse::new(Vector3::zeros(), Vector3::x() * 2.0, Vector3::y());
        assert_relative_eq!(e.semi_major().norm(), 2.0);
        assert_relative_eq!(e.semi_minor().norm(), 1.0);
        assert_eq!(e.center(), Vector3::zeros());
    }

    #[test]
    fn test_native_bytes_decode() {
        // a DLA descriptor as the native side would fill it
        let raw: [SpiceInt; 8] = [1, 2, 10, 20, 30, 40, 50, 60];
        let descr: DlaDescr = unsafe { std::mem::transmute(raw) };
        assert_eq!(descr.bwdptr(), 1);
        assert_eq!(descr.fwdptr(), 2);
        assert_eq!(descr.integers(), (10, 20));
        assert_eq!(descr.doubles(), (30, 40));
        assert_eq!(descr.characters(), (50, 60));
    }

    #[test]
    fn test_ek_segment_summary() {
        let int_column = EkAttDsc {
            cclass: 1,
            dtype: EkDataType::Int as SpiceInt,
            strlen: 0,
            size: 1,
            indexd: 1,
            nullok: 0,
        };
        let char_column = EkAttDsc {
            cclass: 3,
            dtype: EkDataType::Char as SpiceInt,
            strlen: 32,
            size: 1,
            indexd: 0,
            nullok: 1,
        };
        let summary = EkSegSum::with_columns(
            "SCIENCE_DATA",
            12,
            &[("ORBIT", int_column), ("INSTRUMENT", char_column)],
        );

        assert_eq!(summary.table_name(), "SCIENCE_DATA");
        assert_eq!(summary.nrows(), 12);
        assert_eq!(summary.column_names(), vec!["ORBIT", "INSTRUMENT"]);
        assert_eq!(summary.column_descriptors().len(), 2);

        let column = summary.column("INSTRUMENT").unwrap();
        assert_eq!(column.data_type(), Some(EkDataType::Char));
        assert_eq!(column.string_length(), 32);
        assert!(column.nulls_ok());
        assert!(!column.is_indexed());
        assert!(summary.column("MISSING").is_none());
    }
}
