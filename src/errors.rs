//! Error types for the binding layer
//!
//! Host-side input problems (`TypeMismatch`, `InvalidArgument`, index and
//! capacity violations) are raised before any native call is attempted.
//! `Native` and `NotFound` are raised only after a native call returns.

use std::collections::HashMap;
use std::fmt;

use lazy_static::lazy_static;
use thiserror::Error;

use crate::bridge::found::FoundFlags;
use crate::cell::CellKind;

/// Main error type for the binding layer
#[derive(Debug, Error)]
pub enum SpiceError {
    /// The native library raised its global fault flag during a call
    #[error("{0}")]
    Native(#[from] NativeFault),

    /// A found-flag was false while found-catching was enabled
    #[error("Spice returns not found for function: {function}")]
    NotFound {
        /// Name of the wrapped native function
        function: String,
        /// The flag (or flags) the native call returned
        found: FoundFlags,
    },

    /// Host input has the wrong element type or shape for the native buffer
    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    /// Host input violates a precondition of the requested operation
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Index outside `[-len, len)` of a cell
    #[error("Index {index} is out of range for cell with cardinality {len}")]
    IndexOutOfRange {
        /// The requested (possibly negative) index
        index: isize,
        /// The cardinality at the time of the request
        len: usize,
    },

    /// Host-side append or insert on a cell that is already at capacity
    #[error("Cell is full: capacity {capacity} exhausted")]
    CellFull {
        /// The fixed capacity of the cell
        capacity: usize,
    },

    /// A value of the wrong element kind was handed to a cell
    #[error("Cell kind mismatch: expected {expected:?}, got {actual:?}")]
    KindMismatch {
        /// The cell's kind
        expected: CellKind,
        /// The kind of the offered value
        actual: CellKind,
    },

    /// A host array payload or configuration could not be decoded
    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for binding-layer operations
pub type Result<T> = std::result::Result<T, SpiceError>;

impl SpiceError {
    /// Create a type mismatch error
    pub fn type_mismatch(message: impl Into<String>) -> Self {
        SpiceError::TypeMismatch(message.into())
    }

    /// Create an invalid argument error
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        SpiceError::InvalidArgument(message.into())
    }

    /// The fault category, if this error came from the native fault flag
    pub fn fault_kind(&self) -> Option<FaultKind> {
        match self {
            SpiceError::Native(fault) => Some(fault.kind),
            _ => None,
        }
    }

    /// True for the `NotFound` variant
    pub fn is_not_found(&self) -> bool {
        matches!(self, SpiceError::NotFound { .. })
    }
}

/// Category of a native fault, derived from its short code
///
/// Lets callers match on the broad class of a failure without knowing every
/// short code the native library can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaultKind {
    Io,
    Memory,
    Type,
    Key,
    Index,
    Runtime,
    ZeroDivision,
    Value,
    /// Any short code without a more specific category
    Generic,
}

impl FaultKind {
    /// Classify a short error code such as `SPICE(NOSUCHFILE)`
    pub fn from_short(short: &str) -> Self {
        FAULT_KINDS
            .get(short.trim())
            .copied()
            .unwrap_or(FaultKind::Generic)
    }
}

lazy_static! {
    /// Map from short codes to fault categories
    static ref FAULT_KINDS: HashMap<&'static str, FaultKind> = {
        let mut m = HashMap::new();
        for &(short, kind) in SHORT_CODE_KINDS.iter() {
            m.insert(short, kind);
        }
        m
    };
}

/// Pairs of (short code, category)
const SHORT_CODE_KINDS: &[(&str, FaultKind)] = &[
    ("SPICE(NOSUCHFILE)", FaultKind::Io),
    ("SPICE(FILENOTFOUND)", FaultKind::Io),
    ("SPICE(FILEOPENFAILED)", FaultKind::Io),
    ("SPICE(FILEOPENFAIL)", FaultKind::Io),
    ("SPICE(FILEREADFAILED)", FaultKind::Io),
    ("SPICE(FILEWRITEFAILED)", FaultKind::Io),
    ("SPICE(BADFILETYPE)", FaultKind::Io),
    ("SPICE(INVALIDARCHTYPE)", FaultKind::Io),
    ("SPICE(NOTADAFFILE)", FaultKind::Io),
    ("SPICE(DAFOPENFAIL)", FaultKind::Io),
    ("SPICE(NOLOADEDFILES)", FaultKind::Io),
    ("SPICE(NOLOADEDDSKFILES)", FaultKind::Io),
    ("SPICE(UNKNOWNKERNELTYPE)", FaultKind::Io),
    ("SPICE(TOOMANYFILES)", FaultKind::Io),
    ("SPICE(MALLOCFAILED)", FaultKind::Memory),
    ("SPICE(MALLOCFAILURE)", FaultKind::Memory),
    ("SPICE(NOMOREROOM)", FaultKind::Memory),
    ("SPICE(OUTOFROOM)", FaultKind::Memory),
    ("SPICE(CELLTOOSMALL)", FaultKind::Memory),
    ("SPICE(SETEXCESS)", FaultKind::Memory),
    ("SPICE(WORKSPACETOOSMALL)", FaultKind::Memory),
    ("SPICE(BUFFERTOOSMALL)", FaultKind::Memory),
    ("SPICE(TYPEMISMATCH)", FaultKind::Type),
    ("SPICE(WRONGDATATYPE)", FaultKind::Type),
    ("SPICE(NOTASET)", FaultKind::Type),
    ("SPICE(INVALIDTYPE)", FaultKind::Type),
    ("SPICE(BADVARIABLETYPE)", FaultKind::Type),
    ("SPICE(KERNELVARNOTFOUND)", FaultKind::Key),
    ("SPICE(NOTRANSLATION)", FaultKind::Key),
    ("SPICE(IDCODENOTFOUND)", FaultKind::Key),
    ("SPICE(FRAMEIDNOTFOUND)", FaultKind::Key),
    ("SPICE(UNKNOWNFRAME)", FaultKind::Key),
    ("SPICE(BODYIDNOTFOUND)", FaultKind::Key),
    ("SPICE(BODYNAMENOTFOUND)", FaultKind::Key),
    ("SPICE(INDEXOUTOFRANGE)", FaultKind::Index),
    ("SPICE(INVALIDINDEX)", FaultKind::Index),
    ("SPICE(BADINDEX)", FaultKind::Index),
    ("SPICE(DIVIDEBYZERO)", FaultKind::ZeroDivision),
    ("SPICE(ZEROVECTOR)", FaultKind::ZeroDivision),
    ("SPICE(INVALIDVALUE)", FaultKind::Value),
    ("SPICE(VALUEOUTOFRANGE)", FaultKind::Value),
    ("SPICE(INVALIDARGUMENT)", FaultKind::Value),
    ("SPICE(INVALIDSIZE)", FaultKind::Value),
    ("SPICE(INVALIDCOUNT)", FaultKind::Value),
    ("SPICE(INVALIDCARDINALITY)", FaultKind::Value),
    ("SPICE(NONPOSITIVEVALUE)", FaultKind::Value),
    ("SPICE(BADRADIUS)", FaultKind::Value),
    ("SPICE(BADAXISLENGTH)", FaultKind::Value),
    ("SPICE(EMPTYSTRING)", FaultKind::Value),
    ("SPICE(INVALIDTIMESTRING)", FaultKind::Value),
    ("SPICE(UNPARSEDTIME)", FaultKind::Value),
    ("SPICE(SPKINSUFFDATA)", FaultKind::Runtime),
    ("SPICE(CKINSUFFDATA)", FaultKind::Runtime),
    ("SPICE(NOLEAPSECONDS)", FaultKind::Runtime),
    ("SPICE(MISSINGTIMEINFO)", FaultKind::Runtime),
    ("SPICE(NOCONVERGENCE)", FaultKind::Runtime),
    ("SPICE(NOTSUPPORTED)", FaultKind::Runtime),
    ("SPICE(INVALIDSTATE)", FaultKind::Runtime),
    ("SPICE(BUG)", FaultKind::Runtime),
];

/// Banner line separating native fault reports
const BANNER: &str =
    "================================================================================";

/// Header printed before the traceback of a native fault
pub const TRACEBACK_HEADER: &str =
    "A traceback follows.  The name of the highest level module is first.";

/// Fault captured from the native library's global error state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeFault {
    /// Category derived from `short`
    pub kind: FaultKind,
    /// Short error code, e.g. `SPICE(NOSUCHFILE)`
    pub short: String,
    /// Explanation of the short code
    pub explain: String,
    /// Long, call-specific message
    pub long: String,
    /// Traceback snapshot taken before the native state was reset
    pub traceback: String,
    /// Version string of the native library that raised the fault
    pub toolkit_version: String,
}

impl NativeFault {
    /// Build a fault, classifying it from its short code
    pub fn new(
        short: impl Into<String>,
        explain: impl Into<String>,
        long: impl Into<String>,
        traceback: impl Into<String>,
    ) -> Self {
        let short = short.into();
        Self {
            kind: FaultKind::from_short(&short),
            short,
            explain: explain.into(),
            long: long.into(),
            traceback: traceback.into(),
            toolkit_version: String::new(),
        }
    }

    /// Attach the native library version to the report
    pub fn with_toolkit_version(mut self, version: impl Into<String>) -> Self {
        self.toolkit_version = version.into();
        self
    }

    /// Module names of the traceback, highest level first
    pub fn traceback_modules(&self) -> Vec<&str> {
        self.traceback
            .split("-->")
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .collect()
    }
}

impl std::error::Error for NativeFault {}

impl fmt::Display for NativeFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f)?;
        writeln!(f, "{}", BANNER)?;
        writeln!(f)?;
        if !self.toolkit_version.is_empty() {
            writeln!(f, "Toolkit version: {}", self.toolkit_version)?;
            writeln!(f)?;
        }
        writeln!(f, "{} --", self.short)?;
        writeln!(f, "{}", self.explain)?;
        writeln!(f)?;
        writeln!(f, "{}", self.long)?;
        writeln!(f)?;
        if !self.traceback.is_empty() {
            writeln!(f, "{}", TRACEBACK_HEADER)?;
            writeln!(f, "{}", self.traceback)?;
            writeln!(f)?;
        }
        write!(f, "{}", BANNER)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fault_kind_lookup() {
        assert_eq!(FaultKind::from_short("SPICE(NOSUCHFILE)"), FaultKind::Io);
        assert_eq!(FaultKind::from_short("SPICE(DIVIDEBYZERO)"), FaultKind::ZeroDivision);
        assert_eq!(FaultKind::from_short("  SPICE(INVALIDINDEX) "), FaultKind::Index);
        assert_eq!(FaultKind::from_short("SPICE(SOMETHINGNEW)"), FaultKind::Generic);
        assert_eq!(FaultKind::from_short(""), FaultKind::Generic);
    }

    #[test]
    fn test_native_fault_formatting() {
        let fault = NativeFault::new(
            "SPICE(NOSUCHFILE)",
            "The file does not exist.",
            "The file 'missing.bsp' could not be located.",
            "furnsh_c --> FURNSH --> ZZLDKER",
        )
        .with_toolkit_version("CSPICE_N0067");

        let text = fault.to_string();
        assert!(text.contains("Toolkit version: CSPICE_N0067"));
        assert!(text.contains("SPICE(NOSUCHFILE) --"));
        assert!(text.contains("missing.bsp"));
        assert!(text.contains(TRACEBACK_HEADER));
        assert_eq!(fault.kind, FaultKind::Io);
        assert_eq!(fault.traceback_modules(), vec!["furnsh_c", "FURNSH", "ZZLDKER"]);
    }

    #[test]
    fn test_fault_without_traceback_omits_header() {
        let fault = NativeFault::new("SPICE(BUG)", "", "oops", "");
        assert!(!fault.to_string().contains(TRACEBACK_HEADER));
        assert!(fault.traceback_modules().is_empty());
    }

    #[test]
    fn test_spice_error_helpers() {
        let err = SpiceError::from(NativeFault::new("SPICE(BADINDEX)", "", "", ""));
        assert_eq!(err.fault_kind(), Some(FaultKind::Index));
        assert!(!err.is_not_found());

        let err = SpiceError::type_mismatch("expected float64");
        assert!(matches!(err, SpiceError::TypeMismatch(_)));
        assert_eq!(err.fault_kind(), None);
    }
}
