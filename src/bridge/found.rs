//! Found-flag handling
//!
//! Many native lookups report success through a trailing boolean (or array
//! of booleans) instead of the fault flag. When found-catching is enabled a
//! false flag is promoted to [`SpiceError::NotFound`] and the flags are
//! stripped from the result; when it is disabled the raw result, flags
//! included, is handed back unchanged.

use std::fmt;

use log::debug;

use crate::errors::{Result, SpiceError};

/// The found flag (or flags) reported by a native call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FoundFlags {
    Single(bool),
    Many(Vec<bool>),
}

impl FoundFlags {
    /// True when every flag is true; an empty array counts as found
    pub fn all_found(&self) -> bool {
        match self {
            FoundFlags::Single(found) => *found,
            FoundFlags::Many(flags) => flags.iter().all(|&found| found),
        }
    }

    /// Positions of the flags that are false
    pub fn missing(&self) -> Vec<usize> {
        match self {
            FoundFlags::Single(found) => {
                if *found {
                    Vec::new()
                } else {
                    vec![0]
                }
            }
            FoundFlags::Many(flags) => flags
                .iter()
                .enumerate()
                .filter(|(_, &found)| !found)
                .map(|(i, _)| i)
                .collect(),
        }
    }
}

/// Types that can stand as the trailing found value of a native result
pub trait FoundFlag {
    fn to_found_flags(&self) -> FoundFlags;
}

impl FoundFlag for bool {
    fn to_found_flags(&self) -> FoundFlags {
        FoundFlags::Single(*self)
    }
}

impl FoundFlag for Vec<bool> {
    fn to_found_flags(&self) -> FoundFlags {
        FoundFlags::Many(self.clone())
    }
}

impl<const N: usize> FoundFlag for [bool; N] {
    fn to_found_flags(&self) -> FoundFlags {
        FoundFlags::Many(self.to_vec())
    }
}

/// A native result whose last component is its found flag
///
/// `Value` is what remains once the flag is stripped: a single remaining
/// component is returned on its own, several are returned as a tuple.
pub trait FoundFlagged {
    type Value;

    fn found_flags(&self) -> FoundFlags;

    fn into_value(self) -> Self::Value;
}

impl FoundFlagged for bool {
    type Value = ();

    fn found_flags(&self) -> FoundFlags {
        FoundFlags::Single(*self)
    }

    fn into_value(self) -> Self::Value {}
}

impl FoundFlagged for Vec<bool> {
    type Value = ();

    fn found_flags(&self) -> FoundFlags {
        FoundFlags::Many(self.clone())
    }

    fn into_value(self) -> Self::Value {}
}

impl<A, F: FoundFlag> FoundFlagged for (A, F) {
    type Value = A;

    fn found_flags(&self) -> FoundFlags {
        self.1.to_found_flags()
    }

    fn into_value(self) -> Self::Value {
        self.0
    }
}

macro_rules! impl_found_flagged {
    ($flag:tt; $($name:ident $idx:tt),+) => {
        impl<$($name,)+ F: FoundFlag> FoundFlagged for ($($name,)+ F) {
            type Value = ($($name,)+);

            fn found_flags(&self) -> FoundFlags {
                self.$flag.to_found_flags()
            }

            fn into_value(self) -> Self::Value {
                ($(self.$idx,)+)
            }
        }
    };
}

impl_found_flagged!(2; A 0, B 1);
impl_found_flagged!(3; A 0, B 1, C 2);
impl_found_flagged!(4; A 0, B 1, C 2, D 3);
impl_found_flagged!(5; A 0, B 1, C 2, D 3, E 4);
impl_found_flagged!(6; A 0, B 1, C 2, D 3, E 4, G 5);

/// Result of a found-flagged call that passed the found check
pub enum FoundOutcome<R: FoundFlagged> {
    /// Found-catching was disabled; the native result is untouched
    Raw(R),
    /// Found-catching was enabled and every flag was true
    Found(R::Value),
}

impl<R: FoundFlagged> FoundOutcome<R> {
    pub fn is_raw(&self) -> bool {
        matches!(self, FoundOutcome::Raw(_))
    }

    /// The stripped value, or `None` when the flags report not found
    ///
    /// Works under either catch state, which lets callers that do not care
    /// about the toggle treat both shapes uniformly.
    pub fn into_option(self) -> Option<R::Value> {
        match self {
            FoundOutcome::Raw(raw) => {
                if raw.found_flags().all_found() {
                    Some(raw.into_value())
                } else {
                    None
                }
            }
            FoundOutcome::Found(value) => Some(value),
        }
    }

    /// The untouched native result, if found-catching was disabled
    pub fn raw(self) -> Option<R> {
        match self {
            FoundOutcome::Raw(raw) => Some(raw),
            FoundOutcome::Found(_) => None,
        }
    }

    /// The stripped value, if found-catching was enabled
    pub fn found(self) -> Option<R::Value> {
        match self {
            FoundOutcome::Raw(_) => None,
            FoundOutcome::Found(value) => Some(value),
        }
    }
}

impl<R> fmt::Debug for FoundOutcome<R>
where
    R: FoundFlagged + fmt::Debug,
    R::Value: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FoundOutcome::Raw(raw) => f.debug_tuple("Raw").field(raw).finish(),
            FoundOutcome::Found(value) => f.debug_tuple("Found").field(value).finish(),
        }
    }
}

impl<R> PartialEq for FoundOutcome<R>
where
    R: FoundFlagged + PartialEq,
    R::Value: PartialEq,
{
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (FoundOutcome::Raw(a), FoundOutcome::Raw(b)) => a == b,
            (FoundOutcome::Found(a), FoundOutcome::Found(b)) => a == b,
            _ => false,
        }
    }
}

/// Decide whether a result passes the found check
pub(crate) fn check_found(function: &str, flags: FoundFlags, catching: bool) -> Result<()> {
    if !catching || flags.all_found() {
        return Ok(());
    }
    debug!("{} reported not found at flag(s) {:?}", function, flags.missing());
    Err(SpiceError::NotFound {
        function: function.to_string(),
        found: flags,
    })
}

/// Shape a result that passed the found check
pub(crate) fn shape<R: FoundFlagged>(raw: R, catching: bool) -> FoundOutcome<R> {
    if catching {
        FoundOutcome::Found(raw.into_value())
    } else {
        FoundOutcome::Raw(raw)
    }
}
