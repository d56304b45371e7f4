//! Native call protocol
//!
//! Every wrapped native routine goes through a [`Session`], which owns the
//! native library handle and runs the post-call chain: first the fault
//! check performed by [`ErrorBridge`], then the found-flag check. A fault
//! always wins over a false found flag.

use log::debug;

use crate::config::MessageLengths;
use crate::errors::{NativeFault, Result};

#[cfg(feature = "cspice")]
pub mod cspice;
pub mod found;
pub mod mock;
pub mod session;

#[cfg(feature = "cspice")]
pub use cspice::Cspice;
pub use found::{FoundFlag, FoundFlagged, FoundFlags, FoundOutcome};
pub use mock::MockToolkit;
pub use session::{FoundCatchScope, Session, Stage, CALL_CHAIN};

/// Which message the native error subsystem should return
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Short,
    Explain,
    Long,
}

impl MessageKind {
    /// Option string understood by the native message routine
    pub fn option(&self) -> &'static str {
        match self {
            MessageKind::Short => "SHORT",
            MessageKind::Explain => "EXPLAIN",
            MessageKind::Long => "LONG",
        }
    }
}

/// The error-status surface of the native library
///
/// Implementations must leave the library in its non-failed state after
/// `reset`. The library keeps one global fault flag, so a handle is only
/// ever driven from one thread at a time; [`Session`] enforces that.
pub trait NativeLibrary {
    /// Whether the global fault flag is raised
    fn failed(&mut self) -> bool;

    /// Retrieve a fault message into a buffer of `lenout` bytes
    fn getmsg(&mut self, kind: MessageKind, lenout: usize) -> String;

    /// Retrieve the traceback into a buffer of `lenout` bytes
    fn qcktrc(&mut self, lenout: usize) -> String;

    /// Clear the fault flag and traceback
    fn reset(&mut self);

    /// Version string of the library, reported with faults
    fn toolkit_version(&mut self) -> String {
        String::new()
    }
}

/// Converts the native fault flag into a [`NativeFault`]
#[derive(Debug, Clone, Copy, Default)]
pub struct ErrorBridge {
    lengths: MessageLengths,
}

impl ErrorBridge {
    pub fn new(lengths: MessageLengths) -> Self {
        Self { lengths }
    }

    pub fn lengths(&self) -> &MessageLengths {
        &self.lengths
    }

    /// Check the fault flag, capturing and clearing any pending fault
    ///
    /// Messages and traceback are read before the reset, so the returned
    /// fault reflects the call that raised it. Calling this again right
    /// after returns `Ok(())`.
    ///
    /// # Panics
    ///
    /// Panics if the library still reports a fault after being reset, since
    /// no later call could be trusted.
    pub fn check<L: NativeLibrary + ?Sized>(&self, library: &mut L) -> Result<()> {
        if !library.failed() {
            return Ok(());
        }

        let short = library.getmsg(MessageKind::Short, self.lengths.short);
        let explain = library.getmsg(MessageKind::Explain, self.lengths.explain);
        let long = library.getmsg(MessageKind::Long, self.lengths.long);
        let traceback = library.qcktrc(self.lengths.traceback);
        let version = library.toolkit_version();
        library.reset();

        if library.failed() {
            panic!("native library still reports a fault after reset: {}", short.trim());
        }

        debug!("Native fault {} in {}", short.trim(), traceback.trim());
        let fault = NativeFault::new(short.trim(), explain.trim(), long.trim(), traceback.trim())
            .with_toolkit_version(version.trim());
        Err(fault.into())
    }
}
