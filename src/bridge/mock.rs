//! In-process stand-in for the native error subsystem
//!
//! Models the parts of the native library the call protocol depends on:
//! one global fault flag, a call-stack traceback that is frozen when a
//! fault is signalled, and fixed-size output buffers for message text.

use std::collections::HashMap;

use lazy_static::lazy_static;
use log::trace;

use super::{MessageKind, NativeLibrary};
use crate::marshal::strings::{read_slot, write_slot};

lazy_static! {
    /// Explanations for the short codes the mock knows about
    static ref EXPLANATIONS: HashMap<&'static str, &'static str> = {
        let mut m = HashMap::new();
        m.insert("SPICE(NOSUCHFILE)", "No such file exists.");
        m.insert("SPICE(NOLOADEDFILES)", "No files have been loaded.");
        m.insert("SPICE(INVALIDVALUE)", "An invalid value has been supplied.");
        m.insert("SPICE(DIVIDEBYZERO)", "A division by zero was attempted.");
        m.insert("SPICE(CELLTOOSMALL)", "The output cell is too small.");
        m.insert("SPICE(INVALIDINDEX)", "An index is out of range.");
        m.insert("SPICE(UNKNOWNFRAME)", "The reference frame is not recognized.");
        m.insert("SPICE(KERNELVARNOTFOUND)", "The kernel variable was not found.");
        m
    };
}

/// Truncate `text` the way a native routine fills a `lenout` byte buffer
fn fill_buffer(text: &str, lenout: usize) -> String {
    if lenout == 0 {
        return String::new();
    }
    let mut buffer = vec![0u8; lenout];
    write_slot(&mut buffer, text);
    read_slot(&buffer)
}

/// Mock native library used by tests and examples
#[derive(Debug, Clone)]
pub struct MockToolkit {
    failed: bool,
    short: String,
    long: String,
    call_stack: Vec<String>,
    frozen_trace: Vec<String>,
    resets: usize,
}

impl Default for MockToolkit {
    fn default() -> Self {
        Self::new()
    }
}

impl MockToolkit {
    /// Version string reported with every fault
    pub const VERSION: &'static str = "CSPICE_N0067";

    pub fn new() -> Self {
        Self {
            failed: false,
            short: String::new(),
            long: String::new(),
            call_stack: Vec::new(),
            frozen_trace: Vec::new(),
            resets: 0,
        }
    }

    /// Enter a module, extending the traceback
    pub fn chkin(&mut self, module: &str) {
        self.call_stack.push(module.to_string());
    }

    /// Leave a module; mismatched names are ignored like the native routine does
    pub fn chkout(&mut self, module: &str) {
        if self.call_stack.last().map(String::as_str) == Some(module) {
            self.call_stack.pop();
        }
    }

    /// Set the long message for the next fault
    ///
    /// Ignored while a fault is pending, so the first fault's text survives.
    pub fn setmsg(&mut self, long: &str) {
        if !self.failed {
            self.long = long.to_string();
        }
    }

    /// Raise the fault flag with a short code
    ///
    /// Only the first fault is recorded until the library is reset.
    pub fn sigerr(&mut self, short: &str) {
        if self.failed {
            trace!("Ignoring {} while a fault is pending", short);
            return;
        }
        self.failed = true;
        self.short = short.to_string();
        self.frozen_trace = self.call_stack.clone();
    }

    /// Set the long message and raise the fault in one step
    pub fn signal(&mut self, short: &str, long: &str) {
        self.setmsg(long);
        self.sigerr(short);
    }

    /// Number of times the fault state has been reset
    pub fn reset_count(&self) -> usize {
        self.resets
    }

    /// Current depth of the call stack
    pub fn depth(&self) -> usize {
        self.call_stack.len()
    }
}

impl NativeLibrary for MockToolkit {
    fn failed(&mut self) -> bool {
        self.failed
    }

    fn getmsg(&mut self, kind: MessageKind, lenout: usize) -> String {
        let text = match kind {
            MessageKind::Short => self.short.as_str(),
            MessageKind::Explain => EXPLANATIONS.get(self.short.as_str()).copied().unwrap_or(""),
            MessageKind::Long => self.long.as_str(),
        };
        fill_buffer(text, lenout)
    }

    fn qcktrc(&mut self, lenout: usize) -> String {
        fill_buffer(&self.frozen_trace.join(" --> "), lenout)
    }

    fn reset(&mut self) {
        self.failed = false;
        self.short.clear();
        self.long.clear();
        self.call_stack.clear();
        self.frozen_trace.clear();
        self.resets += 1;
    }

    fn toolkit_version(&mut self) -> String {
        Self::VERSION.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_fault_wins() {
        let mut toolkit = MockToolkit::new();
        toolkit.signal("SPICE(NOSUCHFILE)", "first");
        toolkit.signal("SPICE(INVALIDVALUE)", "second");

        assert!(toolkit.failed());
        assert_eq!(toolkit.getmsg(MessageKind::Short, 26), "SPICE(NOSUCHFILE)");
        assert_eq!(toolkit.getmsg(MessageKind::Long, 1841), "first");
        assert_eq!(toolkit.getmsg(MessageKind::Explain, 100), "No such file exists.");
    }

    #[test]
    fn test_traceback_is_frozen_at_signal() {
        let mut toolkit = MockToolkit::new();
        toolkit.chkin("furnsh_c");
        toolkit.chkin("FURNSH");
        toolkit.sigerr("SPICE(NOSUCHFILE)");
        toolkit.chkout("FURNSH");
        toolkit.chkout("furnsh_c");

        assert_eq!(toolkit.depth(), 0);
        assert_eq!(toolkit.qcktrc(200), "furnsh_c --> FURNSH");
        assert_eq!(toolkit.qcktrc(9), "furnsh_c");
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut toolkit = MockToolkit::new();
        toolkit.chkin("ckgp_c");
        toolkit.signal("SPICE(INVALIDINDEX)", "bad");
        toolkit.reset();

        assert!(!toolkit.failed());
        assert_eq!(toolkit.depth(), 0);
        assert_eq!(toolkit.getmsg(MessageKind::Short, 26), "");
        assert_eq!(toolkit.qcktrc(200), "");
        assert_eq!(toolkit.reset_count(), 1);
    }

    #[test]
    fn test_zero_length_buffer() {
        let mut toolkit = MockToolkit::new();
        toolkit.signal("SPICE(BUG)", "text");
        assert_eq!(toolkit.getmsg(MessageKind::Long, 0), "");
        assert_eq!(toolkit.getmsg(MessageKind::Explain, 100), "");
    }
}
