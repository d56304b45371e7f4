//! Serialized access to the native library
//!
//! The native library keeps a single global fault flag and traceback, so
//! all calls through one handle are serialized behind a mutex. The
//! found-catch toggle lives under the same lock, which means a call always
//! sees the toggle as it was when its found check ran.

use std::sync::{Mutex, MutexGuard, PoisonError};

use log::trace;

use super::found::{check_found, shape, FoundFlagged, FoundFlags, FoundOutcome};
use super::{ErrorBridge, NativeLibrary};
use crate::config::SessionConfig;
use crate::errors::Result;

/// One step of the post-call chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Convert a raised fault flag into [`crate::SpiceError::Native`]
    FaultCheck,
    /// Convert a false found flag into [`crate::SpiceError::NotFound`]
    FoundCheck,
}

/// Order in which post-call checks run; the fault check is always first
pub const CALL_CHAIN: [Stage; 2] = [Stage::FaultCheck, Stage::FoundCheck];

struct SessionState<L> {
    library: L,
    catch_false_founds: bool,
}

/// Handle through which every native call is made
///
/// ```
/// use spicebind::bridge::{MockToolkit, Session};
///
/// let session = Session::new(MockToolkit::new());
/// let found = session.call_found("bodn2c", |_| (399, true)).unwrap();
/// assert_eq!(found.into_option(), Some(399));
///
/// let err = session.call_found("bodn2c", |_| (0, false)).unwrap_err();
/// assert!(err.is_not_found());
/// ```
///
/// Native closures must not call back into the same session.
pub struct Session<L: NativeLibrary> {
    state: Mutex<SessionState<L>>,
    bridge: ErrorBridge,
}

impl<L: NativeLibrary> Session<L> {
    /// Create a session with default configuration (found-catching on)
    pub fn new(library: L) -> Self {
        Self::with_config(library, &SessionConfig::default())
    }

    pub fn with_config(library: L, config: &SessionConfig) -> Self {
        Self {
            state: Mutex::new(SessionState {
                library,
                catch_false_founds: config.catch_false_founds,
            }),
            bridge: ErrorBridge::new(config.message_lengths),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SessionState<L>> {
        // A panicking native closure leaves the library usable; any fault it
        // raised is reported by the next call.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn run_chain(
        &self,
        state: &mut SessionState<L>,
        function: &str,
        flags: Option<FoundFlags>,
    ) -> Result<()> {
        let mut flags = flags;
        for stage in CALL_CHAIN {
            match stage {
                Stage::FaultCheck => self.bridge.check(&mut state.library)?,
                Stage::FoundCheck => {
                    if let Some(flags) = flags.take() {
                        trace!("Found check for {}: {:?}", function, flags);
                        check_found(function, flags, state.catch_false_founds)?;
                    }
                }
            }
        }
        Ok(())
    }

    /// Make a native call that reports failure only through the fault flag
    pub fn call<T, F>(&self, function: &str, native: F) -> Result<T>
    where
        F: FnOnce(&mut L) -> T,
    {
        let mut state = self.lock();
        trace!("Calling {}", function);
        let value = native(&mut state.library);
        self.run_chain(&mut state, function, None)?;
        Ok(value)
    }

    /// Make a native call whose result ends in a found flag
    ///
    /// A raised fault is reported in preference to a false found flag.
    pub fn call_found<R, F>(&self, function: &str, native: F) -> Result<FoundOutcome<R>>
    where
        R: FoundFlagged,
        F: FnOnce(&mut L) -> R,
    {
        let mut state = self.lock();
        trace!("Calling {}", function);
        let raw = native(&mut state.library);
        self.run_chain(&mut state, function, Some(raw.found_flags()))?;
        Ok(shape(raw, state.catch_false_founds))
    }

    /// Report and clear a fault raised outside of [`Session::call`]
    pub fn check_for_error(&self) -> Result<()> {
        let mut state = self.lock();
        self.bridge.check(&mut state.library)
    }

    /// Borrow the library without running the post-call chain
    pub fn with_library<T, F>(&self, f: F) -> T
    where
        F: FnOnce(&mut L) -> T,
    {
        let mut state = self.lock();
        f(&mut state.library)
    }

    pub fn into_library(self) -> L {
        self.state
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
            .library
    }

    pub fn get_found_catch_state(&self) -> bool {
        self.lock().catch_false_founds
    }

    pub fn set_found_catch_state(&self, enabled: bool) {
        self.lock().catch_false_founds = enabled;
    }

    pub fn found_check_on(&self) {
        self.set_found_catch_state(true);
    }

    pub fn found_check_off(&self) {
        self.set_found_catch_state(false);
    }

    /// Enable found-catching until the returned guard is dropped
    pub fn found_check(&self) -> FoundCatchScope<'_, L> {
        FoundCatchScope::enter(self, true)
    }

    /// Disable found-catching until the returned guard is dropped
    pub fn no_found_check(&self) -> FoundCatchScope<'_, L> {
        FoundCatchScope::enter(self, false)
    }
}

/// Restores the previous found-catch state when dropped
///
/// The state is restored on every exit path, including unwinding.
#[must_use = "the found-catch state is restored as soon as the scope is dropped"]
pub struct FoundCatchScope<'a, L: NativeLibrary> {
    session: &'a Session<L>,
    previous: bool,
}

impl<'a, L: NativeLibrary> FoundCatchScope<'a, L> {
    fn enter(session: &'a Session<L>, enabled: bool) -> Self {
        let mut state = session.lock();
        let previous = state.catch_false_founds;
        state.catch_false_founds = enabled;
        drop(state);
        Self { session, previous }
    }

    /// The state that will be restored on drop
    pub fn previous(&self) -> bool {
        self.previous
    }
}

impl<L: NativeLibrary> Drop for FoundCatchScope<'_, L> {
    fn drop(&mut self) {
        self.session.set_found_catch_state(self.previous);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::MockToolkit;
    use crate::errors::SpiceError;

    #[test]
    fn test_chain_order() {
        assert_eq!(CALL_CHAIN, [Stage::FaultCheck, Stage::FoundCheck]);
    }

    #[test]
    fn test_plain_call_passes_value_through() {
        let session = Session::new(MockToolkit::new());
        let value = session.call("vnorm", |_| 5.0).unwrap();
        assert_eq!(value, 5.0);
    }

    #[test]
    fn test_fault_wins_over_not_found() {
        let session = Session::new(MockToolkit::new());
        let err = session
            .call_found("bodn2c", |lib| {
                lib.signal("SPICE(INVALIDVALUE)", "bad body name");
                (0, false)
            })
            .unwrap_err();
        assert!(matches!(err, SpiceError::Native(_)));
    }

    #[test]
    fn test_toggle_is_read_at_found_check() {
        let session = Session::new(MockToolkit::new());
        assert!(session.get_found_catch_state());

        session.found_check_off();
        let outcome = session.call_found("bodc2n", |_| ("".to_string(), false)).unwrap();
        assert_eq!(outcome, FoundOutcome::Raw(("".to_string(), false)));

        session.found_check_on();
        assert!(session.call_found("bodc2n", |_| ("".to_string(), false)).is_err());
    }

    #[test]
    fn test_scope_restores_previous_state() {
        let session = Session::new(MockToolkit::new());
        {
            let scope = session.no_found_check();
            assert!(scope.previous());
            assert!(!session.get_found_catch_state());
            {
                let _inner = session.found_check();
                assert!(session.get_found_catch_state());
            }
            assert!(!session.get_found_catch_state());
        }
        assert!(session.get_found_catch_state());
    }

    #[test]
    fn test_config_sets_initial_state() {
        let config = SessionConfig::new().with_catch_false_founds(false);
        let session = Session::with_config(MockToolkit::new(), &config);
        assert!(!session.get_found_catch_state());
    }

    #[test]
    fn test_check_for_error_and_into_library() {
        let session = Session::new(MockToolkit::new());
        session.with_library(|lib| lib.signal("SPICE(BUG)", "stray"));
        assert!(session.check_for_error().is_err());
        assert!(session.check_for_error().is_ok());
        assert_eq!(session.into_library().reset_count(), 1);
    }
}
