//! Interrupt-safe access to the endpoint selection
//!
//! The USB controller has a single endpoint selection that's shared by all
//! code, including interrupt handlers. Any sequence that selects an endpoint
//! and then acts on it must run in a critical section.

use core::marker::PhantomData;

use critical_section::{CriticalSection, RestoreState};

/// A held critical section
///
/// Acquiring the guard saves the interrupt state and masks interrupts.
/// Dropping the guard restores the saved state, so a guard taken from inside
/// an interrupt handler (where interrupts are already masked) leaves them
/// masked.
///
/// Guards must be dropped in the reverse order that they were acquired. Keep
/// them on the stack, and never hold two at once.
pub(crate) struct Guard {
    state: RestoreState,
    /// Not `Send`; must be released by the context that acquired it.
    _not_send: PhantomData<*mut ()>,
}

impl Guard {
    /// Enter a critical section.
    pub(crate) fn acquire() -> Self {
        // Safety: released exactly once, in drop().
        let state = unsafe { critical_section::acquire() };
        Guard {
            state,
            _not_send: PhantomData,
        }
    }

    /// Returns the token proving that we're in a critical section.
    ///
    /// The token cannot outlive the guard.
    pub(crate) fn token(&self) -> CriticalSection<'_> {
        // Safety: the guard holds the critical section for at least as long
        // as the returned lifetime.
        unsafe { CriticalSection::new() }
    }
}

impl Drop for Guard {
    fn drop(&mut self) {
        // Safety: state came from the matching acquire() call.
        unsafe { critical_section::release(self.state) };
    }
}
