//! Session lifecycle state machine.

use thiserror::Error;

/// Lifecycle state of a session.
///
/// The only path is `Uninitialized -> Initialized -> Terminated`; a forced
/// remote termination may also jump straight from `Uninitialized`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// The activity has not called initialize yet.
    Uninitialized,
    /// The activity is running.
    Initialized,
    /// The session has ended; no further writes are accepted.
    Terminated,
}

impl SessionState {
    /// Returns true once the session has ended.
    pub fn is_terminated(&self) -> bool {
        matches!(self, SessionState::Terminated)
    }
}

/// A lifecycle call made in a state that does not allow it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LifecycleError {
    /// `initialize` called twice.
    #[error("session already initialized")]
    AlreadyInitialized,
    /// Any lifecycle call after termination.
    #[error("session already terminated")]
    AlreadyTerminated,
    /// `terminate` called before `initialize`.
    #[error("session not initialized")]
    NotInitialized,
}

/// The session state machine.
#[derive(Debug, Clone)]
pub struct Session {
    state: SessionState,
}

impl Session {
    /// Creates an uninitialized session.
    pub fn new() -> Self {
        Self {
            state: SessionState::Uninitialized,
        }
    }

    /// Returns the current state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Moves from `Uninitialized` to `Initialized`.
    pub fn initialize(&mut self) -> Result<(), LifecycleError> {
        match self.state {
            SessionState::Uninitialized => {
                self.state = SessionState::Initialized;
                Ok(())
            }
            SessionState::Initialized => Err(LifecycleError::AlreadyInitialized),
            SessionState::Terminated => Err(LifecycleError::AlreadyTerminated),
        }
    }

    /// Moves from `Initialized` to `Terminated`.
    pub fn terminate(&mut self) -> Result<(), LifecycleError> {
        match self.state {
            SessionState::Initialized => {
                self.state = SessionState::Terminated;
                Ok(())
            }
            SessionState::Uninitialized => Err(LifecycleError::NotInitialized),
            SessionState::Terminated => Err(LifecycleError::AlreadyTerminated),
        }
    }

    /// Terminates from any state.
    ///
    /// Returns true if this call performed the transition, false if the
    /// session had already ended.
    pub fn force_terminate(&mut self) -> bool {
        if self.state.is_terminated() {
            return false;
        }
        self.state = SessionState::Terminated;
        true
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
