//! Host activity surface.
//!
//! Mirrors the calls an embedded activity makes: every function returns the
//! string the host vocabulary expects and records an error code retrievable
//! through [`ScormApi::get_last_error`].

use crate::driver::SessionHandle;
use crate::error::SyncError;
use crate::session::LifecycleError;
use std::fmt;

const TRUE: &str = "true";
const FALSE: &str = "false";

/// Error codes reported to the activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorCode {
    /// The last call succeeded.
    NoError,
    /// A failure with no more specific code.
    GeneralException,
    /// `Initialize` after a successful `Initialize`.
    AlreadyInitialized,
    /// `Initialize` after `Terminate`.
    ContentInstanceTerminated,
    /// `Terminate` before `Initialize`.
    TerminationBeforeInitialization,
    /// `Terminate` after `Terminate`.
    TerminationAfterTermination,
    /// An argument that must be empty was not, or a key was missing.
    GeneralArgumentError,
}

impl ApiErrorCode {
    const ALL: [ApiErrorCode; 7] = [
        ApiErrorCode::NoError,
        ApiErrorCode::GeneralException,
        ApiErrorCode::AlreadyInitialized,
        ApiErrorCode::ContentInstanceTerminated,
        ApiErrorCode::TerminationBeforeInitialization,
        ApiErrorCode::TerminationAfterTermination,
        ApiErrorCode::GeneralArgumentError,
    ];

    /// Returns the numeric code.
    pub fn code(self) -> u16 {
        match self {
            ApiErrorCode::NoError => 0,
            ApiErrorCode::GeneralException => 101,
            ApiErrorCode::AlreadyInitialized => 103,
            ApiErrorCode::ContentInstanceTerminated => 104,
            ApiErrorCode::TerminationBeforeInitialization => 112,
            ApiErrorCode::TerminationAfterTermination => 113,
            ApiErrorCode::GeneralArgumentError => 201,
        }
    }

    /// Looks up a numeric code.
    pub fn from_code(code: u16) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.code() == code)
    }

    /// Returns the short description shown for the code.
    pub fn message(self) -> &'static str {
        match self {
            ApiErrorCode::NoError => "No Error",
            ApiErrorCode::GeneralException => "General Exception",
            ApiErrorCode::AlreadyInitialized => "Already Initialized",
            ApiErrorCode::ContentInstanceTerminated => "Content Instance Terminated",
            ApiErrorCode::TerminationBeforeInitialization => "Termination Before Initialization",
            ApiErrorCode::TerminationAfterTermination => "Termination After Termination",
            ApiErrorCode::GeneralArgumentError => "General Argument Error",
        }
    }

    fn for_initialize(err: &SyncError) -> Self {
        match err {
            SyncError::Lifecycle(LifecycleError::AlreadyInitialized) => Self::AlreadyInitialized,
            SyncError::Lifecycle(LifecycleError::AlreadyTerminated) => {
                Self::ContentInstanceTerminated
            }
            _ => Self::GeneralException,
        }
    }

    fn for_terminate(err: &SyncError) -> Self {
        match err {
            SyncError::Lifecycle(LifecycleError::NotInitialized) => {
                Self::TerminationBeforeInitialization
            }
            SyncError::Lifecycle(LifecycleError::AlreadyTerminated) => {
                Self::TerminationAfterTermination
            }
            _ => Self::GeneralException,
        }
    }
}

impl fmt::Display for ApiErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// The activity-facing API of one session.
#[derive(Debug)]
pub struct ScormApi {
    session: SessionHandle,
    last_error: ApiErrorCode,
}

impl ScormApi {
    /// Wraps a session handle.
    pub fn new(session: SessionHandle) -> Self {
        Self {
            session,
            last_error: ApiErrorCode::NoError,
        }
    }

    /// Returns the wrapped session handle.
    pub fn session(&self) -> &SessionHandle {
        &self.session
    }

    fn finish(&mut self, code: ApiErrorCode) -> &'static str {
        self.last_error = code;
        if code == ApiErrorCode::NoError {
            TRUE
        } else {
            FALSE
        }
    }

    /// Starts the session. `arg` must be empty.
    pub fn initialize(&mut self, arg: &str) -> &'static str {
        if !arg.is_empty() {
            return self.finish(ApiErrorCode::GeneralArgumentError);
        }
        let code = match self.session.initialize() {
            Ok(()) => ApiErrorCode::NoError,
            Err(e) => ApiErrorCode::for_initialize(&e),
        };
        self.finish(code)
    }

    /// Ends the session. `arg` must be empty.
    pub fn terminate(&mut self, arg: &str) -> &'static str {
        if !arg.is_empty() {
            return self.finish(ApiErrorCode::GeneralArgumentError);
        }
        let code = match self.session.terminate() {
            Ok(()) => ApiErrorCode::NoError,
            Err(e) => ApiErrorCode::for_terminate(&e),
        };
        self.finish(code)
    }

    /// Reads a data model value, or the empty string.
    pub fn get_value(&mut self, key: &str) -> String {
        if key.is_empty() {
            self.last_error = ApiErrorCode::GeneralArgumentError;
            return String::new();
        }
        self.last_error = ApiErrorCode::NoError;
        self.session.get_value(key)
    }

    /// Writes a data model value.
    ///
    /// A write refused because the session is read-only or over returns
    /// `"false"` without raising an error code.
    pub fn set_value(&mut self, key: &str, value: &str) -> &'static str {
        if key.is_empty() {
            return self.finish(ApiErrorCode::GeneralArgumentError);
        }
        let outcome = self.session.set_value(key, value);
        self.last_error = ApiErrorCode::NoError;
        if outcome.is_rejected() {
            FALSE
        } else {
            TRUE
        }
    }

    /// Accepted for compatibility; changes are flushed continuously.
    pub fn commit(&mut self, arg: &str) -> &'static str {
        if !arg.is_empty() {
            return self.finish(ApiErrorCode::GeneralArgumentError);
        }
        self.finish(ApiErrorCode::NoError)
    }

    /// Returns the code of the last call's error as a string.
    pub fn get_last_error(&self) -> String {
        self.last_error.to_string()
    }

    /// Returns the description of a numeric error code, or the empty string.
    pub fn get_error_string(&self, code: &str) -> String {
        code.trim()
            .parse::<u16>()
            .ok()
            .and_then(ApiErrorCode::from_code)
            .map(|c| c.message().to_string())
            .unwrap_or_default()
    }

    /// Returns diagnostic detail for a code, or for the last error if `code`
    /// is empty.
    pub fn get_diagnostic(&self, code: &str) -> String {
        if code.is_empty() {
            return self.last_error.message().to_string();
        }
        self.get_error_string(code)
    }
}
