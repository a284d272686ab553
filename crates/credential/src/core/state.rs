//! Authenticator lifecycle states

use std::fmt;

/// Lifecycle of a single authentication attempt
///
/// ```text
/// Unprepared --new_request--> Prepared --process--> Completed
///                                  \
///                                   `--process (error)--> Failed
/// ```
///
/// `Completed` and `Failed` are terminal: a new authenticator is needed for
/// another attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthenticatorState {
    /// Constructed, no request prepared yet
    Unprepared,
    /// Request built and transport ready
    Prepared,
    /// Credentials were issued
    Completed,
    /// The exchange failed
    Failed,
}

impl AuthenticatorState {
    /// Whether no further operation is allowed
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl fmt::Display for AuthenticatorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Unprepared => "unprepared",
            Self::Prepared => "prepared",
            Self::Completed => "completed",
            Self::Failed => "failed",
        })
    }
}
