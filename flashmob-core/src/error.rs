/// The kinds of failure every flashmob operation reports.
///
/// Each layer has its own error type, but all of them map onto one of these so
/// callers (like the HTTP server) can respond uniformly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The input is malformed or out of range
    Validation,
    /// The caller could not be identified
    Unauthorized,
    /// Wrong email or password
    InvalidCredentials,
    /// The caller lacks the privilege for the operation
    Forbidden,
    NotFound,
    /// The operation doesn't apply to the current state of the resource
    InvalidState,
    /// The operation collides with existing data, like a full session
    Conflict,
    NotParticipant,
    WindowClosed,
    Internal,
}
