/// Every failure the client surfaces falls into one of these buckets.
///
/// Front-ends branch on the kind (inline message vs alert, go back to
/// discovery, send to login) and show the error's `user_message()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    PermissionDenied,
    AdapterUnavailable,
    ScanError,
    ConnectionFailed,
    DeviceNotConnected,
    ConfigWriteFailed,
    ValidationError,
    /// HTTP 401
    Unauthorized,
    /// HTTP 409
    Conflict,
    /// HTTP 5xx
    ServerError,
    /// no response received
    NetworkError,
    TimeoutError,
    /// any other 4xx
    Rejected,
    /// a workflow step called out of order
    InvalidState,
    /// credential store read/write failed
    Storage,
    /// the plant registry refused the finished setup
    FinalizeFailed,
}

impl ErrorKind {
    /// Validation problems are shown next to the form fields; everything
    /// else becomes a single alert.
    pub fn is_inline(&self) -> bool {
        matches!(self, ErrorKind::ValidationError)
    }
}
