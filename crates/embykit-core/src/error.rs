/// Failure reported by a remote-state operation.
///
/// Cloneable so a single in-flight load can hand the same outcome to every
/// caller awaiting it.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum SyncError {
    /// Network unreachable, timeout, or a non-2xx reply without a structured body.
    #[error("transport error: {0}")]
    Transport(String),
    /// Well-formed reply that fails a business rule (bad credentials, missing username).
    #[error("{0}")]
    Logical(String),
    /// A value had to be coerced or rejected locally.
    #[error("invalid value: {0}")]
    Validation(String),
}

impl SyncError {
    pub fn transport(msg: impl Into<String>) -> Self {
        SyncError::Transport(msg.into())
    }

    pub fn logical(msg: impl Into<String>) -> Self {
        SyncError::Logical(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        SyncError::Validation(msg.into())
    }

    /// Message suitable for an error banner.
    pub fn message(&self) -> &str {
        match self {
            SyncError::Transport(msg) | SyncError::Logical(msg) | SyncError::Validation(msg) => msg,
        }
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, SyncError::Transport(_))
    }
}

pub type SyncResult<T> = Result<T, SyncError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_prefixes_transport_errors() {
        let err = SyncError::transport("connection refused");
        assert_eq!(err.to_string(), "transport error: connection refused");
        assert_eq!(err.message(), "connection refused");
        assert!(err.is_transport());
    }

    #[test]
    fn logical_errors_display_server_message_verbatim() {
        let err = SyncError::logical("invalid username or password");
        assert_eq!(err.to_string(), "invalid username or password");
        assert!(!err.is_transport());
    }
}
