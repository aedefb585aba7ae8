/// Failure reported by a graphics backend, carried as text.
///
/// Components translate it into their own error taxonomy at the call site.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct BackendError(pub String);

impl BackendError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

impl From<&str> for BackendError {
    fn from(msg: &str) -> Self {
        Self(msg.to_string())
    }
}

impl From<String> for BackendError {
    fn from(msg: String) -> Self {
        Self(msg)
    }
}
