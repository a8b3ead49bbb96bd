use std::time::Duration;

/// Failures of the persistent key-value store
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Stored value under '{key}' is malformed: {source}")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Failures of session log operations
#[derive(Debug, thiserror::Error)]
pub enum LogError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("A session is already open ('{label}')")]
    OpenSessionExists { label: String },
}

/// Why driving the host page's title editor failed
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RenameError {
    #[error("Could not find {0}")]
    NotFound(&'static str),

    #[error("Timed out after {waited:?} waiting for {what}")]
    Timeout { what: &'static str, waited: Duration },

    #[error("Editor shows '{editor}' and row shows '{row}', expected '{expected}'")]
    IdentityMismatch {
        expected: String,
        editor: String,
        row: String,
    },
}

/// Rejections at the work chip boundary
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ControlError {
    #[error("Another start/stop flow is still running")]
    BusyRejected,

    #[error("Element is not inside a task row")]
    NotATaskRow,

    #[error("Controller worker has shut down")]
    WorkerGone,
}

/// A start/stop flow that could not complete
#[derive(Debug, thiserror::Error)]
pub enum FlowError {
    #[error("Session log update failed: {0}")]
    Log(#[from] LogError),

    #[error("Task row has no title")]
    MissingTitle,
}
