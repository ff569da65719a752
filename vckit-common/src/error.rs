use thiserror::Error;

/// Error taxonomy for vckit operations.
///
/// Every variant is fatal from the CLI's point of view: the binary prints the
/// message and exits non-zero. The poller's "retry by waiting" is a deliberate
/// re-query, not error recovery, so nothing here is retried.
#[derive(Debug, Error)]
pub enum VcError {
    /// A named entity could not be resolved on the management platform.
    #[error("VM {name} not found")]
    NotFound { name: String },

    /// The event wait exhausted its budget without a matching event.
    #[error("Customization of VM {entity} not succeeded within {timeout_secs} seconds")]
    Timeout { entity: String, timeout_secs: u64 },

    /// The wait was cancelled (Ctrl-C or a caller-supplied token).
    #[error("wait cancelled")]
    Cancelled,

    /// Transport or API failure from the management platform or registry.
    /// Never caught locally; propagates up and terminates the process.
    #[error(transparent)]
    Api(#[from] anyhow::Error),
}
