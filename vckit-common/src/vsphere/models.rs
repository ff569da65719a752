use serde::{Deserialize, Serialize};

/// Power state reported by the platform for a VM.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PowerState {
    PoweredOn,
    PoweredOff,
    Suspended,
}

/// Summary record returned by the VM list endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VmSummary {
    /// Platform identifier (e.g. `vm-1042`).
    pub vm: String,
    pub name: String,
    pub power_state: PowerState,
}

/// Error envelope returned by the management API on non-2xx responses.
#[derive(Debug, Deserialize)]
pub struct ErrorResponse {
    pub error_type: String,
    #[serde(default)]
    pub messages: Vec<ErrorMessage>,
}

#[derive(Debug, Deserialize)]
pub struct ErrorMessage {
    pub default_message: String,
}
