mod client;
mod models;

pub use client::VsphereClient;
pub use models::{ErrorMessage, ErrorResponse, PowerState, VmSummary};
