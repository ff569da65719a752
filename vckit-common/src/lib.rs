pub mod error;
pub mod events;
pub mod registry;
pub mod vm;
pub mod vsphere;

// Re-export commonly used types
pub use error::VcError;
