pub mod ops;

pub use ops::{delete_vm_flow, DeleteOptions, DeleteReport, RecordStore, VmProvider};
