pub mod delete;
pub mod wait_sysprep;
