//! Database repository layer

pub mod audit_repo;
pub mod memory_repo;
pub mod role_repo;

pub use audit_repo::*;
pub use memory_repo::*;
pub use role_repo::*;
