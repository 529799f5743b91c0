pub mod deployment;
pub mod inventory;

pub use deployment::*;
pub use inventory::*;
