pub mod error;
pub mod shell;

pub use error::*;
pub use shell::*;
