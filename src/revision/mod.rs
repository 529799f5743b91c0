pub mod error;
pub mod resolver;

pub use error::*;
pub use resolver::*;
