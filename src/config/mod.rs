pub mod error;
pub mod materializer;
pub mod settings;

pub use error::*;
pub use materializer::*;
pub use settings::*;
