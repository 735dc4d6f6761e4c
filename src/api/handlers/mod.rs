//! Version-independent handlers.

mod system;

pub use system::*;
