mod core;
mod report;

pub use core::*;
pub use report::*;
