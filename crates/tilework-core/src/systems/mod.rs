//! Systems - logic that operates on components

mod dispatch;
mod needs;

pub use dispatch::*;
pub use needs::*;
