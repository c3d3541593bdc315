//! Types shared across the tracepub crates: cell reference arithmetic and
//! the parsed trace item.

pub mod item;
pub mod refs;

pub use item::*;
pub use refs::*;
