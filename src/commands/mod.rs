//! CLI command implementations
//!
//! Byte commands open one chip select, run a single transaction sequence
//! and close it again. Bulk commands go through the router so each chip is
//! opened in turn and closed before the next one.

mod bulk;
mod byte;
mod list;

pub use bulk::{run_dump, run_load};
pub use byte::{run_read, run_status, run_write};
pub use list::{list_programmers, list_variants};
