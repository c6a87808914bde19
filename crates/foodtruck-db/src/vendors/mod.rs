//! Database operations for the `vendors` table.

mod read;
mod types;

pub use read::{aggregate_vendors, find_vendors};
pub use types::VendorRow;
