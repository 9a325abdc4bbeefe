//! Query functions over a cache table.

pub mod records;
