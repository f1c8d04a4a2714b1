//! SQL for each table. Functions take a `&Connection` so they compose inside
//! the caller's transaction.

pub mod config;
pub mod dimensions;
pub mod events;
pub mod vendors;
