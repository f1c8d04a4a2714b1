//! The diagnose agent: turns intercepted requests into durable events and
//! uploads them.
//!
//! Hosts normally call [`Agent::start`] once and forward `url_received`,
//! `set_state` and `set_consent_string`; [`Agent::spawn_flush_loop`] takes care
//! of uploads.

pub mod bootstrap;
pub mod flush;
pub mod handler;
pub mod vendor_sync;

pub use bootstrap::{Agent, DefaultEventHandler};
pub use flush::spawn_flush_loop;
pub use handler::{EventHandler, FlushOutcome, RefreshReport};
pub use vendor_sync::load_database;
