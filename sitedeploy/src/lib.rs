//! Site deployment server library
//!
//! Serves a static site and replaces it with uploaded zip archives,
//! guarded by a deployment key issued once on first run.

pub mod analytics;
pub mod app;
pub mod deploy;
pub mod errors;
pub mod filesys;
pub mod logs;
pub mod secret;
pub mod server;
pub mod storage;
pub mod utils;
